// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::{Object, PropertyKey};
use crate::ecmascript::{
    execution::{Agent, JsResult},
    types::{PropertyDescriptor, Value},
};

/// ### [6.1.7.2 Object Internal Methods and Internal Slots](https://tc39.es/ecma262/#sec-object-internal-methods-and-internal-slots)
///
/// Every method may call into user code (accessors, interceptors or proxy
/// traps), after which any assumption about the object's Map or storage must
/// be re-validated.
pub trait InternalMethods
where
    Self: Sized + Copy + Into<Object>,
{
    /// ## \[\[GetPrototypeOf\]\]
    fn internal_get_prototype_of(self, agent: &mut Agent) -> JsResult<Option<Object>>;

    /// ## \[\[SetPrototypeOf\]\]
    fn internal_set_prototype_of(
        self,
        agent: &mut Agent,
        prototype: Option<Object>,
    ) -> JsResult<bool>;

    /// ## \[\[IsExtensible\]\]
    fn internal_is_extensible(self, agent: &mut Agent) -> JsResult<bool>;

    /// ## \[\[PreventExtensions\]\]
    fn internal_prevent_extensions(self, agent: &mut Agent) -> JsResult<bool>;

    /// ## \[\[GetOwnProperty\]\]
    fn internal_get_own_property(
        self,
        agent: &mut Agent,
        property_key: PropertyKey,
    ) -> JsResult<Option<PropertyDescriptor>>;

    /// ## \[\[DefineOwnProperty\]\]
    fn internal_define_own_property(
        self,
        agent: &mut Agent,
        property_key: PropertyKey,
        property_descriptor: PropertyDescriptor,
    ) -> JsResult<bool>;

    /// ## \[\[HasProperty\]\]
    fn internal_has_property(self, agent: &mut Agent, property_key: PropertyKey)
    -> JsResult<bool>;

    /// ## \[\[Get\]\]
    fn internal_get(
        self,
        agent: &mut Agent,
        property_key: PropertyKey,
        receiver: Value,
    ) -> JsResult<Value>;

    /// ## \[\[Set\]\]
    fn internal_set(
        self,
        agent: &mut Agent,
        property_key: PropertyKey,
        value: Value,
        receiver: Value,
    ) -> JsResult<bool>;

    /// ## \[\[Delete\]\]
    fn internal_delete(self, agent: &mut Agent, property_key: PropertyKey) -> JsResult<bool>;

    /// ## \[\[OwnPropertyKeys\]\]
    fn internal_own_property_keys(self, agent: &mut Agent) -> JsResult<Vec<PropertyKey>>;
}

impl InternalMethods for Object {
    fn internal_get_prototype_of(self, agent: &mut Agent) -> JsResult<Option<Object>> {
        match self {
            Object::Object(data) => data.internal_get_prototype_of(agent),
            Object::Proxy(data) => data.internal_get_prototype_of(agent),
        }
    }

    fn internal_set_prototype_of(
        self,
        agent: &mut Agent,
        prototype: Option<Object>,
    ) -> JsResult<bool> {
        match self {
            Object::Object(data) => data.internal_set_prototype_of(agent, prototype),
            Object::Proxy(data) => data.internal_set_prototype_of(agent, prototype),
        }
    }

    fn internal_is_extensible(self, agent: &mut Agent) -> JsResult<bool> {
        match self {
            Object::Object(data) => data.internal_is_extensible(agent),
            Object::Proxy(data) => data.internal_is_extensible(agent),
        }
    }

    fn internal_prevent_extensions(self, agent: &mut Agent) -> JsResult<bool> {
        match self {
            Object::Object(data) => data.internal_prevent_extensions(agent),
            Object::Proxy(data) => data.internal_prevent_extensions(agent),
        }
    }

    fn internal_get_own_property(
        self,
        agent: &mut Agent,
        property_key: PropertyKey,
    ) -> JsResult<Option<PropertyDescriptor>> {
        match self {
            Object::Object(data) => data.internal_get_own_property(agent, property_key),
            Object::Proxy(data) => data.internal_get_own_property(agent, property_key),
        }
    }

    fn internal_define_own_property(
        self,
        agent: &mut Agent,
        property_key: PropertyKey,
        property_descriptor: PropertyDescriptor,
    ) -> JsResult<bool> {
        match self {
            Object::Object(data) => {
                data.internal_define_own_property(agent, property_key, property_descriptor)
            }
            Object::Proxy(data) => {
                data.internal_define_own_property(agent, property_key, property_descriptor)
            }
        }
    }

    fn internal_has_property(
        self,
        agent: &mut Agent,
        property_key: PropertyKey,
    ) -> JsResult<bool> {
        match self {
            Object::Object(data) => data.internal_has_property(agent, property_key),
            Object::Proxy(data) => data.internal_has_property(agent, property_key),
        }
    }

    fn internal_get(
        self,
        agent: &mut Agent,
        property_key: PropertyKey,
        receiver: Value,
    ) -> JsResult<Value> {
        match self {
            Object::Object(data) => data.internal_get(agent, property_key, receiver),
            Object::Proxy(data) => data.internal_get(agent, property_key, receiver),
        }
    }

    fn internal_set(
        self,
        agent: &mut Agent,
        property_key: PropertyKey,
        value: Value,
        receiver: Value,
    ) -> JsResult<bool> {
        match self {
            Object::Object(data) => data.internal_set(agent, property_key, value, receiver),
            Object::Proxy(data) => data.internal_set(agent, property_key, value, receiver),
        }
    }

    fn internal_delete(self, agent: &mut Agent, property_key: PropertyKey) -> JsResult<bool> {
        match self {
            Object::Object(data) => data.internal_delete(agent, property_key),
            Object::Proxy(data) => data.internal_delete(agent, property_key),
        }
    }

    fn internal_own_property_keys(self, agent: &mut Agent) -> JsResult<Vec<PropertyKey>> {
        match self {
            Object::Object(data) => data.internal_own_property_keys(agent),
            Object::Proxy(data) => data.internal_own_property_keys(agent),
        }
    }
}
