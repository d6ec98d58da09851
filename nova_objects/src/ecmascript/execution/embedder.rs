// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## Embedder callbacks
//!
//! Native code hooks into property access through three mechanisms:
//!
//! - Interceptors stand in for named or indexed property storage of every
//!   instance created from an [`ObjectTemplate`].
//! - Access checks guard instances against unauthorized reads and writes.
//! - Native accessors ([`AccessorInfo`]) implement a single property with
//!   native getter and setter callbacks.
//!
//! Callbacks are invoked with the receiver, the holder object on which the
//! interceptor or accessor was found, the property key and the embedder data
//! registered alongside the callback. Any callback may re-enter the engine.

use std::{
    ops::{Deref, Index},
    rc::Rc,
};

use crate::{
    ecmascript::{
        builtins::ordinary::{map::Map, property_details::PropertyAttributes},
        execution::{Agent, JsResult},
        types::{OrdinaryObject, PropertyKey, Value},
    },
    heap::{
        CreateHeapData, Heap,
        indexes::{AccessorInfoIndex, ObjectTemplateIndex},
    },
};

/// Arguments shared by every property callback.
#[derive(Debug, Clone, Copy)]
pub struct PropertyCallbackInfo {
    pub receiver: Value,
    pub holder: OrdinaryObject,
    pub data: Value,
}

/// Returns `Some(value)` if the property was intercepted.
pub type InterceptorGetter =
    Rc<dyn Fn(&mut Agent, PropertyKey, &PropertyCallbackInfo) -> JsResult<Option<Value>>>;
/// Returns true if the store was intercepted.
pub type InterceptorSetter =
    Rc<dyn Fn(&mut Agent, PropertyKey, Value, &PropertyCallbackInfo) -> JsResult<bool>>;
/// Returns the attributes of an intercepted property.
pub type InterceptorQuery = Rc<
    dyn Fn(&mut Agent, PropertyKey, &PropertyCallbackInfo) -> JsResult<Option<PropertyAttributes>>,
>;
/// Returns `Some(success)` if the deletion was intercepted.
pub type InterceptorDeleter =
    Rc<dyn Fn(&mut Agent, PropertyKey, &PropertyCallbackInfo) -> JsResult<Option<bool>>>;
pub type InterceptorEnumerator =
    Rc<dyn Fn(&mut Agent, &PropertyCallbackInfo) -> JsResult<Vec<PropertyKey>>>;

/// Decides whether the current caller may access `holder`.
pub type AccessCheckCallback = Rc<dyn Fn(&mut Agent, OrdinaryObject, Value) -> bool>;
/// Notified when an access check fails. May throw.
pub type FailedAccessCheckCallback =
    Rc<dyn Fn(&mut Agent, OrdinaryObject, AccessType) -> JsResult<()>>;

pub type NativeGetter =
    Rc<dyn Fn(&mut Agent, PropertyKey, &PropertyCallbackInfo) -> JsResult<Value>>;
/// Returns false if the store failed.
pub type NativeSetter =
    Rc<dyn Fn(&mut Agent, PropertyKey, Value, &PropertyCallbackInfo) -> JsResult<bool>>;

/// Kind of access reported to the failed access check callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessType {
    Get,
    Set,
    Has,
    Delete,
    Keys,
}

#[derive(Clone, Default)]
pub struct InterceptorInfo {
    pub getter: Option<InterceptorGetter>,
    pub setter: Option<InterceptorSetter>,
    pub query: Option<InterceptorQuery>,
    pub deleter: Option<InterceptorDeleter>,
    pub enumerator: Option<InterceptorEnumerator>,
    pub data: Value,
    /// A non-masking interceptor is only consulted when the property is not
    /// found anywhere on the prototype chain.
    pub non_masking: bool,
    /// The interceptor may be consulted even when an access check fails.
    pub all_can_read: bool,
    pub can_intercept_symbols: bool,
}

impl core::fmt::Debug for InterceptorInfo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InterceptorInfo")
            .field("getter", &self.getter.is_some())
            .field("setter", &self.setter.is_some())
            .field("query", &self.query.is_some())
            .field("deleter", &self.deleter.is_some())
            .field("enumerator", &self.enumerator.is_some())
            .field("non_masking", &self.non_masking)
            .field("all_can_read", &self.all_can_read)
            .finish()
    }
}

#[derive(Clone)]
pub struct AccessCheckInfo {
    pub callback: AccessCheckCallback,
    /// Interceptors consulted in place of the object when access is denied.
    pub named_interceptor: Option<InterceptorInfo>,
    pub indexed_interceptor: Option<InterceptorInfo>,
    pub data: Value,
}

impl core::fmt::Debug for AccessCheckInfo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AccessCheckInfo")
            .field("named_interceptor", &self.named_interceptor)
            .field("indexed_interceptor", &self.indexed_interceptor)
            .finish()
    }
}

/// A property implemented by native callbacks.
#[derive(Clone)]
pub struct AccessorInfo {
    pub name: PropertyKey,
    pub getter: Option<NativeGetter>,
    pub setter: Option<NativeSetter>,
    pub data: Value,
    /// Readable even when an access check fails.
    pub all_can_read: bool,
    /// Writable even when an access check fails.
    pub all_can_write: bool,
    /// Reported to script as a data property (e.g. `Array.prototype.length`).
    pub is_special_data_property: bool,
}

impl core::fmt::Debug for AccessorInfo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AccessorInfo")
            .field("name", &self.name)
            .field("getter", &self.getter.is_some())
            .field("setter", &self.setter.is_some())
            .field("all_can_read", &self.all_can_read)
            .field("all_can_write", &self.all_can_write)
            .field("is_special_data_property", &self.is_special_data_property)
            .finish()
    }
}

/// Handle to a registered [`AccessorInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeAccessor(pub(crate) AccessorInfoIndex);

impl NativeAccessor {
    pub fn new(agent: &mut Agent, info: AccessorInfo) -> Self {
        agent.heap.create(info)
    }
}

impl CreateHeapData<AccessorInfo, NativeAccessor> for Heap {
    fn create(&mut self, data: AccessorInfo) -> NativeAccessor {
        self.allocate(6, "AccessorInfo");
        self.accessor_infos.push(Some(data));
        NativeAccessor(AccessorInfoIndex::last(&self.accessor_infos))
    }
}

impl Index<NativeAccessor> for Agent {
    type Output = AccessorInfo;

    fn index(&self, index: NativeAccessor) -> &Self::Output {
        self.heap
            .accessor_infos
            .get(index.0.into_index())
            .expect("AccessorInfo out of bounds")
            .as_ref()
            .expect("AccessorInfo slot empty")
    }
}

/// Description of embedder-backed objects. Every instance of a template
/// shares the template's interceptors and access check.
#[derive(Debug, Default, Clone)]
pub struct ObjectTemplateRecord {
    pub named_interceptor: Option<InterceptorInfo>,
    pub indexed_interceptor: Option<InterceptorInfo>,
    pub access_check: Option<AccessCheckInfo>,
    /// Native accessors installed on each instance.
    pub accessors: Vec<(NativeAccessor, PropertyAttributes)>,
}

#[derive(Debug, Clone)]
pub struct ObjectTemplateHeapData {
    pub(crate) record: ObjectTemplateRecord,
    /// Root Map of instances, created on first instantiation.
    pub(crate) initial_map: Option<Map>,
}

impl Deref for ObjectTemplateHeapData {
    type Target = ObjectTemplateRecord;

    fn deref(&self) -> &Self::Target {
        &self.record
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectTemplate(pub(crate) ObjectTemplateIndex);

impl ObjectTemplate {
    pub fn new(agent: &mut Agent, record: ObjectTemplateRecord) -> Self {
        agent.heap.create(record)
    }

    pub(crate) fn named_interceptor(self, agent: &Agent) -> Option<&InterceptorInfo> {
        agent[self].named_interceptor.as_ref()
    }

    pub(crate) fn indexed_interceptor(self, agent: &Agent) -> Option<&InterceptorInfo> {
        agent[self].indexed_interceptor.as_ref()
    }

    pub(crate) fn access_check(self, agent: &Agent) -> Option<&AccessCheckInfo> {
        agent[self].access_check.as_ref()
    }
}

impl CreateHeapData<ObjectTemplateRecord, ObjectTemplate> for Heap {
    fn create(&mut self, data: ObjectTemplateRecord) -> ObjectTemplate {
        self.allocate(8, "ObjectTemplateInfo");
        self.object_templates.push(Some(ObjectTemplateHeapData {
            record: data,
            initial_map: None,
        }));
        ObjectTemplate(ObjectTemplateIndex::last(&self.object_templates))
    }
}

impl Index<ObjectTemplate> for Agent {
    type Output = ObjectTemplateHeapData;

    fn index(&self, index: ObjectTemplate) -> &Self::Output {
        self.heap
            .object_templates
            .get(index.0.into_index())
            .expect("ObjectTemplate out of bounds")
            .as_ref()
            .expect("ObjectTemplate slot empty")
    }
}

impl core::ops::IndexMut<ObjectTemplate> for Agent {
    fn index_mut(&mut self, index: ObjectTemplate) -> &mut Self::Output {
        self.heap
            .object_templates
            .get_mut(index.0.into_index())
            .expect("ObjectTemplate out of bounds")
            .as_mut()
            .expect("ObjectTemplate slot empty")
    }
}
