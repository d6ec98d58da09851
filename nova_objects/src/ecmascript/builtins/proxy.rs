// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Handler proxies
//!
//! A proxy forwards every fundamental object operation to a script-level
//! *handler* object. Each operation looks up a named trap on the handler and
//! calls it with a fixed argument shape:
//!
//! | Trap | Arguments |
//! |------|-----------|
//! | `get` | `receiver, name` |
//! | `set` | `receiver, name, value` |
//! | `has`, `delete` | `name` |
//! | `getOwnPropertyDescriptor`, `getPropertyDescriptor` | `name` |
//! | `defineProperty` | `name, descriptor` |
//! | `getOwnPropertyNames`, `fix` | none |
//!
//! `get`, `set` and `has` are *derived* traps: when the handler lacks them
//! they are computed from the fundamental descriptor traps. A missing
//! fundamental trap is a TypeError naming it.
//!
//! Descriptors returned by a handler must be configurable: a proxy can never
//! promise that a property stays put. Calling `fix` (through
//! \[\[PreventExtensions\]\]) snapshots the handler's properties into a
//! non-extensible *fixed* object, after which the proxy forwards to that
//! object and the handler is never consulted again.

use std::ops::{Index, IndexMut};

use crate::{
    ecmascript::{
        abstract_operations::{
            lookup_iterator::{Configuration, LookupIterator},
            operations_on_objects::{
                create_data_property_or_throw, define_property_or_throw, get, get_method,
                get_property_attributes, own_property_keys,
            },
            type_conversion::{to_boolean, to_property_key, to_uint32},
        },
        builtins::{
            builtin_function::call_function,
            ordinary::{object_create, property_details::PropertyAttributes},
        },
        execution::{Agent, ExceptionType, JsError, JsResult, LanguageMode, ShouldThrow},
        types::{InternalMethods, Object, OrdinaryObject, PropertyDescriptor, PropertyKey, Value},
    },
    heap::{CreateHeapData, Heap, indexes::ProxyIndex},
};

#[derive(Debug, Clone, Copy)]
pub struct ProxyHeapData {
    /// `None` once the proxy has been revoked.
    pub(crate) handler: Option<Object>,
    pub(crate) prototype: Option<Object>,
    /// Set by the `fix` trap; all operations forward here afterwards.
    pub(crate) fixed: Option<OrdinaryObject>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Proxy(pub(crate) ProxyIndex);

/// Create a proxy dispatching to `handler`, with `prototype` reported by
/// \[\[GetPrototypeOf\]\].
pub fn proxy_create(agent: &mut Agent, handler: Object, prototype: Option<Object>) -> Proxy {
    agent.heap.create(ProxyHeapData {
        handler: Some(handler),
        prototype,
        fixed: None,
    })
}

/// Detach the proxy from its handler. Every later operation on a non-fixed
/// proxy throws a TypeError.
pub fn revoke(agent: &mut Agent, proxy: Proxy) {
    agent[proxy].handler = None;
}

impl Proxy {
    pub fn into_object(self) -> Object {
        Object::Proxy(self)
    }

    pub fn into_value(self) -> Value {
        Value::Object(Object::Proxy(self))
    }

    pub fn is_revoked(self, agent: &Agent) -> bool {
        agent[self].handler.is_none() && agent[self].fixed.is_none()
    }

    pub fn is_fixed(self, agent: &Agent) -> bool {
        agent[self].fixed.is_some()
    }

    fn fixed(self, agent: &Agent) -> Option<OrdinaryObject> {
        agent[self].fixed
    }

    fn handler(self, agent: &mut Agent, operation: &str) -> JsResult<Object> {
        match agent[self].handler {
            Some(handler) => Ok(handler),
            None => {
                let message =
                    format!("Cannot perform '{operation}' on a proxy that has been revoked");
                Err(agent.throw_exception(ExceptionType::TypeError, message))
            }
        }
    }
}

impl CreateHeapData<ProxyHeapData, Proxy> for Heap {
    fn create(&mut self, data: ProxyHeapData) -> Proxy {
        self.allocate(4, "Proxy");
        self.proxys.push(Some(data));
        Proxy(ProxyIndex::last(&self.proxys))
    }
}

impl Index<Proxy> for Agent {
    type Output = ProxyHeapData;

    fn index(&self, index: Proxy) -> &Self::Output {
        self.heap
            .proxys
            .get(index.0.into_index())
            .expect("Proxy out of bounds")
            .as_ref()
            .expect("Proxy slot empty")
    }
}

impl IndexMut<Proxy> for Agent {
    fn index_mut(&mut self, index: Proxy) -> &mut Self::Output {
        self.heap
            .proxys
            .get_mut(index.0.into_index())
            .expect("Proxy out of bounds")
            .as_mut()
            .expect("Proxy slot empty")
    }
}

/// Look up `name` on the handler. `None` means the handler does not define
/// the trap.
fn get_trap(agent: &mut Agent, handler: Object, name: &str) -> JsResult<Option<Value>> {
    let key = PropertyKey::from_str(agent, name);
    get_method(agent, handler.into_value(), key)
}

fn missing_trap(agent: &mut Agent, name: &str) -> JsError {
    let message = format!("Proxy handler #<Object> has no '{name}' trap");
    agent.throw_exception(ExceptionType::TypeError, message)
}

/// Call the fundamental trap `name`, which the handler must define.
fn call_fundamental_trap(
    agent: &mut Agent,
    proxy: Proxy,
    name: &str,
    arguments: &[Value],
) -> JsResult<Value> {
    let handler = proxy.handler(agent, name)?;
    let Some(trap) = get_trap(agent, handler, name)? else {
        return Err(missing_trap(agent, name));
    };
    call_function(agent, trap, handler.into_value(), arguments)
}

/// Convert a trap's descriptor result, rejecting non-configurable answers.
fn trap_result_to_descriptor(
    agent: &mut Agent,
    result: Value,
    key: PropertyKey,
    trap: &str,
) -> JsResult<Option<PropertyDescriptor>> {
    if result.is_undefined() {
        return Ok(None);
    }
    let mut desc = PropertyDescriptor::to_property_descriptor(agent, result)?;
    desc.complete_property_descriptor();
    if desc.configurable == Some(false) {
        let message = format!(
            "Proxy handler #<Object> returned non-configurable descriptor for property '{}' from '{trap}' trap",
            key.as_display(agent)
        );
        return Err(agent.throw_exception(ExceptionType::TypeError, message));
    }
    Ok(Some(desc))
}

fn get_own_property_descriptor_from_handler(
    agent: &mut Agent,
    proxy: Proxy,
    key: PropertyKey,
) -> JsResult<Option<PropertyDescriptor>> {
    let name = key.into_value(agent);
    let result = call_fundamental_trap(agent, proxy, "getOwnPropertyDescriptor", &[name])?;
    trap_result_to_descriptor(agent, result, key, "getOwnPropertyDescriptor")
}

/// Descriptor of `key` anywhere on the proxy's chain, as the handler reports
/// it.
fn get_property_descriptor_from_handler(
    agent: &mut Agent,
    proxy: Proxy,
    key: PropertyKey,
) -> JsResult<Option<PropertyDescriptor>> {
    let name = key.into_value(agent);
    let result = call_fundamental_trap(agent, proxy, "getPropertyDescriptor", &[name])?;
    trap_result_to_descriptor(agent, result, key, "getPropertyDescriptor")
}

fn define_property_with_handler(
    agent: &mut Agent,
    proxy: Proxy,
    key: PropertyKey,
    desc: PropertyDescriptor,
) -> JsResult<bool> {
    let name = key.into_value(agent);
    let desc_object = PropertyDescriptor::from_property_descriptor(Some(desc), agent)?
        .map_or(Value::Undefined, Object::into_value);
    let result = call_fundamental_trap(agent, proxy, "defineProperty", &[name, desc_object])?;
    Ok(to_boolean(agent, result))
}

fn trap_returned_falsish(agent: &mut Agent, trap: &str, key: PropertyKey) -> JsError {
    let message = format!(
        "'{trap}' on proxy: trap returned falsish for property '{}'",
        key.as_display(agent)
    );
    agent.throw_exception(ExceptionType::TypeError, message)
}

/// \[\[Get\]\] through the handler's `get` trap, or derived from
/// `getPropertyDescriptor`.
pub(crate) fn get_property_with_handler(
    agent: &mut Agent,
    proxy: Proxy,
    receiver: Value,
    key: PropertyKey,
) -> JsResult<Value> {
    if let Some(fixed) = proxy.fixed(agent) {
        return fixed.internal_get(agent, key, receiver);
    }
    if key.is_private(agent) {
        return Ok(Value::Undefined);
    }
    let handler = proxy.handler(agent, "get")?;
    if let Some(trap) = get_trap(agent, handler, "get")? {
        let name = key.into_value(agent);
        return call_function(agent, trap, handler.into_value(), &[receiver, name]);
    }
    let Some(desc) = get_property_descriptor_from_handler(agent, proxy, key)? else {
        return Ok(Value::Undefined);
    };
    if desc.is_data_descriptor() {
        return Ok(desc.value.unwrap_or_default());
    }
    match desc.get.flatten() {
        Some(getter) => call_function(agent, getter.into_value(), receiver, &[]),
        None => Ok(Value::Undefined),
    }
}

/// \[\[Set\]\] on a proxy that is itself the receiver.
pub(crate) fn set_property_with_handler(
    agent: &mut Agent,
    proxy: Proxy,
    receiver: Value,
    key: PropertyKey,
    value: Value,
    should_throw: ShouldThrow,
) -> JsResult<bool> {
    if let Some(fixed) = proxy.fixed(agent) {
        let done = fixed.internal_set(agent, key, value, receiver)?;
        if !done && should_throw == ShouldThrow::ThrowOnError {
            return Err(trap_returned_falsish(agent, "set", key));
        }
        return Ok(done);
    }
    if key.is_private(agent) {
        return Ok(true);
    }
    let handler = proxy.handler(agent, "set")?;
    let done = match get_trap(agent, handler, "set")? {
        Some(trap) => {
            let name = key.into_value(agent);
            let result = call_function(agent, trap, handler.into_value(), &[receiver, name, value])?;
            to_boolean(agent, result)
        }
        None => derived_set_trap(agent, proxy, receiver, key, value)?,
    };
    if !done && should_throw == ShouldThrow::ThrowOnError {
        return Err(trap_returned_falsish(agent, "set", key));
    }
    Ok(done)
}

/// Assignment computed from the fundamental traps when `set` is missing.
fn derived_set_trap(
    agent: &mut Agent,
    proxy: Proxy,
    receiver: Value,
    key: PropertyKey,
    value: Value,
) -> JsResult<bool> {
    if let Some(desc) = get_own_property_descriptor_from_handler(agent, proxy, key)? {
        if desc.is_accessor_descriptor() {
            return match desc.set.flatten() {
                Some(setter) => {
                    call_function(agent, setter.into_value(), receiver, &[value])?;
                    Ok(true)
                }
                None => Ok(false),
            };
        }
        if desc.writable != Some(true) {
            return Ok(false);
        }
        let update = PropertyDescriptor {
            value: Some(value),
            ..Default::default()
        };
        return define_property_with_handler(agent, proxy, key, update);
    }
    if let Some(desc) = get_property_descriptor_from_handler(agent, proxy, key)? {
        if desc.is_accessor_descriptor() {
            return match desc.set.flatten() {
                Some(setter) => {
                    call_function(agent, setter.into_value(), receiver, &[value])?;
                    Ok(true)
                }
                None => Ok(false),
            };
        }
        if desc.writable != Some(true) {
            return Ok(false);
        }
    }
    define_property_with_handler(agent, proxy, key, PropertyDescriptor::new_data_descriptor(value))
}

/// A store whose prototype walk reached a proxy below the receiver. The
/// handler's `getPropertyDescriptor` decides the outcome; `None` means the
/// store continues by adding the property to the receiver.
pub(crate) fn set_property_via_prototypes_with_handler(
    agent: &mut Agent,
    proxy: Proxy,
    receiver: Value,
    key: PropertyKey,
    value: Value,
    should_throw: ShouldThrow,
) -> JsResult<Option<bool>> {
    if let Some(fixed) = proxy.fixed(agent) {
        let mut it = LookupIterator::new(
            agent,
            fixed.into_value(),
            key,
            Configuration::PrototypeChain,
        );
        return match get_property_attributes(agent, &mut it)? {
            Some(attributes) if attributes.is_read_only() => {
                read_only_via_proxy(agent, key, should_throw).map(Some)
            }
            _ => fixed.internal_set(agent, key, value, receiver).map(Some),
        };
    }
    if key.is_private(agent) {
        return Ok(None);
    }
    let Some(desc) = get_property_descriptor_from_handler(agent, proxy, key)? else {
        return Ok(None);
    };
    if desc.is_accessor_descriptor() {
        let Some(setter) = desc.set.flatten() else {
            if should_throw == ShouldThrow::ThrowOnError {
                let message = format!(
                    "Cannot set property {} of #<Object> which has only a getter",
                    key.as_display(agent)
                );
                return Err(agent.throw_exception(ExceptionType::TypeError, message));
            }
            return Ok(Some(false));
        };
        call_function(agent, setter.into_value(), receiver, &[value])?;
        return Ok(Some(true));
    }
    if desc.writable == Some(true) {
        return Ok(None);
    }
    read_only_via_proxy(agent, key, should_throw).map(Some)
}

fn read_only_via_proxy(
    agent: &mut Agent,
    key: PropertyKey,
    should_throw: ShouldThrow,
) -> JsResult<bool> {
    if should_throw == ShouldThrow::ThrowOnError {
        let message = format!(
            "Cannot assign to read only property '{}' of object",
            key.as_display(agent)
        );
        return Err(agent.throw_exception(ExceptionType::TypeError, message));
    }
    Ok(false)
}

/// \[\[HasProperty\]\] through `has`, or derived from
/// `getPropertyDescriptor`.
pub(crate) fn has_property_with_handler(
    agent: &mut Agent,
    proxy: Proxy,
    key: PropertyKey,
) -> JsResult<bool> {
    if let Some(fixed) = proxy.fixed(agent) {
        return fixed.internal_has_property(agent, key);
    }
    if key.is_private(agent) {
        return Ok(false);
    }
    let handler = proxy.handler(agent, "has")?;
    if let Some(trap) = get_trap(agent, handler, "has")? {
        let name = key.into_value(agent);
        let result = call_function(agent, trap, handler.into_value(), &[name])?;
        return Ok(to_boolean(agent, result));
    }
    Ok(get_property_descriptor_from_handler(agent, proxy, key)?.is_some())
}

/// \[\[Delete\]\] through the fundamental `delete` trap.
pub(crate) fn delete_property_with_handler(
    agent: &mut Agent,
    proxy: Proxy,
    key: PropertyKey,
    language_mode: LanguageMode,
) -> JsResult<bool> {
    if let Some(fixed) = proxy.fixed(agent) {
        let done = fixed.internal_delete(agent, key)?;
        if !done && language_mode.is_strict() {
            return Err(trap_returned_falsish(agent, "delete", key));
        }
        return Ok(done);
    }
    if key.is_private(agent) {
        return Ok(true);
    }
    let name = key.into_value(agent);
    let result = call_fundamental_trap(agent, proxy, "delete", &[name])?;
    let done = to_boolean(agent, result);
    if !done && language_mode.is_strict() {
        return Err(trap_returned_falsish(agent, "delete", key));
    }
    Ok(done)
}

/// Attributes of `key` as reported by `getPropertyDescriptor`.
pub(crate) fn get_property_attributes_with_handler(
    agent: &mut Agent,
    proxy: Proxy,
    _receiver: Value,
    key: PropertyKey,
) -> JsResult<Option<PropertyAttributes>> {
    if let Some(fixed) = proxy.fixed(agent) {
        let mut it = LookupIterator::new(
            agent,
            fixed.into_value(),
            key,
            Configuration::PrototypeChain,
        );
        return get_property_attributes(agent, &mut it);
    }
    if key.is_private(agent) {
        return Ok(None);
    }
    Ok(get_property_descriptor_from_handler(agent, proxy, key)?.map(|desc| desc.attributes()))
}

/// Read an array-like trap result into a list of property keys.
fn create_list_from_array_like(agent: &mut Agent, value: Value) -> JsResult<Vec<PropertyKey>> {
    let Value::Object(object) = value else {
        return Err(agent.throw_exception_with_static_message(
            ExceptionType::TypeError,
            "CreateListFromArrayLike called on non-object",
        ));
    };
    let length_key = PropertyKey::from_str(agent, "length");
    let length = get(agent, object, length_key)?;
    let length = to_uint32(agent, length)?;
    let mut keys = Vec::with_capacity(length as usize);
    for index in 0..length {
        let element = get(agent, object, PropertyKey::from(index))?;
        keys.push(to_property_key(agent, element)?);
    }
    Ok(keys)
}

/// Turn the proxy into a fixed object from the descriptor map returned by
/// the `fix` trap.
fn fix(agent: &mut Agent, proxy: Proxy) -> JsResult<bool> {
    let result = call_fundamental_trap(agent, proxy, "fix", &[])?;
    let Value::Object(properties) = result else {
        if result.is_undefined() {
            return Ok(false);
        }
        return Err(agent.throw_exception_with_static_message(
            ExceptionType::TypeError,
            "Proxy handler #<Object> returned a non-object from 'fix' trap",
        ));
    };
    let prototype = agent[proxy].prototype;
    let fixed = object_create(agent, prototype);
    for key in own_property_keys(agent, properties)? {
        let desc = get(agent, properties, key)?;
        let desc = PropertyDescriptor::to_property_descriptor(agent, desc)?;
        define_property_or_throw(agent, fixed.into_object(), key, desc)?;
    }
    fixed.internal_prevent_extensions(agent)?;
    log::debug!("fixed proxy {:?} into {:?}", proxy, fixed);
    agent[proxy].fixed = Some(fixed);
    Ok(true)
}

impl InternalMethods for Proxy {
    fn internal_get_prototype_of(self, agent: &mut Agent) -> JsResult<Option<Object>> {
        if let Some(fixed) = self.fixed(agent) {
            return fixed.internal_get_prototype_of(agent);
        }
        self.handler(agent, "getPrototypeOf")?;
        Ok(agent[self].prototype)
    }

    fn internal_set_prototype_of(
        self,
        agent: &mut Agent,
        prototype: Option<Object>,
    ) -> JsResult<bool> {
        if let Some(fixed) = self.fixed(agent) {
            return fixed.internal_set_prototype_of(agent, prototype);
        }
        self.handler(agent, "setPrototypeOf")?;
        // The handler protocol has no prototype trap.
        Ok(agent[self].prototype == prototype)
    }

    fn internal_is_extensible(self, agent: &mut Agent) -> JsResult<bool> {
        if let Some(fixed) = self.fixed(agent) {
            return fixed.internal_is_extensible(agent);
        }
        self.handler(agent, "isExtensible")?;
        Ok(true)
    }

    fn internal_prevent_extensions(self, agent: &mut Agent) -> JsResult<bool> {
        if let Some(fixed) = self.fixed(agent) {
            return fixed.internal_prevent_extensions(agent);
        }
        fix(agent, self)
    }

    fn internal_get_own_property(
        self,
        agent: &mut Agent,
        property_key: PropertyKey,
    ) -> JsResult<Option<PropertyDescriptor>> {
        if let Some(fixed) = self.fixed(agent) {
            return fixed.internal_get_own_property(agent, property_key);
        }
        if property_key.is_private(agent) {
            return Ok(None);
        }
        get_own_property_descriptor_from_handler(agent, self, property_key)
    }

    fn internal_define_own_property(
        self,
        agent: &mut Agent,
        property_key: PropertyKey,
        property_descriptor: PropertyDescriptor,
    ) -> JsResult<bool> {
        if let Some(fixed) = self.fixed(agent) {
            return fixed.internal_define_own_property(agent, property_key, property_descriptor);
        }
        if property_key.is_private(agent) {
            return Ok(false);
        }
        define_property_with_handler(agent, self, property_key, property_descriptor)
    }

    fn internal_has_property(
        self,
        agent: &mut Agent,
        property_key: PropertyKey,
    ) -> JsResult<bool> {
        has_property_with_handler(agent, self, property_key)
    }

    fn internal_get(
        self,
        agent: &mut Agent,
        property_key: PropertyKey,
        receiver: Value,
    ) -> JsResult<Value> {
        get_property_with_handler(agent, self, receiver, property_key)
    }

    fn internal_set(
        self,
        agent: &mut Agent,
        property_key: PropertyKey,
        value: Value,
        receiver: Value,
    ) -> JsResult<bool> {
        if receiver == self.into_value() {
            return set_property_with_handler(
                agent,
                self,
                receiver,
                property_key,
                value,
                ShouldThrow::DontThrow,
            );
        }
        match set_property_via_prototypes_with_handler(
            agent,
            self,
            receiver,
            property_key,
            value,
            ShouldThrow::DontThrow,
        )? {
            Some(done) => Ok(done),
            None => match receiver {
                Value::Object(receiver) => {
                    let desc = PropertyDescriptor::new_data_descriptor(value);
                    receiver.internal_define_own_property(agent, property_key, desc)
                }
                _ => Ok(false),
            },
        }
    }

    fn internal_delete(self, agent: &mut Agent, property_key: PropertyKey) -> JsResult<bool> {
        delete_property_with_handler(agent, self, property_key, LanguageMode::Sloppy)
    }

    fn internal_own_property_keys(self, agent: &mut Agent) -> JsResult<Vec<PropertyKey>> {
        if let Some(fixed) = self.fixed(agent) {
            return fixed.internal_own_property_keys(agent);
        }
        let names = call_fundamental_trap(agent, self, "getOwnPropertyNames", &[])?;
        create_list_from_array_like(agent, names)
    }
}

/// Build a handler object from `(trap name, function)` pairs.
pub fn create_handler(agent: &mut Agent, traps: &[(&str, Value)]) -> JsResult<Object> {
    let handler = object_create(agent, None).into_object();
    for &(name, trap) in traps {
        let key = PropertyKey::from_str(agent, name);
        create_data_property_or_throw(agent, handler, key, trap)?;
    }
    Ok(handler)
}

#[cfg(test)]
mod test {
    use std::{cell::Cell, rc::Rc};

    use super::*;
    use crate::ecmascript::{
        abstract_operations::operations_on_objects::{has_property, set},
        builtins::{
            array::create_array_from_list, builtin_function::create_builtin_function,
            ordinary::ordinary_object_create_with_intrinsics,
        },
        execution::Options,
        types::String,
    };

    fn handler_with(agent: &mut Agent, traps: &[(&str, Value)]) -> Object {
        create_handler(agent, traps).unwrap()
    }

    #[test]
    fn get_trap_receives_receiver_and_name() {
        let mut agent = Agent::new(Options::default());
        let trap = create_builtin_function(
            &mut agent,
            |agent, _, args| {
                let name = args.get(1);
                let Value::String(name) = name else {
                    return Ok(Value::Undefined);
                };
                let text = format!("got {}", name.as_str(agent));
                Ok(Value::String(String::from_string(agent, text)))
            },
            "get",
            2,
        );
        let handler = handler_with(&mut agent, &[("get", trap.into_value())]);
        let proxy = proxy_create(&mut agent, handler, None);
        let key = PropertyKey::from_str(&mut agent, "foo");
        let Value::String(result) = get(&mut agent, proxy.into_object(), key).unwrap() else {
            panic!("expected a string");
        };
        assert_eq!(result.as_str(&agent), "got foo");
    }

    #[test]
    fn missing_set_trap_without_fallback_names_the_trap() {
        let mut agent = Agent::new(Options::default());
        let handler = handler_with(&mut agent, &[]);
        let proxy = proxy_create(&mut agent, handler, None);
        let key = PropertyKey::from_str(&mut agent, "x");
        let error = set(&mut agent, proxy.into_object(), key, Value::Integer(1), true).unwrap_err();
        assert_eq!(error.exception_type(&agent), Some(ExceptionType::TypeError));
        let message = error.message(&mut agent).unwrap();
        assert!(message.contains("has no 'getOwnPropertyDescriptor' trap"), "{message}");
    }

    #[test]
    fn derived_has_uses_get_property_descriptor() {
        let mut agent = Agent::new(Options::default());
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let trap = create_builtin_function(
            &mut agent,
            move |agent, _, _| {
                counter.set(counter.get() + 1);
                let desc = PropertyDescriptor::new_data_descriptor(Value::Integer(1));
                Ok(PropertyDescriptor::from_property_descriptor(Some(desc), agent)?
                    .map_or(Value::Undefined, Object::into_value))
            },
            "getPropertyDescriptor",
            1,
        );
        let handler = handler_with(&mut agent, &[("getPropertyDescriptor", trap.into_value())]);
        let proxy = proxy_create(&mut agent, handler, None);
        let key = PropertyKey::from_str(&mut agent, "x");
        assert!(has_property(&mut agent, proxy.into_object(), key).unwrap());
        assert_eq!(get(&mut agent, proxy.into_object(), key).unwrap(), Value::Integer(1));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn revoked_proxies_throw() {
        let mut agent = Agent::new(Options::default());
        let handler = handler_with(&mut agent, &[]);
        let proxy = proxy_create(&mut agent, handler, None);
        revoke(&mut agent, proxy);
        assert!(proxy.is_revoked(&agent));
        let key = PropertyKey::from_str(&mut agent, "x");
        let error = get(&mut agent, proxy.into_object(), key).unwrap_err();
        let message = error.message(&mut agent).unwrap();
        assert_eq!(message, "Cannot perform 'get' on a proxy that has been revoked");
    }

    #[test]
    fn fix_trap_freezes_the_proxy_into_an_object() {
        let mut agent = Agent::new(Options::default());
        let fix_trap = create_builtin_function(
            &mut agent,
            |agent, _, _| {
                let properties = ordinary_object_create_with_intrinsics(agent).into_object();
                let desc = PropertyDescriptor::new_data_descriptor(Value::Integer(7));
                let desc = PropertyDescriptor::from_property_descriptor(Some(desc), agent)?
                    .map_or(Value::Undefined, Object::into_value);
                let key = PropertyKey::from_str(agent, "answer");
                create_data_property_or_throw(agent, properties, key, desc)?;
                Ok(properties.into_value())
            },
            "fix",
            0,
        );
        let handler = handler_with(&mut agent, &[("fix", fix_trap.into_value())]);
        let proxy = proxy_create(&mut agent, handler, None);
        assert!(proxy.into_object().internal_prevent_extensions(&mut agent).unwrap());
        assert!(proxy.is_fixed(&agent));
        assert!(!proxy.into_object().internal_is_extensible(&mut agent).unwrap());
        let key = PropertyKey::from_str(&mut agent, "answer");
        assert_eq!(get(&mut agent, proxy.into_object(), key).unwrap(), Value::Integer(7));
        revoke(&mut agent, proxy);
        assert_eq!(get(&mut agent, proxy.into_object(), key).unwrap(), Value::Integer(7));
    }

    #[test]
    fn own_keys_come_from_get_own_property_names() {
        let mut agent = Agent::new(Options::default());
        let trap = create_builtin_function(
            &mut agent,
            |agent, _, _| {
                let a = Value::String(String::from_str(agent, "a"));
                let one = Value::String(String::from_str(agent, "1"));
                Ok(create_array_from_list(agent, &[a, one]).into_value())
            },
            "getOwnPropertyNames",
            0,
        );
        let handler = handler_with(&mut agent, &[("getOwnPropertyNames", trap.into_value())]);
        let proxy = proxy_create(&mut agent, handler, None);
        let keys = own_property_keys(&mut agent, proxy.into_object()).unwrap();
        let a = PropertyKey::from_str(&mut agent, "a");
        assert_eq!(keys, vec![a, PropertyKey::Integer(1)]);
    }

    #[test]
    fn non_configurable_descriptors_are_rejected() {
        let mut agent = Agent::new(Options::default());
        let trap = create_builtin_function(
            &mut agent,
            |agent, _, _| {
                let desc = PropertyDescriptor {
                    value: Some(Value::Integer(1)),
                    configurable: Some(false),
                    ..Default::default()
                };
                Ok(PropertyDescriptor::from_property_descriptor(Some(desc), agent)?
                    .map_or(Value::Undefined, Object::into_value))
            },
            "getOwnPropertyDescriptor",
            1,
        );
        let handler = handler_with(&mut agent, &[("getOwnPropertyDescriptor", trap.into_value())]);
        let proxy = proxy_create(&mut agent, handler, None);
        let key = PropertyKey::from_str(&mut agent, "x");
        let result = proxy.into_object().internal_get_own_property(&mut agent, key);
        assert!(result.is_err());
    }
}
