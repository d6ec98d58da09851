// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [7.3 Operations on Objects](https://tc39.es/ecma262/#sec-operations-on-objects)
//!
//! The property access protocols. Each protocol drives a
//! [`LookupIterator`] through the states it stops at and acts on each one.
//! Accessors, interceptors and proxy traps may run arbitrary code; after any
//! such call the iterator is only used to move on, never to re-read state it
//! computed before the call.

use super::{
    lookup_iterator::{Configuration, LookupIterator, LookupState},
    type_conversion::to_number,
};
use crate::ecmascript::{
    builtins::{
        array::would_change_read_only_length,
        builtin_function::call_function,
        ordinary::{
            descriptor_array::Accessor, map_transitions::StoreOrigin,
            property_details::PropertyAttributes,
        },
        proxy::{
            delete_property_with_handler, get_property_attributes_with_handler,
            get_property_with_handler, has_property_with_handler,
            set_property_via_prototypes_with_handler, set_property_with_handler,
        },
        typed_array::is_valid_integer_index,
    },
    execution::{
        Agent, ExceptionType, JsError, JsResult, LanguageMode, ShouldThrow,
        embedder::{AccessType, AccessorInfo, InterceptorInfo, NativeAccessor, PropertyCallbackInfo},
    },
    types::{
        InternalMethods, Object, OrdinaryObject, PropertyDescriptor, PropertyKey, Value,
    },
};

/// ### [7.3.2 Get ( O, P )](https://tc39.es/ecma262/#sec-get-o-p)
pub fn get(agent: &mut Agent, o: Object, p: PropertyKey) -> JsResult<Value> {
    // 1. Return ? O.[[Get]](P, O).
    o.internal_get(agent, p, o.into_value())
}

/// ### [7.3.3 GetV ( V, P )](https://tc39.es/ecma262/#sec-getv)
///
/// Primitive receivers look the property up on %Object.prototype% with the
/// primitive as `this`.
pub fn get_v(agent: &mut Agent, v: Value, p: PropertyKey) -> JsResult<Value> {
    // 1. Let O be ? ToObject(V).
    if v.is_nullish() {
        let message = format!(
            "Cannot read properties of {} (reading '{}')",
            if v.is_null() { "null" } else { "undefined" },
            p.as_display(agent)
        );
        return Err(agent.throw_exception(ExceptionType::TypeError, message));
    }
    // 2. Return ? O.[[Get]](P, V).
    let mut it = LookupIterator::new(agent, v, p, Configuration::PrototypeChain);
    get_property(agent, &mut it)
}

/// ### [7.3.11 GetMethod ( V, P )](https://tc39.es/ecma262/#sec-getmethod)
pub fn get_method(agent: &mut Agent, v: Value, p: PropertyKey) -> JsResult<Option<Value>> {
    // 1. Let func be ? GetV(V, P).
    let func = get_v(agent, v, p)?;
    // 2. If func is either undefined or null, return undefined.
    if func.is_nullish() {
        return Ok(None);
    }
    // 3. If IsCallable(func) is false, throw a TypeError exception.
    if !func.is_callable(agent) {
        let message = format!("{} is not a function", p.as_display(agent));
        return Err(agent.throw_exception(ExceptionType::TypeError, message));
    }
    // 4. Return func.
    Ok(Some(func))
}

/// Read the property the iterator was created for.
pub fn get_property(agent: &mut Agent, it: &mut LookupIterator) -> JsResult<Value> {
    loop {
        match it.state() {
            LookupState::NotFound | LookupState::Transition => break,
            LookupState::AccessCheck => {
                if it.has_access(agent) {
                    it.next(agent);
                    continue;
                }
                return get_property_with_failed_access_check(agent, it);
            }
            LookupState::Interceptor => {
                if let Some(value) = get_property_with_interceptor(agent, it)? {
                    return Ok(value);
                }
                it.next(agent);
            }
            LookupState::Proxy => {
                return get_property_with_handler(
                    agent,
                    it.holder_proxy(),
                    it.receiver(),
                    it.key(),
                );
            }
            LookupState::IntegerIndexedExotic => return Ok(Value::Undefined),
            LookupState::Accessor => return get_property_with_accessor(agent, it),
            LookupState::Data => return Ok(it.get_data_value(agent)),
        }
    }
    if is_strong_receiver(agent, it.receiver()) {
        let message = format!(
            "Cannot access missing property '{}' of a strong object",
            it.key().as_display(agent)
        );
        return Err(agent.throw_exception(ExceptionType::TypeError, message));
    }
    Ok(Value::Undefined)
}

fn is_strong_receiver(agent: &Agent, receiver: Value) -> bool {
    match receiver {
        Value::Object(Object::Object(object)) => object.map(agent).is_strong(agent),
        _ => false,
    }
}

fn call_interceptor_getter(
    agent: &mut Agent,
    interceptor: &InterceptorInfo,
    key: PropertyKey,
    info: PropertyCallbackInfo,
) -> JsResult<Option<Value>> {
    let Some(getter) = interceptor.getter.clone() else {
        return Ok(None);
    };
    agent.with_stack_guard(|agent| getter(agent, key, &info))
}

/// Ask the interceptor of the current holder for the property. `None`
/// means the interceptor did not handle it.
fn get_property_with_interceptor(
    agent: &mut Agent,
    it: &LookupIterator,
) -> JsResult<Option<Value>> {
    let interceptor = it.get_interceptor(agent);
    let info = it.callback_info(interceptor.data);
    call_interceptor_getter(agent, &interceptor, it.key(), info)
}

fn set_property_with_interceptor(
    agent: &mut Agent,
    it: &LookupIterator,
    value: Value,
) -> JsResult<bool> {
    let interceptor = it.get_interceptor(agent);
    let Some(setter) = interceptor.setter.clone() else {
        return Ok(false);
    };
    let info = it.callback_info(interceptor.data);
    let key = it.key();
    agent.with_stack_guard(|agent| setter(agent, key, value, &info))
}

/// Attributes of an intercepted property. Interceptors without a query
/// callback report properties their getter knows as non-enumerable.
fn get_property_attributes_with_interceptor(
    agent: &mut Agent,
    it: &LookupIterator,
) -> JsResult<Option<PropertyAttributes>> {
    let interceptor = it.get_interceptor(agent);
    let info = it.callback_info(interceptor.data);
    let key = it.key();
    if let Some(query) = interceptor.query.clone() {
        return agent.with_stack_guard(|agent| query(agent, key, &info));
    }
    if call_interceptor_getter(agent, &interceptor, key, info)?.is_some() {
        return Ok(Some(PropertyAttributes::DONT_ENUM));
    }
    Ok(None)
}

fn delete_property_with_interceptor(
    agent: &mut Agent,
    it: &LookupIterator,
) -> JsResult<Option<bool>> {
    let interceptor = it.get_interceptor(agent);
    let Some(deleter) = interceptor.deleter.clone() else {
        return Ok(None);
    };
    let info = it.callback_info(interceptor.data);
    let key = it.key();
    agent.with_stack_guard(|agent| deleter(agent, key, &info))
}

fn native_accessor_info(agent: &Agent, accessor: NativeAccessor) -> AccessorInfo {
    agent[accessor].clone()
}

/// Call the getter of the current accessor property.
fn get_property_with_accessor(agent: &mut Agent, it: &LookupIterator) -> JsResult<Value> {
    let receiver = it.receiver();
    match it.get_accessors(agent) {
        Accessor::Native(accessor) => {
            let info = native_accessor_info(agent, accessor);
            let Some(getter) = info.getter else {
                return Ok(Value::Undefined);
            };
            let callback_info = PropertyCallbackInfo {
                receiver,
                holder: it.holder_object(),
                data: info.data,
            };
            let key = it.key();
            agent.with_stack_guard(|agent| getter(agent, key, &callback_info))
        }
        Accessor::Pair(pair) => {
            let Some(getter) = pair.getter else {
                return Ok(Value::Undefined);
            };
            // Only callable getters are called.
            if !getter.is_callable(agent) {
                return Ok(Value::Undefined);
            }
            call_function(agent, getter.into_value(), receiver, &[])
        }
    }
}

/// Call the setter of the current accessor property.
fn set_property_with_accessor(
    agent: &mut Agent,
    it: &LookupIterator,
    value: Value,
    should_throw: ShouldThrow,
) -> JsResult<bool> {
    let receiver = it.receiver();
    match it.get_accessors(agent) {
        Accessor::Native(accessor) => {
            let info = native_accessor_info(agent, accessor);
            let Some(setter) = info.setter else {
                return Ok(true);
            };
            let callback_info = PropertyCallbackInfo {
                receiver,
                holder: it.holder_object(),
                data: info.data,
            };
            let key = it.key();
            let done = agent.with_stack_guard(|agent| setter(agent, key, value, &callback_info))?;
            if !done {
                return write_to_read_only_property(agent, it.key(), should_throw);
            }
            Ok(true)
        }
        Accessor::Pair(pair) => {
            let Some(setter) = pair.setter else {
                if should_throw == ShouldThrow::ThrowOnError {
                    let message = format!(
                        "Cannot set property {} of #<Object> which has only a getter",
                        it.key().as_display(agent)
                    );
                    return Err(agent.throw_exception(ExceptionType::TypeError, message));
                }
                return Ok(false);
            };
            call_function(agent, setter.into_value(), receiver, &[value])?;
            Ok(true)
        }
    }
}

/// Report a denied access to the embedder. Without a failed access check
/// callback the access throws.
pub(crate) fn report_failed_access_check(
    agent: &mut Agent,
    holder: OrdinaryObject,
    access_type: AccessType,
) -> JsResult<()> {
    log::debug!("[failed access check: {access_type:?} on {holder:?}]");
    match agent.failed_access_check_callback.clone() {
        Some(callback) => callback(agent, holder, access_type),
        None => Err(agent.throw_exception_with_static_message(
            ExceptionType::TypeError,
            "no access",
        )),
    }
}

/// The interceptor registered with the access check of `holder`, consulted
/// in place of the object when access is denied.
fn access_check_interceptor(
    agent: &Agent,
    holder: OrdinaryObject,
    key: PropertyKey,
) -> Option<InterceptorInfo> {
    let template = holder.map(agent).constructor(agent)?;
    let access_check = template.access_check(agent)?;
    if key.is_array_index() {
        access_check.indexed_interceptor.clone()
    } else {
        access_check.named_interceptor.clone()
    }
}

/// Move the iterator on to the next property readable without access.
fn all_can_read(agent: &mut Agent, it: &mut LookupIterator) -> bool {
    loop {
        it.next(agent);
        match it.state() {
            LookupState::Accessor => {
                if let Accessor::Native(accessor) = it.get_accessors(agent)
                    && agent[accessor].all_can_read
                {
                    return true;
                }
            }
            LookupState::Interceptor => {
                if it.get_interceptor(agent).all_can_read {
                    return true;
                }
            }
            LookupState::NotFound | LookupState::Transition | LookupState::Proxy => return false,
            _ => {}
        }
    }
}

/// Move the iterator on to the next property writable without access.
fn all_can_write(agent: &mut Agent, it: &mut LookupIterator) -> bool {
    loop {
        it.next(agent);
        match it.state() {
            LookupState::Accessor => {
                if let Accessor::Native(accessor) = it.get_accessors(agent)
                    && agent[accessor].all_can_write
                {
                    return true;
                }
            }
            LookupState::NotFound | LookupState::Transition | LookupState::Proxy => return false,
            _ => {}
        }
    }
}

fn get_property_with_failed_access_check(
    agent: &mut Agent,
    it: &mut LookupIterator,
) -> JsResult<Value> {
    let checked = it.holder_object();
    if let Some(interceptor) = access_check_interceptor(agent, checked, it.key()) {
        let info = PropertyCallbackInfo {
            receiver: it.receiver(),
            holder: checked,
            data: interceptor.data,
        };
        if let Some(value) = call_interceptor_getter(agent, &interceptor, it.key(), info)? {
            return Ok(value);
        }
    }
    if all_can_read(agent, it) {
        match it.state() {
            LookupState::Accessor => return get_property_with_accessor(agent, it),
            LookupState::Interceptor => {
                if let Some(value) = get_property_with_interceptor(agent, it)? {
                    return Ok(value);
                }
            }
            _ => {}
        }
    }
    report_failed_access_check(agent, checked, AccessType::Get)?;
    Ok(Value::Undefined)
}

fn get_property_attributes_with_failed_access_check(
    agent: &mut Agent,
    it: &mut LookupIterator,
) -> JsResult<Option<PropertyAttributes>> {
    let checked = it.holder_object();
    if all_can_read(agent, it) {
        match it.state() {
            LookupState::Accessor => return Ok(Some(it.property_attributes())),
            LookupState::Interceptor => {
                if let Some(attributes) = get_property_attributes_with_interceptor(agent, it)? {
                    return Ok(Some(attributes));
                }
            }
            _ => {}
        }
    }
    report_failed_access_check(agent, checked, AccessType::Has)?;
    Ok(None)
}

fn set_property_with_failed_access_check(
    agent: &mut Agent,
    it: &mut LookupIterator,
    value: Value,
) -> JsResult<bool> {
    let checked = it.holder_object();
    if all_can_write(agent, it) {
        return set_property_with_accessor(agent, it, value, ShouldThrow::DontThrow);
    }
    report_failed_access_check(agent, checked, AccessType::Set)?;
    Ok(false)
}

/// Attributes of the property the iterator was created for, or `None` if it
/// does not exist.
pub fn get_property_attributes(
    agent: &mut Agent,
    it: &mut LookupIterator,
) -> JsResult<Option<PropertyAttributes>> {
    loop {
        match it.state() {
            LookupState::NotFound | LookupState::Transition => return Ok(None),
            LookupState::AccessCheck => {
                if it.has_access(agent) {
                    it.next(agent);
                    continue;
                }
                return get_property_attributes_with_failed_access_check(agent, it);
            }
            LookupState::Interceptor => {
                if let Some(attributes) = get_property_attributes_with_interceptor(agent, it)? {
                    return Ok(Some(attributes));
                }
                it.next(agent);
            }
            LookupState::Proxy => {
                return get_property_attributes_with_handler(
                    agent,
                    it.holder_proxy(),
                    it.receiver(),
                    it.key(),
                );
            }
            LookupState::IntegerIndexedExotic => return Ok(None),
            LookupState::Accessor | LookupState::Data => {
                return Ok(Some(it.property_attributes()));
            }
        }
    }
}

/// Returns true if the property the iterator was created for exists.
pub fn has_property_via_iterator(agent: &mut Agent, it: &mut LookupIterator) -> JsResult<bool> {
    if it.state() == LookupState::Proxy {
        return has_property_with_handler(agent, it.holder_proxy(), it.key());
    }
    Ok(get_property_attributes(agent, it)?.is_some())
}

fn write_to_read_only_property(
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

/// Store `value` into the property the iterator was created for, adding it
/// to the receiver if it is not found. Returns false if the store failed
/// without throwing.
pub fn set_property(
    agent: &mut Agent,
    it: &mut LookupIterator,
    value: Value,
    language_mode: LanguageMode,
    origin: StoreOrigin,
) -> JsResult<bool> {
    // Failed stores to strong objects always throw.
    let should_throw = if is_strong_receiver(agent, it.receiver()) {
        ShouldThrow::ThrowOnError
    } else {
        ShouldThrow::from(language_mode)
    };
    if let Some(result) = set_property_internal(agent, it, value, should_throw)? {
        return Ok(result);
    }
    set_on_receiver(agent, it, value, should_throw, origin)
}

/// Walk the chain for an existing property to store into. `None` means the
/// property has to be added to the receiver.
fn set_property_internal(
    agent: &mut Agent,
    it: &mut LookupIterator,
    value: Value,
    should_throw: ShouldThrow,
) -> JsResult<Option<bool>> {
    loop {
        match it.state() {
            LookupState::NotFound | LookupState::Transition => return Ok(None),
            LookupState::AccessCheck => {
                if !it.has_access(agent) {
                    return set_property_with_failed_access_check(agent, it, value).map(Some);
                }
            }
            LookupState::Proxy => {
                let proxy = it.holder_proxy();
                if it.holder_is_receiver() {
                    return set_property_with_handler(
                        agent,
                        proxy,
                        it.receiver(),
                        it.key(),
                        value,
                        should_throw,
                    )
                    .map(Some);
                }
                return set_property_via_prototypes_with_handler(
                    agent,
                    proxy,
                    it.receiver(),
                    it.key(),
                    value,
                    should_throw,
                );
            }
            LookupState::Interceptor => {
                if it.holder_is_receiver() {
                    if set_property_with_interceptor(agent, it, value)? {
                        return Ok(Some(true));
                    }
                } else if let Some(attributes) = get_property_attributes_with_interceptor(agent, it)?
                {
                    if attributes.is_read_only() {
                        return write_to_read_only_property(agent, it.key(), should_throw)
                            .map(Some);
                    }
                    // Intercepted on a prototype: shadow it on the receiver.
                    return Ok(None);
                }
            }
            LookupState::Accessor => {
                if it.is_read_only() {
                    return write_to_read_only_property(agent, it.key(), should_throw).map(Some);
                }
                return set_property_with_accessor(agent, it, value, should_throw).map(Some);
            }
            LookupState::IntegerIndexedExotic => {
                // Stores to indices outside the typed array are dropped after
                // the value is coerced.
                if it.holder_is_receiver() {
                    to_number(agent, value)?;
                }
                return Ok(Some(true));
            }
            LookupState::Data => {
                if it.is_read_only() {
                    return write_to_read_only_property(agent, it.key(), should_throw).map(Some);
                }
                if it.holder_is_receiver() {
                    return set_data_property(agent, it, value).map(Some);
                }
                return Ok(None);
            }
        }
        it.next(agent);
    }
}

/// Store into the data property the iterator stopped at.
fn set_data_property(agent: &mut Agent, it: &mut LookupIterator, value: Value) -> JsResult<bool> {
    let value = if it.is_typed_element() {
        let number = Value::from_f64(to_number(agent, value)?);
        // The coercion may have detached the buffer.
        let holder = it.holder_object();
        let index = it.index().expect("typed array element without an index");
        if !is_valid_integer_index(agent, holder, index) {
            return Ok(true);
        }
        number
    } else {
        value
    };
    it.prepare_for_data_property(agent, value);
    it.write_data_value(agent, value);
    Ok(true)
}

/// Add the property to the receiver after the walk did not find a property
/// to store into.
fn set_on_receiver(
    agent: &mut Agent,
    it: &mut LookupIterator,
    value: Value,
    should_throw: ShouldThrow,
    origin: StoreOrigin,
) -> JsResult<bool> {
    let receiver = it.receiver();
    if receiver == it.initial_holder().into_value() {
        return add_data_property(
            agent,
            it,
            value,
            PropertyAttributes::NONE,
            should_throw,
            origin,
        );
    }
    // A store with a receiver other than the object the lookup started at
    // redefines an own property of the receiver.
    let Value::Object(receiver) = receiver else {
        return cannot_create_property(agent, it, should_throw);
    };
    // 2.c. Let existingDescriptor be ? Receiver.[[GetOwnProperty]](P).
    let key = it.key();
    match receiver.internal_get_own_property(agent, key)? {
        // 2.d. If existingDescriptor is not undefined, then
        Some(existing) => {
            // i. If IsAccessorDescriptor(existingDescriptor) is true, return false.
            if existing.is_accessor_descriptor() {
                return write_to_read_only_property(agent, key, should_throw);
            }
            // ii. If existingDescriptor.[[Writable]] is false, return false.
            if existing.writable == Some(false) {
                return write_to_read_only_property(agent, key, should_throw);
            }
            // iii. Let valueDesc be the PropertyDescriptor { [[Value]]: V }.
            let value_desc = PropertyDescriptor {
                value: Some(value),
                ..Default::default()
            };
            // iv. Return ? Receiver.[[DefineOwnProperty]](P, valueDesc).
            receiver.internal_define_own_property(agent, key, value_desc)
        }
        // 2.e. Else,
        // i. Assert: Receiver does not currently have a property P.
        // ii. Return ? CreateDataProperty(Receiver, P, V).
        None => {
            let done = create_data_property(agent, receiver, key, value)?;
            if !done && should_throw == ShouldThrow::ThrowOnError {
                return Err(not_extensible_error(agent, key));
            }
            Ok(done)
        }
    }
}

fn cannot_create_property(
    agent: &mut Agent,
    it: &LookupIterator,
    should_throw: ShouldThrow,
) -> JsResult<bool> {
    if should_throw == ShouldThrow::ThrowOnError {
        let message = format!(
            "Cannot create property '{}' on {}",
            it.key().as_display(agent),
            it.receiver().type_of(agent)
        );
        return Err(agent.throw_exception(ExceptionType::TypeError, message));
    }
    Ok(false)
}

fn not_extensible_error(agent: &mut Agent, key: PropertyKey) -> JsError {
    let message = format!(
        "Cannot add property {}, object is not extensible",
        key.as_display(agent)
    );
    agent.throw_exception(ExceptionType::TypeError, message)
}

/// Add the property as a new own data property of the receiver.
pub(crate) fn add_data_property(
    agent: &mut Agent,
    it: &mut LookupIterator,
    value: Value,
    attributes: PropertyAttributes,
    should_throw: ShouldThrow,
    origin: StoreOrigin,
) -> JsResult<bool> {
    let key = it.key();
    let receiver = match it.receiver() {
        Value::Object(Object::Object(receiver)) => receiver,
        Value::Object(proxy @ Object::Proxy(_)) => {
            let desc = PropertyDescriptor::data_with_attributes(value, attributes);
            let done = proxy.internal_define_own_property(agent, key, desc)?;
            if !done && should_throw == ShouldThrow::ThrowOnError {
                return Err(not_extensible_error(agent, key));
            }
            return Ok(done);
        }
        _ => return cannot_create_property(agent, it, should_throw),
    };
    if receiver.is_typed_array(agent) && key.is_array_index() {
        // Out of range typed array indices never become properties.
        return Ok(true);
    }
    if !key.is_private(agent) && !receiver.map(agent).is_extensible(agent) {
        if should_throw == ShouldThrow::ThrowOnError {
            return Err(not_extensible_error(agent, key));
        }
        return Ok(false);
    }
    if let Some(index) = key.as_array_index()
        && receiver.is_array(agent)
        && would_change_read_only_length(agent, receiver, index)
    {
        let length = PropertyKey::from_str(agent, "length");
        return write_to_read_only_property(agent, length, should_throw);
    }
    it.prepare_transition_to_data_property(agent, value, attributes, origin);
    debug_assert_eq!(it.state(), LookupState::Transition);
    it.apply_transition_to_data_property(agent, value, attributes);
    Ok(true)
}

/// Define the property on the iterator's receiver with `value` and
/// `attributes`, replacing whatever property is there. Interceptors are not
/// consulted; native accessors store through their setter first.
pub(crate) fn define_own_property_ignore_attributes(
    agent: &mut Agent,
    it: &mut LookupIterator,
    value: Value,
    attributes: PropertyAttributes,
) -> JsResult<bool> {
    loop {
        match it.state() {
            LookupState::NotFound | LookupState::Transition => break,
            LookupState::Proxy => unreachable!("own definitions never reach a proxy"),
            LookupState::Interceptor => {}
            LookupState::AccessCheck => {
                if !it.has_access(agent) {
                    report_failed_access_check(agent, it.holder_object(), AccessType::Set)?;
                    return Ok(false);
                }
            }
            LookupState::Accessor => {
                if let Accessor::Native(accessor) = it.get_accessors(agent) {
                    // Native accessors that behave as data properties keep
                    // their callbacks; only the attributes change.
                    let current = it.property_attributes();
                    set_property_with_accessor(agent, it, value, ShouldThrow::ThrowOnError)?;
                    if current != attributes {
                        let mut info = native_accessor_info(agent, accessor);
                        if attributes.is_read_only() {
                            info.setter = None;
                        }
                        let accessor = NativeAccessor::new(agent, info);
                        it.transition_to_accessor(agent, Accessor::Native(accessor), attributes);
                    }
                } else {
                    it.reconfigure_data_property(agent, value, attributes);
                }
                return Ok(true);
            }
            LookupState::IntegerIndexedExotic => return redefine_typed_array_element(agent, it),
            LookupState::Data => {
                if it.property_attributes() == attributes {
                    return set_data_property(agent, it, value);
                }
                // Typed array elements cannot become non-writable or
                // non-enumerable.
                if it.is_typed_element() {
                    return redefine_typed_array_element(agent, it);
                }
                it.reconfigure_data_property(agent, value, attributes);
                return Ok(true);
            }
        }
        it.next(agent);
    }
    add_data_property(
        agent,
        it,
        value,
        attributes,
        ShouldThrow::ThrowOnError,
        StoreOrigin::Named,
    )
}

fn redefine_typed_array_element(agent: &mut Agent, it: &LookupIterator) -> JsResult<bool> {
    let message = format!("Cannot redefine property: {}", it.key().as_display(agent));
    Err(agent.throw_exception(ExceptionType::TypeError, message))
}

/// Delete the own property the iterator was created for.
pub fn delete_property(
    agent: &mut Agent,
    it: &mut LookupIterator,
    language_mode: LanguageMode,
) -> JsResult<bool> {
    if it.state() == LookupState::Proxy {
        return delete_property_with_handler(agent, it.holder_proxy(), it.key(), language_mode);
    }
    loop {
        match it.state() {
            LookupState::NotFound | LookupState::Transition => return Ok(true),
            LookupState::Proxy => unreachable!("own deletions reach a proxy only first"),
            LookupState::AccessCheck => {
                if !it.has_access(agent) {
                    report_failed_access_check(agent, it.holder_object(), AccessType::Delete)?;
                    return Ok(false);
                }
            }
            LookupState::Interceptor => {
                if let Some(result) = delete_property_with_interceptor(agent, it)? {
                    return Ok(result);
                }
            }
            LookupState::IntegerIndexedExotic => return Ok(true),
            LookupState::Data | LookupState::Accessor => {
                if !it.is_configurable() || it.is_typed_element() {
                    if language_mode.is_strict() || is_strong_receiver(agent, it.receiver()) {
                        let message = format!(
                            "Cannot delete property '{}' of #<Object>",
                            it.key().as_display(agent)
                        );
                        return Err(agent.throw_exception(ExceptionType::TypeError, message));
                    }
                    return Ok(false);
                }
                it.delete(agent);
                return Ok(true);
            }
        }
        it.next(agent);
    }
}

/// ### [7.3.4 Set ( O, P, V, Throw )](https://tc39.es/ecma262/#sec-set-o-p-v-throw)
pub fn set(agent: &mut Agent, o: Object, p: PropertyKey, v: Value, throw: bool) -> JsResult<()> {
    let language_mode = if throw {
        LanguageMode::Strict
    } else {
        LanguageMode::Sloppy
    };
    // 1. Let success be ? O.[[Set]](P, V, O).
    // 2. If success is false and Throw is true, throw a TypeError exception.
    let mut it = LookupIterator::new(agent, o.into_value(), p, Configuration::PrototypeChain);
    set_property(agent, &mut it, v, language_mode, StoreOrigin::Named)?;
    // 3. Return unused.
    Ok(())
}

/// ### [7.3.5 CreateDataProperty ( O, P, V )](https://tc39.es/ecma262/#sec-createdataproperty)
pub fn create_data_property(
    agent: &mut Agent,
    object: Object,
    property_key: PropertyKey,
    value: Value,
) -> JsResult<bool> {
    // 1. Let newDesc be the PropertyDescriptor { [[Value]]: V, [[Writable]]: true, [[Enumerable]]: true, [[Configurable]]: true }.
    let new_desc = PropertyDescriptor::new_data_descriptor(value);
    // 2. Return ? O.[[DefineOwnProperty]](P, newDesc).
    object.internal_define_own_property(agent, property_key, new_desc)
}

/// ### [7.3.7 CreateDataPropertyOrThrow ( O, P, V )](https://tc39.es/ecma262/#sec-createdatapropertyorthrow)
pub fn create_data_property_or_throw(
    agent: &mut Agent,
    object: Object,
    property_key: PropertyKey,
    value: Value,
) -> JsResult<()> {
    // 1. Let success be ? CreateDataProperty(O, P, V).
    let success = create_data_property(agent, object, property_key, value)?;
    // 2. If success is false, throw a TypeError exception.
    if !success {
        let message = format!(
            "Cannot redefine property: {}",
            property_key.as_display(agent)
        );
        return Err(agent.throw_exception(ExceptionType::TypeError, message));
    }
    // 3. Return unused.
    Ok(())
}

/// ### [7.3.9 DefinePropertyOrThrow ( O, P, desc )](https://tc39.es/ecma262/#sec-definepropertyorthrow)
pub fn define_property_or_throw(
    agent: &mut Agent,
    object: Object,
    property_key: PropertyKey,
    desc: PropertyDescriptor,
) -> JsResult<()> {
    // 1. Let success be ? O.[[DefineOwnProperty]](P, desc).
    let success = object.internal_define_own_property(agent, property_key, desc)?;
    // 2. If success is false, throw a TypeError exception.
    if !success {
        let message = format!(
            "Cannot redefine property: {}",
            property_key.as_display(agent)
        );
        return Err(agent.throw_exception(ExceptionType::TypeError, message));
    }
    // 3. Return unused.
    Ok(())
}

/// ### [7.3.10 DeletePropertyOrThrow ( O, P )](https://tc39.es/ecma262/#sec-deletepropertyorthrow)
pub fn delete_property_or_throw(
    agent: &mut Agent,
    object: Object,
    property_key: PropertyKey,
) -> JsResult<()> {
    // 1. Let success be ? O.[[Delete]](P).
    let success = object.internal_delete(agent, property_key)?;
    // 2. If success is false, throw a TypeError exception.
    if !success {
        let message = format!(
            "Cannot delete property '{}' of #<Object>",
            property_key.as_display(agent)
        );
        return Err(agent.throw_exception(ExceptionType::TypeError, message));
    }
    // 3. Return unused.
    Ok(())
}

/// ### [7.3.12 HasProperty ( O, P )](https://tc39.es/ecma262/#sec-hasproperty)
pub fn has_property(agent: &mut Agent, object: Object, property_key: PropertyKey) -> JsResult<bool> {
    // 1. Return ? O.[[HasProperty]](P).
    object.internal_has_property(agent, property_key)
}

/// ### [7.3.13 HasOwnProperty ( O, P )](https://tc39.es/ecma262/#sec-hasownproperty)
pub fn has_own_property(
    agent: &mut Agent,
    object: Object,
    property_key: PropertyKey,
) -> JsResult<bool> {
    // 1. Let desc be ? O.[[GetOwnProperty]](P).
    let desc = object.internal_get_own_property(agent, property_key)?;
    // 2. If desc is undefined, return false.
    // 3. Return true.
    Ok(desc.is_some())
}

/// Own property descriptor of `object`.
pub fn get_own_property_descriptor(
    agent: &mut Agent,
    object: Object,
    property_key: PropertyKey,
) -> JsResult<Option<PropertyDescriptor>> {
    object.internal_get_own_property(agent, property_key)
}

/// Own property keys of `object`: integer indices ascending, then strings in
/// insertion order, then symbols in insertion order.
pub fn own_property_keys(agent: &mut Agent, object: Object) -> JsResult<Vec<PropertyKey>> {
    object.internal_own_property_keys(agent)
}

#[cfg(test)]
mod test {
    use std::{cell::Cell, rc::Rc};

    use super::*;
    use crate::ecmascript::{
        builtins::{
            builtin_function::create_builtin_function,
            ordinary::{object_create, ordinary_object_create_with_intrinsics},
        },
        execution::Options,
    };

    fn key(agent: &mut Agent, name: &str) -> PropertyKey {
        PropertyKey::from_str(agent, name)
    }

    #[test]
    fn set_then_get_round_trips_through_transitions() {
        let mut agent = Agent::new(Options::default());
        let object = ordinary_object_create_with_intrinsics(&mut agent).into_object();
        let a = key(&mut agent, "a");
        let b = key(&mut agent, "b");
        set(&mut agent, object, a, Value::Integer(1), true).unwrap();
        set(&mut agent, object, b, Value::Number(1.5), true).unwrap();
        set(&mut agent, object, a, Value::Boolean(false), true).unwrap();
        assert_eq!(get(&mut agent, object, a).unwrap(), Value::Boolean(false));
        assert_eq!(get(&mut agent, object, b).unwrap(), Value::Number(1.5));
    }

    #[test]
    fn read_only_inherited_property_blocks_stores() {
        let mut agent = Agent::new(Options::default());
        let prototype = ordinary_object_create_with_intrinsics(&mut agent).into_object();
        let x = key(&mut agent, "x");
        define_property_or_throw(
            &mut agent,
            prototype,
            x,
            PropertyDescriptor::data_with_attributes(Value::Integer(1), PropertyAttributes::READ_ONLY),
        )
        .unwrap();
        let object = object_create(&mut agent, Some(prototype)).into_object();
        // Sloppy stores fail silently.
        set(&mut agent, object, x, Value::Integer(2), false).unwrap();
        assert!(!has_own_property(&mut agent, object, x).unwrap());
        // Strict stores throw.
        let error = set(&mut agent, object, x, Value::Integer(2), true).unwrap_err();
        assert_eq!(error.exception_type(&agent), Some(ExceptionType::TypeError));
        assert_eq!(get(&mut agent, object, x).unwrap(), Value::Integer(1));
    }

    #[test]
    fn inherited_writable_property_is_shadowed_on_the_receiver() {
        let mut agent = Agent::new(Options::default());
        let prototype = ordinary_object_create_with_intrinsics(&mut agent).into_object();
        let x = key(&mut agent, "x");
        set(&mut agent, prototype, x, Value::Integer(1), true).unwrap();
        let object = object_create(&mut agent, Some(prototype)).into_object();
        set(&mut agent, object, x, Value::Integer(2), true).unwrap();
        assert_eq!(get(&mut agent, object, x).unwrap(), Value::Integer(2));
        assert_eq!(get(&mut agent, prototype, x).unwrap(), Value::Integer(1));
    }

    #[test]
    fn throwing_getter_propagates_without_side_effects() {
        let mut agent = Agent::new(Options::default());
        let object = ordinary_object_create_with_intrinsics(&mut agent);
        let getter = create_builtin_function(
            &mut agent,
            |agent, _, _| Err(agent.throw_exception_with_static_message(ExceptionType::Error, "boom")),
            "get",
            0,
        );
        let x = key(&mut agent, "x");
        define_property_or_throw(
            &mut agent,
            object.into_object(),
            x,
            PropertyDescriptor {
                get: Some(Some(getter.into_object())),
                ..Default::default()
            },
        )
        .unwrap();
        let map = object.map(&agent);
        let error = get(&mut agent, object.into_object(), x).unwrap_err();
        assert_eq!(error.message(&mut agent).as_deref(), Some("boom"));
        assert_eq!(object.map(&agent), map);
    }

    #[test]
    fn setter_receives_the_receiver_and_value() {
        let mut agent = Agent::new(Options::default());
        let prototype = ordinary_object_create_with_intrinsics(&mut agent).into_object();
        let seen = Rc::new(Cell::new(None));
        let recorded = seen.clone();
        let setter = create_builtin_function(
            &mut agent,
            move |_, this, args| {
                recorded.set(Some((this, args.get(0))));
                Ok(Value::Undefined)
            },
            "set",
            1,
        );
        let x = key(&mut agent, "x");
        define_property_or_throw(
            &mut agent,
            prototype,
            x,
            PropertyDescriptor {
                set: Some(Some(setter.into_object())),
                configurable: Some(true),
                ..Default::default()
            },
        )
        .unwrap();
        let object = object_create(&mut agent, Some(prototype)).into_object();
        set(&mut agent, object, x, Value::Integer(3), true).unwrap();
        assert_eq!(seen.get(), Some((object.into_value(), Value::Integer(3))));
        assert!(!has_own_property(&mut agent, object, x).unwrap());
    }

    #[test]
    fn getter_only_accessor_rejects_strict_stores() {
        let mut agent = Agent::new(Options::default());
        let object = ordinary_object_create_with_intrinsics(&mut agent).into_object();
        let getter = create_builtin_function(&mut agent, |_, _, _| Ok(Value::Integer(1)), "get", 0);
        let x = key(&mut agent, "x");
        define_property_or_throw(
            &mut agent,
            object,
            x,
            PropertyDescriptor {
                get: Some(Some(getter.into_object())),
                ..Default::default()
            },
        )
        .unwrap();
        set(&mut agent, object, x, Value::Integer(2), false).unwrap();
        let error = set(&mut agent, object, x, Value::Integer(2), true).unwrap_err();
        assert_eq!(error.exception_type(&agent), Some(ExceptionType::TypeError));
        assert_eq!(get(&mut agent, object, x).unwrap(), Value::Integer(1));
    }

    #[test]
    fn non_configurable_properties_survive_delete() {
        let mut agent = Agent::new(Options::default());
        let object = ordinary_object_create_with_intrinsics(&mut agent).into_object();
        let x = key(&mut agent, "x");
        define_property_or_throw(
            &mut agent,
            object,
            x,
            PropertyDescriptor::data_with_attributes(
                Value::Integer(1),
                PropertyAttributes::DONT_DELETE,
            ),
        )
        .unwrap();
        assert!(!object.internal_delete(&mut agent, x).unwrap());
        let error = delete_property_or_throw(&mut agent, object, x).unwrap_err();
        assert_eq!(error.exception_type(&agent), Some(ExceptionType::TypeError));
        let mut it = LookupIterator::new(&mut agent, object.into_value(), x, Configuration::Own);
        let error = delete_property(&mut agent, &mut it, LanguageMode::Strict).unwrap_err();
        assert_eq!(error.exception_type(&agent), Some(ExceptionType::TypeError));
        assert!(has_own_property(&mut agent, object, x).unwrap());
    }

    #[test]
    fn deleting_the_last_property_returns_to_the_parent_map() {
        let mut agent = Agent::new(Options::default());
        let object = ordinary_object_create_with_intrinsics(&mut agent);
        let a = key(&mut agent, "a");
        let b = key(&mut agent, "b");
        set(&mut agent, object.into_object(), a, Value::Integer(1), true).unwrap();
        let map_with_a = object.map(&agent);
        set(&mut agent, object.into_object(), b, Value::Integer(2), true).unwrap();
        delete_property_or_throw(&mut agent, object.into_object(), b).unwrap();
        assert_eq!(object.map(&agent), map_with_a);
        assert!(object.has_fast_properties(&agent));
        // Deleting a property that is not the last one normalizes.
        set(&mut agent, object.into_object(), b, Value::Integer(2), true).unwrap();
        delete_property_or_throw(&mut agent, object.into_object(), a).unwrap();
        assert!(object.is_dictionary_mode(&agent));
        assert_eq!(get(&mut agent, object.into_object(), b).unwrap(), Value::Integer(2));
    }

    #[test]
    fn primitive_receivers_read_from_the_object_prototype() {
        let mut agent = Agent::new(Options::default());
        let x = key(&mut agent, "x");
        let prototype = agent.intrinsics().object_prototype.into_object();
        set(&mut agent, prototype, x, Value::Integer(5), true).unwrap();
        assert_eq!(get_v(&mut agent, Value::Boolean(true), x).unwrap(), Value::Integer(5));
        let error = get_v(&mut agent, Value::Undefined, x).unwrap_err();
        assert_eq!(error.exception_type(&agent), Some(ExceptionType::TypeError));
    }
}
