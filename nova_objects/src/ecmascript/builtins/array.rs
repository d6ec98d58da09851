// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [10.4.2 Array Exotic Objects](https://tc39.es/ecma262/#sec-array-exotic-objects)
//!
//! Arrays keep their length in [`ObjectKind::Array`]. The `length` property
//! itself is a native accessor flagged as a special data property: script
//! sees a plain non-enumerable, non-configurable data property, but reads and
//! writes go through the callbacks below. Freezing or defining `length` as
//! non-writable replaces the accessor with a setter-less copy.

use crate::ecmascript::{
    abstract_operations::{
        lookup_iterator::{Configuration, LookupIterator, LookupState},
        operations_on_objects::define_own_property_ignore_attributes,
        type_conversion::{to_number, to_uint32},
    },
    builtins::ordinary::{
        dictionary::DictionaryValue,
        elements::{add_element, set_array_length},
        elements_kind::ElementsKind,
        map_transitions::transition_to_prototype,
        ordinary_define_own_property, ordinary_object_create_from_map,
        property_details::PropertyAttributes,
    },
    execution::{
        Agent, ExceptionType, JsResult,
        embedder::{AccessorInfo, NativeAccessor, PropertyCallbackInfo},
    },
    types::{Object, ObjectKind, OrdinaryObject, PropertyDescriptor, PropertyKey, Value},
};

/// Attributes of a writable array `length`.
const LENGTH_ATTRIBUTES: PropertyAttributes =
    PropertyAttributes::DONT_ENUM.union(PropertyAttributes::DONT_DELETE);

/// The native accessor backing `length` on every array.
pub(crate) fn create_array_length_accessor(agent: &mut Agent, key: PropertyKey) -> NativeAccessor {
    NativeAccessor::new(
        agent,
        AccessorInfo {
            name: key,
            getter: Some(std::rc::Rc::new(array_length_getter)),
            setter: Some(std::rc::Rc::new(array_length_setter)),
            data: Value::Undefined,
            all_can_read: false,
            all_can_write: false,
            is_special_data_property: true,
        },
    )
}

fn array_length_getter(
    agent: &mut Agent,
    _key: PropertyKey,
    info: &PropertyCallbackInfo,
) -> JsResult<Value> {
    Ok(Value::from(array_length(agent, info.holder)))
}

fn array_length_setter(
    agent: &mut Agent,
    _key: PropertyKey,
    value: Value,
    info: &PropertyCallbackInfo,
) -> JsResult<bool> {
    let new_length = validate_array_length(agent, value)?;
    let Value::Object(Object::Object(receiver)) = info.receiver else {
        return Ok(false);
    };
    // A store through the prototype chain defines an own `length`.
    if receiver != info.holder || !receiver.is_array(agent) {
        return Ok(false);
    }
    Ok(set_array_length(agent, receiver, new_length) == new_length)
}

/// ToUint32 of `value`, which must equal its ToNumber.
fn validate_array_length(agent: &mut Agent, value: Value) -> JsResult<u32> {
    // 3. Let newLen be ? ToUint32(Desc.[[Value]]).
    let new_length = to_uint32(agent, value)?;
    // 4. Let numberLen be ? ToNumber(Desc.[[Value]]).
    let number_length = to_number(agent, value)?;
    // 5. If SameValueZero(newLen, numberLen) is false, throw a RangeError exception.
    if new_length as f64 != number_length {
        return Err(agent.throw_exception_with_static_message(
            ExceptionType::RangeError,
            "Invalid array length",
        ));
    }
    Ok(new_length)
}

/// ### [10.4.2.2 ArrayCreate ( length \[ , proto \] )](https://tc39.es/ecma262/#sec-arraycreate)
pub fn array_create(
    agent: &mut Agent,
    length: u64,
    proto: Option<Object>,
) -> JsResult<OrdinaryObject> {
    // 1. If length > 2**32 - 1, throw a RangeError exception.
    if length > u32::MAX as u64 {
        return Err(agent.throw_exception_with_static_message(
            ExceptionType::RangeError,
            "Invalid array length",
        ));
    }
    // 2. If proto is not present, set proto to %Array.prototype%.
    let array_prototype = agent.intrinsics().array_prototype.into_object();
    let kind = if length == 0 {
        ElementsKind::PackedSmi
    } else {
        ElementsKind::HoleySmi
    };
    let mut map = agent
        .caches
        .initial_array_map(kind)
        .unwrap_or(agent.intrinsics().array_map);
    if let Some(proto) = proto
        && proto != array_prototype
    {
        map = transition_to_prototype(agent, map, Some(proto));
    }
    // 3. Let A be MakeBasicObject(« [[Prototype]], [[Extensible]] »).
    // 4. Set A.[[Prototype]] to proto.
    // 5. Set A.[[DefineOwnProperty]] as specified in 10.4.2.1.
    // 6. Perform ! OrdinaryDefineOwnProperty(A, "length", PropertyDescriptor
    //    { [[Value]]: 𝔽(length), [[Writable]]: true, [[Enumerable]]: false,
    //    [[Configurable]]: false }).
    // 7. Return A.
    Ok(ordinary_object_create_from_map(
        agent,
        map,
        ObjectKind::Array {
            length: length as u32,
        },
    ))
}

/// ### [7.3.18 CreateArrayFromList ( elements )](https://tc39.es/ecma262/#sec-createarrayfromlist)
pub fn create_array_from_list(agent: &mut Agent, elements: &[Value]) -> OrdinaryObject {
    // 1. Let array be ! ArrayCreate(0).
    let map = agent
        .caches
        .initial_array_map(ElementsKind::PackedSmi)
        .unwrap_or(agent.intrinsics().array_map);
    let array = ordinary_object_create_from_map(agent, map, ObjectKind::Array { length: 0 });
    // 2. Let n be 0.
    // 3. For each element e of elements, do
    for (n, e) in elements.iter().enumerate() {
        // a. Perform ! CreateDataPropertyOrThrow(array, ! ToString(𝔽(n)), e).
        add_element(
            agent,
            array,
            n as u32,
            DictionaryValue::Data(*e),
            PropertyAttributes::NONE,
        );
    }
    // 4. Return array.
    array
}

pub fn array_length(agent: &Agent, array: OrdinaryObject) -> u32 {
    match agent[array].kind {
        ObjectKind::Array { length } => length,
        _ => 0,
    }
}

fn length_iterator(agent: &mut Agent, array: OrdinaryObject) -> LookupIterator {
    let key = PropertyKey::from_str(agent, "length");
    LookupIterator::new(
        agent,
        array.into_value(),
        key,
        Configuration::OwnSkipInterceptor,
    )
}

fn is_length_writable(agent: &mut Agent, array: OrdinaryObject) -> bool {
    let it = length_iterator(agent, array);
    it.is_found() && !it.is_read_only()
}

/// True if adding element `index` to `array` would have to grow a
/// non-writable length.
pub(crate) fn would_change_read_only_length(
    agent: &mut Agent,
    array: OrdinaryObject,
    index: u32,
) -> bool {
    array.is_array(agent) && index >= array_length(agent, array) && !is_length_writable(agent, array)
}

/// ### [10.4.2.4 ArraySetLength ( A, Desc )](https://tc39.es/ecma262/#sec-arraysetlength)
pub fn array_set_length(
    agent: &mut Agent,
    array: OrdinaryObject,
    desc: PropertyDescriptor,
) -> JsResult<bool> {
    // 7. Let oldLenDesc be OrdinaryGetOwnProperty(A, "length").
    // 10. Let oldLen be oldLenDesc.[[Value]].
    let old_length = array_length(agent, array);
    // 1. If Desc does not have a [[Value]] field, then
    //    a. Return ! OrdinaryDefineOwnProperty(A, "length", Desc).
    // 2. Let newLenDesc be a copy of Desc.
    // 3.-5.
    let new_length = match desc.value {
        Some(value) => validate_array_length(agent, value)?,
        None => old_length,
    };
    // `length` is never configurable, enumerable nor an accessor.
    if desc.configurable == Some(true)
        || desc.enumerable == Some(true)
        || desc.is_accessor_descriptor()
    {
        return Ok(false);
    }
    // 12. If oldLenDesc.[[Writable]] is false, return false.
    if !is_length_writable(agent, array) {
        return Ok(new_length == old_length && desc.writable != Some(true));
    }
    // 11. If newLen ≥ oldLen, then
    //     a. Return ! OrdinaryDefineOwnProperty(A, "length", newLenDesc).
    // 17. For each own property key P of A such that P is an array index
    //     and ! ToUint32(P) ≥ newLen, in descending numeric index order, do
    //     a. Let deleteSucceeded be ! A.[[Delete]](P).
    //     b. If deleteSucceeded is false, then
    //        i. Set newLenDesc.[[Value]] to ! ToUint32(P) + 1𝔽.
    let final_length = if new_length == old_length {
        new_length
    } else {
        set_array_length(agent, array, new_length)
    };
    // 13. If newLenDesc does not have a [[Writable]] field or
    //     newLenDesc.[[Writable]] is true, then
    //     a. Let newWritable be true.
    // 14. Else,
    //     c. Let newWritable be false.
    // 18. If newWritable is false, then
    //     a. Set succeeded to ! OrdinaryDefineOwnProperty(A, "length",
    //        PropertyDescriptor { [[Writable]]: false }).
    if desc.writable == Some(false) {
        let mut it = length_iterator(agent, array);
        define_own_property_ignore_attributes(
            agent,
            &mut it,
            Value::from(final_length),
            LENGTH_ATTRIBUTES.union(PropertyAttributes::READ_ONLY),
        )?;
    }
    // 17.b.iii. Return false.
    // 19. Return true.
    Ok(final_length == new_length)
}

/// ### [10.4.2.1 \[\[DefineOwnProperty\]\] ( P, Desc )](https://tc39.es/ecma262/#sec-array-exotic-objects-defineownproperty-p-desc)
pub(crate) fn array_define_own_property(
    agent: &mut Agent,
    array: OrdinaryObject,
    property_key: PropertyKey,
    property_descriptor: PropertyDescriptor,
) -> JsResult<bool> {
    // 2. If P is "length", then
    if let PropertyKey::String(name) = property_key
        && name.as_str(agent) == "length"
    {
        // a. Return ? ArraySetLength(A, Desc).
        return array_set_length(agent, array, property_descriptor);
    }
    // 3. Else if P is an array index, then
    if let Some(index) = property_key.as_array_index() {
        // a. Let lengthDesc be OrdinaryGetOwnProperty(A, "length").
        // e. If index ≥ length and lengthDesc.[[Writable]] is false, return false.
        if would_change_read_only_length(agent, array, index) {
            return Ok(false);
        }
        // f. Let succeeded be ! OrdinaryDefineOwnProperty(A, P, Desc).
        // g. If succeeded is false, return false.
        // h. If index ≥ length, then
        //    i. Set lengthDesc.[[Value]] to index + 1𝔽.
        // i. Return true.
        return ordinary_define_own_property(agent, array, property_key, property_descriptor);
    }
    // 4. Return ! OrdinaryDefineOwnProperty(A, P, Desc).
    ordinary_define_own_property(agent, array, property_key, property_descriptor)
}

/// True if `array`'s `length` is still the writable native accessor.
pub fn has_writable_length(agent: &mut Agent, array: OrdinaryObject) -> bool {
    let it = length_iterator(agent, array);
    it.state() == LookupState::Accessor && !it.is_read_only()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ecmascript::{
        abstract_operations::operations_on_objects::{
            define_property_or_throw, get, set,
        },
        execution::Options,
    };

    fn length_key(agent: &mut Agent) -> PropertyKey {
        PropertyKey::from_str(agent, "length")
    }

    #[test]
    fn length_tracks_added_elements() {
        let mut agent = Agent::new(Options::default());
        let array = array_create(&mut agent, 0, None).unwrap();
        set(&mut agent, array.into_object(), PropertyKey::from(4u32), Value::Integer(1), true)
            .unwrap();
        let key = length_key(&mut agent);
        assert_eq!(get(&mut agent, array.into_object(), key).unwrap(), Value::Integer(5));
        assert!(array.map(&agent).elements_kind(&agent).is_holey());
    }

    #[test]
    fn shrinking_length_drops_elements() {
        let mut agent = Agent::new(Options::default());
        let values = [Value::Integer(1), Value::Integer(2), Value::Integer(3)];
        let array = create_array_from_list(&mut agent, &values);
        let key = length_key(&mut agent);
        set(&mut agent, array.into_object(), key, Value::Integer(1), true).unwrap();
        assert_eq!(array_length(&agent, array), 1);
        assert_eq!(
            get(&mut agent, array.into_object(), PropertyKey::from(2u32)).unwrap(),
            Value::Undefined
        );
    }

    #[test]
    fn invalid_lengths_are_range_errors() {
        let mut agent = Agent::new(Options::default());
        assert!(array_create(&mut agent, u32::MAX as u64 + 1, None).is_err());
        let array = array_create(&mut agent, 0, None).unwrap();
        let key = length_key(&mut agent);
        let error = set(&mut agent, array.into_object(), key, Value::Number(1.5), false).unwrap_err();
        assert_eq!(error.exception_type(&agent), Some(ExceptionType::RangeError));
    }

    #[test]
    fn read_only_length_blocks_growth() {
        let mut agent = Agent::new(Options::default());
        let array = create_array_from_list(&mut agent, &[Value::Integer(1)]);
        let key = length_key(&mut agent);
        let desc = PropertyDescriptor {
            writable: Some(false),
            ..Default::default()
        };
        define_property_or_throw(&mut agent, array.into_object(), key, desc).unwrap();
        assert!(!has_writable_length(&mut agent, array));
        assert!(would_change_read_only_length(&mut agent, array, 1));
        assert!(set(&mut agent, array.into_object(), PropertyKey::from(1u32), Value::Integer(2), true).is_err());
        assert_eq!(array_length(&agent, array), 1);
    }

    #[test]
    fn non_configurable_elements_stop_truncation() {
        let mut agent = Agent::new(Options::default());
        let array = create_array_from_list(&mut agent, &[Value::Integer(1), Value::Integer(2)]);
        let desc = PropertyDescriptor {
            value: Some(Value::Integer(7)),
            configurable: Some(false),
            ..Default::default()
        };
        define_property_or_throw(&mut agent, array.into_object(), PropertyKey::from(1u32), desc)
            .unwrap();
        let desc = PropertyDescriptor {
            value: Some(Value::Integer(0)),
            ..Default::default()
        };
        assert!(!array_set_length(&mut agent, array, desc).unwrap());
        assert_eq!(array_length(&agent, array), 2);
    }
}
