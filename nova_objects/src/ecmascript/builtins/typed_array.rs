// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [10.4.5 TypedArray Exotic Objects](https://tc39.es/ecma262/#sec-typedarray-exotic-objects)
//!
//! A typed array is a view of `length` elements of one numeric type into an
//! ArrayBuffer. Its Map carries the element type as a typed elements kind;
//! the elements storage stays external and every canonical numeric key is
//! answered from the buffer. Keys outside the view are neither found nor
//! added to the object.

use super::array_buffer::{
    allocate_array_buffer, array_buffer_byte_length, get_value_from_buffer, is_detached_buffer,
    set_value_in_buffer,
};
use crate::ecmascript::{
    abstract_operations::type_conversion::{canonical_numeric_index_string, to_number},
    builtins::ordinary::{
        elements_kind::ElementsKind, ordinary_define_own_property,
        ordinary_object_create_from_map,
    },
    execution::{Agent, ExceptionType, JsResult},
    types::{ObjectKind, OrdinaryObject, PropertyDescriptor, PropertyKey, Value},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypedArrayData {
    /// The viewed ArrayBuffer.
    pub(crate) buffer: OrdinaryObject,
    pub(crate) byte_offset: usize,
    /// Element count of the view.
    pub(crate) length: usize,
    pub(crate) kind: ElementsKind,
}

/// Constructor name of a typed array kind, as used in error messages.
pub fn typed_array_name(kind: ElementsKind) -> &'static str {
    match kind {
        ElementsKind::Int8 => "Int8Array",
        ElementsKind::Uint8 => "Uint8Array",
        ElementsKind::Uint8Clamped => "Uint8ClampedArray",
        ElementsKind::Int16 => "Int16Array",
        ElementsKind::Uint16 => "Uint16Array",
        ElementsKind::Int32 => "Int32Array",
        ElementsKind::Uint32 => "Uint32Array",
        ElementsKind::Float32 => "Float32Array",
        ElementsKind::Float64 => "Float64Array",
        _ => unreachable!("{} is not a typed array kind", kind.name()),
    }
}

/// Create a typed array of `kind` viewing `length` elements of `buffer`
/// from `byte_offset`.
pub fn create_typed_array(
    agent: &mut Agent,
    kind: ElementsKind,
    buffer: OrdinaryObject,
    byte_offset: usize,
    length: usize,
) -> JsResult<OrdinaryObject> {
    debug_assert!(kind.is_typed_array());
    let element_size = kind.element_size();
    if byte_offset % element_size != 0 {
        let message = format!(
            "start offset of {} should be a multiple of {element_size}",
            typed_array_name(kind)
        );
        return Err(agent.throw_exception(ExceptionType::RangeError, message));
    }
    if is_detached_buffer(agent, buffer) {
        return Err(agent.throw_exception_with_static_message(
            ExceptionType::TypeError,
            "Cannot perform Construct on a detached ArrayBuffer",
        ));
    }
    let fits = length
        .checked_mul(element_size)
        .and_then(|bytes| bytes.checked_add(byte_offset))
        .is_some_and(|end| end <= array_buffer_byte_length(agent, buffer));
    if !fits {
        let message = format!("Invalid typed array length: {length}");
        return Err(agent.throw_exception(ExceptionType::RangeError, message));
    }
    let map = agent.intrinsics().typed_array_map(kind);
    Ok(ordinary_object_create_from_map(
        agent,
        map,
        ObjectKind::TypedArray(TypedArrayData {
            buffer,
            byte_offset,
            length,
            kind,
        }),
    ))
}

/// Create a typed array of `kind` over a fresh zeroed buffer of `length`
/// elements.
pub fn create_typed_array_with_length(
    agent: &mut Agent,
    kind: ElementsKind,
    length: usize,
) -> JsResult<OrdinaryObject> {
    let byte_length = (length as u64).saturating_mul(kind.element_size() as u64);
    let buffer = allocate_array_buffer(agent, byte_length)?;
    create_typed_array(agent, kind, buffer, 0, length)
}

fn typed_array_data(agent: &Agent, object: OrdinaryObject) -> TypedArrayData {
    match agent[object].kind {
        ObjectKind::TypedArray(data) => data,
        _ => unreachable!("typed array expected"),
    }
}

pub fn typed_array_kind(agent: &Agent, object: OrdinaryObject) -> ElementsKind {
    typed_array_data(agent, object).kind
}

pub fn typed_array_buffer(agent: &Agent, object: OrdinaryObject) -> OrdinaryObject {
    typed_array_data(agent, object).buffer
}

/// ### [10.4.5.12 TypedArrayLength ( taRecord )](https://tc39.es/ecma262/#sec-typedarraylength)
///
/// `None` when the buffer is detached or too short for the view.
pub fn typed_array_length(agent: &Agent, object: OrdinaryObject) -> Option<usize> {
    let data = typed_array_data(agent, object);
    if is_detached_buffer(agent, data.buffer) {
        return None;
    }
    let end = data.byte_offset + data.length * data.kind.element_size();
    (end <= array_buffer_byte_length(agent, data.buffer)).then_some(data.length)
}

/// ### [10.4.5.14 IsValidIntegerIndex ( O, index )](https://tc39.es/ecma262/#sec-isvalidintegerindex)
pub fn is_valid_integer_index(agent: &Agent, object: OrdinaryObject, index: u32) -> bool {
    // 1. If IsDetachedBuffer(O.[[ViewedArrayBuffer]]) is true, return false.
    // 2. If IsIntegralNumber(index) is false, return false.
    // 3. If index is -0𝔽, return false.
    // 4.-6. If ℝ(index) < 0 or ℝ(index) ≥ length, return false.
    typed_array_length(agent, object).is_some_and(|length| (index as usize) < length)
}

/// ### [10.4.5.15 TypedArrayGetElement ( O, index )](https://tc39.es/ecma262/#sec-typedarraygetelement)
pub fn typed_array_get_element(agent: &Agent, object: OrdinaryObject, index: u32) -> Value {
    // 1. If IsValidIntegerIndex(O, index) is false, return undefined.
    if !is_valid_integer_index(agent, object, index) {
        return Value::Undefined;
    }
    let data = typed_array_data(agent, object);
    // 2. Let offset be O.[[ByteOffset]].
    // 3. Let elementSize be TypedArrayElementSize(O).
    // 4. Let byteIndexInBuffer be (ℝ(index) × elementSize) + offset.
    let byte_index = index as usize * data.kind.element_size() + data.byte_offset;
    // 5. Let elementType be TypedArrayElementType(O).
    // 6. Return GetValueFromBuffer(O.[[ViewedArrayBuffer]], byteIndexInBuffer,
    //    elementType, true, UNORDERED).
    Value::from_f64(get_value_from_buffer(agent, data.buffer, byte_index, data.kind))
}

/// ### [10.4.5.16 TypedArraySetElement ( O, index, value )](https://tc39.es/ecma262/#sec-typedarraysetelement)
///
/// Takes the already converted number; stores outside the view are ignored.
pub fn typed_array_set_element(agent: &mut Agent, object: OrdinaryObject, index: u32, number: f64) {
    // 3. If IsValidIntegerIndex(O, index) is true, then
    if !is_valid_integer_index(agent, object, index) {
        // 4. Return UNUSED.
        return;
    }
    let data = typed_array_data(agent, object);
    // c. Let byteIndexInBuffer be (ℝ(index) × elementSize) + offset.
    let byte_index = index as usize * data.kind.element_size() + data.byte_offset;
    // e. Perform SetValueInBuffer(O.[[ViewedArrayBuffer]], byteIndexInBuffer,
    //    elementType, numValue, true, UNORDERED).
    set_value_in_buffer(agent, data.buffer, byte_index, data.kind, number);
}

/// The numeric index a key denotes on a typed array, if it is a canonical
/// numeric string.
fn numeric_index(agent: &Agent, key: PropertyKey) -> Option<f64> {
    match key {
        PropertyKey::Integer(index) => Some(index as f64),
        PropertyKey::String(string) => canonical_numeric_index_string(agent, string),
        PropertyKey::Symbol(_) => None,
    }
}

/// ### [10.4.5.3 \[\[DefineOwnProperty\]\] ( P, Desc )](https://tc39.es/ecma262/#sec-typedarray-defineownproperty)
pub(crate) fn typed_array_define_own_property(
    agent: &mut Agent,
    object: OrdinaryObject,
    property_key: PropertyKey,
    property_descriptor: PropertyDescriptor,
) -> JsResult<bool> {
    // 1. If P is a String, then
    //    a. Let numericIndex be CanonicalNumericIndexString(P).
    //    b. If numericIndex is not undefined, then
    let Some(numeric_index) = numeric_index(agent, property_key) else {
        // 2. Return ! OrdinaryDefineOwnProperty(O, P, Desc).
        return ordinary_define_own_property(agent, object, property_key, property_descriptor);
    };
    // i. If IsValidIntegerIndex(O, numericIndex) is false, return false.
    let PropertyKey::Integer(index) = property_key else {
        return Ok(false);
    };
    debug_assert_eq!(numeric_index, index as f64);
    if !is_valid_integer_index(agent, object, index) {
        return Ok(false);
    }
    // ii. If Desc has a [[Configurable]] field and Desc.[[Configurable]] is false, return false.
    // iii. If Desc has an [[Enumerable]] field and Desc.[[Enumerable]] is false, return false.
    // iv. If IsAccessorDescriptor(Desc) is true, return false.
    // v. If Desc has a [[Writable]] field and Desc.[[Writable]] is false, return false.
    if property_descriptor.configurable == Some(false)
        || property_descriptor.enumerable == Some(false)
        || property_descriptor.is_accessor_descriptor()
        || property_descriptor.writable == Some(false)
    {
        return Ok(false);
    }
    // vi. If Desc has a [[Value]] field, perform ? TypedArraySetElement(O,
    //     numericIndex, Desc.[[Value]]).
    if let Some(value) = property_descriptor.value {
        let number = to_number(agent, value)?;
        typed_array_set_element(agent, object, index, number);
    }
    // vii. Return true.
    Ok(true)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ecmascript::{
        abstract_operations::operations_on_objects::{
            create_data_property, define_property_or_throw, get, has_property, own_property_keys,
            set,
        },
        builtins::array_buffer::detach_array_buffer,
        execution::Options,
        types::String,
    };

    #[test]
    fn elements_read_and_write_through_the_buffer() {
        let mut agent = Agent::new(Options::default());
        let array = create_typed_array_with_length(&mut agent, ElementsKind::Uint8, 4).unwrap();
        let object = array.into_object();
        set(&mut agent, object, PropertyKey::from(1u32), Value::Integer(257), true).unwrap();
        assert_eq!(get(&mut agent, object, PropertyKey::from(1u32)).unwrap(), Value::Integer(1));
        let buffer = typed_array_buffer(&agent, array);
        let shared = create_typed_array(
            &mut agent,
            ElementsKind::Uint8,
            buffer,
            1,
            2,
        )
        .unwrap();
        assert_eq!(typed_array_get_element(&agent, shared, 0), Value::Integer(1));
    }

    #[test]
    fn out_of_range_keys_are_never_added() {
        let mut agent = Agent::new(Options::default());
        let array = create_typed_array_with_length(&mut agent, ElementsKind::Float64, 2).unwrap();
        let object = array.into_object();
        set(&mut agent, object, PropertyKey::from(5u32), Value::Integer(1), true).unwrap();
        assert!(!has_property(&mut agent, object, PropertyKey::from(5u32)).unwrap());
        let minus_zero = String::from_str(&mut agent, "-0");
        let key = PropertyKey::from_string(&mut agent, minus_zero);
        assert!(!create_data_property(&mut agent, object, key, Value::Integer(1)).unwrap());
        let keys = own_property_keys(&mut agent, object).unwrap();
        assert_eq!(keys, vec![PropertyKey::Integer(0), PropertyKey::Integer(1)]);
    }

    #[test]
    fn elements_cannot_be_made_read_only() {
        let mut agent = Agent::new(Options::default());
        let array = create_typed_array_with_length(&mut agent, ElementsKind::Int32, 1).unwrap();
        let desc = PropertyDescriptor {
            value: Some(Value::Integer(3)),
            writable: Some(false),
            ..Default::default()
        };
        let result =
            define_property_or_throw(&mut agent, array.into_object(), PropertyKey::from(0u32), desc);
        assert!(result.is_err());
        assert!(typed_array_define_own_property(
            &mut agent,
            array,
            PropertyKey::from(0u32),
            PropertyDescriptor::new_data_descriptor(Value::Integer(9)),
        )
        .unwrap());
        assert_eq!(typed_array_get_element(&agent, array, 0), Value::Integer(9));
    }

    #[test]
    fn detached_views_have_no_elements() {
        let mut agent = Agent::new(Options::default());
        let array = create_typed_array_with_length(&mut agent, ElementsKind::Int16, 3).unwrap();
        let buffer = typed_array_buffer(&agent, array);
        detach_array_buffer(&mut agent, buffer);
        assert_eq!(typed_array_length(&agent, array), None);
        assert_eq!(
            get(&mut agent, array.into_object(), PropertyKey::from(0u32)).unwrap(),
            Value::Undefined
        );
        assert!(create_typed_array(&mut agent, ElementsKind::Int16, buffer, 0, 0).is_err());
    }

    #[test]
    fn misaligned_offsets_are_range_errors() {
        let mut agent = Agent::new(Options::default());
        let buffer = allocate_array_buffer(&mut agent, 8).unwrap();
        let error = create_typed_array(&mut agent, ElementsKind::Int32, buffer, 2, 1).unwrap_err();
        assert_eq!(error.exception_type(&agent), Some(ExceptionType::RangeError));
        assert!(create_typed_array(&mut agent, ElementsKind::Int32, buffer, 4, 2).is_err());
    }
}
