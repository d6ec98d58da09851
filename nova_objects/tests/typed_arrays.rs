// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod common;

use common::{agent, get_named, key, object_with};
use nova_objects::ecmascript::{
    abstract_operations::operations_on_objects::{
        create_data_property, get, has_property, own_property_keys, set,
    },
    builtins::{
        array_buffer::{detach_array_buffer, is_detached_buffer},
        builtin_function::create_builtin_function,
        ordinary::{
            elements_kind::ElementsKind,
            integrity::{freeze, is_frozen},
        },
        typed_array::{
            create_typed_array, create_typed_array_with_length, typed_array_buffer,
            typed_array_get_element, typed_array_kind, typed_array_length,
        },
    },
    execution::ExceptionType,
    types::{PropertyKey, Value},
};

#[test]
fn views_of_one_kind_share_a_map() {
    let mut agent = agent();
    let first = create_typed_array_with_length(&mut agent, ElementsKind::Int8, 2).unwrap();
    let second = create_typed_array_with_length(&mut agent, ElementsKind::Int8, 9).unwrap();
    let other = create_typed_array_with_length(&mut agent, ElementsKind::Float64, 2).unwrap();
    assert_eq!(first.map(&agent), second.map(&agent));
    assert_ne!(first.map(&agent), other.map(&agent));
    assert_eq!(first.map(&agent).elements_kind(&agent), ElementsKind::Int8);
    assert_eq!(typed_array_kind(&agent, other), ElementsKind::Float64);
    assert!(first.is_typed_array(&agent));
}

#[test]
fn stores_convert_to_the_element_type() {
    let mut agent = agent();
    let clamped = create_typed_array_with_length(&mut agent, ElementsKind::Uint8Clamped, 4).unwrap();
    let o = clamped.into_object();
    for (index, value) in [(0u32, 300.0), (1, -5.0), (2, 1.5), (3, 2.5)] {
        set(&mut agent, o, PropertyKey::from(index), Value::from_f64(value), true).unwrap();
    }
    let read: Vec<_> = (0..4)
        .map(|index| typed_array_get_element(&agent, clamped, index))
        .collect();
    assert_eq!(
        read,
        vec![Value::Integer(255), Value::Integer(0), Value::Integer(2), Value::Integer(2)]
    );

    let int16 = create_typed_array_with_length(&mut agent, ElementsKind::Int16, 1).unwrap();
    set(&mut agent, int16.into_object(), PropertyKey::from(0u32), Value::Integer(40000), true)
        .unwrap();
    assert_eq!(typed_array_get_element(&agent, int16, 0), Value::Integer(40000 - 65536));

    let float32 = create_typed_array_with_length(&mut agent, ElementsKind::Float32, 1).unwrap();
    set(&mut agent, float32.into_object(), PropertyKey::from(0u32), Value::Number(1.1), true)
        .unwrap();
    assert_eq!(
        typed_array_get_element(&agent, float32, 0),
        Value::Number(1.1f32 as f64)
    );
}

#[test]
fn views_alias_their_buffer() {
    let mut agent = agent();
    let wide = create_typed_array_with_length(&mut agent, ElementsKind::Uint16, 2).unwrap();
    let buffer = typed_array_buffer(&agent, wide);
    let bytes = create_typed_array(&mut agent, ElementsKind::Uint8, buffer, 0, 4).unwrap();
    set(&mut agent, wide.into_object(), PropertyKey::from(1u32), Value::Integer(0x0102), true)
        .unwrap();
    // Little endian.
    assert_eq!(typed_array_get_element(&agent, bytes, 2), Value::Integer(2));
    assert_eq!(typed_array_get_element(&agent, bytes, 3), Value::Integer(1));
}

#[test]
fn canonical_numeric_strings_never_reach_ordinary_storage() {
    let mut agent = agent();
    let array = create_typed_array_with_length(&mut agent, ElementsKind::Int32, 2).unwrap();
    let o = array.into_object();
    let fraction = key(&mut agent, "1.5");
    let negative = key(&mut agent, "-1");
    set(&mut agent, o, fraction, Value::Integer(1), true).unwrap();
    assert!(!create_data_property(&mut agent, o, negative, Value::Integer(1)).unwrap());
    assert!(!has_property(&mut agent, o, fraction).unwrap());
    assert_eq!(get(&mut agent, o, negative).unwrap(), Value::Undefined);

    // "01" is not canonical, so it is an ordinary property.
    let padded = key(&mut agent, "01");
    set(&mut agent, o, padded, Value::Integer(7), true).unwrap();
    assert_eq!(get_named(&mut agent, array, "01"), Value::Integer(7));
    let keys = own_property_keys(&mut agent, o).unwrap();
    assert_eq!(keys, vec![PropertyKey::Integer(0), PropertyKey::Integer(1), padded]);
}

#[test]
fn coercion_that_detaches_drops_the_store() {
    let mut agent = agent();
    let array = create_typed_array_with_length(&mut agent, ElementsKind::Float64, 3).unwrap();
    let buffer = typed_array_buffer(&agent, array);
    let value_of = create_builtin_function(
        &mut agent,
        move |agent, _, _| {
            detach_array_buffer(agent, buffer);
            Ok(Value::Integer(5))
        },
        "valueOf",
        0,
    );
    let hostile = object_with(&mut agent, &[("valueOf", value_of.into_value())]);
    set(&mut agent, array.into_object(), PropertyKey::from(0u32), hostile.into_value(), true)
        .unwrap();
    assert!(is_detached_buffer(&agent, buffer));
    assert_eq!(typed_array_length(&agent, array), None);
    assert_eq!(typed_array_get_element(&agent, array, 0), Value::Undefined);
}

#[test]
fn failed_coercion_propagates() {
    let mut agent = agent();
    let array = create_typed_array_with_length(&mut agent, ElementsKind::Uint32, 1).unwrap();
    let value_of = create_builtin_function(
        &mut agent,
        |agent, _, _| Err(agent.throw_exception_with_static_message(ExceptionType::Error, "no")),
        "valueOf",
        0,
    );
    let hostile = object_with(&mut agent, &[("valueOf", value_of.into_value())]);
    // Out of range stores still coerce the value.
    let error = set(
        &mut agent,
        array.into_object(),
        PropertyKey::from(10u32),
        hostile.into_value(),
        true,
    )
    .unwrap_err();
    assert_eq!(error.message(&mut agent).as_deref(), Some("no"));
}

#[test]
fn only_empty_views_can_be_frozen() {
    let mut agent = agent();
    let empty = create_typed_array_with_length(&mut agent, ElementsKind::Uint8, 0).unwrap();
    assert!(freeze(&mut agent, empty.into_object()).unwrap());
    assert!(is_frozen(&mut agent, empty.into_object()).unwrap());

    let full = create_typed_array_with_length(&mut agent, ElementsKind::Uint8, 1).unwrap();
    let error = freeze(&mut agent, full.into_object()).unwrap_err();
    assert_eq!(error.exception_type(&agent), Some(ExceptionType::TypeError));
    assert!(!is_frozen(&mut agent, full.into_object()).unwrap());
}
