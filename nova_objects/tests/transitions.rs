// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod common;

use common::{agent, get_named, key, object_with};
use nova_objects::ecmascript::{
    abstract_operations::operations_on_objects::{create_data_property_or_throw, set},
    builtins::{
        array::{array_length, create_array_from_list},
        ordinary::{
            elements_kind::{ElementsKind, FAST_ELEMENTS_KINDS, is_valid_elements_transition},
            integrity::{is_sealed, make_strong, prevent_extensions},
            map_updater::{try_update, update},
            ordinary_object_create_with_intrinsics,
            property_details::Representation,
        },
    },
    execution::{Agent, Options, ShouldThrow},
    types::{String, Value},
};

#[test]
fn same_construction_path_shares_maps() {
    let mut agent = agent();
    let a = object_with(&mut agent, &[("a", Value::Integer(1)), ("b", Value::Integer(2))]);
    let b = object_with(&mut agent, &[("a", Value::Integer(3)), ("b", Value::Integer(4))]);
    assert_eq!(a.map(&agent), b.map(&agent));

    // Different order, different shape.
    let c = object_with(&mut agent, &[("b", Value::Integer(2)), ("a", Value::Integer(1))]);
    assert_ne!(a.map(&agent), c.map(&agent));
}

#[test]
fn third_property_reuses_the_transition_edge() {
    let mut agent = agent();
    let x = Value::String(String::from_str(&mut agent, "x"));
    let first = object_with(&mut agent, &[("a", Value::Integer(1)), ("b", Value::Integer(2))]);
    let second = object_with(&mut agent, &[("a", Value::Integer(1)), ("b", Value::Integer(2))]);
    let before = first.map(&agent);
    let c = key(&mut agent, "c");
    create_data_property_or_throw(&mut agent, first.into_object(), c, x).unwrap();
    create_data_property_or_throw(&mut agent, second.into_object(), c, x).unwrap();

    assert_eq!(first.map(&agent), second.map(&agent));
    assert_eq!(first.map(&agent).back_pointer(&agent), Some(before));
    assert_eq!(before.number_of_transitions(&agent), 1);
    let descriptors = first.map(&agent).descriptors(&agent);
    let details = descriptors.get_details(agent.heap(), 2);
    assert_eq!(details.representation(), Representation::HeapObject);
}

#[test]
fn generalizing_a_shared_field_deprecates_and_migrates_lazily() {
    let mut agent = agent();
    let objects: Vec<_> = (0..1000)
        .map(|i| object_with(&mut agent, &[("x", Value::Integer(i))]))
        .collect();
    let smi_map = objects[0].map(&agent);
    assert!(objects.iter().all(|object| object.map(&agent) == smi_map));

    let value = ordinary_object_create_with_intrinsics(&mut agent).into_value();
    let object = object_with(&mut agent, &[("x", value)]);
    let general_map = object.map(&agent);
    assert_ne!(general_map, smi_map);
    assert!(smi_map.is_deprecated(&agent));
    assert!(!general_map.is_deprecated(&agent));

    // Live instances keep the deprecated Map until something touches them.
    assert_eq!(objects[500].map(&agent), smi_map);
    assert_eq!(get_named(&mut agent, objects[500], "x"), Value::Integer(500));
    assert_eq!(objects[500].map(&agent), general_map);
    assert_eq!(objects[501].map(&agent), smi_map);

    let details = general_map.descriptors(&agent).get_details(agent.heap(), 0);
    assert_eq!(details.representation(), Representation::Tagged);
}

#[test]
fn map_update_is_idempotent() {
    let mut agent = agent();
    let first = object_with(&mut agent, &[("x", Value::Integer(1)), ("y", Value::Integer(2))]);
    let old_map = first.map(&agent);
    let _second = object_with(&mut agent, &[("x", Value::Number(0.5)), ("y", Value::Integer(2))]);
    assert!(old_map.is_deprecated(&agent));

    let updated = update(&mut agent, old_map);
    assert!(!updated.is_deprecated(&agent));
    assert_eq!(update(&mut agent, old_map), updated);
    assert_eq!(update(&mut agent, updated), updated);
    assert_eq!(try_update(&agent, old_map), Some(updated));
}

#[test]
fn updating_a_non_extensible_map_is_idempotent() {
    let mut agent = agent();
    let a = object_with(&mut agent, &[("x", Value::Integer(1))]);
    let b = object_with(&mut agent, &[("x", Value::Integer(2))]);
    prevent_extensions(&mut agent, a, ShouldThrow::ThrowOnError).unwrap();
    prevent_extensions(&mut agent, b, ShouldThrow::ThrowOnError).unwrap();
    let non_extensible = a.map(&agent);
    assert_eq!(b.map(&agent), non_extensible);

    let _sibling = object_with(&mut agent, &[("x", Value::Number(0.5))]);
    assert!(non_extensible.is_deprecated(&agent));
    // The widened Map has no non-extensible child yet.
    assert_eq!(try_update(&agent, non_extensible), None);

    let updated = update(&mut agent, non_extensible);
    assert!(!updated.is_deprecated(&agent));
    assert!(!updated.is_extensible(&agent));
    assert_eq!(update(&mut agent, non_extensible), updated);
    assert_eq!(try_update(&agent, non_extensible), Some(updated));
    let details = updated.descriptors(&agent).get_details(agent.heap(), 0);
    assert_eq!(details.representation(), Representation::Double);

    // Instances that shared the deprecated Map share its replacement.
    assert_eq!(get_named(&mut agent, a, "x"), Value::Integer(1));
    assert_eq!(get_named(&mut agent, b, "x"), Value::Integer(2));
    assert_eq!(a.map(&agent), updated);
    assert_eq!(b.map(&agent), updated);
}

#[test]
fn strong_objects_share_maps_across_field_generalization() {
    let mut agent = agent();
    let a = object_with(&mut agent, &[("x", Value::Integer(1))]);
    let b = object_with(&mut agent, &[("x", Value::Integer(2))]);
    make_strong(&mut agent, a).unwrap();
    make_strong(&mut agent, b).unwrap();
    let strong = a.map(&agent);
    assert_eq!(b.map(&agent), strong);
    assert!(a.has_fast_properties(&agent));
    assert!(strong.is_strong(&agent));
    assert!(is_sealed(&mut agent, a.into_object()).unwrap());

    // Storing a double widens the field through the strong object's own
    // transition chain.
    let x = key(&mut agent, "x");
    set(&mut agent, a.into_object(), x, Value::Number(0.5), true).unwrap();
    let widened = a.map(&agent);
    assert_ne!(widened, strong);
    assert!(strong.is_deprecated(&agent));
    assert!(widened.is_strong(&agent));
    assert!(!widened.is_extensible(&agent));
    assert!(a.has_fast_properties(&agent));
    assert_eq!(update(&mut agent, strong), widened);
    assert_eq!(update(&mut agent, strong), widened);

    assert_eq!(get_named(&mut agent, b, "x"), Value::Integer(2));
    assert_eq!(b.map(&agent), widened);
    assert_eq!(get_named(&mut agent, a, "x"), Value::Number(0.5));
    assert!(is_sealed(&mut agent, b.into_object()).unwrap());
}

#[test]
fn updating_a_map_below_an_elements_transition_is_idempotent() {
    let mut agent = agent();
    let make = |agent: &mut Agent, x: Value| {
        let array = create_array_from_list(agent, &[Value::Number(1.5)]);
        let key = key(agent, "x");
        create_data_property_or_throw(agent, array.into_object(), key, x).unwrap();
        array
    };
    let a = make(&mut agent, Value::Integer(1));
    let b = make(&mut agent, Value::Integer(2));
    let old_map = a.map(&agent);
    assert_eq!(b.map(&agent), old_map);
    assert_eq!(old_map.elements_kind(&agent), ElementsKind::PackedDouble);

    let _sibling = make(&mut agent, Value::Number(0.5));
    assert!(old_map.is_deprecated(&agent));
    let updated = update(&mut agent, old_map);
    assert_eq!(update(&mut agent, old_map), updated);
    assert_eq!(updated.elements_kind(&agent), ElementsKind::PackedDouble);

    assert_eq!(get_named(&mut agent, a, "x"), Value::Integer(1));
    assert_eq!(get_named(&mut agent, b, "x"), Value::Integer(2));
    assert_eq!(a.map(&agent), updated);
    assert_eq!(b.map(&agent), updated);
}

#[test]
fn stores_of_the_same_representation_keep_the_map() {
    let mut agent = agent();
    let object = object_with(&mut agent, &[("x", Value::Integer(1))]);
    let map = object.map(&agent);
    let x = key(&mut agent, "x");
    set(&mut agent, object.into_object(), x, Value::Integer(-7), true).unwrap();
    assert_eq!(object.map(&agent), map);
    assert_eq!(get_named(&mut agent, object, "x"), Value::Integer(-7));
}

#[test]
fn transition_fan_out_is_bounded() {
    let mut agent = Agent::new(Options {
        max_number_of_transitions: 64,
        ..Default::default()
    });
    let root = ordinary_object_create_with_intrinsics(&mut agent).map(&agent);
    let mut maps = Vec::new();
    for i in 0..200 {
        let name = format!("p{i}");
        let object = object_with(&mut agent, &[(name.as_str(), Value::Integer(i))]);
        maps.push(object.map(&agent));
    }
    assert_eq!(root.number_of_transitions(&agent), 64);
    let connected = maps
        .iter()
        .filter(|map| map.back_pointer(&agent) == Some(root))
        .count();
    assert_eq!(connected, 64);
    for map in &maps[64..] {
        assert!(map.back_pointer(&agent).is_none());
        let details = map.descriptors(&agent).get_details(agent.heap(), 0);
        assert_eq!(details.representation(), Representation::Tagged);
    }

    // Disconnected shapes are never shared.
    let again = object_with(&mut agent, &[("p150", Value::Integer(0))]);
    assert_ne!(again.map(&agent), maps[150]);
}

#[test]
fn elements_kinds_only_generalize() {
    for from in FAST_ELEMENTS_KINDS {
        for to in FAST_ELEMENTS_KINDS {
            if from.is_holey() && !to.is_holey() {
                assert!(!is_valid_elements_transition(from, to), "{from:?} -> {to:?}");
            }
            if is_valid_elements_transition(from, to) {
                assert!(!is_valid_elements_transition(to, from) || from == to);
            }
        }
    }
}

#[test]
fn indexed_stores_move_along_the_elements_lattice() {
    let mut agent = agent();
    let array = create_array_from_list(&mut agent, &[]);
    let o = array.into_object();
    assert_eq!(array.map(&agent).elements_kind(&agent), ElementsKind::PackedSmi);
    let zero = key(&mut agent, "0");
    create_data_property_or_throw(&mut agent, o, zero, Value::Integer(1)).unwrap();
    assert_eq!(array.map(&agent).elements_kind(&agent), ElementsKind::PackedSmi);
    let one = key(&mut agent, "1");
    create_data_property_or_throw(&mut agent, o, one, Value::Number(1.5)).unwrap();
    assert_eq!(array.map(&agent).elements_kind(&agent), ElementsKind::PackedDouble);
    let three = key(&mut agent, "3");
    create_data_property_or_throw(&mut agent, o, three, Value::Null).unwrap();
    assert_eq!(array.map(&agent).elements_kind(&agent), ElementsKind::Holey);
    assert_eq!(array_length(&agent, array), 4);
    assert_eq!(get_named(&mut agent, array, "1"), Value::Number(1.5));
    assert_eq!(get_named(&mut agent, array, "2"), Value::Undefined);

    let first = create_array_from_list(&mut agent, &[Value::Integer(1), Value::Number(2.5)]);
    let second = create_array_from_list(&mut agent, &[Value::Integer(3), Value::Number(0.5)]);
    assert_eq!(first.map(&agent).elements_kind(&agent), ElementsKind::PackedDouble);
    assert_eq!(first.map(&agent), second.map(&agent));
}
