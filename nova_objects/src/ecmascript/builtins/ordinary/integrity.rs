// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## Integrity levels
//!
//! Preventing extensions keeps an object fast: it follows the special
//! `NonExtensible` transition, so objects of one shape made non-extensible
//! together keep sharing a Map. Making an object strong does the same
//! through the `Strong` transition. Sealing and freezing normalize the
//! object and then rewrite the attributes of every dictionary entry.

use super::{
    descriptor_array::Accessor,
    dictionary::DictionaryValue,
    elements::{add_attributes_to_elements, prevent_elements_extensions},
    global_dictionary::{global_iteration_order, update_cell},
    is_access_allowed,
    map::{Map, MapFlags},
    map_transitions::{NormalizationMode, transition_to_integrity_level},
    migration::{migrate_to_map, normalize_properties, publish_map},
    property_details::PropertyAttributes,
    prototype::reoptimize_if_prototype,
    transitions::SpecialTransition,
};
use crate::{
    ecmascript::{
        abstract_operations::operations_on_objects::{
            define_property_or_throw, report_failed_access_check,
        },
        builtins::typed_array::typed_array_length,
        execution::{Agent, ExceptionType, JsResult, ShouldThrow, embedder::AccessType},
        types::{InternalMethods, Object, OrdinaryObject, PropertyDescriptor, PropertyStorage},
    },
    heap::heap_observer::WriteLocation,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityLevel {
    Sealed,
    Frozen,
}

impl IntegrityLevel {
    fn attributes(self) -> PropertyAttributes {
        match self {
            IntegrityLevel::Sealed => PropertyAttributes::SEALED,
            IntegrityLevel::Frozen => PropertyAttributes::FROZEN,
        }
    }
}

fn fail(agent: &mut Agent, should_throw: ShouldThrow, message: &'static str) -> JsResult<bool> {
    match should_throw {
        ShouldThrow::ThrowOnError => Err(agent.throw_exception_with_static_message(
            ExceptionType::TypeError,
            message,
        )),
        ShouldThrow::DontThrow => Ok(false),
    }
}

/// ### [10.1.3.1 OrdinaryIsExtensible ( O )](https://tc39.es/ecma262/#sec-ordinaryisextensible)
pub fn is_extensible(agent: &mut Agent, o: OrdinaryObject) -> bool {
    if !is_access_allowed(agent, o) {
        return false;
    }
    // 1. Return O.[[Extensible]].
    o.map(agent).is_extensible(agent)
}

/// ### [10.1.4.1 OrdinaryPreventExtensions ( O )](https://tc39.es/ecma262/#sec-ordinarypreventextensions)
pub fn prevent_extensions(
    agent: &mut Agent,
    o: OrdinaryObject,
    should_throw: ShouldThrow,
) -> JsResult<bool> {
    if !is_access_allowed(agent, o) {
        report_failed_access_check(agent, o, AccessType::Set)?;
        return Ok(false);
    }
    let map = o.map(agent);
    if map.has_named_interceptor(agent) || map.has_indexed_interceptor(agent) {
        return fail(agent, should_throw, "Cannot prevent extensions");
    }
    if !map.is_extensible(agent) {
        return Ok(true);
    }

    prevent_elements_extensions(agent, o);

    // 1. Set O.[[Extensible]] to false.
    let map = o.map(agent);
    if o.has_fast_properties(agent) {
        let new_map = transition_to_integrity_level(
            agent,
            map,
            SpecialTransition::NonExtensible,
            "PreventExtensions",
        );
        migrate_to_map(agent, o, new_map, 0);
    } else {
        let new_map = Map::copy_drop_descriptors(agent, map);
        new_map.set_flag(&mut agent.heap, MapFlags::EXTENSIBLE, false);
        publish_map(agent, o, new_map);
    }
    debug_assert!(!o.map(agent).is_extensible(agent));

    // 2. Return true.
    Ok(true)
}

/// The attributes an entry holding `value` gains at an integrity level.
/// Accessor pairs have no writability.
fn attributes_for(value: DictionaryValue, attributes: PropertyAttributes) -> PropertyAttributes {
    match value {
        DictionaryValue::Accessor(Accessor::Pair(_)) => {
            attributes.difference(PropertyAttributes::READ_ONLY)
        }
        _ => attributes,
    }
}

fn set_ordinary_integrity_level(
    agent: &mut Agent,
    o: OrdinaryObject,
    level: IntegrityLevel,
) -> JsResult<bool> {
    if level == IntegrityLevel::Frozen
        && o.is_typed_array(agent)
        && typed_array_length(agent, o).is_some_and(|length| length > 0)
    {
        return Err(agent.throw_exception_with_static_message(
            ExceptionType::TypeError,
            "Cannot freeze array buffer views with elements",
        ));
    }
    if !prevent_extensions(agent, o, ShouldThrow::DontThrow)? {
        return Ok(false);
    }
    let attributes = level.attributes();

    if o.is_global(agent) {
        for cell in global_iteration_order(agent, o) {
            let Some(value) = cell.value(agent) else {
                continue;
            };
            let details = cell
                .details(agent)
                .copy_add_attributes(attributes_for(value, attributes));
            update_cell(agent, o, cell.key(agent), value, details);
        }
    } else {
        normalize_properties(
            agent,
            o,
            NormalizationMode::ClearInObjectProperties,
            0,
            "SetIntegrityLevel",
        );
        if let PropertyStorage::Dictionary(dictionary) = &mut agent[o].properties {
            for (_, entry) in dictionary.iter_mut() {
                entry.details = entry
                    .details
                    .copy_add_attributes(attributes_for(entry.value, attributes));
            }
        }
        agent.heap.record_write(WriteLocation::Properties(o));
    }

    add_attributes_to_elements(agent, o, attributes);
    reoptimize_if_prototype(agent, o);
    log::trace!("[{o:?} is now {level:?}]");
    Ok(true)
}

/// ### [7.3.15 SetIntegrityLevel ( O, level )](https://tc39.es/ecma262/#sec-setintegritylevel)
pub fn set_integrity_level(agent: &mut Agent, o: Object, level: IntegrityLevel) -> JsResult<bool> {
    let o = match o {
        Object::Object(o) => return set_ordinary_integrity_level(agent, o, level),
        Object::Proxy(_) => o,
    };
    // 1. Let status be ? O.[[PreventExtensions]]().
    // 2. If status is false, return false.
    if !o.internal_prevent_extensions(agent)? {
        return Ok(false);
    }
    // 3. Let keys be ? O.[[OwnPropertyKeys]]().
    let keys = o.internal_own_property_keys(agent)?;
    for k in keys {
        let desc = match level {
            // 4. If level is SEALED, then
            //    a. For each element k of keys, do
            //       i. Perform ? DefinePropertyOrThrow(O, k, PropertyDescriptor { [[Configurable]]: false }).
            IntegrityLevel::Sealed => PropertyDescriptor {
                configurable: Some(false),
                ..Default::default()
            },
            // 5. Else,
            //    b. For each element k of keys, do
            //       i. Let currentDesc be ? O.[[GetOwnProperty]](k).
            //       ii. If currentDesc is not undefined, then
            IntegrityLevel::Frozen => {
                let Some(current) = o.internal_get_own_property(agent, k)? else {
                    continue;
                };
                if current.is_accessor_descriptor() {
                    // 1. If IsAccessorDescriptor(currentDesc) is true, then
                    //    a. Let desc be the PropertyDescriptor { [[Configurable]]: false }.
                    PropertyDescriptor {
                        configurable: Some(false),
                        ..Default::default()
                    }
                } else {
                    // 2. Else,
                    //    a. Let desc be the PropertyDescriptor { [[Configurable]]: false, [[Writable]]: false }.
                    PropertyDescriptor {
                        configurable: Some(false),
                        writable: Some(false),
                        ..Default::default()
                    }
                }
            }
        };
        //    3. Perform ? DefinePropertyOrThrow(O, k, desc).
        define_property_or_throw(agent, o, k, desc)?;
    }
    // 6. Return true.
    Ok(true)
}

/// ### [7.3.16 TestIntegrityLevel ( O, level )](https://tc39.es/ecma262/#sec-testintegritylevel)
pub fn test_integrity_level(agent: &mut Agent, o: Object, level: IntegrityLevel) -> JsResult<bool> {
    // 1. Let extensible be ? IsExtensible(O).
    // 2. If extensible is true, return false.
    if o.internal_is_extensible(agent)? {
        return Ok(false);
    }
    // 3. NOTE: If the object is extensible, none of its properties are examined.
    // 4. Let keys be ? O.[[OwnPropertyKeys]]().
    let keys = o.internal_own_property_keys(agent)?;
    // 5. For each element k of keys, do
    for k in keys {
        // a. Let currentDesc be ? O.[[GetOwnProperty]](k).
        // b. If currentDesc is not undefined, then
        if let Some(current) = o.internal_get_own_property(agent, k)? {
            // i. If currentDesc.[[Configurable]] is true, return false.
            if current.configurable == Some(true) {
                return Ok(false);
            }
            // ii. If level is FROZEN and IsDataDescriptor(currentDesc) is true, then
            //     1. If currentDesc.[[Writable]] is true, return false.
            if level == IntegrityLevel::Frozen
                && current.is_data_descriptor()
                && current.writable == Some(true)
            {
                return Ok(false);
            }
        }
    }
    // 6. Return true.
    Ok(true)
}

pub fn seal(agent: &mut Agent, o: Object) -> JsResult<bool> {
    set_integrity_level(agent, o, IntegrityLevel::Sealed)
}

pub fn freeze(agent: &mut Agent, o: Object) -> JsResult<bool> {
    set_integrity_level(agent, o, IntegrityLevel::Frozen)
}

pub fn is_sealed(agent: &mut Agent, o: Object) -> JsResult<bool> {
    test_integrity_level(agent, o, IntegrityLevel::Sealed)
}

pub fn is_frozen(agent: &mut Agent, o: Object) -> JsResult<bool> {
    test_integrity_level(agent, o, IntegrityLevel::Frozen)
}

/// Seal `o` and mark its Map strong. Reading a missing property of a strong
/// object throws, and so does every failed write to one.
///
/// A fast object stays fast: it follows the `Strong` transition, which seals
/// its descriptors, so objects of one shape made strong keep sharing a Map.
pub fn make_strong(agent: &mut Agent, o: OrdinaryObject) -> JsResult<()> {
    if o.map(agent).is_strong(agent) {
        return Ok(());
    }
    if o.has_fast_properties(agent) {
        if !prevent_extensions(agent, o, ShouldThrow::DontThrow)? {
            return Err(agent.throw_exception_with_static_message(
                ExceptionType::TypeError,
                "Cannot make object strong",
            ));
        }
        add_attributes_to_elements(agent, o, PropertyAttributes::SEALED);
        let map = o.map(agent);
        debug_assert!(!map.is_dictionary_map(agent));
        let new_map =
            transition_to_integrity_level(agent, map, SpecialTransition::Strong, "MakeStrong");
        migrate_to_map(agent, o, new_map, 0);
        log::trace!("[{o:?} is now strong with {new_map:?}]");
        return Ok(());
    }
    if !set_ordinary_integrity_level(agent, o, IntegrityLevel::Sealed)? {
        return Err(agent.throw_exception_with_static_message(
            ExceptionType::TypeError,
            "Cannot make object strong",
        ));
    }
    let map = o.map(agent);
    let new_map = Map::copy_drop_descriptors(agent, map);
    new_map.set_flag(&mut agent.heap, MapFlags::STRONG, true);
    publish_map(agent, o, new_map);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ecmascript::{
        abstract_operations::operations_on_objects::{
            create_data_property_or_throw, delete_property_or_throw, get,
            get_own_property_descriptor, set,
        },
        builtins::{
            global_object::{get_global, set_global},
            ordinary::{elements_kind::ElementsKind, ordinary_object_create_with_intrinsics},
            typed_array::create_typed_array_with_length,
        },
        execution::{LanguageMode, Options},
        types::{PropertyKey, Value},
    };

    fn object_with_x(agent: &mut Agent) -> (OrdinaryObject, PropertyKey) {
        let object = ordinary_object_create_with_intrinsics(agent);
        let x = PropertyKey::from_str(agent, "x");
        create_data_property_or_throw(agent, object.into_object(), x, Value::Integer(1)).unwrap();
        (object, x)
    }

    #[test]
    fn prevent_extensions_stays_fast_and_shares_maps() {
        let mut agent = Agent::new(Options::default());
        let (first, _) = object_with_x(&mut agent);
        let (second, _) = object_with_x(&mut agent);
        assert!(prevent_extensions(&mut agent, first, ShouldThrow::ThrowOnError).unwrap());
        assert!(prevent_extensions(&mut agent, second, ShouldThrow::ThrowOnError).unwrap());
        assert!(first.has_fast_properties(&agent));
        assert_eq!(first.map(&agent), second.map(&agent));
        assert!(!is_extensible(&mut agent, first));

        let y = PropertyKey::from_str(&mut agent, "y");
        assert!(set(&mut agent, first.into_object(), y, Value::Integer(2), true).is_err());
        set(&mut agent, first.into_object(), y, Value::Integer(2), false).unwrap();
        assert_eq!(get(&mut agent, first.into_object(), y).unwrap(), Value::Undefined);
    }

    #[test]
    fn freezing_normalizes_and_rejects_writes() {
        let mut agent = Agent::new(Options::default());
        let (object, x) = object_with_x(&mut agent);
        let o = object.into_object();
        assert!(freeze(&mut agent, o).unwrap());
        assert!(!object.has_fast_properties(&agent));
        let desc = get_own_property_descriptor(&mut agent, o, x).unwrap().unwrap();
        assert_eq!(desc.writable, Some(false));
        assert_eq!(desc.configurable, Some(false));

        let error = set(&mut agent, o, x, Value::Integer(2), true).unwrap_err();
        assert_eq!(error.exception_type(&agent), Some(ExceptionType::TypeError));
        set(&mut agent, o, x, Value::Integer(2), false).unwrap();
        assert_eq!(get(&mut agent, o, x).unwrap(), Value::Integer(1));
        assert!(is_frozen(&mut agent, o).unwrap());
        assert!(is_sealed(&mut agent, o).unwrap());
    }

    #[test]
    fn sealed_properties_stay_writable() {
        let mut agent = Agent::new(Options::default());
        let (object, x) = object_with_x(&mut agent);
        let o = object.into_object();
        assert!(seal(&mut agent, o).unwrap());
        set(&mut agent, o, x, Value::Integer(5), true).unwrap();
        assert_eq!(get(&mut agent, o, x).unwrap(), Value::Integer(5));
        assert!(delete_property_or_throw(&mut agent, o, x).is_err());
        assert!(is_sealed(&mut agent, o).unwrap());
        assert!(!is_frozen(&mut agent, o).unwrap());
    }

    #[test]
    fn frozen_accessors_keep_their_functions() {
        let mut agent = Agent::new(Options::default());
        let object = ordinary_object_create_with_intrinsics(&mut agent);
        let getter = ordinary_object_create_with_intrinsics(&mut agent).into_object();
        let key = PropertyKey::from_str(&mut agent, "a");
        define_property_or_throw(
            &mut agent,
            object.into_object(),
            key,
            PropertyDescriptor {
                get: Some(Some(getter)),
                set: Some(None),
                enumerable: Some(true),
                configurable: Some(true),
                ..Default::default()
            },
        )
        .unwrap();
        freeze(&mut agent, object.into_object()).unwrap();
        let desc = get_own_property_descriptor(&mut agent, object.into_object(), key)
            .unwrap()
            .unwrap();
        assert!(desc.is_accessor_descriptor());
        assert_eq!(desc.get, Some(Some(getter)));
        assert_eq!(desc.configurable, Some(false));
    }

    #[test]
    fn empty_non_extensible_objects_are_frozen() {
        let mut agent = Agent::new(Options::default());
        let object = ordinary_object_create_with_intrinsics(&mut agent);
        assert!(!is_frozen(&mut agent, object.into_object()).unwrap());
        prevent_extensions(&mut agent, object, ShouldThrow::ThrowOnError).unwrap();
        assert!(is_frozen(&mut agent, object.into_object()).unwrap());
    }

    #[test]
    fn frozen_elements_are_read_only() {
        let mut agent = Agent::new(Options::default());
        let object = ordinary_object_create_with_intrinsics(&mut agent);
        let o = object.into_object();
        let zero = PropertyKey::Integer(0);
        create_data_property_or_throw(&mut agent, o, zero, Value::Integer(7)).unwrap();
        freeze(&mut agent, o).unwrap();
        assert!(set(&mut agent, o, zero, Value::Integer(8), true).is_err());
        assert_eq!(get(&mut agent, o, zero).unwrap(), Value::Integer(7));
        assert!(is_frozen(&mut agent, o).unwrap());
    }

    #[test]
    fn typed_arrays_with_elements_cannot_be_frozen() {
        let mut agent = Agent::new(Options::default());
        let array = create_typed_array_with_length(&mut agent, ElementsKind::Int32, 2).unwrap();
        let error = freeze(&mut agent, array.into_object()).unwrap_err();
        assert_eq!(error.exception_type(&agent), Some(ExceptionType::TypeError));
        assert!(seal(&mut agent, array.into_object()).unwrap());
        let empty = create_typed_array_with_length(&mut agent, ElementsKind::Int32, 0).unwrap();
        assert!(freeze(&mut agent, empty.into_object()).unwrap());
    }

    #[test]
    fn frozen_globals_reject_strict_assignment() {
        let mut agent = Agent::new(Options::default());
        let key = PropertyKey::from_str(&mut agent, "g");
        set_global(&mut agent, key, Value::Integer(1), LanguageMode::Sloppy).unwrap();
        let global = agent.global_object();
        assert!(freeze(&mut agent, global.into_object()).unwrap());
        assert!(set_global(&mut agent, key, Value::Integer(2), LanguageMode::Strict).is_err());
        assert_eq!(get_global(&mut agent, key).unwrap(), Value::Integer(1));
    }

    #[test]
    fn strong_objects_throw_on_misses() {
        let mut agent = Agent::new(Options::default());
        let (object, x) = object_with_x(&mut agent);
        let o = object.into_object();
        make_strong(&mut agent, object).unwrap();
        assert!(object.map(&agent).is_strong(&agent));
        assert!(object.has_fast_properties(&agent));
        set(&mut agent, o, x, Value::Integer(3), false).unwrap();
        assert_eq!(get(&mut agent, o, x).unwrap(), Value::Integer(3));

        let missing = PropertyKey::from_str(&mut agent, "missing");
        let error = get(&mut agent, o, missing).unwrap_err();
        assert_eq!(error.exception_type(&agent), Some(ExceptionType::TypeError));
        assert!(set(&mut agent, o, missing, Value::Integer(1), false).is_err());
        assert!(delete_property_or_throw(&mut agent, o, x).is_err());
    }
}
