// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod common;

use common::{agent, key};
use nova_objects::ecmascript::{
    abstract_operations::operations_on_objects::{
        delete_property_or_throw, get_own_property_descriptor, own_property_keys,
    },
    builtins::{
        global_object::{declare_global_var, get_global, global_property_cell, set_global},
        ordinary::{
            integrity::freeze, migration::migrate_slow_to_fast,
            property_details::PropertyCellType,
        },
    },
    execution::{ExceptionType, LanguageMode},
    types::{String, Value},
};

#[test]
fn cells_generalize_with_the_values_they_hold() {
    let mut agent = agent();
    let counter = key(&mut agent, "counter");
    declare_global_var(&mut agent, counter, Value::Integer(1), true).unwrap();
    let cell = global_property_cell(&agent, counter).unwrap();
    assert_eq!(cell.cell_type(&agent), PropertyCellType::Constant);

    let constant = agent.register_code();
    cell.add_dependent_code(&mut agent, constant);
    set_global(&mut agent, counter, Value::Integer(1), LanguageMode::Strict).unwrap();
    assert_eq!(cell.cell_type(&agent), PropertyCellType::Constant);
    assert!(agent.deoptimized_code().is_empty());

    set_global(&mut agent, counter, Value::Integer(2), LanguageMode::Strict).unwrap();
    assert_eq!(cell.cell_type(&agent), PropertyCellType::ConstantType);
    assert_eq!(agent.take_deoptimized_code(), vec![constant]);

    let typed = agent.register_code();
    cell.add_dependent_code(&mut agent, typed);
    let text = Value::String(String::from_str(&mut agent, "three"));
    set_global(&mut agent, counter, text, LanguageMode::Strict).unwrap();
    assert_eq!(cell.cell_type(&agent), PropertyCellType::Mutable);
    assert_eq!(agent.take_deoptimized_code(), vec![typed]);
    assert_eq!(global_property_cell(&agent, counter), Some(cell));
    assert_eq!(get_global(&mut agent, counter).unwrap(), text);
}

#[test]
fn deletion_invalidates_the_cell() {
    let mut agent = agent();
    let name = key(&mut agent, "temporary");
    declare_global_var(&mut agent, name, Value::Integer(5), true).unwrap();
    let cell = global_property_cell(&agent, name).unwrap();
    let code = agent.register_code();
    cell.add_dependent_code(&mut agent, code);

    let global = agent.global_object().into_object();
    delete_property_or_throw(&mut agent, global, name).unwrap();
    assert!(agent.deoptimized_code().contains(&code));
    assert!(cell.is_the_hole(&agent));
    assert_eq!(cell.cell_type(&agent), PropertyCellType::Invalidated);
    let error = get_global(&mut agent, name).unwrap_err();
    assert_eq!(error.exception_type(&agent), Some(ExceptionType::ReferenceError));

    // Re-adding the property uses a fresh cell and enumerates it last.
    set_global(&mut agent, name, Value::Integer(6), LanguageMode::Sloppy).unwrap();
    let fresh = global_property_cell(&agent, name).unwrap();
    assert_ne!(fresh, cell);
    assert!(!fresh.is_the_hole(&agent));
    assert_eq!(get_global(&mut agent, name).unwrap(), Value::Integer(6));
    let keys = own_property_keys(&mut agent, global).unwrap();
    assert_eq!(keys.last(), Some(&name));
}

#[test]
fn the_global_object_stays_in_dictionary_mode() {
    let mut agent = agent();
    let global = agent.global_object();
    assert!(global.is_global(&agent));
    assert!(global.map(&agent).is_dictionary_map(&agent));
    migrate_slow_to_fast(&mut agent, global, 0, "test");
    assert!(global.map(&agent).is_dictionary_map(&agent));
    assert!(!global.has_fast_properties(&agent));
}

#[test]
fn value_properties_and_global_this() {
    let mut agent = agent();
    let nan = key(&mut agent, "NaN");
    let Value::Number(number) = get_global(&mut agent, nan).unwrap() else {
        panic!("NaN is a number");
    };
    assert!(number.is_nan());
    let infinity = key(&mut agent, "Infinity");
    let global = agent.global_object();
    let desc = get_own_property_descriptor(&mut agent, global.into_object(), infinity)
        .unwrap()
        .unwrap();
    assert_eq!(desc.value, Some(Value::Number(f64::INFINITY)));
    assert_eq!(desc.writable, Some(false));
    assert_eq!(desc.configurable, Some(false));

    let global_this = key(&mut agent, "globalThis");
    assert_eq!(get_global(&mut agent, global_this).unwrap(), global.into_value());
}

#[test]
fn undeclared_names_depend_on_language_mode() {
    let mut agent = agent();
    let name = key(&mut agent, "implicit");
    let error = set_global(&mut agent, name, Value::Boolean(true), LanguageMode::Strict).unwrap_err();
    assert_eq!(error.exception_type(&agent), Some(ExceptionType::ReferenceError));
    assert_eq!(error.message(&mut agent).as_deref(), Some("implicit is not defined"));
    assert!(global_property_cell(&agent, name).is_none());

    set_global(&mut agent, name, Value::Boolean(true), LanguageMode::Sloppy).unwrap();
    assert_eq!(get_global(&mut agent, name).unwrap(), Value::Boolean(true));
    // Implicit globals can be deleted again.
    let global = agent.global_object().into_object();
    delete_property_or_throw(&mut agent, global, name).unwrap();
}

#[test]
fn frozen_globals_keep_their_values() {
    let mut agent = agent();
    let name = key(&mut agent, "settled");
    declare_global_var(&mut agent, name, Value::Integer(1), false).unwrap();
    let global = agent.global_object().into_object();
    assert!(freeze(&mut agent, global).unwrap());

    let error = set_global(&mut agent, name, Value::Integer(2), LanguageMode::Strict).unwrap_err();
    assert_eq!(error.exception_type(&agent), Some(ExceptionType::TypeError));
    set_global(&mut agent, name, Value::Integer(2), LanguageMode::Sloppy).unwrap();
    assert_eq!(get_global(&mut agent, name).unwrap(), Value::Integer(1));

    let other = key(&mut agent, "late");
    set_global(&mut agent, other, Value::Integer(3), LanguageMode::Sloppy).unwrap();
    assert!(global_property_cell(&agent, other).is_none());
}
