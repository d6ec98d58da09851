// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [19 The Global Object](https://tc39.es/ecma262/#sec-global-object)
//!
//! The global object keeps its properties in a `GlobalDictionary` of
//! `PropertyCell`s. Script code reaches it through unqualified names:
//! reading an undeclared name is a ReferenceError, and so is assigning to
//! one in strict mode. Sloppy assignment creates the property.

use crate::ecmascript::{
    abstract_operations::{
        lookup_iterator::{Configuration, LookupIterator},
        operations_on_objects::{
            define_own_property_ignore_attributes, get_property, has_property_via_iterator,
            set_property,
        },
    },
    builtins::ordinary::{
        global_dictionary::{PropertyCell, find_cell},
        map_transitions::StoreOrigin,
        property_details::PropertyAttributes,
    },
    execution::{Agent, ExceptionType, JsError, JsResult, LanguageMode},
    types::{PropertyKey, Value},
};

fn not_defined(agent: &mut Agent, key: PropertyKey) -> JsError {
    let message = format!("{} is not defined", key.as_display(agent));
    agent.throw_exception(ExceptionType::ReferenceError, message)
}

/// Resolve the unqualified name `key` against the global object.
pub fn get_global(agent: &mut Agent, key: PropertyKey) -> JsResult<Value> {
    let global = agent.global_object();
    let mut it = LookupIterator::new(
        agent,
        global.into_value(),
        key,
        Configuration::PrototypeChain,
    );
    if !has_property_via_iterator(agent, &mut it)? {
        return Err(not_defined(agent, key));
    }
    it.restart(agent);
    get_property(agent, &mut it)
}

/// Assign `value` to the unqualified name `key`.
pub fn set_global(
    agent: &mut Agent,
    key: PropertyKey,
    value: Value,
    language_mode: LanguageMode,
) -> JsResult<()> {
    let global = agent.global_object();
    let mut it = LookupIterator::new(
        agent,
        global.into_value(),
        key,
        Configuration::PrototypeChain,
    );
    if language_mode.is_strict() {
        if !has_property_via_iterator(agent, &mut it)? {
            return Err(not_defined(agent, key));
        }
        it.restart(agent);
    }
    set_property(agent, &mut it, value, language_mode, StoreOrigin::Named)?;
    Ok(())
}

/// Declare a `var` binding on the global object, as CreateGlobalVarBinding
/// does. Declared bindings are not deletable unless `deletable` is set.
pub fn declare_global_var(
    agent: &mut Agent,
    key: PropertyKey,
    value: Value,
    deletable: bool,
) -> JsResult<bool> {
    let global = agent.global_object();
    let mut it = LookupIterator::new(
        agent,
        global.into_value(),
        key,
        Configuration::OwnSkipInterceptor,
    );
    if it.is_found() {
        return Ok(false);
    }
    let attributes = if deletable {
        PropertyAttributes::NONE
    } else {
        PropertyAttributes::DONT_DELETE
    };
    define_own_property_ignore_attributes(agent, &mut it, value, attributes)
}

/// The cell backing the global property `key`, if there is one.
pub fn global_property_cell(agent: &Agent, key: PropertyKey) -> Option<PropertyCell> {
    find_cell(agent, agent.global_object(), key)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ecmascript::{
        abstract_operations::operations_on_objects::delete_property_or_throw,
        builtins::ordinary::property_details::PropertyCellType, execution::Options,
    };

    #[test]
    fn undeclared_reads_are_reference_errors() {
        let mut agent = Agent::new(Options::default());
        let key = PropertyKey::from_str(&mut agent, "missing");
        let error = get_global(&mut agent, key).unwrap_err();
        assert_eq!(error.exception_type(&agent), Some(ExceptionType::ReferenceError));
        assert_eq!(error.message(&mut agent).unwrap(), "missing is not defined");
    }

    #[test]
    fn strict_assignment_requires_a_binding() {
        let mut agent = Agent::new(Options::default());
        let key = PropertyKey::from_str(&mut agent, "x");
        let error = set_global(&mut agent, key, Value::Integer(1), LanguageMode::Strict).unwrap_err();
        assert_eq!(error.exception_type(&agent), Some(ExceptionType::ReferenceError));
        set_global(&mut agent, key, Value::Integer(1), LanguageMode::Sloppy).unwrap();
        set_global(&mut agent, key, Value::Integer(2), LanguageMode::Strict).unwrap();
        assert_eq!(get_global(&mut agent, key).unwrap(), Value::Integer(2));
    }

    #[test]
    fn globals_live_in_cells() {
        let mut agent = Agent::new(Options::default());
        let key = PropertyKey::from_str(&mut agent, "answer");
        assert!(declare_global_var(&mut agent, key, Value::Integer(42), true).unwrap());
        let cell = global_property_cell(&agent, key).unwrap();
        assert_eq!(cell.cell_type(&agent), PropertyCellType::Constant);
        set_global(&mut agent, key, Value::Integer(43), LanguageMode::Strict).unwrap();
        assert_ne!(cell.cell_type(&agent), PropertyCellType::Constant);
        let global = agent.global_object().into_object();
        delete_property_or_throw(&mut agent, global, key).unwrap();
        assert!(cell.is_the_hole(&agent));
        assert!(get_global(&mut agent, key).is_err());
    }

    #[test]
    fn declared_vars_are_not_deletable() {
        let mut agent = Agent::new(Options::default());
        let key = PropertyKey::from_str(&mut agent, "v");
        declare_global_var(&mut agent, key, Value::Undefined, false).unwrap();
        let global = agent.global_object().into_object();
        assert!(delete_property_or_throw(&mut agent, global, key).is_err());
    }

    #[test]
    fn value_properties_are_read_only() {
        let mut agent = Agent::new(Options::default());
        let key = PropertyKey::from_str(&mut agent, "undefined");
        assert!(set_global(&mut agent, key, Value::Integer(1), LanguageMode::Strict).is_err());
        assert_eq!(get_global(&mut agent, key).unwrap(), Value::Undefined);
    }
}
