// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod common;

use std::{cell::Cell, rc::Rc};

use common::{agent, get_named, key, object_with};
use nova_objects::ecmascript::{
    abstract_operations::operations_on_objects::{
        create_data_property_or_throw, define_property_or_throw, get, get_own_property_descriptor,
        has_own_property, own_property_keys, set,
    },
    builtins::{
        builtin_function::create_builtin_function,
        ordinary::{
            integrity::{is_sealed, make_strong},
            object_create, ordinary_object_create_from_template,
            property_details::PropertyAttributes,
        },
    },
    execution::{
        Agent, ExceptionType,
        embedder::{
            AccessCheckInfo, AccessType, AccessorInfo, InterceptorInfo, NativeAccessor,
            ObjectTemplate, ObjectTemplateRecord,
        },
    },
    types::{PropertyDescriptor, Value},
};

fn denying_template(agent: &mut Agent, accessors: Vec<(NativeAccessor, PropertyAttributes)>) -> ObjectTemplate {
    ObjectTemplate::new(
        agent,
        ObjectTemplateRecord {
            access_check: Some(AccessCheckInfo {
                callback: Rc::new(|_, _, _| false),
                named_interceptor: None,
                indexed_interceptor: None,
                data: Value::Undefined,
            }),
            accessors,
            ..Default::default()
        },
    )
}

#[test]
fn throwing_getter_leaves_the_object_untouched() {
    let mut agent = agent();
    let calls = Rc::new(Cell::new(0));
    let counted = calls.clone();
    let getter = create_builtin_function(
        &mut agent,
        move |agent, _, _| {
            counted.set(counted.get() + 1);
            Err(agent.throw_exception_with_static_message(ExceptionType::RangeError, "nope"))
        },
        "get",
        0,
    );
    let object = object_with(&mut agent, &[("a", Value::Integer(1))]);
    let x = key(&mut agent, "x");
    define_property_or_throw(
        &mut agent,
        object.into_object(),
        x,
        PropertyDescriptor {
            get: Some(Some(getter.into_object())),
            configurable: Some(true),
            ..Default::default()
        },
    )
    .unwrap();
    let map = object.map(&agent);
    let keys = own_property_keys(&mut agent, object.into_object()).unwrap();

    let error = get(&mut agent, object.into_object(), x).unwrap_err();
    assert_eq!(error.exception_type(&agent), Some(ExceptionType::RangeError));
    assert_eq!(error.message(&mut agent).as_deref(), Some("nope"));
    assert_eq!(calls.get(), 1);
    assert_eq!(object.map(&agent), map);
    assert_eq!(own_property_keys(&mut agent, object.into_object()).unwrap(), keys);
    assert_eq!(get_named(&mut agent, object, "a"), Value::Integer(1));
}

#[test]
fn inherited_throwing_getter_stops_the_walk() {
    let mut agent = agent();
    let getter = create_builtin_function(
        &mut agent,
        |agent, _, _| Err(agent.throw_exception_with_static_message(ExceptionType::Error, "boom")),
        "get",
        0,
    );
    let prototype = object_with(&mut agent, &[]);
    let x = key(&mut agent, "x");
    define_property_or_throw(
        &mut agent,
        prototype.into_object(),
        x,
        PropertyDescriptor {
            get: Some(Some(getter.into_object())),
            ..Default::default()
        },
    )
    .unwrap();
    let child = object_create(&mut agent, Some(prototype.into_object()));
    let child_map = child.map(&agent);
    assert!(get(&mut agent, child.into_object(), x).is_err());
    assert_eq!(child.map(&agent), child_map);
    assert!(!has_own_property(&mut agent, child.into_object(), x).unwrap());
}

#[test]
fn named_interceptors_shadow_real_properties() {
    let mut agent = agent();
    let answer = key(&mut agent, "answer");
    let template = ObjectTemplate::new(
        &mut agent,
        ObjectTemplateRecord {
            named_interceptor: Some(InterceptorInfo {
                getter: Some(Rc::new(move |_, key, _| {
                    Ok((key == answer).then_some(Value::Integer(42)))
                })),
                ..Default::default()
            }),
            ..Default::default()
        },
    );
    let object = ordinary_object_create_from_template(&mut agent, template);
    assert!(object.map(&agent).has_named_interceptor(&agent));
    let other = key(&mut agent, "other");
    set(&mut agent, object.into_object(), other, Value::Integer(7), true).unwrap();
    set(&mut agent, object.into_object(), answer, Value::Integer(1), true).unwrap();

    assert_eq!(get(&mut agent, object.into_object(), answer).unwrap(), Value::Integer(42));
    assert_eq!(get(&mut agent, object.into_object(), other).unwrap(), Value::Integer(7));
}

#[test]
fn intercepted_stores_bypass_storage() {
    let mut agent = agent();
    let stored = Rc::new(Cell::new(Value::Undefined));
    let sink = stored.clone();
    let hidden = key(&mut agent, "hidden");
    let template = ObjectTemplate::new(
        &mut agent,
        ObjectTemplateRecord {
            named_interceptor: Some(InterceptorInfo {
                setter: Some(Rc::new(move |_, key, value, _| {
                    if key != hidden {
                        return Ok(false);
                    }
                    sink.set(value);
                    Ok(true)
                })),
                ..Default::default()
            }),
            ..Default::default()
        },
    );
    let object = ordinary_object_create_from_template(&mut agent, template);
    let map = object.map(&agent);
    set(&mut agent, object.into_object(), hidden, Value::Integer(3), true).unwrap();
    assert_eq!(stored.get(), Value::Integer(3));
    assert_eq!(object.map(&agent), map);
    assert!(!has_own_property(&mut agent, object.into_object(), hidden).unwrap());

    let visible = key(&mut agent, "visible");
    set(&mut agent, object.into_object(), visible, Value::Integer(4), true).unwrap();
    assert_ne!(object.map(&agent), map);
    assert_eq!(get_named(&mut agent, object, "visible"), Value::Integer(4));
}

#[test]
fn non_masking_interceptors_only_see_missing_properties() {
    let mut agent = agent();
    let consulted = Rc::new(Cell::new(0));
    let counter = consulted.clone();
    let template = ObjectTemplate::new(
        &mut agent,
        ObjectTemplateRecord {
            named_interceptor: Some(InterceptorInfo {
                getter: Some(Rc::new(move |_, _, _| {
                    counter.set(counter.get() + 1);
                    Ok(Some(Value::Boolean(true)))
                })),
                non_masking: true,
                ..Default::default()
            }),
            ..Default::default()
        },
    );
    let object = ordinary_object_create_from_template(&mut agent, template);
    let real = key(&mut agent, "real");
    create_data_property_or_throw(&mut agent, object.into_object(), real, Value::Integer(1))
        .unwrap();

    assert_eq!(get(&mut agent, object.into_object(), real).unwrap(), Value::Integer(1));
    assert_eq!(consulted.get(), 0);
    let missing = key(&mut agent, "missing");
    assert_eq!(get(&mut agent, object.into_object(), missing).unwrap(), Value::Boolean(true));
    assert_eq!(consulted.get(), 1);
}

#[test]
fn denied_access_throws_without_a_callback() {
    let mut agent = agent();
    let template = denying_template(&mut agent, Vec::new());
    let object = ordinary_object_create_from_template(&mut agent, template);
    let x = key(&mut agent, "x");
    let error = get(&mut agent, object.into_object(), x).unwrap_err();
    assert_eq!(error.exception_type(&agent), Some(ExceptionType::TypeError));
    assert_eq!(error.message(&mut agent).as_deref(), Some("no access"));
}

#[test]
fn failed_access_callback_sees_every_denied_access() {
    let mut agent = agent();
    let reported = Rc::new(std::cell::RefCell::new(Vec::new()));
    let log = reported.clone();
    agent.set_failed_access_check_callback(Rc::new(move |_, _, access| {
        log.borrow_mut().push(access);
        Ok(())
    }));
    let template = denying_template(&mut agent, Vec::new());
    let object = ordinary_object_create_from_template(&mut agent, template);
    let x = key(&mut agent, "x");

    assert_eq!(get(&mut agent, object.into_object(), x).unwrap(), Value::Undefined);
    set(&mut agent, object.into_object(), x, Value::Integer(1), false).unwrap();
    assert_eq!(
        own_property_keys(&mut agent, object.into_object()).unwrap(),
        Vec::new()
    );
    let reported = reported.borrow();
    assert_eq!(reported[0], AccessType::Get);
    assert_eq!(reported[1], AccessType::Set);
    assert!(reported.contains(&AccessType::Keys));
}

#[test]
fn all_can_read_accessors_escape_access_checks() {
    let mut agent = agent();
    agent.set_failed_access_check_callback(Rc::new(|_, _, _| Ok(())));
    let name = key(&mut agent, "name");
    let secret = key(&mut agent, "secret");
    let public = NativeAccessor::new(
        &mut agent,
        AccessorInfo {
            name,
            getter: Some(Rc::new(|_, _, info| Ok(info.data))),
            setter: None,
            data: Value::Integer(11),
            all_can_read: true,
            all_can_write: false,
            is_special_data_property: false,
        },
    );
    let private = NativeAccessor::new(
        &mut agent,
        AccessorInfo {
            name: secret,
            getter: Some(Rc::new(|_, _, _| Ok(Value::Integer(99)))),
            setter: None,
            data: Value::Undefined,
            all_can_read: false,
            all_can_write: false,
            is_special_data_property: false,
        },
    );
    let template = denying_template(
        &mut agent,
        vec![
            (public, PropertyAttributes::DONT_ENUM),
            (private, PropertyAttributes::DONT_ENUM),
        ],
    );
    let object = ordinary_object_create_from_template(&mut agent, template);
    assert_eq!(get(&mut agent, object.into_object(), name).unwrap(), Value::Integer(11));
    assert_eq!(get(&mut agent, object.into_object(), secret).unwrap(), Value::Undefined);
}

#[test]
fn native_accessors_run_with_their_holder() {
    let mut agent = agent();
    let size = key(&mut agent, "size");
    let backing = Rc::new(Cell::new(5));
    let read = backing.clone();
    let write = backing.clone();
    let accessor = NativeAccessor::new(
        &mut agent,
        AccessorInfo {
            name: size,
            getter: Some(Rc::new(move |_, _, _| Ok(Value::Integer(read.get())))),
            setter: Some(Rc::new(move |_, _, value, _| match value {
                Value::Integer(n) if n >= 0 => {
                    write.set(n);
                    Ok(true)
                }
                _ => Ok(false),
            })),
            data: Value::Undefined,
            all_can_read: false,
            all_can_write: false,
            is_special_data_property: true,
        },
    );
    let template = ObjectTemplate::new(
        &mut agent,
        ObjectTemplateRecord {
            accessors: vec![(accessor, PropertyAttributes::DONT_ENUM)],
            ..Default::default()
        },
    );
    let object = ordinary_object_create_from_template(&mut agent, template);
    let child = object_create(&mut agent, Some(object.into_object()));

    assert_eq!(get(&mut agent, child.into_object(), size).unwrap(), Value::Integer(5));
    set(&mut agent, object.into_object(), size, Value::Integer(8), true).unwrap();
    assert_eq!(backing.get(), 8);
    let error = set(&mut agent, object.into_object(), size, Value::Integer(-1), true).unwrap_err();
    assert_eq!(error.exception_type(&agent), Some(ExceptionType::TypeError));
    set(&mut agent, object.into_object(), size, Value::Integer(-1), false).unwrap();
    assert_eq!(backing.get(), 8);

    let desc = get_own_property_descriptor(&mut agent, object.into_object(), size)
        .unwrap()
        .unwrap();
    assert!(desc.is_data_descriptor());
    assert_eq!(desc.value, Some(Value::Integer(8)));
}

#[test]
fn strong_objects_reject_misses_and_failed_writes() {
    let mut agent = agent();
    let object = object_with(&mut agent, &[("x", Value::Integer(1))]);
    make_strong(&mut agent, object).unwrap();
    assert!(object.map(&agent).is_strong(&agent));
    assert!(is_sealed(&mut agent, object.into_object()).unwrap());

    // Existing writable properties still accept stores.
    let x = key(&mut agent, "x");
    set(&mut agent, object.into_object(), x, Value::Integer(2), false).unwrap();
    assert_eq!(get_named(&mut agent, object, "x"), Value::Integer(2));

    let y = key(&mut agent, "y");
    let error = get(&mut agent, object.into_object(), y).unwrap_err();
    assert_eq!(error.exception_type(&agent), Some(ExceptionType::TypeError));
    let error = set(&mut agent, object.into_object(), y, Value::Integer(3), false).unwrap_err();
    assert_eq!(error.exception_type(&agent), Some(ExceptionType::TypeError));
}
