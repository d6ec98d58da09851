// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod common;

use std::{cell::RefCell, rc::Rc};

use common::{agent, get_named, key};
use nova_objects::ecmascript::{
    abstract_operations::operations_on_objects::{
        create_data_property_or_throw, get, has_own_property, set,
    },
    builtins::{
        builtin_function::create_builtin_function,
        ordinary::{
            integrity::{freeze, is_frozen},
            object_create, ordinary_object_create_with_intrinsics,
        },
        proxy::{create_handler, proxy_create, revoke},
    },
    execution::{Agent, ExceptionType},
    types::{InternalMethods, Object, PropertyDescriptor, PropertyKey, Value},
};

fn descriptor_object(agent: &mut Agent, desc: PropertyDescriptor) -> Value {
    PropertyDescriptor::from_property_descriptor(Some(desc), agent)
        .unwrap()
        .map_or(Value::Undefined, Object::into_value)
}

#[test]
fn missing_fundamental_trap_is_named() {
    let mut agent = agent();
    let handler = create_handler(&mut agent, &[]).unwrap();
    let proxy = proxy_create(&mut agent, handler, None);
    let x = key(&mut agent, "x");
    // Without `set` the store derives from `getOwnPropertyDescriptor`, which
    // is missing too. Sloppy mode does not hide the error.
    let error = set(&mut agent, proxy.into_object(), x, Value::Integer(1), false).unwrap_err();
    assert_eq!(error.exception_type(&agent), Some(ExceptionType::TypeError));
    assert_eq!(
        error.message(&mut agent).as_deref(),
        Some("Proxy handler #<Object> has no 'getOwnPropertyDescriptor' trap")
    );
}

#[test]
fn derived_set_defines_through_the_handler() {
    let mut agent = agent();
    let defined = Rc::new(RefCell::new(Vec::new()));
    let log = defined.clone();
    let get_own = create_builtin_function(&mut agent, |_, _, _| Ok(Value::Undefined), "gopd", 1);
    let get_desc = create_builtin_function(&mut agent, |_, _, _| Ok(Value::Undefined), "gpd", 1);
    let define = create_builtin_function(
        &mut agent,
        move |agent, _, args| {
            let desc = PropertyDescriptor::to_property_descriptor(agent, args.get(1))?;
            log.borrow_mut().push((args.get(0), desc.value));
            Ok(Value::Boolean(true))
        },
        "defineProperty",
        2,
    );
    let handler = create_handler(
        &mut agent,
        &[
            ("getOwnPropertyDescriptor", get_own.into_value()),
            ("getPropertyDescriptor", get_desc.into_value()),
            ("defineProperty", define.into_value()),
        ],
    )
    .unwrap();
    let proxy = proxy_create(&mut agent, handler, None);
    let x = key(&mut agent, "x");
    set(&mut agent, proxy.into_object(), x, Value::Integer(5), true).unwrap();

    let defined = defined.borrow();
    assert_eq!(defined.len(), 1);
    let Value::String(name) = defined[0].0 else {
        panic!("expected a string name, got {:?}", defined[0].0);
    };
    assert_eq!(name.as_str(&agent), "x");
    assert_eq!(defined[0].1, Some(Value::Integer(5)));
}

#[test]
fn falsish_set_trap_only_throws_in_strict_mode() {
    let mut agent = agent();
    let trap = create_builtin_function(&mut agent, |_, _, _| Ok(Value::Integer(0)), "set", 3);
    let handler = create_handler(&mut agent, &[("set", trap.into_value())]).unwrap();
    let proxy = proxy_create(&mut agent, handler, None);
    let x = key(&mut agent, "x");
    set(&mut agent, proxy.into_object(), x, Value::Integer(1), false).unwrap();
    let error = set(&mut agent, proxy.into_object(), x, Value::Integer(1), true).unwrap_err();
    assert_eq!(
        error.message(&mut agent).as_deref(),
        Some("'set' on proxy: trap returned falsish for property 'x'")
    );
}

#[test]
fn proxies_on_the_prototype_chain_see_the_receiver() {
    let mut agent = agent();
    let receivers = Rc::new(RefCell::new(Vec::new()));
    let log = receivers.clone();
    let get_trap = create_builtin_function(
        &mut agent,
        move |_, _, args| {
            log.borrow_mut().push(args.get(0));
            Ok(Value::Integer(10))
        },
        "get",
        2,
    );
    let get_desc = create_builtin_function(&mut agent, |_, _, _| Ok(Value::Undefined), "gpd", 1);
    let handler = create_handler(
        &mut agent,
        &[
            ("get", get_trap.into_value()),
            ("getPropertyDescriptor", get_desc.into_value()),
        ],
    )
    .unwrap();
    let proxy = proxy_create(&mut agent, handler, None);
    let child = object_create(&mut agent, Some(proxy.into_object()));

    assert_eq!(get_named(&mut agent, child, "anything"), Value::Integer(10));
    assert_eq!(receivers.borrow().as_slice(), &[child.into_value()]);

    // The handler does not know the property, so the store lands on the
    // receiver and shadows the proxy from then on.
    let y = key(&mut agent, "y");
    set(&mut agent, child.into_object(), y, Value::Integer(2), true).unwrap();
    assert!(has_own_property(&mut agent, child.into_object(), y).unwrap());
    assert_eq!(get_named(&mut agent, child, "y"), Value::Integer(2));
    assert_eq!(receivers.borrow().len(), 1);
}

#[test]
fn freezing_a_proxy_goes_through_fix() {
    let mut agent = agent();
    let fix_trap = create_builtin_function(
        &mut agent,
        |agent, _, _| {
            let properties = ordinary_object_create_with_intrinsics(agent).into_object();
            let desc = PropertyDescriptor {
                value: Some(Value::Integer(3)),
                writable: Some(true),
                enumerable: Some(true),
                configurable: Some(true),
                ..Default::default()
            };
            let desc = descriptor_object(agent, desc);
            let name = PropertyKey::from_str(agent, "count");
            create_data_property_or_throw(agent, properties, name, desc)?;
            Ok(properties.into_value())
        },
        "fix",
        0,
    );
    let handler = create_handler(&mut agent, &[("fix", fix_trap.into_value())]).unwrap();
    let proxy = proxy_create(&mut agent, handler, None);

    assert!(!is_frozen(&mut agent, proxy.into_object()).unwrap());
    assert!(freeze(&mut agent, proxy.into_object()).unwrap());
    assert!(proxy.is_fixed(&agent));
    assert!(is_frozen(&mut agent, proxy.into_object()).unwrap());

    let count = key(&mut agent, "count");
    assert_eq!(get(&mut agent, proxy.into_object(), count).unwrap(), Value::Integer(3));
    let error = set(&mut agent, proxy.into_object(), count, Value::Integer(4), true).unwrap_err();
    assert_eq!(error.exception_type(&agent), Some(ExceptionType::TypeError));
    assert_eq!(get(&mut agent, proxy.into_object(), count).unwrap(), Value::Integer(3));
}

#[test]
fn fix_returning_undefined_keeps_the_proxy_extensible() {
    let mut agent = agent();
    let fix_trap = create_builtin_function(&mut agent, |_, _, _| Ok(Value::Undefined), "fix", 0);
    let handler = create_handler(&mut agent, &[("fix", fix_trap.into_value())]).unwrap();
    let proxy = proxy_create(&mut agent, handler, None);
    assert!(!freeze(&mut agent, proxy.into_object()).unwrap());
    assert!(!proxy.is_fixed(&agent));
    assert!(proxy.into_object().internal_is_extensible(&mut agent).unwrap());
}

#[test]
fn revocation_cuts_off_every_operation() {
    let mut agent = agent();
    let get_trap = create_builtin_function(&mut agent, |_, _, _| Ok(Value::Null), "get", 2);
    let handler = create_handler(&mut agent, &[("get", get_trap.into_value())]).unwrap();
    let proxy = proxy_create(&mut agent, handler, None);
    let x = key(&mut agent, "x");
    assert_eq!(get(&mut agent, proxy.into_object(), x).unwrap(), Value::Null);

    revoke(&mut agent, proxy);
    let object = proxy.into_object();
    for error in [
        get(&mut agent, object, x).unwrap_err(),
        set(&mut agent, object, x, Value::Null, false).unwrap_err(),
        object.internal_has_property(&mut agent, x).unwrap_err(),
        object.internal_get_prototype_of(&mut agent).unwrap_err(),
    ] {
        assert_eq!(error.exception_type(&agent), Some(ExceptionType::TypeError));
    }
}
