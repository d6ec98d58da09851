// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Object model scenarios driven from the command line. Each scenario runs
//! on a fresh Agent and prints a short report.

use std::{cell::RefCell, rc::Rc};

use console::style;
use nova_objects::{
    ecmascript::{
        abstract_operations::operations_on_objects::{
            create_data_property_or_throw, get, own_property_keys,
        },
        builtins::ordinary::{
            map_transitions::NormalizationMode,
            migration::{migrate_instance, migrate_slow_to_fast, normalize_properties},
            ordinary_object_create_with_intrinsics,
        },
        execution::{Agent, JsResult},
        types::{OrdinaryObject, PropertyKey, String, Value},
    },
    heap::heap_observer::{HeapObserver, MapPublication},
};

use crate::tree::print_transition_tree;

/// Counts Map publications and remembers the ones that happened before the
/// object's storage matched the new Map.
#[derive(Debug, Default, Clone)]
pub struct PublicationCounter(Rc<RefCell<(usize, Vec<MapPublication>)>>);

impl PublicationCounter {
    pub fn install(agent: &mut Agent) -> Self {
        let counter = Self::default();
        agent.set_heap_observer(Box::new(counter.clone()));
        counter
    }

    fn report(&self) {
        let (total, inconsistent) = &*self.0.borrow();
        if inconsistent.is_empty() {
            println!("{} {total} Map publications, all consistent", style("ok").green());
        } else {
            println!(
                "{} {} of {total} Map publications preceded their storage",
                style("error").red().bold(),
                inconsistent.len()
            );
            for publication in inconsistent {
                println!("  {publication:?}");
            }
        }
    }
}

impl HeapObserver for PublicationCounter {
    fn publish_map(&mut self, publication: &MapPublication) {
        let mut state = self.0.borrow_mut();
        state.0 += 1;
        if !publication.is_consistent() {
            state.1.push(*publication);
        }
    }
}

/// Parse a value written on the command line: integers, decimals, `true`,
/// `false`, `null` and `undefined` keep their type, anything else is a
/// string.
pub fn parse_value(agent: &mut Agent, text: &str) -> Value {
    match text {
        "true" => Value::Boolean(true),
        "false" => Value::Boolean(false),
        "null" => Value::Null,
        "undefined" => Value::Undefined,
        _ => {
            if let Ok(integer) = text.parse::<i32>() {
                Value::Integer(integer)
            } else if let Ok(number) = text.parse::<f64>() {
                Value::from_f64(number)
            } else {
                Value::String(String::from_str(agent, text))
            }
        }
    }
}

/// Build an object from a shape written as `name=value,name=value`. A name
/// without a value gets `0`.
pub fn object_from_shape(agent: &mut Agent, shape: &str) -> JsResult<OrdinaryObject> {
    let object = ordinary_object_create_with_intrinsics(agent);
    for entry in shape.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        let (name, value) = entry.split_once('=').unwrap_or((entry, "0"));
        let key = PropertyKey::from_str(agent, name);
        let value = parse_value(agent, value);
        create_data_property_or_throw(agent, object.into_object(), key, value)?;
    }
    Ok(object)
}

fn numbered_object(agent: &mut Agent, properties: usize) -> JsResult<OrdinaryObject> {
    let object = ordinary_object_create_with_intrinsics(agent);
    for i in 0..properties {
        let key = PropertyKey::from_str(agent, &format!("p{i}"));
        create_data_property_or_throw(agent, object.into_object(), key, Value::Integer(i as i32))?;
    }
    Ok(object)
}

fn snapshot(agent: &mut Agent, object: OrdinaryObject) -> JsResult<Vec<(PropertyKey, Value)>> {
    let keys = own_property_keys(agent, object.into_object())?;
    keys.into_iter()
        .map(|key| Ok((key, get(agent, object.into_object(), key)?)))
        .collect()
}

fn describe(agent: &Agent, object: OrdinaryObject) -> std::string::String {
    let map = object.map(agent);
    let mode = if object.has_fast_properties(agent) {
        style("fast").green()
    } else {
        style("dictionary").yellow()
    };
    format!(
        "{map:?} ({mode}, {} own descriptors)",
        map.number_of_own_descriptors(agent)
    )
}

/// Give `width` objects each a distinct property name on the shared root
/// Map, then grow every object `depth` properties deep.
pub fn fanout(agent: &mut Agent, width: usize, depth: usize) -> JsResult<()> {
    let probe = ordinary_object_create_with_intrinsics(agent);
    let root = probe.map(agent);
    let before = root.number_of_transitions(agent);

    let mut objects = Vec::with_capacity(width);
    for i in 0..width {
        let object = ordinary_object_create_with_intrinsics(agent);
        let key = PropertyKey::from_str(agent, &format!("k{i}"));
        create_data_property_or_throw(agent, object.into_object(), key, Value::Integer(0))?;
        objects.push(object);
    }
    for level in 0..depth {
        let key = PropertyKey::from_str(agent, &format!("d{level}"));
        for &object in &objects {
            create_data_property_or_throw(agent, object.into_object(), key, Value::Integer(0))?;
        }
    }

    let added = root.number_of_transitions(agent) - before;
    let in_tree = objects
        .iter()
        .filter(|object| object.map(agent).find_root_map(agent.heap()) == root)
        .count();
    println!(
        "root {root:?}: {added} new transitions (limit {})",
        agent.options().max_number_of_transitions
    );
    println!(
        "{in_tree} of {width} objects share the root's transition tree, {} got unshared Maps",
        width - in_tree
    );
    if let Some(&last) = objects.last() {
        println!("last object: {}", describe(agent, last));
    }
    Ok(())
}

/// Create `count` objects of one shape, store a double into the first
/// property of one of them and migrate the rest off the deprecated Map.
pub fn deprecate(agent: &mut Agent, properties: usize, count: usize) -> JsResult<()> {
    let properties = properties.max(1);
    let objects = (0..count.max(2))
        .map(|_| numbered_object(agent, properties))
        .collect::<JsResult<Vec<_>>>()?;
    let old_map = objects[0].map(agent);
    let counter = PublicationCounter::install(agent);

    let first = PropertyKey::from_str(agent, "p0");
    create_data_property_or_throw(agent, objects[0].into_object(), first, Value::Number(0.5))?;
    let new_map = objects[0].map(agent);
    println!(
        "{old_map:?} deprecated: {}, generalized Map {new_map:?}",
        old_map.is_deprecated(agent)
    );

    let mut migrated = 0;
    for &object in &objects[1..] {
        if object.map(agent).is_deprecated(agent) {
            migrate_instance(agent, object);
            migrated += 1;
        }
    }
    let shared = objects[1..]
        .iter()
        .all(|object| object.map(agent) == new_map);
    println!("migrated {migrated} objects, all on {new_map:?}: {shared}");
    counter.report();
    Ok(())
}

/// Normalize an object with `properties` properties to dictionary mode and
/// back, checking that keys and values survive both migrations.
pub fn normalize(agent: &mut Agent, properties: usize, clear_in_object: bool) -> JsResult<()> {
    let object = numbered_object(agent, properties)?;
    let before = snapshot(agent, object)?;
    let counter = PublicationCounter::install(agent);
    println!("before:     {}", describe(agent, object));

    let mode = if clear_in_object {
        NormalizationMode::ClearInObjectProperties
    } else {
        NormalizationMode::KeepInObjectProperties
    };
    normalize_properties(agent, object, mode, 0, "cli normalize");
    println!("normalized: {}", describe(agent, object));
    migrate_slow_to_fast(agent, object, 0, "cli normalize");
    println!("restored:   {}", describe(agent, object));

    let after = snapshot(agent, object)?;
    if before == after {
        println!("{} {} properties kept in order", style("ok").green(), after.len());
    } else {
        println!("{} properties changed across the round trip", style("error").red().bold());
    }
    counter.report();
    Ok(())
}

/// Build one object per shape and print the transition tree they share.
pub fn tree(agent: &mut Agent, shapes: &[std::string::String]) -> JsResult<()> {
    let objects = shapes
        .iter()
        .map(|shape| object_from_shape(agent, shape))
        .collect::<JsResult<Vec<_>>>()?;
    let Some(first) = objects.first() else {
        return Ok(());
    };
    let root = first.map(agent).find_root_map(agent.heap());
    print_transition_tree(agent, root);
    for (shape, object) in shapes.iter().zip(&objects) {
        println!("{} -> {}", style(shape).bold(), describe(agent, *object));
    }
    Ok(())
}
