// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![allow(dead_code)]

use std::{cell::RefCell, rc::Rc};

use nova_objects::{
    ecmascript::{
        abstract_operations::operations_on_objects::{create_data_property_or_throw, get},
        builtins::ordinary::ordinary_object_create_with_intrinsics,
        execution::{Agent, Options},
        types::{Object, OrdinaryObject, PropertyKey, Value},
    },
    heap::heap_observer::{HeapObserver, MapPublication, WriteLocation},
};

/// Everything a [`RecordingObserver`] saw.
#[derive(Debug, Default)]
pub struct Recorded {
    pub publications: Vec<MapPublication>,
    pub writes: Vec<WriteLocation>,
    pub fillers: Vec<(OrdinaryObject, u32)>,
}

/// Stands in for a concurrent collector: records every Map publication so
/// tests can check that storage was already consistent when it happened.
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver(pub Rc<RefCell<Recorded>>);

impl RecordingObserver {
    pub fn install(agent: &mut Agent) -> Self {
        let observer = Self::default();
        agent.set_heap_observer(Box::new(observer.clone()));
        observer
    }

    pub fn publications(&self) -> Vec<MapPublication> {
        self.0.borrow().publications.clone()
    }

    /// Panics naming the first publication whose storage did not match the
    /// published Map.
    pub fn assert_consistent(&self) {
        for publication in self.0.borrow().publications.iter() {
            assert!(
                publication.is_consistent(),
                "Map published before storage was ready: {publication:?}"
            );
        }
    }
}

impl HeapObserver for RecordingObserver {
    fn record_write(&mut self, location: WriteLocation) {
        self.0.borrow_mut().writes.push(location);
    }

    fn create_filler(&mut self, object: OrdinaryObject, words: u32) {
        self.0.borrow_mut().fillers.push((object, words));
    }

    fn publish_map(&mut self, publication: &MapPublication) {
        self.0.borrow_mut().publications.push(*publication);
    }
}

pub fn agent() -> Agent {
    Agent::new(Options::default())
}

pub fn key(agent: &mut Agent, name: &str) -> PropertyKey {
    PropertyKey::from_str(agent, name)
}

/// A fresh `Object.prototype`-derived object with the given properties
/// added in order.
pub fn object_with(agent: &mut Agent, properties: &[(&str, Value)]) -> OrdinaryObject {
    let object = ordinary_object_create_with_intrinsics(agent);
    for &(name, value) in properties {
        let key = PropertyKey::from_str(agent, name);
        create_data_property_or_throw(agent, object.into_object(), key, value).unwrap();
    }
    object
}

pub fn get_named(agent: &mut Agent, object: impl Into<Object>, name: &str) -> Value {
    let key = PropertyKey::from_str(agent, name);
    get(agent, object.into(), key).unwrap()
}
