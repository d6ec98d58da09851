// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## Transition tables
//!
//! The outgoing edges of a Map in the transition tree. Most Maps have zero
//! or one transition, so a single edge is stored inline; larger tables are
//! kept sorted by key hash for binary search.

use super::{
    elements_kind::ElementsKind,
    map::Map,
    property_details::{PropertyAttributes, PropertyKind},
};
use crate::{
    ecmascript::{
        execution::Agent,
        types::{Object, PropertyKey},
    },
    heap::{Heap, heap_observer::WriteLocation},
};

/// Transitions that do not add a named property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialTransition {
    ElementsKind(ElementsKind),
    NonExtensible,
    /// Leads to the Map of a strong object.
    Strong,
}

impl SpecialTransition {
    /// Integrity transitions change flags and attributes but never the
    /// layout of the object.
    pub fn is_integrity_level(self) -> bool {
        matches!(self, SpecialTransition::NonExtensible | SpecialTransition::Strong)
    }

    /// Attributes every own property gains through this transition.
    pub fn added_attributes(self) -> PropertyAttributes {
        match self {
            SpecialTransition::Strong => PropertyAttributes::SEALED,
            SpecialTransition::ElementsKind(_) | SpecialTransition::NonExtensible => {
                PropertyAttributes::NONE
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionKey {
    Property {
        key: PropertyKey,
        kind: PropertyKind,
        attributes: PropertyAttributes,
    },
    Special(SpecialTransition),
}

impl TransitionKey {
    pub fn property(key: PropertyKey, kind: PropertyKind, attributes: PropertyAttributes) -> Self {
        TransitionKey::Property {
            key,
            kind,
            attributes,
        }
    }

    pub fn property_key(self) -> Option<PropertyKey> {
        match self {
            TransitionKey::Property { key, .. } => Some(key),
            TransitionKey::Special(_) => None,
        }
    }

    pub fn is_special(self) -> bool {
        matches!(self, TransitionKey::Special(_))
    }

    fn hash(self, heap: &Heap) -> u32 {
        match self {
            TransitionKey::Property { key, .. } => key.hash(heap),
            TransitionKey::Special(special) => match special {
                SpecialTransition::ElementsKind(kind) => 0xffff_ff00 | kind as u32,
                SpecialTransition::NonExtensible => 0xffff_fff0,
                SpecialTransition::Strong => 0xffff_fff1,
            },
        }
    }

    /// Secondary sort key among equal hashes.
    fn rank(self) -> (u8, u8) {
        match self {
            TransitionKey::Property {
                kind, attributes, ..
            } => (kind as u8, attributes.bits()),
            TransitionKey::Special(_) => (u8::MAX, 0),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum Transitions {
    #[default]
    None,
    Single(TransitionKey, Map),
    /// `(hash, key, target)` sorted by hash and key rank.
    Array(Vec<(u32, TransitionKey, Map)>),
}

impl Transitions {
    pub fn len(&self) -> usize {
        match self {
            Transitions::None => 0,
            Transitions::Single(..) => 1,
            Transitions::Array(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (TransitionKey, Map)> + '_ {
        let (single, array) = match self {
            Transitions::None => (None, &[][..]),
            Transitions::Single(key, target) => (Some((*key, *target)), &[][..]),
            Transitions::Array(entries) => (None, &entries[..]),
        };
        single
            .into_iter()
            .chain(array.iter().map(|(_, key, target)| (*key, *target)))
    }
}

/// Find the target reached from `map` through `key`.
pub fn search_transition(heap: &Heap, map: Map, key: TransitionKey) -> Option<Map> {
    match &heap[map].transitions {
        Transitions::None => None,
        Transitions::Single(k, target) => (*k == key).then_some(*target),
        Transitions::Array(entries) => {
            let hash = key.hash(heap);
            let start = entries.partition_point(|(h, _, _)| *h < hash);
            entries[start..]
                .iter()
                .take_while(|(h, _, _)| *h == hash)
                .find(|(_, k, _)| *k == key)
                .map(|(_, _, target)| *target)
        }
    }
}

/// Find a named-property transition.
pub fn search_property_transition(
    heap: &Heap,
    map: Map,
    key: PropertyKey,
    kind: PropertyKind,
    attributes: PropertyAttributes,
) -> Option<Map> {
    search_transition(heap, map, TransitionKey::property(key, kind, attributes))
}

pub fn search_special(heap: &Heap, map: Map, special: SpecialTransition) -> Option<Map> {
    search_transition(heap, map, TransitionKey::Special(special))
}

/// Insert or replace the transition `key` of `parent`.
pub(crate) fn insert_transition(heap: &mut Heap, parent: Map, key: TransitionKey, target: Map) {
    let hash = key.hash(heap);
    let transitions = std::mem::take(&mut heap[parent].transitions);
    let transitions = match transitions {
        Transitions::None => Transitions::Single(key, target),
        Transitions::Single(k, _) if k == key => Transitions::Single(key, target),
        Transitions::Single(k, t) => {
            let existing = (k.hash(heap), k, t);
            let mut entries = vec![existing];
            insert_sorted(&mut entries, (hash, key, target));
            Transitions::Array(entries)
        }
        Transitions::Array(mut entries) => {
            if let Some(entry) = entries.iter_mut().find(|(_, k, _)| *k == key) {
                entry.2 = target;
            } else {
                Heap::reserve(&mut entries, 1, "TransitionArray");
                insert_sorted(&mut entries, (hash, key, target));
            }
            Transitions::Array(entries)
        }
    };
    heap[parent].transitions = transitions;
    heap.record_write(WriteLocation::Transitions(parent));
}

fn insert_sorted(entries: &mut Vec<(u32, TransitionKey, Map)>, entry: (u32, TransitionKey, Map)) {
    let position = entries.partition_point(|(h, k, _)| (*h, k.rank()) <= (entry.0, entry.1.rank()));
    entries.insert(position, entry);
}

/// Returns true if one more transition may be added to `map`.
pub fn can_have_more_transitions(agent: &Agent, map: Map) -> bool {
    let record = &agent.heap[map];
    if record.is_dictionary_map() {
        return false;
    }
    record.transitions.len() < agent.options.max_number_of_transitions
}

/// Cached target of a prototype change.
pub fn get_prototype_transition(heap: &Heap, map: Map, prototype: Option<Object>) -> Option<Map> {
    heap[map]
        .prototype_transitions
        .iter()
        .find(|(p, _)| *p == prototype)
        .map(|(_, target)| *target)
}

pub(crate) fn put_prototype_transition(
    heap: &mut Heap,
    map: Map,
    prototype: Option<Object>,
    target: Map,
) {
    const MAX_CACHED_PROTOTYPE_TRANSITIONS: usize = 256;
    let record = &mut heap[map];
    if record.prototype_transitions.len() >= MAX_CACHED_PROTOTYPE_TRANSITIONS {
        return;
    }
    record.prototype_transitions.push((prototype, target));
    heap.record_write(WriteLocation::Transitions(map));
}
