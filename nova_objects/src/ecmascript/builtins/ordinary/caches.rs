// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use ahash::RandomState;

use super::{elements_kind::ElementsKind, map::Map};
use crate::{
    ecmascript::{execution::Agent, types::PropertyKey},
    heap::Heap,
};

const DESCRIPTOR_LOOKUP_CACHE_SIZE: usize = 64;
const NORMALIZED_MAP_CACHE_SIZE: usize = 64;

/// Heap structure holding the descriptor lookup cache, the normalized Map
/// cache and the initial array Maps.
#[derive(Debug)]
pub(crate) struct Caches {
    /// `(map, key) -> descriptor index` for recent fast-mode lookups,
    /// including misses.
    descriptor_lookup: [Option<(Map, PropertyKey, Option<u32>)>; DESCRIPTOR_LOOKUP_CACHE_SIZE],
    /// Dictionary-mode Maps produced by normalizing a fast Map, so that
    /// objects normalized from the same shape share a Map.
    normalized_maps: [Option<Map>; NORMALIZED_MAP_CACHE_SIZE],
    /// Array Maps for each fast elements kind, all hanging off the initial
    /// array Map's elements-kind transitions.
    pub(crate) initial_array_maps: Vec<(ElementsKind, Map)>,
    hasher: RandomState,
}

impl Default for Caches {
    fn default() -> Self {
        Self {
            descriptor_lookup: [None; DESCRIPTOR_LOOKUP_CACHE_SIZE],
            normalized_maps: [None; NORMALIZED_MAP_CACHE_SIZE],
            initial_array_maps: Vec::new(),
            hasher: RandomState::with_seeds(0x6d61_7073, 0x6361_6368, 0x6e6f_726d, 0x6465_7363),
        }
    }
}

impl Caches {
    fn descriptor_slot(heap: &Heap, map: Map, key: PropertyKey) -> usize {
        let hash = key.hash(heap) ^ (map.get_index() as u32).wrapping_mul(0x9e37_79b9);
        hash as usize % DESCRIPTOR_LOOKUP_CACHE_SIZE
    }

    /// `Some(result)` on a cache hit.
    pub(crate) fn lookup_descriptor(&self, heap: &Heap, map: Map, key: PropertyKey) -> Option<Option<usize>> {
        let slot = Self::descriptor_slot(heap, map, key);
        match self.descriptor_lookup[slot] {
            Some((m, k, result)) if m == map && k == key => Some(result.map(|i| i as usize)),
            _ => None,
        }
    }

    pub(crate) fn update_descriptor(&mut self, heap: &Heap, map: Map, key: PropertyKey, result: Option<usize>) {
        let slot = Self::descriptor_slot(heap, map, key);
        self.descriptor_lookup[slot] = Some((map, key, result.map(|i| i as u32)));
    }

    /// Forget every cached lookup; called when descriptors of existing Maps
    /// change.
    pub(crate) fn clear_descriptor_lookup(&mut self) {
        self.descriptor_lookup = [None; DESCRIPTOR_LOOKUP_CACHE_SIZE];
    }

    fn normalized_slot(&self, heap: &Heap, fast_map: Map) -> usize {
        let record = &heap[fast_map];
        let hash = self.hasher.hash_one((
            record.prototype,
            record.constructor,
            record.instance_type,
            record.elements_kind,
        ));
        hash as usize % NORMALIZED_MAP_CACHE_SIZE
    }

    pub(crate) fn get_normalized(&self, heap: &Heap, fast_map: Map, keep_in_object: bool) -> Option<Map> {
        let slot = self.normalized_slot(heap, fast_map);
        self.normalized_maps[slot]
            .filter(|normalized| fast_map.equivalent_to_for_normalization(heap, *normalized, keep_in_object))
    }

    pub(crate) fn set_normalized(&mut self, heap: &Heap, fast_map: Map, normalized: Map) {
        let slot = self.normalized_slot(heap, fast_map);
        self.normalized_maps[slot] = Some(normalized);
    }

    pub(crate) fn initial_array_map(&self, kind: ElementsKind) -> Option<Map> {
        self.initial_array_maps
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, map)| *map)
    }
}

/// Search the own descriptors of `map` for `key`, consulting and filling the
/// descriptor lookup cache.
pub fn search_with_cache(agent: &mut Agent, map: Map, key: PropertyKey) -> Option<usize> {
    if let Some(result) = agent.caches.lookup_descriptor(&agent.heap, map, key) {
        return result;
    }
    let record = &agent.heap[map];
    let result = record
        .descriptors
        .search(&agent.heap, key, record.number_of_own_descriptors as usize);
    agent.caches.update_descriptor(&agent.heap, map, key, result);
    result
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ecmascript::{
        builtins::ordinary::{
            elements_kind::INITIAL_OBJECT_ELEMENTS_KIND,
            map::InstanceType,
        },
        execution::Options,
    };

    #[test]
    fn descriptor_cache_remembers_misses() {
        let mut agent = Agent::new(Options::default());
        let map = Map::create_root(
            &mut agent,
            InstanceType::Object,
            None,
            0,
            INITIAL_OBJECT_ELEMENTS_KIND,
            None,
        );
        let key = PropertyKey::from_str(&mut agent, "missing");
        assert_eq!(agent.caches.lookup_descriptor(&agent.heap, map, key), None);
        assert_eq!(search_with_cache(&mut agent, map, key), None);
        assert_eq!(
            agent.caches.lookup_descriptor(&agent.heap, map, key),
            Some(None)
        );
        agent.caches.clear_descriptor_lookup();
        assert_eq!(agent.caches.lookup_descriptor(&agent.heap, map, key), None);
    }
}
