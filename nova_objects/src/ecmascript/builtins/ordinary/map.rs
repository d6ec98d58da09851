// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## Maps
//!
//! A Map (hidden class) describes the layout of every object carrying it:
//! how many in-object slots the object has, which named properties exist
//! and where their values live, the elements kind, the prototype and a set
//! of behaviour flags.
//!
//! Maps form a transition tree. A root Map has no properties; each edge adds
//! one property or applies one special change, and the child records its
//! parent in `back_pointer`. Maps are never freed: when a sibling transition
//! generalizes a field, the stale branch is marked deprecated and objects
//! still carrying a deprecated Map migrate lazily via
//! [`update`](super::map_updater::update).

use std::ops::{Index, IndexMut};

use super::{
    dependent_code::{CodeId, DependencyGroup, DependentCode, mark_code_for_deoptimization},
    descriptor_array::DescriptorArray,
    elements_kind::ElementsKind,
    property_details::PropertyLocation,
    transitions::{TransitionKey, Transitions},
};
use crate::{
    ecmascript::{
        execution::{Agent, embedder::ObjectTemplate},
        types::{FieldIndex, Object, ObjectKind},
    },
    heap::{
        CreateHeapData, Heap,
        heap_observer::RequiredLayout,
        indexes::MapIndex,
    },
};

/// Size of an object header in words: Map, properties and elements.
pub const OBJECT_HEADER_WORDS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceType {
    Object,
    Array,
    Function,
    Error,
    ArrayBuffer,
    TypedArray,
    GlobalObject,
    /// Instance of an embedder object template.
    ApiObject,
}

impl InstanceType {
    pub(crate) fn for_kind(kind: &ObjectKind) -> Self {
        match kind {
            ObjectKind::Ordinary => InstanceType::Object,
            ObjectKind::Array { .. } => InstanceType::Array,
            ObjectKind::Function(_) => InstanceType::Function,
            ObjectKind::Error(_) => InstanceType::Error,
            ObjectKind::ArrayBuffer { .. } => InstanceType::ArrayBuffer,
            ObjectKind::TypedArray(_) => InstanceType::TypedArray,
            ObjectKind::Global => InstanceType::GlobalObject,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MapFlags(u16);

impl MapFlags {
    pub const EXTENSIBLE: Self = Self(1 << 0);
    pub const DICTIONARY_MAP: Self = Self(1 << 1);
    pub const DEPRECATED: Self = Self(1 << 2);
    pub const STABLE: Self = Self(1 << 3);
    pub const PROTOTYPE_MAP: Self = Self(1 << 4);
    pub const OWNS_DESCRIPTORS: Self = Self(1 << 5);
    pub const HAS_NAMED_INTERCEPTOR: Self = Self(1 << 6);
    pub const HAS_INDEXED_INTERCEPTOR: Self = Self(1 << 7);
    pub const ACCESS_CHECK_NEEDED: Self = Self(1 << 8);
    pub const STRONG: Self = Self(1 << 9);

    /// Flags two Maps must agree on to be in the same transition tree.
    const TRANSITION_RELEVANT: Self = Self(
        Self::EXTENSIBLE.0
            | Self::DICTIONARY_MAP.0
            | Self::HAS_NAMED_INTERCEPTOR.0
            | Self::HAS_INDEXED_INTERCEPTOR.0
            | Self::ACCESS_CHECK_NEEDED.0
            | Self::STRONG.0,
    );

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn set(&mut self, flag: Self, value: bool) {
        if value {
            self.0 |= flag.0;
        } else {
            self.0 &= !flag.0;
        }
    }

    const fn transition_relevant(self) -> u16 {
        self.0 & Self::TRANSITION_RELEVANT.0
    }
}

#[derive(Debug, Clone)]
pub struct MapRecord {
    pub(crate) instance_type: InstanceType,
    pub(crate) in_object_properties: u32,
    /// Field slots reserved but not yet used, in-object or in the backing
    /// store.
    pub(crate) unused_property_fields: u32,
    pub(crate) number_of_own_descriptors: u32,
    /// Number of enumerable own string keys, once computed.
    pub(crate) enum_length: Option<u32>,
    pub(crate) descriptors: DescriptorArray,
    pub(crate) transitions: Transitions,
    pub(crate) prototype_transitions: Vec<(Option<Object>, Map)>,
    pub(crate) back_pointer: Option<Map>,
    pub(crate) prototype: Option<Object>,
    pub(crate) constructor: Option<ObjectTemplate>,
    pub(crate) elements_kind: ElementsKind,
    pub(crate) flags: MapFlags,
    pub(crate) dependent_code: DependentCode,
}

impl MapRecord {
    pub fn is_dictionary_map(&self) -> bool {
        self.flags.contains(MapFlags::DICTIONARY_MAP)
    }

    pub fn is_deprecated(&self) -> bool {
        self.flags.contains(MapFlags::DEPRECATED)
    }

    pub fn is_prototype_map(&self) -> bool {
        self.flags.contains(MapFlags::PROTOTYPE_MAP)
    }

    pub fn owns_descriptors(&self) -> bool {
        self.flags.contains(MapFlags::OWNS_DESCRIPTORS)
    }

    pub fn is_extensible(&self) -> bool {
        self.flags.contains(MapFlags::EXTENSIBLE)
    }

    /// Instance size in words.
    pub fn instance_size(&self) -> u32 {
        OBJECT_HEADER_WORDS + self.in_object_properties
    }
}

/// Handle to a Map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Map(pub(crate) MapIndex);

impl Map {
    pub(crate) fn get_index(self) -> usize {
        self.0.into_index()
    }

    /// Create the root Map of a new transition tree.
    pub(crate) fn create_root(
        agent: &mut Agent,
        instance_type: InstanceType,
        prototype: Option<Object>,
        in_object_properties: u32,
        elements_kind: ElementsKind,
        constructor: Option<ObjectTemplate>,
    ) -> Map {
        let mut flags = MapFlags::default();
        flags.set(MapFlags::EXTENSIBLE, true);
        flags.set(MapFlags::STABLE, true);
        flags.set(MapFlags::OWNS_DESCRIPTORS, true);
        if let Some(template) = constructor {
            let template = &agent[template];
            flags.set(
                MapFlags::HAS_NAMED_INTERCEPTOR,
                template.named_interceptor.is_some(),
            );
            flags.set(
                MapFlags::HAS_INDEXED_INTERCEPTOR,
                template.indexed_interceptor.is_some(),
            );
            flags.set(
                MapFlags::ACCESS_CHECK_NEEDED,
                template.access_check.is_some(),
            );
        }
        let descriptors = agent.empty_descriptor_array;
        let map = agent.heap.create(MapRecord {
            instance_type,
            in_object_properties,
            unused_property_fields: in_object_properties,
            number_of_own_descriptors: 0,
            enum_length: None,
            descriptors,
            transitions: Transitions::None,
            prototype_transitions: Vec::new(),
            back_pointer: None,
            prototype,
            constructor,
            elements_kind,
            flags,
            dependent_code: DependentCode::default(),
        });
        map.trace(agent, "InitialMap");
        map
    }

    /// Copy `map` with no descriptors and no transitions. The copy is stable,
    /// not deprecated and owns its (empty) descriptor array.
    pub(crate) fn raw_copy(agent: &mut Agent, map: Map, in_object_properties: u32) -> Map {
        let source = &agent.heap[map];
        let mut flags = source.flags;
        flags.set(MapFlags::OWNS_DESCRIPTORS, true);
        flags.set(MapFlags::DEPRECATED, false);
        if !source.is_dictionary_map() {
            flags.set(MapFlags::STABLE, true);
        }
        let record = MapRecord {
            instance_type: source.instance_type,
            in_object_properties,
            unused_property_fields: source.unused_property_fields,
            number_of_own_descriptors: 0,
            enum_length: None,
            descriptors: agent.empty_descriptor_array,
            transitions: Transitions::None,
            prototype_transitions: Vec::new(),
            back_pointer: None,
            prototype: source.prototype,
            constructor: source.constructor,
            elements_kind: source.elements_kind,
            flags,
            dependent_code: DependentCode::default(),
        };
        agent.heap.create(record)
    }

    /// Copy of `map` without descriptors; callers install their own.
    pub(crate) fn copy_drop_descriptors(agent: &mut Agent, map: Map) -> Map {
        let in_object_properties = agent.heap[map].in_object_properties;
        Self::raw_copy(agent, map, in_object_properties)
    }

    /// Install `descriptors` as this Map's own descriptors, taking ownership.
    pub(crate) fn initialize_descriptors(self, heap: &mut Heap, descriptors: DescriptorArray) {
        let count = descriptors.number_of_descriptors(heap) as u32;
        let record = &mut heap[self];
        record.descriptors = descriptors;
        record.number_of_own_descriptors = count;
        record.flags.set(MapFlags::OWNS_DESCRIPTORS, true);
    }

    pub fn instance_type(self, agent: &Agent) -> InstanceType {
        agent.heap[self].instance_type
    }

    pub fn in_object_properties(self, agent: &Agent) -> u32 {
        agent.heap[self].in_object_properties
    }

    pub fn unused_property_fields(self, agent: &Agent) -> u32 {
        agent.heap[self].unused_property_fields
    }

    pub fn number_of_own_descriptors(self, agent: &Agent) -> usize {
        agent.heap[self].number_of_own_descriptors as usize
    }

    pub fn descriptors(self, agent: &Agent) -> DescriptorArray {
        agent.heap[self].descriptors
    }

    pub fn back_pointer(self, agent: &Agent) -> Option<Map> {
        agent.heap[self].back_pointer
    }

    pub fn prototype(self, agent: &Agent) -> Option<Object> {
        agent.heap[self].prototype
    }

    pub fn constructor(self, agent: &Agent) -> Option<ObjectTemplate> {
        agent.heap[self].constructor
    }

    pub fn elements_kind(self, agent: &Agent) -> ElementsKind {
        agent.heap[self].elements_kind
    }

    pub fn enum_length(self, agent: &Agent) -> Option<u32> {
        agent.heap[self].enum_length
    }

    pub fn is_extensible(self, agent: &Agent) -> bool {
        agent.heap[self].is_extensible()
    }

    pub fn is_dictionary_map(self, agent: &Agent) -> bool {
        agent.heap[self].is_dictionary_map()
    }

    pub fn is_deprecated(self, agent: &Agent) -> bool {
        agent.heap[self].is_deprecated()
    }

    pub fn is_stable(self, agent: &Agent) -> bool {
        agent.heap[self].flags.contains(MapFlags::STABLE)
    }

    pub fn is_prototype_map(self, agent: &Agent) -> bool {
        agent.heap[self].is_prototype_map()
    }

    pub fn owns_descriptors(self, agent: &Agent) -> bool {
        agent.heap[self].owns_descriptors()
    }

    pub fn is_strong(self, agent: &Agent) -> bool {
        agent.heap[self].flags.contains(MapFlags::STRONG)
    }

    pub fn has_named_interceptor(self, agent: &Agent) -> bool {
        agent.heap[self]
            .flags
            .contains(MapFlags::HAS_NAMED_INTERCEPTOR)
    }

    pub fn has_indexed_interceptor(self, agent: &Agent) -> bool {
        agent.heap[self]
            .flags
            .contains(MapFlags::HAS_INDEXED_INTERCEPTOR)
    }

    pub fn is_access_check_needed(self, agent: &Agent) -> bool {
        agent.heap[self].flags.contains(MapFlags::ACCESS_CHECK_NEEDED)
    }

    /// Number of outgoing transitions, not counting prototype transitions.
    pub fn number_of_transitions(self, agent: &Agent) -> usize {
        agent.heap[self].transitions.len()
    }

    /// Outgoing transitions in transition array order.
    pub fn transitions(self, agent: &Agent) -> Vec<(TransitionKey, Map)> {
        agent.heap[self].transitions.iter().collect()
    }

    pub(crate) fn set_flag(self, heap: &mut Heap, flag: MapFlags, value: bool) {
        heap[self].flags.set(flag, value);
    }

    pub(crate) fn set_elements_kind(self, heap: &mut Heap, kind: ElementsKind) {
        heap[self].elements_kind = kind;
    }

    pub(crate) fn set_enum_length(self, heap: &mut Heap, length: Option<u32>) {
        heap[self].enum_length = length;
    }

    /// Returns true if this Map is a root of its transition tree.
    pub fn is_root(self, agent: &Agent) -> bool {
        agent.heap[self].back_pointer.is_none()
    }

    pub fn find_root_map(self, heap: &Heap) -> Map {
        let mut current = self;
        while let Some(parent) = heap[current].back_pointer {
            current = parent;
        }
        current
    }

    /// The Map that introduced descriptor `descriptor`: the earliest
    /// ancestor that still has it among its own descriptors.
    pub fn find_field_owner(self, heap: &Heap, descriptor: usize) -> Map {
        let mut result = self;
        while let Some(parent) = heap[result].back_pointer {
            if heap[parent].number_of_own_descriptors as usize <= descriptor {
                break;
            }
            result = parent;
        }
        result
    }

    /// Number of own descriptors stored in object fields.
    pub fn number_of_fields(self, heap: &Heap) -> u32 {
        let record = &heap[self];
        let count = record.number_of_own_descriptors as usize;
        (0..count)
            .filter(|&i| record.descriptors.get_details(heap, i).location() == PropertyLocation::Field)
            .count() as u32
    }

    /// Field index handed out to the next field added to this Map.
    pub fn next_free_property_index(self, heap: &Heap) -> u32 {
        let record = &heap[self];
        let count = record.number_of_own_descriptors as usize;
        (0..count)
            .map(|i| record.descriptors.get_details(heap, i))
            .filter(|details| details.location() == PropertyLocation::Field)
            .map(|details| details.field_index() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Slots the out-of-object backing store of an instance must have.
    pub fn backing_store_capacity(self, heap: &Heap) -> u32 {
        let record = &heap[self];
        let total = self.number_of_fields(heap) + record.unused_property_fields;
        total.saturating_sub(record.in_object_properties)
    }

    pub(crate) fn required_layout(self, heap: &Heap) -> RequiredLayout {
        let record = &heap[self];
        if record.is_dictionary_map() {
            return RequiredLayout::Dictionary;
        }
        RequiredLayout::Fast {
            in_object_slots: record.in_object_properties,
            backing_store_slots: self
                .number_of_fields(heap)
                .saturating_sub(record.in_object_properties),
        }
    }

    pub(crate) fn field_index(self, heap: &Heap, descriptor: usize) -> FieldIndex {
        let record = &heap[self];
        let details = record.descriptors.get_details(heap, descriptor);
        debug_assert_eq!(details.location(), PropertyLocation::Field);
        FieldIndex::new(
            details.field_index(),
            record.in_object_properties,
            details.representation(),
        )
    }

    /// Details of the most recently added own descriptor.
    pub(crate) fn last_added(self, heap: &Heap) -> Option<usize> {
        (heap[self].number_of_own_descriptors as usize).checked_sub(1)
    }

    /// Returns true if objects with `self` and `other` can share a
    /// transition tree: same instance type, prototype, template and flags.
    pub fn equivalent_to_for_transition(self, heap: &Heap, other: Map) -> bool {
        let a = &heap[self];
        let b = &heap[other];
        a.instance_type == b.instance_type
            && a.prototype == b.prototype
            && a.constructor == b.constructor
            && a.flags.transition_relevant() == b.flags.transition_relevant()
    }

    /// Returns true if `normalized` is a valid dictionary-mode version of
    /// `self` for the given normalization mode.
    pub(crate) fn equivalent_to_for_normalization(
        self,
        heap: &Heap,
        normalized: Map,
        keep_in_object: bool,
    ) -> bool {
        let fast = &heap[self];
        let dictionary = &heap[normalized];
        let in_object = if keep_in_object {
            fast.in_object_properties
        } else {
            0
        };
        dictionary.is_dictionary_map()
            && fast.instance_type == dictionary.instance_type
            && fast.prototype == dictionary.prototype
            && fast.constructor == dictionary.constructor
            && fast.elements_kind == dictionary.elements_kind
            && fast.is_prototype_map() == dictionary.is_prototype_map()
            && (fast.flags.transition_relevant() | MapFlags::DICTIONARY_MAP.0)
                == dictionary.flags.transition_relevant()
            && in_object == dictionary.in_object_properties
    }

    /// Returns true if objects migrating from `self` to `target` need their
    /// storage rewritten rather than just a Map swap.
    pub(crate) fn instances_need_rewriting(self, heap: &Heap, target: Map) -> bool {
        let old_fields = self.number_of_fields(heap);
        let target_fields = target.number_of_fields(heap);
        debug_assert!(target_fields >= old_fields);
        if target_fields != old_fields {
            return true;
        }
        let old = &heap[self];
        let new = &heap[target];
        for i in 0..old.number_of_own_descriptors as usize {
            let old_details = old.descriptors.get_details(heap, i);
            let new_details = new.descriptors.get_details(heap, i);
            if old_details.representation().is_double() != new_details.representation().is_double()
            {
                return true;
            }
            if old_details.location() == PropertyLocation::Field
                && new_details.location() == PropertyLocation::Field
                && old_details.field_index() != new_details.field_index()
            {
                return true;
            }
        }
        if new.in_object_properties == old.in_object_properties {
            return false;
        }
        target_fields > new.in_object_properties
    }

    /// Register `code` as depending on `group` for this Map.
    pub fn add_dependent_code(self, agent: &mut Agent, group: DependencyGroup, code: CodeId) {
        agent.heap[self].dependent_code.insert(group, code);
    }

    pub(crate) fn deoptimize_dependent_code(self, agent: &mut Agent, group: DependencyGroup) {
        let codes = agent.heap[self].dependent_code.take_group(group);
        mark_code_for_deoptimization(agent, group, codes);
    }

    /// Called before the layout of an object carrying this Map changes in a
    /// way the Map alone does not describe (a leaf Map losing its
    /// stability).
    pub(crate) fn notify_leaf_map_layout_change(self, agent: &mut Agent) {
        if agent.heap[self].flags.contains(MapFlags::STABLE) {
            self.set_flag(&mut agent.heap, MapFlags::STABLE, false);
            self.deoptimize_dependent_code(agent, DependencyGroup::PrototypeCheck);
        }
    }

    /// Mark this Map and its whole transition subtree as deprecated.
    pub(crate) fn deprecate_transition_tree(self, agent: &mut Agent) {
        let mut worklist = vec![self];
        while let Some(map) = worklist.pop() {
            if agent.heap[map].is_deprecated() {
                continue;
            }
            worklist.extend(agent.heap[map].transitions.iter().map(|(_, target)| target));
            map.set_flag(&mut agent.heap, MapFlags::DEPRECATED, true);
            map.deoptimize_dependent_code(agent, DependencyGroup::Transition);
            map.notify_leaf_map_layout_change(agent);
            map.trace(agent, "Deprecate");
        }
    }

    /// Record a structural event on this Map.
    pub(crate) fn trace(self, agent: &Agent, reason: &str) {
        if agent.options.trace_maps {
            let record = &agent.heap[self];
            log::debug!(
                "[TraceMaps: {reason} map={:?} descriptors={} fields={} dictionary={}]",
                self.0,
                record.number_of_own_descriptors,
                self.number_of_fields(&agent.heap),
                record.is_dictionary_map(),
            );
        } else {
            log::trace!("[TraceMaps: {reason} map={:?}]", self.0);
        }
    }
}

impl CreateHeapData<MapRecord, Map> for Heap {
    fn create(&mut self, data: MapRecord) -> Map {
        self.allocate(10, "Map");
        Heap::reserve(&mut self.maps, 1, "Map");
        self.maps.push(Some(data));
        Map(MapIndex::last(&self.maps))
    }
}

impl Index<Map> for Heap {
    type Output = MapRecord;

    fn index(&self, index: Map) -> &Self::Output {
        self.maps
            .get(index.get_index())
            .expect("Map out of bounds")
            .as_ref()
            .expect("Map slot empty")
    }
}

impl IndexMut<Map> for Heap {
    fn index_mut(&mut self, index: Map) -> &mut Self::Output {
        self.maps
            .get_mut(index.get_index())
            .expect("Map out of bounds")
            .as_mut()
            .expect("Map slot empty")
    }
}

impl Index<Map> for Agent {
    type Output = MapRecord;

    fn index(&self, index: Map) -> &Self::Output {
        &self.heap[index]
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ecmascript::{
        builtins::ordinary::elements_kind::INITIAL_OBJECT_ELEMENTS_KIND,
        execution::Options,
    };

    #[test]
    fn root_maps_are_stable_and_own_their_descriptors() {
        let mut agent = Agent::new(Options::default());
        let map = Map::create_root(
            &mut agent,
            InstanceType::Object,
            None,
            4,
            INITIAL_OBJECT_ELEMENTS_KIND,
            None,
        );
        assert!(map.is_root(&agent));
        assert!(map.is_stable(&agent));
        assert!(map.owns_descriptors(&agent));
        assert!(map.is_extensible(&agent));
        assert_eq!(map.unused_property_fields(&agent), 4);
        assert_eq!(map.find_root_map(&agent.heap), map);
        assert_eq!(map.backing_store_capacity(&agent.heap), 0);
    }

    #[test]
    fn notify_layout_change_deoptimizes_prototype_checks_once() {
        let mut agent = Agent::new(Options::default());
        let map = Map::create_root(
            &mut agent,
            InstanceType::Object,
            None,
            0,
            INITIAL_OBJECT_ELEMENTS_KIND,
            None,
        );
        map.add_dependent_code(&mut agent, DependencyGroup::PrototypeCheck, CodeId(7));
        map.notify_leaf_map_layout_change(&mut agent);
        map.notify_leaf_map_layout_change(&mut agent);
        assert!(!map.is_stable(&agent));
        assert_eq!(agent.deoptimized_code(), &[CodeId(7)]);
    }
}
