// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## Descriptor arrays
//!
//! A descriptor array is the property table of a fast-mode Map. Entries are
//! stored in insertion order, which is also the order field indices are
//! handed out in. A secondary index keeps the entries sorted by key hash for
//! binary search.
//!
//! Descriptor arrays are shared along a transition chain: a child Map that
//! adds one property appends to its parent's array and takes over
//! ownership. Each Map only looks at the first
//! [`number_of_own_descriptors`](super::map::Map::number_of_own_descriptors)
//! entries, so a search must ignore anything past that prefix.

use std::ops::{Index, IndexMut};

use super::{
    map::Map,
    property_details::{
        PropertyAttributes, PropertyDetails, PropertyKind, PropertyLocation, Representation,
    },
};
use crate::{
    ecmascript::{
        execution::{Agent, embedder::NativeAccessor},
        types::{Object, PropertyKey, Value},
    },
    heap::{CreateHeapData, Heap, heap_observer::WriteLocation, indexes::DescriptorArrayIndex},
};

/// Type of the values a field has held, on top of its representation.
///
/// `None` ⊂ `Class(map)` ⊂ `Any`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// No value has been stored yet.
    None,
    /// Every value stored so far was an object carrying this (stable) Map.
    Class(Map),
    Any,
}

impl FieldType {
    pub fn now_is(self, other: FieldType) -> bool {
        self == FieldType::None || other == FieldType::Any || self == other
    }

    pub fn now_contains(self, agent: &Agent, value: Value) -> bool {
        match self {
            FieldType::Any => true,
            FieldType::None => false,
            FieldType::Class(map) => match value {
                Value::Object(Object::Object(object)) => object.map(agent) == map,
                _ => false,
            },
        }
    }

    /// The most specific field type describing `value` when stored with the
    /// given representation.
    pub fn optimal_for(agent: &Agent, value: Value, representation: Representation) -> Self {
        if representation.is_none() {
            return FieldType::None;
        }
        if agent.options.track_field_types
            && representation.is_heap_object()
            && let Value::Object(Object::Object(object)) = value
        {
            let map = object.map(agent);
            if map.is_stable(agent) {
                return FieldType::Class(map);
            }
        }
        FieldType::Any
    }

    /// Least upper bound of two field types of fields with the given
    /// representations.
    pub fn generalize(
        rep1: Representation,
        type1: FieldType,
        rep2: Representation,
        type2: FieldType,
    ) -> FieldType {
        if rep1.is_none() {
            return type2;
        }
        if rep2.is_none() {
            return type1;
        }
        if rep1.is_heap_object() && rep2.is_heap_object() {
            if type1.now_is(type2) {
                return type2;
            }
            if type2.now_is(type1) {
                return type1;
            }
        }
        FieldType::Any
    }
}

/// A JavaScript getter/setter pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AccessorPair {
    pub getter: Option<Object>,
    pub setter: Option<Object>,
}

/// An accessor property's implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Accessor {
    Pair(AccessorPair),
    Native(NativeAccessor),
}

/// Payload of a descriptor, matching its details' kind and location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DescriptorValue {
    /// Data property stored in an object field.
    Field(FieldType),
    /// Data property whose value lives in the descriptor.
    Constant(Value),
    Accessor(Accessor),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Descriptor {
    pub key: PropertyKey,
    pub details: PropertyDetails,
    pub value: DescriptorValue,
}

impl Descriptor {
    pub fn data_field(
        key: PropertyKey,
        field_index: u32,
        attributes: PropertyAttributes,
        representation: Representation,
        field_type: FieldType,
    ) -> Self {
        Self {
            key,
            details: PropertyDetails::new(
                PropertyKind::Data,
                attributes,
                PropertyLocation::Field,
                representation,
                field_index,
            ),
            value: DescriptorValue::Field(field_type),
        }
    }

    pub fn data_constant(key: PropertyKey, value: Value, attributes: PropertyAttributes) -> Self {
        Self {
            key,
            details: PropertyDetails::new(
                PropertyKind::Data,
                attributes,
                PropertyLocation::Descriptor,
                Representation::Tagged,
                0,
            ),
            value: DescriptorValue::Constant(value),
        }
    }

    pub fn accessor_constant(
        key: PropertyKey,
        accessor: Accessor,
        attributes: PropertyAttributes,
    ) -> Self {
        Self {
            key,
            details: PropertyDetails::new(
                PropertyKind::Accessor,
                attributes,
                PropertyLocation::Descriptor,
                Representation::Tagged,
                0,
            ),
            value: DescriptorValue::Accessor(accessor),
        }
    }

    pub fn field_type(&self) -> FieldType {
        match self.value {
            DescriptorValue::Field(field_type) => field_type,
            _ => FieldType::Any,
        }
    }

    pub fn constant(&self) -> Option<Value> {
        match self.value {
            DescriptorValue::Constant(value) => Some(value),
            _ => None,
        }
    }

    pub fn accessor(&self) -> Option<Accessor> {
        match self.value {
            DescriptorValue::Accessor(accessor) => Some(accessor),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DescriptorArrayRecord {
    pub(crate) descriptors: Vec<Descriptor>,
    /// `(hash, descriptor index)` pairs sorted by hash. Equal hashes are kept
    /// in insertion order.
    pub(crate) sorted: Vec<(u32, u32)>,
    /// Enumerable own string keys of the longest Map sharing this array that
    /// has computed them, in property order.
    pub(crate) enum_cache: Vec<PropertyKey>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorArray(pub(crate) DescriptorArrayIndex);

impl DescriptorArray {
    pub(crate) fn get_index(self) -> usize {
        self.0.into_index()
    }

    /// Allocate a descriptor array holding the given descriptors.
    pub(crate) fn allocate(heap: &mut Heap, descriptors: Vec<Descriptor>) -> Self {
        let mut sorted: Vec<(u32, u32)> = descriptors
            .iter()
            .enumerate()
            .map(|(i, d)| (d.key.hash(heap), i as u32))
            .collect();
        sorted.sort();
        heap.create(DescriptorArrayRecord {
            descriptors,
            sorted,
            enum_cache: Vec::new(),
        })
    }

    pub fn number_of_descriptors(self, heap: &Heap) -> usize {
        heap[self].descriptors.len()
    }

    pub fn get(self, heap: &Heap, index: usize) -> &Descriptor {
        &heap[self].descriptors[index]
    }

    pub fn get_key(self, heap: &Heap, index: usize) -> PropertyKey {
        heap[self].descriptors[index].key
    }

    pub fn get_details(self, heap: &Heap, index: usize) -> PropertyDetails {
        heap[self].descriptors[index].details
    }

    pub fn get_value(self, heap: &Heap, index: usize) -> DescriptorValue {
        heap[self].descriptors[index].value
    }

    /// Binary search for `key` among the first `valid` descriptors.
    pub fn search(self, heap: &Heap, key: PropertyKey, valid: usize) -> Option<usize> {
        if valid == 0 {
            return None;
        }
        let record = &heap[self];
        // Small arrays are cheaper to scan linearly.
        if valid <= 8 {
            return record.descriptors[..valid.min(record.descriptors.len())]
                .iter()
                .position(|d| d.key == key);
        }
        let hash = key.hash(heap);
        let start = record.sorted.partition_point(|(h, _)| *h < hash);
        record.sorted[start..]
            .iter()
            .take_while(|(h, _)| *h == hash)
            .map(|(_, i)| *i as usize)
            .find(|&i| i < valid && record.descriptors[i].key == key)
    }

    /// Append a descriptor. The array must not contain the key.
    pub(crate) fn append(self, heap: &mut Heap, descriptor: Descriptor) {
        let hash = descriptor.key.hash(heap);
        let record = &mut heap[self];
        let index = record.descriptors.len() as u32;
        record.descriptors.push(descriptor);
        let position = record.sorted.partition_point(|(h, _)| *h <= hash);
        record.sorted.insert(position, (hash, index));
        heap.record_write(WriteLocation::Descriptors(self));
    }

    /// Overwrite the descriptor at `index`; the key must not change.
    pub(crate) fn replace(self, heap: &mut Heap, index: usize, descriptor: Descriptor) {
        let record = &mut heap[self];
        debug_assert_eq!(record.descriptors[index].key, descriptor.key);
        record.descriptors[index] = descriptor;
        heap.record_write(WriteLocation::Descriptors(self));
    }

    pub(crate) fn set_value(self, heap: &mut Heap, index: usize, value: DescriptorValue) {
        heap[self].descriptors[index].value = value;
        heap.record_write(WriteLocation::Descriptors(self));
    }

    pub(crate) fn set_details(self, heap: &mut Heap, index: usize, details: PropertyDetails) {
        heap[self].descriptors[index].details = details;
        heap.record_write(WriteLocation::Descriptors(self));
    }

    /// Copy the first `count` descriptors into a fresh array.
    pub(crate) fn copy_up_to(self, heap: &mut Heap, count: usize) -> Self {
        let descriptors = heap[self].descriptors[..count].to_vec();
        Self::allocate(heap, descriptors)
    }

    /// Copy the first `count` descriptors, adding `attributes` to every
    /// property except private symbols. Accessors never become read-only.
    pub(crate) fn copy_up_to_add_attributes(
        self,
        agent: &mut Agent,
        count: usize,
        attributes: PropertyAttributes,
    ) -> Self {
        let mut descriptors = agent.heap[self].descriptors[..count].to_vec();
        for descriptor in descriptors.iter_mut() {
            if descriptor.key.is_private(agent) {
                continue;
            }
            let mut add = attributes;
            // Read-only is meaningless for getter/setter pairs.
            if matches!(descriptor.value, DescriptorValue::Accessor(Accessor::Pair(_))) {
                add = add.difference(PropertyAttributes::READ_ONLY);
            }
            descriptor.details = descriptor.details.copy_add_attributes(add);
        }
        Self::allocate(&mut agent.heap, descriptors)
    }

    /// Returns true if the first `count` descriptors of both arrays are
    /// identical.
    pub(crate) fn is_equal_up_to(self, heap: &Heap, other: DescriptorArray, count: usize) -> bool {
        let a = &heap[self].descriptors;
        let b = &heap[other].descriptors;
        if a.len() < count || b.len() < count {
            return false;
        }
        a[..count] == b[..count]
    }

    pub fn enum_cache(self, heap: &Heap) -> &[PropertyKey] {
        &heap[self].enum_cache
    }

    pub(crate) fn set_enum_cache(self, heap: &mut Heap, keys: Vec<PropertyKey>) {
        heap[self].enum_cache = keys;
        heap.record_write(WriteLocation::Descriptors(self));
    }

    /// Drop the enum cache, e.g. after attributes of a shared entry changed.
    pub(crate) fn clear_enum_cache(self, heap: &mut Heap) {
        heap[self].enum_cache.clear();
    }
}

impl CreateHeapData<DescriptorArrayRecord, DescriptorArray> for Heap {
    fn create(&mut self, data: DescriptorArrayRecord) -> DescriptorArray {
        self.allocate(2 + 3 * data.descriptors.len(), "DescriptorArray");
        Heap::reserve(&mut self.descriptor_arrays, 1, "DescriptorArray");
        self.descriptor_arrays.push(Some(data));
        DescriptorArray(DescriptorArrayIndex::last(&self.descriptor_arrays))
    }
}

impl Index<DescriptorArray> for Heap {
    type Output = DescriptorArrayRecord;

    fn index(&self, index: DescriptorArray) -> &Self::Output {
        self.descriptor_arrays
            .get(index.get_index())
            .expect("DescriptorArray out of bounds")
            .as_ref()
            .expect("DescriptorArray slot empty")
    }
}

impl IndexMut<DescriptorArray> for Heap {
    fn index_mut(&mut self, index: DescriptorArray) -> &mut Self::Output {
        self.descriptor_arrays
            .get_mut(index.get_index())
            .expect("DescriptorArray out of bounds")
            .as_mut()
            .expect("DescriptorArray slot empty")
    }
}

impl Index<DescriptorArray> for Agent {
    type Output = DescriptorArrayRecord;

    fn index(&self, index: DescriptorArray) -> &Self::Output {
        &self.heap[index]
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ecmascript::execution::Options;

    fn key(agent: &mut Agent, name: &str) -> PropertyKey {
        PropertyKey::from_str(agent, name)
    }

    #[test]
    fn search_respects_valid_prefix() {
        let mut agent = Agent::new(Options::default());
        let array = DescriptorArray::allocate(&mut agent.heap, Vec::new());
        let names: Vec<PropertyKey> = (0..20).map(|i| key(&mut agent, &format!("p{i}"))).collect();
        for (i, name) in names.iter().enumerate() {
            array.append(
                &mut agent.heap,
                Descriptor::data_field(
                    *name,
                    i as u32,
                    PropertyAttributes::NONE,
                    Representation::Smi,
                    FieldType::Any,
                ),
            );
        }
        for (i, name) in names.iter().enumerate() {
            assert_eq!(array.search(&agent.heap, *name, 20), Some(i));
            assert_eq!(array.search(&agent.heap, *name, 3), (i < 3).then_some(i));
        }
        let missing = key(&mut agent, "missing");
        assert_eq!(array.search(&agent.heap, missing, 20), None);
    }

    #[test]
    fn copy_add_attributes_never_makes_accessors_read_only() {
        let mut agent = Agent::new(Options::default());
        let a = key(&mut agent, "a");
        let b = key(&mut agent, "b");
        let array = DescriptorArray::allocate(
            &mut agent.heap,
            vec![
                Descriptor::data_constant(a, Value::Integer(1), PropertyAttributes::NONE),
                Descriptor::accessor_constant(
                    b,
                    Accessor::Pair(AccessorPair::default()),
                    PropertyAttributes::NONE,
                ),
            ],
        );
        let frozen = array.copy_up_to_add_attributes(&mut agent, 2, PropertyAttributes::FROZEN);
        assert_eq!(
            frozen.get_details(&agent.heap, 0).attributes(),
            PropertyAttributes::FROZEN
        );
        assert_eq!(
            frozen.get_details(&agent.heap, 1).attributes(),
            PropertyAttributes::DONT_DELETE
        );
    }

    #[test]
    fn field_type_lattice() {
        assert!(FieldType::None.now_is(FieldType::Any));
        assert!(!FieldType::Any.now_is(FieldType::None));
        let rep = Representation::HeapObject;
        assert_eq!(
            FieldType::generalize(rep, FieldType::None, rep, FieldType::Any),
            FieldType::Any
        );
        assert_eq!(
            FieldType::generalize(Representation::Smi, FieldType::Any, rep, FieldType::Any),
            FieldType::Any
        );
        assert_eq!(
            FieldType::generalize(Representation::None, FieldType::None, rep, FieldType::None),
            FieldType::None
        );
    }
}
