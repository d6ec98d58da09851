// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## Instance migration
//!
//! Moving an object's named property storage from the layout of its current
//! Map to the layout of a new one: fast to fast, fast to dictionary and
//! dictionary to fast.
//!
//! A concurrent collector reads an object's Map without synchronizing with
//! the mutator, so every migration prepares the new storage completely,
//! turns any space the object lost into filler, and only then publishes the
//! new Map with [`publish_map`].

use super::{
    descriptor_array::{Descriptor, DescriptorArray, DescriptorValue, FieldType},
    dictionary::{DictionaryValue, NameDictionary},
    map::{Map, MapFlags},
    map_transitions::{NormalizationMode, normalize},
    map_updater::{try_update, update},
    property_details::{PropertyDetails, PropertyKind, PropertyLocation, Representation},
};
use crate::{
    ecmascript::{
        execution::Agent,
        types::{FieldValue, HeapNumber, OrdinaryObject, PropertyStorage, Value},
    },
    heap::heap_observer::{MapPublication, WriteLocation},
};

/// Release-store `new_map` as the Map of `object`. The object's storage must
/// already match the new Map.
pub(crate) fn publish_map(agent: &mut Agent, object: OrdinaryObject, new_map: Map) {
    let old_map = agent[object].map;
    if old_map != new_map && old_map.is_prototype_map(agent) {
        // Code relying on the old shape of a prototype must not outlive it.
        old_map.notify_leaf_map_layout_change(agent);
    }
    agent[object].map = new_map;
    let publication = MapPublication {
        object,
        old_map,
        new_map,
        layout: agent[object].storage_layout(),
        required: new_map.required_layout(&agent.heap),
    };
    debug_assert!(publication.is_consistent());
    agent.heap.observer.publish_map(&publication);
}

/// Value held by a field slot.
fn slot_value(agent: &Agent, slot: FieldValue) -> Value {
    match slot {
        FieldValue::Uninitialized => Value::Undefined,
        FieldValue::Tagged(value) => value,
        FieldValue::MutableDouble(number) => Value::from_f64(agent[number]),
    }
}

/// A fresh slot for a new field of the given representation.
fn new_storage_for(agent: &mut Agent, representation: Representation, value: Option<Value>) -> FieldValue {
    if representation.is_double() {
        let number = value.and_then(Value::as_number).unwrap_or(0.0);
        FieldValue::MutableDouble(HeapNumber::new(&mut agent.heap, number))
    } else {
        match value {
            Some(value) => FieldValue::Tagged(value),
            None => FieldValue::Uninitialized,
        }
    }
}

/// Move `object` to `new_map`, converting its storage as needed.
///
/// Dictionary-mode objects may only move to other dictionary Maps here; use
/// [`migrate_slow_to_fast`] to leave dictionary mode.
pub(crate) fn migrate_to_map(
    agent: &mut Agent,
    object: OrdinaryObject,
    new_map: Map,
    expected_additional_properties: usize,
) {
    let old_map = object.map(agent);
    if old_map == new_map {
        return;
    }
    if object.has_fast_properties(agent) {
        if !new_map.is_dictionary_map(agent) {
            migrate_fast_to_fast(agent, object, new_map);
            if old_map.is_prototype_map(agent) {
                // A prototype Map belongs to exactly one object; drop its
                // descriptors so nothing keeps sharing them.
                let empty = agent.empty_descriptor_array;
                old_map.initialize_descriptors(&mut agent.heap, empty);
            }
        } else {
            migrate_fast_to_slow(agent, object, new_map, expected_additional_properties);
        }
    } else {
        // Slow-to-slow migration only swaps the Map.
        debug_assert!(new_map.is_dictionary_map(agent));
        publish_map(agent, object, new_map);
    }
}

fn migrate_fast_to_fast(agent: &mut Agent, object: OrdinaryObject, new_map: Map) {
    let old_map = object.map(agent);
    let old_nof = old_map.number_of_own_descriptors(agent);
    let new_nof = new_map.number_of_own_descriptors(agent);

    // A transition adding a single property.
    if new_map.back_pointer(agent) == Some(old_map) && new_nof == old_nof + 1 {
        let last = new_nof - 1;
        let details = new_map.descriptors(agent).get_details(&agent.heap, last);
        if details.location() == PropertyLocation::Descriptor {
            publish_map(agent, object, new_map);
            return;
        }
        let index = new_map.field_index(&agent.heap, last);
        let backing_len = agent[object].properties.backing_store_len();
        if index.is_in_object() || index.out_of_object_index() < backing_len {
            publish_map(agent, object, new_map);
            return;
        }
        // The object ran out of property space: extend the backing store.
        let capacity = new_map.backing_store_capacity(&agent.heap) as usize;
        let grow_by = capacity.saturating_sub(backing_len);
        agent.heap.allocate(grow_by, "PropertyArray");
        if let PropertyStorage::Fast(fields) = &mut agent[object].properties {
            fields.resize(capacity, FieldValue::Uninitialized);
        }
        agent
            .heap
            .record_write(WriteLocation::Properties(object));
        publish_map(agent, object, new_map);
        return;
    }

    if !old_map.instances_need_rewriting(&agent.heap, new_map) {
        publish_map(agent, object, new_map);
        return;
    }

    let in_object = new_map.in_object_properties(agent) as usize;
    let external = new_map.backing_store_capacity(&agent.heap) as usize;
    let mut new_in_object = vec![FieldValue::Uninitialized; in_object];
    let mut new_backing_store = vec![FieldValue::Uninitialized; external];
    let old_descriptors = old_map.descriptors(agent);
    let new_descriptors = new_map.descriptors(agent);

    for i in 0..new_nof {
        let details = new_descriptors.get_details(&agent.heap, i);
        if details.kind() != PropertyKind::Data || details.location() != PropertyLocation::Field {
            continue;
        }
        let representation = details.representation();
        let slot = if i >= old_nof {
            new_storage_for(agent, representation, None)
        } else {
            let old = *old_descriptors.get(&agent.heap, i);
            match old.value {
                // An accessor reconfigured into a data field; the value is
                // written right after the migration.
                DescriptorValue::Accessor(_) => new_storage_for(agent, representation, None),
                DescriptorValue::Constant(value) => {
                    debug_assert!(!representation.is_double());
                    FieldValue::Tagged(value)
                }
                DescriptorValue::Field(_) => {
                    let old_representation = old.details.representation();
                    let index = old_map.field_index(&agent.heap, i);
                    let slot = object.field_slot(agent, index);
                    match (old_representation.is_double(), representation.is_double()) {
                        (false, true) => {
                            let value = match slot {
                                FieldValue::Uninitialized => None,
                                slot => Some(slot_value(agent, slot)),
                            };
                            new_storage_for(agent, representation, value)
                        }
                        (true, false) => FieldValue::Tagged(slot_value(agent, slot)),
                        _ => slot,
                    }
                }
            }
        };
        let target = new_map.field_index(&agent.heap, i);
        if target.is_in_object() {
            new_in_object[target.property_index as usize] = slot;
        } else {
            new_backing_store[target.out_of_object_index()] = slot;
        }
    }

    let old_in_object = agent[object].in_object.len();
    let old_backing_len = agent[object].properties.backing_store_len();
    agent.heap.allocate(external, "PropertyArray");
    agent.heap.adjust_live_words(-(old_backing_len as isize));
    {
        let data = &mut agent[object];
        data.in_object = new_in_object;
        data.properties = PropertyStorage::Fast(new_backing_store);
    }
    agent
        .heap
        .record_write(WriteLocation::Properties(object));
    // Create filler past the new instance size before publishing the Map.
    if old_in_object > in_object {
        agent.heap.create_filler(object, old_in_object - in_object);
    }
    publish_map(agent, object, new_map);
}

/// Move a fast-mode object to the dictionary Map `new_map`.
fn migrate_fast_to_slow(
    agent: &mut Agent,
    object: OrdinaryObject,
    new_map: Map,
    expected_additional_properties: usize,
) {
    let map = object.map(agent);
    let real_size = map.number_of_own_descriptors(agent);
    let property_count = real_size
        + if expected_additional_properties > 0 {
            expected_additional_properties
        } else {
            2
        };
    let mut dictionary = NameDictionary::with_capacity(property_count);
    let descriptors = map.descriptors(agent);
    for i in 0..real_size {
        let descriptor = *descriptors.get(&agent.heap, i);
        let details = descriptor.details;
        let index = i as u32 + 1;
        let (value, kind) = match descriptor.value {
            DescriptorValue::Constant(value) => (DictionaryValue::Data(value), PropertyKind::Data),
            DescriptorValue::Field(_) => {
                // Doubles are unboxed into immutable numbers.
                let field = map.field_index(&agent.heap, i);
                let value = object.raw_fast_property_at(agent, field);
                (DictionaryValue::Data(value), PropertyKind::Data)
            }
            DescriptorValue::Accessor(accessor) => {
                (DictionaryValue::Accessor(accessor), PropertyKind::Accessor)
            }
        };
        dictionary.add(
            descriptor.key,
            value,
            PropertyDetails::new_dictionary(kind, details.attributes(), index),
        );
    }
    // Copy the next enumeration index from the descriptors.
    dictionary.set_next_enumeration_index(real_size as u32 + 1);
    agent.heap.allocate(dictionary.size_in_words(), "NameDictionary");

    let old_in_object = agent[object].in_object.len();
    let new_in_object = new_map.in_object_properties(agent) as usize;
    let old_backing_len = agent[object].properties.backing_store_len();
    {
        let data = &mut agent[object];
        data.properties = PropertyStorage::Dictionary(dictionary);
        // In-object space of a slow-mode object holds no stale values.
        data.in_object = vec![FieldValue::Uninitialized; new_in_object];
    }
    agent.heap.adjust_live_words(-(old_backing_len as isize));
    agent
        .heap
        .record_write(WriteLocation::Properties(object));
    // Resize the object before publishing the Map.
    if old_in_object > new_in_object {
        agent.heap.create_filler(object, old_in_object - new_in_object);
    }
    publish_map(agent, object, new_map);
    log::debug!("[props to dictionary: {object:?}, {real_size} properties]");
}

/// Move `object` to dictionary mode.
pub fn normalize_properties(
    agent: &mut Agent,
    object: OrdinaryObject,
    mode: NormalizationMode,
    expected_additional_properties: usize,
    reason: &str,
) {
    if !object.has_fast_properties(agent) {
        return;
    }
    let map = object.map(agent);
    let new_map = normalize(agent, map, mode, reason);
    migrate_to_map(agent, object, new_map, expected_additional_properties);
}

/// Move a dictionary-mode object back to fast mode, with `unused_property_fields`
/// spare field slots. Dictionaries too large for a descriptor array and the
/// global object stay in dictionary mode.
pub fn migrate_slow_to_fast(
    agent: &mut Agent,
    object: OrdinaryObject,
    unused_property_fields: u32,
    reason: &str,
) {
    if object.has_fast_properties(agent) {
        return;
    }
    let limit = agent
        .options
        .max_number_of_descriptors
        .min(agent.options.max_slow_to_fast_properties);
    let PropertyStorage::Dictionary(dictionary) = &mut agent[object].properties else {
        // Global objects keep their property cells.
        return;
    };
    // Preserve dictionary mode if there are too many descriptors.
    let number_of_elements = dictionary.len();
    if number_of_elements > limit {
        return;
    }
    let iteration_order = if number_of_elements as u32 + 1 != dictionary.next_enumeration_index() {
        dictionary.generate_new_enumeration_indices()
    } else {
        dictionary.iteration_order()
    };
    let entries: Vec<_> = iteration_order
        .iter()
        .filter_map(|key| dictionary.find(*key).map(|entry| (*key, *entry)))
        .collect();

    let number_of_fields = entries
        .iter()
        .filter(|(_, entry)| match entry.value {
            DictionaryValue::Data(value) => !value.is_callable(agent),
            DictionaryValue::Accessor(_) => false,
        })
        .count() as u32;

    let old_map = object.map(agent);
    let in_object_properties = old_map.in_object_properties(agent);
    let new_map = Map::copy_drop_descriptors(agent, old_map);
    new_map.set_flag(&mut agent.heap, MapFlags::DICTIONARY_MAP, false);
    new_map.set_flag(&mut agent.heap, MapFlags::STABLE, true);
    new_map.trace(agent, reason);

    let old_dictionary_words = match &agent[object].properties {
        PropertyStorage::Dictionary(dictionary) => dictionary.size_in_words(),
        _ => 0,
    };

    if entries.is_empty() {
        agent.heap[new_map].unused_property_fields = in_object_properties;
        agent[object].properties = PropertyStorage::Fast(Vec::new());
        agent.heap.adjust_live_words(-(old_dictionary_words as isize));
        publish_map(agent, object, new_map);
        return;
    }

    let mut unused_property_fields = unused_property_fields;
    let number_of_allocated_fields = match (number_of_fields + unused_property_fields)
        .checked_sub(in_object_properties)
    {
        Some(count) => count,
        None => {
            // Everything fits in-object, including the spare slots.
            unused_property_fields = in_object_properties - number_of_fields;
            0
        }
    };
    let mut in_object = vec![FieldValue::Uninitialized; in_object_properties as usize];
    let mut fields = vec![FieldValue::Uninitialized; number_of_allocated_fields as usize];
    let mut descriptors = Vec::with_capacity(entries.len());
    let mut current_offset = 0u32;
    for (key, entry) in entries {
        let attributes = entry.details.attributes();
        let descriptor = match entry.value {
            DictionaryValue::Data(value) if value.is_callable(agent) => {
                Descriptor::data_constant(key, value, attributes)
            }
            DictionaryValue::Data(value) => {
                if current_offset < in_object_properties {
                    in_object[current_offset as usize] = FieldValue::Tagged(value);
                } else {
                    fields[(current_offset - in_object_properties) as usize] =
                        FieldValue::Tagged(value);
                }
                let descriptor = Descriptor::data_field(
                    key,
                    current_offset,
                    attributes,
                    Representation::Tagged,
                    FieldType::Any,
                );
                current_offset += 1;
                descriptor
            }
            DictionaryValue::Accessor(accessor) => {
                Descriptor::accessor_constant(key, accessor, attributes)
            }
        };
        descriptors.push(descriptor);
    }
    debug_assert_eq!(current_offset, number_of_fields);
    let descriptors = DescriptorArray::allocate(&mut agent.heap, descriptors);
    new_map.initialize_descriptors(&mut agent.heap, descriptors);
    agent.heap[new_map].unused_property_fields = unused_property_fields;

    agent.heap.allocate(fields.len(), "PropertyArray");
    agent.heap.adjust_live_words(-(old_dictionary_words as isize));
    {
        let data = &mut agent[object];
        data.in_object = in_object;
        data.properties = PropertyStorage::Fast(fields);
    }
    agent
        .heap
        .record_write(WriteLocation::Properties(object));
    publish_map(agent, object, new_map);
}

/// Move `object` off its deprecated Map.
pub fn migrate_instance(agent: &mut Agent, object: OrdinaryObject) {
    let original_map = object.map(agent);
    let map = update(agent, original_map);
    migrate_to_map(agent, object, map, 0);
    log::trace!("[migrating {object:?}: {original_map:?} -> {map:?}]");
}

/// Move `object` off its deprecated Map if an up-to-date Map already
/// exists. Returns false if it does not.
pub fn try_migrate_instance(agent: &mut Agent, object: OrdinaryObject) -> bool {
    let original_map = object.map(agent);
    let Some(new_map) = try_update(agent, original_map) else {
        return false;
    };
    migrate_to_map(agent, object, new_map, 0);
    true
}
