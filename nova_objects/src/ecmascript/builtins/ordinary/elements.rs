// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## Indexed property storage
//!
//! Array-index keyed properties live apart from named properties. Fast
//! elements are a dense vector whose empty slots are holes; once an object's
//! elements become too sparse, or an element needs attributes or an
//! accessor, they move into a [`NumberDictionary`]. Every change of storage
//! shape is mirrored by an elements kind transition of the object's Map.

use super::{
    dictionary::{DictionaryValue, NumberDictionary},
    elements_kind::{ElementsKind, union_elements_kinds},
    map_transitions::transition_elements_to,
    migration::migrate_to_map,
    property_details::{PropertyAttributes, PropertyDetails, PropertyKind},
};
use crate::{
    ecmascript::{
        execution::Agent,
        types::{ObjectKind, OrdinaryObject, Value},
    },
    heap::{Heap, heap_observer::WriteLocation},
};

/// Backing store of an object's indexed properties.
#[derive(Debug, Clone)]
pub enum ElementsStorage {
    /// Smi and tagged kinds. `None` is a hole.
    Objects(Vec<Option<Value>>),
    /// Unboxed doubles. `None` is a hole.
    Doubles(Vec<Option<f64>>),
    Dictionary(NumberDictionary),
    /// Typed arrays read and write their buffer instead.
    External,
}

impl ElementsStorage {
    /// Empty storage for an object whose Map has elements kind `kind`.
    pub(crate) fn for_kind(kind: ElementsKind) -> Self {
        if kind.is_double() {
            ElementsStorage::Doubles(Vec::new())
        } else if kind.is_smi_or_object() {
            ElementsStorage::Objects(Vec::new())
        } else if kind.is_dictionary() {
            ElementsStorage::Dictionary(NumberDictionary::default())
        } else {
            ElementsStorage::External
        }
    }

    /// Capacity of fast storage, or the entry count of a dictionary.
    pub fn len(&self) -> usize {
        match self {
            ElementsStorage::Objects(elements) => elements.len(),
            ElementsStorage::Doubles(elements) => elements.len(),
            ElementsStorage::Dictionary(dictionary) => dictionary.len(),
            ElementsStorage::External => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of present (non-hole) elements.
    fn used(&self) -> usize {
        match self {
            ElementsStorage::Objects(elements) => elements.iter().flatten().count(),
            ElementsStorage::Doubles(elements) => elements.iter().flatten().count(),
            ElementsStorage::Dictionary(dictionary) => dictionary.len(),
            ElementsStorage::External => 0,
        }
    }

    fn get(&self, index: u32) -> Option<(DictionaryValue, PropertyAttributes)> {
        let index_usize = index as usize;
        match self {
            ElementsStorage::Objects(elements) => elements
                .get(index_usize)
                .copied()
                .flatten()
                .map(|value| (DictionaryValue::Data(value), PropertyAttributes::NONE)),
            ElementsStorage::Doubles(elements) => elements
                .get(index_usize)
                .copied()
                .flatten()
                .map(|number| {
                    (
                        DictionaryValue::Data(Value::from_f64(number)),
                        PropertyAttributes::NONE,
                    )
                }),
            ElementsStorage::Dictionary(dictionary) => dictionary
                .get(index)
                .map(|entry| (entry.value, entry.details.attributes())),
            ElementsStorage::External => None,
        }
    }
}

/// Growth policy of fast backing stores.
fn new_elements_capacity(old_capacity: u32) -> u32 {
    old_capacity
        .saturating_add(old_capacity / 2)
        .saturating_add(16)
}

/// Capacity a number dictionary would need for `used` entries.
fn dictionary_capacity_for(used: u32) -> u32 {
    used.saturating_add(used / 2).next_power_of_two().max(4)
}

/// Words per number dictionary entry: key, value and details.
const DICTIONARY_ENTRY_WORDS: u32 = 3;

/// The packed elements kind that can hold `value` unboxed.
fn elements_kind_for_value(value: Value) -> ElementsKind {
    match value {
        Value::Integer(_) => ElementsKind::PackedSmi,
        Value::Number(_) => ElementsKind::PackedDouble,
        _ => ElementsKind::Packed,
    }
}

/// Length bounding the fast elements: the array length for arrays, the
/// backing store capacity otherwise.
fn elements_length(agent: &Agent, object: OrdinaryObject) -> u32 {
    match agent[object].kind {
        ObjectKind::Array { length } => length,
        _ => agent[object].elements.len() as u32,
    }
}

/// The own element `index` of `object`, with its attributes.
pub(crate) fn get_own_element(
    agent: &Agent,
    object: OrdinaryObject,
    index: u32,
) -> Option<(DictionaryValue, PropertyAttributes)> {
    if let ObjectKind::Array { length } = agent[object].kind
        && index >= length
    {
        return None;
    }
    agent[object].elements.get(index)
}

/// Own element indices of `object` in ascending order.
pub(crate) fn element_keys(agent: &Agent, object: OrdinaryObject) -> Vec<u32> {
    let bound = match agent[object].kind {
        ObjectKind::Array { length } => length as usize,
        _ => usize::MAX,
    };
    match &agent[object].elements {
        ElementsStorage::Objects(elements) => elements
            .iter()
            .take(bound)
            .enumerate()
            .filter_map(|(index, slot)| slot.map(|_| index as u32))
            .collect(),
        ElementsStorage::Doubles(elements) => elements
            .iter()
            .take(bound)
            .enumerate()
            .filter_map(|(index, slot)| slot.map(|_| index as u32))
            .collect(),
        ElementsStorage::Dictionary(dictionary) => dictionary.sorted_keys(),
        ElementsStorage::External => Vec::new(),
    }
}

/// Convert fast storage to the layout of `to_kind`.
fn convert_fast_storage(storage: &mut ElementsStorage, to_kind: ElementsKind) {
    let converted = match (&*storage, to_kind.is_double()) {
        (ElementsStorage::Objects(elements), true) => ElementsStorage::Doubles(
            elements
                .iter()
                .map(|slot| slot.map(|value| value.as_number().unwrap_or(f64::NAN)))
                .collect(),
        ),
        (ElementsStorage::Doubles(elements), false) => ElementsStorage::Objects(
            elements
                .iter()
                .map(|slot| slot.map(Value::from_f64))
                .collect(),
        ),
        _ => return,
    };
    *storage = converted;
}

/// Move `object` to elements kind `to_kind`, converting the backing store
/// before the new Map is published.
pub(crate) fn transition_elements_kind(agent: &mut Agent, object: OrdinaryObject, to_kind: ElementsKind) {
    let map = object.map(agent);
    let from_kind = map.elements_kind(agent);
    if from_kind == to_kind {
        return;
    }
    debug_assert!(from_kind.is_fast() && to_kind.is_fast());
    convert_fast_storage(&mut agent[object].elements, to_kind);
    agent.heap.record_write(WriteLocation::Elements(object));
    let new_map = transition_elements_to(agent, map, to_kind);
    migrate_to_map(agent, object, new_map, 0);
    log::trace!(
        "[elements transition {object:?}: {} -> {}]",
        from_kind.name(),
        to_kind.name()
    );
}

/// Returns true if storing at `index` past the fast `capacity` should turn
/// the elements into a dictionary instead of growing them.
fn should_convert_to_slow_elements(agent: &Agent, object: OrdinaryObject, capacity: u32, index: u32) -> bool {
    if index < capacity {
        return false;
    }
    if index - capacity >= agent.options.max_elements_gap {
        return true;
    }
    let new_capacity = new_elements_capacity(index.saturating_add(1));
    if new_capacity <= agent.options.max_unchecked_fast_elements_length {
        return false;
    }
    let used = agent[object].elements.used() as u32;
    let dictionary_size = dictionary_capacity_for(used) * DICTIONARY_ENTRY_WORDS;
    3 * dictionary_size <= new_capacity
}

/// Returns true if dictionary elements are dense enough to become fast
/// again.
fn should_convert_to_fast_elements(agent: &Agent, object: OrdinaryObject) -> bool {
    if !object.map(agent).is_extensible(agent) {
        return false;
    }
    let ElementsStorage::Dictionary(dictionary) = &agent[object].elements else {
        return false;
    };
    if dictionary.requires_slow_elements() {
        return false;
    }
    let new_capacity = match agent[object].kind {
        ObjectKind::Array { length } => length,
        _ => match dictionary.max_number_key() {
            Some(max) => max.saturating_add(1),
            None => 0,
        },
    };
    if new_capacity > i32::MAX as u32 {
        return false;
    }
    // Go fast once the dictionary saves at most half the space.
    let dictionary_size = dictionary_capacity_for(dictionary.len() as u32) * DICTIONARY_ENTRY_WORDS;
    2 * dictionary_size >= new_capacity
}

/// The most specific holey fast kind able to hold every dictionary value.
fn best_fitting_fast_kind(dictionary: &NumberDictionary) -> ElementsKind {
    dictionary
        .iter()
        .fold(ElementsKind::HoleySmi, |kind, (_, entry)| match entry.value {
            DictionaryValue::Data(value) => {
                union_elements_kinds(kind, elements_kind_for_value(value).to_holey())
            }
            DictionaryValue::Accessor(_) => ElementsKind::Holey,
        })
}

/// Turn the fast elements of `object` into dictionary elements.
pub(crate) fn normalize_elements(agent: &mut Agent, object: OrdinaryObject) {
    let map = object.map(agent);
    let from_kind = map.elements_kind(agent);
    if from_kind.is_dictionary() || from_kind.is_typed_array() {
        return;
    }
    let length = elements_length(agent, object) as usize;
    let mut dictionary = NumberDictionary::with_capacity(agent[object].elements.used());
    let details = PropertyDetails::new_dictionary(PropertyKind::Data, PropertyAttributes::NONE, 0);
    let storage = &agent[object].elements;
    for index in 0..storage.len().min(length) {
        if let Some((value, _)) = storage.get(index as u32) {
            dictionary.set(index as u32, value, details);
        }
    }
    let entries = dictionary.len();
    agent[object].elements = ElementsStorage::Dictionary(dictionary);
    agent.heap.record_write(WriteLocation::Elements(object));
    let new_map = transition_elements_to(agent, map, ElementsKind::Dictionary);
    migrate_to_map(agent, object, new_map, 0);
    log::debug!("[elements to dictionary: {object:?}, {entries} elements]");
}

/// Turn dictionary elements back into holey fast elements.
fn make_elements_fast(agent: &mut Agent, object: OrdinaryObject) {
    let ElementsStorage::Dictionary(dictionary) = &agent[object].elements else {
        return;
    };
    let to_kind = best_fitting_fast_kind(dictionary);
    let capacity = dictionary.max_number_key().map_or(0, |max| max as usize + 1);
    let storage = if to_kind.is_double() {
        let mut elements = vec![None; capacity];
        for (index, entry) in dictionary.iter() {
            elements[index as usize] = entry.value.as_data().and_then(Value::as_number);
        }
        ElementsStorage::Doubles(elements)
    } else {
        let mut elements = vec![None; capacity];
        for (index, entry) in dictionary.iter() {
            elements[index as usize] = entry.value.as_data();
        }
        ElementsStorage::Objects(elements)
    };
    agent.heap.allocate(capacity, "FixedArray");
    agent[object].elements = storage;
    agent.heap.record_write(WriteLocation::Elements(object));
    let map = object.map(agent);
    let new_map = transition_elements_to(agent, map, to_kind);
    migrate_to_map(agent, object, new_map, 0);
    log::debug!("[elements to fast: {object:?}, {}]", to_kind.name());
}

/// Make room for index `index` in the fast store of `object`.
fn grow_capacity(agent: &mut Agent, object: OrdinaryObject, index: u32) {
    let capacity = agent[object].elements.len() as u32;
    if index < capacity {
        return;
    }
    let new_capacity = new_elements_capacity(index + 1) as usize;
    agent
        .heap
        .allocate(new_capacity - capacity as usize, "FixedArray");
    match &mut agent[object].elements {
        ElementsStorage::Objects(elements) => {
            Heap::reserve(elements, new_capacity - capacity as usize, "FixedArray");
            elements.resize(new_capacity, None);
        }
        ElementsStorage::Doubles(elements) => {
            Heap::reserve(elements, new_capacity - capacity as usize, "FixedDoubleArray");
            elements.resize(new_capacity, None);
        }
        _ => unreachable!("growing non-fast elements"),
    }
}

/// Store `value` into fast slot `index`, which must be within capacity.
fn fast_store(agent: &mut Agent, object: OrdinaryObject, index: u32, value: Value) {
    match &mut agent[object].elements {
        ElementsStorage::Objects(elements) => elements[index as usize] = Some(value),
        ElementsStorage::Doubles(elements) => {
            elements[index as usize] = Some(value.as_number().unwrap_or(f64::NAN))
        }
        _ => unreachable!("fast store into non-fast elements"),
    }
    agent.heap.record_write(WriteLocation::Elements(object));
}

/// Overwrite the value of the existing data element `index`.
pub(crate) fn set_element(agent: &mut Agent, object: OrdinaryObject, index: u32, value: Value) {
    let kind = object.map(agent).elements_kind(agent);
    if kind.is_dictionary() {
        let ElementsStorage::Dictionary(dictionary) = &mut agent[object].elements else {
            unreachable!("dictionary elements kind without a dictionary")
        };
        if let Some(entry) = dictionary.get_mut(index) {
            entry.value = DictionaryValue::Data(value);
        }
        agent.heap.record_write(WriteLocation::Elements(object));
        return;
    }
    let to_kind = union_elements_kinds(kind, elements_kind_for_value(value));
    transition_elements_kind(agent, object, to_kind);
    fast_store(agent, object, index, value);
}

/// Add the element `index` to `object`, which does not have it yet.
///
/// Elements with attributes or accessors force dictionary elements; stores
/// far past the end of fast elements may too.
pub(crate) fn add_element(
    agent: &mut Agent,
    object: OrdinaryObject,
    index: u32,
    value: DictionaryValue,
    attributes: PropertyAttributes,
) {
    let mut kind = object.map(agent).elements_kind(agent);
    debug_assert!(!kind.is_typed_array());
    let needs_dictionary = attributes != PropertyAttributes::NONE
        || value.as_accessor().is_some()
        || (kind.is_fast()
            && should_convert_to_slow_elements(
                agent,
                object,
                agent[object].elements.len() as u32,
                index,
            ));
    if kind.is_fast() && needs_dictionary {
        normalize_elements(agent, object);
        kind = ElementsKind::Dictionary;
    }
    if kind.is_dictionary() {
        let details = PropertyDetails::new_dictionary(value_kind(value), attributes, 0);
        let ElementsStorage::Dictionary(dictionary) = &mut agent[object].elements else {
            unreachable!("dictionary elements kind without a dictionary")
        };
        dictionary.set(index, value, details);
        agent.heap.record_write(WriteLocation::Elements(object));
        grow_array_length(agent, object, index);
        if should_convert_to_fast_elements(agent, object) {
            make_elements_fast(agent, object);
        }
        return;
    }
    let DictionaryValue::Data(value) = value else {
        unreachable!("accessor elements are always dictionary elements")
    };
    let length = elements_length(agent, object);
    let mut to_kind = union_elements_kinds(kind, elements_kind_for_value(value));
    if index > length || (!object.is_array(agent) && index >= length) {
        to_kind = to_kind.to_holey();
    }
    transition_elements_kind(agent, object, to_kind);
    grow_capacity(agent, object, index);
    fast_store(agent, object, index, value);
    grow_array_length(agent, object, index);
}

fn value_kind(value: DictionaryValue) -> PropertyKind {
    match value {
        DictionaryValue::Data(_) => PropertyKind::Data,
        DictionaryValue::Accessor(_) => PropertyKind::Accessor,
    }
}

fn grow_array_length(agent: &mut Agent, object: OrdinaryObject, index: u32) {
    if let ObjectKind::Array { length } = &mut agent[object].kind
        && index >= *length
    {
        *length = index + 1;
    }
}

/// Replace the element `index` with `value` and `attributes`, moving to
/// dictionary elements if fast elements cannot express the result.
pub(crate) fn reconfigure_element(
    agent: &mut Agent,
    object: OrdinaryObject,
    index: u32,
    value: DictionaryValue,
    attributes: PropertyAttributes,
) {
    let kind = object.map(agent).elements_kind(agent);
    if kind.is_fast()
        && attributes == PropertyAttributes::NONE
        && let DictionaryValue::Data(value) = value
    {
        set_element(agent, object, index, value);
        return;
    }
    normalize_elements(agent, object);
    let ElementsStorage::Dictionary(dictionary) = &mut agent[object].elements else {
        unreachable!("normalized elements without a dictionary")
    };
    let details = PropertyDetails::new_dictionary(value_kind(value), attributes, 0);
    dictionary.set(index, value, details);
    agent.heap.record_write(WriteLocation::Elements(object));
}

/// Delete the element `index`. Returns false if it is non-configurable.
pub(crate) fn delete_element(agent: &mut Agent, object: OrdinaryObject, index: u32) -> bool {
    let kind = object.map(agent).elements_kind(agent);
    if kind.is_dictionary() {
        let ElementsStorage::Dictionary(dictionary) = &mut agent[object].elements else {
            unreachable!("dictionary elements kind without a dictionary")
        };
        match dictionary.get(index) {
            Some(entry) if !entry.details.is_configurable() => return false,
            Some(_) => {
                dictionary.delete(index);
            }
            None => return true,
        }
        agent.heap.record_write(WriteLocation::Elements(object));
        return true;
    }
    if !kind.is_fast() || index as usize >= agent[object].elements.len() {
        return true;
    }
    // Leaving a hole requires a holey kind.
    transition_elements_kind(agent, object, kind.to_holey());
    match &mut agent[object].elements {
        ElementsStorage::Objects(elements) => elements[index as usize] = None,
        ElementsStorage::Doubles(elements) => elements[index as usize] = None,
        _ => unreachable!("fast elements kind without fast storage"),
    }
    agent.heap.record_write(WriteLocation::Elements(object));
    true
}

/// ### [10.4.2.4 ArraySetLength ( A, Desc )](https://tc39.es/ecma262/#sec-arraysetlength)
///
/// Shrink or grow the elements of `array` to `new_length` and return the
/// length actually reached. Deleting stops at the highest non-configurable
/// element, leaving the length one past it.
pub(crate) fn set_array_length(agent: &mut Agent, array: OrdinaryObject, new_length: u32) -> u32 {
    let ObjectKind::Array { length: old_length } = agent[array].kind else {
        unreachable!("setting the length of a non-array")
    };
    let kind = array.map(agent).elements_kind(agent);
    let mut final_length = new_length;
    if new_length > old_length {
        // Indices between the old and new length are holes.
        if kind.is_fast() && !kind.is_holey() {
            transition_elements_kind(agent, array, kind.to_holey());
        }
    } else if new_length < old_length {
        match &mut agent[array].elements {
            ElementsStorage::Objects(elements) => {
                elements.truncate(new_length as usize);
            }
            ElementsStorage::Doubles(elements) => {
                elements.truncate(new_length as usize);
            }
            ElementsStorage::Dictionary(dictionary) => {
                if let Some(blocking) = dictionary.truncate(new_length) {
                    final_length = blocking + 1;
                }
            }
            ElementsStorage::External => {}
        }
        agent.heap.record_write(WriteLocation::Elements(array));
    }
    if let ObjectKind::Array { length } = &mut agent[array].kind {
        *length = final_length;
    }
    final_length
}

/// Add `attributes` to every element, as freezing and sealing do. Leaves
/// the object with dictionary elements that never return to fast mode.
pub(crate) fn add_attributes_to_elements(
    agent: &mut Agent,
    object: OrdinaryObject,
    attributes: PropertyAttributes,
) {
    if object.map(agent).elements_kind(agent).is_typed_array() {
        return;
    }
    normalize_elements(agent, object);
    let ElementsStorage::Dictionary(dictionary) = &mut agent[object].elements else {
        unreachable!("normalized elements without a dictionary")
    };
    let keys = dictionary.sorted_keys();
    for key in keys {
        if let Some(entry) = dictionary.get_mut(key) {
            let mut added = attributes;
            // Accessors have no writable bit.
            if entry.value.as_accessor().is_some() {
                added = added.difference(PropertyAttributes::READ_ONLY);
            }
            entry.details = entry.details.copy_add_attributes(added);
        }
    }
    dictionary.set_requires_slow_elements();
    agent.heap.record_write(WriteLocation::Elements(object));
}

/// Pin the elements of a non-extensible object in dictionary mode.
pub(crate) fn prevent_elements_extensions(agent: &mut Agent, object: OrdinaryObject) {
    if object.map(agent).elements_kind(agent).is_typed_array() {
        return;
    }
    normalize_elements(agent, object);
    if let ElementsStorage::Dictionary(dictionary) = &mut agent[object].elements {
        dictionary.set_requires_slow_elements();
    }
}
