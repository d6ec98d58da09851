// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## Dictionary-mode storage
//!
//! A dictionary-mode object keeps its named properties in a
//! [`NameDictionary`]: a hash table from key to value and details. Property
//! order is not implied by the table; every entry carries an enumeration
//! index in its details, handed out in insertion order, and key enumeration
//! sorts by it.
//!
//! Sparse or attributed indexed properties live in a [`NumberDictionary`].

use hashbrown::HashMap;

use super::{
    descriptor_array::Accessor,
    property_details::{MAX_ENUMERATION_INDEX, PropertyAttributes, PropertyDetails},
};
use crate::ecmascript::types::{PropertyKey, Value};

/// Value slot of a dictionary entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DictionaryValue {
    Data(Value),
    Accessor(Accessor),
}

impl DictionaryValue {
    pub fn as_data(self) -> Option<Value> {
        match self {
            DictionaryValue::Data(value) => Some(value),
            DictionaryValue::Accessor(_) => None,
        }
    }

    pub fn as_accessor(self) -> Option<Accessor> {
        match self {
            DictionaryValue::Data(_) => None,
            DictionaryValue::Accessor(accessor) => Some(accessor),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DictionaryEntry {
    pub value: DictionaryValue,
    pub details: PropertyDetails,
}

/// Named properties of a dictionary-mode object.
#[derive(Debug, Clone)]
pub struct NameDictionary {
    entries: HashMap<PropertyKey, DictionaryEntry>,
    next_enumeration_index: u32,
}

impl Default for NameDictionary {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl NameDictionary {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            next_enumeration_index: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Approximate heap footprint in words.
    pub(crate) fn size_in_words(&self) -> usize {
        3 + 3 * self.entries.capacity()
    }

    pub fn find(&self, key: PropertyKey) -> Option<&DictionaryEntry> {
        self.entries.get(&key)
    }

    pub(crate) fn find_mut(&mut self, key: PropertyKey) -> Option<&mut DictionaryEntry> {
        self.entries.get_mut(&key)
    }

    pub fn next_enumeration_index(&self) -> u32 {
        self.next_enumeration_index
    }

    pub(crate) fn set_next_enumeration_index(&mut self, index: u32) {
        self.next_enumeration_index = index;
    }

    /// Add a new entry. Details without an enumeration index get the next
    /// free one.
    pub(crate) fn add(&mut self, key: PropertyKey, value: DictionaryValue, details: PropertyDetails) {
        debug_assert!(!self.entries.contains_key(&key));
        let details = if details.dictionary_index() == 0 {
            let index = self.take_enumeration_index();
            details.set_dictionary_index(index)
        } else {
            details
        };
        self.entries.insert(key, DictionaryEntry { value, details });
    }

    /// Overwrite an entry, keeping its enumeration index.
    pub(crate) fn set_entry(&mut self, key: PropertyKey, value: DictionaryValue, details: PropertyDetails) {
        match self.entries.get_mut(&key) {
            Some(entry) => {
                let index = entry.details.dictionary_index();
                entry.value = value;
                entry.details = details.set_dictionary_index(index);
            }
            None => self.add(key, value, details),
        }
    }

    pub(crate) fn delete(&mut self, key: PropertyKey) -> Option<DictionaryEntry> {
        let removed = self.entries.remove(&key);
        // Shrink once the table is mostly empty.
        if self.entries.capacity() > 16 && self.entries.len() * 4 < self.entries.capacity() {
            self.entries.shrink_to(self.entries.len() * 2);
        }
        removed
    }

    fn take_enumeration_index(&mut self) -> u32 {
        if self.next_enumeration_index > MAX_ENUMERATION_INDEX {
            self.generate_new_enumeration_indices();
        }
        let index = self.next_enumeration_index;
        self.next_enumeration_index += 1;
        index
    }

    /// Keys sorted by enumeration index.
    pub fn iteration_order(&self) -> Vec<PropertyKey> {
        let mut keys: Vec<(u32, PropertyKey)> = self
            .entries
            .iter()
            .map(|(key, entry)| (entry.details.dictionary_index(), *key))
            .collect();
        keys.sort_unstable_by_key(|(index, _)| *index);
        keys.into_iter().map(|(_, key)| key).collect()
    }

    /// Renumber entries densely from 1, preserving their order.
    pub(crate) fn generate_new_enumeration_indices(&mut self) -> Vec<PropertyKey> {
        let order = self.iteration_order();
        for (i, key) in order.iter().enumerate() {
            if let Some(entry) = self.entries.get_mut(key) {
                entry.details = entry.details.set_dictionary_index(i as u32 + 1);
            }
        }
        self.next_enumeration_index = order.len() as u32 + 1;
        order
    }

    pub fn iter(&self) -> impl Iterator<Item = (PropertyKey, &DictionaryEntry)> {
        self.entries.iter().map(|(key, entry)| (*key, entry))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (PropertyKey, &mut DictionaryEntry)> {
        self.entries.iter_mut().map(|(key, entry)| (*key, entry))
    }
}

/// Indexed properties of an object in dictionary elements mode.
#[derive(Debug, Clone, Default)]
pub struct NumberDictionary {
    entries: HashMap<u32, DictionaryEntry>,
    /// Set once the elements hold something fast elements cannot express
    /// (accessors, attributes); the object then never returns to fast
    /// elements.
    requires_slow_elements: bool,
}

impl NumberDictionary {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            requires_slow_elements: false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: u32) -> Option<&DictionaryEntry> {
        self.entries.get(&index)
    }

    pub(crate) fn get_mut(&mut self, index: u32) -> Option<&mut DictionaryEntry> {
        self.entries.get_mut(&index)
    }

    pub(crate) fn set(&mut self, index: u32, value: DictionaryValue, details: PropertyDetails) {
        if details.attributes() != PropertyAttributes::NONE || value.as_accessor().is_some() {
            self.requires_slow_elements = true;
        }
        self.entries.insert(index, DictionaryEntry { value, details });
    }

    pub(crate) fn delete(&mut self, index: u32) -> Option<DictionaryEntry> {
        self.entries.remove(&index)
    }

    /// Largest index present, if any.
    pub fn max_number_key(&self) -> Option<u32> {
        self.entries.keys().copied().max()
    }

    pub fn requires_slow_elements(&self) -> bool {
        self.requires_slow_elements
    }

    pub(crate) fn set_requires_slow_elements(&mut self) {
        self.requires_slow_elements = true;
    }

    /// Indices in ascending order.
    pub fn sorted_keys(&self) -> Vec<u32> {
        let mut keys: Vec<u32> = self.entries.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    /// Drop every index at or above `length`, from the top down. Returns the
    /// first non-configurable index met, which stops the shrink.
    pub(crate) fn truncate(&mut self, length: u32) -> Option<u32> {
        let mut keys: Vec<u32> = self.entries.keys().copied().filter(|&k| k >= length).collect();
        keys.sort_unstable_by(|a, b| b.cmp(a));
        for key in keys {
            let configurable = self.entries[&key].details.is_configurable();
            if !configurable {
                return Some(key);
            }
            self.entries.remove(&key);
        }
        None
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &DictionaryEntry)> {
        self.entries.iter().map(|(key, entry)| (*key, entry))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ecmascript::{
        builtins::ordinary::property_details::PropertyKind,
        execution::{Agent, Options},
    };

    fn data(kind_attributes: PropertyAttributes) -> PropertyDetails {
        PropertyDetails::new_dictionary(PropertyKind::Data, kind_attributes, 0)
    }

    #[test]
    fn enumeration_order_survives_deletes_and_renumbering() {
        let mut agent = Agent::new(Options::default());
        let keys: Vec<PropertyKey> = ["a", "b", "c", "d"]
            .iter()
            .map(|name| PropertyKey::from_str(&mut agent, name))
            .collect();
        let mut dictionary = NameDictionary::default();
        for (i, key) in keys.iter().enumerate() {
            dictionary.add(
                *key,
                DictionaryValue::Data(Value::Integer(i as i32)),
                data(PropertyAttributes::NONE),
            );
        }
        dictionary.delete(keys[1]);
        dictionary.set_entry(
            keys[0],
            DictionaryValue::Data(Value::Integer(10)),
            data(PropertyAttributes::READ_ONLY),
        );
        assert_eq!(dictionary.iteration_order(), vec![keys[0], keys[2], keys[3]]);
        dictionary.generate_new_enumeration_indices();
        assert_eq!(dictionary.next_enumeration_index(), 4);
        assert_eq!(dictionary.iteration_order(), vec![keys[0], keys[2], keys[3]]);
        assert_eq!(dictionary.find(keys[3]).unwrap().details.dictionary_index(), 3);
    }

    #[test]
    fn truncate_stops_at_non_configurable_elements() {
        let mut dictionary = NumberDictionary::default();
        for index in [1, 5, 9] {
            dictionary.set(
                index,
                DictionaryValue::Data(Value::Integer(index as i32)),
                data(PropertyAttributes::NONE),
            );
        }
        dictionary.set(
            5,
            DictionaryValue::Data(Value::Null),
            data(PropertyAttributes::DONT_DELETE),
        );
        assert_eq!(dictionary.truncate(2), Some(5));
        assert_eq!(dictionary.sorted_keys(), vec![1, 5]);
        assert!(dictionary.requires_slow_elements());
    }
}
