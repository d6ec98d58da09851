// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## Collector cooperation
//!
//! The object model does not collect garbage itself. A concurrent collector
//! only needs to be told about three things: which locations were written,
//! which ranges of an object became dead filler, and the moment an object's
//! Map pointer changes. [`HeapObserver`] is that capability. The default
//! observer ignores everything; tests install a recording observer to check
//! that storage is always consistent at the instant a Map is published.

use crate::ecmascript::{
    builtins::ordinary::{
        descriptor_array::DescriptorArray, global_dictionary::PropertyCell, map::Map,
    },
    types::OrdinaryObject,
};

/// A heap location written by a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteLocation {
    /// In-object slots or the out-of-object backing store of an object.
    Properties(OrdinaryObject),
    /// Indexed backing store of an object.
    Elements(OrdinaryObject),
    /// An entry of a shared descriptor array.
    Descriptors(DescriptorArray),
    /// The transition table of a Map.
    Transitions(Map),
    /// The value or details of a global property cell.
    PropertyCell(PropertyCell),
}

/// Physical property storage of an object as seen by the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageLayout {
    pub dictionary: bool,
    pub in_object_slots: u32,
    pub backing_store_slots: u32,
}

/// Storage a Map requires of the objects carrying it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredLayout {
    Dictionary,
    Fast {
        in_object_slots: u32,
        /// Minimum out-of-object slots needed for the Map's fields.
        backing_store_slots: u32,
    },
}

/// Emitted exactly once for every Map pointer update of an object, after
/// the storage has been made consistent with the new Map.
#[derive(Debug, Clone, Copy)]
pub struct MapPublication {
    pub object: OrdinaryObject,
    pub old_map: Map,
    pub new_map: Map,
    /// Storage layout of the object at the moment of publication.
    pub layout: StorageLayout,
    pub required: RequiredLayout,
}

impl MapPublication {
    /// Returns true if the storage at publication time can hold every field
    /// the published Map describes.
    pub fn is_consistent(&self) -> bool {
        match self.required {
            RequiredLayout::Dictionary => self.layout.dictionary,
            RequiredLayout::Fast {
                in_object_slots,
                backing_store_slots,
            } => {
                !self.layout.dictionary
                    && self.layout.in_object_slots == in_object_slots
                    && self.layout.backing_store_slots >= backing_store_slots
            }
        }
    }
}

pub trait HeapObserver {
    /// Write barrier.
    fn record_write(&mut self, _location: WriteLocation) {}

    /// The tail of an object of `words` words became a filler object.
    fn create_filler(&mut self, _object: OrdinaryObject, _words: u32) {}

    fn adjust_live_words(&mut self, _delta: isize) {}

    /// Release-store of an object's Map pointer.
    fn publish_map(&mut self, _publication: &MapPublication) {}
}

/// Observer used when the embedder does not run a concurrent collector.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl HeapObserver for NoopObserver {}
