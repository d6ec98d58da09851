// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub mod heap_observer;
pub mod indexes;

use hashbrown::HashTable;
use wtf8::Wtf8Buf;

use self::{
    heap_observer::{HeapObserver, NoopObserver, WriteLocation},
    indexes::StringIndex,
};
use crate::ecmascript::{
    builtins::{
        ordinary::{
            descriptor_array::DescriptorArrayRecord, global_dictionary::PropertyCellRecord,
            map::MapRecord,
        },
        proxy::ProxyHeapData,
    },
    execution::embedder::{AccessorInfo, ObjectTemplateHeapData},
    types::{
        HeapNumberHeapData, ObjectHeapData, OrdinaryObject, String, StringHeapData,
        SymbolHeapData, string_hash,
    },
};

/// Size of a tagged heap slot in bytes.
pub const WORD_SIZE: usize = 8;

/// Creation of heap data through the allocation capability.
pub trait CreateHeapData<T, F> {
    /// Creates a [`Value`](crate::ecmascript::types::Value) from the given
    /// data. Allocating the data is **not** guaranteed.
    fn create(&mut self, data: T) -> F;
}

pub struct Heap {
    pub(crate) accessor_infos: Vec<Option<AccessorInfo>>,
    pub(crate) descriptor_arrays: Vec<Option<DescriptorArrayRecord>>,
    pub(crate) maps: Vec<Option<MapRecord>>,
    pub(crate) numbers: Vec<Option<HeapNumberHeapData>>,
    pub(crate) object_templates: Vec<Option<ObjectTemplateHeapData>>,
    pub(crate) objects: Vec<Option<ObjectHeapData>>,
    pub(crate) property_cells: Vec<Option<PropertyCellRecord>>,
    pub(crate) proxys: Vec<Option<ProxyHeapData>>,
    pub(crate) strings: Vec<Option<StringHeapData>>,
    /// Interning table; every string is unique by content.
    pub(crate) string_table: HashTable<StringIndex>,
    pub(crate) symbols: Vec<Option<SymbolHeapData>>,
    /// Words currently considered live by the allocator.
    pub(crate) live_words: usize,
    pub(crate) filler_words: usize,
    pub(crate) heap_limit: Option<usize>,
    pub(crate) observer: Box<dyn HeapObserver>,
}

impl core::fmt::Debug for Heap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Heap")
            .field("maps", &self.maps.len())
            .field("objects", &self.objects.len())
            .field("strings", &self.strings.len())
            .field("live_words", &self.live_words)
            .finish()
    }
}

impl Heap {
    pub(crate) fn new(heap_limit: Option<usize>) -> Self {
        Self {
            accessor_infos: Vec::new(),
            descriptor_arrays: Vec::with_capacity(256),
            maps: Vec::with_capacity(256),
            numbers: Vec::with_capacity(64),
            object_templates: Vec::new(),
            objects: Vec::with_capacity(1024),
            property_cells: Vec::with_capacity(64),
            proxys: Vec::new(),
            strings: Vec::with_capacity(256),
            string_table: HashTable::with_capacity(256),
            symbols: Vec::with_capacity(16),
            live_words: 0,
            filler_words: 0,
            heap_limit,
            observer: Box::new(NoopObserver),
        }
    }

    /// Reserve `words` of heap for a new `what`.
    ///
    /// Running out of heap is not recoverable at this layer: the process
    /// aborts with a fatal out-of-memory panic.
    pub(crate) fn allocate(&mut self, words: usize, what: &'static str) {
        let live_words = self.live_words.saturating_add(words);
        if let Some(limit) = self.heap_limit
            && live_words > limit
        {
            fatal_out_of_memory(what);
        }
        self.live_words = live_words;
        self.observer.adjust_live_words(words as isize);
    }

    /// Reserve room for `additional` more elements in a backing vector,
    /// treating allocation failure as fatal.
    pub(crate) fn reserve<T>(vec: &mut Vec<T>, additional: usize, what: &'static str) {
        if vec.try_reserve(additional).is_err() {
            fatal_out_of_memory(what);
        }
    }

    /// Turn the trailing `words` of an object into filler.
    pub(crate) fn create_filler(&mut self, object: OrdinaryObject, words: usize) {
        if words == 0 {
            return;
        }
        self.filler_words += words;
        self.live_words = self.live_words.saturating_sub(words);
        self.observer.create_filler(object, words as u32);
        self.observer.adjust_live_words(-(words as isize));
    }

    /// Give back `words` of an array that shrank.
    pub(crate) fn adjust_live_words(&mut self, delta: isize) {
        if delta < 0 {
            self.live_words = self.live_words.saturating_sub(delta.unsigned_abs());
        } else {
            self.allocate(delta as usize, "backing store");
            return;
        }
        self.observer.adjust_live_words(delta);
    }

    #[inline]
    pub(crate) fn record_write(&mut self, location: WriteLocation) {
        self.observer.record_write(location);
    }

    /// Find or create the unique string with the given contents.
    pub(crate) fn intern(&mut self, data: &str) -> String {
        let hash = string_hash(data);
        let Self {
            strings,
            string_table,
            ..
        } = self;
        if let Some(index) = string_table.find(hash, |index| {
            strings[index.into_index()]
                .as_ref()
                .is_some_and(|s| s.data.as_str() == Some(data))
        }) {
            return String(*index);
        }
        self.allocate(2 + data.len().div_ceil(WORD_SIZE), "String");
        self.strings.push(Some(StringHeapData {
            data: Wtf8Buf::from_str(data),
            hash,
        }));
        let index = StringIndex::last(&self.strings);
        let Self {
            strings,
            string_table,
            ..
        } = self;
        string_table.insert_unique(hash, index, |index| {
            strings[index.into_index()].as_ref().map_or(0, |s| s.hash)
        });
        String(index)
    }

    /// Number of words allocated and not yet returned.
    pub fn live_words(&self) -> usize {
        self.live_words
    }
}

#[cold]
#[inline(never)]
pub(crate) fn fatal_out_of_memory(what: &'static str) -> ! {
    panic!("Fatal JavaScript out of memory: allocation of {what} failed");
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn interning_returns_the_same_string() {
        let mut heap = Heap::new(None);
        let a = heap.intern("length");
        let b = heap.intern("length");
        let c = heap.intern("prototype");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(heap.strings.len(), 2);
    }

    #[test]
    #[should_panic(expected = "Fatal JavaScript out of memory")]
    fn exceeding_the_heap_limit_is_fatal() {
        let mut heap = Heap::new(Some(16));
        heap.allocate(8, "test object");
        heap.allocate(9, "test object");
    }
}
