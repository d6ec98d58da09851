// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::{hash::BuildHasher, ops::Index};

use ahash::RandomState;
use wtf8::Wtf8Buf;

use super::Value;
use crate::{
    ecmascript::execution::Agent,
    heap::{Heap, indexes::StringIndex},
};

/// Seeds for property-key hashing. Fixed so that descriptor and transition
/// sort orders are reproducible between runs.
const STRING_HASH_SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

pub(crate) fn string_hash(data: &str) -> u64 {
    RandomState::with_seeds(
        STRING_HASH_SEEDS[0],
        STRING_HASH_SEEDS[1],
        STRING_HASH_SEEDS[2],
        STRING_HASH_SEEDS[3],
    )
    .hash_one(data)
}

#[derive(Debug, Clone)]
pub struct StringHeapData {
    pub(crate) data: Wtf8Buf,
    pub(crate) hash: u64,
}

impl StringHeapData {
    pub fn as_str(&self) -> Option<&str> {
        self.data.as_str()
    }
}

/// ### [6.1.4 The String Type](https://tc39.es/ecma262/#sec-ecmascript-language-types-string-type)
///
/// Strings are interned: two strings with the same contents are always the
/// same handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct String(pub(crate) StringIndex);

impl String {
    pub fn from_str(agent: &mut Agent, str: &str) -> Self {
        agent.heap.intern(str)
    }

    pub fn from_string(agent: &mut Agent, string: std::string::String) -> Self {
        agent.heap.intern(&string)
    }

    pub fn as_str(self, agent: &Agent) -> &str {
        agent[self].data.as_str().unwrap_or("")
    }

    pub fn to_string_lossy(self, agent: &Agent) -> std::string::String {
        agent[self].data.to_string_lossy().into_owned()
    }

    pub fn len(self, agent: &Agent) -> usize {
        agent[self].data.len()
    }

    pub fn is_empty(self, agent: &Agent) -> bool {
        self.len(agent) == 0
    }

    pub(crate) fn hash(self, heap: &Heap) -> u64 {
        heap.strings[self.0.into_index()]
            .as_ref()
            .expect("String slot empty")
            .hash
    }

    /// Concatenate two strings into a new interned string.
    pub fn concat(agent: &mut Agent, a: String, b: String) -> String {
        let mut result = a.to_string_lossy(agent);
        result.push_str(&b.to_string_lossy(agent));
        String::from_string(agent, result)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl Index<String> for Agent {
    type Output = StringHeapData;

    fn index(&self, index: String) -> &Self::Output {
        self.heap
            .strings
            .get(index.0.into_index())
            .expect("String out of bounds")
            .as_ref()
            .expect("String slot empty")
    }
}
