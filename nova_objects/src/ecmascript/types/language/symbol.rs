// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::ops::Index;

use super::{String, Value};
use crate::{
    ecmascript::execution::Agent,
    heap::{CreateHeapData, Heap, indexes::SymbolIndex},
};

#[derive(Debug, Clone, Copy)]
pub struct SymbolHeapData {
    pub(crate) descriptor: Option<String>,
    /// Private symbols are never exposed to proxies or interceptors.
    pub(crate) is_private: bool,
    /// Stable hash used to order symbol keys in descriptor arrays.
    pub(crate) hash: u64,
}

/// ### [6.1.5 The Symbol Type](https://tc39.es/ecma262/#sec-ecmascript-language-types-symbol-type)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(pub(crate) SymbolIndex);

impl Symbol {
    pub fn new(agent: &mut Agent, descriptor: Option<&str>) -> Self {
        let descriptor = descriptor.map(|d| String::from_str(agent, d));
        Self::allocate(&mut agent.heap, descriptor, false)
    }

    /// Create a private symbol, invisible to proxies and interceptors.
    pub fn new_private(agent: &mut Agent, descriptor: &str) -> Self {
        let descriptor = String::from_str(agent, descriptor);
        Self::allocate(&mut agent.heap, Some(descriptor), true)
    }

    fn allocate(heap: &mut Heap, descriptor: Option<String>, is_private: bool) -> Self {
        // Symbols hash by identity: mix the index into a large odd constant.
        let next = heap.symbols.len() as u64 + 1;
        heap.create(SymbolHeapData {
            descriptor,
            is_private,
            hash: next.wrapping_mul(0x9e37_79b9_7f4a_7c15),
        })
    }

    pub fn descriptor(self, agent: &Agent) -> Option<String> {
        agent[self].descriptor
    }

    pub fn is_private(self, agent: &Agent) -> bool {
        agent[self].is_private
    }

    pub(crate) fn hash(self, heap: &Heap) -> u64 {
        heap.symbols[self.0.into_index()]
            .as_ref()
            .expect("Symbol slot empty")
            .hash
    }

    /// SymbolDescriptiveString
    pub fn descriptive_string(self, agent: &Agent) -> std::string::String {
        match agent[self].descriptor {
            Some(descriptor) => format!("Symbol({})", descriptor.as_str(agent)),
            None => "Symbol()".to_owned(),
        }
    }
}

impl CreateHeapData<SymbolHeapData, Symbol> for Heap {
    fn create(&mut self, data: SymbolHeapData) -> Symbol {
        self.allocate(3, "Symbol");
        self.symbols.push(Some(data));
        Symbol(SymbolIndex::last(&self.symbols))
    }
}

impl From<Symbol> for Value {
    fn from(value: Symbol) -> Self {
        Value::Symbol(value)
    }
}

impl Index<Symbol> for Agent {
    type Output = SymbolHeapData;

    fn index(&self, index: Symbol) -> &Self::Output {
        self.heap
            .symbols
            .get(index.0.into_index())
            .expect("Symbol out of bounds")
            .as_ref()
            .expect("Symbol slot empty")
    }
}
