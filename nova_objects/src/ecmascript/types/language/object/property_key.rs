// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::{
    ecmascript::{
        execution::Agent,
        types::{String, Symbol, Value},
    },
    heap::Heap,
};

/// Largest valid array index, 2³² - 2.
pub const MAX_ARRAY_INDEX: u32 = u32::MAX - 1;

/// ### [6.1.7 The Object Type](https://tc39.es/ecma262/#sec-object-type)
///
/// A property key is either a String or a Symbol value. Canonical array index
/// strings are stored as integers; a string key never holds an array index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropertyKey {
    Integer(u32),
    String(String),
    Symbol(Symbol),
}

impl PropertyKey {
    /// Create a property key from a string, canonicalizing array indices.
    pub fn from_str(agent: &mut Agent, str: &str) -> Self {
        if let Some(index) = parse_array_index(str) {
            PropertyKey::Integer(index)
        } else {
            PropertyKey::String(String::from_str(agent, str))
        }
    }

    pub fn from_string(agent: &mut Agent, string: String) -> Self {
        match parse_array_index(string.as_str(agent)) {
            Some(index) => PropertyKey::Integer(index),
            None => PropertyKey::String(string),
        }
    }

    pub fn is_array_index(self) -> bool {
        matches!(self, PropertyKey::Integer(_))
    }

    pub fn as_array_index(self) -> Option<u32> {
        match self {
            PropertyKey::Integer(index) => Some(index),
            _ => None,
        }
    }

    pub fn is_symbol(self) -> bool {
        matches!(self, PropertyKey::Symbol(_))
    }

    /// Private symbols are hidden from proxies, interceptors and key
    /// enumeration.
    pub fn is_private(self, agent: &Agent) -> bool {
        match self {
            PropertyKey::Symbol(symbol) => symbol.is_private(agent),
            _ => false,
        }
    }

    /// Stable hash used to order keys in descriptor and transition arrays.
    pub(crate) fn hash(self, heap: &Heap) -> u32 {
        let hash = match self {
            PropertyKey::Integer(index) => (index as u64 + 1).wrapping_mul(0xff51_afd7_ed55_8ccd),
            PropertyKey::String(string) => string.hash(heap),
            PropertyKey::Symbol(symbol) => symbol.hash(heap),
        };
        (hash >> 32) as u32
    }

    /// Convert the key back into a language value, as passed to proxy traps
    /// and interceptors.
    pub fn into_value(self, agent: &mut Agent) -> Value {
        match self {
            PropertyKey::Integer(index) => {
                Value::String(String::from_string(agent, index.to_string()))
            }
            PropertyKey::String(string) => Value::String(string),
            PropertyKey::Symbol(symbol) => Value::Symbol(symbol),
        }
    }

    /// Human readable form used in error messages and traces.
    pub fn as_display(self, agent: &Agent) -> std::string::String {
        match self {
            PropertyKey::Integer(index) => index.to_string(),
            PropertyKey::String(string) => string.to_string_lossy(agent),
            PropertyKey::Symbol(symbol) => symbol.descriptive_string(agent),
        }
    }
}

impl From<u32> for PropertyKey {
    fn from(value: u32) -> Self {
        PropertyKey::Integer(value)
    }
}

impl From<Symbol> for PropertyKey {
    fn from(value: Symbol) -> Self {
        PropertyKey::Symbol(value)
    }
}

/// ### [6.1.7 Array index](https://tc39.es/ecma262/#array-index)
///
/// Parses a canonical numeric string in the range 0 to 2³² - 2.
pub(crate) fn parse_array_index(str: &str) -> Option<u32> {
    let bytes = str.as_bytes();
    if bytes.is_empty() || bytes.len() > 10 {
        return None;
    }
    if bytes[0] == b'0' {
        return if bytes.len() == 1 { Some(0) } else { None };
    }
    let mut value: u64 = 0;
    for &b in bytes {
        if !b.is_ascii_digit() {
            return None;
        }
        value = value * 10 + (b - b'0') as u64;
    }
    if value > MAX_ARRAY_INDEX as u64 {
        return None;
    }
    Some(value as u32)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn array_index_parsing() {
        assert_eq!(parse_array_index("0"), Some(0));
        assert_eq!(parse_array_index("42"), Some(42));
        assert_eq!(parse_array_index("4294967294"), Some(MAX_ARRAY_INDEX));
        assert_eq!(parse_array_index("4294967295"), None);
        assert_eq!(parse_array_index("01"), None);
        assert_eq!(parse_array_index("-1"), None);
        assert_eq!(parse_array_index("1.5"), None);
        assert_eq!(parse_array_index(""), None);
    }
}
