// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod number;
mod object;
mod string;
mod symbol;
mod value;

pub(crate) use number::{number_to_string, string_to_number};
pub use number::{HeapNumber, HeapNumberHeapData};
pub(crate) use object::parse_array_index;
pub use object::{
    FieldIndex, FieldValue, InternalMethods, MAX_ARRAY_INDEX, Object, ObjectHeapData, ObjectKind,
    OrdinaryObject, PropertyKey, PropertyStorage,
};
pub(crate) use string::string_hash;
pub use string::{String, StringHeapData};
pub use symbol::{Symbol, SymbolHeapData};
pub use value::Value;
