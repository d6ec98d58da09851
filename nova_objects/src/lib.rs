// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The Nova object model: hidden-class Maps and their transition trees,
//! fast and dictionary property storage, and the property access protocol
//! built on the [`LookupIterator`](ecmascript::abstract_operations::lookup_iterator::LookupIterator).

pub mod ecmascript;
pub mod heap;
