// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub mod array;
pub mod array_buffer;
pub mod builtin_function;
pub mod error;
pub mod global_object;
pub mod ordinary;
pub mod proxy;
pub mod typed_array;
