// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [25.1 ArrayBuffer Objects](https://tc39.es/ecma262/#sec-arraybuffer-objects)
//!
//! The byte data of an ArrayBuffer lives in [`ObjectKind::ArrayBuffer`].
//! Detaching drops the block; typed arrays viewing it then report a length
//! of zero and every element access misses.

use crate::ecmascript::{
    builtins::ordinary::{elements_kind::ElementsKind, ordinary_object_create_from_map},
    execution::{Agent, ExceptionType, JsResult},
    types::{ObjectKind, OrdinaryObject},
};

/// Largest byte length a buffer may be allocated with.
pub const MAX_BYTE_LENGTH: u64 = i32::MAX as u64;

/// ### [25.1.3.1 AllocateArrayBuffer ( constructor, byteLength )](https://tc39.es/ecma262/#sec-allocatearraybuffer)
pub fn allocate_array_buffer(agent: &mut Agent, byte_length: u64) -> JsResult<OrdinaryObject> {
    // 5. Let block be ? CreateByteDataBlock(byteLength).
    if byte_length > MAX_BYTE_LENGTH {
        return Err(agent.throw_exception_with_static_message(
            ExceptionType::RangeError,
            "Array buffer allocation failed",
        ));
    }
    let mut block = Vec::new();
    if block.try_reserve_exact(byte_length as usize).is_err() {
        return Err(agent.throw_exception_with_static_message(
            ExceptionType::RangeError,
            "Array buffer allocation failed",
        ));
    }
    block.resize(byte_length as usize, 0u8);
    agent.heap.allocate(block.len().div_ceil(8), "ArrayBuffer");
    // 4. Let obj be ? OrdinaryCreateFromConstructor(constructor,
    //    "%ArrayBuffer.prototype%", slots).
    let map = agent.intrinsics().array_buffer_map;
    // 6. Set obj.[[ArrayBufferData]] to block.
    // 7. Set obj.[[ArrayBufferByteLength]] to byteLength.
    // 9. Return obj.
    Ok(ordinary_object_create_from_map(
        agent,
        map,
        ObjectKind::ArrayBuffer { data: Some(block) },
    ))
}

/// #### [25.1.3.2 ArrayBufferByteLength ( arrayBuffer, order )](https://tc39.es/ecma262/#sec-arraybufferbytelength)
///
/// Zero for a detached buffer.
pub fn array_buffer_byte_length(agent: &Agent, array_buffer: OrdinaryObject) -> usize {
    match &agent[array_buffer].kind {
        ObjectKind::ArrayBuffer { data: Some(block) } => block.len(),
        _ => 0,
    }
}

/// #### [25.1.3.3 IsDetachedBuffer ( arrayBuffer )](https://tc39.es/ecma262/#sec-isdetachedbuffer)
pub fn is_detached_buffer(agent: &Agent, array_buffer: OrdinaryObject) -> bool {
    // 1. If arrayBuffer.[[ArrayBufferData]] is null, return true.
    // 2. Return false.
    matches!(agent[array_buffer].kind, ObjectKind::ArrayBuffer { data: None })
}

/// #### [25.1.3.4 DetachArrayBuffer ( arrayBuffer \[ , key \] )](https://tc39.es/ecma262/#sec-detacharraybuffer)
pub fn detach_array_buffer(agent: &mut Agent, array_buffer: OrdinaryObject) {
    let ObjectKind::ArrayBuffer { data } = &mut agent[array_buffer].kind else {
        unreachable!("detaching a non-ArrayBuffer")
    };
    // 4. Set arrayBuffer.[[ArrayBufferData]] to null.
    // 5. Set arrayBuffer.[[ArrayBufferByteLength]] to 0.
    let freed = data.take().map_or(0, |block| block.len().div_ceil(8));
    agent.heap.adjust_live_words(-(freed as isize));
    log::debug!("detached {array_buffer:?}, freeing {freed} words");
    // 6. Return UNUSED.
}

/// #### [25.1.3.15 RawBytesToNumeric ( type, rawBytes, isLittleEndian )](https://tc39.es/ecma262/#sec-rawbytestonumeric)
fn raw_bytes_to_numeric(kind: ElementsKind, raw: &[u8]) -> f64 {
    match kind {
        ElementsKind::Int8 => i8::from_le_bytes([raw[0]]) as f64,
        ElementsKind::Uint8 | ElementsKind::Uint8Clamped => raw[0] as f64,
        ElementsKind::Int16 => i16::from_le_bytes([raw[0], raw[1]]) as f64,
        ElementsKind::Uint16 => u16::from_le_bytes([raw[0], raw[1]]) as f64,
        ElementsKind::Int32 => i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as f64,
        ElementsKind::Uint32 => u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as f64,
        ElementsKind::Float32 => f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as f64,
        ElementsKind::Float64 => {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&raw[..8]);
            f64::from_le_bytes(bytes)
        }
        _ => unreachable!("{} is not a typed array kind", kind.name()),
    }
}

/// Wrap `value` modulo 2**bits, the shared tail of ToInt8 through ToUint32.
fn modulo_integer(value: f64, bits: u32) -> u64 {
    if !value.is_finite() {
        return 0;
    }
    value.trunc().rem_euclid((1u64 << bits) as f64) as u64
}

/// ### [7.1.11 ToUint8Clamp ( argument )](https://tc39.es/ecma262/#sec-touint8clamp)
fn to_uint8_clamp(value: f64) -> u8 {
    // 2. If number is NaN, return +0𝔽.
    if value.is_nan() {
        return 0;
    }
    // 3.-4. Clamp to the inclusive interval from 0 to 255.
    if value <= 0.0 {
        return 0;
    }
    if value >= 255.0 {
        return 255;
    }
    // 5.-10. Round half to even.
    let f = value.floor();
    let diff = value - f;
    if diff < 0.5 {
        f as u8
    } else if diff > 0.5 || f % 2.0 != 0.0 {
        f as u8 + 1
    } else {
        f as u8
    }
}

/// #### [25.1.3.18 NumericToRawBytes ( type, value, isLittleEndian )](https://tc39.es/ecma262/#sec-numerictorawbytes)
fn numeric_to_raw_bytes(kind: ElementsKind, value: f64, raw: &mut [u8]) {
    match kind {
        ElementsKind::Int8 | ElementsKind::Uint8 => raw[0] = modulo_integer(value, 8) as u8,
        ElementsKind::Uint8Clamped => raw[0] = to_uint8_clamp(value),
        ElementsKind::Int16 | ElementsKind::Uint16 => {
            raw[..2].copy_from_slice(&(modulo_integer(value, 16) as u16).to_le_bytes())
        }
        ElementsKind::Int32 | ElementsKind::Uint32 => {
            raw[..4].copy_from_slice(&(modulo_integer(value, 32) as u32).to_le_bytes())
        }
        ElementsKind::Float32 => raw[..4].copy_from_slice(&(value as f32).to_le_bytes()),
        ElementsKind::Float64 => raw[..8].copy_from_slice(&value.to_le_bytes()),
        _ => unreachable!("{} is not a typed array kind", kind.name()),
    }
}

/// #### [25.1.3.16 GetValueFromBuffer ( arrayBuffer, byteIndex, type, ... )](https://tc39.es/ecma262/#sec-getvaluefrombuffer)
pub(crate) fn get_value_from_buffer(
    agent: &Agent,
    array_buffer: OrdinaryObject,
    byte_index: usize,
    kind: ElementsKind,
) -> f64 {
    // 1. Assert: IsDetachedBuffer(arrayBuffer) is false.
    let ObjectKind::ArrayBuffer { data: Some(block) } = &agent[array_buffer].kind else {
        unreachable!("reading from a detached buffer")
    };
    // 2. Assert: There are sufficient bytes in arrayBuffer starting at
    //    byteIndex to represent a value of type.
    let element_size = kind.element_size();
    let raw = &block[byte_index..byte_index + element_size];
    // 6. Return RawBytesToNumeric(type, rawValue, isLittleEndian).
    raw_bytes_to_numeric(kind, raw)
}

/// #### [25.1.3.19 SetValueInBuffer ( arrayBuffer, byteIndex, type, value, ... )](https://tc39.es/ecma262/#sec-setvalueinbuffer)
pub(crate) fn set_value_in_buffer(
    agent: &mut Agent,
    array_buffer: OrdinaryObject,
    byte_index: usize,
    kind: ElementsKind,
    value: f64,
) {
    // 1. Assert: IsDetachedBuffer(arrayBuffer) is false.
    let ObjectKind::ArrayBuffer { data: Some(block) } = &mut agent[array_buffer].kind else {
        unreachable!("writing to a detached buffer")
    };
    let element_size = kind.element_size();
    // 6. Let rawBytes be NumericToRawBytes(type, value, isLittleEndian).
    // 9. Store the individual bytes of rawBytes into block, starting at
    //    block[byteIndex].
    numeric_to_raw_bytes(kind, value, &mut block[byte_index..byte_index + element_size]);
}
