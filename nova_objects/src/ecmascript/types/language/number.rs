// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::ops::{Index, IndexMut};

use num_traits::Num;

use crate::{
    ecmascript::execution::Agent,
    heap::{CreateHeapData, Heap, indexes::HeapNumberIndex},
};

/// Storage of a mutable double box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeapNumberHeapData {
    pub(crate) value: f64,
}

/// A mutable box holding the value of a `Double` represented field.
///
/// Boxes are owned by exactly one field of one object; writing a new double
/// into the field overwrites the box in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapNumber(pub(crate) HeapNumberIndex);

impl HeapNumber {
    pub(crate) fn new(heap: &mut Heap, value: f64) -> Self {
        heap.create(HeapNumberHeapData { value })
    }

    pub(crate) fn get(self, heap: &Heap) -> f64 {
        heap.numbers[self.0.into_index()]
            .as_ref()
            .expect("HeapNumber slot empty")
            .value
    }

    pub(crate) fn set(self, heap: &mut Heap, value: f64) {
        heap.numbers[self.0.into_index()]
            .as_mut()
            .expect("HeapNumber slot empty")
            .value = value;
    }
}

impl CreateHeapData<HeapNumberHeapData, HeapNumber> for Heap {
    fn create(&mut self, data: HeapNumberHeapData) -> HeapNumber {
        self.allocate(2, "HeapNumber");
        self.numbers.push(Some(data));
        HeapNumber(HeapNumberIndex::last(&self.numbers))
    }
}

impl Index<HeapNumber> for Agent {
    type Output = f64;

    fn index(&self, index: HeapNumber) -> &Self::Output {
        &self
            .heap
            .numbers
            .get(index.0.into_index())
            .expect("HeapNumber out of bounds")
            .as_ref()
            .expect("HeapNumber slot empty")
            .value
    }
}

impl IndexMut<HeapNumber> for Agent {
    fn index_mut(&mut self, index: HeapNumber) -> &mut Self::Output {
        &mut self
            .heap
            .numbers
            .get_mut(index.0.into_index())
            .expect("HeapNumber out of bounds")
            .as_mut()
            .expect("HeapNumber slot empty")
            .value
    }
}

/// ### [6.1.6.1.20 Number::toString ( x, radix )](https://tc39.es/ecma262/#sec-numeric-types-number-tostring)
///
/// Only radix 10 is supported.
pub(crate) fn number_to_string(x: f64) -> std::string::String {
    // 1. If x is NaN, return "NaN".
    if x.is_nan() {
        return "NaN".to_owned();
    }
    // 2. If x is either +0𝔽 or -0𝔽, return "0".
    if x == 0.0 {
        return "0".to_owned();
    }
    // 4. If x is +∞𝔽, return "Infinity".
    if x.is_infinite() {
        return if x > 0.0 { "Infinity" } else { "-Infinity" }.to_owned();
    }
    let mut buffer = ryu_js::Buffer::new();
    buffer.format(x).to_owned()
}

/// ### [7.1.4.1.1 StringToNumber ( str )](https://tc39.es/ecma262/#sec-stringtonumber)
pub(crate) fn string_to_number(str: &str) -> f64 {
    let trimmed = str.trim_matches(is_trimmable_whitespace);
    if trimmed.is_empty() {
        return 0.0;
    }
    let (sign, unsigned) = if let Some(rest) = trimmed.strip_prefix('-') {
        (-1.0, rest)
    } else if let Some(rest) = trimmed.strip_prefix('+') {
        (1.0, rest)
    } else {
        (1.0, trimmed)
    };
    if unsigned == "Infinity" {
        return sign * f64::INFINITY;
    }
    if sign == 1.0 && unsigned.len() > 2 && unsigned.as_bytes()[0] == b'0' && trimmed == unsigned
    {
        let radix = match unsigned.as_bytes()[1] {
            b'x' | b'X' => Some(16),
            b'o' | b'O' => Some(8),
            b'b' | b'B' => Some(2),
            _ => None,
        };
        if let Some(radix) = radix {
            return parse_non_decimal(&unsigned[2..], radix);
        }
    }
    // Rust's float grammar accepts forms JavaScript does not ("inf", "nan",
    // a trailing 'e'); reject anything that is not a StrDecimalLiteral.
    let valid = unsigned.bytes().enumerate().all(|(i, b)| {
        b.is_ascii_digit()
            || b == b'.'
            || ((b == b'e' || b == b'E') && i > 0)
            || ((b == b'+' || b == b'-') && i > 0 && matches!(unsigned.as_bytes()[i - 1], b'e' | b'E'))
    }) && unsigned.bytes().any(|b| b.is_ascii_digit());
    if !valid {
        return f64::NAN;
    }
    match fast_float::parse::<f64, _>(unsigned) {
        Ok(value) => sign * value,
        Err(_) => f64::NAN,
    }
}

fn parse_non_decimal(digits: &str, radix: u32) -> f64 {
    // from_str_radix also accepts signs and fractions; a non-decimal
    // literal is digits only.
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return f64::NAN;
    }
    <f64 as Num>::from_str_radix(digits, radix).unwrap_or(f64::NAN)
}

fn is_trimmable_whitespace(c: char) -> bool {
    matches!(
        c,
        '\u{0009}'
            | '\u{000B}'
            | '\u{000C}'
            | '\u{FEFF}'
            | '\u{000A}'
            | '\u{000D}'
            | '\u{2028}'
            | '\u{2029}'
    ) || c.is_whitespace()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn number_to_string_follows_ecmascript() {
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(number_to_string(1.5), "1.5");
        assert_eq!(number_to_string(1e21), "1e+21");
        assert_eq!(number_to_string(123.0), "123");
    }

    #[test]
    fn string_to_number_handles_literal_forms() {
        assert_eq!(string_to_number("  42  "), 42.0);
        assert_eq!(string_to_number(""), 0.0);
        assert_eq!(string_to_number("0x1F"), 31.0);
        assert_eq!(string_to_number("-Infinity"), f64::NEG_INFINITY);
        assert_eq!(string_to_number("1e3"), 1000.0);
        assert!(string_to_number("inf").is_nan());
        assert!(string_to_number("12px").is_nan());
        assert!(string_to_number("-0x10").is_nan());
    }
}
