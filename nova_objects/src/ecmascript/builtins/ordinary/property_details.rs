// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## Property details
//!
//! Every property of a Map or a dictionary carries a packed 32-bit
//! [`PropertyDetails`] word:
//!
//! ```text
//!  bit   0     kind             Data | Accessor
//!  bit   1     location         Field | Descriptor
//!  bits  2-4   attributes       READ_ONLY, DONT_ENUM, DONT_DELETE
//!  bits  5-7   representation   (fast mode) or cell type (global cells)
//!  bits  8-19  field index      (fast mode)
//!  bits  8-30  enumeration idx  (dictionary mode)
//! ```

use crate::ecmascript::types::Value;

/// Whether a property holds a value or a getter/setter pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Data,
    Accessor,
}

/// Where a fast-mode property's value lives: in an object field, or
/// directly in the descriptor (a constant shared by all instances).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyLocation {
    Field,
    Descriptor,
}

/// Negated ECMAScript attributes; the empty set is writable, enumerable and
/// configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PropertyAttributes(u8);

impl PropertyAttributes {
    pub const NONE: Self = Self(0);
    pub const READ_ONLY: Self = Self(1);
    pub const DONT_ENUM: Self = Self(2);
    pub const DONT_DELETE: Self = Self(4);
    pub const SEALED: Self = Self::DONT_DELETE;
    pub const FROZEN: Self = Self(Self::DONT_DELETE.0 | Self::READ_ONLY.0);
    pub const ALL: Self = Self(7);

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 7)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    pub const fn is_read_only(self) -> bool {
        self.contains(Self::READ_ONLY)
    }

    pub const fn is_dont_enum(self) -> bool {
        self.contains(Self::DONT_ENUM)
    }

    pub const fn is_dont_delete(self) -> bool {
        self.contains(Self::DONT_DELETE)
    }
}

/// Value representation of a fast-mode field.
///
/// ```text
///         Tagged
///        /      \
///    Double   HeapObject
///      |          |
///     Smi         |
///        \       /
///          None
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Representation {
    None = 0,
    Smi = 1,
    Double = 2,
    HeapObject = 3,
    Tagged = 4,
}

impl Representation {
    const fn from_bits(bits: u32) -> Self {
        match bits {
            0 => Self::None,
            1 => Self::Smi,
            2 => Self::Double,
            3 => Self::HeapObject,
            _ => Self::Tagged,
        }
    }

    /// The most specific representation that can hold the value.
    pub fn for_value(value: Value) -> Self {
        match value {
            Value::Integer(_) => Self::Smi,
            Value::Number(_) => Self::Double,
            _ => Self::HeapObject,
        }
    }

    pub fn is_more_general_than(self, other: Self) -> bool {
        if self == Self::HeapObject {
            return other == Self::None;
        }
        self > other
    }

    pub fn fits_into(self, other: Self) -> bool {
        other.is_more_general_than(self) || other == self
    }

    /// Least upper bound of two representations.
    #[must_use]
    pub fn generalize(self, other: Self) -> Self {
        if other.fits_into(self) {
            self
        } else if other.is_more_general_than(self) {
            other
        } else {
            Self::Tagged
        }
    }

    /// A `None` field has no storage committed yet, so it can take any
    /// representation that does not need a box.
    pub fn can_be_in_place_changed_to(self, other: Self) -> bool {
        self == Self::None && other != Self::Double
    }

    pub fn is_none(self) -> bool {
        self == Self::None
    }

    pub fn is_double(self) -> bool {
        self == Self::Double
    }

    pub fn is_heap_object(self) -> bool {
        self == Self::HeapObject
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::None => "v",
            Self::Smi => "s",
            Self::Double => "d",
            Self::HeapObject => "h",
            Self::Tagged => "t",
        }
    }
}

/// State of a global property cell, tracking how stable its value is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyCellType {
    /// Any value may be stored.
    Mutable = 0,
    /// The cell holds `undefined` or the hole and has never held anything
    /// else.
    Undefined = 1,
    /// The cell has only ever held a single value.
    Constant = 2,
    /// The cell has only ever held values of one type (Smis, or heap objects
    /// of one Map).
    ConstantType = 3,
    /// The property was deleted; code depending on the cell is invalid.
    Invalidated = 4,
}

impl PropertyCellType {
    const fn from_bits(bits: u32) -> Self {
        match bits {
            0 => Self::Mutable,
            1 => Self::Undefined,
            2 => Self::Constant,
            3 => Self::ConstantType,
            _ => Self::Invalidated,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyDetails(u32);

const KIND_SHIFT: u32 = 0;
const LOCATION_SHIFT: u32 = 1;
const ATTRIBUTES_SHIFT: u32 = 2;
const ATTRIBUTES_MASK: u32 = 0b111 << ATTRIBUTES_SHIFT;
const REPRESENTATION_SHIFT: u32 = 5;
const REPRESENTATION_MASK: u32 = 0b111 << REPRESENTATION_SHIFT;
const FIELD_INDEX_SHIFT: u32 = 8;
const FIELD_INDEX_MASK: u32 = 0xfff << FIELD_INDEX_SHIFT;
const DICTIONARY_INDEX_SHIFT: u32 = 8;
const DICTIONARY_INDEX_MASK: u32 = 0x7f_ffff << DICTIONARY_INDEX_SHIFT;

/// Largest field index encodable in fast-mode details.
pub const MAX_FIELD_INDEX: u32 = 0xfff;
/// Largest dictionary enumeration index.
pub const MAX_ENUMERATION_INDEX: u32 = 0x7f_ffff;

impl PropertyDetails {
    /// Details of a fast-mode property.
    pub fn new(
        kind: PropertyKind,
        attributes: PropertyAttributes,
        location: PropertyLocation,
        representation: Representation,
        field_index: u32,
    ) -> Self {
        debug_assert!(field_index <= MAX_FIELD_INDEX);
        Self(
            ((kind as u32) << KIND_SHIFT)
                | ((location as u32) << LOCATION_SHIFT)
                | ((attributes.bits() as u32) << ATTRIBUTES_SHIFT)
                | ((representation as u32) << REPRESENTATION_SHIFT)
                | (field_index << FIELD_INDEX_SHIFT),
        )
    }

    /// Details of a dictionary-mode property with the given enumeration
    /// index (0 means "not yet assigned").
    pub fn new_dictionary(
        kind: PropertyKind,
        attributes: PropertyAttributes,
        enumeration_index: u32,
    ) -> Self {
        debug_assert!(enumeration_index <= MAX_ENUMERATION_INDEX);
        Self(
            ((kind as u32) << KIND_SHIFT)
                | ((attributes.bits() as u32) << ATTRIBUTES_SHIFT)
                | (enumeration_index << DICTIONARY_INDEX_SHIFT),
        )
    }

    /// Details of a global property cell.
    pub fn new_cell(
        kind: PropertyKind,
        attributes: PropertyAttributes,
        enumeration_index: u32,
        cell_type: PropertyCellType,
    ) -> Self {
        Self::new_dictionary(kind, attributes, enumeration_index).set_cell_type(cell_type)
    }

    pub fn kind(self) -> PropertyKind {
        if (self.0 >> KIND_SHIFT) & 1 == 0 {
            PropertyKind::Data
        } else {
            PropertyKind::Accessor
        }
    }

    pub fn location(self) -> PropertyLocation {
        if (self.0 >> LOCATION_SHIFT) & 1 == 0 {
            PropertyLocation::Field
        } else {
            PropertyLocation::Descriptor
        }
    }

    pub fn attributes(self) -> PropertyAttributes {
        PropertyAttributes::from_bits(((self.0 & ATTRIBUTES_MASK) >> ATTRIBUTES_SHIFT) as u8)
    }

    pub fn representation(self) -> Representation {
        Representation::from_bits((self.0 & REPRESENTATION_MASK) >> REPRESENTATION_SHIFT)
    }

    pub fn field_index(self) -> u32 {
        (self.0 & FIELD_INDEX_MASK) >> FIELD_INDEX_SHIFT
    }

    pub fn dictionary_index(self) -> u32 {
        (self.0 & DICTIONARY_INDEX_MASK) >> DICTIONARY_INDEX_SHIFT
    }

    pub fn cell_type(self) -> PropertyCellType {
        PropertyCellType::from_bits((self.0 & REPRESENTATION_MASK) >> REPRESENTATION_SHIFT)
    }

    pub fn is_read_only(self) -> bool {
        self.attributes().is_read_only()
    }

    pub fn is_dont_enum(self) -> bool {
        self.attributes().is_dont_enum()
    }

    pub fn is_configurable(self) -> bool {
        !self.attributes().is_dont_delete()
    }

    pub fn is_field(self) -> bool {
        self.kind() == PropertyKind::Data && self.location() == PropertyLocation::Field
    }

    #[must_use]
    pub fn set_attributes(self, attributes: PropertyAttributes) -> Self {
        Self((self.0 & !ATTRIBUTES_MASK) | ((attributes.bits() as u32) << ATTRIBUTES_SHIFT))
    }

    #[must_use]
    pub fn copy_add_attributes(self, attributes: PropertyAttributes) -> Self {
        self.set_attributes(self.attributes().union(attributes))
    }

    #[must_use]
    pub fn copy_with_representation(self, representation: Representation) -> Self {
        Self((self.0 & !REPRESENTATION_MASK) | ((representation as u32) << REPRESENTATION_SHIFT))
    }

    #[must_use]
    pub fn set_field_index(self, field_index: u32) -> Self {
        debug_assert!(field_index <= MAX_FIELD_INDEX);
        Self((self.0 & !FIELD_INDEX_MASK) | (field_index << FIELD_INDEX_SHIFT))
    }

    #[must_use]
    pub fn set_dictionary_index(self, index: u32) -> Self {
        debug_assert!(index <= MAX_ENUMERATION_INDEX);
        Self((self.0 & !DICTIONARY_INDEX_MASK) | (index << DICTIONARY_INDEX_SHIFT))
    }

    #[must_use]
    pub fn set_cell_type(self, cell_type: PropertyCellType) -> Self {
        Self((self.0 & !REPRESENTATION_MASK) | ((cell_type as u32) << REPRESENTATION_SHIFT))
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl core::fmt::Debug for PropertyDetails {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let attributes = self.attributes();
        write!(
            f,
            "({}{}, {}{}{}, {}, idx {})",
            match self.kind() {
                PropertyKind::Data => "data",
                PropertyKind::Accessor => "accessor",
            },
            match self.location() {
                PropertyLocation::Field => " field",
                PropertyLocation::Descriptor => " const",
            },
            if attributes.is_read_only() { "_" } else { "w" },
            if attributes.is_dont_enum() { "_" } else { "e" },
            if attributes.is_dont_delete() { "_" } else { "c" },
            self.representation().mnemonic(),
            self.field_index(),
        )
    }
}
