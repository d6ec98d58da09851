// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## Elements kinds
//!
//! The representation of an object's indexed properties. Fast kinds form a
//! lattice along two independent axes:
//!
//! ```text
//!   packed:  PackedSmi -> PackedDouble -> Packed
//!               |             |            |
//!   holey:   HoleySmi  -> HoleyDouble  -> Holey  -> Dictionary
//! ```
//!
//! A transition is only ever towards a more general kind. Typed array kinds
//! are fixed for the lifetime of the object.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementsKind {
    PackedSmi = 0,
    HoleySmi = 1,
    PackedDouble = 2,
    HoleyDouble = 3,
    Packed = 4,
    Holey = 5,
    Dictionary = 6,
    Uint8 = 7,
    Int8 = 8,
    Uint16 = 9,
    Int16 = 10,
    Uint32 = 11,
    Int32 = 12,
    Float32 = 13,
    Float64 = 14,
    Uint8Clamped = 15,
}

/// Fast kinds in order of increasing generality, as cached per array Map.
pub const FAST_ELEMENTS_KINDS: [ElementsKind; 6] = [
    ElementsKind::PackedSmi,
    ElementsKind::HoleySmi,
    ElementsKind::PackedDouble,
    ElementsKind::HoleyDouble,
    ElementsKind::Packed,
    ElementsKind::Holey,
];

/// The kind plain objects start with.
pub const INITIAL_OBJECT_ELEMENTS_KIND: ElementsKind = ElementsKind::Holey;
/// The kind array literals start with.
pub const INITIAL_ARRAY_ELEMENTS_KIND: ElementsKind = ElementsKind::PackedSmi;

/// Value-type axis of the fast lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum FastValueType {
    Smi,
    Double,
    Tagged,
}

impl ElementsKind {
    pub fn is_fast(self) -> bool {
        self <= ElementsKind::Holey
    }

    pub fn is_smi(self) -> bool {
        matches!(self, ElementsKind::PackedSmi | ElementsKind::HoleySmi)
    }

    pub fn is_double(self) -> bool {
        matches!(self, ElementsKind::PackedDouble | ElementsKind::HoleyDouble)
    }

    pub fn is_object(self) -> bool {
        matches!(self, ElementsKind::Packed | ElementsKind::Holey)
    }

    /// Smi or object kinds, i.e. backed by tagged values.
    pub fn is_smi_or_object(self) -> bool {
        self.is_smi() || self.is_object()
    }

    pub fn is_holey(self) -> bool {
        matches!(
            self,
            ElementsKind::HoleySmi | ElementsKind::HoleyDouble | ElementsKind::Holey
        )
    }

    pub fn is_dictionary(self) -> bool {
        self == ElementsKind::Dictionary
    }

    pub fn is_typed_array(self) -> bool {
        self >= ElementsKind::Uint8
    }

    fn value_type(self) -> Option<FastValueType> {
        match self {
            ElementsKind::PackedSmi | ElementsKind::HoleySmi => Some(FastValueType::Smi),
            ElementsKind::PackedDouble | ElementsKind::HoleyDouble => Some(FastValueType::Double),
            ElementsKind::Packed | ElementsKind::Holey => Some(FastValueType::Tagged),
            _ => None,
        }
    }

    fn from_parts(value_type: FastValueType, holey: bool) -> Self {
        match (value_type, holey) {
            (FastValueType::Smi, false) => ElementsKind::PackedSmi,
            (FastValueType::Smi, true) => ElementsKind::HoleySmi,
            (FastValueType::Double, false) => ElementsKind::PackedDouble,
            (FastValueType::Double, true) => ElementsKind::HoleyDouble,
            (FastValueType::Tagged, false) => ElementsKind::Packed,
            (FastValueType::Tagged, true) => ElementsKind::Holey,
        }
    }

    /// The holey variant of a fast kind.
    #[must_use]
    pub fn to_holey(self) -> Self {
        match self.value_type() {
            Some(value_type) => Self::from_parts(value_type, true),
            None => self,
        }
    }

    /// The packed variant of a fast kind.
    #[must_use]
    pub fn to_packed(self) -> Self {
        match self.value_type() {
            Some(value_type) => Self::from_parts(value_type, false),
            None => self,
        }
    }

    /// Byte size of one element of a typed array kind.
    pub fn element_size(self) -> usize {
        match self {
            ElementsKind::Uint8 | ElementsKind::Int8 | ElementsKind::Uint8Clamped => 1,
            ElementsKind::Uint16 | ElementsKind::Int16 => 2,
            ElementsKind::Uint32 | ElementsKind::Int32 | ElementsKind::Float32 => 4,
            _ => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ElementsKind::PackedSmi => "PACKED_SMI_ELEMENTS",
            ElementsKind::HoleySmi => "HOLEY_SMI_ELEMENTS",
            ElementsKind::PackedDouble => "PACKED_DOUBLE_ELEMENTS",
            ElementsKind::HoleyDouble => "HOLEY_DOUBLE_ELEMENTS",
            ElementsKind::Packed => "PACKED_ELEMENTS",
            ElementsKind::Holey => "HOLEY_ELEMENTS",
            ElementsKind::Dictionary => "DICTIONARY_ELEMENTS",
            ElementsKind::Uint8 => "UINT8_ELEMENTS",
            ElementsKind::Int8 => "INT8_ELEMENTS",
            ElementsKind::Uint16 => "UINT16_ELEMENTS",
            ElementsKind::Int16 => "INT16_ELEMENTS",
            ElementsKind::Uint32 => "UINT32_ELEMENTS",
            ElementsKind::Int32 => "INT32_ELEMENTS",
            ElementsKind::Float32 => "FLOAT32_ELEMENTS",
            ElementsKind::Float64 => "FLOAT64_ELEMENTS",
            ElementsKind::Uint8Clamped => "UINT8_CLAMPED_ELEMENTS",
        }
    }
}

/// Returns true if an object may move from elements kind `from` to `to`.
///
/// Fast kinds may only become more general in value type and never go from
/// holey back to packed. Any fast kind may become dictionary elements;
/// nothing leaves dictionary or typed array kinds.
pub fn is_valid_elements_transition(from: ElementsKind, to: ElementsKind) -> bool {
    match (from.value_type(), to.value_type()) {
        (Some(from_type), Some(to_type)) => {
            from != to && from_type <= to_type && (!from.is_holey() || to.is_holey())
        }
        (Some(_), None) => to == ElementsKind::Dictionary,
        _ => false,
    }
}

/// Returns true if `to` is at least as general as `from`, i.e. a transition
/// is valid or unnecessary.
pub fn is_more_general_elements_kind_transition(from: ElementsKind, to: ElementsKind) -> bool {
    from == to || is_valid_elements_transition(from, to)
}

/// The least general kind that is at least as general as both `a` and `b`.
pub fn union_elements_kinds(a: ElementsKind, b: ElementsKind) -> ElementsKind {
    match (a.value_type(), b.value_type()) {
        (Some(a_type), Some(b_type)) => {
            ElementsKind::from_parts(a_type.max(b_type), a.is_holey() || b.is_holey())
        }
        _ if a == b => a,
        _ => ElementsKind::Dictionary,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn holey_never_goes_back_to_packed() {
        for from in FAST_ELEMENTS_KINDS {
            for to in FAST_ELEMENTS_KINDS {
                if from.is_holey() && !to.is_holey() {
                    assert!(!is_valid_elements_transition(from, to), "{from:?} -> {to:?}");
                }
            }
        }
    }

    #[test]
    fn round_trips_are_only_identity() {
        let kinds = [
            FAST_ELEMENTS_KINDS.as_slice(),
            &[ElementsKind::Dictionary, ElementsKind::Float64],
        ]
        .concat();
        for &a in &kinds {
            for &b in &kinds {
                if is_more_general_elements_kind_transition(a, b)
                    && is_more_general_elements_kind_transition(b, a)
                {
                    assert_eq!(a, b);
                }
            }
        }
    }

    #[test]
    fn lattice_moves() {
        use ElementsKind::*;
        assert!(is_valid_elements_transition(PackedSmi, PackedDouble));
        assert!(is_valid_elements_transition(PackedSmi, Holey));
        assert!(is_valid_elements_transition(HoleyDouble, Holey));
        assert!(!is_valid_elements_transition(Packed, PackedDouble));
        assert!(!is_valid_elements_transition(HoleySmi, PackedDouble));
        assert!(is_valid_elements_transition(Holey, Dictionary));
        assert!(!is_valid_elements_transition(Dictionary, Holey));
        assert!(!is_valid_elements_transition(Uint8, Holey));
        assert_eq!(union_elements_kinds(PackedDouble, HoleySmi), HoleyDouble);
        assert_eq!(PackedDouble.to_holey(), HoleyDouble);
        assert_eq!(Holey.to_packed(), Packed);
    }
}
