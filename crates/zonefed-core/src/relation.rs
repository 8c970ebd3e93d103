//! Inclusion relation between two zones or federations.

use std::fmt;
use std::ops::{BitAnd, BitOr};

/// Four-way inclusion relation of a left operand `a` against a right
/// operand `b`.
///
/// The discriminants form a two-bit lattice: bit 0 is "`a` contains `b`",
/// bit 1 is "`a` is contained in `b`". [`Relation::Equal`] has both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Relation {
    /// Neither operand includes the other.
    Different = 0,
    /// `a ⊇ b`.
    Superset = 1,
    /// `a ⊆ b`.
    Subset = 2,
    /// `a == b`.
    Equal = 3,
}

impl Relation {
    /// Build a relation from its two inclusion bits.
    pub fn from_inclusions(subset: bool, superset: bool) -> Self {
        Self::from_bits(((subset as u8) << 1) | superset as u8)
    }

    /// Decode the two low bits of `bits`.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 3 {
            0 => Self::Different,
            1 => Self::Superset,
            2 => Self::Subset,
            _ => Self::Equal,
        }
    }

    /// Encoded bits.
    pub fn bits(self) -> u8 {
        self as u8
    }

    /// `a ⊆ b` (strictly or not).
    pub fn is_subset(self) -> bool {
        self.bits() & 2 != 0
    }

    /// `a ⊇ b` (strictly or not).
    pub fn is_superset(self) -> bool {
        self.bits() & 1 != 0
    }

    /// The relation seen from the other operand.
    pub fn flip(self) -> Self {
        match self {
            Self::Superset => Self::Subset,
            Self::Subset => Self::Superset,
            other => other,
        }
    }
}

impl BitAnd for Relation {
    type Output = Relation;

    fn bitand(self, rhs: Self) -> Self {
        Self::from_bits(self.bits() & rhs.bits())
    }
}

impl BitOr for Relation {
    type Output = Relation;

    fn bitor(self, rhs: Self) -> Self {
        Self::from_bits(self.bits() | rhs.bits())
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Different => "different",
            Self::Superset => "superset",
            Self::Subset => "subset",
            Self::Equal => "equal",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_round_trip_through_from_bits() {
        for r in [
            Relation::Different,
            Relation::Superset,
            Relation::Subset,
            Relation::Equal,
        ] {
            assert_eq!(Relation::from_bits(r.bits()), r);
        }
    }

    #[test]
    fn inclusion_flags() {
        assert!(Relation::Equal.is_subset());
        assert!(Relation::Equal.is_superset());
        assert!(!Relation::Superset.is_subset());
        assert!(!Relation::Different.is_superset());
        assert_eq!(Relation::from_inclusions(true, false), Relation::Subset);
    }

    #[test]
    fn flip_swaps_direction() {
        assert_eq!(Relation::Subset.flip(), Relation::Superset);
        assert_eq!(Relation::Equal.flip(), Relation::Equal);
    }

    #[test]
    fn lattice_operators() {
        assert_eq!(Relation::Subset | Relation::Superset, Relation::Equal);
        assert_eq!(Relation::Equal & Relation::Subset, Relation::Subset);
        assert_eq!(Relation::Subset & Relation::Superset, Relation::Different);
    }
}
