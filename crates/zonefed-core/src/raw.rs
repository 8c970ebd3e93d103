//! Encoded clock-difference bounds.
//!
//! A [`Raw`] packs a bound `c` and a strictness flag into one `i32`:
//! `raw = (c << 1) | weak`. With this encoding the natural integer order
//! is the tightness order of constraints: `< 3` sorts below `<= 3`, which
//! sorts below `< 4`. Two sentinels exist: [`Raw::LS_INFINITY`] (no
//! constraint) and [`Raw::LE_ZERO`] (the reference bound `<= 0`).

use std::fmt;

/// Largest finite bound magnitude. Bounds at or above this value denote
/// infinity.
pub const INFINITY: i32 = i32::MAX >> 1;

/// Bounds whose magnitude reaches this value are considered overflowed.
pub const OVERFLOW: i32 = i32::MAX >> 2;

/// Strictness of a bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strictness {
    /// `xi - xj < c`
    Strict,
    /// `xi - xj <= c`
    Weak,
}

impl Strictness {
    /// The opposite strictness.
    pub fn flip(self) -> Self {
        match self {
            Self::Strict => Self::Weak,
            Self::Weak => Self::Strict,
        }
    }

    fn bit(self) -> i32 {
        match self {
            Self::Strict => 0,
            Self::Weak => 1,
        }
    }
}

/// An encoded upper bound on a clock difference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Raw(i32);

impl Raw {
    /// `<= 0`: the diagonal of a non-empty DBM and the reference lower bound.
    pub const LE_ZERO: Raw = Raw(1);

    /// `< 0`: a negative cycle on the diagonal marks an empty DBM.
    pub const LS_ZERO: Raw = Raw(0);

    /// `< infinity`: absence of a constraint.
    pub const LS_INFINITY: Raw = Raw(INFINITY << 1);

    /// Encode a bound with the given strictness.
    ///
    /// # Panics
    ///
    /// Panics unless `bound` is [`INFINITY`] or its magnitude is below
    /// [`OVERFLOW`].
    pub fn new(bound: i32, strictness: Strictness) -> Self {
        assert!(
            bound == INFINITY || bound.abs() < OVERFLOW,
            "bound {bound} out of range"
        );
        if bound == INFINITY {
            return Self::LS_INFINITY;
        }
        Self((bound << 1) | strictness.bit())
    }

    /// `xi - xj <= bound`.
    pub fn weak(bound: i32) -> Self {
        Self::new(bound, Strictness::Weak)
    }

    /// `xi - xj < bound`.
    pub fn strict(bound: i32) -> Self {
        Self::new(bound, Strictness::Strict)
    }

    /// Reinterpret an encoded integer, as read from a serialized stream.
    pub fn from_encoded(raw: i32) -> Self {
        Self(raw)
    }

    /// The encoded integer.
    pub fn encoded(self) -> i32 {
        self.0
    }

    /// The decoded bound value. [`INFINITY`] for the infinity sentinel.
    pub fn bound(self) -> i32 {
        self.0 >> 1
    }

    /// Strictness of the bound.
    pub fn strictness(self) -> Strictness {
        if self.0 & 1 == 0 {
            Strictness::Strict
        } else {
            Strictness::Weak
        }
    }

    /// `true` for `<` bounds (including infinity).
    pub fn is_strict(self) -> bool {
        self.0 & 1 == 0
    }

    /// `true` for the infinity sentinel.
    pub fn is_infinity(self) -> bool {
        self == Self::LS_INFINITY
    }

    /// Negation used to complement a constraint: the complement of
    /// `xi - xj ~ c` is `xj - xi ~' -c` with flipped strictness.
    ///
    /// Must not be called on infinity.
    pub fn negate(self) -> Self {
        debug_assert!(!self.is_infinity(), "cannot negate infinity");
        Self(1 - self.0)
    }

    /// Same bound, weak.
    pub fn to_weak(self) -> Self {
        Self(self.0 | 1)
    }

    /// Saturating addition of two bounds along a path: the sum is strict if
    /// either operand is strict, and infinite if either operand is.
    ///
    /// A sum whose bound reaches [`OVERFLOW`] becomes infinity; one whose
    /// bound falls to `-OVERFLOW` or below becomes the most negative bound.
    pub fn add(self, other: Self) -> Self {
        if self.is_infinity() || other.is_infinity() {
            return Self::LS_INFINITY;
        }
        let sum = self.0 as i64 + other.0 as i64 - ((self.0 | other.0) & 1) as i64;
        let limit = (OVERFLOW as i64) << 1;
        if sum >= limit {
            Self::LS_INFINITY
        } else if sum <= -limit {
            Self(-Self::LS_INFINITY.0)
        } else {
            Self(sum as i32)
        }
    }

    /// Shift a finite bound by `delta` (infinity is unchanged).
    pub fn shift(self, delta: i32) -> Self {
        if self.is_infinity() {
            self
        } else {
            self.add(Self::weak(delta))
        }
    }

    /// Tightest of two bounds.
    pub fn min(self, other: Self) -> Self {
        if other < self {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for Raw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinity() {
            write!(f, "<inf")
        } else if self.is_strict() {
            write!(f, "<{}", self.bound())
        } else {
            write!(f, "<={}", self.bound())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_orders_by_tightness() {
        assert!(Raw::strict(3) < Raw::weak(3));
        assert!(Raw::weak(3) < Raw::strict(4));
        assert!(Raw::weak(-1) < Raw::LS_ZERO);
        assert!(Raw::LS_ZERO < Raw::LE_ZERO);
        assert!(Raw::weak(1_000_000) < Raw::LS_INFINITY);
    }

    #[test]
    fn decode_bound_and_strictness() {
        let r = Raw::new(-7, Strictness::Strict);
        assert_eq!(r.bound(), -7);
        assert_eq!(r.strictness(), Strictness::Strict);
        assert_eq!(Raw::LE_ZERO, Raw::weak(0));
        assert_eq!(Raw::LS_ZERO, Raw::strict(0));
        assert_eq!(Raw::LS_INFINITY.bound(), INFINITY);
    }

    #[test]
    fn negate_complements_constraint() {
        // x <= 5 complemented is x > 5, i.e. -x < -5
        assert_eq!(Raw::weak(5).negate(), Raw::strict(-5));
        // x < 5 complemented is x >= 5, i.e. -x <= -5
        assert_eq!(Raw::strict(5).negate(), Raw::weak(-5));
    }

    #[test]
    fn add_follows_path_rules() {
        assert_eq!(Raw::weak(2).add(Raw::weak(3)), Raw::weak(5));
        assert_eq!(Raw::weak(2).add(Raw::strict(3)), Raw::strict(5));
        assert_eq!(Raw::strict(2).add(Raw::strict(-3)), Raw::strict(-1));
        assert_eq!(Raw::weak(2).add(Raw::LS_INFINITY), Raw::LS_INFINITY);
        assert_eq!(Raw::LE_ZERO.add(Raw::LE_ZERO), Raw::LE_ZERO);
    }

    #[test]
    fn add_saturates_instead_of_overflowing() {
        let big = Raw::weak(OVERFLOW - 1);
        assert_eq!(big.add(big), Raw::LS_INFINITY);
        assert_eq!(big.add(Raw::weak(1)), Raw::LS_INFINITY);
        assert_eq!(big.add(Raw::LE_ZERO), big);

        let low = Raw::strict(-(OVERFLOW - 1));
        assert_eq!(low.add(low), Raw(-Raw::LS_INFINITY.0));
        assert!(low.add(low) < low);
    }

    #[test]
    fn sums_below_overflow_stay_finite() {
        let half = Raw::weak(OVERFLOW / 2 - 1);
        let sum = half.add(half);
        assert!(!sum.is_infinity());
        assert_eq!(sum.bound(), 2 * (OVERFLOW / 2 - 1));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn new_rejects_bounds_past_overflow() {
        let _ = Raw::weak(-(1 << 30));
    }

    #[test]
    fn infinity_bound_encodes_the_sentinel() {
        assert_eq!(Raw::weak(INFINITY), Raw::LS_INFINITY);
        assert_eq!(Raw::strict(INFINITY), Raw::LS_INFINITY);
    }

    #[test]
    fn shift_leaves_infinity_alone() {
        assert_eq!(Raw::weak(4).shift(-2), Raw::weak(2));
        assert_eq!(Raw::strict(4).shift(3), Raw::strict(7));
        assert_eq!(Raw::LS_INFINITY.shift(10), Raw::LS_INFINITY);
    }

    #[test]
    fn display_formats() {
        assert_eq!(Raw::weak(3).to_string(), "<=3");
        assert_eq!(Raw::strict(-2).to_string(), "<-2");
        assert_eq!(Raw::LS_INFINITY.to_string(), "<inf");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn any_finite() -> impl Strategy<Value = Raw> {
            (-10_000i32..10_000, any::<bool>()).prop_map(|(b, weak)| {
                if weak {
                    Raw::weak(b)
                } else {
                    Raw::strict(b)
                }
            })
        }

        proptest! {
            #[test]
            fn negate_is_involutive(r in any_finite()) {
                prop_assert_eq!(r.negate().negate(), r);
            }

            #[test]
            fn constraint_and_complement_never_both_hold(r in any_finite()) {
                // xi - xj ~ c together with its complement forms a negative cycle.
                prop_assert!(r.add(r.negate()) < Raw::LE_ZERO);
            }

            #[test]
            fn add_is_commutative(a in any_finite(), b in any_finite()) {
                prop_assert_eq!(a.add(b), b.add(a));
            }
        }
    }
}
