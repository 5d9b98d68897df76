//! Fixed-point arithmetic for deterministic simulation.
//!
//! All simulation values use this type to ensure identical results across platforms.
//! Floats (f32/f64) are banned in sim logic; they only appear at the parse and
//! display layers.
//!
//! The representation is Q24.8: an `i32` scaled by 256. Multiplication and
//! division reproduce the legacy shift-based behaviour bit for bit, including
//! silent wraparound outside the documented operand bounds.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Neg, Shl, Shr, Sub, SubAssign};

/// Fixed-point value with scale 256.
///
/// Represents decimal values as integers: 0.5 → 128, 1.0 → 256.
///
/// # Multiplication bounds
///
/// [`Fixed::mul`] multiplies the raw values in 32 bits before shifting, so the
/// product only stays in range when:
/// - both operands are within ±181.0, or
/// - one operand is within [-1.0, 1.0] and the other within ±32767.0.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fixed(pub i32);

impl Fixed {
    /// Scale factor: 256 = 1.0
    pub const SCALE: i32 = 256;
    pub const SHIFT: u32 = 8;

    pub const ZERO: Fixed = Fixed(0);
    pub const ONE: Fixed = Fixed(256);
    pub const HALF: Fixed = Fixed(128);
    pub const MAX: Fixed = Fixed(i32::MAX);
    pub const MIN: Fixed = Fixed(i32::MIN);

    /// Largest operand magnitude for which `mul` is exact regardless of the other operand.
    pub const MUL_SAFE_BOUND: i32 = 181;

    #[inline]
    pub const fn from_raw(raw: i32) -> Self {
        Fixed(raw)
    }

    /// Create from integer (e.g., 5 → 1280)
    #[inline]
    pub const fn from_int(v: i32) -> Self {
        Fixed(v.wrapping_shl(Self::SHIFT))
    }

    /// Convert from f32 (parse layer only, not in sim logic).
    ///
    /// Guards against NaN/Inf/overflow.
    #[inline]
    pub fn from_f32(v: f32) -> Self {
        if !v.is_finite() {
            return Fixed::ZERO;
        }
        let scaled = (v * Self::SCALE as f32).round();
        if scaled >= i32::MAX as f32 {
            return Fixed::MAX;
        }
        if scaled <= i32::MIN as f32 {
            return Fixed::MIN;
        }
        Fixed(scaled as i32)
    }

    /// Convert to f32 (display only)
    #[inline]
    pub fn to_f32(self) -> f32 {
        self.0 as f32 / Self::SCALE as f32
    }

    #[inline]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Convert to an integer with the legacy asymmetric rounding.
    ///
    /// Non-negative values truncate (`raw >> 8`). Negative values return
    /// `(raw >> 8) + 1`, which is correct unless 256 divides `raw`, in which
    /// case the result is one too large. Scenario data was tuned against this
    /// behaviour, so it must not be "fixed".
    #[inline]
    pub const fn to_int(self) -> i32 {
        if self.0 < 0 {
            (self.0 >> Self::SHIFT) + 1
        } else {
            self.0 >> Self::SHIFT
        }
    }

    /// Convert to an integer by flooring (`raw >> 8`).
    ///
    /// Used where the value is a position rather than a quantity: firing
    /// offsets for weapon mounts and whole-unit motion steps.
    #[inline]
    pub const fn to_int_floor(self) -> i32 {
        self.0 >> Self::SHIFT
    }

    /// Multiply two fixed-point values: `(a × b) >> 8`.
    ///
    /// The raw product is computed in 32 bits and wraps outside the bounds
    /// documented on [`Fixed`].
    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub const fn mul(self, other: Fixed) -> Fixed {
        Fixed(self.0.wrapping_mul(other.0) >> Self::SHIFT)
    }

    /// Divide two fixed-point values: `(a << 8) / b`.
    ///
    /// Division by zero yields zero.
    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub const fn div(self, other: Fixed) -> Fixed {
        if other.0 == 0 {
            return Fixed::ZERO;
        }
        Fixed(self.0.wrapping_shl(Self::SHIFT).wrapping_div(other.0))
    }

    #[inline]
    pub const fn abs(self) -> Fixed {
        Fixed(self.0.wrapping_abs())
    }

    #[inline]
    pub fn min(self, other: Fixed) -> Fixed {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }

    #[inline]
    pub fn max(self, other: Fixed) -> Fixed {
        if self.0 >= other.0 {
            self
        } else {
            other
        }
    }

    #[inline]
    pub fn saturating_add(self, other: Fixed) -> Fixed {
        Fixed(self.0.saturating_add(other.0))
    }
}

impl Add for Fixed {
    type Output = Fixed;
    #[inline]
    fn add(self, other: Fixed) -> Fixed {
        Fixed(self.0.wrapping_add(other.0))
    }
}

impl AddAssign for Fixed {
    #[inline]
    fn add_assign(&mut self, other: Fixed) {
        *self = *self + other;
    }
}

impl Sub for Fixed {
    type Output = Fixed;
    #[inline]
    fn sub(self, other: Fixed) -> Fixed {
        Fixed(self.0.wrapping_sub(other.0))
    }
}

impl SubAssign for Fixed {
    #[inline]
    fn sub_assign(&mut self, other: Fixed) {
        *self = *self - other;
    }
}

impl Neg for Fixed {
    type Output = Fixed;
    #[inline]
    fn neg(self) -> Fixed {
        Fixed(self.0.wrapping_neg())
    }
}

impl Shl<u32> for Fixed {
    type Output = Fixed;
    #[inline]
    fn shl(self, n: u32) -> Fixed {
        Fixed(self.0.wrapping_shl(n))
    }
}

impl Shr<u32> for Fixed {
    type Output = Fixed;
    #[inline]
    fn shr(self, n: u32) -> Fixed {
        Fixed(self.0 >> n.min(31))
    }
}

impl std::fmt::Debug for Fixed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Fixed({} = {})", self.0, self.to_f32())
    }
}

impl std::fmt::Display for Fixed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}", self.to_f32())
    }
}

/// A pair of fixed-point values: velocities and sub-unit motion remainders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FixedPoint {
    pub h: Fixed,
    pub v: Fixed,
}

impl FixedPoint {
    pub const ZERO: FixedPoint = FixedPoint {
        h: Fixed::ZERO,
        v: Fixed::ZERO,
    };

    pub const fn new(h: Fixed, v: Fixed) -> Self {
        Self { h, v }
    }
}

/// Integer world coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Coord {
    pub h: i32,
    pub v: i32,
}

impl Coord {
    pub const fn new(h: i32, v: i32) -> Self {
        Self { h, v }
    }

    #[inline]
    pub fn offset(self, by: Coord) -> Coord {
        Coord::new(self.h.wrapping_add(by.h), self.v.wrapping_add(by.v))
    }
}

/// Integer square root (floor), used for lead-targeting distance estimates.
pub fn isqrt(n: u32) -> u32 {
    if n < 2 {
        return n;
    }
    let n = n as u64;
    let mut x = n;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(Fixed::ZERO.0, 0);
        assert_eq!(Fixed::ONE.0, 256);
        assert_eq!(Fixed::HALF.0, 128);
    }

    #[test]
    fn test_from_f32() {
        assert_eq!(Fixed::from_f32(0.5), Fixed::HALF);
        assert_eq!(Fixed::from_f32(1.0), Fixed::ONE);
        assert_eq!(Fixed::from_f32(-2.25), Fixed(-576));
        assert_eq!(Fixed::from_f32(f32::NAN), Fixed::ZERO);
        assert_eq!(Fixed::from_f32(1e20), Fixed::MAX);
        assert_eq!(Fixed::from_f32(-1e20), Fixed::MIN);
    }

    #[test]
    fn test_multiply() {
        assert_eq!(Fixed::from_int(2).mul(Fixed::from_int(3)), Fixed::from_int(6));
        assert_eq!(Fixed::HALF.mul(Fixed::HALF), Fixed(64));
        // -0.5 * 0.00390625 floors to -1 raw
        assert_eq!(Fixed(-128).mul(Fixed(1)), Fixed(-1));
    }

    #[test]
    fn test_divide() {
        assert_eq!(Fixed::from_int(6).div(Fixed::from_int(2)), Fixed::from_int(3));
        assert_eq!(Fixed::ONE.div(Fixed::from_int(4)), Fixed(64));
        assert_eq!(Fixed::ONE.div(Fixed::ZERO), Fixed::ZERO);
    }

    #[test]
    fn test_to_int_legacy_rounding() {
        assert_eq!(Fixed::from_int(5).to_int(), 5);
        assert_eq!(Fixed(300).to_int(), 1);
        // exact negatives come out one too large
        assert_eq!(Fixed::from_int(-3).to_int(), -2);
        // inexact negatives truncate toward zero
        assert_eq!(Fixed(-300).to_int(), -1);
        assert_eq!(Fixed(-300).to_int_floor(), -2);
        assert_eq!(Fixed::from_int(-3).to_int_floor(), -3);
    }

    #[test]
    fn test_isqrt() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(1), 1);
        assert_eq!(isqrt(15), 3);
        assert_eq!(isqrt(16), 4);
        assert_eq!(isqrt(u32::MAX), 65535);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn safe_raw() -> impl Strategy<Value = i32> {
            let bound = Fixed::MUL_SAFE_BOUND * Fixed::SCALE;
            -bound..=bound
        }

        proptest! {
            /// Within the safe bound, `mul` equals the exact product shifted
            /// (floored) by 8 bits.
            #[test]
            fn mul_matches_reference(a in safe_raw(), b in safe_raw()) {
                let exact = (a as f64) * (b as f64) / 256.0;
                let expected = exact.floor() as i32;
                prop_assert_eq!(Fixed(a).mul(Fixed(b)).raw(), expected);
            }

            #[test]
            fn mul_with_unit_operand_matches_reference(
                a in -32767 * 256..=32767 * 256i32,
                b in -256..=256i32,
            ) {
                let expected = ((a as i64 * b as i64) >> 8) as i32;
                prop_assert_eq!(Fixed(a).mul(Fixed(b)).raw(), expected);
            }

            #[test]
            fn mul_is_commutative(a in safe_raw(), b in safe_raw()) {
                prop_assert_eq!(Fixed(a).mul(Fixed(b)), Fixed(b).mul(Fixed(a)));
            }

            #[test]
            fn mul_never_panics(a in any::<i32>(), b in any::<i32>()) {
                let _ = Fixed(a).mul(Fixed(b));
                let _ = Fixed(a).div(Fixed(b));
            }

            #[test]
            fn to_int_exact_negative_is_off_by_one(n in -8_000_000..0i32) {
                let raw = n * 256;
                prop_assert_eq!(Fixed(raw).to_int(), raw / 256 + 1);
            }

            #[test]
            fn to_int_non_negative_truncates(raw in 0..=i32::MAX) {
                prop_assert_eq!(Fixed(raw).to_int(), raw / 256);
            }

            #[test]
            fn to_int_floor_is_shift(raw in any::<i32>()) {
                prop_assert_eq!(Fixed(raw).to_int_floor(), raw >> 8);
            }

            #[test]
            fn div_one_is_identity(a in -8_000_000..8_000_000i32) {
                prop_assert_eq!(Fixed(a).div(Fixed::ONE), Fixed(a));
            }

            #[test]
            fn isqrt_is_floor_root(n in any::<u32>()) {
                let r = isqrt(n) as u64;
                prop_assert!(r * r <= n as u64);
                prop_assert!((r + 1) * (r + 1) > n as u64);
            }
        }
    }
}
