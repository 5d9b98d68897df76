//! Table-driven angles and rotation.
//!
//! Angles are whole degrees in `[0, 360)`. Direction 0 points along +h and
//! angles grow toward +v, so a unit heading is `(cos θ, sin θ)` in `(h, v)`.
//! Every lookup goes through precomputed integer tables; nothing here calls
//! platform trigonometry.

use crate::fixed::{Coord, Fixed};

pub const ROT_POS: i32 = 360;
pub const ROT_180: i32 = 180;

/// Coordinate deltas beyond this are scaled down before computing a slope.
pub const MAXIMUM_ANGLE_DISTANCE: i32 = 32767;

/// `round(sin(d°) * 256)` for every whole degree.
#[rustfmt::skip]
const SIN_TABLE: [i16; 360] = [
    0, 4, 9, 13, 18, 22, 27, 31, 36, 40, 44, 49,
    53, 58, 62, 66, 71, 75, 79, 83, 88, 92, 96, 100,
    104, 108, 112, 116, 120, 124, 128, 132, 136, 139, 143, 147,
    150, 154, 158, 161, 165, 168, 171, 175, 178, 181, 184, 187,
    190, 193, 196, 199, 202, 204, 207, 210, 212, 215, 217, 219,
    222, 224, 226, 228, 230, 232, 234, 236, 237, 239, 241, 242,
    243, 245, 246, 247, 248, 249, 250, 251, 252, 253, 254, 254,
    255, 255, 255, 256, 256, 256, 256, 256, 256, 256, 255, 255,
    255, 254, 254, 253, 252, 251, 250, 249, 248, 247, 246, 245,
    243, 242, 241, 239, 237, 236, 234, 232, 230, 228, 226, 224,
    222, 219, 217, 215, 212, 210, 207, 204, 202, 199, 196, 193,
    190, 187, 184, 181, 178, 175, 171, 168, 165, 161, 158, 154,
    150, 147, 143, 139, 136, 132, 128, 124, 120, 116, 112, 108,
    104, 100, 96, 92, 88, 83, 79, 75, 71, 66, 62, 58,
    53, 49, 44, 40, 36, 31, 27, 22, 18, 13, 9, 4,
    0, -4, -9, -13, -18, -22, -27, -31, -36, -40, -44, -49,
    -53, -58, -62, -66, -71, -75, -79, -83, -88, -92, -96, -100,
    -104, -108, -112, -116, -120, -124, -128, -132, -136, -139, -143, -147,
    -150, -154, -158, -161, -165, -168, -171, -175, -178, -181, -184, -187,
    -190, -193, -196, -199, -202, -204, -207, -210, -212, -215, -217, -219,
    -222, -224, -226, -228, -230, -232, -234, -236, -237, -239, -241, -242,
    -243, -245, -246, -247, -248, -249, -250, -251, -252, -253, -254, -254,
    -255, -255, -255, -256, -256, -256, -256, -256, -256, -256, -255, -255,
    -255, -254, -254, -253, -252, -251, -250, -249, -248, -247, -246, -245,
    -243, -242, -241, -239, -237, -236, -234, -232, -230, -228, -226, -224,
    -222, -219, -217, -215, -212, -210, -207, -204, -202, -199, -196, -193,
    -190, -187, -184, -181, -178, -175, -171, -168, -165, -161, -158, -154,
    -150, -147, -143, -139, -136, -132, -128, -124, -120, -116, -112, -108,
    -104, -100, -96, -92, -88, -83, -79, -75, -71, -66, -62, -58,
    -53, -49, -44, -40, -36, -31, -27, -22, -18, -13, -9, -4,
];

/// `round(tan(d°) * 256)` for `d` in `0..90`.
#[rustfmt::skip]
const TAN_TABLE: [i32; 90] = [
    0, 4, 9, 13, 18, 22, 27, 31, 36, 41,
    45, 50, 54, 59, 64, 69, 73, 78, 83, 88,
    93, 98, 103, 109, 114, 119, 125, 130, 136, 142,
    148, 154, 160, 166, 173, 179, 186, 193, 200, 207,
    215, 223, 231, 239, 247, 256, 265, 275, 284, 294,
    305, 316, 328, 340, 352, 366, 380, 394, 410, 426,
    443, 462, 481, 502, 525, 549, 575, 603, 634, 667,
    703, 743, 788, 837, 893, 955, 1027, 1109, 1204, 1317,
    1452, 1616, 1822, 2085, 2436, 2926, 3661, 4885, 7331, 14666,
];

/// Slopes at or beyond this magnitude are treated as vertical.
const VERTICAL_SLOPE: i32 = TAN_TABLE[89] * 2;

/// Normalize any integer angle into `[0, 360)`.
#[inline]
pub fn normalize(angle: i32) -> i32 {
    angle.rem_euclid(ROT_POS)
}

/// `angle + delta`, wrapped into `[0, 360)`.
#[inline]
pub fn add_angle(angle: i32, delta: i32) -> i32 {
    normalize(angle.wrapping_add(delta))
}

/// Signed shortest difference `a - b`, in `(-180, 180]`.
#[inline]
pub fn angle_difference(a: i32, b: i32) -> i32 {
    let d = normalize(a.wrapping_sub(b));
    if d > ROT_180 {
        d - ROT_POS
    } else {
        d
    }
}

/// Cosine and sine of `angle` as fixed-point values.
#[inline]
pub fn rot_point(angle: i32) -> (Fixed, Fixed) {
    let a = normalize(angle) as usize;
    let sin = SIN_TABLE[a] as i32;
    let cos = SIN_TABLE[(a + 90) % 360] as i32;
    (Fixed::from_raw(cos), Fixed::from_raw(sin))
}

/// Fixed-point slope `dv / dh`.
///
/// A zero `dh` saturates to [`Fixed::MAX`] / [`Fixed::MIN`] following the
/// sign of `dv`.
pub fn slope(dh: i32, dv: i32) -> Fixed {
    if dh == 0 {
        return if dv < 0 { Fixed::MIN } else { Fixed::MAX };
    }
    let ratio = ((dv as i64) << Fixed::SHIFT) / dh as i64;
    Fixed::from_raw(ratio.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
}

/// Angle whose tangent is `slope`, in `[0, 360)`, covering the right half-plane
/// (`(-90, 90]` before normalization).
pub fn angle_from_slope(slope: Fixed) -> i32 {
    let magnitude = slope.raw().unsigned_abs().min(i32::MAX as u32) as i32;
    let degrees = if magnitude >= VERTICAL_SLOPE {
        90
    } else {
        let upper = TAN_TABLE.partition_point(|&t| t < magnitude);
        if upper == 0 {
            0
        } else if upper >= TAN_TABLE.len() {
            89
        } else if magnitude - TAN_TABLE[upper - 1] <= TAN_TABLE[upper] - magnitude {
            upper as i32 - 1
        } else {
            upper as i32
        }
    };
    if slope.raw() < 0 {
        normalize(-degrees)
    } else {
        degrees
    }
}

/// Heading from `from` toward `to`, or `None` when the points coincide.
///
/// Large deltas are shifted down until they fit the slope computation; the
/// quadrant is recovered from the sign of the horizontal delta.
pub fn angle_between(from: Coord, to: Coord) -> Option<i32> {
    let mut dh = to.h as i64 - from.h as i64;
    let mut dv = to.v as i64 - from.v as i64;
    if dh == 0 && dv == 0 {
        return None;
    }
    while dh.abs() > MAXIMUM_ANGLE_DISTANCE as i64 || dv.abs() > MAXIMUM_ANGLE_DISTANCE as i64 {
        dh >>= 1;
        dv >>= 1;
    }
    let (dh, dv) = (dh as i32, dv as i32);
    if dh == 0 {
        return Some(if dv > 0 { 90 } else { 270 });
    }
    let angle = angle_from_slope(slope(dh, dv));
    if dh < 0 {
        Some(add_angle(angle, ROT_180))
    } else {
        Some(angle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rot_point_cardinals() {
        assert_eq!(rot_point(0), (Fixed::ONE, Fixed::ZERO));
        assert_eq!(rot_point(90), (Fixed::ZERO, Fixed::ONE));
        assert_eq!(rot_point(180), (-Fixed::ONE, Fixed::ZERO));
        assert_eq!(rot_point(270), (Fixed::ZERO, -Fixed::ONE));
        assert_eq!(rot_point(-90), rot_point(270));
        assert_eq!(rot_point(450), rot_point(90));
    }

    #[test]
    fn test_angle_difference_wraps() {
        assert_eq!(angle_difference(10, 350), 20);
        assert_eq!(angle_difference(350, 10), -20);
        assert_eq!(angle_difference(180, 0), 180);
        assert_eq!(angle_difference(0, 180), 180);
        assert_eq!(angle_difference(90, 90), 0);
    }

    #[test]
    fn test_angle_from_slope() {
        assert_eq!(angle_from_slope(Fixed::ZERO), 0);
        assert_eq!(angle_from_slope(Fixed::ONE), 45);
        assert_eq!(angle_from_slope(-Fixed::ONE), 315);
        assert_eq!(angle_from_slope(Fixed::MAX), 90);
        assert_eq!(angle_from_slope(Fixed::MIN), 270);
        // tan(30°) ≈ 0.577
        assert_eq!(angle_from_slope(Fixed::from_raw(148)), 30);
    }

    #[test]
    fn test_angle_between_quadrants() {
        let origin = Coord::new(0, 0);
        assert_eq!(angle_between(origin, Coord::new(10, 0)), Some(0));
        assert_eq!(angle_between(origin, Coord::new(10, 10)), Some(45));
        assert_eq!(angle_between(origin, Coord::new(0, 10)), Some(90));
        assert_eq!(angle_between(origin, Coord::new(-10, 10)), Some(135));
        assert_eq!(angle_between(origin, Coord::new(-10, 0)), Some(180));
        assert_eq!(angle_between(origin, Coord::new(-10, -10)), Some(225));
        assert_eq!(angle_between(origin, Coord::new(0, -10)), Some(270));
        assert_eq!(angle_between(origin, Coord::new(10, -10)), Some(315));
        assert_eq!(angle_between(origin, origin), None);
    }

    #[test]
    fn test_angle_between_far_points() {
        let from = Coord::new(-2_000_000_000, 0);
        let to = Coord::new(2_000_000_000, 2_000_000_000);
        let angle = angle_between(from, to).unwrap();
        assert!((26..=27).contains(&angle), "angle was {}", angle);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn angles_stay_normalized(a in any::<i32>(), d in -100_000..100_000i32) {
                let r = add_angle(a, d);
                prop_assert!((0..360).contains(&r));
                let diff = angle_difference(a, d);
                prop_assert!(diff > -180 && diff <= 180);
            }

            #[test]
            fn angle_between_is_total(
                h1 in any::<i32>(), v1 in any::<i32>(),
                h2 in any::<i32>(), v2 in any::<i32>(),
            ) {
                if let Some(a) = angle_between(Coord::new(h1, v1), Coord::new(h2, v2)) {
                    prop_assert!((0..360).contains(&a));
                }
            }
        }
    }
}
