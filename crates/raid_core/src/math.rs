//! Numeric helpers shared by the scheduler and the scorer.
//!
//! The engine runs on `f64` throughout. Results must match the reference
//! scorer bit for bit, which rounds half to even, so rounding and clamping
//! are spelled out here instead of relying on `f64::round`.

/// Round to the nearest integer, resolving exact halves to the even neighbour.
///
/// `f64::round` rounds halves away from zero, which would turn a 62.5%
/// destruction into 63 where the reference produces 62.
#[must_use]
pub fn round_half_even(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }

    let floor = value.floor();
    let diff = value - floor;

    if diff > 0.5 {
        floor + 1.0
    } else if diff < 0.5 {
        floor
    } else if floor % 2.0 == 0.0 {
        floor
    } else {
        floor + 1.0
    }
}

/// Round half to even and clamp into `[min, max]`.
///
/// NaN collapses to `min`.
#[must_use]
pub fn round_clamped(value: f64, min: i64, max: i64) -> i64 {
    let rounded = round_half_even(value);
    if rounded.is_nan() || rounded <= min as f64 {
        min
    } else if rounded >= max as f64 {
        max
    } else {
        rounded as i64
    }
}

/// Squared distance between two tile coordinates.
///
/// Widened to `i64`; squaring an `i32` delta would overflow.
#[must_use]
pub fn distance_squared(ax: i32, ay: i32, bx: i32, by: i32) -> i64 {
    let dx = i64::from(ax) - i64::from(bx);
    let dy = i64::from(ay) - i64::from(by);
    dx * dx + dy * dy
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_even_ties() {
        assert_eq!(round_half_even(0.5), 0.0);
        assert_eq!(round_half_even(1.5), 2.0);
        assert_eq!(round_half_even(2.5), 2.0);
        assert_eq!(round_half_even(62.5), 62.0);
        assert_eq!(round_half_even(63.5), 64.0);
        assert_eq!(round_half_even(-2.5), -2.0);
        assert_eq!(round_half_even(-3.5), -4.0);
    }

    #[test]
    fn test_round_half_even_non_ties() {
        assert_eq!(round_half_even(66.666), 67.0);
        assert_eq!(round_half_even(33.333), 33.0);
        assert_eq!(round_half_even(-0.4), -0.0);
        assert_eq!(round_half_even(179.51), 180.0);
    }

    #[test]
    fn test_round_clamped() {
        assert_eq!(round_clamped(150.0, 0, 100), 100);
        assert_eq!(round_clamped(-3.0, 0, 100), 0);
        assert_eq!(round_clamped(f64::NAN, 0, 100), 0);
        assert_eq!(round_clamped(42.5, 0, 100), 42);
    }

    #[test]
    fn test_distance_squared_no_overflow() {
        assert_eq!(distance_squared(0, 0, 3, 4), 25);
        let far = distance_squared(-1_000_000, -1_000_000, 1_000_000, 1_000_000);
        assert_eq!(far, 8_000_000_000_000);
    }
}
