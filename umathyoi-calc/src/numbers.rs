//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Truncate a f64 toward zero and clamp it to the u32 range.
///
/// Negative and non-finite values collapse to 0, so a gain can never go
/// negative or wrap.
#[must_use]
pub fn floor_f64_to_u32(value: f64) -> u32 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    let max = cast::<u32, f64>(u32::MAX).unwrap_or(f64::MAX);
    cast::<f64, u32>(value.min(max).floor()).unwrap_or(0)
}

/// Convert a count to f64 while allowing precision loss in a single location.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

/// Convert u64 to f64 while allowing precision loss in a single location.
#[must_use]
pub fn u64_to_f64(value: u64) -> f64 {
    cast::<u64, f64>(value).unwrap_or(0.0)
}

/// Clamp a f64 to the f32 range and downcast, returning 0.0 for non-finite values.
#[must_use]
pub fn clamp_f64_to_f32(value: f64) -> f32 {
    if !value.is_finite() {
        return 0.0;
    }
    let min = cast::<f32, f64>(f32::MIN).unwrap_or(f64::MIN);
    let max = cast::<f32, f64>(f32::MAX).unwrap_or(f64::MAX);
    let clamped = value.clamp(min, max);
    cast::<f64, f32>(clamped).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_truncates_instead_of_rounding() {
        assert_eq!(floor_f64_to_u32(12.99), 12);
        assert_eq!(floor_f64_to_u32(12.5), 12);
        assert_eq!(floor_f64_to_u32(0.999), 0);
    }

    #[test]
    fn floor_clamps_negative_and_non_finite() {
        assert_eq!(floor_f64_to_u32(-3.2), 0);
        assert_eq!(floor_f64_to_u32(f64::NAN), 0);
        assert_eq!(floor_f64_to_u32(f64::INFINITY), 0);
        assert_eq!(floor_f64_to_u32(f64::from(u32::MAX) * 4.0), u32::MAX);
    }

    #[test]
    fn clamp_handles_non_finite() {
        assert!((clamp_f64_to_f32(f64::NAN) - 0.0).abs() < f32::EPSILON);
        assert!((clamp_f64_to_f32(f64::from(f32::MAX) * 2.0) - f32::MAX).abs() < f32::EPSILON);
    }

    #[test]
    fn counts_convert_exactly_for_small_values() {
        assert!((usize_to_f64(1000) - 1000.0).abs() < f64::EPSILON);
        assert!((u64_to_f64(42) - 42.0).abs() < f64::EPSILON);
    }
}
