//! Mathematical utilities and data structures

pub mod rect;

pub use rect::Rect;

/// Inverse of linear interpolation: where `value` sits between `a` and `b`,
/// clamped to [0, 1]. Returns 0 when `a == b`.
#[inline]
pub fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if a == b {
        return 0.0;
    }
    ((value - a) / (b - a)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverse_lerp() {
        assert_eq!(inverse_lerp(0.0, 10.0, 5.0), 0.5);
        assert_eq!(inverse_lerp(0.0, 10.0, -5.0), 0.0);
        assert_eq!(inverse_lerp(0.0, 10.0, 15.0), 1.0);
        assert_eq!(inverse_lerp(3.0, 3.0, 3.0), 0.0);
    }

    #[test]
    fn test_inverse_lerp_endpoints_exact() {
        let (a, b) = (-0.731_f32, 1.917_f32);
        assert_eq!(inverse_lerp(a, b, a), 0.0);
        assert_eq!(inverse_lerp(a, b, b), 1.0);
    }
}
