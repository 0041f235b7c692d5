//! Island falloff map: 0 in the middle of the grid rising to 1 at the border.

/// Steepness of the falloff response
const FALLOFF_A: f32 = 3.0;
/// Shifts where the falloff starts rising
const FALLOFF_B: f32 = 2.2;

/// Generate a `width` x `height` falloff grid, row-major.
pub fn generate(width: usize, height: usize) -> Vec<f32> {
    let mut values = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let fx = to_signed_unit(x, width);
            let fy = to_signed_unit(y, height);
            values.push(evaluate(fx.abs().max(fy.abs())));
        }
    }
    values
}

/// Map a grid index into [-1, 1]
fn to_signed_unit(i: usize, len: usize) -> f32 {
    if len <= 1 {
        return 0.0;
    }
    i as f32 / (len - 1) as f32 * 2.0 - 1.0
}

/// Smooth step from ~0 (v = 0) to 1 (v = 1)
#[inline]
pub fn evaluate(v: f32) -> f32 {
    let a = v.powf(FALLOFF_A);
    let b = (FALLOFF_B - FALLOFF_B * v).powf(FALLOFF_A);
    a / (a + b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_falloff_center_and_border() {
        let map = generate(9, 9);
        assert_eq!(map.len(), 81);
        assert!(map[4 * 9 + 4] < 1e-6);
        assert!((map[0] - 1.0).abs() < 1e-6);
        assert!((map[8 * 9 + 3] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_falloff_monotonic_toward_edge() {
        let map = generate(21, 21);
        let row = &map[10 * 21..11 * 21];
        for x in 10..20 {
            assert!(row[x + 1] >= row[x]);
        }
    }

    #[test]
    fn test_degenerate_sizes() {
        assert!(generate(0, 0).is_empty());
        assert_eq!(generate(1, 1), vec![0.0]);
    }
}
