//! Piecewise-linear response curve applied to normalized noise.
//!
//! [`ResponseCurve`] maps a height in [0, 1] to a multiplier. Keys are
//! `(t, value)` pairs kept sorted by `t`; sampling outside the key range
//! clamps to the first or last key.

use serde::{Deserialize, Serialize};

/// Keyframe curve over the normalized height domain
#[derive(Clone, Debug, PartialEq)]
pub struct ResponseCurve {
    keys: Vec<(f32, f32)>,
}

impl Default for ResponseCurve {
    fn default() -> Self {
        Self::linear()
    }
}

impl ResponseCurve {
    /// Create a new curve from unsorted keys. Keys are sorted by `t`.
    pub fn new(mut keys: Vec<(f32, f32)>) -> Self {
        keys.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { keys }
    }

    /// Identity ramp from (0, 0) to (1, 1)
    pub fn linear() -> Self {
        Self::new(vec![(0.0, 0.0), (1.0, 1.0)])
    }

    /// Create a constant curve that always returns the same value.
    pub fn constant(value: f32) -> Self {
        Self {
            keys: vec![(0.0, value)],
        }
    }

    /// Constant 1.0, leaves heights untouched apart from the multiplier
    pub fn flat() -> Self {
        Self::constant(1.0)
    }

    pub fn keys(&self) -> &[(f32, f32)] {
        &self.keys
    }

    /// True when the curve can be evaluated: at least one key, all keys
    /// finite, and a non-zero domain when there is more than one key.
    pub fn is_well_formed(&self) -> bool {
        let Some(first) = self.keys.first() else {
            return false;
        };
        if self.keys.iter().any(|(t, v)| !t.is_finite() || !v.is_finite()) {
            return false;
        }
        let last = self.keys[self.keys.len() - 1];
        self.keys.len() == 1 || last.0 > first.0
    }

    /// Independent copy of this curve for use during one generation call.
    ///
    /// Malformed curves are replaced by [`ResponseCurve::flat`].
    pub fn snapshot(&self) -> ResponseCurve {
        if self.is_well_formed() {
            self.clone()
        } else {
            log::warn!(
                "Response curve with {} keys is malformed, using a flat curve",
                self.keys.len()
            );
            Self::flat()
        }
    }

    /// Sample the curve at `t`, clamping outside the key range.
    pub fn evaluate(&self, t: f32) -> f32 {
        let Some(&(first_t, first_v)) = self.keys.first() else {
            return 1.0;
        };
        if self.keys.len() == 1 || t <= first_t {
            return first_v;
        }

        let (last_t, last_v) = self.keys[self.keys.len() - 1];
        if t >= last_t {
            return last_v;
        }

        // First key strictly after t; bounded to 1..len by the checks above
        let upper = self.keys.partition_point(|k| k.0 <= t);
        let (t_a, v_a) = self.keys[upper - 1];
        let (t_b, v_b) = self.keys[upper];
        let span = t_b - t_a;
        if span < 1e-6 {
            return v_a;
        }
        v_a + (v_b - v_a) * ((t - t_a) / span)
    }
}

impl Serialize for ResponseCurve {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.keys.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ResponseCurve {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let keys = Vec::<(f32, f32)>::deserialize(deserializer)?;
        Ok(Self::new(keys))
    }
}
