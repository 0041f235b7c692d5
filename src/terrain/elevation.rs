//! Elevation maps: fractal noise shaped by a response curve and scaled to world height.

use serde::{Deserialize, Serialize};

use super::curve::ResponseCurve;
use super::falloff;
use super::noise_field::{NoiseField, NoiseSettings};
use crate::core::types::Vec2;
use crate::core::{Error, Result};

/// Parameters turning noise into elevation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElevationSettings {
    pub noise: NoiseSettings,
    /// Subtract an island falloff map before shaping
    pub use_falloff: bool,
    /// World height of a cell whose shaped noise value is 1.0
    pub height_multiplier: f32,
    pub response_curve: ResponseCurve,
}

impl Default for ElevationSettings {
    fn default() -> Self {
        Self {
            noise: NoiseSettings::default(),
            use_falloff: false,
            height_multiplier: 30.0,
            response_curve: ResponseCurve::new(vec![(0.0, 0.0), (0.3, 0.05), (1.0, 1.0)]),
        }
    }
}

impl ElevationSettings {
    /// Lowest height the curve can produce (curve at 0)
    pub fn min_height(&self) -> f32 {
        self.height_multiplier * self.response_curve.snapshot().evaluate(0.0)
    }

    /// Highest nominal height (curve at 1)
    pub fn max_height(&self) -> f32 {
        self.height_multiplier * self.response_curve.snapshot().evaluate(1.0)
    }
}

/// Immutable grid of elevation values with its observed range
#[derive(Clone, Debug, PartialEq)]
pub struct HeightMap {
    width: usize,
    height: usize,
    values: Vec<f32>,
    min_value: f32,
    max_value: f32,
}

impl HeightMap {
    /// Wrap row-major `values`, computing min/max.
    ///
    /// Fails with [`Error::Config`] if `values.len() != width * height`.
    pub fn from_values(width: usize, height: usize, values: Vec<f32>) -> Result<Self> {
        if values.len() != width * height {
            return Err(Error::Config(format!(
                "height map of {}x{} needs {} values, got {}",
                width,
                height,
                width * height,
                values.len()
            )));
        }
        Ok(Self::from_grid(width, height, values))
    }

    /// Uniform height map, handy for flat test terrain
    pub fn flat(width: usize, height: usize, value: f32) -> Self {
        Self::from_grid(width, height, vec![value; width * height])
    }

    fn from_grid(width: usize, height: usize, values: Vec<f32>) -> Self {
        let min_value = values.iter().copied().fold(f32::MAX, f32::min);
        let max_value = values.iter().copied().fold(f32::MIN, f32::max);
        Self { width, height, values, min_value, max_value }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Height at column `x`, row `y`
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values[y * self.width + x]
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn min_value(&self) -> f32 {
        self.min_value
    }

    pub fn max_value(&self) -> f32 {
        self.max_value
    }
}

/// Builds [`HeightMap`]s from [`ElevationSettings`]
pub struct ElevationMap;

impl ElevationMap {
    /// Generate noise around `sample_center` and shape it into elevation.
    ///
    /// Every cell becomes `value * curve(value) * height_multiplier`. The
    /// curve is snapshotted before any sampling, so edits made to the
    /// settings elsewhere never show up half-applied in the result.
    pub fn build(
        width: usize,
        height: usize,
        settings: &ElevationSettings,
        sample_center: Vec2,
    ) -> HeightMap {
        let curve = settings.response_curve.snapshot();
        let multiplier = settings.height_multiplier;

        let mut noise = NoiseField::new().generate(width, height, &settings.noise, sample_center);

        if settings.use_falloff {
            let falloff = falloff::generate(width, height);
            for (value, f) in noise.values_mut().iter_mut().zip(falloff) {
                *value = (*value - f).clamp(0.0, 1.0);
            }
        }

        let mut values = noise.into_values();
        let mut min_value = f32::MAX;
        let mut max_value = f32::MIN;
        for value in &mut values {
            *value *= curve.evaluate(*value) * multiplier;
            min_value = min_value.min(*value);
            max_value = max_value.max(*value);
        }

        HeightMap { width, height, values, min_value, max_value }
    }
}
