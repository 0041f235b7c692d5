//! Deterministic octave-summed value noise over a rectangular grid.
//!
//! Every octave samples the same lattice noise at a seeded random offset,
//! so the seed only ever changes *where* the field is read. Offsets are drawn
//! from a single [`ChaCha8Rng`] before any sampling happens, two values per
//! octave in octave order, which keeps the output bit-identical for a given
//! `(seed, settings, sample_center)`.

use glam::DVec2;
use noise::{NoiseFn, Value};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::core::types::Vec2;
use crate::math::inverse_lerp;

/// Random octave offsets are drawn from `[-OCTAVE_OFFSET_RANGE, OCTAVE_OFFSET_RANGE)`.
const OCTAVE_OFFSET_RANGE: i32 = 100_000;

/// Lattice seed of the base noise. Per-seed variation comes from octave offsets.
const LATTICE_SEED: u32 = 0;

/// Fraction of the estimated amplitude treated as full height in global mode.
const GLOBAL_HEADROOM: f64 = 0.9;

/// How generated values are mapped into the output range
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalizeMode {
    /// Remap this grid's own min/max to [0, 1]. Chunks generated separately
    /// will not line up.
    Local,
    /// Divide by the estimated maximum amplitude. Comparable across chunks.
    #[default]
    Global,
}

/// Parameters of the fractal noise
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseSettings {
    pub normalize_mode: NormalizeMode,
    pub seed: i32,
    pub scale: f32,        // Horizontal scale (larger = smoother)
    pub octaves: i32,      // Number of octaves summed
    pub persistence: f32,  // Amplitude decay per octave
    pub lacunarity: f32,   // Frequency growth per octave
    pub offset: Vec2,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            normalize_mode: NormalizeMode::Global,
            seed: 0,
            scale: 50.0,
            octaves: 6,
            persistence: 0.6,
            lacunarity: 2.0,
            offset: Vec2::ZERO,
        }
    }
}

impl NoiseSettings {
    /// Copy of these settings with every field forced into its valid range.
    ///
    /// Out-of-range values are corrected, never rejected.
    pub fn validated(&self) -> Self {
        Self {
            normalize_mode: self.normalize_mode,
            seed: self.seed,
            scale: if self.scale.is_finite() { self.scale.max(0.01) } else { 0.01 },
            octaves: self.octaves.max(1),
            persistence: if self.persistence.is_finite() { self.persistence.clamp(0.0, 1.0) } else { 0.0 },
            lacunarity: if self.lacunarity.is_finite() { self.lacunarity.max(1.0) } else { 1.0 },
            offset: if self.offset.is_finite() { self.offset } else { Vec2::ZERO },
        }
    }

    /// Sum of `persistence^octave` over all octaves
    pub fn estimated_max_amplitude(&self) -> f64 {
        let settings = self.validated();
        let mut amplitude = 1.0_f64;
        let mut total = 0.0_f64;
        for _ in 0..settings.octaves {
            total += amplitude;
            amplitude *= settings.persistence as f64;
        }
        total
    }
}

/// Row-major grid of noise values, `width` columns by `height` rows
#[derive(Clone, Debug, PartialEq)]
pub struct NoiseMap {
    width: usize,
    height: usize,
    values: Vec<f32>,
}

impl NoiseMap {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Value at column `x`, row `y`
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values[y * self.width + x]
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }

    pub fn into_values(self) -> Vec<f32> {
        self.values
    }
}

/// Fractal value-noise generator
pub struct NoiseField {
    source: Value,
}

impl Default for NoiseField {
    fn default() -> Self {
        Self::new()
    }
}

impl NoiseField {
    pub fn new() -> Self {
        Self {
            source: Value::new(LATTICE_SEED),
        }
    }

    /// Single lattice sample remapped into [0, 1]
    #[inline]
    fn sample_unit(&self, x: f64, y: f64) -> f64 {
        ((self.source.get([x, y]) + 1.0) * 0.5).clamp(0.0, 1.0)
    }

    /// Per-octave sampling offsets for `settings`, centered on `sample_center`.
    ///
    /// X offsets add the configured offset and sample center, Y offsets
    /// subtract them. Grid rows run toward -Z in world space, so the
    /// subtraction is what lines up neighbouring chunks vertically.
    pub fn octave_offsets(settings: &NoiseSettings, sample_center: Vec2) -> Vec<DVec2> {
        let settings = settings.validated();
        let mut rng = ChaCha8Rng::seed_from_u64(settings.seed as i64 as u64);

        (0..settings.octaves)
            .map(|_| {
                let rx = rng.gen_range(-OCTAVE_OFFSET_RANGE..OCTAVE_OFFSET_RANGE) as f64;
                let ry = rng.gen_range(-OCTAVE_OFFSET_RANGE..OCTAVE_OFFSET_RANGE) as f64;
                DVec2::new(
                    rx + settings.offset.x as f64 + sample_center.x as f64,
                    ry - settings.offset.y as f64 - sample_center.y as f64,
                )
            })
            .collect()
    }

    /// Generate a `width` x `height` grid of fractal noise around `sample_center`.
    ///
    /// # Arguments
    /// * `width`, `height` - Grid dimensions in samples
    /// * `settings` - Noise parameters (clamped into range before use)
    /// * `sample_center` - Noise-space position of the grid center
    pub fn generate(
        &self,
        width: usize,
        height: usize,
        settings: &NoiseSettings,
        sample_center: Vec2,
    ) -> NoiseMap {
        let settings = settings.validated();
        let offsets = Self::octave_offsets(&settings, sample_center);
        let max_amplitude = settings.estimated_max_amplitude();

        let scale = settings.scale as f64;
        let persistence = settings.persistence as f64;
        let lacunarity = settings.lacunarity as f64;
        let half_width = width as f64 / 2.0;
        let half_height = height as f64 / 2.0;

        let mut values = vec![0.0_f32; width * height];
        let mut local_min = f32::MAX;
        let mut local_max = f32::MIN;

        for y in 0..height {
            for x in 0..width {
                let mut amplitude = 1.0_f64;
                let mut frequency = 1.0_f64;
                let mut noise_height = 0.0_f64;

                for offset in &offsets {
                    let sample_x = (x as f64 - half_width + offset.x) / scale * frequency;
                    let sample_y = (y as f64 - half_height + offset.y) / scale * frequency;

                    let value = self.sample_unit(sample_x, sample_y) * 2.0 - 1.0;
                    noise_height += value * amplitude;

                    amplitude *= persistence;
                    frequency *= lacunarity;
                }

                let raw = noise_height as f32;
                local_min = local_min.min(raw);
                local_max = local_max.max(raw);

                values[y * width + x] = match settings.normalize_mode {
                    NormalizeMode::Local => raw,
                    NormalizeMode::Global => {
                        let normalized = (noise_height + 1.0) / (max_amplitude / GLOBAL_HEADROOM);
                        normalized.max(0.0) as f32
                    }
                };
            }
        }

        if settings.normalize_mode == NormalizeMode::Local {
            for value in &mut values {
                *value = inverse_lerp(local_min, local_max, *value);
            }
        }

        NoiseMap { width, height, values }
    }
}

/// Generate a noise grid with a fresh [`NoiseField`]
pub fn generate(width: usize, height: usize, settings: &NoiseSettings, sample_center: Vec2) -> NoiseMap {
    NoiseField::new().generate(width, height, settings, sample_center)
}
