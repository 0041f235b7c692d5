//! Procedural elevation: fractal noise, response shaping and colour layers

pub mod noise_field;
pub use noise_field::{NoiseField, NoiseMap, NoiseSettings, NormalizeMode};

pub mod curve;
pub use curve::ResponseCurve;

pub mod elevation;
pub use elevation::{ElevationMap, ElevationSettings, HeightMap};

pub mod falloff;

pub mod texture;
pub use texture::{TextureLayer, TextureSettings};
