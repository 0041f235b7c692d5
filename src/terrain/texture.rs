//! Static height-banded colour layers.
//!
//! Layers are applied bottom to top. Each layer starts at a normalized height
//! and fades in over `blend_strength`, painting over the layers below it.

use serde::{Deserialize, Serialize};

use crate::math::inverse_lerp;

const BLEND_EPSILON: f32 = 1e-4;

/// One colour band
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextureLayer {
    pub name: String,
    /// Linear RGB
    pub colour: [f32; 3],
    /// Normalized height (0-1) where the layer begins
    pub start_height: f32,
    /// Width of the fade-in around `start_height` (0 = hard edge)
    pub blend_strength: f32,
}

impl TextureLayer {
    pub fn new(name: impl Into<String>, colour: [f32; 3], start_height: f32, blend_strength: f32) -> Self {
        Self {
            name: name.into(),
            colour,
            start_height,
            blend_strength,
        }
    }
}

/// Ordered set of colour layers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureSettings {
    pub layers: Vec<TextureLayer>,
}

impl Default for TextureSettings {
    fn default() -> Self {
        Self {
            layers: vec![
                TextureLayer::new("water", [0.0, 0.15, 0.55], 0.0, 0.0),
                TextureLayer::new("sand", [0.76, 0.7, 0.5], 0.3, 0.05),
                TextureLayer::new("grass", [0.15, 0.55, 0.15], 0.4, 0.1),
                TextureLayer::new("rock", [0.5, 0.5, 0.5], 0.6, 0.1),
                TextureLayer::new("snow", [0.95, 0.95, 0.95], 0.8, 0.05),
            ],
        }
    }
}

impl TextureSettings {
    /// Blended colour for a normalized height in [0, 1].
    pub fn colour_at(&self, height_percent: f32) -> [f32; 3] {
        let mut colour = [0.0_f32; 3];
        for layer in &self.layers {
            let half_blend = layer.blend_strength * 0.5;
            let strength = inverse_lerp(
                -half_blend - BLEND_EPSILON,
                half_blend,
                height_percent - layer.start_height,
            );
            for (c, l) in colour.iter_mut().zip(layer.colour) {
                *c = *c * (1.0 - strength) + l * strength;
            }
        }
        colour
    }

    /// Colour for an absolute height, normalized against `[min_height, max_height]`.
    pub fn colour_for_height(&self, height: f32, min_height: f32, max_height: f32) -> [f32; 3] {
        self.colour_at(inverse_lerp(min_height, max_height, height))
    }
}
