//! Terrain configuration: everything the pipeline and streamer read at startup.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::mesh::MeshSettings;
use crate::streaming::lod::{LevelOfDetail, LodTable};
use crate::terrain::{ElevationSettings, TextureSettings};

/// Complete terrain configuration, loaded once.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Noise and height shaping
    pub elevation: ElevationSettings,
    pub mesh: MeshSettings,
    /// Colour layers used by previews
    pub texture: TextureSettings,
    /// Ordered LOD table, ascending by distance
    pub lods: Vec<LevelOfDetail>,
    /// Index into `lods` whose mesh is handed to collision
    pub collider_lod_index: usize,
    /// Square radius of created chunks; derived from the LOD table when unset
    pub view_radius_chunks: Option<i32>,
    /// Distance the viewer may move inside one chunk before chunks update
    pub viewer_move_threshold: f32,
    /// Distance from a chunk at which its collider is handed off
    pub collider_generation_distance: f32,
    /// Concurrent builds for the async queue; unset uses available parallelism
    pub build_workers: Option<usize>,
    /// Re-issue builds outstanding for this many ticks (0 = never)
    pub rebuild_after_ticks: u64,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            elevation: ElevationSettings::default(),
            mesh: MeshSettings::default(),
            texture: TextureSettings::default(),
            lods: LodTable::default().levels().to_vec(),
            collider_lod_index: 0,
            view_radius_chunks: None,
            viewer_move_threshold: 25.0,
            collider_generation_distance: 5.0,
            build_workers: None,
            rebuild_after_ticks: 0,
        }
    }
}

impl TerrainConfig {
    /// Load and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        log::info!("Loaded terrain config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Write as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Validated LOD table built from `lods`
    pub fn lod_table(&self) -> Result<LodTable> {
        LodTable::new(self.lods.clone())
    }

    /// Resolved worker count for the async build queue
    pub fn build_workers(&self) -> usize {
        self.build_workers
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(4, |n| n.get()))
            .max(1)
    }

    /// Reject configurations the streamer cannot run with.
    ///
    /// Noise parameters are not checked here; they are clamped at use.
    pub fn validate(&self) -> Result<()> {
        let lods = self.lod_table()?;

        if self.collider_lod_index >= lods.len() {
            return Err(Error::Config(format!(
                "collider_lod_index {} out of range for {} LOD levels",
                self.collider_lod_index,
                lods.len()
            )));
        }
        if let Some(radius) = self.view_radius_chunks {
            if radius < 0 {
                return Err(Error::Config(format!("view_radius_chunks must not be negative, got {}", radius)));
            }
        }
        if !(self.viewer_move_threshold.is_finite() && self.viewer_move_threshold >= 0.0) {
            return Err(Error::Config(format!(
                "viewer_move_threshold must be a non-negative number, got {}",
                self.viewer_move_threshold
            )));
        }
        if !(self.collider_generation_distance.is_finite() && self.collider_generation_distance >= 0.0) {
            return Err(Error::Config(format!(
                "collider_generation_distance must be a non-negative number, got {}",
                self.collider_generation_distance
            )));
        }
        if !self.elevation.height_multiplier.is_finite() {
            return Err(Error::Config("height_multiplier must be finite".into()));
        }
        Ok(())
    }
}
