//! Chunk mesh dimensions.
//!
//! A chunk's edge length is picked from a fixed table of supported vertex
//! counts. The height map for a chunk carries five extra samples per line:
//! one skirt ring, one mesh-edge ring, and one shared sample on each side
//! so neighbouring chunks meet exactly.

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};

/// Supported per-edge vertex counts for smooth-shaded chunks
pub const SUPPORTED_CHUNK_SIZES: [usize; 9] = [48, 72, 96, 120, 144, 168, 192, 216, 240];

/// Supported per-edge vertex counts for flat-shaded chunks. Flat shading
/// duplicates vertices per triangle; these sizes stay under 65536 vertices.
pub const SUPPORTED_FLAT_SHADED_CHUNK_SIZES: [usize; 3] = [48, 72, 96];

/// Extra samples per line on top of the supported size
const BORDER_SAMPLES: usize = 5;

/// Validated mesh settings.
///
/// The chunk size index is checked on construction (and when deserialized),
/// so every value of this type indexes the supported-size table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MeshSettingsDef", into = "MeshSettingsDef")]
pub struct MeshSettings {
    chunk_size_index: usize,
    flat_shaded_chunk_size_index: usize,
    use_flat_shading: bool,
    mesh_scale: f32,
}

/// Unchecked wire form of [`MeshSettings`]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
struct MeshSettingsDef {
    chunk_size_index: usize,
    flat_shaded_chunk_size_index: usize,
    use_flat_shading: bool,
    mesh_scale: f32,
}

impl Default for MeshSettingsDef {
    fn default() -> Self {
        MeshSettings::default().into()
    }
}

impl TryFrom<MeshSettingsDef> for MeshSettings {
    type Error = Error;

    fn try_from(def: MeshSettingsDef) -> Result<Self> {
        let settings = MeshSettings::new(def.chunk_size_index, def.mesh_scale)?;
        if def.use_flat_shading {
            settings.with_flat_shading(def.flat_shaded_chunk_size_index)
        } else if def.flat_shaded_chunk_size_index >= SUPPORTED_FLAT_SHADED_CHUNK_SIZES.len() {
            Err(unsupported_flat_index(def.flat_shaded_chunk_size_index))
        } else {
            Ok(MeshSettings {
                flat_shaded_chunk_size_index: def.flat_shaded_chunk_size_index,
                ..settings
            })
        }
    }
}

impl From<MeshSettings> for MeshSettingsDef {
    fn from(settings: MeshSettings) -> Self {
        Self {
            chunk_size_index: settings.chunk_size_index,
            flat_shaded_chunk_size_index: settings.flat_shaded_chunk_size_index,
            use_flat_shading: settings.use_flat_shading,
            mesh_scale: settings.mesh_scale,
        }
    }
}

fn unsupported_flat_index(index: usize) -> Error {
    Error::Config(format!(
        "unsupported flat-shaded chunk size index {} (expected 0..{})",
        index,
        SUPPORTED_FLAT_SHADED_CHUNK_SIZES.len()
    ))
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            chunk_size_index: SUPPORTED_CHUNK_SIZES.len() - 1,
            flat_shaded_chunk_size_index: SUPPORTED_FLAT_SHADED_CHUNK_SIZES.len() - 1,
            use_flat_shading: false,
            mesh_scale: 2.5,
        }
    }
}

impl MeshSettings {
    /// Smooth-shaded settings for `SUPPORTED_CHUNK_SIZES[chunk_size_index]`.
    ///
    /// Fails with [`Error::Config`] for an unsupported index or a
    /// non-positive scale.
    pub fn new(chunk_size_index: usize, mesh_scale: f32) -> Result<Self> {
        if chunk_size_index >= SUPPORTED_CHUNK_SIZES.len() {
            return Err(Error::Config(format!(
                "unsupported chunk size index {} (expected 0..{})",
                chunk_size_index,
                SUPPORTED_CHUNK_SIZES.len()
            )));
        }
        if !(mesh_scale.is_finite() && mesh_scale > 0.0) {
            return Err(Error::Config(format!("mesh scale must be positive, got {}", mesh_scale)));
        }
        Ok(Self {
            chunk_size_index,
            mesh_scale,
            ..Default::default()
        })
    }

    /// Switch to flat shading with `SUPPORTED_FLAT_SHADED_CHUNK_SIZES[index]`
    pub fn with_flat_shading(self, flat_shaded_chunk_size_index: usize) -> Result<Self> {
        if flat_shaded_chunk_size_index >= SUPPORTED_FLAT_SHADED_CHUNK_SIZES.len() {
            return Err(unsupported_flat_index(flat_shaded_chunk_size_index));
        }
        Ok(Self {
            flat_shaded_chunk_size_index,
            use_flat_shading: true,
            ..self
        })
    }

    pub fn chunk_size_index(&self) -> usize {
        self.chunk_size_index
    }

    pub fn use_flat_shading(&self) -> bool {
        self.use_flat_shading
    }

    /// World units per grid step
    pub fn mesh_scale(&self) -> f32 {
        self.mesh_scale
    }

    /// Per-edge vertex count selected from the supported table
    pub fn supported_size(&self) -> usize {
        if self.use_flat_shading {
            SUPPORTED_FLAT_SHADED_CHUNK_SIZES[self.flat_shaded_chunk_size_index]
        } else {
            SUPPORTED_CHUNK_SIZES[self.chunk_size_index]
        }
    }

    /// Samples per height-map line, including skirt and seam rows
    pub fn vertices_per_line(&self) -> usize {
        self.supported_size() + BORDER_SAMPLES
    }

    /// World-space edge length of one chunk
    pub fn world_size(&self) -> f32 {
        (self.vertices_per_line() - 3) as f32 * self.mesh_scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = MeshSettings::default();
        assert_eq!(settings.supported_size(), 240);
        assert_eq!(settings.vertices_per_line(), 245);
        assert_eq!(settings.world_size(), 242.0 * 2.5);
    }

    #[test]
    fn test_derived_sizes() {
        for (index, &size) in SUPPORTED_CHUNK_SIZES.iter().enumerate() {
            let settings = MeshSettings::new(index, 1.0).unwrap();
            assert_eq!(settings.vertices_per_line(), size + 5);
            assert_eq!(settings.world_size(), (size + 2) as f32);
        }
    }

    #[test]
    fn test_rejects_unsupported_index() {
        assert!(matches!(MeshSettings::new(9, 1.0), Err(Error::Config(_))));
        assert!(matches!(MeshSettings::new(0, 0.0), Err(Error::Config(_))));
        assert!(matches!(MeshSettings::new(0, f32::NAN), Err(Error::Config(_))));
    }

    #[test]
    fn test_flat_shading_sizes() {
        let settings = MeshSettings::new(8, 1.0).unwrap().with_flat_shading(1).unwrap();
        assert!(settings.use_flat_shading());
        assert_eq!(settings.supported_size(), 72);
        assert!(MeshSettings::default().with_flat_shading(3).is_err());
    }

    #[test]
    fn test_deserialize_checks_index() {
        let ok: MeshSettings = serde_json::from_str(r#"{"chunk_size_index": 0, "mesh_scale": 1.0}"#).unwrap();
        assert_eq!(ok.supported_size(), 48);

        let bad = serde_json::from_str::<MeshSettings>(r#"{"chunk_size_index": 12}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_serde_round_trip_keeps_flat_shading() {
        let settings = MeshSettings::new(2, 2.0).unwrap().with_flat_shading(0).unwrap();
        let json = serde_json::to_string(&settings).unwrap();
        let back: MeshSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }
}
