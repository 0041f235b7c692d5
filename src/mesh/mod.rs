//! Chunk meshing: settings, LOD-aware builder and output buffers.

pub mod builder;
pub mod data;
pub mod settings;

pub use builder::{MeshBuilder, VertexRole, MAX_LOD, classify, skip_increment};
pub use data::{TerrainMesh, TerrainVertex, VertexRef};
pub use settings::{MeshSettings, SUPPORTED_CHUNK_SIZES, SUPPORTED_FLAT_SHADED_CHUNK_SIZES};
