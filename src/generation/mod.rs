//! Generation pipeline: coordinate + settings + LOD in, height map and mesh out.
//!
//! The pipeline is immutable and shared behind an `Arc`; every method is a
//! pure function of its arguments, so builds can run on any thread.

pub mod config;
pub mod preview;

pub use config::TerrainConfig;
pub use preview::{MeshStats, PreviewMode};

use rayon::prelude::*;

use crate::core::{ChunkCoord, Vec2};
use crate::mesh::{MeshBuilder, MeshSettings, TerrainMesh};
use crate::terrain::{ElevationMap, ElevationSettings, HeightMap};

/// Height map and mesh of one chunk
#[derive(Clone, Debug)]
pub struct GeneratedChunk {
    pub coord: ChunkCoord,
    pub height_map: HeightMap,
    pub mesh: TerrainMesh,
}

/// Elevation and mesh settings snapshot used for every build
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationPipeline {
    elevation: ElevationSettings,
    mesh: MeshSettings,
}

impl GenerationPipeline {
    pub fn new(elevation: ElevationSettings, mesh: MeshSettings) -> Self {
        Self { elevation, mesh }
    }

    pub fn from_config(config: &TerrainConfig) -> Self {
        Self::new(config.elevation.clone(), config.mesh.clone())
    }

    pub fn elevation(&self) -> &ElevationSettings {
        &self.elevation
    }

    pub fn mesh_settings(&self) -> &MeshSettings {
        &self.mesh
    }

    /// World-space edge length of every chunk
    pub fn chunk_world_size(&self) -> f32 {
        self.mesh.world_size()
    }

    /// Centre of chunk `coord` on the XZ plane
    pub fn chunk_world_position(&self, coord: ChunkCoord) -> Vec2 {
        coord.as_vec2() * self.chunk_world_size()
    }

    /// Noise-space centre of chunk `coord`
    pub fn sample_center(&self, coord: ChunkCoord) -> Vec2 {
        self.chunk_world_position(coord) / self.mesh.mesh_scale()
    }

    /// Height map covering chunk `coord`, including skirt and seam rows
    pub fn height_map(&self, coord: ChunkCoord) -> HeightMap {
        let n = self.mesh.vertices_per_line();
        ElevationMap::build(n, n, &self.elevation, self.sample_center(coord))
    }

    /// Mesh of a height map produced by [`GenerationPipeline::height_map`]
    pub fn mesh(&self, height_map: &HeightMap, lod: usize) -> TerrainMesh {
        MeshBuilder::build(height_map, &self.mesh, lod)
    }

    /// Height map and mesh for one chunk
    pub fn generate_chunk(&self, coord: ChunkCoord, lod: usize) -> GeneratedChunk {
        let height_map = self.height_map(coord);
        let mesh = self.mesh(&height_map, lod);
        GeneratedChunk { coord, height_map, mesh }
    }

    /// Generate many chunks in parallel, results in input order.
    pub fn generate_chunks(&self, coords: &[ChunkCoord], lod: usize) -> Vec<GeneratedChunk> {
        let start = std::time::Instant::now();
        let chunks: Vec<GeneratedChunk> = coords
            .par_iter()
            .map(|&coord| self.generate_chunk(coord, lod))
            .collect();

        let elapsed = start.elapsed();
        log::info!(
            "Generated {} chunks at lod {} in {:.2}s ({:.0} chunks/sec)",
            chunks.len(),
            lod,
            elapsed.as_secs_f64(),
            chunks.len() as f64 / elapsed.as_secs_f64().max(1e-9)
        );
        chunks
    }
}
