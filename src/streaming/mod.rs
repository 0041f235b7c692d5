//! Chunk streaming: LOD selection, build backends and the viewer-driven streamer

pub mod lod;
pub mod build_queue;
pub mod chunk;
pub mod streamer;

pub use lod::{LevelOfDetail, LodTable, MAX_LOD};
pub use build_queue::{
    AsyncBuildQueue, BuildBackend, BuildKey, BuildKind, BuildRequest, BuildResult, InlineBuildQueue,
};
pub use chunk::{BuildState, ChunkEvent, ChunkState, TerrainChunk};
pub use streamer::{ChunkStreamer, StreamerStats};
