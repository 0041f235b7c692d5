//! Terrastream - procedural chunked terrain with seam-free LOD meshing and viewer-driven streaming

pub mod core;
pub mod math;
pub mod terrain;
pub mod mesh;
pub mod streaming;
pub mod generation;
