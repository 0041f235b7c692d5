//! Height map to LOD mesh conversion.
//!
//! The sample grid is `n = vertices_per_line` on a side and is split into
//! concentric rings:
//!
//! ```text
//! ring 0   out-of-mesh      skirt vertices, normals only
//! ring 1   mesh edge        full resolution at every LOD
//! ring 2   edge connection  heights blended between main vertices
//! inside   main             sampled every `skip_increment` cells
//! ```
//!
//! Because rings 0 and 1 never change with LOD, two neighbouring chunks at
//! different LODs still share identical border vertices.

use super::data::{EdgeConnection, MeshData, TerrainMesh, VertexRef};
use super::settings::MeshSettings;
use crate::core::types::{Vec2, Vec3};
use crate::terrain::HeightMap;

/// Number of mesh LODs; valid values are `0..MAX_LOD`
pub const MAX_LOD: usize = 5;

/// Role of one grid cell for a given LOD
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VertexRole {
    OutOfMesh,
    MeshEdge,
    EdgeConnection,
    Main,
    /// Interior cell between main samples; produces no vertex
    Skipped,
}

/// Interior sampling stride for `lod`
#[inline]
pub fn skip_increment(lod: usize) -> usize {
    if lod == 0 { 1 } else { lod * 2 }
}

/// Classify cell `(x, y)` of an `n`-wide grid
pub fn classify(x: usize, y: usize, n: usize, skip: usize) -> VertexRole {
    if x == 0 || y == 0 || x == n - 1 || y == n - 1 {
        VertexRole::OutOfMesh
    } else if x == 1 || y == 1 || x == n - 2 || y == n - 2 {
        VertexRole::MeshEdge
    } else if (x - 2) % skip == 0 && (y - 2) % skip == 0 {
        VertexRole::Main
    } else if x == 2 || y == 2 || x == n - 3 || y == n - 3 {
        VertexRole::EdgeConnection
    } else {
        VertexRole::Skipped
    }
}

/// Builds [`TerrainMesh`]es from height maps
pub struct MeshBuilder;

impl MeshBuilder {
    /// Build the mesh for one chunk at `lod`.
    ///
    /// # Panics
    /// If the height map is not `vertices_per_line` square or `lod >= MAX_LOD`.
    pub fn build(height_map: &HeightMap, settings: &MeshSettings, lod: usize) -> TerrainMesh {
        let n = settings.vertices_per_line();
        assert!(
            height_map.width() == n && height_map.height() == n,
            "height map is {}x{}, expected {}x{}",
            height_map.width(),
            height_map.height(),
            n,
            n
        );
        assert!(lod < MAX_LOD, "lod {} out of range (max {})", lod, MAX_LOD - 1);

        let skip = skip_increment(lod);
        let index_map = Self::assign_indices(n, skip);
        let at = |x: usize, y: usize| index_map[y * n + x];

        let world_size = settings.world_size();
        let top_left = Vec2::new(-1.0, 1.0) * world_size / 2.0;
        let span = (n - 3) as f32;

        let mut data = MeshData::new(n, skip, settings.use_flat_shading());

        for y in 0..n {
            for x in 0..n {
                let role = classify(x, y, n, skip);
                let Some(vertex) = at(x, y) else {
                    continue;
                };

                let percent = Vec2::new(x as f32 - 1.0, y as f32 - 1.0) / span;
                let position_2d = top_left + Vec2::new(percent.x, -percent.y) * world_size;
                let mut height = height_map.get(x, y);

                if role == VertexRole::EdgeConnection {
                    let vertical = x == 2 || x == n - 3;
                    let dst_to_a = (if vertical { y - 2 } else { x - 2 }) % skip;
                    let dst_to_b = skip - dst_to_a;
                    let t = dst_to_a as f32 / skip as f32;

                    let (ax, ay) = if vertical { (x, y - dst_to_a) } else { (x - dst_to_a, y) };
                    let (bx, by) = if vertical { (x, y + dst_to_b) } else { (x + dst_to_b, y) };

                    height = height_map.get(ax, ay) * (1.0 - t) + height_map.get(bx, by) * t;

                    if let (VertexRef::Main(v), Some(VertexRef::Main(a)), Some(VertexRef::Main(b))) =
                        (vertex, at(ax, ay), at(bx, by))
                    {
                        data.declare_edge_connection(EdgeConnection {
                            vertex: v,
                            main_a: a,
                            main_b: b,
                            t,
                        });
                    }
                }

                data.add_vertex(vertex, Vec3::new(position_2d.x, height, position_2d.y), percent);

                let create_triangle = x < n - 1
                    && y < n - 1
                    && (role != VertexRole::EdgeConnection || (x != 2 && y != 2));
                if !create_triangle {
                    continue;
                }

                let increment = if role == VertexRole::Main && x != n - 3 && y != n - 3 {
                    skip
                } else {
                    1
                };

                // Quad corners: a (x, y), b (x+i, y), c (x, y+i), d (x+i, y+i)
                if let (Some(b), Some(c), Some(d)) =
                    (at(x + increment, y), at(x, y + increment), at(x + increment, y + increment))
                {
                    data.add_triangle(vertex, d, c);
                    data.add_triangle(d, vertex, b);
                }
            }
        }

        data.process(lod)
    }

    /// First pass: give every non-skipped cell its vertex slot.
    ///
    /// Main slots and skirt slots are numbered separately, in row-major order.
    fn assign_indices(n: usize, skip: usize) -> Vec<Option<VertexRef>> {
        let mut map = vec![None; n * n];
        let mut main_index = 0u32;
        let mut skirt_index = 0u32;

        for y in 0..n {
            for x in 0..n {
                map[y * n + x] = match classify(x, y, n, skip) {
                    VertexRole::Skipped => None,
                    VertexRole::OutOfMesh => {
                        skirt_index += 1;
                        Some(VertexRef::Skirt(skirt_index - 1))
                    }
                    _ => {
                        main_index += 1;
                        Some(VertexRef::Main(main_index - 1))
                    }
                };
            }
        }

        map
    }
}
