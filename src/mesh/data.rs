//! Mesh buffers produced by the builder.

use bytemuck::{Pod, Zeroable};

use crate::core::types::{Vec2, Vec3};

/// Reference to a vertex slot assigned during the indexing pass.
///
/// Visible vertices live in the main buffer; the outermost ring lives in
/// a separate skirt buffer that only feeds normal calculation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexRef {
    Main(u32),
    Skirt(u32),
}

/// Vertex on the third ring whose height is blended between two main vertices
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct EdgeConnection {
    pub vertex: u32,
    pub main_a: u32,
    pub main_b: u32,
    /// Fraction of the way from A to B
    pub t: f32,
}

/// Interleaved vertex layout for GPU upload
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Finished chunk geometry handed to the renderer and collision
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainMesh {
    /// LOD the mesh was built at
    pub lod: usize,
    pub vertices: Vec<Vec3>,
    /// Triangle list, three indices per triangle into `vertices`
    pub triangles: Vec<u32>,
    pub uvs: Vec<Vec2>,
    pub normals: Vec<Vec3>,
    /// Border ring used for normals only; never part of `triangles`
    pub skirt_vertices: Vec<Vec3>,
}

impl TerrainMesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }

    /// Interleave positions, normals and uvs into [`TerrainVertex`]es
    pub fn interleaved(&self) -> Vec<TerrainVertex> {
        self.vertices
            .iter()
            .zip(&self.normals)
            .zip(&self.uvs)
            .map(|((p, n), uv)| TerrainVertex {
                position: p.to_array(),
                normal: n.to_array(),
                uv: uv.to_array(),
            })
            .collect()
    }
}

/// Mutable buffers filled by the builder, then baked into a [`TerrainMesh`]
pub(crate) struct MeshData {
    vertices: Vec<Vec3>,
    uvs: Vec<Vec2>,
    triangles: Vec<u32>,
    skirt_vertices: Vec<Vec3>,
    skirt_triangles: Vec<[VertexRef; 3]>,
    edge_connections: Vec<EdgeConnection>,
    use_flat_shading: bool,
}

impl MeshData {
    /// Allocate buffers sized for a `vertices_per_line` grid at `skip_increment`
    pub fn new(vertices_per_line: usize, skip_increment: usize, use_flat_shading: bool) -> Self {
        let n = vertices_per_line;
        let mesh_edge_vertices = (n - 2) * 4 - 4;
        let edge_connection_vertices = (skip_increment - 1) * (n - 5) / skip_increment * 4;
        let main_per_line = (n - 5) / skip_increment + 1;
        let main_vertices = main_per_line * main_per_line;
        let vertex_count = mesh_edge_vertices + edge_connection_vertices + main_vertices;

        let mesh_edge_triangles = 8 * (n - 4);
        let main_triangles = (main_per_line - 1) * (main_per_line - 1) * 2;

        Self {
            vertices: Vec::with_capacity(vertex_count),
            uvs: Vec::with_capacity(vertex_count),
            triangles: Vec::with_capacity((mesh_edge_triangles + main_triangles) * 3),
            skirt_vertices: Vec::with_capacity(n * 4 - 4),
            skirt_triangles: Vec::with_capacity(8 * (n - 2)),
            edge_connections: Vec::with_capacity(edge_connection_vertices),
            use_flat_shading,
        }
    }

    /// Store a vertex in the slot its reference names.
    ///
    /// Slots are written in the order they were assigned, so each index is
    /// written exactly once.
    pub fn add_vertex(&mut self, vertex: VertexRef, position: Vec3, uv: Vec2) {
        match vertex {
            VertexRef::Main(index) => {
                debug_assert_eq!(index as usize, self.vertices.len(), "main vertex written out of order");
                self.vertices.push(position);
                self.uvs.push(uv);
            }
            VertexRef::Skirt(index) => {
                debug_assert_eq!(index as usize, self.skirt_vertices.len(), "skirt vertex written out of order");
                self.skirt_vertices.push(position);
            }
        }
    }

    pub fn add_triangle(&mut self, a: VertexRef, b: VertexRef, c: VertexRef) {
        match (a, b, c) {
            (VertexRef::Main(a), VertexRef::Main(b), VertexRef::Main(c)) => {
                self.triangles.extend_from_slice(&[a, b, c]);
            }
            _ => self.skirt_triangles.push([a, b, c]),
        }
    }

    pub fn declare_edge_connection(&mut self, connection: EdgeConnection) {
        self.edge_connections.push(connection);
    }

    fn position(&self, vertex: VertexRef) -> Vec3 {
        match vertex {
            VertexRef::Main(i) => self.vertices[i as usize],
            VertexRef::Skirt(i) => self.skirt_vertices[i as usize],
        }
    }

    /// Unnormalized face normal of triangle `(a, b, c)`
    fn face_normal(&self, a: VertexRef, b: VertexRef, c: VertexRef) -> Vec3 {
        let pa = self.position(a);
        let ab = self.position(b) - pa;
        let ac = self.position(c) - pa;
        ab.cross(ac)
    }

    /// Per-vertex normals: sum of adjacent face normals, normalized.
    ///
    /// Skirt triangles add to the main vertices they touch, which is what
    /// lets edge normals match the neighbouring chunk.
    fn bake_normals(&self) -> Vec<Vec3> {
        let mut normals = vec![Vec3::ZERO; self.vertices.len()];

        for tri in self.triangles.chunks_exact(3) {
            let refs = [VertexRef::Main(tri[0]), VertexRef::Main(tri[1]), VertexRef::Main(tri[2])];
            let normal = self.face_normal(refs[0], refs[1], refs[2]);
            for &i in tri {
                normals[i as usize] += normal;
            }
        }

        for &[a, b, c] in &self.skirt_triangles {
            let normal = self.face_normal(a, b, c);
            for vertex in [a, b, c] {
                if let VertexRef::Main(i) = vertex {
                    normals[i as usize] += normal;
                }
            }
        }

        for normal in &mut normals {
            *normal = normal.normalize_or_zero();
        }
        normals
    }

    /// Blend edge-connection normals from their two main vertices
    fn blend_edge_connection_normals(&self, normals: &mut [Vec3]) {
        for e in &self.edge_connections {
            let a = normals[e.main_a as usize];
            let b = normals[e.main_b as usize];
            normals[e.vertex as usize] = (a * (1.0 - e.t) + b * e.t).normalize_or_zero();
        }
    }

    /// Finish the mesh: bake normals, or unshare vertices for flat shading
    pub fn process(self, lod: usize) -> TerrainMesh {
        if self.use_flat_shading {
            return self.flat_shaded(lod);
        }

        let mut normals = self.bake_normals();
        self.blend_edge_connection_normals(&mut normals);

        TerrainMesh {
            lod,
            vertices: self.vertices,
            triangles: self.triangles,
            uvs: self.uvs,
            normals,
            skirt_vertices: self.skirt_vertices,
        }
    }

    /// One vertex per triangle corner, each carrying its face normal
    fn flat_shaded(self, lod: usize) -> TerrainMesh {
        let count = self.triangles.len();
        let mut vertices = Vec::with_capacity(count);
        let mut uvs = Vec::with_capacity(count);
        let mut normals = Vec::with_capacity(count);

        for tri in self.triangles.chunks_exact(3) {
            let normal = self
                .face_normal(VertexRef::Main(tri[0]), VertexRef::Main(tri[1]), VertexRef::Main(tri[2]))
                .normalize_or_zero();
            for &i in tri {
                vertices.push(self.vertices[i as usize]);
                uvs.push(self.uvs[i as usize]);
                normals.push(normal);
            }
        }

        TerrainMesh {
            lod,
            vertices,
            triangles: (0..count as u32).collect(),
            uvs,
            normals,
            skirt_vertices: self.skirt_vertices,
        }
    }
}
