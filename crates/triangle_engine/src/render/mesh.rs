//! Built-in geometry
//!
//! Vertices carry a 2D clip-space position and an RGB colour. The vertex
//! shader passes the colour through and the rasterizer interpolates it.

use bytemuck::{Pod, Zeroable};

use crate::core::config::MeshKind;

/// Vertex with position and colour
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Clip-space position
    pub position: [f32; 2],
    /// Linear RGB colour
    pub color: [f32; 3],
}

impl Vertex {
    /// Create a vertex
    pub const fn new(position: [f32; 2], color: [f32; 3]) -> Self {
        Self { position, color }
    }
}

const TRIANGLE_VERTICES: [Vertex; 3] = [
    Vertex::new([0.0, -0.5], [1.0, 0.0, 0.0]),
    Vertex::new([0.5, 0.5], [0.0, 1.0, 0.0]),
    Vertex::new([-0.5, 0.5], [0.0, 0.0, 1.0]),
];

const QUAD_VERTICES: [Vertex; 4] = [
    Vertex::new([-0.5, -0.5], [1.0, 0.0, 0.0]),
    Vertex::new([0.5, -0.5], [0.0, 1.0, 0.0]),
    Vertex::new([0.5, 0.5], [0.0, 0.0, 1.0]),
    Vertex::new([-0.5, 0.5], [1.0, 1.0, 1.0]),
];

/// Indexed geometry uploaded once at startup
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    /// Vertex data
    pub vertices: Vec<Vertex>,
    /// Triangle list indices, clockwise front faces
    pub indices: Vec<u16>,
}

impl Mesh {
    /// The classic RGB triangle
    pub fn triangle() -> Self {
        Self {
            vertices: TRIANGLE_VERTICES.to_vec(),
            indices: vec![0, 1, 2],
        }
    }

    /// Two triangles sharing a diagonal
    pub fn quad() -> Self {
        Self {
            vertices: QUAD_VERTICES.to_vec(),
            indices: vec![0, 1, 2, 2, 3, 0],
        }
    }

    /// Built-in mesh for a configuration choice
    pub fn from_kind(kind: MeshKind) -> Self {
        match kind {
            MeshKind::Triangle => Self::triangle(),
            MeshKind::Quad => Self::quad(),
        }
    }

    /// Number of indices to draw
    pub fn index_count(&self) -> u32 {
        u32::try_from(self.indices.len()).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Signed doubled area in Vulkan's y-down clip space; positive means clockwise on screen
    fn winding(mesh: &Mesh, triangle: &[u16]) -> f32 {
        let [a, b, c] = [0, 1, 2].map(|i| mesh.vertices[usize::from(triangle[i])].position);
        (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
    }

    #[test]
    fn test_vertex_layout_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 20);
        let bytes: &[u8] = bytemuck::cast_slice(&TRIANGLE_VERTICES);
        assert_eq!(bytes.len(), 60);
    }

    #[test]
    fn test_builtin_meshes_index_their_vertices() {
        for kind in [MeshKind::Triangle, MeshKind::Quad] {
            let mesh = Mesh::from_kind(kind);
            assert_eq!(mesh.indices.len() % 3, 0);
            assert!(mesh.indices.iter().all(|&i| usize::from(i) < mesh.vertices.len()));
        }
        assert_eq!(Mesh::triangle().index_count(), 3);
        assert_eq!(Mesh::quad().index_count(), 6);
    }

    #[test]
    fn test_builtin_meshes_survive_back_face_culling() {
        for mesh in [Mesh::triangle(), Mesh::quad()] {
            for triangle in mesh.indices.chunks(3) {
                assert!(winding(&mesh, triangle) > 0.0, "{triangle:?} is counter-clockwise");
            }
        }
    }
}
