use glam::{Vec2, Vec3};

use crate::layout::MeshView;

/// The fundamental geometry container.
///
/// Positions are shared per vertex; everything that can differ across a seam
/// (normals, UV channels) is stored per corner, three corners per triangle.
#[derive(Debug, Clone, Default)]
pub struct IndexedMesh {
    /// Interleaved positions: [x, y, z, x, y, z, ...]
    pub positions: Vec<f32>,
    /// Vertex index of every corner, three per triangle
    pub indices: Vec<u32>,
    /// Interleaved per-corner normals: [nx, ny, nz, ...] or empty
    pub normals: Vec<f32>,
    /// Per-corner UV channels, each interleaved [u, v, u, v, ...]
    pub uv_channels: Vec<Vec<f32>>,
}

impl IndexedMesh {
    /// Number of vertices (positions / 3).
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Number of corners (one per index).
    pub fn corner_count(&self) -> usize {
        self.indices.len()
    }

    /// Number of triangles (indices / 3).
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Whether normals are present.
    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty()
    }

    /// Whether UV channel `channel` is present.
    pub fn has_uvs(&self, channel: usize) -> bool {
        self.uv_channels
            .get(channel)
            .is_some_and(|uvs| !uvs.is_empty())
    }

    /// Whether the mesh contains no geometry.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.is_empty()
    }

    /// Position of vertex `vertex`.
    pub fn vertex_position(&self, vertex: usize) -> Vec3 {
        Vec3::from_slice(&self.positions[vertex * 3..vertex * 3 + 3])
    }

    /// Fill in flat per-corner face normals when the mesh has none.
    ///
    /// Degenerate triangles get a zero normal.
    pub fn ensure_normals(&mut self) {
        if self.has_normals() {
            return;
        }

        let mut normals = Vec::with_capacity(self.corner_count() * 3);
        for tri in self.indices.chunks_exact(3) {
            let p0 = self.vertex_position(tri[0] as usize);
            let p1 = self.vertex_position(tri[1] as usize);
            let p2 = self.vertex_position(tri[2] as usize);
            let n = (p1 - p0).cross(p2 - p0).normalize_or_zero();
            for _ in 0..3 {
                normals.extend_from_slice(&n.to_array());
            }
        }
        self.normals = normals;
    }
}

impl MeshView for IndexedMesh {
    fn corner_count(&self) -> usize {
        self.indices.len()
    }

    fn position(&self, corner: usize) -> Vec3 {
        self.vertex_position(self.indices[corner] as usize)
    }

    fn normal(&self, corner: usize) -> Vec3 {
        if self.has_normals() {
            Vec3::from_slice(&self.normals[corner * 3..corner * 3 + 3])
        } else {
            Vec3::ZERO
        }
    }

    fn uv_channel_count(&self) -> usize {
        self.uv_channels.len()
    }

    fn uv(&self, channel: usize, corner: usize) -> Vec2 {
        let uvs = &self.uv_channels[channel];
        Vec2::new(uvs[corner * 2], uvs[corner * 2 + 1])
    }

    fn set_uv_channel_count(&mut self, count: usize) {
        let len = self.corner_count() * 2;
        self.uv_channels.resize_with(count, || vec![0.0; len]);
    }

    fn set_uv(&mut self, channel: usize, corner: usize, uv: Vec2) {
        let uvs = &mut self.uv_channels[channel];
        if uvs.len() < self.indices.len() * 2 {
            uvs.resize(self.indices.len() * 2, 0.0);
        }
        uvs[corner * 2] = uv.x;
        uvs[corner * 2 + 1] = uv.y;
    }
}
