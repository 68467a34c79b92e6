//! Built tile geometry.

use glam::DVec3;

/// Triangle mesh of one tile.
///
/// Positions are stored in single precision relative to `origin` (the
/// tile's center on the undisplaced sphere) so they keep sub-millimeter
/// precision even on planet-sized bodies.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TileGeometry {
    /// Planet-space anchor all positions are relative to.
    pub origin: DVec3,
    /// Vertex positions, `origin`-relative.
    pub positions: Vec<[f32; 3]>,
    /// Unit vertex normals.
    pub normals: Vec<[f32; 3]>,
    /// Triangle list, counter-clockwise seen from outside the planet.
    pub indices: Vec<u32>,
}

impl TileGeometry {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Returns `true` if the tile has no triangles.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Planet-space position of vertex `i`.
    pub fn world_position(&self, i: usize) -> Option<DVec3> {
        let p = self.positions.get(i)?;
        Some(self.origin + DVec3::new(f64::from(p[0]), f64::from(p[1]), f64::from(p[2])))
    }

    /// Raw bytes of the position buffer, for GPU upload.
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Raw bytes of the normal buffer.
    pub fn normal_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.normals)
    }

    /// Raw bytes of the index buffer.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}
