//! Tile descriptors: deterministic placement of a quadtree tile on the cube and the sphere.

use glam::{DVec2, DVec3};

use crate::{Direction, TileId, TilePath};

/// Project a cube-space point onto the sphere of the given radius centered at the origin.
#[inline]
#[must_use]
pub fn cube_to_sphere(cube_point: DVec3, radius: f64) -> DVec3 {
    cube_point.normalize() * radius
}

/// Everything needed to place a tile and to generate its height field.
///
/// Derived purely from `(direction, path, edge_length)`, so two descriptors
/// for the same tile are always identical.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileDescriptor {
    /// Face the tile lies on.
    pub direction: Direction,
    /// Location of the tile in the face quadtree.
    pub path: TilePath,
    /// Edge length of the whole cube. The inscribed sphere has radius `edge_length / 2`.
    pub edge_length: f64,
    /// Center of the tile on the cube surface.
    pub cube_position: DVec3,
    /// Side length of the tile, `edge_length / 2^depth`.
    pub size: f64,
    /// Tree depth, equal to the path length.
    pub depth: u8,
}

impl TileDescriptor {
    /// Compute the descriptor of the tile at `path` on face `direction`.
    #[must_use]
    pub fn new(direction: Direction, path: TilePath, edge_length: f64) -> Self {
        let depth = path.depth();
        let size = edge_length / f64::from(1_u32 << depth);
        let cube_position = face_plane_to_cube(direction, path.plane_position(edge_length), edge_length);
        Self {
            direction,
            path,
            edge_length,
            cube_position,
            size,
            depth,
        }
    }

    /// Identity of the described tile.
    #[must_use]
    pub fn id(&self) -> TileId {
        TileId::new(self.direction, self.path)
    }

    /// Radius of the undisplaced sphere the cube projects onto.
    #[must_use]
    pub fn sphere_radius(&self) -> f64 {
        self.edge_length * 0.5
    }

    /// Center of the tile projected onto the undisplaced sphere.
    #[must_use]
    pub fn sphere_position(&self) -> DVec3 {
        cube_to_sphere(self.cube_position, self.sphere_radius())
    }

    /// Cube-space point at local tile coordinates `(s, t)`.
    ///
    /// `(0, 0)` is the tile center and `±0.5` its edges. Coordinates outside
    /// that range extrapolate across the face plane.
    #[must_use]
    pub fn local_to_cube(&self, s: f64, t: f64) -> DVec3 {
        let plane = self.path.plane_position(self.edge_length) + DVec2::new(s, t) * self.size;
        face_plane_to_cube(self.direction, plane, self.edge_length)
    }

    /// Returns `false` if the descriptor cannot produce a valid grid.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.edge_length.is_finite()
            && self.edge_length > 0.0
            && self.size.is_finite()
            && self.size > 0.0
            && self.cube_position.is_finite()
    }
}

fn face_plane_to_cube(direction: Direction, plane: DVec2, edge_length: f64) -> DVec3 {
    direction.rotation() * DVec3::new(plane.x, plane.y, edge_length * 0.5)
}
