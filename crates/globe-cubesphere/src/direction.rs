//! The six face orientations of the cube and the rotation each one implies.

use glam::{DMat3, DVec3};

/// One of the six faces of the cube the planet surface is projected from.
///
/// A face-local frame has its plane spanned by local `x` and `y` and its
/// outward normal along local `+z`. [`Direction::rotation`] maps that frame
/// onto the cube.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Direction {
    /// +Y face
    Up = 0,
    /// −Y face
    Down = 1,
    /// −X face
    Left = 2,
    /// +X face
    Right = 3,
    /// +Z face
    Forward = 4,
    /// −Z face
    Backward = 5,
}

impl Direction {
    /// All six directions in face-index order.
    pub const ALL: [Direction; 6] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
        Direction::Forward,
        Direction::Backward,
    ];

    /// Fixed face index used for addressing, in `0..6`.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// The direction with the given face index.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Direction> {
        Self::ALL.get(index).copied()
    }

    /// The opposite face (e.g., `Up` → `Down`).
    #[must_use]
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }

    /// Outward-pointing unit normal of this face.
    #[must_use]
    pub fn normal(self) -> DVec3 {
        match self {
            Direction::Up => DVec3::Y,
            Direction::Down => DVec3::NEG_Y,
            Direction::Left => DVec3::NEG_X,
            Direction::Right => DVec3::X,
            Direction::Forward => DVec3::Z,
            Direction::Backward => DVec3::NEG_Z,
        }
    }

    /// Image of the face-local `x` axis.
    #[must_use]
    pub fn tangent(self) -> DVec3 {
        match self {
            Direction::Up => DVec3::X,
            Direction::Down => DVec3::X,
            Direction::Left => DVec3::Z,
            Direction::Right => DVec3::NEG_Z,
            Direction::Forward => DVec3::X,
            Direction::Backward => DVec3::NEG_X,
        }
    }

    /// Image of the face-local `y` axis.
    #[must_use]
    pub fn bitangent(self) -> DVec3 {
        match self {
            Direction::Up => DVec3::NEG_Z,
            Direction::Down => DVec3::Z,
            Direction::Left => DVec3::Y,
            Direction::Right => DVec3::Y,
            Direction::Forward => DVec3::Y,
            Direction::Backward => DVec3::Y,
        }
    }

    /// Proper rotation taking the face-local frame onto the cube face.
    ///
    /// Columns are `(tangent, bitangent, normal)`. Because
    /// `tangent × bitangent = normal` for every face, the determinant is `+1`
    /// and counter-clockwise winding in the local plane stays
    /// counter-clockwise when seen from outside the cube.
    #[must_use]
    pub fn rotation(self) -> DMat3 {
        DMat3::from_cols(self.tangent(), self.bitangent(), self.normal())
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Forward => "forward",
            Direction::Backward => "backward",
        };
        f.write_str(name)
    }
}
