//! Quadtree paths: the root-to-leaf sequence of quadrant indices that locates a tile on a face.

use glam::DVec2;

use crate::Direction;

/// One of the four children of a quadtree node.
///
/// Quadrants are numbered counter-clockwise starting at the bottom-left one:
///
/// ```text
///   3   2
///     +
///   0   1
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Quadrant {
    /// Local `(-x, -y)` quarter.
    BottomLeft = 0,
    /// Local `(+x, -y)` quarter.
    BottomRight = 1,
    /// Local `(+x, +y)` quarter.
    TopRight = 2,
    /// Local `(-x, +y)` quarter.
    TopLeft = 3,
}

impl Quadrant {
    /// All quadrants in index order.
    pub const ALL: [Quadrant; 4] = [
        Quadrant::BottomLeft,
        Quadrant::BottomRight,
        Quadrant::TopRight,
        Quadrant::TopLeft,
    ];

    /// Index of this quadrant in `0..4`.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// The quadrant with the given index, if it is in `0..4`.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Quadrant> {
        Self::ALL.get(index).copied()
    }

    /// Unit offset from the parent center toward this quadrant's center.
    #[must_use]
    pub fn sign(self) -> DVec2 {
        match self {
            Quadrant::BottomLeft => DVec2::new(-1.0, -1.0),
            Quadrant::BottomRight => DVec2::new(1.0, -1.0),
            Quadrant::TopRight => DVec2::new(1.0, 1.0),
            Quadrant::TopLeft => DVec2::new(-1.0, 1.0),
        }
    }
}

/// Location of a tile inside one face's quadtree.
///
/// Stored as packed 2-bit quadrant indices (level `i` in bits `2i..2i+2`) plus
/// the depth, so paths are `Copy` and two paths are equal iff their quadrant
/// sequences are equal. The empty path is the root.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TilePath {
    bits: u64,
    depth: u8,
}

impl TilePath {
    /// Deepest representable path.
    pub const MAX_DEPTH: u8 = 30;

    /// The root path (depth 0).
    pub const ROOT: TilePath = TilePath { bits: 0, depth: 0 };

    /// Build a path from a root-to-leaf quadrant sequence.
    ///
    /// Returns `None` if the sequence is longer than [`Self::MAX_DEPTH`].
    #[must_use]
    pub fn from_quadrants(quadrants: &[Quadrant]) -> Option<TilePath> {
        quadrants
            .iter()
            .try_fold(TilePath::ROOT, |path, &q| path.child(q))
    }

    /// Build a path from raw quadrant indices.
    ///
    /// Returns `None` for an index outside `0..4` or a sequence that is too long.
    #[must_use]
    pub fn from_indices(indices: &[u8]) -> Option<TilePath> {
        indices.iter().try_fold(TilePath::ROOT, |path, &i| {
            path.child(Quadrant::from_index(usize::from(i))?)
        })
    }

    /// Number of quadrants in the path, i.e. the tree depth of the tile.
    #[must_use]
    pub fn depth(self) -> u8 {
        self.depth
    }

    /// Returns `true` for the empty path.
    #[must_use]
    pub fn is_root(self) -> bool {
        self.depth == 0
    }

    /// Quadrant taken at `level` (0 = the root's child).
    #[must_use]
    pub fn quadrant(self, level: u8) -> Option<Quadrant> {
        if level >= self.depth {
            return None;
        }
        let index = (self.bits >> (2 * u32::from(level))) & 0b11;
        Quadrant::from_index(index as usize)
    }

    /// Iterate the quadrants root-to-leaf.
    pub fn quadrants(self) -> impl Iterator<Item = Quadrant> {
        (0..self.depth).filter_map(move |level| self.quadrant(level))
    }

    /// The path one level deeper into `quadrant`, or `None` at [`Self::MAX_DEPTH`].
    #[must_use]
    pub fn child(self, quadrant: Quadrant) -> Option<TilePath> {
        if self.depth >= Self::MAX_DEPTH {
            return None;
        }
        let shift = 2 * u32::from(self.depth);
        Some(TilePath {
            bits: self.bits | ((quadrant as u64) << shift),
            depth: self.depth + 1,
        })
    }

    /// The four children in quadrant order, or `None` at [`Self::MAX_DEPTH`].
    #[must_use]
    pub fn children(self) -> Option<[TilePath; 4]> {
        if self.depth >= Self::MAX_DEPTH {
            return None;
        }
        Some(Quadrant::ALL.map(|q| {
            let shift = 2 * u32::from(self.depth);
            TilePath {
                bits: self.bits | ((q as u64) << shift),
                depth: self.depth + 1,
            }
        }))
    }

    /// The path one level up, or `None` for the root.
    #[must_use]
    pub fn parent(self) -> Option<TilePath> {
        if self.depth == 0 {
            return None;
        }
        let depth = self.depth - 1;
        Some(TilePath {
            bits: self.bits & Self::mask(depth),
            depth,
        })
    }

    /// Returns `true` if `other` lies in the subtree rooted at `self` (including `self`).
    #[must_use]
    pub fn contains(self, other: TilePath) -> bool {
        self.depth <= other.depth && other.bits & Self::mask(self.depth) == self.bits
    }

    /// Center of the tile in the face plane, with the face spanning
    /// `[-edge_length / 2, edge_length / 2]` on both axes.
    #[must_use]
    pub fn plane_position(self, edge_length: f64) -> DVec2 {
        let mut position = DVec2::ZERO;
        let mut offset = edge_length * 0.25;
        for quadrant in self.quadrants() {
            position += quadrant.sign() * offset;
            offset *= 0.5;
        }
        position
    }

    fn mask(depth: u8) -> u64 {
        (1_u64 << (2 * u32::from(depth))) - 1
    }
}

impl std::fmt::Debug for TilePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TilePath{self}")
    }
}

impl std::fmt::Display for TilePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[")?;
        for (i, q) in self.quadrants().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", q.index())?;
        }
        f.write_str("]")
    }
}

/// Identity of a tile: its face and its path on that face.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId {
    /// Face the tile belongs to.
    pub direction: Direction,
    /// Location of the tile in the face quadtree.
    pub path: TilePath,
}

impl TileId {
    /// Construct a tile identity.
    #[must_use]
    pub fn new(direction: Direction, path: TilePath) -> Self {
        Self { direction, path }
    }
}

impl std::fmt::Display for TileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[D{}][P{}]", self.direction.index(), self.path)
    }
}
