//! Cube-sphere tile addressing: face directions, quadtree paths, and tile placement.

mod descriptor;
mod direction;
mod path;

pub use descriptor::{TileDescriptor, cube_to_sphere};
pub use direction::Direction;
pub use path::{Quadrant, TileId, TilePath};
