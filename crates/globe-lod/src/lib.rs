//! Distance-driven quadtree level of detail for one cube face.

mod horizon;
mod node;
mod settings;
mod side;

pub use horizon::{is_beyond_horizon, is_tile_beyond_horizon};
pub use node::QuadNode;
pub use settings::LodSettings;
pub use side::{LodReport, Side};
