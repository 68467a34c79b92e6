//! A planet: six face quadtrees sharing one forge.

mod planet;
mod stats;

pub use planet::{Planet, PlanetTick};
pub use stats::PlanetStats;
