//! Height-field generation for cube-sphere tiles: layered fBm noise, crater carving,
//! masking, and grid/normal construction.

mod builder;
mod crater;
mod elevation;
mod error;
mod geometry;
mod noise_layer;
mod settings;

pub use builder::{BuildRequest, MAX_SUBDIVISIONS, build_tile, validate_request};
pub use crater::{Crater, crater_profile, generate_craters};
pub use elevation::ElevationModel;
pub use error::BuildError;
pub use geometry::TileGeometry;
pub use noise_layer::NoiseLayer;
pub use settings::{
    CraterGeneration, CraterLayerSettings, CraterModifiers, CraterSettings, MAX_NOISE_LAYERS,
    NoiseLayerSettings, NoiseModifiers, PlanetParameters, TerrainSettings,
};
