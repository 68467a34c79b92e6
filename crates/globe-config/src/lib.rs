//! Configuration for the planet LOD system.
//!
//! Settings persist to disk as RON and can be overridden from the command line.
//! Every section falls back to its defaults when missing, so older files keep
//! loading as new fields are added.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{Config, DebugConfig, ObserverConfig, PlanetConfig, default_config_dir};
pub use error::ConfigError;
