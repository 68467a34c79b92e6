//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Planet LOD demo command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "globe", about = "Cube-sphere planet LOD demo")]
pub struct CliArgs {
    /// Planet seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Planet radius in meters.
    #[arg(long)]
    pub radius: Option<f64>,

    /// Worker threads (0 = number of cores minus two).
    #[arg(long)]
    pub workers: Option<usize>,

    /// Grid subdivisions per tile side.
    #[arg(long)]
    pub subdivisions: Option<u32>,

    /// Shallowest leaf depth.
    #[arg(long)]
    pub min_depth: Option<u8>,

    /// Deepest leaf depth.
    #[arg(long)]
    pub max_depth: Option<u8>,

    /// Refine a tile when the observer is closer than this many tile sizes.
    #[arg(long)]
    pub render_distance_factor: Option<f64>,

    /// Number of control-loop ticks to run.
    #[arg(long)]
    pub ticks: Option<u32>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(seed) = args.seed {
            self.planet.seed = seed;
        }
        if let Some(radius) = args.radius {
            self.planet.radius_m = radius;
        }
        if let Some(workers) = args.workers {
            self.forge.worker_count = workers;
        }
        if let Some(n) = args.subdivisions {
            self.forge.subdivisions = n;
        }
        if let Some(d) = args.min_depth {
            self.lod.min_depth = d;
        }
        if let Some(d) = args.max_depth {
            self.lod.max_depth = d;
        }
        if let Some(f) = args.render_distance_factor {
            self.lod.render_distance_factor = f;
        }
        if let Some(ticks) = args.ticks {
            self.observer.ticks = ticks;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
