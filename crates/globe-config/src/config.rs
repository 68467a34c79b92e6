//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use globe_forge::ForgeSettings;
use globe_lod::LodSettings;
use globe_terrain::{PlanetParameters, TerrainSettings};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "config.ron";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Planet identity and placement.
    pub planet: PlanetConfig,
    /// Quadtree refinement.
    pub lod: LodSettings,
    /// Worker pool and scheduling.
    pub forge: ForgeSettings,
    /// Relief description.
    pub terrain: TerrainSettings,
    /// Scripted observer flight used by the demo.
    pub observer: ObserverConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Planet configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlanetConfig {
    pub name: String,
    /// Radius of the undisplaced sphere in meters.
    pub radius_m: f64,
    /// Seed for noise tables and generated craters.
    pub seed: u64,
    /// World-space center.
    pub position: [f64; 3],
}

impl Default for PlanetConfig {
    fn default() -> Self {
        Self {
            name: "Globe".to_string(),
            radius_m: 6_000.0,
            seed: 42,
            position: [0.0; 3],
        }
    }
}

/// Observer flight: a straight descent toward the surface along `direction`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ObserverConfig {
    /// Altitude above the undisplaced surface at the first tick.
    pub start_altitude_m: f64,
    /// Altitude the descent stops at.
    pub end_altitude_m: f64,
    /// Planet-space direction of the flight path, need not be normalized.
    pub direction: [f64; 3],
    /// Number of control-loop ticks.
    pub ticks: u32,
    /// Sleep between ticks in milliseconds (0 = run as fast as possible).
    pub tick_interval_ms: u64,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            start_altitude_m: 30_000.0,
            end_altitude_m: 50.0,
            direction: [0.3, 1.0, 0.2],
            ticks: 600,
            tick_interval_ms: 16,
        }
    }
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Log planet statistics every this many ticks (0 = never).
    pub stats_every: u32,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            stats_every: 60,
        }
    }
}

/// Default config location: `<platform config dir>/globe`.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("globe"))
}

impl Config {
    /// Immutable parameters the forge workers build with.
    pub fn planet_parameters(&self) -> PlanetParameters {
        PlanetParameters::new(self.planet.radius_m, self.planet.seed, self.terrain.clone())
    }

    // --- Load / Save / Reload ---

    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let config = Self::read(&config_path)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(4)
            .separate_tuple_members(true)
            .enumerate_arrays(false);
        let serialized = ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(config_dir.join(CONFIG_FILE), serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let new_config = Self::read(&config_dir.join(CONFIG_FILE))?;
        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        ron::from_str(&contents).map_err(ConfigError::ParseError)
    }
}
