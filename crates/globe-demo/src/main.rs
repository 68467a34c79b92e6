//! Headless planet LOD demo.
//!
//! Flies an observer from orbit down to the surface of a planet, driving the
//! quadtrees and the forge once per tick, and logs what the LOD system does.
//! Geometry lands in an in-memory scene instead of a GPU.

mod flight;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use glam::DVec3;
use globe_config::{CliArgs, Config, default_config_dir};
use globe_forge::MemoryScene;
use globe_planet::Planet;
use tracing::{error, info, warn};

use crate::flight::Flight;

/// Ticks between checks of `config.ron` for terrain edits.
const RELOAD_EVERY: u32 = 120;

fn main() {
    let args = CliArgs::parse();

    let config_dir = args
        .config
        .clone()
        .or_else(default_config_dir)
        .unwrap_or_else(|| PathBuf::from("globe-config"));

    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    globe_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    let mut scene = MemoryScene::new();
    let mut planet = match Planet::new(
        config.planet.name.clone(),
        config.planet_parameters(),
        config.lod.clone(),
        config.forge.clone(),
        &mut scene,
    ) {
        Ok(planet) => planet,
        Err(e) => {
            error!("Failed to create planet: {e}");
            std::process::exit(1);
        }
    };
    planet.set_position(DVec3::from_array(config.planet.position));

    let flight = Flight::new(&config.observer, planet.radius());
    let interval = Duration::from_millis(config.observer.tick_interval_ms);
    let started = Instant::now();
    let mut refined = 0;
    let mut coalesced = 0;

    for tick in 0..flight.ticks() {
        let observer = planet.to_world_space(flight.position(tick));
        match planet.update(observer, &mut scene) {
            Ok(report) => {
                refined += report.lod.refined;
                coalesced += report.lod.coalesced;
            }
            Err(e) => {
                error!("Tick {tick} failed: {e}");
                break;
            }
        }

        if config.debug.stats_every > 0 && tick % config.debug.stats_every == 0 {
            info!(
                "tick {tick}: altitude {:.0} m, {} | shown {} tiles, {} triangles",
                flight.altitude(tick),
                planet.stats(),
                scene.shown_count(),
                scene.shown_triangles()
            );
        }

        if tick > 0 && tick % RELOAD_EVERY == 0 {
            reload_terrain(&config_dir, &mut config, &mut planet, &mut scene);
        }

        if !interval.is_zero() {
            std::thread::sleep(interval);
        }
    }

    let settle_deadline = Instant::now() + Duration::from_secs(30);
    while !planet.is_settled() && Instant::now() < settle_deadline {
        planet.pump(&mut scene);
        std::thread::sleep(Duration::from_millis(1));
    }
    if !planet.is_settled() {
        warn!("Forge still busy after the flight: {}", planet.stats());
    }

    info!(
        "Flight finished in {:.2?}: {refined} refinements, {coalesced} coalesces, final {}",
        started.elapsed(),
        planet.stats()
    );
    info!(
        "Scene: {} tiles shown of {}, {} triangles, {} attached, {} detached",
        scene.shown_count(),
        scene.len(),
        scene.shown_triangles(),
        scene.attach_count(),
        scene.detach_count()
    );

    planet.dispose(&mut scene);
}

/// Pick up terrain edits made to `config.ron` while the demo runs.
fn reload_terrain(config_dir: &std::path::Path, config: &mut Config, planet: &mut Planet, scene: &mut MemoryScene) {
    let reloaded = match config.reload(config_dir) {
        Ok(Some(reloaded)) => reloaded,
        Ok(None) => return,
        Err(e) => {
            warn!("Config reload failed: {e}");
            return;
        }
    };
    if reloaded.terrain != config.terrain {
        match planet.set_terrain(reloaded.terrain.clone(), scene) {
            Ok(()) => info!("Terrain reloaded"),
            Err(e) => warn!("Rejected reloaded terrain: {e}"),
        }
    }
    config.terrain = reloaded.terrain;
}
