use std::time::{Duration, Instant};

use glam::{DQuat, DVec3};
use globe_cubesphere::{Direction, TilePath};
use globe_forge::{ForgeSettings, MemoryScene};
use globe_lod::LodSettings;
use globe_planet::Planet;
use globe_terrain::{PlanetParameters, TerrainSettings};

const RADIUS: f64 = 1000.0;
const EPSILON: f64 = 1e-9;

fn planet(scene: &mut MemoryScene) -> Planet {
    let forge = ForgeSettings {
        worker_count: 2,
        subdivisions: 4,
        trash_batch: 16,
        record_events: false,
    };
    let lod = LodSettings {
        min_depth: 0,
        max_depth: 3,
        render_distance_factor: 1.0,
        ..Default::default()
    };
    Planet::new(
        "test",
        PlanetParameters::new(RADIUS, 5, TerrainSettings::flat()),
        lod,
        forge,
        scene,
    )
    .unwrap()
}

fn settle(planet: &mut Planet, scene: &mut MemoryScene) {
    let start = Instant::now();
    while !planet.is_settled() {
        planet.pump(scene);
        assert!(start.elapsed().as_secs() < 10, "Timed out waiting for the planet to settle");
        std::thread::sleep(Duration::from_millis(1));
    }
}

fn leaf_paths(planet: &Planet, direction: Direction) -> Vec<TilePath> {
    planet
        .side(direction)
        .unwrap()
        .leaves()
        .into_iter()
        .map(|(path, _)| path)
        .collect()
}

#[test]
fn test_new_planet_has_six_root_tiles() {
    let mut scene = MemoryScene::new();
    let mut planet = planet(&mut scene);
    assert_eq!(planet.sides().len(), 6);
    assert_eq!(scene.len(), 6);

    settle(&mut planet, &mut scene);
    let stats = planet.stats();
    assert_eq!(stats.leaves, 6);
    assert_eq!(stats.ready_chunks, 6);
    assert_eq!(stats.building_chunks, 0);
    assert_eq!(scene.shown_count(), 6);
    for direction in Direction::ALL {
        assert_eq!(leaf_paths(&planet, direction), vec![TilePath::ROOT]);
    }
}

#[test]
fn test_observer_refines_only_the_facing_side() {
    let mut scene = MemoryScene::new();
    let mut planet = planet(&mut scene);
    settle(&mut planet, &mut scene);

    let observer = Direction::Forward.normal() * (RADIUS * 1.5);
    let tick = planet.update(observer, &mut scene).unwrap();
    assert!(tick.lod.refined >= 1);
    settle(&mut planet, &mut scene);

    assert!(planet.side(Direction::Forward).unwrap().leaf_count() > 1);
    assert_eq!(planet.side(Direction::Backward).unwrap().leaf_count(), 1);
}

#[test]
fn test_world_transform_is_applied_to_the_observer() {
    let mut scene = MemoryScene::new();
    let mut planet = planet(&mut scene);
    let offset = DVec3::new(1.0e6, -2.0e5, 3.0e4);
    let rotation = DQuat::from_rotation_z(std::f64::consts::FRAC_PI_2);
    planet.set_position(offset);
    planet.set_rotation(rotation);

    let local = Direction::Up.normal() * (RADIUS * 1.2);
    let world = planet.to_world_space(local);
    assert!(planet.to_planet_space(world).distance(local) < EPSILON * RADIUS);

    planet.update(world, &mut scene).unwrap();
    settle(&mut planet, &mut scene);
    assert!(planet.side(Direction::Up).unwrap().leaf_count() > 1);
    assert_eq!(planet.side(Direction::Down).unwrap().leaf_count(), 1);

    // Without the transform the observer would be far from every face.
    assert!(world.length() > RADIUS * 100.0);
}

#[test]
fn test_flying_away_coalesces_back_to_roots() {
    let mut scene = MemoryScene::new();
    let mut planet = planet(&mut scene);

    let near = Direction::Right.normal() * (RADIUS * 1.05);
    for _ in 0..4 {
        planet.update(near, &mut scene).unwrap();
        settle(&mut planet, &mut scene);
    }
    assert!(planet.stats().leaves > 6);

    let far = Direction::Right.normal() * (RADIUS * 1.0e4);
    let tick = planet.update(far, &mut scene).unwrap();
    assert!(tick.lod.coalesced >= 1);
    settle(&mut planet, &mut scene);

    let stats = planet.stats();
    assert_eq!(stats.leaves, 6);
    assert_eq!(stats.chunks, 6);
    assert_eq!(scene.len(), 6);
}

#[test]
fn test_set_terrain_rebuilds_every_side() {
    let mut scene = MemoryScene::new();
    let mut planet = planet(&mut scene);
    settle(&mut planet, &mut scene);
    let before: Vec<_> = planet.sides().iter().map(|s| s.root().leaf().unwrap()).collect();

    planet.set_terrain(TerrainSettings::default(), &mut scene).unwrap();
    settle(&mut planet, &mut scene);

    let after: Vec<_> = planet.sides().iter().map(|s| s.root().leaf().unwrap()).collect();
    for (old, new) in before.iter().zip(&after) {
        assert_ne!(old, new);
        assert!(!scene.contains(*old));
        assert!(scene.is_shown(*new));
    }
    assert_eq!(planet.parameters().terrain, TerrainSettings::default());
    assert_eq!(planet.stats().chunks, 6);
}

#[test]
fn test_invalid_terrain_is_rejected_and_keeps_state() {
    let mut scene = MemoryScene::new();
    let mut planet = planet(&mut scene);
    settle(&mut planet, &mut scene);

    let mut terrain = TerrainSettings::flat();
    terrain.strength = f64::NAN;
    assert!(planet.set_terrain(terrain, &mut scene).is_err());
    assert_eq!(planet.parameters().terrain, TerrainSettings::flat());
    assert!(planet.is_settled());
}

#[test]
fn test_dispose_releases_all_chunks() {
    let mut scene = MemoryScene::new();
    let mut planet = planet(&mut scene);
    planet
        .update(Direction::Left.normal() * (RADIUS * 1.1), &mut scene)
        .unwrap();

    planet.dispose(&mut scene);
    assert!(scene.is_empty());
    assert_eq!(scene.attach_count(), scene.detach_count());
}
