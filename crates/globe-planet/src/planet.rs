use glam::{DQuat, DVec3};
use globe_cubesphere::Direction;
use globe_forge::{Forge, ForgeError, ForgeSettings, PumpReport, SurfaceScene};
use globe_lod::{LodReport, LodSettings, Side};
use globe_terrain::{PlanetParameters, TerrainSettings};
use tracing::info;

use crate::PlanetStats;

/// Result of one [`Planet::update`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanetTick {
    /// Quadtree changes summed over all faces.
    pub lod: LodReport,
    /// What the forge pump did.
    pub forge: PumpReport,
}

/// Six face quadtrees and the forge that builds their tiles.
///
/// The planet is centered at `position` and oriented by `rotation`; the
/// quadtrees work in planet space, where the center is the origin.
pub struct Planet {
    name: String,
    position: DVec3,
    rotation: DQuat,
    forge: Forge,
    sides: Vec<Side>,
}

impl Planet {
    /// Start the forge and create the six root tiles.
    pub fn new(
        name: impl Into<String>,
        params: PlanetParameters,
        lod: LodSettings,
        forge_settings: ForgeSettings,
        scene: &mut dyn SurfaceScene,
    ) -> Result<Self, ForgeError> {
        let name = name.into();
        let edge_length = params.cube_edge_length();
        let mut forge = Forge::new(forge_settings, params)?;
        let sides = Direction::ALL
            .into_iter()
            .map(|direction| Side::new(direction, edge_length, lod.clone(), &mut forge, scene))
            .collect::<Result<Vec<_>, _>>()?;
        info!(
            "Planet '{name}' created: radius {}, {} workers",
            edge_length * 0.5,
            forge.pool_size()
        );
        Ok(Self {
            name,
            position: DVec3::ZERO,
            rotation: DQuat::IDENTITY,
            forge,
            sides,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Radius of the undisplaced sphere.
    pub fn radius(&self) -> f64 {
        self.forge.parameters().radius
    }

    pub fn parameters(&self) -> &PlanetParameters {
        self.forge.parameters()
    }

    pub fn position(&self) -> DVec3 {
        self.position
    }

    pub fn set_position(&mut self, position: DVec3) {
        self.position = position;
    }

    pub fn rotation(&self) -> DQuat {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: DQuat) {
        self.rotation = rotation.normalize();
    }

    /// Convert a world-space point into planet space.
    pub fn to_planet_space(&self, world: DVec3) -> DVec3 {
        self.rotation.inverse() * (world - self.position)
    }

    /// Convert a planet-space point into world space.
    pub fn to_world_space(&self, local: DVec3) -> DVec3 {
        self.rotation * local + self.position
    }

    pub fn sides(&self) -> &[Side] {
        &self.sides
    }

    pub fn side(&self, direction: Direction) -> Option<&Side> {
        self.sides.iter().find(|s| s.direction() == direction)
    }

    pub fn forge(&self) -> &Forge {
        &self.forge
    }

    pub fn forge_mut(&mut self) -> &mut Forge {
        &mut self.forge
    }

    /// One control-loop tick: re-evaluate every face for the observer
    /// (given in world space), then pump the forge once.
    pub fn update(&mut self, observer: DVec3, scene: &mut dyn SurfaceScene) -> Result<PlanetTick, ForgeError> {
        let local = self.to_planet_space(observer);
        let mut tick = PlanetTick::default();
        for side in &mut self.sides {
            let report = side.update(local, &mut self.forge, scene)?;
            tick.lod.refined += report.refined;
            tick.lod.coalesced += report.coalesced;
            tick.lod.culled += report.culled;
        }
        tick.forge = self.forge.pump(scene);
        Ok(tick)
    }

    /// Pump the forge without re-evaluating the quadtrees.
    pub fn pump(&mut self, scene: &mut dyn SurfaceScene) -> PumpReport {
        self.forge.pump(scene)
    }

    /// Replace the terrain and rebuild every face from its root.
    ///
    /// The old tiles stay visible until the new roots are applied.
    pub fn set_terrain(&mut self, terrain: TerrainSettings, scene: &mut dyn SurfaceScene) -> Result<(), ForgeError> {
        let params = PlanetParameters::new(self.radius(), self.parameters().seed, terrain);
        self.forge.reconfigure(params)?;
        info!("Planet '{}' terrain changed, rebuilding", self.name);
        self.reset(scene)
    }

    /// Rebuild every face from a single root tile.
    pub fn reset(&mut self, scene: &mut dyn SurfaceScene) -> Result<(), ForgeError> {
        for side in &mut self.sides {
            side.reset(&mut self.forge, scene)?;
        }
        Ok(())
    }

    /// Release every chunk and stop the workers.
    pub fn dispose(mut self, scene: &mut dyn SurfaceScene) {
        for side in std::mem::take(&mut self.sides) {
            side.dispose(&mut self.forge, scene);
        }
        let remaining: Vec<_> = self.forge.chunks().map(|c| c.id()).collect();
        for id in remaining {
            self.forge.dispose_chunk(id, scene);
        }
        info!("Planet '{}' disposed", self.name);
    }

    /// Returns `true` when the forge has no outstanding work.
    pub fn is_settled(&self) -> bool {
        self.forge.is_drained()
    }

    pub fn stats(&self) -> PlanetStats {
        PlanetStats::collect(&self.sides, &self.forge)
    }
}
