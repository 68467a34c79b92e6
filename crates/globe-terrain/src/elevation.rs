//! Combined elevation function of a planet.

use glam::DVec3;

use crate::crater::{Crater, layer_craters};
use crate::{BuildError, MAX_NOISE_LAYERS, NoiseLayer, PlanetParameters, TerrainSettings};

/// Evaluates the displaced surface of a planet.
///
/// Built once per parameter set (noise permutation tables and generated
/// craters are computed up front) and then queried for every vertex of
/// every tile.
pub struct ElevationModel {
    radius: f64,
    layers: Vec<NoiseLayer>,
    craters: Vec<Crater>,
    terrain: TerrainSettings,
}

impl ElevationModel {
    /// Prepare the model for the given parameters.
    pub fn new(params: &PlanetParameters) -> Result<Self, BuildError> {
        params.validate()?;
        let terrain = params.terrain.clone();
        let layers = terrain
            .noise_layers
            .iter()
            .enumerate()
            .map(|(i, settings)| NoiseLayer::new(settings.clone(), params.seed, i))
            .collect();
        let craters = terrain
            .crater_layers
            .iter()
            .enumerate()
            .flat_map(|(i, layer)| layer_craters(params.seed, i, layer))
            .collect();
        Ok(Self {
            radius: params.radius,
            layers,
            craters,
            terrain,
        })
    }

    /// Radius of the undisplaced sphere.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Number of craters (explicit plus generated).
    pub fn crater_count(&self) -> usize {
        self.craters.len()
    }

    /// Elevation above the undisplaced sphere, in meters, at a unit direction.
    pub fn elevation(&self, unit: DVec3) -> f64 {
        let point = unit * self.radius;
        let modifiers = &self.terrain.noise_modifiers;

        // Validation caps the layer count, so the values fit on the stack.
        let mut values = [0.0; MAX_NOISE_LAYERS];
        let mut noise_total = 0.0;
        for (i, layer) in self.layers.iter().enumerate() {
            let settings = layer.settings();
            let mask: f64 = settings
                .masks
                .iter()
                .filter_map(|&m| values[..i].get(m).copied())
                .product();
            let value = layer.sample(point, modifiers) * mask;
            if !settings.mask_only {
                noise_total += value;
            }
            if let Some(slot) = values.get_mut(i) {
                *slot = value;
            }
        }
        noise_total *= modifiers.amplitude_modifier;

        let crater_modifiers = &self.terrain.crater_modifiers;
        let crater_total: f64 = self
            .craters
            .iter()
            .map(|c| c.evaluate(unit, crater_modifiers))
            .sum::<f64>()
            * crater_modifiers.scale_factor;

        (noise_total + crater_total) * self.terrain.strength
    }

    /// Displaced surface point in planet space for a direction.
    ///
    /// `direction` need not be normalized; a zero vector yields a non-finite point.
    pub fn surface_point(&self, direction: DVec3) -> DVec3 {
        let unit = direction.normalize();
        unit * (self.radius + self.elevation(unit))
    }
}
