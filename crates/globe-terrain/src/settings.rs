//! Serializable terrain parameters shared by every tile build of a planet.

use serde::{Deserialize, Serialize};

use crate::BuildError;

/// One fractal noise layer.
///
/// Octave `i` samples at `frequency * decay^i` with amplitude
/// `amplitude / decay^i`. The octave sum is clamped from below to `floor`
/// and multiplied by the values of the layers listed in `masks`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NoiseLayerSettings {
    /// Human-readable name, used only in logs.
    pub name: String,
    /// Number of octaves summed.
    pub octaves: u32,
    /// Amplitude of the first octave, in meters for contributing layers.
    pub amplitude: f64,
    /// Frequency of the first octave, in cycles per meter of planet-space distance.
    pub frequency: f64,
    /// Ratio between successive octave frequencies. Must be positive.
    pub decay: f64,
    /// Lower clamp applied to the octave sum.
    pub floor: f64,
    /// Offset added to the sampling point, in noise space.
    pub offset: [f64; 3],
    /// Indices of earlier layers whose values gate this one.
    pub masks: Vec<usize>,
    /// If set, the layer is only evaluated as a mask and not added to the elevation.
    pub mask_only: bool,
}

impl Default for NoiseLayerSettings {
    fn default() -> Self {
        Self {
            name: "layer".to_string(),
            octaves: 5,
            amplitude: 1.0,
            frequency: 1e-5,
            decay: 2.0,
            floor: 0.0,
            offset: [0.0; 3],
            masks: Vec::new(),
            mask_only: false,
        }
    }
}

/// A single crater placed explicitly on the sphere.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CraterSettings {
    /// Crater center direction (normalized on load).
    pub center: [f64; 3],
    /// Radius as a chord length on the unit sphere.
    pub radius: f64,
    /// Rim steepness.
    pub steepness: f64,
    /// Depth of the crater floor in meters.
    pub depth: f64,
}

impl Default for CraterSettings {
    fn default() -> Self {
        Self {
            center: [0.0, 1.0, 0.0],
            radius: 0.05,
            steepness: 2.0,
            depth: 1000.0,
        }
    }
}

/// Parameters for craters scattered deterministically from the planet seed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CraterGeneration {
    /// Number of craters to scatter.
    pub count: usize,
    /// Inclusive `[min, max]` chord radius on the unit sphere.
    pub radius_range: [f64; 2],
    /// Inclusive `[min, max]` rim steepness.
    pub steepness_range: [f64; 2],
    /// Inclusive `[min, max]` depth in meters.
    pub depth_range: [f64; 2],
}

impl Default for CraterGeneration {
    fn default() -> Self {
        Self {
            count: 32,
            radius_range: [0.01, 0.08],
            steepness_range: [1.0, 3.0],
            depth_range: [500.0, 3000.0],
        }
    }
}

/// A collection of craters, listed explicitly and/or generated.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CraterLayerSettings {
    /// Explicit craters.
    pub craters: Vec<CraterSettings>,
    /// Seeded scattering, if any.
    pub generated: Option<CraterGeneration>,
}

/// Planet-wide modifiers applied on top of every noise layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NoiseModifiers {
    /// Multiplies the summed noise elevation.
    pub amplitude_modifier: f64,
    /// Multiplies every layer frequency.
    pub frequency_modifier: f64,
    /// Added to every layer offset.
    pub offset_modifier: [f64; 3],
    /// Multiplies every layer floor.
    pub min_value_modifier: f64,
}

impl Default for NoiseModifiers {
    fn default() -> Self {
        Self {
            amplitude_modifier: 1.0,
            frequency_modifier: 1.0,
            offset_modifier: [0.0; 3],
            min_value_modifier: 1.0,
        }
    }
}

/// Planet-wide modifiers applied to every crater.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CraterModifiers {
    /// Multiplies every crater radius.
    pub radius_modifier: f64,
    /// Multiplies every rim steepness.
    pub steepness_modifier: f64,
    /// Multiplies every crater depth.
    pub max_depth_modifier: f64,
    /// Multiplies the summed crater contribution.
    pub scale_factor: f64,
}

impl Default for CraterModifiers {
    fn default() -> Self {
        Self {
            radius_modifier: 1.0,
            steepness_modifier: 1.0,
            max_depth_modifier: 1.0,
            scale_factor: 1.0,
        }
    }
}

/// Complete description of a planet's relief.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TerrainSettings {
    /// Noise layers, evaluated in order.
    pub noise_layers: Vec<NoiseLayerSettings>,
    /// Crater layers, summed after the noise layers.
    pub crater_layers: Vec<CraterLayerSettings>,
    /// Modifiers for all noise layers.
    pub noise_modifiers: NoiseModifiers,
    /// Modifiers for all craters.
    pub crater_modifiers: CraterModifiers,
    /// Global multiplier on the final elevation.
    pub strength: f64,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            noise_layers: vec![
                NoiseLayerSettings {
                    name: "continents".to_string(),
                    octaves: 5,
                    amplitude: 1.0,
                    frequency: 2e-6,
                    decay: 1.8,
                    floor: 0.0,
                    mask_only: true,
                    ..Default::default()
                },
                NoiseLayerSettings {
                    name: "mountains".to_string(),
                    octaves: 6,
                    amplitude: 8000.0,
                    frequency: 1e-5,
                    decay: 2.0,
                    floor: 0.0,
                    masks: vec![0],
                    ..Default::default()
                },
                NoiseLayerSettings {
                    name: "bumps".to_string(),
                    octaves: 5,
                    amplitude: 300.0,
                    frequency: 1e-4,
                    decay: 2.0,
                    floor: -600.0,
                    ..Default::default()
                },
            ],
            crater_layers: vec![CraterLayerSettings {
                craters: Vec::new(),
                generated: Some(CraterGeneration::default()),
            }],
            noise_modifiers: NoiseModifiers::default(),
            crater_modifiers: CraterModifiers::default(),
            strength: 1.0,
        }
    }
}

impl TerrainSettings {
    /// Settings that produce a perfectly smooth sphere.
    #[must_use]
    pub fn flat() -> Self {
        Self {
            noise_layers: Vec::new(),
            crater_layers: Vec::new(),
            ..Default::default()
        }
    }

    /// Check structural consistency of the layer list and that every
    /// numeric parameter is finite.
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.noise_layers.len() > MAX_NOISE_LAYERS {
            return Err(BuildError::InvalidSettings(format!(
                "{} noise layers, at most {MAX_NOISE_LAYERS} are supported",
                self.noise_layers.len()
            )));
        }
        for (i, layer) in self.noise_layers.iter().enumerate() {
            if !(layer.decay.is_finite() && layer.decay > 0.0) {
                return Err(BuildError::InvalidSettings(format!(
                    "noise layer {i} ('{}') has non-positive decay {}",
                    layer.name, layer.decay
                )));
            }
            if let Some(&mask) = layer.masks.iter().find(|&&m| m >= i) {
                return Err(BuildError::InvalidSettings(format!(
                    "noise layer {i} ('{}') is masked by layer {mask}, which is not an earlier layer",
                    layer.name
                )));
            }
            let [ox, oy, oz] = layer.offset;
            check_finite(
                || format!("noise layer {i} ('{}')", layer.name),
                &[layer.amplitude, layer.frequency, layer.floor, ox, oy, oz],
            )?;
        }

        for (i, crater_layer) in self.crater_layers.iter().enumerate() {
            for (j, crater) in crater_layer.craters.iter().enumerate() {
                let [cx, cy, cz] = crater.center;
                check_finite(
                    || format!("crater {j} of crater layer {i}"),
                    &[cx, cy, cz, crater.radius, crater.steepness, crater.depth],
                )?;
            }
            if let Some(generated) = &crater_layer.generated {
                let [r0, r1] = generated.radius_range;
                let [s0, s1] = generated.steepness_range;
                let [d0, d1] = generated.depth_range;
                check_finite(
                    || format!("crater generation of crater layer {i}"),
                    &[r0, r1, s0, s1, d0, d1],
                )?;
            }
        }

        let n = &self.noise_modifiers;
        let [ox, oy, oz] = n.offset_modifier;
        check_finite(
            || "noise modifiers".to_string(),
            &[n.amplitude_modifier, n.frequency_modifier, ox, oy, oz, n.min_value_modifier],
        )?;
        let c = &self.crater_modifiers;
        check_finite(
            || "crater modifiers".to_string(),
            &[c.radius_modifier, c.steepness_modifier, c.max_depth_modifier, c.scale_factor],
        )?;

        if !self.strength.is_finite() {
            return Err(BuildError::InvalidSettings(format!(
                "non-finite strength {}",
                self.strength
            )));
        }
        Ok(())
    }
}

/// Largest number of noise layers a terrain may stack.
pub const MAX_NOISE_LAYERS: usize = 32;

fn check_finite(owner: impl FnOnce() -> String, values: &[f64]) -> Result<(), BuildError> {
    match values.iter().find(|v| !v.is_finite()) {
        Some(v) => Err(BuildError::InvalidSettings(format!("{} has non-finite parameter {v}", owner()))),
        None => Ok(()),
    }
}

/// Immutable per-session parameters every worker builds with.
///
/// Sent once to each worker at startup and again whenever the planet's
/// parameters change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanetParameters {
    /// Radius of the undisplaced sphere in meters.
    pub radius: f64,
    /// Seed for noise permutation tables and crater scattering.
    pub seed: u64,
    /// Relief description.
    pub terrain: TerrainSettings,
}

impl PlanetParameters {
    /// Construct parameters for a planet.
    #[must_use]
    pub fn new(radius: f64, seed: u64, terrain: TerrainSettings) -> Self {
        Self {
            radius,
            seed,
            terrain,
        }
    }

    /// Edge length of the cube whose inscribed sphere is the planet.
    #[must_use]
    pub fn cube_edge_length(&self) -> f64 {
        self.radius * 2.0
    }

    /// Check that the parameters describe a buildable planet.
    pub fn validate(&self) -> Result<(), BuildError> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(BuildError::InvalidSettings(format!(
                "planet radius must be positive and finite, got {}",
                self.radius
            )));
        }
        self.terrain.validate()
    }
}
