//! Crater carving: radial elevation profiles placed on the unit sphere.

use glam::DVec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{CraterGeneration, CraterLayerSettings, CraterModifiers, CraterSettings};

/// Profile is zero beyond this multiple of the crater radius.
const RIM_EXTENT: f64 = 1.5;
/// Blend width of the smooth min/max joins.
const SMOOTHNESS: f64 = 0.3;
/// Normalized depth of the flat crater floor.
const FLOOR_HEIGHT: f64 = -0.8;

/// A crater ready for evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Crater {
    /// Unit-length center direction.
    pub center: DVec3,
    /// Chord radius on the unit sphere.
    pub radius: f64,
    /// Rim steepness.
    pub steepness: f64,
    /// Floor depth in meters.
    pub depth: f64,
}

impl Crater {
    /// Build a crater from its settings, normalizing the center.
    ///
    /// Returns `None` for a zero-length center.
    pub fn from_settings(settings: &CraterSettings) -> Option<Self> {
        let center = DVec3::from_array(settings.center).try_normalize()?;
        Some(Self {
            center,
            radius: settings.radius,
            steepness: settings.steepness,
            depth: settings.depth,
        })
    }

    /// Elevation contribution at a unit-sphere point, in meters.
    pub fn evaluate(&self, unit_point: DVec3, modifiers: &CraterModifiers) -> f64 {
        let radius = self.radius * modifiers.radius_modifier;
        if radius <= 0.0 {
            return 0.0;
        }
        let distance = unit_point.distance(self.center);
        if distance >= radius * RIM_EXTENT {
            return 0.0;
        }
        let profile = crater_profile(distance / radius, self.steepness * modifiers.steepness_modifier);
        profile * self.depth * modifiers.max_depth_modifier
    }
}

/// Normalized crater cross-section at `x = distance / radius`.
///
/// A parabolic bowl reaching `-1` at the center (flattened to a floor),
/// joined smoothly to a raised rim that decays to exactly `0` at
/// `x = 1.5`.
pub fn crater_profile(x: f64, steepness: f64) -> f64 {
    if x >= RIM_EXTENT {
        return 0.0;
    }
    let cavity = x * x - 1.0;
    let rim_x = x - RIM_EXTENT;
    let rim = steepness * rim_x * rim_x;
    let shape = smooth_min(cavity, rim, SMOOTHNESS);
    smooth_max(shape, FLOOR_HEIGHT, SMOOTHNESS)
}

fn smooth_min(a: f64, b: f64, k: f64) -> f64 {
    let h = (0.5 + 0.5 * (b - a) / k).clamp(0.0, 1.0);
    b + (a - b) * h - k * h * (1.0 - h)
}

fn smooth_max(a: f64, b: f64, k: f64) -> f64 {
    -smooth_min(-a, -b, k)
}

/// Scatter craters deterministically from a seed.
///
/// The same `(seed, layer_index, generation)` always yields the same craters.
pub fn generate_craters(seed: u64, layer_index: usize, generation: &CraterGeneration) -> Vec<Crater> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed ^ (layer_index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    (0..generation.count)
        .map(|_| Crater {
            center: random_unit_vector(&mut rng),
            radius: sample_range(&mut rng, generation.radius_range),
            steepness: sample_range(&mut rng, generation.steepness_range),
            depth: sample_range(&mut rng, generation.depth_range),
        })
        .collect()
}

/// Collect the explicit and generated craters of one layer.
pub(crate) fn layer_craters(seed: u64, layer_index: usize, layer: &CraterLayerSettings) -> Vec<Crater> {
    let mut craters: Vec<Crater> = layer.craters.iter().filter_map(Crater::from_settings).collect();
    if let Some(generation) = &layer.generated {
        craters.extend(generate_craters(seed, layer_index, generation));
    }
    craters
}

fn sample_range(rng: &mut ChaCha8Rng, [min, max]: [f64; 2]) -> f64 {
    if max > min {
        rng.random_range(min..=max)
    } else {
        min
    }
}

fn random_unit_vector(rng: &mut ChaCha8Rng) -> DVec3 {
    // Rejection sampling inside the unit ball keeps the distribution uniform on the sphere.
    loop {
        let v = DVec3::new(
            rng.random_range(-1.0..=1.0),
            rng.random_range(-1.0..=1.0),
            rng.random_range(-1.0..=1.0),
        );
        let len_sq = v.length_squared();
        if len_sq > 1e-6 && len_sq <= 1.0 {
            return v / len_sq.sqrt();
        }
    }
}
