//! Multi-octave simplex noise layers.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use glam::DVec3;
use noise::{NoiseFn, Simplex};

use crate::{NoiseLayerSettings, NoiseModifiers};

/// A noise layer ready for evaluation.
///
/// Owns its own permutation table so layers of the same planet are
/// decorrelated even when they share a frequency.
pub struct NoiseLayer {
    noise: Simplex,
    settings: NoiseLayerSettings,
}

impl NoiseLayer {
    /// Create the `index`-th layer of a planet with the given seed.
    pub fn new(settings: NoiseLayerSettings, planet_seed: u64, index: usize) -> Self {
        Self {
            noise: Simplex::new(derive_layer_seed(planet_seed, index)),
            settings,
        }
    }

    /// The settings this layer was built from.
    pub fn settings(&self) -> &NoiseLayerSettings {
        &self.settings
    }

    /// Octave sum at a planet-space point, clamped from below to the layer floor.
    ///
    /// A NaN sum is returned as is so the tile builder can report it.
    /// Masks are not applied here; see [`crate::ElevationModel`].
    pub fn sample(&self, point: DVec3, modifiers: &NoiseModifiers) -> f64 {
        let offset = DVec3::from_array(self.settings.offset)
            + DVec3::from_array(modifiers.offset_modifier);
        let mut frequency = self.settings.frequency * modifiers.frequency_modifier;
        let mut amplitude = self.settings.amplitude;

        let mut total = 0.0;
        for _ in 0..self.settings.octaves {
            let p = point * frequency + offset;
            total += self.noise.get([p.x, p.y, p.z]) * amplitude;
            frequency *= self.settings.decay;
            amplitude /= self.settings.decay;
        }

        if total.is_nan() {
            return total;
        }
        total.max(self.settings.floor * modifiers.min_value_modifier)
    }

    /// Upper bound on the absolute octave sum (geometric series of amplitudes).
    pub fn max_amplitude(&self) -> f64 {
        let mut sum = 0.0;
        let mut amplitude = self.settings.amplitude.abs();
        for _ in 0..self.settings.octaves {
            sum += amplitude;
            amplitude /= self.settings.decay;
        }
        sum
    }
}

fn derive_layer_seed(planet_seed: u64, index: usize) -> u32 {
    let mut hasher = DefaultHasher::new();
    planet_seed.hash(&mut hasher);
    index.hash(&mut hasher);
    hasher.finish() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-12;

    fn layer(settings: NoiseLayerSettings) -> NoiseLayer {
        NoiseLayer::new(settings, 42, 0)
    }

    fn hills() -> NoiseLayerSettings {
        NoiseLayerSettings {
            name: "hills".to_string(),
            octaves: 4,
            amplitude: 100.0,
            frequency: 1e-3,
            decay: 2.0,
            floor: -1e9,
            ..Default::default()
        }
    }

    #[test]
    fn test_same_seed_same_point_is_identical() {
        let a = layer(hills());
        let b = layer(hills());
        let p = DVec3::new(1234.5, -20.25, 999.0);
        let m = NoiseModifiers::default();
        assert_eq!(a.sample(p, &m).to_bits(), b.sample(p, &m).to_bits());
    }

    #[test]
    fn test_layers_at_different_indices_differ() {
        let a = NoiseLayer::new(hills(), 42, 0);
        let b = NoiseLayer::new(hills(), 42, 1);
        let m = NoiseModifiers::default();
        let differs = (0..32).any(|i| {
            let p = DVec3::new(f64::from(i) * 731.0, 17.0, -3.0 * f64::from(i));
            (a.sample(p, &m) - b.sample(p, &m)).abs() > EPSILON
        });
        assert!(differs, "layers with different indices should be decorrelated");
    }

    #[test]
    fn test_sample_within_max_amplitude() {
        let l = layer(hills());
        let max = l.max_amplitude();
        let m = NoiseModifiers::default();
        for i in 0..200 {
            let p = DVec3::new(f64::from(i) * 37.0, f64::from(i) * -11.0, 5.0);
            let v = l.sample(p, &m);
            assert!(v.abs() <= max + EPSILON, "{v} exceeds {max}");
        }
    }

    #[test]
    fn test_max_amplitude_geometric_sum() {
        let l = layer(NoiseLayerSettings {
            octaves: 3,
            amplitude: 8.0,
            decay: 2.0,
            ..hills()
        });
        assert!((l.max_amplitude() - 14.0).abs() < EPSILON);
    }

    #[test]
    fn test_floor_clamps_from_below() {
        let l = layer(NoiseLayerSettings {
            floor: 0.0,
            ..hills()
        });
        let m = NoiseModifiers::default();
        for i in 0..200 {
            let p = DVec3::new(f64::from(i) * 53.0, 3.0, f64::from(i) * 7.0);
            assert!(l.sample(p, &m) >= 0.0);
        }
    }

    #[test]
    fn test_min_value_modifier_scales_floor() {
        let l = layer(NoiseLayerSettings {
            amplitude: 0.0,
            floor: 10.0,
            ..hills()
        });
        let m = NoiseModifiers {
            min_value_modifier: 2.5,
            ..Default::default()
        };
        assert!((l.sample(DVec3::ONE, &m) - 25.0).abs() < EPSILON);
    }

    #[test]
    fn test_zero_octaves_returns_floor_clamped_zero() {
        let l = layer(NoiseLayerSettings {
            octaves: 0,
            ..hills()
        });
        assert_eq!(l.sample(DVec3::ONE, &NoiseModifiers::default()), 0.0);
    }

    #[test]
    fn test_nan_sum_is_not_hidden_by_floor() {
        let l = layer(NoiseLayerSettings {
            amplitude: f64::NAN,
            ..hills()
        });
        assert!(l.sample(DVec3::new(10.0, 20.0, 30.0), &NoiseModifiers::default()).is_nan());
    }
}
