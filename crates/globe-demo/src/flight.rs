//! Scripted observer descent.

use glam::DVec3;
use globe_config::ObserverConfig;

/// A straight descent along a fixed planet-space direction.
///
/// Altitude decays geometrically from start to end, so the LOD keeps
/// changing at a similar rate all the way down.
#[derive(Debug, Clone)]
pub struct Flight {
    axis: DVec3,
    radius: f64,
    start_altitude: f64,
    end_altitude: f64,
    ticks: u32,
}

impl Flight {
    pub fn new(config: &ObserverConfig, radius: f64) -> Self {
        let axis = DVec3::from_array(config.direction).try_normalize().unwrap_or(DVec3::Y);
        let start_altitude = config.start_altitude_m.max(1.0);
        Self {
            axis,
            radius,
            start_altitude,
            end_altitude: config.end_altitude_m.clamp(1.0, start_altitude),
            ticks: config.ticks,
        }
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Altitude above the undisplaced surface at `tick`.
    pub fn altitude(&self, tick: u32) -> f64 {
        if self.ticks <= 1 {
            return self.end_altitude;
        }
        let t = f64::from(tick.min(self.ticks - 1)) / f64::from(self.ticks - 1);
        self.start_altitude * (self.end_altitude / self.start_altitude).powf(t)
    }

    /// Planet-space observer position at `tick`.
    pub fn position(&self, tick: u32) -> DVec3 {
        self.axis * (self.radius + self.altitude(tick))
    }
}
