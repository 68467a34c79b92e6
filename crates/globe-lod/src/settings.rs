use globe_cubesphere::TilePath;
use serde::{Deserialize, Serialize};

/// Subdivision policy of a face quadtree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LodSettings {
    /// Every face is refined at least to this depth.
    pub min_depth: u8,
    /// No leaf is ever deeper than this.
    pub max_depth: u8,
    /// A node at depth `d` refines while the observer is closer than
    /// `render_distance_factor * edge_length / 2^d` to its center.
    pub render_distance_factor: f64,
    /// Hide far leaves that lie behind the horizon.
    pub horizon_culling: bool,
    /// Coalescing waits until the observer is this many thresholds away.
    /// `1.0` disables the band.
    pub coalesce_margin: f64,
    /// Only refine leaves whose geometry is applied and visible.
    pub refine_ready_only: bool,
}

impl Default for LodSettings {
    fn default() -> Self {
        Self {
            min_depth: 0,
            max_depth: 10,
            render_distance_factor: 3.0,
            horizon_culling: true,
            coalesce_margin: 1.0,
            refine_ready_only: false,
        }
    }
}

impl LodSettings {
    /// Clamp the settings into a usable range.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.max_depth = self.max_depth.min(TilePath::MAX_DEPTH);
        self.min_depth = self.min_depth.min(self.max_depth);
        if !(self.render_distance_factor.is_finite() && self.render_distance_factor >= 0.0) {
            self.render_distance_factor = Self::default().render_distance_factor;
        }
        if !(self.coalesce_margin.is_finite() && self.coalesce_margin >= 1.0) {
            self.coalesce_margin = 1.0;
        }
        self
    }
}
