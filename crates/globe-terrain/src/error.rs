//! Height-field builder error types.

/// Errors that make a single tile build fail.
///
/// A failed build is discarded; it never affects other tiles.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    /// The tile request cannot produce a valid grid.
    #[error("invalid tile descriptor: {0}")]
    InvalidDescriptor(String),

    /// The terrain parameters are structurally inconsistent.
    #[error("invalid terrain settings: {0}")]
    InvalidSettings(String),

    /// Evaluation produced NaN or infinity.
    #[error("non-finite {what} produced at vertex {vertex}")]
    NonFinite {
        /// Which attribute was non-finite ("position" or "normal").
        what: &'static str,
        /// Index of the offending vertex in the grid.
        vertex: usize,
    },

    /// The builder panicked; the panic was caught at the worker boundary.
    #[error("height field builder panicked: {0}")]
    Panicked(String),
}
