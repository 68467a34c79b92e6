//! Forge error types.

use globe_terrain::BuildError;

use crate::ChunkId;

/// Errors returned synchronously by [`crate::Forge`] operations.
///
/// Problems discovered later in the pipeline (orphan deletions, stale apply
/// targets, failed builds) are logged and recorded as events instead.
#[derive(Debug, thiserror::Error)]
pub enum ForgeError {
    /// The build could never succeed; it was rejected before reaching a worker.
    #[error("invalid build request for chunk {chunk}: {source}")]
    InvalidDescriptor {
        chunk: ChunkId,
        #[source]
        source: BuildError,
    },

    /// The task names a chunk the forge does not own.
    #[error("unknown chunk {0}")]
    UnknownChunk(ChunkId),

    /// The planet parameters cannot be built with.
    #[error("invalid planet parameters: {0}")]
    InvalidParameters(#[source] BuildError),

    /// The forge settings are out of range.
    #[error("invalid forge settings: {0}")]
    InvalidSettings(String),

    /// A worker thread could not be started.
    #[error("failed to spawn forge worker {index}: {source}")]
    WorkerSpawn {
        index: usize,
        #[source]
        source: std::io::Error,
    },
}
