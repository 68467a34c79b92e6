//! Requests understood by the forge.

use globe_terrain::TileGeometry;

use crate::ChunkId;

/// Removal of a chunk, deferred until its replacement is in place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteTask {
    /// The chunk to dispose.
    pub chunk: ChunkId,
    /// Chunks that take over this chunk's area. The deletion is held in the
    /// trash until each of them is ready, has failed, or no longer exists.
    pub replaced_by: Vec<ChunkId>,
}

impl DeleteTask {
    /// A deletion not gated on any replacement.
    pub fn new(chunk: ChunkId) -> Self {
        Self {
            chunk,
            replaced_by: Vec::new(),
        }
    }

    /// A deletion held back until every chunk in `replacements` has settled.
    pub fn with_replacements(chunk: ChunkId, replacements: Vec<ChunkId>) -> Self {
        Self {
            chunk,
            replaced_by: replacements,
        }
    }
}

/// Geometry generation for a chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildTask {
    pub chunk: ChunkId,
    /// Deletions executed only after this build's geometry has been applied.
    pub deletions: Vec<DeleteTask>,
}

impl BuildTask {
    pub fn new(chunk: ChunkId) -> Self {
        Self {
            chunk,
            deletions: Vec::new(),
        }
    }

    pub fn with_deletions(chunk: ChunkId, deletions: Vec<DeleteTask>) -> Self {
        Self { chunk, deletions }
    }
}

/// Finished geometry waiting to be uploaded.
#[derive(Clone, Debug)]
pub struct ApplyTask {
    pub chunk: ChunkId,
    pub geometry: TileGeometry,
    pub deletions: Vec<DeleteTask>,
}

/// Anything that can be submitted to the forge.
#[derive(Clone, Debug)]
pub enum Task {
    Build(BuildTask),
    Delete(DeleteTask),
    Apply(ApplyTask),
}

impl Task {
    /// The chunk this task targets.
    pub fn chunk(&self) -> ChunkId {
        match self {
            Task::Build(task) => task.chunk,
            Task::Delete(task) => task.chunk,
            Task::Apply(task) => task.chunk,
        }
    }
}

impl From<BuildTask> for Task {
    fn from(task: BuildTask) -> Self {
        Task::Build(task)
    }
}

impl From<DeleteTask> for Task {
    fn from(task: DeleteTask) -> Self {
        Task::Delete(task)
    }
}

impl From<ApplyTask> for Task {
    fn from(task: ApplyTask) -> Self {
        Task::Apply(task)
    }
}
