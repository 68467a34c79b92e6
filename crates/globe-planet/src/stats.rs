use std::fmt;

use globe_forge::{ChunkState, Forge};
use globe_lod::Side;

/// Snapshot of a planet's LOD and scheduling state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanetStats {
    /// Leaves across all faces.
    pub leaves: usize,
    /// Deepest leaf.
    pub max_depth: u8,
    /// Live chunks, including those waiting for disposal.
    pub chunks: usize,
    pub ready_chunks: usize,
    pub building_chunks: usize,
    pub failed_chunks: usize,
    /// Builds and deletions not yet dispatched.
    pub queued_tasks: usize,
    pub busy_workers: usize,
    pub workers: usize,
    pub pending_applies: usize,
    pub trash: usize,
}

impl PlanetStats {
    pub(crate) fn collect(sides: &[Side], forge: &Forge) -> Self {
        let mut stats = PlanetStats {
            leaves: sides.iter().map(Side::leaf_count).sum(),
            max_depth: sides.iter().map(|s| s.root().height()).max().unwrap_or(0),
            chunks: forge.chunk_count(),
            queued_tasks: forge.pending_len(),
            busy_workers: forge.busy_count(),
            workers: forge.pool_size(),
            pending_applies: forge.apply_len(),
            trash: forge.trash_len(),
            ..Default::default()
        };
        for chunk in forge.chunks() {
            match chunk.state() {
                ChunkState::Ready => stats.ready_chunks += 1,
                ChunkState::Building => stats.building_chunks += 1,
                ChunkState::Unbuilt => {}
            }
            if chunk.build_failed() {
                stats.failed_chunks += 1;
            }
        }
        stats
    }
}

impl fmt::Display for PlanetStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "leaves={} depth={} chunks={} ready={} building={} failed={} queued={} workers={}/{} applies={} trash={}",
            self.leaves,
            self.max_depth,
            self.chunks,
            self.ready_chunks,
            self.building_chunks,
            self.failed_chunks,
            self.queued_tasks,
            self.busy_workers,
            self.workers,
            self.pending_applies,
            self.trash
        )
    }
}
