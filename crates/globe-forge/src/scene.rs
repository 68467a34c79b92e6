//! The rendering collaborator that consumes finished tiles.

use globe_cubesphere::TileDescriptor;
use globe_terrain::TileGeometry;
use rustc_hash::FxHashMap;

use crate::ChunkId;

/// Receiver of chunk geometry, keyed by [`ChunkId`].
///
/// Implementations own the GPU buffers, materials and physics bodies; the
/// forge only tells them when a chunk appears, gets geometry, changes
/// visibility and goes away.
pub trait SurfaceScene {
    /// A chunk was created at the given placement.
    fn attach(&mut self, chunk: ChunkId, descriptor: &TileDescriptor);

    /// Geometry for a chunk is ready. Ownership of the buffers moves to the scene.
    fn upload(&mut self, chunk: ChunkId, geometry: TileGeometry);

    /// Show or hide a chunk that has geometry.
    fn set_visible(&mut self, chunk: ChunkId, visible: bool);

    /// The chunk is gone; release everything associated with it.
    fn detach(&mut self, chunk: ChunkId);
}

/// One chunk as seen by [`MemoryScene`].
#[derive(Debug, Clone, Default)]
pub struct SceneEntry {
    pub geometry: Option<TileGeometry>,
    pub visible: bool,
    pub uploads: usize,
}

/// Scene that keeps everything in memory.
///
/// Used by headless runs and tests to observe what a renderer would see.
#[derive(Debug, Default)]
pub struct MemoryScene {
    entries: FxHashMap<ChunkId, SceneEntry>,
    attaches: usize,
    detaches: usize,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, chunk: ChunkId) -> bool {
        self.entries.contains_key(&chunk)
    }

    pub fn entry(&self, chunk: ChunkId) -> Option<&SceneEntry> {
        self.entries.get(&chunk)
    }

    /// Returns `true` if the chunk has geometry and is visible.
    pub fn is_shown(&self, chunk: ChunkId) -> bool {
        self.entries
            .get(&chunk)
            .is_some_and(|e| e.visible && e.geometry.is_some())
    }

    /// Number of attached chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of chunks currently shown.
    pub fn shown_count(&self) -> usize {
        self.entries
            .values()
            .filter(|e| e.visible && e.geometry.is_some())
            .count()
    }

    /// Total triangles across shown chunks.
    pub fn shown_triangles(&self) -> usize {
        self.entries
            .values()
            .filter(|e| e.visible)
            .filter_map(|e| e.geometry.as_ref())
            .map(TileGeometry::triangle_count)
            .sum()
    }

    pub fn attach_count(&self) -> usize {
        self.attaches
    }

    pub fn detach_count(&self) -> usize {
        self.detaches
    }
}

impl SurfaceScene for MemoryScene {
    fn attach(&mut self, chunk: ChunkId, _descriptor: &TileDescriptor) {
        self.attaches += 1;
        self.entries.insert(chunk, SceneEntry::default());
    }

    fn upload(&mut self, chunk: ChunkId, geometry: TileGeometry) {
        if let Some(entry) = self.entries.get_mut(&chunk) {
            entry.geometry = Some(geometry);
            entry.uploads += 1;
        }
    }

    fn set_visible(&mut self, chunk: ChunkId, visible: bool) {
        if let Some(entry) = self.entries.get_mut(&chunk) {
            entry.visible = visible;
        }
    }

    fn detach(&mut self, chunk: ChunkId) {
        if self.entries.remove(&chunk).is_some() {
            self.detaches += 1;
        }
    }
}
