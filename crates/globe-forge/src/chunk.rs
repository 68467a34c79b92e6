//! Chunk entity: one quadtree tile and its scene attachment.

use std::fmt;

use globe_cubesphere::{TileDescriptor, TileId};

use crate::SurfaceScene;

/// Stable handle of a chunk.
///
/// Combines the tile identity with a serial number unique for the lifetime
/// of a [`crate::Forge`], so a tile that is coalesced and later refined
/// again gets a fresh id and the renderer never confuses the two.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId {
    tile: TileId,
    serial: u64,
}

impl ChunkId {
    pub(crate) fn new(tile: TileId, serial: u64) -> Self {
        Self { tile, serial }
    }

    /// Face and path of the tile.
    pub fn tile(self) -> TileId {
        self.tile
    }

    /// Creation serial.
    pub fn serial(self) -> u64 {
        self.serial
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tile, self.serial)
    }
}

/// Geometry state of a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkState {
    /// Created, no build requested yet.
    Unbuilt,
    /// A build was accepted by the forge.
    Building,
    /// Geometry has been uploaded to the scene.
    Ready,
}

/// One quadtree tile.
///
/// Owns exactly one scene attachment, created with the chunk and released
/// by [`dispose`](Self::dispose).
#[derive(Debug)]
pub struct Chunk {
    id: ChunkId,
    descriptor: TileDescriptor,
    state: ChunkState,
    visible: bool,
    held: bool,
    retired: bool,
    build_failed: bool,
    disposed: bool,
}

impl Chunk {
    /// Create a chunk and attach it to the scene.
    ///
    /// Visibility is requested from the start, but the scene shows the chunk
    /// only once its geometry has been applied.
    pub fn new(id: ChunkId, descriptor: TileDescriptor, scene: &mut dyn SurfaceScene) -> Self {
        scene.attach(id, &descriptor);
        Self {
            id,
            descriptor,
            state: ChunkState::Unbuilt,
            visible: true,
            held: false,
            retired: false,
            build_failed: false,
            disposed: false,
        }
    }

    pub fn id(&self) -> ChunkId {
        self.id
    }

    pub fn descriptor(&self) -> &TileDescriptor {
        &self.descriptor
    }

    pub fn state(&self) -> ChunkState {
        self.state
    }

    /// Returns `true` once geometry has been applied.
    pub fn is_ready(&self) -> bool {
        self.state == ChunkState::Ready
    }

    /// Requested visibility. The scene only shows the chunk when it is also ready.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Returns `true` while the scene displays this chunk.
    pub fn is_shown(&self) -> bool {
        self.is_ready() && self.visible && !self.held && !self.retired && !self.disposed
    }

    /// A held chunk replaces tiles that are still on screen. It stays hidden
    /// after its geometry is applied until those tiles are retired.
    pub fn is_held(&self) -> bool {
        self.held
    }

    /// A retired chunk has been replaced and is hidden until disposal.
    pub fn is_retired(&self) -> bool {
        self.retired
    }

    /// Returns `true` if the last build of this chunk failed.
    pub fn build_failed(&self) -> bool {
        self.build_failed
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// A chunk no longer blocks the disposal of the tiles it replaces once it
    /// is ready or its build has failed.
    pub fn is_settled(&self) -> bool {
        self.is_ready() || self.build_failed
    }

    pub(crate) fn mark_building(&mut self) {
        self.state = ChunkState::Building;
        self.build_failed = false;
    }

    pub(crate) fn mark_failed(&mut self) {
        self.build_failed = true;
    }

    pub(crate) fn mark_ready(&mut self, scene: &mut dyn SurfaceScene) {
        self.state = ChunkState::Ready;
        self.build_failed = false;
        self.sync(scene);
    }

    /// Only chunks without geometry can be held; one already on screen stays there.
    pub(crate) fn hold(&mut self) {
        if !self.is_ready() {
            self.held = true;
        }
    }

    pub(crate) fn release(&mut self, scene: &mut dyn SurfaceScene) {
        if self.held {
            self.held = false;
            self.sync(scene);
        }
    }

    pub(crate) fn retire(&mut self, scene: &mut dyn SurfaceScene) {
        if !self.retired {
            self.retired = true;
            self.sync(scene);
        }
    }

    /// Toggle visibility without touching the geometry.
    pub fn set_visible(&mut self, visible: bool, scene: &mut dyn SurfaceScene) {
        if self.visible == visible {
            return;
        }
        self.visible = visible;
        self.sync(scene);
    }

    fn sync(&self, scene: &mut dyn SurfaceScene) {
        if self.is_ready() && !self.disposed {
            scene.set_visible(self.id, self.is_shown());
        }
    }

    /// Release the scene attachment. Calling this more than once has no further effect.
    pub fn dispose(&mut self, scene: &mut dyn SurfaceScene) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        scene.detach(self.id);
    }
}
