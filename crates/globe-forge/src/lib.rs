//! Asynchronous tile-geometry scheduling: chunks, the scene they attach to,
//! build/delete/apply tasks, and the worker pool that runs the height-field
//! builder off the control loop.

mod chunk;
mod error;
mod forge;
mod pool;
mod scene;
mod task;

pub use chunk::{Chunk, ChunkId, ChunkState};
pub use error::ForgeError;
pub use forge::{Forge, ForgeEvent, ForgeSettings, PumpReport};
pub use pool::{WorkerPool, WorkerSlot};
pub use scene::{MemoryScene, SceneEntry, SurfaceScene};
pub use task::{ApplyTask, BuildTask, DeleteTask, Task};
