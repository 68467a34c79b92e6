//! Fixed-size pool of height-field build workers.
//!
//! Every worker runs on its own OS thread with a private request channel, so
//! the forge decides exactly which slot a build goes to and can track each
//! slot as idle or busy. All workers report on one shared completion channel,
//! drained without blocking. Geometry buffers are moved across the channel,
//! never shared.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use globe_terrain::{BuildError, BuildRequest, ElevationModel, PlanetParameters, TileGeometry, build_tile};
use tracing::{debug, warn};

use crate::{ChunkId, DeleteTask, ForgeError};

/// Builder entry point run on the worker threads.
pub(crate) type BuildFn = fn(&BuildRequest, &ElevationModel) -> Result<TileGeometry, BuildError>;

/// Bookkeeping for a build a worker is currently running.
#[derive(Debug)]
pub(crate) struct InFlight {
    pub chunk: ChunkId,
    pub deletions: Vec<DeleteTask>,
}

/// State of one worker as seen by the control loop.
#[derive(Debug)]
pub enum WorkerSlot {
    Idle,
    /// Running the build of the given chunk.
    Busy(ChunkId),
}

enum WorkerMessage {
    /// Replace the planet parameters used by subsequent builds.
    Init(Arc<PlanetParameters>),
    Build { chunk: ChunkId, request: BuildRequest },
}

/// A finished build as received from a worker.
#[derive(Debug)]
pub(crate) struct Completion {
    pub slot: usize,
    pub chunk: ChunkId,
    pub result: Result<TileGeometry, BuildError>,
}

struct Worker {
    sender: Option<Sender<WorkerMessage>>,
    handle: Option<JoinHandle<()>>,
    in_flight: Option<InFlight>,
}

/// Fixed set of worker threads.
///
/// The number of slots is set at construction and never changes; every slot
/// is always either idle or busy.
pub struct WorkerPool {
    workers: Vec<Worker>,
    completions: Receiver<Completion>,
}

impl WorkerPool {
    /// Spawn `size` workers and send each the initial parameters.
    pub fn new(size: usize, params: Arc<PlanetParameters>) -> Result<Self, ForgeError> {
        Self::with_builder(size, params, build_tile)
    }

    pub(crate) fn with_builder(
        size: usize,
        params: Arc<PlanetParameters>,
        build: BuildFn,
    ) -> Result<Self, ForgeError> {
        let (completion_tx, completion_rx) = crossbeam_channel::unbounded();
        let mut workers = Vec::with_capacity(size);

        for index in 0..size {
            let (request_tx, request_rx) = crossbeam_channel::unbounded();
            let tx = completion_tx.clone();
            let handle = std::thread::Builder::new()
                .name(format!("globe-forge-{index}"))
                .spawn(move || worker_loop(index, request_rx, tx, build))
                .map_err(|source| ForgeError::WorkerSpawn { index, source })?;

            // The channel is unbounded and the worker is alive, so this cannot fail.
            let _ = request_tx.send(WorkerMessage::Init(Arc::clone(&params)));
            workers.push(Worker {
                sender: Some(request_tx),
                handle: Some(handle),
                in_flight: None,
            });
        }

        debug!("Spawned {size} forge workers");
        Ok(Self {
            workers,
            completions: completion_rx,
        })
    }

    /// Number of slots.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn idle_count(&self) -> usize {
        self.workers.iter().filter(|w| w.in_flight.is_none()).count()
    }

    pub fn busy_count(&self) -> usize {
        self.size() - self.idle_count()
    }

    /// Snapshot of every slot in index order.
    pub fn slots(&self) -> Vec<WorkerSlot> {
        self.workers
            .iter()
            .map(|w| match &w.in_flight {
                Some(job) => WorkerSlot::Busy(job.chunk),
                None => WorkerSlot::Idle,
            })
            .collect()
    }

    pub(crate) fn first_idle(&self) -> Option<usize> {
        self.workers.iter().position(|w| w.in_flight.is_none())
    }

    /// Hand a build to an idle slot.
    ///
    /// Returns the job back if the slot is busy or its worker has exited.
    pub(crate) fn dispatch(
        &mut self,
        slot: usize,
        request: BuildRequest,
        job: InFlight,
    ) -> Result<(), InFlight> {
        let Some(worker) = self.workers.get_mut(slot) else {
            return Err(job);
        };
        if worker.in_flight.is_some() {
            return Err(job);
        }
        let Some(sender) = &worker.sender else {
            return Err(job);
        };
        let message = WorkerMessage::Build {
            chunk: job.chunk,
            request,
        };
        if sender.send(message).is_err() {
            return Err(job);
        }
        worker.in_flight = Some(job);
        Ok(())
    }

    /// Take the next finished build, if any, freeing its slot.
    pub(crate) fn try_complete(&mut self) -> Option<(Completion, InFlight)> {
        while let Ok(completion) = self.completions.try_recv() {
            let Some(worker) = self.workers.get_mut(completion.slot) else {
                continue;
            };
            match worker.in_flight.take() {
                Some(job) if job.chunk == completion.chunk => return Some((completion, job)),
                other => {
                    warn!(
                        "Forge worker {} reported chunk {} it was not running",
                        completion.slot, completion.chunk
                    );
                    worker.in_flight = other;
                }
            }
        }
        None
    }

    /// Send new planet parameters to every worker.
    ///
    /// Builds already queued on a worker finish with the parameters they were
    /// dispatched under.
    pub fn broadcast(&self, params: &Arc<PlanetParameters>) {
        for (index, worker) in self.workers.iter().enumerate() {
            let sent = worker
                .sender
                .as_ref()
                .is_some_and(|s| s.send(WorkerMessage::Init(Arc::clone(params))).is_ok());
            if !sent {
                warn!("Forge worker {index} is gone; parameters not delivered");
            }
        }
    }

    /// Close all request channels and join the workers.
    pub fn shutdown(&mut self) {
        for worker in &mut self.workers {
            worker.sender.take();
        }
        for worker in &mut self.workers {
            if let Some(handle) = worker.handle.take() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(
    index: usize,
    requests: Receiver<WorkerMessage>,
    completions: Sender<Completion>,
    build: BuildFn,
) {
    let mut model: Result<ElevationModel, BuildError> = Err(BuildError::InvalidSettings(
        "worker received a build before its parameters".to_string(),
    ));

    while let Ok(message) = requests.recv() {
        match message {
            WorkerMessage::Init(params) => {
                model = ElevationModel::new(&params);
            }
            WorkerMessage::Build { chunk, request } => {
                let result = match &model {
                    Ok(model) => run_guarded(|| build(&request, model)),
                    Err(e) => Err(e.clone()),
                };
                let completion = Completion {
                    slot: index,
                    chunk,
                    result,
                };
                if completions.send(completion).is_err() {
                    break;
                }
            }
        }
    }
}

fn run_guarded<F>(f: F) -> Result<TileGeometry, BuildError>
where
    F: FnOnce() -> Result<TileGeometry, BuildError>,
{
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(BuildError::Panicked(message))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use globe_cubesphere::{Direction, TileDescriptor, TilePath};
    use globe_terrain::TerrainSettings;
    use std::time::{Duration, Instant};

    fn params() -> Arc<PlanetParameters> {
        Arc::new(PlanetParameters::new(1000.0, 1, TerrainSettings::flat()))
    }

    fn request() -> BuildRequest {
        BuildRequest::new(TileDescriptor::new(Direction::Up, TilePath::ROOT, 2000.0), 4)
    }

    fn job(serial: u64) -> InFlight {
        InFlight {
            chunk: ChunkId::new(globe_cubesphere::TileId::new(Direction::Up, TilePath::ROOT), serial),
            deletions: Vec::new(),
        }
    }

    fn wait_for(pool: &mut WorkerPool) -> (Completion, InFlight) {
        let start = Instant::now();
        loop {
            if let Some(done) = pool.try_complete() {
                return done;
            }
            assert!(start.elapsed().as_secs() < 5, "Timed out waiting for a worker");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_slots_are_conserved() {
        let mut pool = WorkerPool::new(3, params()).unwrap();
        assert_eq!(pool.size(), 3);
        assert_eq!(pool.idle_count(), 3);

        assert!(pool.dispatch(0, request(), job(1)).is_ok());
        assert_eq!(pool.busy_count(), 1);
        assert_eq!(pool.idle_count() + pool.busy_count(), 3);
        assert!(matches!(pool.slots()[0], WorkerSlot::Busy(_)));

        let (completion, returned) = wait_for(&mut pool);
        assert_eq!(completion.chunk, returned.chunk);
        assert!(completion.result.is_ok());
        assert_eq!(pool.idle_count(), 3);
    }

    #[test]
    fn test_busy_slot_rejects_dispatch() {
        let mut pool = WorkerPool::new(1, params()).unwrap();
        assert!(pool.dispatch(0, request(), job(1)).is_ok());
        assert!(pool.dispatch(0, request(), job(2)).is_err());
        assert!(pool.first_idle().is_none());
        assert!(pool.dispatch(5, request(), job(3)).is_err());
        let _ = wait_for(&mut pool);
        assert_eq!(pool.first_idle(), Some(0));
    }

    #[test]
    fn test_panicking_builder_is_reported() {
        fn explode(_: &BuildRequest, _: &ElevationModel) -> Result<TileGeometry, BuildError> {
            panic!("boom");
        }
        let mut pool = WorkerPool::with_builder(1, params(), explode).unwrap();
        assert!(pool.dispatch(0, request(), job(1)).is_ok());
        let (completion, _) = wait_for(&mut pool);
        assert_eq!(completion.result, Err(BuildError::Panicked("boom".to_string())));

        // The worker survives the panic.
        assert!(pool.dispatch(0, request(), job(2)).is_ok());
        let (completion, _) = wait_for(&mut pool);
        assert!(matches!(completion.result, Err(BuildError::Panicked(_))));
    }

    #[test]
    fn test_invalid_parameters_fail_builds() {
        let bad = Arc::new(PlanetParameters::new(-1.0, 1, TerrainSettings::flat()));
        let mut pool = WorkerPool::new(1, bad).unwrap();
        assert!(pool.dispatch(0, request(), job(1)).is_ok());
        let (completion, _) = wait_for(&mut pool);
        assert!(matches!(completion.result, Err(BuildError::InvalidSettings(_))));

        pool.broadcast(&params());
        assert!(pool.dispatch(0, request(), job(2)).is_ok());
        let (completion, _) = wait_for(&mut pool);
        assert!(completion.result.is_ok(), "re-initialised worker should build");
    }

    #[test]
    fn test_shutdown_joins_workers() {
        let mut pool = WorkerPool::new(2, params()).unwrap();
        pool.shutdown();
        assert!(pool.dispatch(0, request(), job(1)).is_err());
    }
}
