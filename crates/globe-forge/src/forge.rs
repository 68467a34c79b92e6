//! The forge: a budgeted, tick-driven scheduler for tile builds, geometry
//! uploads and deferred deletions.

use std::collections::VecDeque;
use std::sync::Arc;

use globe_cubesphere::TileDescriptor;
use globe_terrain::{BuildError, BuildRequest, MAX_SUBDIVISIONS, PlanetParameters, validate_request};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::pool::InFlight;
use crate::{
    ApplyTask, BuildTask, Chunk, ChunkId, DeleteTask, ForgeError, SurfaceScene, Task, WorkerPool,
};

/// Tunables of the forge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ForgeSettings {
    /// Worker threads. `0` picks one per logical CPU minus two, at least one.
    pub worker_count: usize,
    /// Grid cells per tile edge.
    pub subdivisions: u32,
    /// Maximum deletions disposed per pump.
    pub trash_batch: usize,
    /// Keep a log of [`ForgeEvent`]s for inspection.
    pub record_events: bool,
}

impl Default for ForgeSettings {
    fn default() -> Self {
        Self {
            worker_count: 0,
            subdivisions: 32,
            trash_batch: 8,
            record_events: false,
        }
    }
}

impl ForgeSettings {
    /// Number of worker threads actually spawned.
    pub fn resolved_worker_count(&self) -> usize {
        if self.worker_count > 0 {
            self.worker_count
        } else {
            num_cpus::get().saturating_sub(2).max(1)
        }
    }
}

/// Something the forge did, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum ForgeEvent {
    /// A build was handed to a worker slot.
    Dispatched { chunk: ChunkId, slot: usize },
    /// A worker returned geometry.
    Completed { chunk: ChunkId },
    /// A worker returned an error; the build was discarded.
    BuildFailed { chunk: ChunkId, error: BuildError },
    /// Geometry was uploaded to the scene.
    Applied { chunk: ChunkId },
    /// A deletion entered the trash queue.
    Trashed { chunk: ChunkId },
    /// A chunk's scene attachment was released.
    Disposed { chunk: ChunkId },
    /// A deletion reached the head of the queue without a build to pair with.
    OrphanDeletion { chunk: ChunkId },
    /// Geometry arrived for a chunk that no longer exists.
    StaleApplyTarget { chunk: ChunkId },
    /// A queued build was skipped because its chunk was disposed first.
    SkippedBuild { chunk: ChunkId },
}

/// What one [`Forge::pump`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpReport {
    pub dispatched: usize,
    pub completed: usize,
    pub failed: usize,
    pub applied: usize,
    pub disposed: usize,
}

/// Owns the chunks of a planet and schedules their geometry.
///
/// Driven by a single control loop: [`submit`](Self::submit) queues work,
/// [`pump`](Self::pump) advances it by one tick without ever blocking.
pub struct Forge {
    settings: ForgeSettings,
    params: Arc<PlanetParameters>,
    pool: WorkerPool,
    chunks: FxHashMap<ChunkId, Chunk>,
    next_serial: u64,
    pending: VecDeque<Task>,
    applies: VecDeque<ApplyTask>,
    trash: VecDeque<DeleteTask>,
    events: Vec<ForgeEvent>,
}

impl Forge {
    /// Validate the parameters and spawn the worker pool.
    pub fn new(settings: ForgeSettings, params: PlanetParameters) -> Result<Self, ForgeError> {
        params.validate().map_err(ForgeError::InvalidParameters)?;
        if settings.subdivisions == 0 || settings.subdivisions > MAX_SUBDIVISIONS {
            return Err(ForgeError::InvalidSettings(format!(
                "subdivisions must be in 1..={MAX_SUBDIVISIONS}, got {}",
                settings.subdivisions
            )));
        }
        let params = Arc::new(params);
        let workers = settings.resolved_worker_count();
        let pool = WorkerPool::new(workers, Arc::clone(&params))?;
        info!(
            "Forge started: {workers} workers, {} subdivisions, trash batch {}",
            settings.subdivisions, settings.trash_batch
        );
        Ok(Self {
            settings,
            params,
            pool,
            chunks: FxHashMap::default(),
            next_serial: 0,
            pending: VecDeque::new(),
            applies: VecDeque::new(),
            trash: VecDeque::new(),
            events: Vec::new(),
        })
    }

    pub fn settings(&self) -> &ForgeSettings {
        &self.settings
    }

    pub fn parameters(&self) -> &PlanetParameters {
        &self.params
    }

    /// Replace the planet parameters and re-initialise every worker.
    ///
    /// Existing chunks keep their geometry; callers rebuild them (see
    /// `Side::reset`) to pick up the change.
    pub fn reconfigure(&mut self, params: PlanetParameters) -> Result<(), ForgeError> {
        params.validate().map_err(ForgeError::InvalidParameters)?;
        self.params = Arc::new(params);
        self.pool.broadcast(&self.params);
        info!(
            "Forge reconfigured: radius {}, seed {}",
            self.params.radius, self.params.seed
        );
        Ok(())
    }

    // --- chunks ---

    /// Create a chunk and attach it to the scene.
    pub fn create_chunk(&mut self, descriptor: TileDescriptor, scene: &mut dyn SurfaceScene) -> ChunkId {
        let id = ChunkId::new(descriptor.id(), self.next_serial);
        self.next_serial += 1;
        self.chunks.insert(id, Chunk::new(id, descriptor, scene));
        id
    }

    pub fn chunk(&self, id: ChunkId) -> Option<&Chunk> {
        self.chunks.get(&id)
    }

    pub fn contains_chunk(&self, id: ChunkId) -> bool {
        self.chunks.contains_key(&id)
    }

    /// Number of live chunks, including those waiting in the trash.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    /// Show or hide a chunk. Returns `false` if the chunk does not exist.
    pub fn set_chunk_visible(&mut self, id: ChunkId, visible: bool, scene: &mut dyn SurfaceScene) -> bool {
        match self.chunks.get_mut(&id) {
            Some(chunk) => {
                chunk.set_visible(visible, scene);
                true
            }
            None => false,
        }
    }

    /// Dispose a chunk immediately, bypassing the trash.
    ///
    /// Returns `false` if the chunk was already gone.
    pub fn dispose_chunk(&mut self, id: ChunkId, scene: &mut dyn SurfaceScene) -> bool {
        match self.chunks.remove(&id) {
            Some(mut chunk) => {
                chunk.dispose(scene);
                self.record(ForgeEvent::Disposed { chunk: id });
                true
            }
            None => false,
        }
    }

    // --- queues ---

    /// Queue a task. Never blocks.
    ///
    /// Builds are validated here and rejected before they can reach a worker.
    /// An accepted build moves its chunk to `Building`.
    pub fn submit(&mut self, task: impl Into<Task>) -> Result<(), ForgeError> {
        match task.into() {
            Task::Build(build) => {
                let request = self.build_request(build.chunk)?;
                validate_request(&request).map_err(|source| ForgeError::InvalidDescriptor {
                    chunk: build.chunk,
                    source,
                })?;
                if let Some(chunk) = self.chunks.get_mut(&build.chunk) {
                    chunk.mark_building();
                }
                for delete in &build.deletions {
                    self.hold_replacements(delete);
                }
                self.pending.push_back(Task::Build(build));
            }
            Task::Delete(delete) => {
                if !self.chunks.contains_key(&delete.chunk) {
                    return Err(ForgeError::UnknownChunk(delete.chunk));
                }
                self.hold_replacements(&delete);
                self.pending.push_back(Task::Delete(delete));
            }
            Task::Apply(apply) => {
                for delete in &apply.deletions {
                    self.hold_replacements(delete);
                }
                self.applies.push_back(apply);
            }
        }
        Ok(())
    }

    /// Advance the pipeline by one tick.
    ///
    /// 1. Dispatch queued builds to idle workers, attaching the deletions that
    ///    trail each build in the queue.
    /// 2. Collect finished builds into the apply queue.
    /// 3. Apply at most one finished build and move its deletions to the trash.
    /// 4. Hand trashed chunks whose replacements have settled over to those
    ///    replacements, and dispose up to `trash_batch` of them.
    pub fn pump(&mut self, scene: &mut dyn SurfaceScene) -> PumpReport {
        let mut report = PumpReport::default();
        self.dispatch(&mut report);
        self.collect(&mut report);
        self.apply_one(scene, &mut report);
        report.disposed = self.empty_trash(self.settings.trash_batch, scene);
        report
    }

    /// Dispose up to `max` eligible deletions from the trash.
    ///
    /// A deletion is eligible once every chunk that replaces it is ready,
    /// failed or gone. Every eligible chunk is hidden and its replacements are
    /// revealed in the same call, even past `max`, so a tile and the tiles
    /// covering the same area are never on screen together. Ineligible
    /// deletions keep their position.
    pub fn empty_trash(&mut self, max: usize, scene: &mut dyn SurfaceScene) -> usize {
        let mut disposed = 0;
        let mut index = 0;
        while index < self.trash.len() {
            if !is_eligible(&self.chunks, &self.trash[index]) {
                index += 1;
                continue;
            }
            hand_over(&mut self.chunks, &self.trash[index], scene);
            if disposed >= max {
                index += 1;
                continue;
            }
            let Some(delete) = self.trash.remove(index) else {
                break;
            };
            if self.dispose_chunk(delete.chunk, scene) {
                disposed += 1;
            }
        }
        disposed
    }

    fn dispatch(&mut self, report: &mut PumpReport) {
        while let Some(front) = self.pending.front() {
            if matches!(front, Task::Build(_)) && self.pool.first_idle().is_none() {
                break;
            }
            match self.pending.pop_front() {
                Some(Task::Build(build)) => {
                    let build = self.capture_trailing_deletions(build);
                    if self.dispatch_build(build) {
                        report.dispatched += 1;
                    }
                }
                Some(Task::Delete(delete)) => {
                    warn!("Deletion of chunk {} has no build to pair with", delete.chunk);
                    self.record(ForgeEvent::OrphanDeletion { chunk: delete.chunk });
                    self.trash_one(delete);
                }
                Some(Task::Apply(apply)) => self.applies.push_back(apply),
                None => break,
            }
        }
    }

    fn capture_trailing_deletions(&mut self, mut build: BuildTask) -> BuildTask {
        while let Some(Task::Delete(_)) = self.pending.front() {
            if let Some(Task::Delete(mut delete)) = self.pending.pop_front() {
                if !delete.replaced_by.contains(&build.chunk) {
                    delete.replaced_by.push(build.chunk);
                }
                self.hold_replacements(&delete);
                build.deletions.push(delete);
            }
        }
        build
    }

    fn dispatch_build(&mut self, build: BuildTask) -> bool {
        let BuildTask { chunk, deletions } = build;
        let request = match self.build_request(chunk) {
            Ok(request) => request,
            Err(_) => {
                debug!("Skipping build of disposed chunk {chunk}");
                self.record(ForgeEvent::SkippedBuild { chunk });
                self.trash_all(deletions);
                return false;
            }
        };
        let Some(slot) = self.pool.first_idle() else {
            self.pending.push_front(Task::Build(BuildTask { chunk, deletions }));
            return false;
        };
        match self.pool.dispatch(slot, request, InFlight { chunk, deletions }) {
            Ok(()) => {
                trace!("Dispatched chunk {chunk} to worker {slot}");
                self.record(ForgeEvent::Dispatched { chunk, slot });
                true
            }
            Err(job) => {
                let error = BuildError::Panicked(format!("worker {slot} is not running"));
                self.fail_build(job, error);
                false
            }
        }
    }

    fn collect(&mut self, report: &mut PumpReport) {
        while let Some((completion, job)) = self.pool.try_complete() {
            match completion.result {
                Ok(geometry) => {
                    report.completed += 1;
                    self.record(ForgeEvent::Completed { chunk: job.chunk });
                    self.applies.push_back(ApplyTask {
                        chunk: job.chunk,
                        geometry,
                        deletions: job.deletions,
                    });
                }
                Err(error) => {
                    report.failed += 1;
                    self.fail_build(job, error);
                }
            }
        }
    }

    fn apply_one(&mut self, scene: &mut dyn SurfaceScene, report: &mut PumpReport) {
        let Some(ApplyTask {
            chunk,
            geometry,
            deletions,
        }) = self.applies.pop_front()
        else {
            return;
        };

        match self.chunks.get_mut(&chunk) {
            Some(target) => {
                scene.upload(chunk, geometry);
                target.mark_ready(scene);
                report.applied += 1;
                debug!("Applied chunk {chunk}");
                self.record(ForgeEvent::Applied { chunk });
            }
            None => {
                warn!("Dropping geometry for chunk {chunk}, which no longer exists");
                self.record(ForgeEvent::StaleApplyTarget { chunk });
            }
        }
        self.trash_all(deletions);
    }

    fn fail_build(&mut self, job: InFlight, error: BuildError) {
        warn!("Build of chunk {} failed: {error}", job.chunk);
        if let Some(chunk) = self.chunks.get_mut(&job.chunk) {
            chunk.mark_failed();
        }
        self.record(ForgeEvent::BuildFailed {
            chunk: job.chunk,
            error,
        });
        self.trash_all(job.deletions);
    }

    fn trash_all(&mut self, deletions: Vec<DeleteTask>) {
        for delete in deletions {
            self.trash_one(delete);
        }
    }

    fn trash_one(&mut self, delete: DeleteTask) {
        self.record(ForgeEvent::Trashed { chunk: delete.chunk });
        self.trash.push_back(delete);
    }

    fn hold_replacements(&mut self, delete: &DeleteTask) {
        for id in &delete.replaced_by {
            if let Some(chunk) = self.chunks.get_mut(id) {
                chunk.hold();
            }
        }
    }

    fn build_request(&self, id: ChunkId) -> Result<BuildRequest, ForgeError> {
        let chunk = self.chunks.get(&id).ok_or(ForgeError::UnknownChunk(id))?;
        Ok(BuildRequest::new(*chunk.descriptor(), self.settings.subdivisions))
    }

    fn record(&mut self, event: ForgeEvent) {
        if self.settings.record_events {
            self.events.push(event);
        }
    }

    // --- observation ---

    /// Take the recorded events. Empty unless `record_events` is set.
    pub fn drain_events(&mut self) -> Vec<ForgeEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn pool_size(&self) -> usize {
        self.pool.size()
    }

    pub fn idle_count(&self) -> usize {
        self.pool.idle_count()
    }

    pub fn busy_count(&self) -> usize {
        self.pool.busy_count()
    }

    /// Builds and deletions not yet dispatched.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn apply_len(&self) -> usize {
        self.applies.len()
    }

    pub fn trash_len(&self) -> usize {
        self.trash.len()
    }

    /// Chunks currently waiting in the trash, in queue order.
    pub fn trashed(&self) -> impl Iterator<Item = ChunkId> + '_ {
        self.trash.iter().map(|d| d.chunk)
    }

    /// Returns `true` when nothing is queued, running, waiting to be applied or trashed.
    pub fn is_drained(&self) -> bool {
        self.pending.is_empty()
            && self.applies.is_empty()
            && self.trash.is_empty()
            && self.pool.busy_count() == 0
    }
}

fn is_eligible(chunks: &FxHashMap<ChunkId, Chunk>, delete: &DeleteTask) -> bool {
    delete
        .replaced_by
        .iter()
        .all(|id| chunks.get(id).is_none_or(Chunk::is_settled))
}

/// Hide a trashed chunk and reveal the chunks that take over its area.
fn hand_over(chunks: &mut FxHashMap<ChunkId, Chunk>, delete: &DeleteTask, scene: &mut dyn SurfaceScene) {
    for id in &delete.replaced_by {
        if let Some(chunk) = chunks.get_mut(id) {
            chunk.release(scene);
        }
    }
    if let Some(old) = chunks.get_mut(&delete.chunk) {
        old.retire(scene);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChunkState, MemoryScene};
    use globe_cubesphere::{Direction, TilePath};
    use globe_terrain::{NoiseLayerSettings, TerrainSettings, TileGeometry};
    use std::time::{Duration, Instant};

    const RADIUS: f64 = 1000.0;

    fn forge(workers: usize, trash_batch: usize) -> Forge {
        let settings = ForgeSettings {
            worker_count: workers,
            subdivisions: 4,
            trash_batch,
            record_events: true,
        };
        Forge::new(settings, PlanetParameters::new(RADIUS, 5, TerrainSettings::flat())).unwrap()
    }

    fn tile(indices: &[u8]) -> TileDescriptor {
        TileDescriptor::new(Direction::Forward, TilePath::from_indices(indices).unwrap(), RADIUS * 2.0)
    }

    fn pump_until(forge: &mut Forge, scene: &mut MemoryScene, mut done: impl FnMut(&Forge) -> bool) {
        let start = Instant::now();
        while !done(forge) {
            forge.pump(scene);
            assert!(start.elapsed().as_secs() < 10, "Timed out pumping the forge");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_build_becomes_ready() {
        let mut scene = MemoryScene::new();
        let mut forge = forge(2, 4);
        let id = forge.create_chunk(tile(&[]), &mut scene);
        assert_eq!(forge.chunk(id).unwrap().state(), ChunkState::Unbuilt);

        forge.submit(BuildTask::new(id)).unwrap();
        assert_eq!(forge.chunk(id).unwrap().state(), ChunkState::Building);

        pump_until(&mut forge, &mut scene, |f| f.chunk(id).is_some_and(Chunk::is_ready));
        assert!(scene.is_shown(id));
        assert_eq!(scene.entry(id).unwrap().geometry.as_ref().unwrap().vertex_count(), 25);
    }

    #[test]
    fn test_invalid_build_is_rejected_synchronously() {
        let mut scene = MemoryScene::new();
        let mut forge = forge(1, 4);
        let bad = TileDescriptor::new(Direction::Up, TilePath::ROOT, 0.0);
        let id = forge.create_chunk(bad, &mut scene);
        let err = forge.submit(BuildTask::new(id)).unwrap_err();
        assert!(matches!(err, ForgeError::InvalidDescriptor { .. }));
        assert_eq!(forge.pending_len(), 0);
        assert_eq!(forge.chunk(id).unwrap().state(), ChunkState::Unbuilt);
    }

    #[test]
    fn test_unknown_chunk_is_rejected() {
        let mut scene = MemoryScene::new();
        let mut forge = forge(1, 4);
        let id = forge.create_chunk(tile(&[]), &mut scene);
        forge.dispose_chunk(id, &mut scene);
        assert!(matches!(forge.submit(BuildTask::new(id)), Err(ForgeError::UnknownChunk(_))));
        assert!(matches!(forge.submit(DeleteTask::new(id)), Err(ForgeError::UnknownChunk(_))));
    }

    #[test]
    fn test_invalid_parameters_are_rejected() {
        let result = Forge::new(
            ForgeSettings::default(),
            PlanetParameters::new(f64::NAN, 1, TerrainSettings::flat()),
        );
        assert!(matches!(result, Err(ForgeError::InvalidParameters(_))));
    }

    #[test]
    fn test_trailing_deletions_wait_for_apply() {
        let mut scene = MemoryScene::new();
        let mut forge = forge(1, 0);
        let old_a = forge.create_chunk(tile(&[0]), &mut scene);
        let old_b = forge.create_chunk(tile(&[1]), &mut scene);
        let new = forge.create_chunk(tile(&[]), &mut scene);

        forge.submit(BuildTask::new(new)).unwrap();
        forge.submit(DeleteTask::new(old_a)).unwrap();
        forge.submit(DeleteTask::new(old_b)).unwrap();

        forge.pump(&mut scene);
        assert_eq!(forge.pending_len(), 0, "deletions should ride along with the build");

        pump_until(&mut forge, &mut scene, |f| f.chunk(new).is_some_and(Chunk::is_ready));
        let trashed: Vec<ChunkId> = forge.trashed().collect();
        assert_eq!(trashed, vec![old_a, old_b]);

        let events = forge.drain_events();
        let position = |event: &ForgeEvent| events.iter().position(|e| e == event).unwrap();
        let applied = position(&ForgeEvent::Applied { chunk: new });
        assert!(applied < position(&ForgeEvent::Trashed { chunk: old_a }));
        assert!(applied < position(&ForgeEvent::Trashed { chunk: old_b }));

        assert_eq!(forge.empty_trash(10, &mut scene), 2);
        assert!(!scene.contains(old_a));
        assert!(!scene.contains(old_b));
        assert!(scene.is_shown(new));
    }

    #[test]
    fn test_orphan_deletion_is_still_disposed() {
        let mut scene = MemoryScene::new();
        let mut forge = forge(1, 4);
        let id = forge.create_chunk(tile(&[2]), &mut scene);
        forge.submit(DeleteTask::new(id)).unwrap();
        forge.pump(&mut scene);

        assert!(!forge.contains_chunk(id));
        assert!(!scene.contains(id));
        let events = forge.drain_events();
        assert!(events.contains(&ForgeEvent::OrphanDeletion { chunk: id }));
        assert!(events.contains(&ForgeEvent::Disposed { chunk: id }));
    }

    #[test]
    fn test_stale_apply_is_dropped_and_deletions_still_trashed() {
        let mut scene = MemoryScene::new();
        let mut forge = forge(1, 4);
        let gone = forge.create_chunk(tile(&[3]), &mut scene);
        let old = forge.create_chunk(tile(&[]), &mut scene);
        forge.dispose_chunk(gone, &mut scene);

        forge
            .submit(ApplyTask {
                chunk: gone,
                geometry: TileGeometry::default(),
                deletions: vec![DeleteTask::new(old)],
            })
            .unwrap();
        let report = forge.pump(&mut scene);
        assert_eq!(report.applied, 0);
        assert_eq!(report.disposed, 1);
        assert!(!forge.contains_chunk(old));
        assert!(forge.drain_events().contains(&ForgeEvent::StaleApplyTarget { chunk: gone }));
    }

    #[test]
    fn test_at_most_one_apply_per_pump() {
        let mut scene = MemoryScene::new();
        let mut forge = forge(1, 4);
        let ids: Vec<ChunkId> = (0..3).map(|i| forge.create_chunk(tile(&[i]), &mut scene)).collect();
        for &id in &ids {
            forge
                .submit(ApplyTask {
                    chunk: id,
                    geometry: TileGeometry::default(),
                    deletions: Vec::new(),
                })
                .unwrap();
        }
        for expected in 1..=3 {
            assert_eq!(forge.pump(&mut scene).applied, 1);
            assert_eq!(forge.chunks().filter(|c| c.is_ready()).count(), expected);
        }
        assert_eq!(forge.pump(&mut scene).applied, 0);
    }

    #[test]
    fn test_deletion_waits_for_every_replacement() {
        let mut scene = MemoryScene::new();
        let mut forge = forge(1, 8);
        let parent = forge.create_chunk(tile(&[]), &mut scene);
        let a = forge.create_chunk(tile(&[0]), &mut scene);
        let b = forge.create_chunk(tile(&[1]), &mut scene);
        forge.submit(BuildTask::new(a)).unwrap();
        forge.submit(BuildTask::new(b)).unwrap();

        // Geometry for `a` arrives together with the parent's deletion.
        forge
            .submit(ApplyTask {
                chunk: a,
                geometry: TileGeometry::default(),
                deletions: vec![DeleteTask::with_replacements(parent, vec![a, b])],
            })
            .unwrap();
        forge.pump(&mut scene);
        assert!(forge.chunk(a).unwrap().is_ready());
        assert_eq!(forge.trash_len(), 1);
        assert!(forge.contains_chunk(parent), "parent must stay until b is ready");

        assert!(!scene.is_shown(a), "a stays hidden while the parent is in place");

        pump_until(&mut forge, &mut scene, |f| f.is_drained());
        assert!(!forge.contains_chunk(parent));
        assert!(forge.chunk(a).unwrap().is_ready());
        assert!(forge.chunk(b).unwrap().is_ready());
        assert!(scene.is_shown(a));
        assert!(scene.is_shown(b));
    }

    #[test]
    fn test_parent_and_children_are_never_shown_together() {
        let mut scene = MemoryScene::new();
        let mut forge = forge(2, 1);
        let parent = forge.create_chunk(tile(&[]), &mut scene);
        forge.submit(BuildTask::new(parent)).unwrap();
        pump_until(&mut forge, &mut scene, |f| f.is_drained());
        assert!(scene.is_shown(parent));

        let children: Vec<ChunkId> = (0..4).map(|i| forge.create_chunk(tile(&[i]), &mut scene)).collect();
        for &child in &children[..3] {
            forge.submit(BuildTask::new(child)).unwrap();
        }
        forge
            .submit(BuildTask::with_deletions(
                children[3],
                vec![DeleteTask::with_replacements(parent, children.clone())],
            ))
            .unwrap();

        let start = Instant::now();
        while !forge.is_drained() {
            forge.pump(&mut scene);
            let parent_shown = scene.is_shown(parent);
            let shown_children = children.iter().filter(|&&c| scene.is_shown(c)).count();
            assert!(
                !(parent_shown && shown_children > 0),
                "parent shown together with {shown_children} children"
            );
            assert!(parent_shown || shown_children == 4, "hole: neither parent nor all children shown");
            assert!(start.elapsed().as_secs() < 10, "Timed out");
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(!forge.contains_chunk(parent));
        assert!(children.iter().all(|&c| scene.is_shown(c)));
    }

    #[test]
    fn test_chunk_without_replaced_tiles_is_shown_on_apply() {
        let mut scene = MemoryScene::new();
        let mut forge = forge(1, 4);
        let id = forge.create_chunk(tile(&[2]), &mut scene);
        forge
            .submit(ApplyTask {
                chunk: id,
                geometry: TileGeometry::default(),
                deletions: Vec::new(),
            })
            .unwrap();
        forge.pump(&mut scene);
        assert!(!forge.chunk(id).unwrap().is_held());
        assert!(scene.is_shown(id));
    }

    #[test]
    fn test_non_finite_build_fails_and_stays_building() {
        // Stacked `1e308` masks overflow to infinity and the zero layer
        // under them evaluates to NaN.
        let constant = |floor: f64, masks: Vec<usize>, mask_only: bool| NoiseLayerSettings {
            octaves: 0,
            floor,
            masks,
            mask_only,
            ..Default::default()
        };
        let terrain = TerrainSettings {
            noise_layers: vec![
                constant(1e308, Vec::new(), true),
                constant(1e308, vec![0], true),
                constant(0.0, vec![1], false),
            ],
            crater_layers: Vec::new(),
            ..Default::default()
        };
        let settings = ForgeSettings {
            worker_count: 1,
            subdivisions: 4,
            trash_batch: 4,
            record_events: true,
        };
        let mut forge = Forge::new(settings, PlanetParameters::new(RADIUS, 5, terrain)).unwrap();
        let mut scene = MemoryScene::new();
        let old = forge.create_chunk(tile(&[0]), &mut scene);
        let id = forge.create_chunk(tile(&[]), &mut scene);
        forge
            .submit(BuildTask::with_deletions(id, vec![DeleteTask::with_replacements(old, vec![id])]))
            .unwrap();

        pump_until(&mut forge, &mut scene, |f| f.is_drained());
        let chunk = forge.chunk(id).unwrap();
        assert!(chunk.build_failed());
        assert_eq!(chunk.state(), ChunkState::Building);
        assert!(!scene.is_shown(id));
        assert!(!forge.contains_chunk(old), "a failed replacement still releases the old tile");

        let events = forge.drain_events();
        assert!(events.iter().any(|e| matches!(
            e,
            ForgeEvent::BuildFailed {
                chunk,
                error: BuildError::NonFinite { .. }
            } if *chunk == id
        )));
    }

    #[test]
    fn test_trash_batch_limits_disposals() {
        let mut scene = MemoryScene::new();
        let mut forge = forge(1, 2);
        let ids: Vec<ChunkId> = (0..5).map(|i| forge.create_chunk(tile(&[i % 4, i / 4]), &mut scene)).collect();
        for &id in &ids {
            forge.submit(DeleteTask::new(id)).unwrap();
        }
        assert_eq!(forge.pump(&mut scene).disposed, 2);
        assert_eq!(forge.trash_len(), 3);
        assert_eq!(forge.pump(&mut scene).disposed, 2);
        assert_eq!(forge.pump(&mut scene).disposed, 1);
        assert_eq!(forge.chunk_count(), 0);
    }

    #[test]
    fn test_disposed_before_dispatch_is_skipped() {
        let mut scene = MemoryScene::new();
        let mut forge = forge(1, 4);
        let id = forge.create_chunk(tile(&[1]), &mut scene);
        forge.submit(BuildTask::new(id)).unwrap();
        forge.dispose_chunk(id, &mut scene);
        let report = forge.pump(&mut scene);
        assert_eq!(report.dispatched, 0);
        assert!(forge.drain_events().contains(&ForgeEvent::SkippedBuild { chunk: id }));
        assert!(forge.is_drained());
    }

    #[test]
    fn test_pool_is_conserved_across_pumps() {
        let mut scene = MemoryScene::new();
        let mut forge = forge(2, 4);
        for i in 0..4 {
            let id = forge.create_chunk(tile(&[i]), &mut scene);
            forge.submit(BuildTask::new(id)).unwrap();
        }
        let start = Instant::now();
        while !forge.is_drained() {
            forge.pump(&mut scene);
            assert_eq!(forge.idle_count() + forge.busy_count(), forge.pool_size());
            assert!(forge.busy_count() <= 2);
            assert!(start.elapsed().as_secs() < 10, "Timed out");
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(forge.chunks().filter(|c| c.is_ready()).count(), 4);
    }

    #[test]
    fn test_zero_subdivisions_are_rejected() {
        let settings = ForgeSettings {
            subdivisions: 0,
            ..Default::default()
        };
        let result = Forge::new(settings, PlanetParameters::new(RADIUS, 1, TerrainSettings::flat()));
        assert!(matches!(result, Err(ForgeError::InvalidSettings(_))));
    }

    #[test]
    fn test_reconfigure_validates() {
        let mut forge = forge(1, 4);
        assert!(forge.reconfigure(PlanetParameters::new(-3.0, 1, TerrainSettings::flat())).is_err());
        assert_eq!(forge.parameters().radius, RADIUS);
        forge
            .reconfigure(PlanetParameters::new(RADIUS, 9, TerrainSettings::default()))
            .unwrap();
        assert_eq!(forge.parameters().seed, 9);
    }

    #[test]
    fn test_auto_worker_count_is_positive() {
        assert!(ForgeSettings::default().resolved_worker_count() >= 1);
        let explicit = ForgeSettings {
            worker_count: 3,
            ..Default::default()
        };
        assert_eq!(explicit.resolved_worker_count(), 3);
    }
}
