//! Per-face quadtree manager that refines near the observer and coalesces far away.

use glam::DVec3;
use globe_cubesphere::{Direction, Quadrant, TileDescriptor, TilePath};
use globe_forge::{BuildTask, ChunkId, DeleteTask, Forge, ForgeError, SurfaceScene};
use tracing::debug;

use crate::{LodSettings, QuadNode, is_tile_beyond_horizon};

/// What one [`Side::update`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LodReport {
    /// Leaves replaced by four children.
    pub refined: usize,
    /// Branches replaced by a single leaf.
    pub coalesced: usize,
    /// Kept leaves hidden behind the horizon.
    pub culled: usize,
}

/// The quadtree of one cube face.
///
/// Holds chunk handles only; the chunks themselves live in the [`Forge`].
/// The tree always has a root and every branch has exactly four children.
pub struct Side {
    direction: Direction,
    edge_length: f64,
    settings: LodSettings,
    root: QuadNode,
}

impl Side {
    /// Create the face with a single root leaf and request its geometry.
    pub fn new(
        direction: Direction,
        edge_length: f64,
        settings: LodSettings,
        forge: &mut Forge,
        scene: &mut dyn SurfaceScene,
    ) -> Result<Self, ForgeError> {
        let root = forge.create_chunk(TileDescriptor::new(direction, TilePath::ROOT, edge_length), scene);
        if let Err(e) = forge.submit(BuildTask::new(root)) {
            forge.dispose_chunk(root, scene);
            return Err(e);
        }
        Ok(Self {
            direction,
            edge_length,
            settings: settings.sanitized(),
            root: QuadNode::Leaf(root),
        })
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Edge length of the cube this face belongs to.
    pub fn edge_length(&self) -> f64 {
        self.edge_length
    }

    pub fn settings(&self) -> &LodSettings {
        &self.settings
    }

    pub fn root(&self) -> &QuadNode {
        &self.root
    }

    pub fn leaf_count(&self) -> usize {
        self.root.leaf_count()
    }

    /// Leaves with their paths, in quadrant order.
    pub fn leaves(&self) -> Vec<(TilePath, ChunkId)> {
        self.root.leaves(TilePath::ROOT)
    }

    /// Call `f` on every chunk of the tree.
    pub fn for_each_chunk(&self, mut f: impl FnMut(ChunkId)) {
        self.root.for_each_chunk(&mut f);
    }

    /// Re-evaluate the tree for an observer given in planet space.
    pub fn update(
        &mut self,
        observer: DVec3,
        forge: &mut Forge,
        scene: &mut dyn SurfaceScene,
    ) -> Result<LodReport, ForgeError> {
        let mut walker = Walker {
            direction: self.direction,
            edge_length: self.edge_length,
            settings: &self.settings,
            observer,
            forge,
            scene,
            report: LodReport::default(),
        };
        walker.visit(&mut self.root, TilePath::ROOT)?;
        let report = walker.report;
        if report.refined > 0 || report.coalesced > 0 {
            debug!(
                "Side {}: refined {}, coalesced {}, {} leaves",
                self.direction,
                report.refined,
                report.coalesced,
                self.root.leaf_count()
            );
        }
        Ok(report)
    }

    /// Replace the whole tree by a fresh root leaf.
    ///
    /// Existing chunks stay visible until the new root is applied.
    pub fn reset(&mut self, forge: &mut Forge, scene: &mut dyn SurfaceScene) -> Result<(), ForgeError> {
        let old = self.root.chunks();
        let root = forge.create_chunk(
            TileDescriptor::new(self.direction, TilePath::ROOT, self.edge_length),
            scene,
        );
        let deletions = old
            .into_iter()
            .map(|id| DeleteTask::with_replacements(id, vec![root]))
            .collect();
        if let Err(e) = forge.submit(BuildTask::with_deletions(root, deletions)) {
            forge.dispose_chunk(root, scene);
            return Err(e);
        }
        self.root = QuadNode::Leaf(root);
        debug!("Side {} reset", self.direction);
        Ok(())
    }

    /// Dispose every chunk of the tree immediately.
    pub fn dispose(self, forge: &mut Forge, scene: &mut dyn SurfaceScene) {
        self.root.for_each_chunk(&mut |id| {
            forge.dispose_chunk(id, scene);
        });
    }
}

enum Action {
    Refine(ChunkId),
    Keep(ChunkId),
    Descend,
    Coalesce,
    Leave,
}

struct Walker<'a> {
    direction: Direction,
    edge_length: f64,
    settings: &'a LodSettings,
    observer: DVec3,
    forge: &'a mut Forge,
    scene: &'a mut dyn SurfaceScene,
    report: LodReport,
}

impl Walker<'_> {
    fn visit(&mut self, node: &mut QuadNode, path: TilePath) -> Result<(), ForgeError> {
        let descriptor = TileDescriptor::new(self.direction, path, self.edge_length);
        let depth = path.depth();
        let distance_sq = descriptor.sphere_position().distance_squared(self.observer);
        let threshold = self.settings.render_distance_factor * descriptor.size;
        let margin = threshold * self.settings.coalesce_margin;

        let below_max = depth < self.settings.max_depth;
        let refine = (distance_sq < threshold * threshold && below_max) || depth < self.settings.min_depth;
        let hold = !refine && below_max && distance_sq < margin * margin;

        let action = match &*node {
            QuadNode::Leaf(id) if refine && self.may_refine(*id) => Action::Refine(*id),
            QuadNode::Leaf(id) => Action::Keep(*id),
            QuadNode::Branch(_) if refine || hold => Action::Descend,
            QuadNode::Branch(_) if depth >= self.settings.min_depth => Action::Coalesce,
            QuadNode::Branch(_) => Action::Leave,
        };

        match action {
            Action::Refine(id) => *node = self.refine(id, path)?,
            Action::Keep(id) => self.apply_culling(id, &descriptor),
            Action::Descend => {
                if let QuadNode::Branch(children) = node {
                    for (quadrant, child) in Quadrant::ALL.into_iter().zip(children.iter_mut()) {
                        if let Some(child_path) = path.child(quadrant) {
                            self.visit(child, child_path)?;
                        }
                    }
                }
            }
            Action::Coalesce => *node = self.coalesce(node, path)?,
            Action::Leave => {}
        }
        Ok(())
    }

    fn may_refine(&self, id: ChunkId) -> bool {
        !self.settings.refine_ready_only
            || self
                .forge
                .chunk(id)
                .is_some_and(|c| c.is_shown())
    }

    /// Replace a leaf by four new leaves. The old chunk is deleted once all
    /// four have been applied; its deletion rides on the last build.
    ///
    /// If any build is rejected, the new chunks are disposed and the leaf is
    /// left as it was.
    fn refine(&mut self, old: ChunkId, path: TilePath) -> Result<QuadNode, ForgeError> {
        let Some(paths) = path.children() else {
            return Ok(QuadNode::Leaf(old));
        };
        let ids = paths.map(|p| {
            self.forge
                .create_chunk(TileDescriptor::new(self.direction, p, self.edge_length), self.scene)
        });
        for (i, &id) in ids.iter().enumerate() {
            let deletions = if i == ids.len() - 1 {
                vec![DeleteTask::with_replacements(old, ids.to_vec())]
            } else {
                Vec::new()
            };
            if let Err(e) = self.forge.submit(BuildTask::with_deletions(id, deletions)) {
                self.discard(&ids);
                return Err(e);
            }
        }
        self.report.refined += 1;
        Ok(QuadNode::branch(ids))
    }

    /// Replace a whole branch by a single new leaf at its path.
    fn coalesce(&mut self, branch: &QuadNode, path: TilePath) -> Result<QuadNode, ForgeError> {
        let old = branch.chunks();
        let id = self
            .forge
            .create_chunk(TileDescriptor::new(self.direction, path, self.edge_length), self.scene);
        let deletions = old
            .into_iter()
            .map(|chunk| DeleteTask::with_replacements(chunk, vec![id]))
            .collect();
        if let Err(e) = self.forge.submit(BuildTask::with_deletions(id, deletions)) {
            self.discard(&[id]);
            return Err(e);
        }
        self.report.coalesced += 1;
        Ok(QuadNode::Leaf(id))
    }

    /// Dispose chunks that never made it into the tree. Builds already queued
    /// for them are skipped by the forge.
    fn discard(&mut self, ids: &[ChunkId]) {
        for &id in ids {
            self.forge.dispose_chunk(id, self.scene);
        }
    }

    fn apply_culling(&mut self, id: ChunkId, descriptor: &TileDescriptor) {
        let hidden = self.settings.horizon_culling && is_tile_beyond_horizon(descriptor, self.observer);
        if hidden {
            self.report.culled += 1;
        }
        self.forge.set_chunk_visible(id, !hidden, self.scene);
    }
}
