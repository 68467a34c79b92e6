//! Quadtree nodes.

use globe_cubesphere::{Quadrant, TilePath};
use globe_forge::ChunkId;

/// A quadtree node: a leaf chunk or exactly four children.
///
/// Children are indexed in [`Quadrant`] order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuadNode {
    Leaf(ChunkId),
    Branch(Box<[QuadNode; 4]>),
}

impl QuadNode {
    /// A branch of four leaves.
    pub fn branch(children: [ChunkId; 4]) -> Self {
        QuadNode::Branch(Box::new(children.map(QuadNode::Leaf)))
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, QuadNode::Leaf(_))
    }

    /// The chunk of a leaf.
    pub fn leaf(&self) -> Option<ChunkId> {
        match self {
            QuadNode::Leaf(id) => Some(*id),
            QuadNode::Branch(_) => None,
        }
    }

    pub fn child(&self, quadrant: Quadrant) -> Option<&QuadNode> {
        match self {
            QuadNode::Leaf(_) => None,
            QuadNode::Branch(children) => Some(&children[quadrant.index()]),
        }
    }

    /// Number of leaves in this subtree.
    pub fn leaf_count(&self) -> usize {
        match self {
            QuadNode::Leaf(_) => 1,
            QuadNode::Branch(children) => children.iter().map(QuadNode::leaf_count).sum(),
        }
    }

    /// Height of this subtree (0 for a leaf).
    pub fn height(&self) -> u8 {
        match self {
            QuadNode::Leaf(_) => 0,
            QuadNode::Branch(children) => 1 + children.iter().map(QuadNode::height).max().unwrap_or(0),
        }
    }

    /// Call `f` on every chunk of the subtree, in quadrant order.
    pub fn for_each_chunk(&self, f: &mut impl FnMut(ChunkId)) {
        match self {
            QuadNode::Leaf(id) => f(*id),
            QuadNode::Branch(children) => {
                for child in children.iter() {
                    child.for_each_chunk(f);
                }
            }
        }
    }

    /// All chunks of the subtree, in quadrant order.
    pub fn chunks(&self) -> Vec<ChunkId> {
        let mut out = Vec::with_capacity(self.leaf_count());
        self.for_each_chunk(&mut |id| out.push(id));
        out
    }

    /// Every leaf with its path, given the path of this node.
    pub fn leaves(&self, path: TilePath) -> Vec<(TilePath, ChunkId)> {
        let mut out = Vec::new();
        self.collect_leaves(path, &mut out);
        out
    }

    fn collect_leaves(&self, path: TilePath, out: &mut Vec<(TilePath, ChunkId)>) {
        match self {
            QuadNode::Leaf(id) => out.push((path, *id)),
            QuadNode::Branch(children) => {
                for (quadrant, child) in Quadrant::ALL.into_iter().zip(children.iter()) {
                    if let Some(child_path) = path.child(quadrant) {
                        child.collect_leaves(child_path, out);
                    }
                }
            }
        }
    }
}
