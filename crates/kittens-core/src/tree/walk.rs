//! Whole-tree traversals: node counting and single-game sampling.

use super::{ChildPool, ExtensiveFormNode, GameNode, NodeKind, TreeError};
use crate::model::player::Player;
use rand::Rng;

/// Chooses how likely each child of a decision node is.
pub trait Strategy {
    fn child_weights(&mut self, node: &GameNode) -> Vec<f32>;
}

impl<F> Strategy for F
where
    F: FnMut(&GameNode) -> Vec<f32>,
{
    fn child_weights(&mut self, node: &GameNode) -> Vec<f32> {
        self(node)
    }
}

/// Every child equally likely.
#[derive(Debug, Default, Clone, Copy)]
pub struct UniformStrategy;

impl Strategy for UniformStrategy {
    fn child_weights(&mut self, node: &GameNode) -> Vec<f32> {
        let n = node.num_children();
        vec![1.0 / n.max(1) as f32; n]
    }
}

/// Index drawn with probability proportional to `weights`, by inverse CDF.
/// `None` when the weights do not sum to something positive.
pub fn sample_weighted<R: Rng + ?Sized>(weights: &[f32], rng: &mut R) -> Option<usize> {
    let total: f32 = weights.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return None;
    }
    let target = rng.gen_range(0.0..total);
    let mut cumulative = 0.0f32;
    for (i, &w) in weights.iter().enumerate() {
        cumulative += w;
        if target < cumulative {
            return Some(i);
        }
    }
    // Rounding can leave target just past the last bucket.
    weights.iter().rposition(|&w| w > 0.0)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WalkOptions {
    /// Sample a single child at this player's decision nodes instead of
    /// visiting all of them.
    pub sampled_player: Option<Player>,
    /// Stop once this many nodes have been visited.
    pub max_nodes: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeCounts {
    pub total: u64,
    pub chance: u64,
    pub decision: u64,
    pub terminal: u64,
    pub max_depth: usize,
    pub truncated: bool,
}

/// Walks the tree below `root`, expanding every decision node except those
/// of `options.sampled_player` and sampling one child at chance nodes.
/// Children are released as soon as their subtree is done.
pub fn count_nodes<R: Rng + ?Sized>(
    root: &mut GameNode,
    options: WalkOptions,
    pool: &mut ChildPool,
    rng: &mut R,
) -> Result<NodeCounts, TreeError> {
    let mut counts = NodeCounts::default();
    visit(root, 0, &options, pool, rng, &mut counts)?;
    Ok(counts)
}

fn visit<R: Rng + ?Sized>(
    node: &mut GameNode,
    depth: usize,
    options: &WalkOptions,
    pool: &mut ChildPool,
    rng: &mut R,
    counts: &mut NodeCounts,
) -> Result<(), TreeError> {
    if options.max_nodes.is_some_and(|max| counts.total >= max) {
        counts.truncated = true;
        return Ok(());
    }
    counts.total += 1;
    counts.max_depth = counts.max_depth.max(depth);

    let sampled = match node.kind() {
        NodeKind::Terminal => {
            counts.terminal += 1;
            return Ok(());
        }
        NodeKind::Chance => {
            counts.chance += 1;
            true
        }
        NodeKind::Player => {
            counts.decision += 1;
            options.sampled_player == Some(node.player())
        }
    };

    if sampled {
        let (_, mut child) = node.sample_child(rng)?;
        return visit(&mut child, depth + 1, options, pool, rng, counts);
    }

    node.build_children_in(pool)?;
    if let Some(children) = node.children_mut() {
        for child in children.iter_mut() {
            visit(child, depth + 1, options, pool, rng, counts)?;
        }
    }
    node.release_children_into(pool);
    Ok(())
}

/// Plays from `root` to the end of the game, choosing decisions with
/// `strategy` and chance outcomes uniformly. Returns the terminal node.
pub fn sample_history<S: Strategy + ?Sized, R: Rng + ?Sized>(
    root: GameNode,
    strategy: &mut S,
    rng: &mut R,
) -> Result<GameNode, TreeError> {
    let mut node = root;
    loop {
        node = match node.kind() {
            NodeKind::Terminal => return Ok(node),
            NodeKind::Chance => node.sample_child(rng)?.1,
            NodeKind::Player => {
                let weights = strategy.child_weights(&node);
                let len = node.num_children();
                if weights.len() != len {
                    return Err(TreeError::ChildOutOfRange {
                        index: weights.len(),
                        len,
                    });
                }
                let index = sample_weighted(&weights, rng)
                    .ok_or(TreeError::ChildOutOfRange { index: 0, len })?;
                node.child(index)?
            }
        };
    }
}
