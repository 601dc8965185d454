//! Size measurements for the game tree and the belief engine.

use kittens_core::belief::{BeliefError, BeliefState, UniformOpponent};
use kittens_core::model::deck::{ConfigurationError, DeckSpec};
use kittens_core::model::player::Player;
use kittens_core::tree::shuffle::count_distinct_shuffles;
use kittens_core::tree::walk::{NodeCounts, WalkOptions, count_nodes};
use kittens_core::tree::{ChildPool, GameNode, TreeError};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event};

#[derive(Debug, Error)]
pub enum CountingError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Belief(#[from] BeliefError),
}

#[derive(Debug, Clone, Serialize)]
pub struct ShuffleCount {
    pub pile_len: usize,
    pub distinct_shuffles: u64,
}

/// Distinct orderings of the draw pile dealt from `seed`, and of every
/// smaller pile reached by drawing from its top.
pub fn count_shuffles(spec: &DeckSpec, seed: u64) -> Result<Vec<ShuffleCount>, CountingError> {
    let deal = spec.deal_with_seed(seed)?;
    let mut pile = deal.draw_pile;
    let mut counts = Vec::with_capacity(pile.len());
    while !pile.is_empty() {
        counts.push(ShuffleCount {
            pile_len: pile.len(),
            distinct_shuffles: count_distinct_shuffles(&pile.to_set()),
        });
        pile.remove(0);
    }
    Ok(counts)
}

#[derive(Debug, Clone, Serialize)]
pub struct BeliefCount {
    /// Real transitions played before measuring.
    pub depth: usize,
    pub observer: Player,
    pub candidates: usize,
    pub total_weight: f32,
    pub effective_sample_size: f32,
    pub terminal: bool,
}

/// Candidate counts for both observers after the deal and after each of the
/// first `depth` transitions of a uniformly random game.
pub fn count_belief_states(
    spec: &DeckSpec,
    seed: u64,
    depth: usize,
) -> Result<Vec<BeliefCount>, CountingError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut node = GameNode::random(spec, &mut rng)?;
    let mut beliefs = Vec::with_capacity(2);
    for player in Player::BOTH {
        beliefs.push(BeliefState::new(
            spec,
            node.state().info_set(player),
            UniformOpponent,
        )?);
    }

    let mut rows = Vec::new();
    for step in 0..=depth {
        if step > 0 {
            node = node.sample_child(&mut rng)?.1;
            for belief in &mut beliefs {
                belief.update(&node.state().info_set(belief.observer()))?;
            }
        }
        for belief in &beliefs {
            let metrics = belief.metrics();
            rows.push(BeliefCount {
                depth: step,
                observer: belief.observer(),
                candidates: metrics.candidates,
                total_weight: metrics.total_weight,
                effective_sample_size: metrics.effective_sample_size,
                terminal: node.is_terminal(),
            });
        }
        if node.is_terminal() {
            break;
        }
    }
    Ok(rows)
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeCountReport {
    pub total: u64,
    pub chance: u64,
    pub decision: u64,
    pub terminal: u64,
    pub max_depth: usize,
    pub truncated: bool,
}

impl From<NodeCounts> for NodeCountReport {
    fn from(counts: NodeCounts) -> Self {
        Self {
            total: counts.total,
            chance: counts.chance,
            decision: counts.decision,
            terminal: counts.terminal,
            max_depth: counts.max_depth,
            truncated: counts.truncated,
        }
    }
}

/// Walks the tree of the game dealt from `seed`.
pub fn count_tree_nodes(
    spec: &DeckSpec,
    seed: u64,
    options: WalkOptions,
) -> Result<NodeCountReport, CountingError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let deal = spec.deal(&mut rng)?;
    let mut root = GameNode::new_game(&deal);
    let mut pool = ChildPool::new();
    let counts = count_nodes(&mut root, options, &mut pool, &mut rng)?;
    event!(
        target: "kittens_bench::count",
        Level::INFO,
        total = counts.total,
        max_depth = counts.max_depth as u64,
        truncated = counts.truncated,
        "node walk finished"
    );
    Ok(counts.into())
}
