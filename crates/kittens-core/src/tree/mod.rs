//! Extensive-form game tree over [`GameState`](crate::model::game_state::GameState).
//!
//! - `turn`: the turn state machine tags and node kinds.
//! - `node`: `GameNode`, its transitions and lazily built children.
//! - `pool`: recycled child buffers for exhaustive walks.
//! - `shuffle`: counting and ranking distinct draw pile orderings.
//! - `walk`: node counting and whole-game sampling.

mod node;
mod pool;
pub mod shuffle;
mod turn;
pub mod walk;

pub use node::{GameNode, MAX_INSERT_DEPTH, MAX_MATERIALIZED_CHILDREN, NodeKey, insert_positions};
pub use pool::ChildPool;
pub use turn::{NodeKind, TurnType};

use crate::model::action::Action;
use crate::model::deck::ConfigurationError;
use crate::model::game_state::StateError;
use crate::model::info_set::InfoSet;
use crate::model::player::Player;
use rand::Rng;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("draw pile is empty")]
    EmptyDrawPile,
    #[error("child {index} out of range ({len} children)")]
    ChildOutOfRange { index: usize, len: usize },
    #[error("{count} children exceed the materialization limit of {limit}")]
    TooManyChildren { count: usize, limit: usize },
    #[error("{action} is not legal during {turn}")]
    IllegalAction { turn: TurnType, action: Action },
}

/// What a search algorithm needs from a game tree node.
pub trait ExtensiveFormNode: Sized {
    fn kind(&self) -> NodeKind;

    fn acting_player(&self) -> Player;

    fn info_set(&self, player: Player) -> InfoSet;

    fn num_children(&self) -> usize;

    fn child(&self, index: usize) -> Result<Self, TreeError>;

    /// Probability of reaching child `index` from a chance node; zero for
    /// any other kind of node.
    fn child_probability(&self, index: usize) -> f64;

    fn sample_child<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<(usize, Self), TreeError>;

    /// Payoff for `player` at a terminal node.
    fn utility(&self, player: Player) -> f32;
}
