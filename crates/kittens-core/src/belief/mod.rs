//! Per-observer belief over hidden game states.
//!
//! - `state`: `BeliefState`, the weighted candidate set and its update rule.
//! - `determinize`: resolving the draw pile slots an action is about to touch.
//! - `prior`: opponent hand allocations at the deal.
//! - `sampler`: free-card pools and full determinizations.
//! - `telemetry`: summary metrics emitted through `tracing`.

pub mod determinize;
mod prior;
mod sampler;
mod state;
pub mod telemetry;

pub use prior::{DealPrior, opponent_hands};
pub use sampler::{fill_undetermined, free_cards};
pub use state::{BeliefError, BeliefState, Candidate, OpponentModel, UniformOpponent};
