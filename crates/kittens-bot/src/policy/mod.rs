mod opponent;
mod uniform;

pub use opponent::OpponentPolicy;
pub use uniform::UniformPolicy;

use kittens_core::belief::BeliefError;
use kittens_core::model::info_set::InfoSet;
use kittens_core::tree::GameNode;
use rand::RngCore;

/// Unified interface for anything that picks moves in a match.
pub trait Policy: Send {
    /// Child index to move to from `node`, a player node where this policy
    /// is the acting player. Only the acting player's view of `node` may be
    /// used.
    fn choose(&mut self, node: &GameNode, rng: &mut dyn RngCore) -> Result<usize, BeliefError>;

    /// Called with this policy's view after every real transition,
    /// including shuffle resolutions.
    fn observe(&mut self, _info_set: &InfoSet) -> Result<(), BeliefError> {
        Ok(())
    }

    fn name(&self) -> &'static str;
}
