use super::Policy;
use kittens_core::belief::BeliefError;
use kittens_core::tree::{GameNode, TreeError};
use rand::{Rng, RngCore};

/// Picks every legal child with equal probability.
#[derive(Debug, Default, Clone, Copy)]
pub struct UniformPolicy;

impl Policy for UniformPolicy {
    fn choose(&mut self, node: &GameNode, rng: &mut dyn RngCore) -> Result<usize, BeliefError> {
        let len = node.num_children();
        if len == 0 {
            return Err(TreeError::ChildOutOfRange { index: 0, len }.into());
        }
        Ok(rng.gen_range(0..len))
    }

    fn name(&self) -> &'static str {
        "uniform"
    }
}
