use kittens_core::belief::OpponentModel;
use kittens_core::tree::{GameNode, TurnType};

/// Prior over the opponent's moves used to reweight belief candidates.
///
/// With `draw_weight == 1.0` every child is equally likely. Other values
/// scale the draw child of a play turn against the card plays, which lets a
/// bot assume an opponent that hoards cards (> 1) or dumps them (< 1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpponentPolicy {
    draw_weight: f32,
}

impl OpponentPolicy {
    pub const UNIFORM: Self = Self { draw_weight: 1.0 };

    /// Non-positive or non-finite weights fall back to uniform.
    pub fn with_draw_weight(draw_weight: f32) -> Self {
        if draw_weight.is_finite() && draw_weight > 0.0 {
            Self { draw_weight }
        } else {
            Self::UNIFORM
        }
    }

    pub fn draw_weight(&self) -> f32 {
        self.draw_weight
    }
}

impl Default for OpponentPolicy {
    fn default() -> Self {
        Self::UNIFORM
    }
}

impl OpponentModel for OpponentPolicy {
    fn child_probabilities(&self, node: &GameNode) -> Vec<f32> {
        let n = node.num_children();
        if n == 0 {
            return Vec::new();
        }
        let mut weights = vec![1.0f32; n];
        if node.turn() == TurnType::PlayTurn {
            // The draw is always the last child of a play turn.
            weights[n - 1] = self.draw_weight;
        }
        let total: f32 = weights.iter().sum();
        weights.iter_mut().for_each(|w| *w /= total);
        weights
    }
}
