use super::{BeliefState, Candidate};
use crate::model::card::Card;
use tracing::Level;

/// Shape of a belief distribution after an update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeliefMetrics {
    pub candidates: usize,
    pub total_weight: f32,
    /// Entropy of the normalized weights divided by `ln(candidates)`; zero
    /// for a single candidate.
    pub normalized_entropy: f32,
    pub effective_sample_size: f32,
    /// Most undetermined draw pile slots held by any candidate.
    pub undetermined_slots: usize,
}

impl BeliefMetrics {
    pub fn from_belief<M>(belief: &BeliefState<M>) -> Self {
        Self::from_candidates(belief.candidates())
    }

    pub fn from_candidates(candidates: &[Candidate]) -> Self {
        let total: f32 = candidates.iter().map(|c| c.weight).sum();
        let squares: f32 = candidates.iter().map(|c| c.weight * c.weight).sum();

        let mut entropy = 0.0f32;
        if total > 0.0 {
            for candidate in candidates {
                let p = candidate.weight / total;
                if p > 0.0 {
                    entropy -= p * p.ln();
                }
            }
        }
        let normalized_entropy = if candidates.len() > 1 {
            entropy / (candidates.len() as f32).ln()
        } else {
            0.0
        };
        let effective_sample_size = if squares > 0.0 {
            total * total / squares
        } else {
            0.0
        };
        let undetermined_slots = candidates
            .iter()
            .map(|c| c.node.state().draw_pile().count_of(Card::Tbd))
            .max()
            .unwrap_or(0);

        Self {
            candidates: candidates.len(),
            total_weight: total,
            normalized_entropy,
            effective_sample_size,
            undetermined_slots,
        }
    }

    pub fn emit(&self, stage: &'static str) {
        tracing::event!(
            target: "kittens_core::belief",
            Level::DEBUG,
            stage,
            candidates = self.candidates,
            total_weight = self.total_weight,
            normalized_entropy = self.normalized_entropy,
            effective_sample_size = self.effective_sample_size,
            undetermined_slots = self.undetermined_slots,
        );
    }
}
