use super::BotParams;
use crate::policy::{OpponentPolicy, Policy};
use kittens_core::belief::{BeliefError, BeliefState};
use kittens_core::model::deck::DeckSpec;
use kittens_core::model::info_set::InfoSet;
use kittens_core::model::player::Player;
use kittens_core::tree::walk::{UniformStrategy, sample_history};
use kittens_core::tree::{ExtensiveFormNode, GameNode, NodeKind};
use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};
use tracing::{Level, event};

/// Perfect-information Monte Carlo: sample hidden states from the belief,
/// play every child out uniformly in each, and pick the child that wins
/// most often.
#[derive(Debug, Clone)]
pub struct DeterminizedBot {
    belief: BeliefState<OpponentPolicy>,
    params: BotParams,
}

/// Win rate estimates behind one decision.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Mean utility per child, in child order.
    pub values: Vec<f32>,
    pub playouts: usize,
}

impl Evaluation {
    /// Best child; ties go to the lowest index.
    pub fn best(&self) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (index, &value) in self.values.iter().enumerate() {
            match best {
                Some((_, top)) if value <= top => {}
                _ => best = Some((index, value)),
            }
        }
        best.map(|(index, _)| index)
    }
}

impl DeterminizedBot {
    pub fn new(
        spec: &DeckSpec,
        info_set: InfoSet,
        opponent: OpponentPolicy,
        params: BotParams,
    ) -> Result<Self, BeliefError> {
        let belief = BeliefState::new(spec, info_set, opponent)?;
        Ok(Self { belief, params })
    }

    pub fn seat(&self) -> Player {
        self.belief.observer()
    }

    pub fn params(&self) -> BotParams {
        self.params
    }

    pub fn belief(&self) -> &BeliefState<OpponentPolicy> {
        &self.belief
    }

    /// Estimates every child of the current decision. `rng` only seeds the
    /// per-task generators, so results do not depend on the worker count.
    pub fn evaluate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Evaluation, BeliefError> {
        let me = self.seat();
        let template = self.belief.sample_determinization(rng)?;
        if template.kind() != NodeKind::Player || template.player() != me {
            return Err(BeliefError::InvariantViolation {
                context: format!("{me} asked to move at a {:?} node", template.kind()),
                diagnostics: template.to_string(),
            });
        }
        let children = template.num_children();
        let tasks = self.params.determinizations.max(1);
        let seeds: Vec<u64> = (0..tasks).map(|_| rng.r#gen()).collect();
        let results: Mutex<Vec<Option<Vec<f32>>>> = Mutex::new(vec![None; tasks]);
        let workers = self.params.workers.clamp(1, tasks);

        std::thread::scope(|scope| -> Result<(), BeliefError> {
            let handles: Vec<_> = (0..workers)
                .map(|worker| {
                    let seeds = &seeds;
                    let results = &results;
                    scope.spawn(move || -> Result<(), BeliefError> {
                        for task in (worker..tasks).step_by(workers) {
                            let totals = self.run_task(seeds[task], children)?;
                            results.lock()[task] = Some(totals);
                        }
                        Ok(())
                    })
                })
                .collect();
            for handle in handles {
                match handle.join() {
                    Ok(outcome) => outcome?,
                    Err(payload) => std::panic::resume_unwind(payload),
                }
            }
            Ok(())
        })?;

        let mut values = vec![0.0f32; children];
        for totals in results.into_inner().into_iter().flatten() {
            for (value, total) in values.iter_mut().zip(totals) {
                *value += total;
            }
        }
        let playouts = tasks * self.params.rollouts.max(1);
        values.iter_mut().for_each(|v| *v /= playouts as f32);
        Ok(Evaluation { values, playouts })
    }

    /// Summed utilities of every child over one sampled hidden state.
    fn run_task(&self, seed: u64, children: usize) -> Result<Vec<f32>, BeliefError> {
        let me = self.seat();
        let mut rng = SmallRng::seed_from_u64(seed);
        let root = self.belief.sample_determinization(&mut rng)?;
        if root.num_children() != children {
            return Err(BeliefError::InvariantViolation {
                context: format!(
                    "determinization has {} children, expected {children}",
                    root.num_children()
                ),
                diagnostics: root.to_string(),
            });
        }
        let mut totals = vec![0.0f32; children];
        for (index, total) in totals.iter_mut().enumerate() {
            let child = root.child(index)?;
            for _ in 0..self.params.rollouts.max(1) {
                let terminal = sample_history(child.clone(), &mut UniformStrategy, &mut rng)?;
                *total += terminal.utility(me);
            }
        }
        Ok(totals)
    }
}

impl Policy for DeterminizedBot {
    fn choose(&mut self, node: &GameNode, rng: &mut dyn RngCore) -> Result<usize, BeliefError> {
        let children = node.num_children();
        if children == 1 {
            return Ok(0);
        }
        let evaluation = self.evaluate(rng)?;
        if evaluation.values.len() != children {
            return Err(BeliefError::InvariantViolation {
                context: format!(
                    "belief offers {} children, the table offers {children}",
                    evaluation.values.len()
                ),
                diagnostics: node.info_set(self.seat()).to_string(),
            });
        }
        let chosen = evaluation.best().unwrap_or(0);
        event!(
            target: "kittens_bot::decision",
            Level::INFO,
            seat = %self.seat(),
            turn = ?node.turn(),
            children,
            candidates = self.belief.len(),
            playouts = evaluation.playouts,
            chosen,
            value = evaluation.values[chosen],
        );
        Ok(chosen)
    }

    fn observe(&mut self, info_set: &InfoSet) -> Result<(), BeliefError> {
        self.belief.update(info_set)?;
        self.belief.metrics().emit("observe");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "determinized"
    }
}

#[cfg(test)]
mod tests {
    use super::{DeterminizedBot, Evaluation};
    use crate::bot::BotParams;
    use crate::policy::{OpponentPolicy, Policy};
    use kittens_core::model::card::Card;
    use kittens_core::model::card_set::CardSet;
    use kittens_core::model::card_stack::CardStack;
    use kittens_core::model::deck::{Deal, DeckSpec};
    use kittens_core::model::player::Player;
    use kittens_core::tree::{ExtensiveFormNode, GameNode, NodeKind};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn params(workers: usize) -> BotParams {
        BotParams {
            determinizations: 6,
            rollouts: 4,
            workers,
        }
    }

    #[test]
    fn best_prefers_the_first_maximum() {
        let evaluation = Evaluation {
            values: vec![0.2, 0.7, 0.7, -1.0],
            playouts: 1,
        };
        assert_eq!(evaluation.best(), Some(1));
        let empty = Evaluation {
            values: Vec::new(),
            playouts: 0,
        };
        assert_eq!(empty.best(), None);
    }

    #[test]
    fn evaluation_ignores_worker_count() {
        let spec = DeckSpec::default();
        let deal = spec.deal_with_seed(3).unwrap();
        let real = GameNode::new_game(&deal);
        let view = real.state().info_set(Player::Player0);

        let single =
            DeterminizedBot::new(&spec, view, OpponentPolicy::UNIFORM, params(1)).unwrap();
        let pooled =
            DeterminizedBot::new(&spec, view, OpponentPolicy::UNIFORM, params(3)).unwrap();
        let a = single.evaluate(&mut SmallRng::seed_from_u64(9)).unwrap();
        let b = pooled.evaluate(&mut SmallRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.values.len(), real.num_children());
        assert_eq!(a.playouts, 24);
        assert!(a.values.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn chooses_a_legal_child_on_a_tiny_deck() {
        let spec = DeckSpec::new(CardSet::from_cards([Card::Cat, Card::Skip]), 1);
        let hands = [
            CardSet::from_cards([Card::Defuse, Card::Skip]),
            CardSet::from_cards([Card::Defuse, Card::Cat]),
        ];
        let pile = CardStack::from_cards([Card::ExplodingKitten, Card::Defuse]);
        let real = GameNode::new_game(&Deal::new(&spec, hands, pile).unwrap());
        let mut bot = DeterminizedBot::new(
            &spec,
            real.state().info_set(Player::Player0),
            OpponentPolicy::UNIFORM,
            params(2),
        )
        .unwrap();
        let mut rng = SmallRng::seed_from_u64(4);
        let choice = bot.choose(&real, &mut rng).unwrap();
        assert!(choice < real.num_children());
    }

    #[test]
    fn follows_a_random_game() {
        let spec = DeckSpec::new(CardSet::test_deck(), 2);
        let mut rng = SmallRng::seed_from_u64(21);
        let mut real = GameNode::random(&spec, &mut rng).unwrap();
        let mut bot = DeterminizedBot::new(
            &spec,
            real.state().info_set(Player::Player1),
            OpponentPolicy::UNIFORM,
            params(2),
        )
        .unwrap();
        while !real.is_terminal() {
            let index = if real.player() == Player::Player1 && real.kind() == NodeKind::Player {
                bot.choose(&real, &mut rng).unwrap()
            } else {
                real.sample_child(&mut rng).unwrap().0
            };
            real = real.child(index).unwrap();
            bot.observe(&real.state().info_set(Player::Player1)).unwrap();
            assert_eq!(*bot.belief().info_set(), real.state().info_set(Player::Player1));
        }
    }
}
