//! The weighted candidate set held for one observer and its update rule.

use super::determinize::determinize;
use super::prior::{DealPrior, opponent_hands};
use super::sampler::{fill_undetermined, free_cards};
use super::telemetry::BeliefMetrics;
use crate::model::card::Card;
use crate::model::card_set::CardSet;
use crate::model::card_stack::CardStack;
use crate::model::deck::{ConfigurationError, DEFUSES_PER_HAND, DeckSpec};
use crate::model::game_state::GameState;
use crate::model::info_set::InfoSet;
use crate::model::player::Player;
use crate::tree::walk::sample_weighted;
use crate::tree::{ExtensiveFormNode, GameNode, NodeKind, TreeError, TurnType};
use rand::Rng;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt::Write as _;
use thiserror::Error;
use tracing::Level;

#[derive(Debug, Error)]
pub enum BeliefError {
    /// The candidate set no longer explains what the observer saw. The
    /// belief cannot be repaired; callers abort.
    #[error("belief invariant violated: {context}")]
    InvariantViolation { context: String, diagnostics: String },
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// How the opponent is expected to act, used to reweight candidates after
/// their moves.
pub trait OpponentModel {
    /// Probability of each child of `node`, in child order.
    fn child_probabilities(&self, node: &GameNode) -> Vec<f32>;
}

impl<F> OpponentModel for F
where
    F: Fn(&GameNode) -> Vec<f32>,
{
    fn child_probabilities(&self, node: &GameNode) -> Vec<f32> {
        self(node)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UniformOpponent;

impl OpponentModel for UniformOpponent {
    fn child_probabilities(&self, node: &GameNode) -> Vec<f32> {
        let n = node.num_children();
        vec![1.0 / n.max(1) as f32; n]
    }
}

/// One hidden state the observer cannot rule out, with its unnormalized
/// reach weight.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub node: GameNode,
    pub weight: f32,
}

/// Everything that identifies a candidate once the observer's own view is
/// fixed: the opponent's view plus the actual pile order.
#[derive(PartialEq, Eq, Hash)]
struct MergeKey {
    opponent_view: InfoSet,
    draw_pile: CardStack,
    player: Player,
    turn: TurnType,
    pending_turns: u8,
    winner: Option<Player>,
}

impl MergeKey {
    fn of(node: &GameNode, observer: Player) -> Self {
        Self {
            opponent_view: node.info_set(observer.opponent()),
            draw_pile: node.state().draw_pile(),
            player: node.player(),
            turn: node.turn(),
            pending_turns: node.pending_turns(),
            winner: node.winner(),
        }
    }
}

/// Weighted set of game nodes consistent with everything one player has
/// observed.
///
/// Construct it at the deal, then call [`BeliefState::update`] once per
/// real transition (every action and every shuffle resolution) with the
/// observer's new info set. Weights are never renormalized; use
/// [`BeliefState::normalized_weights`] when a distribution is needed.
/// Updates need exclusive access. Sampling only reads, so many workers can
/// sample at once, each with its own generator.
#[derive(Debug, Clone)]
pub struct BeliefState<M = UniformOpponent> {
    spec: DeckSpec,
    info_set: InfoSet,
    candidates: Vec<Candidate>,
    opponent: M,
}

impl<M: OpponentModel> BeliefState<M> {
    /// Belief at the deal with a uniform weight per opponent hand.
    pub fn new(spec: &DeckSpec, info_set: InfoSet, opponent: M) -> Result<Self, BeliefError> {
        Self::with_prior(spec, info_set, opponent, DealPrior::Uniform)
    }

    /// Enumerates every opponent hand the deck allows given the
    /// observer's own, each with the whole draw pile left undetermined.
    pub fn with_prior(
        spec: &DeckSpec,
        info_set: InfoSet,
        opponent: M,
        prior: DealPrior,
    ) -> Result<Self, BeliefError> {
        spec.validate()?;
        let observer = info_set.player;
        if !info_set.history.is_empty() {
            return Err(ConfigurationError::NotInitialInfoSet(format!(
                "{} actions were already played",
                info_set.history.len()
            ))
            .into());
        }
        let own = info_set.hand;
        if own.len() != spec.initial_hand_len() || own.count(Card::Defuse) < DEFUSES_PER_HAND {
            return Err(ConfigurationError::NotInitialInfoSet(format!(
                "hand {own} is not a dealt hand of {} cards",
                spec.initial_hand_len()
            ))
            .into());
        }
        let mut dealt = own;
        dealt.remove_n(Card::Defuse, DEFUSES_PER_HAND);
        if dealt.intersection(spec.deck) != dealt {
            return Err(ConfigurationError::NotInitialInfoSet(format!(
                "hand {own} is not drawn from {}",
                spec.deck
            ))
            .into());
        }
        let mut pool = spec.deck;
        pool.remove_all(dealt);

        let pile_len = spec.initial_draw_pile_len();
        let mut candidates = Vec::new();
        for (hand, ways) in opponent_hands(pool, spec.hand_size as usize) {
            let mut opponent_hand = hand;
            opponent_hand.add_n(Card::Defuse, DEFUSES_PER_HAND);
            let mut hands = [CardSet::new(); 2];
            hands[observer.index()] = own;
            hands[observer.opponent().index()] = opponent_hand;
            let state = GameState::with_undetermined_pile(hands, pile_len);
            let node = GameNode::from_state(state, Player::Player0);
            if node.info_set(observer) != info_set {
                return Err(ConfigurationError::NotInitialInfoSet(format!(
                    "{observer}'s view {info_set} does not match a fresh deal"
                ))
                .into());
            }
            candidates.push(Candidate {
                node,
                weight: prior.weight(ways),
            });
        }

        let belief = Self {
            spec: *spec,
            info_set,
            candidates,
            opponent,
        };
        belief.check_invariants(&belief.candidates, &belief.info_set)?;
        BeliefMetrics::from_belief(&belief).emit("deal");
        Ok(belief)
    }

    /// Advances the belief past one real transition, after which the
    /// observer's view is `info_set`.
    ///
    /// On error the belief is left as it was.
    pub fn update(&mut self, info_set: &InfoSet) -> Result<(), BeliefError> {
        let observer = self.observer();
        if info_set.player != observer {
            return Err(violation(
                format!("update for {} sent to {observer}'s belief", info_set.player),
                String::new(),
            ));
        }
        let (kind, actor) = self.transition()?;
        let next = match kind {
            NodeKind::Terminal => {
                if *info_set == self.info_set {
                    return Ok(());
                }
                return Err(violation(
                    "the game is over but the view changed",
                    self.describe_transition(info_set),
                ));
            }
            NodeKind::Chance => self.resolve_shuffle(info_set)?,
            NodeKind::Player => {
                if info_set.history.len() == self.info_set.history.len() {
                    if *info_set == self.info_set {
                        return Ok(());
                    }
                    return Err(violation(
                        "the view changed without a new action",
                        self.describe_transition(info_set),
                    ));
                }
                self.expand_action(actor, info_set)?
            }
        };

        let next = merge_duplicates(next, observer)?;
        self.check_invariants(&next, info_set)?;
        tracing::event!(
            target: "kittens_core::belief",
            Level::DEBUG,
            observer = %observer,
            actions = info_set.history.len(),
            before = self.candidates.len(),
            after = next.len(),
            "belief updated"
        );
        self.candidates = next;
        self.info_set = *info_set;
        BeliefMetrics::from_belief(self).emit("update");
        Ok(())
    }

    /// Children of every candidate that reproduce the observer's new view,
    /// after determinizing the slots the new action reads.
    fn expand_action(
        &self,
        actor: Player,
        info_set: &InfoSet,
    ) -> Result<Vec<Candidate>, BeliefError> {
        let observer = self.observer();
        let previous = self.info_set.history.len();
        let action = info_set.history.get(previous).ok_or_else(|| {
            violation(
                "the new view has no new action",
                self.describe_transition(info_set),
            )
        })?;
        if action.player != actor {
            return Err(violation(
                format!("{action} played out of turn, {actor} is to move"),
                self.describe_transition(info_set),
            ));
        }

        let mut next = Vec::new();
        for candidate in &self.candidates {
            let free = free_cards(&self.spec, candidate.node.state());
            let expanded = determinize(&candidate.node, candidate.weight, action, observer, free);
            for (node, weight) in expanded {
                let actions = node.legal_actions()?;
                let policy = if actor == observer {
                    None
                } else {
                    let policy = self.opponent.child_probabilities(&node);
                    if policy.len() != actions.len() {
                        return Err(violation(
                            format!(
                                "opponent model gave {} probabilities for {} children",
                                policy.len(),
                                actions.len()
                            ),
                            node.to_string(),
                        ));
                    }
                    Some(policy)
                };
                for (index, child_action) in actions.into_iter().enumerate() {
                    let child = node.apply(child_action)?;
                    if child.info_set(observer) != *info_set {
                        continue;
                    }
                    let weight = match &policy {
                        Some(policy) => weight * policy[index],
                        None => weight,
                    };
                    if weight > 0.0 {
                        next.push(Candidate {
                            node: child,
                            weight,
                        });
                    }
                }
            }
        }

        if next.is_empty() {
            return Err(violation(
                format!("no candidate explains {action}"),
                self.describe_transition(info_set),
            ));
        }
        Ok(next)
    }

    /// A uniform shuffle forgets every order: each candidate moves to its
    /// post-shuffle node with the whole pile undetermined again.
    fn resolve_shuffle(&self, info_set: &InfoSet) -> Result<Vec<Candidate>, BeliefError> {
        if info_set.history.len() != self.info_set.history.len() {
            return Err(violation(
                "a shuffle must resolve before the next action",
                self.describe_transition(info_set),
            ));
        }
        let mut next = Vec::with_capacity(self.candidates.len());
        for candidate in &self.candidates {
            let child = candidate.node.child(0)?;
            let len = child.state().draw_pile().len();
            let state = child
                .state()
                .with_draw_pile(CardStack::filled(len, Card::Tbd));
            next.push(Candidate {
                node: child.with_state(state),
                weight: candidate.weight,
            });
        }
        Ok(next)
    }
}

impl<M> BeliefState<M> {
    pub fn spec(&self) -> &DeckSpec {
        &self.spec
    }

    pub fn observer(&self) -> Player {
        self.info_set.player
    }

    pub fn info_set(&self) -> &InfoSet {
        &self.info_set
    }

    pub fn opponent_model(&self) -> &M {
        &self.opponent
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn reach_weights(&self) -> Vec<f32> {
        self.candidates.iter().map(|c| c.weight).collect()
    }

    pub fn total_weight(&self) -> f32 {
        self.candidates.iter().map(|c| c.weight).sum()
    }

    /// Reach weights scaled to sum to one.
    pub fn normalized_weights(&self) -> Vec<f32> {
        let total = self.total_weight();
        if total <= 0.0 {
            return vec![0.0; self.candidates.len()];
        }
        self.candidates.iter().map(|c| c.weight / total).collect()
    }

    pub fn free_cards(&self, state: &GameState) -> CardSet {
        free_cards(&self.spec, state)
    }

    pub fn metrics(&self) -> BeliefMetrics {
        BeliefMetrics::from_belief(self)
    }

    /// Merges candidates that are the same hidden state, summing their
    /// weights. Applying it again changes nothing.
    pub fn dedup(&mut self) -> Result<(), BeliefError> {
        self.candidates = merge_duplicates(self.candidates.clone(), self.observer())?;
        Ok(())
    }

    /// Picks a candidate in proportion to its weight and deals its free
    /// cards into the undetermined pile slots in random order.
    pub fn sample_determinization<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<GameNode, BeliefError> {
        let weights = self.reach_weights();
        let index = sample_weighted(&weights, rng).ok_or_else(|| {
            violation(
                "cannot sample from a belief without weight",
                self.describe_candidates(),
            )
        })?;
        let node = &self.candidates[index].node;
        fill_undetermined(node, free_cards(&self.spec, node.state()), rng)
    }

    /// Kind of the pending transition, which every candidate must share.
    fn transition(&self) -> Result<(NodeKind, Player), BeliefError> {
        let first = self
            .candidates
            .first()
            .ok_or_else(|| violation("the belief is empty", String::new()))?;
        let kind = first.node.kind();
        let actor = first.node.player();
        if self
            .candidates
            .iter()
            .any(|c| c.node.kind() != kind || c.node.player() != actor)
        {
            return Err(violation(
                "candidates disagree on whose move it is",
                self.describe_candidates(),
            ));
        }
        Ok((kind, actor))
    }

    fn check_invariants(
        &self,
        candidates: &[Candidate],
        info_set: &InfoSet,
    ) -> Result<(), BeliefError> {
        let observer = self.observer();
        for (i, candidate) in candidates.iter().enumerate() {
            let view = candidate.node.info_set(observer);
            if view != *info_set {
                return Err(violation(
                    format!("candidate {i} does not match {observer}'s view"),
                    format!(
                        "candidate: {}\nprojection: {view}\nexpected: {info_set}",
                        candidate.node
                    ),
                ));
            }
            if let Err(err) = candidate.node.state().validate(&self.spec) {
                return Err(violation(
                    format!("candidate {i} is inconsistent: {err}"),
                    candidate.node.to_string(),
                ));
            }
            if !candidate.weight.is_finite() || candidate.weight < 0.0 {
                return Err(violation(
                    format!("candidate {i} has weight {}", candidate.weight),
                    candidate.node.to_string(),
                ));
            }
        }
        let total: f32 = candidates.iter().map(|c| c.weight).sum();
        if total <= 0.0 || !total.is_finite() {
            return Err(violation(
                format!("total weight collapsed to {total}"),
                format!("{} candidates, view {info_set}", candidates.len()),
            ));
        }
        Ok(())
    }

    fn describe_candidates(&self) -> String {
        let mut out = String::new();
        for (i, candidate) in self.candidates.iter().enumerate() {
            let _ = writeln!(
                out,
                "candidate {i} (weight {}): {}",
                candidate.weight, candidate.node
            );
        }
        out
    }

    /// Old and new views plus every candidate with its children's views.
    fn describe_transition(&self, info_set: &InfoSet) -> String {
        let observer = self.observer();
        let mut out = String::new();
        let _ = writeln!(out, "old view: {}", self.info_set);
        let _ = writeln!(out, "new view: {info_set}");
        for (i, candidate) in self.candidates.iter().enumerate() {
            let _ = writeln!(
                out,
                "candidate {i} (weight {}): {}",
                candidate.weight, candidate.node
            );
            let Ok(actions) = candidate.node.legal_actions() else {
                continue;
            };
            for action in actions {
                if let Ok(child) = candidate.node.apply(action) {
                    let _ = writeln!(out, "  {action} -> {}", child.info_set(observer));
                }
            }
        }
        out
    }
}

fn merge_duplicates(
    candidates: Vec<Candidate>,
    observer: Player,
) -> Result<Vec<Candidate>, BeliefError> {
    let mut slots: HashMap<MergeKey, usize> = HashMap::with_capacity(candidates.len());
    let mut merged: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match slots.entry(MergeKey::of(&candidate.node, observer)) {
            Entry::Occupied(slot) => {
                let kept = &mut merged[*slot.get()];
                if kept.node.info_set(observer) != candidate.node.info_set(observer) {
                    return Err(violation(
                        "merged candidates differ from the observer's side",
                        format!("kept: {}\nmerged: {}", kept.node, candidate.node),
                    ));
                }
                kept.weight += candidate.weight;
            }
            Entry::Vacant(slot) => {
                slot.insert(merged.len());
                merged.push(candidate);
            }
        }
    }
    Ok(merged)
}

pub(super) fn violation(context: impl Into<String>, diagnostics: String) -> BeliefError {
    let context = context.into();
    tracing::event!(
        target: "kittens_core::belief",
        Level::ERROR,
        context = %context,
        diagnostics = %diagnostics,
        "belief invariant violated"
    );
    BeliefError::InvariantViolation {
        context,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::{BeliefError, BeliefState, UniformOpponent};
    use crate::model::action::Action;
    use crate::model::card::Card;
    use crate::model::card_set::CardSet;
    use crate::model::card_stack::CardStack;
    use crate::model::deck::{Deal, DeckSpec};
    use crate::model::player::Player;
    use crate::tree::GameNode;

    fn spec() -> DeckSpec {
        DeckSpec::new(CardSet::test_deck(), 2)
    }

    fn real_game() -> GameNode {
        let hands = [
            CardSet::from_cards([Card::Defuse, Card::SeeTheFuture, Card::Skip]),
            CardSet::from_cards([Card::Defuse, Card::Cat, Card::Slap1x]),
        ];
        let pile = CardStack::from_cards([
            Card::Slap2x,
            Card::DrawFromTheBottom,
            Card::ExplodingKitten,
            Card::Defuse,
        ]);
        GameNode::new_game(&Deal::new(&spec(), hands, pile).unwrap())
    }

    fn belief(real: &GameNode) -> BeliefState {
        let info = real.state().info_set(Player::Player0);
        BeliefState::new(&spec(), info, UniformOpponent).unwrap()
    }

    #[test]
    fn deal_enumerates_opponent_hands() {
        let real = real_game();
        let belief = belief(&real);
        // Two of {Slap1x, Slap2x, DrawFromTheBottom, Cat}.
        assert_eq!(belief.len(), 6);
        assert_eq!(belief.total_weight(), 6.0);
        for candidate in belief.candidates() {
            assert_eq!(candidate.node.state().draw_pile().count_of(Card::Tbd), 4);
        }
        let normalized: f32 = belief.normalized_weights().iter().sum();
        assert!((normalized - 1.0).abs() < 1e-6);
    }

    #[test]
    fn own_peek_rules_out_hands() {
        let real = real_game();
        let mut belief = belief(&real);
        let peek = real
            .legal_actions()
            .unwrap()
            .into_iter()
            .find(|a| a.card == Card::SeeTheFuture)
            .unwrap();
        let real = real.apply(peek).unwrap();
        belief.update(&real.state().info_set(Player::Player0)).unwrap();

        // Slap2x and DrawFromTheBottom are in the pile, so the opponent
        // holds Slap1x and Cat.
        assert_eq!(belief.len(), 1);
        let candidate = &belief.candidates()[0];
        assert_eq!(
            candidate.node.state().hand(Player::Player1),
            real.state().hand(Player::Player1)
        );
        assert!((candidate.weight - 1.0 / 24.0).abs() < 1e-6);
        assert_eq!(candidate.node.state().draw_pile().count_of(Card::Tbd), 1);
    }

    #[test]
    fn hidden_opponent_draw_branches_over_free_cards() {
        let real = real_game();
        let mut belief = belief(&real);
        let real = real.apply(Action::play(Player::Player0, Card::Skip)).unwrap();
        belief.update(&real.state().info_set(Player::Player0)).unwrap();
        assert_eq!(belief.len(), 6);
        assert_eq!(belief.total_weight(), 6.0);

        let real = real.apply(Action::draw(Player::Player1, Card::Slap2x)).unwrap();
        belief.update(&real.state().info_set(Player::Player0)).unwrap();
        // Four free cards per candidate; the kitten would have been seen.
        assert_eq!(belief.len(), 18);
        let expected = 6.0 * 3.0 / 16.0;
        assert!((belief.total_weight() - expected).abs() < 1e-5);
    }

    #[test]
    fn bad_policy_length_leaves_belief_untouched() {
        let real = real_game();
        let info = real.state().info_set(Player::Player0);
        let mut belief =
            BeliefState::new(&spec(), info, |_: &GameNode| vec![1.0f32]).unwrap();
        let real = real.apply(Action::play(Player::Player0, Card::Skip)).unwrap();
        belief.update(&real.state().info_set(Player::Player0)).unwrap();
        let before = belief.reach_weights();

        let real = real.apply(Action::draw(Player::Player1, Card::Slap2x)).unwrap();
        let err = belief
            .update(&real.state().info_set(Player::Player0))
            .unwrap_err();
        assert!(matches!(err, BeliefError::InvariantViolation { .. }));
        assert_eq!(belief.reach_weights(), before);
    }

    #[test]
    fn foreign_view_is_rejected() {
        let real = real_game();
        let mut belief = belief(&real);
        let err = belief
            .update(&real.state().info_set(Player::Player1))
            .unwrap_err();
        assert!(matches!(err, BeliefError::InvariantViolation { .. }));
    }

    #[test]
    fn unchanged_view_is_a_no_op() {
        let real = real_game();
        let mut belief = belief(&real);
        belief.update(&real.state().info_set(Player::Player0)).unwrap();
        assert_eq!(belief.len(), 6);
    }

    #[test]
    fn non_initial_view_is_a_configuration_error() {
        let real = real_game();
        let real = real.apply(Action::play(Player::Player0, Card::Skip)).unwrap();
        let info = real.state().info_set(Player::Player0);
        let err = BeliefState::new(&spec(), info, UniformOpponent).unwrap_err();
        assert!(matches!(err, BeliefError::Configuration(_)));
    }
}
