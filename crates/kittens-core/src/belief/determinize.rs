//! Fixing the undetermined draw pile slots an action is about to read.
//!
//! Draws, bottom draws and peeks look at concrete cards. Before the tree can
//! build those children the touched `Tbd` slots need a value: the observed
//! card when the observer saw it, or every possible filling otherwise.

use crate::model::action::{Action, ActionKind};
use crate::model::card::Card;
use crate::model::card_set::CardSet;
use crate::model::card_stack::CardStack;
use crate::model::game_state::SEE_THE_FUTURE_DEPTH;
use crate::model::player::Player;
use crate::tree::GameNode;
use crate::tree::shuffle::enumerate_fillings;

/// Pile slots `action` reads, top first.
pub fn touched_positions(action: Action, pile_len: usize) -> Vec<usize> {
    match (action.kind, action.card) {
        (ActionKind::DrawCard, _) => (0..pile_len.min(1)).collect(),
        (ActionKind::PlayCard, Card::SeeTheFuture) => {
            (0..pile_len.min(SEE_THE_FUTURE_DEPTH)).collect()
        }
        (ActionKind::PlayCard, Card::DrawFromTheBottom) => {
            pile_len.checked_sub(1).into_iter().collect()
        }
        _ => Vec::new(),
    }
}

/// The cards `observer` knows occupy the touched slots, if any.
fn observed_cards(action: Action, observer: Player, slots: usize) -> Option<Vec<Card>> {
    if action.player == observer {
        return Some(action.cards_seen[..slots].to_vec());
    }
    // The kitten is drawn face up.
    if action.kind == ActionKind::DrawCard && action.card == Card::ExplodingKitten {
        return Some(vec![Card::ExplodingKitten]);
    }
    None
}

/// Splits `node` into determinized copies ready for `action`, each with
/// its share of `weight`.
///
/// Observed cards resolve in place and scale the weight by the chance of
/// drawing them from `free`; a candidate that cannot hold them yields
/// nothing. Unobserved slots expand into every distinct filling, weighted
/// by how many ordered draws produce it, so the copies sum to `weight`.
pub fn determinize(
    node: &GameNode,
    weight: f32,
    action: Action,
    observer: Player,
    free: CardSet,
) -> Vec<(GameNode, f32)> {
    let state = node.state();
    let pile = state.draw_pile();
    let positions = touched_positions(action, pile.len());
    if positions.iter().all(|&p| pile.nth(p) != Card::Tbd) {
        return vec![(node.clone(), weight)];
    }

    if let Some(cards) = observed_cards(action, observer, positions.len()) {
        return match resolve(pile, free, &positions, &cards) {
            Some((resolved, likelihood)) => vec![(
                node.with_state(state.with_draw_pile(resolved)),
                (weight as f64 * likelihood) as f32,
            )],
            None => Vec::new(),
        };
    }

    let undetermined = positions.iter().filter(|&&p| pile.nth(p) == Card::Tbd).count();
    let draws = falling_factorial(free.len(), undetermined) as f64;
    enumerate_fillings(pile, free, &positions)
        .into_iter()
        .map(|(filled, ways)| {
            (
                node.with_state(state.with_draw_pile(filled)),
                (weight as f64 * ways as f64 / draws) as f32,
            )
        })
        .collect()
}

/// Writes `cards` into the `Tbd` slots among `positions`, returning the
/// probability of that draw from `free`.
fn resolve(
    mut pile: CardStack,
    mut free: CardSet,
    positions: &[usize],
    cards: &[Card],
) -> Option<(CardStack, f64)> {
    let mut likelihood = 1.0;
    for (&position, &card) in positions.iter().zip(cards) {
        let slot = pile.nth(position);
        if slot != Card::Tbd {
            if slot != card {
                return None;
            }
            continue;
        }
        let count = free.count(card);
        if count == 0 {
            return None;
        }
        likelihood *= count as f64 / free.len() as f64;
        free.remove(card);
        pile.set_nth(position, card);
    }
    Some((pile, likelihood))
}

fn falling_factorial(n: usize, k: usize) -> u64 {
    (0..k).map(|i| n.saturating_sub(i) as u64).product()
}
