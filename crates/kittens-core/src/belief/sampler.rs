//! Free-card pools and full determinizations of candidate nodes.

use super::state::{BeliefError, violation};
use crate::model::card::Card;
use crate::model::card_set::CardSet;
use crate::model::deck::DeckSpec;
use crate::model::game_state::GameState;
use crate::model::player::Player;
use crate::tree::GameNode;
use rand::Rng;
use rand::seq::SliceRandom;

/// Cards not placed anywhere in `state`: the deck minus both hands, the
/// discard pile and every determined draw pile slot. These are exactly
/// the cards that belong in the `Tbd` slots.
pub fn free_cards(spec: &DeckSpec, state: &GameState) -> CardSet {
    let mut free = spec.full_composition();
    free.remove_all(state.hand(Player::Player0));
    free.remove_all(state.hand(Player::Player1));
    free.remove_all(state.discard_pile().to_set());
    free.remove_all(state.draw_pile().known_cards());
    free
}

/// Deals `free` into the `Tbd` slots of `node`'s draw pile in a uniformly
/// random order. Player knowledge is left as it was.
///
/// `free` must hold exactly one card per `Tbd` slot; anything else means
/// the candidate lost track of a card.
pub fn fill_undetermined<R: Rng + ?Sized>(
    node: &GameNode,
    free: CardSet,
    rng: &mut R,
) -> Result<GameNode, BeliefError> {
    let state = node.state();
    let mut pile = state.draw_pile();
    let slots = pile.count_of(Card::Tbd);
    if free.len() != slots {
        return Err(violation(
            format!("{} free cards for {slots} undetermined slots", free.len()),
            format!("pile {pile:?}, free {free}"),
        ));
    }
    if slots == 0 {
        return Ok(node.clone());
    }
    let mut cards = free.to_vec();
    cards.shuffle(rng);
    let mut cards = cards.into_iter();
    for position in 0..pile.len() {
        if pile.nth(position) == Card::Tbd {
            if let Some(card) = cards.next() {
                pile.set_nth(position, card);
            }
        }
    }
    Ok(node.with_state(state.with_draw_pile(pile)))
}

#[cfg(test)]
mod tests {
    use super::{fill_undetermined, free_cards};
    use crate::belief::BeliefError;
    use crate::model::card::Card;
    use crate::model::card_set::CardSet;
    use crate::model::deck::DeckSpec;
    use crate::model::game_state::GameState;
    use crate::model::player::Player;
    use crate::tree::GameNode;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use std::collections::HashSet;

    fn spec() -> DeckSpec {
        DeckSpec::new(CardSet::test_deck(), 2)
    }

    fn node() -> GameNode {
        let hands = [
            CardSet::from_cards([Card::Defuse, Card::SeeTheFuture, Card::Skip]),
            CardSet::from_cards([Card::Defuse, Card::Cat, Card::Slap1x]),
        ];
        let state = GameState::with_undetermined_pile(hands, 4);
        GameNode::from_state(state, Player::Player0)
    }

    #[test]
    fn free_cards_fill_the_undetermined_slots() {
        let node = node();
        let free = free_cards(&spec(), node.state());
        assert_eq!(
            free,
            CardSet::from_cards([
                Card::Defuse,
                Card::ExplodingKitten,
                Card::Slap2x,
                Card::DrawFromTheBottom,
            ])
        );
        assert!(node.state().validate(&spec()).is_ok());
    }

    #[test]
    fn filling_is_valid_and_varied() {
        let node = node();
        let free = free_cards(&spec(), node.state());
        let mut rng = SmallRng::seed_from_u64(3);
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            let filled = fill_undetermined(&node, free, &mut rng).unwrap();
            let pile = filled.state().draw_pile();
            assert_eq!(pile.count_of(Card::Tbd), 0);
            assert_eq!(pile.to_set(), free);
            assert!(filled.state().validate(&spec()).is_ok());
            seen.insert(pile);
        }
        assert_eq!(seen.len(), 24, "every ordering of four distinct cards shows up");
    }

    #[test]
    fn filling_rejects_a_pool_of_the_wrong_size() {
        let node = node();
        let mut short = free_cards(&spec(), node.state());
        short.remove(Card::Defuse);
        let mut rng = SmallRng::seed_from_u64(8);
        assert!(matches!(
            fill_undetermined(&node, short, &mut rng),
            Err(BeliefError::InvariantViolation { .. })
        ));
    }
}
