use crate::model::action::Action;
use crate::model::card::Card;
use crate::model::card_set::CardSet;
use crate::model::card_stack::CardStack;
use crate::model::history::History;
use crate::model::player::Player;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Defuses dealt to each player on top of their hand.
pub const DEFUSES_PER_HAND: u8 = 1;
/// Spare defuses shuffled into the draw pile.
pub const DEFUSES_IN_DRAW_PILE: u8 = 1;
/// Largest draw pile whose slots can be addressed by an action's 4-bit
/// position field.
pub const MAX_DRAW_PILE: usize = Action::MAX_POSITION as usize + 1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("deck may not contain {0}; defuses and the kitten are added when dealing")]
    InvalidDeckCard(Card),
    #[error("hand size {hand_size} is too large for a deck of {deck_len} cards")]
    HandTooLarge { hand_size: u8, deck_len: usize },
    #[error("draw pile of {len} cards exceeds the limit of {max}")]
    DrawPileTooLarge { len: usize, max: usize },
    #[error("{len} cards in play could overflow the discard pile limit of {max}")]
    DiscardPileTooLarge { len: usize, max: usize },
    #[error("worst-case game length {worst_case} exceeds history capacity {max}")]
    GameTooLong { worst_case: usize, max: usize },
    #[error("deal does not match the deck: {0}")]
    DealMismatch(String),
    #[error("card {0} cannot be played")]
    UnsupportedCard(Card),
    #[error("belief tracking must start from a fresh deal: {0}")]
    NotInitialInfoSet(String),
}

/// Deck composition and hand size for a two-player game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeckSpec {
    pub deck: CardSet,
    pub hand_size: u8,
}

impl Default for DeckSpec {
    fn default() -> Self {
        Self {
            deck: CardSet::core_deck(),
            hand_size: 4,
        }
    }
}

impl DeckSpec {
    pub const fn new(deck: CardSet, hand_size: u8) -> Self {
        Self { deck, hand_size }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (card, _) in self.deck.iter() {
            if card.is_sentinel() || matches!(card, Card::Defuse | Card::ExplodingKitten) {
                return Err(ConfigurationError::InvalidDeckCard(card));
            }
        }
        let deck_len = self.deck.len();
        if 2 * self.hand_size as usize > deck_len {
            return Err(ConfigurationError::HandTooLarge {
                hand_size: self.hand_size,
                deck_len,
            });
        }
        let pile = self.initial_draw_pile_len();
        if pile > MAX_DRAW_PILE {
            return Err(ConfigurationError::DrawPileTooLarge {
                len: pile,
                max: MAX_DRAW_PILE,
            });
        }
        // Every card but the kitten can end up discarded, and no hand can
        // then exceed a card set's per-identity count.
        let in_play = self.full_composition().len();
        if in_play > CardStack::MAX_LEN {
            return Err(ConfigurationError::DiscardPileTooLarge {
                len: in_play,
                max: CardStack::MAX_LEN,
            });
        }
        let worst_case = self.worst_case_actions();
        if worst_case > History::MAX_LEN {
            return Err(ConfigurationError::GameTooLong {
                worst_case,
                max: History::MAX_LEN,
            });
        }
        Ok(())
    }

    /// Every card in play: the deck, all defuses and the kitten.
    pub fn full_composition(&self) -> CardSet {
        let mut all = self.deck;
        all.add_n(Card::Defuse, 2 * DEFUSES_PER_HAND + DEFUSES_IN_DRAW_PILE);
        all.add(Card::ExplodingKitten);
        all
    }

    pub fn initial_draw_pile_len(&self) -> usize {
        self.deck.len() - 2 * self.hand_size as usize + DEFUSES_IN_DRAW_PILE as usize + 1
    }

    pub fn initial_hand_len(&self) -> usize {
        (self.hand_size + DEFUSES_PER_HAND) as usize
    }

    /// Upper bound on actions in one game: every card played once, every
    /// draw, one give per cat and one insertion per defuse.
    pub fn worst_case_actions(&self) -> usize {
        let defuses = (2 * DEFUSES_PER_HAND + DEFUSES_IN_DRAW_PILE) as usize;
        let plays = self.deck.len() + defuses;
        let draws = self.initial_draw_pile_len() + defuses;
        let gives = self.deck.count(Card::Cat) as usize;
        plays + draws + gives + defuses
    }

    /// Deals a random game.
    pub fn deal<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Deal, ConfigurationError> {
        self.validate()?;
        let mut cards = self.deck.to_vec();
        cards.shuffle(rng);
        let h = self.hand_size as usize;
        let mut hands = [
            CardSet::from_cards(cards[..h].iter().copied()),
            CardSet::from_cards(cards[h..2 * h].iter().copied()),
        ];
        for hand in &mut hands {
            hand.add_n(Card::Defuse, DEFUSES_PER_HAND);
        }
        let mut pile: Vec<Card> = cards[2 * h..].to_vec();
        pile.extend(std::iter::repeat(Card::Defuse).take(DEFUSES_IN_DRAW_PILE as usize));
        pile.push(Card::ExplodingKitten);
        pile.shuffle(rng);
        Deal::new(self, hands, CardStack::from_cards(pile))
    }

    pub fn deal_with_seed(&self, seed: u64) -> Result<Deal, ConfigurationError> {
        let mut rng = SmallRng::seed_from_u64(seed);
        self.deal(&mut rng)
    }
}

/// Concrete starting position: both hands (defuse included) and the draw
/// pile order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deal {
    pub spec: DeckSpec,
    pub hands: [CardSet; 2],
    pub draw_pile: CardStack,
}

impl Deal {
    pub fn new(
        spec: &DeckSpec,
        hands: [CardSet; 2],
        draw_pile: CardStack,
    ) -> Result<Self, ConfigurationError> {
        spec.validate()?;
        for player in Player::BOTH {
            let hand = hands[player.index()];
            if hand.len() != spec.initial_hand_len() {
                return Err(ConfigurationError::DealMismatch(format!(
                    "{player} holds {} cards, expected {}",
                    hand.len(),
                    spec.initial_hand_len()
                )));
            }
            if hand.count(Card::Defuse) < DEFUSES_PER_HAND {
                return Err(ConfigurationError::DealMismatch(format!(
                    "{player} was not dealt a defuse"
                )));
            }
        }
        let dealt = hands[0].union(hands[1]).union(draw_pile.to_set());
        if dealt != spec.full_composition() {
            return Err(ConfigurationError::DealMismatch(format!(
                "dealt {dealt}, expected {}",
                spec.full_composition()
            )));
        }
        Ok(Self {
            spec: *spec,
            hands,
            draw_pile,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigurationError, DeckSpec, MAX_DRAW_PILE};
    use crate::model::card::Card;
    use crate::model::card_set::CardSet;
    use crate::model::card_stack::CardStack;
    use crate::model::history::History;

    #[test]
    fn default_deck_deals_thirteen_card_pile() {
        let spec = DeckSpec::default();
        assert!(spec.validate().is_ok());
        assert_eq!(spec.initial_draw_pile_len(), 13);
        assert_eq!(spec.full_composition().len(), 23);
        assert!(spec.worst_case_actions() <= crate::model::history::History::MAX_LEN);
    }

    #[test]
    fn deal_conserves_cards() {
        let spec = DeckSpec::default();
        let deal = spec.deal_with_seed(7).unwrap();
        assert_eq!(deal.draw_pile.len(), 13);
        assert_eq!(deal.draw_pile.count_of(Card::ExplodingKitten), 1);
        for hand in deal.hands {
            assert_eq!(hand.len(), 5);
            assert!(hand.contains(Card::Defuse));
        }
    }

    #[test]
    fn seeded_deals_are_deterministic() {
        let spec = DeckSpec::default();
        assert_eq!(spec.deal_with_seed(3), spec.deal_with_seed(3));
    }

    #[test]
    fn rejects_special_cards_in_deck() {
        let spec = DeckSpec::new(CardSet::from_cards([Card::Skip, Card::Defuse]), 0);
        assert_eq!(
            spec.validate(),
            Err(ConfigurationError::InvalidDeckCard(Card::Defuse))
        );
    }

    #[test]
    fn rejects_oversized_hands() {
        let spec = DeckSpec::new(CardSet::test_deck(), 4);
        assert!(matches!(
            spec.validate(),
            Err(ConfigurationError::HandTooLarge { .. })
        ));
    }

    #[test]
    fn rejects_decks_that_overflow_the_discard_pile() {
        let mut deck = CardSet::new();
        deck.add_n(Card::Skip, 15);
        deck.add_n(Card::Slap1x, 15);
        let spec = DeckSpec::new(deck, 8);
        assert_eq!(spec.initial_draw_pile_len(), MAX_DRAW_PILE);
        assert_eq!(
            spec.validate(),
            Err(ConfigurationError::DiscardPileTooLarge {
                len: 34,
                max: CardStack::MAX_LEN,
            })
        );
    }

    #[test]
    fn rejects_games_longer_than_the_history() {
        let mut deck = CardSet::new();
        deck.add_n(Card::Cat, 12);
        deck.add_n(Card::Skip, 16);
        let spec = DeckSpec::new(deck, 7);
        assert_eq!(spec.full_composition().len(), CardStack::MAX_LEN);
        assert_eq!(
            spec.validate(),
            Err(ConfigurationError::GameTooLong {
                worst_case: 65,
                max: History::MAX_LEN,
            })
        );

        deck.remove(Card::Cat);
        deck.add(Card::Skip);
        assert!(DeckSpec::new(deck, 7).validate().is_ok());
    }

    #[test]
    fn rejects_oversized_draw_pile() {
        let mut deck = CardSet::core_deck();
        deck.add_n(Card::Skip, 8);
        let spec = DeckSpec::new(deck, 1);
        assert!(matches!(
            spec.validate(),
            Err(ConfigurationError::DrawPileTooLarge { .. })
        ));
    }
}
