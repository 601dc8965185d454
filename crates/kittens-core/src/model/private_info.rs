use crate::model::card::Card;
use crate::model::card_set::CardSet;
use crate::model::card_stack::CardStack;

/// What one player knows: their own hand, what they have learned about
/// the opponent's hand, and which draw pile slots they have seen.
///
/// `known_draw_pile` always has the same length as the real draw pile,
/// with `Unknown` in slots the player has not seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PrivateInfo {
    pub our_hand: CardSet,
    pub opponent_hand: CardSet,
    pub known_draw_pile: CardStack,
}

impl PrivateInfo {
    pub fn new(our_hand: CardSet, opponent_hand_len: usize, draw_pile_len: usize) -> Self {
        let mut opponent_hand = CardSet::new();
        opponent_hand.add(Card::Defuse);
        opponent_hand.add_n(Card::Unknown, opponent_hand_len.saturating_sub(1) as u8);
        Self {
            our_hand,
            opponent_hand,
            known_draw_pile: CardStack::filled(draw_pile_len, Card::Unknown),
        }
    }

    pub fn played_card(&mut self, card: Card) {
        self.our_hand.remove(card);
    }

    pub fn opponent_played_card(&mut self, card: Card) {
        self.forget_opponent_card(card);
    }

    /// We drew `card` from `position` of the draw pile.
    pub fn drew_card(&mut self, card: Card, position: usize) {
        self.our_hand.add(card);
        self.known_draw_pile.remove(position);
    }

    /// The opponent drew from `position`. If we had seen that slot we now
    /// know the card; the kitten is always seen.
    pub fn opponent_drew_card(&mut self, card: Card, position: usize) {
        let known = self.known_draw_pile.remove(position);
        if !known.is_sentinel() {
            self.opponent_hand.add(known);
        } else if card == Card::ExplodingKitten {
            self.opponent_hand.add(Card::ExplodingKitten);
        } else {
            self.opponent_hand.add(Card::Unknown);
        }
    }

    /// Records the top cards of the draw pile after a peek. `Unknown`
    /// entries past the end of a short pile are ignored.
    pub fn saw_top_cards(&mut self, cards: [Card; 3]) {
        let n = cards.len().min(self.known_draw_pile.len());
        for (i, card) in cards.into_iter().take(n).enumerate() {
            self.known_draw_pile.set_nth(i, card);
        }
    }

    pub fn gave_card(&mut self, card: Card) {
        self.our_hand.remove(card);
        self.opponent_hand.add(card);
    }

    pub fn received_card(&mut self, card: Card) {
        self.our_hand.add(card);
        self.forget_opponent_card(card);
    }

    pub fn inserted_kitten(&mut self, position: usize) {
        self.our_hand.remove(Card::ExplodingKitten);
        self.known_draw_pile.insert(position, Card::ExplodingKitten);
    }

    /// The opponent hid the kitten somewhere we did not see, so every slot
    /// we knew may have moved.
    pub fn opponent_inserted_kitten(&mut self) {
        self.opponent_hand.remove(Card::ExplodingKitten);
        let len = self.known_draw_pile.len() + 1;
        self.known_draw_pile = CardStack::filled(len, Card::Unknown);
    }

    pub fn clear_draw_pile_knowledge(&mut self) {
        self.known_draw_pile = CardStack::filled(self.known_draw_pile.len(), Card::Unknown);
    }

    fn forget_opponent_card(&mut self, card: Card) {
        if self.opponent_hand.contains(card) {
            self.opponent_hand.remove(card);
        } else {
            self.opponent_hand.remove(Card::Unknown);
        }
    }
}
