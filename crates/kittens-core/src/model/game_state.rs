//! Authoritative hidden state of a game and the per-player views derived
//! from it.

use crate::model::action::{Action, ActionKind};
use crate::model::card::Card;
use crate::model::card_set::CardSet;
use crate::model::card_stack::CardStack;
use crate::model::deck::{Deal, DeckSpec};
use crate::model::history::History;
use crate::model::info_set::InfoSet;
use crate::model::player::Player;
use crate::model::private_info::PrivateInfo;
use thiserror::Error;

/// Number of cards revealed by SeeTheFuture.
pub const SEE_THE_FUTURE_DEPTH: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("{player} does not hold {card}")]
    CardNotInHand { player: Player, card: Card },
    #[error("cannot draw from an empty draw pile")]
    EmptyDrawPile,
    #[error("insert position {position} out of range for draw pile of {len}")]
    InvalidPosition { position: usize, len: usize },
    #[error("action {action} does not match the state: {reason}")]
    Mismatch { action: Action, reason: String },
    #[error("inconsistent state: {0}")]
    Inconsistent(String),
}

/// Hidden game state. Transitions return a new value and leave the
/// original untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GameState {
    draw_pile: CardStack,
    discard_pile: CardStack,
    info: [PrivateInfo; 2],
    history: History,
}

impl GameState {
    pub fn new(deal: &Deal) -> Self {
        let pile_len = deal.draw_pile.len();
        let info = [
            PrivateInfo::new(deal.hands[0], deal.hands[1].len(), pile_len),
            PrivateInfo::new(deal.hands[1], deal.hands[0].len(), pile_len),
        ];
        Self {
            draw_pile: deal.draw_pile,
            discard_pile: CardStack::new(),
            info,
            history: History::new(),
        }
    }

    /// Starting state whose draw pile is left entirely undetermined.
    pub fn with_undetermined_pile(hands: [CardSet; 2], pile_len: usize) -> Self {
        let info = [
            PrivateInfo::new(hands[0], hands[1].len(), pile_len),
            PrivateInfo::new(hands[1], hands[0].len(), pile_len),
        ];
        Self {
            draw_pile: CardStack::filled(pile_len, Card::Tbd),
            discard_pile: CardStack::new(),
            info,
            history: History::new(),
        }
    }

    pub fn draw_pile(&self) -> CardStack {
        self.draw_pile
    }

    pub fn discard_pile(&self) -> CardStack {
        self.discard_pile
    }

    pub fn draw_pile_composition(&self) -> CardSet {
        self.draw_pile.to_set()
    }

    pub fn hand(&self, player: Player) -> CardSet {
        self.info[player.index()].our_hand
    }

    pub fn private_info(&self, player: Player) -> &PrivateInfo {
        &self.info[player.index()]
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn last_action(&self) -> Option<Action> {
        self.history.last()
    }

    pub fn info_set(&self, player: Player) -> InfoSet {
        let info = &self.info[player.index()];
        InfoSet {
            player,
            hand: info.our_hand,
            opponent_hand: info.opponent_hand,
            known_draw_pile: info.known_draw_pile,
            history: self.history.viewed_by(player),
        }
    }

    /// Same state with the draw pile replaced. Used to fill in
    /// undetermined slots; player knowledge is untouched.
    pub fn with_draw_pile(&self, draw_pile: CardStack) -> Self {
        debug_assert_eq!(draw_pile.len(), self.draw_pile.len());
        Self { draw_pile, ..*self }
    }

    /// Resolves a shuffle: installs the new order and erases every
    /// player's positional knowledge.
    pub fn shuffled(&self, draw_pile: CardStack) -> Self {
        let mut next = self.with_draw_pile(draw_pile);
        for info in &mut next.info {
            info.clear_draw_pile_knowledge();
        }
        next
    }

    pub fn apply(&self, action: Action) -> Result<GameState, StateError> {
        let mut next = *self;
        let player = action.player;
        let opponent = player.opponent();
        match action.kind {
            ActionKind::DrawCard => {
                let drawn = next.take_card(action, 0)?;
                if drawn != action.cards_seen[0] {
                    return Err(mismatch(action, format!("top card is {drawn}")));
                }
            }
            ActionKind::PlayCard => {
                next.check_playable(player, action.card)?;
                next.info[player.index()].played_card(action.card);
                next.info[opponent.index()].opponent_played_card(action.card);
                next.discard_pile.push_top(action.card);
                next.apply_card_effect(action)?;
            }
            ActionKind::GiveCard => {
                next.check_playable(player, action.card)?;
                next.info[player.index()].gave_card(action.card);
                next.info[opponent.index()].received_card(action.card);
            }
            ActionKind::InsertExplodingKitten => {
                if !next.hand(player).contains(Card::ExplodingKitten) {
                    return Err(StateError::CardNotInHand {
                        player,
                        card: Card::ExplodingKitten,
                    });
                }
                let position = action.position as usize;
                if position > next.draw_pile.len() {
                    return Err(StateError::InvalidPosition {
                        position,
                        len: next.draw_pile.len(),
                    });
                }
                next.draw_pile.insert(position, Card::ExplodingKitten);
                next.info[player.index()].inserted_kitten(position);
                next.info[opponent.index()].opponent_inserted_kitten();
            }
        }
        next.history.push(action);
        Ok(next)
    }

    fn apply_card_effect(&mut self, action: Action) -> Result<(), StateError> {
        match action.card {
            Card::SeeTheFuture => {
                let seen = self.top_cards();
                if seen != action.cards_seen {
                    return Err(mismatch(action, "peeked cards differ from the pile".into()));
                }
                self.info[action.player.index()].saw_top_cards(seen);
            }
            Card::DrawFromTheBottom => {
                let bottom = self
                    .draw_pile
                    .len()
                    .checked_sub(1)
                    .ok_or(StateError::EmptyDrawPile)?;
                if action.position as usize != bottom {
                    return Err(mismatch(action, format!("bottom slot is {bottom}")));
                }
                let drawn = self.take_card(action, bottom)?;
                if drawn != action.cards_seen[0] {
                    return Err(mismatch(action, format!("bottom card is {drawn}")));
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Removes the card at `position` from the pile into the actor's hand.
    fn take_card(&mut self, action: Action, position: usize) -> Result<Card, StateError> {
        if position >= self.draw_pile.len() {
            return Err(StateError::EmptyDrawPile);
        }
        let card = self.draw_pile.remove(position);
        self.info[action.player.index()].drew_card(card, position);
        self.info[action.player.opponent().index()].opponent_drew_card(card, position);
        Ok(card)
    }

    fn check_playable(&self, player: Player, card: Card) -> Result<(), StateError> {
        if !self.hand(player).contains(card) {
            return Err(StateError::CardNotInHand { player, card });
        }
        let view = self.info[player.opponent().index()].opponent_hand;
        if !view.contains(card) && !view.contains(Card::Unknown) {
            return Err(StateError::Inconsistent(format!(
                "{} cannot account for {player} holding {card}",
                player.opponent()
            )));
        }
        Ok(())
    }

    /// The top cards of the pile as a peek would reveal them, padded with
    /// `Unknown` when the pile is short.
    pub fn top_cards(&self) -> [Card; SEE_THE_FUTURE_DEPTH] {
        let mut seen = [Card::Unknown; SEE_THE_FUTURE_DEPTH];
        for (slot, card) in seen.iter_mut().zip(self.draw_pile.iter()) {
            *slot = card;
        }
        seen
    }

    /// Probability of each card sitting on top of the pile, from `player`'s view.
    pub fn top_card_probabilities(&self, spec: &DeckSpec, player: Player) -> [f32; Card::COUNT] {
        self.slot_probabilities(spec, player, 0)
    }

    pub fn bottom_card_probabilities(
        &self,
        spec: &DeckSpec,
        player: Player,
    ) -> [f32; Card::COUNT] {
        let bottom = self.draw_pile.len().saturating_sub(1);
        self.slot_probabilities(spec, player, bottom)
    }

    fn slot_probabilities(
        &self,
        spec: &DeckSpec,
        player: Player,
        position: usize,
    ) -> [f32; Card::COUNT] {
        let mut probs = [0.0f32; Card::COUNT];
        let info = &self.info[player.index()];
        if position >= info.known_draw_pile.len() {
            return probs;
        }
        let known = info.known_draw_pile.nth(position);
        if !known.is_sentinel() {
            probs[known.index()] = 1.0;
            return probs;
        }

        // Cards whose location this player cannot pin down.
        let unaccounted = unaccounted_cards(spec, info, self.discard_pile);
        let total = unaccounted.len();
        if total == 0 {
            return probs;
        }
        for (card, count) in unaccounted.iter() {
            probs[card.index()] = count as f32 / total as f32;
        }
        probs
    }

    /// Checks card conservation and that both players' views agree with
    /// the truth. Undetermined pile slots must match the unplaced cards.
    pub fn validate(&self, spec: &DeckSpec) -> Result<(), StateError> {
        let mut placed = self.hand(Player::Player0).union(self.hand(Player::Player1));
        placed = placed.union(self.discard_pile.to_set());
        placed = placed.union(self.draw_pile.known_cards());
        let full = spec.full_composition();
        if placed.intersection(full) != placed {
            return Err(StateError::Inconsistent(format!(
                "placed cards {placed} exceed the deck {full}"
            )));
        }
        let mut free = full;
        free.remove_all(placed);
        let tbd = self.draw_pile.count_of(Card::Tbd);
        if free.len() != tbd {
            return Err(StateError::Inconsistent(format!(
                "{} unplaced cards for {tbd} undetermined slots",
                free.len()
            )));
        }
        if self.draw_pile.count_of(Card::Unknown) > 0 {
            return Err(StateError::Inconsistent("draw pile holds Unknown".into()));
        }

        for player in Player::BOTH {
            let info = &self.info[player.index()];
            let other = self.hand(player.opponent());
            if info.our_hand.contains(Card::Unknown) || info.our_hand.contains(Card::Tbd) {
                return Err(StateError::Inconsistent(format!(
                    "{player} holds an unresolved card: {}",
                    info.our_hand
                )));
            }
            if info.opponent_hand.len() != other.len() {
                return Err(StateError::Inconsistent(format!(
                    "{player} believes the opponent holds {} cards, not {}",
                    info.opponent_hand.len(),
                    other.len()
                )));
            }
            let mut seen = info.opponent_hand;
            seen.remove_n(Card::Unknown, seen.count(Card::Unknown));
            if seen.intersection(other) != seen {
                return Err(StateError::Inconsistent(format!(
                    "{player} believes the opponent holds {seen}, actual {other}"
                )));
            }
            if info.known_draw_pile.len() != self.draw_pile.len() {
                return Err(StateError::Inconsistent(format!(
                    "{player} tracks {} pile slots, actual {}",
                    info.known_draw_pile.len(),
                    self.draw_pile.len()
                )));
            }
            for (i, (known, actual)) in info
                .known_draw_pile
                .iter()
                .zip(self.draw_pile.iter())
                .enumerate()
            {
                if !known.is_sentinel() && actual != Card::Tbd && known != actual {
                    return Err(StateError::Inconsistent(format!(
                        "{player} believes slot {i} is {known}, actual {actual}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Cards `info`'s owner cannot locate: everything in play minus their
/// hand, what they know of the opponent's hand, the discard pile and the
/// pile slots they have seen.
pub(crate) fn unaccounted_cards(
    spec: &DeckSpec,
    info: &PrivateInfo,
    discard_pile: CardStack,
) -> CardSet {
    let mut cards = spec.full_composition();
    let located = info
        .our_hand
        .union(info.opponent_hand)
        .union(discard_pile.to_set())
        .union(info.known_draw_pile.known_cards());
    for (card, count) in located.iter() {
        if !card.is_sentinel() {
            cards.remove_n(card, count.min(cards.count(card)));
        }
    }
    cards
}

fn mismatch(action: Action, reason: String) -> StateError {
    StateError::Mismatch { action, reason }
}
