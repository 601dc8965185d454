use crate::model::card::Card;
use crate::model::player::Player;
use core::fmt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ActionKind {
    DrawCard = 1,
    PlayCard = 2,
    GiveCard = 3,
    InsertExplodingKitten = 4,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        ActionKind::DrawCard,
        ActionKind::PlayCard,
        ActionKind::GiveCard,
        ActionKind::InsertExplodingKitten,
    ];

    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(ActionKind::DrawCard),
            2 => Some(ActionKind::PlayCard),
            3 => Some(ActionKind::GiveCard),
            4 => Some(ActionKind::InsertExplodingKitten),
            _ => None,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActionKind::DrawCard => "DrawCard",
            ActionKind::PlayCard => "PlayCard",
            ActionKind::GiveCard => "GiveCard",
            ActionKind::InsertExplodingKitten => "InsertExplodingKitten",
        };
        f.write_str(label)
    }
}

/// Three-byte packed action. The first byte is public, the other two
/// carry information private to the acting player.
pub type EncodedAction = [u8; 3];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid action kind {0}")]
    InvalidKind(u8),
    #[error("invalid player {0}")]
    InvalidPlayer(u8),
    #[error("invalid card nibble {0}")]
    InvalidCard(u8),
    #[error("truncated encoding: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("history too long: {0} actions")]
    TooLong(usize),
}

/// A single transition in the game.
///
/// `card` is public. `position` and `cards_seen` are only known to the
/// acting player:
/// - `DrawCard`: `cards_seen[0]` is the drawn card; `card` is
///   `ExplodingKitten` when the kitten was drawn, `Unknown` otherwise.
/// - `PlayCard(SeeTheFuture)`: `cards_seen` holds the peeked cards.
/// - `PlayCard(DrawFromTheBottom)`: `cards_seen[0]` is the drawn card and
///   `position` the slot it came from.
/// - `InsertExplodingKitten`: `position` is where the kitten went, 0 = top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    pub player: Player,
    pub kind: ActionKind,
    pub card: Card,
    pub position: u8,
    pub cards_seen: [Card; 3],
}

impl Action {
    pub const MAX_POSITION: u8 = 15;

    pub const fn new(player: Player, kind: ActionKind, card: Card) -> Self {
        Self {
            player,
            kind,
            card,
            position: 0,
            cards_seen: [Card::Unknown; 3],
        }
    }

    pub const fn play(player: Player, card: Card) -> Self {
        Self::new(player, ActionKind::PlayCard, card)
    }

    pub const fn draw(player: Player, drawn: Card) -> Self {
        let public = if matches!(drawn, Card::ExplodingKitten) {
            Card::ExplodingKitten
        } else {
            Card::Unknown
        };
        let mut action = Self::new(player, ActionKind::DrawCard, public);
        action.cards_seen[0] = drawn;
        action
    }

    pub const fn give(player: Player, card: Card) -> Self {
        Self::new(player, ActionKind::GiveCard, card)
    }

    pub const fn insert_kitten(player: Player, position: u8) -> Self {
        let mut action = Self::new(
            player,
            ActionKind::InsertExplodingKitten,
            Card::ExplodingKitten,
        );
        action.position = position;
        action
    }

    pub fn encode(self) -> EncodedAction {
        debug_assert!(self.position <= Self::MAX_POSITION);
        let byte0 = (self.player as u8) | ((self.kind as u8) << 1) | ((self.card as u8) << 4);
        let byte1 = (self.position & 0xF) | ((self.cards_seen[0] as u8) << 4);
        let byte2 = (self.cards_seen[1] as u8) | ((self.cards_seen[2] as u8) << 4);
        [byte0, byte1, byte2]
    }

    pub fn decode(bytes: EncodedAction) -> Result<Self, DecodeError> {
        let player = if bytes[0] & 1 == 0 {
            Player::Player0
        } else {
            Player::Player1
        };
        let kind_bits = (bytes[0] >> 1) & 0x7;
        let kind = ActionKind::from_u8(kind_bits).ok_or(DecodeError::InvalidKind(kind_bits))?;
        Ok(Self {
            player,
            kind,
            card: card_from_nibble(bytes[0] >> 4)?,
            position: bytes[1] & 0xF,
            cards_seen: [
                card_from_nibble(bytes[1] >> 4)?,
                card_from_nibble(bytes[2] & 0xF)?,
                card_from_nibble(bytes[2] >> 4)?,
            ],
        })
    }

    /// The action as `player` saw it: private fields of the other
    /// player's actions are erased.
    pub fn viewed_by(self, player: Player) -> Self {
        if self.player == player {
            self
        } else {
            Self {
                position: 0,
                cards_seen: [Card::Unknown; 3],
                ..self
            }
        }
    }

    /// The card actually drawn by a draw or a bottom draw.
    pub fn drawn_card(self) -> Option<Card> {
        match (self.kind, self.card) {
            (ActionKind::DrawCard, _) | (ActionKind::PlayCard, Card::DrawFromTheBottom) => {
                Some(self.cards_seen[0])
            }
            _ => None,
        }
    }

    pub fn is_slap(self) -> bool {
        self.kind == ActionKind::PlayCard && matches!(self.card, Card::Slap1x | Card::Slap2x)
    }
}

fn card_from_nibble(nibble: u8) -> Result<Card, DecodeError> {
    Card::from_u8(nibble).ok_or(DecodeError::InvalidCard(nibble))
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.player, self.kind, self.card)?;
        match self.kind {
            ActionKind::InsertExplodingKitten => write!(f, " @{}", self.position),
            ActionKind::DrawCard | ActionKind::PlayCard
                if self.cards_seen.iter().any(|c| *c != Card::Unknown) =>
            {
                write!(
                    f,
                    " saw [{}, {}, {}]",
                    self.cards_seen[0], self.cards_seen[1], self.cards_seen[2]
                )
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Action, ActionKind, DecodeError};
    use crate::model::card::Card;
    use crate::model::player::Player;

    #[test]
    fn encode_decode_every_public_combination() {
        for player in Player::BOTH {
            for kind in ActionKind::ALL {
                for card in Card::ALL {
                    for position in [0u8, 1, 7, Action::MAX_POSITION] {
                        let action = Action {
                            player,
                            kind,
                            card,
                            position,
                            cards_seen: [card, Card::Tbd, Card::Cat],
                        };
                        assert_eq!(Action::decode(action.encode()), Ok(action));
                    }
                }
            }
        }
    }

    #[test]
    fn encode_decode_every_seen_combination() {
        for a in Card::ALL {
            for b in Card::ALL {
                for c in Card::ALL {
                    let mut action = Action::play(Player::Player1, Card::SeeTheFuture);
                    action.cards_seen = [a, b, c];
                    assert_eq!(Action::decode(action.encode()), Ok(action));
                }
            }
        }
    }

    #[test]
    fn decode_rejects_bad_nibbles() {
        assert_eq!(Action::decode([0, 0, 0]), Err(DecodeError::InvalidKind(0)));
        assert_eq!(
            Action::decode([(2 << 1) | (0xF << 4), 0, 0]),
            Err(DecodeError::InvalidCard(0xF))
        );
    }

    #[test]
    fn public_byte_does_not_depend_on_private_fields() {
        let mut action = Action::insert_kitten(Player::Player0, 3);
        let public = action.encode()[0];
        action.position = 9;
        assert_eq!(action.encode()[0], public);
    }

    #[test]
    fn other_players_private_fields_are_censored() {
        let draw = Action::draw(Player::Player0, Card::Shuffle);
        assert_eq!(draw.viewed_by(Player::Player0), draw);
        let censored = draw.viewed_by(Player::Player1);
        assert_eq!(censored.cards_seen, [Card::Unknown; 3]);
        assert_eq!(censored.card, Card::Unknown);

        let kitten = Action::draw(Player::Player1, Card::ExplodingKitten);
        assert_eq!(kitten.viewed_by(Player::Player0).card, Card::ExplodingKitten);
    }
}
