use crate::model::action::DecodeError;
use crate::model::card_set::CardSet;
use crate::model::card_stack::CardStack;
use crate::model::history::History;
use crate::model::player::Player;
use core::fmt;

/// Everything one player can observe. Two states with equal info sets are
/// indistinguishable to that player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InfoSet {
    pub player: Player,
    pub hand: CardSet,
    pub opponent_hand: CardSet,
    pub known_draw_pile: CardStack,
    pub history: History,
}

impl InfoSet {
    const HEADER_LEN: usize = 1 + 8 + 8 + 16 + 1;

    /// Stable binary key, suitable for strategy tables.
    pub fn to_bytes(&self) -> Vec<u8> {
        let history = self.history.to_bytes();
        let mut out = Vec::with_capacity(Self::HEADER_LEN + history.len());
        out.push(self.player.index() as u8);
        out.extend_from_slice(&self.hand.bits().to_le_bytes());
        out.extend_from_slice(&self.opponent_hand.bits().to_le_bytes());
        out.extend_from_slice(&self.known_draw_pile.bits().to_le_bytes());
        out.push(self.known_draw_pile.len() as u8);
        out.extend_from_slice(&history);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < Self::HEADER_LEN {
            return Err(DecodeError::Truncated {
                expected: Self::HEADER_LEN,
                actual: bytes.len(),
            });
        }
        let player =
            Player::from_index(bytes[0] as usize).ok_or(DecodeError::InvalidPlayer(bytes[0]))?;
        let hand = card_set_from(&bytes[1..9])?;
        let opponent_hand = card_set_from(&bytes[9..17])?;
        let mut pile_bits = [0u8; 16];
        pile_bits.copy_from_slice(&bytes[17..33]);
        let known_draw_pile =
            CardStack::from_bits(u128::from_le_bytes(pile_bits), bytes[33] as usize)
                .ok_or(DecodeError::InvalidCard(bytes[33]))?;
        let history = History::from_bytes(&bytes[Self::HEADER_LEN..])?;
        Ok(Self {
            player,
            hand,
            opponent_hand,
            known_draw_pile,
            history,
        })
    }
}

fn card_set_from(bytes: &[u8]) -> Result<CardSet, DecodeError> {
    let mut word = [0u8; 8];
    word.copy_from_slice(bytes);
    CardSet::from_bits(u64::from_le_bytes(word)).ok_or(DecodeError::InvalidCard(0xF))
}

impl fmt::Display for InfoSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} hand={} opponent={} pile={} history=[{}]",
            self.player, self.hand, self.opponent_hand, self.known_draw_pile, self.history
        )
    }
}
