use core::fmt;
use serde::{Deserialize, Serialize};

/// Card identities. Every value fits in a nibble so cards can be packed
/// into sets and stacks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum Card {
    /// Nobody knows what card this is.
    #[default]
    Unknown = 0,
    ExplodingKitten = 1,
    Defuse = 2,
    Skip = 3,
    Slap1x = 4,
    Slap2x = 5,
    SeeTheFuture = 6,
    Shuffle = 7,
    DrawFromTheBottom = 8,
    Cat = 9,
    /// Left undetermined on purpose by the belief engine.
    Tbd = 10,
}

impl Card {
    pub const COUNT: usize = 11;

    pub const ALL: [Card; Card::COUNT] = [
        Card::Unknown,
        Card::ExplodingKitten,
        Card::Defuse,
        Card::Skip,
        Card::Slap1x,
        Card::Slap2x,
        Card::SeeTheFuture,
        Card::Shuffle,
        Card::DrawFromTheBottom,
        Card::Cat,
        Card::Tbd,
    ];

    /// Cards a player may hold and play during their turn.
    pub const PLAYABLE: [Card; 8] = [
        Card::Defuse,
        Card::Skip,
        Card::Slap1x,
        Card::Slap2x,
        Card::SeeTheFuture,
        Card::Shuffle,
        Card::DrawFromTheBottom,
        Card::Cat,
    ];

    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Card::Unknown),
            1 => Some(Card::ExplodingKitten),
            2 => Some(Card::Defuse),
            3 => Some(Card::Skip),
            4 => Some(Card::Slap1x),
            5 => Some(Card::Slap2x),
            6 => Some(Card::SeeTheFuture),
            7 => Some(Card::Shuffle),
            8 => Some(Card::DrawFromTheBottom),
            9 => Some(Card::Cat),
            10 => Some(Card::Tbd),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    /// True for `Unknown` and `Tbd`, which stand in for a real card.
    pub const fn is_sentinel(self) -> bool {
        matches!(self, Card::Unknown | Card::Tbd)
    }

    pub const fn is_playable(self) -> bool {
        !self.is_sentinel() && !matches!(self, Card::ExplodingKitten)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Card::Unknown => "Unknown",
            Card::ExplodingKitten => "ExplodingKitten",
            Card::Defuse => "Defuse",
            Card::Skip => "Skip",
            Card::Slap1x => "Slap1x",
            Card::Slap2x => "Slap2x",
            Card::SeeTheFuture => "SeeTheFuture",
            Card::Shuffle => "Shuffle",
            Card::DrawFromTheBottom => "DrawFromTheBottom",
            Card::Cat => "Cat",
            Card::Tbd => "TBD",
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::Card;

    #[test]
    fn every_card_fits_in_a_nibble() {
        for card in Card::ALL {
            assert!((card as u8) < 16);
        }
    }

    #[test]
    fn index_roundtrip() {
        for (i, card) in Card::ALL.iter().enumerate() {
            assert_eq!(Card::from_u8(i as u8), Some(*card));
            assert_eq!(card.index(), i);
        }
        assert_eq!(Card::from_u8(11), None);
    }

    #[test]
    fn sentinels_are_not_playable() {
        assert!(!Card::Unknown.is_playable());
        assert!(!Card::Tbd.is_playable());
        assert!(!Card::ExplodingKitten.is_playable());
        for card in Card::PLAYABLE {
            assert!(card.is_playable(), "{card}");
        }
    }
}
