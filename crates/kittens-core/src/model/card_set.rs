//! Multiset of cards packed into a single word.

use crate::model::card::Card;
use core::fmt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const BITS_PER_COUNT: u32 = 5;
const COUNT_MASK: u64 = 0x1F;

/// Counts per card identity, five bits each. Any single hand of a deck
/// that passes validation fits, `Unknown` placeholders included.
///
/// Counts never go negative: removing a card that is not present panics,
/// since it means the caller lost track of where a card is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<Card, u8>", into = "BTreeMap<Card, u8>")]
pub struct CardSet(u64);

impl CardSet {
    pub const MAX_COUNT: u8 = COUNT_MASK as u8;

    pub const fn new() -> Self {
        Self(0)
    }

    pub fn from_cards(cards: impl IntoIterator<Item = Card>) -> Self {
        let mut set = Self::new();
        for card in cards {
            set.add(card);
        }
        set
    }

    /// The 19-card core deck. Defuses and the exploding kitten are dealt separately.
    pub fn core_deck() -> Self {
        let mut deck = Self::new();
        deck.add_n(Card::Skip, 5);
        deck.add_n(Card::Slap1x, 3);
        deck.add_n(Card::Slap2x, 1);
        deck.add_n(Card::SeeTheFuture, 3);
        deck.add_n(Card::Shuffle, 2);
        deck.add_n(Card::DrawFromTheBottom, 2);
        deck.add_n(Card::Cat, 3);
        deck
    }

    /// Small deck used for exhaustive experiments.
    pub fn test_deck() -> Self {
        Self::from_cards([
            Card::SeeTheFuture,
            Card::Slap1x,
            Card::Slap2x,
            Card::Skip,
            Card::DrawFromTheBottom,
            Card::Cat,
        ])
    }

    const fn shift(card: Card) -> u32 {
        card as u32 * BITS_PER_COUNT
    }

    pub const fn count(self, card: Card) -> u8 {
        ((self.0 >> Self::shift(card)) & COUNT_MASK) as u8
    }

    pub const fn contains(self, card: Card) -> bool {
        self.count(card) > 0
    }

    fn set_count(&mut self, card: Card, count: u8) {
        assert!(
            count <= Self::MAX_COUNT,
            "card count overflow: {count} x {card}"
        );
        let shift = Self::shift(card);
        self.0 = (self.0 & !(COUNT_MASK << shift)) | (u64::from(count) << shift);
    }

    pub fn add(&mut self, card: Card) {
        self.add_n(card, 1);
    }

    pub fn add_n(&mut self, card: Card, n: u8) {
        let count = self.count(card) + n;
        self.set_count(card, count);
    }

    /// Removes one copy of `card`.
    ///
    /// # Panics
    /// Panics if `card` is not in the set.
    pub fn remove(&mut self, card: Card) {
        self.remove_n(card, 1);
    }

    pub fn remove_n(&mut self, card: Card, n: u8) {
        let count = self.count(card);
        assert!(
            count >= n,
            "cannot remove {n} x {card} from {self}: only {count} present"
        );
        self.set_count(card, count - n);
    }

    /// Removes every card of `other`.
    ///
    /// # Panics
    /// Panics if any count in `other` exceeds the matching count here.
    pub fn remove_all(&mut self, other: CardSet) {
        for (card, n) in other.iter() {
            self.remove_n(card, n);
        }
    }

    pub fn union(self, other: CardSet) -> CardSet {
        let mut result = self;
        for (card, n) in other.iter() {
            result.add_n(card, n);
        }
        result
    }

    /// Cards in both sets, with the smaller count.
    pub fn intersection(self, other: CardSet) -> CardSet {
        let mut result = CardSet::new();
        for card in Card::ALL {
            result.set_count(card, self.count(card).min(other.count(card)));
        }
        result
    }

    pub fn len(self) -> usize {
        Card::ALL.iter().map(|&card| self.count(card) as usize).sum()
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of distinct card identities present.
    pub fn distinct(self) -> usize {
        self.iter().count()
    }

    /// `(card, count)` pairs in ascending card order, skipping absent cards.
    pub fn iter(self) -> impl Iterator<Item = (Card, u8)> {
        Card::ALL
            .into_iter()
            .map(move |card| (card, self.count(card)))
            .filter(|&(_, count)| count > 0)
    }

    pub fn cards(self) -> impl Iterator<Item = Card> {
        self.iter()
            .flat_map(|(card, count)| std::iter::repeat(card).take(count as usize))
    }

    pub fn to_vec(self) -> Vec<Card> {
        self.cards().collect()
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Inverse of [`CardSet::bits`]. `None` when bits outside the card
    /// fields are set.
    pub fn from_bits(bits: u64) -> Option<CardSet> {
        let mut set = CardSet::new();
        for card in Card::ALL {
            set.set_count(card, ((bits >> Self::shift(card)) & COUNT_MASK) as u8);
        }
        (set.0 == bits).then_some(set)
    }
}

impl FromIterator<Card> for CardSet {
    fn from_iter<T: IntoIterator<Item = Card>>(iter: T) -> Self {
        Self::from_cards(iter)
    }
}

impl From<CardSet> for BTreeMap<Card, u8> {
    fn from(set: CardSet) -> Self {
        set.iter().collect()
    }
}

impl TryFrom<BTreeMap<Card, u8>> for CardSet {
    type Error = String;

    fn try_from(map: BTreeMap<Card, u8>) -> Result<Self, Self::Error> {
        let mut set = CardSet::new();
        for (card, count) in map {
            if count > CardSet::MAX_COUNT {
                return Err(format!(
                    "at most {} copies of {card} are supported, got {count}",
                    CardSet::MAX_COUNT
                ));
            }
            set.add_n(card, count);
        }
        Ok(set)
    }
}

impl fmt::Display for CardSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (card, count)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{card}: {count}")?;
        }
        f.write_str("}")
    }
}
