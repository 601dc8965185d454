//! Ordered, bounded pile of cards packed into a single `u128`.

use crate::model::card::Card;
use crate::model::card_set::CardSet;
use core::fmt;

const BITS_PER_SLOT: u32 = 4;
const SLOT_MASK: u128 = 0xF;

/// An ordered pile of up to [`CardStack::MAX_LEN`] cards. Slot 0 is the top.
///
/// Slots may hold `Unknown` or `Tbd` in place of a real card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CardStack {
    bits: u128,
    len: u8,
}

impl CardStack {
    pub const MAX_LEN: usize = (u128::BITS / BITS_PER_SLOT) as usize;

    pub const fn new() -> Self {
        Self { bits: 0, len: 0 }
    }

    /// A stack of `len` copies of `card`, typically `Unknown` or `Tbd`.
    pub fn filled(len: usize, card: Card) -> Self {
        let mut stack = Self::new();
        for _ in 0..len {
            stack.push_bottom(card);
        }
        stack
    }

    pub fn from_cards(cards: impl IntoIterator<Item = Card>) -> Self {
        let mut stack = Self::new();
        for card in cards {
            stack.push_bottom(card);
        }
        stack
    }

    pub const fn len(self) -> usize {
        self.len as usize
    }

    pub const fn is_empty(self) -> bool {
        self.len == 0
    }

    fn check_position(self, n: usize) {
        assert!(
            n < self.len(),
            "position {n} out of range for stack of {}",
            self.len
        );
    }

    const fn slot(self, n: usize) -> Card {
        let value = ((self.bits >> (n as u32 * BITS_PER_SLOT)) & SLOT_MASK) as u8;
        match Card::from_u8(value) {
            Some(card) => card,
            None => Card::Unknown,
        }
    }

    /// # Panics
    /// Panics if `n` is past the end of the stack.
    pub fn nth(self, n: usize) -> Card {
        self.check_position(n);
        self.slot(n)
    }

    pub fn top(self) -> Option<Card> {
        (!self.is_empty()).then(|| self.slot(0))
    }

    pub fn bottom(self) -> Option<Card> {
        (!self.is_empty()).then(|| self.slot(self.len() - 1))
    }

    /// Replaces a single slot without shifting the others.
    pub fn set_nth(&mut self, n: usize, card: Card) {
        self.check_position(n);
        let shift = n as u32 * BITS_PER_SLOT;
        self.bits = (self.bits & !(SLOT_MASK << shift)) | ((card as u128) << shift);
    }

    /// Inserts `card` at position `n`, shifting slot `n` and below one place down.
    /// `n == len()` appends to the bottom.
    pub fn insert(&mut self, n: usize, card: Card) {
        assert!(
            n <= self.len(),
            "insert position {n} out of range for stack of {}",
            self.len
        );
        assert!(self.len() < Self::MAX_LEN, "card stack is full");
        let shift = n as u32 * BITS_PER_SLOT;
        let above = self.bits & low_mask(shift);
        let below = self.bits & !low_mask(shift);
        self.bits = above | ((card as u128) << shift) | (below << BITS_PER_SLOT);
        self.len += 1;
    }

    /// Removes and returns the card at position `n`, shifting later slots up.
    pub fn remove(&mut self, n: usize) -> Card {
        self.check_position(n);
        let card = self.slot(n);
        let shift = n as u32 * BITS_PER_SLOT;
        let above = self.bits & low_mask(shift);
        let below = self.bits & !low_mask(shift + BITS_PER_SLOT);
        self.bits = above | (below >> BITS_PER_SLOT);
        self.len -= 1;
        card
    }

    pub fn push_top(&mut self, card: Card) {
        self.insert(0, card);
    }

    pub fn push_bottom(&mut self, card: Card) {
        self.insert(self.len(), card);
    }

    pub fn iter(self) -> impl Iterator<Item = Card> {
        (0..self.len()).map(move |n| self.slot(n))
    }

    pub fn to_vec(self) -> Vec<Card> {
        self.iter().collect()
    }

    /// Composition of the stack, sentinels included.
    pub fn to_set(self) -> CardSet {
        self.iter().collect()
    }

    /// Real cards in the stack, skipping `Unknown` and `Tbd` slots.
    pub fn known_cards(self) -> CardSet {
        self.iter().filter(|card| !card.is_sentinel()).collect()
    }

    pub fn count_of(self, card: Card) -> usize {
        self.iter().filter(|&c| c == card).count()
    }

    pub fn position_of(self, card: Card) -> Option<usize> {
        self.iter().position(|c| c == card)
    }

    pub const fn bits(self) -> u128 {
        self.bits
    }

    /// Rebuilds a stack from its packed representation.
    pub fn from_bits(bits: u128, len: usize) -> Option<Self> {
        if len > Self::MAX_LEN {
            return None;
        }
        let used = low_mask(len as u32 * BITS_PER_SLOT);
        if bits & !used != 0 {
            return None;
        }
        let stack = Self {
            bits,
            len: len as u8,
        };
        let valid = (0..len).all(|n| {
            let value = ((bits >> (n as u32 * BITS_PER_SLOT)) & SLOT_MASK) as u8;
            Card::from_u8(value).is_some()
        });
        valid.then_some(stack)
    }
}

const fn low_mask(bits: u32) -> u128 {
    if bits >= u128::BITS {
        u128::MAX
    } else {
        (1u128 << bits) - 1
    }
}

impl FromIterator<Card> for CardStack {
    fn from_iter<T: IntoIterator<Item = Card>>(iter: T) -> Self {
        Self::from_cards(iter)
    }
}

impl fmt::Display for CardStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, card) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{card}")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::CardStack;
    use crate::model::card::Card;

    fn sample() -> CardStack {
        CardStack::from_cards([Card::Skip, Card::Cat, Card::Shuffle])
    }

    #[test]
    fn nth_reads_from_the_top() {
        let stack = sample();
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.nth(0), Card::Skip);
        assert_eq!(stack.nth(2), Card::Shuffle);
        assert_eq!(stack.top(), Some(Card::Skip));
        assert_eq!(stack.bottom(), Some(Card::Shuffle));
    }

    #[test]
    fn set_nth_does_not_shift() {
        let mut stack = sample();
        stack.set_nth(1, Card::Defuse);
        assert_eq!(stack.to_vec(), vec![Card::Skip, Card::Defuse, Card::Shuffle]);
    }

    #[test]
    fn insert_shifts_later_slots_down() {
        let mut stack = sample();
        stack.insert(1, Card::ExplodingKitten);
        assert_eq!(
            stack.to_vec(),
            vec![Card::Skip, Card::ExplodingKitten, Card::Cat, Card::Shuffle]
        );
        stack.insert(4, Card::Defuse);
        assert_eq!(stack.bottom(), Some(Card::Defuse));
        stack.insert(0, Card::Slap1x);
        assert_eq!(stack.top(), Some(Card::Slap1x));
        assert_eq!(stack.len(), 6);
    }

    #[test]
    fn remove_shifts_later_slots_up() {
        let mut stack = sample();
        assert_eq!(stack.remove(1), Card::Cat);
        assert_eq!(stack.to_vec(), vec![Card::Skip, Card::Shuffle]);
        assert_eq!(stack.remove(0), Card::Skip);
        assert_eq!(stack.remove(0), Card::Shuffle);
        assert!(stack.is_empty());
        assert_eq!(stack, CardStack::new());
    }

    #[test]
    fn fills_to_capacity() {
        let mut stack = CardStack::filled(CardStack::MAX_LEN - 1, Card::Tbd);
        stack.push_bottom(Card::Cat);
        assert_eq!(stack.len(), CardStack::MAX_LEN);
        assert_eq!(stack.bottom(), Some(Card::Cat));
        assert_eq!(stack.remove(CardStack::MAX_LEN - 1), Card::Cat);
        assert_eq!(stack.count_of(Card::Tbd), CardStack::MAX_LEN - 1);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn reading_past_the_end_panics() {
        sample().nth(3);
    }

    #[test]
    fn known_cards_skip_sentinels() {
        let stack = CardStack::from_cards([Card::Tbd, Card::Cat, Card::Unknown]);
        assert_eq!(stack.known_cards().to_vec(), vec![Card::Cat]);
        assert_eq!(stack.to_set().len(), 3);
    }

    #[test]
    fn bits_roundtrip() {
        let stack = sample();
        assert_eq!(CardStack::from_bits(stack.bits(), stack.len()), Some(stack));
        assert_eq!(CardStack::from_bits(0xF, 1), None);
    }
}
