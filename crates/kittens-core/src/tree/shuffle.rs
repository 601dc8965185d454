//! Counting, ranking and enumerating distinct orderings of a card multiset.

use crate::model::card::Card;
use crate::model::card_set::CardSet;
use crate::model::card_stack::CardStack;
use once_cell::sync::Lazy;

/// Largest `n` whose factorial fits in a `u64`.
pub const MAX_FACTORIAL: usize = 20;

static FACTORIALS: Lazy<[u64; MAX_FACTORIAL + 1]> = Lazy::new(|| {
    let mut table = [1u64; MAX_FACTORIAL + 1];
    for n in 1..=MAX_FACTORIAL {
        table[n] = table[n - 1] * n as u64;
    }
    table
});

/// # Panics
/// Panics if `n` exceeds [`MAX_FACTORIAL`].
pub fn factorial(n: usize) -> u64 {
    assert!(n <= MAX_FACTORIAL, "{n}! does not fit in a u64");
    FACTORIALS[n]
}

/// Number of distinct orderings of `deck`: `n! / prod(count!)`.
pub fn count_distinct_shuffles(deck: &CardSet) -> u64 {
    let mut total = factorial(deck.len());
    for (_, count) in deck.iter() {
        total /= factorial(count as usize);
    }
    total
}

/// The `index`-th distinct ordering of `deck` in lexicographic order of
/// card identity, or `None` past the last one.
pub fn nth_shuffle(deck: &CardSet, mut index: u64) -> Option<CardStack> {
    if index >= count_distinct_shuffles(deck) {
        return None;
    }
    let mut remaining = *deck;
    let mut result = CardStack::new();
    while !remaining.is_empty() {
        let mut chosen = None;
        for (card, _) in remaining.iter() {
            let mut rest = remaining;
            rest.remove(card);
            let block = count_distinct_shuffles(&rest);
            if index < block {
                chosen = Some((card, rest));
                break;
            }
            index -= block;
        }
        let (card, rest) = chosen?;
        result.push_bottom(card);
        remaining = rest;
    }
    Some(result)
}

/// Calls `f` once for every distinct ordering of `deck`, in the same order
/// as [`nth_shuffle`].
pub fn enumerate_shuffles(deck: &CardSet, mut f: impl FnMut(CardStack)) {
    fn recurse(remaining: CardSet, prefix: CardStack, f: &mut impl FnMut(CardStack)) {
        if remaining.is_empty() {
            f(prefix);
            return;
        }
        for (card, _) in remaining.iter() {
            let mut rest = remaining;
            rest.remove(card);
            let mut next = prefix;
            next.push_bottom(card);
            recurse(rest, next, f);
        }
    }
    recurse(*deck, CardStack::new(), &mut f);
}

/// Distinct ways to fill the `Tbd` slots of `pile` at `positions` with
/// cards drawn without replacement from `free`. Each filling comes with
/// the number of ordered draws that produce it.
pub fn enumerate_fillings(
    pile: CardStack,
    free: CardSet,
    positions: &[usize],
) -> Vec<(CardStack, u64)> {
    fn recurse(
        pile: CardStack,
        free: CardSet,
        positions: &[usize],
        weight: u64,
        out: &mut Vec<(CardStack, u64)>,
    ) {
        let Some((&position, rest)) = positions.split_first() else {
            out.push((pile, weight));
            return;
        };
        if pile.nth(position) != Card::Tbd {
            recurse(pile, free, rest, weight, out);
            return;
        }
        for (card, count) in free.iter() {
            let mut next = pile;
            next.set_nth(position, card);
            let mut remaining = free;
            remaining.remove(card);
            recurse(next, remaining, rest, weight * u64::from(count), out);
        }
    }

    let mut out = Vec::new();
    recurse(pile, free, positions, 1, &mut out);
    out
}

/// Fillings of the undetermined slots among the top `k` cards of `pile`.
pub fn enumerate_top_arrangements(
    pile: CardStack,
    free: CardSet,
    k: usize,
) -> Vec<(CardStack, u64)> {
    let positions: Vec<usize> = (0..k.min(pile.len())).collect();
    enumerate_fillings(pile, free, &positions)
}
