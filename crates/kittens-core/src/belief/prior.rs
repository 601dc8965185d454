use crate::model::card::Card;
use crate::model::card_set::CardSet;
use serde::{Deserialize, Serialize};

/// Initial weight given to each opponent hand allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealPrior {
    /// Every distinct allocation weighs the same.
    #[default]
    Uniform,
    /// Each allocation weighs as many deals as produce it.
    Combinatorial,
}

impl DealPrior {
    pub fn weight(self, ways: u64) -> f32 {
        match self {
            DealPrior::Uniform => 1.0,
            DealPrior::Combinatorial => ways as f32,
        }
    }
}

/// Every distinct hand of `size` cards drawn from `pool`, with the number
/// of ways to pick it (a product of binomial coefficients).
pub fn opponent_hands(pool: CardSet, size: usize) -> Vec<(CardSet, u64)> {
    fn recurse(
        available: &[(Card, u8)],
        remaining: usize,
        hand: CardSet,
        ways: u64,
        out: &mut Vec<(CardSet, u64)>,
    ) {
        if remaining == 0 {
            out.push((hand, ways));
            return;
        }
        let Some((&(card, count), rest)) = available.split_first() else {
            return;
        };
        let rest_len: usize = rest.iter().map(|&(_, n)| n as usize).sum();
        let min_take = remaining.saturating_sub(rest_len);
        let max_take = remaining.min(count as usize);
        for take in min_take..=max_take {
            let mut next = hand;
            next.add_n(card, take as u8);
            recurse(
                rest,
                remaining - take,
                next,
                ways * binomial(count as u64, take as u64),
                out,
            );
        }
    }

    let available: Vec<(Card, u8)> = pool.iter().collect();
    let mut out = Vec::new();
    if size <= pool.len() {
        recurse(&available, size, CardSet::new(), 1, &mut out);
    }
    out
}

fn binomial(n: u64, k: u64) -> u64 {
    let k = k.min(n - k);
    (0..k).fold(1, |acc, i| acc * (n - i) / (i + 1))
}

#[cfg(test)]
mod tests {
    use super::{DealPrior, binomial, opponent_hands};
    use crate::model::card::Card;
    use crate::model::card_set::CardSet;

    #[test]
    fn binomials() {
        assert_eq!(binomial(5, 0), 1);
        assert_eq!(binomial(5, 2), 10);
        assert_eq!(binomial(19, 4), 3876);
    }

    #[test]
    fn hands_cover_every_multiset_once() {
        let pool = CardSet::from_cards([Card::Skip, Card::Skip, Card::Cat, Card::Shuffle]);
        let hands = opponent_hands(pool, 2);
        // {Skip,Skip} {Skip,Cat} {Skip,Shuffle} {Cat,Shuffle}
        assert_eq!(hands.len(), 4);
        let total: u64 = hands.iter().map(|&(_, ways)| ways).sum();
        assert_eq!(total, binomial(4, 2));
        for (hand, ways) in &hands {
            assert_eq!(hand.len(), 2);
            let expected = if hand.count(Card::Skip) == 1 { 2 } else { 1 };
            assert_eq!(*ways, expected, "{hand}");
        }
    }

    #[test]
    fn oversized_hands_yield_nothing() {
        let pool = CardSet::from_cards([Card::Skip]);
        assert!(opponent_hands(pool, 2).is_empty());
        assert_eq!(opponent_hands(pool, 0), vec![(CardSet::new(), 1)]);
    }

    #[test]
    fn prior_weights() {
        assert_eq!(DealPrior::default(), DealPrior::Uniform);
        assert_eq!(DealPrior::Uniform.weight(6), 1.0);
        assert_eq!(DealPrior::Combinatorial.weight(6), 6.0);
    }
}
