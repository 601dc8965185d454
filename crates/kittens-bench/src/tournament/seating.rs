/// Which configured agent sits in each seat, game by game.
pub struct Seating {
    swap: bool,
}

impl Seating {
    pub fn new(swap: bool) -> Self {
        Self { swap }
    }

    /// Agent index for seat 0 and seat 1 of game `game_index`. With swapping
    /// enabled odd games flip the order so both agents move first equally
    /// often.
    pub fn order(&self, game_index: usize) -> [usize; 2] {
        if self.swap && game_index % 2 == 1 {
            [1, 0]
        } else {
            [0, 1]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alternates_when_swapping() {
        let seating = Seating::new(true);
        assert_eq!(seating.order(0), [0, 1]);
        assert_eq!(seating.order(1), [1, 0]);
        assert_eq!(seating.order(2), [0, 1]);
    }

    #[test]
    fn fixed_without_swapping() {
        let seating = Seating::new(false);
        assert!((0..5).all(|game| seating.order(game) == [0, 1]));
    }
}
