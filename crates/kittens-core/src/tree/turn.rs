use core::fmt;
use serde::{Deserialize, Serialize};

/// Where a node sits in the turn state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnType {
    /// The player may play a card or draw to end the turn.
    PlayTurn,
    /// The player must give a card to the opponent, who played a Cat.
    GiveCard,
    /// The player drew the kitten and spent a Defuse; they choose where the
    /// kitten goes back.
    MustDefuse,
    /// A Shuffle was played; the next state is a uniformly random ordering.
    ShuffleDrawPile,
    GameOver,
}

/// Kind of node for search: chance, decision or terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Chance,
    Player,
    Terminal,
}

impl TurnType {
    pub const fn kind(self) -> NodeKind {
        match self {
            TurnType::PlayTurn | TurnType::GiveCard | TurnType::MustDefuse => NodeKind::Player,
            TurnType::ShuffleDrawPile => NodeKind::Chance,
            TurnType::GameOver => NodeKind::Terminal,
        }
    }
}

impl fmt::Display for TurnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TurnType::PlayTurn => "PlayTurn",
            TurnType::GiveCard => "GiveCard",
            TurnType::MustDefuse => "MustDefuse",
            TurnType::ShuffleDrawPile => "ShuffleDrawPile",
            TurnType::GameOver => "GameOver",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::{NodeKind, TurnType};

    #[test]
    fn shuffle_is_the_only_chance_turn() {
        assert_eq!(TurnType::ShuffleDrawPile.kind(), NodeKind::Chance);
        assert_eq!(TurnType::GameOver.kind(), NodeKind::Terminal);
        for turn in [TurnType::PlayTurn, TurnType::GiveCard, TurnType::MustDefuse] {
            assert_eq!(turn.kind(), NodeKind::Player);
        }
    }
}
