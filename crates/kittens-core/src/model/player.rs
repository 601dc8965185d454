use core::fmt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Player {
    Player0 = 0,
    Player1 = 1,
}

impl Player {
    pub const BOTH: [Player; 2] = [Player::Player0, Player::Player1];

    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Player::Player0),
            1 => Some(Player::Player1),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn opponent(self) -> Player {
        match self {
            Player::Player0 => Player::Player1,
            Player::Player1 => Player::Player0,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Player::Player0 => "Player0",
            Player::Player1 => "Player1",
        };
        f.write_str(label)
    }
}
