use crate::model::action::{Action, DecodeError, EncodedAction};
use crate::model::player::Player;
use core::fmt;

/// Bounded sequence of packed actions, oldest first.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct History {
    actions: [EncodedAction; History::MAX_LEN],
    len: u8,
}

impl History {
    pub const MAX_LEN: usize = 64;

    pub const fn new() -> Self {
        Self {
            actions: [[0; 3]; History::MAX_LEN],
            len: 0,
        }
    }

    pub const fn len(&self) -> usize {
        self.len as usize
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// # Panics
    /// Panics when the history is full. Deck validation bounds game length
    /// well below capacity.
    pub fn push(&mut self, action: Action) {
        assert!(self.len() < Self::MAX_LEN, "history is full");
        self.actions[self.len()] = action.encode();
        self.len += 1;
    }

    pub fn get(&self, index: usize) -> Option<Action> {
        if index >= self.len() {
            return None;
        }
        Self::decode_slot(self.actions[index])
    }

    pub fn last(&self) -> Option<Action> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = Action> + '_ {
        self.actions[..self.len()]
            .iter()
            .filter_map(|bytes| Self::decode_slot(*bytes))
    }

    /// Slots are only written by `push`, from actions that encoded cleanly.
    fn decode_slot(bytes: EncodedAction) -> Option<Action> {
        let decoded = Action::decode(bytes);
        debug_assert!(decoded.is_ok(), "history slot {bytes:?} does not decode");
        decoded.ok()
    }

    /// The history as `player` observed it.
    pub fn viewed_by(&self, player: Player) -> History {
        let mut view = History::new();
        for action in self.iter() {
            view.push(action.viewed_by(player));
        }
        view
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.actions[..self.len()].concat()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() % 3 != 0 {
            return Err(DecodeError::Truncated {
                expected: bytes.len().div_ceil(3) * 3,
                actual: bytes.len(),
            });
        }
        let count = bytes.len() / 3;
        if count > Self::MAX_LEN {
            return Err(DecodeError::TooLong(count));
        }
        let mut history = History::new();
        for chunk in bytes.chunks_exact(3) {
            let action = Action::decode([chunk[0], chunk[1], chunk[2]])?;
            history.push(action);
        }
        Ok(history)
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl fmt::Display for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, action) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{action}")?;
        }
        Ok(())
    }
}
