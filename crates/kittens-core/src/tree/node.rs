//! Game tree nodes and the turn state machine.

use super::pool::ChildPool;
use super::shuffle::{count_distinct_shuffles, nth_shuffle};
use super::turn::{NodeKind, TurnType};
use super::{ExtensiveFormNode, TreeError};
use crate::model::action::{Action, ActionKind};
use crate::model::card::Card;
use crate::model::deck::{ConfigurationError, Deal, DeckSpec};
use crate::model::game_state::GameState;
use crate::model::info_set::InfoSet;
use crate::model::player::Player;
use core::fmt;
use rand::Rng;

/// Highest insertion depth offered explicitly when defusing; deeper piles
/// also get a "bottom" option.
pub const MAX_INSERT_DEPTH: usize = 5;

/// Shuffle nodes with more orderings than this are never materialized.
pub const MAX_MATERIALIZED_CHILDREN: usize = 1 << 16;

/// A node of the game tree: a state plus where it sits in the turn cycle.
///
/// Children are built on demand with [`GameNode::build_children`] and stay
/// alive until [`GameNode::release_children`].
#[derive(Debug, Clone)]
pub struct GameNode {
    state: GameState,
    player: Player,
    turn: TurnType,
    pending_turns: u8,
    winner: Option<Player>,
    children: Option<Vec<GameNode>>,
}

/// Identity of a node, ignoring any built children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey {
    pub state: GameState,
    pub player: Player,
    pub turn: TurnType,
    pub pending_turns: u8,
    pub winner: Option<Player>,
}

impl GameNode {
    /// Player 0 to move after the deal.
    pub fn new_game(deal: &Deal) -> Self {
        Self::from_state(GameState::new(deal), Player::Player0)
    }

    pub fn random<R: Rng + ?Sized>(
        spec: &DeckSpec,
        rng: &mut R,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self::new_game(&spec.deal(rng)?))
    }

    /// A `PlayTurn` node for `player` with a single pending turn.
    pub fn from_state(state: GameState, player: Player) -> Self {
        Self::with_turn(state, player, TurnType::PlayTurn, 1)
    }

    fn with_turn(state: GameState, player: Player, turn: TurnType, pending_turns: u8) -> Self {
        Self {
            state,
            player,
            turn,
            pending_turns,
            winner: None,
            children: None,
        }
    }

    fn game_over(state: GameState, winner: Player) -> Self {
        Self {
            winner: Some(winner),
            ..Self::with_turn(state, winner, TurnType::GameOver, 0)
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn player(&self) -> Player {
        self.player
    }

    pub fn turn(&self) -> TurnType {
        self.turn
    }

    pub fn pending_turns(&self) -> u8 {
        self.pending_turns
    }

    pub fn winner(&self) -> Option<Player> {
        self.winner
    }

    pub fn is_terminal(&self) -> bool {
        self.turn == TurnType::GameOver
    }

    pub fn key(&self) -> NodeKey {
        NodeKey {
            state: self.state,
            player: self.player,
            turn: self.turn,
            pending_turns: self.pending_turns,
            winner: self.winner,
        }
    }

    /// Same node position with a different underlying state. Built
    /// children are dropped since they describe the old state.
    pub fn with_state(&self, state: GameState) -> Self {
        Self {
            state,
            player: self.player,
            turn: self.turn,
            pending_turns: self.pending_turns,
            winner: self.winner,
            children: None,
        }
    }

    /// Actions available at a decision node, in child order.
    pub fn legal_actions(&self) -> Result<Vec<Action>, TreeError> {
        let player = self.player;
        let state = &self.state;
        let actions = match self.turn {
            TurnType::PlayTurn => {
                let mut actions = Vec::with_capacity(state.hand(player).distinct() + 1);
                for (card, _) in state.hand(player).iter() {
                    actions.push(self.play_action(card)?);
                }
                let top = state.draw_pile().top().ok_or(TreeError::EmptyDrawPile)?;
                actions.push(Action::draw(player, top));
                actions
            }
            TurnType::GiveCard => {
                let mut actions = Vec::with_capacity(state.hand(player).distinct());
                for (card, _) in state.hand(player).iter() {
                    if !card.is_playable() {
                        return Err(ConfigurationError::UnsupportedCard(card).into());
                    }
                    actions.push(Action::give(player, card));
                }
                actions
            }
            TurnType::MustDefuse => insert_positions(state.draw_pile().len())
                .map(|position| Action::insert_kitten(player, position as u8))
                .collect(),
            TurnType::ShuffleDrawPile | TurnType::GameOver => Vec::new(),
        };
        Ok(actions)
    }

    fn play_action(&self, card: Card) -> Result<Action, TreeError> {
        if !card.is_playable() {
            return Err(ConfigurationError::UnsupportedCard(card).into());
        }
        let mut action = Action::play(self.player, card);
        let pile = self.state.draw_pile();
        match card {
            Card::SeeTheFuture => action.cards_seen = self.state.top_cards(),
            Card::DrawFromTheBottom => {
                let bottom = pile.len().checked_sub(1).ok_or(TreeError::EmptyDrawPile)?;
                action.position = bottom as u8;
                action.cards_seen[0] = pile.nth(bottom);
            }
            _ => {}
        }
        Ok(action)
    }

    /// The node reached by taking `action` here.
    pub fn apply(&self, action: Action) -> Result<GameNode, TreeError> {
        let player = self.player;
        let opponent = player.opponent();
        if action.player != player {
            return Err(TreeError::IllegalAction {
                turn: self.turn,
                action,
            });
        }
        let state = self.state.apply(action)?;
        let next = match (self.turn, action.kind) {
            (TurnType::PlayTurn, ActionKind::DrawCard) => {
                self.after_draw(state, action.cards_seen[0])?
            }
            (TurnType::PlayTurn, ActionKind::PlayCard) => match action.card {
                Card::Defuse | Card::SeeTheFuture => {
                    Self::with_turn(state, player, TurnType::PlayTurn, self.pending_turns)
                }
                Card::Skip => self.end_turn(state),
                Card::DrawFromTheBottom => self.after_draw(state, action.cards_seen[0])?,
                Card::Shuffle => {
                    Self::with_turn(state, player, TurnType::ShuffleDrawPile, self.pending_turns)
                }
                Card::Slap1x | Card::Slap2x => {
                    let slaps = if action.card == Card::Slap1x { 1 } else { 2 };
                    let slapped_back = self
                        .state
                        .last_action()
                        .is_some_and(|last| last.is_slap() && last.player == opponent);
                    let inherited = if slapped_back { self.pending_turns } else { 0 };
                    Self::with_turn(
                        state,
                        opponent,
                        TurnType::PlayTurn,
                        inherited.saturating_add(slaps),
                    )
                }
                Card::Cat => {
                    if state.hand(opponent).is_empty() {
                        Self::with_turn(state, player, TurnType::PlayTurn, self.pending_turns)
                    } else {
                        Self::with_turn(state, opponent, TurnType::GiveCard, self.pending_turns)
                    }
                }
                other => return Err(ConfigurationError::UnsupportedCard(other).into()),
            },
            (TurnType::GiveCard, ActionKind::GiveCard) => {
                Self::with_turn(state, opponent, TurnType::PlayTurn, self.pending_turns)
            }
            (TurnType::MustDefuse, ActionKind::InsertExplodingKitten) => {
                self.end_turn(state)
            }
            (turn, _) => return Err(TreeError::IllegalAction { turn, action }),
        };
        Ok(next)
    }

    fn after_draw(&self, state: GameState, drawn: Card) -> Result<GameNode, TreeError> {
        if drawn != Card::ExplodingKitten {
            return Ok(self.end_turn(state));
        }
        let player = self.player;
        if !state.hand(player).contains(Card::Defuse) {
            return Ok(Self::game_over(state, player.opponent()));
        }
        let defused = state.apply(Action::play(player, Card::Defuse))?;
        Ok(Self::with_turn(
            defused,
            player,
            TurnType::MustDefuse,
            self.pending_turns,
        ))
    }

    fn end_turn(&self, state: GameState) -> GameNode {
        if self.pending_turns <= 1 {
            Self::with_turn(state, self.player.opponent(), TurnType::PlayTurn, 1)
        } else {
            Self::with_turn(state, self.player, TurnType::PlayTurn, self.pending_turns - 1)
        }
    }

    /// Number of children, computed without building them.
    pub fn num_children(&self) -> usize {
        let hand = self.state.hand(self.player);
        match self.turn {
            TurnType::PlayTurn => hand.distinct() + 1,
            TurnType::GiveCard => hand.distinct(),
            TurnType::MustDefuse => insert_positions(self.state.draw_pile().len()).count(),
            TurnType::ShuffleDrawPile => {
                let count = count_distinct_shuffles(&self.state.draw_pile_composition());
                usize::try_from(count).unwrap_or(usize::MAX)
            }
            TurnType::GameOver => 0,
        }
    }

    /// Builds the `index`-th child without storing it.
    pub fn child(&self, index: usize) -> Result<GameNode, TreeError> {
        let len = self.num_children();
        if index >= len {
            return Err(TreeError::ChildOutOfRange { index, len });
        }
        if self.turn == TurnType::ShuffleDrawPile {
            let composition = self.state.draw_pile_composition();
            let pile = nth_shuffle(&composition, index as u64)
                .ok_or(TreeError::ChildOutOfRange { index, len })?;
            return Ok(Self::with_turn(
                self.state.shuffled(pile),
                self.player,
                TurnType::PlayTurn,
                self.pending_turns,
            ));
        }
        let actions = self.legal_actions()?;
        let action = actions
            .get(index)
            .copied()
            .ok_or(TreeError::ChildOutOfRange { index, len })?;
        self.apply(action)
    }

    /// Draws one child of a chance node uniformly at random.
    pub fn sample_child<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<(usize, GameNode), TreeError> {
        let len = self.num_children();
        if len == 0 {
            return Err(TreeError::ChildOutOfRange { index: 0, len });
        }
        let index = rng.gen_range(0..len);
        Ok((index, self.child(index)?))
    }

    /// Materializes every child. They stay valid until
    /// [`GameNode::release_children`].
    pub fn build_children(&mut self) -> Result<&[GameNode], TreeError> {
        let mut pool = ChildPool::new();
        self.build_children_in(&mut pool)
    }

    pub fn build_children_in(&mut self, pool: &mut ChildPool) -> Result<&[GameNode], TreeError> {
        if self.children.is_none() {
            let len = self.num_children();
            if len > MAX_MATERIALIZED_CHILDREN {
                return Err(TreeError::TooManyChildren {
                    count: len,
                    limit: MAX_MATERIALIZED_CHILDREN,
                });
            }
            let mut buffer = pool.take(len);
            if self.turn == TurnType::ShuffleDrawPile {
                for index in 0..len {
                    buffer.push(self.child(index)?);
                }
            } else {
                for action in self.legal_actions()? {
                    buffer.push(self.apply(action)?);
                }
            }
            self.children = Some(buffer);
        }
        Ok(self.children.as_deref().unwrap_or(&[]))
    }

    pub fn children(&self) -> Option<&[GameNode]> {
        self.children.as_deref()
    }

    pub fn children_mut(&mut self) -> Option<&mut [GameNode]> {
        self.children.as_deref_mut()
    }

    /// Drops built children and everything below them.
    pub fn release_children(&mut self) {
        self.children = None;
    }

    /// Like [`GameNode::release_children`], handing every buffer in the
    /// subtree back to `pool`.
    pub fn release_children_into(&mut self, pool: &mut ChildPool) {
        if let Some(mut children) = self.children.take() {
            for child in &mut children {
                child.release_children_into(pool);
            }
            pool.give(children);
        }
    }
}

/// Insertion positions offered after a defuse: `0..=min(len, 5)`, then
/// the bottom for longer piles.
pub fn insert_positions(len: usize) -> impl Iterator<Item = usize> {
    let shallow = len.min(MAX_INSERT_DEPTH);
    let bottom = (len > MAX_INSERT_DEPTH).then_some(len);
    (0..=shallow).chain(bottom)
}

impl ExtensiveFormNode for GameNode {
    fn kind(&self) -> NodeKind {
        self.turn.kind()
    }

    fn acting_player(&self) -> Player {
        self.player
    }

    fn info_set(&self, player: Player) -> InfoSet {
        self.state.info_set(player)
    }

    fn num_children(&self) -> usize {
        GameNode::num_children(self)
    }

    fn child(&self, index: usize) -> Result<Self, TreeError> {
        GameNode::child(self, index)
    }

    fn child_probability(&self, index: usize) -> f64 {
        let len = GameNode::num_children(self);
        match self.kind() {
            NodeKind::Chance if index < len => 1.0 / len as f64,
            _ => 0.0,
        }
    }

    fn sample_child<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<(usize, Self), TreeError> {
        GameNode::sample_child(self, rng)
    }

    fn utility(&self, player: Player) -> f32 {
        match self.winner {
            Some(winner) if winner == player => 1.0,
            Some(_) => -1.0,
            None => 0.0,
        }
    }
}

impl fmt::Display for GameNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} pending={} pile={} p0={} p1={}",
            self.turn,
            self.player,
            self.pending_turns,
            self.state.draw_pile(),
            self.state.hand(Player::Player0),
            self.state.hand(Player::Player1),
        )?;
        if let Some(winner) = self.winner {
            write!(f, " winner={winner}")?;
        }
        Ok(())
    }
}
