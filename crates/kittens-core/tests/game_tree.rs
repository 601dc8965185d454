use kittens_core::model::action::{Action, ActionKind};
use kittens_core::model::card::Card;
use kittens_core::model::card_set::CardSet;
use kittens_core::model::card_stack::CardStack;
use kittens_core::model::deck::{Deal, DeckSpec, MAX_DRAW_PILE};
use kittens_core::model::player::Player;
use kittens_core::tree::walk::{UniformStrategy, sample_history};
use kittens_core::tree::{
    ExtensiveFormNode, GameNode, NodeKind, TreeError, TurnType, insert_positions,
};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::collections::HashSet;

fn spec() -> DeckSpec {
    DeckSpec::new(CardSet::test_deck(), 2)
}

fn game(pile: [Card; 4]) -> GameNode {
    let hands = [
        CardSet::from_cards([Card::Defuse, Card::Slap1x, Card::Skip]),
        CardSet::from_cards([Card::Defuse, Card::Slap2x, Card::Cat]),
    ];
    let deal = Deal::new(&spec(), hands, CardStack::from_cards(pile)).expect("valid deal");
    GameNode::new_game(&deal)
}

fn standard_game() -> GameNode {
    game([
        Card::SeeTheFuture,
        Card::DrawFromTheBottom,
        Card::Defuse,
        Card::ExplodingKitten,
    ])
}

fn kitten_on_top() -> GameNode {
    game([
        Card::ExplodingKitten,
        Card::SeeTheFuture,
        Card::DrawFromTheBottom,
        Card::Defuse,
    ])
}

fn play(node: &GameNode, card: Card) -> GameNode {
    node.apply(Action::play(node.player(), card)).expect("legal play")
}

#[test]
fn children_follow_hand_order_then_draw() {
    let root = standard_game();
    let actions = root.legal_actions().unwrap();
    let cards: Vec<Card> = actions.iter().map(|a| a.card).collect();
    assert_eq!(
        &cards[..3],
        &[Card::Defuse, Card::Skip, Card::Slap1x],
        "distinct hand cards in ascending order"
    );
    assert_eq!(actions[3].kind, ActionKind::DrawCard);
    assert_eq!(root.num_children(), 4);
    for (index, action) in actions.into_iter().enumerate() {
        assert_eq!(root.child(index).unwrap().key(), root.apply(action).unwrap().key());
    }
}

#[test]
fn slap_passes_turns_to_the_opponent() {
    let root = standard_game();
    let skipped = play(&root, Card::Skip);
    assert_eq!(skipped.player(), Player::Player1);
    assert_eq!(skipped.pending_turns(), 1);

    let slapped = play(&skipped, Card::Slap2x);
    assert_eq!(slapped.player(), Player::Player0);
    assert_eq!(slapped.turn(), TurnType::PlayTurn);
    assert_eq!(slapped.pending_turns(), 2);
}

#[test]
fn slapping_back_stacks_pending_turns() {
    let root = standard_game();
    let slapped = play(&root, Card::Slap1x);
    assert_eq!(slapped.player(), Player::Player1);
    assert_eq!(slapped.pending_turns(), 1);

    let back = play(&slapped, Card::Slap2x);
    assert_eq!(back.player(), Player::Player0);
    assert_eq!(back.pending_turns(), 3);
}

#[test]
fn cat_makes_the_opponent_give_a_card() {
    let root = standard_game();
    let p1 = play(&root, Card::Skip);
    let giving = play(&p1, Card::Cat);
    assert_eq!(giving.turn(), TurnType::GiveCard);
    assert_eq!(giving.player(), Player::Player0);
    assert_eq!(giving.num_children(), 2);

    let given = giving
        .apply(Action::give(Player::Player0, Card::Slap1x))
        .unwrap();
    assert_eq!(given.turn(), TurnType::PlayTurn);
    assert_eq!(given.player(), Player::Player1);
    assert!(given.state().hand(Player::Player1).contains(Card::Slap1x));
    let seen = given.state().private_info(Player::Player0).opponent_hand;
    assert!(seen.contains(Card::Slap1x));
}

#[test]
fn defused_kitten_goes_back_where_chosen() {
    let root = kitten_on_top();
    let drew = root
        .apply(Action::draw(Player::Player0, Card::ExplodingKitten))
        .unwrap();
    assert_eq!(drew.turn(), TurnType::MustDefuse);
    assert_eq!(drew.player(), Player::Player0);
    assert!(!drew.state().hand(Player::Player0).contains(Card::Defuse));
    assert_eq!(drew.state().discard_pile().top(), Some(Card::Defuse));

    let positions: Vec<u8> = drew
        .legal_actions()
        .unwrap()
        .iter()
        .map(|a| a.position)
        .collect();
    assert_eq!(positions, vec![0, 1, 2, 3]);

    let hidden = drew
        .apply(Action::insert_kitten(Player::Player0, 3))
        .unwrap();
    assert_eq!(hidden.turn(), TurnType::PlayTurn);
    assert_eq!(hidden.player(), Player::Player1);
    assert_eq!(
        hidden.state().draw_pile().bottom(),
        Some(Card::ExplodingKitten)
    );
    let opponent_view = hidden.state().private_info(Player::Player1).known_draw_pile;
    assert_eq!(opponent_view.known_cards(), CardSet::new());
    let own_view = hidden.state().private_info(Player::Player0).known_draw_pile;
    assert_eq!(own_view.bottom(), Some(Card::ExplodingKitten));
}

#[test]
fn kitten_without_defuse_ends_the_game() {
    let root = kitten_on_top();
    let spent = play(&root, Card::Defuse);
    assert_eq!(spent.turn(), TurnType::PlayTurn);
    assert_eq!(spent.player(), Player::Player0);

    let over = spent
        .apply(Action::draw(Player::Player0, Card::ExplodingKitten))
        .unwrap();
    assert!(over.is_terminal());
    assert_eq!(over.kind(), NodeKind::Terminal);
    assert_eq!(over.winner(), Some(Player::Player1));
    assert_eq!(over.num_children(), 0);
    assert_eq!(over.utility(Player::Player0), -1.0);
}

#[test]
fn insert_positions_cap_depth_and_keep_bottom() {
    assert_eq!(insert_positions(0).collect::<Vec<_>>(), vec![0]);
    assert_eq!(insert_positions(3).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    assert_eq!(
        insert_positions(8).collect::<Vec<_>>(),
        vec![0, 1, 2, 3, 4, 5, 8]
    );
}

#[test]
fn draw_from_the_bottom_takes_the_last_card() {
    let root = standard_game();
    let p1 = play(&root, Card::Skip);
    let drew = p1
        .apply(Action::draw(Player::Player1, Card::SeeTheFuture))
        .unwrap();
    assert_eq!(drew.player(), Player::Player0);
    let p1 = drew
        .apply(Action::draw(Player::Player0, Card::DrawFromTheBottom))
        .unwrap();
    assert_eq!(p1.player(), Player::Player1);
    let actions = p1.legal_actions().unwrap();
    assert_eq!(actions.len(), p1.num_children());
    assert!(
        actions
            .iter()
            .all(|a| a.kind != ActionKind::PlayCard || a.card != Card::DrawFromTheBottom)
    );

    let p0 = p1.apply(Action::draw(Player::Player1, Card::Defuse)).unwrap();
    let bottom = p0
        .legal_actions()
        .unwrap()
        .into_iter()
        .find(|a| a.card == Card::DrawFromTheBottom)
        .expect("bottom draw offered");
    assert_eq!(bottom.cards_seen[0], Card::ExplodingKitten);
    let next = p0.apply(bottom).unwrap();
    assert_eq!(next.turn(), TurnType::MustDefuse);
    assert!(next.state().draw_pile().is_empty());
    let inserted = next
        .apply(Action::insert_kitten(Player::Player0, 0))
        .unwrap();
    assert_eq!(inserted.state().draw_pile().to_vec(), vec![Card::ExplodingKitten]);
}

#[test]
fn see_the_future_records_the_top_cards() {
    let spec = DeckSpec::new(CardSet::test_deck(), 2);
    let hands = [
        CardSet::from_cards([Card::Defuse, Card::SeeTheFuture, Card::Skip]),
        CardSet::from_cards([Card::Defuse, Card::Slap2x, Card::Cat]),
    ];
    let pile = CardStack::from_cards([
        Card::Slap1x,
        Card::DrawFromTheBottom,
        Card::ExplodingKitten,
        Card::Defuse,
    ]);
    let root = GameNode::new_game(&Deal::new(&spec, hands, pile).unwrap());
    let peek = root
        .legal_actions()
        .unwrap()
        .into_iter()
        .find(|a| a.card == Card::SeeTheFuture)
        .unwrap();
    assert_eq!(
        peek.cards_seen,
        [Card::Slap1x, Card::DrawFromTheBottom, Card::ExplodingKitten]
    );
    let next = root.apply(peek).unwrap();
    assert_eq!(next.player(), Player::Player0);
    let public = next.info_set(Player::Player1).history.last().unwrap();
    assert_eq!(public.cards_seen, [Card::Unknown; 3]);
}

#[test]
fn shuffle_is_a_uniform_chance_node() {
    let spec = DeckSpec::new(
        CardSet::from_cards([Card::Shuffle, Card::Skip, Card::Cat, Card::Cat]),
        1,
    );
    let hands = [
        CardSet::from_cards([Card::Defuse, Card::Shuffle]),
        CardSet::from_cards([Card::Defuse, Card::Skip]),
    ];
    let pile = CardStack::from_cards([Card::Cat, Card::Cat, Card::Defuse, Card::ExplodingKitten]);
    let root = GameNode::new_game(&Deal::new(&spec, hands, pile).unwrap());

    let mut chance = play(&root, Card::Shuffle);
    assert_eq!(chance.turn(), TurnType::ShuffleDrawPile);
    assert_eq!(chance.kind(), NodeKind::Chance);
    assert_eq!(chance.num_children(), 12);
    assert!((chance.child_probability(0) - 1.0 / 12.0).abs() < 1e-12);
    assert_eq!(chance.child_probability(12), 0.0);

    let children = chance.build_children().unwrap();
    let orders: HashSet<CardStack> = children.iter().map(|c| c.state().draw_pile()).collect();
    assert_eq!(orders.len(), 12);
    for child in children {
        assert_eq!(child.turn(), TurnType::PlayTurn);
        assert_eq!(child.player(), Player::Player0);
        assert_eq!(child.pending_turns(), 1);
        assert_eq!(child.state().draw_pile_composition(), pile.to_set());
    }
    chance.release_children();
    assert!(chance.children().is_none());
    assert!(matches!(
        chance.child(12),
        Err(TreeError::ChildOutOfRange { index: 12, len: 12 })
    ));
}

#[test]
fn wrong_player_or_turn_is_rejected() {
    let root = standard_game();
    let err = root
        .apply(Action::play(Player::Player1, Card::Cat))
        .unwrap_err();
    assert!(matches!(err, TreeError::IllegalAction { .. }));

    let err = root
        .apply(Action::give(Player::Player0, Card::Skip))
        .unwrap_err();
    assert!(matches!(
        err,
        TreeError::IllegalAction {
            turn: TurnType::PlayTurn,
            ..
        }
    ));
}

/// 32 cards in play with a 16-card draw pile: both at their limits.
fn largest_deck() -> DeckSpec {
    let mut deck = CardSet::new();
    deck.add_n(Card::Skip, 6);
    deck.add_n(Card::Slap1x, 5);
    deck.add_n(Card::Slap2x, 4);
    deck.add_n(Card::SeeTheFuture, 4);
    deck.add_n(Card::Shuffle, 2);
    deck.add_n(Card::DrawFromTheBottom, 3);
    deck.add_n(Card::Cat, 4);
    DeckSpec::new(deck, 7)
}

#[test]
fn random_games_on_the_largest_deck_run_to_the_end() {
    let spec = largest_deck();
    assert!(spec.validate().is_ok());
    assert_eq!(spec.full_composition().len(), CardStack::MAX_LEN);
    assert_eq!(spec.initial_draw_pile_len(), MAX_DRAW_PILE);

    // Drawing is the last child of a play turn; starving it fills the discard pile.
    let mut play_heavy = |node: &GameNode| {
        let mut weights = vec![1.0f32; node.num_children()];
        if node.turn() == TurnType::PlayTurn {
            if let Some(draw) = weights.last_mut() {
                *draw = 0.05;
            }
        }
        weights
    };

    let mut rng = SmallRng::seed_from_u64(29);
    for game in 0..300 {
        let root = GameNode::random(&spec, &mut rng).expect("deck validates");
        let end = if game % 2 == 0 {
            sample_history(root, &mut play_heavy, &mut rng)
        } else {
            sample_history(root, &mut UniformStrategy, &mut rng)
        }
        .expect("game reaches a terminal node");
        assert!(end.is_terminal());
        assert!(end.winner().is_some());
        assert!(end.state().history().len() <= spec.worst_case_actions());
        assert!(end.state().validate(&spec).is_ok());
    }
}
