pub mod action;
pub mod card;
pub mod card_set;
pub mod card_stack;
pub mod deck;
pub mod game_state;
pub mod history;
pub mod info_set;
pub mod player;
pub mod private_info;
