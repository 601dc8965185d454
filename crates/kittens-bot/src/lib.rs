pub mod bot;
pub mod policy;

pub use bot::{BotParams, DeterminizedBot, Evaluation};
pub use policy::{OpponentPolicy, Policy, UniformPolicy};
