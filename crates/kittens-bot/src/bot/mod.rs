mod determinized;
mod params;

pub use determinized::{DeterminizedBot, Evaluation};
pub use params::BotParams;
