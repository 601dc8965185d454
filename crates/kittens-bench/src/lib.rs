pub mod analytics;
pub mod config;
pub mod counting;
pub mod logging;
pub mod tournament;
