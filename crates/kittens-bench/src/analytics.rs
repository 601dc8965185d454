use std::fs;
use std::path::Path;

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

use crate::config::BenchConfig;
use crate::tournament::GameOutcome;

const CONFIDENCE: f64 = 0.95;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("agent '{0}' in results but missing from configuration")]
    UnknownAgent(String),
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize summary: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Accumulates game outcomes into per-agent win rates.
pub struct AnalyticsCollector {
    run_id: String,
    agents: Vec<AgentAccumulator>,
    first_player_wins: usize,
    games: usize,
}

impl AnalyticsCollector {
    pub fn new(config: &BenchConfig) -> Self {
        Self {
            run_id: config.run.id.clone(),
            agents: config
                .agents
                .iter()
                .map(|agent| AgentAccumulator::new(agent.name.clone()))
                .collect(),
            first_player_wins: 0,
            games: 0,
        }
    }

    pub fn record_game(&mut self, outcome: &GameOutcome) -> Result<(), AnalyticsError> {
        self.games += 1;
        if outcome.winner_seat == 0 {
            self.first_player_wins += 1;
        }
        for (seat, name) in outcome.seating.iter().enumerate() {
            let acc = self
                .agents
                .iter_mut()
                .find(|acc| &acc.name == name)
                .ok_or_else(|| AnalyticsError::UnknownAgent(name.clone()))?;
            acc.games += 1;
            if seat == 0 {
                acc.first_player_games += 1;
            }
            if seat == outcome.winner_seat {
                acc.wins += 1;
            }
            let stats = &outcome.decisions[seat];
            acc.decisions += u64::from(stats.decisions);
            acc.total_ms += stats.total_ms;
        }
        Ok(())
    }

    pub fn finalize(self) -> MatchSummary {
        let z = z_score(CONFIDENCE);
        let agents = self
            .agents
            .into_iter()
            .map(|acc| acc.into_report(z))
            .collect();
        let (low, high) = wilson_interval(self.first_player_wins, self.games, z);
        MatchSummary {
            run_id: self.run_id,
            games: self.games,
            confidence: CONFIDENCE,
            first_player_win_rate: rate(self.first_player_wins, self.games),
            first_player_ci: [low, high],
            agents,
        }
    }
}

struct AgentAccumulator {
    name: String,
    games: usize,
    wins: usize,
    first_player_games: usize,
    decisions: u64,
    total_ms: f64,
}

impl AgentAccumulator {
    fn new(name: String) -> Self {
        Self {
            name,
            games: 0,
            wins: 0,
            first_player_games: 0,
            decisions: 0,
            total_ms: 0.0,
        }
    }

    fn into_report(self, z: f64) -> AgentReport {
        let (low, high) = wilson_interval(self.wins, self.games, z);
        let average_ms_per_decision = if self.decisions == 0 {
            0.0
        } else {
            self.total_ms / self.decisions as f64
        };
        AgentReport {
            name: self.name,
            games: self.games,
            wins: self.wins,
            first_player_games: self.first_player_games,
            win_rate: rate(self.wins, self.games),
            win_rate_ci: [low, high],
            decisions: self.decisions,
            average_ms_per_decision,
        }
    }
}

/// Written to `summary.json` at the end of a match.
#[derive(Debug, Clone, Serialize)]
pub struct MatchSummary {
    pub run_id: String,
    pub games: usize,
    pub confidence: f64,
    pub first_player_win_rate: f64,
    pub first_player_ci: [f64; 2],
    pub agents: Vec<AgentReport>,
}

impl MatchSummary {
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), AnalyticsError> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).map_err(|source| AnalyticsError::Io {
            context: "writing summary json",
            source,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentReport {
    pub name: String,
    pub games: usize,
    pub wins: usize,
    pub first_player_games: usize,
    pub win_rate: f64,
    pub win_rate_ci: [f64; 2],
    pub decisions: u64,
    /// Wall-clock time, excluded from reproducibility checks.
    pub average_ms_per_decision: f64,
}

fn rate(hits: usize, trials: usize) -> f64 {
    if trials == 0 {
        0.0
    } else {
        hits as f64 / trials as f64
    }
}

/// Two-sided normal quantile for `confidence`.
fn z_score(confidence: f64) -> f64 {
    match Normal::new(0.0, 1.0) {
        Ok(normal) => normal.inverse_cdf(0.5 + confidence / 2.0),
        Err(_) => 1.96,
    }
}

/// Wilson score interval for a binomial proportion.
fn wilson_interval(hits: usize, trials: usize, z: f64) -> (f64, f64) {
    if trials == 0 {
        return (0.0, 1.0);
    }
    let n = trials as f64;
    let p = hits as f64 / n;
    let z2 = z * z;
    let denom = 1.0 + z2 / n;
    let center = (p + z2 / (2.0 * n)) / denom;
    let margin = z * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt() / denom;
    ((center - margin).max(0.0), (center + margin).min(1.0))
}
