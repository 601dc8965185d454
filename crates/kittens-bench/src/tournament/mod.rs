mod seating;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::analytics::{AnalyticsCollector, AnalyticsError, MatchSummary};
use kittens_bot::{DeterminizedBot, Policy, UniformPolicy};
use kittens_core::belief::BeliefError;
use kittens_core::model::deck::{ConfigurationError, DeckSpec};
use kittens_core::model::info_set::InfoSet;
use kittens_core::model::player::Player;
use kittens_core::tree::{ExtensiveFormNode, GameNode, NodeKind, TreeError};
use rand::{RngCore, SeedableRng, rngs::StdRng};
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event};

use crate::config::{AgentConfig, AgentKind, BenchConfig, ResolvedOutputs};

use seating::Seating;

/// Primary entry point for running a two-agent match.
pub struct TournamentRunner {
    config: BenchConfig,
    outputs: ResolvedOutputs,
    agents: Vec<AgentBlueprint>,
    seating: Seating,
}

/// Summary details returned after a run.
pub struct RunSummary {
    pub games_played: usize,
    pub rows_written: usize,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
    pub summary: MatchSummary,
}

impl TournamentRunner {
    /// Build a runner from a validated configuration.
    pub fn new(config: BenchConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        let agents = AgentBlueprint::from_configs(&config.agents);
        if agents.len() != 2 {
            return Err(RunnerError::SeatCount {
                found: agents.len(),
            });
        }
        let seating = Seating::new(config.run.swap_seats);
        Ok(Self {
            config,
            outputs,
            agents,
            seating,
        })
    }

    /// Play every game, streaming one JSONL row per game to disk.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.games_jsonl.parent())?;
        ensure_parent(self.outputs.summary_json.parent())?;

        let mut writer = BufWriter::new(File::create(&self.outputs.games_jsonl)?);
        let mut rng = StdRng::seed_from_u64(self.config.run.seed);
        let mut analytics = AnalyticsCollector::new(&self.config);
        let mut rows_written = 0usize;

        for game_index in 0..self.config.run.games {
            let game_seed = rng.next_u64();
            let outcome = self.play_game(game_index, game_seed)?;
            analytics.record_game(&outcome)?;
            write_game_row(&mut writer, &self.config, game_index, game_seed, &outcome)?;
            rows_written += 1;
        }

        writer.flush()?;

        let summary = analytics.finalize();
        summary.write_json(&self.outputs.summary_json)?;

        Ok(RunSummary {
            games_played: self.config.run.games,
            rows_written,
            jsonl_path: self.outputs.games_jsonl.clone(),
            summary_path: self.outputs.summary_json.clone(),
            summary,
        })
    }

    fn play_game(&self, game_index: usize, game_seed: u64) -> Result<GameOutcome, RunnerError> {
        let spec = self.config.deck;
        let mut rng = StdRng::seed_from_u64(game_seed);
        let deal = spec.deal(&mut rng)?;
        let mut node = GameNode::new_game(&deal);

        let order = self.seating.order(game_index);
        let mut seats = Vec::with_capacity(2);
        for player in Player::BOTH {
            let agent = &self.agents[order[player.index()]];
            seats.push(SeatState::new(player, agent, &spec, node.state().info_set(player))?);
        }

        while node.kind() != NodeKind::Terminal {
            node = match node.kind() {
                NodeKind::Chance => node.sample_child(&mut rng)?.1,
                _ => {
                    let seat = &mut seats[node.player().index()];
                    let start = Instant::now();
                    let index = seat.policy.choose(&node, &mut rng)?;
                    seat.metrics.record(start.elapsed());
                    node.child(index)?
                }
            };
            for seat in &mut seats {
                seat.policy.observe(&node.state().info_set(seat.player))?;
            }
        }

        let winner = node
            .winner()
            .ok_or_else(|| RunnerError::game("terminal node without a winner".to_string()))?;
        let actions: Vec<String> = node
            .state()
            .history()
            .iter()
            .map(|action| action.to_string())
            .collect();
        let seating = [seats[0].agent_name.clone(), seats[1].agent_name.clone()];

        event!(
            target: "kittens_bench::game",
            Level::INFO,
            run_id = %self.config.run.id,
            game_index = game_index as u32,
            first = %seating[0],
            second = %seating[1],
            winner = %seating[winner.index()],
            actions = actions.len() as u32,
        );

        let decisions = [
            seats[0].metrics.finalize(),
            seats[1].metrics.finalize(),
        ];
        Ok(GameOutcome {
            seating,
            winner_seat: winner.index(),
            actions,
            decisions,
        })
    }
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn write_game_row(
    writer: &mut BufWriter<File>,
    config: &BenchConfig,
    game_index: usize,
    game_seed: u64,
    outcome: &GameOutcome,
) -> Result<(), RunnerError> {
    let row = GameLogRow {
        run_id: config.run.id.clone(),
        game_id: format!("G{game_index:05}"),
        game_index,
        game_seed,
        seating: outcome.seating.clone(),
        winner: outcome.seating[outcome.winner_seat].clone(),
        winner_seat: outcome.winner_seat,
        decisions: [
            outcome.decisions[0].decisions,
            outcome.decisions[1].decisions,
        ],
        ms_per_decision: [
            outcome.decisions[0].avg_ms_per_decision,
            outcome.decisions[1].avg_ms_per_decision,
        ],
        actions: outcome.actions.clone(),
    };
    serde_json::to_writer(&mut *writer, &row)?;
    writer.write_all(b"\n")?;
    Ok(())
}

struct SeatState {
    player: Player,
    agent_name: String,
    policy: Box<dyn Policy>,
    metrics: DecisionMetrics,
}

impl SeatState {
    fn new(
        player: Player,
        agent: &AgentBlueprint,
        spec: &DeckSpec,
        view: InfoSet,
    ) -> Result<Self, RunnerError> {
        Ok(Self {
            player,
            agent_name: agent.name.clone(),
            policy: agent.spawn_policy(spec, view)?,
            metrics: DecisionMetrics::default(),
        })
    }
}

/// Result of one game, seat 0 being the first player.
pub struct GameOutcome {
    pub seating: [String; 2],
    pub winner_seat: usize,
    pub actions: Vec<String>,
    pub decisions: [DecisionSummary; 2],
}

#[derive(Default)]
struct DecisionMetrics {
    total: Duration,
    decisions: u32,
}

impl DecisionMetrics {
    fn record(&mut self, duration: Duration) {
        self.total += duration;
        self.decisions += 1;
    }

    fn finalize(&self) -> DecisionSummary {
        let avg_ms = if self.decisions == 0 {
            0.0
        } else {
            self.total.as_secs_f64() * 1000.0 / f64::from(self.decisions)
        };

        DecisionSummary {
            decisions: self.decisions,
            avg_ms_per_decision: avg_ms,
            total_ms: self.total.as_secs_f64() * 1000.0,
        }
    }
}

#[derive(Clone)]
pub struct DecisionSummary {
    pub decisions: u32,
    pub avg_ms_per_decision: f64,
    pub total_ms: f64,
}

#[derive(Serialize)]
struct GameLogRow {
    run_id: String,
    game_id: String,
    game_index: usize,
    game_seed: u64,
    seating: [String; 2],
    winner: String,
    winner_seat: usize,
    decisions: [u32; 2],
    ms_per_decision: [f64; 2],
    actions: Vec<String>,
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize log row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error("deal failed: {0}")]
    Deal(#[from] ConfigurationError),
    #[error("agent failed: {0}")]
    Agent(#[from] BeliefError),
    #[error("game tree error: {0}")]
    Tree(#[from] TreeError),
    #[error("game execution failed: {message}")]
    Game { message: String },
    #[error("configuration requires exactly 2 agents but found {found}")]
    SeatCount { found: usize },
    #[error("analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
}

impl RunnerError {
    fn game(message: String) -> Self {
        RunnerError::Game { message }
    }
}

struct AgentBlueprint {
    name: String,
    config: AgentConfig,
}

impl AgentBlueprint {
    fn from_configs(configs: &[AgentConfig]) -> Vec<Self> {
        configs
            .iter()
            .map(|config| Self {
                name: config.name.clone(),
                config: config.clone(),
            })
            .collect()
    }

    fn spawn_policy(&self, spec: &DeckSpec, view: InfoSet) -> Result<Box<dyn Policy>, RunnerError> {
        let policy: Box<dyn Policy> = match self.config.kind {
            AgentKind::Uniform => Box::new(UniformPolicy),
            AgentKind::Determinized => Box::new(DeterminizedBot::new(
                spec,
                view,
                self.config.params.opponent_policy(),
                self.config.params.bot_params(),
            )?),
        };
        Ok(policy)
    }
}
