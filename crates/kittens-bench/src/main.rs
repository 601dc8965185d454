use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::Level;

use kittens_bench::config::BenchConfig;
use kittens_bench::counting::{count_belief_states, count_shuffles, count_tree_nodes};
use kittens_bench::logging::init_logging;
use kittens_bench::tournament::TournamentRunner;
use kittens_core::model::deck::DeckSpec;
use kittens_core::model::player::Player;
use kittens_core::tree::walk::WalkOptions;

/// Match runner and tree measurements for two-player Exploding Kittens.
#[derive(Debug, Parser)]
#[command(
    name = "kittens-bench",
    author,
    version,
    about = "Deterministic Exploding Kittens match harness"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Play a seeded match between the two configured agents.
    Play {
        /// Path to the YAML configuration file.
        #[arg(short, long, value_name = "FILE", default_value = "bench/bench.yaml")]
        config: PathBuf,

        /// Override the run identifier (substitutes {run_id} templates).
        #[arg(long, value_name = "RUN_ID")]
        run_id: Option<String>,

        /// Override the number of games.
        #[arg(long, value_name = "GAMES")]
        games: Option<usize>,

        /// Override the match seed.
        #[arg(long, value_name = "SEED")]
        seed: Option<u64>,

        /// Exit after validating the configuration.
        #[arg(long)]
        validate_only: bool,
    },
    /// Distinct draw pile orderings of a seeded deal.
    CountShuffles {
        #[command(flatten)]
        deck: DeckArgs,
    },
    /// Belief candidate counts along a random game prefix.
    CountBeliefStates {
        #[command(flatten)]
        deck: DeckArgs,

        /// Transitions to play before stopping.
        #[arg(long, default_value_t = 6)]
        depth: usize,
    },
    /// Walk the game tree, sampling chance nodes.
    CountNodes {
        #[command(flatten)]
        deck: DeckArgs,

        /// Sample instead of expanding this player's decisions (0 or 1).
        #[arg(long, value_name = "PLAYER")]
        sample_player: Option<usize>,

        /// Stop after this many nodes.
        #[arg(long, value_name = "NODES")]
        max_nodes: Option<u64>,
    },
}

#[derive(Debug, clap::Args)]
struct DeckArgs {
    /// Take the deck from this configuration instead of the core deck.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the number of cards dealt to each player.
    #[arg(long, value_name = "CARDS")]
    hand_size: Option<u8>,

    #[arg(long, default_value_t = 0)]
    seed: u64,
}

impl DeckArgs {
    fn spec(&self) -> anyhow::Result<DeckSpec> {
        let mut spec = match &self.config {
            Some(path) => BenchConfig::from_path(path)?.deck,
            None => DeckSpec::default(),
        };
        if let Some(hand_size) = self.hand_size {
            spec.hand_size = hand_size;
        }
        spec.validate().context("invalid deck")?;
        Ok(spec)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Play {
            config,
            run_id,
            games,
            seed,
            validate_only,
        } => play(&config, run_id, games, seed, validate_only),
        Command::CountShuffles { deck } => {
            let _logging = init_logging(None, "count-shuffles", Level::INFO)?;
            let counts = count_shuffles(&deck.spec()?, deck.seed)?;
            println!("{}", serde_json::to_string_pretty(&counts)?);
            Ok(())
        }
        Command::CountBeliefStates { deck, depth } => {
            let _logging = init_logging(None, "count-belief-states", Level::INFO)?;
            let rows = count_belief_states(&deck.spec()?, deck.seed, depth)?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
            Ok(())
        }
        Command::CountNodes {
            deck,
            sample_player,
            max_nodes,
        } => {
            let _logging = init_logging(None, "count-nodes", Level::INFO)?;
            let sampled_player = match sample_player {
                Some(index) => Some(
                    Player::from_index(index)
                        .with_context(|| format!("player {index} does not exist"))?,
                ),
                None => None,
            };
            let options = WalkOptions {
                sampled_player,
                max_nodes,
            };
            let report = count_tree_nodes(&deck.spec()?, deck.seed, options)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

fn play(
    path: &Path,
    run_id: Option<String>,
    games: Option<usize>,
    seed: Option<u64>,
    validate_only: bool,
) -> anyhow::Result<()> {
    let mut config = BenchConfig::from_path(path)?;

    if let Some(run_id) = run_id {
        config.run.id = run_id;
    }

    if let Some(games) = games {
        config.run.games = games;
    }

    if let Some(seed) = seed {
        config.run.seed = seed;
    }

    config.validate()?;

    let outputs = config.resolved_outputs();
    let run_id = config.run.id.clone();
    let games = config.run.games;
    let names: Vec<&str> = config.agents.iter().map(|a| a.name.as_str()).collect();

    println!(
        "Loaded configuration '{run_id}': {} vs {} over {games} game{}",
        names[0],
        names[1],
        if games == 1 { "" } else { "s" }
    );

    if validate_only {
        println!("Validation-only mode: match skipped.");
        return Ok(());
    }

    let log_dir = config.output.structured_logs.then_some(outputs.dir.as_path());
    let level = config.output.level().unwrap_or(Level::INFO);
    let logging = init_logging(log_dir, &run_id, level)?;

    let runner = TournamentRunner::new(config, outputs)?;
    let summary = runner.run()?;

    println!(
        "Match complete for '{run_id}': {} games → {} rows at {}",
        summary.games_played,
        summary.rows_written,
        summary.jsonl_path.display()
    );
    for agent in &summary.summary.agents {
        println!(
            "  {}: {} wins, win rate {:.3} (95% CI {:.3}..{:.3}), {:.2} ms/decision",
            agent.name,
            agent.wins,
            agent.win_rate,
            agent.win_rate_ci[0],
            agent.win_rate_ci[1],
            agent.average_ms_per_decision
        );
    }
    println!("Summary: {}", summary.summary_path.display());
    if let Some(path) = logging.log_path.as_ref() {
        println!("Structured log: {}", path.display());
    }

    Ok(())
}
