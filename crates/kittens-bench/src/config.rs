use kittens_bot::{BotParams, OpponentPolicy};
use kittens_core::model::deck::DeckSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

const DEFAULT_GAMES: usize = 100;
const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root bench configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BenchConfig {
    pub run: RunConfig,
    #[serde(default)]
    pub deck: DeckSpec,
    pub agents: Vec<AgentConfig>,
    pub output: OutputConfig,
}

impl BenchConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: BenchConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run.id)?;
        self.run.validate()?;
        self.deck
            .validate()
            .map_err(|err| ValidationError::InvalidField {
                field: "deck".to_string(),
                message: err.to_string(),
            })?;
        self.output.validate(&self.run.id)?;
        validate_agents(&self.agents)?;
        Ok(())
    }

    /// Resolve `{run_id}` placeholders into concrete paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        let dir = resolve_template(&self.run.id, &self.output.dir);
        ResolvedOutputs {
            games_jsonl: dir.join("games.jsonl"),
            summary_json: dir.join("summary.json"),
            dir,
        }
    }
}

/// Match length and seeding.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RunConfig {
    pub id: String,
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_games")]
    pub games: usize,
    /// Alternate which agent moves first from game to game.
    #[serde(default = "default_swap_seats")]
    pub swap_seats: bool,
}

impl RunConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.games == 0 {
            return Err(ValidationError::InvalidField {
                field: "run.games".to_string(),
                message: "number of games must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

fn default_games() -> usize {
    DEFAULT_GAMES
}

fn default_swap_seats() -> bool {
    true
}

/// Definition of a match participant.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AgentConfig {
    pub name: String,
    pub kind: AgentKind,
    #[serde(default)]
    pub params: AgentParams,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Uniform,
    Determinized,
}

/// Search budget for determinized agents. Unset fields fall back to
/// [`BotParams::from_env`].
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AgentParams {
    pub determinizations: Option<usize>,
    pub rollouts: Option<usize>,
    pub workers: Option<usize>,
    /// Relative weight the belief gives the opponent's draw.
    pub draw_weight: Option<f32>,
}

impl AgentParams {
    pub fn bot_params(&self) -> BotParams {
        let base = BotParams::from_env();
        BotParams {
            determinizations: self.determinizations.unwrap_or(base.determinizations),
            rollouts: self.rollouts.unwrap_or(base.rollouts),
            workers: self.workers.unwrap_or(base.workers),
        }
    }

    pub fn opponent_policy(&self) -> OpponentPolicy {
        self.draw_weight
            .map(OpponentPolicy::with_draw_weight)
            .unwrap_or_default()
    }

    fn validate(&self, name: &str) -> Result<(), ValidationError> {
        for (label, value) in [
            ("determinizations", self.determinizations),
            ("rollouts", self.rollouts),
            ("workers", self.workers),
        ] {
            if value == Some(0) {
                return Err(ValidationError::InvalidField {
                    field: format!("agents[{name}].params.{label}"),
                    message: "must be greater than zero".to_string(),
                });
            }
        }
        if let Some(weight) = self.draw_weight
            && !(weight.is_finite() && weight > 0.0)
        {
            return Err(ValidationError::InvalidField {
                field: format!("agents[{name}].params.draw_weight"),
                message: "draw weight must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Output artifact configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputConfig {
    pub dir: String,
    /// Also write every tracing event as JSON to `<dir>/<run_id>.log`.
    #[serde(default)]
    pub structured_logs: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
}

impl OutputConfig {
    fn validate(&mut self, run_id: &str) -> Result<(), ValidationError> {
        if self.dir.trim().is_empty() {
            return Err(ValidationError::InvalidField {
                field: "output.dir".to_string(),
                message: "path must not be empty".to_string(),
            });
        }
        if resolve_template(run_id, &self.dir).components().count() == 0 {
            return Err(ValidationError::InvalidField {
                field: "output.dir".to_string(),
                message: "resolved path is invalid".to_string(),
            });
        }
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
        if self.level().is_none() {
            return Err(ValidationError::InvalidField {
                field: "output.tracing_level".to_string(),
                message: format!("unknown level '{}'", self.tracing_level),
            });
        }
        Ok(())
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: "run.id".to_string(),
            message: "run id must not be empty".to_string(),
        });
    }

    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(ValidationError::InvalidField {
            field: "run.id".to_string(),
            message: "run id may only contain alphanumeric characters, '.', '_' or '-'".to_string(),
        });
    }

    Ok(())
}

fn validate_agents(agents: &[AgentConfig]) -> Result<(), ValidationError> {
    if agents.len() != 2 {
        return Err(ValidationError::InvalidField {
            field: "agents".to_string(),
            message: format!("a match needs exactly 2 agents, found {}", agents.len()),
        });
    }

    let mut seen = HashSet::new();
    for agent in agents {
        if agent.name.trim().is_empty() {
            return Err(ValidationError::InvalidField {
                field: "agents.name".to_string(),
                message: "agent name must not be empty".to_string(),
            });
        }

        if !agent.name.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
            return Err(ValidationError::InvalidField {
                field: format!("agents[{}].name", agent.name),
                message: "agent name contains invalid characters".to_string(),
            });
        }

        if !seen.insert(agent.name.clone()) {
            return Err(ValidationError::InvalidField {
                field: "agents".to_string(),
                message: format!("agent name '{}' defined more than once", agent.name),
            });
        }

        agent.params.validate(&agent.name)?;
    }

    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    PathBuf::from(template.replace("{run_id}", run_id))
}

/// Fully resolved output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub dir: PathBuf,
    pub games_jsonl: PathBuf,
    pub summary_json: PathBuf,
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path.as_path(),
        }
    }
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use kittens_core::model::card::Card;

    const BASIC_YAML: &str = r#"
run:
  id: "stage0_smoke"
  seed: 123
  games: 16
deck:
  deck:
    Skip: 2
    Slap1x: 1
    SeeTheFuture: 1
    Cat: 2
  hand_size: 2
agents:
  - name: "pimc"
    kind: "determinized"
    params:
      determinizations: 4
      rollouts: 2
      workers: 1
  - name: "random"
    kind: "uniform"
output:
  dir: "bench/out/{run_id}"
  structured_logs: true
  tracing_level: "debug"
"#;

    #[test]
    fn loads_and_validates_basic_config() {
        let mut cfg: BenchConfig = serde_yaml::from_str(BASIC_YAML).expect("parse yaml");
        cfg.validate().expect("validate");

        assert!(cfg.run.swap_seats);
        assert_eq!(cfg.deck.hand_size, 2);
        assert_eq!(cfg.deck.deck.count(Card::Cat), 2);
        assert_eq!(cfg.agents[0].params.bot_params().determinizations, 4);
        assert_eq!(cfg.output.level(), Some(Level::DEBUG));

        let outputs = cfg.resolved_outputs();
        assert_eq!(
            outputs.games_jsonl,
            PathBuf::from("bench/out/stage0_smoke/games.jsonl")
        );
    }

    #[test]
    fn missing_deck_uses_the_core_deck() {
        let start = BASIC_YAML.find("deck:").expect("deck block");
        let end = BASIC_YAML.find("agents:").expect("agents block");
        let yaml = format!("{}{}", &BASIC_YAML[..start], &BASIC_YAML[end..]);
        let mut cfg: BenchConfig = serde_yaml::from_str(&yaml).expect("parse");
        cfg.validate().expect("valid");
        assert_eq!(cfg.deck, DeckSpec::default());
    }

    #[test]
    fn rejects_oversized_hand() {
        let yaml = BASIC_YAML.replace("hand_size: 2", "hand_size: 4");
        let mut cfg: BenchConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("hand too large");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "deck"
        ));
    }

    #[test]
    fn rejects_duplicate_agents() {
        let yaml = BASIC_YAML.replace("name: \"random\"", "name: \"pimc\"");
        let mut cfg: BenchConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("duplicate agents should fail");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "agents"
        ));
    }

    #[test]
    fn rejects_zero_rollouts() {
        let yaml = BASIC_YAML.replace("rollouts: 2", "rollouts: 0");
        let mut cfg: BenchConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("zero rollouts");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "agents[pimc].params.rollouts"
        ));
    }

    #[test]
    fn rejects_invalid_run_id() {
        let yaml = BASIC_YAML.replace("stage0_smoke", "stage 0 smoke");
        let mut cfg: BenchConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("invalid run id");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "run.id"
        ));
    }

    #[test]
    fn outputs_resolve_template_multiple_occurrences() {
        let yaml = BASIC_YAML.replace("bench/out/{run_id}", "bench/{run_id}/{run_id}");
        let mut cfg: BenchConfig = serde_yaml::from_str(&yaml).expect("parse");
        cfg.validate().expect("valid");
        let outputs = cfg.resolved_outputs();
        assert_eq!(
            outputs.summary_json,
            PathBuf::from("bench/stage0_smoke/stage0_smoke/summary.json")
        );
    }
}
