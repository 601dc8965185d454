use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::Level;
use tracing_appender::non_blocking::{self, WorkerGuard};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Environment variable holding an `EnvFilter` directive that overrides
/// the configured level.
pub const LOG_ENV: &str = "KITTENS_LOG";

/// Keeps the background log writer alive; drop it to flush.
pub struct LoggingGuard {
    _guard: Option<WorkerGuard>,
    pub log_path: Option<PathBuf>,
}

/// Installs a human-readable stderr layer and, when `dir` is given, a JSON
/// layer writing to `<dir>/<run_id>.log`.
pub fn init_logging(dir: Option<&Path>, run_id: &str, level: Level) -> Result<LoggingGuard> {
    let filter = || {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level.as_str()))
    };

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(filter());

    let (json, guard, log_path) = match dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory at {}", dir.display()))?;
            let log_path = dir.join(format!("{run_id}.log"));
            let appender = tracing_appender::rolling::never(dir, format!("{run_id}.log"));
            let (writer, guard) = non_blocking::NonBlockingBuilder::default()
                .lossy(false)
                .finish(appender);
            let layer = fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_events(FmtSpan::NONE)
                .with_writer(writer)
                .with_filter(filter());
            (Some(layer), Some(guard), Some(log_path))
        }
        None => (None, None, None),
    };

    // A subscriber may already be installed when running in tests.
    let _ = tracing_subscriber::registry()
        .with(console)
        .with(json)
        .try_init();

    Ok(LoggingGuard {
        _guard: guard,
        log_path,
    })
}
