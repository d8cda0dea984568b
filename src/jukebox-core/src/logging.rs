use crate::{config::LoggingConfig, paths::AppDirs};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "jukebox.log";

/// Environment variable that overrides the configured level with a full
/// filter directive, e.g. `JUKEBOX_LOG=jukebox_remote=trace,info`.
pub const LOG_ENV: &str = "JUKEBOX_LOG";

/// Keeps the background file writer alive; drop it last in `main`.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Install the global subscriber.
///
/// Every process logs to a daily file in the log directory. The console sink
/// is optional and writes to stderr, since stdout carries query results that
/// scripts parse.
pub fn init_logging(config: &LoggingConfig, dirs: &AppDirs) -> Result<LoggingGuard, LoggingError> {
    let log_dir = dirs.log_dir();
    fs::create_dir_all(log_dir).map_err(|source| LoggingError::CreateDirectory {
        path: log_dir.to_path_buf(),
        source,
    })?;

    let filter = build_filter(config, std::env::var(LOG_ENV).ok().as_deref())?;

    let file_stem = config.file_name.as_deref().unwrap_or(DEFAULT_LOG_FILE);
    let pruned = prune_rotated_logs(log_dir, file_stem, config.max_log_files.max(1))?;
    let (file, file_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(log_dir, file_stem));

    let writer = if config.console {
        BoxMakeWriter::new(std::io::stderr.and(file))
    } else {
        BoxMakeWriter::new(file)
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(writer)
        .try_init()
        .map_err(LoggingError::SubscriberInstall)?;
    if pruned > 0 {
        tracing::debug!(count = pruned, dir = %log_dir.display(), "removed old log files");
    }

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// An env override wins over the configured level.
fn build_filter(config: &LoggingConfig, env_override: Option<&str>) -> Result<EnvFilter, LoggingError> {
    let directive = match env_override {
        Some(directive) if !directive.trim().is_empty() => directive,
        _ => config.level.as_filter_directive(),
    };
    EnvFilter::try_new(directive).map_err(|source| LoggingError::ParseLevel {
        level: directive.to_string(),
        source,
    })
}

/// Delete the oldest files of a rotation until at most `keep` remain.
/// Runs before the subscriber exists, so it reports a count instead of logging.
fn prune_rotated_logs(dir: &Path, file_stem: &str, keep: usize) -> Result<usize, LoggingError> {
    let mut rotated = rotated_logs(dir, file_stem)?;
    if rotated.len() <= keep {
        return Ok(0);
    }
    rotated.sort_by_key(|(_, modified)| std::cmp::Reverse(*modified));
    let stale = rotated.split_off(keep);
    let count = stale.len();
    for (path, _) in stale {
        fs::remove_file(&path).map_err(|source| LoggingError::Cleanup { path, source })?;
    }
    Ok(count)
}

fn rotated_logs(dir: &Path, file_stem: &str) -> Result<Vec<(PathBuf, SystemTime)>, LoggingError> {
    let entries = fs::read_dir(dir).map_err(|source| LoggingError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;
    Ok(entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(file_stem))
        .filter_map(|entry| {
            let modified = entry.metadata().and_then(|m| m.modified()).ok()?;
            Some((entry.path(), modified))
        })
        .collect())
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to create log directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid log filter '{level}': {source}")]
    ParseLevel {
        level: String,
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("failed to install tracing subscriber: {0}")]
    SubscriberInstall(Box<dyn std::error::Error + Send + Sync>),
    #[error("failed to list log directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to remove old log file {path}: {source}")]
    Cleanup {
        path: PathBuf,
        source: std::io::Error,
    },
}
