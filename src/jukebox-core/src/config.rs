use crate::models::{QueueSort, SortColumn, Volume};
use crate::paths::AppDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const CURRENT_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_config_version")]
    pub config_version: u32,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub player: PlayerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            logging: LoggingConfig::default(),
            remote: RemoteConfig::default(),
            player: PlayerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: LogLevel,
    #[serde(default = "default_max_log_files")]
    pub max_log_files: usize,
    /// Mirror log lines to stderr in addition to the log file.
    #[serde(default = "default_console_enabled")]
    pub console: bool,
    #[serde(default)]
    pub file_name: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_log_files: default_max_log_files(),
            console: default_console_enabled(),
            file_name: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Where the primary instance listens and how long clients wait on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_object_path")]
    pub object_path: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            object_path: default_object_path(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_initial_volume")]
    pub initial_volume: u8,
    #[serde(default)]
    pub sort_column: SortColumn,
    #[serde(default)]
    pub sort_descending: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            initial_volume: default_initial_volume(),
            sort_column: SortColumn::default(),
            sort_descending: false,
        }
    }
}

impl PlayerConfig {
    pub fn queue_sort(&self) -> QueueSort {
        QueueSort::new(self.sort_column, self.sort_descending)
    }

    pub fn volume(&self) -> Volume {
        Volume::clamped(i64::from(self.initial_volume))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("config validation failed: {0}")]
    Validation(ValidationError),
    #[error("failed to prepare configuration directories: {0}")]
    Directories(#[from] crate::paths::DirsError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unsupported config_version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("player.initial_volume {0} is above {max}", max = Volume::MAX)]
    VolumeOutOfRange(u8),
    #[error("remote.timeout_ms must be greater than zero")]
    ZeroTimeout,
    #[error("remote.endpoint '{0}' must be non-empty and must not contain '/'")]
    InvalidEndpoint(String),
    #[error("remote.object_path '{0}' must start with '/'")]
    InvalidObjectPath(String),
}

impl Config {
    pub fn load_or_default(dirs: &AppDirs) -> Result<Self, ConfigError> {
        dirs.ensure_exists()?;
        let path = Self::config_path(dirs);
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config: Config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        config.validate().map_err(ConfigError::Validation)?;
        Ok(config)
    }

    pub fn config_path(dirs: &AppDirs) -> PathBuf {
        dirs.config_dir().join("config.toml")
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.config_version != CURRENT_CONFIG_VERSION {
            return Err(ValidationError::UnsupportedVersion {
                found: self.config_version,
                expected: CURRENT_CONFIG_VERSION,
            });
        }
        if self.player.initial_volume > Volume::MAX {
            return Err(ValidationError::VolumeOutOfRange(
                self.player.initial_volume,
            ));
        }
        if self.remote.timeout_ms == 0 {
            return Err(ValidationError::ZeroTimeout);
        }
        if self.remote.endpoint.is_empty() || self.remote.endpoint.contains('/') {
            return Err(ValidationError::InvalidEndpoint(
                self.remote.endpoint.clone(),
            ));
        }
        if !self.remote.object_path.starts_with('/') {
            return Err(ValidationError::InvalidObjectPath(
                self.remote.object_path.clone(),
            ));
        }
        Ok(())
    }

    /// Apply command-line overrides; they take precedence over the file.
    pub fn with_endpoint_override(mut self, endpoint: Option<&str>) -> Result<Self, ValidationError> {
        if let Some(endpoint) = endpoint {
            self.remote.endpoint = endpoint.to_string();
            self.validate()?;
        }
        Ok(self)
    }
}

fn default_config_version() -> u32 {
    CURRENT_CONFIG_VERSION
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_max_log_files() -> usize {
    7
}

fn default_console_enabled() -> bool {
    true
}

fn default_endpoint() -> String {
    crate::APP_NAME.to_string()
}

fn default_object_path() -> String {
    "/org/jukebox/Player".to_string()
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_initial_volume() -> u8 {
    50
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.logging.max_log_files, 7);
        assert!(config.logging.console);
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.remote.endpoint, "jukebox");
        assert_eq!(config.player.volume().percent(), 50);
    }

    #[test]
    fn invalid_version_rejected() {
        let mut config = Config::default();
        config.config_version = CURRENT_CONFIG_VERSION + 1;
        let result = config.validate();
        assert!(matches!(
            result,
            Err(ValidationError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [player]
            sort_column = "track_number"
            sort_descending = true

            [remote]
            timeout_ms = 250
            "#,
        )
        .expect("config should parse");
        assert!(config.validate().is_ok());
        assert_eq!(config.player.sort_column, SortColumn::TrackNumber);
        assert!(config.player.queue_sort().descending);
        assert_eq!(config.remote.timeout(), Duration::from_millis(250));
        assert_eq!(config.remote.object_path, "/org/jukebox/Player");
    }

    #[test]
    fn remote_settings_are_validated() {
        let mut config = Config::default();
        config.remote.object_path = "org/jukebox".into();
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidObjectPath("org/jukebox".into()))
        );

        let err = Config::default()
            .with_endpoint_override(Some("a/b"))
            .expect_err("slash is not allowed");
        assert_eq!(err, ValidationError::InvalidEndpoint("a/b".into()));
    }

    #[test]
    fn load_reads_file_from_config_dir() {
        let temp = tempfile::tempdir().unwrap();
        let dirs = AppDirs::with_root(temp.path());
        dirs.ensure_exists().unwrap();
        fs::write(
            Config::config_path(&dirs),
            "[player]\ninitial_volume = 80\n",
        )
        .unwrap();

        let config = Config::load_or_default(&dirs).expect("config should load");
        assert_eq!(config.player.initial_volume, 80);
    }

    #[test]
    fn load_rejects_out_of_range_volume() {
        let temp = tempfile::tempdir().unwrap();
        let dirs = AppDirs::with_root(temp.path());
        dirs.ensure_exists().unwrap();
        fs::write(
            Config::config_path(&dirs),
            "[player]\ninitial_volume = 120\n",
        )
        .unwrap();

        let err = Config::load_or_default(&dirs).expect_err("volume above 100");
        assert!(matches!(
            err,
            ConfigError::Validation(ValidationError::VolumeOutOfRange(120))
        ));
    }
}
