//! Harness configuration with TOML, environment variable and command-line
//! sources.
//!
//! Precedence, lowest first: built-in defaults, the `[harness]` table of the
//! config file, `MNIST_*` environment variables, command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fmt, fs};

use mnist_protocol::{IngestConfig, RECORD_FIELDS};
use mnist_session::ConsoleFormat;
use serde::{Deserialize, Serialize};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "mnist.toml";

/// Shortest possible complete record: single-digit fields, one separator
/// between each pair.
pub const MIN_BUFFER_CAPACITY: usize = 2 * RECORD_FIELDS - 1;

pub const ENV_BUFFER_CAPACITY: &str = "MNIST_BUFFER_CAPACITY";
pub const ENV_IDLE_TIMEOUT_MS: &str = "MNIST_IDLE_TIMEOUT_MS";
pub const ENV_POLL_TIMEOUT_US: &str = "MNIST_POLL_TIMEOUT_US";
pub const ENV_PROGRESS_EVERY: &str = "MNIST_PROGRESS_EVERY";
pub const ENV_MODEL_PATH: &str = "MNIST_MODEL_PATH";
pub const ENV_LOG_LEVEL: &str = "MNIST_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "MNIST_LOG_FORMAT";
pub const ENV_CONSOLE_FORMAT: &str = "MNIST_CONSOLE_FORMAT";
pub const ENV_SHOW_DISPLAY: &str = "MNIST_SHOW_DISPLAY";

/// Every environment variable the loader reads.
pub const ENV_KEYS: [&str; 9] = [
    ENV_BUFFER_CAPACITY,
    ENV_IDLE_TIMEOUT_MS,
    ENV_POLL_TIMEOUT_US,
    ENV_PROGRESS_EVERY,
    ENV_MODEL_PATH,
    ENV_LOG_LEVEL,
    ENV_LOG_FORMAT,
    ENV_CONSOLE_FORMAT,
    ENV_SHOW_DISPLAY,
];

// ── Errors ──────────────────────────────────────────────────────────

/// Errors produced by configuration loading or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unknown log format: {0}")]
    UnknownLogFormat(String),

    #[error("invalid environment variable value for {key}: {value}")]
    InvalidEnvVar { key: String, value: String },
}

// ── LogFormat ───────────────────────────────────────────────────────

/// Output format of the diagnostic log on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Compact => write!(f, "compact"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::UnknownLogFormat(other.to_string())),
        }
    }
}

// ── TOML wrapper ────────────────────────────────────────────────────

/// Wrapper used for the `[harness]` table in TOML files.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TomlWrapper {
    harness: HarnessConfig,
}

// ── Command-line overrides ──────────────────────────────────────────

/// Values given on the command line. `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub model_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub console_format: Option<ConsoleFormat>,
    pub no_display: bool,
}

// ── HarnessConfig ───────────────────────────────────────────────────

/// Effective settings for one `mnist-demo` run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub buffer_capacity: usize,
    pub idle_timeout_ms: u64,
    pub poll_timeout_us: u64,
    pub progress_every: usize,
    pub model_path: Option<PathBuf>,
    pub log_level: String,
    pub log_format: LogFormat,
    pub console_format: ConsoleFormat,
    pub show_display: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        let ingest = IngestConfig::default();
        Self {
            buffer_capacity: ingest.capacity,
            idle_timeout_ms: ingest.idle_timeout.as_millis() as u64,
            poll_timeout_us: ingest.poll_timeout.as_micros() as u64,
            progress_every: ingest.progress_every,
            model_path: None,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            console_format: ConsoleFormat::Text,
            show_display: true,
        }
    }
}

impl HarnessConfig {
    /// Resolve every layer and validate the result.
    ///
    /// An explicit `path` must exist. Without one, [`DEFAULT_CONFIG_FILE`]
    /// in the working directory is used if present.
    pub fn load(path: Option<&Path>, overrides: &CliOverrides) -> Result<Self, ConfigError> {
        let mut cfg = match path {
            Some(p) if !p.exists() => return Err(ConfigError::NotFound(p.to_path_buf())),
            Some(p) => Self::from_toml(p)?,
            None => Self::from_toml(Path::new(DEFAULT_CONFIG_FILE))?,
        };
        cfg.apply_env()?;
        cfg.apply_overrides(overrides);
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from a TOML file at `path`.
    ///
    /// The file is expected to contain a `[harness]` table. If the file
    /// does not exist, returns `Ok(Self::default())`.
    pub fn from_toml(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found; using defaults");
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        let wrapper: TomlWrapper = toml::from_str(&text)?;
        Ok(wrapper.harness)
    }

    /// Serialize to a TOML string (wrapped in `[harness]`).
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        let wrapper = TomlWrapper { harness: self.clone() };
        Ok(toml::to_string_pretty(&wrapper)?)
    }

    /// Overlay any `MNIST_*` environment variables that are set.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(v) = env::var(ENV_BUFFER_CAPACITY) {
            self.buffer_capacity = parse_env(ENV_BUFFER_CAPACITY, &v)?;
        }
        if let Ok(v) = env::var(ENV_IDLE_TIMEOUT_MS) {
            self.idle_timeout_ms = parse_env(ENV_IDLE_TIMEOUT_MS, &v)?;
        }
        if let Ok(v) = env::var(ENV_POLL_TIMEOUT_US) {
            self.poll_timeout_us = parse_env(ENV_POLL_TIMEOUT_US, &v)?;
        }
        if let Ok(v) = env::var(ENV_PROGRESS_EVERY) {
            self.progress_every = parse_env(ENV_PROGRESS_EVERY, &v)?;
        }
        if let Ok(v) = env::var(ENV_MODEL_PATH) {
            self.model_path = (!v.is_empty()).then(|| PathBuf::from(v));
        }
        if let Ok(v) = env::var(ENV_LOG_LEVEL) {
            self.log_level = v;
        }
        if let Ok(v) = env::var(ENV_LOG_FORMAT) {
            self.log_format = v.parse()?;
        }
        if let Ok(v) = env::var(ENV_CONSOLE_FORMAT) {
            self.console_format = v.parse().map_err(|_| invalid_env(ENV_CONSOLE_FORMAT, &v))?;
        }
        if let Ok(v) = env::var(ENV_SHOW_DISPLAY) {
            self.show_display = parse_env_bool(ENV_SHOW_DISPLAY, &v)?;
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &CliOverrides) {
        if let Some(path) = &overrides.model_path {
            self.model_path = Some(path.clone());
        }
        if let Some(level) = &overrides.log_level {
            self.log_level = level.clone();
        }
        if let Some(format) = overrides.log_format {
            self.log_format = format;
        }
        if let Some(format) = overrides.console_format {
            self.console_format = format;
        }
        if overrides.no_display {
            self.show_display = false;
        }
    }

    // ── Validation ──────────────────────────────────────────────

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_capacity < MIN_BUFFER_CAPACITY {
            return Err(ConfigError::Validation(format!(
                "buffer_capacity must be at least {MIN_BUFFER_CAPACITY} to hold a full record"
            )));
        }
        if self.idle_timeout_ms == 0 {
            return Err(ConfigError::Validation("idle_timeout_ms must be > 0".into()));
        }
        if self.poll_timeout_us == 0 {
            return Err(ConfigError::Validation("poll_timeout_us must be > 0".into()));
        }
        if self.poll_timeout() >= self.idle_timeout() {
            return Err(ConfigError::Validation(
                "poll_timeout_us must be shorter than idle_timeout_ms".into(),
            ));
        }
        if let Err(e) = EnvFilter::try_new(&self.log_level) {
            return Err(ConfigError::Validation(format!(
                "invalid log_level '{}': {e}",
                self.log_level
            )));
        }
        Ok(())
    }

    // ── Derived values ──────────────────────────────────────────

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_micros(self.poll_timeout_us)
    }

    pub fn ingest_config(&self) -> IngestConfig {
        IngestConfig {
            capacity: self.buffer_capacity,
            idle_timeout: self.idle_timeout(),
            poll_timeout: self.poll_timeout(),
            progress_every: self.progress_every,
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn invalid_env(key: &str, val: &str) -> ConfigError {
    ConfigError::InvalidEnvVar { key: key.to_string(), value: val.to_string() }
}

fn parse_env<T: std::str::FromStr>(key: &str, val: &str) -> Result<T, ConfigError> {
    val.trim().parse::<T>().map_err(|_| invalid_env(key, val))
}

fn parse_env_bool(key: &str, val: &str) -> Result<bool, ConfigError> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => {
            warn!(key, value = val, "unrecognised boolean");
            Err(invalid_env(key, val))
        }
    }
}
