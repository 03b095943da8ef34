//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Real-time distribution settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// SQLite busy timeout, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "campus_realtime=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Which fan-out implementation the server runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanoutKind {
    /// In-process broadcast. Single server process only.
    #[default]
    Local,
    /// Broadcast through the shared database log, for several processes
    /// attached to one database file.
    SharedLog,
}

impl FromStr for FanoutKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "shared_log" => Ok(Self::SharedLog),
            other => Err(format!("unknown fanout kind: {other}")),
        }
    }
}

/// Real-time distribution configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    /// Seen-set capacity per session inbox.
    #[serde(default = "default_seen_capacity")]
    pub seen_capacity: usize,

    /// Fan-out implementation.
    #[serde(default)]
    pub fanout: FanoutKind,

    /// Capacity of the in-process broadcast buffer.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Fallback poll interval in milliseconds. `0` disables polling.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How often the shared-log relay tails the log, in milliseconds.
    #[serde(default = "default_tail_interval_ms")]
    pub tail_interval_ms: u64,

    /// Age after which shared-log rows are pruned, in seconds.
    #[serde(default = "default_log_retention_secs")]
    pub log_retention_secs: u64,

    /// Interval between shared-log pruning runs, in seconds.
    #[serde(default = "default_retention_interval_secs")]
    pub retention_interval_secs: u64,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "campus.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_seen_capacity() -> usize {
    campus_realtime::DEFAULT_SEEN_CAPACITY
}

fn default_channel_capacity() -> usize {
    campus_realtime::DEFAULT_CHANNEL_CAPACITY
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

fn default_tail_interval_ms() -> u64 {
    100
}

fn default_log_retention_secs() -> u64 {
    3_600
}

fn default_retention_interval_secs() -> u64 {
    300
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            seen_capacity: default_seen_capacity(),
            fanout: FanoutKind::default(),
            channel_capacity: default_channel_capacity(),
            poll_interval_ms: default_poll_interval_ms(),
            tail_interval_ms: default_tail_interval_ms(),
            log_retention_secs: default_log_retention_secs(),
            retention_interval_secs: default_retention_interval_secs(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `CAMPUS_HOST` overrides `server.host`
/// - `CAMPUS_PORT` overrides `server.port`
/// - `CAMPUS_DB_PATH` overrides `database.path`
/// - `CAMPUS_LOG_LEVEL` overrides `logging.level`
/// - `CAMPUS_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `CAMPUS_FANOUT` overrides `realtime.fanout` ("local" or "shared_log")
/// - `CAMPUS_SEEN_CAPACITY` overrides `realtime.seen_capacity`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Applies `CAMPUS_*` overrides. Unparseable values are ignored with a warning.
fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(host) = var("CAMPUS_HOST") {
        match host.parse() {
            Ok(parsed) => config.server.host = parsed,
            Err(_) => tracing::warn!(value = %host, "ignoring invalid CAMPUS_HOST"),
        }
    }
    if let Some(port) = var("CAMPUS_PORT") {
        match port.parse() {
            Ok(parsed) => config.server.port = parsed,
            Err(_) => tracing::warn!(value = %port, "ignoring invalid CAMPUS_PORT"),
        }
    }
    if let Some(db_path) = var("CAMPUS_DB_PATH") {
        config.database.path = db_path;
    }
    if let Some(level) = var("CAMPUS_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("CAMPUS_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Some(fanout) = var("CAMPUS_FANOUT") {
        match fanout.parse() {
            Ok(parsed) => config.realtime.fanout = parsed,
            Err(e) => tracing::warn!("ignoring CAMPUS_FANOUT: {}", e),
        }
    }
    if let Some(capacity) = var("CAMPUS_SEEN_CAPACITY") {
        match capacity.parse() {
            Ok(parsed) => config.realtime.seen_capacity = parsed,
            Err(_) => tracing::warn!(value = %capacity, "ignoring invalid CAMPUS_SEEN_CAPACITY"),
        }
    }
}
