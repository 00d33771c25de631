//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use thiserror::Error;
use wayfind_intent::ClassifierConfig;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Browser origins allowed to call the API.
    #[serde(default)]
    pub cors: CorsConfig,

    /// Voice WebSocket settings.
    #[serde(default)]
    pub websocket: WebSocketConfig,

    /// Intent classifier backend.
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
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

    /// Bind an OS-assigned port when `port` is already taken.
    #[serde(default = "default_true")]
    pub port_fallback: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketConfig {
    /// Seconds between keepalive pings.
    #[serde(default = "default_ping_secs")]
    pub ping_interval_secs: u64,

    /// Seconds to wait past a ping before treating the peer as dead.
    #[serde(default = "default_ping_secs")]
    pub ping_timeout_secs: u64,

    /// Largest inbound frame accepted, in bytes.
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "wayfind_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8000
}

fn default_true() -> bool {
    true
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "https://jovial-madeleine-8f088f.netlify.app".to_string(),
        "http://localhost:3000".to_string(),
    ]
}

fn default_ping_secs() -> u64 {
    20
}

fn default_max_message_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            port_fallback: true,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            ping_interval_secs: default_ping_secs(),
            ping_timeout_secs: default_ping_secs(),
            max_message_bytes: default_max_message_bytes(),
        }
    }
}

impl WebSocketConfig {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_secs)
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

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A setting has a value the server cannot run with.
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl Config {
    /// Rejects values that would break the voice socket or the classifier.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.websocket.ping_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "websocket.ping_interval_secs must be greater than 0".to_string(),
            ));
        }
        if self.websocket.ping_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "websocket.ping_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.websocket.max_message_bytes == 0 {
            return Err(ConfigError::Invalid(
                "websocket.max_message_bytes must be greater than 0".to_string(),
            ));
        }
        if self.classifier.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "classifier.timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `WAYFIND_HOST` overrides `server.host`
/// - `WAYFIND_PORT` overrides `server.port`
/// - `WAYFIND_CORS_ORIGINS` overrides `cors.allowed_origins` (comma separated)
/// - `WAYFIND_CLASSIFIER_BACKEND` overrides `classifier.backend`
/// - `WAYFIND_CLASSIFIER_ENDPOINT` overrides `classifier.endpoint`
/// - `WAYFIND_CLASSIFIER_MODEL` overrides `classifier.model`
/// - `WAYFIND_CLASSIFIER_TIMEOUT_SECS` overrides `classifier.timeout_secs`
/// - `WAYFIND_HF_TOKEN` overrides `classifier.api_token`
/// - `WAYFIND_LOG_LEVEL` overrides `logging.level`
/// - `WAYFIND_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed, or
/// if the merged settings fail [`Config::validate`].
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
    config.validate()?;
    Ok(config)
}

/// Applies `WAYFIND_*` overrides looked up through `lookup`.
///
/// Values that fail to parse are ignored with a warning.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(host) = lookup("WAYFIND_HOST") {
        match host.parse() {
            Ok(parsed) => config.server.host = parsed,
            Err(_) => tracing::warn!(value = %host, "ignoring invalid WAYFIND_HOST"),
        }
    }
    if let Some(port) = lookup("WAYFIND_PORT") {
        match port.parse() {
            Ok(parsed) => config.server.port = parsed,
            Err(_) => tracing::warn!(value = %port, "ignoring invalid WAYFIND_PORT"),
        }
    }
    if let Some(origins) = lookup("WAYFIND_CORS_ORIGINS") {
        config.cors.allowed_origins = origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Some(backend) = lookup("WAYFIND_CLASSIFIER_BACKEND") {
        match backend.parse() {
            Ok(parsed) => config.classifier.backend = parsed,
            Err(e) => tracing::warn!("ignoring WAYFIND_CLASSIFIER_BACKEND: {}", e),
        }
    }
    if let Some(endpoint) = lookup("WAYFIND_CLASSIFIER_ENDPOINT") {
        config.classifier.endpoint = endpoint;
    }
    if let Some(model) = lookup("WAYFIND_CLASSIFIER_MODEL") {
        config.classifier.model = model;
    }
    if let Some(secs) = lookup("WAYFIND_CLASSIFIER_TIMEOUT_SECS") {
        match secs.parse() {
            Ok(parsed) => config.classifier.timeout_secs = parsed,
            Err(_) => tracing::warn!(value = %secs, "ignoring invalid WAYFIND_CLASSIFIER_TIMEOUT_SECS"),
        }
    }
    if let Some(token) = lookup("WAYFIND_HF_TOKEN") {
        if !token.trim().is_empty() {
            config.classifier.api_token = Some(token);
        }
    }
    if let Some(level) = lookup("WAYFIND_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("WAYFIND_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
}
