// common/src/config.rs
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use config::{Config as ConfigFile, File, Environment};

/// Central configuration for the bridge server and the auth core
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub server_addr: String,
    pub surface_token: String,  // Pre-shared key for approval UI sockets
    pub log_level: String,

    pub bridge: BridgeConfig,
    pub tokens: TokenConfig,
    pub sessions: SessionConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Whether the iframe transport takes part in selection
    pub embedded_enabled: bool,
    /// `targetOrigin` used when posting to an opener or parent
    pub target_origin: String,
    /// Origins accepted on inbound popup messages; empty accepts any
    pub allowed_origins: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenConfig {
    pub secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    pub ttl_secs: u64,
    pub cleanup_interval_secs: u64,
    pub heartbeat_interval_secs: u64,
    pub heartbeat_timeout_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            embedded_enabled: false,
            target_origin: "*".to_string(),
            allowed_origins: Vec::new(),
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: "dev_secret".to_string(),
            access_ttl_secs: 900,
            refresh_ttl_secs: 86400,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 120,
            cleanup_interval_secs: 60,
            heartbeat_interval_secs: 5,
            heartbeat_timeout_secs: 30,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:8080".to_string(),
            surface_token: "dev_token".to_string(),
            log_level: "info".to_string(),
            bridge: BridgeConfig::default(),
            tokens: TokenConfig::default(),
            sessions: SessionConfig::default(),
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(default)
}

fn env_number<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Where the active configuration came from, reported once logging is up.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigSource {
    Layered { config_dir: PathBuf, run_mode: String },
    Environment { error: String },
}

impl ConfigSource {
    pub fn log(&self) {
        match self {
            ConfigSource::Layered { config_dir, run_mode } => tracing::info!(
                "Configuration loaded from {} (run mode: {}) and environment",
                config_dir.display(),
                run_mode
            ),
            ConfigSource::Environment { error } => {
                tracing::warn!("Failed to load configuration from files: {}", error);
                tracing::info!("Falling back to environment variables only");
            }
        }
    }
}

fn locate() -> (PathBuf, String) {
    // Get the run mode, defaulting to "development"
    let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    // Locate the config directory
    let config_dir = env::var("CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            // Check if we're in the project root or a subcrate
            let mut path = PathBuf::from("./config");
            if !path.exists() {
                path = PathBuf::from("../config");
            }
            path
        });

    (config_dir, run_mode)
}

/// `{prefix}__SECTION__KEY` variables; `bridge.allowed_origins` is a
/// comma-separated list.
fn environment(prefix: &str) -> Environment {
    Environment::with_prefix(prefix)
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("bridge.allowed_origins")
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let (config_dir, run_mode) = locate();
        Self::load_from(&config_dir, &run_mode)
    }

    fn load_from(config_dir: &Path, run_mode: &str) -> Result<Self, config::ConfigError> {
        let defaults = ConfigFile::try_from(&Config::default())?;

        ConfigFile::builder()
            // Start with built-in defaults so partial files are fine
            .add_source(defaults)
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Add environment specific config
            .add_source(File::from(config_dir.join(format!("{}.toml", run_mode))).required(false))
            // Add a local config file for local overrides
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // Add environment variables with prefix "APP"
            .add_source(environment("APP"))
            .build()?
            .try_deserialize()
    }

    /// Load from files, falling back to plain environment variables. The
    /// source is returned rather than logged so callers can report it after
    /// installing a subscriber.
    pub fn from_env() -> (Self, ConfigSource) {
        let (config_dir, run_mode) = locate();

        match Self::load_from(&config_dir, &run_mode) {
            Ok(config) => (config, ConfigSource::Layered { config_dir, run_mode }),
            Err(e) => (Self::from_plain_env(), ConfigSource::Environment { error: e.to_string() }),
        }
    }

    fn from_plain_env() -> Self {
        let defaults = Config::default();

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            server_addr: env::var("SERVER_ADDR").unwrap_or(defaults.server_addr),
            surface_token: env::var("SURFACE_TOKEN").unwrap_or(defaults.surface_token),
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            bridge: BridgeConfig {
                embedded_enabled: env_flag("EMBEDDED_ENABLED", defaults.bridge.embedded_enabled),
                target_origin: env::var("TARGET_ORIGIN").unwrap_or(defaults.bridge.target_origin),
                allowed_origins,
            },
            tokens: TokenConfig {
                secret: env::var("TOKEN_SECRET").unwrap_or(defaults.tokens.secret),
                access_ttl_secs: env_number("ACCESS_TTL_SECS", defaults.tokens.access_ttl_secs),
                refresh_ttl_secs: env_number("REFRESH_TTL_SECS", defaults.tokens.refresh_ttl_secs),
            },
            sessions: SessionConfig {
                ttl_secs: env_number("SESSION_TTL_SECS", defaults.sessions.ttl_secs),
                cleanup_interval_secs: env_number(
                    "SESSION_CLEANUP_INTERVAL_SECS",
                    defaults.sessions.cleanup_interval_secs,
                ),
                heartbeat_interval_secs: env_number(
                    "HEARTBEAT_INTERVAL_SECS",
                    defaults.sessions.heartbeat_interval_secs,
                ),
                heartbeat_timeout_secs: env_number(
                    "HEARTBEAT_TIMEOUT_SECS",
                    defaults.sessions.heartbeat_timeout_secs,
                ),
            },
        }
    }
}
