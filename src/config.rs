// Configuration loading and parsing (mapban.toml).

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::store;
use crate::timer::DEFAULT_BAN_SECONDS;
use crate::ws_client::{
    INITIAL_RECONNECT_DELAY, MAX_RECONNECT_ATTEMPTS, MAX_RECONNECT_DELAY, PING_INTERVAL,
};

/// File name looked up inside the config directory.
pub const CONFIG_FILE: &str = "mapban.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub timer: TimerConfig,
    pub channel: ChannelConfig,
    pub storage: StorageConfig,
}

/// Backend endpoints. `api_base` feeds the REST transport, `ws_base` the
/// room channel.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub api_base: String,
    pub ws_base: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8080".to_string(),
            ws_base: "ws://localhost:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Per-turn countdown in seconds for locally hosted sessions.
    pub ban_seconds: u32,
    /// When true, timer expiry requests a turn pass from the room instead
    /// of only notifying the UI.
    pub auto_pass: bool,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            ban_seconds: DEFAULT_BAN_SECONDS,
            auto_pass: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub ping_interval_secs: u64,
    pub reconnect_initial_ms: u64,
    pub reconnect_max_ms: u64,
    pub max_reconnect_attempts: u32,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            ping_interval_secs: PING_INTERVAL.as_secs(),
            reconnect_initial_ms: INITIAL_RECONNECT_DELAY.as_millis() as u64,
            reconnect_max_ms: MAX_RECONNECT_DELAY.as_millis() as u64,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = store::default_db_path()
            .map(|path| path.to_string_lossy().into_owned())
            .unwrap_or_else(|| "mapban.db".to_string());
        Self { db_path }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from an explicit file path. The file
/// must exist.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let text = read_file(path)?;
    let config: Config = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    validate(&config)?;
    Ok(config)
}

/// Load `mapban.toml` from `dir`. A missing file falls back to defaults
/// (this is a client library, not an app with required config); a present
/// but broken file is still an error.
pub fn load_config_from(dir: &Path) -> Result<Config, ConfigError> {
    let path = dir.join(CONFIG_FILE);
    if !path.exists() {
        let config = Config::default();
        validate(&config)?;
        return Ok(config);
    }
    load_config(&path)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    // Server validations
    if config.server.api_base.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "server.api_base".into(),
            message: "must not be empty".into(),
        });
    }
    if config.server.ws_base.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "server.ws_base".into(),
            message: "must not be empty".into(),
        });
    }

    // Timer validations. The backend rejects sessions outside 0..=300
    // seconds; a zero local default would disable every demo countdown, so
    // the floor here is 1.
    let secs = config.timer.ban_seconds;
    if !(1..=300).contains(&secs) {
        return Err(ConfigError::ValidationError {
            field: "timer.ban_seconds".into(),
            message: format!("must be between 1 and 300 inclusive, got {secs}"),
        });
    }

    // Channel validations
    if config.channel.ping_interval_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "channel.ping_interval_secs".into(),
            message: "must be greater than 0".into(),
        });
    }
    if config.channel.reconnect_initial_ms == 0 {
        return Err(ConfigError::ValidationError {
            field: "channel.reconnect_initial_ms".into(),
            message: "must be greater than 0".into(),
        });
    }
    if config.channel.reconnect_max_ms < config.channel.reconnect_initial_ms {
        return Err(ConfigError::ValidationError {
            field: "channel.reconnect_max_ms".into(),
            message: format!(
                "must be at least reconnect_initial_ms ({})",
                config.channel.reconnect_initial_ms
            ),
        });
    }

    // Storage validations
    if config.storage.db_path.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "storage.db_path".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Helper: fresh temp dir for one test, removed afterwards by the test
    /// itself.
    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mapban_config_{name}"));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn defaults_are_valid_and_carry_the_channel_constants() {
        let config = Config::default();
        validate(&config).expect("defaults should validate");

        assert_eq!(config.timer.ban_seconds, DEFAULT_BAN_SECONDS);
        assert!(!config.timer.auto_pass);
        assert_eq!(config.channel.ping_interval_secs, 30);
        assert_eq!(config.channel.reconnect_initial_ms, 2000);
        assert_eq!(config.channel.reconnect_max_ms, 30_000);
        assert_eq!(config.channel.max_reconnect_attempts, 5);
        assert!(!config.storage.db_path.is_empty());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = test_dir("missing");
        let config = load_config_from(&dir).expect("should fall back to defaults");
        assert_eq!(config.server.api_base, "http://localhost:8080");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn strict_load_requires_the_file() {
        let dir = test_dir("strict");
        let err = load_config(&dir.join(CONFIG_FILE)).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_sections() {
        let dir = test_dir("partial");
        fs::write(
            dir.join(CONFIG_FILE),
            "[server]\napi_base = \"https://veto.example.net\"\n\n[timer]\nauto_pass = true\n",
        )
        .unwrap();

        let config = load_config_from(&dir).expect("partial config should load");
        assert_eq!(config.server.api_base, "https://veto.example.net");
        // Untouched fields keep their defaults.
        assert_eq!(config.server.ws_base, "ws://localhost:8080");
        assert_eq!(config.timer.ban_seconds, DEFAULT_BAN_SECONDS);
        assert!(config.timer.auto_pass);
        assert_eq!(config.channel.max_reconnect_attempts, 5);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn parse_errors_name_the_file() {
        let dir = test_dir("broken");
        fs::write(dir.join(CONFIG_FILE), "[server\napi_base = ").unwrap();

        match load_config_from(&dir) {
            Err(ConfigError::ParseError { path, .. }) => {
                assert!(path.ends_with(CONFIG_FILE));
            }
            other => panic!("expected parse error, got {other:?}"),
        }

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn timer_seconds_must_stay_in_the_server_range() {
        for (value, should_pass) in [(0u32, false), (1, true), (300, true), (301, false)] {
            let mut config = Config::default();
            config.timer.ban_seconds = value;
            let result = validate(&config);
            assert_eq!(result.is_ok(), should_pass, "ban_seconds = {value}");
            if let Err(ConfigError::ValidationError { field, .. }) = result {
                assert_eq!(field, "timer.ban_seconds");
            }
        }
    }

    #[test]
    fn empty_urls_are_rejected() {
        let mut config = Config::default();
        config.server.api_base = "  ".to_string();
        match validate(&config) {
            Err(ConfigError::ValidationError { field, .. }) => {
                assert_eq!(field, "server.api_base");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn reconnect_ceiling_cannot_undershoot_the_initial_delay() {
        let mut config = Config::default();
        config.channel.reconnect_max_ms = 500;
        match validate(&config) {
            Err(ConfigError::ValidationError { field, .. }) => {
                assert_eq!(field, "channel.reconnect_max_ms");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
