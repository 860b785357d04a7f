//! Configuration types for the moderation console.
//!
//! This module provides the [`Config`] struct which stores the API endpoints
//! and realtime tuning. Configuration is persisted as TOML (typically at
//! `~/.config/modconsole/config.toml` on Unix systems).
//!
//! # Key Configuration Fields
//!
//! - `api_base_url`: Public API (OTP login, realtime endpoint)
//! - `admin_api_base_url`: Admin API (tasks, users, chats, videos)
//! - `page_size`: Page size for cursor-paginated listings
//! - `realtime.*`: Heartbeat and reconnection tuning
//!
//! # Example
//!
//! ```ignore
//! use modconsole_core::config::Config;
//!
//! let mut config = Config::load()?;
//! config.set("realtime.pong_timeout_ms", "5000")?;
//! config.save()?;
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConsoleError, Result};

/// Default public API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api-stage.flingzy.com";

/// Default admin API base URL.
pub const DEFAULT_ADMIN_API_BASE_URL: &str = "https://admin-api-stage.flingzy.com";

/// `Config` represents the parts of the console that the operator can configure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Public API base URL. The realtime endpoint lives at `<base>/ws`.
    pub api_base_url: String,

    /// Admin API base URL
    pub admin_api_base_url: String,

    /// Number of items requested per page for chat listings
    pub page_size: u32,

    /// Realtime connection tuning
    pub realtime: RealtimeSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            admin_api_base_url: DEFAULT_ADMIN_API_BASE_URL.to_string(),
            page_size: 20,
            realtime: RealtimeSettings::default(),
        }
    }
}

/// Heartbeat and reconnection tuning for the realtime channel.
///
/// All durations are stored in milliseconds so the TOML stays readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeSettings {
    /// Interval between liveness probes
    pub ping_interval_ms: u64,

    /// How long to wait for a liveness reply before reconnecting
    pub pong_timeout_ms: u64,

    /// Consecutive automatic retries before the operator is notified
    pub max_reconnect_attempts: u32,

    /// Base of the exponential backoff (`base * 2^attempt`)
    pub reconnect_base_delay_ms: u64,

    /// Pause before a fresh retry cycle once the attempts are exhausted
    pub exhausted_cooldown_ms: u64,

    /// Number of exhausted cycles after which retrying stops until a manual
    /// connect. `None` keeps cycling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_reconnect_cycles: Option<u32>,

    /// Delay between login and the first connect attempt
    pub initial_connect_delay_ms: u64,
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            ping_interval_ms: 20_000,
            pong_timeout_ms: 3_000,
            max_reconnect_attempts: 5,
            reconnect_base_delay_ms: 1_000,
            exhausted_cooldown_ms: 60_000,
            max_reconnect_cycles: None,
            initial_connect_delay_ms: 500,
        }
    }
}

impl RealtimeSettings {
    /// Interval between liveness probes.
    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    /// Liveness reply deadline.
    pub fn pong_timeout(&self) -> Duration {
        Duration::from_millis(self.pong_timeout_ms)
    }

    /// Base backoff delay.
    pub fn reconnect_base_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_base_delay_ms)
    }

    /// Cool-down between exhausted retry cycles.
    pub fn exhausted_cooldown(&self) -> Duration {
        Duration::from_millis(self.exhausted_cooldown_ms)
    }

    /// Delay before the first connect after login.
    pub fn initial_connect_delay(&self) -> Duration {
        Duration::from_millis(self.initial_connect_delay_ms)
    }
}

impl Config {
    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConsoleError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save config to a specific path, creating the parent directory if needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(|e| ConsoleError::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }

    /// Get the config directory (~/.config/modconsole)
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("modconsole"))
    }

    /// Get the config file path (~/.config/modconsole/config.toml)
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Load config from default location, or return default if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::config_path()
            && path.exists()
        {
            return Self::load_from(&path);
        }

        Ok(Config::default())
    }

    /// Save config to default location
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path().ok_or(ConsoleError::NoConfigDir)?;
        self.save_to(&path)
    }

    /// Set a single value by its dotted key, as used by `config set`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let invalid = || ConsoleError::InvalidConfigValue {
            key: key.to_string(),
            value: value.to_string(),
        };

        match key {
            "api_base_url" => self.api_base_url = parse_url(value)?,
            "admin_api_base_url" => self.admin_api_base_url = parse_url(value)?,
            "page_size" => self.page_size = value.parse().map_err(|_| invalid())?,
            "realtime.ping_interval_ms" => {
                self.realtime.ping_interval_ms = value.parse().map_err(|_| invalid())?
            }
            "realtime.pong_timeout_ms" => {
                self.realtime.pong_timeout_ms = value.parse().map_err(|_| invalid())?
            }
            "realtime.max_reconnect_attempts" => {
                self.realtime.max_reconnect_attempts = value.parse().map_err(|_| invalid())?
            }
            "realtime.reconnect_base_delay_ms" => {
                self.realtime.reconnect_base_delay_ms = value.parse().map_err(|_| invalid())?
            }
            "realtime.exhausted_cooldown_ms" => {
                self.realtime.exhausted_cooldown_ms = value.parse().map_err(|_| invalid())?
            }
            "realtime.max_reconnect_cycles" => {
                self.realtime.max_reconnect_cycles = match value {
                    "" | "none" => None,
                    v => Some(v.parse().map_err(|_| invalid())?),
                }
            }
            "realtime.initial_connect_delay_ms" => {
                self.realtime.initial_connect_delay_ms = value.parse().map_err(|_| invalid())?
            }
            _ => return Err(ConsoleError::UnknownConfigKey(key.to_string())),
        }

        Ok(())
    }
}

fn parse_url(value: &str) -> Result<String> {
    url::Url::parse(value).map_err(|e| ConsoleError::InvalidUrl {
        url: value.to_string(),
        source: e,
    })?;
    Ok(value.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_realtime_protocol() {
        let config = Config::default();
        assert_eq!(config.realtime.ping_interval(), Duration::from_secs(20));
        assert_eq!(config.realtime.pong_timeout(), Duration::from_secs(3));
        assert_eq!(config.realtime.max_reconnect_attempts, 5);
        assert_eq!(config.page_size, 20);
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            admin_api_base_url = "http://localhost:9000"

            [realtime]
            pong_timeout_ms = 5000
            "#,
        )
        .unwrap();

        assert_eq!(config.admin_api_base_url, "http://localhost:9000");
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.realtime.pong_timeout_ms, 5000);
        assert_eq!(config.realtime.ping_interval_ms, 20_000);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.realtime.max_reconnect_cycles = Some(3);
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_set_known_keys() {
        let mut config = Config::default();
        config.set("page_size", "50").unwrap();
        config.set("api_base_url", "http://localhost:8080/").unwrap();
        config.set("realtime.max_reconnect_cycles", "2").unwrap();

        assert_eq!(config.page_size, 50);
        assert_eq!(config.api_base_url, "http://localhost:8080");
        assert_eq!(config.realtime.max_reconnect_cycles, Some(2));

        config.set("realtime.max_reconnect_cycles", "none").unwrap();
        assert_eq!(config.realtime.max_reconnect_cycles, None);
    }

    #[test]
    fn test_set_rejects_bad_input() {
        let mut config = Config::default();
        assert!(matches!(
            config.set("nope", "1"),
            Err(ConsoleError::UnknownConfigKey(_))
        ));
        assert!(matches!(
            config.set("page_size", "many"),
            Err(ConsoleError::InvalidConfigValue { .. })
        ));
        assert!(matches!(
            config.set("admin_api_base_url", "not a url"),
            Err(ConsoleError::InvalidUrl { .. })
        ));
    }
}
