//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - pgpanel.toml (default configuration)
//! - pgpanel.local.toml (git-ignored local overrides)
//! - Environment variables (PGPANEL_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # pgpanel.toml
//! [server]
//! url = "https://panel.example.com"
//! timeout_secs = 10
//!
//! [view]
//! default_limit = 25
//!
//! [logging]
//! level = "debug"
//! format = "json"
//! file = "pgpanel.log"
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! PGPANEL_SERVER__URL=http://localhost:9000
//! PGPANEL_AUTH__TOKEN_FILE=/run/pgpanel/token
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::row_query::{DEFAULT_LIMIT, MAX_LIMIT};

pub const CONFIG_FILE: &str = "pgpanel.toml";
pub const LOCAL_CONFIG_FILE: &str = "pgpanel.local.toml";
pub const ENV_PREFIX: &str = "PGPANEL_";

/// Main configuration struct
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Panel backend connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the backend (the `/api` prefix is added per request)
    #[serde(default = "default_server_url")]
    pub url: String,

    /// Per-request timeout in seconds (0 = no timeout)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Where the bearer token from `login` is kept
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,
}

/// Table view paging
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewConfig {
    #[serde(default = "default_view_limit")]
    pub default_limit: u64,

    #[serde(default = "default_max_limit")]
    pub max_limit: u64,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Write logs to this file instead of stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

fn default_server_url() -> String {
    "http://localhost:8080".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_token_file() -> PathBuf {
    PathBuf::from(".pgpanel_token")
}
fn default_view_limit() -> u64 {
    DEFAULT_LIMIT
}
fn default_max_limit() -> u64 {
    MAX_LIMIT
}
fn default_log_level() -> String {
    "warn".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Merges in order:
    /// 1. pgpanel.toml (base configuration)
    /// 2. pgpanel.local.toml (local overrides, git-ignored)
    /// 3. Environment variables (PGPANEL_* prefix)
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(CONFIG_FILE))
            .merge(Toml::file(LOCAL_CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
    }

    /// Load configuration from specific file path
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
    }

    /// Explicit file when given, default locations otherwise
    pub fn load_from(path: Option<&Path>) -> Result<Self, figment::Error> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::load(),
        }
    }
}

impl ServerConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl ViewConfig {
    /// `default_limit` clamped into `1..=max_limit`
    pub fn page_size(&self) -> u64 {
        self.clamp_limit(self.default_limit)
    }

    pub fn clamp_limit(&self, limit: u64) -> u64 {
        limit.clamp(1, self.max_limit.max(1))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            url: default_server_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            token_file: default_token_file(),
        }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        ViewConfig {
            default_limit: default_view_limit(),
            max_limit: default_max_limit(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.url, "http://localhost:8080");
        assert_eq!(config.server.timeout_secs, 30);
        assert_eq!(config.auth.token_file, PathBuf::from(".pgpanel_token"));
        assert_eq!(config.view.default_limit, 50);
        assert_eq!(config.view.max_limit, 500);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();

        assert!(toml_str.contains("[server]"));
        assert!(toml_str.contains("[auth]"));
        assert!(toml_str.contains("[view]"));
        assert!(toml_str.contains("[logging]"));
        // Unset log file is omitted
        assert!(!toml_str.contains("file ="));
    }

    #[test]
    fn test_default_logging_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, "text");
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str("[server]\nurl = \"http://db-admin:9000\"\n").unwrap();
        assert_eq!(config.server.url, "http://db-admin:9000");
        assert_eq!(config.server.timeout_secs, 30);
        assert_eq!(config.view, ViewConfig::default());
    }

    #[test]
    fn test_timeout_zero_disables() {
        let server = ServerConfig {
            timeout_secs: 0,
            ..ServerConfig::default()
        };
        assert_eq!(server.timeout(), None);
        assert_eq!(
            ServerConfig::default().timeout(),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_page_size_clamped() {
        let view = ViewConfig {
            default_limit: 900,
            max_limit: 200,
        };
        assert_eq!(view.page_size(), 200);
        let view = ViewConfig {
            default_limit: 0,
            max_limit: 200,
        };
        assert_eq!(view.page_size(), 1);
    }
}
