//! # Configuration
//!
//! Runtime configuration for Cartwright.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     CARTWRIGHT_DATABASE_PATH=/var/lib/cartwright/cartwright.db         │
//! │     CARTWRIGHT_LOG=debug                                               │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/cartwright/cartwright.toml (Linux)                       │
//! │     ~/Library/Application Support/dev.cartwright.cartwright/... (macOS)│
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "cartwright.db"
//! max_connections = 5
//! lock_timeout_ms = 5000
//!
//! [orders]
//! page_size = 10
//! max_page_size = 100
//!
//! [access]
//! conceal_foreign_resources = true
//!
//! [outbox]
//! batch_size = 50
//! max_attempts = 5
//!
//! [logging]
//! filter = "info"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use cartwright_db::DbConfig;

// =============================================================================
// Errors
// =============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: '{value}'")]
    InvalidEnv { var: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// `[database]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path, or `:memory:`.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Wait for a pooled connection (seconds).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Wait for the writer lock (milliseconds).
    #[serde(default = "default_lock_timeout")]
    pub lock_timeout_ms: u64,

    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("cartwright.db")
}
fn default_max_connections() -> u32 {
    5
}
fn default_min_connections() -> u32 {
    1
}
fn default_connect_timeout() -> u64 {
    30
}
fn default_lock_timeout() -> u64 {
    5000
}
fn default_true() -> bool {
    true
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            lock_timeout_ms: default_lock_timeout(),
            run_migrations: true,
        }
    }
}

/// `[orders]` section: order history pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSettings {
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

fn default_page_size() -> u32 {
    10
}
fn default_max_page_size() -> u32 {
    100
}

impl Default for OrderSettings {
    fn default() -> Self {
        OrderSettings {
            page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

/// `[access]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessSettings {
    /// Report another user's cart line or order as not found (true) or
    /// as forbidden (false).
    #[serde(default = "default_true")]
    pub conceal_foreign_resources: bool,
}

impl Default for AccessSettings {
    fn default() -> Self {
        AccessSettings {
            conceal_foreign_resources: true,
        }
    }
}

/// `[outbox]` section: order confirmation relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxSettings {
    /// Entries handled per relay pass.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Entries that failed this many times are left alone.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_batch_size() -> u32 {
    50
}
fn default_max_attempts() -> u32 {
    5
}

impl Default for OutboxSettings {
    fn default() -> Self {
        OutboxSettings {
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_filter(),
        }
    }
}

// =============================================================================
// AppConfig
// =============================================================================

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub orders: OrderSettings,

    #[serde(default)]
    pub access: AccessSettings,

    #[serde(default)]
    pub outbox: OutboxSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (explicit path, else the platform config dir)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|var| std::env::var(var).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML document. Missing keys take their defaults.
    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Applies `CARTWRIGHT_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("CARTWRIGHT_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(value) = lookup("CARTWRIGHT_MAX_CONNECTIONS") {
            self.database.max_connections = parse_env("CARTWRIGHT_MAX_CONNECTIONS", &value)?;
        }

        if let Some(value) = lookup("CARTWRIGHT_LOCK_TIMEOUT_MS") {
            self.database.lock_timeout_ms = parse_env("CARTWRIGHT_LOCK_TIMEOUT_MS", &value)?;
        }

        if let Some(value) = lookup("CARTWRIGHT_ORDERS_PAGE_SIZE") {
            self.orders.page_size = parse_env("CARTWRIGHT_ORDERS_PAGE_SIZE", &value)?;
        }

        if let Some(filter) = lookup("CARTWRIGHT_LOG") {
            self.logging.filter = filter;
        }

        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be at least 1".into(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid(
                "database.min_connections must not exceed max_connections".into(),
            ));
        }

        if self.database.lock_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "database.lock_timeout_ms must be greater than 0".into(),
            ));
        }

        if self.orders.page_size == 0 || self.orders.page_size > self.orders.max_page_size {
            return Err(ConfigError::Invalid(format!(
                "orders.page_size must be between 1 and {}",
                self.orders.max_page_size
            )));
        }

        if self.outbox.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "outbox.batch_size must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Pool settings for [`cartwright_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database.path.clone())
            .max_connections(self.database.max_connections)
            .min_connections(self.database.min_connections)
            .connect_timeout(Duration::from_secs(self.database.connect_timeout_secs))
            .lock_timeout(Duration::from_millis(self.database.lock_timeout_ms))
            .run_migrations(self.database.run_migrations)
    }

    /// `cartwright.toml` in the platform config directory.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "cartwright", "cartwright")
            .map(|dirs| dirs.config_dir().join("cartwright.toml"))
    }
}

fn parse_env<T: std::str::FromStr>(var: &str, value: &str) -> ConfigResult<T> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var: var.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.database.lock_timeout_ms, 5000);
        assert_eq!(config.orders.page_size, 10);
        assert!(config.access.conceal_foreign_resources);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [database]
            path = "/tmp/shop.db"
            lock_timeout_ms = 250

            [access]
            conceal_foreign_resources = false
            "#,
        )
        .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/tmp/shop.db"));
        assert_eq!(config.database.lock_timeout_ms, 250);
        assert_eq!(config.database.max_connections, 5);
        assert!(!config.access.conceal_foreign_resources);
        assert_eq!(config.outbox.max_attempts, 5);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(env(&[
                ("CARTWRIGHT_DATABASE_PATH", "/data/c.db"),
                ("CARTWRIGHT_MAX_CONNECTIONS", "12"),
                ("CARTWRIGHT_ORDERS_PAGE_SIZE", "25"),
                ("CARTWRIGHT_LOG", "cartwright=debug"),
            ]))
            .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/data/c.db"));
        assert_eq!(config.database.max_connections, 12);
        assert_eq!(config.orders.page_size, 25);
        assert_eq!(config.logging.filter, "cartwright=debug");
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = AppConfig::default();
        let err = config
            .apply_overrides(env(&[("CARTWRIGHT_LOCK_TIMEOUT_MS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.database.min_connections = 9;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.orders.page_size = 101;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.outbox.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.database.lock_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cartwright.toml");
        std::fs::write(&path, "[orders]\npage_size = 20\n").unwrap();

        let config = AppConfig::load(Some(path)).unwrap();
        assert_eq!(config.orders.page_size, 20);
    }

    #[test]
    fn test_db_config_mapping() {
        let mut config = AppConfig::default();
        config.database.lock_timeout_ms = 750;

        let db = config.db_config();
        assert_eq!(db.lock_timeout, Duration::from_millis(750));
        assert_eq!(db.max_connections, 5);
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&AppConfig::default()).unwrap();
        assert!(toml_str.contains("[database]"));
        assert!(toml_str.contains("[outbox]"));
    }
}
