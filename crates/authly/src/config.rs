//! Application configuration.
//!
//! Settings come from two layers, later ones winning:
//!
//! 1. an optional TOML file (`config/authly.toml` by default)
//! 2. environment variables prefixed `AUTHLY__`, with `__` between
//!    sections, e.g. `AUTHLY__SESSION__DEFAULT_TTL_MINUTES=60`
//!
//! Every field has a default, so an empty environment yields a working
//! local setup.

use std::path::Path;
use std::time::Duration;

use authly_session::{DEFAULT_TOKEN_LENGTH, SessionConfig};
use authly_store::RedisStoreConfig;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::AuthlyError;

/// Default location of the config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/authly.toml";

/// Everything Authly reads at startup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthlyConfig {
    pub token: TokenSettings,
    pub session: SessionSettings,
    pub store: StoreSettings,
}

/// `[token]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSettings {
    /// Characters per issued token.
    pub length: usize,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            length: DEFAULT_TOKEN_LENGTH,
        }
    }
}

/// `[session]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub default_ttl_minutes: u64,
    pub max_issue_attempts: u32,
    pub single_session_per_user: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        let defaults = SessionConfig::default();
        Self {
            default_ttl_minutes: defaults.default_ttl_minutes,
            max_issue_attempts: defaults.max_issue_attempts,
            single_session_per_user: defaults.single_session_per_user,
        }
    }
}

/// `[store]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub host: String,
    pub port: u16,
    /// Redis logical database.
    pub index: i64,
    pub command_timeout_ms: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            index: 0,
            command_timeout_ms: 2000,
        }
    }
}

impl AuthlyConfig {
    /// Loads from [`DEFAULT_CONFIG_PATH`] and the process environment.
    pub fn load() -> Result<Self, AuthlyError> {
        Self::load_with(Path::new(DEFAULT_CONFIG_PATH), None)
    }

    /// Loads from `file` (skipped if missing) and then the environment.
    ///
    /// `env` replaces the process environment when given; tests use it to
    /// avoid mutating global state.
    ///
    /// # Errors
    /// - [`AuthlyError::Config`]: the file or a variable failed to parse
    /// - [`AuthlyError::InvalidConfig`]: parsed values are unusable
    pub fn load_with(
        file: &Path,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, AuthlyError> {
        let settings = Config::builder()
            .add_source(File::from(file).required(false))
            .add_source(
                Environment::with_prefix("AUTHLY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;

        tracing::debug!(
            file = %file.display(),
            token_length = config.token.length,
            default_ttl_minutes = config.session.default_ttl_minutes,
            store = %format!("{}:{}/{}", config.store.host, config.store.port, config.store.index),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Checks every value is usable.
    pub fn validate(&self) -> Result<(), AuthlyError> {
        self.session_config()
            .validate()
            .map_err(|e| AuthlyError::InvalidConfig(e.to_string()))?;
        if self.store.command_timeout_ms == 0 {
            return Err(AuthlyError::InvalidConfig(
                "store.command_timeout_ms must be positive".into(),
            ));
        }
        if self.store.host.is_empty() {
            return Err(AuthlyError::InvalidConfig(
                "store.host must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// The session manager's view of this config.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            token_length: self.token.length,
            default_ttl_minutes: self.session.default_ttl_minutes,
            max_issue_attempts: self.session.max_issue_attempts,
            single_session_per_user: self.session.single_session_per_user,
        }
    }

    /// The Redis store's view of this config.
    pub fn redis_config(&self) -> RedisStoreConfig {
        RedisStoreConfig {
            host: self.store.host.clone(),
            port: self.store.port,
            index: self.store.index,
            command_timeout: Duration::from_millis(self.store.command_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_documented_defaults() {
        let config = AuthlyConfig::default();

        assert_eq!(config.token.length, 64);
        assert_eq!(config.session.default_ttl_minutes, 1440);
        assert_eq!(config.session.max_issue_attempts, 5);
        assert!(!config.session.single_session_per_user);
        assert_eq!(config.store.host, "127.0.0.1");
        assert_eq!(config.store.port, 6379);
        assert_eq!(config.store.index, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_session_config_copies_fields() {
        let mut config = AuthlyConfig::default();
        config.token.length = 32;
        config.session.single_session_per_user = true;

        let session = config.session_config();

        assert_eq!(session.token_length, 32);
        assert!(session.single_session_per_user);
    }

    #[test]
    fn test_redis_config_converts_timeout() {
        let mut config = AuthlyConfig::default();
        config.store.command_timeout_ms = 750;
        config.store.index = 2;

        let redis = config.redis_config();

        assert_eq!(redis.command_timeout, Duration::from_millis(750));
        assert_eq!(redis.url(), "redis://127.0.0.1:6379/2");
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = AuthlyConfig::default();
        config.store.command_timeout_ms = 0;

        assert!(matches!(
            config.validate(),
            Err(AuthlyError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_token_length() {
        let mut config = AuthlyConfig::default();
        config.token.length = 0;

        assert!(matches!(
            config.validate(),
            Err(AuthlyError::InvalidConfig(_))
        ));
    }
}
