//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `CHAT_THROTTLE` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use chat_throttle::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Chat bucket allows {} attempts", config.rate_limit.chat.max_attempts);
//! ```

mod error;
mod rate_limit;
mod redis;
mod server;

pub use error::{ConfigError, ValidationError};
pub use rate_limit::{BucketLimits, RateLimitSettings};
pub use redis::RedisConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;
use std::path::Path;

const ENV_PREFIX: &str = "CHAT_THROTTLE";

/// Names an optional configuration file read beneath the environment.
pub const CONFIG_FILE_VAR: &str = "CHAT_THROTTLE_CONFIG";

/// Root application configuration
///
/// Every section has defaults, so an empty environment yields a working
/// development configuration backed by the in-process limiter.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Redis configuration (distributed backend only)
    #[serde(default)]
    pub redis: RedisConfig,

    /// Rate limiting thresholds and backend selection
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `CHAT_THROTTLE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `CHAT_THROTTLE__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `CHAT_THROTTLE__RATE_LIMIT__CHAT__WINDOW_MS=60000` -> `rate_limit.chat.window_ms`
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(environment_source())
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Load configuration from a file, with environment variables layered on top.
    ///
    /// The format is inferred from the extension (`.yaml`, `.toml`, `.json`).
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(environment_source())
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Load from the file named by `CHAT_THROTTLE_CONFIG` when it is set,
    /// otherwise from the environment alone.
    pub fn load_configured() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        match std::env::var_os(CONFIG_FILE_VAR) {
            Some(path) => Self::load_from_file(path),
            None => Self::load(),
        }
    }

    /// Validate all configuration values
    ///
    /// Redis settings are only checked when the distributed backend is enabled.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.rate_limit.validate()?;
        if self.rate_limit.use_distributed_backend {
            self.redis.validate()?;
        }
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

fn environment_source() -> config::Environment {
    config::Environment::default()
        .prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("server.trusted_proxies")
        .with_list_parse_key("server.admin_allowlist")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::io::Write;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const TOUCHED_VARS: &[&str] = &[
        "CHAT_THROTTLE__SERVER__PORT",
        "CHAT_THROTTLE__SERVER__ENVIRONMENT",
        "CHAT_THROTTLE__SERVER__TRUSTED_PROXIES",
        "CHAT_THROTTLE_CONFIG",
        "CHAT_THROTTLE__REDIS__URL",
        "CHAT_THROTTLE__RATE_LIMIT__USE_DISTRIBUTED_BACKEND",
        "CHAT_THROTTLE__RATE_LIMIT__BLOCK_DURATION_MS",
        "CHAT_THROTTLE__RATE_LIMIT__CHAT__WINDOW_MS",
        "CHAT_THROTTLE__RATE_LIMIT__CHAT__MAX_ATTEMPTS",
    ];

    fn clear_env() {
        for var in TOUCHED_VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_load_with_empty_environment_uses_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let config = AppConfig::load().unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
        assert_eq!(config.rate_limit, RateLimitSettings::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_rate_limit_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        env::set_var("CHAT_THROTTLE__RATE_LIMIT__CHAT__WINDOW_MS", "60000");
        env::set_var("CHAT_THROTTLE__RATE_LIMIT__CHAT__MAX_ATTEMPTS", "5");
        env::set_var("CHAT_THROTTLE__RATE_LIMIT__BLOCK_DURATION_MS", "300000");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.rate_limit.chat.max_attempts, 5);
        assert_eq!(config.rate_limit.chat.window_ms, 60_000);
        assert_eq!(config.rate_limit.block_duration_ms, 300_000);
    }

    #[test]
    fn test_single_bucket_field_override_keeps_other_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        env::set_var("CHAT_THROTTLE__RATE_LIMIT__CHAT__MAX_ATTEMPTS", "5");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.rate_limit.chat.max_attempts, 5);
        assert_eq!(config.rate_limit.chat.window_ms, BucketLimits::chat_bucket().window_ms);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_trusted_proxies_parse_from_comma_list() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        env::set_var("CHAT_THROTTLE__SERVER__TRUSTED_PROXIES", "10.0.0.1,10.0.0.2");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        let expected: Vec<std::net::IpAddr> = vec!["10.0.0.1".parse().unwrap(), "10.0.0.2".parse().unwrap()];
        assert_eq!(config.server.trusted_proxies, expected);
    }

    #[test]
    fn test_is_production() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        env::set_var("CHAT_THROTTLE__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.is_production());
    }

    #[test]
    fn test_distributed_backend_requires_redis_url() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        env::set_var("CHAT_THROTTLE__RATE_LIMIT__USE_DISTRIBUTED_BACKEND", "true");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.rate_limit.use_distributed_backend);
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("REDIS_URL"))
        );
    }

    #[test]
    fn test_load_from_yaml_file_with_env_override() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();

        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "server:\n  port: 9000\nrate_limit:\n  chat:\n    window_ms: 30000\n    max_attempts: 3\n"
        )
        .unwrap();

        env::set_var("CHAT_THROTTLE__SERVER__PORT", "9100");
        let result = AppConfig::load_from_file(file.path());
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.rate_limit.chat.max_attempts, 3);
        assert_eq!(config.rate_limit.chat.window_ms, 30_000);
        assert_eq!(config.rate_limit.api, BucketLimits::api_bucket());
    }
}
