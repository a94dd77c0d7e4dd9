//! Sender settings and configuration structures.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use validator::Validate;

use crate::shared::validation::validation_error;

/// Root configuration structure containing all settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Retry and backoff policy for sends and uploads
    pub sender: SenderSettings,

    /// Attachment upload limits
    pub attachments: AttachmentSettings,

    /// Database configuration (PostgreSQL record store)
    pub database: DatabaseSettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// Retry policy configuration.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SenderSettings {
    /// Retries allowed after the first attempt
    #[validate(range(min = 1, max = 10, message = "Retry ceiling must be 1-10"))]
    pub max_retries: u32,

    /// Delay before the first retry in milliseconds
    #[validate(range(min = 1, message = "Base backoff must be at least 1ms"))]
    pub base_backoff_ms: u64,

    /// Upper bound on any single backoff in milliseconds
    #[validate(range(min = 1, message = "Max backoff must be at least 1ms"))]
    pub max_backoff_ms: u64,

    /// Backoff multiplier applied to rate-limited failures
    #[validate(range(min = 1, max = 100, message = "Rate limit multiplier must be 1-100"))]
    pub rate_limit_multiplier: u32,

    /// Random jitter added to each backoff, 0 disables it
    pub jitter_ms: u64,
}

/// Attachment configuration.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AttachmentSettings {
    /// Largest plaintext attachment accepted for upload (default: 100MB)
    #[validate(range(min = 1, message = "Attachment size limit must be positive"))]
    pub max_size_bytes: u64,
}

/// PostgreSQL database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Database connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections to maintain
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    pub acquire_timeout: u64,
}

impl Default for SenderSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff_ms: 500,
            max_backoff_ms: 30_000,
            rate_limit_multiplier: 4,
            jitter_ms: 250,
        }
    }
}

impl Default for AttachmentSettings {
    fn default() -> Self {
        Self {
            max_size_bytes: crate::domain::DEFAULT_MAX_ATTACHMENT_SIZE,
        }
    }
}

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. config/default.toml (base configuration)
    /// 2. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 3. Environment variables (highest priority)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// or if a value is out of range.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        // Determine the running environment
        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        let defaults = SenderSettings::default();

        Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("sender.max_retries", i64::from(defaults.max_retries))?
            .set_default("sender.base_backoff_ms", defaults.base_backoff_ms)?
            .set_default("sender.max_backoff_ms", defaults.max_backoff_ms)?
            .set_default(
                "sender.rate_limit_multiplier",
                i64::from(defaults.rate_limit_multiplier),
            )?
            .set_default("sender.jitter_ms", defaults.jitter_ms)?
            .set_default(
                "attachments.max_size_bytes",
                AttachmentSettings::default().max_size_bytes,
            )?
            .set_default("database.max_connections", 5)?
            .set_default("database.min_connections", 1)?
            .set_default("database.acquire_timeout", 30)?
            // Load from config files
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Load from environment variables
            // APP__SENDER__MAX_RETRIES=5 -> sender.max_retries = 5
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            // Map simple environment variables
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .build()?
            .try_deserialize()
            .and_then(|settings: Self| {
                settings.check()?;
                Ok(settings)
            })
    }

    /// Validate field ranges and cross-field constraints.
    pub fn check(&self) -> Result<(), ConfigError> {
        let invalid = |e: validator::ValidationErrors| {
            ConfigError::Message(validation_error(&e).to_string())
        };
        self.sender.validate().map_err(invalid)?;
        self.attachments.validate().map_err(invalid)?;

        if self.sender.max_backoff_ms < self.sender.base_backoff_ms {
            return Err(ConfigError::Message(format!(
                "sender.max_backoff_ms ({}) must not be below sender.base_backoff_ms ({})",
                self.sender.max_backoff_ms, self.sender.base_backoff_ms
            )));
        }
        Ok(())
    }
}
