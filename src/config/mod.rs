//! # Configuration Module
//!
//! This module handles configuration loading and management.
//! Configuration can be loaded from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{environment}.toml)
//! - .env files (via dotenvy)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use courier::config::Settings;
//!
//! let settings = Settings::load()?;
//! println!("Retrying up to {} times", settings.sender.max_retries);
//! ```

mod settings;

pub use settings::*;
