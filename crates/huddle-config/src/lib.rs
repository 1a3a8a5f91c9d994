//! Huddle configuration system.
//!
//! TOML-based configuration shared by the relay and the client. Every
//! section uses serde defaults, so a partial file (or no file at all)
//! yields a working config.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use huddle_config::load_config;
//!
//! let config = load_config().expect("failed to load config");
//! println!("relay port: {}", config.relay.port);
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    AudioConfig, ClientConfig, HuddleConfig, IdentityConfig, LogLevel, LoggingConfig,
    RelayConfig, CONFIG_SCHEMA_VERSION,
};

use huddle_common::ConfigError;
use std::path::Path;

/// Load config from the platform default path and validate it.
pub fn load_config() -> Result<HuddleConfig, ConfigError> {
    let config = toml_loader::load_default()?;
    validation::validate(&config)?;
    Ok(config)
}

/// Load config from `path` when given, otherwise from the platform default.
pub fn load_config_from(path: Option<&Path>) -> Result<HuddleConfig, ConfigError> {
    match path {
        Some(path) => {
            let config = toml_loader::load_from_path(path)?;
            validation::validate(&config)?;
            Ok(config)
        }
        None => load_config(),
    }
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &HuddleConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}
