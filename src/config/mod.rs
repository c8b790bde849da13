//! Configuration file loading and parsing.
//!
//! This module handles loading the configuration file from disk and parsing
//! it into validated, type-safe structures.
//!
//! # Configuration File Locations
//!
//! The configuration file is searched in the following order:
//!
//! 1. Path given as the `CONFIG_FILE` CLI argument
//! 2. Default location:
//!    - **Linux/macOS:** `~/.doc-corpus-mcp/config.json`
//!    - **Windows:** `%USERPROFILE%\.doc-corpus-mcp\config.json`
//!
//! An explicit path that does not exist is an error. A missing default file
//! is not: every setting has a default.

mod settings;

pub use settings::{
    CacheConfig, Config, HttpConfig, LinkerConfig, LoggingConfig, RateLimitConfig, SessionConfig,
    LOG_LEVELS,
};

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Returns the default configuration directory.
///
/// - **Linux/macOS:** `~/.doc-corpus-mcp/`
/// - **Windows:** `%USERPROFILE%\.doc-corpus-mcp\`
#[must_use]
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".doc-corpus-mcp"))
}

/// Returns the platform-specific default configuration file path.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|p| p.join("config.json"))
}

/// Loads and parses the configuration file.
///
/// If `path` is `None`, uses the platform-specific default location and
/// falls back to [`Config::default`] when no file is there.
///
/// # Errors
///
/// Returns an error if:
/// - An explicitly given file cannot be found
/// - The file cannot be read
/// - The JSON is malformed or holds unknown fields
/// - A value fails validation
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::NotFound {
                    path: p.to_path_buf(),
                });
            }
            p.to_path_buf()
        }
        None => match default_config_path() {
            Some(p) if p.exists() => p,
            _ => {
                tracing::debug!("No configuration file found, using defaults");
                return Ok(Config::default());
            }
        },
    };

    load_file(&config_path)
}

fn load_file(config_path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
        path: config_path.to_path_buf(),
        source: e,
    })?;

    let config: Config = serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: config_path.to_path_buf(),
        source: e,
    })?;

    config.validate()?;

    Ok(config)
}
