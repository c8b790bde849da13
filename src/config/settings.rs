//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::cache;
use crate::error::ConfigError;
use crate::linker::{DEFAULT_BASE_URL, DEFAULT_MAX_LINKS_PER_TERM};
use crate::rate_limit::{
    RateLimiter, DEFAULT_MAX_REQUESTS, DEFAULT_SWEEP_PROBABILITY, DEFAULT_WINDOW,
};
use crate::session::DEFAULT_SESSION_TTL;
use crate::tools::ContextOptions;

/// Log levels accepted in `logging.level`.
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Upper bound for every `*_secs` setting (one year).
pub const MAX_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Markdown directory or JSON file holding the documentation corpus.
    #[serde(default)]
    pub corpus_path: Option<PathBuf>,

    /// Seconds between corpus reloads. Unset means the corpus is loaded once.
    #[serde(default)]
    pub corpus_refresh_secs: Option<u64>,

    /// Glossary linking settings.
    #[serde(default)]
    pub linker: LinkerConfig,

    /// Tool result cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// HTTP rate limiting settings.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Advisor session settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// HTTP transport settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.capacity == 0 {
            return Err(invalid("cache.capacity must be at least 1"));
        }
        check_secs("cache.ttl_secs", self.cache.ttl_secs)?;
        if self.rate_limit.max_requests == 0 {
            return Err(invalid("rate_limit.max_requests must be at least 1"));
        }
        check_secs("rate_limit.window_secs", self.rate_limit.window_secs)?;
        let p = self.rate_limit.sweep_probability;
        if !(0.0..=1.0).contains(&p) {
            return Err(ConfigError::ValidationError {
                message: format!("rate_limit.sweep_probability {p} must be between 0 and 1"),
            });
        }
        check_secs("session.ttl_secs", self.session.ttl_secs)?;
        if let Some(secs) = self.corpus_refresh_secs {
            check_secs("corpus_refresh_secs", secs)?;
        }
        if self.linker.max_links_per_term == 0 {
            return Err(invalid("linker.max_links_per_term must be at least 1"));
        }
        let level = self.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    LOG_LEVELS.join(", ")
                ),
            });
        }
        Ok(())
    }

    /// Options for the tool context built from this configuration.
    #[must_use]
    pub fn context_options(&self) -> ContextOptions {
        ContextOptions {
            base_url: self.linker.base_url.clone(),
            max_links_per_term: self.linker.max_links_per_term,
            cache_capacity: self.cache.capacity,
            cache_ttl: Duration::from_secs(self.cache.ttl_secs),
            session_ttl: Duration::from_secs(self.session.ttl_secs),
        }
    }

    /// How often to reload the corpus, if at all.
    #[must_use]
    pub fn corpus_refresh(&self) -> Option<Duration> {
        self.corpus_refresh_secs.map(Duration::from_secs)
    }

    /// A rate limiter configured from the `rate_limit` section.
    #[must_use]
    pub fn rate_limiter(&self) -> RateLimiter {
        RateLimiter::new(
            self.rate_limit.max_requests,
            Duration::from_secs(self.rate_limit.window_secs),
        )
        .with_sweep_probability(self.rate_limit.sweep_probability)
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError {
        message: message.to_string(),
    }
}

fn check_secs(name: &str, secs: u64) -> Result<(), ConfigError> {
    if (1..=MAX_DURATION_SECS).contains(&secs) {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: format!("{name} must be between 1 and {MAX_DURATION_SECS}, got {secs}"),
        })
    }
}

/// Glossary linking configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkerConfig {
    /// URL prefix for glossary links.
    /// Default: "/glossary"
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Links inserted per term when a call does not say otherwise.
    #[serde(default = "default_max_links_per_term")]
    pub max_links_per_term: usize,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            max_links_per_term: default_max_links_per_term(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

const fn default_max_links_per_term() -> usize {
    DEFAULT_MAX_LINKS_PER_TERM
}

/// Tool result cache configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Maximum number of cached results.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    /// Seconds a cached result stays fresh.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

const fn default_cache_capacity() -> usize {
    cache::DEFAULT_CAPACITY
}

const fn default_cache_ttl_secs() -> u64 {
    cache::DEFAULT_TTL.as_secs()
}

/// Rate limiting configuration for the HTTP transport.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Requests allowed per client per window.
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Fraction of calls that sweep expired windows.
    #[serde(default = "default_sweep_probability")]
    pub sweep_probability: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            sweep_probability: default_sweep_probability(),
        }
    }
}

const fn default_max_requests() -> u32 {
    DEFAULT_MAX_REQUESTS
}

const fn default_window_secs() -> u64 {
    DEFAULT_WINDOW.as_secs()
}

const fn default_sweep_probability() -> f64 {
    DEFAULT_SWEEP_PROBABILITY
}

/// Advisor session configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Seconds an idle advisor session survives.
    #[serde(default = "default_session_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl_secs(),
        }
    }
}

const fn default_session_ttl_secs() -> u64 {
    DEFAULT_SESSION_TTL.as_secs()
}

/// HTTP transport configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    /// Address to serve HTTP on. Stdio is used when unset.
    #[serde(default)]
    pub bind: Option<SocketAddr>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
