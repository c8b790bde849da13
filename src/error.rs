//! Error types for doc-corpus-mcp.
//!
//! Tool-level failures live in [`crate::tools::ToolError`] and corpus loading
//! failures in [`crate::corpus::CorpusError`]. This module holds the errors
//! that stop the process from starting or serving.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use crate::corpus::CorpusError;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors that stop a server from starting or keep it from serving.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The corpus could not be loaded.
    #[error(transparent)]
    Corpus(#[from] CorpusError),

    /// The HTTP listener could not be bound.
    #[error("failed to bind HTTP listener on {addr}")]
    Bind {
        /// Address that was requested.
        addr: SocketAddr,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Transport I/O failed while serving.
    #[error("transport I/O error")]
    Io(#[from] io::Error),
}
