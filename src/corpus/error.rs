//! Error types for corpus loading.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for corpus operations.
pub type CorpusResult<T> = Result<T, CorpusError>;

/// Errors that can occur while loading a documentation corpus.
#[derive(Debug, Error)]
pub enum CorpusError {
    /// The corpus path does not exist.
    #[error("Corpus not found: {path}")]
    NotFound {
        /// Path that was expected to hold the corpus.
        path: PathBuf,
    },

    /// Failed to read a corpus file.
    #[error("Failed to read corpus file: {path}")]
    Read {
        /// Path to the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A JSON corpus or glossary file is malformed.
    #[error("Failed to parse corpus file: {path}")]
    Parse {
        /// Path to the file.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The directory walk pattern could not be built or followed.
    #[error("Failed to scan corpus directory: {message}")]
    Scan {
        /// Description of what went wrong.
        message: String,
    },

    /// A document's front matter holds an invalid value.
    #[error("Invalid document {path}: {message}")]
    InvalidDocument {
        /// Path to the offending document.
        path: PathBuf,
        /// Description of what's wrong.
        message: String,
    },

    /// Two documents share a slug.
    #[error("Duplicate document slug: {slug}")]
    DuplicateSlug {
        /// The repeated slug.
        slug: String,
    },

    /// The path is neither a directory nor a `.json` file.
    #[error("Unsupported corpus format: {path} (expected a directory or a .json file)")]
    UnsupportedFormat {
        /// Path with the unsupported extension.
        path: PathBuf,
    },

    /// The corpus was built in memory and has nothing to reload from.
    #[error("Corpus has no source path to reload from")]
    NoSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let error = CorpusError::NotFound {
            path: PathBuf::from("/docs/corpus.json"),
        };
        assert!(error.to_string().contains("corpus.json"));
    }

    #[test]
    fn duplicate_slug_display() {
        let error = CorpusError::DuplicateSlug {
            slug: "forms".to_string(),
        };
        assert_eq!(error.to_string(), "Duplicate document slug: forms");
    }
}
