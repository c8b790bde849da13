//! The documentation tools exposed over MCP.
//!
//! Every tool is a plain function over a [`ToolContext`], which owns the
//! corpus snapshot and all mutable state tools share (result cache, term
//! linker, advisor sessions). Tools never touch the wire format; they take
//! their JSON arguments and return a JSON result or a [`ToolError`].

mod advisor;
mod browse;
mod glossary;
mod search;
mod stats;

pub use advisor::{AdvisorState, AdvisorStep};

use std::fmt;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::cache::{self, Cache};
use crate::corpus::{Corpus, CorpusResult};
use crate::linker::{TermLinker, DEFAULT_BASE_URL, DEFAULT_MAX_LINKS_PER_TERM};
use crate::mcp::registry::{Tool, ToolRegistry};
use crate::session::{InMemorySessionStore, SessionStore, DEFAULT_SESSION_TTL};

/// Errors a tool handler can return.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The arguments are missing a field or hold a value of the wrong kind.
    #[error("{0}")]
    InvalidArguments(String),

    /// The requested record does not exist.
    #[error("{message}")]
    NotFound {
        /// What was not found.
        message: String,
        /// Close matches the caller may have meant.
        suggestions: Vec<String>,
    },

    /// The tool failed for any other reason.
    #[error("{0}")]
    Failed(String),
}

/// Result type for tool handlers.
pub type ToolResult = Result<Value, ToolError>;

/// Knobs for the state a [`ToolContext`] owns.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextOptions {
    /// URL prefix for glossary links.
    pub base_url: String,
    /// Default number of links per glossary term.
    pub max_links_per_term: usize,
    /// Maximum number of cached tool results.
    pub cache_capacity: usize,
    /// Lifetime of a cached tool result.
    pub cache_ttl: Duration,
    /// Lifetime of an advisor session.
    pub session_ttl: Duration,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_links_per_term: DEFAULT_MAX_LINKS_PER_TERM,
            cache_capacity: cache::DEFAULT_CAPACITY,
            cache_ttl: cache::DEFAULT_TTL,
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }
}

/// State shared by every tool of one server instance.
pub struct ToolContext {
    corpus: Corpus,
    linker: TermLinker,
    options: ContextOptions,
    /// Cached tool results keyed by [`cache::cache_key`].
    pub cache: Cache<String, Value>,
    /// Advisor conversations in progress.
    pub sessions: Box<dyn SessionStore<AdvisorState>>,
}

impl ToolContext {
    /// Builds a context over `corpus`.
    #[must_use]
    pub fn new(corpus: Corpus, options: ContextOptions) -> Self {
        let linker = TermLinker::new(
            corpus.glossary(),
            &options.base_url,
            options.max_links_per_term,
        );
        Self {
            cache: Cache::new(options.cache_capacity, options.cache_ttl),
            sessions: Box::new(InMemorySessionStore::new(options.session_ttl)),
            corpus,
            linker,
            options,
        }
    }

    /// Swaps in a different session store.
    #[must_use]
    pub fn with_session_store(mut self, store: Box<dyn SessionStore<AdvisorState>>) -> Self {
        self.sessions = store;
        self
    }

    /// The current corpus snapshot.
    #[must_use]
    pub const fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// The linker built from the current glossary.
    #[must_use]
    pub const fn linker(&self) -> &TermLinker {
        &self.linker
    }

    /// Options the context was built with.
    #[must_use]
    pub const fn options(&self) -> &ContextOptions {
        &self.options
    }

    /// Replaces the corpus, rebuilding the linker and dropping cached results.
    pub fn replace_corpus(&mut self, corpus: Corpus) {
        self.linker = TermLinker::new(
            corpus.glossary(),
            &self.options.base_url,
            self.options.max_links_per_term,
        );
        self.corpus = corpus;
        self.cache.clear();
        tracing::info!(
            documents = self.corpus.documents().len(),
            "Replaced corpus and cleared result cache"
        );
    }

    /// Re-reads the corpus from the path it came from and swaps it in.
    ///
    /// # Errors
    ///
    /// Returns the loader error. The current snapshot stays in place.
    pub fn refresh_corpus(&mut self) -> CorpusResult<()> {
        let corpus = self.corpus.reload()?;
        self.replace_corpus(corpus);
        Ok(())
    }

    /// Returns the cached result for `tool` and `arguments`, computing and
    /// storing it on a miss.
    ///
    /// # Errors
    ///
    /// Returns the error from `compute`. Errors are not cached.
    pub fn cached(
        &mut self,
        tool: &str,
        arguments: &Value,
        compute: impl FnOnce(&Self) -> ToolResult,
    ) -> ToolResult {
        let key = cache::cache_key(tool, arguments);
        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(tool, "Cache hit");
            return Ok(hit.clone());
        }
        let value = compute(self)?;
        self.cache.set(key, value.clone());
        Ok(value)
    }
}

impl fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolContext")
            .field("documents", &self.corpus.documents().len())
            .field("glossary", &self.corpus.glossary().len())
            .field("cached", &self.cache.len())
            .field("sessions", &self.sessions.len())
            .finish_non_exhaustive()
    }
}

impl Default for ToolContext {
    fn default() -> Self {
        Self::new(Corpus::empty(), ContextOptions::default())
    }
}

/// Registry holding every documentation tool.
#[must_use]
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register_many([
        search::search_docs(),
        browse::list_docs(),
        browse::get_doc(),
        glossary::define_term(),
        glossary::link_terms(),
        advisor::doc_advisor(),
        stats::corpus_stats(),
    ]);
    registry
}

// ==================== Argument helpers ====================

/// A required, non-blank string argument.
pub(crate) fn required_str<'a>(arguments: &'a Value, name: &str) -> Result<&'a str, ToolError> {
    match arguments.get(name) {
        None | Some(Value::Null) => Err(ToolError::InvalidArguments(format!(
            "Missing required parameter: {name}"
        ))),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim()),
        Some(Value::String(_)) => Err(ToolError::InvalidArguments(format!(
            "Parameter '{name}' must not be empty"
        ))),
        Some(_) => Err(ToolError::InvalidArguments(format!(
            "Parameter '{name}' must be a string"
        ))),
    }
}

/// An optional string argument. Blank strings count as absent.
pub(crate) fn optional_str<'a>(
    arguments: &'a Value,
    name: &str,
) -> Result<Option<&'a str>, ToolError> {
    match arguments.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim()).filter(|s| !s.is_empty())),
        Some(_) => Err(ToolError::InvalidArguments(format!(
            "Parameter '{name}' must be a string"
        ))),
    }
}

/// An optional boolean argument.
pub(crate) fn optional_bool(arguments: &Value, name: &str) -> Result<Option<bool>, ToolError> {
    match arguments.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(ToolError::InvalidArguments(format!(
            "Parameter '{name}' must be a boolean"
        ))),
    }
}

/// An optional non-negative integer argument.
pub(crate) fn optional_usize(arguments: &Value, name: &str) -> Result<Option<usize>, ToolError> {
    match arguments.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| {
                ToolError::InvalidArguments(format!(
                    "Parameter '{name}' must be a non-negative integer"
                ))
            }),
    }
}

/// Serialises a tool result.
pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> ToolResult {
    serde_json::to_value(value)
        .map_err(|e| ToolError::Failed(format!("Failed to serialise result: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{Document, GlossaryTerm};
    use serde_json::json;

    #[test]
    fn registry_lists_every_tool_in_order() {
        let registry = default_registry();
        assert_eq!(
            registry.names(),
            vec![
                "search_docs",
                "list_docs",
                "get_doc",
                "define_term",
                "link_terms",
                "doc_advisor",
                "corpus_stats"
            ]
        );
    }

    #[test]
    fn every_tool_schema_is_an_object() {
        for definition in default_registry().list() {
            assert_eq!(definition.input_schema["type"], json!("object"), "{}", definition.name);
        }
    }

    #[test]
    fn required_str_rejects_missing_blank_and_wrong_type() {
        let args = json!({"blank": "  ", "number": 3, "ok": " forms "});
        assert!(matches!(
            required_str(&args, "absent"),
            Err(ToolError::InvalidArguments(_))
        ));
        assert!(required_str(&args, "blank").is_err());
        assert!(required_str(&args, "number").is_err());
        assert_eq!(required_str(&args, "ok").unwrap(), "forms");
    }

    #[test]
    fn optional_helpers_accept_absent_and_null() {
        let args = json!({"n": null});
        assert_eq!(optional_str(&args, "n").unwrap(), None);
        assert_eq!(optional_bool(&args, "missing").unwrap(), None);
        assert_eq!(optional_usize(&args, "n").unwrap(), None);
        assert!(optional_usize(&json!({"n": -1}), "n").is_err());
    }

    #[test]
    fn replace_corpus_clears_cache_and_rebuilds_linker() {
        let mut context = ToolContext::default();
        context.cache.set("k".to_string(), json!(1));
        assert!(context.linker().is_empty());

        context.replace_corpus(Corpus::new(
            vec![Document::new("forms", "Forms")],
            vec![GlossaryTerm::new("forms", "forms")],
        ));
        assert!(context.cache.is_empty());
        assert_eq!(context.linker().len(), 1);
    }

    #[test]
    fn refresh_without_source_keeps_snapshot() {
        let mut context = ToolContext::new(
            Corpus::new(vec![Document::new("forms", "Forms")], Vec::new()),
            ContextOptions::default(),
        );
        context.cache.set("k".to_string(), json!(1));
        assert!(context.refresh_corpus().is_err());
        assert_eq!(context.corpus().documents().len(), 1);
        assert_eq!(context.cache.len(), 1);
    }

    #[test]
    fn cached_computes_once() {
        let mut context = ToolContext::default();
        let args = json!({"b": 1, "a": 2});
        let first = context.cached("t", &args, |_| Ok(json!("computed"))).unwrap();
        let second = context
            .cached("t", &json!({"a": 2, "b": 1}), |_| Ok(json!("recomputed")))
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn cached_does_not_store_errors() {
        let mut context = ToolContext::default();
        let args = json!({});
        let failed = context.cached("t", &args, |_| Err(ToolError::Failed("boom".into())));
        assert!(failed.is_err());
        assert!(context.cache.is_empty());
    }
}
