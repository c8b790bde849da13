//! The documentation corpus the tools query.
//!
//! A [`Corpus`] is an immutable snapshot of documents and glossary terms.
//! Snapshots are loaded from disk (see [`loader`]) or built in memory for
//! tests, and replaced wholesale on reload.

mod document;
mod error;
pub mod loader;

pub use document::{DocStatus, DocSummary, Document, GlossaryTerm};
pub use error::{CorpusError, CorpusResult};

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// A loaded set of documents and glossary terms.
#[derive(Debug, Clone)]
pub struct Corpus {
    documents: Vec<Document>,
    glossary: Vec<GlossaryTerm>,
    source: Option<PathBuf>,
    loaded_at: DateTime<Utc>,
}

impl Corpus {
    /// Builds an in-memory corpus.
    #[must_use]
    pub fn new(documents: Vec<Document>, glossary: Vec<GlossaryTerm>) -> Self {
        Self {
            documents,
            glossary,
            source: None,
            loaded_at: Utc::now(),
        }
    }

    /// A corpus with no documents and no glossary.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    /// Loads a corpus from a `.json` file or a Markdown directory.
    ///
    /// # Errors
    ///
    /// See [`loader::load_path`].
    pub fn load(path: impl AsRef<Path>) -> CorpusResult<Self> {
        let path = path.as_ref();
        let loaded = loader::load_path(path)?;
        Ok(Self {
            documents: loaded.documents,
            glossary: loaded.glossary,
            source: Some(path.to_path_buf()),
            loaded_at: Utc::now(),
        })
    }

    /// Re-reads the corpus from the path it was loaded from.
    ///
    /// # Errors
    ///
    /// Returns [`CorpusError::NoSource`] for in-memory corpora, otherwise
    /// any error [`Corpus::load`] can return.
    pub fn reload(&self) -> CorpusResult<Self> {
        let source = self.source.as_deref().ok_or(CorpusError::NoSource)?;
        Self::load(source)
    }

    /// All documents in stable order.
    #[must_use]
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// All glossary terms.
    #[must_use]
    pub fn glossary(&self) -> &[GlossaryTerm] {
        &self.glossary
    }

    /// Looks a document up by its exact slug.
    #[must_use]
    pub fn document(&self, slug: &str) -> Option<&Document> {
        self.documents.iter().find(|doc| doc.slug == slug)
    }

    /// Looks a glossary term up by name or slug, ignoring case.
    #[must_use]
    pub fn term(&self, name: &str) -> Option<&GlossaryTerm> {
        let name = name.trim();
        self.glossary.iter().find(|entry| {
            entry.term.eq_ignore_ascii_case(name) || entry.slug.eq_ignore_ascii_case(name)
        })
    }

    /// Every document slug.
    #[must_use]
    pub fn slugs(&self) -> Vec<&str> {
        self.documents.iter().map(|doc| doc.slug.as_str()).collect()
    }

    /// Every glossary term name.
    #[must_use]
    pub fn term_names(&self) -> Vec<&str> {
        self.glossary.iter().map(|entry| entry.term.as_str()).collect()
    }

    /// Where the corpus was loaded from, if anywhere.
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// When this snapshot was taken.
    #[must_use]
    pub const fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

impl Default for Corpus {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Corpus {
        Corpus::new(
            vec![Document::new("forms", "Forms"), Document::new("tabs", "Tabs")],
            vec![GlossaryTerm::new("Design Token", "design-token")],
        )
    }

    #[test]
    fn lookup_by_slug() {
        let corpus = corpus();
        assert_eq!(corpus.document("tabs").map(|d| d.title.as_str()), Some("Tabs"));
        assert!(corpus.document("Tabs").is_none());
    }

    #[test]
    fn term_lookup_ignores_case_and_accepts_slug() {
        let corpus = corpus();
        assert!(corpus.term("design token").is_some());
        assert!(corpus.term("DESIGN-TOKEN").is_some());
        assert!(corpus.term("token").is_none());
    }

    #[test]
    fn in_memory_corpus_cannot_reload() {
        assert!(matches!(corpus().reload(), Err(CorpusError::NoSource)));
    }

    #[test]
    fn names_follow_corpus_order() {
        let corpus = corpus();
        assert_eq!(corpus.slugs(), vec!["forms", "tabs"]);
        assert_eq!(corpus.term_names(), vec!["Design Token"]);
    }
}
