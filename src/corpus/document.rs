//! Corpus records: documents and glossary terms.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::search::SearchFields;

/// Maturity of a documented feature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocStatus {
    /// Production ready.
    #[default]
    Stable,
    /// Usable, may still change.
    Beta,
    /// Early preview.
    Experimental,
    /// Scheduled for removal.
    Deprecated,
}

impl DocStatus {
    /// Every status, in display order.
    pub const ALL: [Self; 4] = [
        Self::Stable,
        Self::Beta,
        Self::Experimental,
        Self::Deprecated,
    ];

    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Beta => "beta",
            Self::Experimental => "experimental",
            Self::Deprecated => "deprecated",
        }
    }
}

impl fmt::Display for DocStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                format!(
                    "unknown status '{wanted}' (expected one of: stable, beta, experimental, deprecated)"
                )
            })
    }
}

/// One page of documentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique, URL-safe identifier (e.g. `components/forms`).
    pub slug: String,
    /// Page title.
    pub title: String,
    /// One-line summary.
    #[serde(default)]
    pub description: String,
    /// Full page text.
    #[serde(default)]
    pub body: String,
    /// Maturity of the documented feature.
    #[serde(default)]
    pub status: DocStatus,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Navigation category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Any other front matter keys, passed through untouched.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl Document {
    /// Builds a document with only the required fields set.
    #[must_use]
    pub fn new(slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            title: title.into(),
            description: String::new(),
            body: String::new(),
            status: DocStatus::default(),
            tags: Vec::new(),
            category: None,
            metadata: Map::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the status.
    #[must_use]
    pub const fn with_status(mut self, status: DocStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Listing view of the document (no body).
    #[must_use]
    pub fn summary(&self) -> DocSummary {
        DocSummary {
            slug: self.slug.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            status: self.status,
            tags: self.tags.clone(),
            category: self.category.clone(),
        }
    }

    /// Text the ranked search looks at.
    #[must_use]
    pub fn search_fields(&self) -> SearchFields<'_> {
        let mut tags: Vec<&str> = self.tags.iter().map(String::as_str).collect();
        if let Some(category) = &self.category {
            tags.push(category);
        }
        SearchFields {
            title: &self.title,
            text: vec![&self.slug, &self.description, &self.body],
            tags,
        }
    }
}

/// Listing view of a [`Document`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocSummary {
    /// Unique identifier.
    pub slug: String,
    /// Page title.
    pub title: String,
    /// One-line summary.
    pub description: String,
    /// Maturity.
    pub status: DocStatus,
    /// Tags.
    pub tags: Vec<String>,
    /// Navigation category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// A vocabulary entry the term linker recognises.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlossaryTerm {
    /// The word or phrase as written in prose.
    pub term: String,
    /// Glossary page slug the term links to.
    pub slug: String,
    /// Full definition text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
}

impl GlossaryTerm {
    /// Creates a glossary term.
    #[must_use]
    pub fn new(term: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            slug: slug.into(),
            definition: None,
        }
    }

    /// Sets the definition.
    #[must_use]
    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Beta".parse::<DocStatus>(), Ok(DocStatus::Beta));
        assert_eq!(" deprecated ".parse::<DocStatus>(), Ok(DocStatus::Deprecated));
        assert!("retired".parse::<DocStatus>().is_err());
    }

    #[test]
    fn document_defaults_missing_fields() {
        let doc: Document = serde_json::from_value(json!({
            "slug": "forms",
            "title": "Forms"
        }))
        .unwrap();
        assert_eq!(doc.status, DocStatus::Stable);
        assert!(doc.tags.is_empty());
        assert!(doc.body.is_empty());
    }

    #[test]
    fn summary_omits_body() {
        let doc = Document::new("forms", "Forms").with_body("long text");
        let json = serde_json::to_value(doc.summary()).unwrap();
        assert!(json.get("body").is_none());
        assert_eq!(json["status"], json!("stable"));
    }

    #[test]
    fn search_fields_include_category_as_tag() {
        let doc = Document::new("forms", "Forms")
            .with_tags(["input"])
            .with_category("components");
        let fields = doc.search_fields();
        assert_eq!(fields.title, "Forms");
        assert_eq!(fields.tags, vec!["input", "components"]);
    }
}
