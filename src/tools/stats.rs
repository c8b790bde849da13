//! `corpus_stats`: a quick overview of what the server is serving.

use chrono::SecondsFormat;
use indexmap::IndexMap;
use serde_json::{json, Value};

use super::{ToolContext, ToolResult};
use crate::corpus::DocStatus;
use crate::mcp::registry::Tool;

/// Category key used for documents without one.
const UNCATEGORISED: &str = "uncategorised";

pub(super) fn corpus_stats() -> Tool {
    Tool::new(
        "corpus_stats",
        "Summarise the loaded documentation corpus: document counts by status \
         and category, glossary size, when the corpus was loaded, and cache usage.",
        json!({
            "type": "object",
            "properties": {}
        }),
        run,
    )
}

fn run(context: &mut ToolContext, _arguments: &Value) -> ToolResult {
    let corpus = context.corpus();

    let mut by_status: IndexMap<&str, usize> =
        DocStatus::ALL.iter().map(|status| (status.as_str(), 0)).collect();
    let mut by_category: IndexMap<&str, usize> = IndexMap::new();
    for document in corpus.documents() {
        *by_status.entry(document.status.as_str()).or_default() += 1;
        let category = document.category.as_deref().unwrap_or(UNCATEGORISED);
        *by_category.entry(category).or_default() += 1;
    }

    Ok(json!({
        "documents": corpus.documents().len(),
        "byStatus": by_status,
        "byCategory": by_category,
        "glossaryTerms": corpus.glossary().len(),
        "source": corpus.source().map(|path| path.display().to_string()),
        "loadedAt": corpus.loaded_at().to_rfc3339_opts(SecondsFormat::Secs, true),
        "cache": {
            "entries": context.cache.len(),
            "capacity": context.cache.capacity(),
            "ttlSecs": context.cache.ttl().as_secs(),
        },
        "activeSessions": context.sessions.len(),
    }))
}
