//! `define_term` and `link_terms`: glossary lookups and auto-linking.

use serde_json::{json, Value};

use super::{optional_usize, required_str, ToolContext, ToolError, ToolResult};
use crate::linker::brief_definition;
use crate::mcp::registry::Tool;
use crate::search::suggest;

/// Brief definition length when the caller gives none.
const DEFAULT_BRIEF_LENGTH: usize = 160;

pub(super) fn define_term() -> Tool {
    Tool::new(
        "define_term",
        "Look up a glossary term. Returns the full definition, a brief version \
         trimmed at a sentence or word boundary, and the term's link target. \
         Unknown terms return close matches.",
        json!({
            "type": "object",
            "properties": {
                "term": {
                    "type": "string",
                    "description": "Term or glossary slug (case-insensitive)"
                },
                "max_length": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Maximum length of the brief definition (default 160)"
                }
            },
            "required": ["term"]
        }),
        run_define,
    )
}

fn run_define(context: &mut ToolContext, arguments: &Value) -> ToolResult {
    let name = required_str(arguments, "term")?;
    let max_length = optional_usize(arguments, "max_length")?
        .unwrap_or(DEFAULT_BRIEF_LENGTH)
        .max(1);

    let corpus = context.corpus();
    let Some(entry) = corpus.term(name) else {
        return Err(ToolError::NotFound {
            message: format!("Glossary term not found: {name}"),
            suggestions: suggest(name, &corpus.term_names()),
        });
    };

    // Terms without an inline definition fall back to their page's summary.
    let definition = entry.definition.clone().or_else(|| {
        corpus
            .document(&entry.slug)
            .map(|doc| doc.description.clone())
            .filter(|description| !description.is_empty())
    });

    Ok(json!({
        "term": entry.term,
        "slug": entry.slug,
        "url": format!("{}/{}", context.linker().base_url(), entry.slug),
        "definition": definition,
        "brief": definition.as_deref().map(|text| brief_definition(text, max_length)),
    }))
}

pub(super) fn link_terms() -> Tool {
    Tool::new(
        "link_terms",
        "Turn glossary vocabulary in Markdown text into links. Matches whole \
         words, ignoring case, longest term first, and leaves existing links \
         alone. Also reports which terms the text mentions.",
        json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "Markdown text to link"
                },
                "max_links_per_term": {
                    "type": "integer",
                    "minimum": 0,
                    "description": "Occurrences of each term to link (default from config, usually 1)"
                }
            },
            "required": ["text"]
        }),
        run_link,
    )
}

fn run_link(context: &mut ToolContext, arguments: &Value) -> ToolResult {
    let Some(text) = arguments.get("text").and_then(Value::as_str) else {
        return Err(ToolError::InvalidArguments(
            "Missing required parameter: text".to_string(),
        ));
    };
    let linker = context.linker();
    let max_links = optional_usize(arguments, "max_links_per_term")?
        .unwrap_or_else(|| linker.max_links_per_term());

    let linked = linker.link_terms_with(text, max_links);
    let mentioned = linker.find_mentioned_terms(text);

    Ok(json!({
        "text": linked,
        "changed": linked != text,
        "mentionedTerms": mentioned,
    }))
}
