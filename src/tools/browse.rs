//! `list_docs` and `get_doc`: browsing the corpus by slug.

use serde_json::{json, Value};

use super::search::parse_status;
use super::{optional_bool, optional_str, required_str, to_json, ToolContext, ToolError, ToolResult};
use crate::corpus::{DocStatus, DocSummary};
use crate::mcp::registry::Tool;
use crate::pagination::{paginate, PageRequest, MAX_LIMIT};
use crate::search::suggest;

const LIST_DOCS: &str = "list_docs";

pub(super) fn list_docs() -> Tool {
    Tool::new(
        LIST_DOCS,
        "List documentation pages in corpus order, optionally filtered by status or \
         category. Returns summaries without page bodies. Paginated via nextCursor.",
        json!({
            "type": "object",
            "properties": {
                "status": {
                    "type": "string",
                    "enum": DocStatus::ALL.map(DocStatus::as_str),
                    "description": "Optional: only list documents with this status"
                },
                "category": {
                    "type": "string",
                    "description": "Optional: only list documents in this category (case-insensitive)"
                },
                "cursor": {
                    "type": "string",
                    "description": "Opaque cursor from a previous page"
                },
                "limit": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": MAX_LIMIT,
                    "description": "Page size (default 20)"
                }
            }
        }),
        run_list,
    )
}

fn run_list(context: &mut ToolContext, arguments: &Value) -> ToolResult {
    let status = parse_status(arguments)?;
    let category = optional_str(arguments, "category")?.map(str::to_string);

    context.cached(LIST_DOCS, arguments, |context| {
        let summaries: Vec<DocSummary> = context
            .corpus()
            .documents()
            .iter()
            .filter(|doc| status.map_or(true, |wanted| doc.status == wanted))
            .filter(|doc| {
                category.as_deref().map_or(true, |wanted| {
                    doc.category
                        .as_deref()
                        .is_some_and(|c| c.eq_ignore_ascii_case(wanted))
                })
            })
            .map(|doc| doc.summary())
            .collect();
        to_json(&paginate(&summaries, &PageRequest::from_args(arguments)))
    })
}

pub(super) fn get_doc() -> Tool {
    Tool::new(
        "get_doc",
        "Fetch one documentation page by slug, including its full body. Set \
         link_terms to turn glossary vocabulary in the body into links. Unknown \
         slugs return close matches.",
        json!({
            "type": "object",
            "properties": {
                "slug": {
                    "type": "string",
                    "description": "Document slug as returned by list_docs or search_docs"
                },
                "link_terms": {
                    "type": "boolean",
                    "description": "Link glossary terms in the body (default false)"
                }
            },
            "required": ["slug"]
        }),
        run_get,
    )
}

fn run_get(context: &mut ToolContext, arguments: &Value) -> ToolResult {
    let slug = required_str(arguments, "slug")?;
    let link = optional_bool(arguments, "link_terms")?.unwrap_or(false);

    let corpus = context.corpus();
    let Some(document) = corpus.document(slug) else {
        return Err(ToolError::NotFound {
            message: format!("Document not found: {slug}"),
            suggestions: suggest(slug, &corpus.slugs()),
        });
    };

    let mut result = to_json(document)?;
    if link {
        let linker = context.linker();
        let mentioned: Vec<&str> = linker
            .find_mentioned_terms(&document.body)
            .into_iter()
            .map(|mention| mention.term.term.as_str())
            .collect();
        if let Value::Object(map) = &mut result {
            map.insert(
                "body".to_string(),
                Value::String(linker.link_terms(&document.body)),
            );
            map.insert("mentionedTerms".to_string(), json!(mentioned));
        }
    }
    Ok(result)
}
