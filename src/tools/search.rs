//! `search_docs`: typo-tolerant ranked search.

use serde::Serialize;
use serde_json::{json, Value};

use super::{optional_str, required_str, to_json, ToolContext, ToolError, ToolResult};
use crate::corpus::{DocStatus, Document};
use crate::mcp::registry::Tool;
use crate::pagination::{paginate, PageRequest, MAX_LIMIT};
use crate::search::{rank, suggest, FuzzySearchOptions};

const NAME: &str = "search_docs";

#[derive(Debug, Clone, Serialize)]
struct SearchHit {
    slug: String,
    title: String,
    description: String,
    status: DocStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    score: f64,
}

pub(super) fn search_docs() -> Tool {
    Tool::new(
        NAME,
        "Search the documentation by keyword. Tolerates typos, ranks exact title \
         matches first, then substring, fuzzy and tag matches. Results are paginated: \
         pass the returned nextCursor to fetch the next page.",
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search text (e.g. 'forms', 'navigaton')"
                },
                "status": {
                    "type": "string",
                    "enum": DocStatus::ALL.map(DocStatus::as_str),
                    "description": "Optional: only return documents with this status"
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
            },
            "required": ["query"]
        }),
        run,
    )
}

fn run(context: &mut ToolContext, arguments: &Value) -> ToolResult {
    let query = required_str(arguments, "query")?.to_string();
    let status = parse_status(arguments)?;
    context.cached(NAME, arguments, |context| {
        search(context, &query, status, &PageRequest::from_args(arguments))
    })
}

/// Reads the optional `status` filter.
pub(super) fn parse_status(arguments: &Value) -> Result<Option<DocStatus>, ToolError> {
    optional_str(arguments, "status")?
        .map(str::parse::<DocStatus>)
        .transpose()
        .map_err(ToolError::InvalidArguments)
}

fn search(
    context: &ToolContext,
    query: &str,
    status: Option<DocStatus>,
    page: &PageRequest,
) -> ToolResult {
    let corpus = context.corpus();
    let min_similarity = FuzzySearchOptions::default().min_similarity;

    let hits: Vec<SearchHit> = rank(corpus.documents(), query, Document::search_fields, min_similarity)
        .into_iter()
        .filter(|ranked| status.map_or(true, |wanted| ranked.item.status == wanted))
        .map(|ranked| SearchHit {
            slug: ranked.item.slug.clone(),
            title: ranked.item.title.clone(),
            description: ranked.item.description.clone(),
            status: ranked.item.status,
            tags: ranked.item.tags.clone(),
            category: ranked.item.category.clone(),
            score: (ranked.score * 100.0).round() / 100.0,
        })
        .collect();

    tracing::debug!(query, hits = hits.len(), "Searched corpus");

    let mut result = to_json(&paginate(&hits, page))?;
    if let Value::Object(map) = &mut result {
        map.insert("query".to_string(), Value::String(query.to_string()));
        if hits.is_empty() {
            let titles: Vec<&str> = corpus.documents().iter().map(|d| d.title.as_str()).collect();
            map.insert("suggestions".to_string(), json!(suggest(query, &titles)));
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Corpus;
    use crate::tools::ContextOptions;

    fn context() -> ToolContext {
        ToolContext::new(
            Corpus::new(
                vec![
                    Document::new("forms", "Forms")
                        .with_description("Collect user input")
                        .with_tags(["input"]),
                    Document::new("form-layout", "Form layout")
                        .with_description("Arrange fields")
                        .with_status(DocStatus::Beta),
                    Document::new("navigation", "Navigation").with_description("Menus"),
                ],
                Vec::new(),
            ),
            ContextOptions::default(),
        )
    }

    #[test]
    fn typo_still_finds_forms_first() {
        let mut context = context();
        let result = run(&mut context, &json!({"query": "froms"})).unwrap();
        assert_eq!(result["items"][0]["slug"], json!("forms"));
        assert_eq!(result["query"], json!("froms"));
    }

    #[test]
    fn status_filter_applies() {
        let mut context = context();
        let result = run(&mut context, &json!({"query": "form", "status": "beta"})).unwrap();
        let slugs: Vec<_> = result["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|hit| hit["slug"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(slugs, vec!["form-layout"]);
    }

    #[test]
    fn bad_status_is_invalid_arguments() {
        let mut context = context();
        let err = run(&mut context, &json!({"query": "x", "status": "gone"})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn missing_query_is_invalid_arguments() {
        let mut context = context();
        assert!(matches!(
            run(&mut context, &json!({})),
            Err(ToolError::InvalidArguments(_))
        ));
    }

    #[test]
    fn results_are_cached() {
        let mut context = context();
        run(&mut context, &json!({"query": "forms"})).unwrap();
        run(&mut context, &json!({"query": "forms"})).unwrap();
        assert_eq!(context.cache.len(), 1);
    }

    #[test]
    fn no_hits_carry_suggestions() {
        let mut context = context();
        let result = run(&mut context, &json!({"query": "qqqqqqqqqqqq"})).unwrap();
        assert_eq!(result["total"], json!(0));
        assert!(result["suggestions"].is_array());
    }

    #[test]
    fn paginates_hits() {
        let mut context = context();
        let result = run(&mut context, &json!({"query": "form", "limit": 1})).unwrap();
        assert_eq!(result["items"].as_array().unwrap().len(), 1);
        assert_eq!(result["hasMore"], json!(true));
        assert!(result["nextCursor"].is_string());
    }
}
