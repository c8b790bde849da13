//! `doc_advisor`: a short guided conversation that recommends pages.
//!
//! The advisor asks for the caller's goal, then for acceptable maturity
//! levels, then answers with ranked recommendations. Conversation state
//! lives in the context's session store between calls.

use serde::Serialize;
use serde_json::{json, Value};

use super::{optional_str, ToolContext, ToolError, ToolResult};
use crate::corpus::{DocStatus, Document};
use crate::mcp::registry::Tool;
use crate::search::{rank, FuzzySearchOptions};

const MAX_RECOMMENDATIONS: usize = 5;

const GOAL_QUESTION: &str = "What are you trying to build or learn about?";
const STATUS_QUESTION: &str = "Which maturity levels are acceptable? Answer with a comma-separated \
     list of stable, beta, experimental, deprecated, or 'any'.";

/// Where an advisor conversation stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisorStep {
    /// Waiting for the caller's goal.
    AskGoal,
    /// Waiting for acceptable statuses.
    AskStatus,
    /// Recommendations were given.
    Done,
}

/// State of one advisor conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvisorState {
    /// Current step.
    pub step: AdvisorStep,
    /// The caller's goal, once given.
    pub goal: Option<String>,
    /// Acceptable statuses, once given. Empty means any.
    pub statuses: Vec<DocStatus>,
}

impl Default for AdvisorState {
    fn default() -> Self {
        Self {
            step: AdvisorStep::AskGoal,
            goal: None,
            statuses: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Recommendation<'a> {
    slug: &'a str,
    title: &'a str,
    description: &'a str,
    status: DocStatus,
    score: f64,
}

pub(super) fn doc_advisor() -> Tool {
    Tool::new(
        "doc_advisor",
        "Guided page recommendations. Call without arguments to start; the reply \
         holds a sessionId and a question. Answer each question by calling again \
         with session_id and answer. Sessions expire after inactivity.",
        json!({
            "type": "object",
            "properties": {
                "session_id": {
                    "type": "string",
                    "description": "Session id from a previous doc_advisor reply"
                },
                "answer": {
                    "type": "string",
                    "description": "Answer to the previous question"
                }
            }
        }),
        run,
    )
}

fn run(context: &mut ToolContext, arguments: &Value) -> ToolResult {
    let Some(session_id) = optional_str(arguments, "session_id")? else {
        let id = context.sessions.create(AdvisorState::default());
        return Ok(json!({
            "sessionId": id,
            "step": AdvisorStep::AskGoal,
            "question": GOAL_QUESTION,
        }));
    };

    let Some(state) = context.sessions.get(session_id).cloned() else {
        return Err(session_not_found(session_id));
    };
    let answer = optional_str(arguments, "answer")?;

    let next = match (state.step, answer) {
        (AdvisorStep::Done, _) => state,
        (_, None) => {
            return Err(ToolError::InvalidArguments(
                "Missing required parameter: answer".to_string(),
            ))
        }
        (AdvisorStep::AskGoal, Some(goal)) => AdvisorState {
            step: AdvisorStep::AskStatus,
            goal: Some(goal.to_string()),
            ..state
        },
        (AdvisorStep::AskStatus, Some(answer)) => AdvisorState {
            step: AdvisorStep::Done,
            statuses: parse_statuses(answer)?,
            ..state
        },
    };

    if !context.sessions.update(session_id, next.clone()) {
        return Err(session_not_found(session_id));
    }
    tracing::debug!(session = %session_id, step = ?next.step, "Advisor step");

    match next.step {
        AdvisorStep::AskGoal => Ok(json!({
            "sessionId": session_id,
            "step": next.step,
            "question": GOAL_QUESTION,
        })),
        AdvisorStep::AskStatus => Ok(json!({
            "sessionId": session_id,
            "step": next.step,
            "question": STATUS_QUESTION,
        })),
        AdvisorStep::Done => {
            let goal = next.goal.as_deref().unwrap_or_default();
            let documents = context.corpus().documents();
            let recommendations = recommend(documents, goal, &next.statuses);
            Ok(json!({
                "sessionId": session_id,
                "step": next.step,
                "goal": goal,
                "statuses": next.statuses,
                "recommendations": recommendations,
            }))
        }
    }
}

/// Parses a comma-separated status list. `any` (or an empty list) means all.
fn parse_statuses(answer: &str) -> Result<Vec<DocStatus>, ToolError> {
    let mut statuses = Vec::new();
    for part in answer.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if part.eq_ignore_ascii_case("any") {
            return Ok(Vec::new());
        }
        let status = part
            .parse::<DocStatus>()
            .map_err(ToolError::InvalidArguments)?;
        if !statuses.contains(&status) {
            statuses.push(status);
        }
    }
    Ok(statuses)
}

fn recommend<'a>(
    documents: &'a [Document],
    goal: &str,
    statuses: &[DocStatus],
) -> Vec<Recommendation<'a>> {
    let min_similarity = FuzzySearchOptions::default().min_similarity;
    rank(documents, goal, Document::search_fields, min_similarity)
        .into_iter()
        .filter(|ranked| {
            if statuses.is_empty() {
                // "any" still hides deprecated pages.
                ranked.item.status != DocStatus::Deprecated
            } else {
                statuses.contains(&ranked.item.status)
            }
        })
        .take(MAX_RECOMMENDATIONS)
        .map(|ranked| Recommendation {
            slug: &ranked.item.slug,
            title: &ranked.item.title,
            description: &ranked.item.description,
            status: ranked.item.status,
            score: (ranked.score * 100.0).round() / 100.0,
        })
        .collect()
}

fn session_not_found(session_id: &str) -> ToolError {
    ToolError::NotFound {
        message: format!("Advisor session not found or expired: {session_id}"),
        suggestions: Vec::new(),
    }
}
