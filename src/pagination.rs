//! Stateless cursor-based pagination.
//!
//! A cursor is an opaque URL-safe base64 token wrapping `offset:<n>`. The
//! server keeps no per-cursor state: every page request re-slices the full,
//! ordered collection. Malformed cursors decode to offset 0 instead of
//! failing, so a stale or hand-edited token restarts from the first page.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::Serialize;
use serde_json::Value;

/// Page size used when the caller gives none (or an unusable one).
pub const DEFAULT_LIMIT: usize = 20;

/// Largest page size a caller may request.
pub const MAX_LIMIT: usize = 100;

const CURSOR_PREFIX: &str = "offset:";

/// Encodes an offset as an opaque cursor.
#[must_use]
pub fn encode_cursor(offset: usize) -> String {
    URL_SAFE_NO_PAD.encode(format!("{CURSOR_PREFIX}{offset}"))
}

/// Decodes a cursor back to its offset, falling back to 0 on any mismatch.
#[must_use]
pub fn decode_cursor(cursor: &str) -> usize {
    URL_SAFE_NO_PAD
        .decode(cursor.trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .and_then(|text| {
            text.strip_prefix(CURSOR_PREFIX)
                .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
                .and_then(|digits| digits.parse().ok())
        })
        .unwrap_or(0)
}

/// Clamps a requested page size into `[1, MAX_LIMIT]`.
///
/// Absent, non-finite and negative values fall back to [`DEFAULT_LIMIT`].
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // clamped before the cast
pub fn clamp_limit(limit: Option<f64>) -> usize {
    match limit {
        Some(value) if value.is_finite() && value >= 0.0 => {
            value.floor().clamp(1.0, MAX_LIMIT as f64) as usize
        }
        _ => DEFAULT_LIMIT,
    }
}

/// The pagination half of a tool's arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageRequest {
    /// Cursor returned by a previous page, if any.
    pub cursor: Option<String>,
    /// Requested page size before clamping.
    pub limit: Option<f64>,
}

impl PageRequest {
    /// Reads `cursor` and `limit` from a tool's argument object.
    ///
    /// Values of the wrong type are ignored rather than rejected.
    #[must_use]
    pub fn from_args(arguments: &Value) -> Self {
        Self {
            cursor: arguments
                .get("cursor")
                .and_then(Value::as_str)
                .map(str::to_string),
            limit: arguments.get("limit").and_then(Value::as_f64),
        }
    }
}

/// One page sliced out of an ordered collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Items on this page, in collection order.
    pub items: Vec<T>,
    /// Cursor for the next page; present iff `has_more`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    /// Whether items remain past this page.
    pub has_more: bool,
    /// Size of the full collection.
    pub total: usize,
}

impl<T> Page<T> {
    /// Maps the items of the page, keeping the pagination metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
            has_more: self.has_more,
            total: self.total,
        }
    }
}

/// Slices one page out of `items`.
///
/// A cursor past the end yields an empty page with `has_more == false`.
#[must_use]
pub fn paginate<T: Clone>(items: &[T], request: &PageRequest) -> Page<T> {
    let limit = clamp_limit(request.limit);
    let offset = request.cursor.as_deref().map_or(0, decode_cursor);
    let total = items.len();

    let start = offset.min(total);
    let end = offset.saturating_add(limit).min(total);
    let has_more = offset.saturating_add(limit) < total;

    Page {
        items: items[start..end].to_vec(),
        next_cursor: has_more.then(|| encode_cursor(offset + limit)),
        has_more,
        total,
    }
}
