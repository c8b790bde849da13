//! Automatic linking of glossary vocabulary in free text.
//!
//! Terms are matched as whole words, ignoring case, longest term first so
//! that "design token" wins over "token". Each linked occurrence becomes a
//! Markdown link `[matched text](base_url/slug)`. Text already inside a
//! Markdown link (its label or its target) is never touched.
//!
//! Compiled patterns are plain [`Regex`] values with no scan state, so a
//! linker can be shared and called repeatedly with identical results.

use regex::Regex;
use serde::Serialize;

use crate::corpus::GlossaryTerm;

/// Default URL prefix for glossary links.
pub const DEFAULT_BASE_URL: &str = "/glossary";

/// Default number of links emitted per term.
pub const DEFAULT_MAX_LINKS_PER_TERM: usize = 1;

/// Share of `max_length` a cut point must pass in [`brief_definition`].
const BRIEF_CUT_RATIO: f64 = 0.7;

const ELLIPSIS: &str = "...";

#[derive(Debug, Clone)]
struct LinkEntry {
    term: GlossaryTerm,
    pattern: Regex,
    target: String,
}

/// Links glossary terms in Markdown text.
#[derive(Debug, Clone)]
pub struct TermLinker {
    entries: Vec<LinkEntry>,
    base_url: String,
    max_links_per_term: usize,
}

/// A term found in text, with the byte offset of its first mention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mention<'a> {
    /// The glossary entry.
    #[serde(flatten)]
    pub term: &'a GlossaryTerm,
    /// Byte offset of the first unclaimed occurrence.
    pub position: usize,
}

impl TermLinker {
    /// Builds a linker over `terms`.
    ///
    /// Terms that are blank are ignored.
    #[must_use]
    pub fn new(terms: &[GlossaryTerm], base_url: &str, max_links_per_term: usize) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();

        let mut sorted: Vec<&GlossaryTerm> = terms
            .iter()
            .filter(|entry| !entry.term.trim().is_empty())
            .collect();
        // Longest first; stable so equal lengths keep glossary order.
        sorted.sort_by_key(|entry| std::cmp::Reverse(entry.term.trim().chars().count()));

        let entries = sorted
            .into_iter()
            .filter_map(|entry| match term_pattern(entry.term.trim()) {
                Ok(pattern) => Some(LinkEntry {
                    term: entry.clone(),
                    pattern,
                    target: format!("{base_url}/{}", entry.slug),
                }),
                Err(e) => {
                    tracing::warn!(term = %entry.term, error = %e, "Skipping unlinkable term");
                    None
                }
            })
            .collect();

        Self {
            entries,
            base_url,
            max_links_per_term,
        }
    }

    /// Number of linkable terms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no term can be linked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// URL prefix used for link targets.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Default per-term link limit.
    #[must_use]
    pub const fn max_links_per_term(&self) -> usize {
        self.max_links_per_term
    }

    /// Links terms using the configured per-term limit.
    #[must_use]
    pub fn link_terms(&self, text: &str) -> String {
        self.link_terms_with(text, self.max_links_per_term)
    }

    /// Links up to `max_links_per_term` occurrences of each term.
    ///
    /// Existing links to a term's target count toward its limit, so running
    /// the linker over its own output changes nothing.
    #[must_use]
    pub fn link_terms_with(&self, text: &str, max_links_per_term: usize) -> String {
        let mut linked = text.to_string();

        for entry in &self.entries {
            let existing = linked.matches(&format!("]({})", entry.target)).count();
            let budget = max_links_per_term.saturating_sub(existing);
            if budget == 0 {
                continue;
            }

            let spans: Vec<(usize, usize)> = entry
                .pattern
                .find_iter(&linked)
                .filter(|m| !inside_link(&linked, m.start()))
                .take(budget)
                .map(|m| (m.start(), m.end()))
                .collect();
            if spans.is_empty() {
                continue;
            }

            let mut out = String::with_capacity(linked.len() + spans.len() * entry.target.len());
            let mut cursor = 0;
            for (start, end) in spans {
                out.push_str(&linked[cursor..start]);
                out.push('[');
                out.push_str(&linked[start..end]);
                out.push_str("](");
                out.push_str(&entry.target);
                out.push(')');
                cursor = end;
            }
            out.push_str(&linked[cursor..]);
            linked = out;

            tracing::trace!(term = %entry.term.term, "Linked term");
        }

        linked
    }

    /// Glossary terms mentioned in `text`, ordered by first mention.
    ///
    /// Occurrences covered by a longer term do not count for the shorter
    /// terms inside them.
    #[must_use]
    pub fn find_mentioned_terms(&self, text: &str) -> Vec<Mention<'_>> {
        let mut claimed: Vec<(usize, usize)> = Vec::new();
        let mut mentions = Vec::new();

        for entry in &self.entries {
            let mut first = None;
            for m in entry.pattern.find_iter(text) {
                let overlaps = claimed
                    .iter()
                    .any(|&(start, end)| m.start() < end && start < m.end());
                if overlaps {
                    continue;
                }
                claimed.push((m.start(), m.end()));
                first.get_or_insert(m.start());
            }
            if let Some(position) = first {
                mentions.push(Mention {
                    term: &entry.term,
                    position,
                });
            }
        }

        mentions.sort_by_key(|mention| mention.position);
        mentions
    }
}

impl Default for TermLinker {
    fn default() -> Self {
        Self::new(&[], DEFAULT_BASE_URL, DEFAULT_MAX_LINKS_PER_TERM)
    }
}

/// Whole-word, case-insensitive pattern for a literal term.
///
/// `\b` is only anchored on edges that are word characters, so terms such
/// as "C++" still match.
fn term_pattern(term: &str) -> Result<Regex, regex::Error> {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let leading = term.chars().next().is_some_and(is_word);
    let trailing = term.chars().last().is_some_and(is_word);
    Regex::new(&format!(
        "(?i){}{}{}",
        if leading { r"\b" } else { "" },
        regex::escape(term),
        if trailing { r"\b" } else { "" },
    ))
}

/// Returns `true` if byte offset `at` sits inside a Markdown link label or
/// an unclosed `](...)` target.
fn inside_link(text: &str, at: usize) -> bool {
    let before = &text[..at];

    let opens = before.matches('[').count();
    let closes = before.matches(']').count();
    if opens > closes {
        return true;
    }

    before
        .rfind("](")
        .is_some_and(|target_start| !before[target_start..].contains(')'))
}

/// Shortens a definition to at most `max_length` characters.
///
/// Text that already fits is returned unchanged. Otherwise the cut prefers
/// the last sentence end past 70% of the limit (no ellipsis), then the last
/// word boundary past 70% (with "..."), then a hard cut (with "...").
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
pub fn brief_definition(text: &str, max_length: usize) -> String {
    let text = text.trim();
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_length {
        return text.to_string();
    }

    let window = &chars[..max_length];
    let threshold = (max_length as f64 * BRIEF_CUT_RATIO) as usize;

    let sentence_end = window.iter().enumerate().rev().find_map(|(i, c)| {
        let terminal = matches!(c, '.' | '!' | '?');
        let followed_by_space = chars.get(i + 1).map_or(true, |next| next.is_whitespace());
        (terminal && followed_by_space).then_some(i + 1)
    });
    if let Some(end) = sentence_end.filter(|&end| end > threshold) {
        return window[..end].iter().collect();
    }

    let word_end = window
        .iter()
        .rposition(|c| c.is_whitespace())
        .filter(|&end| end > threshold);
    if let Some(end) = word_end {
        let mut brief: String = window[..end].iter().collect();
        brief.truncate(brief.trim_end().len());
        brief.push_str(ELLIPSIS);
        return brief;
    }

    let mut brief: String = window.iter().collect();
    brief.push_str(ELLIPSIS);
    brief
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glossary() -> Vec<GlossaryTerm> {
        vec![
            GlossaryTerm::new("token", "token"),
            GlossaryTerm::new("design token", "design-token"),
            GlossaryTerm::new("forms", "forms").with_definition("Collect user input."),
            GlossaryTerm::new("C++", "cpp"),
        ]
    }

    fn linker() -> TermLinker {
        TermLinker::new(&glossary(), DEFAULT_BASE_URL, 1)
    }

    #[test]
    fn links_first_occurrence_only() {
        let out = linker().link_terms("Forms are great. More forms here.");
        assert_eq!(
            out,
            "[Forms](/glossary/forms) are great. More forms here."
        );
    }

    #[test]
    fn longest_term_wins() {
        let out = linker().link_terms("Use a design token here.");
        assert_eq!(
            out,
            "Use a [design token](/glossary/design-token) here."
        );
    }

    #[test]
    fn shorter_term_still_links_elsewhere() {
        let out = linker().link_terms("A design token is a token.");
        assert_eq!(
            out,
            "A [design token](/glossary/design-token) is a [token](/glossary/token)."
        );
    }

    #[test]
    fn whole_words_only() {
        let out = linker().link_terms("Tokenized platforms");
        assert_eq!(out, "Tokenized platforms");
    }

    #[test]
    fn non_word_edges_still_match() {
        let out = linker().link_terms("Written in C++ today.");
        assert_eq!(out, "Written in [C++](/glossary/cpp) today.");
    }

    #[test]
    fn existing_links_are_left_alone() {
        let text = "See [the forms guide](/guides/forms) for details.";
        assert_eq!(linker().link_terms(text), text);
    }

    #[test]
    fn relinking_is_idempotent() {
        let linker = TermLinker::new(&glossary(), DEFAULT_BASE_URL, 2);
        let text = "A design token and forms. Another token, more forms, one more token.";
        let once = linker.link_terms(text);
        let twice = linker.link_terms(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn repeated_calls_agree() {
        let linker = linker();
        let text = "forms and tokens and forms";
        assert_eq!(linker.link_terms(text), linker.link_terms(text));
        assert_eq!(
            linker.find_mentioned_terms(text),
            linker.find_mentioned_terms(text)
        );
    }

    #[test]
    fn mentions_are_ordered_and_masked() {
        let linker = linker();
        let mentions = linker.find_mentioned_terms("Forms use a design token.");
        let names: Vec<_> = mentions.iter().map(|m| m.term.term.as_str()).collect();
        assert_eq!(names, vec!["forms", "design token"]);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let linker = TermLinker::new(&glossary(), "/terms/", 1);
        assert_eq!(linker.base_url(), "/terms");
        assert_eq!(linker.link_terms("forms"), "[forms](/terms/forms)");
    }

    #[test]
    fn brief_keeps_short_text() {
        assert_eq!(brief_definition("  Short.  ", 50), "Short.");
    }

    #[test]
    fn brief_cuts_at_sentence() {
        let text = "First sentence is here. Second sentence runs on and on.";
        assert_eq!(brief_definition(text, 30), "First sentence is here.");
    }

    #[test]
    fn brief_cuts_at_word_with_ellipsis() {
        let text = "Alpha beta gamma delta epsilon zeta eta theta";
        assert_eq!(brief_definition(text, 20), "Alpha beta gamma...");
    }

    #[test]
    fn brief_hard_cuts_long_words() {
        let text = "Supercalifragilisticexpialidocious";
        assert_eq!(brief_definition(text, 10), "Supercalif...");
    }

    #[test]
    fn brief_counts_chars() {
        let text = "ééééé ééééé ééééé";
        assert_eq!(brief_definition(text, 14), "ééééé ééééé...");
    }
}
