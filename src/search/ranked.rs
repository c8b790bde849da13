//! Additive multi-signal ranking built on the fuzzy matcher.
//!
//! Every signal that fires adds to a candidate's score, so a title hit and a
//! tag hit both count instead of the strongest signal winning alone. Signal
//! weights are ordered: exact full-field match, then substring match, then
//! scaled fuzzy similarity, then tag/category contribution.

use std::cmp::Ordering;

use super::fuzzy::similarity_ratio;

/// Score for a field equal to the whole query.
pub const EXACT_MATCH: f64 = 100.0;
/// Score for a title containing the query.
pub const TITLE_SUBSTRING: f64 = 50.0;
/// Score for any other text field containing the query.
pub const TEXT_SUBSTRING: f64 = 20.0;
/// Multiplier for the best fuzzy title-word similarity.
pub const FUZZY_WEIGHT: f64 = 30.0;
/// Score per tag or category equal to the query.
pub const TAG_EXACT: f64 = 15.0;
/// Score per tag or category that partially matches the query.
pub const TAG_PARTIAL: f64 = 8.0;

/// Text extracted from one candidate for ranking.
#[derive(Debug, Clone, Default)]
pub struct SearchFields<'a> {
    /// Primary display name.
    pub title: &'a str,
    /// Secondary text (identifier, summary, body).
    pub text: Vec<&'a str>,
    /// Tags and category labels.
    pub tags: Vec<&'a str>,
}

/// A candidate with its summed score.
#[derive(Debug, Clone, Copy)]
pub struct Ranked<'a, T> {
    /// The ranked item.
    pub item: &'a T,
    /// Sum of every signal that fired.
    pub score: f64,
}

/// Scores one candidate against `query`.
#[must_use]
pub fn score_fields(fields: &SearchFields<'_>, query: &str, min_similarity: f64) -> f64 {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return 0.0;
    }

    let title = fields.title.trim().to_lowercase();
    let texts: Vec<String> = fields
        .text
        .iter()
        .map(|text| text.trim().to_lowercase())
        .collect();

    let mut score = 0.0;

    if title == needle || texts.iter().any(|text| *text == needle) {
        score += EXACT_MATCH;
    }

    if title.contains(&needle) {
        score += TITLE_SUBSTRING;
    }
    if texts.iter().any(|text| text.contains(&needle)) {
        score += TEXT_SUBSTRING;
    }

    let fuzzy = best_word_similarity(&title, &needle);
    if fuzzy >= min_similarity {
        score += FUZZY_WEIGHT * fuzzy;
    }

    for tag in &fields.tags {
        let tag = tag.trim().to_lowercase();
        if tag == needle {
            score += TAG_EXACT;
        } else if tag.contains(&needle) || similarity_ratio(&tag, &needle) >= min_similarity {
            score += TAG_PARTIAL;
        }
    }

    score
}

/// Highest similarity between any query word and any title word.
fn best_word_similarity(title: &str, query: &str) -> f64 {
    query
        .split_whitespace()
        .flat_map(|q| title.split_whitespace().map(move |t| similarity_ratio(q, t)))
        .fold(0.0, f64::max)
}

/// Ranks `items` by their summed score against `query`.
///
/// Items scoring zero are dropped. Equal scores keep input order.
pub fn rank<'a, T, F>(
    items: &'a [T],
    query: &str,
    fields: F,
    min_similarity: f64,
) -> Vec<Ranked<'a, T>>
where
    F: Fn(&'a T) -> SearchFields<'a>,
{
    let mut ranked: Vec<Ranked<'a, T>> = items
        .iter()
        .map(|item| Ranked {
            item,
            score: score_fields(&fields(item), query, min_similarity),
        })
        .filter(|ranked| ranked.score > 0.0)
        .collect();

    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Entry {
        title: &'static str,
        summary: &'static str,
        tags: Vec<&'static str>,
    }

    fn fields(entry: &Entry) -> SearchFields<'_> {
        SearchFields {
            title: entry.title,
            text: vec![entry.summary],
            tags: entry.tags.clone(),
        }
    }

    fn entry(title: &'static str, summary: &'static str, tags: &[&'static str]) -> Entry {
        Entry {
            title,
            summary,
            tags: tags.to_vec(),
        }
    }

    #[test]
    fn exact_beats_substring_beats_fuzzy() {
        let items = vec![
            entry("Form layout", "Arrange fields", &[]),
            entry("Forms", "Collect input", &[]),
            entry("Frms", "Typo title", &[]),
        ];
        let ranked = rank(&items, "forms", fields, 0.4);
        let titles: Vec<_> = ranked.iter().map(|r| r.item.title).collect();
        assert_eq!(titles[0], "Forms");
        assert!(titles.contains(&"Frms"));
    }

    #[test]
    fn title_and_tag_hits_add_up() {
        let items = vec![
            entry("Input fields", "Text boxes", &[]),
            entry("Input fields", "Text boxes", &["input"]),
        ];
        let ranked = rank(&items, "input", fields, 0.4);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].item.tags, vec!["input"]);
        assert!(ranked[0].score > ranked[1].score);
    }

    #[test]
    fn tag_only_match_is_kept() {
        let items = vec![entry("Dialogs", "Overlay windows", &["modal"])];
        let ranked = rank(&items, "modal", fields, 0.6);
        assert_eq!(ranked.len(), 1);
        assert!((ranked[0].score - TAG_EXACT).abs() < f64::EPSILON);
    }

    #[test]
    fn unrelated_items_are_dropped() {
        let items = vec![entry("Navigation", "Menus and links", &["nav"])];
        assert!(rank(&items, "zzzz", fields, 0.4).is_empty());
    }

    #[test]
    fn empty_query_scores_zero() {
        let fields = SearchFields {
            title: "Forms",
            ..SearchFields::default()
        };
        assert!(score_fields(&fields, "   ", 0.4).abs() < f64::EPSILON);
    }
}
