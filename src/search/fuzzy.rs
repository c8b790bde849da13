//! Edit-distance similarity and typo-tolerant matching.
//!
//! All comparisons are case-insensitive and operate on Unicode scalar
//! values, not bytes.

use std::cmp::Ordering;

/// Options for [`find_best_matches`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOptions {
    /// Maximum number of matches returned.
    pub max_results: usize,
    /// Minimum similarity ratio a candidate needs to be returned.
    pub min_similarity: f64,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            max_results: 3,
            min_similarity: 0.3,
        }
    }
}

/// Options for [`fuzzy_search`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzySearchOptions {
    /// Minimum word similarity for the fuzzy fallback.
    pub min_similarity: f64,
}

impl Default for FuzzySearchOptions {
    fn default() -> Self {
        Self {
            min_similarity: 0.4,
        }
    }
}

/// A candidate that cleared the similarity threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredMatch<'a> {
    /// The candidate text.
    pub candidate: &'a str,
    /// Position of the candidate in the input slice.
    pub index: usize,
    /// Similarity ratio in `[0, 1]`.
    pub similarity: f64,
}

fn lowercase_chars(s: &str) -> Vec<char> {
    s.chars().flat_map(char::to_lowercase).collect()
}

/// Case-insensitive Levenshtein distance between two strings.
#[must_use]
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    distance_chars(&lowercase_chars(a), &lowercase_chars(b))
}

fn distance_chars(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            let insertion = current[j] + 1;
            let deletion = previous[j + 1] + 1;
            current[j + 1] = substitution.min(insertion).min(deletion);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Similarity ratio `1 - distance / max_len` in `[0, 1]`.
///
/// Symmetric in its arguments. Two empty strings are identical (ratio 1).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a = lowercase_chars(a);
    let b = lowercase_chars(b);
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    1.0 - distance_chars(&a, &b) as f64 / longest as f64
}

fn by_similarity_desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Ranks `candidates` by similarity to `query`.
///
/// Candidates under `min_similarity` are dropped. Ties keep their input
/// order. At most `max_results` matches are returned.
#[must_use]
pub fn find_best_matches<'a, S: AsRef<str>>(
    query: &str,
    candidates: &'a [S],
    options: MatchOptions,
) -> Vec<ScoredMatch<'a>> {
    let mut matches: Vec<ScoredMatch<'a>> = candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| ScoredMatch {
            candidate: candidate.as_ref(),
            index,
            similarity: similarity_ratio(query, candidate.as_ref()),
        })
        .filter(|m| m.similarity >= options.min_similarity)
        .collect();

    // `sort_by` is stable, so equal scores keep input order.
    matches.sort_by(|a, b| by_similarity_desc(a.similarity, b.similarity));
    matches.truncate(options.max_results);
    matches
}

/// "Did you mean" helper: the best matching candidates as owned strings.
#[must_use]
pub fn suggest<S: AsRef<str>>(query: &str, candidates: &[S]) -> Vec<String> {
    find_best_matches(query, candidates, MatchOptions::default())
        .into_iter()
        .map(|m| m.candidate.to_string())
        .collect()
}

/// Returns `true` if any field contains `query` as a substring, or any
/// whitespace-delimited word of any field is similar enough to it.
///
/// An empty query matches everything.
#[must_use]
pub fn matches_text<S: AsRef<str>>(fields: &[S], query: &str, min_similarity: f64) -> bool {
    let query = query.trim();
    if query.is_empty() {
        return true;
    }

    let needle = query.to_lowercase();
    if fields
        .iter()
        .any(|field| field.as_ref().to_lowercase().contains(&needle))
    {
        return true;
    }

    fields.iter().any(|field| {
        field
            .as_ref()
            .split_whitespace()
            .any(|word| similarity_ratio(word, query) >= min_similarity)
    })
}

/// Filters `items` down to those whose searchable text matches `query`.
///
/// Uses a cheap substring check first and falls back to word-level fuzzy
/// similarity. Matching items keep their input order.
pub fn fuzzy_search<'a, T, F, S>(
    items: &'a [T],
    query: &str,
    searchable_text: F,
    options: FuzzySearchOptions,
) -> Vec<&'a T>
where
    F: Fn(&T) -> Vec<S>,
    S: AsRef<str>,
{
    items
        .iter()
        .filter(|item| matches_text(&searchable_text(*item), query, options.min_similarity))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_basics() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("abc", ""), 3);
        assert_eq!(levenshtein_distance("", "abcd"), 4);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("froms", "forms"), 2);
    }

    #[test]
    fn distance_ignores_case() {
        assert_eq!(levenshtein_distance("Forms", "fORMS"), 0);
    }

    #[test]
    fn distance_counts_chars_not_bytes() {
        assert_eq!(levenshtein_distance("café", "cafe"), 1);
    }

    #[test]
    fn similarity_is_symmetric() {
        let pairs = [
            ("forms", "froms"),
            ("navigation", "nav"),
            ("", "x"),
            ("Modal", "modals"),
        ];
        for (a, b) in pairs {
            assert!((similarity_ratio(a, b) - similarity_ratio(b, a)).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn similarity_of_identical_strings_is_one() {
        assert!((similarity_ratio("Tabs", "tabs") - 1.0).abs() < f64::EPSILON);
        assert!((similarity_ratio("", "") - 1.0).abs() < f64::EPSILON);
        assert!(similarity_ratio("abc", "xyz").abs() < f64::EPSILON);
    }

    #[test]
    fn froms_suggests_forms_first() {
        let candidates = ["forms", "navigation", "modals"];
        let matches = find_best_matches("froms", &candidates, MatchOptions::default());
        assert_eq!(matches[0].candidate, "forms");
        assert_eq!(matches[0].index, 0);
    }

    #[test]
    fn best_matches_respect_threshold_and_limit() {
        let candidates = ["button", "buttons", "butter", "zebra", "baton"];
        let matches = find_best_matches(
            "button",
            &candidates,
            MatchOptions {
                max_results: 2,
                min_similarity: 0.5,
            },
        );
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].candidate, "button");
        assert_eq!(matches[1].candidate, "buttons");
    }

    #[test]
    fn ties_keep_input_order() {
        let candidates = ["cat", "bat", "hat"];
        let matches = find_best_matches("mat", &candidates, MatchOptions::default());
        let order: Vec<_> = matches.iter().map(|m| m.candidate).collect();
        assert_eq!(order, ["cat", "bat", "hat"]);
    }

    #[test]
    fn suggest_returns_owned_names() {
        let names = vec!["search_docs".to_string(), "get_doc".to_string()];
        assert_eq!(suggest("serch_docs", &names)[0], "search_docs");
        assert!(suggest("zzzzzzzzzzzz", &names).is_empty());
    }

    #[test]
    fn fuzzy_search_substring_and_typo() {
        let items = vec![
            ("Forms", "Collect user input"),
            ("Navigation", "Move between pages"),
            ("Modals", "Overlay dialogs"),
        ];
        fn by_text<'a>(item: &(&'a str, &'a str)) -> Vec<&'a str> {
            vec![item.0, item.1]
        }

        let hits = fuzzy_search(&items, "input", by_text, FuzzySearchOptions::default());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "Forms");

        let hits = fuzzy_search(&items, "navigatoin", by_text, FuzzySearchOptions::default());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "Navigation");
    }

    #[test]
    fn empty_query_matches_everything() {
        let items = ["a", "b", "c"];
        let hits = fuzzy_search(&items, "  ", |s| vec![*s], FuzzySearchOptions::default());
        assert_eq!(hits.len(), 3);
    }
}
