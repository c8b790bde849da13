//! Approximate string matching.
//!
//! - [`fuzzy`]: edit distance, similarity ratio, "did you mean" suggestions
//!   and substring-or-fuzzy filtering
//! - [`ranked`]: additive multi-signal ranking on top of [`fuzzy`]

pub mod fuzzy;
pub mod ranked;

pub use fuzzy::{
    find_best_matches, fuzzy_search, levenshtein_distance, similarity_ratio, suggest,
    FuzzySearchOptions, MatchOptions, ScoredMatch,
};
pub use ranked::{rank, Ranked, SearchFields};
