use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

fn word_regex() -> &'static Regex {
    static WORD: OnceLock<Regex> = OnceLock::new();
    WORD.get_or_init(|| Regex::new(r"[\p{L}\p{N}][\p{L}\p{N}'-]*").expect("valid word regex"))
}

/// Lower-cased word tokens in order of appearance.
pub(crate) fn tokens(text: &str) -> Vec<String> {
    word_regex()
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(['-', '\'']).to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Tokens long enough to carry meaning, minus stopwords.
///
/// ASCII words need 3 characters; other scripts need 2 (Hangul syllables are dense).
pub(crate) fn keywords(text: &str, stopwords: &[String]) -> BTreeSet<String> {
    tokens(text)
        .into_iter()
        .filter(|t| {
            let min_len = if t.is_ascii() { 3 } else { 2 };
            t.chars().count() >= min_len && !stopwords.iter().any(|s| s == t)
        })
        .collect()
}

/// Case-insensitive substring containment.
pub(crate) fn contains_term(haystack_lower: &str, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    !term.is_empty() && haystack_lower.contains(&term)
}

/// Number of non-overlapping occurrences of `term` in an already lower-cased text.
pub(crate) fn count_term(haystack_lower: &str, term: &str) -> usize {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return 0;
    }
    haystack_lower.matches(term.as_str()).count()
}
