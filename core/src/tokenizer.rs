use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

/// Closed stop-word list. Index and query paths both filter against this set.
pub const STOPWORDS: [&str; 10] = ["the", "and", "of", "in", "on", "for", "a", "an", "with", "to"];

lazy_static! {
    // ASCII punctuation only; non-ASCII symbols survive normalization.
    static ref PUNCT: Regex = Regex::new(r"[[:punct:]]+").expect("valid regex");
    static ref STOPWORD_SET: HashSet<&'static str> = STOPWORDS.iter().copied().collect();
}

pub fn is_stopword(token: &str) -> bool { STOPWORD_SET.contains(token) }

/// Normalize text into terms: lowercase, strip punctuation, split on whitespace, drop stop words.
///
/// Punctuation is removed without inserting a separator, so `state-of-the-art`
/// becomes the single term `stateoftheart`. Repeated terms are kept.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let stripped = PUNCT.replace_all(&lowered, "");
    stripped
        .split_whitespace()
        .filter(|token| !is_stopword(token))
        .map(str::to_string)
        .collect()
}
