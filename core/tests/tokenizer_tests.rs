use pubsearch_core::tokenizer::{tokenize, STOPWORDS};

#[test]
fn it_lowercases_and_strips_punctuation() {
    let words = tokenize("Monetary Policy, Inflation & the U.S. Economy (2008-2012)");
    assert_eq!(words, vec!["monetary", "policy", "inflation", "us", "economy", "20082012"]);
}

#[test]
fn it_filters_every_stopword() {
    let text = STOPWORDS.join(" ").to_uppercase();
    assert!(tokenize(&text).is_empty());
    let words = tokenize("An Analysis of Risk in Markets with Leverage");
    assert_eq!(words, vec!["analysis", "risk", "markets", "leverage"]);
}

#[test]
fn it_keeps_non_ascii_letters() {
    let words = tokenize("Économie «française» — Étude");
    assert_eq!(words, vec!["économie", "«française»", "—", "étude"]);
}
