use crate::document::Document;
use crate::error::SearchError;
use crate::index::{DocId, InvertedIndex};
use crate::tokenizer::tokenize;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoredHit {
    pub doc_id: DocId,
    pub score: u32,
}

/// Raw term-overlap scoring: every posting entry matching a query term adds one.
///
/// A query term repeated in the query counts once per repetition. Results with
/// score zero never appear; order is score descending, then doc id ascending.
pub fn score<S: AsRef<str>>(terms: &[S], index: &InvertedIndex) -> Vec<ScoredHit> {
    let mut scores: HashMap<DocId, u32> = HashMap::new();
    for term in terms {
        if let Some(postings) = index.postings(term.as_ref()) {
            for &doc_id in postings {
                *scores.entry(doc_id).or_insert(0) += 1;
            }
        }
    }
    let mut hits: Vec<ScoredHit> = scores.into_iter().map(|(doc_id, score)| ScoredHit { doc_id, score }).collect();
    hits.sort_unstable_by_key(|h| (Reverse(h.score), h.doc_id));
    hits
}

/// Ranked hits for a raw query string. Every hit is checked against the store.
pub fn search_hits(query: &str, index: &InvertedIndex, docs: &[Document]) -> Result<Vec<ScoredHit>, SearchError> {
    let terms = tokenize(query);
    if terms.is_empty() {
        tracing::debug!(query, "query has no searchable terms");
        return Ok(Vec::new());
    }
    let hits = score(&terms, index);
    if let Some(bad) = hits.iter().find(|h| h.doc_id as usize >= docs.len()) {
        tracing::error!(doc_id = bad.doc_id, store_len = docs.len(), "posting points outside document store");
        return Err(SearchError::DanglingPosting { doc_id: bad.doc_id, store_len: docs.len() });
    }
    tracing::debug!(query, ?terms, hits = hits.len(), "search");
    Ok(hits)
}

/// Ranked documents for a raw query string.
pub fn search<'a>(query: &str, index: &InvertedIndex, docs: &'a [Document]) -> Result<Vec<&'a Document>, SearchError> {
    let hits = search_hits(query, index, docs)?;
    Ok(hits.into_iter().map(|h| &docs[h.doc_id as usize]).collect())
}
