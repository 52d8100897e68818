use crate::document::{Document, DocumentStore};
use crate::error::{BuildError, SearchError};
use crate::query::{self, ScoredHit};
use crate::tokenizer::tokenize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub type DocId = u32;

/// Term → posting list. A document id appears once per occurrence of the
/// term in that document's title, in build order.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvertedIndex {
    // BTreeMap keeps serialization order stable across runs.
    postings: BTreeMap<String, Vec<DocId>>,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    pub fn postings(&self, term: &str) -> Option<&[DocId]> {
        self.postings.get(term).map(Vec::as_slice)
    }

    pub fn num_terms(&self) -> usize { self.postings.len() }

    pub fn num_postings(&self) -> usize { self.postings.values().map(Vec::len).sum() }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.postings.keys().map(String::as_str)
    }

    /// Highest document id referenced by any posting.
    pub fn max_doc_id(&self) -> Option<DocId> {
        self.postings.values().flat_map(|p| p.iter().copied()).max()
    }

    fn add_occurrence(&mut self, term: String, doc_id: DocId) {
        self.postings.entry(term).or_default().push(doc_id);
    }
}

/// Shared flag a caller sets to abort a running build.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self { Self::default() }

    pub fn cancel(&self) { self.0.store(true, Ordering::Relaxed); }

    pub fn is_cancelled(&self) -> bool { self.0.load(Ordering::Relaxed) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SnapshotStats {
    pub num_docs: usize,
    pub num_terms: usize,
    pub num_postings: usize,
}

/// An inverted index together with the document store it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub(crate) docs: DocumentStore,
    pub(crate) index: InvertedIndex,
}

impl Snapshot {
    pub fn docs(&self) -> &[Document] { &self.docs }

    pub fn index(&self) -> &InvertedIndex { &self.index }

    pub fn doc(&self, doc_id: DocId) -> Option<&Document> { self.docs.get(doc_id as usize) }

    pub fn into_parts(self) -> (InvertedIndex, DocumentStore) { (self.index, self.docs) }

    pub fn stats(&self) -> SnapshotStats {
        SnapshotStats {
            num_docs: self.docs.len(),
            num_terms: self.index.num_terms(),
            num_postings: self.index.num_postings(),
        }
    }

    pub fn search(&self, text: &str) -> Result<Vec<&Document>, SearchError> {
        query::search(text, &self.index, &self.docs)
    }

    pub fn search_hits(&self, text: &str) -> Result<Vec<ScoredHit>, SearchError> {
        query::search_hits(text, &self.index, &self.docs)
    }

    /// Every posting must point inside the store.
    pub(crate) fn check_postings(&self) -> Result<(), SearchError> {
        match self.index.max_doc_id() {
            Some(doc_id) if doc_id as usize >= self.docs.len() => {
                Err(SearchError::DanglingPosting { doc_id, store_len: self.docs.len() })
            }
            _ => Ok(()),
        }
    }
}

/// Build a snapshot from documents in order. Ids are positions in `docs`.
pub fn build(docs: Vec<Document>) -> Snapshot {
    let index = match index_documents(&docs, |_| Ok::<(), Infallible>(())) {
        Ok(index) => index,
        Err(never) => match never {},
    };
    Snapshot { docs, index }
}

/// Like [`build`], polling `cancel` between documents.
pub fn build_with_cancel(docs: Vec<Document>, cancel: &CancelFlag) -> Result<Snapshot, BuildError> {
    let total = docs.len();
    let index = index_documents(&docs, |processed| {
        if cancel.is_cancelled() {
            tracing::info!(processed, total, "build cancelled");
            return Err(BuildError::Cancelled);
        }
        Ok(())
    })?;
    Ok(Snapshot { docs, index })
}

/// Single indexing pass. `before_doc` runs ahead of each document with the
/// number already indexed and can stop the pass.
fn index_documents<E>(docs: &[Document], mut before_doc: impl FnMut(usize) -> Result<(), E>) -> Result<InvertedIndex, E> {
    let mut index = InvertedIndex::new();
    for (doc_id, doc) in docs.iter().enumerate() {
        before_doc(doc_id)?;
        index_title(&mut index, doc_id as DocId, doc);
    }
    tracing::info!(num_docs = docs.len(), num_terms = index.num_terms(), "index built");
    Ok(index)
}

fn index_title(index: &mut InvertedIndex, doc_id: DocId, doc: &Document) {
    let terms = tokenize(&doc.title);
    if terms.is_empty() {
        tracing::debug!(doc_id, "title has no indexable terms");
    }
    for term in terms {
        index.add_occurrence(term, doc_id);
    }
}
