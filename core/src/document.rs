use crate::error::BuildError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Placeholder the upstream feed writes for unknown values.
const MISSING_SENTINEL: &str = "N/A";

/// A publication record. Its `DocId` is its position in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub link: String,
    pub authors: Option<String>,
    pub year: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl Document {
    /// Authors split on commas, trimmed, empties dropped.
    pub fn author_list(&self) -> Vec<&str> {
        self.authors
            .as_deref()
            .map(|a| a.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }
}

/// Ordered documents; a `DocId` indexes into it.
pub type DocumentStore = Vec<Document>;

/// One input row as read from the feed. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawRecord {
    pub title: Option<String>,
    pub link: Option<String>,
    pub authors: Option<String>,
    pub year: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl RawRecord {
    /// Validate into a `Document`. `row` is only used for error reporting.
    pub fn into_document(self, row: usize) -> Result<Document, BuildError> {
        let title = self.title.ok_or(BuildError::MalformedRecord { row, field: "title" })?;
        let link = self.link.ok_or(BuildError::MalformedRecord { row, field: "link" })?;
        Ok(Document {
            title,
            link,
            authors: optional_field(self.authors),
            year: optional_field(self.year),
            kind: optional_field(self.kind),
        })
    }
}

fn optional_field(value: Option<String>) -> Option<String> {
    value.filter(|v| {
        let v = v.trim();
        !v.is_empty() && v != MISSING_SENTINEL
    })
}

/// What to do with a record that lacks a required field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InvalidRecordPolicy {
    /// Fail the whole build on the first malformed record.
    #[default]
    Abort,
    /// Log and drop malformed records.
    Skip,
}

#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    pub on_invalid: InvalidRecordPolicy,
    /// Drop records whose `(title, link)` was already seen.
    pub dedup: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { on_invalid: InvalidRecordPolicy::Abort, dedup: true }
    }
}

/// Validate raw records and apply dedup, preserving input order.
pub fn prepare_documents(records: Vec<RawRecord>, options: &BuildOptions) -> Result<Vec<Document>, BuildError> {
    let total = records.len();
    let mut docs = Vec::with_capacity(total);
    let mut skipped = 0usize;
    for (row, record) in records.into_iter().enumerate() {
        match record.into_document(row) {
            Ok(doc) => docs.push(doc),
            Err(BuildError::MalformedRecord { row, field }) if options.on_invalid == InvalidRecordPolicy::Skip => {
                tracing::warn!(row, field, "skipping malformed record");
                skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    let before_dedup = docs.len();
    if options.dedup {
        docs = dedup_documents(docs);
    }
    tracing::info!(total, skipped, duplicates = before_dedup - docs.len(), kept = docs.len(), "prepared documents");
    Ok(docs)
}

/// Remove documents sharing `(title, link)` with an earlier one.
pub fn dedup_documents(docs: Vec<Document>) -> Vec<Document> {
    let mut seen: HashSet<(String, String)> = HashSet::with_capacity(docs.len());
    docs.into_iter()
        .filter(|d| seen.insert((d.title.clone(), d.link.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(title: Option<&str>, link: Option<&str>) -> RawRecord {
        RawRecord { title: title.map(Into::into), link: link.map(Into::into), ..Default::default() }
    }

    #[test]
    fn sentinel_and_blank_fields_become_absent() {
        let rec = RawRecord {
            title: Some("Finance and Markets".into()),
            link: Some("https://example.org/1".into()),
            authors: Some("N/A".into()),
            year: Some("  ".into()),
            kind: Some("Article".into()),
        };
        let doc = rec.into_document(0).unwrap();
        assert_eq!(doc.authors, None);
        assert_eq!(doc.year, None);
        assert_eq!(doc.kind.as_deref(), Some("Article"));
    }

    #[test]
    fn empty_title_is_legal_missing_title_is_not() {
        assert!(raw(Some(""), Some("l")).into_document(0).is_ok());
        let err = raw(None, Some("l")).into_document(7).unwrap_err();
        assert!(matches!(err, BuildError::MalformedRecord { row: 7, field: "title" }));
        let err = raw(Some("t"), None).into_document(1).unwrap_err();
        assert!(matches!(err, BuildError::MalformedRecord { row: 1, field: "link" }));
    }

    #[test]
    fn abort_policy_fails_whole_batch() {
        let records = vec![raw(Some("a"), Some("1")), raw(None, Some("2"))];
        let err = prepare_documents(records, &BuildOptions::default()).unwrap_err();
        assert!(matches!(err, BuildError::MalformedRecord { row: 1, .. }));
    }

    #[test]
    fn skip_policy_drops_bad_rows() {
        let records = vec![raw(Some("a"), Some("1")), raw(None, Some("2")), raw(Some("c"), Some("3"))];
        let opts = BuildOptions { on_invalid: InvalidRecordPolicy::Skip, dedup: true };
        let docs = prepare_documents(records, &opts).unwrap();
        let titles: Vec<_> = docs.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "c"]);
    }

    #[test]
    fn dedup_keeps_first_seen_in_order() {
        let records = vec![
            raw(Some("x"), Some("1")),
            raw(Some("y"), Some("2")),
            raw(Some("x"), Some("1")),
            raw(Some("x"), Some("9")),
        ];
        let docs = prepare_documents(records.clone(), &BuildOptions::default()).unwrap();
        let keys: Vec<_> = docs.iter().map(|d| (d.title.as_str(), d.link.as_str())).collect();
        assert_eq!(keys, vec![("x", "1"), ("y", "2"), ("x", "9")]);

        let opts = BuildOptions { dedup: false, ..Default::default() };
        assert_eq!(prepare_documents(records, &opts).unwrap().len(), 4);
    }

    #[test]
    fn author_list_splits_commas() {
        let doc = Document {
            title: "t".into(),
            link: "l".into(),
            authors: Some("Ada Lovelace, Alan Turing,".into()),
            year: None,
            kind: None,
        };
        assert_eq!(doc.author_list(), vec!["Ada Lovelace", "Alan Turing"]);
    }
}
