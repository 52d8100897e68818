//! Error types for pubsearch-core.
//!
//! Each stage has its own error so callers can tell a bad input feed apart
//! from a stale or damaged artifact, and an empty result from a failed search.

use crate::DocId;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading input records and building a snapshot.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A record lacks a required field
    #[error("record {row}: missing required field `{field}`")]
    MalformedRecord { row: usize, field: &'static str },
    /// The build was aborted through its cancel flag
    #[error("build cancelled")]
    Cancelled,
    /// Input path has no supported extension
    #[error("unsupported input: {0}")]
    UnsupportedInput(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("invalid CSV in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
    #[error("invalid JSON in {path}: {source}")]
    Json { path: PathBuf, source: serde_json::Error },
}

/// Errors raised while publishing a snapshot artifact.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] bincode::Error),
    #[error("failed to write snapshot: {0}")]
    Io(#[from] io::Error),
}

/// Errors raised while loading a snapshot artifact.
///
/// `NotFound` means the index needs building, `VersionMismatch` means the
/// binary and the artifact disagree on format, `Corrupt` means the bytes
/// cannot be trusted.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("snapshot not found at {0}")]
    NotFound(PathBuf),
    #[error("snapshot is corrupt: {0}")]
    Corrupt(String),
    #[error("snapshot format version {found} is not supported (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },
    #[error("failed to read snapshot: {0}")]
    Io(#[from] io::Error),
}

/// Errors raised while answering a query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// A posting references a document the store does not hold
    #[error("index references document {doc_id} but store holds {store_len} documents")]
    DanglingPosting { doc_id: DocId, store_len: usize },
}
