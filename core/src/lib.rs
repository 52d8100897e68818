//! Title search over publication records: normalization, an inverted index
//! built in one pass, a versioned on-disk snapshot, and term-overlap ranking.

pub mod document;
pub mod error;
pub mod handle;
pub mod index;
pub mod ingest;
pub mod persist;
pub mod query;
pub mod tokenizer;

pub use document::{BuildOptions, Document, DocumentStore, InvalidRecordPolicy, RawRecord};
pub use error::{BuildError, LoadError, SaveError, SearchError};
pub use handle::SnapshotHandle;
pub use index::{build, build_with_cancel, CancelFlag, DocId, InvertedIndex, Snapshot, SnapshotStats};
pub use query::{search, search_hits, ScoredHit};
