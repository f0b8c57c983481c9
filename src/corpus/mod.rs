//! Corpus store boundary: one record per known track, plus the store
//! implementations the matching engine queries.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matching::MatchError;

/// One known track: identifier, precomputed feature vector and coarse
/// genre grouping assigned at ingest time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackRecord {
    /// Path or name the track was ingested under.
    pub identifier: String,
    /// Feature vector produced under the corpus-wide analysis
    /// configuration.
    pub vector: Vec<f32>,
    /// Coarse grouping index assigned by ingest file enumeration order.
    pub genre_index: i64,
}

/// One ranked neighbor returned from a query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchResult {
    pub identifier: String,
    pub genre_index: i64,
    /// Similarity in [0, 1], higher is more similar.
    pub score: f32,
}

/// Storage-layer failure. Retryable from the caller's perspective; this
/// core performs no automatic retry.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing database rejected an operation.
    #[error("Corpus database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// A stored record could not be decoded.
    #[error("Corpus record {identifier} is corrupt: {reason}")]
    Corrupt { identifier: String, reason: String },
    /// The database was written by an incompatible version.
    #[error("Corpus database schema version {found} is not supported (expected {expected})")]
    SchemaVersion { found: i64, expected: i64 },
    /// A store lock was poisoned by a panicking writer.
    #[error("Corpus store lock poisoned")]
    LockPoisoned,
}

/// Key-value-like corpus store supporting exact k-nearest-neighbor
/// queries. Read-only during query processing; writes happen only during
/// ingestion, before queries are served.
pub trait CorpusStore: Send + Sync {
    /// Insert or replace a record, keyed by identifier. Idempotent.
    fn upsert(&self, record: &TrackRecord) -> Result<(), StoreError>;

    /// Number of records currently stored.
    fn count(&self) -> Result<u64, StoreError>;

    /// Exact nearest-neighbor search over every stored vector, ranked by
    /// descending similarity, at most `k` results. An empty corpus yields
    /// an empty list; a dimensionality mismatch is an error.
    fn knn_query(&self, query: &[f32], k: usize) -> Result<Vec<MatchResult>, MatchError>;
}
