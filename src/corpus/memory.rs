use std::sync::RwLock;

use super::{CorpusStore, MatchResult, StoreError, TrackRecord};
use crate::matching::{self, MatchError};

/// In-memory corpus store. Insertion order is the natural corpus order;
/// used as the injectable fake in tests and for small corpora.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<TrackRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CorpusStore for MemoryStore {
    fn upsert(&self, record: &TrackRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(|_| StoreError::LockPoisoned)?;
        // Replacing in place keeps the record's natural corpus position.
        if let Some(existing) = records
            .iter_mut()
            .find(|existing| existing.identifier == record.identifier)
        {
            *existing = record.clone();
        } else {
            records.push(record.clone());
        }
        Ok(())
    }

    fn count(&self) -> Result<u64, StoreError> {
        let records = self.records.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(records.len() as u64)
    }

    fn knn_query(&self, query: &[f32], k: usize) -> Result<Vec<MatchResult>, MatchError> {
        let records = self
            .records
            .read()
            .map_err(|_| MatchError::Store(StoreError::LockPoisoned))?;
        matching::rank(query, &records, k)
    }
}
