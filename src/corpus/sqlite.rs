use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension, params};

use super::{CorpusStore, MatchResult, StoreError, TrackRecord};
use crate::analysis::vector::{decode_f32_le_blob, encode_f32_le_blob};
use crate::matching::{self, MatchError};

const SCHEMA_VERSION: i64 = 1;

/// SQLite-backed corpus store. Vectors are stored as little-endian `f32`
/// blobs; rowid order is the natural corpus order. Queries are an exact
/// scan over every stored vector, no index.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a corpus database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a private in-memory corpus database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn load_all(conn: &Connection) -> Result<Vec<TrackRecord>, StoreError> {
        let mut statement =
            conn.prepare("SELECT identifier, vector, genre_index FROM tracks ORDER BY rowid")?;
        let rows = statement.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Vec<u8>>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;
        let mut records = Vec::new();
        for row in rows {
            let (identifier, blob, genre_index) = row?;
            let vector =
                decode_f32_le_blob(&blob).map_err(|reason| StoreError::Corrupt {
                    identifier: identifier.clone(),
                    reason,
                })?;
            records.push(TrackRecord {
                identifier,
                vector,
                genre_index,
            });
        }
        Ok(records)
    }
}

fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "PRAGMA busy_timeout=5000;
         CREATE TABLE IF NOT EXISTS metadata (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
         CREATE TABLE IF NOT EXISTS tracks (
            identifier TEXT PRIMARY KEY NOT NULL,
            vector BLOB NOT NULL,
            genre_index INTEGER NOT NULL
        );",
    )?;
    let stored: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    match stored {
        Some(value) => {
            let found = value.parse::<i64>().unwrap_or(-1);
            if found != SCHEMA_VERSION {
                return Err(StoreError::SchemaVersion {
                    found,
                    expected: SCHEMA_VERSION,
                });
            }
        }
        None => {
            conn.execute(
                "INSERT INTO metadata (key, value) VALUES ('schema_version', ?1)",
                params![SCHEMA_VERSION.to_string()],
            )?;
        }
    }
    Ok(())
}

impl CorpusStore for SqliteStore {
    fn upsert(&self, record: &TrackRecord) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        conn.execute(
            "INSERT INTO tracks (identifier, vector, genre_index) VALUES (?1, ?2, ?3)
             ON CONFLICT(identifier) DO UPDATE SET
                 vector = excluded.vector,
                 genre_index = excluded.genre_index",
            params![
                record.identifier,
                encode_f32_le_blob(&record.vector),
                record.genre_index
            ],
        )?;
        Ok(())
    }

    fn count(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM tracks", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    fn knn_query(&self, query: &[f32], k: usize) -> Result<Vec<MatchResult>, MatchError> {
        let records = {
            let conn = self
                .conn
                .lock()
                .map_err(|_| MatchError::Store(StoreError::LockPoisoned))?;
            Self::load_all(&conn).map_err(MatchError::Store)?
        };
        matching::rank(query, &records, k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(identifier: &str, vector: Vec<f32>, genre_index: i64) -> TrackRecord {
        TrackRecord {
            identifier: identifier.to_string(),
            vector,
            genre_index,
        }
    }

    #[test]
    fn upsert_then_query_round_trips() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert(&record("a.wav", vec![1.0, 0.0], 0)).unwrap();
        store.upsert(&record("b.wav", vec![0.0, 1.0], 1)).unwrap();
        assert_eq!(store.count().unwrap(), 2);
        let results = store.knn_query(&[0.0, 1.0], 10).unwrap();
        assert_eq!(results[0].identifier, "b.wav");
        assert_eq!(results[0].genre_index, 1);
    }

    #[test]
    fn upsert_replaces_existing_identifier() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert(&record("a.wav", vec![1.0, 0.0], 0)).unwrap();
        store.upsert(&record("a.wav", vec![0.0, 1.0], 3)).unwrap();
        assert_eq!(store.count().unwrap(), 1);
        let results = store.knn_query(&[0.0, 1.0], 1).unwrap();
        assert_eq!(results[0].genre_index, 3);
        assert!((results[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn dimension_mismatch_surfaces_from_knn_query() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert(&record("a.wav", vec![1.0, 0.0], 0)).unwrap();
        let err = store.knn_query(&[1.0, 0.0, 0.0], 10).unwrap_err();
        assert!(matches!(err, MatchError::DimensionMismatch { .. }));
    }

    #[test]
    fn unknown_schema_version_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.db");
        drop(SqliteStore::open(&path).unwrap());
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute(
                "UPDATE metadata SET value = '99' WHERE key = 'schema_version'",
                [],
            )
            .unwrap();
        }
        let err = SqliteStore::open(&path).unwrap_err();
        assert!(matches!(
            err,
            StoreError::SchemaVersion {
                found: 99,
                expected: SCHEMA_VERSION
            }
        ));
    }

    #[test]
    fn database_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.upsert(&record("a.wav", vec![0.5, 0.5], 2)).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }
}
