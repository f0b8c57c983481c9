//! Bootstrap corpus loading from bulk JSON files.
//!
//! Runs only against an empty store (idempotent bootstrap, not an
//! incremental sync). Each `*.json` file in the ingest directory describes
//! a batch of tracks with precomputed feature vectors; the batch's
//! `genre_index` is the file's position in lexicographic enumeration order.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::corpus::{CorpusStore, StoreError, TrackRecord};

#[derive(Debug, Deserialize)]
struct IngestFile {
    songs: Vec<IngestTrack>,
}

#[derive(Debug, Deserialize)]
struct IngestTrack {
    path: String,
    feature_vector: Vec<f32>,
}

/// Errors that abort the bootstrap entirely. Per-file parse failures and
/// per-track shape rejections are logged and skipped instead.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The ingest directory could not be enumerated.
    #[error("Failed to read ingest directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The corpus store rejected an upsert.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome summary of one bootstrap run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// JSON files successfully parsed.
    pub files_read: usize,
    /// Track records upserted into the store.
    pub tracks_upserted: usize,
    /// Tracks rejected for a wrong vector length, plus unparsable files.
    pub skipped: usize,
}

/// Populate an empty store from `dir`. Records whose vector length is not
/// `feature_len` are rejected rather than silently padded; a non-empty
/// store makes the whole call a no-op.
pub fn bootstrap(
    store: &dyn CorpusStore,
    dir: &Path,
    feature_len: usize,
) -> Result<IngestReport, IngestError> {
    if store.count()? > 0 {
        info!("Corpus is already populated; skipping bootstrap");
        return Ok(IngestReport::default());
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|source| IngestError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("json"))
        .collect();
    files.sort();

    let mut report = IngestReport::default();
    for (genre_index, path) in files.iter().enumerate() {
        let batch = match read_batch(path) {
            Ok(batch) => batch,
            Err(reason) => {
                warn!("Skipping ingest file {}: {reason}", path.display());
                report.skipped += 1;
                continue;
            }
        };
        report.files_read += 1;
        for track in batch.songs {
            if track.feature_vector.len() != feature_len {
                warn!(
                    "Rejecting {}: vector length {} does not match configured length {feature_len}",
                    track.path,
                    track.feature_vector.len()
                );
                report.skipped += 1;
                continue;
            }
            store.upsert(&TrackRecord {
                identifier: track.path,
                vector: track.feature_vector,
                genre_index: genre_index as i64,
            })?;
            report.tracks_upserted += 1;
        }
    }
    info!(
        "Corpus bootstrap complete: {} tracks from {} files ({} skipped)",
        report.tracks_upserted, report.files_read, report.skipped
    );
    Ok(report)
}

fn read_batch(path: &Path) -> Result<IngestFile, String> {
    let text = std::fs::read_to_string(path).map_err(|err| err.to_string())?;
    serde_json::from_str(&text).map_err(|err| err.to_string())
}
