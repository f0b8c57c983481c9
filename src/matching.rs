//! Similarity Matching Engine: exact nearest-neighbor ranking over corpus
//! vectors.
//!
//! Scores are cosine similarity mapped to `(1 + cos) / 2`, so they land in
//! `[0, 1]` with 1.0 for an identical direction. Ties keep natural corpus
//! order (the sort is stable). A dimensionality mismatch between the query
//! and any corpus vector is a typed error, never a silent truncation.

use std::cmp::Ordering;
use std::collections::HashMap;

use thiserror::Error;

use crate::corpus::{MatchResult, StoreError, TrackRecord};

/// Errors raised on the query path of the matching engine.
#[derive(Debug, Error)]
pub enum MatchError {
    /// Query vector length disagrees with a stored vector's length.
    #[error(
        "Query vector length {query_len} does not match corpus vector length {corpus_len} for track {identifier}"
    )]
    DimensionMismatch {
        identifier: String,
        query_len: usize,
        corpus_len: usize,
    },
    /// The corpus store failed at the storage layer.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Rank `records` by similarity to `query`, best first, at most `k`
/// results. Every record's dimensionality is checked before any scoring.
pub fn rank(
    query: &[f32],
    records: &[TrackRecord],
    k: usize,
) -> Result<Vec<MatchResult>, MatchError> {
    for record in records {
        if record.vector.len() != query.len() {
            return Err(MatchError::DimensionMismatch {
                identifier: record.identifier.clone(),
                query_len: query.len(),
                corpus_len: record.vector.len(),
            });
        }
    }
    let mut results: Vec<MatchResult> = records
        .iter()
        .map(|record| MatchResult {
            identifier: record.identifier.clone(),
            genre_index: record.genre_index,
            score: cosine_score(query, &record.vector),
        })
        .collect();
    // Stable sort: equal scores keep corpus order.
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    results.truncate(k);
    Ok(results)
}

/// Cosine similarity mapped to `[0, 1]`. Zero-norm vectors have no
/// direction; their cosine is treated as 0, scoring 0.5.
fn cosine_score(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += x as f64 * y as f64;
        norm_a += x as f64 * x as f64;
        norm_b += y as f64 * y as f64;
    }
    if norm_a <= 0.0 || norm_b <= 0.0 {
        return 0.5;
    }
    let cos = (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0);
    ((1.0 + cos) / 2.0) as f32
}

/// Derive a genre label from ranked neighbors by majority vote.
///
/// Ties between genres are broken by the best-ranked neighbor among the
/// tied genres. Returns `None` for an empty match list.
pub fn majority_genre(matches: &[MatchResult]) -> Option<i64> {
    if matches.is_empty() {
        return None;
    }
    let mut counts: HashMap<i64, usize> = HashMap::new();
    for result in matches {
        *counts.entry(result.genre_index).or_insert(0) += 1;
    }
    let max_count = counts.values().copied().max()?;
    // Matches are already ranked best-first, so the first member of a
    // winning genre breaks ties.
    matches
        .iter()
        .find(|result| counts[&result.genre_index] == max_count)
        .map(|result| result.genre_index)
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

    fn one_hot_corpus() -> Vec<TrackRecord> {
        vec![
            record("a", vec![1.0, 0.0, 0.0], 0),
            record("b", vec![0.0, 1.0, 0.0], 1),
            record("c", vec![0.0, 0.0, 1.0], 2),
        ]
    }

    #[test]
    fn self_query_ranks_itself_first_with_maximal_score() {
        let corpus = one_hot_corpus();
        let results = rank(&corpus[1].vector, &corpus, 10).unwrap();
        assert_eq!(results[0].identifier, "b");
        assert!((results[0].score - 1.0).abs() < 1e-6);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn noisy_query_still_finds_nearest_track() {
        let corpus = one_hot_corpus();
        let query = vec![0.05_f32, 0.98, -0.03];
        let results = rank(&query, &corpus, 10).unwrap();
        assert_eq!(results[0].identifier, "b");
    }

    #[test]
    fn ties_keep_natural_corpus_order() {
        let corpus = vec![
            record("first", vec![1.0, 0.0], 0),
            record("second", vec![1.0, 0.0], 1),
            record("third", vec![1.0, 0.0], 2),
        ];
        let results = rank(&[1.0, 0.0], &corpus, 10).unwrap();
        let order: Vec<&str> = results.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(order, vec!["first", "second", "third"]);
    }

    #[test]
    fn empty_corpus_returns_empty_list() {
        let results = rank(&[1.0, 0.0], &[], 10).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn k_truncates_the_result_list() {
        let corpus = one_hot_corpus();
        let results = rank(&[1.0, 0.0, 0.0], &corpus, 2).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn dimension_mismatch_is_a_typed_error() {
        let corpus = vec![
            record("ok", vec![1.0, 0.0, 0.0], 0),
            record("short", vec![1.0, 0.0], 1),
        ];
        let err = rank(&[1.0, 0.0, 0.0], &corpus, 10).unwrap_err();
        match err {
            MatchError::DimensionMismatch {
                identifier,
                query_len,
                corpus_len,
            } => {
                assert_eq!(identifier, "short");
                assert_eq!(query_len, 3);
                assert_eq!(corpus_len, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn opposite_vectors_score_zero() {
        let corpus = vec![record("anti", vec![-1.0, 0.0], 0)];
        let results = rank(&[1.0, 0.0], &corpus, 1).unwrap();
        assert!(results[0].score.abs() < 1e-6);
    }

    #[test]
    fn zero_norm_query_scores_half() {
        let corpus = vec![record("a", vec![1.0, 0.0], 0)];
        let results = rank(&[0.0, 0.0], &corpus, 1).unwrap();
        assert!((results[0].score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn majority_genre_votes_over_neighbors() {
        let matches = vec![
            MatchResult {
                identifier: "a".into(),
                genre_index: 2,
                score: 0.99,
            },
            MatchResult {
                identifier: "b".into(),
                genre_index: 1,
                score: 0.98,
            },
            MatchResult {
                identifier: "c".into(),
                genre_index: 1,
                score: 0.97,
            },
        ];
        assert_eq!(majority_genre(&matches), Some(1));
    }

    #[test]
    fn majority_genre_tie_prefers_best_ranked() {
        let matches = vec![
            MatchResult {
                identifier: "a".into(),
                genre_index: 3,
                score: 0.9,
            },
            MatchResult {
                identifier: "b".into(),
                genre_index: 7,
                score: 0.8,
            },
        ];
        assert_eq!(majority_genre(&matches), Some(3));
        assert_eq!(majority_genre(&[]), None);
    }
}
