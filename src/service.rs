//! The injectable classification service.
//!
//! Owns the extractor and the corpus store behind an explicit lifecycle
//! (construct, bootstrap, query, shutdown) so callers and tests can
//! substitute store implementations instead of relying on process-global
//! state.

use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::analysis::FeatureExtractor;
use crate::analysis::audio::{DecodeError, decode_clip};
use crate::config::{Config, ConfigError};
use crate::corpus::{CorpusStore, MatchResult};
use crate::ingest::{self, IngestError, IngestReport};
use crate::matching::MatchError;

/// Errors surfaced for one classification request.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// The uploaded bytes could not be decoded into samples.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// The matching engine refused or failed the query.
    #[error(transparent)]
    Match(#[from] MatchError),
}

/// Clip-to-match-list service over a corpus store.
pub struct MatchService {
    config: Config,
    extractor: FeatureExtractor,
    store: Box<dyn CorpusStore>,
}

impl MatchService {
    /// Build a service from a validated configuration and a store.
    pub fn new(config: Config, store: Box<dyn CorpusStore>) -> Result<Self, ConfigError> {
        let extractor = FeatureExtractor::new(config.analysis.clone())?;
        info!(
            "Match service ready: feature length {}, k = {}",
            config.analysis.feature_len(),
            config.matching.k
        );
        Ok(Self {
            config,
            extractor,
            store,
        })
    }

    /// The configuration this service was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Populate an empty corpus store from bulk JSON files.
    pub fn bootstrap(&self, dir: &Path) -> Result<IngestReport, IngestError> {
        ingest::bootstrap(
            self.store.as_ref(),
            dir,
            self.config.analysis.feature_len(),
        )
    }

    /// Whether the corpus store currently answers queries.
    pub fn ready(&self) -> bool {
        self.store.count().is_ok()
    }

    /// Classify pre-decoded samples against the corpus.
    pub fn classify_samples(
        &self,
        samples: &[f32],
        source_rate: u32,
    ) -> Result<Vec<MatchResult>, ClassifyError> {
        let vector = self.extractor.fingerprint(samples, source_rate);
        Ok(self.store.knn_query(&vector, self.config.matching.k)?)
    }

    /// Classify raw compressed audio bytes against the corpus.
    pub fn classify_bytes(&self, bytes: &[u8]) -> Result<Vec<MatchResult>, ClassifyError> {
        let clip = decode_clip(bytes)?;
        self.classify_samples(&clip.samples, clip.sample_rate)
    }

    /// Tear the service down, releasing the store.
    pub fn shutdown(self) {
        info!("Match service shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::corpus::{MemoryStore, TrackRecord};

    fn small_config() -> Config {
        Config {
            analysis: AnalysisConfig {
                sample_rate: 8_000,
                n_fft: 512,
                hop_length: 256,
                n_mels: 40,
                n_mfcc: 13,
                duration_seconds: 1.0,
                tempogram_window: 32,
                ..AnalysisConfig::default()
            },
            ..Config::default()
        }
    }

    fn sine(rate: u32, freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin())
            .collect()
    }

    #[test]
    fn known_clip_matches_its_own_corpus_entry_first() {
        let config = small_config();
        let store = MemoryStore::new();
        let extractor = FeatureExtractor::new(config.analysis.clone()).unwrap();
        let rate = config.analysis.sample_rate;
        let len = config.analysis.fixed_length();

        for (i, freq) in [220.0_f32, 440.0, 880.0].iter().enumerate() {
            let vector = extractor.fingerprint(&sine(rate, *freq, len), rate);
            store
                .upsert(&TrackRecord {
                    identifier: format!("tone_{freq}.wav"),
                    vector,
                    genre_index: i as i64,
                })
                .unwrap();
        }

        let service = MatchService::new(config, Box::new(store)).unwrap();
        assert!(service.ready());
        let matches = service
            .classify_samples(&sine(rate, 440.0, len), rate)
            .unwrap();
        assert_eq!(matches[0].identifier, "tone_440.wav");
        assert!((matches[0].score - 1.0).abs() < 1e-4);
        service.shutdown();
    }

    #[test]
    fn empty_corpus_classifies_to_empty_list() {
        let config = small_config();
        let rate = config.analysis.sample_rate;
        let service = MatchService::new(config, Box::new(MemoryStore::new())).unwrap();
        let matches = service.classify_samples(&sine(rate, 330.0, 4_000), rate).unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn stale_corpus_dimensionality_is_refused() {
        let config = small_config();
        let store = MemoryStore::new();
        store
            .upsert(&TrackRecord {
                identifier: "old-layout.wav".into(),
                vector: vec![1.0, 2.0, 3.0],
                genre_index: 0,
            })
            .unwrap();
        let rate = config.analysis.sample_rate;
        let service = MatchService::new(config, Box::new(store)).unwrap();
        let err = service
            .classify_samples(&sine(rate, 330.0, 4_000), rate)
            .unwrap_err();
        assert!(matches!(
            err,
            ClassifyError::Match(MatchError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn undecodable_bytes_are_a_decode_error() {
        let service = MatchService::new(small_config(), Box::new(MemoryStore::new())).unwrap();
        let err = service.classify_bytes(&[1, 2, 3, 4]).unwrap_err();
        assert!(matches!(err, ClassifyError::Decode(_)));
    }
}
