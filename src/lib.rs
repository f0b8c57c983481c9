//! Acoustic fingerprinting and nearest-neighbor track matching.
//!
//! A clip is reduced to a fixed-length feature vector (spectral, timbral,
//! rhythmic and tonal summary statistics) and ranked against a corpus of
//! pre-computed vectors by exact cosine similarity.

/// Feature extraction pipeline (normalize, analyze, assemble).
pub mod analysis;
/// Configuration structures with documented defaults.
pub mod config;
/// Corpus store boundary: track records and store implementations.
pub mod corpus;
/// Bootstrap corpus loading from bulk JSON files.
pub mod ingest;
/// Logging setup.
pub mod logging;
/// Exact nearest-neighbor ranking over corpus vectors.
pub mod matching;
/// Injectable classification service with an explicit lifecycle.
pub mod service;
