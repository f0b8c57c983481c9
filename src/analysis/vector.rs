//! Feature Vector Assembler and the f32 blob codec used for storage.
//!
//! The concatenation order below is the positional contract every vector in
//! the corpus shares. Reordering fields or changing any analyzer count
//! invalidates all previously stored vectors.

use crate::analysis::features::ClipFeatures;
use crate::config::AnalysisConfig;

/// Flatten analyzer outputs into the fixed-order feature vector:
///
/// `[mfcc means] ++ [mfcc stds] ++ [centroid mean, centroid std] ++
/// [bandwidth mean, bandwidth std] ++ [flatness mean, flatness std] ++
/// [contrast means] ++ [rolloff mean] ++ [zcr mean, zcr std] ++ [tempo] ++
/// [tempogram row means] ++ [chroma means] ++ [tonnetz means]`
pub fn assemble(features: &ClipFeatures, config: &AnalysisConfig) -> Vec<f32> {
    let mut out = Vec::with_capacity(config.feature_len());
    out.extend_from_slice(&features.spectral.mfcc_mean);
    out.extend_from_slice(&features.spectral.mfcc_std);
    out.push(features.timbral.centroid_hz.mean);
    out.push(features.timbral.centroid_hz.std);
    out.push(features.timbral.bandwidth_hz.mean);
    out.push(features.timbral.bandwidth_hz.std);
    out.push(features.timbral.flatness.mean);
    out.push(features.timbral.flatness.std);
    out.extend_from_slice(&features.timbral.contrast_mean);
    out.push(features.timbral.rolloff_hz.mean);
    out.push(features.timbral.zcr.mean);
    out.push(features.timbral.zcr.std);
    out.push(features.rhythm.tempo_bpm);
    out.extend_from_slice(&features.rhythm.tempogram_mean);
    out.extend_from_slice(&features.tonal.chroma_mean);
    out.extend_from_slice(&features.tonal.tonnetz_mean);
    debug_assert_eq!(out.len(), config.feature_len());
    out
}

/// Encode a vector as a little-endian `f32` blob for SQLite storage.
pub fn encode_f32_le_blob(values: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len().saturating_mul(4));
    for &v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

/// Decode a little-endian `f32` blob back into a vector.
pub fn decode_f32_le_blob(blob: &[u8]) -> Result<Vec<f32>, String> {
    if blob.len() % 4 != 0 {
        return Err("Feature blob length is not a multiple of 4 bytes".to_string());
    }
    let mut out = Vec::with_capacity(blob.len() / 4);
    for chunk in blob.chunks_exact(4) {
        out.push(f32::from_le_bytes(
            chunk.try_into().expect("chunk size verified"),
        ));
    }
    Ok(out)
}
