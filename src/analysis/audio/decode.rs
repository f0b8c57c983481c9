use std::io::Cursor;

use symphonia::core::{
    audio::SampleBuffer, codecs::DecoderOptions, errors::Error, formats::FormatOptions,
    io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
};
use thiserror::Error as ThisError;

/// Input audio bytes could not be decoded into samples.
#[derive(Debug, ThisError)]
pub enum DecodeError {
    /// The container format could not be identified.
    #[error("Unrecognized audio container: {0}")]
    Probe(String),
    /// The container holds no decodable audio track.
    #[error("No decodable audio track in container")]
    NoTrack,
    /// The track does not declare a sample rate.
    #[error("Audio track is missing a sample rate")]
    MissingSampleRate,
    /// The codec failed while decoding packets.
    #[error("Audio decode failed: {0}")]
    Codec(String),
    /// The stream decoded to zero samples.
    #[error("Decoded stream contained no samples")]
    Empty,
}

/// Decoded mono audio ready for normalization.
#[derive(Debug)]
pub struct DecodedClip {
    /// Mono samples, channels averaged.
    pub samples: Vec<f32>,
    /// Sample rate declared by the container.
    pub sample_rate: u32,
}

/// Decode compressed audio bytes into mono `f32` samples.
pub fn decode_clip(bytes: &[u8]) -> Result<DecodedClip, DecodeError> {
    let cursor = Cursor::new(bytes.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());
    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|err| DecodeError::Probe(err.to_string()))?;
    let mut format = probed.format;
    let track = format.default_track().ok_or(DecodeError::NoTrack)?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let sample_rate = codec_params
        .sample_rate
        .ok_or(DecodeError::MissingSampleRate)?;
    let channels = codec_params
        .channels
        .map(|channels| channels.count())
        .unwrap_or(1)
        .max(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|err| DecodeError::Codec(err.to_string()))?;

    let mut interleaved = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(Error::IoError(_)) | Err(Error::ResetRequired) => break,
            Err(err) => return Err(DecodeError::Codec(err.to_string())),
        };
        if packet.track_id() != track_id {
            continue;
        }
        match decoder.decode(&packet) {
            Ok(decoded) => {
                let mut buffer =
                    SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
                buffer.copy_interleaved_ref(decoded);
                interleaved.extend_from_slice(buffer.samples());
            }
            // Recoverable: skip the corrupt packet and continue.
            Err(Error::DecodeError(_)) => continue,
            Err(err) => return Err(DecodeError::Codec(err.to_string())),
        }
    }
    if interleaved.is_empty() {
        return Err(DecodeError::Empty);
    }
    Ok(DecodedClip {
        samples: downmix_mono(&interleaved, channels),
        sample_rate: sample_rate.max(1),
    })
}

fn downmix_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    let frames = interleaved.len() / channels;
    let mut mono = Vec::with_capacity(frames);
    for frame in 0..frames {
        let start = frame * channels;
        let sum: f32 = interleaved[start..start + channels].iter().sum();
        mono.push(sum / channels as f32);
    }
    mono
}
