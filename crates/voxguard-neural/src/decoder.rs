//! Audio decoder using Symphonia
//!
//! Decodes an in-memory byte payload (WAV, MP3, FLAC, OGG/Vorbis) to mono
//! f32 samples, then resamples to [`SAMPLE_RATE`]. Decoding and resampling
//! form one atomic load step: any failure in either surfaces as
//! [`ClassifyError::Decode`].
//!
//! Container headers are untrusted. Sample rates outside
//! [`MIN_SOURCE_RATE`]..=[`MAX_SOURCE_RATE`] and streams longer than
//! [`MAX_SOURCE_SECONDS`] are rejected before any resampling buffer is sized
//! from them. OGG/Opus probes but has no decoder, so it fails here as well.

use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::constants::{MAX_SOURCE_RATE, MAX_SOURCE_SECONDS, MIN_SOURCE_RATE, SAMPLE_RATE};
use crate::resampler::resample;
use crate::ClassifyError;

/// Decoded audio buffer
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Mono samples after downmixing
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels in the source stream
    pub channels: u16,
}

/// Decode bytes and resample to the canonical rate.
///
/// `hint` is an optional container extension (`"mp3"`, `"wav"`, ...) used
/// to speed up probing; content sniffing still decides.
pub fn load(bytes: &[u8], hint: Option<&str>) -> Result<Vec<f32>, ClassifyError> {
    let buffer = decode_bytes(bytes, hint)?;
    tracing::debug!(
        samples = buffer.samples.len(),
        sample_rate = buffer.sample_rate,
        channels = buffer.channels,
        "decoded audio"
    );

    let source_rate = check_source_rate(buffer.sample_rate)?;
    resample(&buffer.samples, source_rate, SAMPLE_RATE)
        .map_err(|e| ClassifyError::Decode(format!("Resampling failed: {}", e)))
}

/// Decode an in-memory audio payload to mono f32 samples at its native rate.
///
/// Multi-channel audio is downmixed to mono.
pub fn decode_bytes(bytes: &[u8], hint: Option<&str>) -> Result<AudioBuffer, ClassifyError> {
    if bytes.is_empty() {
        return Err(ClassifyError::Decode("empty audio payload".into()));
    }

    let source = Cursor::new(bytes.to_vec());
    let mss = MediaSourceStream::new(Box::new(source), Default::default());

    let mut probe_hint = Hint::new();
    if let Some(ext) = hint.map(str::trim).filter(|e| !e.is_empty()) {
        probe_hint.with_extension(&ext.trim_start_matches('.').to_ascii_lowercase());
    }

    let probed = symphonia::default::get_probe()
        .format(&probe_hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| ClassifyError::Decode(format!("Failed to probe format: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| ClassifyError::Decode("No audio track found".into()))?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.map(check_source_rate).transpose()?;
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| ClassifyError::Decode(format!("Failed to create decoder: {}", e)))?;

    let mut mono: Vec<f32> = Vec::new();
    let mut sample_buf: Option<(SampleBuffer<f32>, usize, usize)> = None;
    let mut skipped = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(ClassifyError::Decode(format!("Packet read error: {}", e)));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(e)) => {
                skipped += 1;
                tracing::warn!("Decode error (skipping packet): {}", e);
                continue;
            }
            Err(e) => {
                return Err(ClassifyError::Decode(format!("Fatal decode error: {}", e)));
            }
        };

        let spec = *decoded.spec();
        let packet_channels = spec.channels.count().max(1);
        let rate = match sample_rate {
            Some(rate) => rate,
            None => *sample_rate.insert(check_source_rate(spec.rate)?),
        };
        if channels == 0 {
            channels = packet_channels as u16;
        }

        // Reuse the sample buffer while packets keep the same layout.
        let frames = decoded.capacity();
        let reusable = matches!(
            sample_buf.as_ref(),
            Some((_, cap, ch)) if *cap >= frames && *ch == packet_channels
        );
        if !reusable {
            sample_buf = Some((
                SampleBuffer::new(frames as u64, spec),
                frames,
                packet_channels,
            ));
        }

        if let Some((buf, _, _)) = sample_buf.as_mut() {
            buf.copy_interleaved_ref(decoded);
            if packet_channels == 1 {
                mono.extend_from_slice(buf.samples());
            } else {
                mono.extend(downmix_to_mono(buf.samples(), packet_channels));
            }
        }

        if mono.len() > MAX_SOURCE_SECONDS * rate as usize {
            return Err(ClassifyError::Decode(format!(
                "audio longer than {} seconds",
                MAX_SOURCE_SECONDS
            )));
        }
    }

    if skipped > 0 {
        tracing::warn!(skipped, "skipped undecodable packets");
    }

    let sample_rate = sample_rate
        .ok_or_else(|| ClassifyError::Decode("Unknown sample rate".into()))?;

    if mono.is_empty() {
        return Err(ClassifyError::Decode(
            "stream contained no decodable audio samples".into(),
        ));
    }

    Ok(AudioBuffer {
        samples: mono,
        sample_rate,
        channels: channels.max(1),
    })
}

/// Reject sample rates no real recording uses before they size a buffer.
fn check_source_rate(rate: u32) -> Result<u32, ClassifyError> {
    if (MIN_SOURCE_RATE..=MAX_SOURCE_RATE).contains(&rate) {
        Ok(rate)
    } else {
        Err(ClassifyError::Decode(format!(
            "unsupported sample rate {} Hz (expected {}..={} Hz)",
            rate, MIN_SOURCE_RATE, MAX_SOURCE_RATE
        )))
    }
}

/// Downmix interleaved multi-channel audio to mono
fn downmix_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    let scale = 1.0 / channels as f32;
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * scale)
        .collect()
}
