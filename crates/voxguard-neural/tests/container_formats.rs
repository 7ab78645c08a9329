//! Decoding of the non-WAV containers enabled in symphonia.
//!
//! Fixtures are tiny hand-assembled streams, see `fixtures/README.md`.

use voxguard_neural::constants::{N_FRAMES, N_MELS, TARGET_SAMPLES};
use voxguard_neural::decoder::decode_bytes;
use voxguard_neural::{ClassifyError, FeatureTensor, Pipeline, Scorer, ScorerHandle};

const FLAC_TONE: &[u8] = include_bytes!("fixtures/tone_22050.flac");
const MP3_SILENCE: &[u8] = include_bytes!("fixtures/silence_48000.mp3");
const OGG_SILENCE: &[u8] = include_bytes!("fixtures/silence_24000.ogg");
const OGG_OPUS: &[u8] = include_bytes!("fixtures/opus_48000.ogg");

struct ZeroLogit;

impl Scorer for ZeroLogit {
    fn score(&self, _features: &FeatureTensor) -> Result<f32, ClassifyError> {
        Ok(0.0)
    }
}

fn assert_canonical(bytes: &[u8], hint: &str) {
    let pipeline = Pipeline::new(ScorerHandle::new(ZeroLogit));
    let analysis = pipeline
        .analyze(bytes, Some(hint))
        .unwrap_or_else(|e| panic!("{}: {}", hint, e));
    assert_eq!(analysis.waveform.len(), TARGET_SAMPLES, "{}", hint);
    assert_eq!(analysis.spectrogram.n_mels(), N_MELS, "{}", hint);
    assert_eq!(analysis.spectrogram.n_frames(), N_FRAMES, "{}", hint);
}

#[test]
fn flac_decodes_at_native_rate() {
    let buffer = decode_bytes(FLAC_TONE, Some("flac")).expect("flac");
    assert_eq!(buffer.sample_rate, 22_050);
    assert_eq!(buffer.channels, 1);
    // 11 verbatim frames of 4096 samples.
    assert_eq!(buffer.samples.len(), 11 * 4096);

    // 0.4 full-scale 440 Hz tone.
    let peak = buffer.samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    assert!((peak - 0.4).abs() < 0.01, "peak {}", peak);

    assert_canonical(FLAC_TONE, "flac");
}

#[test]
fn mp3_decodes_at_native_rate() {
    let buffer = decode_bytes(MP3_SILENCE, Some("mp3")).expect("mp3");
    assert_eq!(buffer.sample_rate, 48_000);
    assert_eq!(buffer.channels, 1);
    // 60 MPEG-1 Layer III frames of 1152 samples.
    assert!(!buffer.samples.is_empty());
    assert!(buffer.samples.len() <= 60 * 1152);
    assert!(buffer.samples.iter().all(|s| s.abs() < 1e-6));

    assert_canonical(MP3_SILENCE, "mp3");
}

#[test]
fn ogg_vorbis_decodes_at_native_rate() {
    let buffer = decode_bytes(OGG_SILENCE, Some("ogg")).expect("ogg");
    assert_eq!(buffer.sample_rate, 24_000);
    assert_eq!(buffer.channels, 1);
    // 300 short blocks overlap into 299 * 128 samples.
    assert!(!buffer.samples.is_empty());
    assert!(buffer.samples.len() <= 299 * 128);
    assert!(buffer.samples.iter().all(|s| s.abs() < 1e-6));

    assert_canonical(OGG_SILENCE, "ogg");
}

#[test]
fn containers_are_sniffed_without_a_hint() {
    for (bytes, rate) in [(FLAC_TONE, 22_050), (MP3_SILENCE, 48_000), (OGG_SILENCE, 24_000)] {
        let buffer = decode_bytes(bytes, None).expect("sniffed");
        assert_eq!(buffer.sample_rate, rate);
    }
}

#[test]
fn ogg_opus_is_a_decode_error() {
    // No Opus codec is registered with symphonia 0.5.
    let err = decode_bytes(OGG_OPUS, Some("ogg")).unwrap_err();
    assert!(matches!(err, ClassifyError::Decode(_)));

    let pipeline = Pipeline::new(ScorerHandle::new(ZeroLogit));
    let err = pipeline.classify_with_hint(OGG_OPUS, Some("opus")).unwrap_err();
    assert_eq!(err.code(), "audio_decode_error");
    assert!(err.is_client_error());
}
