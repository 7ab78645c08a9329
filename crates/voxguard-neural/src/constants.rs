//! Feature contract shared with the trained scorer.
//!
//! Changing any of these invalidates existing model weights.

/// Canonical sample rate in Hz.
pub const SAMPLE_RATE: u32 = 16_000;
/// Clip length fed to the scorer, in seconds.
pub const DURATION_SECONDS: usize = 4;
/// Exact waveform length entering feature extraction.
pub const TARGET_SAMPLES: usize = SAMPLE_RATE as usize * DURATION_SECONDS;

/// Lowest container sample rate accepted for resampling, in Hz.
pub const MIN_SOURCE_RATE: u32 = 4_000;
/// Highest container sample rate accepted for resampling, in Hz.
pub const MAX_SOURCE_RATE: u32 = 384_000;
/// Longest decoded clip accepted, in seconds of source audio.
pub const MAX_SOURCE_SECONDS: usize = 600;

pub const N_MELS: usize = 128;
pub const N_FFT: usize = 1024;
pub const HOP_LENGTH: usize = 512;
/// Positive-frequency bins of an `N_FFT` transform.
pub const N_FREQ: usize = N_FFT / 2 + 1;
/// Frames produced by centered STFT over `TARGET_SAMPLES`.
pub const N_FRAMES: usize = 1 + TARGET_SAMPLES / HOP_LENGTH;

/// Power floor applied before taking the logarithm.
pub const AMIN: f32 = 1e-10;
/// Dynamic range kept below the per-spectrogram maximum, in dB.
pub const TOP_DB: f32 = 80.0;

/// Probabilities strictly above this are labelled AI_GENERATED.
pub const DECISION_THRESHOLD: f32 = 0.5;
/// Decimal places kept in reported metrics.
pub const REPORT_DECIMALS: i32 = 4;
