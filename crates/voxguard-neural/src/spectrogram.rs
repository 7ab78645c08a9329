//! STFT and log-power Mel spectrogram using rustfft
//!
//! Reproduces the feature definition the scorer was trained on:
//! centered frames (zero padding of `n_fft / 2` on both sides), periodic
//! Hann window, power spectrum, Slaney mel filterbank with area
//! normalization, then decibels relative to the spectrogram's own maximum
//! with an 80 dB dynamic range floor.
//!
//! The FFT plan, window and filterbank are built once and only read
//! afterwards; scratch buffers are per call, so a single [`MelExtractor`]
//! can serve concurrent requests.

use std::sync::Arc;

use ndarray::{Array2, ArrayView2};
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::constants::{AMIN, HOP_LENGTH, N_FFT, N_MELS, SAMPLE_RATE, TOP_DB};
use crate::framing::Waveform;

/// Log-power mel spectrogram, shape `[n_mels, frames]`, values in dB
/// relative to the loudest cell (which is always 0 dB).
#[derive(Debug, Clone, PartialEq)]
pub struct MelSpectrogram {
    data: Array2<f32>,
}

impl MelSpectrogram {
    pub fn n_mels(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_frames(&self) -> usize {
        self.data.ncols()
    }

    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.data.view()
    }

    pub fn into_array(self) -> Array2<f32> {
        self.data
    }

    /// Largest cell value (0.0 for any non-empty spectrogram).
    pub fn max(&self) -> f32 {
        self.data.fold(f32::NEG_INFINITY, |acc, &v| acc.max(v))
    }

    pub fn min(&self) -> f32 {
        self.data.fold(f32::INFINITY, |acc, &v| acc.min(v))
    }

    /// Population standard deviation over every cell.
    pub fn std_dev(&self) -> f64 {
        let n = self.data.len();
        if n == 0 {
            return 0.0;
        }
        let mean = self.data.iter().map(|&v| v as f64).sum::<f64>() / n as f64;
        let var = self
            .data
            .iter()
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n as f64;
        var.sqrt()
    }
}

/// Mel feature extractor with a pre-planned FFT
pub struct MelExtractor {
    fft: Arc<dyn Fft<f32>>,
    sample_rate: u32,
    fft_size: usize,
    hop_size: usize,
    window: Vec<f32>,
    /// `[n_mels, fft_size / 2 + 1]`
    filterbank: Array2<f32>,
}

impl std::fmt::Debug for MelExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MelExtractor")
            .field("sample_rate", &self.sample_rate)
            .field("fft_size", &self.fft_size)
            .field("hop_size", &self.hop_size)
            .finish_non_exhaustive()
    }
}

impl Default for MelExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MelExtractor {
    /// Extractor with the canonical parameters (16 kHz, 1024/512, 128 mels).
    pub fn new() -> Self {
        Self::with_params(SAMPLE_RATE, N_FFT, HOP_LENGTH, N_MELS)
    }

    /// # Arguments
    /// * `sample_rate` - Sample rate of the input audio
    /// * `fft_size` - FFT window size
    /// * `hop_size` - Hop between frame starts
    /// * `n_mels` - Number of mel bands
    pub fn with_params(sample_rate: u32, fft_size: usize, hop_size: usize, n_mels: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        // Periodic Hann window (divides by N, not N-1)
        let window: Vec<f32> = (0..fft_size)
            .map(|i| {
                0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / fft_size as f32).cos())
            })
            .collect();

        Self {
            fft,
            sample_rate,
            fft_size,
            hop_size: hop_size.max(1),
            window,
            filterbank: slaney_mel_filterbank(sample_rate, fft_size, n_mels),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames produced for `len` input samples.
    pub fn num_frames(&self, len: usize) -> usize {
        1 + len / self.hop_size
    }

    /// Centered power spectrogram, shape `[fft_size / 2 + 1, frames]`.
    pub fn power_spectrogram(&self, audio: &[f32]) -> Array2<f32> {
        let num_bins = self.fft_size / 2 + 1;
        let num_frames = self.num_frames(audio.len());
        let pad = self.fft_size / 2;

        let mut spectrogram = Array2::<f32>::zeros((num_bins, num_frames));
        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.fft_size];
        let mut scratch = vec![Complex::new(0.0f32, 0.0); self.fft.get_inplace_scratch_len()];

        for frame_idx in 0..num_frames {
            // Frame start in padded coordinates; shift back into the signal.
            let start = frame_idx * self.hop_size;
            for (i, slot) in buffer.iter_mut().enumerate() {
                let sample = (start + i)
                    .checked_sub(pad)
                    .and_then(|j| audio.get(j))
                    .copied()
                    .unwrap_or(0.0);
                *slot = Complex::new(sample * self.window[i], 0.0);
            }

            self.fft.process_with_scratch(&mut buffer, &mut scratch);

            let mut column = spectrogram.column_mut(frame_idx);
            for (out, c) in column.iter_mut().zip(&buffer[..num_bins]) {
                *out = c.re * c.re + c.im * c.im;
            }
        }

        spectrogram
    }

    /// Mel-projected power, shape `[n_mels, frames]`.
    pub fn mel_power(&self, audio: &[f32]) -> Array2<f32> {
        self.filterbank.dot(&self.power_spectrogram(audio))
    }

    /// Log-power mel spectrogram of raw samples.
    pub fn compute(&self, audio: &[f32]) -> MelSpectrogram {
        MelSpectrogram {
            data: power_to_db(&self.mel_power(audio), AMIN, TOP_DB),
        }
    }

    /// Log-power mel spectrogram of a framed waveform.
    pub fn extract(&self, waveform: &Waveform) -> MelSpectrogram {
        self.compute(waveform.samples())
    }
}

/// Convert power to decibels referenced to the array's own maximum.
///
/// `10·log10(max(amin, S)) − 10·log10(max(amin, max(S)))`, then every cell
/// is raised to at least `max(dB) − top_db`. An all-zero input maps to a
/// uniform 0.0 grid.
pub fn power_to_db(power: &Array2<f32>, amin: f32, top_db: f32) -> Array2<f32> {
    let max_power = power.fold(0.0f32, |acc, &v| acc.max(v));
    let ref_db = 10.0 * amin.max(max_power).log10();

    let mut db = power.mapv(|p| 10.0 * amin.max(p).log10() - ref_db);

    let floor = db.fold(f32::NEG_INFINITY, |acc, &v| acc.max(v)) - top_db;
    db.mapv_inplace(|v| v.max(floor));
    db
}

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

#[inline]
fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Slaney mel scale: linear below 1 kHz, logarithmic above.
#[inline]
fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

#[inline]
fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// Triangular mel filterbank `[n_mels, fft_size / 2 + 1]` over 0..sr/2,
/// each filter scaled to unit area (Slaney normalization).
fn slaney_mel_filterbank(sample_rate: u32, fft_size: usize, n_mels: usize) -> Array2<f32> {
    let num_bins = fft_size / 2 + 1;
    let sr = sample_rate as f64;

    let fft_freqs: Vec<f64> = (0..num_bins)
        .map(|k| k as f64 * sr / fft_size as f64)
        .collect();

    let mel_min = hz_to_mel(0.0);
    let mel_max = hz_to_mel(sr / 2.0);
    let mel_freqs: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f64 / (n_mels + 1) as f64))
        .collect();

    let mut filterbank = Array2::<f32>::zeros((n_mels, num_bins));
    for m in 0..n_mels {
        let (left, center, right) = (mel_freqs[m], mel_freqs[m + 1], mel_freqs[m + 2]);
        let enorm = 2.0 / (right - left);
        for (b, &freq) in fft_freqs.iter().enumerate() {
            let lower = (freq - left) / (center - left);
            let upper = (right - freq) / (right - center);
            let weight = lower.min(upper).max(0.0);
            filterbank[[m, b]] = (weight * enorm) as f32;
        }
    }

    filterbank
}
