//! Peak normalization and fixed-length framing
//!
//! Every clip is scaled so its loudest sample sits at ±1.0, then cut or
//! zero-padded to exactly [`TARGET_SAMPLES`]. Truncation keeps the head of
//! the clip: no centering, no energy-based window selection.

use crate::constants::TARGET_SAMPLES;

/// Mono waveform at the canonical rate with the canonical length.
///
/// Only constructed through [`Waveform::frame`], so `len()` is always
/// [`TARGET_SAMPLES`].
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Vec<f32>,
}

impl Waveform {
    /// Peak-normalize then fix the length of a resampled clip.
    pub fn frame(samples: Vec<f32>) -> Self {
        Self::frame_to(samples, TARGET_SAMPLES)
    }

    pub(crate) fn frame_to(mut samples: Vec<f32>, target_len: usize) -> Self {
        peak_normalize(&mut samples);
        Self {
            samples: fix_length(samples, target_len),
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn peak(&self) -> f32 {
        peak(&self.samples)
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.samples
    }
}

/// Maximum absolute sample value, 0.0 for empty input.
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()))
}

/// Divide every sample by the peak. Silent input is left untouched.
pub fn peak_normalize(samples: &mut [f32]) {
    let peak = peak(samples);
    if peak > 0.0 {
        for s in samples.iter_mut() {
            *s /= peak;
        }
    }
}

/// Truncate to the first `target_len` samples, or right-pad with zeros.
pub fn fix_length(mut samples: Vec<f32>, target_len: usize) -> Vec<f32> {
    samples.resize(target_len, 0.0);
    samples
}
