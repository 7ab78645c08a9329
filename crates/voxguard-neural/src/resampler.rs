//! Audio resampler using Rubato
//!
//! Normalizes all audio to the canonical rate (16 kHz) before framing.
//! The sinc filter delay is compensated so output sample `i` lines up with
//! input time `i / target_rate`.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use thiserror::Error;

const CHUNK_SIZE: usize = 1024;

#[derive(Error, Debug)]
pub enum ResampleError {
    #[error("invalid sample rate: {0} Hz")]
    InvalidRate(u32),
    #[error("failed to create resampler: {0}")]
    Construction(#[from] rubato::ResamplerConstructionError),
    #[error("resample failed: {0}")]
    Process(#[from] rubato::ResampleError),
}

/// Resample mono audio to a target sample rate
///
/// Uses Rubato's SincFixedIn for high-quality resampling.
/// If the source rate matches the target, returns a copy unchanged.
/// The output holds exactly `floor(len * target / source)` samples.
pub fn resample(
    samples: &[f32],
    source_rate: u32,
    target_rate: u32,
) -> Result<Vec<f32>, ResampleError> {
    if source_rate == 0 {
        return Err(ResampleError::InvalidRate(source_rate));
    }
    if target_rate == 0 {
        return Err(ResampleError::InvalidRate(target_rate));
    }
    if source_rate == target_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = target_rate as f64 / source_rate as f64;
    let expected_len = (samples.len() as u64 * target_rate as u64 / source_rate as u64) as usize;

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, CHUNK_SIZE, 1)?;
    let delay = resampler.output_delay();

    let mut output = Vec::with_capacity(expected_len + delay + CHUNK_SIZE);
    let mut pos = 0;

    loop {
        let needed = resampler.input_frames_next();
        if samples.len() - pos < needed {
            break;
        }
        let input = [&samples[pos..pos + needed]];
        let resampled = resampler.process(&input[..], None)?;
        output.extend_from_slice(&resampled[0]);
        pos += needed;
    }

    if pos < samples.len() {
        let input = [&samples[pos..]];
        let resampled = resampler.process_partial(Some(&input[..]), None)?;
        output.extend_from_slice(&resampled[0]);
    }

    // Flush the filter tail until the delayed signal is fully out.
    while output.len() < expected_len + delay {
        let resampled = resampler.process_partial::<&[f32]>(None, None)?;
        if resampled[0].is_empty() {
            break;
        }
        output.extend_from_slice(&resampled[0]);
    }

    output.drain(..delay.min(output.len()));
    output.resize(expected_len, 0.0);

    Ok(output)
}
