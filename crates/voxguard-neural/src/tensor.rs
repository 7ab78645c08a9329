//! Packaging of mel features into the scorer's `[batch, channel, mels, frames]` input.

use ndarray::{Array4, ArrayView4, Axis};

use crate::constants::{N_FRAMES, N_MELS};
use crate::spectrogram::MelSpectrogram;
use crate::ClassifyError;

/// Scorer input tensor, always `1 × 1 × N_MELS × T`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTensor {
    data: Array4<f32>,
}

impl FeatureTensor {
    /// Insert channel then batch axes. Pure reshape; values are untouched.
    pub fn from_spectrogram(mel: MelSpectrogram) -> Result<Self, ClassifyError> {
        let data = mel
            .into_array()
            .insert_axis(Axis(0))
            .insert_axis(Axis(0));
        Self::from_array(data)
    }

    /// Wrap an already batched array after checking its shape.
    pub fn from_array(data: Array4<f32>) -> Result<Self, ClassifyError> {
        let shape = data.shape();
        if shape[0] != 1 || shape[1] != 1 || shape[2] != N_MELS || shape[3] == 0 {
            return Err(ClassifyError::Shape {
                expected: expected_shape(),
                actual: shape.to_vec(),
            });
        }
        Ok(Self { data })
    }

    pub fn shape(&self) -> [usize; 4] {
        let s = self.data.shape();
        [s[0], s[1], s[2], s[3]]
    }

    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.data.view()
    }

    /// Row-major flattening matching the `[1, 1, mels, frames]` layout.
    pub fn to_flat_vec(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }
}

/// Canonical scorer input shape.
pub fn expected_shape() -> Vec<usize> {
    vec![1, 1, N_MELS, N_FRAMES]
}

/// Reject tensors whose frame axis differs from the canonical length.
pub fn ensure_canonical(tensor: &FeatureTensor) -> Result<(), ClassifyError> {
    let shape = tensor.shape();
    if shape.to_vec() != expected_shape() {
        return Err(ClassifyError::Shape {
            expected: expected_shape(),
            actual: shape.to_vec(),
        });
    }
    Ok(())
}
