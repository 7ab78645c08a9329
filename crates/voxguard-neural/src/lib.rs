//! Voxguard Neural – synthetic speech detection core
//!
//! # Architecture
//!
//! ```text
//! Raw bytes (.wav/.mp3/.flac/.ogg)
//!     │
//!     ▼
//! ┌──────────┐   ┌───────────┐   ┌─────────┐   ┌─────────────┐   ┌─────────┐   ┌──────────┐
//! │ Decoder  │──▶│ Resampler │──▶│ Framing │──▶│ Spectrogram │──▶│ Tensor  │──▶│  Scorer  │
//! │Symphonia │   │  Rubato   │   │ peak/fix│   │   rustfft   │   │1×1×128×T│   │ ORT/ONNX │
//! └──────────┘   └───────────┘   └─────────┘   └─────────────┘   └─────────┘   └────┬─────┘
//!                                                                                    ▼
//!                                                                              ┌──────────┐
//!                                                                              │ Decision │
//!                                                                              └──────────┘
//! ```
//!
//! Every stage is a pure, deterministic transform. The only state shared
//! between calls is the scorer held by a [`ScorerHandle`], which is
//! read-only after [`load_scorer`] returns.

pub mod constants;
pub mod decision;
pub mod decoder;
pub mod framing;
pub mod inference;
pub mod models;
pub mod pipeline;
pub mod resampler;
pub mod spectrogram;
pub mod tensor;

use thiserror::Error;

pub use decision::{Decision, Explainability, Label};
pub use framing::Waveform;
pub use inference::{load_scorer, Scorer, ScorerHandle, ScorerKind, ScorerUnavailable};
pub use pipeline::{Analysis, Pipeline};
pub use spectrogram::{MelExtractor, MelSpectrogram};
pub use tensor::FeatureTensor;

/// Per-request failure of the classification pipeline.
///
/// None of these are retryable: the pipeline is deterministic, so running
/// it again on the same bytes produces the same error.
#[derive(Error, Debug)]
pub enum ClassifyError {
    /// Bytes are empty, corrupt, or in an unsupported container.
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// A tensor reached the scorer with dimensions other than `1×1×128×T`.
    #[error("Shape error: expected {expected:?}, got {actual:?}")]
    Shape {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// The forward pass itself failed.
    #[error("Inference error: {0}")]
    Inference(String),
}

impl ClassifyError {
    /// Stable machine-readable code for API surfaces.
    pub fn code(&self) -> &'static str {
        match self {
            ClassifyError::Decode(_) => "audio_decode_error",
            ClassifyError::Shape { .. } => "shape_error",
            ClassifyError::Inference(_) => "inference_error",
        }
    }

    /// True when the caller sent bad input rather than the server misbehaving.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ClassifyError::Decode(_))
    }
}

impl From<ort::Error> for ClassifyError {
    fn from(e: ort::Error) -> Self {
        ClassifyError::Inference(e.to_string())
    }
}
