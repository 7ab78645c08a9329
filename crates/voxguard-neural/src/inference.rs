//! Scorer providers and the process-wide scorer handle
//!
//! The trained network is consumed through its I/O contract only:
//! `[1, 1, 128, T]` log-mel tensor in, one logit out. The production
//! provider is an ONNX Runtime session; when the artifact cannot be loaded
//! the handle degrades to a seeded, untrained linear scorer and says so.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{N_MELS, TOP_DB};
use crate::models::{self, ArtifactStatus};
use crate::tensor::{ensure_canonical, FeatureTensor};
use crate::ClassifyError;

/// Seed for the fallback scorer, fixed so degraded output is reproducible.
pub const UNTRAINED_SEED: u64 = 0x5EED_0F_F00D;

/// Trained binary classifier: feature tensor to one logit.
///
/// Implementations must be deterministic and safe to call from many
/// threads at once; they must not change internal state on `score`.
pub trait Scorer: Send + Sync {
    fn score(&self, features: &FeatureTensor) -> Result<f32, ClassifyError>;

    fn kind(&self) -> ScorerKind {
        ScorerKind::Custom
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScorerKind {
    Onnx,
    Untrained,
    Custom,
}

impl ScorerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScorerKind::Onnx => "onnx",
            ScorerKind::Untrained => "untrained",
            ScorerKind::Custom => "custom",
        }
    }
}

/// The trained artifact could not be used; results are meaningless.
///
/// A process-wide state, not a per-request error.
#[derive(Error, Debug, Clone)]
#[error("scorer unavailable ({path:?}): {reason}")]
pub struct ScorerUnavailable {
    pub path: PathBuf,
    pub reason: String,
}

/// Shared, read-only scorer plus its degraded-mode flag.
#[derive(Clone)]
pub struct ScorerHandle {
    scorer: Arc<dyn Scorer>,
    unavailable: Option<Arc<ScorerUnavailable>>,
}

impl std::fmt::Debug for ScorerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScorerHandle")
            .field("kind", &self.kind())
            .field("unavailable", &self.unavailable)
            .finish()
    }
}

impl ScorerHandle {
    /// Handle around a healthy scorer.
    pub fn new(scorer: impl Scorer + 'static) -> Self {
        Self {
            scorer: Arc::new(scorer),
            unavailable: None,
        }
    }

    /// Handle that serves from `fallback` while flagging degraded mode.
    pub fn degraded(fallback: impl Scorer + 'static, reason: ScorerUnavailable) -> Self {
        Self {
            scorer: Arc::new(fallback),
            unavailable: Some(Arc::new(reason)),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.unavailable.is_some()
    }

    pub fn unavailable(&self) -> Option<&ScorerUnavailable> {
        self.unavailable.as_deref()
    }

    pub fn kind(&self) -> ScorerKind {
        self.scorer.kind()
    }

    /// Shape-check then run the forward pass.
    pub fn score(&self, features: &FeatureTensor) -> Result<f32, ClassifyError> {
        if let Err(e) = ensure_canonical(features) {
            tracing::error!("Feature tensor shape violation reached the scorer: {}", e);
            return Err(e);
        }
        let logit = self.scorer.score(features)?;
        if !logit.is_finite() {
            return Err(ClassifyError::Inference(format!(
                "scorer produced non-finite logit {}",
                logit
            )));
        }
        Ok(logit)
    }
}

/// Load the trained scorer once at startup.
///
/// Never fails: a missing, tampered or unloadable artifact yields a handle
/// in degraded mode backed by [`UntrainedScorer`].
pub fn load_scorer(path: &Path) -> ScorerHandle {
    let attempt = models::verify_artifact(path)
        .map_err(|e| e.to_string())
        .and_then(|status| {
            match &status {
                ArtifactStatus::Verified { sha256 } => {
                    tracing::info!("Model artifact {:?} verified (sha256 {})", path, sha256)
                }
                ArtifactStatus::Unpinned => tracing::warn!(
                    "Model artifact {:?} is not pinned in a manifest; run `pin-model` to record its checksum",
                    path
                ),
            }
            OnnxScorer::from_file(path).map_err(|e| e.to_string())
        });

    match attempt {
        Ok(scorer) => {
            tracing::info!("Scorer loaded from {:?}", path);
            ScorerHandle::new(scorer)
        }
        Err(reason) => {
            let unavailable = ScorerUnavailable {
                path: path.to_path_buf(),
                reason,
            };
            tracing::warn!(
                "{}. Falling back to an UNTRAINED scorer: classifications are meaningless until a trained model is provided.",
                unavailable
            );
            ScorerHandle::degraded(UntrainedScorer::new(UNTRAINED_SEED), unavailable)
        }
    }
}

/// ONNX Runtime session over the exported network.
pub struct OnnxScorer {
    // `Session::run` needs exclusive access; the lock covers the forward pass only.
    session: Mutex<Session>,
}

impl OnnxScorer {
    pub fn from_file(path: &Path) -> Result<Self, ort::Error> {
        // Initialize ORT environment (global); already-initialized is fine.
        let _ = ort::init().with_name("voxguard").commit();

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(1)?
            .commit_from_file(path)?;

        for input in &session.inputs {
            tracing::debug!("model input {} : {:?}", input.name, input.input_type);
        }

        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl Scorer for OnnxScorer {
    fn score(&self, features: &FeatureTensor) -> Result<f32, ClassifyError> {
        let shape = features.shape().to_vec();
        let input = Tensor::from_array((shape, features.to_flat_vec()))?;

        // A crashing model must not take the calling worker down with it.
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut session = self.session.lock();
            let outputs = session.run(ort::inputs![input])?;
            let (_, logits) = outputs[0].try_extract_tensor::<f32>()?;
            logits
                .first()
                .copied()
                .ok_or_else(|| ClassifyError::Inference("model returned an empty output".into()))
        }))
        .map_err(|_| ClassifyError::Inference("Inference panicked".to_string()))?
    }

    fn kind(&self) -> ScorerKind {
        ScorerKind::Onnx
    }
}

/// Seeded linear scorer over per-band mean energy.
///
/// Stands in for the trained network when no artifact is available. Output
/// is deterministic for a given seed and carries no information.
#[derive(Debug, Clone)]
pub struct UntrainedScorer {
    weights: Vec<f32>,
    bias: f32,
}

impl UntrainedScorer {
    pub fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let scale = 1.0 / (N_MELS as f32).sqrt();
        let weights = (0..N_MELS)
            .map(|_| (rng.gen::<f32>() * 2.0 - 1.0) * scale)
            .collect();
        let bias = (rng.gen::<f32>() * 2.0 - 1.0) * 0.1;
        Self { weights, bias }
    }
}

impl Scorer for UntrainedScorer {
    fn score(&self, features: &FeatureTensor) -> Result<f32, ClassifyError> {
        let view = features.view();
        let frames = view.shape()[3].max(1) as f32;

        let mut logit = self.bias;
        for (m, w) in self.weights.iter().enumerate() {
            let band = view.slice(ndarray::s![0, 0, m, ..]);
            let mean_db = band.sum() / frames;
            logit += w * (mean_db / TOP_DB);
        }
        Ok(logit)
    }

    fn kind(&self) -> ScorerKind {
        ScorerKind::Untrained
    }
}
