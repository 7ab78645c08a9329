//! End-to-end classification: bytes in, decision out.

use std::sync::Arc;
use std::time::Instant;

use crate::decision::Decision;
use crate::decoder;
use crate::framing::Waveform;
use crate::inference::ScorerHandle;
use crate::spectrogram::{MelExtractor, MelSpectrogram};
use crate::tensor::FeatureTensor;
use crate::ClassifyError;

/// Intermediate products of one classification, for diagnostics.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub waveform: Waveform,
    pub spectrogram: MelSpectrogram,
    pub logit: f32,
    pub decision: Decision,
}

/// Decode → frame → mel → tensor → score → decide.
///
/// Cheap to clone; the extractor and scorer are shared. Safe to call from
/// any number of threads at once.
#[derive(Clone, Debug)]
pub struct Pipeline {
    extractor: Arc<MelExtractor>,
    scorer: ScorerHandle,
}

impl Pipeline {
    pub fn new(scorer: ScorerHandle) -> Self {
        Self {
            extractor: Arc::new(MelExtractor::new()),
            scorer,
        }
    }

    pub fn scorer(&self) -> &ScorerHandle {
        &self.scorer
    }

    pub fn is_degraded(&self) -> bool {
        self.scorer.is_degraded()
    }

    /// Classify an encoded clip, probing its container from content.
    pub fn classify(&self, bytes: &[u8]) -> Result<Decision, ClassifyError> {
        self.classify_with_hint(bytes, None)
    }

    /// Classify with a file-extension hint (`"mp3"`, `"wav"`, ...).
    pub fn classify_with_hint(
        &self,
        bytes: &[u8],
        hint: Option<&str>,
    ) -> Result<Decision, ClassifyError> {
        self.analyze(bytes, hint).map(|a| a.decision)
    }

    /// Run the full pipeline and keep every intermediate.
    pub fn analyze(&self, bytes: &[u8], hint: Option<&str>) -> Result<Analysis, ClassifyError> {
        let start = Instant::now();

        let samples = decoder::load(bytes, hint)?;
        let decoded_len = samples.len();
        let t_decode = start.elapsed();

        let waveform = Waveform::frame(samples);
        let spectrogram = self.extractor.extract(&waveform);
        let t_features = start.elapsed();

        let tensor = FeatureTensor::from_spectrogram(spectrogram.clone())?;
        let logit = self.scorer.score(&tensor)?;
        let decision = Decision::from_logit(logit, &spectrogram);

        tracing::debug!(
            bytes = bytes.len(),
            decoded_samples = decoded_len,
            decode_ms = t_decode.as_secs_f64() * 1000.0,
            features_ms = (t_features - t_decode).as_secs_f64() * 1000.0,
            total_ms = start.elapsed().as_secs_f64() * 1000.0,
            scorer = self.scorer.kind().as_str(),
            label = decision.label.as_str(),
            confidence = decision.confidence,
            "clip classified"
        );

        Ok(Analysis {
            waveform,
            spectrogram,
            logit,
            decision,
        })
    }
}
