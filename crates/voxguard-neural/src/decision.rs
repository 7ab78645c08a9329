//! Logit to label, confidence and explainability metrics.

use serde::{Deserialize, Serialize};

use crate::constants::{DECISION_THRESHOLD, REPORT_DECIMALS};
use crate::spectrogram::MelSpectrogram;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Label {
    AiGenerated,
    Human,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::AiGenerated => "AI_GENERATED",
            Label::Human => "HUMAN",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Explainability {
    /// Standard deviation of all spectrogram cells (dB), 4 decimals.
    pub spectral_smoothness: f64,
    /// Reserved; always 0.0.
    pub pitch_variance: f64,
}

/// Final per-clip verdict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    #[serde(rename = "classification")]
    pub label: Label,
    /// Probability of the reported label, 4 decimals, in `[0.5, 1.0]`.
    pub confidence: f64,
    pub explainability: Explainability,
}

impl Decision {
    /// Derive the decision from the scorer logit and the features it saw.
    pub fn from_logit(logit: f32, mel: &MelSpectrogram) -> Self {
        Self::from_probability(sigmoid(logit), mel)
    }

    pub fn from_probability(probability: f32, mel: &MelSpectrogram) -> Self {
        let label = label_for(probability);
        let p = probability as f64;
        let confidence = match label {
            Label::AiGenerated => p,
            Label::Human => 1.0 - p,
        };

        Self {
            label,
            confidence: round_report(confidence),
            explainability: Explainability {
                spectral_smoothness: round_report(mel.std_dev()),
                pitch_variance: 0.0,
            },
        }
    }
}

/// Numerically stable logistic function.
pub fn sigmoid(logit: f32) -> f32 {
    if logit >= 0.0 {
        1.0 / (1.0 + (-logit).exp())
    } else {
        let e = logit.exp();
        e / (1.0 + e)
    }
}

/// AI_GENERATED only strictly above the threshold; 0.5 itself is HUMAN.
pub fn label_for(probability: f32) -> Label {
    if probability > DECISION_THRESHOLD {
        Label::AiGenerated
    } else {
        Label::Human
    }
}

/// Round half away from zero to the reporting precision.
pub fn round_report(value: f64) -> f64 {
    let scale = 10f64.powi(REPORT_DECIMALS);
    (value * scale).round() / scale
}
