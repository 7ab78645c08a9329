#![no_main]

use std::sync::OnceLock;

use libfuzzer_sys::fuzz_target;
use voxguard_neural::inference::{UntrainedScorer, UNTRAINED_SEED};
use voxguard_neural::{Pipeline, ScorerHandle};

static PIPELINE: OnceLock<Pipeline> = OnceLock::new();

fuzz_target!(|data: &[u8]| {
    let pipeline =
        PIPELINE.get_or_init(|| Pipeline::new(ScorerHandle::new(UntrainedScorer::new(UNTRAINED_SEED))));
    if let Ok(decision) = pipeline.classify(data) {
        assert!((0.5..=1.0).contains(&decision.confidence));
        assert_eq!(decision.explainability.pitch_variance, 0.0);
    }
});
