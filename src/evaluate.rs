//! Held-out accuracy over a labelled clip directory
//!
//! Layout: `<data_dir>/human/**` and `<data_dir>/ai/**`. The split is a
//! seeded shuffle of every clip with the first 20% kept for evaluation, so
//! the same directory always yields the same held-out set.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::Serialize;
use voxguard_neural::{Label, Pipeline};
use walkdir::WalkDir;

pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["wav", "mp3", "flac", "ogg"];
pub const SPLIT_SEED: u64 = 42;
pub const HOLDOUT_FRACTION: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledClip {
    pub path: PathBuf,
    pub label: Label,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub total: usize,
    pub correct: usize,
    /// Clips that could not be decoded or scored.
    pub failed: usize,
    /// `correct / (total - failed)`, 0.0 when nothing was scored.
    pub accuracy: f64,
}

/// Lowercased extension, used both as filter and as decoder hint.
pub fn extension_hint(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn is_supported(path: &Path) -> bool {
    extension_hint(path)
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn walk_class(dir: &Path, label: Label) -> Vec<LabeledClip> {
    let mut clips: Vec<LabeledClip> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                tracing::warn!("Skipping unreadable entry under {:?}: {}", dir, err);
                None
            }
        })
        .filter(|e| e.file_type().is_file() && is_supported(e.path()))
        .map(|e| LabeledClip {
            path: e.into_path(),
            label,
        })
        .collect();
    // Directory iteration order is platform dependent; sort before shuffling.
    clips.sort_by(|a, b| a.path.cmp(&b.path));
    clips
}

/// Gather every supported clip under `human/` and `ai/`.
pub fn collect_clips(data_dir: &Path) -> anyhow::Result<Vec<LabeledClip>> {
    let human = walk_class(&data_dir.join("human"), Label::Human);
    let ai = walk_class(&data_dir.join("ai"), Label::AiGenerated);
    if human.is_empty() || ai.is_empty() {
        bail!(
            "expected audio files under both {:?} and {:?} (found {} human, {} ai)",
            data_dir.join("human"),
            data_dir.join("ai"),
            human.len(),
            ai.len()
        );
    }
    Ok(human.into_iter().chain(ai).collect())
}

/// Seeded shuffle, then the leading `HOLDOUT_FRACTION` of clips.
pub fn holdout_split(mut clips: Vec<LabeledClip>, seed: u64) -> Vec<LabeledClip> {
    let mut rng = StdRng::seed_from_u64(seed);
    clips.shuffle(&mut rng);
    let keep = (HOLDOUT_FRACTION * clips.len() as f64) as usize;
    clips.truncate(keep);
    clips
}

/// Classify every clip in parallel and tally the results.
pub fn evaluate(pipeline: &Pipeline, clips: &[LabeledClip]) -> EvaluationReport {
    let outcomes: Vec<Option<bool>> = clips
        .par_iter()
        .map(|clip| {
            let bytes = match std::fs::read(&clip.path) {
                Ok(b) => b,
                Err(e) => {
                    tracing::warn!("Failed to read {:?}: {}", clip.path, e);
                    return None;
                }
            };
            let hint = extension_hint(&clip.path);
            match pipeline.classify_with_hint(&bytes, hint.as_deref()) {
                Ok(decision) => Some(decision.label == clip.label),
                Err(e) => {
                    tracing::warn!("Failed to classify {:?}: {}", clip.path, e);
                    None
                }
            }
        })
        .collect();

    let total = outcomes.len();
    let failed = outcomes.iter().filter(|o| o.is_none()).count();
    let correct = outcomes.iter().filter(|o| **o == Some(true)).count();
    let scored = total - failed;
    EvaluationReport {
        total,
        correct,
        failed,
        accuracy: if scored == 0 {
            0.0
        } else {
            correct as f64 / scored as f64
        },
    }
}

/// Collect, split with the fixed seed and evaluate.
pub fn run(pipeline: &Pipeline, data_dir: &Path) -> anyhow::Result<EvaluationReport> {
    let clips = collect_clips(data_dir)
        .with_context(|| format!("collecting clips from {:?}", data_dir))?;
    let held_out = holdout_split(clips, SPLIT_SEED);
    tracing::info!("Evaluating on {} held-out clips", held_out.len());
    Ok(evaluate(pipeline, &held_out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use voxguard_neural::{ClassifyError, FeatureTensor, Scorer, ScorerHandle};

    struct AlwaysAi;

    impl Scorer for AlwaysAi {
        fn score(&self, _features: &FeatureTensor) -> Result<f32, ClassifyError> {
            Ok(4.0)
        }
    }

    fn write_wav(path: &Path) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..4_000 {
            writer.write_sample(((i % 100) as i16 - 50) * 200).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn populate(root: &Path, human: usize, ai: usize) {
        std::fs::create_dir_all(root.join("human/nested")).unwrap();
        std::fs::create_dir_all(root.join("ai")).unwrap();
        for i in 0..human {
            write_wav(&root.join(format!("human/nested/h{:02}.wav", i)));
        }
        for i in 0..ai {
            write_wav(&root.join(format!("ai/a{:02}.WAV", i)));
        }
        std::fs::write(root.join("ai/notes.txt"), b"ignored").unwrap();
    }

    #[test]
    fn collects_supported_files_recursively() {
        let dir = tempdir().unwrap();
        populate(dir.path(), 3, 2);
        let clips = collect_clips(dir.path()).unwrap();
        assert_eq!(clips.len(), 5);
        assert_eq!(clips.iter().filter(|c| c.label == Label::Human).count(), 3);
    }

    #[test]
    fn missing_class_is_an_error() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("human")).unwrap();
        write_wav(&dir.path().join("human/h.wav"));
        assert!(collect_clips(dir.path()).is_err());
    }

    #[test]
    fn holdout_is_seeded_and_sized() {
        let clips: Vec<LabeledClip> = (0..23)
            .map(|i| LabeledClip {
                path: PathBuf::from(format!("clip{}.wav", i)),
                label: if i % 2 == 0 { Label::Human } else { Label::AiGenerated },
            })
            .collect();
        let a = holdout_split(clips.clone(), SPLIT_SEED);
        let b = holdout_split(clips, SPLIT_SEED);
        assert_eq!(a.len(), 4);
        assert_eq!(a, b);
    }

    #[test]
    fn tallies_correct_and_failed() {
        let dir = tempdir().unwrap();
        populate(dir.path(), 2, 2);
        let broken = dir.path().join("ai/broken.mp3");
        std::fs::write(&broken, b"not an mp3").unwrap();

        let mut clips = collect_clips(dir.path()).unwrap();
        assert_eq!(clips.len(), 5);
        clips.sort_by(|a, b| a.path.cmp(&b.path));

        let pipeline = Pipeline::new(ScorerHandle::new(AlwaysAi));
        let report = evaluate(&pipeline, &clips);
        assert_eq!(report.total, 5);
        assert_eq!(report.failed, 1);
        assert_eq!(report.correct, 2);
        assert_eq!(report.accuracy, 0.5);
    }
}
