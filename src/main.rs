//! voxguard CLI
//!
//! Classifies short speech clips as AI_GENERATED or HUMAN.
//!
//! # Usage
//!
//! ```bash
//! # Start the HTTP service
//! voxguard serve --model models/voice_detector.onnx --api-key "$KEY" --port 8000
//!
//! # Classify a single file
//! voxguard predict clip.mp3
//!
//! # Held-out accuracy over data/human and data/ai
//! voxguard evaluate --data-dir data
//!
//! # Record the model's SHA-256 in model-manifest.json
//! voxguard pin-model --model models/voice_detector.onnx
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use voxguard::config::{self, ServiceConfig, API_KEY_ENV, MAX_BODY_BYTES_ENV, MODEL_PATH_ENV};
use voxguard::evaluate::{self, extension_hint};
use voxguard::server::{explanation_for, serve, AppState};
use voxguard_neural::{load_scorer, models, Pipeline};

#[derive(Parser)]
#[command(name = "voxguard")]
#[command(about = "Synthetic speech detection: AI_GENERATED vs HUMAN")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Path to the ONNX model (degraded mode if missing)
        #[arg(short, long, env = MODEL_PATH_ENV)]
        model: Option<PathBuf>,

        /// API key expected in x-api-key or Authorization: Bearer
        #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
        api_key: Option<String>,

        /// Host to bind to
        #[arg(long, default_value = config::DEFAULT_HOST)]
        host: String,

        /// Server port
        #[arg(short, long, default_value_t = config::DEFAULT_PORT)]
        port: u16,

        /// Largest accepted /detect-voice request body, in bytes
        #[arg(long, env = MAX_BODY_BYTES_ENV, default_value_t = config::DEFAULT_MAX_BODY_BYTES)]
        max_body_bytes: usize,
    },

    /// Classify a single audio file
    Predict {
        /// Audio file (.wav, .mp3, .flac, .ogg)
        file: PathBuf,

        /// Path to the ONNX model
        #[arg(short, long, env = MODEL_PATH_ENV)]
        model: Option<PathBuf>,

        /// Also print the logit and spectrogram range
        #[arg(short, long)]
        verbose: bool,
    },

    /// Report accuracy on the seeded 20% held-out split of a labelled directory
    ///
    /// Expects `<data-dir>/human` and `<data-dir>/ai`.
    Evaluate {
        #[arg(short, long)]
        data_dir: PathBuf,

        /// Path to the ONNX model
        #[arg(short, long, env = MODEL_PATH_ENV)]
        model: Option<PathBuf>,
    },

    /// Pin the model's SHA-256 in the adjacent model-manifest.json
    PinModel {
        #[arg(short, long)]
        model: PathBuf,
    },
}

fn pipeline_for(model: Option<PathBuf>) -> Pipeline {
    let path = model.unwrap_or_else(config::default_model_path);
    Pipeline::new(load_scorer(&path))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            model,
            api_key,
            host,
            port,
            max_body_bytes,
        } => {
            let cfg = ServiceConfig::resolve(model, api_key, host, port, max_body_bytes);
            let addr = cfg.socket_addr()?;

            tracing::info!("Loading scorer from {:?}", cfg.model_path);
            let pipeline = Pipeline::new(load_scorer(&cfg.model_path));
            if pipeline.is_degraded() {
                tracing::warn!("Serving in DEGRADED mode: /health reports the reason");
            }

            let state = Arc::new(AppState {
                pipeline,
                api_key: cfg.api_key,
                max_body_bytes: cfg.max_body_bytes,
            });
            serve(state, addr).await?;
        }

        Commands::Predict {
            file,
            model,
            verbose,
        } => {
            let bytes = std::fs::read(&file).with_context(|| format!("reading {:?}", file))?;
            let pipeline = pipeline_for(model);
            let hint = extension_hint(&file);

            let analysis = tokio::task::spawn_blocking(move || {
                pipeline.analyze(&bytes, hint.as_deref())
            })
            .await??;
            let decision = analysis.decision;

            println!("File: {:?}", file);
            println!("  Classification: {}", decision.label);
            println!("  Confidence: {:.2}%", decision.confidence * 100.0);
            println!("  Explanation: {}", explanation_for(decision.label));
            println!(
                "  Spectral smoothness: {:.4}",
                decision.explainability.spectral_smoothness
            );
            println!(
                "  Pitch variance: {:.4}",
                decision.explainability.pitch_variance
            );
            if verbose {
                println!("  Logit: {:.6}", analysis.logit);
                println!(
                    "  Spectrogram: {}x{} mels x frames, range [{:.2}, {:.2}] dB",
                    analysis.spectrogram.n_mels(),
                    analysis.spectrogram.n_frames(),
                    analysis.spectrogram.min(),
                    analysis.spectrogram.max()
                );
            }
        }

        Commands::Evaluate { data_dir, model } => {
            let pipeline = pipeline_for(model);
            if pipeline.is_degraded() {
                tracing::warn!("Evaluating with an untrained scorer; accuracy is meaningless");
            }

            let report =
                tokio::task::spawn_blocking(move || evaluate::run(&pipeline, &data_dir)).await??;

            println!("Evaluation");
            println!("  Total: {}", report.total);
            println!("  Correct: {}", report.correct);
            println!("  Failed: {}", report.failed);
            println!("  Accuracy: {:.2}%", report.accuracy * 100.0);
        }

        Commands::PinModel { model } => {
            let digest = models::pin_artifact(&model)?;
            println!("Pinned {:?}", model);
            println!("  sha256: {}", digest);
            println!("  manifest: {:?}", models::manifest_path(&model));
        }
    }

    Ok(())
}
