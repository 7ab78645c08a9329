//! Service configuration
//!
//! Values come from CLI flags first, then the environment (clap's `env`
//! support folds both into the same `Option`), then built-in defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

use directories::ProjectDirs;

pub const MODEL_PATH_ENV: &str = "VOXGUARD_MODEL_PATH";
pub const API_KEY_ENV: &str = "VOXGUARD_API_KEY";
pub const MAX_BODY_BYTES_ENV: &str = "VOXGUARD_MAX_BODY_BYTES";

/// Used when no key is configured. Never deploy with it.
pub const DEFAULT_API_KEY: &str = "dev-api-key";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
/// Request body cap for `/detect-voice`. Base64 inflates audio by 4/3, so
/// this admits roughly 18 MiB of encoded audio.
pub const DEFAULT_MAX_BODY_BYTES: usize = 25 * 1024 * 1024;
/// Anything smaller cannot carry a useful clip.
const MIN_MAX_BODY_BYTES: usize = 1024;

const FALLBACK_MODEL_PATH: &str = "models/voice_detector.onnx";
const DATA_DIR_MODEL_FILE: &str = "model.onnx";

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub model_path: PathBuf,
    pub api_key: String,
    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,
}

impl ServiceConfig {
    pub fn resolve(
        model_path: Option<PathBuf>,
        api_key: Option<String>,
        host: String,
        port: u16,
        max_body_bytes: usize,
    ) -> Self {
        let model_path = model_path
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(default_model_path);

        let api_key = match api_key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty()) {
            Some(key) => key,
            None => {
                tracing::warn!(
                    "No API key configured (set {} or --api-key); using the development default",
                    API_KEY_ENV
                );
                DEFAULT_API_KEY.to_string()
            }
        };

        if max_body_bytes < MIN_MAX_BODY_BYTES {
            tracing::warn!(
                "Body limit of {} bytes is below {}; raising it",
                max_body_bytes,
                MIN_MAX_BODY_BYTES
            );
        }

        Self {
            model_path,
            api_key,
            host,
            port,
            max_body_bytes: max_body_bytes.max(MIN_MAX_BODY_BYTES),
        }
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

/// Platform data dir `model.onnx` when present, else the repo-relative artifact.
pub fn default_model_path() -> PathBuf {
    if let Some(dirs) = ProjectDirs::from("ai", "voxguard", "voxguard") {
        let candidate = dirs.data_dir().join(DATA_DIR_MODEL_FILE);
        if candidate.is_file() {
            return candidate;
        }
    }
    PathBuf::from(FALLBACK_MODEL_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_values_win() {
        let cfg = ServiceConfig::resolve(
            Some(PathBuf::from("/opt/models/detector.onnx")),
            Some("s3cret".into()),
            "127.0.0.1".into(),
            9000,
            4 * 1024 * 1024,
        );
        assert_eq!(cfg.model_path, PathBuf::from("/opt/models/detector.onnx"));
        assert_eq!(cfg.api_key, "s3cret");
        assert_eq!(cfg.socket_addr().unwrap().port(), 9000);
        assert_eq!(cfg.max_body_bytes, 4 * 1024 * 1024);
    }

    #[test]
    fn blank_key_falls_back_to_default() {
        let cfg = ServiceConfig::resolve(
            None,
            Some("   ".into()),
            DEFAULT_HOST.into(),
            DEFAULT_PORT,
            DEFAULT_MAX_BODY_BYTES,
        );
        assert_eq!(cfg.api_key, DEFAULT_API_KEY);
        assert!(cfg.model_path.ends_with("voice_detector.onnx") || cfg.model_path.ends_with("model.onnx"));
    }

    #[test]
    fn bad_host_is_rejected() {
        let cfg = ServiceConfig::resolve(None, None, "not a host".into(), 80, DEFAULT_MAX_BODY_BYTES);
        assert!(cfg.socket_addr().is_err());
    }

    #[test]
    fn tiny_body_limit_is_raised() {
        let cfg = ServiceConfig::resolve(None, None, DEFAULT_HOST.into(), DEFAULT_PORT, 0);
        assert_eq!(cfg.max_body_bytes, MIN_MAX_BODY_BYTES);
        assert!(DEFAULT_MAX_BODY_BYTES > 2 * 1024 * 1024);
    }
}
