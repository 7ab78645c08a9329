use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

const MANIFEST_FILE: &str = "model-manifest.json";
const MANIFEST_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Required model file missing: {0}")]
    ModelMissing(PathBuf),
    #[error("Model manifest invalid at {path:?}: {reason}")]
    ManifestInvalid { path: PathBuf, reason: String },
    #[error("Checksum mismatch for {path:?}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
}

/// Pinned artifact digests, keyed by file name, stored next to the artifacts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ModelManifest {
    version: u32,
    artifacts: BTreeMap<String, String>,
}

/// Outcome of checking an artifact against the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactStatus {
    /// Digest recorded and matching.
    Verified { sha256: String },
    /// No manifest entry; the artifact is trusted as-is.
    Unpinned,
}

/// Manifest location for an artifact (same directory).
pub fn manifest_path(artifact: &Path) -> PathBuf {
    artifact
        .parent()
        .map(|dir| dir.join(MANIFEST_FILE))
        .unwrap_or_else(|| PathBuf::from(MANIFEST_FILE))
}

fn artifact_key(artifact: &Path) -> Result<String, ModelError> {
    artifact
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| ModelError::ModelMissing(artifact.to_path_buf()))
}

fn load_manifest(path: &Path) -> Result<Option<ModelManifest>, ModelError> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(path)?;
    let manifest: ModelManifest =
        serde_json::from_slice(&bytes).map_err(|e| ModelError::ManifestInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    if manifest.version != MANIFEST_VERSION {
        return Err(ModelError::ManifestInvalid {
            path: path.to_path_buf(),
            reason: format!("unsupported manifest version {}", manifest.version),
        });
    }
    Ok(Some(manifest))
}

fn write_manifest(path: &Path, manifest: &ModelManifest) -> Result<(), ModelError> {
    let tmp_path = path.with_extension("json.tmp");
    let payload =
        serde_json::to_vec_pretty(manifest).map_err(|e| ModelError::ManifestInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let mut file = File::create(&tmp_path)?;
    file.write_all(&payload)?;
    file.sync_all()?;
    fs::rename(&tmp_path, path)?;
    sync_parent_dir(path)?;
    Ok(())
}

/// Check an artifact exists and, if pinned, that its digest still matches.
pub fn verify_artifact(artifact: &Path) -> Result<ArtifactStatus, ModelError> {
    if !artifact.is_file() {
        return Err(ModelError::ModelMissing(artifact.to_path_buf()));
    }

    let Some(manifest) = load_manifest(&manifest_path(artifact))? else {
        return Ok(ArtifactStatus::Unpinned);
    };
    let Some(expected) = manifest.artifacts.get(&artifact_key(artifact)?) else {
        return Ok(ArtifactStatus::Unpinned);
    };

    let actual = compute_sha256(artifact)?;
    if &actual == expected {
        Ok(ArtifactStatus::Verified { sha256: actual })
    } else {
        Err(ModelError::ChecksumMismatch {
            path: artifact.to_path_buf(),
            expected: expected.clone(),
            actual,
        })
    }
}

/// Record the artifact's current digest (trust on first use).
///
/// Other entries in the manifest are preserved. Returns the digest.
pub fn pin_artifact(artifact: &Path) -> Result<String, ModelError> {
    if !artifact.is_file() {
        return Err(ModelError::ModelMissing(artifact.to_path_buf()));
    }
    let path = manifest_path(artifact);
    let mut manifest = load_manifest(&path)?.unwrap_or(ModelManifest {
        version: MANIFEST_VERSION,
        artifacts: BTreeMap::new(),
    });

    let digest = compute_sha256(artifact)?;
    manifest
        .artifacts
        .insert(artifact_key(artifact)?, digest.clone());
    write_manifest(&path, &manifest)?;

    // Verify immediately to catch I/O races or corruption before returning.
    verify_artifact(artifact)?;
    Ok(digest)
}

pub fn compute_sha256(path: &Path) -> Result<String, ModelError> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

fn sync_parent_dir(path: &Path) -> Result<(), ModelError> {
    #[cfg(unix)]
    {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            File::open(parent)?.sync_all()?;
        }
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}
