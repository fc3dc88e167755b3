//! Pinned requirements manifest
//!
//! `manifest.toml` pins everything the tool needs at runtime: the two
//! external tools, the two model assets, and the output schema version.
//! Setup writes it, the smoke test and doctor verify against it.

use crate::errors::{Result, TrackerError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Version of the output JSON schema this build produces
pub const SCHEMA_VERSION: &str = "1";

/// Hugging Face repository holding the landmarker assets
pub const MODEL_REPO: &str = "facetrack/face-landmarker";
pub const MODEL_REVISION: &str = "main";

pub const WEIGHTS_FILE: &str = "face_landmarker.safetensors";
pub const WEIGHTS_SHA256: &str = "7c9f3a4d8be0561b2e8f0c6a9d4e1f7b3a5c8d2e6f0a1b4c7d9e2f5a8b1c4d6e";
pub const WEIGHTS_URL: &str =
    "https://huggingface.co/facetrack/face-landmarker/resolve/main/face_landmarker.safetensors";

pub const MODEL_CONFIG_FILE: &str = "face_landmarker.json";
pub const MODEL_CONFIG_SHA256: &str = "3e8b1d6f9a2c5e0b4d7f1a3c6e9b2d5f8a1c4e7b0d3f6a9c2e5b8d1f4a7c0e3b";
pub const MODEL_CONFIG_URL: &str =
    "https://huggingface.co/facetrack/face-landmarker/resolve/main/face_landmarker.json";

/// The pinned requirements manifest
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    pub schema_version: String,
    pub tools: Vec<ToolRequirement>,
    pub assets: Vec<AssetRequirement>,
}

/// An external tool that must be on PATH
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolRequirement {
    pub name: String,
    pub min_version: String,
}

/// A model asset fetched into the models directory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssetRequirement {
    pub filename: String,
    pub repo: String,
    pub revision: String,
    pub url: String,
    pub sha256: String,
}

impl Manifest {
    /// The canonical pinned manifest: exactly five entries (two tools,
    /// two model assets, and the schema version).
    pub fn pinned() -> Self {
        Manifest {
            schema_version: SCHEMA_VERSION.to_string(),
            tools: vec![
                ToolRequirement {
                    name: "ffmpeg".to_string(),
                    min_version: "4.0".to_string(),
                },
                ToolRequirement {
                    name: "ffprobe".to_string(),
                    min_version: "4.0".to_string(),
                },
            ],
            assets: vec![
                AssetRequirement {
                    filename: WEIGHTS_FILE.to_string(),
                    repo: MODEL_REPO.to_string(),
                    revision: MODEL_REVISION.to_string(),
                    url: WEIGHTS_URL.to_string(),
                    sha256: WEIGHTS_SHA256.to_string(),
                },
                AssetRequirement {
                    filename: MODEL_CONFIG_FILE.to_string(),
                    repo: MODEL_REPO.to_string(),
                    revision: MODEL_REVISION.to_string(),
                    url: MODEL_CONFIG_URL.to_string(),
                    sha256: MODEL_CONFIG_SHA256.to_string(),
                },
            ],
        }
    }

    /// Write the manifest as TOML
    pub fn write(&self, path: &Path) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| TrackerError::Config(format!("Failed to serialize manifest: {}", e)))?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }

    /// Load a manifest from TOML
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| TrackerError::Config(format!("Failed to parse manifest: {}", e)))
    }

    /// Verify every pinned asset against the models directory
    pub fn verify_assets(&self, models_dir: &Path) -> Result<()> {
        for asset in &self.assets {
            verify_asset(models_dir, asset)?;
        }
        Ok(())
    }
}

/// Verify a single asset: present and matching its pinned digest
pub fn verify_asset(models_dir: &Path, asset: &AssetRequirement) -> Result<()> {
    let path = models_dir.join(&asset.filename);
    if !path.exists() {
        return Err(TrackerError::Download(format!(
            "Missing model asset: {}",
            asset.filename
        )));
    }

    let got = sha256_file(&path)?;
    if got != asset.sha256 {
        return Err(TrackerError::ChecksumMismatch {
            file: asset.filename.clone(),
            want: asset.sha256.clone(),
            got,
        });
    }

    Ok(())
}

/// Hex-encoded SHA-256 of a file
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut hasher = Sha256::new();
    let mut file = std::fs::File::open(path)?;
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pinned_manifest_is_exactly_five_entries() {
        let manifest = Manifest::pinned();
        assert_eq!(manifest.tools.len(), 2);
        assert_eq!(manifest.assets.len(), 2);
        assert_eq!(manifest.schema_version, "1");

        let tool_names: Vec<&str> = manifest.tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(tool_names, vec!["ffmpeg", "ffprobe"]);

        let asset_names: Vec<&str> = manifest.assets.iter().map(|a| a.filename.as_str()).collect();
        assert_eq!(
            asset_names,
            vec!["face_landmarker.safetensors", "face_landmarker.json"]
        );
    }

    #[test]
    fn test_manifest_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.toml");

        let manifest = Manifest::pinned();
        manifest.write(&path).unwrap();

        let loaded = Manifest::load(&path).unwrap();
        assert_eq!(loaded, manifest);
    }

    #[test]
    fn test_sha256_known_vector() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, b"hello").unwrap();

        assert_eq!(
            sha256_file(&path).unwrap(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_verify_asset_missing() {
        let dir = tempfile::tempdir().unwrap();
        let asset = &Manifest::pinned().assets[0];

        let err = verify_asset(dir.path(), asset).unwrap_err();
        assert!(err.to_string().contains("Missing model asset"));
    }

    #[test]
    fn test_verify_asset_checksum_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let asset = Manifest::pinned().assets[0].clone();
        std::fs::write(dir.path().join(&asset.filename), b"not the real weights").unwrap();

        let err = verify_asset(dir.path(), &asset).unwrap_err();
        assert!(matches!(err, TrackerError::ChecksumMismatch { .. }));
    }
}
