//! Error types for facetrack
//!
//! Provides comprehensive error handling with context propagation
//! across the provisioning and extraction paths.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the facetrack pipeline
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Input video does not exist
    #[error("Video not found: {0}")]
    VideoNotFound(PathBuf),

    /// ffprobe exited non-zero or produced unusable output
    #[error("ffprobe failed (exit code {status}): {stderr}")]
    ProbeFailed { status: i32, stderr: String },

    /// ffmpeg decode process exited non-zero
    #[error("ffmpeg decode failed (exit code {status}): {stderr}")]
    DecodeFailed { status: i32, stderr: String },

    /// Stream ended in the middle of a frame
    #[error("Truncated frame {index}: got {got} bytes, expected {want}")]
    TruncatedFrame { index: u64, got: usize, want: usize },

    /// Required external tool is not on PATH
    #[error("Required tool not found: {0}")]
    ToolMissing(String),

    /// Downloaded or cached asset does not match its pinned digest
    #[error("Checksum mismatch for {file}: expected {want}, got {got}")]
    ChecksumMismatch {
        file: String,
        want: String,
        got: String,
    },

    /// Model asset download errors
    #[error("Download failed: {0}")]
    Download(String),

    /// Candle inference errors
    #[error("Model error: {0}")]
    Model(#[from] candle_core::Error),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for tracker operations
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Convert anyhow errors at the binary boundary
impl From<anyhow::Error> for TrackerError {
    fn from(err: anyhow::Error) -> Self {
        TrackerError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_failed_display() {
        let err = TrackerError::ProbeFailed {
            status: 1,
            stderr: "No such file".to_string(),
        };
        assert!(err.to_string().contains("exit code 1"));
        assert!(err.to_string().contains("No such file"));
    }

    #[test]
    fn test_truncated_frame_display() {
        let err = TrackerError::TruncatedFrame {
            index: 12,
            got: 100,
            want: 2_764_800,
        };
        assert!(err.to_string().contains("12"));
        assert!(err.to_string().contains("2764800"));
    }

    #[test]
    fn test_checksum_mismatch_display() {
        let err = TrackerError::ChecksumMismatch {
            file: "face_landmarker.safetensors".to_string(),
            want: "abcd".to_string(),
            got: "ef01".to_string(),
        };
        assert!(err.to_string().contains("face_landmarker.safetensors"));
        assert!(err.to_string().contains("abcd"));
    }
}
