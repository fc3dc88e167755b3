//! Video metadata via ffprobe
//!
//! Runs `ffprobe -print_format json` and parses the first video stream.

use crate::errors::{Result, TrackerError};
use serde::Deserialize;
use std::path::Path;
use tokio::process::Command;

/// Metadata for a probed video
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Container-reported frame count; absent from some formats
    pub frame_count: Option<u64>,
    pub duration_seconds: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Probe a video file for dimensions, frame rate and duration
pub async fn probe(path: &Path) -> Result<VideoInfo> {
    if !path.exists() {
        return Err(TrackerError::VideoNotFound(path.to_path_buf()));
    }

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .output()
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => TrackerError::ToolMissing("ffprobe".to_string()),
            _ => TrackerError::Io(e),
        })?;

    if !output.status.success() {
        return Err(TrackerError::ProbeFailed {
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    parse_probe_output(&output.stdout)
}

fn parse_probe_output(stdout: &[u8]) -> Result<VideoInfo> {
    let parsed: ProbeOutput = serde_json::from_slice(stdout)?;

    let stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| TrackerError::ProbeFailed {
            status: 0,
            stderr: "No video stream found".to_string(),
        })?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(TrackerError::ProbeFailed {
                status: 0,
                stderr: "Video stream has invalid dimensions".to_string(),
            })
        }
    };

    // r_frame_rate is the nominal rate; avg_frame_rate is the fallback
    let fps = stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_rational)
        .or_else(|| stream.avg_frame_rate.as_deref().and_then(parse_rational))
        .ok_or_else(|| TrackerError::ProbeFailed {
            status: 0,
            stderr: "Could not determine frame rate".to_string(),
        })?;

    let frame_count = stream.nb_frames.as_deref().and_then(|s| s.parse().ok());

    let duration_seconds = stream
        .duration
        .as_deref()
        .and_then(|s| s.parse().ok())
        .or_else(|| {
            parsed
                .format
                .as_ref()
                .and_then(|f| f.duration.as_deref())
                .and_then(|s| s.parse().ok())
        });

    Ok(VideoInfo {
        width,
        height,
        fps,
        frame_count,
        duration_seconds,
    })
}

/// Parse an ffprobe rational like "30000/1001" or a plain "25".
/// Returns None for zero denominators and non-positive rates.
fn parse_rational(s: &str) -> Option<f64> {
    let value = match s.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => s.trim().parse().ok()?,
    };

    (value > 0.0).then_some(value)
}
