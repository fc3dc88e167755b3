//! Video landmark extraction pipeline
//!
//! Probes the input, decodes it frame by frame, runs the landmarker on
//! each frame and aggregates the results into the output document.

use crate::cli::Verbosity;
use crate::config::Config;
use crate::errors::Result;
use crate::model::FaceLandmarker;
use crate::output::{FrameRecord, LandmarksDocument, VideoMetadata};
use crate::video::{probe, FrameReader};
use chrono::Utc;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

pub struct Tracker {
    landmarker: FaceLandmarker,
    config: Config,
}

impl Tracker {
    pub fn new(landmarker: FaceLandmarker, config: Config) -> Self {
        Tracker { landmarker, config }
    }

    /// Process a complete video and extract landmarks from every frame
    pub async fn process(&self, video_path: &Path, verbosity: Verbosity) -> Result<LandmarksDocument> {
        let info = probe(video_path).await?;

        if verbosity.show_events() {
            println!("Processing video: {}", video_path.display());
            println!("Resolution: {}x{}", info.width, info.height);
            println!("FPS: {:.3}", info.fps);
        }

        let mut reader = FrameReader::open(video_path, &info)?;

        // The container count only sizes the progress bar; the decoded
        // count is authoritative.
        let estimated_frames = info.frame_count.or_else(|| {
            info.duration_seconds
                .map(|d| (d * info.fps).round() as u64)
        });

        let pb = if verbosity.show_progress() {
            let pb = match estimated_frames {
                Some(total) => {
                    let pb = ProgressBar::new(total);
                    pb.set_style(
                        ProgressStyle::default_bar()
                            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} frames")
                            .unwrap()
                            .progress_chars("#>-"),
                    );
                    pb
                }
                None => {
                    let pb = ProgressBar::new_spinner();
                    pb.set_style(
                        ProgressStyle::default_spinner()
                            .template("{spinner:.green} {pos} frames")
                            .unwrap(),
                    );
                    pb
                }
            };
            Some(pb)
        } else {
            None
        };

        let mut doc = LandmarksDocument::new(VideoMetadata {
            video_path: video_path.display().to_string(),
            frame_count: 0,
            fps: info.fps,
            duration_seconds: 0.0,
            frames_with_face: 0,
            generated_at: Utc::now(),
        });

        let pad_width = self.config.output.pad_width;
        let threshold = self.config.model.presence_threshold;

        while let Some(frame) = reader.next_frame().await? {
            let timestamp = timestamp_for(frame.index, info.fps);

            let record = match self.landmarker.detect(&frame, threshold)? {
                Some(detection) => {
                    FrameRecord::with_landmarks(frame.index, timestamp, detection.landmarks)
                }
                None => FrameRecord::empty(frame.index, timestamp),
            };
            doc.insert(record, pad_width);

            if let Some(ref pb) = pb {
                pb.inc(1);
            }
        }

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }

        let decoded = reader.frames_read();
        doc.metadata.frame_count = decoded;
        doc.metadata.frames_with_face = doc.frames_with_face();
        doc.metadata.duration_seconds = info
            .duration_seconds
            .unwrap_or_else(|| timestamp_for(decoded, info.fps));

        if verbosity.show_events() {
            println!(
                "{} {} frames processed.",
                "Processing completed.".green(),
                decoded
            );
        }

        Ok(doc)
    }
}

/// Timestamp of a 1-based frame number at the given rate
fn timestamp_for(frame_number: u64, fps: f64) -> f64 {
    frame_number as f64 / fps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_for() {
        assert!((timestamp_for(30, 30.0) - 1.0).abs() < 1e-9);
        assert!((timestamp_for(1, 25.0) - 0.04).abs() < 1e-9);
    }

    #[test]
    fn test_timestamp_monotonic() {
        let fps = 29.97;
        let mut last = 0.0;
        for n in 1..100 {
            let t = timestamp_for(n, fps);
            assert!(t > last);
            last = t;
        }
    }

    // Note: end-to-end processing requires ffmpeg on PATH and provisioned
    // model weights; it is exercised by integration use, not unit tests.
}
