//! Output document for extracted landmarks
//!
//! The JSON contract: a metadata record plus a mapping from zero-padded
//! frame identifiers to per-frame landmark records.

use crate::errors::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Number of landmarks produced per detected face
pub const NUM_LANDMARKS: usize = 468;

/// Complete landmarks document written to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandmarksDocument {
    pub metadata: VideoMetadata,
    pub frames: BTreeMap<String, FrameRecord>,
}

/// Video-level metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub video_path: String,
    pub frame_count: u64,
    pub fps: f64,
    pub duration_seconds: f64,
    pub frames_with_face: u64,
    pub generated_at: DateTime<Utc>,
}

/// Landmarks for a single frame
///
/// Frames with no detected face keep their key with an empty landmark
/// list and `landmark_count` of zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameRecord {
    pub frame_number: u64,
    pub timestamp_seconds: f64,
    pub landmarks: Vec<[f32; 2]>,
    pub landmark_count: usize,
}

impl FrameRecord {
    /// Record for a frame with a detected face
    pub fn with_landmarks(frame_number: u64, timestamp_seconds: f64, landmarks: Vec<[f32; 2]>) -> Self {
        let landmark_count = landmarks.len();
        FrameRecord {
            frame_number,
            timestamp_seconds,
            landmarks,
            landmark_count,
        }
    }

    /// Record for a frame where no face was detected
    pub fn empty(frame_number: u64, timestamp_seconds: f64) -> Self {
        FrameRecord {
            frame_number,
            timestamp_seconds,
            landmarks: Vec::new(),
            landmark_count: 0,
        }
    }

    pub fn has_face(&self) -> bool {
        self.landmark_count > 0
    }
}

/// Zero-padded frame identifier, e.g. `frame_000042`.
///
/// Fixed-width keys sort lexicographically in frame order, so the
/// BTreeMap-backed document serializes frames in playback order.
pub fn frame_key(frame_number: u64, pad_width: usize) -> String {
    format!("frame_{:0width$}", frame_number, width = pad_width)
}

impl LandmarksDocument {
    pub fn new(metadata: VideoMetadata) -> Self {
        LandmarksDocument {
            metadata,
            frames: BTreeMap::new(),
        }
    }

    /// Insert a frame record under its zero-padded key
    pub fn insert(&mut self, record: FrameRecord, pad_width: usize) {
        self.frames.insert(frame_key(record.frame_number, pad_width), record);
    }

    /// Count of frames with at least one landmark
    pub fn frames_with_face(&self) -> u64 {
        self.frames.values().filter(|f| f.has_face()).count() as u64
    }

    /// Write the document as JSON
    pub fn save(&self, path: &Path, pretty: bool) -> Result<()> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    fn test_metadata() -> VideoMetadata {
        VideoMetadata {
            video_path: "./video.mp4".to_string(),
            frame_count: 2,
            fps: 30.0,
            duration_seconds: 2.0 / 30.0,
            frames_with_face: 1,
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn test_frame_key_padding() {
        assert_eq!(frame_key(1, 6), "frame_000001");
        assert_eq!(frame_key(123456, 6), "frame_123456");
        assert_eq!(frame_key(7, 4), "frame_0007");
    }

    #[quickcheck]
    fn prop_frame_keys_sort_in_frame_order(a: u32, b: u32) -> bool {
        let (a, b) = (a as u64 % 1_000_000, b as u64 % 1_000_000);
        (frame_key(a, 6) < frame_key(b, 6)) == (a < b)
    }

    #[test]
    fn test_empty_record() {
        let record = FrameRecord::empty(5, 5.0 / 30.0);
        assert!(!record.has_face());
        assert_eq!(record.landmark_count, 0);
        assert!(record.landmarks.is_empty());
    }

    #[test]
    fn test_with_landmarks_counts() {
        let points = vec![[1.0, 2.0], [3.0, 4.0]];
        let record = FrameRecord::with_landmarks(1, 0.0, points);
        assert!(record.has_face());
        assert_eq!(record.landmark_count, 2);
    }

    #[test]
    fn test_document_ordering_and_counts() {
        let mut doc = LandmarksDocument::new(test_metadata());
        doc.insert(FrameRecord::empty(2, 2.0 / 30.0), 6);
        doc.insert(
            FrameRecord::with_landmarks(1, 1.0 / 30.0, vec![[10.0, 20.0]]),
            6,
        );

        assert_eq!(doc.frames_with_face(), 1);
        let keys: Vec<&String> = doc.frames.keys().collect();
        assert_eq!(keys, vec!["frame_000001", "frame_000002"]);
    }

    #[test]
    fn test_document_round_trip() {
        let mut doc = LandmarksDocument::new(test_metadata());
        doc.insert(
            FrameRecord::with_landmarks(1, 0.0, vec![[12.5, 48.0]]),
            6,
        );

        let json = serde_json::to_string(&doc).unwrap();
        let parsed: LandmarksDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.frames["frame_000001"].landmarks[0], [12.5, 48.0]);
        assert_eq!(parsed.metadata.frame_count, 2);
    }

    #[test]
    fn test_save_pretty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");

        let doc = LandmarksDocument::new(test_metadata());
        doc.save(&path, true).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\n"));
        assert!(written.contains("\"video_path\""));
    }
}
