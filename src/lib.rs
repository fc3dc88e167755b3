//! facetrack - per-frame face landmark extraction
//!
//! Extracts 2D face landmarks from a video file, frame by frame, into a
//! JSON document, plus the provisioning surface (setup, doctor, clean)
//! that manages the external decode tools and model assets.

pub mod errors;
pub mod output;

// Re-export commonly used types
pub use errors::{Result, TrackerError};

pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod doctor;
pub mod model;
pub mod setup;
pub mod tracker;
pub mod video;
