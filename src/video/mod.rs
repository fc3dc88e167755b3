//! Video probing and decoding over ffmpeg subprocesses

pub mod decoder;
pub mod probe;

pub use decoder::{Frame, FrameReader};
pub use probe::{probe, VideoInfo};
