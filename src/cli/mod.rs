//! Command-line interface for facetrack

pub mod args;

pub use args::{Args, Commands, Verbosity};
