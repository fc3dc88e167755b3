//! Command-line argument parsing for facetrack
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default input when no video path is given, matching the tool's
/// convention of processing the video in the current directory.
pub const DEFAULT_VIDEO: &str = "./video.mp4";

/// Default output document path.
pub const DEFAULT_OUTPUT: &str = "video_landmarks.json";

/// facetrack - Extract per-frame 2D face landmarks from a video into JSON
#[derive(Parser, Debug)]
#[command(name = "facetrack")]
#[command(version = "0.3.0")]
#[command(about = "Extract per-frame 2D face landmarks from a video into JSON", long_about = None)]
pub struct Args {
    /// Input video file (defaults to ./video.mp4)
    #[arg(value_name = "VIDEO")]
    pub video: Option<PathBuf>,

    /// Output JSON path
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Override the model directory (defaults to <state dir>/models)
    #[arg(long)]
    pub model_dir: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress all output except errors)
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Provision the environment (tools, manifest, model assets, helper script)
    Setup {
        /// Re-provision without prompting when the environment already exists
        #[arg(long)]
        force: bool,
    },

    /// Run system diagnostics and health checks
    Doctor,

    /// Display current configuration
    Config,

    /// Clean state and temporary files
    Clean {
        /// Also remove downloaded model assets
        #[arg(long)]
        models: bool,
    },
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    /// Input video path (./video.mp4 if not specified)
    pub fn video_path(&self) -> PathBuf {
        self.video
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_VIDEO))
    }

    /// State directory holding config, manifest and model assets
    pub fn state_dir(&self) -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".facetrack")
    }

    /// Check argument combinations
    pub fn validate(&self) -> Result<(), String> {
        // Video path not allowed with subcommands
        if self.command.is_some() && self.video.is_some() {
            return Err("Cannot specify a video path with a subcommand.".to_string());
        }

        Ok(())
    }
}

impl Verbosity {
    /// Check if should show progress bars
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Check if should show detailed events
    pub fn show_events(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args {
            video: None,
            output: PathBuf::from(DEFAULT_OUTPUT),
            model_dir: None,
            config: None,
            verbose: 0,
            quiet: false,
            command: None,
        }
    }

    #[test]
    fn test_verbosity_quiet() {
        let args = Args {
            quiet: true,
            ..base_args()
        };
        assert_eq!(args.verbosity(), Verbosity::Quiet);
    }

    #[test]
    fn test_verbosity_normal() {
        assert_eq!(base_args().verbosity(), Verbosity::Normal);
    }

    #[test]
    fn test_verbosity_verbose() {
        let args = Args {
            verbose: 1,
            ..base_args()
        };
        assert_eq!(args.verbosity(), Verbosity::Verbose);
    }

    #[test]
    fn test_verbosity_very_verbose() {
        let args = Args {
            verbose: 3,
            ..base_args()
        };
        assert_eq!(args.verbosity(), Verbosity::VeryVerbose);
    }

    #[test]
    fn test_default_video_path() {
        assert_eq!(base_args().video_path(), PathBuf::from("./video.mp4"));
    }

    #[test]
    fn test_explicit_video_path() {
        let args = Args {
            video: Some(PathBuf::from("clip.mov")),
            ..base_args()
        };
        assert_eq!(args.video_path(), PathBuf::from("clip.mov"));
    }

    #[test]
    fn test_validate_success_no_args() {
        assert!(base_args().validate().is_ok());
    }

    #[test]
    fn test_validate_success_with_subcommand() {
        let args = Args {
            command: Some(Commands::Doctor),
            ..base_args()
        };
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validate_fail_video_with_subcommand() {
        let args = Args {
            video: Some(PathBuf::from("clip.mp4")),
            command: Some(Commands::Doctor),
            ..base_args()
        };
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_verbosity_methods() {
        assert!(!Verbosity::Quiet.show_progress());
        assert!(Verbosity::Normal.show_progress());

        assert!(!Verbosity::Normal.show_events());
        assert!(Verbosity::Verbose.show_events());
    }
}
