//! Bootstrap system for facetrack
//!
//! Detects the external decode tools and provisioned model assets, and
//! handles setup guidance when something is missing.

use crate::errors::Result;
use crate::setup::EnvLayout;
use std::path::PathBuf;
use tokio::process::Command;

/// Preflight detector for the extraction path
pub struct Bootstrap {
    layout: EnvLayout,
}

/// Bootstrap check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapStatus {
    Ready,
    ToolMissing(String),
    ModelMissing(PathBuf),
}

impl Bootstrap {
    /// Create a new bootstrap detector
    pub fn new(layout: EnvLayout) -> Self {
        Self { layout }
    }

    /// Probe a tool on PATH by running `<tool> -version`.
    /// `Ok(None)` when the binary is absent; the parsed version otherwise.
    pub async fn probe_tool(name: &str) -> Result<Option<String>> {
        let output = match Command::new(name).arg("-version").output().await {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if !output.status.success() {
            return Ok(None);
        }

        Ok(Some(parse_version_line(&String::from_utf8_lossy(
            &output.stdout,
        ))))
    }

    /// Run the complete bootstrap check: tools first, then model assets.
    /// The first failure wins.
    pub async fn check(&self) -> Result<BootstrapStatus> {
        for tool in ["ffmpeg", "ffprobe"] {
            if Self::probe_tool(tool).await?.is_none() {
                return Ok(BootstrapStatus::ToolMissing(tool.to_string()));
            }
        }

        for asset in [
            crate::setup::manifest::WEIGHTS_FILE,
            crate::setup::manifest::MODEL_CONFIG_FILE,
        ] {
            let path = self.layout.models_dir.join(asset);
            if !path.exists() {
                return Ok(BootstrapStatus::ModelMissing(path));
            }
        }

        Ok(BootstrapStatus::Ready)
    }

    /// Display installation instructions for the decode tools
    pub fn show_tool_install_instructions(tool: &str) {
        eprintln!("\n❌ {} not found on PATH!", tool);
        eprintln!("\nffmpeg and ffprobe are required to decode video.");
        eprintln!("\n📦 Installation:");
        eprintln!("   Linux:   apt install ffmpeg  (or your distribution's equivalent)");
        eprintln!("   macOS:   brew install ffmpeg");
        eprintln!("\n📚 More info: https://ffmpeg.org/download.html");
        eprintln!();
    }

    /// Display instructions for provisioning the model assets
    pub fn show_setup_instructions(missing: &std::path::Path) {
        eprintln!("\n❌ Model asset missing: {}", missing.display());
        eprintln!("\nProvision the environment with:");
        eprintln!("   facetrack setup");
        eprintln!();
    }
}

/// First line of a `-version` banner, trimmed to the version token
/// ("ffmpeg version 6.1.1 ..." -> "6.1.1")
fn parse_version_line(stdout: &str) -> String {
    stdout
        .lines()
        .next()
        .unwrap_or("")
        .split_whitespace()
        .nth(2)
        .unwrap_or("unknown")
        .to_string()
}

/// Exit code for setup needed
pub const EXIT_CODE_SETUP_NEEDED: i32 = 2;
