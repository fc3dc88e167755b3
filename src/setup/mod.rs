//! Environment provisioning
//!
//! The `setup` subcommand: detect the decode tools, create the state
//! directory, write the pinned manifest, fetch model assets, write the
//! platform activation helper, and smoke-test the result. Steps run
//! sequentially; the first failure ends the run with a remediation hint.

pub mod manifest;

use crate::bootstrap::Bootstrap;
use crate::errors::{Result, TrackerError};
use crate::model::fetch;
use colored::Colorize;
use manifest::Manifest;
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// Resolved directory layout of the state directory
#[derive(Debug, Clone)]
pub struct EnvLayout {
    pub root: PathBuf,
    pub models_dir: PathBuf,
    pub manifest_path: PathBuf,
}

impl EnvLayout {
    /// Layout rooted at the given state directory
    pub fn at(root: PathBuf) -> Self {
        EnvLayout {
            models_dir: root.join("models"),
            manifest_path: root.join("manifest.toml"),
            root,
        }
    }

    /// Layout with an optional model directory override
    pub fn resolve(root: PathBuf, model_dir_override: Option<PathBuf>) -> Self {
        let mut layout = Self::at(root);
        if let Some(dir) = model_dir_override {
            layout.models_dir = dir;
        }
        layout
    }

    /// Path of the activation helper for the given platform
    pub fn helper_path(&self, platform: Platform) -> PathBuf {
        self.root.join(platform.helper_filename())
    }
}

/// Target platform for the activation helper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Unix,
    Windows,
}

impl Platform {
    /// Detect the platform, consulting OSTYPE first and falling back to
    /// the compile-time OS. OSTYPE is shell-local and often absent.
    pub fn detect() -> Self {
        let ostype = std::env::var("OSTYPE").ok();
        Self::from_os_hints(ostype.as_deref(), std::env::consts::OS)
    }

    fn from_os_hints(ostype: Option<&str>, os: &str) -> Self {
        if let Some(t) = ostype {
            let t = t.to_ascii_lowercase();
            if t.starts_with("msys") || t.starts_with("cygwin") || t.starts_with("win") {
                return Platform::Windows;
            }
            if !t.is_empty() {
                return Platform::Unix;
            }
        }

        if os == "windows" {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }

    pub fn helper_filename(&self) -> &'static str {
        match self {
            Platform::Unix => "env.sh",
            Platform::Windows => "env.bat",
        }
    }
}

/// Provisioning options from the CLI
#[derive(Debug, Clone, Copy)]
pub struct SetupOptions {
    pub force: bool,
    pub show_progress: bool,
}

/// Run the full provisioning sequence. Returns `Ok(false)` when the user
/// declines to re-provision an existing environment.
pub async fn run_setup(layout: &EnvLayout, options: SetupOptions) -> Result<bool> {
    let platform = Platform::detect();

    // Step 1: decode tools
    step(options, 1, "Checking decode tools");
    for tool in ["ffmpeg", "ffprobe"] {
        match Bootstrap::probe_tool(tool).await? {
            Some(version) => {
                if options.show_progress {
                    println!("  {} {} {}", "✓".green(), tool, version);
                }
            }
            None => {
                Bootstrap::show_tool_install_instructions(tool);
                return Err(TrackerError::ToolMissing(tool.to_string()));
            }
        }
    }

    // Step 2: state directory
    step(options, 2, "Creating environment directory");
    if layout.root.exists() && !options.force {
        let stdin = std::io::stdin();
        if !confirm_reprovision(&layout.root, &mut stdin.lock())? {
            println!("Leaving existing environment untouched.");
            return Ok(false);
        }
    }
    // The model dir may live outside the root when overridden
    std::fs::create_dir_all(&layout.root)?;
    std::fs::create_dir_all(&layout.models_dir)?;

    // Step 3: pinned manifest
    step(options, 3, "Writing pinned manifest");
    let manifest = Manifest::pinned();
    manifest.write(&layout.manifest_path)?;

    // Step 4: model assets
    step(options, 4, "Fetching model assets");
    fetch::ensure_assets(&manifest, &layout.models_dir, options.show_progress).await?;

    // Step 5: activation helper
    step(options, 5, "Writing activation helper");
    let helper = write_activation_helper(layout, platform)?;
    if options.show_progress {
        println!("  {} {}", "✓".green(), helper.display());
    }

    // Step 6: smoke test
    step(options, 6, "Running smoke test");
    smoke_test(layout).await?;

    if options.show_progress {
        println!("\n{} Environment ready at {}", "✅".green(), layout.root.display());
        println!("   Activate with: source {}", helper.display());
    }

    Ok(true)
}

fn step(options: SetupOptions, n: usize, label: &str) {
    if options.show_progress {
        println!("\n[{}/6] {}", n, label);
    }
}

/// Ask before touching an existing environment directory
fn confirm_reprovision(root: &Path, input: &mut impl BufRead) -> Result<bool> {
    print!(
        "{} already exists. Re-provision it? [y/N] ",
        root.display()
    );
    use std::io::Write;
    std::io::stdout().flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(parse_confirmation(&line))
}

fn parse_confirmation(input: &str) -> bool {
    let answer = input.trim();
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}

/// Write the platform-specific activation helper and return its path
pub fn write_activation_helper(layout: &EnvLayout, platform: Platform) -> Result<PathBuf> {
    let path = layout.helper_path(platform);

    let contents = match platform {
        Platform::Unix => format!(
            "#!/bin/sh\n\
             # Generated by facetrack setup\n\
             export FACETRACK_HOME=\"{}\"\n\
             export FACETRACK_MODEL_DIR=\"{}\"\n\
             echo \"facetrack environment active (FACETRACK_HOME=$FACETRACK_HOME)\"\n",
            layout.root.display(),
            layout.models_dir.display()
        ),
        Platform::Windows => format!(
            "@echo off\r\n\
             rem Generated by facetrack setup\r\n\
             set FACETRACK_HOME={}\r\n\
             set FACETRACK_MODEL_DIR={}\r\n\
             echo facetrack environment active\r\n",
            layout.root.display(),
            layout.models_dir.display()
        ),
    };

    std::fs::write(&path, contents)?;

    #[cfg(unix)]
    if platform == Platform::Unix {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    }

    Ok(path)
}

/// Verify each pinned requirement of the provisioned environment: tool
/// versions, asset digests, and the weights file header.
pub async fn smoke_test(layout: &EnvLayout) -> Result<()> {
    let manifest = Manifest::load(&layout.manifest_path)?;

    for tool in &manifest.tools {
        match Bootstrap::probe_tool(&tool.name).await? {
            None => return Err(TrackerError::ToolMissing(tool.name.clone())),
            Some(version) => {
                if !version_meets(&version, &tool.min_version) {
                    return Err(TrackerError::Config(format!(
                        "{} {} is older than required {}",
                        tool.name, version, tool.min_version
                    )));
                }
            }
        }
    }

    manifest.verify_assets(&layout.models_dir)?;

    check_safetensors_header(&layout.models_dir.join(manifest::WEIGHTS_FILE))?;

    Ok(())
}

/// Compare dotted numeric version prefixes ("6.1.1-3ubuntu5" vs "4.0").
/// Unparseable versions pass; the probe already proved the tool runs.
fn version_meets(version: &str, min_version: &str) -> bool {
    fn numeric_prefix(s: &str) -> Vec<u64> {
        s.split('.')
            .map_while(|part| {
                let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
                digits.parse().ok()
            })
            .collect()
    }

    let got = numeric_prefix(version);
    let want = numeric_prefix(min_version);
    if got.is_empty() {
        return true;
    }

    // Elementwise compare, treating missing components as zero
    for i in 0..got.len().max(want.len()) {
        let g = got.get(i).copied().unwrap_or(0);
        let w = want.get(i).copied().unwrap_or(0);
        if g != w {
            return g > w;
        }
    }
    true
}

/// Validate the safetensors container: an 8-byte little-endian header
/// length followed by a JSON header.
fn check_safetensors_header(path: &Path) -> Result<()> {
    let bytes = std::fs::read(path)?;

    if bytes.len() < 8 {
        return Err(TrackerError::Config(format!(
            "{} is too short to be a safetensors file",
            path.display()
        )));
    }

    let header_len = u64::from_le_bytes(bytes[..8].try_into().expect("slice is 8 bytes")) as usize;
    if bytes.len() < 8 + header_len {
        return Err(TrackerError::Config(format!(
            "{} has a truncated safetensors header",
            path.display()
        )));
    }

    serde_json::from_slice::<serde_json::Value>(&bytes[8..8 + header_len]).map_err(|_| {
        TrackerError::Config(format!(
            "{} does not carry a valid safetensors header",
            path.display()
        ))
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let layout = EnvLayout::at(PathBuf::from("/home/user/.facetrack"));
        assert_eq!(layout.models_dir, PathBuf::from("/home/user/.facetrack/models"));
        assert_eq!(
            layout.manifest_path,
            PathBuf::from("/home/user/.facetrack/manifest.toml")
        );
    }

    #[test]
    fn test_layout_model_dir_override() {
        let layout = EnvLayout::resolve(
            PathBuf::from("/home/user/.facetrack"),
            Some(PathBuf::from("/opt/models")),
        );
        assert_eq!(layout.models_dir, PathBuf::from("/opt/models"));
    }

    #[test]
    fn test_platform_from_ostype() {
        assert_eq!(
            Platform::from_os_hints(Some("linux-gnu"), "linux"),
            Platform::Unix
        );
        assert_eq!(
            Platform::from_os_hints(Some("darwin23"), "macos"),
            Platform::Unix
        );
        assert_eq!(
            Platform::from_os_hints(Some("msys"), "windows"),
            Platform::Windows
        );
        assert_eq!(
            Platform::from_os_hints(Some("cygwin"), "windows"),
            Platform::Windows
        );
    }

    #[test]
    fn test_platform_falls_back_to_compile_time_os() {
        assert_eq!(Platform::from_os_hints(None, "windows"), Platform::Windows);
        assert_eq!(Platform::from_os_hints(None, "linux"), Platform::Unix);
        assert_eq!(Platform::from_os_hints(Some(""), "macos"), Platform::Unix);
    }

    #[test]
    fn test_helper_filename_matches_platform() {
        assert_eq!(Platform::Unix.helper_filename(), "env.sh");
        assert_eq!(Platform::Windows.helper_filename(), "env.bat");
    }

    #[test]
    fn test_version_meets() {
        assert!(version_meets("6.1.1-3ubuntu5", "4.0"));
        assert!(version_meets("4.0", "4.0"));
        assert!(version_meets("4", "4.0"));
        assert!(!version_meets("3.4.8", "4.0"));
        // Distro builds with opaque version strings pass on presence alone
        assert!(version_meets("n7.0-static", "4.0"));
    }

    #[test]
    fn test_parse_confirmation() {
        assert!(parse_confirmation("y\n"));
        assert!(parse_confirmation("Y\n"));
        assert!(parse_confirmation("yes\n"));
        assert!(!parse_confirmation("\n"));
        assert!(!parse_confirmation("n\n"));
        assert!(!parse_confirmation("nope\n"));
    }

    #[test]
    fn test_confirm_reprovision_reads_answer() {
        let root = PathBuf::from("/tmp/facetrack-test");
        let mut yes = std::io::Cursor::new(b"y\n".to_vec());
        assert!(confirm_reprovision(&root, &mut yes).unwrap());

        let mut no = std::io::Cursor::new(b"n\n".to_vec());
        assert!(!confirm_reprovision(&root, &mut no).unwrap());
    }

    #[test]
    fn test_write_activation_helper_unix() {
        let dir = tempfile::tempdir().unwrap();
        let layout = EnvLayout::at(dir.path().to_path_buf());
        std::fs::create_dir_all(&layout.root).unwrap();

        let path = write_activation_helper(&layout, Platform::Unix).unwrap();
        assert_eq!(path.file_name().unwrap(), "env.sh");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("export FACETRACK_HOME="));
        assert!(contents.contains("export FACETRACK_MODEL_DIR="));
    }

    #[test]
    fn test_write_activation_helper_windows() {
        let dir = tempfile::tempdir().unwrap();
        let layout = EnvLayout::at(dir.path().to_path_buf());
        std::fs::create_dir_all(&layout.root).unwrap();

        let path = write_activation_helper(&layout, Platform::Windows).unwrap();
        assert_eq!(path.file_name().unwrap(), "env.bat");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("set FACETRACK_HOME="));
    }

    #[test]
    fn test_safetensors_header_valid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.safetensors");

        let header = br#"{"__metadata__":{"format":"pt"}}"#;
        let mut bytes = (header.len() as u64).to_le_bytes().to_vec();
        bytes.extend_from_slice(header);
        std::fs::write(&path, bytes).unwrap();

        assert!(check_safetensors_header(&path).is_ok());
    }

    #[test]
    fn test_safetensors_header_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.safetensors");
        std::fs::write(&path, b"pk\x03\x04 not safetensors").unwrap();

        assert!(check_safetensors_header(&path).is_err());
    }

    #[test]
    fn test_safetensors_header_rejects_short_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.safetensors");
        std::fs::write(&path, b"abc").unwrap();

        assert!(check_safetensors_header(&path).is_err());
    }
}
