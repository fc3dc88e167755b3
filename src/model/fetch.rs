//! Model asset acquisition
//!
//! Fetches the pinned landmarker assets into the models directory,
//! preferring the Hugging Face hub cache and falling back to the pinned
//! direct URL. Every fetched file is verified against its pinned digest.

use crate::errors::{Result, TrackerError};
use crate::setup::manifest::{sha256_file, AssetRequirement, Manifest};
use colored::Colorize;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Ensure every pinned asset is present and verified in `models_dir`.
/// Assets already on disk with a matching digest are not re-fetched.
pub async fn ensure_assets(
    manifest: &Manifest,
    models_dir: &Path,
    show_progress: bool,
) -> Result<()> {
    tokio::fs::create_dir_all(models_dir).await?;

    for asset in &manifest.assets {
        let dest = models_dir.join(&asset.filename);

        if dest.exists() && sha256_file(&dest)? == asset.sha256 {
            if show_progress {
                println!("  {} {} (cached)", "✓".green(), asset.filename);
            }
            continue;
        }

        fetch_asset(asset, &dest, show_progress).await?;
        verify_or_remove(asset, &dest)?;

        if show_progress {
            println!("  {} {}", "✓".green(), asset.filename);
        }
    }

    Ok(())
}

/// Fetch one asset: hub first, pinned URL second
async fn fetch_asset(asset: &AssetRequirement, dest: &Path, show_progress: bool) -> Result<()> {
    if show_progress {
        println!("Downloading {} ...", asset.filename);
    }

    match fetch_from_hub(asset, dest).await {
        Ok(()) => Ok(()),
        Err(hub_err) => {
            if show_progress {
                eprintln!(
                    "  {} hub fetch failed ({}), trying direct URL",
                    "!".yellow(),
                    hub_err
                );
            }
            fetch_from_url(asset, dest, show_progress).await
        }
    }
}

/// Resolve the asset through the Hugging Face hub cache and copy it into place
async fn fetch_from_hub(asset: &AssetRequirement, dest: &Path) -> Result<()> {
    let repo_id = asset.repo.clone();
    let revision = asset.revision.clone();
    let filename = asset.filename.clone();

    // hf-hub's API is blocking; keep it off the runtime threads
    let cached = tokio::task::spawn_blocking(move || {
        use hf_hub::{api::sync::Api, Repo, RepoType};

        let api = Api::new().map_err(|e| TrackerError::Download(e.to_string()))?;
        let repo = api.repo(Repo::with_revision(repo_id, RepoType::Model, revision));
        repo.get(&filename)
            .map_err(|e| TrackerError::Download(e.to_string()))
    })
    .await
    .map_err(|e| TrackerError::Download(e.to_string()))??;

    tokio::fs::copy(&cached, dest).await?;
    Ok(())
}

/// Stream the asset from its pinned URL with a progress bar
async fn fetch_from_url(asset: &AssetRequirement, dest: &Path, show_progress: bool) -> Result<()> {
    let response = reqwest::get(&asset.url).await?;

    if !response.status().is_success() {
        return Err(TrackerError::Download(format!(
            "{} returned status {}",
            asset.url,
            response.status()
        )));
    }

    let total_size = response.content_length().unwrap_or(0);
    let pb = if show_progress && total_size > 0 {
        let pb = ProgressBar::new(total_size);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                .unwrap()
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let mut file = tokio::fs::File::create(dest).await?;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        if let Some(ref pb) = pb {
            pb.inc(chunk.len() as u64);
        }
    }
    file.flush().await?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    Ok(())
}

/// Verify the digest; a mismatch removes the file and reports the manual
/// fallback so a bad download is never left in place.
fn verify_or_remove(asset: &AssetRequirement, dest: &Path) -> Result<()> {
    let got = sha256_file(dest)?;
    if got != asset.sha256 {
        let _ = std::fs::remove_file(dest);
        return Err(TrackerError::Download(format!(
            "Checksum mismatch for {}. Download it manually from {} and place it at {}",
            asset.filename,
            asset.url,
            dest.display()
        )));
    }
    Ok(())
}
