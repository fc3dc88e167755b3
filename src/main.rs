//! facetrack - Main CLI Entry Point

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use facetrack::{
    bootstrap::{Bootstrap, BootstrapStatus, EXIT_CODE_SETUP_NEEDED},
    cli::{Args, Commands},
    config::Config,
    doctor::Doctor,
    model::FaceLandmarker,
    setup::{self, EnvLayout, SetupOptions},
    tracker::Tracker,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Err(msg) = args.validate() {
        eprintln!("{} {}", "Error:".red(), msg);
        std::process::exit(1);
    }

    match &args.command {
        Some(Commands::Setup { force }) => {
            run_setup(&args, *force).await?;
        }
        Some(Commands::Doctor) => {
            run_doctor(&args).await;
        }
        Some(Commands::Config) => {
            show_config(&args)?;
        }
        Some(Commands::Clean { models }) => {
            clean_state(&args, *models).await?;
        }
        None => {
            run_extract(&args).await?;
        }
    }

    Ok(())
}

/// Extract landmarks from the input video into the output JSON document
async fn run_extract(args: &Args) -> Result<()> {
    let video_path = args.video_path();
    let verbosity = args.verbosity();

    println!("🎬 Processing video: {}", video_path.display());
    println!("📄 Output file: {}", args.output.display());

    // Verify the input exists before touching anything else
    if !video_path.exists() {
        eprintln!(
            "\n{} Video not found at {}",
            "❌".red(),
            video_path.display()
        );
        eprintln!("📁 Make sure the file exists, or pass a path: facetrack <VIDEO>");
        std::process::exit(1);
    }

    let config = load_config(args)?;
    let layout = EnvLayout::resolve(
        args.state_dir(),
        args.model_dir.clone().or(config.model.dir_override.clone()),
    );

    // Preflight: tools and model assets
    let bootstrap = Bootstrap::new(layout.clone());
    match bootstrap.check().await? {
        BootstrapStatus::Ready => {}
        BootstrapStatus::ToolMissing(tool) => {
            Bootstrap::show_tool_install_instructions(&tool);
            std::process::exit(EXIT_CODE_SETUP_NEEDED);
        }
        BootstrapStatus::ModelMissing(path) => {
            Bootstrap::show_setup_instructions(&path);
            std::process::exit(EXIT_CODE_SETUP_NEEDED);
        }
    }

    if verbosity.show_events() {
        println!("🚀 Loading landmarker model...");
    }
    let landmarker = FaceLandmarker::load(&layout.models_dir)?;

    let tracker = Tracker::new(landmarker, config.clone());
    let doc = tracker.process(&video_path, verbosity).await?;

    doc.save(&args.output, config.output.pretty)?;

    // Closing stats
    let total = doc.metadata.frame_count;
    let with_face = doc.metadata.frames_with_face;

    println!("\n{}", "=".repeat(50));
    println!("📈 Extraction summary");
    println!("{}", "=".repeat(50));
    println!("📹 Total frames: {}", total);
    println!("👤 Frames with face: {}", with_face);
    if total > 0 {
        println!(
            "🎯 Detection rate: {:.2}%",
            with_face as f64 / total as f64 * 100.0
        );
    }
    println!("{}", "-".repeat(50));
    println!("✅ JSON saved to: {}", args.output.display());

    Ok(())
}

async fn run_setup(args: &Args, force: bool) -> Result<()> {
    let config = load_config(args)?;
    let layout = EnvLayout::resolve(
        args.state_dir(),
        args.model_dir.clone().or(config.model.dir_override),
    );

    let options = SetupOptions {
        force,
        show_progress: args.verbosity().show_progress(),
    };

    match setup::run_setup(&layout, options).await {
        Ok(_) => Ok(()),
        Err(e) => {
            eprintln!("\n{} Setup failed: {}", "❌".red(), e);
            std::process::exit(1);
        }
    }
}

async fn run_doctor(args: &Args) {
    let layout = EnvLayout::at(args.state_dir());
    let doctor = Doctor::new(layout);

    let checks = doctor.run_diagnostics().await;
    Doctor::display_results(&checks);

    std::process::exit(if Doctor::overall_status(&checks) { 0 } else { 1 });
}

fn show_config(args: &Args) -> Result<()> {
    let config = load_config(args)?;
    let layout = EnvLayout::at(args.state_dir());

    println!("\nfacetrack configuration");
    println!("{}", "=".repeat(50));
    println!("State directory:  {}", layout.root.display());
    println!("Model directory:  {}", layout.models_dir.display());
    println!();
    println!("Model:");
    println!("  Presence threshold: {}", config.model.presence_threshold);
    println!();
    println!("Output:");
    println!("  Pretty JSON:   {}", config.output.pretty);
    println!("  Key pad width: {}", config.output.pad_width);
    println!();

    Ok(())
}

async fn clean_state(args: &Args, models: bool) -> Result<()> {
    use tokio::fs;

    let layout = EnvLayout::at(args.state_dir());

    if !layout.root.exists() {
        println!("No state directory found.");
        return Ok(());
    }

    if models {
        fs::remove_dir_all(&layout.root).await?;
        println!("✓ Cleaned state directory: {}", layout.root.display());
    } else {
        // Keep downloaded model assets; they are expensive to re-fetch
        for name in ["manifest.toml", "env.sh", "env.bat"] {
            let path = layout.root.join(name);
            if path.exists() {
                fs::remove_file(&path).await?;
            }
        }
        println!(
            "✓ Cleaned state files (kept models; use --models to remove them)"
        );
    }

    Ok(())
}

fn load_config(args: &Args) -> Result<Config> {
    match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}
