//! Keel model inspector.
//!
//! Loads a model through the import pipeline and prints a summary of what
//! came out. Pipeline diagnostics go to the log; the summary goes to stdout.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use keel_assets::ModelLoader;
use keel_core::ProjectPaths;

/// Inspect a model file through the Keel import pipeline.
#[derive(Parser)]
#[command(name = "keel", version, about)]
struct Args {
    /// Model file, absolute or relative to the project root.
    model: PathBuf,

    /// Load as a skinned model with bones, skeleton and clip headers.
    #[arg(long)]
    skinned: bool,

    /// Project directory holding keel.toml.
    #[arg(long, default_value = ".")]
    project: PathBuf,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    let paths = ProjectPaths::load(&args.project);
    let mut loader = ModelLoader::new(paths);

    info!("Importing {}", args.model.display());

    if args.skinned {
        let model = loader.load_skinned_model(&args.model)?;
        println!("source:    {}", model.source.display());
        println!("meshes:    {}", model.meshes.len());
        println!("vertices:  {}", model.vertex_count());
        println!("indices:   {}", model.index_count());
        println!(
            "materials: {}",
            model.meshes.iter().filter(|m| m.material.is_some()).count()
        );
        println!("bones:     {}", model.bones.len());
        if let Some(root) = &model.skeleton_root {
            println!(
                "skeleton:  {} nodes, depth {}",
                root.node_count(),
                root.depth()
            );
        }
        if model.animations.is_empty() {
            println!("clips:     none");
        } else {
            for clip in &model.animations {
                println!(
                    "clip:      '{}', {:.0} ticks at {:.0}/s",
                    clip.name, clip.duration, clip.ticks_per_second
                );
            }
        }
    } else {
        let model = loader.load_model(&args.model)?;
        println!("source:    {}", model.source.display());
        println!("meshes:    {}", model.meshes.len());
        println!("vertices:  {}", model.vertex_count());
        println!("indices:   {}", model.index_count());
        println!(
            "materials: {}",
            model.meshes.iter().filter(|m| m.material.is_some()).count()
        );
    }

    Ok(())
}
