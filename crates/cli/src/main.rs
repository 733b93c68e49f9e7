//! Maintenance CLI for the platelens retrieval engine.
//!
//! Inspects a data directory (stats, listings) and runs index rebuilds.
//! Rebuilds and searches need the CLIP embedder, which ships behind the
//! `clip` feature; the inspection commands work on any build.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use platelens_core::storage::ArtifactStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "platelens")]
#[command(about = "platelens: visual similarity retrieval over a food catalog")]
struct Cli {
    /// Data directory holding catalog.json, identity.json, vectors.idx and images/
    #[arg(long, default_value = "data", global = true)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Show catalog and index counters.
    Stats,
    /// List every catalog record, indexed or not.
    List,
    /// Rebuild the vector index from the catalog and its images.
    Rebuild {
        /// Path to the CLIP visual ONNX model.
        #[arg(long, default_value = "models/clip_visual.onnx")]
        model: PathBuf,
    },
    /// Search the catalog with a query image.
    Search {
        /// Query image file.
        #[arg(value_name = "IMAGE")]
        image: PathBuf,
        /// Number of results to return.
        #[arg(short, long, default_value_t = 3)]
        top_k: usize,
        /// Path to the CLIP visual ONNX model.
        #[arg(long, default_value = "models/clip_visual.onnx")]
        model: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Stats => stats(&cli.data_dir),
        Commands::List => list(&cli.data_dir),
        Commands::Rebuild { model } => rebuild(&cli.data_dir, &model),
        Commands::Search {
            image,
            top_k,
            model,
        } => search(&cli.data_dir, &image, top_k, &model),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn stats(data_dir: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let store = ArtifactStore::open(data_dir)?;
    let catalog = store.load_catalog()?;

    println!("Data directory: {}", store.data_dir().display());
    println!("  Catalog records: {}", catalog.len());

    // Peek at the pair without an embedder; a torn pair is reported, not
    // repaired, from here.
    match store.load_index_pair(platelens_core::EngineConfig::default().embedding_dim) {
        Ok(Some((index, _))) => println!("  Indexed vectors: {}", index.len()),
        Ok(None) => println!("  Indexed vectors: 0 (no index on disk)"),
        Err(e) => println!("  Index state: {} (run `platelens rebuild`)", e),
    }

    Ok(())
}

fn list(data_dir: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let store = ArtifactStore::open(data_dir)?;
    let catalog = store.load_catalog()?;

    println!("{} record(s)", catalog.len());
    for record in catalog.records() {
        let marker = if store.image_exists(&record.image_file) {
            ""
        } else {
            "  [image missing]"
        };
        println!(
            "  {}  {} ({} kcal, Rp{}){}",
            record.id, record.name, record.calories, record.price, marker
        );
    }

    Ok(())
}

#[cfg(feature = "clip")]
fn open_engine(
    data_dir: &PathBuf,
    model: &PathBuf,
) -> Result<platelens_core::RetrievalEngine, Box<dyn std::error::Error>> {
    use std::sync::Arc;

    use platelens_core::embedding::{CachedEmbedder, ClipEmbedder};
    use platelens_core::EngineConfig;

    let embedder = CachedEmbedder::with_default_size(ClipEmbedder::new(model)?);
    let engine = platelens_core::RetrievalEngine::open(
        EngineConfig::new(data_dir.clone()),
        Arc::new(embedder),
    )?;
    Ok(engine)
}

#[cfg(feature = "clip")]
fn rebuild(data_dir: &PathBuf, model: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_engine(data_dir, model)?;
    let report = engine.rebuild()?;
    println!(
        "Rebuilt index: {} indexed, {} skipped",
        report.indexed, report.skipped
    );
    Ok(())
}

#[cfg(feature = "clip")]
fn search(
    data_dir: &PathBuf,
    image: &PathBuf,
    top_k: usize,
    model: &PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_engine(data_dir, model)?;
    let bytes = std::fs::read(image)?;

    let matches = engine.search(&bytes, top_k)?;
    if matches.is_empty() {
        println!("No matches (index is empty).");
        return Ok(());
    }

    for (rank, m) in matches.iter().enumerate() {
        println!(
            "{}. {} ({}), confidence {:.2}, distance {:.4}",
            rank + 1,
            m.record.name,
            m.record.id,
            m.confidence,
            m.distance
        );
    }

    Ok(())
}

#[cfg(not(feature = "clip"))]
fn rebuild(_data_dir: &PathBuf, _model: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    Err("rebuild needs the CLIP embedder; reinstall with `--features clip`".into())
}

#[cfg(not(feature = "clip"))]
fn search(
    _data_dir: &PathBuf,
    _image: &PathBuf,
    _top_k: usize,
    _model: &PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    Err("search needs the CLIP embedder; reinstall with `--features clip`".into())
}
