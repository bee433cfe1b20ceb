//! marine-catalog: turn an expedition subtitle transcript into a species catalog.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use marine_catalog_lib::init_logging;
use marine_catalog_lib::services::{
    render_report, write_catalog, Analyzer, AppConfig, ConfigStore, DetectionSensitivity,
};
use tracing::info;

/// Command-line arguments for marine-catalog
#[derive(Parser, Debug)]
#[command(name = "marine-catalog")]
#[command(about = "Extract a marine species catalog from a subtitle transcript")]
#[command(version)]
struct Args {
    /// Transcript file (SRT/VTT cue blocks or bracketed cue lines)
    input: PathBuf,

    /// Where to write the catalog JSON
    #[arg(short, long, default_value = "marine_species_catalog.json")]
    out: PathBuf,

    /// Config file (defaults to the user config directory)
    #[arg(short, long, env = "MARINE_CATALOG_CONFIG")]
    config: Option<PathBuf>,

    /// Minimum-confidence preset for keeping detections
    #[arg(short, long, value_parser = ["low", "medium", "high"])]
    sensitivity: Option<String>,

    /// JSON map of cue timestamps to thumbnail images
    #[arg(long)]
    thumbnails: Option<PathBuf>,

    /// Print a per-phylum text report after writing the catalog
    #[arg(long)]
    report: bool,

    /// Persist the effective config (with CLI overrides) before analyzing
    #[arg(long)]
    save_config: bool,
}

fn apply_overrides(config: &mut AppConfig, args: &Args) {
    if let Some(sensitivity) = &args.sensitivity {
        config.analysis.sensitivity = DetectionSensitivity::from_str(sensitivity);
    }
    if let Some(thumbnails) = &args.thumbnails {
        config.analysis.thumbnails_index = Some(thumbnails.clone());
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = init_logging();

    let store = match &args.config {
        Some(path) => ConfigStore::for_file(path.clone()),
        None => ConfigStore::new(ConfigStore::default_config_dir().unwrap_or_else(|| PathBuf::from("."))),
    };
    let mut config = store
        .load()
        .with_context(|| format!("Failed to load config from {}", store.config_file().display()))?;

    apply_overrides(&mut config, &args);

    if args.save_config {
        store
            .save(&config)
            .with_context(|| format!("Failed to save config to {}", store.config_file().display()))?;
        info!(path = %store.config_file().display(), "config.saved");
    }

    info!(
        input = %args.input.display(),
        out = %args.out.display(),
        sensitivity = config.analysis.sensitivity.as_str(),
        "analysis.starting"
    );

    let analyzer = Analyzer::from_config(&config).context("Failed to load reference data")?;
    let catalog = analyzer
        .analyze_file(&args.input)
        .context("Failed to analyze transcript")?;
    write_catalog(&catalog, &args.out)
        .with_context(|| format!("Failed to write catalog to {}", args.out.display()))?;

    if args.report {
        print!("{}", render_report(&catalog, 3));
    } else {
        let stats = catalog.stats();
        println!(
            "{} species ({} cues, {} warnings), mean confidence {:.2} -> {}",
            stats.total_species,
            catalog.metadata().total_cues,
            catalog.parse_warnings().len(),
            stats.avg_confidence,
            args.out.display()
        );
    }

    Ok(())
}
