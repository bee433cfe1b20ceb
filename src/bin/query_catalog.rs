use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use marine_catalog_lib::models::{DetectionMethod, SpeciesGroup};
use marine_catalog_lib::services::{read_catalog, CatalogQuery};

/// Filter a written catalog the way the serving layer does
#[derive(Parser, Debug)]
#[command(name = "query_catalog")]
#[command(version)]
struct Args {
    /// Catalog JSON written by marine-catalog
    catalog: PathBuf,

    /// Exact phylum name, e.g. Mollusca or Unknown
    #[arg(long)]
    phylum: Option<String>,

    /// known_pattern, scientific_name or context
    #[arg(long)]
    method: Option<DetectionMethod>,

    /// Case-insensitive substring of the common or scientific name
    #[arg(long)]
    search: Option<String>,

    #[arg(long)]
    min_confidence: Option<f64>,

    /// Print matching groups as JSON instead of a table
    #[arg(long)]
    json: bool,
}

fn preview(s: &str, max_chars: usize) -> String {
    let mut out: String = s.chars().take(max_chars).collect();
    if s.chars().count() > max_chars {
        out.push_str("...");
    }
    out
}

fn print_table(groups: &[&SpeciesGroup]) {
    println!(
        "{:>4}  {:<24} {:<26} {:<14} {:<16} {:>5} {:>8}  {}",
        "id", "common_name", "scientific_name", "phylum", "method", "conf", "mentions", "first"
    );
    for g in groups {
        println!(
            "{:>4}  {:<24} {:<26} {:<14} {:<16} {:>5.2} {:>8}  {}",
            g.id,
            preview(&g.common_name, 24),
            preview(g.scientific_name.as_deref().unwrap_or("-"), 26),
            g.phylum,
            g.detection_method.as_str(),
            g.confidence,
            g.total_mentions,
            g.first_timestamp
        );
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let catalog = read_catalog(&args.catalog)
        .with_context(|| format!("Failed to load catalog {}", args.catalog.display()))?;

    let query = CatalogQuery {
        phylum: args.phylum,
        method: args.method,
        search: args.search,
        min_confidence: args.min_confidence,
    };
    let hits = catalog.query(&query);

    if args.json {
        let json = serde_json::to_string_pretty(&hits).context("Failed to serialize results")?;
        println!("{}", json);
    } else {
        print_table(&hits);
        println!();
        println!("{} of {} species", hits.len(), catalog.stats().total_species);
    }

    Ok(())
}
