// Marine Catalog Core Services
// Transcript in, species catalog out

pub mod text_processor;
pub mod cue_parser;
pub mod detection;
pub mod thumbnails;
pub mod config_store;
pub mod analyzer;
pub mod catalog_store;
pub mod report;

pub use cue_parser::parse_cues;
pub use config_store::*;
pub use analyzer::Analyzer;
pub use catalog_store::{catalog_to_json, read_catalog, write_catalog};
pub use report::render_report;
pub use thumbnails::ThumbnailIndex;

// Re-export detection module items
pub use detection::{
    CatalogQuery,
    DetectionSensitivity,
    Lexicon,
    ScoringWeights,
    TaxonomyClassifier,
};
