//! Error types for the catalog library.
//!
//! Parse problems inside a transcript are not errors: they become
//! [`crate::models::ParseWarning`]s. Everything here aborts the run.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    /// Input transcript, reference table or config could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Catalog, backup or config could not be written
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON file on disk did not match the expected shape
    #[error("Invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Lexicon or taxonomy table is unusable (bad pattern, empty name)
    #[error("Invalid reference data: {0}")]
    ReferenceData(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
