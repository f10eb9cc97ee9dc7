//! Disk-backed storage for directed-evolution experiments.
//!
//! Experiments live under a data directory as one subdirectory per
//! experiment holding a metadata JSON, the measurement CSV and a structure
//! file. The [`store::Catalog`] keeps an insertion-ordered metadata
//! registry in memory, loads full experiments lazily through a small LRU
//! cache, and never hard-deletes anything.

pub mod export;
pub mod index;
pub mod lru;
pub mod metadata;
pub mod settings;
pub mod store;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("CONFIGURATION ERROR: {0}")]
    Config(String),
    #[error("Invalid experiment: {0}")]
    InvalidExperiment(String),
    #[error("The uploaded measurement file already exists in the catalog as '{id}' ({name})")]
    Duplicate { id: String, name: String },
    #[error("Experiment '{0}' was not found on disk")]
    NotFound(String),
    #[error(transparent)]
    Parse(#[from] enzdb_formats::ParseError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Configuration file error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub use metadata::{ExperimentMetadata, MutagenesisMethod};
pub use settings::Settings;
pub use store::{Catalog, ExperimentFiles, ExperimentUpload};
