//! Sequence-similarity search across the experiment catalog.
//!
//! Aligns a query protein against every stored parent sequence, keeps the
//! hits above a similarity threshold, and joins each hit with its
//! experiment's metadata and hot/cold spot analysis. The alignment text is
//! decorated with per-residue annotation rows so a client can render the
//! match with mutation sites highlighted.

pub mod assemble;
pub mod decorate;

use thiserror::Error;

use enzdb_catalog::CatalogError;
use enzdb_core::{AlignError, AnalyticsError};

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Index {index} is out of the valid range (1 to {length})")]
    IndexOutOfRange { index: usize, length: usize },
    #[error("Alignment text is malformed: {0}")]
    MalformedAlignment(String),
    #[error(transparent)]
    Align(#[from] AlignError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),
}

pub use assemble::{
    find_matching_sequences, find_related_variants, sanitize_sequence, ExperimentSpotRow,
    MatchReport, MatchRow, RelatedVariantRow,
};
pub use decorate::{decorate_alignment, mismatch_indices};
