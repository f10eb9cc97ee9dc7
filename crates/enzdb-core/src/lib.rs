//! Core domain logic for the enzyme engineering database.
//!
//! This crate owns the in-memory experiment model and everything computed
//! from it: fitness-ratio scoring, hot/cold spot extraction, residue
//! lookups and global protein alignment. It performs no I/O; parsing and
//! storage live in the `enzdb-formats` and `enzdb-catalog` crates.

pub mod align;
pub mod analytics;
pub mod blosum;
pub mod experiment;
pub mod lookup;
pub mod ratio;
pub mod variant;

pub use align::{
    align_pair, get_alignments, AlignError, AlignmentHit, PairwiseAlignment, ScoringParams,
};
pub use analytics::{
    hot_cold, processed_core, ssm_positions, ssm_site_profile, AnalyticsError, CoreRow, SpotKind,
    SpotRow, SsmObservation, SubstrateResidues,
};
pub use experiment::Experiment;
pub use lookup::lookup_residues;
pub use ratio::{compute_ratios, ScoredRow, ScoredTable, TRACE_FITNESS};
pub use variant::{VariantRow, VariantTable, PARENT_SENTINEL};
