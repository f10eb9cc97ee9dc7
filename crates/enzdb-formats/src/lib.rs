//! Parsing and validation of experiment measurement files.
//!
//! Measurement data arrives as CSV with one row per assayed well. This
//! crate turns those bytes into an `enzdb_core` variant table and enforces
//! the sanity rules every stored experiment must satisfy.

pub mod smiles;
pub mod table;
pub mod validate;

use enzdb_core::VariantTable;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Experiment file has no data.")]
    EmptyTable,
    #[error("Experiment file is missing required columns: {0}")]
    MissingColumns(String),
    #[error("Experiment file does not contain any '#PARENT#' entry in the substitutions column.")]
    MissingParent,
    #[error("Experiment file has invalid SMILES strings at rows {0:?}")]
    InvalidSmiles(Vec<usize>),
    #[error("Malformed well '{well}' at row {row}")]
    MalformedWell { well: String, row: usize },
    #[error("Duplicate well '{well}' for substrate '{smiles}' on plate '{plate}' at row {row}")]
    DuplicateWell {
        well: String,
        smiles: String,
        plate: String,
        row: usize,
    },
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("Invalid CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Parses a measurement CSV and runs the full validation pass.
pub fn parse_and_validate(bytes: &[u8]) -> Result<VariantTable, ParseError> {
    let raw = table::RawTable::parse(bytes)?;
    validate::validate_variant_table(&raw)?;
    table::build_variant_table(&raw)
}
