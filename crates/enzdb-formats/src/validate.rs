//! Measurement table sanity checks.
//!
//! Every experiment runs through these checks at upload and again on every
//! load from disk, so a table that reaches analysis code is known to be
//! well formed.

use std::collections::HashSet;

use regex::Regex;

use enzdb_core::PARENT_SENTINEL;

use crate::smiles::is_valid_smiles;
use crate::table::{missing_columns, RawTable};
use crate::ParseError;

/// Well coordinates of a 96-well plate, with an optional leading zero in
/// the column number ("A1" and "A01" are both accepted).
const WELL_PATTERN: &str = r"^[A-H](0?[1-9]|1[0-2])$";

/// Validates a parsed measurement CSV.
///
/// Checks run in a fixed order and the first failure wins: the table must
/// have rows, carry all required columns, contain at least one parent row,
/// hold only valid SMILES, use well-formed well coordinates, and never
/// repeat a well within one `(substrate, plate)` group.
pub fn validate_variant_table(raw: &RawTable) -> Result<(), ParseError> {
    if raw.is_empty() {
        return Err(ParseError::EmptyTable);
    }

    let missing = missing_columns(raw);
    if !missing.is_empty() {
        return Err(ParseError::MissingColumns(missing.join(", ")));
    }
    let column = |name: &str| {
        raw.column(name)
            .ok_or_else(|| ParseError::MissingColumns(name.to_string()))
    };
    let smiles_col = column("smiles")?;
    let plate_col = column("plate")?;
    let well_col = column("well")?;
    let substitutions_col = column("substitutions")?;

    if !(0..raw.len()).any(|i| raw.cell(i, substitutions_col) == PARENT_SENTINEL) {
        return Err(ParseError::MissingParent);
    }

    let invalid_smiles: Vec<usize> = (0..raw.len())
        .filter(|&i| !is_valid_smiles(raw.cell(i, smiles_col)))
        .collect();
    if !invalid_smiles.is_empty() {
        return Err(ParseError::InvalidSmiles(invalid_smiles));
    }

    let well_shape = Regex::new(WELL_PATTERN)?;
    for i in 0..raw.len() {
        let well = raw.cell(i, well_col);
        if !well_shape.is_match(well) {
            return Err(ParseError::MalformedWell {
                well: well.to_string(),
                row: i,
            });
        }
    }

    let mut seen: HashSet<(&str, &str, &str)> = HashSet::new();
    for i in 0..raw.len() {
        let key = (
            raw.cell(i, smiles_col),
            raw.cell(i, plate_col),
            raw.cell(i, well_col),
        );
        if !seen.insert(key) {
            return Err(ParseError::DuplicateWell {
                well: key.2.to_string(),
                smiles: key.0.to_string(),
                plate: key.1.to_string(),
                row: i,
            });
        }
    }

    Ok(())
}
