//! Measurement CSV access.

use csv::ReaderBuilder;
use enzdb_core::{VariantRow, VariantTable, PARENT_SENTINEL};

use crate::ParseError;

/// Columns every measurement CSV must carry.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "smiles",
    "plate",
    "well",
    "alignment_count",
    "substitutions",
    "alignment_probability",
    "aa_sequence",
    "fitness_value",
];

/// A measurement CSV read as text cells with its column layout preserved.
///
/// Cells are kept verbatim; numeric coercion happens later in scoring so
/// that prose cells like trace markers survive until then.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Reads a CSV byte buffer. Rows with a cell count different from the
    /// header fail the read.
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        let mut reader = ReaderBuilder::new().from_reader(bytes);
        let headers = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(RawTable { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a named column, if present.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell text at `(row, column)`, or the empty string when out of range.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Names from [`REQUIRED_COLUMNS`] absent in `raw`, in canonical order.
pub fn missing_columns(raw: &RawTable) -> Vec<&'static str> {
    REQUIRED_COLUMNS
        .iter()
        .filter(|name| raw.column(name).is_none())
        .copied()
        .collect()
}

/// Builds the retained variant table from a parsed CSV.
///
/// The full amino-acid sequence column is intentionally left behind; the
/// parent sequence is lifted into experiment metadata instead, see
/// [`extract_parent_sequence`]. An empty fitness cell becomes `None`.
pub fn build_variant_table(raw: &RawTable) -> Result<VariantTable, ParseError> {
    let missing = missing_columns(raw);
    if !missing.is_empty() {
        return Err(ParseError::MissingColumns(missing.join(", ")));
    }
    let column = |name: &str| {
        raw.column(name)
            .ok_or_else(|| ParseError::MissingColumns(name.to_string()))
    };
    let smiles = column("smiles")?;
    let plate = column("plate")?;
    let well = column("well")?;
    let substitutions = column("substitutions")?;
    let fitness = column("fitness_value")?;
    let alignment_count = column("alignment_count")?;
    let alignment_probability = column("alignment_probability")?;

    let rows = (0..raw.len())
        .map(|i| {
            let fitness_cell = raw.cell(i, fitness);
            VariantRow {
                smiles: raw.cell(i, smiles).to_string(),
                plate: raw.cell(i, plate).to_string(),
                well: raw.cell(i, well).to_string(),
                substitutions: raw.cell(i, substitutions).to_string(),
                fitness: if fitness_cell.trim().is_empty() {
                    None
                } else {
                    Some(fitness_cell.to_string())
                },
                alignment_count: raw.cell(i, alignment_count).to_string(),
                alignment_probability: raw.cell(i, alignment_probability).to_string(),
            }
        })
        .collect();
    Ok(VariantTable::new(rows))
}

/// Amino-acid sequence of the first parent row, if any.
pub fn extract_parent_sequence(raw: &RawTable) -> Option<String> {
    let substitutions = raw.column("substitutions")?;
    let aa_sequence = raw.column("aa_sequence")?;
    (0..raw.len())
        .find(|&i| raw.cell(i, substitutions) == PARENT_SENTINEL)
        .map(|i| raw.cell(i, aa_sequence).trim().to_string())
        .filter(|sequence| !sequence.is_empty())
}
