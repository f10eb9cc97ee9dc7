//! Variant table types shared across the workspace.
//!
//! A [`VariantTable`] is the in-memory form of one experiment's measurement
//! CSV. Row order always matches file order because downstream grouping and
//! reporting are defined in terms of first-appearance order.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Substitution sentinel marking a well that holds the unmodified parent.
pub const PARENT_SENTINEL: &str = "#PARENT#";

/// One measured variant well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantRow {
    /// Substrate identity as a SMILES string.
    pub smiles: String,
    /// Plate identifier, e.g. `"Plate 1"`.
    pub plate: String,
    /// Well coordinate, e.g. `"A1"` or `"H12"`.
    pub well: String,
    /// Substitution summary such as `"K99R_R118C"`, or [`PARENT_SENTINEL`].
    pub substitutions: String,
    /// Raw fitness cell, kept as text. `None` when the cell was empty.
    pub fitness: Option<String>,
    /// Sequencing read count backing the variant call.
    pub alignment_count: String,
    /// Confidence of the variant call.
    pub alignment_probability: String,
}

impl VariantRow {
    /// True for rows carrying the unmodified parent enzyme.
    pub fn is_parent(&self) -> bool {
        self.substitutions == PARENT_SENTINEL
    }
}

/// An experiment's variant rows in file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantTable {
    rows: Vec<VariantRow>,
}

impl VariantTable {
    pub fn new(rows: Vec<VariantRow>) -> Self {
        VariantTable { rows }
    }

    pub fn rows(&self) -> &[VariantRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct substrate SMILES in first-appearance order.
    pub fn substrates(&self) -> Vec<String> {
        unique_in_order(self.rows.iter().map(|r| r.smiles.as_str()))
    }

    /// Distinct plate identifiers in first-appearance order.
    pub fn plates(&self) -> Vec<String> {
        unique_in_order(self.rows.iter().map(|r| r.plate.as_str()))
    }
}

fn unique_in_order<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for value in values {
        if seen.insert(value) {
            out.push(value.to_string());
        }
    }
    out
}
