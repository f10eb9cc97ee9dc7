//! Derived views over a scored variant table.
//!
//! Everything here works on the "processed core" of an experiment: rows with
//! a real measurement and a clean substitution summary, scored by
//! [`crate::ratio::compute_ratios`]. Hot/cold extraction and the single-site
//! views are defined on that core.

use std::cmp::Ordering;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ratio::compute_ratios;
use crate::variant::VariantTable;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Experiment table has no rows.")]
    EmptyTable,
    #[error("Hot/cold spot count must be at least 1, got {0}")]
    InvalidSpotCount(usize),
    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),
}

/// A scored row that survived processed-core filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreRow {
    pub smiles: String,
    pub plate: String,
    pub well: String,
    pub substitutions: String,
    pub fitness: f64,
    pub ratio: f64,
}

/// Classification of a row in a hot/cold report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpotKind {
    Hot,
    Cold,
}

impl std::fmt::Display for SpotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpotKind::Hot => write!(f, "Hot"),
            SpotKind::Cold => write!(f, "Cold"),
        }
    }
}

/// One row of a hot/cold report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotRow {
    pub smiles: String,
    pub plate: String,
    pub well: String,
    pub substitutions: String,
    pub fitness: f64,
    pub ratio: f64,
    pub kind: SpotKind,
}

/// Mutated-position summary for one substrate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstrateResidues {
    pub smiles: String,
    /// Positions mutated in the substrate's hot rows, sorted and unique.
    pub hot_indices: Vec<u32>,
    /// Positions mutated in the substrate's cold rows, sorted and unique.
    pub cold_indices: Vec<u32>,
    /// Positions mutated anywhere in the substrate's processed rows.
    pub exp_residues: Vec<u32>,
}

/// A single observed replacement at a site-saturation position.
#[derive(Debug, Clone, PartialEq)]
pub struct SsmObservation {
    pub replacement: char,
    pub ratio: f64,
}

/// Scores `table` and keeps only rows usable for variant-level analysis.
///
/// Dropped are rows whose substitution summary is empty or carries a
/// sentinel or deletion marker (`#` or `-`), and rows whose raw fitness
/// cell was empty. Row order is preserved.
pub fn processed_core(table: &VariantTable) -> Result<Vec<CoreRow>, AnalyticsError> {
    if table.is_empty() {
        return Err(AnalyticsError::EmptyTable);
    }
    let scored = compute_ratios(table);
    let core = table
        .rows()
        .iter()
        .zip(scored.rows())
        .filter(|(raw, _)| {
            let subs = raw.substitutions.as_str();
            !subs.is_empty() && !subs.contains('#') && !subs.contains('-')
        })
        .filter(|(raw, _)| raw.fitness.is_some())
        .map(|(_, scored_row)| CoreRow {
            smiles: scored_row.smiles.clone(),
            plate: scored_row.plate.clone(),
            well: scored_row.well.clone(),
            substitutions: scored_row.substitutions.clone(),
            fitness: scored_row.fitness,
            ratio: scored_row.ratio,
        })
        .collect();
    Ok(core)
}

/// Extracts the `n` best and `n` worst rows of every `(substrate, plate)`
/// group, plus per-substrate mutated-position summaries.
///
/// Groups are visited in substrate-then-plate first-appearance order. Within
/// a group, rows are ranked by fitness descending with ties kept in row
/// order. Groups smaller than `2n` contribute overlapping rows. All hot rows
/// precede all cold rows in the returned list.
pub fn hot_cold(
    table: &VariantTable,
    n: usize,
) -> Result<(Vec<SpotRow>, Vec<SubstrateResidues>), AnalyticsError> {
    if n == 0 {
        return Err(AnalyticsError::InvalidSpotCount(n));
    }
    let core = processed_core(table)?;

    let mut hot: Vec<&CoreRow> = Vec::new();
    let mut cold: Vec<&CoreRow> = Vec::new();
    for smiles in table.substrates() {
        for plate in table.plates() {
            let mut group: Vec<&CoreRow> = core
                .iter()
                .filter(|row| row.smiles == smiles && row.plate == plate)
                .collect();
            if group.is_empty() {
                continue;
            }
            group.sort_by(|a, b| {
                b.fitness.partial_cmp(&a.fitness).unwrap_or(Ordering::Equal)
            });
            hot.extend(group.iter().take(n));
            cold.extend(&group[group.len().saturating_sub(n)..]);
        }
    }

    let position = Regex::new(r"\d+")?;
    let mut profiles = Vec::new();
    for smiles in table.substrates() {
        if !core.iter().any(|row| row.smiles == smiles) {
            continue;
        }
        profiles.push(SubstrateResidues {
            hot_indices: mutated_positions(
                &position,
                hot.iter().filter(|r| r.smiles == smiles).copied(),
            ),
            cold_indices: mutated_positions(
                &position,
                cold.iter().filter(|r| r.smiles == smiles).copied(),
            ),
            exp_residues: mutated_positions(
                &position,
                core.iter().filter(|r| r.smiles == smiles),
            ),
            smiles,
        });
    }

    let rows = hot
        .iter()
        .map(|row| spot_row(row, SpotKind::Hot))
        .chain(cold.iter().map(|row| spot_row(row, SpotKind::Cold)))
        .collect();
    Ok((rows, profiles))
}

fn spot_row(row: &CoreRow, kind: SpotKind) -> SpotRow {
    SpotRow {
        smiles: row.smiles.clone(),
        plate: row.plate.clone(),
        well: row.well.clone(),
        substitutions: row.substitutions.clone(),
        fitness: row.fitness,
        ratio: row.ratio,
        kind,
    }
}

/// Sorted unique positions mentioned in the rows' substitution summaries.
fn mutated_positions<'a, R>(position: &Regex, rows: R) -> Vec<u32>
where
    R: Iterator<Item = &'a CoreRow>,
{
    let mut out: Vec<u32> = rows
        .flat_map(|row| {
            position
                .find_iter(&row.substitutions)
                .filter_map(|m| m.as_str().parse::<u32>().ok())
                .collect::<Vec<_>>()
        })
        .collect();
    out.sort_unstable();
    out.dedup();
    out
}

/// Positions probed by single-substitution rows of `smiles`, sorted and
/// unique. A single-substitution summary has the shape `A123B`.
pub fn ssm_positions(core: &[CoreRow], smiles: &str) -> Result<Vec<u32>, AnalyticsError> {
    let single = Regex::new(r"^[A-Z](\d+)[A-Z]$")?;
    let mut positions: Vec<u32> = core
        .iter()
        .filter(|row| row.smiles == smiles)
        .filter_map(|row| single.captures(&row.substitutions))
        .filter_map(|caps| caps[1].parse::<u32>().ok())
        .collect();
    positions.sort_unstable();
    positions.dedup();
    Ok(positions)
}

/// Replacements observed at one single-substitution position of `smiles`,
/// with their ratios, in row order.
pub fn ssm_site_profile(
    core: &[CoreRow],
    smiles: &str,
    position: u32,
) -> Result<Vec<SsmObservation>, AnalyticsError> {
    let single = Regex::new(r"^[A-Z](\d+)([A-Z])$")?;
    let mut observations = Vec::new();
    for row in core.iter().filter(|row| row.smiles == smiles) {
        let Some(caps) = single.captures(&row.substitutions) else {
            continue;
        };
        let Ok(site) = caps[1].parse::<u32>() else {
            continue;
        };
        if site != position {
            continue;
        }
        if let Some(replacement) = caps[2].chars().next() {
            observations.push(SsmObservation {
                replacement,
                ratio: row.ratio,
            });
        }
    }
    Ok(observations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::{VariantRow, PARENT_SENTINEL};
    use pretty_assertions::assert_eq;

    fn row(smiles: &str, plate: &str, well: &str, subs: &str, fitness: Option<&str>) -> VariantRow {
        VariantRow {
            smiles: smiles.to_string(),
            plate: plate.to_string(),
            well: well.to_string(),
            substitutions: subs.to_string(),
            fitness: fitness.map(str::to_string),
            alignment_count: "10".to_string(),
            alignment_probability: "1.0".to_string(),
        }
    }

    // --- 1. Processed core ---

    #[test]
    fn core_drops_sentinel_and_marked_rows() {
        let table = VariantTable::new(vec![
            row("CCO", "Plate 1", "A1", PARENT_SENTINEL, Some("5.0")),
            row("CCO", "Plate 1", "A2", "K99R", Some("10.0")),
            row("CCO", "Plate 1", "A3", "K99-", Some("4.0")),
            row("CCO", "Plate 1", "A4", "", Some("4.0")),
        ]);
        let core = processed_core(&table).unwrap();
        assert_eq!(core.len(), 1);
        assert_eq!(core[0].substitutions, "K99R");
        assert_eq!(core[0].ratio, 2.0);
    }

    #[test]
    fn core_drops_rows_with_empty_fitness_cell() {
        let table = VariantTable::new(vec![
            row("CCO", "Plate 1", "A1", PARENT_SENTINEL, Some("5.0")),
            row("CCO", "Plate 1", "A2", "K99R", None),
            row("CCO", "Plate 1", "A3", "A59L", Some("5.0")),
        ]);
        let core = processed_core(&table).unwrap();
        assert_eq!(core.len(), 1);
        assert_eq!(core[0].well, "A3");
    }

    #[test]
    fn core_rejects_empty_table() {
        let err = processed_core(&VariantTable::default()).unwrap_err();
        assert!(matches!(err, AnalyticsError::EmptyTable));
    }

    // --- 2. Hot/cold extraction ---

    fn two_substrate_table() -> VariantTable {
        VariantTable::new(vec![
            row("S1", "Plate 1", "A1", "K9R", Some("9")),
            row("S1", "Plate 1", "A2", "K7R", Some("7")),
            row("S1", "Plate 1", "A3", "K5R", Some("5")),
            row("S1", "Plate 1", "A4", "K3R", Some("3")),
            row("S1", "Plate 1", "A5", "K1R", Some("1")),
            row("S2", "Plate 1", "B1", "A10L", Some("10")),
            row("S2", "Plate 1", "B2", "A6L", Some("6")),
            row("S2", "Plate 1", "B3", "A2L", Some("2")),
        ])
    }

    #[test]
    fn hot_and_cold_rows_per_group() {
        let (rows, _) = hot_cold(&two_substrate_table(), 2).unwrap();
        let hot: Vec<(&str, f64)> = rows
            .iter()
            .filter(|r| r.kind == SpotKind::Hot)
            .map(|r| (r.smiles.as_str(), r.fitness))
            .collect();
        let cold: Vec<(&str, f64)> = rows
            .iter()
            .filter(|r| r.kind == SpotKind::Cold)
            .map(|r| (r.smiles.as_str(), r.fitness))
            .collect();
        assert_eq!(
            hot,
            vec![("S1", 9.0), ("S1", 7.0), ("S2", 10.0), ("S2", 6.0)]
        );
        assert_eq!(
            cold,
            vec![("S1", 3.0), ("S1", 1.0), ("S2", 6.0), ("S2", 2.0)]
        );
    }

    #[test]
    fn hot_rows_precede_cold_rows() {
        let (rows, _) = hot_cold(&two_substrate_table(), 2).unwrap();
        let first_cold = rows.iter().position(|r| r.kind == SpotKind::Cold).unwrap();
        assert!(rows[..first_cold].iter().all(|r| r.kind == SpotKind::Hot));
        assert!(rows[first_cold..].iter().all(|r| r.kind == SpotKind::Cold));
    }

    #[test]
    fn small_group_contributes_overlapping_rows() {
        let table = VariantTable::new(vec![
            row("S1", "Plate 1", "A1", "K9R", Some("9")),
            row("S1", "Plate 1", "A2", "K7R", Some("7")),
            row("S1", "Plate 1", "A3", "K5R", Some("5")),
        ]);
        let (rows, _) = hot_cold(&table, 2).unwrap();
        // Fitness 7 appears both as hot and as cold.
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1].fitness, 7.0);
        assert_eq!(rows[2].fitness, 7.0);
        assert_eq!(rows[1].kind, SpotKind::Hot);
        assert_eq!(rows[2].kind, SpotKind::Cold);
    }

    #[test]
    fn tied_fitness_keeps_row_order() {
        let table = VariantTable::new(vec![
            row("S1", "Plate 1", "A1", "K1R", Some("5")),
            row("S1", "Plate 1", "A2", "K2R", Some("5")),
            row("S1", "Plate 1", "A3", "K3R", Some("5")),
        ]);
        let (rows, _) = hot_cold(&table, 1).unwrap();
        assert_eq!(rows[0].well, "A1");
        assert_eq!(rows[0].kind, SpotKind::Hot);
        assert_eq!(rows[1].well, "A3");
        assert_eq!(rows[1].kind, SpotKind::Cold);
    }

    #[test]
    fn spot_count_of_zero_is_rejected() {
        let err = hot_cold(&two_substrate_table(), 0).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidSpotCount(0)));
    }

    // --- 3. Residue summaries ---

    #[test]
    fn profiles_collect_sorted_unique_positions() {
        let (_, profiles) = hot_cold(&two_substrate_table(), 2).unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].smiles, "S1");
        assert_eq!(profiles[0].hot_indices, vec![7, 9]);
        assert_eq!(profiles[0].cold_indices, vec![1, 3]);
        assert_eq!(profiles[0].exp_residues, vec![1, 3, 5, 7, 9]);
        assert_eq!(profiles[1].smiles, "S2");
        assert_eq!(profiles[1].hot_indices, vec![6, 10]);
        assert_eq!(profiles[1].cold_indices, vec![2, 6]);
    }

    #[test]
    fn multi_substitution_rows_contribute_every_position() {
        let table = VariantTable::new(vec![
            row("S1", "Plate 1", "A1", "K99R_R118C", Some("9")),
            row("S1", "Plate 1", "A2", "A59L", Some("1")),
        ]);
        let (_, profiles) = hot_cold(&table, 1).unwrap();
        assert_eq!(profiles[0].hot_indices, vec![99, 118]);
        assert_eq!(profiles[0].cold_indices, vec![59]);
        assert_eq!(profiles[0].exp_residues, vec![59, 99, 118]);
    }

    #[test]
    fn substrate_without_processed_rows_is_skipped() {
        let table = VariantTable::new(vec![
            row("S1", "Plate 1", "A1", "K9R", Some("9")),
            row("S2", "Plate 1", "B1", PARENT_SENTINEL, Some("5")),
        ]);
        let (_, profiles) = hot_cold(&table, 1).unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].smiles, "S1");
    }

    // --- 4. Single-site saturation views ---

    #[test]
    fn ssm_positions_keep_single_substitution_rows_only() {
        let table = VariantTable::new(vec![
            row("S1", "Plate 1", "A1", PARENT_SENTINEL, Some("5")),
            row("S1", "Plate 1", "A2", "K99R", Some("10")),
            row("S1", "Plate 1", "A3", "K99C", Some("2")),
            row("S1", "Plate 1", "A4", "A59L_K99R", Some("8")),
            row("S1", "Plate 1", "A5", "T12S", Some("4")),
        ]);
        let core = processed_core(&table).unwrap();
        assert_eq!(ssm_positions(&core, "S1").unwrap(), vec![12, 99]);
    }

    #[test]
    fn ssm_site_profile_lists_replacements_with_ratios() {
        let table = VariantTable::new(vec![
            row("S1", "Plate 1", "A1", PARENT_SENTINEL, Some("5")),
            row("S1", "Plate 1", "A2", "K99R", Some("10")),
            row("S1", "Plate 1", "A3", "K99C", Some("2.5")),
            row("S1", "Plate 1", "A4", "T12S", Some("4")),
        ]);
        let core = processed_core(&table).unwrap();
        let profile = ssm_site_profile(&core, "S1", 99).unwrap();
        assert_eq!(
            profile,
            vec![
                SsmObservation { replacement: 'R', ratio: 2.0 },
                SsmObservation { replacement: 'C', ratio: 0.5 },
            ]
        );
    }
}
