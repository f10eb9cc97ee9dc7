//! Fitness-ratio scoring.
//!
//! Variant fitness is only comparable within one `(substrate, plate)` group,
//! so each group is normalized against the mean fitness of its own parent
//! wells. Rows in groups without a usable parent mean keep a NaN ratio and
//! stay visible in the output table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::variant::VariantTable;

/// Fitness assigned to cells that report a trace-level signal in prose.
pub const TRACE_FITNESS: f64 = 0.001;

/// Tolerance below which a parent mean counts as zero.
const ZERO_TOLERANCE: f64 = 1e-8;

/// A variant row after fitness coercion and group scoring.
///
/// All statistics are NaN when the row's group has no usable parent mean,
/// or when scoring bailed out for the whole table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRow {
    pub smiles: String,
    pub plate: String,
    pub well: String,
    pub substitutions: String,
    /// Numeric fitness after coercion.
    pub fitness: f64,
    /// Fitness divided by the group's parent mean, rounded to 3 decimals.
    pub ratio: f64,
    /// Mean fitness of the group's parent wells with positive fitness.
    pub parent_mean: f64,
    /// Smallest defined ratio in the row's group.
    pub min_group_ratio: f64,
    /// Largest defined ratio in the row's group.
    pub max_group_ratio: f64,
}

/// Scored rows, parallel to the input table's row order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoredTable {
    rows: Vec<ScoredRow>,
}

impl ScoredTable {
    pub fn rows(&self) -> &[ScoredRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Coerces a raw fitness cell to a number.
///
/// Empty and unparseable cells become `0.0`, except cells mentioning a trace
/// signal (any casing of "trac") which become [`TRACE_FITNESS`]. A literal
/// "nan" is treated as unparseable rather than poisoning group statistics.
fn coerce_fitness(cell: Option<&str>) -> f64 {
    let text = match cell {
        Some(text) => text.trim(),
        None => return 0.0,
    };
    match text.parse::<f64>() {
        Ok(value) if !value.is_nan() => value,
        _ => {
            if text.to_lowercase().contains("trac") {
                TRACE_FITNESS
            } else {
                0.0
            }
        }
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Scores every row of `table` against its `(substrate, plate)` parent mean.
///
/// The output is row-for-row parallel to the input. When no group has a
/// parent well with positive fitness, or every parent mean is numerically
/// zero, all ratios and group statistics are NaN.
pub fn compute_ratios(table: &VariantTable) -> ScoredTable {
    let rows = table.rows();
    let fitness: Vec<f64> = rows
        .iter()
        .map(|r| coerce_fitness(r.fitness.as_deref()))
        .collect();

    // Group rows by (smiles, plate) in first-appearance order.
    let mut group_of = Vec::with_capacity(rows.len());
    let mut group_count = 0usize;
    let mut group_index: HashMap<(&str, &str), usize> = HashMap::new();
    for row in rows {
        let key = (row.smiles.as_str(), row.plate.as_str());
        let group = *group_index.entry(key).or_insert_with(|| {
            let next = group_count;
            group_count += 1;
            next
        });
        group_of.push(group);
    }

    // Mean parent fitness per group, restricted to positive parent wells.
    let mut parent_sum = vec![0.0f64; group_count];
    let mut parent_n = vec![0usize; group_count];
    for (i, row) in rows.iter().enumerate() {
        if row.is_parent() && fitness[i] > 0.0 {
            parent_sum[group_of[i]] += fitness[i];
            parent_n[group_of[i]] += 1;
        }
    }
    let means: Vec<f64> = (0..group_count)
        .map(|g| {
            if parent_n[g] > 0 {
                parent_sum[g] / parent_n[g] as f64
            } else {
                f64::NAN
            }
        })
        .collect();

    let alive = means
        .iter()
        .any(|m| !m.is_nan() && m.abs() > ZERO_TOLERANCE);
    if !alive {
        log::warn!("no usable parent mean in any group; ratios left unset");
        let scored = rows
            .iter()
            .zip(&fitness)
            .map(|(row, &fit)| ScoredRow {
                smiles: row.smiles.clone(),
                plate: row.plate.clone(),
                well: row.well.clone(),
                substitutions: row.substitutions.clone(),
                fitness: fit,
                ratio: f64::NAN,
                parent_mean: f64::NAN,
                min_group_ratio: f64::NAN,
                max_group_ratio: f64::NAN,
            })
            .collect();
        return ScoredTable { rows: scored };
    }

    let ratios: Vec<f64> = (0..rows.len())
        .map(|i| {
            let mean = means[group_of[i]];
            if mean.is_nan() || mean == 0.0 {
                f64::NAN
            } else {
                round3(fitness[i] / mean)
            }
        })
        .collect();

    // Per-group ratio extremes, skipping NaN ratios.
    let mut group_min = vec![f64::NAN; group_count];
    let mut group_max = vec![f64::NAN; group_count];
    for (i, &ratio) in ratios.iter().enumerate() {
        if ratio.is_nan() {
            continue;
        }
        let g = group_of[i];
        if group_min[g].is_nan() || ratio < group_min[g] {
            group_min[g] = ratio;
        }
        if group_max[g].is_nan() || ratio > group_max[g] {
            group_max[g] = ratio;
        }
    }

    let scored = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let g = group_of[i];
            ScoredRow {
                smiles: row.smiles.clone(),
                plate: row.plate.clone(),
                well: row.well.clone(),
                substitutions: row.substitutions.clone(),
                fitness: fitness[i],
                ratio: ratios[i],
                parent_mean: means[g],
                min_group_ratio: group_min[g],
                max_group_ratio: group_max[g],
            }
        })
        .collect();
    ScoredTable { rows: scored }
}
