//! Joins aligner hits with experiment metadata and spot analysis.

use serde::Serialize;

use enzdb_catalog::{Catalog, ExperimentMetadata};
use enzdb_core::{get_alignments, lookup_residues, SpotRow, VariantRow};

use crate::decorate::decorate_alignment;
use crate::MatchError;

/// One match-report row, covering one substrate of one hit experiment.
#[derive(Debug, Clone, Serialize)]
pub struct MatchRow {
    pub experiment_id: String,
    /// Parent sequence the query was aligned against.
    pub sequence: String,
    pub alignment_score: i32,
    pub normalized_score: f64,
    pub identities: usize,
    pub mismatches: usize,
    pub gaps: usize,
    pub metadata: ExperimentMetadata,
    pub smiles: String,
    pub hot_indices: Vec<u32>,
    pub cold_indices: Vec<u32>,
    pub exp_residues: Vec<u32>,
    /// One-based alignment columns where query and parent disagree.
    pub seq_align_mismatch_indices: Vec<usize>,
    /// Decorated alignment, see [`decorate_alignment`].
    pub sequence_alignment: String,
}

/// A hot/cold report row tagged with its experiment.
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentSpotRow {
    pub experiment_id: String,
    pub experiment_name: String,
    pub parent_sequence: String,
    pub row: SpotRow,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    pub rows: Vec<MatchRow>,
    pub hot_cold_rows: Vec<ExperimentSpotRow>,
    /// Query self-alignment score the hit normalization used.
    pub base_score: i32,
}

/// A variant found near the requested residues in another experiment.
#[derive(Debug, Clone, Serialize)]
pub struct RelatedVariantRow {
    pub experiment_id: String,
    pub sequence: String,
    pub alignment_score: i32,
    pub normalized_score: f64,
    pub metadata: ExperimentMetadata,
    pub variant: VariantRow,
    pub seq_align_mismatch_indices: Vec<usize>,
    pub sequence_alignment: String,
}

/// Strips the ASCII whitespace that copy/pasted sequences tend to carry.
pub fn sanitize_sequence(sequence: &str) -> String {
    sequence
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect()
}

/// Aligns `query` against every stored parent sequence and assembles the
/// full match report.
///
/// Hits at or above `threshold` contribute one row per substrate of their
/// experiment, each carrying the experiment metadata, that substrate's
/// hot/cold residue sets painted onto the alignment, and the mismatch
/// columns. `spot_count` is the per-plate hot and cold selection depth.
/// Experiments that disappear between ranking and loading are skipped with
/// a warning.
pub fn find_matching_sequences(
    catalog: &mut Catalog,
    query: &str,
    threshold: f64,
    spot_count: usize,
) -> Result<MatchReport, MatchError> {
    let query = sanitize_sequence(query);
    let targets = catalog.get_all_lab_sequences();
    let (hits, base_score) = get_alignments(&query, threshold, &targets)?;

    let mut rows = Vec::new();
    let mut hot_cold_rows = Vec::new();
    for hit in &hits {
        let Some(metadata) = catalog.get_experiment_metadata(&hit.experiment_id).cloned() else {
            log::warn!("hit {} vanished from the registry", hit.experiment_id);
            continue;
        };
        let Some(experiment) = catalog.get_experiment(&hit.experiment_id)? else {
            log::warn!("hit {} vanished from the registry", hit.experiment_id);
            continue;
        };
        let (spots, profiles) = experiment.hot_cold(spot_count)?;

        for profile in profiles {
            let (decorated, mismatch_columns) = decorate_alignment(
                &hit.alignment,
                &profile.hot_indices,
                &profile.cold_indices,
            )?;
            rows.push(MatchRow {
                experiment_id: hit.experiment_id.clone(),
                sequence: hit.sequence.clone(),
                alignment_score: hit.alignment_score,
                normalized_score: hit.normalized_score,
                identities: hit.identities,
                mismatches: hit.mismatches,
                gaps: hit.gaps,
                metadata: metadata.clone(),
                smiles: profile.smiles,
                hot_indices: profile.hot_indices,
                cold_indices: profile.cold_indices,
                exp_residues: profile.exp_residues,
                seq_align_mismatch_indices: mismatch_columns,
                sequence_alignment: decorated,
            });
        }

        hot_cold_rows.extend(spots.into_iter().map(|row| ExperimentSpotRow {
            experiment_id: metadata.experiment_id.clone(),
            experiment_name: metadata.experiment_name.clone(),
            parent_sequence: metadata.parent_sequence.clone(),
            row,
        }));
    }

    Ok(MatchReport {
        rows,
        hot_cold_rows,
        base_score,
    })
}

/// Finds variants touching any of `residues` in every other experiment
/// whose parent aligns to `query` at or above `threshold`.
///
/// The experiment identified by `current_experiment_id` is excluded so a
/// page showing one experiment does not report its own rows back. An empty
/// residue list returns no rows. Alignments are decorated without hot/cold
/// annotation.
pub fn find_related_variants(
    catalog: &mut Catalog,
    query: &str,
    threshold: f64,
    residues: &[String],
    current_experiment_id: &str,
) -> Result<Vec<RelatedVariantRow>, MatchError> {
    if residues.is_empty() {
        return Ok(Vec::new());
    }
    let query = sanitize_sequence(query);
    let targets = catalog.get_all_lab_sequences();
    let (hits, _) = get_alignments(&query, threshold, &targets)?;

    let mut rows = Vec::new();
    for hit in &hits {
        if hit.experiment_id == current_experiment_id {
            continue;
        }
        let Some(metadata) = catalog.get_experiment_metadata(&hit.experiment_id).cloned() else {
            log::warn!("hit {} vanished from the registry", hit.experiment_id);
            continue;
        };
        let Some(experiment) = catalog.get_experiment(&hit.experiment_id)? else {
            log::warn!("hit {} vanished from the registry", hit.experiment_id);
            continue;
        };
        let found = lookup_residues(experiment.table(), residues)?;
        if found.is_empty() {
            continue;
        }
        let (decorated, mismatch_columns) = decorate_alignment(&hit.alignment, &[], &[])?;
        for variant in found {
            rows.push(RelatedVariantRow {
                experiment_id: hit.experiment_id.clone(),
                sequence: hit.sequence.clone(),
                alignment_score: hit.alignment_score,
                normalized_score: hit.normalized_score,
                metadata: metadata.clone(),
                variant: variant.clone(),
                seq_align_mismatch_indices: mismatch_columns.clone(),
                sequence_alignment: decorated.clone(),
            });
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sanitize_strips_pasted_whitespace() {
        assert_eq!(sanitize_sequence("MK T\nAYI \r\n"), "MKTAYI");
        assert_eq!(sanitize_sequence("MKT"), "MKT");
        assert_eq!(sanitize_sequence("  \n"), "");
    }
}
