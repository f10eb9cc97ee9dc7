//! Global protein alignment against catalog parent sequences.
//!
//! Needleman-Wunsch over BLOSUM62 in Gotoh's three-matrix form. Gap scoring
//! is affine: a run of k gap columns scores `open_gap + (k - 1) * extend_gap`.
//! Scores are normalized against the query's self-alignment score so that
//! hits from different experiments are comparable.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blosum;

/// Residue columns per rendered alignment block.
const LINE_WIDTH: usize = 60;

/// Width of the label-and-column prefix on every rendered alignment line.
pub const RENDER_PREFIX_WIDTH: usize = 14;

#[derive(Debug, Error)]
pub enum AlignError {
    #[error("Empty query sequence was provided!")]
    EmptyQuery,
    #[error("Target sequences are empty.")]
    EmptyTargets,
    #[error("Base score has returned 0. Check your inputs!")]
    ZeroBaseScore,
    #[error("Unknown residue '{0}' in sequence")]
    UnknownResidue(char),
}

/// Affine gap parameters. The open score covers the first gap column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoringParams {
    pub open_gap: i32,
    pub extend_gap: i32,
}

impl Default for ScoringParams {
    /// Gap parameters used by blastp for protein-protein search.
    fn default() -> Self {
        ScoringParams {
            open_gap: -12,
            extend_gap: -1,
        }
    }
}

/// One finished global alignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairwiseAlignment {
    /// Target sequence with gap dashes inserted.
    pub target_aligned: String,
    /// Query sequence with gap dashes inserted.
    pub query_aligned: String,
    /// Per-column markers: `|` identity, `.` mismatch, space for a gap.
    pub marker: String,
    pub score: i32,
    pub identities: usize,
    pub mismatches: usize,
    pub gaps: usize,
}

/// One catalog sequence that aligned above the caller's threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentHit {
    pub experiment_id: String,
    /// Parent sequence that was aligned against.
    pub sequence: String,
    /// Rendered alignment text, see [`PairwiseAlignment::render`].
    pub alignment: String,
    pub alignment_score: i32,
    /// Score divided by the query self-alignment score, rounded to 4 decimals.
    pub normalized_score: f64,
    pub identities: usize,
    pub mismatches: usize,
    pub gaps: usize,
}

/// Traceback layer the walk is currently in.
#[derive(Clone, Copy, PartialEq)]
enum Layer {
    Main,
    GapInQuery,
    GapInTarget,
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn encode(sequence: &str) -> Result<Vec<usize>, AlignError> {
    sequence
        .chars()
        .map(|c| {
            u8::try_from(c)
                .ok()
                .and_then(blosum::residue_index)
                .ok_or(AlignError::UnknownResidue(c))
        })
        .collect()
}

/// Aligns `query` against `target` end to end and returns one optimal
/// alignment. Ties between equally scoring paths resolve deterministically,
/// preferring substitution columns over gaps.
pub fn align_pair(
    target: &str,
    query: &str,
    params: ScoringParams,
) -> Result<PairwiseAlignment, AlignError> {
    let t = encode(target)?;
    let q = encode(query)?;
    let rows = q.len() + 1;
    let cols = t.len() + 1;
    let idx = |i: usize, j: usize| i * cols + j;
    let neg_inf = i32::MIN / 2;
    let open = params.open_gap;
    let extend = params.extend_gap;

    // h: best score ending at (i, j); e: ending in a gap-in-query run;
    // f: ending in a gap-in-target run.
    let mut h = vec![neg_inf; rows * cols];
    let mut e = vec![neg_inf; rows * cols];
    let mut f = vec![neg_inf; rows * cols];
    h[idx(0, 0)] = 0;
    for j in 1..cols {
        e[idx(0, j)] = open + (j as i32 - 1) * extend;
        h[idx(0, j)] = e[idx(0, j)];
    }
    for i in 1..rows {
        f[idx(i, 0)] = open + (i as i32 - 1) * extend;
        h[idx(i, 0)] = f[idx(i, 0)];
    }

    for i in 1..rows {
        for j in 1..cols {
            e[idx(i, j)] = (h[idx(i, j - 1)] + open).max(e[idx(i, j - 1)] + extend);
            f[idx(i, j)] = (h[idx(i - 1, j)] + open).max(f[idx(i - 1, j)] + extend);
            let diag = h[idx(i - 1, j - 1)] + blosum::score_indexed(q[i - 1], t[j - 1]);
            h[idx(i, j)] = diag.max(e[idx(i, j)]).max(f[idx(i, j)]);
        }
    }
    let score = h[idx(q.len(), t.len())];

    let target_bytes = target.as_bytes();
    let query_bytes = query.as_bytes();
    let mut target_rev: Vec<u8> = Vec::with_capacity(rows + cols);
    let mut query_rev: Vec<u8> = Vec::with_capacity(rows + cols);
    let mut i = q.len();
    let mut j = t.len();
    let mut layer = Layer::Main;
    while i > 0 || j > 0 {
        match layer {
            Layer::Main => {
                let here = h[idx(i, j)];
                if i > 0
                    && j > 0
                    && here == h[idx(i - 1, j - 1)] + blosum::score_indexed(q[i - 1], t[j - 1])
                {
                    target_rev.push(target_bytes[j - 1]);
                    query_rev.push(query_bytes[i - 1]);
                    i -= 1;
                    j -= 1;
                } else if i > 0 && here == f[idx(i, j)] {
                    layer = Layer::GapInTarget;
                } else {
                    layer = Layer::GapInQuery;
                }
            }
            Layer::GapInTarget => {
                target_rev.push(b'-');
                query_rev.push(query_bytes[i - 1]);
                if f[idx(i, j)] == h[idx(i - 1, j)] + open {
                    layer = Layer::Main;
                }
                i -= 1;
            }
            Layer::GapInQuery => {
                target_rev.push(target_bytes[j - 1]);
                query_rev.push(b'-');
                if e[idx(i, j)] == h[idx(i, j - 1)] + open {
                    layer = Layer::Main;
                }
                j -= 1;
            }
        }
    }
    target_rev.reverse();
    query_rev.reverse();

    let mut marker = String::with_capacity(target_rev.len());
    let mut identities = 0;
    let mut mismatches = 0;
    let mut gaps = 0;
    for (&tb, &qb) in target_rev.iter().zip(&query_rev) {
        if tb == b'-' || qb == b'-' {
            marker.push(' ');
            gaps += 1;
        } else if tb.eq_ignore_ascii_case(&qb) {
            marker.push('|');
            identities += 1;
        } else {
            marker.push('.');
            mismatches += 1;
        }
    }

    Ok(PairwiseAlignment {
        target_aligned: String::from_utf8(target_rev).unwrap_or_default(),
        query_aligned: String::from_utf8(query_rev).unwrap_or_default(),
        marker,
        score,
        identities,
        mismatches,
        gaps,
    })
}

impl PairwiseAlignment {
    /// Renders the alignment as fixed-width text blocks.
    ///
    /// Each block holds [`LINE_WIDTH`] columns as a target line, a marker
    /// line and a query line followed by a blank line. Every line starts
    /// with a [`RENDER_PREFIX_WIDTH`]-character prefix carrying the label
    /// and the zero-based alignment column of the block.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let total = self.marker.len();
        let mut start = 0;
        while start < total {
            let end = (start + LINE_WIDTH).min(total);
            out.push_str(&format!(
                "{:<6} {:>6} {}\n",
                "target",
                start,
                &self.target_aligned[start..end]
            ));
            out.push_str(&format!("{:<6} {:>6} {}\n", "", start, &self.marker[start..end]));
            out.push_str(&format!(
                "{:<6} {:>6} {}\n",
                "query",
                start,
                &self.query_aligned[start..end]
            ));
            out.push('\n');
            start = end;
        }
        out
    }
}

/// Aligns `query` against every `(experiment_id, parent_sequence)` target
/// and returns the hits at or above `threshold`, ranked by normalized score
/// descending with ties kept in target order, plus the query self-alignment
/// score the normalization used.
pub fn get_alignments(
    query: &str,
    threshold: f64,
    targets: &[(String, String)],
) -> Result<(Vec<AlignmentHit>, i32), AlignError> {
    if query.is_empty() {
        return Err(AlignError::EmptyQuery);
    }
    if targets.is_empty() {
        return Err(AlignError::EmptyTargets);
    }
    let params = ScoringParams::default();
    let base_score = align_pair(query, query, params)?.score;
    if base_score == 0 {
        return Err(AlignError::ZeroBaseScore);
    }

    let mut hits = Vec::new();
    for (experiment_id, sequence) in targets {
        let alignment = align_pair(sequence, query, params)?;
        let normalized = round4(alignment.score as f64 / base_score as f64);
        if normalized < threshold {
            continue;
        }
        hits.push(AlignmentHit {
            experiment_id: experiment_id.clone(),
            sequence: sequence.clone(),
            alignment: alignment.render(),
            alignment_score: alignment.score,
            normalized_score: normalized,
            identities: alignment.identities,
            mismatches: alignment.mismatches,
            gaps: alignment.gaps,
        });
    }
    hits.sort_by(|a, b| {
        b.normalized_score
            .partial_cmp(&a.normalized_score)
            .unwrap_or(Ordering::Equal)
    });
    Ok((hits, base_score))
}
