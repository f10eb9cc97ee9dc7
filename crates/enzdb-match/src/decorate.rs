//! Annotates rendered alignment text with mutation-site overlays.
//!
//! Takes the block-wrapped text produced by
//! [`enzdb_core::align::PairwiseAlignment::render`], reassembles the full
//! alignment rows and adds an annotation row marking hot spots (`H`), cold
//! spots (`C`) and positions that are both (`B`).

use enzdb_core::align::RENDER_PREFIX_WIDTH;

use crate::MatchError;

struct ParsedAlignment {
    target: String,
    marker: String,
    query: String,
}

/// Reassembles the three alignment rows from block-wrapped render text.
fn parse_alignment_text(text: &str) -> Result<ParsedAlignment, MatchError> {
    let lines: Vec<&str> = text.lines().collect();
    if lines.is_empty() {
        return Err(MatchError::MalformedAlignment(
            "alignment text is empty".to_string(),
        ));
    }

    let mut target = String::new();
    let mut marker = String::new();
    let mut query = String::new();
    let mut at = 0;
    while at < lines.len() {
        let block = &lines[at..];
        if block.len() < 3 {
            return Err(MatchError::MalformedAlignment(format!(
                "incomplete block starting at line {at}"
            )));
        }
        target.push_str(strip_prefix(block[0])?);
        marker.push_str(strip_prefix(block[1])?);
        query.push_str(strip_prefix(block[2])?);
        // Fourth line is the blank block separator.
        at += 4;
    }

    if target.len() != marker.len() || marker.len() != query.len() {
        return Err(MatchError::MalformedAlignment(
            "alignment rows differ in length".to_string(),
        ));
    }
    Ok(ParsedAlignment { target, marker, query })
}

fn strip_prefix(line: &str) -> Result<&str, MatchError> {
    line.get(RENDER_PREFIX_WIDTH..).ok_or_else(|| {
        MatchError::MalformedAlignment(format!("line too short for its label prefix: '{line}'"))
    })
}

/// One-based alignment columns where the marker row shows a mismatch.
pub fn mismatch_indices(marker: &str) -> Vec<usize> {
    marker
        .chars()
        .enumerate()
        .filter(|(_, c)| *c == '.')
        .map(|(at, _)| at + 1)
        .collect()
}

fn checked_slot(index: u32, length: usize) -> Result<usize, MatchError> {
    let index = index as usize;
    if index == 0 || index > length {
        return Err(MatchError::IndexOutOfRange { index, length });
    }
    Ok(index - 1)
}

/// Annotation row for a `length`-column alignment. Indices are one-based.
fn overlay(length: usize, hot: &[u32], cold: &[u32]) -> Result<String, MatchError> {
    let mut cells = vec![' '; length];
    for &index in hot {
        cells[checked_slot(index, length)?] = 'H';
    }
    for &index in cold {
        let slot = checked_slot(index, length)?;
        cells[slot] = if cells[slot] == 'H' { 'B' } else { 'C' };
    }
    Ok(cells.into_iter().collect())
}

/// Rebuilds a rendered alignment as four unwrapped rows with hot/cold
/// annotations, returning the decorated text and the one-based mismatch
/// columns.
///
/// The decorated text is `target\nmarker\nannotations\nquery\n`. Indices
/// outside `1..=columns` are an error.
pub fn decorate_alignment(
    text: &str,
    hot: &[u32],
    cold: &[u32],
) -> Result<(String, Vec<usize>), MatchError> {
    let parsed = parse_alignment_text(text)?;
    let annotations = overlay(parsed.marker.chars().count(), hot, cold)?;
    let mismatches = mismatch_indices(&parsed.marker);
    let decorated = format!(
        "{}\n{}\n{}\n{}\n",
        parsed.target, parsed.marker, annotations, parsed.query
    );
    Ok((decorated, mismatches))
}
