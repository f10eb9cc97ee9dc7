//! Residue-position lookup over a variant table.

use std::collections::HashSet;

use regex::Regex;

use crate::analytics::AnalyticsError;
use crate::variant::{VariantRow, VariantTable};

/// Returns the rows mutating any of the requested positions.
///
/// Each entry of `residues` is parsed as an integer position; entries that
/// do not parse match nothing. A row matches when any number embedded in its
/// substitution summary equals a requested position, so `"K99R_R118C"` is a
/// match for `"99"` but not for `"9"`. Row order is preserved and each row
/// appears at most once. An empty request returns an empty result.
pub fn lookup_residues<'a>(
    table: &'a VariantTable,
    residues: &[String],
) -> Result<Vec<&'a VariantRow>, AnalyticsError> {
    let wanted: HashSet<u32> = residues
        .iter()
        .filter_map(|r| r.trim().parse().ok())
        .collect();
    if wanted.is_empty() {
        return Ok(Vec::new());
    }
    let position = Regex::new(r"\d+")?;
    let rows = table
        .rows()
        .iter()
        .filter(|row| {
            position
                .find_iter(&row.substitutions)
                .filter_map(|m| m.as_str().parse::<u32>().ok())
                .any(|p| wanted.contains(&p))
        })
        .collect();
    Ok(rows)
}
