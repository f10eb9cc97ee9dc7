//! One fully loaded experiment.

use crate::analytics::{self, AnalyticsError, CoreRow, SpotRow, SubstrateResidues};
use crate::ratio::{compute_ratios, ScoredTable};
use crate::variant::VariantTable;

/// A validated variant table together with its protein structure text.
///
/// Substrate and plate lists are extracted once at construction and reused
/// by every view, so lookups never rescan the table.
#[derive(Debug, Clone)]
pub struct Experiment {
    table: VariantTable,
    structure_text: String,
    substrates: Vec<String>,
    plates: Vec<String>,
}

impl Experiment {
    pub fn new(table: VariantTable, structure_text: String) -> Self {
        let substrates = table.substrates();
        let plates = table.plates();
        Experiment {
            table,
            structure_text,
            substrates,
            plates,
        }
    }

    pub fn table(&self) -> &VariantTable {
        &self.table
    }

    /// Raw text of the experiment's structure file.
    pub fn structure_text(&self) -> &str {
        &self.structure_text
    }

    pub fn substrates(&self) -> &[String] {
        &self.substrates
    }

    pub fn plates(&self) -> &[String] {
        &self.plates
    }

    pub fn plates_count(&self) -> usize {
        self.plates.len()
    }

    /// Scores the full table, see [`compute_ratios`].
    pub fn scored(&self) -> ScoredTable {
        compute_ratios(&self.table)
    }

    /// Scored rows usable for variant-level analysis.
    pub fn processed_core(&self) -> Result<Vec<CoreRow>, AnalyticsError> {
        analytics::processed_core(&self.table)
    }

    /// Hot/cold report for the experiment, see [`analytics::hot_cold`].
    pub fn hot_cold(
        &self,
        n: usize,
    ) -> Result<(Vec<SpotRow>, Vec<SubstrateResidues>), AnalyticsError> {
        analytics::hot_cold(&self.table, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::{VariantRow, PARENT_SENTINEL};
    use pretty_assertions::assert_eq;

    fn table() -> VariantTable {
        let row = |smiles: &str, plate: &str, well: &str, subs: &str, fitness: &str| VariantRow {
            smiles: smiles.to_string(),
            plate: plate.to_string(),
            well: well.to_string(),
            substitutions: subs.to_string(),
            fitness: Some(fitness.to_string()),
            alignment_count: "10".to_string(),
            alignment_probability: "1.0".to_string(),
        };
        VariantTable::new(vec![
            row("CCO", "Plate 1", "A1", PARENT_SENTINEL, "5.0"),
            row("CCO", "Plate 1", "A2", "K99R", "10.0"),
            row("c1ccccc1", "Plate 2", "A1", PARENT_SENTINEL, "2.0"),
        ])
    }

    #[test]
    fn construction_extracts_substrates_and_plates() {
        let experiment = Experiment::new(table(), "data_block".to_string());
        assert_eq!(experiment.substrates(), ["CCO", "c1ccccc1"]);
        assert_eq!(experiment.plates(), ["Plate 1", "Plate 2"]);
        assert_eq!(experiment.plates_count(), 2);
        assert_eq!(experiment.structure_text(), "data_block");
    }

    #[test]
    fn views_delegate_to_the_table() {
        let experiment = Experiment::new(table(), String::new());
        assert_eq!(experiment.scored().rows()[1].ratio, 2.0);
        let core = experiment.processed_core().unwrap();
        assert_eq!(core.len(), 1);
        let (rows, profiles) = experiment.hot_cold(1).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(profiles.len(), 1);
    }
}
