use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use enzdb_catalog::settings::{DiskSettings, LOCAL_INSTANCE};
use enzdb_catalog::{Catalog, ExperimentUpload, MutagenesisMethod, Settings};
use enzdb_match::{find_matching_sequences, find_related_variants};

const QUERY: &str = "MKTAYIAKQR";
const OTHER_PARENT: &str = "MKTAYIAKQW";

fn settings_for(root: &Path) -> Settings {
    Settings {
        deployment_mode: LOCAL_INSTANCE.to_string(),
        storage_mode: "disk".to_string(),
        five_letter_id_prefix: Some("MATCH".to_string()),
        disk: DiskSettings {
            local_data_path: Some(root.to_path_buf()),
            enable_data_modification: true,
            assay_file: None,
        },
    }
}

fn fixture_csv(parent: &str) -> String {
    format!(
        "smiles,plate,well,alignment_count,substitutions,alignment_probability,aa_sequence,fitness_value\n\
         CCO,Plate 1,A1,12,#PARENT#,0.99,{parent},2.0\n\
         CCO,Plate 1,A2,11,K2A,0.98,,4.0\n\
         CCO,Plate 1,A3,10,T3V,0.97,,1.0\n\
         CCO,Plate 2,A1,12,#PARENT#,0.99,,2.0\n\
         CCO,Plate 2,A2,9,A6L,0.96,,3.0\n"
    )
}

fn upload(name: &str, parent: &str) -> ExperimentUpload {
    ExperimentUpload {
        experiment_name: name.to_string(),
        doi: "10.1234/enzymes".to_string(),
        experiment_date: "2024-03-01".to_string(),
        substrate: "CCO".to_string(),
        product: "CC=O".to_string(),
        assay: "GC-MS".to_string(),
        mutagenesis_method: MutagenesisMethod::EpPcr,
        additional_information: String::new(),
        csv_base64: BASE64.encode(fixture_csv(parent)),
        structure_base64: BASE64.encode("data_demo\n_entry.id DEMO\n"),
    }
}

/// Two experiments: one whose parent equals the query and one differing at
/// the final residue.
fn seeded_catalog(dir: &TempDir) -> (Catalog, String, String) {
    let mut catalog = Catalog::open(&settings_for(dir.path())).unwrap();
    let exact = catalog.add_experiment_from_ui(upload("exact", QUERY)).unwrap();
    let near = catalog
        .add_experiment_from_ui(upload("near", OTHER_PARENT))
        .unwrap();
    (catalog, exact, near)
}

#[test]
fn test_match_report_decorates_each_substrate() {
    let dir = TempDir::new().unwrap();
    let (mut catalog, exact, near) = seeded_catalog(&dir);

    let report = find_matching_sequences(&mut catalog, QUERY, 0.8, 1).unwrap();

    // Self alignment of the ten-residue query over BLOSUM62 diagonals.
    assert_eq!(report.base_score, 49);

    // One substrate per experiment, ranked identical-first.
    assert_eq!(report.rows.len(), 2);
    let top = &report.rows[0];
    assert_eq!(top.experiment_id, exact);
    assert_eq!(top.normalized_score, 1.0);
    assert_eq!(top.metadata.experiment_name, "exact");
    assert_eq!(top.smiles, "CCO");
    assert_eq!(top.hot_indices, vec![2, 6]);
    assert_eq!(top.cold_indices, vec![3, 6]);
    assert_eq!(top.exp_residues, vec![2, 3, 6]);
    assert_eq!(top.seq_align_mismatch_indices, Vec::<usize>::new());
    assert_eq!(
        top.sequence_alignment,
        "MKTAYIAKQR\n||||||||||\n HC  B    \nMKTAYIAKQR\n"
    );

    let runner_up = &report.rows[1];
    assert_eq!(runner_up.experiment_id, near);
    assert_eq!(runner_up.normalized_score, 0.8367);
    assert_eq!(runner_up.seq_align_mismatch_indices, vec![10]);
    assert_eq!(
        runner_up.sequence_alignment,
        "MKTAYIAKQW\n|||||||||.\n HC  B    \nMKTAYIAKQR\n"
    );
}

#[test]
fn test_match_report_concatenates_hot_cold_rows_by_rank() {
    let dir = TempDir::new().unwrap();
    let (mut catalog, exact, near) = seeded_catalog(&dir);

    let report = find_matching_sequences(&mut catalog, QUERY, 0.8, 1).unwrap();

    // Four spot rows per experiment: hot K2A and A6L, then cold T3V and A6L.
    assert_eq!(report.hot_cold_rows.len(), 8);
    let ids: Vec<&str> = report
        .hot_cold_rows
        .iter()
        .map(|spot| spot.experiment_id.as_str())
        .collect();
    assert_eq!(ids[..4], vec![exact.as_str(); 4][..]);
    assert_eq!(ids[4..], vec![near.as_str(); 4][..]);

    let first = &report.hot_cold_rows[0];
    assert_eq!(first.experiment_name, "exact");
    assert_eq!(first.parent_sequence, QUERY);
    assert_eq!(first.row.substitutions, "K2A");
    assert_eq!(first.row.kind.to_string(), "Hot");
    assert_eq!(report.hot_cold_rows[2].row.kind.to_string(), "Cold");
}

#[test]
fn test_threshold_filters_weak_hits() {
    let dir = TempDir::new().unwrap();
    let (mut catalog, exact, _) = seeded_catalog(&dir);

    // 41/49 = 0.8367, so a 0.9 threshold keeps only the identical parent.
    let report = find_matching_sequences(&mut catalog, QUERY, 0.9, 1).unwrap();
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].experiment_id, exact);
}

#[test]
fn test_pasted_whitespace_in_query_is_ignored() {
    let dir = TempDir::new().unwrap();
    let (mut catalog, _, _) = seeded_catalog(&dir);

    let pasted = "MKTAY\nIAKQR\n";
    let report = find_matching_sequences(&mut catalog, pasted, 0.8, 1).unwrap();
    assert_eq!(report.base_score, 49);
    assert_eq!(report.rows.len(), 2);
}

#[test]
fn test_related_variants_skip_current_experiment() {
    let dir = TempDir::new().unwrap();
    let (mut catalog, exact, near) = seeded_catalog(&dir);

    let rows =
        find_related_variants(&mut catalog, QUERY, 0.8, &["2".to_string()], &exact).unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.experiment_id, near);
    assert_eq!(row.metadata.experiment_name, "near");
    assert_eq!(row.variant.substitutions, "K2A");
    assert_eq!(row.variant.well, "A2");
    assert_eq!(row.seq_align_mismatch_indices, vec![10]);
    // No hot/cold annotation on related-variant alignments.
    let lines: Vec<&str> = row.sequence_alignment.lines().collect();
    assert_eq!(lines[2], " ".repeat(10));
}

#[test]
fn test_related_variants_empty_requests_and_misses() {
    let dir = TempDir::new().unwrap();
    let (mut catalog, exact, _) = seeded_catalog(&dir);

    assert!(find_related_variants(&mut catalog, QUERY, 0.8, &[], &exact)
        .unwrap()
        .is_empty());

    // Position 9 is never mutated in the fixtures.
    assert!(
        find_related_variants(&mut catalog, QUERY, 0.8, &["9".to_string()], &exact)
            .unwrap()
            .is_empty()
    );
}
