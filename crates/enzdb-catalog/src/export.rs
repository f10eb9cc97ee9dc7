//! Bundles selected experiments into a downloadable zip archive.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::metadata::ExperimentMetadata;
use crate::store::Catalog;
use crate::CatalogError;

/// Name of the metadata summary table at the archive root.
pub const SUMMARY_FILE_NAME: &str = "EnzEngDB_Experiments.csv";

/// Builds a zip archive of the selected experiments.
///
/// The archive holds a CSV summary of the selected metadata records at the
/// root and the stored files of each experiment under
/// `experiments/{id}/`. Unknown IDs are skipped with a warning; an empty
/// selection yields `None` instead of an empty archive.
pub fn zip_experiments(
    catalog: &Catalog,
    ids: &[String],
) -> Result<Option<Vec<u8>>, CatalogError> {
    let mut records = Vec::new();
    for id in ids {
        match catalog.get_experiment_metadata(id) {
            Some(metadata) => records.push(metadata),
            None => log::warn!("export requested for unknown experiment {id}"),
        }
    }
    if records.is_empty() {
        return Ok(None);
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9));

    writer.start_file(SUMMARY_FILE_NAME, options)?;
    writer.write_all(&summary_csv(&records)?)?;

    for metadata in &records {
        let id = &metadata.experiment_id;
        let Some(files) = catalog.get_experiment_file_content(id)? else {
            continue;
        };
        writer.start_file(format!("experiments/{id}/{id}.json"), options)?;
        writer.write_all(&files.metadata_json)?;
        writer.start_file(format!("experiments/{id}/{id}.csv"), options)?;
        writer.write_all(&files.measurements_csv)?;
        writer.start_file(format!("experiments/{id}/{id}.cif"), options)?;
        writer.write_all(&files.structure_cif)?;
    }

    let cursor = writer.finish()?;
    log::info!("zipped {} experiments", records.len());
    Ok(Some(cursor.into_inner()))
}

fn summary_csv(records: &[&ExperimentMetadata]) -> Result<Vec<u8>, CatalogError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for metadata in records {
        writer.serialize(metadata)?;
    }
    writer
        .into_inner()
        .map_err(|err| CatalogError::Io(err.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MutagenesisMethod;

    fn record(id: &str, name: &str) -> ExperimentMetadata {
        ExperimentMetadata {
            experiment_id: id.to_string(),
            experiment_name: name.to_string(),
            doi: "10.0000/demo".to_string(),
            experiment_date: "2024-05-01".to_string(),
            substrate: "CCO".to_string(),
            product: "CC=O".to_string(),
            assay: "GC-MS".to_string(),
            mutagenesis_method: MutagenesisMethod::EpPcr,
            parent_sequence: "MKT".to_string(),
            plates_count: 2,
            csv_checksum: "feed".to_string(),
            additional_information: String::new(),
            upload_time_stamp: "2024-05-01 12:00:00".to_string(),
        }
    }

    #[test]
    fn test_summary_has_header_and_one_line_per_record() {
        let first = record("AAAAA-1", "alpha");
        let second = record("BBBBB-2", "beta");
        let bytes = summary_csv(&[&first, &second]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("experiment_id,experiment_name,doi"));
        assert!(lines[1].starts_with("AAAAA-1,alpha,"));
        assert!(lines[2].starts_with("BBBBB-2,beta,"));
        assert!(lines[1].contains(",epPCR,"));
    }
}
