//! The on-disk experiment catalog.
//!
//! Layout under the data root:
//!
//! ```text
//! {root}/{id}/{id}.json   metadata record
//! {root}/{id}/{id}.csv    measurement table, stored byte for byte
//! {root}/{id}/{id}.cif    structure file
//! {root}/DELETED_EXP/     soft-deleted experiments, timestamp suffixed
//! ```
//!
//! Metadata for every experiment is held in memory; full experiments are
//! loaded on demand and revalidated on every load, so rows handed to
//! analysis code always satisfy the upload-time checks.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Local;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use enzdb_core::Experiment;
use enzdb_formats::table::{build_variant_table, extract_parent_sequence, RawTable};
use enzdb_formats::validate::validate_variant_table;

use crate::export;
use crate::index::MetadataIndex;
use crate::lru::LruCache;
use crate::metadata::{upload_timestamp, ExperimentMetadata, MutagenesisMethod};
use crate::settings::Settings;
use crate::CatalogError;

/// Directory soft-deleted experiments are moved into.
pub const DELETED_DIR: &str = "DELETED_EXP";

/// Timestamp suffix on soft-deleted experiment directories.
const DELETE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Loaded experiments kept in memory at once.
const CACHE_CAPACITY: usize = 20;

/// Fields a client submits when uploading a new experiment.
#[derive(Debug, Clone)]
pub struct ExperimentUpload {
    pub experiment_name: String,
    pub doi: String,
    pub experiment_date: String,
    pub substrate: String,
    pub product: String,
    pub assay: String,
    pub mutagenesis_method: MutagenesisMethod,
    pub additional_information: String,
    /// Measurement CSV, base64 encoded.
    pub csv_base64: String,
    /// Structure file (mmCIF text), base64 encoded.
    pub structure_base64: String,
}

/// Raw bytes of one experiment's stored files.
#[derive(Debug, Clone)]
pub struct ExperimentFiles {
    pub metadata_json: Vec<u8>,
    pub measurements_csv: Vec<u8>,
    pub structure_cif: Vec<u8>,
}

pub struct Catalog {
    root: PathBuf,
    id_prefix: Option<String>,
    assays: Vec<String>,
    index: MetadataIndex,
    cache: LruCache<String, Arc<Experiment>>,
}

impl Catalog {
    /// Opens the catalog described by `settings`.
    ///
    /// Validates the deployment configuration, checks the data directory,
    /// creates the soft-delete directory if needed and scans existing
    /// experiments into the metadata registry. Experiments whose files are
    /// incomplete are skipped with a warning, never deleted.
    pub fn open(settings: &Settings) -> Result<Self, CatalogError> {
        settings.validate_deployment()?;
        let root = settings.data_path()?;
        if !root.is_dir() {
            return Err(CatalogError::Config(format!(
                "data path '{}' does not exist or is not a directory",
                root.display()
            )));
        }
        if settings.modification_enabled() {
            ensure_writable(&root)?;
        }
        let deleted = root.join(DELETED_DIR);
        if !deleted.is_dir() {
            fs::create_dir_all(&deleted)?;
        }

        // The prefix only matters on instances that may write.
        let id_prefix = if settings.modification_enabled() {
            settings.id_prefix()?
        } else {
            None
        };

        let assays = load_assay_list(settings)?;
        let index = scan_metadata(&root)?;
        log::info!(
            "catalog opened at {} with {} experiments",
            root.display(),
            index.len()
        );
        Ok(Catalog {
            root,
            id_prefix,
            assays,
            index,
            cache: LruCache::new(CACHE_CAPACITY),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Assay names offered at upload, in file order.
    pub fn get_assays(&self) -> &[String] {
        &self.assays
    }

    pub fn get_experiment_metadata(&self, id: &str) -> Option<&ExperimentMetadata> {
        self.index.get(id)
    }

    /// All metadata records in registration order.
    pub fn get_all_experiments_metadata(&self) -> Vec<&ExperimentMetadata> {
        self.index.iter().collect()
    }

    /// `(experiment_id, parent_sequence)` pairs in registration order.
    pub fn get_all_lab_sequences(&self) -> Vec<(String, String)> {
        self.index
            .iter()
            .map(|m| (m.experiment_id.clone(), m.parent_sequence.clone()))
            .collect()
    }

    /// Loads an experiment, going to disk only on a cache miss.
    ///
    /// Unknown IDs return `None`; a registered experiment that fails to
    /// load is an error.
    pub fn get_experiment(&mut self, id: &str) -> Result<Option<Arc<Experiment>>, CatalogError> {
        let key = id.to_string();
        if let Some(found) = self.cache.get(&key) {
            return Ok(Some(Arc::clone(found)));
        }
        if !self.index.contains(id) {
            return Ok(None);
        }
        let experiment = Arc::new(self.load_experiment(id)?);
        self.cache.insert(key, Arc::clone(&experiment));
        Ok(Some(experiment))
    }

    /// Raw stored bytes of an experiment's three files.
    pub fn get_experiment_file_content(
        &self,
        id: &str,
    ) -> Result<Option<ExperimentFiles>, CatalogError> {
        if !self.index.contains(id) {
            return Ok(None);
        }
        let dir = self.root.join(id);
        Ok(Some(ExperimentFiles {
            metadata_json: fs::read(dir.join(format!("{id}.json")))?,
            measurements_csv: fs::read(dir.join(format!("{id}.csv")))?,
            structure_cif: fs::read(dir.join(format!("{id}.cif")))?,
        }))
    }

    /// Zips the named experiments together with a metadata summary table.
    /// `None` for an empty selection.
    pub fn get_experiments_zipped(&self, ids: &[String]) -> Result<Option<Vec<u8>>, CatalogError> {
        export::zip_experiments(self, ids)
    }

    /// Fails when a stored experiment already has this measurement
    /// checksum, naming the earliest-registered collision.
    pub fn check_for_duplicate_experiment(&self, checksum: &str) -> Result<(), CatalogError> {
        if let Some(existing) = self.index.iter().find(|m| m.csv_checksum == checksum) {
            return Err(CatalogError::Duplicate {
                id: existing.experiment_id.clone(),
                name: existing.experiment_name.clone(),
            });
        }
        Ok(())
    }

    /// Stores a new experiment and returns its generated ID.
    ///
    /// The measurement file is validated and checked against existing
    /// checksums before anything touches the disk; the metadata registry
    /// is only updated after all three files are written.
    pub fn add_experiment_from_ui(
        &mut self,
        upload: ExperimentUpload,
    ) -> Result<String, CatalogError> {
        let prefix = self.id_prefix.clone().ok_or_else(|| {
            CatalogError::Config(
                "an experiment ID prefix is required to add experiments".to_string(),
            )
        })?;

        let csv_bytes = decode_payload(&upload.csv_base64, "measurement file")?;
        let structure_text = decode_structure(&upload.structure_base64)?;

        let raw = RawTable::parse(&csv_bytes)?;
        validate_variant_table(&raw)?;
        let table = build_variant_table(&raw)?;
        let parent_sequence = extract_parent_sequence(&raw).ok_or_else(|| {
            CatalogError::InvalidExperiment(
                "the parent row carries no amino-acid sequence".to_string(),
            )
        })?;

        let checksum = sha256_hex(&csv_bytes);
        self.check_for_duplicate_experiment(&checksum)?;

        let id = generate_experiment_id(&prefix);
        let metadata = ExperimentMetadata {
            experiment_id: id.clone(),
            experiment_name: upload.experiment_name,
            doi: upload.doi,
            experiment_date: upload.experiment_date,
            substrate: upload.substrate,
            product: upload.product,
            assay: upload.assay,
            mutagenesis_method: upload.mutagenesis_method,
            parent_sequence,
            plates_count: table.plates().len(),
            csv_checksum: checksum,
            additional_information: upload.additional_information,
            upload_time_stamp: upload_timestamp(),
        };

        let dir = self.root.join(&id);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(format!("{id}.json")), metadata.to_pretty_json()?)?;
        fs::write(dir.join(format!("{id}.csv")), &csv_bytes)?;
        fs::write(dir.join(format!("{id}.cif")), structure_text.as_bytes())?;

        log::info!("stored experiment {id} ({} plates)", metadata.plates_count);
        self.index.insert(id.clone(), metadata);
        Ok(id)
    }

    /// Moves an experiment into the soft-delete directory.
    ///
    /// Returns `false` for unknown IDs. The files survive under
    /// `DELETED_EXP/{id}_{timestamp}` and are invisible to later scans.
    pub fn delete_experiment(&mut self, id: &str) -> Result<bool, CatalogError> {
        if !self.index.contains(id) {
            log::warn!("delete requested for unknown experiment {id}");
            return Ok(false);
        }
        let source = self.root.join(id);
        if !source.is_dir() {
            return Err(CatalogError::NotFound(id.to_string()));
        }
        let stamp = Local::now().format(DELETE_TIMESTAMP_FORMAT);
        let target = self.root.join(DELETED_DIR).join(format!("{id}_{stamp}"));
        fs::rename(&source, &target)?;
        self.index.remove(id);
        self.cache.remove(&id.to_string());
        log::info!("experiment {id} moved to {}", target.display());
        Ok(true)
    }

    fn load_experiment(&self, id: &str) -> Result<Experiment, CatalogError> {
        let dir = self.root.join(id);
        let csv_bytes = fs::read(dir.join(format!("{id}.csv")))?;
        if csv_bytes.is_empty() {
            return Err(CatalogError::InvalidExperiment(format!(
                "measurement file for '{id}' is empty"
            )));
        }
        let table = enzdb_formats::parse_and_validate(&csv_bytes)?;
        let structure_text = fs::read_to_string(dir.join(format!("{id}.cif")))?;
        if structure_text.trim().is_empty() {
            return Err(CatalogError::InvalidExperiment(format!(
                "structure file for '{id}' is empty"
            )));
        }
        log::debug!("loaded experiment {id} with {} rows", table.len());
        Ok(Experiment::new(table, structure_text))
    }
}

/// New experiment ID: the uppercase prefix, a dash and a random UUID.
pub fn generate_experiment_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

/// Lowercase hex SHA-256 of a file body.
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn decode_payload(encoded: &str, what: &str) -> Result<Vec<u8>, CatalogError> {
    let bytes = BASE64.decode(encoded.trim()).map_err(|err| {
        CatalogError::InvalidExperiment(format!("{what} is not valid base64: {err}"))
    })?;
    if bytes.is_empty() {
        return Err(CatalogError::InvalidExperiment(format!("{what} is empty")));
    }
    Ok(bytes)
}

fn decode_structure(encoded: &str) -> Result<String, CatalogError> {
    let bytes = decode_payload(encoded, "structure file")?;
    let text = String::from_utf8(bytes).map_err(|_| {
        CatalogError::InvalidExperiment("structure file is not UTF-8 text".to_string())
    })?;
    if text.trim().is_empty() {
        return Err(CatalogError::InvalidExperiment(
            "structure file is empty".to_string(),
        ));
    }
    Ok(text)
}

fn ensure_writable(root: &Path) -> Result<(), CatalogError> {
    let probe = root.join(".write_probe");
    fs::write(&probe, b"")
        .and_then(|()| fs::remove_file(&probe))
        .map_err(|err| {
            CatalogError::Config(format!(
                "data modification is enabled but '{}' is not writable: {err}",
                root.display()
            ))
        })
}

fn load_assay_list(settings: &Settings) -> Result<Vec<String>, CatalogError> {
    let Some(path) = settings.disk.assay_file.as_ref() else {
        return Ok(Vec::new());
    };
    if !path.is_file() {
        log::warn!("assay list {} is missing; continuing without it", path.display());
        return Ok(Vec::new());
    }
    let mut reader = csv::Reader::from_path(path)?;
    let mut assays = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(name) = record.get(0) {
            if !name.trim().is_empty() {
                assays.push(name.trim().to_string());
            }
        }
    }
    log::info!("assay list loaded with {} entries", assays.len());
    Ok(assays)
}

/// Walks the data directory and registers every complete experiment.
///
/// A complete experiment is a `{dir}/{dir}.json` whose sibling `.csv` and
/// `.cif` files exist and are non-empty. Files are visited in lexical path
/// order so registration order is stable across platforms.
fn scan_metadata(root: &Path) -> Result<MetadataIndex, CatalogError> {
    let mut json_files = Vec::new();
    collect_json_files(root, &mut json_files)?;
    json_files.sort();

    let mut index = MetadataIndex::default();
    for path in json_files {
        match register_candidate(&path) {
            Ok((id, metadata)) => index.insert(id, metadata),
            Err(reason) => log::warn!("skipping {}: {reason}", path.display()),
        }
    }
    Ok(index)
}

fn collect_json_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), CatalogError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            if entry.file_name() == DELETED_DIR {
                continue;
            }
            collect_json_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "json") {
            out.push(path);
        }
    }
    Ok(())
}

fn register_candidate(path: &Path) -> Result<(String, ExperimentMetadata), String> {
    let stem = path
        .file_stem()
        .and_then(OsStr::to_str)
        .ok_or("unreadable file name")?;
    let dir = path.parent().ok_or("no containing directory")?;
    let dir_name = dir
        .file_name()
        .and_then(OsStr::to_str)
        .ok_or("unreadable directory name")?;
    if stem != dir_name {
        return Err("metadata file name does not match its directory".to_string());
    }
    for extension in ["csv", "cif"] {
        let sibling = dir.join(format!("{stem}.{extension}"));
        let size = fs::metadata(&sibling).map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(format!("{stem}.{extension} is missing or empty"));
        }
    }
    let bytes = fs::read(path).map_err(|err| err.to_string())?;
    let metadata = ExperimentMetadata::from_json(&bytes).map_err(|err| err.to_string())?;
    Ok((stem.to_string(), metadata))
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- 1. ID generation ---

    #[test]
    fn test_experiment_id_shape() {
        let id = generate_experiment_id("DEMOX");
        assert_eq!(id.len(), 42);
        assert!(id.starts_with("DEMOX-"));
        assert_ne!(id, generate_experiment_id("DEMOX"));
    }

    // --- 2. Checksums ---

    #[test]
    fn test_sha256_known_vectors() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    // --- 3. Upload payload decoding ---

    #[test]
    fn test_decode_rejects_bad_base64_and_empty() {
        assert!(decode_payload("!!!", "measurement file").is_err());
        assert!(decode_payload("", "measurement file").is_err());
    }

    #[test]
    fn test_decode_structure_requires_utf8_text() {
        let binary = BASE64.encode([0xff, 0xfe, 0x00]);
        assert!(decode_structure(&binary).is_err());
        let blank = BASE64.encode("   \n");
        assert!(decode_structure(&blank).is_err());
        let ok = BASE64.encode("data_demo\n_cell.length_a 1.0\n");
        assert_eq!(decode_structure(&ok).unwrap(), "data_demo\n_cell.length_a 1.0\n");
    }
}
