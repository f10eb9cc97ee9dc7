//! Experiment metadata records.

use chrono::Local;
use serde::{Deserialize, Serialize};

/// Timestamp format used in metadata records.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Mutagenesis strategies an experiment may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutagenesisMethod {
    #[serde(rename = "epPCR")]
    EpPcr,
    #[serde(rename = "SSM")]
    Ssm,
}

impl std::fmt::Display for MutagenesisMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MutagenesisMethod::EpPcr => write!(f, "epPCR"),
            MutagenesisMethod::Ssm => write!(f, "SSM"),
        }
    }
}

/// One experiment's descriptive record.
///
/// Field order here is the canonical key order of the stored JSON file;
/// keep the two in sync when adding fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentMetadata {
    pub experiment_id: String,
    pub experiment_name: String,
    pub doi: String,
    pub experiment_date: String,
    pub substrate: String,
    pub product: String,
    pub assay: String,
    pub mutagenesis_method: MutagenesisMethod,
    pub parent_sequence: String,
    pub plates_count: usize,
    pub csv_checksum: String,
    pub additional_information: String,
    pub upload_time_stamp: String,
}

impl ExperimentMetadata {
    /// Serializes the record as four-space-indented JSON.
    pub fn to_pretty_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)?;
        Ok(buf)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Local wall-clock time in [`TIMESTAMP_FORMAT`].
pub fn upload_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) fn sample() -> ExperimentMetadata {
        ExperimentMetadata {
            experiment_id: "DEMOX-123e4567-e89b-42d3-a456-426614174000".to_string(),
            experiment_name: "Ethanol oxidation round 3".to_string(),
            doi: "10.1000/demo".to_string(),
            experiment_date: "2024-11-02".to_string(),
            substrate: "CCO".to_string(),
            product: "CC=O".to_string(),
            assay: "GC-MS".to_string(),
            mutagenesis_method: MutagenesisMethod::EpPcr,
            parent_sequence: "MKTAYIAKQRQISFVKSHFSRQLEERLGLIEVQ".to_string(),
            plates_count: 2,
            csv_checksum: "0".repeat(64),
            additional_information: String::new(),
            upload_time_stamp: "2024-11-02 10:15:00".to_string(),
        }
    }

    // --- 1. JSON shape ---

    #[test]
    fn test_pretty_json_key_order_and_indent() {
        let json = String::from_utf8(sample().to_pretty_json().unwrap()).unwrap();
        let lines: Vec<&str> = json.lines().collect();
        assert_eq!(lines[0], "{");
        assert!(lines[1].starts_with("    \"experiment_id\":"));
        assert!(lines[2].starts_with("    \"experiment_name\":"));
        assert!(lines[8].starts_with("    \"mutagenesis_method\": \"epPCR\""));
        assert!(json.ends_with('}'));
    }

    #[test]
    fn test_json_round_trip() {
        let original = sample();
        let bytes = original.to_pretty_json().unwrap();
        let reparsed = ExperimentMetadata::from_json(&bytes).unwrap();
        assert_eq!(reparsed, original);
    }

    // --- 2. Mutagenesis method encoding ---

    #[test]
    fn test_method_wire_names() {
        assert_eq!(
            serde_json::to_string(&MutagenesisMethod::EpPcr).unwrap(),
            "\"epPCR\""
        );
        assert_eq!(
            serde_json::to_string(&MutagenesisMethod::Ssm).unwrap(),
            "\"SSM\""
        );
        assert_eq!(MutagenesisMethod::Ssm.to_string(), "SSM");
    }

    #[test]
    fn test_unknown_method_rejected() {
        let result: Result<MutagenesisMethod, _> = serde_json::from_str("\"cassette\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_timestamp_format_shape() {
        let stamp = upload_timestamp();
        assert_eq!(stamp.len(), 19);
        assert_eq!(&stamp[4..5], "-");
        assert_eq!(&stamp[10..11], " ");
        assert_eq!(&stamp[13..14], ":");
    }
}
