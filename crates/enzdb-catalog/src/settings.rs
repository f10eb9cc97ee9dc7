//! Instance configuration.
//!
//! Settings come from a TOML file with kebab-case keys. Two deployment
//! modes exist: a read-only public playground serving packaged data, and a
//! local instance working on a lab's own data directory. The combination
//! checks here run once at startup so storage code can assume a coherent
//! configuration.

use std::env;
use std::path::PathBuf;

use serde::Deserialize;

use crate::CatalogError;

/// Environment variable overriding the configured experiment ID prefix.
pub const PREFIX_ENV_VAR: &str = "FIVE_LETTER_ID_PREFIX";

pub const PUBLIC_PLAYGROUND: &str = "public-playground";
pub const LOCAL_INSTANCE: &str = "local-instance";

/// Packaged demo dataset served when no data path is configured.
pub const DEFAULT_DATA_DIR: &str = "data/experiments";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    pub deployment_mode: String,
    pub storage_mode: String,
    #[serde(default)]
    pub five_letter_id_prefix: Option<String>,
    #[serde(default)]
    pub disk: DiskSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DiskSettings {
    #[serde(default)]
    pub local_data_path: Option<PathBuf>,
    #[serde(default)]
    pub enable_data_modification: bool,
    /// Optional CSV listing the assay names offered at upload.
    #[serde(default)]
    pub assay_file: Option<PathBuf>,
}

impl Settings {
    pub fn load(path: &std::path::Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    pub fn modification_enabled(&self) -> bool {
        self.disk.enable_data_modification
    }

    /// Experiment data directory. Local instances must configure one;
    /// playground instances fall back to the packaged dataset.
    pub fn data_path(&self) -> Result<PathBuf, CatalogError> {
        match self.deployment_mode.as_str() {
            LOCAL_INSTANCE => self.disk.local_data_path.clone().ok_or_else(|| {
                CatalogError::Config(
                    "disk.local-data-path is required for a local instance".to_string(),
                )
            }),
            _ => Ok(self
                .disk
                .local_data_path
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))),
        }
    }

    /// Validated experiment ID prefix: exactly five letters, uppercased.
    /// The [`PREFIX_ENV_VAR`] environment variable overrides the
    /// configuration file. `None` when neither source sets one.
    pub fn id_prefix(&self) -> Result<Option<String>, CatalogError> {
        let configured = env::var(PREFIX_ENV_VAR)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .or_else(|| self.five_letter_id_prefix.clone());
        match configured {
            None => Ok(None),
            Some(raw) => {
                let trimmed = raw.trim();
                if trimmed.len() == 5 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
                    Ok(Some(trimmed.to_uppercase()))
                } else {
                    Err(CatalogError::Config(format!(
                        "five-letter-id-prefix must be exactly five letters. Got: '{trimmed}'"
                    )))
                }
            }
        }
    }

    fn prefix_present(&self) -> bool {
        let env_set = env::var(PREFIX_ENV_VAR)
            .map(|value| !value.trim().is_empty())
            .unwrap_or(false);
        env_set || self.five_letter_id_prefix.is_some()
    }

    /// Rejects configurations that would be unsafe or inconsistent to run.
    pub fn validate_deployment(&self) -> Result<(), CatalogError> {
        match self.storage_mode.as_str() {
            "disk" => {}
            "db" => {
                return Err(CatalogError::Config(
                    "storage-mode 'db' is not implemented yet".to_string(),
                ))
            }
            other => {
                return Err(CatalogError::Config(format!(
                    "storage-mode must be either 'disk' or 'db'. Got: '{other}'"
                )))
            }
        }

        match self.deployment_mode.as_str() {
            PUBLIC_PLAYGROUND => {
                if self.modification_enabled() {
                    return Err(CatalogError::Config(
                        "a public playground cannot run with data modification enabled"
                            .to_string(),
                    ));
                }
                if self.prefix_present() {
                    return Err(CatalogError::Config(
                        "a public playground cannot use an experiment ID prefix".to_string(),
                    ));
                }
                if self.disk.local_data_path.is_some() {
                    return Err(CatalogError::Config(
                        "a public playground cannot use a local data path".to_string(),
                    ));
                }
                Ok(())
            }
            LOCAL_INSTANCE => {
                self.data_path()?;
                if self.modification_enabled() && self.id_prefix()?.is_none() {
                    return Err(CatalogError::Config(
                        "a five-letter-id-prefix is required when data modification is enabled"
                            .to_string(),
                    ));
                }
                Ok(())
            }
            other => Err(CatalogError::Config(format!(
                "deployment-mode must be either 'public-playground' or 'local-instance'. Got: '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn local(path: Option<&str>, modification: bool, prefix: Option<&str>) -> Settings {
        Settings {
            deployment_mode: LOCAL_INSTANCE.to_string(),
            storage_mode: "disk".to_string(),
            five_letter_id_prefix: prefix.map(str::to_string),
            disk: DiskSettings {
                local_data_path: path.map(PathBuf::from),
                enable_data_modification: modification,
                assay_file: None,
            },
        }
    }

    fn playground() -> Settings {
        Settings {
            deployment_mode: PUBLIC_PLAYGROUND.to_string(),
            storage_mode: "disk".to_string(),
            five_letter_id_prefix: None,
            disk: DiskSettings::default(),
        }
    }

    // --- 1. TOML parsing ---

    #[test]
    fn test_kebab_case_keys_parse() {
        let settings: Settings = toml::from_str(
            r#"
            deployment-mode = "local-instance"
            storage-mode = "disk"
            five-letter-id-prefix = "wwxyz"

            [disk]
            local-data-path = "/srv/enzdb/data"
            enable-data-modification = true
            "#,
        )
        .unwrap();
        assert_eq!(settings.deployment_mode, "local-instance");
        assert!(settings.modification_enabled());
        assert_eq!(
            settings.disk.local_data_path.as_deref(),
            Some(std::path::Path::new("/srv/enzdb/data"))
        );
        assert_eq!(settings.id_prefix().unwrap().as_deref(), Some("WWXYZ"));
    }

    #[test]
    fn test_disk_section_is_optional() {
        let settings: Settings = toml::from_str(
            r#"
            deployment-mode = "public-playground"
            storage-mode = "disk"
            "#,
        )
        .unwrap();
        assert!(!settings.modification_enabled());
        assert_eq!(settings.data_path().unwrap(), PathBuf::from(DEFAULT_DATA_DIR));
    }

    // --- 2. Deployment validation ---

    #[test]
    fn test_clean_playground_is_valid() {
        assert!(playground().validate_deployment().is_ok());
    }

    #[test]
    fn test_playground_rejects_modification() {
        let mut settings = playground();
        settings.disk.enable_data_modification = true;
        assert!(matches!(
            settings.validate_deployment(),
            Err(CatalogError::Config(_))
        ));
    }

    #[test]
    fn test_playground_rejects_prefix_and_data_path() {
        let mut with_prefix = playground();
        with_prefix.five_letter_id_prefix = Some("ABCDE".to_string());
        assert!(with_prefix.validate_deployment().is_err());

        let mut with_path = playground();
        with_path.disk.local_data_path = Some(PathBuf::from("/tmp/x"));
        assert!(with_path.validate_deployment().is_err());
    }

    #[test]
    fn test_local_instance_requires_data_path() {
        let err = local(None, false, None).validate_deployment().unwrap_err();
        assert!(err.to_string().contains("local-data-path"));
    }

    #[test]
    fn test_local_modification_requires_prefix() {
        let err = local(Some("/srv/data"), true, None)
            .validate_deployment()
            .unwrap_err();
        assert!(err.to_string().contains("five-letter-id-prefix"));
        assert!(local(Some("/srv/data"), true, Some("abcde"))
            .validate_deployment()
            .is_ok());
    }

    #[test]
    fn test_unknown_deployment_mode_named_in_error() {
        let mut settings = playground();
        settings.deployment_mode = "staging".to_string();
        let message = settings.validate_deployment().unwrap_err().to_string();
        assert!(message.contains("Got: 'staging'"));
    }

    #[test]
    fn test_db_storage_mode_not_implemented() {
        let mut settings = playground();
        settings.storage_mode = "db".to_string();
        let message = settings.validate_deployment().unwrap_err().to_string();
        assert!(message.contains("not implemented"));
    }

    // --- 3. Prefix validation ---

    #[test]
    fn test_prefix_shape_is_enforced() {
        assert_eq!(
            local(Some("/d"), false, Some("abcde")).id_prefix().unwrap(),
            Some("ABCDE".to_string())
        );
        assert!(local(Some("/d"), false, Some("abcd")).id_prefix().is_err());
        assert!(local(Some("/d"), false, Some("ab1de")).id_prefix().is_err());
        assert_eq!(local(Some("/d"), false, None).id_prefix().unwrap(), None);
    }
}
