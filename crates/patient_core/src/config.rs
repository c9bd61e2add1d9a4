//! Runtime configuration for the patient store.
//!
//! # Responsibility
//! - Resolve data file path and logging settings from the environment.
//! - Build a ready-to-use file-backed service.
//!
//! # Invariants
//! - Blank environment values are treated as unset.

use crate::logging::default_log_level;
use crate::repo::patient_repo::StorePatientRepository;
use crate::service::patient_service::PatientService;
use crate::store::JsonFileStore;
use std::path::PathBuf;

/// Default data file, relative to the working directory.
pub const DEFAULT_STORE_FILE_NAME: &str = "patience.json";
pub const STORE_PATH_ENV: &str = "PATIENT_STORE_PATH";
pub const LOG_LEVEL_ENV: &str = "PATIENT_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "PATIENT_LOG_DIR";

/// File-backed service type produced by [`StoreConfig::open_service`].
pub type FilePatientService = PatientService<StorePatientRepository<JsonFileStore>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// JSON document holding the collection.
    pub data_path: PathBuf,
    pub log_level: String,
    /// File logging is disabled when `None`.
    pub log_dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_STORE_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl StoreConfig {
    /// Reads `PATIENT_STORE_PATH`, `PATIENT_LOG_LEVEL` and `PATIENT_LOG_DIR`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves settings through `lookup`, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            data_path: non_blank(lookup(STORE_PATH_ENV))
                .map(PathBuf::from)
                .unwrap_or(defaults.data_path),
            log_level: non_blank(lookup(LOG_LEVEL_ENV)).unwrap_or(defaults.log_level),
            log_dir: non_blank(lookup(LOG_DIR_ENV)).map(PathBuf::from),
        }
    }

    pub fn open_store(&self) -> JsonFileStore {
        JsonFileStore::new(&self.data_path)
    }

    pub fn open_service(&self) -> FilePatientService {
        PatientService::new(StorePatientRepository::new(self.open_store()))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}
