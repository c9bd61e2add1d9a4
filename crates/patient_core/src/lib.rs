//! Core domain logic for the patient record store.
//! This crate is the single source of truth for record invariants.

pub mod config;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use config::{FilePatientService, StoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::patient::{
    compute_bmi, parse_gender, BmiVerdict, FieldViolation, Gender, Patient, PatientDraft,
    PatientId, PatientRecord, PatientUpdate, PatientValidationError,
};
pub use repo::patient_repo::{
    ErrorKind, PatientRepository, RepoError, RepoResult, StorePatientRepository,
};
pub use service::patient_service::PatientService;
pub use store::{Collection, CollectionStore, JsonFileStore, MemoryStore, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
