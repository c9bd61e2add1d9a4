//! Patient use-case service.
//!
//! # Responsibility
//! - Provide stable view/create/update/delete entry points for callers.
//! - Validate caller input before any repository call.
//!
//! # Invariants
//! - Service APIs never bypass repository persistence contracts.
//! - Service layer remains storage-agnostic.

use crate::model::patient::{Patient, PatientDraft, PatientUpdate};
use crate::repo::patient_repo::{PatientRepository, RepoError, RepoResult};
use crate::store::Collection;

/// Use-case service wrapper for patient operations.
pub struct PatientService<R: PatientRepository> {
    repo: R,
}

impl<R: PatientRepository> PatientService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Returns the whole persisted collection.
    pub fn view_all(&self) -> RepoResult<Collection> {
        self.repo.load_collection()
    }

    /// Lists every patient with derived `bmi`/`verdict`, ordered by id.
    pub fn list_patients(&self) -> RepoResult<Vec<Patient>> {
        self.repo.list_patients()
    }

    /// Gets one patient by id.
    ///
    /// # Errors
    /// - `RepoError::NotFound` when no patient has this id.
    pub fn view_patient(&self, id: &str) -> RepoResult<Patient> {
        self.repo
            .get_patient(id)?
            .ok_or_else(|| RepoError::NotFound(id.to_string()))
    }

    /// Validates a full field set and inserts it.
    ///
    /// # Contract
    /// - Validation failure returns every violated field and writes nothing.
    /// - An existing id returns `RepoError::Conflict` and writes nothing.
    pub fn create_patient(&self, draft: &PatientDraft) -> RepoResult<Patient> {
        let patient = Patient::validate(draft)?;
        self.repo.insert_patient(&patient)?;
        Ok(patient)
    }

    /// Applies sparse field overrides to an existing patient.
    ///
    /// # Contract
    /// - Present fields are checked before the id is looked up.
    /// - Absent fields keep their stored values.
    /// - Unknown id returns `RepoError::NotFound`.
    pub fn update_patient(&self, id: &str, update: &PatientUpdate) -> RepoResult<Patient> {
        update.validate()?;
        self.repo.update_patient(id, update)
    }

    /// Deletes one patient by id.
    pub fn delete_patient(&self, id: &str) -> RepoResult<()> {
        self.repo.delete_patient(id)
    }
}
