//! Patient repository contracts and store-backed implementation.
//!
//! # Responsibility
//! - Provide get/insert/replace/update/delete over a `CollectionStore`.
//! - Map storage state to semantic errors (`NotFound`, `Conflict`).
//!
//! # Invariants
//! - Every mutation is one load → modify → save cycle over the whole
//!   collection.
//! - A failed mutation never reaches `save`.
//! - Mutations through one repository are serialized by an in-process lock.
//!   Writers in other processes are not coordinated (last writer wins).

use crate::model::patient::{
    Patient, PatientId, PatientRecord, PatientUpdate, PatientValidationError,
};
use crate::store::{Collection, CollectionStore, StoreError};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

pub type RepoResult<T> = Result<T, RepoError>;

/// Stable failure category reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Store,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Store => "store",
        }
    }
}

/// Repository error for patient persistence and lookup.
#[derive(Debug)]
pub enum RepoError {
    Validation(PatientValidationError),
    NotFound(PatientId),
    /// Create targeted an id that already exists.
    Conflict(PatientId),
    Store(StoreError),
}

impl RepoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Store(_) => ErrorKind::Store,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "patient not found: {id}"),
            Self::Conflict(id) => write!(f, "patient already exists: {id}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::NotFound(_) | Self::Conflict(_) => None,
        }
    }
}

impl From<PatientValidationError> for RepoError {
    fn from(value: PatientValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Repository interface for patient CRUD operations.
pub trait PatientRepository {
    /// Returns the raw collection as persisted.
    fn load_collection(&self) -> RepoResult<Collection>;
    /// Returns every patient with derived fields, ordered by id.
    fn list_patients(&self) -> RepoResult<Vec<Patient>>;
    fn get_patient(&self, id: &str) -> RepoResult<Option<Patient>>;
    /// Fails with `Conflict` when the id is already present.
    fn insert_patient(&self, patient: &Patient) -> RepoResult<()>;
    /// Fails with `NotFound` when the id is absent.
    fn replace_patient(&self, patient: &Patient) -> RepoResult<()>;
    /// Merges `update` onto the stored patient and re-validates it.
    fn update_patient(&self, id: &str, update: &PatientUpdate) -> RepoResult<Patient>;
    fn delete_patient(&self, id: &str) -> RepoResult<()>;
}

/// Repository over any whole-collection store.
pub struct StorePatientRepository<S: CollectionStore> {
    store: S,
    write_lock: Mutex<()>,
}

impl<S: CollectionStore> StorePatientRepository<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs one read-modify-write cycle. `apply` errors skip the save.
    fn mutate<T>(
        &self,
        op: &'static str,
        apply: impl FnOnce(&mut Collection) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let started_at = Instant::now();

        let result = self.store.load().map_err(RepoError::from).and_then(|mut collection| {
            let value = apply(&mut collection)?;
            self.store.save(&collection)?;
            Ok(value)
        });

        match &result {
            Ok(_) => info!(
                "event=patient_{op} module=repo status=ok duration_ms={}",
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=patient_{op} module=repo status=error error_code={} duration_ms={}",
                err.kind().as_str(),
                started_at.elapsed().as_millis()
            ),
        }
        result
    }
}

impl<S: CollectionStore> PatientRepository for StorePatientRepository<S> {
    fn load_collection(&self) -> RepoResult<Collection> {
        Ok(self.store.load()?)
    }

    fn list_patients(&self) -> RepoResult<Vec<Patient>> {
        self.store
            .load()?
            .into_iter()
            .map(|(id, record)| stored_patient(&id, record))
            .collect()
    }

    fn get_patient(&self, id: &str) -> RepoResult<Option<Patient>> {
        let mut collection = self.store.load()?;
        collection
            .remove(id)
            .map(|record| stored_patient(id, record))
            .transpose()
    }

    fn insert_patient(&self, patient: &Patient) -> RepoResult<()> {
        self.mutate("insert", |collection| {
            if collection.contains_key(patient.id()) {
                return Err(RepoError::Conflict(patient.id().to_string()));
            }
            collection.insert(patient.id().to_string(), patient.record().clone());
            Ok(())
        })
    }

    fn replace_patient(&self, patient: &Patient) -> RepoResult<()> {
        self.mutate("replace", |collection| {
            match collection.get_mut(patient.id()) {
                Some(slot) => {
                    *slot = patient.record().clone();
                    Ok(())
                }
                None => Err(RepoError::NotFound(patient.id().to_string())),
            }
        })
    }

    fn update_patient(&self, id: &str, update: &PatientUpdate) -> RepoResult<Patient> {
        self.mutate("update", |collection| {
            let record = collection
                .get(id)
                .cloned()
                .ok_or_else(|| RepoError::NotFound(id.to_string()))?;
            let current = stored_patient(id, record)?;
            let updated = update.merge_into(&current)?;
            collection.insert(id.to_string(), updated.record().clone());
            Ok(updated)
        })
    }

    fn delete_patient(&self, id: &str) -> RepoResult<()> {
        self.mutate("delete", |collection| {
            collection
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| RepoError::NotFound(id.to_string()))
        })
    }
}

fn stored_patient(id: &str, record: PatientRecord) -> RepoResult<Patient> {
    Patient::from_stored(id, record).map_err(|source| {
        RepoError::Store(StoreError::InvalidEntry {
            id: id.to_string(),
            source,
        })
    })
}
