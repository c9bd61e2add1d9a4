//! Whole-collection storage for patient records.
//!
//! # Responsibility
//! - Define the load/save capability that repositories depend on.
//! - Provide a JSON-file implementation and an in-memory implementation.
//!
//! # Invariants
//! - `load` returns either a fully valid collection or an error; it never
//!   masks invalid persisted state.
//! - `save` replaces the whole persisted collection in one step.

use crate::model::patient::{PatientId, PatientRecord, PatientValidationError};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// Every patient keyed by id. Sorted so serialized output is deterministic.
pub type Collection = BTreeMap<PatientId, PatientRecord>;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    /// The backing file does not exist.
    Missing(PathBuf),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The document is not JSON, has the wrong shape, or holds an invalid
    /// record value.
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// A collection key failed id validation.
    InvalidEntry {
        id: PatientId,
        source: PatientValidationError,
    },
    Serialize(serde_json::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(path) => write!(f, "patient store not found: {}", path.display()),
            Self::Io { path, source } => {
                write!(f, "patient store I/O failed at `{}`: {source}", path.display())
            }
            Self::Malformed { path, source } => write!(
                f,
                "patient store `{}` is not a valid collection: {source}",
                path.display()
            ),
            Self::InvalidEntry { id, source } => {
                write!(f, "invalid persisted patient `{id}`: {source}")
            }
            Self::Serialize(source) => write!(f, "failed to serialize patient collection: {source}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Missing(_) => None,
            Self::Io { source, .. } => Some(source),
            Self::Malformed { source, .. } => Some(source),
            Self::InvalidEntry { source, .. } => Some(source),
            Self::Serialize(source) => Some(source),
        }
    }
}

/// Load/save capability over the entire patient collection.
pub trait CollectionStore {
    /// Reads and parses the entire persisted collection.
    fn load(&self) -> StoreResult<Collection>;
    /// Overwrites the entire persisted collection.
    fn save(&self, collection: &Collection) -> StoreResult<()>;
}

impl<S: CollectionStore + ?Sized> CollectionStore for &S {
    fn load(&self) -> StoreResult<Collection> {
        (**self).load()
    }

    fn save(&self, collection: &Collection) -> StoreResult<()> {
        (**self).save(collection)
    }
}
