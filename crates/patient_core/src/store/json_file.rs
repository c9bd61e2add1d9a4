//! JSON document store for the patient collection.
//!
//! # Responsibility
//! - Round-trip the whole collection through one JSON file.
//! - Replace the file atomically on save.
//!
//! # Invariants
//! - Saves write a sibling temp file, fsync it, then rename over the target,
//!   so readers observe either the old or the new document.
//! - An existing file keeps its permissions across saves, and a symlinked
//!   path is written through to its target. A file created by the first save
//!   gets the temp file's owner-only mode.
//! - Load rejects blank collection keys and invalid record values.
//! - Log events carry paths and counts only, never patient fields.

use super::{Collection, CollectionStore, StoreError, StoreResult};
use crate::model::patient::validate_patient_id;
use log::{error, info};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;

/// Collection store backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates an empty collection document when the file does not exist.
    ///
    /// Returns `true` when a new document was written.
    pub fn init_if_missing(&self) -> StoreResult<bool> {
        match fs::metadata(&self.path) {
            Ok(_) => Ok(false),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                self.save(&Collection::new())?;
                info!(
                    "event=store_init module=store status=ok path={}",
                    self.path.display()
                );
                Ok(true)
            }
            Err(source) => Err(StoreError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn read_collection(&self) -> StoreResult<Collection> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StoreError::Missing(self.path.clone()));
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let collection: Collection =
            serde_json::from_str(&text).map_err(|source| StoreError::Malformed {
                path: self.path.clone(),
                source,
            })?;

        for id in collection.keys() {
            validate_patient_id(id).map_err(|source| StoreError::InvalidEntry {
                id: id.clone(),
                source,
            })?;
        }

        Ok(collection)
    }

    fn write_collection(&self, collection: &Collection) -> StoreResult<()> {
        let mut bytes = serde_json::to_vec_pretty(collection).map_err(StoreError::Serialize)?;
        bytes.push(b'\n');
        replace_file(&self.path, &bytes).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl CollectionStore for JsonFileStore {
    fn load(&self) -> StoreResult<Collection> {
        let started_at = Instant::now();
        match self.read_collection() {
            Ok(collection) => {
                info!(
                    "event=store_load module=store status=ok records={} duration_ms={}",
                    collection.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(collection)
            }
            Err(err) => {
                error!(
                    "event=store_load module=store status=error path={} duration_ms={} error={}",
                    self.path.display(),
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn save(&self, collection: &Collection) -> StoreResult<()> {
        let started_at = Instant::now();
        match self.write_collection(collection) {
            Ok(()) => {
                info!(
                    "event=store_save module=store status=ok records={} duration_ms={}",
                    collection.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=store_save module=store status=error path={} duration_ms={} error={}",
                    self.path.display(),
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }
}

fn replace_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    // Write through a symlink to its target instead of replacing the link.
    let target = match fs::canonicalize(path) {
        Ok(resolved) => resolved,
        Err(err) if err.kind() == ErrorKind::NotFound => path.to_path_buf(),
        Err(err) => return Err(err),
    };
    // Temp file must share the target's filesystem for rename to be atomic.
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    match fs::metadata(&target) {
        Ok(existing) => tmp.as_file().set_permissions(existing.permissions())?,
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }
    tmp.as_file().sync_all()?;
    tmp.persist(&target).map_err(|err| err.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::JsonFileStore;
    use crate::store::{CollectionStore, StoreError};

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::new(dir.path().join("absent.json"));

        let err = store.load().expect_err("missing file must fail");
        assert!(matches!(err, StoreError::Missing(_)));
    }

    #[test]
    fn init_if_missing_writes_empty_document_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("patients.json");
        let store = JsonFileStore::new(&path);

        assert!(store.init_if_missing().expect("first init"));
        assert!(!store.init_if_missing().expect("second init"));
        assert!(store.load().expect("load after init").is_empty());
    }

    #[test]
    fn save_leaves_no_temp_files_behind() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::new(dir.path().join("patients.json"));
        store.init_if_missing().expect("init");
        store.save(&store.load().expect("load")).expect("save");

        let entries = std::fs::read_dir(dir.path())
            .expect("read dir")
            .collect::<Result<Vec<_>, _>>()
            .expect("dir entries");
        assert_eq!(entries.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn save_keeps_existing_mode_and_symlink() {
        use std::os::unix::fs::{symlink, PermissionsExt};

        let dir = tempfile::tempdir().expect("tempdir");
        let real = dir.path().join("patients.json");
        JsonFileStore::new(&real).init_if_missing().expect("init");
        std::fs::set_permissions(&real, std::fs::Permissions::from_mode(0o644))
            .expect("chmod");
        let link = dir.path().join("current.json");
        symlink(&real, &link).expect("symlink");

        let store = JsonFileStore::new(&link);
        store.save(&store.load().expect("load")).expect("save");

        let link_meta = std::fs::symlink_metadata(&link).expect("link metadata");
        assert!(link_meta.file_type().is_symlink());
        let mode = std::fs::metadata(&real).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}
