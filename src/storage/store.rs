//! Files and catalog combined into one failable unit.

use super::catalog::{CaptureQuery, CapturePage, CapturedImage, Catalog, PersistenceError, SqliteCatalog};
use super::files::{FileStore, StorageError};
use chrono::{Local, NaiveDateTime};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

/// Errors raised by [`CaptureStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("capture catalog lock poisoned")]
    Poisoned,
}

/// Persists captures as a file plus a catalog row.
///
/// A capture either ends up with both its file and its row or with
/// neither. All writes are serialized through the catalog lock.
pub struct CaptureStore {
    files: FileStore,
    catalog: Mutex<Box<dyn Catalog>>,
}

impl CaptureStore {
    /// Combines a file store and a catalog.
    pub fn new(files: FileStore, catalog: impl Catalog + 'static) -> Self {
        Self {
            files,
            catalog: Mutex::new(Box::new(catalog)),
        }
    }

    /// Opens the SQLite catalog at `database` for files under `captures_dir`.
    pub fn open(captures_dir: impl AsRef<Path>, database: impl AsRef<Path>) -> Result<Self, StoreError> {
        let catalog = SqliteCatalog::open(database.as_ref())?;
        tracing::info!(
            captures_dir = %captures_dir.as_ref().display(),
            database = %database.as_ref().display(),
            "Capture store opened"
        );
        Ok(Self::new(FileStore::new(captures_dir.as_ref()), catalog))
    }

    fn catalog(&self) -> Result<MutexGuard<'_, Box<dyn Catalog>>, StoreError> {
        self.catalog.lock().map_err(|_| StoreError::Poisoned)
    }

    /// File side of the store.
    pub fn files(&self) -> &FileStore {
        &self.files
    }

    /// Stores a frame taken now.
    pub fn persist(&self, frame: &[u8]) -> Result<CapturedImage, StoreError> {
        self.persist_at(frame, Local::now().naive_local())
    }

    /// Stores a frame with an explicit capture time.
    ///
    /// The row is only written once the file is on disk; if the row
    /// cannot be written the file is removed again.
    pub fn persist_at(&self, frame: &[u8], at: NaiveDateTime) -> Result<CapturedImage, StoreError> {
        let mut catalog = self.catalog()?;
        let relative = self.files.store(frame, at)?;

        match catalog.record(&relative, at) {
            Ok(image) => Ok(image),
            Err(e) => {
                if let Err(cleanup) = self.files.remove(&relative) {
                    tracing::error!(error = %cleanup, "Failed to remove orphaned capture file");
                }
                Err(e.into())
            }
        }
    }

    /// Number of stored captures.
    pub fn count(&self) -> Result<u64, StoreError> {
        Ok(self.catalog()?.count()?)
    }

    /// One page of stored captures.
    pub fn page(&self, query: &CaptureQuery) -> Result<CapturePage, StoreError> {
        Ok(self.catalog()?.page(query)?)
    }

    /// Deletes every capture row and its file. Returns the number of rows removed.
    ///
    /// Rows go first, in one transaction. Files that fail to delete are
    /// logged and left behind rather than failing the whole operation.
    pub fn remove_all(&self) -> Result<usize, StoreError> {
        let mut catalog = self.catalog()?;
        let removed = catalog.remove_all()?;

        let mut failed = 0usize;
        for image in &removed {
            if let Err(e) = self.files.remove(&image.relative_path) {
                tracing::warn!(error = %e, "Failed to remove capture file");
                failed += 1;
            }
        }
        if let Err(e) = self.files.prune_empty_dirs() {
            tracing::warn!(error = %e, "Failed to prune capture folders");
        }

        tracing::info!(removed = removed.len(), failed, "Removed all captures");
        Ok(removed.len())
    }
}
