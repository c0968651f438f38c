//! Capture files on disk.
//!
//! Captures live under a root directory, one folder per day
//! (`{year}-{month}-{day}`, unpadded), each file named after its
//! microsecond timestamp.

use chrono::{Datelike, NaiveDateTime};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by the file store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to create capture directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("failed to write capture {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to remove capture {path}: {source}")]
    Remove { path: PathBuf, source: io::Error },
}

/// Writes and removes capture files below a root directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `root`. Nothing is created until the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root capture directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Relative path a capture taken at `at` is stored under.
    pub fn relative_path_for(at: NaiveDateTime) -> PathBuf {
        let day = format!("{}-{}-{}", at.year(), at.month(), at.day());
        let file = at.format("%y-%m-%d-%H-%M-%S-%6f.jpg").to_string();
        PathBuf::from(day).join(file)
    }

    /// Writes a frame and returns its path relative to the root.
    ///
    /// The day folder is created on first use. An existing file is never
    /// overwritten. A partially written file is removed before returning
    /// the error.
    pub fn store(&self, frame: &[u8], at: NaiveDateTime) -> Result<PathBuf, StorageError> {
        let relative = Self::relative_path_for(at);
        let path = self.root.join(&relative);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| StorageError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| StorageError::Write {
                path: path.clone(),
                source,
            })?;

        if let Err(source) = file.write_all(frame).and_then(|()| file.sync_all()) {
            drop(file);
            let _ = fs::remove_file(&path);
            return Err(StorageError::Write { path, source });
        }

        tracing::debug!(path = %relative.display(), bytes = frame.len(), "Stored capture file");
        Ok(relative)
    }

    /// Absolute path of a stored capture.
    pub fn resolve(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }

    /// Removes a stored capture. A file that is already gone is not an error.
    pub fn remove(&self, relative: &Path) -> Result<(), StorageError> {
        let path = self.resolve(relative);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Remove { path, source }),
        }
    }

    /// Removes empty day folders below the root. Returns how many were removed.
    pub fn prune_empty_dirs(&self) -> Result<usize, StorageError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(source) => {
                return Err(StorageError::Remove {
                    path: self.root.clone(),
                    source,
                })
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let is_empty = fs::read_dir(&path)
                .map(|mut d| d.next().is_none())
                .unwrap_or(false);
            if is_empty {
                fs::remove_dir(&path).map_err(|source| StorageError::Remove {
                    path: path.clone(),
                    source,
                })?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
