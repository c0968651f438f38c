//! Capture persistence.
//!
//! Captured frames are written as JPEG files into per-day folders and
//! indexed in a SQLite catalog. [`CaptureStore`] ties the two together so
//! a capture is never half-persisted.

mod catalog;
mod files;
mod store;

pub use catalog::{
    parse_frontend_timestamp, CaptureQuery, CapturePage, CapturedImage, Catalog, PersistenceError,
    SqliteCatalog, FRONTEND_TS_FORMAT,
};
pub use files::{FileStore, StorageError};
pub use store::{CaptureStore, StoreError};
