//! Capture metadata catalog.

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Timestamp layout stored in the database. Fixed width, so text order is time order.
const DB_TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Timestamp layout used by the gallery's date-range filter.
pub const FRONTEND_TS_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Errors raised by the catalog.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("corrupt capture row {id}: {reason}")]
    CorruptRow { id: i64, reason: String },
}

/// A persisted capture record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapturedImage {
    /// Row id.
    pub id: i64,
    /// File path relative to the capture directory.
    pub relative_path: PathBuf,
    /// Local time of the capture.
    pub created_at: NaiveDateTime,
}

/// Page request over the catalog, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureQuery {
    /// 1-based page number.
    pub page: u32,
    /// Items per page.
    pub per_page: u32,
    /// Only captures strictly after this instant.
    pub from: Option<NaiveDateTime>,
    /// Only captures strictly before this instant.
    pub until: Option<NaiveDateTime>,
}

impl CaptureQuery {
    /// First page with no date filter.
    pub fn first_page(per_page: u32) -> Self {
        Self {
            page: 1,
            per_page,
            from: None,
            until: None,
        }
    }

    fn offset(&self) -> i64 {
        i64::from(self.page.max(1) - 1) * i64::from(self.per_page)
    }
}

/// One page of captures.
#[derive(Debug, Clone, Serialize)]
pub struct CapturePage {
    /// Captures on this page, newest first.
    pub items: Vec<CapturedImage>,
    /// 1-based page number.
    pub page: u32,
    /// Requested page size.
    pub per_page: u32,
    /// Captures matching the filter across all pages.
    pub total: u64,
    /// Number of pages for the filter.
    pub total_pages: u32,
}

/// Parses a gallery filter timestamp. Malformed input means "no filter".
pub fn parse_frontend_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, FRONTEND_TS_FORMAT).ok()
}

/// Storage of capture records.
pub trait Catalog: Send {
    /// Inserts a record for a stored file.
    fn record(&mut self, relative_path: &Path, at: NaiveDateTime) -> Result<CapturedImage, PersistenceError>;

    /// Number of stored records.
    fn count(&self) -> Result<u64, PersistenceError>;

    /// Returns one page of records.
    fn page(&self, query: &CaptureQuery) -> Result<CapturePage, PersistenceError>;

    /// Deletes every record and returns what was deleted.
    fn remove_all(&mut self) -> Result<Vec<CapturedImage>, PersistenceError>;
}

/// SQLite-backed catalog.
pub struct SqliteCatalog {
    conn: Connection,
}

impl SqliteCatalog {
    /// Opens (or creates) the catalog database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let catalog = Self { conn };
        catalog.ensure_schema()?;
        Ok(catalog)
    }

    /// Opens a throwaway in-memory catalog.
    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        let catalog = Self {
            conn: Connection::open_in_memory()?,
        };
        catalog.ensure_schema()?;
        Ok(catalog)
    }

    fn ensure_schema(&self) -> Result<(), PersistenceError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS captured_images (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              relative_path TEXT NOT NULL UNIQUE,
              created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_captured_images_created ON captured_images(created_at);
            "#,
        )?;
        Ok(())
    }

    fn row_to_image(id: i64, relative_path: String, created_at: String) -> Result<CapturedImage, PersistenceError> {
        let created_at = NaiveDateTime::parse_from_str(&created_at, DB_TS_FORMAT).map_err(|e| {
            PersistenceError::CorruptRow {
                id,
                reason: format!("bad created_at {:?}: {}", created_at, e),
            }
        })?;
        Ok(CapturedImage {
            id,
            relative_path: PathBuf::from(relative_path),
            created_at,
        })
    }

    fn bound(value: Option<NaiveDateTime>) -> Option<String> {
        value.map(|v| v.format(DB_TS_FORMAT).to_string())
    }
}

const FILTER: &str = "(?1 IS NULL OR created_at > ?1) AND (?2 IS NULL OR created_at < ?2)";

impl Catalog for SqliteCatalog {
    fn record(&mut self, relative_path: &Path, at: NaiveDateTime) -> Result<CapturedImage, PersistenceError> {
        let path = relative_path.to_string_lossy().into_owned();
        self.conn.execute(
            "INSERT INTO captured_images(relative_path, created_at) VALUES (?1, ?2)",
            params![path, at.format(DB_TS_FORMAT).to_string()],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, path = %path, "Recorded capture");
        Ok(CapturedImage {
            id,
            relative_path: relative_path.to_path_buf(),
            // round-trip through the stored precision
            created_at: NaiveDateTime::parse_from_str(&at.format(DB_TS_FORMAT).to_string(), DB_TS_FORMAT)
                .unwrap_or(at),
        })
    }

    fn count(&self) -> Result<u64, PersistenceError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM captured_images", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    fn page(&self, query: &CaptureQuery) -> Result<CapturePage, PersistenceError> {
        let from = Self::bound(query.from);
        let until = Self::bound(query.until);

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM captured_images WHERE {}", FILTER),
            params![from, until],
            |row| row.get(0),
        )?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, relative_path, created_at FROM captured_images WHERE {} \
             ORDER BY created_at DESC, id DESC LIMIT ?3 OFFSET ?4",
            FILTER
        ))?;
        let rows = stmt.query_map(
            params![from, until, i64::from(query.per_page), query.offset()],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?)),
        )?;

        let mut items = Vec::new();
        for row in rows {
            let (id, path, created_at) = row?;
            items.push(Self::row_to_image(id, path, created_at)?);
        }

        let total = total.max(0) as u64;
        let total_pages = if query.per_page == 0 {
            0
        } else {
            total.div_ceil(u64::from(query.per_page)) as u32
        };

        Ok(CapturePage {
            items,
            page: query.page.max(1),
            per_page: query.per_page,
            total,
            total_pages,
        })
    }

    fn remove_all(&mut self) -> Result<Vec<CapturedImage>, PersistenceError> {
        let tx = self.conn.transaction()?;
        let removed = {
            let mut stmt = tx.prepare("SELECT id, relative_path, created_at FROM captured_images ORDER BY id")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
            })?;
            let mut removed = Vec::new();
            for row in rows {
                let (id, path, created_at) = row?;
                removed.push(Self::row_to_image(id, path, created_at)?);
            }
            removed
        };
        let deleted = tx.execute("DELETE FROM captured_images", [])?;
        tx.commit()?;

        tracing::info!(deleted, "Removed all capture records");
        Ok(removed)
    }
}
