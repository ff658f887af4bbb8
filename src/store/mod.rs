//! Dedup store: the record of remote items that already landed on disk.
//!
//! Backed by a single `downloaded_items` table. A row is written only after an
//! item's bytes were fully saved, so anything missing from the table is picked
//! up again by the next run.
//!
//! # Example
//!
//! ```ignore
//! use media_backup::{Database, DownloadedItems};
//!
//! let store = DownloadedItems::new(Database::new_in_memory().await?);
//! if !store.exists("AKx9").await? {
//!     // ... download ...
//!     store.record("AKx9").await?;
//! }
//! ```

mod error;

pub use error::{StorageError, StorageErrorKind};

use tracing::{debug, instrument};

use crate::db::Database;

/// Handle to the `downloaded_items` table.
///
/// Cheap to clone; clones share the underlying connection pool, so download
/// workers running concurrently rely on SQLite's own locking rather than any
/// lock held here.
#[derive(Debug, Clone)]
pub struct DownloadedItems {
    db: Database,
}

impl DownloadedItems {
    /// Wraps an open database.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns whether `id` was already downloaded.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the query fails.
    #[instrument(level = "debug", skip(self))]
    pub async fn exists(&self, id: &str) -> Result<bool, StorageError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM downloaded_items WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.is_some())
    }

    /// Marks `id` as downloaded. Recording an id twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the insert fails.
    #[instrument(level = "debug", skip(self))]
    pub async fn record(&self, id: &str) -> Result<(), StorageError> {
        let result = sqlx::query("INSERT OR IGNORE INTO downloaded_items (id) VALUES (?)")
            .bind(id)
            .execute(self.db.pool())
            .await?;
        if result.rows_affected() == 0 {
            debug!(item_id = id, "item already recorded");
        }
        Ok(())
    }

    /// Number of recorded items.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the query fails.
    #[instrument(level = "debug", skip(self))]
    pub async fn count(&self) -> Result<u64, StorageError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM downloaded_items")
            .fetch_one(self.db.pool())
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Underlying database handle.
    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }
}
