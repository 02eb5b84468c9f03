//! Persistence backends for the vector index.
//!
//! Both backends store the same records; they differ only in how writes are
//! made durable and atomic:
//! - [`JsonStore`]: one JSON document, rewritten through a unique temp file
//!   + rename + directory fsync.
//!   Batch-atomic. Concurrent writer *processes* race: last rename wins.
//! - [`SqliteStore`]: one table, one transaction per write call. Prefer it
//!   when several processes write to the same index.

mod json;
mod sqlite;

pub use json::JsonStore;
pub use sqlite::SqliteStore;

use crate::types::{EmbeddingRecord, MetadataFilter};
use retailgenie_core::{AppResult, IndexConfig, StoreBackend};
use std::path::Path;

/// Trait for record persistence backends.
///
/// Implementations must:
/// - Make each write call durable and atomic before returning
/// - Never expose a partially written record to readers
/// - Report an unreadable store as an error, never as an empty store
///
/// Callers serialize writes; `VectorIndex` holds a write lock for that.
pub trait RecordStore: Send + Sync + std::fmt::Debug {
    /// Backend kind.
    fn backend(&self) -> StoreBackend;

    /// Location of the backing file.
    fn path(&self) -> &Path;

    /// Load records in storage order.
    ///
    /// `filter` is a hint: a backend may use it to skip records early but
    /// can return non-matching records. Callers apply the filter themselves.
    fn load(&self, filter: Option<&MetadataFilter>) -> AppResult<Vec<EmbeddingRecord>>;

    /// Fetch one record by key.
    fn get(&self, key: &str) -> AppResult<Option<EmbeddingRecord>>;

    /// Insert or replace records by key. Later duplicates in `records` win.
    fn upsert(&self, records: Vec<EmbeddingRecord>) -> AppResult<()>;

    /// Remove one record. Returns whether it existed.
    fn delete(&self, key: &str) -> AppResult<bool>;

    /// Remove all records.
    fn clear(&self) -> AppResult<()>;

    /// Number of stored records.
    fn count(&self) -> AppResult<usize>;
}

/// Open (creating if absent) the store described by `config`.
pub fn open_store(config: &IndexConfig) -> AppResult<Box<dyn RecordStore>> {
    let store: Box<dyn RecordStore> = match config.backend {
        StoreBackend::Sqlite => Box::new(SqliteStore::open(&config.path)?),
        StoreBackend::Json => Box::new(JsonStore::open(&config.path)?),
    };

    tracing::debug!(
        "Opened {} vector store at {:?}",
        store.backend(),
        store.path()
    );
    Ok(store)
}

/// Create the parent directory of a store file.
fn ensure_parent_dir(path: &Path) -> AppResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            retailgenie_core::AppError::Storage(format!(
                "Failed to create index directory {:?}: {}",
                parent, e
            ))
        })?;
    }
    Ok(())
}
