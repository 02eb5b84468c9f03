//! SQLite-backed record store.

use super::{ensure_parent_dir, RecordStore};
use crate::types::{EmbeddingRecord, MetadataFilter, MetadataValue, RecordMetadata};
use retailgenie_core::{AppError, AppResult, StoreBackend};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS embeddings (
    key TEXT PRIMARY KEY,
    id TEXT,
    text TEXT NOT NULL,
    embedding TEXT NOT NULL,
    category TEXT,
    name TEXT,
    extra TEXT
);

CREATE INDEX IF NOT EXISTS idx_embeddings_category ON embeddings(category);
"#;

const UPSERT: &str = "INSERT INTO embeddings (key, id, text, embedding, category, name, extra)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
     ON CONFLICT(key) DO UPDATE SET
         id = excluded.id,
         text = excluded.text,
         embedding = excluded.embedding,
         category = excluded.category,
         name = excluded.name,
         extra = excluded.extra";

const SELECT_COLUMNS: &str = "SELECT key, id, text, embedding, category, name, extra FROM embeddings";

/// Raw column values of one row, decoded after the statement finishes.
struct RawRow {
    key: String,
    id: Option<String>,
    text: String,
    embedding: String,
    category: Option<String>,
    name: Option<String>,
    extra: Option<String>,
}

impl RawRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            key: row.get(0)?,
            id: row.get(1)?,
            text: row.get(2)?,
            embedding: row.get(3)?,
            category: row.get(4)?,
            name: row.get(5)?,
            extra: row.get(6)?,
        })
    }

    fn into_record(self) -> AppResult<EmbeddingRecord> {
        let embedding: Vec<f32> = serde_json::from_str(&self.embedding).map_err(|e| {
            AppError::Storage(format!("Corrupt embedding for key {}: {}", self.key, e))
        })?;

        let extra: BTreeMap<String, MetadataValue> = match self.extra.as_deref() {
            None | Some("") => BTreeMap::new(),
            Some(json) => serde_json::from_str(json).map_err(|e| {
                AppError::Storage(format!("Corrupt metadata for key {}: {}", self.key, e))
            })?,
        };

        Ok(EmbeddingRecord {
            key: self.key,
            id: self.id,
            text: self.text,
            embedding,
            metadata: RecordMetadata {
                category: self.category,
                name: self.name,
                extra,
            },
        })
    }
}

fn select_rows<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> AppResult<Vec<RawRow>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let rows = stmt
        .query_map(params, RawRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Record store backed by a single SQLite table.
///
/// The embedding column holds a JSON array and `extra` a JSON object of the
/// non-standard metadata fields. `category` and `name` get their own columns
/// so category filters can run in SQL.
#[derive(Debug)]
pub struct SqliteStore {
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open the database, creating the file and schema if absent.
    pub fn open(path: &Path) -> AppResult<Self> {
        ensure_parent_dir(path)?;

        let conn = Connection::open(path).map_err(|e| {
            AppError::Storage(format!("Failed to open SQLite index {:?}: {}", path, e))
        })?;

        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        conn.execute_batch(SCHEMA)
            .map_err(|e| AppError::Storage(format!("Failed to create tables: {}", e)))?;

        tracing::debug!("Initialized SQLite index at {:?}", path);
        Ok(Self {
            path: path.to_path_buf(),
            conn: Mutex::new(conn),
        })
    }

    fn connection(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Storage("SQLite connection lock poisoned".to_string()))
    }
}

impl RecordStore for SqliteStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::Sqlite
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self, filter: Option<&MetadataFilter>) -> AppResult<Vec<EmbeddingRecord>> {
        let conn = self.connection()?;

        let rows = match filter.and_then(|f| f.required_category()) {
            Some(category) => select_rows(
                &conn,
                &format!("{} WHERE category = ?1 ORDER BY rowid", SELECT_COLUMNS),
                params![category],
            )?,
            None => select_rows(
                &conn,
                &format!("{} ORDER BY rowid", SELECT_COLUMNS),
                [],
            )?,
        };
        drop(conn);

        rows.into_iter().map(RawRow::into_record).collect()
    }

    fn get(&self, key: &str) -> AppResult<Option<EmbeddingRecord>> {
        let row = self
            .connection()?
            .query_row(
                &format!("{} WHERE key = ?1", SELECT_COLUMNS),
                params![key],
                RawRow::from_row,
            )
            .optional()?;

        row.map(RawRow::into_record).transpose()
    }

    fn upsert(&self, records: Vec<EmbeddingRecord>) -> AppResult<()> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(UPSERT)?;
            for record in &records {
                let embedding = serde_json::to_string(&record.embedding)?;
                let extra = serde_json::to_string(&record.metadata.extra)?;
                stmt.execute(params![
                    record.key,
                    record.id,
                    record.text,
                    embedding,
                    record.metadata.category,
                    record.metadata.name,
                    extra,
                ])?;
            }
        }
        tx.commit()?;

        tracing::debug!("Upserted {} records into {:?}", records.len(), self.path);
        Ok(())
    }

    fn delete(&self, key: &str) -> AppResult<bool> {
        let deleted = self
            .connection()?
            .execute("DELETE FROM embeddings WHERE key = ?1", params![key])?;
        Ok(deleted > 0)
    }

    fn clear(&self) -> AppResult<()> {
        self.connection()?
            .execute("DELETE FROM embeddings", [])
            .map_err(|e| AppError::Storage(format!("Failed to delete records: {}", e)))?;
        Ok(())
    }

    fn count(&self) -> AppResult<usize> {
        let count: i64 =
            self.connection()?
                .query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
