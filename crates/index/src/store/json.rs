//! JSON-file record store.

use super::{ensure_parent_dir, RecordStore};
use crate::types::{EmbeddingRecord, MetadataFilter};
use retailgenie_core::{AppError, AppResult, StoreBackend};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// On-disk document: `{"items": [...]}`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexDocument {
    #[serde(default)]
    items: Vec<EmbeddingRecord>,
}

/// Record store backed by a single JSON document.
///
/// Every write rewrites the whole document into a uniquely named temp file
/// beside `<path>`, fsyncs it, renames it over `<path>`, and fsyncs the
/// directory. Readers see either the old or the new document; concurrent
/// writers in separate processes lose updates (last rename wins) but never
/// publish a torn document.
#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    /// Open a JSON store. The file itself is created on first write.
    pub fn open(path: &Path) -> AppResult<Self> {
        ensure_parent_dir(path)?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Directory holding the index file.
    fn dir(&self) -> &Path {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }

    /// Read the document. A missing file is an empty index; anything else
    /// that prevents reading it is an error.
    fn read_document(&self) -> AppResult<IndexDocument> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(IndexDocument::default()),
            Err(e) => {
                return Err(AppError::Storage(format!(
                    "Failed to read index file {:?}: {}",
                    self.path, e
                )))
            }
        };

        serde_json::from_str(&contents).map_err(|e| {
            AppError::Storage(format!("Index file {:?} is corrupt: {}", self.path, e))
        })
    }

    fn write_document(&self, document: &IndexDocument) -> AppResult<()> {
        let dir = self.dir();
        let write_err = |e: std::io::Error| {
            AppError::Storage(format!("Failed to write index file {:?}: {}", self.path, e))
        };

        // Each writer gets its own temp file; it is removed on drop if not persisted.
        let mut temp = NamedTempFile::new_in(dir).map_err(write_err)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, document)
                .map_err(|e| write_err(e.into()))?;
            writer.flush().map_err(write_err)?;
        }
        temp.as_file().sync_all().map_err(write_err)?;

        temp.persist(&self.path).map_err(|e| {
            AppError::Storage(format!(
                "Failed to replace index file {:?}: {}",
                self.path, e.error
            ))
        })?;
        sync_dir(dir).map_err(write_err)?;

        tracing::debug!(
            "Wrote {} records to {:?}",
            document.items.len(),
            self.path
        );
        Ok(())
    }
}

/// Make a completed rename durable.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

impl RecordStore for JsonStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::Json
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self, _filter: Option<&MetadataFilter>) -> AppResult<Vec<EmbeddingRecord>> {
        Ok(self.read_document()?.items)
    }

    fn get(&self, key: &str) -> AppResult<Option<EmbeddingRecord>> {
        Ok(self
            .read_document()?
            .items
            .into_iter()
            .find(|record| record.key == key))
    }

    fn upsert(&self, records: Vec<EmbeddingRecord>) -> AppResult<()> {
        let mut document = self.read_document()?;

        let mut positions: HashMap<String, usize> = document
            .items
            .iter()
            .enumerate()
            .map(|(i, record)| (record.key.clone(), i))
            .collect();

        for record in records {
            match positions.get(&record.key) {
                Some(&i) => document.items[i] = record,
                None => {
                    positions.insert(record.key.clone(), document.items.len());
                    document.items.push(record);
                }
            }
        }

        self.write_document(&document)
    }

    fn delete(&self, key: &str) -> AppResult<bool> {
        let mut document = self.read_document()?;
        let before = document.items.len();
        document.items.retain(|record| record.key != key);

        if document.items.len() == before {
            return Ok(false);
        }

        self.write_document(&document)?;
        Ok(true)
    }

    fn clear(&self) -> AppResult<()> {
        self.write_document(&IndexDocument::default())
    }

    fn count(&self) -> AppResult<usize> {
        Ok(self.read_document()?.items.len())
    }
}
