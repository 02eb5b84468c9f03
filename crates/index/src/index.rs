//! The vector index: upsert, search, and lifecycle over a pluggable store.

use crate::similarity::rank;
use crate::store::{open_store, RecordStore};
use crate::types::{
    validate_vector, EmbeddingRecord, IndexStats, MetadataFilter, RecordInput, SearchHit,
};
use chrono::{DateTime, Utc};
use retailgenie_core::{AppError, AppResult, IndexConfig, StoreBackend};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Embedding index with content-addressed records and exact cosine search.
///
/// Safe to share between threads (e.g. behind an `Arc`): queries run
/// concurrently, writes are serialized by an internal lock, and readers only
/// ever see complete writes.
///
/// # Example
/// ```no_run
/// use retailgenie_core::{IndexConfig, StoreBackend};
/// use retailgenie_index::{MetadataFilter, RecordInput, RecordMetadata, VectorIndex};
///
/// let index = VectorIndex::open(&IndexConfig::new(StoreBackend::Sqlite, "index.sqlite"))?;
/// index.upsert(&[RecordInput::new("Name: Red Mug", vec![1.0, 0.0])
///     .with_metadata(RecordMetadata::new().with_category("Kitchen"))])?;
///
/// let hits = index.query(&[1.0, 0.0], 5, Some(&MetadataFilter::category("Kitchen")))?;
/// # Ok::<(), retailgenie_core::AppError>(())
/// ```
#[derive(Debug)]
pub struct VectorIndex {
    store: Box<dyn RecordStore>,
    write_lock: Mutex<()>,
}

impl VectorIndex {
    /// Open the index described by `config`, creating storage if absent.
    pub fn open(config: &IndexConfig) -> AppResult<Self> {
        Ok(Self::with_store(open_store(config)?))
    }

    /// Wrap an already opened store.
    pub fn with_store(store: Box<dyn RecordStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub fn backend(&self) -> StoreBackend {
        self.store.backend()
    }

    pub fn path(&self) -> &Path {
        self.store.path()
    }

    fn lock_writes(&self) -> AppResult<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| AppError::Storage("Index write lock poisoned".to_string()))
    }

    /// Insert or replace records, keyed by the SHA-256 of their text.
    ///
    /// The whole batch is validated before anything is written. Returns the
    /// number of records processed, which is always `records.len()`.
    pub fn upsert(&self, records: &[RecordInput]) -> AppResult<usize> {
        for (position, record) in records.iter().enumerate() {
            record.validate(position)?;
        }

        if records.is_empty() {
            return Ok(0);
        }

        let prepared: Vec<EmbeddingRecord> =
            records.iter().cloned().map(EmbeddingRecord::from).collect();

        let _guard = self.lock_writes()?;
        self.store.upsert(prepared)?;

        tracing::debug!(
            "Upserted {} records into {} index",
            records.len(),
            self.backend()
        );
        Ok(records.len())
    }

    /// Return the `top_k` records most similar to `embedding`.
    ///
    /// Only records matching every entry of `filter` are considered. Scores
    /// are rounded to 6 decimal digits; `top_k` of 0 is treated as 1. A
    /// query whose length differs from a stored vector scores 0.0 against
    /// it rather than failing.
    pub fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> AppResult<Vec<SearchHit>> {
        validate_vector(embedding)
            .map_err(|msg| AppError::InvalidInput(format!("query {}", msg)))?;

        let filter = filter.filter(|f| !f.is_empty());
        let records = self.store.load(filter)?;
        let candidates = records.len();

        let hits = rank(records, embedding, top_k, filter);

        tracing::debug!(
            "Retrieved {} of {} candidates (requested top-{})",
            hits.len(),
            candidates,
            top_k
        );
        Ok(hits)
    }

    /// Fetch one record by key.
    pub fn get(&self, key: &str) -> AppResult<Option<EmbeddingRecord>> {
        self.store.get(key)
    }

    /// Remove one record by key. Returns whether it existed.
    pub fn delete(&self, key: &str) -> AppResult<bool> {
        let _guard = self.lock_writes()?;
        let deleted = self.store.delete(key)?;
        tracing::debug!("Delete {}: {}", key, if deleted { "removed" } else { "absent" });
        Ok(deleted)
    }

    /// Remove all records.
    pub fn clear(&self) -> AppResult<()> {
        let _guard = self.lock_writes()?;
        self.store.clear()?;
        tracing::info!("Cleared vector index at {:?}", self.path());
        Ok(())
    }

    pub fn len(&self) -> AppResult<usize> {
        self.store.count()
    }

    pub fn is_empty(&self) -> AppResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Collect statistics about the index and its backing file.
    pub fn stats(&self) -> AppResult<IndexStats> {
        let records = self.store.load(None)?;
        let dimensions: BTreeSet<usize> = records.iter().map(|r| r.embedding.len()).collect();

        let file_metadata = std::fs::metadata(self.path()).ok();
        let size_bytes = file_metadata.as_ref().map(|m| m.len()).unwrap_or(0);
        let modified_at = file_metadata
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Utc>::from);

        Ok(IndexStats {
            backend: self.backend(),
            path: self.path().to_path_buf(),
            records: records.len(),
            dimensions: dimensions.into_iter().collect(),
            size_bytes,
            modified_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::content_key;
    use crate::types::RecordMetadata;
    use std::sync::Arc;
    use tempfile::TempDir;

    const BACKENDS: [StoreBackend; 2] = [StoreBackend::Sqlite, StoreBackend::Json];

    fn config_for(temp: &TempDir, backend: StoreBackend) -> IndexConfig {
        IndexConfig::in_workspace(temp.path(), backend)
    }

    fn open(temp: &TempDir, backend: StoreBackend) -> VectorIndex {
        VectorIndex::open(&config_for(temp, backend)).unwrap()
    }

    fn product(name: &str, category: &str, embedding: Vec<f32>) -> RecordInput {
        RecordInput::new(format!("Name: {}\nCategory: {}", name, category), embedding)
            .with_metadata(
                RecordMetadata::new()
                    .with_category(category)
                    .with_name(name),
            )
    }

    #[test]
    fn test_red_mug_blue_mug() {
        for backend in BACKENDS {
            let temp = TempDir::new().unwrap();
            let index = open(&temp, backend);

            index
                .upsert(&[
                    product("Red Mug", "Kitchen", vec![1.0, 0.0]),
                    product("Blue Mug", "Kitchen", vec![0.0, 1.0]),
                ])
                .unwrap();

            let hits = index.query(&[1.0, 0.0], 1, None).unwrap();
            assert_eq!(hits.len(), 1, "{}", backend);
            assert!((hits[0].score - 1.0).abs() < 1e-9);
            assert_eq!(hits[0].record.text, "Name: Red Mug\nCategory: Kitchen");

            let all = index.query(&[1.0, 0.0], 5, None).unwrap();
            assert_eq!(all.len(), 2);
            assert_eq!(all[1].record.metadata.name.as_deref(), Some("Blue Mug"));
            assert!(all[1].score.abs() < 1e-9);
        }
    }

    #[test]
    fn test_idempotent_upsert_last_write_wins() {
        for backend in BACKENDS {
            let temp = TempDir::new().unwrap();
            let index = open(&temp, backend);

            let first = product("Mug", "Kitchen", vec![1.0, 0.0]);
            let second = RecordInput {
                embedding: vec![0.0, 1.0],
                metadata: RecordMetadata::new().with_category("Dining"),
                ..first.clone()
            };

            assert_eq!(index.upsert(&[first.clone()]).unwrap(), 1);
            assert_eq!(index.upsert(&[second]).unwrap(), 1);

            assert_eq!(index.len().unwrap(), 1, "{}", backend);
            let stored = index.get(&content_key(&first.text)).unwrap().unwrap();
            assert_eq!(stored.embedding, vec![0.0, 1.0]);
            assert_eq!(stored.metadata.category.as_deref(), Some("Dining"));
            // No merge: the name from the first write is gone.
            assert_eq!(stored.metadata.name, None);
        }
    }

    #[test]
    fn test_same_text_different_external_id() {
        for backend in BACKENDS {
            let temp = TempDir::new().unwrap();
            let index = open(&temp, backend);

            let text = "Name: Lamp\nCategory: Home";
            index
                .upsert(&[RecordInput::new(text, vec![1.0]).with_id("sku-1")])
                .unwrap();
            index
                .upsert(&[RecordInput::new(text, vec![1.0]).with_id("sku-2")])
                .unwrap();

            let hits = index.query(&[1.0], 10, None).unwrap();
            assert_eq!(hits.len(), 1, "{}", backend);
            assert_eq!(hits[0].record.id.as_deref(), Some("sku-2"));
            assert_eq!(hits[0].record.key, content_key(text));
        }
    }

    #[test]
    fn test_upsert_count_includes_updates_and_batch_duplicates() {
        for backend in BACKENDS {
            let temp = TempDir::new().unwrap();
            let index = open(&temp, backend);

            index.upsert(&[RecordInput::new("a", vec![1.0])]).unwrap();
            let written = index
                .upsert(&[
                    RecordInput::new("a", vec![2.0]),
                    RecordInput::new("b", vec![1.0]),
                    RecordInput::new("b", vec![3.0]),
                ])
                .unwrap();

            assert_eq!(written, 3);
            assert_eq!(index.len().unwrap(), 2, "{}", backend);
            let b = index.get(&content_key("b")).unwrap().unwrap();
            assert_eq!(b.embedding, vec![3.0]);
        }
    }

    #[test]
    fn test_invalid_batch_writes_nothing() {
        for backend in BACKENDS {
            let temp = TempDir::new().unwrap();
            let index = open(&temp, backend);

            let result = index.upsert(&[
                RecordInput::new("ok", vec![1.0]),
                RecordInput::new("bad", vec![f32::NAN]),
            ]);
            assert!(matches!(result, Err(AppError::InvalidInput(_))));
            assert!(index.is_empty().unwrap(), "{}", backend);
        }
    }

    #[test]
    fn test_category_set_by_name_stays_queryable() {
        for backend in BACKENDS {
            let temp = TempDir::new().unwrap();
            let index = open(&temp, backend);

            let mug = RecordInput::new("mug", vec![1.0])
                .with_metadata(RecordMetadata::new().with("category", "Kitchen"));
            assert_eq!(index.upsert(&[mug]).unwrap(), 1);

            let hits = index
                .query(&[1.0], 5, Some(&MetadataFilter::category("Kitchen")))
                .unwrap();
            assert_eq!(hits.len(), 1, "{}", backend);
            assert_eq!(
                hits[0].record.metadata.category.as_deref(),
                Some("Kitchen")
            );

            // The index stays readable and writable afterwards.
            index.upsert(&[RecordInput::new("cup", vec![1.0])]).unwrap();
            drop(index);
            let reopened = open(&temp, backend);
            assert_eq!(reopened.len().unwrap(), 2, "{}", backend);
        }
    }

    #[test]
    fn test_metadata_that_cannot_round_trip_is_rejected() {
        for backend in BACKENDS {
            let temp = TempDir::new().unwrap();
            let index = open(&temp, backend);

            let nan_price = RecordInput::new("mug", vec![1.0])
                .with_metadata(RecordMetadata::new().with("price", f64::NAN));
            let numeric_name = RecordInput::new("cup", vec![1.0])
                .with_metadata(RecordMetadata::new().with("name", 7_i64));

            for record in [nan_price, numeric_name] {
                let result = index.upsert(&[record]);
                assert!(
                    matches!(result, Err(AppError::InvalidInput(_))),
                    "{}",
                    backend
                );
            }
            assert!(index.is_empty().unwrap(), "{}", backend);
        }
    }

    #[test]
    fn test_degenerate_vectors_score_zero() {
        for backend in BACKENDS {
            let temp = TempDir::new().unwrap();
            let index = open(&temp, backend);

            index
                .upsert(&[
                    RecordInput::new("zero", vec![0.0, 0.0]),
                    RecordInput::new("wide", vec![1.0, 0.0, 0.0]),
                ])
                .unwrap();

            for hit in index.query(&[1.0, 0.0], 5, None).unwrap() {
                assert_eq!(hit.score, 0.0, "{} / {}", backend, hit.record.text);
            }
            for hit in index.query(&[], 5, None).unwrap() {
                assert_eq!(hit.score, 0.0);
            }
        }
    }

    #[test]
    fn test_non_finite_query_rejected() {
        let temp = TempDir::new().unwrap();
        let index = open(&temp, StoreBackend::Sqlite);
        let result = index.query(&[f32::INFINITY], 5, None);
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_filter_excludes_better_scoring_records() {
        for backend in BACKENDS {
            let temp = TempDir::new().unwrap();
            let index = open(&temp, backend);

            index
                .upsert(&[
                    product("Exact", "B", vec![1.0, 0.0]),
                    product("Close", "A", vec![0.8, 0.6]),
                    product("Far", "A", vec![0.0, 1.0]),
                ])
                .unwrap();

            let hits = index
                .query(&[1.0, 0.0], 5, Some(&MetadataFilter::category("A")))
                .unwrap();
            assert_eq!(hits.len(), 2, "{}", backend);
            assert!(hits
                .iter()
                .all(|h| h.record.metadata.category.as_deref() == Some("A")));
            assert_eq!(hits[0].record.metadata.name.as_deref(), Some("Close"));
        }
    }

    #[test]
    fn test_filter_on_extension_field() {
        for backend in BACKENDS {
            let temp = TempDir::new().unwrap();
            let index = open(&temp, backend);

            index
                .upsert(&[
                    RecordInput::new("red", vec![1.0])
                        .with_metadata(RecordMetadata::new().with_category("K").with("color", "red")),
                    RecordInput::new("blue", vec![1.0])
                        .with_metadata(RecordMetadata::new().with_category("K").with("color", "blue")),
                ])
                .unwrap();

            let filter = MetadataFilter::category("K").with("color", "blue");
            let hits = index.query(&[1.0], 5, Some(&filter)).unwrap();
            assert_eq!(hits.len(), 1, "{}", backend);
            assert_eq!(hits[0].record.text, "blue");
        }
    }

    #[test]
    fn test_top_k_truncation_and_order() {
        for backend in BACKENDS {
            let temp = TempDir::new().unwrap();
            let index = open(&temp, backend);

            let records: Vec<RecordInput> = (0..10)
                .map(|i| RecordInput::new(format!("item {}", i), vec![1.0, i as f32]))
                .collect();
            index.upsert(&records).unwrap();

            let hits = index.query(&[1.0, 0.0], 3, None).unwrap();
            assert_eq!(hits.len(), 3, "{}", backend);
            assert!(hits.windows(2).all(|w| w[0].score > w[1].score));
            assert_eq!(hits[0].record.text, "item 0");
            assert_eq!(hits[2].record.text, "item 2");
        }
    }

    #[test]
    fn test_cleared_index_returns_nothing() {
        for backend in BACKENDS {
            let temp = TempDir::new().unwrap();
            let index = open(&temp, backend);

            index
                .upsert(&[RecordInput::new("a", vec![1.0]), RecordInput::new("b", vec![2.0])])
                .unwrap();
            index.clear().unwrap();

            for top_k in [0, 1, 5, 100] {
                assert!(index.query(&[1.0], top_k, None).unwrap().is_empty());
            }
            assert!(index.is_empty().unwrap(), "{}", backend);
        }
    }

    #[test]
    fn test_persistence_round_trip() {
        for backend in BACKENDS {
            let temp = TempDir::new().unwrap();
            let config = config_for(&temp, backend);

            let records: Vec<RecordInput> = (0..20)
                .map(|i| {
                    let category = if i % 2 == 0 { "Even" } else { "Odd" };
                    product(
                        &format!("Item {}", i),
                        category,
                        vec![(i as f32) * 0.25, 1.0, (20 - i) as f32 * 0.5],
                    )
                    .with_id(format!("p-{}", i))
                })
                .collect();

            let query = [1.0, 0.5, 0.25];
            let filter = MetadataFilter::category("Odd");

            let (before, before_filtered) = {
                let index = VectorIndex::open(&config).unwrap();
                index.upsert(&records).unwrap();
                (
                    index.query(&query, 5, None).unwrap(),
                    index.query(&query, 5, Some(&filter)).unwrap(),
                )
            };

            let reopened = VectorIndex::open(&config).unwrap();
            assert_eq!(reopened.len().unwrap(), 20, "{}", backend);
            assert_eq!(reopened.query(&query, 5, None).unwrap(), before);
            assert_eq!(reopened.query(&query, 5, Some(&filter)).unwrap(), before_filtered);
        }
    }

    #[test]
    fn test_delete_single_record() {
        for backend in BACKENDS {
            let temp = TempDir::new().unwrap();
            let index = open(&temp, backend);

            index
                .upsert(&[RecordInput::new("keep", vec![1.0]), RecordInput::new("drop", vec![1.0])])
                .unwrap();

            assert!(index.delete(&content_key("drop")).unwrap());
            assert!(!index.delete(&content_key("drop")).unwrap());

            let hits = index.query(&[1.0], 5, None).unwrap();
            assert_eq!(hits.len(), 1, "{}", backend);
            assert_eq!(hits[0].record.text, "keep");
        }
    }

    #[test]
    fn test_stats() {
        for backend in BACKENDS {
            let temp = TempDir::new().unwrap();
            let index = open(&temp, backend);

            index
                .upsert(&[
                    RecordInput::new("a", vec![1.0, 0.0]),
                    RecordInput::new("b", vec![1.0, 0.0, 0.0]),
                    RecordInput::new("c", vec![0.0, 1.0]),
                ])
                .unwrap();

            let stats = index.stats().unwrap();
            assert_eq!(stats.backend, backend);
            assert_eq!(stats.records, 3);
            assert_eq!(stats.dimensions, vec![2, 3]);
            assert!(stats.size_bytes > 0);
            assert!(stats.modified_at.is_some());
        }
    }

    #[test]
    fn test_concurrent_readers_see_whole_batches() {
        for backend in BACKENDS {
            let temp = TempDir::new().unwrap();
            let index = Arc::new(open(&temp, backend));

            const BATCHES: usize = 20;
            const BATCH_SIZE: usize = 5;

            let writer = {
                let index = Arc::clone(&index);
                std::thread::spawn(move || {
                    for batch in 0..BATCHES {
                        let records: Vec<RecordInput> = (0..BATCH_SIZE)
                            .map(|i| {
                                RecordInput::new(format!("batch {} item {}", batch, i), vec![1.0, i as f32])
                            })
                            .collect();
                        index.upsert(&records).unwrap();
                    }
                })
            };

            let readers: Vec<_> = (0..3)
                .map(|_| {
                    let index = Arc::clone(&index);
                    std::thread::spawn(move || {
                        let mut last_seen = 0;
                        for _ in 0..30 {
                            let hits = index.query(&[1.0, 0.0], 1000, None).unwrap();
                            assert_eq!(hits.len() % BATCH_SIZE, 0, "torn batch observed");
                            assert!(hits.len() >= last_seen);
                            for hit in &hits {
                                assert_eq!(hit.record.key, content_key(&hit.record.text));
                            }
                            last_seen = hits.len();
                        }
                    })
                })
                .collect();

            writer.join().unwrap();
            for reader in readers {
                reader.join().unwrap();
            }

            assert_eq!(index.len().unwrap(), BATCHES * BATCH_SIZE, "{}", backend);
        }
    }
}
