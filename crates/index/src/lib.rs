//! Local embedding index for RetailGenie.
//!
//! Stores `(key, id, text, embedding, metadata)` records, where the key is the
//! SHA-256 of the text, and answers exact cosine-similarity top-k queries with
//! optional metadata equality filters. Persistence is pluggable: a JSON file
//! or an SQLite database.

pub mod index;
pub mod key;
pub mod similarity;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use index::VectorIndex;
pub use key::content_key;
pub use similarity::cosine_similarity;
pub use store::{open_store, JsonStore, RecordStore, SqliteStore};
pub use types::{
    EmbeddingRecord, IndexStats, MetadataFilter, MetadataValue, RecordInput, RecordMetadata,
    SearchHit,
};
