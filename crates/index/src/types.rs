//! Vector index type definitions.

use chrono::{DateTime, Utc};
use retailgenie_core::{AppError, AppResult, StoreBackend};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::key::content_key;

/// A scalar metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Text(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Int(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Float(value)
    }
}

/// Record metadata: two well-known fields plus an open extension map.
///
/// Serialized flat, e.g. `{"category": "Kitchen", "name": "Red Mug", "color": "red"}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, MetadataValue>,
}

impl RecordMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set a field by name.
    ///
    /// Text or null under `category` / `name` lands in the typed field;
    /// everything else goes to the extension map.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        let key = key.into();
        let slot = match key.as_str() {
            "category" => Some(&mut self.category),
            "name" => Some(&mut self.name),
            _ => None,
        };

        match (slot, value.into()) {
            (Some(slot), MetadataValue::Text(text)) => *slot = Some(text),
            (Some(slot), MetadataValue::Null) => *slot = None,
            (_, value) => {
                self.extra.insert(key, value);
            }
        }
        self
    }

    /// Check that the metadata survives a store round trip unchanged.
    fn check(&self) -> Result<(), String> {
        for (key, value) in &self.extra {
            if key == "category" || key == "name" {
                return Err(format!("metadata.{} must be a string or null", key));
            }
            if let MetadataValue::Float(f) = value {
                if !f.is_finite() {
                    return Err(format!("metadata.{} is not a finite number ({})", key, f));
                }
            }
        }
        Ok(())
    }

    /// Whether the value stored under `key` equals `expected`.
    ///
    /// Absent keys compare as `Null`.
    pub fn value_equals(&self, key: &str, expected: &MetadataValue) -> bool {
        match key {
            "category" => text_equals(self.category.as_deref(), expected),
            "name" => text_equals(self.name.as_deref(), expected),
            _ => match self.extra.get(key) {
                Some(value) => value == expected,
                None => *expected == MetadataValue::Null,
            },
        }
    }
}

fn text_equals(actual: Option<&str>, expected: &MetadataValue) -> bool {
    match (actual, expected) {
        (Some(actual), MetadataValue::Text(expected)) => actual == expected,
        (None, MetadataValue::Null) => true,
        _ => false,
    }
}

/// Exact-match metadata predicate; every entry must match (logical AND).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataFilter(BTreeMap<String, MetadataValue>);

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter on `category` equality.
    pub fn category(category: impl Into<String>) -> Self {
        Self::new().with("category", category.into())
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The category this filter requires, when it requires a concrete one.
    pub fn required_category(&self) -> Option<&str> {
        match self.0.get("category") {
            Some(MetadataValue::Text(category)) => Some(category),
            _ => None,
        }
    }

    pub fn matches(&self, metadata: &RecordMetadata) -> bool {
        self.0
            .iter()
            .all(|(key, expected)| metadata.value_equals(key, expected))
    }
}

/// Caller-supplied record, before its key is derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordInput {
    /// External business id (e.g., product id)
    #[serde(default)]
    pub id: Option<String>,

    /// Source text that was embedded
    pub text: String,

    /// Embedding vector
    pub embedding: Vec<f32>,

    #[serde(default)]
    pub metadata: RecordMetadata,
}

impl RecordInput {
    pub fn new(text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: None,
            text: text.into(),
            embedding,
            metadata: RecordMetadata::default(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: RecordMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Reject records that cannot be stored meaningfully.
    ///
    /// `position` is the record's offset in its batch, used in the message.
    pub fn validate(&self, position: usize) -> AppResult<()> {
        validate_vector(&self.embedding)
            .and_then(|()| self.metadata.check())
            .map_err(|msg| AppError::InvalidInput(format!("record {}: {}", position, msg)))
    }
}

/// Check that every component is a finite number.
pub(crate) fn validate_vector(vector: &[f32]) -> Result<(), String> {
    match vector.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(format!(
            "embedding[{}] is not a finite number ({})",
            i, vector[i]
        )),
        None => Ok(()),
    }
}

/// The unit of storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// SHA-256 of `text`
    pub key: String,

    /// External business id
    pub id: Option<String>,

    pub text: String,

    pub embedding: Vec<f32>,

    #[serde(default)]
    pub metadata: RecordMetadata,
}

impl From<RecordInput> for EmbeddingRecord {
    fn from(input: RecordInput) -> Self {
        Self {
            key: content_key(&input.text),
            id: input.id,
            text: input.text,
            embedding: input.embedding,
            metadata: input.metadata,
        }
    }
}

/// A query result: the record and its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Cosine similarity, rounded to 6 decimal digits
    pub score: f64,

    #[serde(flatten)]
    pub record: EmbeddingRecord,
}

/// Statistics for an index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub backend: StoreBackend,

    pub path: PathBuf,

    /// Number of stored records
    pub records: usize,

    /// Distinct embedding lengths present, ascending
    pub dimensions: Vec<usize>,

    /// Size of the backing file in bytes (0 when not yet written)
    pub size_bytes: u64,

    /// Last modification time of the backing file
    pub modified_at: Option<DateTime<Utc>>,
}
