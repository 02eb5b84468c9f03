//! Product catalog records and their conversion to index records.

use retailgenie_core::{AppError, AppResult};
use retailgenie_index::{RecordInput, RecordMetadata};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

/// Category assigned to products that do not declare one.
pub const DEFAULT_CATEGORY: &str = "Unknown";

/// A catalog product as found in product JSON files.
///
/// Ids may be strings or numbers; they are kept as strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,

    #[serde(rename = "_id", default, deserialize_with = "lenient_id")]
    pub object_id: Option<String>,

    #[serde(default, deserialize_with = "lenient_id")]
    pub sku: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub category: Option<String>,
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(Option::<RawId>::deserialize(deserializer)?.map(|raw| match raw {
        RawId::Text(s) => s,
        RawId::Int(n) => n.to_string(),
        RawId::Float(n) => n.to_string(),
    }))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProductFile {
    List(Vec<Product>),
    Wrapped { products: Vec<Product> },
}

impl Product {
    /// First non-empty of `id`, `_id`, `sku`.
    pub fn external_id(&self) -> Option<&str> {
        [&self.id, &self.object_id, &self.sku]
            .into_iter()
            .filter_map(|id| id.as_deref())
            .find(|id| !id.is_empty())
    }

    pub fn category_or_default(&self) -> &str {
        self.category.as_deref().unwrap_or(DEFAULT_CATEGORY)
    }

    /// Text that gets embedded and content-addressed.
    pub fn text(&self) -> String {
        format!(
            "Name: {}\nCategory: {}\nDescription: {}",
            self.name.as_deref().unwrap_or_default(),
            self.category_or_default(),
            self.description.as_deref().unwrap_or_default()
        )
    }

    pub fn to_record_input(&self, embedding: Vec<f32>) -> RecordInput {
        let metadata = RecordMetadata::new()
            .with_category(self.category_or_default())
            .with_name(self.name.clone().unwrap_or_default());

        let input = RecordInput::new(self.text(), embedding).with_metadata(metadata);
        match self.external_id() {
            Some(id) => input.with_id(id),
            None => input,
        }
    }
}

/// Parse products from a JSON array or a `{"products": [...]}` document.
pub fn parse_products(json: &str) -> AppResult<Vec<Product>> {
    let file: ProductFile = serde_json::from_str(json).map_err(|e| {
        AppError::InvalidInput(format!(
            "Expected a JSON array of products or {{\"products\": [...]}}: {}",
            e
        ))
    })?;

    Ok(match file {
        ProductFile::List(products) => products,
        ProductFile::Wrapped { products } => products,
    })
}

/// Read and parse a products file.
pub fn load_products(path: &Path) -> AppResult<Vec<Product>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        AppError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to read products file {:?}: {}", path, e),
        ))
    })?;

    let products = parse_products(&content)?;
    tracing::debug!("Loaded {} products from {:?}", products.len(), path);
    Ok(products)
}

/// Find a product by its external id.
pub fn find_product<'a>(products: &'a [Product], id: &str) -> Option<&'a Product> {
    products.iter().find(|p| p.external_id() == Some(id))
}

/// Pair products with their embeddings.
pub fn product_records(
    products: &[Product],
    embeddings: Vec<Vec<f32>>,
) -> AppResult<Vec<RecordInput>> {
    if products.len() != embeddings.len() {
        return Err(AppError::Embedding(format!(
            "Got {} embeddings for {} products",
            embeddings.len(),
            products.len()
        )));
    }

    Ok(products
        .iter()
        .zip(embeddings)
        .map(|(product, embedding)| product.to_record_input(embedding))
        .collect())
}
