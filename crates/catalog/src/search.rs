//! Catalog indexing, semantic search and recommendations.

use crate::embeddings::EmbeddingProvider;
use crate::product::{product_records, Product};
use retailgenie_core::{AppError, AppResult};
use retailgenie_index::{content_key, MetadataFilter, SearchHit, VectorIndex};
use tracing::info;

/// Embed `products` and upsert them into `index`.
///
/// Returns the number of records written.
pub async fn index_products(
    index: &VectorIndex,
    provider: &dyn EmbeddingProvider,
    products: &[Product],
) -> AppResult<usize> {
    if products.is_empty() {
        return Ok(0);
    }

    let texts: Vec<String> = products.iter().map(Product::text).collect();
    info!(
        "Embedding {} products with {} ({})",
        texts.len(),
        provider.provider_name(),
        provider.model_name()
    );

    let embeddings = provider.embed_batch(&texts).await?;
    let records = product_records(products, embeddings)?;
    let written = index.upsert(&records)?;

    info!("Indexed {} products into {} store", written, index.backend());
    Ok(written)
}

/// Find the products most similar to a free-text query.
pub async fn semantic_search(
    index: &VectorIndex,
    provider: &dyn EmbeddingProvider,
    query: &str,
    top_k: usize,
    category: Option<&str>,
) -> AppResult<Vec<SearchHit>> {
    let query = query.trim();
    if query.is_empty() {
        return Err(AppError::InvalidInput("query is required".to_string()));
    }

    let embedding = provider.embed(query).await?;
    let filter = category.map(MetadataFilter::category);
    index.query(&embedding, top_k, filter.as_ref())
}

/// Products in the same category as `product`, most similar first.
///
/// The product itself is excluded: by id when it has one, and by content key
/// (its own record has identical text) either way.
pub async fn recommend(
    index: &VectorIndex,
    provider: &dyn EmbeddingProvider,
    product: &Product,
    top_k: usize,
) -> AppResult<Vec<SearchHit>> {
    let top_k = top_k.max(1);
    let embedding = provider.embed(&product.text()).await?;
    let filter = MetadataFilter::category(product.category_or_default());

    // One extra hit leaves room for the product itself.
    let mut hits = index.query(&embedding, top_k + 1, Some(&filter))?;
    let own_key = content_key(&product.text());
    let own_id = product.external_id();
    hits.retain(|hit| {
        hit.record.key != own_key && (own_id.is_none() || hit.record.id.as_deref() != own_id)
    });
    hits.truncate(top_k);
    Ok(hits)
}
