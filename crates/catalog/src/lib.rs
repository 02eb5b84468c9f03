//! Product catalog layer for RetailGenie.
//!
//! Builds embedding text from catalog products, embeds it through an
//! [`EmbeddingProvider`](embeddings::EmbeddingProvider), and runs indexing,
//! semantic search and same-category recommendations on a
//! [`VectorIndex`](retailgenie_index::VectorIndex).

pub mod embeddings;
pub mod product;
pub mod search;

pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use product::{find_product, load_products, parse_products, product_records, Product};
pub use search::{index_products, recommend, semantic_search};
