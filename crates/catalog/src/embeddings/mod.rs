//! Embedding providers for product text.
//!
//! Turns product and query text into vectors. The local trigram provider
//! works offline; the OpenAI provider calls the embeddings API.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::{EmbeddingConfig, SUPPORTED_PROVIDERS};
pub use provider::{create_provider, EmbeddingProvider};
