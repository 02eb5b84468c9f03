//! OpenAI embedding provider.
//!
//! Calls `POST {endpoint}/v1/embeddings` with batches of input texts.
//!
//! # Features
//! - Batched requests (`batch_size` texts per call)
//! - Retry with exponential backoff on transport errors, 429 and 5xx
//! - Response reordering by `index` and dimension checks
//!
//! # Example
//! ```no_run
//! use retailgenie_catalog::embeddings::{EmbeddingConfig, EmbeddingProvider};
//! use retailgenie_catalog::embeddings::providers::OpenAiProvider;
//!
//! # #[tokio::main]
//! # async fn main() -> retailgenie_core::AppResult<()> {
//! let config = EmbeddingConfig::for_provider("openai");
//! let provider = OpenAiProvider::new(&config, "sk-...")?;
//! let embedding = provider.embed("Red ceramic mug").await?;
//! assert_eq!(embedding.len(), 1536);
//! # Ok(())
//! # }
//! ```

use crate::embeddings::{EmbeddingConfig, EmbeddingProvider};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use retailgenie_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";
const EMBEDDING_ENDPOINT: &str = "/v1/embeddings";

/// Maximum attempts per batch request
const MAX_RETRIES: u32 = 3;

/// Initial backoff duration in milliseconds
const INITIAL_BACKOFF_MS: u64 = 100;

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// OpenAI embedding provider.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
    batch_size: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Outcome of a failed request attempt.
#[derive(Debug)]
enum RequestError {
    /// Worth another attempt (network failure, rate limit, server error)
    Retryable(String),
    /// Retrying cannot help (bad key, bad request, malformed response)
    Fatal(String),
}

impl RequestError {
    fn into_app_error(self) -> AppError {
        match self {
            RequestError::Retryable(msg) | RequestError::Fatal(msg) => AppError::Embedding(msg),
        }
    }
}

impl OpenAiProvider {
    /// Create a provider. Does not contact the API.
    pub fn new(config: &EmbeddingConfig, api_key: &str) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                AppError::Embedding(format!("Failed to create HTTP client for OpenAI: {}", e))
            })?;

        let base_url = config
            .endpoint
            .as_deref()
            .unwrap_or(DEFAULT_OPENAI_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
            model: config.model.clone(),
            dimensions: config.dimensions,
            batch_size: config.batch_size.max(1),
        })
    }

    /// Embed one batch, retrying transient failures with exponential backoff.
    #[instrument(skip(self, texts), fields(batch_size = texts.len(), model = %self.model))]
    async fn embed_with_retries(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.request(texts).await {
                Ok(embeddings) => return Ok(embeddings),
                Err(RequestError::Retryable(msg)) if attempt < MAX_RETRIES => {
                    let backoff_ms = INITIAL_BACKOFF_MS * 2_u64.pow(attempt);
                    warn!(
                        "Embedding request failed (attempt {}/{}): {}; retrying in {}ms",
                        attempt, MAX_RETRIES, msg, backoff_ms
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
                Err(e) => return Err(e.into_app_error()),
            }
        }
    }

    /// Single request, no retries.
    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RequestError> {
        let url = format!("{}{}", self.base_url, EMBEDDING_ENDPOINT);
        debug!("Sending embedding request to {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| RequestError::Retryable(format!("Failed to reach OpenAI: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|r| r.error.message)
                .unwrap_or(body);
            let msg = format!("OpenAI API error ({}): {}", status, detail);

            return Err(
                if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    RequestError::Retryable(msg)
                } else {
                    RequestError::Fatal(msg)
                },
            );
        }

        let mut body: EmbeddingResponse = response.json().await.map_err(|e| {
            RequestError::Fatal(format!("Failed to parse OpenAI response: {}", e))
        })?;

        if body.data.len() != texts.len() {
            return Err(RequestError::Fatal(format!(
                "OpenAI returned {} embeddings for {} inputs",
                body.data.len(),
                texts.len()
            )));
        }

        body.data.sort_by_key(|d| d.index);

        body.data
            .into_iter()
            .map(|d| {
                if d.embedding.len() == self.dimensions {
                    Ok(d.embedding)
                } else {
                    Err(RequestError::Fatal(format!(
                        "Unexpected embedding dimensions: got {}, expected {}",
                        d.embedding.len(),
                        self.dimensions
                    )))
                }
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "openai", model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut embeddings = vec![Vec::new(); texts.len()];

        // The API rejects empty input strings; those get the zero vector.
        let pending: Vec<usize> = (0..texts.len())
            .filter(|&i| {
                let blank = texts[i].trim().is_empty();
                if blank {
                    warn!("Empty text at index {}, using zero vector", i);
                    embeddings[i] = vec![0.0; self.dimensions];
                }
                !blank
            })
            .collect();

        for chunk in pending.chunks(self.batch_size) {
            let batch: Vec<String> = chunk.iter().map(|&i| texts[i].clone()).collect();
            let vectors = self.embed_with_retries(&batch).await?;
            for (&i, vector) in chunk.iter().zip(vectors) {
                embeddings[i] = vector;
            }
        }

        debug!("Generated {} embeddings", embeddings.len());
        Ok(embeddings)
    }
}
