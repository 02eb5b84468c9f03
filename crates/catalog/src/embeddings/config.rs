//! Embedding configuration types.

use retailgenie_core::{AppError, AppResult, EmbeddingSettings};
use serde::{Deserialize, Serialize};

/// Providers `create_provider` knows how to build.
pub const SUPPORTED_PROVIDERS: [&str; 2] = ["trigram", "openai"];

/// Resolved embedding configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "trigram" or "openai"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Maximum texts per provider request
    pub batch_size: usize,

    /// API base URL override
    pub endpoint: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self::for_provider("trigram")
    }
}

impl EmbeddingConfig {
    /// Defaults for a provider. Unknown names get the trigram defaults and
    /// fail later in [`EmbeddingConfig::validate`].
    pub fn for_provider(provider: &str) -> Self {
        let (model, dimensions) = match provider {
            "openai" => ("text-embedding-3-small", 1536),
            _ => ("trigram-v1", 384),
        };

        Self {
            provider: provider.to_string(),
            model: model.to_string(),
            dimensions,
            batch_size: 100,
            endpoint: None,
        }
    }

    /// Resolve config-file/env settings against the provider's defaults.
    pub fn from_settings(settings: &EmbeddingSettings) -> Self {
        let provider = settings
            .provider
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_else(|| "trigram".to_string());

        let mut config = Self::for_provider(&provider);
        if let Some(model) = &settings.model {
            config.model = model.clone();
        }
        if let Some(dimensions) = settings.dimensions {
            config.dimensions = dimensions;
        }
        if let Some(batch_size) = settings.batch_size {
            config.batch_size = batch_size;
        }
        config.endpoint = settings.endpoint.clone();
        config
    }

    pub fn validate(&self) -> AppResult<()> {
        if !SUPPORTED_PROVIDERS.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: '{}'. Supported providers: {}",
                self.provider,
                SUPPORTED_PROVIDERS.join(", ")
            )));
        }

        if self.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be greater than 0".to_string(),
            ));
        }

        if self.batch_size == 0 {
            return Err(AppError::Config(
                "Embedding batch size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.provider, "trigram");
        assert_eq!(config.model, "trigram-v1");
        assert_eq!(config.dimensions, 384);
        assert_eq!(config.batch_size, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_openai_defaults() {
        let config = EmbeddingConfig::for_provider("openai");
        assert_eq!(config.model, "text-embedding-3-small");
        assert_eq!(config.dimensions, 1536);
    }

    #[test]
    fn test_from_settings_overrides_defaults() {
        let settings = EmbeddingSettings {
            provider: Some("OpenAI".to_string()),
            model: Some("text-embedding-3-large".to_string()),
            dimensions: Some(3072),
            batch_size: None,
            endpoint: Some("http://localhost:9000".to_string()),
        };

        let config = EmbeddingConfig::from_settings(&settings);
        assert_eq!(config.provider, "openai");
        assert_eq!(config.model, "text-embedding-3-large");
        assert_eq!(config.dimensions, 3072);
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.endpoint.as_deref(), Some("http://localhost:9000"));
    }

    #[test]
    fn test_from_empty_settings() {
        let config = EmbeddingConfig::from_settings(&EmbeddingSettings::default());
        assert_eq!(config, EmbeddingConfig::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let unknown = EmbeddingConfig::for_provider("word2vec");
        let err = unknown.validate().unwrap_err().to_string();
        assert!(err.contains("Unknown embedding provider"));

        let zero_dims = EmbeddingConfig {
            dimensions: 0,
            ..Default::default()
        };
        assert!(zero_dims.validate().is_err());

        let zero_batch = EmbeddingConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(zero_batch.validate().is_err());
    }
}
