//! Configuration management for RetailGenie.
//!
//! Configuration is layered, later sources winning:
//! - Built-in defaults
//! - Config file (`.retailgenie/config.yaml`)
//! - Environment variables
//! - Command-line flags
//!
//! State is workspace-centric: the index lives under `.retailgenie/data/`
//! unless an explicit path is configured.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::logging::LogFormat;

/// Name of the per-workspace state directory.
pub const STATE_DIR: &str = ".retailgenie";

/// Persistence backend for the vector index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Single-table SQLite database, transactional writes
    #[default]
    Sqlite,
    /// Single JSON document, rewritten atomically on every write
    Json,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Sqlite => "sqlite",
            StoreBackend::Json => "json",
        }
    }

    /// File name used when no explicit index path is configured.
    pub fn default_file_name(&self) -> &'static str {
        match self {
            StoreBackend::Sqlite => "embeddings_index.sqlite",
            StoreBackend::Json => "embeddings_index.json",
        }
    }
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "json" => Ok(StoreBackend::Json),
            other => Err(AppError::Config(format!(
                "Unknown vector store backend: {}. Supported: sqlite, json",
                other
            ))),
        }
    }
}

/// Where and how the vector index is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    pub backend: StoreBackend,
    pub path: PathBuf,
}

impl IndexConfig {
    pub fn new(backend: StoreBackend, path: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            path: path.into(),
        }
    }

    /// Default location inside a workspace for the given backend.
    pub fn in_workspace(workspace: &Path, backend: StoreBackend) -> Self {
        Self::new(
            backend,
            workspace
                .join(STATE_DIR)
                .join("data")
                .join(backend.default_file_name()),
        )
    }
}

/// Embedding provider settings as written in config.yaml.
///
/// Unset fields fall back to the provider's own defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// Provider name: "trigram" or "openai"
    pub provider: Option<String>,

    /// Model identifier
    pub model: Option<String>,

    /// Expected vector dimensions
    pub dimensions: Option<usize>,

    /// Maximum texts per provider request
    #[serde(rename = "batchSize")]
    pub batch_size: Option<usize>,

    /// Custom API base URL
    pub endpoint: Option<String>,
}

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Workspace root (contains .retailgenie/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Selected index backend
    pub backend: StoreBackend,

    /// Explicit index path; derived from workspace and backend when unset
    pub index_path: Option<PathBuf>,

    /// Embedding provider settings
    pub embeddings: EmbeddingSettings,

    /// API key for the embedding provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Log output format
    pub log_format: LogFormat,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    workspace: Option<WorkspaceSection>,
    index: Option<IndexSection>,
    embeddings: Option<EmbeddingSettings>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexSection {
    backend: Option<StoreBackend>,
    path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
    format: Option<LogFormat>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            backend: StoreBackend::default(),
            index_path: None,
            embeddings: EmbeddingSettings::default(),
            api_key: None,
            log_level: None,
            log_format: LogFormat::default(),
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file, and environment.
    ///
    /// Environment variables:
    /// - `RETAILGENIE_WORKSPACE`: Override workspace path
    /// - `RETAILGENIE_CONFIG`: Path to config file
    /// - `VECTOR_STORE`: Index backend (`sqlite` or `json`)
    /// - `VECTOR_DB_PATH`: Index file path
    /// - `EMBEDDINGS_PROVIDER`: Embedding provider
    /// - `EMBEDDINGS_MODEL`: Embedding model identifier
    /// - `OPENAI_API_KEY`: API key for the OpenAI provider
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use retailgenie_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Index: {:?}", config.index_config().path);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Like [`AppConfig::load`], with an explicit workspace and config file
    /// taking precedence over `RETAILGENIE_WORKSPACE` / `RETAILGENIE_CONFIG`.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace
            .or_else(|| std::env::var("RETAILGENIE_WORKSPACE").ok().map(PathBuf::from))
        {
            config.workspace = workspace;
        }

        config.config_file = config_file
            .or_else(|| std::env::var("RETAILGENIE_CONFIG").ok().map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.state_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        config.apply_env(|name| std::env::var(name).ok())?;

        Ok(config)
    }

    /// Apply environment overrides through a lookup function.
    fn apply_env<F>(&mut self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend) = lookup("VECTOR_STORE") {
            self.backend = backend.parse()?;
        }

        if let Some(path) = lookup("VECTOR_DB_PATH") {
            self.index_path = Some(PathBuf::from(path));
        }

        if let Some(provider) = lookup("EMBEDDINGS_PROVIDER") {
            self.embeddings.provider = Some(provider);
        }

        if let Some(model) = lookup("EMBEDDINGS_MODEL") {
            self.embeddings.model = Some(model);
        }

        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.api_key = Some(key);
        }

        if let Some(level) = lookup("RUST_LOG") {
            self.log_level = Some(level);
        }

        if lookup("NO_COLOR").is_some() {
            self.no_color = true;
        }

        Ok(())
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(ws) = config_file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
            }
        }

        if let Some(index) = config_file.index {
            if let Some(backend) = index.backend {
                result.backend = backend;
            }
            if let Some(path) = index.path {
                result.index_path = Some(path);
            }
        }

        if let Some(embeddings) = config_file.embeddings {
            result.embeddings = embeddings;
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(format) = logging.format {
                result.log_format = format;
            }
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        backend: Option<StoreBackend>,
        index_path: Option<PathBuf>,
        provider: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(backend) = backend {
            self.backend = backend;
        }

        if let Some(index_path) = index_path {
            self.index_path = Some(index_path);
        }

        if let Some(provider) = provider {
            self.embeddings.provider = Some(provider);
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Path to the .retailgenie directory.
    pub fn state_dir(&self) -> PathBuf {
        self.workspace.join(STATE_DIR)
    }

    /// Resolved index location.
    pub fn index_config(&self) -> IndexConfig {
        match &self.index_path {
            Some(path) => IndexConfig::new(self.backend, path.clone()),
            None => IndexConfig::in_workspace(&self.workspace, self.backend),
        }
    }
}
