//! RetailGenie Core Library
//!
//! Foundational utilities shared by the RetailGenie crates:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, EmbeddingSettings, IndexConfig, StoreBackend};
pub use error::{AppError, AppResult};
