//! Content-addressed record keys.

use sha2::{Digest, Sha256};

/// Derive a record key from its source text.
///
/// Lowercase hex SHA-256 of the exact UTF-8 bytes. No normalization is
/// applied, so texts differing only in whitespace or case get distinct keys.
/// The result is identical across processes, platforms, and backends.
pub fn content_key(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
