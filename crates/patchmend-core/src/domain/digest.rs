//! SHA-256 content digests for before/after file snapshots.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `content`.
pub fn content_digest(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
