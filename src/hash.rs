//! Content digests for change detection.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of exactly the supplied bytes.
pub fn digest(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Leading 8 characters, for log lines. Hashes read back from the ledger
/// are not guaranteed to be hex, so the cut respects char boundaries.
pub fn short(digest: &str) -> &str {
    match digest.char_indices().nth(8) {
        Some((end, _)) => &digest[..end],
        None => digest,
    }
}
