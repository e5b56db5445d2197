//! Request fingerprints for idempotent writes.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// SHA-256 of `content`, hex encoded.
pub fn calculate_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Fingerprint of a request body.
///
/// The value is serialised through `serde_json::Value`, whose object maps are
/// ordered, so two bodies that differ only in key order share a fingerprint.
pub fn request_fingerprint<T: Serialize>(body: &T) -> Result<String, serde_json::Error> {
    let canonical = serde_json::to_value(body)?;
    Ok(calculate_checksum(&canonical.to_string()))
}
