//! Content fingerprinting for free-text input
//!
//! Two insights that differ only in surrounding whitespace, internal
//! whitespace runs, or letter case produce the same hash.

use sha2::{Digest, Sha256};

/// Normalize text: trim, lowercase, collapse internal whitespace to one space
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// SHA-256 of the normalized text, as 64 lowercase hex characters
pub fn content_hash(text: &str) -> String {
    format!("{:x}", Sha256::digest(normalize(text).as_bytes()))
}
