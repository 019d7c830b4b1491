//! Stable identifiers for tasks and crawl rounds.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// SHA-256 hex digest of `parts` joined by tabs.
pub fn fingerprint<S: AsRef<str>>(parts: &[S]) -> String {
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update(b"\t");
        }
        hasher.update(part.as_ref().as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Minute bucket naming one crawl round, e.g. `202403091530`.
pub fn time_bucket(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d%H%M").to_string()
}
