use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Sentinel used when the PDF metadata carries no author entry.
pub const UNKNOWN_AUTHOR: &str = "unknown";

/// The dedup key of a document: hash of its extracted text plus the two
/// secondary discriminators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Fingerprint {
    pub content_hash: String,
    pub author: String,
    pub byte_size: u64,
}

/// Computes the content fingerprint for an extracted document. Pure and
/// deterministic; empty text hashes to the well-known empty-input digest.
pub fn fingerprint(full_text: &str, author: Option<&str>, byte_size: u64) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(full_text.as_bytes());

    Fingerprint {
        content_hash: format!("{:x}", hasher.finalize()),
        author: author
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(UNKNOWN_AUTHOR)
            .to_string(),
        byte_size,
    }
}
