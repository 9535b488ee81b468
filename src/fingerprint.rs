//! Content hashing and stable record identity.
//!
//! Two separate fingerprints with different stability guarantees:
//!
//! - [`content_hash`] digests the document's *current text* and changes
//!   whenever the text changes. It is what the delta reconciler compares
//!   to decide create/update/skip.
//! - [`source_id`] is derived from the document *path alone*, so it is
//!   stable across content edits. Chunk record ids keyed off it keep the
//!   same id-prefix across updates; only the ordinal suffix varies.

use sha2::{Digest, Sha256};

/// SHA-256 hex digest of the document text (UTF-8 bytes).
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Stable identity token for a source path: first 16 hex chars of the
/// SHA-256 of the path. Unchanged by content edits.
pub fn source_id(path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

/// Deterministic record id for one chunk: `source_id ++ ":" ++ ordinal`.
///
/// Re-ingesting the same unchanged document produces the same ids, which
/// makes the upsert path naturally idempotent. A shrinking document would
/// leave orphaned high-ordinal ids behind, which is why the reconciler's
/// update path deletes before writing instead of relying on id reuse.
pub fn record_id(path: &str, ordinal: usize) -> String {
    format!("{}:{}", source_id(path), ordinal)
}
