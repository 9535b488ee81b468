//! Vector index abstraction.
//!
//! The [`VectorIndex`] trait defines the four operations the pipeline
//! needs from a persistent vector collection, enabling pluggable backends:
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`upsert`](VectorIndex::upsert) | Bulk insert-or-overwrite chunk records by id |
//! | [`delete_source`](VectorIndex::delete_source) | Remove every record for one source |
//! | [`metadata_snapshot`](VectorIndex::metadata_snapshot) | All stored (id, source, ordinal, hash) tuples |
//! | [`query`](VectorIndex::query) | k-nearest-neighbor search, ascending distance |
//!
//! Records are created and overwritten only by the delta reconciler; chat
//! queries only read. A reconciliation pass running concurrently with
//! queries may expose a transiently inconsistent view — accepted, since
//! ingestion is single-writer and answering performs no index mutation.
//!
//! Also provides vector utilities shared by the backends:
//! [`vec_to_blob`] / [`blob_to_vec`] for little-endian f32 BLOB storage
//! and [`cosine_similarity`] for brute-force scoring.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ChunkRecord, Neighbor, RecordMeta};

pub use memory::MemoryIndex;
pub use sqlite::SqliteIndex;

/// Abstract persistent vector collection.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or overwrite records by id, as one bulk operation.
    async fn upsert(&self, records: Vec<ChunkRecord>) -> Result<()>;

    /// Delete every record whose source matches.
    async fn delete_source(&self, source: &str) -> Result<()>;

    /// Metadata of every stored record, for delta reconciliation.
    async fn metadata_snapshot(&self) -> Result<Vec<RecordMeta>>;

    /// The k nearest neighbors of `vector`, nearest (smallest distance)
    /// first. An empty index yields an empty list, not an error.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor>>;
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity in `[-1.0, 1.0]`. Returns `0.0` for empty vectors or
/// vectors of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

/// Distance used for ranking: `1 - cosine_similarity`, so nearest-first
/// means ascending.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}
