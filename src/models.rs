//! Core data types that flow through the ingestion and answer pipelines.

use serde::Serialize;

/// A readable document from the corpus, keyed by its path relative to the
/// corpus root.
#[derive(Debug, Clone)]
pub struct CorpusDocument {
    pub path: String,
    pub text: String,
}

/// One stored chunk in the vector index.
///
/// The id is a deterministic function of the source path and chunk
/// ordinal (see [`crate::fingerprint::record_id`]); `file_hash` is the
/// content hash of the owning document at write time.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    pub id: String,
    pub source: String,
    pub chunk_index: i64,
    pub file_hash: String,
    pub text: String,
    pub vector: Vec<f32>,
}

/// Metadata view of a stored record, as returned by the index snapshot
/// used for delta reconciliation.
#[derive(Debug, Clone)]
pub struct RecordMeta {
    pub id: String,
    pub source: String,
    pub chunk_index: i64,
    pub file_hash: String,
}

/// A nearest-neighbor hit from the index, in ascending-distance order.
#[derive(Debug, Clone)]
pub struct Neighbor {
    pub text: String,
    pub source: String,
    pub chunk_index: i64,
    pub distance: f32,
}

/// A (source, chunk, distance) pointer into the corpus justifying part of
/// an answer. Derived per question, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reference {
    pub source: String,
    pub chunk: i64,
    pub distance: f32,
}
