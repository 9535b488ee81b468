//! Error taxonomy for the ingestion and answer pipelines.
//!
//! Failures fall into a small number of kinds so that the orchestration
//! boundary (CLI, streaming events) can turn any of them into a structured
//! result instead of crashing the caller. Two conditions are deliberately
//! *not* errors and never appear here: an empty corpus (ingestion reports
//! "nothing to do") and retrieval returning no matches (answered with a
//! fixed fallback message).

use std::path::PathBuf;

use thiserror::Error;

/// All failure kinds surfaced by the docrag library.
#[derive(Debug, Error)]
pub enum RagError {
    /// Bad parameters (chunk/overlap bounds, zero top_k, unknown provider).
    /// Fatal; the caller must fix its input.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The corpus root or one of its files could not be read. Ingestion
    /// aborts the run and leaves the index untouched.
    #[error("failed to read corpus at {path}: {source}")]
    CorpusRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The remote embedding service failed. The whole batch fails
    /// atomically; no partial writes.
    #[error("embedding service failure: {0}")]
    EmbeddingService(String),

    /// The remote answer model failed. In streaming mode this becomes a
    /// terminal `Error` event since already-emitted tokens cannot be
    /// retracted.
    #[error("answer service failure: {0}")]
    AnswerService(String),

    /// The vector index backend failed.
    #[error("vector index failure: {0}")]
    Index(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, RagError>;
