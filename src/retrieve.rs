//! Retrieval engine: question → embedding → k-nearest chunks.

use tracing::debug;

use crate::embedding::{embed_query, EmbeddingClient};
use crate::error::{RagError, Result};
use crate::index::VectorIndex;
use crate::models::Neighbor;

/// Embed the question and return its k nearest chunks in index-native
/// order (ascending distance). The pipeline never re-sorts this.
///
/// An empty index or no matches yields an empty sequence, not an error;
/// the orchestrator handles that case explicitly with a fixed fallback.
pub async fn retrieve(
    question: &str,
    k: usize,
    embedder: &dyn EmbeddingClient,
    index: &dyn VectorIndex,
) -> Result<Vec<Neighbor>> {
    if k < 1 {
        return Err(RagError::InvalidConfiguration(
            "top_k must be >= 1".to_string(),
        ));
    }

    let query_vec = embed_query(embedder, question).await?;
    let neighbors = index.query(&query_vec, k).await?;
    debug!(k, hits = neighbors.len(), "retrieval complete");
    Ok(neighbors)
}
