//! In-memory [`VectorIndex`] implementation for tests.
//!
//! A `Vec` of records behind `std::sync::RwLock`; search is brute-force
//! cosine distance over all stored vectors.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ChunkRecord, Neighbor, RecordMeta};

use super::{cosine_distance, VectorIndex};

/// In-memory index. Same semantics as the SQLite backend, no persistence.
#[derive(Default)]
pub struct MemoryIndex {
    records: RwLock<Vec<ChunkRecord>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records (test helper).
    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn upsert(&self, records: Vec<ChunkRecord>) -> Result<()> {
        let mut stored = self.records.write().unwrap();
        for record in records {
            stored.retain(|r| r.id != record.id);
            stored.push(record);
        }
        Ok(())
    }

    async fn delete_source(&self, source: &str) -> Result<()> {
        let mut stored = self.records.write().unwrap();
        stored.retain(|r| r.source != source);
        Ok(())
    }

    async fn metadata_snapshot(&self) -> Result<Vec<RecordMeta>> {
        let stored = self.records.read().unwrap();
        Ok(stored
            .iter()
            .map(|r| RecordMeta {
                id: r.id.clone(),
                source: r.source.clone(),
                chunk_index: r.chunk_index,
                file_hash: r.file_hash.clone(),
            })
            .collect())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        let stored = self.records.read().unwrap();
        let mut neighbors: Vec<Neighbor> = stored
            .iter()
            .map(|r| Neighbor {
                text: r.text.clone(),
                source: r.source.clone(),
                chunk_index: r.chunk_index,
                distance: cosine_distance(vector, &r.vector),
            })
            .collect();
        neighbors.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        neighbors.truncate(k);
        Ok(neighbors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, source: &str, index: i64, vector: Vec<f32>) -> ChunkRecord {
        ChunkRecord {
            id: id.to_string(),
            source: source.to_string(),
            chunk_index: index,
            file_hash: "h".to_string(),
            text: format!("text-{id}"),
            vector,
        }
    }

    #[tokio::test]
    async fn upsert_overwrites_by_id() {
        let index = MemoryIndex::new();
        index
            .upsert(vec![record("a:0", "a", 0, vec![1.0, 0.0])])
            .await
            .unwrap();
        index
            .upsert(vec![record("a:0", "a", 0, vec![0.0, 1.0])])
            .await
            .unwrap();
        assert_eq!(index.len(), 1);
    }

    #[tokio::test]
    async fn query_returns_nearest_first() {
        let index = MemoryIndex::new();
        index
            .upsert(vec![
                record("a:0", "a", 0, vec![1.0, 0.0]),
                record("b:0", "b", 0, vec![0.0, 1.0]),
                record("c:0", "c", 0, vec![0.9, 0.1]),
            ])
            .await
            .unwrap();

        let hits = index.query(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].source, "a");
        assert_eq!(hits[1].source, "c");
        assert!(hits[0].distance <= hits[1].distance);
    }

    #[tokio::test]
    async fn empty_index_query_is_empty_not_error() {
        let index = MemoryIndex::new();
        assert!(index.query(&[1.0, 0.0], 4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_source_removes_all_its_records() {
        let index = MemoryIndex::new();
        index
            .upsert(vec![
                record("a:0", "a", 0, vec![1.0, 0.0]),
                record("a:1", "a", 1, vec![1.0, 0.0]),
                record("b:0", "b", 0, vec![0.0, 1.0]),
            ])
            .await
            .unwrap();
        index.delete_source("a").await.unwrap();
        let metas = index.metadata_snapshot().await.unwrap();
        assert_eq!(metas.len(), 1);
        assert_eq!(metas[0].source, "b");
    }
}
