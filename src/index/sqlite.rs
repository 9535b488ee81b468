//! SQLite-backed [`VectorIndex`].
//!
//! One `chunk_records` table holds text, metadata, and the embedding
//! vector as a little-endian f32 BLOB. Search fetches all vectors and
//! ranks by brute-force cosine distance — adequate for the corpus sizes
//! this tool targets (thousands of chunks, not millions).

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::error::Result;
use crate::models::{ChunkRecord, Neighbor, RecordMeta};

use super::{blob_to_vec, cosine_distance, vec_to_blob, VectorIndex};

pub struct SqliteIndex {
    pool: SqlitePool,
}

impl SqliteIndex {
    /// Open (creating if missing) the index database and ensure the
    /// schema exists. Idempotent.
    pub async fn connect(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    crate::error::RagError::InvalidConfiguration(format!(
                        "cannot create index directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunk_records (
                id TEXT PRIMARY KEY,
                source TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                file_hash TEXT NOT NULL,
                text TEXT NOT NULL,
                vector BLOB NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_chunk_records_source ON chunk_records(source)",
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    async fn upsert(&self, records: Vec<ChunkRecord>) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for record in &records {
            sqlx::query(
                r#"
                INSERT INTO chunk_records (id, source, chunk_index, file_hash, text, vector)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    source = excluded.source,
                    chunk_index = excluded.chunk_index,
                    file_hash = excluded.file_hash,
                    text = excluded.text,
                    vector = excluded.vector
                "#,
            )
            .bind(&record.id)
            .bind(&record.source)
            .bind(record.chunk_index)
            .bind(&record.file_hash)
            .bind(&record.text)
            .bind(vec_to_blob(&record.vector))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_source(&self, source: &str) -> Result<()> {
        sqlx::query("DELETE FROM chunk_records WHERE source = ?")
            .bind(source)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn metadata_snapshot(&self) -> Result<Vec<RecordMeta>> {
        let rows = sqlx::query(
            "SELECT id, source, chunk_index, file_hash FROM chunk_records ORDER BY source, chunk_index",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| RecordMeta {
                id: row.get("id"),
                source: row.get("source"),
                chunk_index: row.get("chunk_index"),
                file_hash: row.get("file_hash"),
            })
            .collect())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        let rows = sqlx::query("SELECT source, chunk_index, text, vector FROM chunk_records")
            .fetch_all(&self.pool)
            .await?;

        let mut neighbors: Vec<Neighbor> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("vector");
                Neighbor {
                    text: row.get("text"),
                    source: row.get("source"),
                    chunk_index: row.get("chunk_index"),
                    distance: cosine_distance(vector, &blob_to_vec(&blob)),
                }
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
