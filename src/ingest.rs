//! Delta ingestion reconciler.
//!
//! Compares the current document set against the index's recorded state
//! and issues the minimal set of index mutations:
//!
//! 1. Sources present in the index but missing from the corpus are
//!    deleted wholesale.
//! 2. Each current document is hashed and classified as **create** (no
//!    records for its source), **update** (recorded hash differs), or
//!    **skip** (recorded hash matches — no read, no embedding call, no
//!    mutation).
//! 3. The update path deletes all existing records for the source before
//!    writing. Ordinals are recomputed from scratch; a shrinking document
//!    would otherwise leave orphaned high-ordinal records behind, so
//!    update never attempts incremental id reuse.
//! 4. All chunks from all create/update documents are embedded in a
//!    single batch and written as one bulk upsert. If embedding fails the
//!    whole pass fails atomically — nothing from this pass is written,
//!    and already-skipped documents were never touched.
//!
//! The index is assumed to carry one content hash per source across all
//! its chunk records. If a corrupted index holds divergent per-chunk
//! hashes for one source, the hash of the first record observed wins and
//! the rest are treated as consistent; this relaxed invariant is not
//! re-validated per chunk.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tracing::{debug, info};

use crate::chunk::{chunk_text, validate_chunking};
use crate::config::ChunkingConfig;
use crate::embedding::EmbeddingClient;
use crate::error::Result;
use crate::fingerprint::{content_hash, record_id};
use crate::index::VectorIndex;
use crate::models::{ChunkRecord, CorpusDocument};

/// Outcome of one reconciliation pass. This report is the whole contract
/// surfaced to callers; there is no partial-success granularity beyond
/// these counts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub files_total: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub chunks_written: usize,
    pub deleted_sources: Vec<String>,
}

impl IngestReport {
    /// Distinguished "nothing to do" condition: no documents existed, so
    /// no mutation was performed. Not an error.
    pub fn is_empty_corpus(&self) -> bool {
        self.files_total == 0
    }
}

/// Caller-facing result of [`run_ingest`]: every failure is folded into a
/// structured (success, message) pair rather than propagated.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub success: bool,
    pub message: String,
    pub files_total: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub chunks_written: usize,
    pub deleted_sources: Vec<String>,
}

/// Reconcile the index with the given document set.
///
/// Performs no mutation when `documents` is empty; propagates the first
/// failure otherwise (corpus errors are the caller's concern, this
/// function only sees readable documents).
pub async fn reconcile(
    documents: &[CorpusDocument],
    chunking: &ChunkingConfig,
    embedder: &dyn EmbeddingClient,
    index: &dyn VectorIndex,
) -> Result<IngestReport> {
    // Fail on bad parameters before any index mutation.
    validate_chunking(chunking.chunk_size, chunking.overlap)?;

    let mut report = IngestReport {
        files_total: documents.len(),
        ..Default::default()
    };

    if documents.is_empty() {
        return Ok(report);
    }

    // Group the index's recorded state by source. One representative
    // content hash per source: first record observed wins.
    let snapshot = index.metadata_snapshot().await?;
    let mut recorded_hashes: BTreeMap<String, String> = BTreeMap::new();
    for meta in &snapshot {
        recorded_hashes
            .entry(meta.source.clone())
            .or_insert_with(|| meta.file_hash.clone());
    }

    // Deletion pass: sources that vanished from the corpus.
    let current_paths: HashSet<&str> = documents.iter().map(|d| d.path.as_str()).collect();
    let deleted_sources: Vec<String> = recorded_hashes
        .keys()
        .filter(|source| !current_paths.contains(source.as_str()))
        .cloned()
        .collect();
    for source in &deleted_sources {
        index.delete_source(source).await?;
    }
    if !deleted_sources.is_empty() {
        info!(count = deleted_sources.len(), "deleted vanished sources");
    }
    report.deleted_sources = deleted_sources;

    // Per-document decision, accumulating one embedding batch for the
    // whole pass.
    let mut pending: Vec<(String, String, i64, String, String)> = Vec::new(); // (id, source, ordinal, hash, text)

    for doc in documents {
        let hash = content_hash(&doc.text);
        match recorded_hashes.get(&doc.path) {
            Some(prev) if *prev == hash => {
                report.skipped += 1;
                continue;
            }
            Some(_) => {
                // Changed content: delete-before-write, then re-chunk
                // from scratch.
                index.delete_source(&doc.path).await?;
                report.updated += 1;
            }
            None => {
                report.created += 1;
            }
        }

        let chunks = chunk_text(&doc.text, chunking.chunk_size, chunking.overlap)?;
        debug!(source = %doc.path, chunks = chunks.len(), "chunked document");
        for (ordinal, text) in chunks.into_iter().enumerate() {
            pending.push((
                record_id(&doc.path, ordinal),
                doc.path.clone(),
                ordinal as i64,
                hash.clone(),
                text,
            ));
        }
    }

    if !pending.is_empty() {
        let texts: Vec<String> = pending.iter().map(|p| p.4.clone()).collect();
        let vectors = embedder.embed(&texts).await?;

        let records: Vec<ChunkRecord> = pending
            .into_iter()
            .zip(vectors)
            .map(|((id, source, chunk_index, file_hash, text), vector)| ChunkRecord {
                id,
                source,
                chunk_index,
                file_hash,
                text,
                vector,
            })
            .collect();
        report.chunks_written = records.len();
        index.upsert(records).await?;
    }

    info!(
        files_total = report.files_total,
        created = report.created,
        updated = report.updated,
        skipped = report.skipped,
        chunks_written = report.chunks_written,
        "delta ingest complete"
    );

    Ok(report)
}

/// Read the corpus and reconcile, folding every failure into a structured
/// outcome. This is the operation surface the CLI (and any embedding
/// host) calls; it never panics or propagates a raw error.
pub async fn run_ingest(
    corpus: &crate::config::CorpusConfig,
    chunking: &ChunkingConfig,
    embedder: &dyn EmbeddingClient,
    index: &dyn VectorIndex,
) -> IngestOutcome {
    let documents = match crate::corpus::read_corpus(corpus) {
        Ok(docs) => docs,
        Err(e) => return IngestOutcome::failure(format!("ingest failed: {e}")),
    };

    match reconcile(&documents, chunking, embedder, index).await {
        Ok(report) if report.is_empty_corpus() => IngestOutcome {
            success: true,
            message: format!(
                "no documents found under {} — nothing to ingest",
                corpus.root.display()
            ),
            files_total: 0,
            created: 0,
            updated: 0,
            skipped: 0,
            chunks_written: 0,
            deleted_sources: Vec::new(),
        },
        Ok(report) => IngestOutcome {
            success: true,
            message: if report.deleted_sources.is_empty() {
                "ingest complete".to_string()
            } else {
                format!(
                    "ingest complete ({} vanished source(s) removed)",
                    report.deleted_sources.len()
                )
            },
            files_total: report.files_total,
            created: report.created,
            updated: report.updated,
            skipped: report.skipped,
            chunks_written: report.chunks_written,
            deleted_sources: report.deleted_sources,
        },
        Err(e) => IngestOutcome::failure(format!("ingest failed: {e}")),
    }
}

impl IngestOutcome {
    fn failure(message: String) -> Self {
        Self {
            success: false,
            message,
            files_total: 0,
            created: 0,
            updated: 0,
            skipped: 0,
            chunks_written: 0,
            deleted_sources: Vec::new(),
        }
    }
}
