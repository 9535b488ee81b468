//! Chat orchestration: retrieval + prompt + answer in one operation.
//!
//! Two variants over the same components:
//!
//! - [`ChatEngine::ask`] — blocking; returns the complete answer and a
//!   deduplicated reference list.
//! - [`ChatEngine::ask_stream`] — an ordered event sequence: zero or more
//!   [`ChatEvent::Token`]s in generation order, then exactly one
//!   [`ChatEvent::References`], then [`ChatEvent::Done`]. A mid-stream
//!   failure becomes a terminal [`ChatEvent::Error`] instead, since
//!   tokens already emitted cannot be retracted.
//!
//! When retrieval returns nothing the orchestrator short-circuits: one
//! canned token, then `Done` — no model call, no references event.
//!
//! The streaming producer runs as a spawned task sending into a bounded
//! channel, so it suspends at every emitted event and a host event loop
//! can interleave other work between tokens. Dropping the receiver
//! abandons the stream; the producer stops without side effects
//! (answering performs no index mutation).

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::answer::AnswerModel;
use crate::embedding::EmbeddingClient;
use crate::error::Result;
use crate::models::{Neighbor, Reference};
use crate::prompt::build_prompt;
use crate::retrieve::retrieve;

/// Fixed fallback when retrieval finds nothing. Not a model answer.
pub const NO_MATCH_ANSWER: &str = "No relevant material was found for this question.";

/// Capacity of the streaming event channel.
const EVENT_BUFFER: usize = 32;

/// Complete answer with its supporting references.
#[derive(Debug, Clone)]
pub struct ChatResult {
    pub answer: String,
    pub references: Vec<Reference>,
}

/// One event of the streaming answer sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// Incremental answer fragment, a raw model delta.
    Token(String),
    /// The deduplicated reference list; emitted exactly once, after all
    /// tokens.
    References(Vec<Reference>),
    /// Positive end-of-stream marker. Nothing follows.
    Done,
    /// Terminal failure. Nothing follows.
    Error(String),
}

/// Composes the retrieval engine, prompt builder, and answer model.
///
/// Collaborators are explicit constructor dependencies so tests can
/// substitute fakes for the remote services.
pub struct ChatEngine {
    embedder: Arc<dyn EmbeddingClient>,
    index: Arc<dyn crate::index::VectorIndex>,
    model: Arc<dyn AnswerModel>,
    top_k: usize,
}

impl ChatEngine {
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        index: Arc<dyn crate::index::VectorIndex>,
        model: Arc<dyn AnswerModel>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            model,
            top_k,
        }
    }

    /// Answer a question in one blocking call.
    pub async fn ask(&self, question: &str) -> Result<ChatResult> {
        let retrieved = retrieve(
            question,
            self.top_k,
            self.embedder.as_ref(),
            self.index.as_ref(),
        )
        .await?;

        if retrieved.is_empty() {
            debug!("no relevant matches; skipping model call");
            return Ok(ChatResult {
                answer: NO_MATCH_ANSWER.to_string(),
                references: Vec::new(),
            });
        }

        let references = dedup_references(&retrieved);
        let prompt = build_prompt(question, &retrieved);
        let answer = self.model.complete(&prompt).await?;

        Ok(ChatResult { answer, references })
    }

    /// Answer a question as an ordered event stream.
    ///
    /// The returned receiver is the consumption contract: `recv().await`
    /// for blocking consumption, `try_recv()` for polling. The producer
    /// yields at every emitted event; dropping the receiver cancels it.
    pub fn ask_stream(&self, question: &str) -> mpsc::Receiver<ChatEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let embedder = Arc::clone(&self.embedder);
        let index = Arc::clone(&self.index);
        let model = Arc::clone(&self.model);
        let top_k = self.top_k;
        let question = question.to_string();

        tokio::spawn(async move {
            let retrieved =
                match retrieve(&question, top_k, embedder.as_ref(), index.as_ref()).await {
                    Ok(r) => r,
                    Err(e) => {
                        let _ = tx.send(ChatEvent::Error(e.to_string())).await;
                        return;
                    }
                };

            if retrieved.is_empty() {
                // Distinct terminal path: canned token, no model call,
                // no references event.
                let _ = tx.send(ChatEvent::Token(NO_MATCH_ANSWER.to_string())).await;
                let _ = tx.send(ChatEvent::Done).await;
                return;
            }

            let references = dedup_references(&retrieved);
            let prompt = build_prompt(&question, &retrieved);

            let (token_tx, mut token_rx) = mpsc::channel::<String>(EVENT_BUFFER);
            let generator =
                tokio::spawn(async move { model.stream(&prompt, token_tx).await });

            while let Some(token) = token_rx.recv().await {
                if tx.send(ChatEvent::Token(token)).await.is_err() {
                    // Consumer abandoned the stream; nothing to undo.
                    return;
                }
            }

            match generator.await {
                Ok(Ok(())) => {
                    let _ = tx.send(ChatEvent::References(references)).await;
                    let _ = tx.send(ChatEvent::Done).await;
                }
                Ok(Err(e)) => {
                    let _ = tx.send(ChatEvent::Error(e.to_string())).await;
                }
                Err(e) => {
                    let _ = tx
                        .send(ChatEvent::Error(format!("answer task failed: {e}")))
                        .await;
                }
            }
        });

        rx
    }
}

/// Deduplicate references by (source, chunk ordinal). First occurrence
/// wins; original relative order is preserved.
pub fn dedup_references(retrieved: &[Neighbor]) -> Vec<Reference> {
    let mut seen = HashSet::new();
    let mut references = Vec::new();
    for n in retrieved {
        if seen.insert((n.source.clone(), n.chunk_index)) {
            references.push(Reference {
                source: n.source.clone(),
                chunk: n.chunk_index,
                distance: n.distance,
            });
        }
    }
    references
}
