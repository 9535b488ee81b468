//! # docrag
//!
//! Retrieval-augmented question answering over a local document corpus.
//!
//! Documents under a configured root are chunked, embedded, and stored in
//! a SQLite-backed vector index; questions are embedded, matched against
//! that index, and answered by a language model constrained to the
//! retrieved context.
//!
//! ```text
//! ┌────────┐   ┌──────────────────────┐   ┌──────────┐
//! │ Corpus │──▶│  Delta reconciler     │──▶│  SQLite   │
//! │ (files)│   │ hash → chunk → embed  │   │  vectors  │
//! └────────┘   └──────────────────────┘   └────┬─────┘
//!                                              │ k-NN
//!                  ┌───────────────────────────┤
//!                  ▼                           ▼
//!            ┌──────────┐   grounded    ┌──────────┐
//!            │ Retrieval │───prompt────▶│  Answer   │
//!            │  engine   │              │  model    │
//!            └──────────┘              └──────────┘
//! ```
//!
//! Re-running ingestion embeds only what changed: unchanged documents are
//! skipped on the strength of a content hash, edited documents are
//! deleted and rewritten, vanished documents are removed from the index.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`corpus`] | Document enumeration under the corpus root |
//! | [`chunk`] | Overlapping fixed-size window chunking |
//! | [`fingerprint`] | Content hashes and stable record identity |
//! | [`embedding`] | Embedding client abstraction (OpenAI, Ollama) |
//! | [`index`] | Vector index abstraction (SQLite, in-memory) |
//! | [`ingest`] | Delta reconciliation of corpus against index |
//! | [`retrieve`] | Question embedding and k-NN search |
//! | [`prompt`] | Grounded prompt construction |
//! | [`answer`] | Answer model abstraction and streaming client |
//! | [`chat`] | Question-answering orchestration, blocking and streamed |
//! | [`error`] | Failure taxonomy |

pub mod answer;
pub mod chat;
pub mod chunk;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod fingerprint;
pub mod index;
pub mod ingest;
pub mod models;
pub mod prompt;
pub mod retrieve;

pub use chat::{ChatEngine, ChatEvent, ChatResult, NO_MATCH_ANSWER};
pub use error::{RagError, Result};
pub use ingest::{run_ingest, IngestOutcome, IngestReport};
pub use models::{ChunkRecord, CorpusDocument, Neighbor, RecordMeta, Reference};
