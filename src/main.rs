//! # docrag CLI
//!
//! Commands for index initialization, delta ingestion, and
//! retrieval-augmented question answering.
//!
//! ```bash
//! docrag --config ./config/docrag.toml init
//! docrag --config ./config/docrag.toml ingest
//! docrag --config ./config/docrag.toml ask "how do I deploy?"
//! docrag --config ./config/docrag.toml ask --stream "how do I deploy?"
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use docrag::answer::create_model;
use docrag::chat::{ChatEngine, ChatEvent};
use docrag::config::{load_config, Config};
use docrag::embedding::create_client;
use docrag::index::SqliteIndex;
use docrag::ingest::run_ingest;

/// docrag — retrieval-augmented question answering over a local document
/// corpus.
#[derive(Parser)]
#[command(
    name = "docrag",
    about = "Retrieval-augmented question answering over a local document corpus",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docrag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the index database and schema. Idempotent.
    Init,

    /// Reconcile the index with the corpus: embed new and changed
    /// documents, remove vanished ones, skip the rest.
    Ingest,

    /// Ask a question against the indexed corpus.
    Ask {
        question: String,

        /// Stream the answer token by token instead of waiting for the
        /// full completion.
        #[arg(long)]
        stream: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let index = SqliteIndex::connect(&config.index.path).await?;
            index.close().await;
            println!("index initialized at {}", config.index.path.display());
        }
        Commands::Ingest => {
            ingest(&config).await?;
        }
        Commands::Ask { question, stream } => {
            ask(&config, &question, stream).await?;
        }
    }

    Ok(())
}

async fn ingest(config: &Config) -> Result<()> {
    let embedder = create_client(&config.embedding)?;
    let index = SqliteIndex::connect(&config.index.path).await?;

    let outcome = run_ingest(
        &config.corpus,
        &config.chunking,
        embedder.as_ref(),
        &index,
    )
    .await;

    println!("{}", outcome.message);
    if outcome.success && outcome.files_total > 0 {
        println!(
            "  files_total={}  created={}  updated={}  skipped={}",
            outcome.files_total, outcome.created, outcome.updated, outcome.skipped
        );
        println!("  chunks_written={}", outcome.chunks_written);
    }
    if !outcome.deleted_sources.is_empty() {
        println!("removed sources:");
        for source in &outcome.deleted_sources {
            println!("  - {source}");
        }
    }

    index.close().await;
    if !outcome.success {
        std::process::exit(1);
    }
    Ok(())
}

async fn ask(config: &Config, question: &str, stream: bool) -> Result<()> {
    let embedder: Arc<dyn docrag::embedding::EmbeddingClient> =
        Arc::from(create_client(&config.embedding)?);
    let index = Arc::new(SqliteIndex::connect(&config.index.path).await?);
    let model: Arc<dyn docrag::answer::AnswerModel> = Arc::from(create_model(&config.answer)?);

    let engine = ChatEngine::new(embedder, index, model, config.retrieval.top_k);

    if stream {
        let mut rx = engine.ask_stream(question);
        let mut stdout = std::io::stdout();
        while let Some(event) = rx.recv().await {
            match event {
                ChatEvent::Token(token) => {
                    print!("{token}");
                    stdout.flush()?;
                }
                ChatEvent::References(references) => {
                    println!("\n\n--- references ---");
                    for r in references {
                        println!("- {} (chunk {}, distance {:.4})", r.source, r.chunk, r.distance);
                    }
                }
                ChatEvent::Done => break,
                ChatEvent::Error(message) => {
                    println!();
                    anyhow::bail!("{message}");
                }
            }
        }
        println!();
    } else {
        let result = engine.ask(question).await?;
        println!("{}", result.answer);
        if !result.references.is_empty() {
            println!("\n--- references ---");
            for r in &result.references {
                println!("- {} (chunk {}, distance {:.4})", r.source, r.chunk, r.distance);
            }
        }
    }

    Ok(())
}
