//! TOML configuration parsing and validation.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{RagError, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub index: IndexConfig,
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub answer: AnswerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string(), "**/*.txt".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    800
}
fn default_overlap() -> usize {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    4
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    pub model: String,
    /// Base URL of the service. Defaults to the provider's public endpoint
    /// (api.openai.com, or localhost:11434 for Ollama).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_embedding_provider() -> String {
    "openai".to_string()
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnswerConfig {
    pub model: String,
    /// Base URL of an OpenAI-compatible chat completions service.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_answer_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_answer_timeout_secs() -> u64 {
    120
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        RagError::InvalidConfiguration(format!("failed to read config file {}: {e}", path.display()))
    })?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| RagError::InvalidConfiguration(format!("failed to parse config file: {e}")))?;

    crate::chunk::validate_chunking(config.chunking.chunk_size, config.chunking.overlap)?;

    if config.retrieval.top_k < 1 {
        return Err(RagError::InvalidConfiguration(
            "retrieval.top_k must be >= 1".to_string(),
        ));
    }

    match config.embedding.provider.as_str() {
        "openai" | "ollama" => {}
        other => {
            return Err(RagError::InvalidConfiguration(format!(
                "unknown embedding provider: '{other}'. Must be openai or ollama."
            )))
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("docrag.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    const MINIMAL: &str = r#"
[index]
path = "data/index.sqlite"

[corpus]
root = "docs"

[embedding]
model = "text-embedding-3-small"

[answer]
model = "gpt-4.1-mini"
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(tmp.path(), MINIMAL);
        let config = load_config(&path).unwrap();
        assert_eq!(config.chunking.chunk_size, 800);
        assert_eq!(config.chunking.overlap, 120);
        assert_eq!(config.retrieval.top_k, 4);
        assert_eq!(config.embedding.provider, "openai");
        assert_eq!(config.corpus.include_globs, vec!["**/*.md", "**/*.txt"]);
    }

    #[test]
    fn overlap_not_below_chunk_size_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let full = "[index]\npath = \"i.sqlite\"\n[corpus]\nroot = \"docs\"\n[chunking]\nchunk_size = 100\noverlap = 100\n[embedding]\nmodel = \"m\"\n[answer]\nmodel = \"m\"\n";
        let path = write_config(tmp.path(), full);
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, RagError::InvalidConfiguration(_)));
    }

    #[test]
    fn unknown_embedding_provider_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let full = "[index]\npath = \"i.sqlite\"\n[corpus]\nroot = \"docs\"\n[embedding]\nprovider = \"acme\"\nmodel = \"m\"\n[answer]\nmodel = \"m\"\n";
        let path = write_config(tmp.path(), full);
        assert!(load_config(&path).is_err());
    }
}
