//! Corpus reader: enumerates readable documents under the configured root.
//!
//! Files are matched against include/exclude glob sets and returned with
//! their path relative to the root, sorted by path so every reconciliation
//! pass processes documents in the same order.

use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::config::CorpusConfig;
use crate::error::{RagError, Result};
use crate::models::CorpusDocument;

pub fn read_corpus(config: &CorpusConfig) -> Result<Vec<CorpusDocument>> {
    let root = &config.root;
    if !root.exists() {
        return Err(RagError::CorpusRead {
            path: root.clone(),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "corpus root does not exist",
            ),
        });
    }

    let include_set = build_globset(&config.include_globs)?;
    let exclude_set = build_globset(&config.exclude_globs)?;

    let mut docs = Vec::new();

    let walker = WalkDir::new(root).follow_links(config.follow_symlinks);
    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().map(|p| p.to_path_buf()).unwrap_or_else(|| root.clone());
            RagError::CorpusRead {
                path,
                source: e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed")),
            }
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        let text = std::fs::read_to_string(path).map_err(|e| RagError::CorpusRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        docs.push(CorpusDocument {
            path: rel_str,
            text,
        });
    }

    // Deterministic processing order.
    docs.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(docs)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).map_err(|e| {
            RagError::InvalidConfiguration(format!("bad glob pattern '{pattern}': {e}"))
        })?);
    }
    builder
        .build()
        .map_err(|e| RagError::InvalidConfiguration(format!("failed to build glob set: {e}")))
}
