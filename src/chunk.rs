//! Fixed-size overlapping window chunker.
//!
//! Splits normalized text into windows of `chunk_size` characters where
//! window *i* (for i > 0) starts `overlap` characters before the previous
//! window's end. The final window runs to end-of-text and may be shorter;
//! every other window is exactly `chunk_size` long.
//!
//! Chunking is deterministic: the same (text, chunk_size, overlap) always
//! yields the same sequence. The delta reconciler depends on this — it
//! skips unchanged documents on the strength of a content hash, which is
//! only sound if re-chunking identical text reproduces identical chunks.

use crate::error::{RagError, Result};

/// Reject chunking parameters that cannot make progress.
///
/// Called by [`chunk_text`] and also up front by the reconciler, before it
/// performs any index mutation.
pub fn validate_chunking(chunk_size: usize, overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(RagError::InvalidConfiguration(
            "chunk_size must be > 0".to_string(),
        ));
    }
    if overlap >= chunk_size {
        return Err(RagError::InvalidConfiguration(format!(
            "overlap ({overlap}) must be < chunk_size ({chunk_size})"
        )));
    }
    Ok(())
}

/// Split text into overlapping windows.
///
/// Line endings are normalized (`\r\n` → `\n`) and the whole text is
/// trimmed before splitting. Empty or all-whitespace input yields an
/// empty sequence, not an error. Offsets are counted in characters so a
/// window boundary can never land inside a multi-byte sequence.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    validate_chunking(chunk_size, overlap)?;

    let normalized = text.replace("\r\n", "\n");
    let trimmed = normalized.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let chars: Vec<char> = trimmed.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0usize;

    // chunk_size - overlap > 0 is guaranteed above, so start strictly
    // increases and the loop terminates.
    loop {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start = end - overlap;
    }

    Ok(chunks)
}
