//! Fixed-size chunking strategy with overlap.
//!
//! Windows are measured in Unicode scalar values, never bytes, so a window
//! boundary can not split a multi-byte character. Every window is trimmed
//! of surrounding whitespace; a window that trims to nothing is still
//! emitted so `chunk_index` stays aligned with window position.

use docrag_core::{ChunkConfig, ChunkError, ChunkOutput, Chunker};
use tracing::debug;

/// Fixed-size chunker with configurable overlap.
pub struct FixedSizeChunker;

impl FixedSizeChunker {
    /// Create a new fixed-size chunker.
    pub fn new() -> Self {
        Self
    }
}

impl Default for FixedSizeChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for FixedSizeChunker {
    fn name(&self) -> &str {
        "fixed_size"
    }

    fn chunk(&self, text: &str, config: &ChunkConfig) -> Result<Vec<ChunkOutput>, ChunkError> {
        config.validate()?;

        if text.is_empty() {
            return Ok(vec![]);
        }

        let chars: Vec<char> = text.chars().collect();
        let total_chars = chars.len();
        let step = config.step();

        let mut chunks = Vec::with_capacity(total_chars / step + 1);
        let mut start = 0;
        while start < total_chars {
            let end = (start + config.chunk_size).min(total_chars);
            let window: String = chars[start..end].iter().collect();

            chunks.push(ChunkOutput {
                content: window.trim().to_string(),
                char_range: start..end,
            });

            // The window touching the end already covers everything after `start + step`.
            if end >= total_chars {
                break;
            }
            start += step;
        }

        debug!(
            "Chunked {} chars into {} windows (size {}, overlap {})",
            total_chars,
            chunks.len(),
            config.chunk_size,
            config.overlap
        );

        Ok(chunks)
    }
}

/// Split `text` into trimmed windows of `chunk_size` characters sharing
/// `overlap` characters with their predecessor.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>, ChunkError> {
    let config = ChunkConfig::new(chunk_size, overlap)?;
    let chunks = FixedSizeChunker::new().chunk(text, &config)?;
    Ok(chunks.into_iter().map(|c| c.content).collect())
}
