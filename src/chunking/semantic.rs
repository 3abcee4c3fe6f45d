//! Semantic chunking: the Chunker+Stitcher component's only production
//! strategy.
//!
//! Splits text along semantic boundaries — paragraph, then sentence,
//! then word — with overlap bounded to span the longest entity a
//! bounded-input detector can emit. Deliberately has no silent
//! fixed-size fallback: silent truncation is the single biggest quality
//! regression this component must prevent, so a configuration this
//! chunker cannot honor is a boot-time error, not a quietly degraded
//! chunking pass.

use crate::chunking::traits::{Chunk, ChunkParams, Chunker};
use crate::error::{ChunkingError, Result};
use crate::io::find_char_boundary;

/// Hard ceiling on `chunk_size`, in characters.
pub const MAX_CHUNK_SIZE: usize = 200_000;

/// Semantic-boundary-preferring chunker.
///
/// Boundary search proceeds paragraph > single-newline > sentence > word
/// > raw character, wired as the sole Chunker+Stitcher strategy rather
/// than one of several selectable chunking backends.
#[derive(Debug, Clone, Copy)]
pub struct SemanticChunker {
    min_chunk_size: usize,
}

impl Default for SemanticChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl SemanticChunker {
    /// Constructs the chunker. Infallible today (the boundary scanner
    /// has no external resources to acquire), but the Chunker+Stitcher
    /// contract treats construction failure as fatal at boot
    /// (`Error::ChunkingUnavailable`) — see [`crate::error::ChunkingError::BoundaryScannerUnavailable`].
    #[must_use]
    pub const fn new() -> Self {
        Self { min_chunk_size: 64 }
    }

    /// Sets the minimum size a final chunk may stand alone at before
    /// being merged into its predecessor.
    #[must_use]
    pub const fn with_min_chunk_size(mut self, size: usize) -> Self {
        self.min_chunk_size = size;
        self
    }

    /// Finds the best boundary at or before `target_pos`: paragraph
    /// break, then single newline, then sentence-ending punctuation,
    /// then a space, falling back to a raw character boundary.
    fn find_best_boundary(&self, text: &str, target_pos: usize, window: usize) -> usize {
        if target_pos >= text.len() {
            return text.len();
        }

        let search_start = find_char_boundary(text, target_pos.saturating_sub(window));
        let search_end = find_char_boundary(text, target_pos.min(text.len()));

        if search_start >= search_end {
            return find_char_boundary(text, target_pos);
        }

        let region = &text[search_start..search_end];

        if let Some(pos) = region.rfind("\n\n") {
            let boundary = search_start + pos + 2;
            if boundary > search_start {
                return boundary;
            }
        }

        if let Some(pos) = region.rfind('\n') {
            let boundary = search_start + pos + 1;
            if boundary > search_start {
                return boundary;
            }
        }

        for (i, c) in region.char_indices().rev() {
            if matches!(c, '.' | '!' | '?') {
                let next_pos = search_start + i + c.len_utf8();
                if next_pos >= text.len() || text[next_pos..].starts_with([' ', '\n']) {
                    return next_pos;
                }
            }
        }

        if let Some(pos) = region.rfind(' ') {
            let boundary = search_start + pos + 1;
            if boundary > search_start {
                return boundary;
            }
        }

        find_char_boundary(text, target_pos)
    }
}

impl Chunker for SemanticChunker {
    fn chunk(&self, text: &str, params: ChunkParams) -> Result<Vec<Chunk>> {
        if params.chunk_size == 0 {
            return Err(ChunkingError::InvalidConfig {
                reason: "chunk_size must be > 0".to_string(),
            }
            .into());
        }
        if params.chunk_size > MAX_CHUNK_SIZE {
            return Err(ChunkingError::ChunkTooLarge {
                size: params.chunk_size,
                max: MAX_CHUNK_SIZE,
            }
            .into());
        }
        if params.overlap >= params.chunk_size {
            return Err(ChunkingError::OverlapTooLarge {
                overlap: params.overlap,
                size: params.chunk_size,
            }
            .into());
        }

        if text.is_empty() {
            return Ok(vec![]);
        }

        if text.len() <= params.chunk_size {
            return Ok(vec![Chunk::new(text.to_string(), 0, text.len())]);
        }

        let window = (params.chunk_size / 5).max(1);
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < text.len() {
            let target_end = (start + params.chunk_size).min(text.len());
            let end = if target_end >= text.len() {
                text.len()
            } else {
                self.find_best_boundary(text, target_end, window)
            };
            let end = if end <= start {
                find_char_boundary(text, target_end)
            } else {
                end
            };

            chunks.push(Chunk::new(text[start..end].to_string(), start, end));

            if end >= text.len() {
                break;
            }

            let next_start = if params.overlap > 0 {
                let overlap_start = end.saturating_sub(params.overlap);
                self.find_best_boundary(text, overlap_start, window)
            } else {
                end
            };
            start = if next_start <= start { end } else { next_start };
        }

        // Merge a too-small final chunk into its predecessor rather than
        // emit a sliver.
        let should_merge_tail = chunks.len() > 1 && chunks.last().is_some_and(|c| c.len() < self.min_chunk_size);
        if should_merge_tail
            && let Some(last) = chunks.pop()
            && let Some(prev) = chunks.pop()
        {
            let merged_text = format!("{}{}", prev.text, &text[prev.end..last.end]);
            chunks.push(Chunk::new(merged_text, prev.start, last.end));
        }

        Ok(chunks)
    }

    fn name(&self) -> &'static str {
        "semantic"
    }
}
