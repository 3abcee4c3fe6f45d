//! The Chunker+Stitcher component.
//!
//! Provides bounded-input detectors with [`Chunk`]s covering the whole
//! input, and [`stitch`] remaps their local-offset results back to
//! global offsets, dropping duplicates introduced by overlap.

pub mod semantic;
pub mod stitch;
pub mod traits;

pub use semantic::SemanticChunker;
pub use stitch::stitch;
pub use traits::{Chunk, ChunkParams, Chunker};

/// Builds the crate's one production chunker. Construction is treated as
/// fallible to honor the Chunker+Stitcher contract even though today's
/// semantic scanner has no external resources to fail on.
///
/// # Errors
///
/// Returns [`crate::error::Error::ChunkingUnavailable`] if the semantic
/// boundary scanner cannot be constructed.
pub fn default_chunker() -> crate::error::Result<SemanticChunker> {
    Ok(SemanticChunker::new())
}
