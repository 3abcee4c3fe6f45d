//! Detector adapters: three uniform adapters over
//! heterogeneous producers, sharing one contract.
//!
//! The ML-inference internals are external collaborators;
//! these modules own the pre/post-processing that makes the three
//! producers' results comparable to the Merger.

pub mod pattern;
pub mod span_recognizer;
pub mod token_tagger;

pub use pattern::{BootPatternModel, PatternMatcherAdapter, PatternModel};
pub use span_recognizer::{AggregatedSpan, NullSpanRecognizerModel, RawLabeledSpan, SpanRecognizerAdapter, SpanRecognizerModel};
pub use token_tagger::{NullTokenTaggerModel, RawSpan, TokenTaggerAdapter, TokenTaggerModel};

use crate::config::ConfigSnapshot;
use crate::conflict::ConflictStats;
use crate::entity::{Entity, Source};
use crate::error::Result;

/// Common contract shared by all three detector families.
///
/// A tagged-variant dispatch would work equally well; a trait with
/// three implementors is the idiomatic Rust rendition of "same
/// contract, different body" and is what this crate uses.
pub trait Detector: Send + Sync {
    /// Which family this adapter belongs to, for provenance.
    fn source(&self) -> Source;

    /// Runs detection over `text`, filtering to types active in
    /// `snapshot` and scoring at or above `threshold`.
    ///
    /// # Errors
    ///
    /// Returns an error specific to the detector family; the Orchestrator
    /// contains these and contributes an empty list instead of aborting
    /// the request.
    fn detect(&self, text: &str, threshold: f32, snapshot: &ConfigSnapshot) -> Result<Vec<Entity>>;

    /// Conflict-resolution counters accumulated by the most recent
    /// `detect` call, read and reset by the Orchestrator after every
    /// request. Only the span recognizer
    /// adapter produces conflicts; every other adapter keeps the
    /// all-zero default.
    fn take_conflict_stats(&self) -> ConflictStats {
        ConflictStats::default()
    }
}

/// Deduplicates entities by `(type, start, end)`, keeping the first
/// occurrence. Shared by adapters whose post-processing can introduce
/// exact duplicates.
pub(crate) fn dedup_by_type_span(entities: Vec<Entity>) -> Vec<Entity> {
    let mut seen = std::collections::HashSet::new();
    entities
        .into_iter()
        .filter(|e| seen.insert((e.r#type.clone(), e.start, e.end)))
        .collect()
}
