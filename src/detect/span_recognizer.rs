//! Multi-label span recognizer adapter.
//!
//! Unlike the token tagger, this producer is handed an explicit set of
//! candidate labels per call and may emit multiple overlapping labeled
//! spans for the same text region. This adapter's job is the batching
//! policy (bounding how many labels go into one model call), parallel
//! execution of those batches, grouping results into [`AggregatedSpan`]s
//! by exact span, and resolving same-span label conflicts before
//! handing entities onward.

use std::sync::{Arc, Mutex};

use rayon::prelude::*;

use crate::boot::BootConfig;
use crate::chunking::{Chunk, ChunkParams, Chunker, stitch};
use crate::conflict::{self, ConflictStats};
use crate::config::{ConfigSnapshot, DetectorScope};
use crate::detect::Detector;
use crate::entity::{Entity, Source, TypeTag};
use crate::error::{DetectorError, Result};

/// One raw labeled span as emitted by the span recognizer model, local
/// to the chunk and label batch it was produced from.
#[derive(Debug, Clone)]
pub struct RawLabeledSpan {
    /// Local start offset within the chunk text.
    pub start: usize,
    /// Local end offset within the chunk text.
    pub end: usize,
    /// The natural-language label this span matched (e.g. `"email
    /// address"`), as distinct from the canonical type tag it maps to.
    pub label: String,
    /// Model confidence in `[0.0, 1.0]`.
    pub score: f32,
}

/// The injected multi-label span recognition model.
pub trait SpanRecognizerModel: Send + Sync {
    /// Runs one batch of candidate labels over `window_text`.
    ///
    /// # Errors
    ///
    /// Returns [`DetectorError`] if inference fails for this batch.
    fn recognize(&self, window_text: &str, labels: &[String]) -> std::result::Result<Vec<RawLabeledSpan>, DetectorError>;
}

/// A deterministic stand-in that never finds anything.
#[derive(Debug, Default)]
pub struct NullSpanRecognizerModel;

impl SpanRecognizerModel for NullSpanRecognizerModel {
    fn recognize(&self, _window_text: &str, _labels: &[String]) -> std::result::Result<Vec<RawLabeledSpan>, DetectorError> {
        Ok(Vec::new())
    }
}

/// Spans grouped by exact `(start, end)` after stitching, carrying every
/// label the model assigned to that span.
#[derive(Debug, Clone)]
pub struct AggregatedSpan {
    /// Shared start offset.
    pub start: usize,
    /// Shared end offset.
    pub end: usize,
    /// Every `(label, score)` pair the model assigned to this exact
    /// span, across every batch that covered it.
    pub candidates: Vec<(String, f32)>,
}

/// Adapter over a [`SpanRecognizerModel`].
pub struct SpanRecognizerAdapter {
    model: Box<dyn SpanRecognizerModel>,
    chunker: Arc<dyn Chunker>,
    params: ChunkParams,
    boot: Arc<BootConfig>,
    stats: Mutex<ConflictStats>,
}

impl SpanRecognizerAdapter {
    /// Builds the adapter over an injected model, chunker, and the
    /// boot-time conflict-resolution configuration.
    #[must_use]
    pub fn new(model: Box<dyn SpanRecognizerModel>, chunker: Arc<dyn Chunker>, params: ChunkParams, boot: Arc<BootConfig>) -> Self {
        Self {
            model,
            chunker,
            params,
            boot,
            stats: Mutex::new(ConflictStats::default()),
        }
    }
}

impl Detector for SpanRecognizerAdapter {
    fn source(&self) -> Source {
        Source::MlRecognizer
    }

    fn detect(&self, text: &str, threshold: f32, snapshot: &ConfigSnapshot) -> Result<Vec<Entity>> {
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let active_tags = snapshot.active_tags_for(DetectorScope::MlRecognizer);
        if active_tags.is_empty() {
            return Ok(Vec::new());
        }

        // The model is handed each active type's producer-side
        // `detector_label` (e.g. `"email address"`), never the canonical
        // tag itself, and echoes that same label back on a match. Keep
        // the reverse mapping so results round-trip to the owning
        // `TypeTag` instead of being re-derived from the label text.
        let mut labels: Vec<String> = Vec::with_capacity(active_tags.len());
        let mut label_to_tag: std::collections::HashMap<String, TypeTag> = std::collections::HashMap::with_capacity(active_tags.len());
        for tag in &active_tags {
            if let Some(cfg) = snapshot.per_type.get(tag) {
                label_to_tag.insert(cfg.detector_label.clone(), tag.clone());
                labels.push(cfg.detector_label.clone());
            }
        }
        let batches: Vec<&[String]> = labels.chunks(snapshot.global.batch_label_limit.max(1)).collect();

        let chunks = self.chunker.chunk(text, self.params)?;

        // Cross product of chunks x label batches, each run independently
        // and in parallel.
        let work: Vec<(Chunk, &[String])> = chunks
            .iter()
            .flat_map(|c| batches.iter().map(move |b| (c.clone(), *b)))
            .collect();

        let mut by_chunk: std::collections::HashMap<(usize, usize), Vec<Entity>> = std::collections::HashMap::new();
        let mut chunk_by_key: std::collections::HashMap<(usize, usize), Chunk> = std::collections::HashMap::new();

        let raw_results: Vec<Result<((usize, usize), Chunk, Vec<RawLabeledSpan>)>> = work
            .into_par_iter()
            .map(|(chunk, label_batch)| -> Result<((usize, usize), Chunk, Vec<RawLabeledSpan>)> {
                let raw = self
                    .model
                    .recognize(&chunk.text, label_batch)
                    .map_err(crate::error::Error::from)?;
                Ok(((chunk.start, chunk.end), chunk, raw))
            })
            .collect();

        for result in raw_results {
            let (key, chunk, raw) = result?;
            chunk_by_key.entry(key).or_insert_with(|| chunk.clone());
            let entities: Vec<Entity> = raw
                .into_iter()
                .filter(|r| r.start < r.end && r.end <= chunk.text.len())
                .map(|r| {
                    let tag = label_to_tag.get(&r.label).cloned().unwrap_or_else(TypeTag::unknown);
                    Entity::new(chunk.text[r.start..r.end].to_string(), tag, r.start, r.end, r.score, Source::MlRecognizer)
                })
                .collect();
            by_chunk.entry(key).or_default().extend(entities);
        }

        let chunks_with_entities: Vec<(Chunk, Vec<Entity>)> = chunk_by_key
            .into_iter()
            .map(|(key, chunk)| (chunk, by_chunk.remove(&key).unwrap_or_default()))
            .collect();

        let stitched = stitch(chunks_with_entities);
        let aggregated = aggregate_by_span(stitched);

        let mut stats = ConflictStats::default();
        let resolved = conflict::resolve_aggregated(&self.boot, snapshot, text, aggregated, &mut stats);
        let deduped = conflict::resolve_overlaps(resolved);
        tracing::debug!(
            total_conflicts = stats.total_conflicts,
            resolved_by_pattern = stats.resolved_by_pattern,
            resolved_by_fallback = stats.resolved_by_fallback,
            resolved_by_category = stats.resolved_by_category,
            resolved_by_score = stats.resolved_by_score,
            "span recognizer conflict resolution summary"
        );
        if let Ok(mut guard) = self.stats.lock() {
            *guard = stats;
        }

        Ok(deduped
            .into_iter()
            .filter(|e| snapshot.is_enabled(&e.r#type) && e.score >= snapshot.effective_threshold(&e.r#type, threshold))
            .collect())
    }

    fn take_conflict_stats(&self) -> ConflictStats {
        self.stats.lock().map(std::mem::take).unwrap_or_default()
    }
}

/// Groups entities sharing an exact `(start, end)` span into one
/// [`AggregatedSpan`] per span.
fn aggregate_by_span(entities: Vec<Entity>) -> Vec<AggregatedSpan> {
    let mut by_span: std::collections::BTreeMap<(usize, usize), Vec<(String, f32)>> = std::collections::BTreeMap::new();
    for e in entities {
        by_span.entry((e.start, e.end)).or_default().push((e.r#type.as_str().to_string(), e.score));
    }
    by_span
        .into_iter()
        .map(|((start, end), candidates)| AggregatedSpan { start, end, candidates })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::SemanticChunker;
    use crate::config::{GlobalSettings, PerTypeConfig};
    use std::collections::HashMap;

    fn snapshot_with(tags: &[&str]) -> ConfigSnapshot {
        let mut per_type = HashMap::new();
        for tag in tags {
            per_type.insert(
                TypeTag::new(*tag),
                PerTypeConfig {
                    enabled: true,
                    threshold: 0.0,
                    detector: DetectorScope::MlRecognizer,
                    detector_label: (*tag).to_lowercase(),
                    category: "IDENTITY".to_string(),
                },
            );
        }
        ConfigSnapshot {
            global: GlobalSettings::default(),
            per_type,
        }
    }

    #[test]
    fn empty_active_tags_short_circuits_without_model_call() {
        let boot = crate::boot::BootConfig::load_default().unwrap();
        let adapter = SpanRecognizerAdapter::new(Box::new(NullSpanRecognizerModel), Arc::new(SemanticChunker::new()), ChunkParams::typical(), boot);
        let snapshot = ConfigSnapshot::default();
        let result = adapter.detect("some text", 0.5, &snapshot).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn aggregates_same_span_candidates() {
        let a = Entity::new("1.2.3.4", "IP_ADDRESS", 0, 7, 0.6, Source::MlRecognizer);
        let b = Entity::new("1.2.3.4", "AVS_FILTER", 0, 7, 0.8, Source::MlRecognizer);
        let aggregated = aggregate_by_span(vec![a, b]);
        assert_eq!(aggregated.len(), 1);
        assert_eq!(aggregated[0].candidates.len(), 2);
    }

    #[test]
    fn null_model_returns_no_entities() {
        let boot = crate::boot::BootConfig::load_default().unwrap();
        let adapter = SpanRecognizerAdapter::new(Box::new(NullSpanRecognizerModel), Arc::new(SemanticChunker::new()), ChunkParams::typical(), boot);
        let snapshot = snapshot_with(&["EMAIL"]);
        let result = adapter.detect("Contact john@example.com", 0.5, &snapshot).unwrap();
        assert!(result.is_empty());
    }

    /// Echoes the first candidate label back as a match spanning the
    /// whole window, so the adapter's label-to-tag round trip can be
    /// exercised without a real model.
    struct EchoFirstLabelModel;

    impl SpanRecognizerModel for EchoFirstLabelModel {
        fn recognize(&self, window_text: &str, labels: &[String]) -> std::result::Result<Vec<RawLabeledSpan>, DetectorError> {
            let Some(label) = labels.first() else { return Ok(Vec::new()) };
            Ok(vec![RawLabeledSpan {
                start: 0,
                end: window_text.len(),
                label: label.clone(),
                score: 0.9,
            }])
        }
    }

    #[test]
    fn multi_word_detector_label_round_trips_to_canonical_tag() {
        let boot = crate::boot::BootConfig::load_default().unwrap();
        let adapter = SpanRecognizerAdapter::new(Box::new(EchoFirstLabelModel), Arc::new(SemanticChunker::new()), ChunkParams::typical(), boot);
        let mut per_type = HashMap::new();
        per_type.insert(
            TypeTag::new("IP_ADDRESS"),
            PerTypeConfig {
                enabled: true,
                threshold: 0.0,
                detector: DetectorScope::MlRecognizer,
                detector_label: "ip address".to_string(),
                category: "DIGITAL".to_string(),
            },
        );
        let snapshot = ConfigSnapshot {
            global: GlobalSettings::default(),
            per_type,
        };
        let result = adapter.detect("192.168.1.1", 0.5, &snapshot).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].r#type, TypeTag::new("IP_ADDRESS"));
    }

    #[test]
    fn unmapped_label_falls_back_to_unknown_tag() {
        struct EchoUnknownLabelModel;
        impl SpanRecognizerModel for EchoUnknownLabelModel {
            fn recognize(&self, window_text: &str, _labels: &[String]) -> std::result::Result<Vec<RawLabeledSpan>, DetectorError> {
                Ok(vec![RawLabeledSpan {
                    start: 0,
                    end: window_text.len(),
                    label: "some label the model invented".to_string(),
                    score: 0.9,
                }])
            }
        }
        let boot = crate::boot::BootConfig::load_default().unwrap();
        let adapter = SpanRecognizerAdapter::new(Box::new(EchoUnknownLabelModel), Arc::new(SemanticChunker::new()), ChunkParams::typical(), boot);
        let snapshot = snapshot_with(&["EMAIL"]);
        let result = adapter.detect("Contact john@example.com", 0.0, &snapshot).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].r#type, TypeTag::unknown());
    }
}
