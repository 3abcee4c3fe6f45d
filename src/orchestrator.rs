//! Orchestrator: the single entry point that ties every
//! other component together into one request.
//!
//! `Orchestrator::detect` NFC-normalizes the input once, fetches (or
//! accepts) a configuration snapshot, fans out to the active detectors,
//! merges and post-filters the results, and renders a masked string —
//! always in that fixed order.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;

use crate::config::{ConfigGate, ConfigSnapshot, ConfigStore, DetectorScope};
use crate::conflict::ConflictStats;
use crate::detect::Detector;
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::io::unicode::normalize_nfc;
use crate::mask::mask;
use crate::merge::merge;

const DEFAULT_GLOBAL_THRESHOLD: f32 = 0.5;

/// The result of one `detect` call.
#[derive(Debug, Clone, Default)]
pub struct DetectOutcome {
    /// Final, merged and post-filtered entities.
    pub entities: Vec<Entity>,
    /// Count of entities per canonical uppercase type tag.
    pub summary: BTreeMap<String, usize>,
    /// Masked rendering of the normalized input.
    pub masked_text: String,
    /// Conflict resolver counters for this request.
    pub conflict_stats: ConflictStats,
    /// Detector families that failed and contributed an empty list,
    /// named for logging.
    pub failed_detectors: Vec<&'static str>,
}

impl DetectOutcome {
    /// The outcome for an empty request: no detector calls, no entities.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Observed once per request: when set and elapsed, sub-tasks stop
/// starting new work and the request fails with [`Error::Cancelled`].
#[derive(Debug, Clone, Copy)]
pub struct Deadline(Instant);

impl Deadline {
    /// Builds a deadline `from_now` in the future.
    #[must_use]
    pub fn after(from_now: std::time::Duration) -> Self {
        Self(Instant::now() + from_now)
    }

    fn elapsed(self) -> bool {
        Instant::now() >= self.0
    }
}

/// Ties the Configuration Gate, detector adapters, Merger, post-filter,
/// and Masking into one request-scoped call.
pub struct Orchestrator {
    detectors: Vec<Box<dyn Detector>>,
    gate: ConfigGate,
    store: Arc<dyn ConfigStore>,
}

impl Orchestrator {
    /// Builds an orchestrator over the given detector adapters and
    /// configuration store, using a strict gate (store failures surface
    /// as `Error::ConfigUnavailable`).
    #[must_use]
    pub fn new(detectors: Vec<Box<dyn Detector>>, store: Arc<dyn ConfigStore>) -> Self {
        Self {
            detectors,
            gate: ConfigGate::strict(),
            store,
        }
    }

    /// Builds an orchestrator whose configuration gate falls back to
    /// `default` when the store is unreachable, instead of failing the
    /// request.
    #[must_use]
    pub fn with_fallback(detectors: Vec<Box<dyn Detector>>, store: Arc<dyn ConfigStore>, default: ConfigSnapshot) -> Self {
        Self {
            detectors,
            gate: ConfigGate::with_fallback(default),
            store,
        }
    }

    /// Runs the full pipeline for one request.
    ///
    /// `global_threshold` defaults to `0.5` when absent or `<= 0.0`.
    /// When `snapshot` is absent, the configuration gate is consulted
    /// exactly once for this request. `deadline`, when present, is
    /// observed between detector invocations and aborts the request with
    /// `Error::Cancelled` if already elapsed before a detector starts.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigUnavailable` if no snapshot was supplied and
    /// the gate's fetch fails with no fallback configured;
    /// `Error::Internal` if every active detector fails;
    /// `Error::Cancelled` if the deadline elapses mid-request;
    /// `Error::Merge` if the merger detects an invalid span (a detector
    /// bug).
    #[tracing::instrument(skip(self, text, snapshot, deadline), fields(text_len = text.len()))]
    pub fn detect(&self, text: &str, global_threshold: Option<f32>, snapshot: Option<ConfigSnapshot>, deadline: Option<Deadline>) -> Result<DetectOutcome> {
        if text.is_empty() {
            return Ok(DetectOutcome::empty());
        }

        let normalized = normalize_nfc(text);

        let threshold = global_threshold.filter(|t| *t > 0.0).unwrap_or(DEFAULT_GLOBAL_THRESHOLD);

        let snapshot = match snapshot {
            Some(s) => s,
            None => self.gate.fetch(self.store.as_ref(), &[DetectorScope::All])?,
        };

        if let Some(d) = deadline
            && d.elapsed()
        {
            return Err(Error::Cancelled);
        }

        let results: Vec<(&'static str, Result<Vec<Entity>>)> = self
            .detectors
            .par_iter()
            .map(|detector| {
                let name = detector.source().as_str();
                if let Some(d) = deadline
                    && d.elapsed()
                {
                    return (name, Err(Error::Cancelled));
                }
                (name, detector.detect(&normalized, threshold, &snapshot))
            })
            .collect();

        let mut raw = Vec::new();
        let mut failed = Vec::new();
        for (name, result) in results {
            match result {
                Ok(entities) => raw.extend(entities),
                Err(err) => {
                    tracing::error!(detector = name, error = %err, "detector failed for this request");
                    failed.push(name);
                }
            }
        }

        if !self.detectors.is_empty() && failed.len() == self.detectors.len() {
            return Err(Error::Internal {
                request_id: format!("all {} detectors failed", self.detectors.len()),
            });
        }

        let merged = merge(raw)?;
        let filtered = post_filter(merged, &snapshot, threshold, &normalized);

        let mut summary: BTreeMap<String, usize> = BTreeMap::new();
        for e in &filtered {
            *summary.entry(e.r#type.as_str().to_string()).or_insert(0) += 1;
        }

        let masked_text = mask(&normalized, &filtered);

        let conflict_stats = self.detectors.iter().map(|d| d.take_conflict_stats()).fold(ConflictStats::default(), |acc, s| acc + s);

        tracing::debug!(
            entity_count = filtered.len(),
            failed_detectors = ?failed,
            total_conflicts = conflict_stats.total_conflicts,
            "request completed"
        );

        Ok(DetectOutcome {
            entities: filtered,
            summary,
            masked_text,
            conflict_stats,
            failed_detectors: failed,
        })
    }

    /// Drops any per-request scratch state. A no-op today since this
    /// orchestrator holds no mutable request-scoped buffers between
    /// calls, but kept as an idempotent hook an external memory watchdog
    /// can call between requests.
    pub const fn reclaim(&self) {}
}

/// Post-filter: drops entities whose type is disabled or
/// whose score is below the per-type threshold (falling back to
/// `global_threshold`), then re-extracts `text` from `[start, end)` to
/// guarantee the post-condition `text == input[start..end]`.
fn post_filter(entities: Vec<Entity>, snapshot: &ConfigSnapshot, global_threshold: f32, input: &str) -> Vec<Entity> {
    entities
        .into_iter()
        .filter(|e| snapshot.is_enabled(&e.r#type))
        .filter(|e| e.score >= snapshot.effective_threshold(&e.r#type, global_threshold))
        .map(|e| e.reextracted(input))
        .collect()
}
