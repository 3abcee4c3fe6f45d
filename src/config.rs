//! Per-request configuration snapshot.
//!
//! `PerTypeConfig` and `ConfigSnapshot` model the external configuration
//! store's shape from the core's point of view. The store itself is an
//! external collaborator; this module only defines what a
//! snapshot looks like and the [`ConfigGate`] that fetches one, once, at
//! the start of a request.

use std::collections::HashMap;

use crate::entity::TypeTag;
use crate::error::{ConfigError, Result};

/// Which detector family a [`PerTypeConfig`] is scoped to, or `All` for
/// every detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectorScope {
    /// The single-label token tagger.
    MlTagger,
    /// The multi-label span recognizer.
    MlRecognizer,
    /// The deterministic pattern matcher.
    Pattern,
    /// Every detector family.
    All,
}

impl DetectorScope {
    /// Whether this scope includes `other`, where `other` is never `All`
    /// (a concrete per-type config never declares itself scoped to `All`
    /// *and* something else — `All` already subsumes every concrete
    /// scope).
    #[must_use]
    pub const fn includes(self, other: Self) -> bool {
        matches!(self, Self::All) || matches!((self, other), (
            Self::MlTagger, Self::MlTagger) | (Self::MlRecognizer, Self::MlRecognizer) | (Self::Pattern, Self::Pattern))
    }
}

/// Configuration for a single type tag, valid for the duration of one
/// request.
#[derive(Debug, Clone)]
pub struct PerTypeConfig {
    /// If `false`, no entity of this type may appear in the output.
    pub enabled: bool,
    /// Entities scoring below this are dropped by the post-filter.
    pub threshold: f32,
    /// Which detector's active label set this type belongs to.
    pub detector: DetectorScope,
    /// The producer-side label that maps to this type tag (e.g. the span
    /// recognizer's natural-language label `"email address"`).
    pub detector_label: String,
    /// Coarse group used by the conflict resolver's category-priority
    /// fallback (e.g. `IDENTITY`, `FINANCIAL`, `CONTACT`).
    pub category: String,
}

/// Knobs that apply across all types for a request, sourced from the same
/// configuration fetch as `per_type`.
#[derive(Debug, Clone)]
pub struct GlobalSettings {
    /// Threshold used when a type has no per-type entry, and the
    /// orchestrator's own default when the caller supplies none.
    pub default_threshold: f32,
    /// Maximum number of labels per span-recognizer execution pass,
    /// typical 35.
    pub batch_label_limit: usize,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            default_threshold: 0.5,
            batch_label_limit: 35,
        }
    }
}

/// An immutable, per-request snapshot of configuration, produced once by
/// the [`ConfigGate`] and owned exclusively by the orchestrator for the
/// lifetime of a single request.
///
/// Detector adapters receive an `&ConfigSnapshot`; they must never cache
/// it past the call that handed it to them.
#[derive(Debug, Clone, Default)]
pub struct ConfigSnapshot {
    /// Cross-type settings for this request.
    pub global: GlobalSettings,
    /// Per-type configuration, keyed by canonical type tag.
    pub per_type: HashMap<TypeTag, PerTypeConfig>,
}

impl ConfigSnapshot {
    /// The effective threshold for `tag`: its own configured threshold if
    /// present, else the request's resolved `global_threshold`.
    #[must_use]
    pub fn effective_threshold(&self, tag: &TypeTag, global_threshold: f32) -> f32 {
        self.per_type.get(tag).map_or(global_threshold, |c| c.threshold)
    }

    /// Whether `tag` is enabled. A type tag absent from `per_type` is
    /// treated as enabled (the snapshot only ever *restricts* via an
    /// explicit `enabled = false`).
    #[must_use]
    pub fn is_enabled(&self, tag: &TypeTag) -> bool {
        self.per_type.get(tag).is_none_or(|c| c.enabled)
    }

    /// All type tags whose `detector` scope is included in `scope` and
    /// which are enabled, sorted deterministically by tag.
    #[must_use]
    pub fn active_tags_for(&self, scope: DetectorScope) -> Vec<TypeTag> {
        let mut tags: Vec<TypeTag> = self
            .per_type
            .iter()
            .filter(|(_, cfg)| cfg.enabled && scope.includes(cfg.detector))
            .map(|(tag, _)| tag.clone())
            .collect();
        tags.sort();
        tags
    }
}

/// Opaque backing store for configuration. The core requires
/// read-through semantics: one read per request, no cache inside the
/// core. Implementations live under [`crate::storage`].
pub trait ConfigStore: Send + Sync {
    /// Fetches the current configuration for the given detector scopes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the store is unreachable or the payload
    /// cannot be decoded.
    fn fetch(&self, scopes: &[DetectorScope]) -> Result<ConfigSnapshot, ConfigError>;
}

/// Fetches a fresh [`ConfigSnapshot`] at the start of every request.
/// Never caches between requests — "no stale caches" is the defining
/// property of this component.
pub struct ConfigGate {
    fallback: Option<ConfigSnapshot>,
}

impl ConfigGate {
    /// A gate that surfaces `ConfigError` as `Error::ConfigUnavailable`
    /// on any store failure.
    #[must_use]
    pub const fn strict() -> Self {
        Self { fallback: None }
    }

    /// A gate that falls back to `default` (logged at `warn`) instead of
    /// failing the request when the store is unreachable.
    #[must_use]
    pub const fn with_fallback(default: ConfigSnapshot) -> Self {
        Self {
            fallback: Some(default),
        }
    }

    /// Fetches exactly once, for every scope the orchestrator needs in
    /// this request.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigUnavailable` when the store fails and no
    /// fallback was configured.
    pub fn fetch(&self, store: &dyn ConfigStore, scopes: &[DetectorScope]) -> Result<ConfigSnapshot> {
        match store.fetch(scopes) {
            Ok(snapshot) => Ok(snapshot),
            Err(err) => {
                if let Some(fallback) = &self.fallback {
                    tracing::warn!(error = %err, "config store unreachable, using compile-time fallback");
                    Ok(fallback.clone())
                } else {
                    Err(err.into())
                }
            }
        }
    }
}
