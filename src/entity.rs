//! Entity data model.
//!
//! `Entity` is the unit of detection output: a typed, scored character
//! span over the normalized input. It is a plain record — no dict-like
//! indexing, no `get`/`keys`/`items` shim. Anything that wants to inspect
//! an entity's fields does so directly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A symbolic type tag from the active taxonomy (e.g. `EMAIL`,
/// `IP_ADDRESS`). The taxonomy is open; unrecognized tags degrade to
/// [`TypeTag::UNKNOWN`] rather than failing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeTag(pub String);

impl TypeTag {
    /// Sentinel tag for the open world of unrecognized labels.
    #[must_use]
    pub fn unknown() -> Self {
        Self("UNKNOWN".to_string())
    }

    /// Builds a tag from any string-like value, canonicalizing to
    /// uppercase (the wire `summary` map is keyed by canonical uppercase
    /// tags).
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().to_uppercase())
    }

    /// The tag's string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeTag {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TypeTag {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Which detector family produced an entity.
///
/// Used for logging and provenance only — never for precedence. The
/// merger treats entities from all sources identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    /// The single-label token tagger adapter.
    MlTagger,
    /// The multi-label span recognizer adapter.
    MlRecognizer,
    /// The deterministic pattern matcher adapter.
    Pattern,
}

impl Source {
    /// Short name used in structured log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MlTagger => "ml_tagger",
            Self::MlRecognizer => "ml_recognizer",
            Self::Pattern => "pattern",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit of detection output.
///
/// Invariant (enforced by the post-filter): `text == input[start..end]`
/// in the NFC-normalized input, for every entity that leaves the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Verbatim substring extracted from `input[start..end]`.
    pub text: String,
    /// Symbolic type tag.
    pub r#type: TypeTag,
    /// Half-open start offset (UTF-8 byte offset into the NFC-normalized
    /// input).
    pub start: usize,
    /// Half-open end offset, exclusive.
    pub end: usize,
    /// Confidence in `[0.0, 1.0]`. Comparable only within a detector
    /// family; across families it is ordinal.
    pub score: f32,
    /// Which detector produced this entity.
    pub source: Source,
}

impl Entity {
    /// Creates a new entity, panicking in debug builds if `start >= end`
    /// (this would be a producer bug; see [`crate::error::MergeError::InvalidSpan`]
    /// for the checked variant used by the merger).
    #[must_use]
    pub fn new(text: impl Into<String>, r#type: impl Into<TypeTag>, start: usize, end: usize, score: f32, source: Source) -> Self {
        debug_assert!(start < end, "entity span must be non-empty");
        Self {
            text: text.into(),
            r#type: r#type.into(),
            start,
            end,
            score,
            source,
        }
    }

    /// The half-open span as a range, for overlap arithmetic.
    #[must_use]
    pub const fn span(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }

    /// Whether this entity's span overlaps another's at all (touching
    /// endpoints do not count as overlap).
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whether this entity's span strictly contains another's.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end && self.span() != other.span()
    }

    /// Re-extracts `text` from `input`, guaranteeing the
    /// `text == input[start..end]` post-condition the post-filter requires.
    #[must_use]
    pub fn reextracted(&self, input: &str) -> Self {
        Self {
            text: input[self.start..self.end].to_string(),
            ..self.clone()
        }
    }
}

/// Wire representation of an [`Entity`]. This is intentionally a distinct type from the internal
/// `Entity`: it drops `source` (provenance is not part of the public
/// contract) and adds `type_label`, the detector-side label the
/// configuration snapshot mapped from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireEntity {
    /// Verbatim matched substring.
    pub text: String,
    /// Canonical type tag.
    pub r#type: String,
    /// The detector-side label this type tag was mapped from.
    pub type_label: String,
    /// Half-open start offset.
    pub start: i32,
    /// Half-open end offset.
    pub end: i32,
    /// Confidence score.
    pub score: f32,
}

impl WireEntity {
    /// Projects an internal [`Entity`] to its wire form.
    #[must_use]
    pub fn from_entity(entity: &Entity, type_label: &str) -> Self {
        Self {
            text: entity.text.clone(),
            r#type: entity.r#type.as_str().to_string(),
            type_label: type_label.to_string(),
            start: i32::try_from(entity.start).unwrap_or(i32::MAX),
            end: i32::try_from(entity.end).unwrap_or(i32::MAX),
            score: entity.score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_tag_canonicalizes_uppercase() {
        assert_eq!(TypeTag::new("email").as_str(), "EMAIL");
        assert_eq!(TypeTag::from("ip_address").as_str(), "IP_ADDRESS");
    }

    #[test]
    fn unknown_sentinel() {
        assert_eq!(TypeTag::unknown().as_str(), "UNKNOWN");
    }

    #[test]
    fn overlaps_detects_touching_as_no_overlap() {
        let a = Entity::new("ab", "X", 0, 2, 0.9, Source::Pattern);
        let b = Entity::new("cd", "X", 2, 4, 0.9, Source::Pattern);
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn overlaps_detects_partial_overlap() {
        let a = Entity::new("abc", "X", 0, 3, 0.9, Source::Pattern);
        let b = Entity::new("bcd", "X", 1, 4, 0.9, Source::Pattern);
        assert!(a.overlaps(&b));
    }

    #[test]
    fn contains_is_strict() {
        let outer = Entity::new("abcd", "X", 0, 4, 0.9, Source::Pattern);
        let inner = Entity::new("bc", "X", 1, 3, 0.9, Source::Pattern);
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(!outer.contains(&outer));
    }

    #[test]
    fn reextracted_matches_source_text() {
        let input = "Contact john.doe@example.com now";
        let e = Entity::new("wrong", "EMAIL", 8, 28, 0.9, Source::Pattern);
        let fixed = e.reextracted(input);
        assert_eq!(fixed.text, "john.doe@example.com");
    }

    #[test]
    fn wire_entity_projection() {
        let e = Entity::new("1.2.3.4", "IP_ADDRESS", 10, 17, 0.85, Source::MlRecognizer);
        let wire = WireEntity::from_entity(&e, "ip address");
        assert_eq!(wire.r#type, "IP_ADDRESS");
        assert_eq!(wire.type_label, "ip address");
        assert_eq!(wire.start, 10);
        assert_eq!(wire.end, 17);
    }
}
