//! Process-wide immutable configuration, loaded once at boot.
//!
//! Conflict groups, the category priority table, and the pattern-matcher
//! catalogue are all compiled exactly once and shared read-only for the
//! lifetime of the process. Per-request compilation of any of these is a
//! bug the design explicitly calls out.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;

use crate::entity::TypeTag;
use crate::error::{ChunkingError, Result};

/// Relative priority of a pattern-matcher catalogue entry, used to break
/// ties when two patterns match overlapping text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    /// Lowest priority; loses to `Medium` and `High` on overlap.
    Low,
    /// Middle priority.
    Medium,
    /// Highest priority; wins any overlap regardless of score.
    High,
}

/// Named algorithmic validators applicable to a raw regex match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validator {
    /// Luhn checksum, used for credit-card candidates.
    Luhn,
}

impl Validator {
    /// Runs this validator against the verbatim matched text.
    #[must_use]
    pub fn validate(self, text: &str) -> bool {
        match self {
            Self::Luhn => luhn_valid(text),
        }
    }
}

/// Luhn checksum over the digits of `text`, ignoring non-digit characters
///. Valid iff the checksum is a multiple of 10 and at
/// least 13 digits were present.
#[must_use]
pub fn luhn_valid(text: &str) -> bool {
    let digits: Vec<u32> = text.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() < 13 {
        return false;
    }
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

/// One entry in the boot-time pattern-matcher catalogue.
///
/// `description` and `country` are inert config-data fields, not
/// behavior, carried so a real catalogue round-trips through this
/// struct without losing its human-readable metadata.
pub struct RegexPattern {
    /// Catalogue entry name, for logging.
    pub name: &'static str,
    /// The type tag this pattern detects.
    pub type_tag: TypeTag,
    /// Compiled pattern.
    pub pattern: Regex,
    /// Confidence assigned to a bare (unvalidated, or post-validation)
    /// match.
    pub base_score: f32,
    /// Tie-break priority against overlapping matches of other types.
    pub priority: Priority,
    /// Optional algorithmic validator run against the raw match text.
    pub validator: Option<Validator>,
    /// Human-readable description (config-data only).
    pub description: &'static str,
    /// ISO country code this pattern is scoped to, if any (config-data
    /// only).
    pub country: Option<&'static str>,
}

/// A named group of type tags that commonly collide on similar-looking
/// text (e.g. dotted numerics), plus the regexes that disambiguate them.
pub struct ConflictGroup {
    /// Group name, for logging.
    pub name: &'static str,
    /// If the aggregated span's text matches this, the group may own the
    /// span.
    pub group_pattern: Regex,
    /// Per-type disambiguating patterns, tried in this order.
    pub type_patterns: Vec<(TypeTag, Regex)>,
    /// If no type pattern matches, the earliest tag here present among
    /// the span's candidates wins.
    pub fallback_order: Vec<TypeTag>,
}

/// Process-wide immutable configuration assembled once at boot.
pub struct BootConfig {
    /// Conflict groups consulted by the conflict resolver's first
    /// priority-ladder step.
    pub conflict_groups: Vec<ConflictGroup>,
    /// Total order over categories, used as the conflict resolver's
    /// second priority-ladder step. Unknown categories get priority 0.
    pub category_priority: HashMap<String, u32>,
    /// The pattern-matcher's compiled catalogue.
    pub patterns: Vec<RegexPattern>,
}

impl BootConfig {
    /// Priority of `category`, or `0` if unknown.
    #[must_use]
    pub fn category_priority_of(&self, category: &str) -> u32 {
        self.category_priority.get(category).copied().unwrap_or(0)
    }

    /// Builds the default, compiled-in boot configuration. A real deployment may
    /// source the catalogue and priority table from external
    /// configuration data instead; this is the compile-time fallback.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkingError`]'s sibling merge-layer error type only in
    /// the sense that a malformed built-in regex is a programmer error —
    /// in practice this never fails for the compiled-in defaults, but the
    /// fallible signature keeps the door open for a loader that compiles
    /// an external catalogue at boot.
    pub fn load_default() -> Result<Arc<Self>> {
        Ok(Arc::new(Self {
            conflict_groups: default_conflict_groups()?,
            category_priority: default_category_priority(),
            patterns: default_pattern_catalogue()?,
        }))
    }
}

fn re(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| {
        ChunkingError::InvalidConfig {
            reason: format!("invalid boot-time regex {pattern:?}: {e}"),
        }
        .into()
    })
}

fn default_category_priority() -> HashMap<String, u32> {
    [
        ("FINANCIAL", 100),
        ("MEDICAL", 95),
        ("IDENTITY", 85),
        ("CONTACT", 80),
        ("DIGITAL", 60),
        ("IT_CREDENTIALS", 50),
        ("LEGAL_ASSET", 40),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn default_conflict_groups() -> Result<Vec<ConflictGroup>> {
    Ok(vec![
        ConflictGroup {
            name: "NUMERIC_DOTTED",
            group_pattern: re(r"^\d[\d.]*\d$")?,
            type_patterns: vec![
                (TypeTag::new("IP_ADDRESS"), re(r"^\d{1,3}(\.\d{1,3}){3}$")?),
                (TypeTag::new("AVS_NUMBER"), re(r"^756\.\d{4}\.\d{4}\.\d{2}$")?),
            ],
            fallback_order: vec![TypeTag::new("IP_ADDRESS"), TypeTag::new("AVS_NUMBER")],
        },
        ConflictGroup {
            name: "NUMERIC_DASHED",
            group_pattern: re(r"^[\d-]+$")?,
            type_patterns: vec![
                (TypeTag::new("SSN"), re(r"^\d{3}-\d{2}-\d{4}$")?),
                (TypeTag::new("NATIONAL_ID"), re(r"^\d{2}-\d{7}-\d{1}$")?),
                (TypeTag::new("PHONE_NUMBER"), re(r"^\d{3}-\d{3}-\d{4}$")?),
                (TypeTag::new("BANK_ACCOUNT_NUMBER"), re(r"^\d{4,}-\d{2,}$")?),
            ],
            fallback_order: vec![
                TypeTag::new("SSN"),
                TypeTag::new("NATIONAL_ID"),
                TypeTag::new("PHONE_NUMBER"),
                TypeTag::new("BANK_ACCOUNT_NUMBER"),
            ],
        },
        ConflictGroup {
            name: "EMAIL_LIKE",
            group_pattern: re(r"^\S+@\S+$")?,
            type_patterns: vec![(TypeTag::new("EMAIL"), re(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")?)],
            fallback_order: vec![TypeTag::new("EMAIL")],
        },
        ConflictGroup {
            name: "URL_LIKE",
            group_pattern: re(r"^[a-zA-Z][a-zA-Z0-9+.\-]*://")?,
            type_patterns: vec![(TypeTag::new("URL"), re(r"^https?://")?)],
            fallback_order: vec![TypeTag::new("URL")],
        },
    ])
}

fn default_pattern_catalogue() -> Result<Vec<RegexPattern>> {
    Ok(vec![
        RegexPattern {
            name: "email",
            type_tag: TypeTag::new("EMAIL"),
            pattern: re(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")?,
            base_score: 0.9,
            priority: Priority::High,
            validator: None,
            description: "RFC-ish email address",
            country: None,
        },
        RegexPattern {
            name: "ipv4",
            type_tag: TypeTag::new("IP_ADDRESS"),
            pattern: re(r"\b\d{1,3}(?:\.\d{1,3}){3}\b")?,
            base_score: 0.85,
            priority: Priority::Medium,
            validator: None,
            description: "dotted-quad IPv4 address",
            country: None,
        },
        RegexPattern {
            name: "credit_card",
            type_tag: TypeTag::new("CREDIT_CARD"),
            pattern: re(r"\b(?:\d[ -]?){13,19}\b")?,
            base_score: 0.75,
            priority: Priority::High,
            validator: Some(Validator::Luhn),
            description: "13-19 digit PAN, Luhn-validated",
            country: None,
        },
        RegexPattern {
            name: "ssn",
            type_tag: TypeTag::new("SSN"),
            pattern: re(r"\b\d{3}-\d{2}-\d{4}\b")?,
            base_score: 0.8,
            priority: Priority::Medium,
            validator: None,
            description: "US Social Security Number",
            country: Some("US"),
        },
        RegexPattern {
            name: "phone",
            type_tag: TypeTag::new("PHONE_NUMBER"),
            pattern: re(r"\b\d{3}-\d{3}-\d{4}\b")?,
            base_score: 0.6,
            priority: Priority::Low,
            validator: None,
            description: "dashed 10-digit phone number",
            country: None,
        },
    ])
}
