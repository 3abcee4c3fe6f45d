//! Deterministic pattern matcher adapter.
//!
//! The only detector family with no ML collaborator: it runs the
//! boot-compiled regex catalogue over the whole (unchunked) input,
//! applies each pattern's optional algorithmic validator, and resolves
//! same-text overlaps between catalogue entries by priority before
//! score.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::boot::{BootConfig, Priority, RegexPattern};
use crate::config::ConfigSnapshot;
use crate::detect::Detector;
use crate::entity::{Entity, Source};
use crate::error::Result;

/// Source of the regex catalogue a [`PatternMatcherAdapter`] runs.
///
/// Mirrors the model seam the other two detector families expose, even
/// though no ML inference happens here: it lets callers swap in a
/// narrower catalogue (tests, a partial deployment) without threading a
/// full [`BootConfig`] through.
pub trait PatternModel: Send + Sync {
    /// The compiled patterns to run, in catalogue order.
    fn patterns(&self) -> &[RegexPattern];
}

/// The default pattern source: the process-wide boot-time catalogue.
pub struct BootPatternModel {
    boot: Arc<BootConfig>,
}

impl BootPatternModel {
    /// Wraps the shared boot configuration as a pattern source.
    #[must_use]
    pub const fn new(boot: Arc<BootConfig>) -> Self {
        Self { boot }
    }
}

impl PatternModel for BootPatternModel {
    fn patterns(&self) -> &[RegexPattern] {
        &self.boot.patterns
    }
}

/// Adapter over a [`PatternModel`].
pub struct PatternMatcherAdapter {
    model: Box<dyn PatternModel>,
}

impl PatternMatcherAdapter {
    /// Builds the adapter over an injected pattern source.
    #[must_use]
    pub fn new(model: Box<dyn PatternModel>) -> Self {
        Self { model }
    }
}

impl Detector for PatternMatcherAdapter {
    fn source(&self) -> Source {
        Source::Pattern
    }

    fn detect(&self, text: &str, threshold: f32, snapshot: &ConfigSnapshot) -> Result<Vec<Entity>> {
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let mut candidates: Vec<(Entity, Priority)> = Vec::new();
        for pattern in self.model.patterns() {
            for m in pattern.pattern.find_iter(text) {
                let matched = m.as_str();
                if let Some(validator) = pattern.validator
                    && !validator.validate(matched)
                {
                    continue;
                }
                let entity = Entity::new(matched.to_string(), pattern.type_tag.clone(), m.start(), m.end(), pattern.base_score, Source::Pattern);
                candidates.push((entity, pattern.priority));
            }
        }

        let resolved = resolve_by_priority(candidates);

        Ok(resolved
            .into_iter()
            .filter(|e| snapshot.is_enabled(&e.r#type) && e.score >= snapshot.effective_threshold(&e.r#type, threshold))
            .collect())
    }
}

/// Overlap resolution ordered by `(priority desc, base_score desc)`:
/// candidates are scheduled in that order and greedily kept unless they
/// overlap an already-kept, higher-ranked match. Priority is the primary
/// key — a start-ordered sweep would let an earlier, lower-priority
/// match evict a later, overlapping, higher-priority one, which
/// contradicts "keep the one with higher priority" (spec §4.4.c).
fn resolve_by_priority(mut candidates: Vec<(Entity, Priority)>) -> Vec<Entity> {
    candidates.sort_by(|(a, ap), (b, bp)| {
        bp.cmp(ap)
            .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal))
            .then_with(|| a.start.cmp(&b.start))
    });

    let mut kept: Vec<Entity> = Vec::new();
    'candidates: for (entity, _) in candidates {
        for k in &kept {
            if entity.start < k.end && k.start < entity.end {
                continue 'candidates;
            }
        }
        kept.push(entity);
    }
    kept.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.end.cmp(&b.end)));
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DetectorScope, GlobalSettings, PerTypeConfig};
    use crate::entity::TypeTag;
    use std::collections::HashMap;

    fn permissive_snapshot() -> ConfigSnapshot {
        let mut per_type = HashMap::new();
        for tag in ["EMAIL", "IP_ADDRESS", "CREDIT_CARD", "SSN", "PHONE_NUMBER"] {
            per_type.insert(
                TypeTag::new(tag),
                PerTypeConfig {
                    enabled: true,
                    threshold: 0.0,
                    detector: DetectorScope::Pattern,
                    detector_label: tag.to_lowercase(),
                    category: "IDENTITY".to_string(),
                },
            );
        }
        ConfigSnapshot {
            global: GlobalSettings::default(),
            per_type,
        }
    }

    fn adapter() -> PatternMatcherAdapter {
        let boot = BootConfig::load_default().unwrap();
        PatternMatcherAdapter::new(Box::new(BootPatternModel::new(boot)))
    }

    #[test]
    fn detects_email_address() {
        let result = adapter().detect("Contact john.doe@example.com now", 0.5, &permissive_snapshot()).unwrap();
        assert!(result.iter().any(|e| e.r#type.as_str() == "EMAIL" && e.text == "john.doe@example.com"));
    }

    #[test]
    fn luhn_validated_card_passes_but_invalid_is_rejected() {
        let result = adapter().detect("Card 4111 1111 1111 1111 and 4111 1111 1111 1112", 0.5, &permissive_snapshot()).unwrap();
        let cards: Vec<&Entity> = result.iter().filter(|e| e.r#type.as_str() == "CREDIT_CARD").collect();
        assert_eq!(cards.len(), 1);
        assert!(cards[0].text.contains("4111 1111 1111 1111"));
    }

    #[test]
    fn empty_text_yields_no_entities() {
        let result = adapter().detect("", 0.5, &permissive_snapshot()).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn priority_resolves_overlapping_pattern_matches() {
        let email = Entity::new("a@b.co", "EMAIL", 0, 6, 0.5, Source::Pattern);
        let card = Entity::new("a@b.co", "CREDIT_CARD", 0, 6, 0.99, Source::Pattern);
        let resolved = resolve_by_priority(vec![(email, Priority::High), (card, Priority::Low)]);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].r#type.as_str(), "EMAIL");
    }

    #[test]
    fn priority_wins_over_an_earlier_lower_priority_overlap() {
        // An earlier-starting Low match must not evict a later,
        // overlapping High match: priority is the primary key, not
        // start position.
        let low = Entity::new("0123456789", "SSN", 0, 10, 0.9, Source::Pattern);
        let high = Entity::new("56789ABCDE", "CREDIT_CARD", 5, 15, 0.5, Source::Pattern);
        let resolved = resolve_by_priority(vec![(low, Priority::Low), (high, Priority::High)]);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].r#type.as_str(), "CREDIT_CARD");
    }

    #[test]
    fn equal_priority_overlap_breaks_tie_on_base_score() {
        let lower_score = Entity::new("a@b.co", "EMAIL", 0, 6, 0.5, Source::Pattern);
        let higher_score = Entity::new("a@b.co", "IP_ADDRESS", 0, 6, 0.8, Source::Pattern);
        let resolved = resolve_by_priority(vec![(lower_score, Priority::Medium), (higher_score, Priority::Medium)]);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].r#type.as_str(), "IP_ADDRESS");
    }
}
