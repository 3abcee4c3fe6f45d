//! Conflict Resolver.
//!
//! Runs after the span recognizer aggregates same-span label candidates.
//! Resolves each [`AggregatedSpan`] to a single entity via a three-step
//! priority ladder, then removes any overlap the resolution itself left
//! behind with a sweep-line pass.

use std::cmp::Ordering;

use crate::boot::BootConfig;
use crate::config::ConfigSnapshot;
use crate::detect::span_recognizer::AggregatedSpan;
use crate::entity::{Entity, Source, TypeTag};

/// Counters recorded while resolving one request's aggregated spans,
/// grouped by which rung of the priority ladder resolved each one.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictStats {
    /// Spans with more than one label candidate.
    pub total_conflicts: u32,
    /// Resolved by an in-group disambiguating pattern (step 1a).
    pub resolved_by_pattern: u32,
    /// Resolved by a group's fallback order, no pattern matched (step 1b).
    pub resolved_by_fallback: u32,
    /// Resolved by category priority (step 2).
    pub resolved_by_category: u32,
    /// Resolved by score, with a lexicographic tiebreak (step 3).
    pub resolved_by_score: u32,
}

impl std::ops::Add for ConflictStats {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            total_conflicts: self.total_conflicts + rhs.total_conflicts,
            resolved_by_pattern: self.resolved_by_pattern + rhs.resolved_by_pattern,
            resolved_by_fallback: self.resolved_by_fallback + rhs.resolved_by_fallback,
            resolved_by_category: self.resolved_by_category + rhs.resolved_by_category,
            resolved_by_score: self.resolved_by_score + rhs.resolved_by_score,
        }
    }
}

/// Resolves every aggregated span to one entity, recording ladder-step
/// statistics in `stats`.
#[must_use]
pub fn resolve_aggregated(boot: &BootConfig, snapshot: &ConfigSnapshot, text: &str, spans: Vec<AggregatedSpan>, stats: &mut ConflictStats) -> Vec<Entity> {
    spans.into_iter().map(|span| resolve_one(boot, snapshot, text, &span, stats)).collect()
}

fn resolve_one(boot: &BootConfig, snapshot: &ConfigSnapshot, text: &str, span: &AggregatedSpan, stats: &mut ConflictStats) -> Entity {
    let span_text = &text[span.start..span.end];

    if let [(label, score)] = span.candidates.as_slice() {
        return Entity::new(span_text.to_string(), label.clone(), span.start, span.end, *score, Source::MlRecognizer);
    }
    stats.total_conflicts += 1;

    if let Some((tag, score)) = resolve_by_conflict_group(boot, span_text, &span.candidates, stats) {
        return Entity::new(span_text.to_string(), tag, span.start, span.end, score, Source::MlRecognizer);
    }

    let (tag, score) = resolve_by_category_then_score(boot, snapshot, &span.candidates, stats);
    Entity::new(span_text.to_string(), tag, span.start, span.end, score, Source::MlRecognizer)
}

fn candidate_score(candidates: &[(String, f32)], tag: &TypeTag) -> Option<f32> {
    candidates.iter().find(|(l, _)| TypeTag::new(l.as_str()) == *tag).map(|(_, s)| *s)
}

/// Step 1: a boot-time conflict group whose `group_pattern` matches the
/// span text may own it, either via an in-group disambiguating pattern
/// or, failing that, its fallback order.
fn resolve_by_conflict_group(boot: &BootConfig, span_text: &str, candidates: &[(String, f32)], stats: &mut ConflictStats) -> Option<(TypeTag, f32)> {
    let group = boot.conflict_groups.iter().find(|g| {
        g.group_pattern.is_match(span_text)
            && candidates.iter().any(|(label, _)| {
                let tag = TypeTag::new(label.as_str());
                g.type_patterns.iter().any(|(t, _)| *t == tag)
            })
    })?;

    for (tag, pattern) in &group.type_patterns {
        if pattern.is_match(span_text)
            && let Some(score) = candidate_score(candidates, tag)
        {
            stats.resolved_by_pattern += 1;
            return Some((tag.clone(), score));
        }
    }
    for tag in &group.fallback_order {
        if let Some(score) = candidate_score(candidates, tag) {
            stats.resolved_by_fallback += 1;
            return Some((tag.clone(), score));
        }
    }
    None
}

/// Steps 2 and 3: category priority, then score with a lexicographic
/// type-tag tiebreak.
fn resolve_by_category_then_score(boot: &BootConfig, snapshot: &ConfigSnapshot, candidates: &[(String, f32)], stats: &mut ConflictStats) -> (TypeTag, f32) {
    let ranked: Vec<(TypeTag, f32, u32)> = candidates
        .iter()
        .map(|(label, score)| {
            let tag = TypeTag::new(label.as_str());
            let category = snapshot.per_type.get(&tag).map_or("", |cfg| cfg.category.as_str());
            let priority = boot.category_priority_of(category);
            (tag, *score, priority)
        })
        .collect();

    let max_priority = ranked.iter().map(|(_, _, p)| *p).max().unwrap_or(0);
    let top: Vec<&(TypeTag, f32, u32)> = ranked.iter().filter(|(_, _, p)| *p == max_priority).collect();

    if let [(tag, score, _)] = top.as_slice() {
        stats.resolved_by_category += 1;
        return ((*tag).clone(), *score);
    }

    stats.resolved_by_score += 1;
    let mut winner: Option<&(TypeTag, f32, u32)> = None;
    for candidate in &top {
        winner = Some(match winner {
            None => candidate,
            Some(w) if candidate.1 > w.1 || ((candidate.1 - w.1).abs() < f32::EPSILON && candidate.0 > w.0) => candidate,
            Some(w) => w,
        });
    }
    winner.map_or_else(|| (TypeTag::unknown(), 0.0), |(tag, score, _)| (tag.clone(), *score))
}

/// Post-resolution sweep-line overlap removal: sort by
/// `(start asc, width desc, score desc)` so the first span in any
/// overlapping cluster is the one that should win, then keep a span iff
/// it starts at or after the widest/highest-scoring span's end seen so
/// far.
#[must_use]
pub fn resolve_overlaps(mut entities: Vec<Entity>) -> Vec<Entity> {
    entities.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then_with(|| (b.end - b.start).cmp(&(a.end - a.start)))
            .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal))
    });

    let mut kept: Vec<Entity> = Vec::new();
    let mut max_end = 0usize;
    for e in entities {
        if kept.is_empty() || e.start >= max_end {
            max_end = e.end.max(max_end);
            kept.push(e);
        }
    }
    kept
}
