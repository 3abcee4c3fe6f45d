//! Merger: folds the raw entity lists from every active
//! detector into one coherent, non-overlapping-per-type list.
//!
//! Three steps, in order: dedup by exact span+type+text, group by type,
//! then an independent sweep-line overlap pass per type. Overlap across
//! *different* types is left untouched here — cross-type disambiguation
//! is the Conflict Resolver's job (`crate::conflict`), which runs before
//! entities ever reach the merger for the span-recognizer family, and is
//! simply absent for types that never conflict.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::entity::{Entity, TypeTag};
use crate::error::{MergeError, Result};

/// Deduplicates, groups, and sweep-line-resolves overlaps within each
/// type tag.
///
/// # Errors
///
/// Returns [`MergeError::InvalidSpan`] if any entity has `start >= end` —
/// a producer bug upstream, never silently dropped.
pub fn merge(entities: Vec<Entity>) -> Result<Vec<Entity>> {
    for e in &entities {
        if e.start >= e.end {
            return Err(MergeError::InvalidSpan { start: e.start, end: e.end }.into());
        }
    }

    let deduped = dedup_by_span_and_type(entities);

    let mut by_type: HashMap<TypeTag, Vec<Entity>> = HashMap::new();
    for e in deduped {
        by_type.entry(e.r#type.clone()).or_default().push(e);
    }

    let mut out = Vec::new();
    for (_, group) in by_type {
        out.extend(resolve_overlaps_within_type(group));
    }
    out.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.end.cmp(&b.end)));
    Ok(out)
}

/// Step 1: collapse exact `(start, end, type, text)` duplicates, keeping
/// the highest-scoring copy. Multiple detectors
/// agreeing on the exact same span is the common case this removes.
fn dedup_by_span_and_type(entities: Vec<Entity>) -> Vec<Entity> {
    let mut best: HashMap<(usize, usize, TypeTag, String), Entity> = HashMap::new();
    for e in entities {
        let key = (e.start, e.end, e.r#type.clone(), e.text.clone());
        match best.get(&key) {
            Some(existing) if existing.score >= e.score => {}
            _ => {
                best.insert(key, e);
            }
        }
    }
    best.into_values().collect()
}

/// Steps 2-3: per-type sweep-line. Sort by `(start asc, width desc, score
/// desc)`; a wider span always wins over any span it strictly contains;
/// among equal-width spans the higher score wins, and among equal width
/// and score the earlier start wins (already the sort order).
fn resolve_overlaps_within_type(mut entities: Vec<Entity>) -> Vec<Entity> {
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


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::entity::Source;
    use proptest::prelude::*;

    /// Generates a small set of same-type entities over a bounded range,
    /// biased toward overlapping so the sweep-line actually gets
    /// exercised.
    fn arb_entities() -> impl Strategy<Value = Vec<Entity>> {
        prop::collection::vec((0usize..40, 1usize..15, 0.0f32..1.0), 0..12).prop_map(|spans| {
            spans
                .into_iter()
                .filter_map(|(start, width, score)| {
                    let end = start + width;
                    (end <= 60).then(|| Entity::new("x".repeat(width), "X", start, end, score, Source::Pattern))
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn merge_is_idempotent(entities in arb_entities()) {
            let once = merge(entities).unwrap();
            let twice = merge(once.clone()).unwrap();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn merged_same_type_entities_are_pairwise_disjoint(entities in arb_entities()) {
            let merged = merge(entities).unwrap();
            for i in 0..merged.len() {
                for j in (i + 1)..merged.len() {
                    prop_assert!(!merged[i].overlaps(&merged[j]));
                }
            }
        }

        #[test]
        fn merge_never_invents_spans(entities in arb_entities()) {
            let input_spans: std::collections::HashSet<(usize, usize)> = entities.iter().map(|e| (e.start, e.end)).collect();
            let merged = merge(entities).unwrap();
            for e in &merged {
                prop_assert!(input_spans.contains(&(e.start, e.end)));
            }
        }
    }
}
