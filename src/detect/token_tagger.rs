//! Single-label token tagger adapter.
//!
//! Wraps an external token-classification model (injected via
//! [`TokenTaggerModel`]) that emits `(start, end, label, score)` spans
//! over bounded-length windows. This adapter owns everything around that
//! model call: chunking, stitching, and three deterministic fixup passes
//! that repair the model's tendency to split multi-token entities around
//! diacritics, apostrophes, and embedded structure.

use std::sync::Arc;

use rayon::prelude::*;

use crate::chunking::{Chunk, ChunkParams, Chunker, stitch};
use crate::config::ConfigSnapshot;
use crate::detect::{Detector, dedup_by_type_span};
use crate::entity::{Entity, Source};
use crate::error::{DetectorError, Result};

/// One raw span as emitted by the underlying token-tagger model, in
/// offsets local to the window/chunk it was produced from.
#[derive(Debug, Clone)]
pub struct RawSpan {
    /// Local start offset within the chunk text.
    pub start: usize,
    /// Local end offset within the chunk text.
    pub end: usize,
    /// Raw label string as the model names it.
    pub label: String,
    /// Model confidence in `[0.0, 1.0]`.
    pub score: f32,
}

/// The injected token-classification model. Its inference runtime is an
/// external collaborator; this crate only defines the seam.
pub trait TokenTaggerModel: Send + Sync {
    /// Tags one window of text, returning spans local to `window_text`.
    ///
    /// # Errors
    ///
    /// Returns [`DetectorError`] if inference fails for this window.
    fn tag(&self, window_text: &str) -> std::result::Result<Vec<RawSpan>, DetectorError>;
}

/// A deterministic stand-in that never finds anything. Used to wire the
/// CLI and tests without a real model runtime present.
#[derive(Debug, Default)]
pub struct NullTokenTaggerModel;

impl TokenTaggerModel for NullTokenTaggerModel {
    fn tag(&self, _window_text: &str) -> std::result::Result<Vec<RawSpan>, DetectorError> {
        Ok(Vec::new())
    }
}

/// Adapter over a [`TokenTaggerModel`].
pub struct TokenTaggerAdapter {
    model: Box<dyn TokenTaggerModel>,
    chunker: Arc<dyn Chunker>,
    params: ChunkParams,
}

impl TokenTaggerAdapter {
    /// Builds the adapter over an injected model and chunker.
    #[must_use]
    pub fn new(model: Box<dyn TokenTaggerModel>, chunker: Arc<dyn Chunker>, params: ChunkParams) -> Self {
        Self { model, chunker, params }
    }
}

impl Detector for TokenTaggerAdapter {
    fn source(&self) -> Source {
        Source::MlTagger
    }

    fn detect(&self, text: &str, threshold: f32, snapshot: &ConfigSnapshot) -> Result<Vec<Entity>> {
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let chunks = self.chunker.chunk(text, self.params)?;

        // A single chunk failure aborts this detector's whole
        // contribution.
        let chunks_with_entities: Vec<(Chunk, Vec<Entity>)> = chunks
            .into_par_iter()
            .map(|chunk| -> Result<(Chunk, Vec<Entity>)> {
                let raw = self.model.tag(&chunk.text).map_err(crate::error::Error::from)?;
                let entities = raw
                    .into_iter()
                    .filter(|r| r.start < r.end && r.end <= chunk.text.len())
                    .map(|r| Entity::new(chunk.text[r.start..r.end].to_string(), r.label, r.start, r.end, r.score, Source::MlTagger))
                    .collect();
                Ok((chunk, entities))
            })
            .collect::<Result<Vec<_>>>()?;

        let stitched = stitch(chunks_with_entities);
        let fixed = expand_email_domains(text, stitched);
        let fixed = split_zipcode_city(fixed);
        let merged = merge_adjacent_same_type(text, fixed);
        let deduped = dedup_by_type_span(merged);

        Ok(deduped
            .into_iter()
            .filter(|e| snapshot.is_enabled(&e.r#type) && e.score >= snapshot.effective_threshold(&e.r#type, threshold))
            .collect())
    }
}

const EMAIL_LOOKAHEAD: usize = 50;

fn is_local_part_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '+' | '-')
}

fn is_domain_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-')
}

/// Fixup 1: email-domain expansion.
///
/// If an `EMAIL` entity has no `@`, look forward up to 50 characters for
/// one, then greedily consume the local part backward and the domain
/// forward, stripping trailing punctuation. Accepted only if the
/// candidate contains exactly one `@` and the domain contains a `.`.
fn expand_email_domains(text: &str, entities: Vec<Entity>) -> Vec<Entity> {
    entities
        .into_iter()
        .map(|e| {
            if e.r#type.as_str() != "EMAIL" || e.text.contains('@') {
                return e;
            }
            let lookahead_end = (e.end + EMAIL_LOOKAHEAD).min(text.len());
            let Some(at_rel) = text.get(e.end..lookahead_end).and_then(|s| s.find('@')) else {
                return e;
            };
            let at_pos = e.end + at_rel;

            let mut start = at_pos;
            for (idx, c) in text[..at_pos].char_indices().rev() {
                if is_local_part_char(c) {
                    start = idx;
                } else {
                    break;
                }
            }

            let mut end = at_pos + 1;
            for (idx, c) in text[at_pos + 1..].char_indices() {
                if is_domain_char(c) {
                    end = at_pos + 1 + idx + c.len_utf8();
                } else {
                    break;
                }
            }
            while end > start {
                match text[..end].chars().next_back() {
                    Some(c @ ('.' | '-')) => end -= c.len_utf8(),
                    _ => break,
                }
            }

            let candidate = &text[start..end];
            if candidate.matches('@').count() == 1
                && candidate.split('@').nth(1).is_some_and(|domain| domain.contains('.'))
            {
                Entity::new(candidate.to_string(), e.r#type.clone(), start, end, e.score, e.source)
            } else {
                e
            }
        })
        .collect()
}

/// Finds the split point for the non-comma zipcode/city case: the first
/// transition from `(alphanumerics, space, dash)` into a capitalized
/// word, once at least one digit has been seen.
fn find_zip_city_split(text: &str) -> Option<usize> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut seen_digit = false;
    for (i, &(pos, c)) in chars.iter().enumerate() {
        if c.is_ascii_digit() {
            seen_digit = true;
        }
        let preceded_by_boundary = i == 0 || matches!(chars[i - 1].1, ' ' | '-');
        if seen_digit && c.is_uppercase() && preceded_by_boundary && i > 0 {
            return Some(pos);
        }
    }
    None
}

/// Fixup 2: zipcode/city split.
fn split_zipcode_city(entities: Vec<Entity>) -> Vec<Entity> {
    entities
        .into_iter()
        .flat_map(|e| {
            if e.r#type.as_str() != "ZIPCODE" {
                return vec![e];
            }
            let split_rel = e.text.find(',').map_or_else(|| find_zip_city_split(&e.text), Some);
            let Some(rel) = split_rel else {
                return vec![e];
            };
            let (zip_raw, city_raw) = if e.text.as_bytes().get(rel) == Some(&b',') {
                (&e.text[..rel], &e.text[rel + 1..])
            } else {
                (&e.text[..rel], &e.text[rel..])
            };
            let zip_text = zip_raw.trim_end().to_string();
            let city_text = city_raw.trim_start().to_string();
            if zip_text.is_empty() || city_text.is_empty() {
                return vec![e];
            }
            let zip_start = e.start;
            let zip_end = e.start + zip_text.len();
            let city_start = e.end - city_text.len();
            let city_end = e.end;
            vec![
                Entity::new(zip_text, "ZIPCODE", zip_start, zip_end, e.score, e.source),
                Entity::new(city_text, "CITY", city_start, city_end, e.score, e.source),
            ]
        })
        .collect()
}

/// Fixup 3: adjacent-same-type merge.
///
/// Merges two consecutive entities of the same type if they are
/// strictly adjacent or separated by a single character in `{'\'', '-'}`.
fn merge_adjacent_same_type(text: &str, entities: Vec<Entity>) -> Vec<Entity> {
    let mut sorted = entities;
    sorted.sort_by_key(|e| (e.start, e.end));

    let mut merged: Vec<Entity> = Vec::new();
    for e in sorted {
        let can_merge = merged.last().is_some_and(|last: &Entity| {
            if last.r#type != e.r#type || e.start < last.end {
                return false;
            }
            let gap = e.start - last.end;
            gap == 0 || (gap == 1 && matches!(text[last.end..e.start].chars().next(), Some('\'' | '-')))
        });

        if can_merge {
            // Safe: `can_merge` only true when `merged` is non-empty.
            if let Some(last) = merged.last_mut() {
                let new_end = e.end.max(last.end);
                let new_text = text[last.start..new_end].to_string();
                let new_score = last.score.max(e.score);
                *last = Entity::new(new_text, last.r#type.clone(), last.start, new_end, new_score, last.source);
            }
        } else {
            merged.push(e);
        }
    }
    merged
}
