//! Masking: renders the final entity list over the
//! normalized input as a bracketed-type-placeholder string.

use crate::entity::Entity;

/// Above this input size, masking is skipped entirely and
/// [`PLACEHOLDER_TEXT`] is returned instead.
pub const MASK_SIZE_THRESHOLD: usize = 5_000_000;

/// Returned in place of a real masked rendering when `text` exceeds
/// [`MASK_SIZE_THRESHOLD`].
pub const PLACEHOLDER_TEXT: &str = "[MASKING_SKIPPED: INPUT_TOO_LARGE]";

/// Renders `text` with every entity's substring replaced by
/// `[TYPE_TAG]`.
///
/// Entities must already be sorted and non-overlapping within a type
/// (the merger's postcondition); overlap across entities at this stage
/// indicates a merger bug, so the masker stays robust to it by skipping
/// any entity whose `start` precedes the cursor rather than panicking or
/// producing corrupted output.
#[must_use]
pub fn mask(text: &str, entities: &[Entity]) -> String {
    if text.len() > MASK_SIZE_THRESHOLD {
        return PLACEHOLDER_TEXT.to_string();
    }

    let mut sorted: Vec<&Entity> = entities.iter().collect();
    sorted.sort_by_key(|e| e.start);

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0usize;
    for e in sorted {
        if e.start < cursor {
            continue;
        }
        let end = e.end.min(text.len());
        if end <= e.start {
            continue;
        }
        out.push_str(&text[cursor..e.start]);
        out.push('[');
        out.push_str(e.r#type.as_str());
        out.push(']');
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Source;

    #[test]
    fn masks_single_entity() {
        let text = "Contact john.doe@example.com now";
        let e = Entity::new("john.doe@example.com", "EMAIL", 8, 28, 0.9, Source::Pattern);
        assert_eq!(mask(text, &[e]), "Contact [EMAIL] now");
    }

    #[test]
    fn masks_multiple_non_overlapping_entities() {
        let text = "a@b.com and 1.2.3.4";
        let email = Entity::new("a@b.com", "EMAIL", 0, 7, 0.9, Source::Pattern);
        let ip = Entity::new("1.2.3.4", "IP_ADDRESS", 12, 19, 0.9, Source::Pattern);
        assert_eq!(mask(text, &[email, ip]), "[EMAIL] and [IP_ADDRESS]");
    }

    #[test]
    fn no_entities_returns_text_unchanged() {
        assert_eq!(mask("plain text", &[]), "plain text");
    }

    #[test]
    fn overlapping_entity_is_skipped_defensively() {
        let text = "abcdef";
        let first = Entity::new("abcd", "X", 0, 4, 0.9, Source::Pattern);
        let overlapping = Entity::new("bc", "Y", 1, 3, 0.9, Source::Pattern);
        let masked = mask(text, &[first, overlapping]);
        assert_eq!(masked, "[X]ef");
    }

    #[test]
    fn idempotent_on_already_masked_output() {
        let text = "Contact john.doe@example.com now";
        let e = Entity::new("john.doe@example.com", "EMAIL", 8, 28, 0.9, Source::Pattern);
        let once = mask(text, &[e]);
        let twice = mask(&once, &[]);
        assert_eq!(once, twice);
    }

    #[test]
    fn oversized_input_returns_placeholder() {
        let text = "x".repeat(MASK_SIZE_THRESHOLD + 1);
        assert_eq!(mask(&text, &[]), PLACEHOLDER_TEXT);
    }
}
