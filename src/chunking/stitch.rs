//! Stitching: remaps per-chunk local entity offsets back to global
//! offsets and drops duplicates introduced by overlapping chunks.

use std::collections::HashSet;

use crate::chunking::traits::Chunk;
use crate::entity::Entity;

/// Remaps each `(chunk, entities)` pair's local offsets to global
/// offsets and deduplicates by `(global_start, global_end, type)`.
///
/// Order of the input pairs is irrelevant: the dedup key, not collection
/// order, is what makes overlap-region duplicates disappear.
#[must_use]
pub fn stitch(chunks_with_entities: Vec<(Chunk, Vec<Entity>)>) -> Vec<Entity> {
    let mut seen: HashSet<(usize, usize, String)> = HashSet::new();
    let mut out = Vec::new();

    for (chunk, entities) in chunks_with_entities {
        for local in entities {
            let global_start = local.start + chunk.start;
            let global_end = local.end + chunk.start;
            let key = (global_start, global_end, local.r#type.as_str().to_string());
            if seen.insert(key) {
                out.push(Entity {
                    start: global_start,
                    end: global_end,
                    ..local
                });
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Source;

    #[test]
    fn remaps_local_offsets_to_global() {
        let chunk = Chunk::new("xx john.doe@example.com".to_string(), 100, 123);
        let local_entity = Entity::new("john.doe@example.com", "EMAIL", 3, 23, 0.9, Source::Pattern);
        let stitched = stitch(vec![(chunk, vec![local_entity])]);
        assert_eq!(stitched.len(), 1);
        assert_eq!(stitched[0].start, 103);
        assert_eq!(stitched[0].end, 123);
    }

    #[test]
    fn dedups_entities_detected_twice_in_overlap_region() {
        let chunk_a = Chunk::new("aaa EMAIL".to_string(), 0, 9);
        let chunk_b = Chunk::new("EMAIL bbb".to_string(), 4, 13);
        let e_a = Entity::new("EMAIL", "EMAIL", 4, 9, 0.8, Source::MlTagger);
        let e_b = Entity::new("EMAIL", "EMAIL", 0, 5, 0.95, Source::MlTagger);
        let stitched = stitch(vec![(chunk_a, vec![e_a]), (chunk_b, vec![e_b])]);
        assert_eq!(stitched.len(), 1);
    }
}
