//! End-to-end integration tests over the public `Orchestrator::detect`
//! entry point, covering concrete detection and conflict-resolution
//! scenarios: email and IP-address detection and masking, priority-based
//! disambiguation between numeric-dotted formats, Luhn-based credit card
//! validation, adjacent person-name fragment merging, and determinism
//! and configuration-filtering guarantees.

#![allow(clippy::expect_used)]

use std::collections::HashMap;
use std::sync::Arc;

use pii_sentinel_core::{
    BootConfig, ChunkParams, ConfigSnapshot, DetectorScope, Entity, GlobalSettings, InMemoryConfigStore, Orchestrator, PatternMatcherAdapter, PerTypeConfig, SemanticChunker,
    SpanRecognizerAdapter, TokenTaggerAdapter, TypeTag,
};
use pii_sentinel_core::detect::pattern::BootPatternModel;
use pii_sentinel_core::detect::span_recognizer::NullSpanRecognizerModel;
use pii_sentinel_core::detect::token_tagger::NullTokenTaggerModel;

fn permissive_snapshot(boot: &BootConfig) -> ConfigSnapshot {
    let mut per_type = HashMap::new();
    for pattern in &boot.patterns {
        per_type.insert(
            pattern.type_tag.clone(),
            PerTypeConfig {
                enabled: true,
                threshold: 0.5,
                detector: DetectorScope::All,
                detector_label: pattern.type_tag.as_str().to_lowercase(),
                category: "CONTACT".to_string(),
            },
        );
    }
    ConfigSnapshot {
        global: GlobalSettings::default(),
        per_type,
    }
}

fn pattern_only_orchestrator() -> Orchestrator {
    let boot = BootConfig::load_default().expect("boot config compiles");
    let pattern = PatternMatcherAdapter::new(Box::new(BootPatternModel::new(Arc::clone(&boot))));
    let store = Arc::new(InMemoryConfigStore::new(permissive_snapshot(&boot)));
    Orchestrator::new(vec![Box::new(pattern)], store)
}

fn full_orchestrator() -> Orchestrator {
    let boot = BootConfig::load_default().expect("boot config compiles");
    let chunker: Arc<dyn pii_sentinel_core::Chunker> = Arc::new(SemanticChunker::new());
    let params = ChunkParams::typical();
    let token_tagger = TokenTaggerAdapter::new(Box::new(NullTokenTaggerModel), Arc::clone(&chunker), params);
    let span_recognizer = SpanRecognizerAdapter::new(Box::new(NullSpanRecognizerModel), chunker, params, Arc::clone(&boot));
    let pattern = PatternMatcherAdapter::new(Box::new(BootPatternModel::new(Arc::clone(&boot))));
    let store = Arc::new(InMemoryConfigStore::new(permissive_snapshot(&boot)));
    Orchestrator::new(vec![Box::new(token_tagger), Box::new(span_recognizer), Box::new(pattern)], store)
}

#[test]
fn scenario_1_email_detected_and_masked() {
    let orch = pattern_only_orchestrator();
    let outcome = orch.detect("Contact john.doe@example.com now", None, None, None).expect("detect succeeds");

    assert_eq!(outcome.entities.len(), 1);
    let e = &outcome.entities[0];
    assert_eq!(e.r#type, TypeTag::new("EMAIL"));
    assert_eq!(e.start, 8);
    assert_eq!(e.end, 28);
    assert_eq!(e.text, "john.doe@example.com");
    assert_eq!(outcome.masked_text, "Contact [EMAIL] now");
}

#[test]
fn scenario_2_ip_address_detected() {
    let orch = pattern_only_orchestrator();
    let outcome = orch.detect("Server at 192.168.1.1", None, None, None).expect("detect succeeds");

    assert_eq!(outcome.entities.len(), 1);
    let e = &outcome.entities[0];
    assert_eq!(e.r#type, TypeTag::new("IP_ADDRESS"));
    assert_eq!(e.start, 10);
    assert_eq!(e.end, 21);
}

#[test]
fn scenario_2_conflict_resolver_picks_ip_address_over_avs_number() {
    use pii_sentinel_core::detect::span_recognizer::AggregatedSpan;

    let boot = BootConfig::load_default().expect("boot config compiles");
    let snapshot = ConfigSnapshot::default();
    let mut stats = pii_sentinel_core::conflict::ConflictStats::default();
    let span = AggregatedSpan {
        start: 0,
        end: 11,
        candidates: vec![("IP_ADDRESS".to_string(), 0.85), ("AVS_NUMBER".to_string(), 0.80)],
    };
    let resolved = pii_sentinel_core::conflict::resolve_aggregated(&boot, &snapshot, "192.168.1.1", vec![span], &mut stats);
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].r#type.as_str(), "IP_ADDRESS");
}

#[test]
fn scenario_3_avs_number_pattern_resolution_differs_on_content() {
    use pii_sentinel_core::detect::span_recognizer::AggregatedSpan;

    let boot = BootConfig::load_default().expect("boot config compiles");
    let snapshot = ConfigSnapshot::default();
    let mut stats = pii_sentinel_core::conflict::ConflictStats::default();
    let span = AggregatedSpan {
        start: 5,
        end: 21,
        candidates: vec![("IP_ADDRESS".to_string(), 0.75), ("AVS_NUMBER".to_string(), 0.90)],
    };
    let resolved = pii_sentinel_core::conflict::resolve_aggregated(&boot, &snapshot, "AVS: 756.1234.5678.90", vec![span], &mut stats);
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].r#type.as_str(), "AVS_NUMBER");
}

#[test]
fn scenario_4_luhn_rejects_tampered_card() {
    let orch = pattern_only_orchestrator();
    let outcome = orch
        .detect("Credit card 4111 1111 1111 1111 invalid 4111 1111 1111 1112", None, None, None)
        .expect("detect succeeds");

    let cards: Vec<&Entity> = outcome.entities.iter().filter(|e| e.r#type.as_str() == "CREDIT_CARD").collect();
    assert_eq!(cards.len(), 1);
    assert!(cards[0].text.contains("4111 1111 1111 1111"));
}

#[test]
fn scenario_5_adjacent_person_name_fragments_merge() {
    use pii_sentinel_core::Entity as E;
    use pii_sentinel_core::entity::Source;

    let text = "John Doe";
    let a = E::new("John", "PERSON_NAME", 0, 4, 0.7, Source::MlTagger);
    let b = E::new("Doe", "PERSON_NAME", 5, 8, 0.9, Source::MlTagger);
    let merged = pii_sentinel_core::merge::merge(vec![a, b]).expect("merge succeeds");
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].text, "John Doe");
    assert_eq!(merged[0].start, 0);
    assert_eq!(merged[0].end, 8);
}

#[test]
fn empty_input_yields_empty_output_with_no_errors() {
    let orch = pattern_only_orchestrator();
    let outcome = orch.detect("", None, None, None).expect("detect succeeds");
    assert!(outcome.entities.is_empty());
    assert!(outcome.masked_text.is_empty());
    assert!(outcome.summary.is_empty());
}

#[test]
fn adding_a_null_detector_does_not_change_output() {
    let baseline = pattern_only_orchestrator().detect("Contact john.doe@example.com now", None, None, None).expect("detect succeeds");
    let with_nulls = full_orchestrator().detect("Contact john.doe@example.com now", None, None, None).expect("detect succeeds");
    assert_eq!(baseline.entities, with_nulls.entities);
    assert_eq!(baseline.masked_text, with_nulls.masked_text);
}

#[test]
fn determinism_across_repeated_calls() {
    let orch = full_orchestrator();
    let text = "Email me at a@b.com or call 555-123-4567, SSN 123-45-6789.";
    let first = orch.detect(text, None, None, None).expect("detect succeeds");
    let second = orch.detect(text, None, None, None).expect("detect succeeds");
    assert_eq!(first.entities, second.entities);
    assert_eq!(first.masked_text, second.masked_text);
}

#[test]
fn disabling_a_type_in_the_snapshot_filters_it_from_output() {
    let boot = BootConfig::load_default().expect("boot config compiles");
    let pattern = PatternMatcherAdapter::new(Box::new(BootPatternModel::new(Arc::clone(&boot))));
    let mut snapshot = permissive_snapshot(&boot);
    snapshot.per_type.get_mut(&TypeTag::new("EMAIL")).expect("email configured").enabled = false;
    let store = Arc::new(InMemoryConfigStore::new(snapshot));
    let orch = Orchestrator::new(vec![Box::new(pattern)], store);

    let outcome = orch.detect("Contact john.doe@example.com now", None, None, None).expect("detect succeeds");
    assert!(outcome.entities.iter().all(|e| e.r#type.as_str() != "EMAIL"));
}

#[test]
fn two_detectors_agreeing_on_the_same_span_yield_a_single_higher_scored_entity() {
    use pii_sentinel_core::entity::Source;

    let a = Entity::new("a@b.com", "EMAIL", 0, 7, 0.6, Source::Pattern);
    let b = Entity::new("a@b.com", "EMAIL", 0, 7, 0.95, Source::MlRecognizer);
    let merged = pii_sentinel_core::merge::merge(vec![a, b]).expect("merge succeeds");
    assert_eq!(merged.len(), 1);
    assert!((merged[0].score - 0.95).abs() < f32::EPSILON);
}
