//! Failure-Mode Detector Integration Tests
//!
//! Thresholds, idempotence and weight resolution for the twelve detectors.

mod common;

use chrono::{DateTime, Duration, Utc};
use common::{node, nodes, typed, typed_as};
use verity::core::FailureModeDetector;
use verity::domain::{EvidenceGraph, Penalty, PenaltyName, Severity, SourceType, Stance};

fn as_of() -> DateTime<Utc> {
    "2025-03-01T00:00:00Z".parse().unwrap()
}

fn find(penalties: &[Penalty], name: PenaltyName) -> Option<&Penalty> {
    penalties.iter().find(|p| p.name == name)
}

fn detect(claims: &[verity::TypedClaim], graph: &EvidenceGraph) -> Vec<Penalty> {
    FailureModeDetector::new().detect(claims, graph, as_of())
}

#[test]
fn test_contradiction_weight_for_heavy_refutation() {
    let claims = vec![typed("Coffee improves memory.")];
    let mut all = nodes("r", 9, Stance::Refutes);
    all.extend(nodes("s", 2, Stance::Supports));

    let penalties = detect(&claims, &EvidenceGraph::new(all));
    let penalty = find(&penalties, PenaltyName::EvidenceContradiction).unwrap();
    assert_eq!(penalty.weight, 70);
    assert_eq!(penalty.severity, Severity::High);
    assert!(penalty.rationale.contains("9 of 11"));
}

#[test]
fn test_contradiction_half_band_keeps_maximum_weight() {
    let claims = vec![typed("Coffee improves memory.")];
    let mut all = nodes("r", 6, Stance::Refutes);
    all.extend(nodes("s", 4, Stance::Supports));

    let penalties = detect(&claims, &EvidenceGraph::new(all));
    let penalty = find(&penalties, PenaltyName::EvidenceContradiction).unwrap();
    assert_eq!(penalty.weight, 70);
}

#[test]
fn test_detection_is_idempotent() {
    let claims = vec![
        typed_as("claim-1", "Most cities will definitely flood by 2090."),
        typed_as("claim-2", "Smoking causes many lung cancers."),
    ];
    let mut all = nodes("s", 3, Stance::Supports);
    all.extend(nodes("r", 2, Stance::Refutes));
    all[0].source_type = SourceType::ModelBased;
    all[1].summary = "Smoking is associated with cancer in one region".to_string();
    all[2].published_at = Some(as_of() - Duration::days(900));
    all[3].claim_ids.insert("claim-2".to_string());
    let graph = EvidenceGraph::new(all);

    let first = detect(&claims, &graph);
    let second = detect(&claims, &graph);
    assert!(!first.is_empty());
    assert_eq!(first, second);

    for penalty in &first {
        assert!(penalty.weight_in_range(), "{} out of range", penalty.name);
        assert_eq!(penalty.weight, penalty.name.weight_for(penalty.severity));
    }

    // presentation order follows the fixed detector order
    let positions: Vec<usize> = first
        .iter()
        .map(|p| PenaltyName::ALL.iter().position(|n| *n == p.name).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_three_supporting_hosts_are_corroboration() {
    let claims = vec![typed("Coffee improves memory.")];

    let corroborated = detect(&claims, &EvidenceGraph::new(nodes("s", 3, Stance::Supports)));
    assert!(find(&corroborated, PenaltyName::SelectiveCitation).is_none());

    let narrow = detect(&claims, &EvidenceGraph::new(nodes("s", 2, Stance::Supports)));
    let penalty = find(&narrow, PenaltyName::SelectiveCitation).unwrap();
    assert_eq!(penalty.severity, Severity::Low);
}

#[test]
fn test_single_source_dominance_is_medium() {
    let claims = vec![typed("Coffee improves memory.")];
    let graph = EvidenceGraph::new(vec![
        node("https://blog.com/1", "blog.com", Stance::Supports),
        node("https://blog.com/2", "blog.com", Stance::Supports),
        node("https://blog.com/3", "blog.com", Stance::Refutes),
        node("https://other.com/1", "other.com", Stance::Supports),
    ]);
    assert!(graph.stats.single_source_dominance);

    let penalties = detect(&claims, &graph);
    let penalty = find(&penalties, PenaltyName::SelectiveCitation).unwrap();
    assert_eq!(penalty.severity, Severity::Medium);
    assert!(penalty.rationale.contains("blog.com"));
}

#[test]
fn test_prediction_backed_by_observation() {
    let claims = vec![typed("Sea levels will rise by 2090.")];
    let graph = EvidenceGraph::new(nodes("obs", 3, Stance::Supports));

    let penalties = detect(&claims, &graph);
    let penalty = find(&penalties, PenaltyName::TemporalMismatch).unwrap();
    assert_eq!(penalty.severity, Severity::Medium);
    assert_eq!(penalty.affected_claim_ids, vec!["claim-1".to_string()]);
}

#[test]
fn test_causal_claim_with_correlational_support() {
    let claims = vec![typed("Smoking causes lung cancer.")];
    let mut all = nodes("s", 3, Stance::Supports);
    for n in all.iter_mut().take(2) {
        n.summary = "Smoking is associated with higher cancer rates".to_string();
    }

    let penalties = detect(&claims, &EvidenceGraph::new(all));
    let penalty = find(&penalties, PenaltyName::CausalOverreach).unwrap();
    assert_eq!(penalty.severity, Severity::Medium);
}

#[test]
fn test_universal_claim_from_narrow_sample() {
    let claims = vec![typed("All children benefit from tutoring.")];
    let mut all = nodes("s", 2, Stance::Supports);
    for n in all.iter_mut() {
        n.summary = "A small study of 40 participants".to_string();
    }

    let penalties = detect(&claims, &EvidenceGraph::new(all));
    assert!(find(&penalties, PenaltyName::ScopeExaggeration).is_some());
    let omission = find(&penalties, PenaltyName::ContextOmission).unwrap();
    assert_eq!(omission.severity, Severity::Medium);
}

#[test]
fn test_expert_split_is_high() {
    let claims = vec![typed("Coffee improves memory.")];
    let mut all = nodes("s", 2, Stance::Supports);
    all.extend(nodes("r", 2, Stance::Refutes));
    all[0].is_peer_reviewed = true;
    all[2].is_institutional = true;

    let penalties = detect(&claims, &EvidenceGraph::new(all));
    let penalty = find(&penalties, PenaltyName::LowExpertConsensus).unwrap();
    assert_eq!(penalty.severity, Severity::High);
}

#[test]
fn test_outdated_evidence_uses_reference_time() {
    let claims = vec![typed("Coffee improves memory.")];
    let mut all = nodes("s", 3, Stance::Supports);
    for n in all.iter_mut() {
        n.published_at = Some(as_of() - Duration::days(3 * 365));
    }
    let graph = EvidenceGraph::new(all);

    let penalties = detect(&claims, &graph);
    let penalty = find(&penalties, PenaltyName::OutdatedEvidence).unwrap();
    assert_eq!(penalty.severity, Severity::Medium);

    // the same graph evaluated at publication time is current
    let fresh = FailureModeDetector::new().detect(
        &claims,
        &graph,
        as_of() - Duration::days(3 * 365),
    );
    assert!(find(&fresh, PenaltyName::OutdatedEvidence).is_none());
}

#[test]
fn test_present_claim_with_half_year_old_evidence() {
    let claims = vec![typed("Unemployment is currently rising.")];
    assert!(claims[0].is_present_tense());

    let mut all = nodes("s", 3, Stance::Supports);
    for n in all.iter_mut() {
        n.published_at = Some(as_of() - Duration::days(250));
    }

    let penalties = detect(&claims, &EvidenceGraph::new(all));
    let penalty = find(&penalties, PenaltyName::OutdatedEvidence).unwrap();
    assert_eq!(penalty.severity, Severity::Low);
}

#[test]
fn test_wording_detectors_need_no_evidence() {
    let claims = vec![typed("Vaccines will definitely prevent many diseases.")];
    let penalties = detect(&claims, &EvidenceGraph::default());

    assert!(find(&penalties, PenaltyName::RhetoricalCertainty).is_some());
    assert!(find(&penalties, PenaltyName::AmbiguousQuantifiers).is_some());
    assert!(find(&penalties, PenaltyName::EvidenceContradiction).is_none());
    assert!(find(&penalties, PenaltyName::OutdatedEvidence).is_none());
}

#[test]
fn test_comparison_across_incompatible_measures() {
    let claims = vec![typed("Finland has better schools than Norway.")];
    let mut all = nodes("s", 3, Stance::Supports);
    all[0].summary = "Figures are not directly comparable between the two systems".to_string();

    let penalties = detect(&claims, &EvidenceGraph::new(all.clone()));
    let penalty = find(&penalties, PenaltyName::ComparativeDistortion).unwrap();
    assert_eq!(penalty.severity, Severity::Low);
    assert_eq!(penalty.affected_claim_ids, vec!["claim-1".to_string()]);

    // a caveat in a marginal source does not count
    all[0].relevance = 0.3;
    let penalties = detect(&claims, &EvidenceGraph::new(all));
    assert!(find(&penalties, PenaltyName::ComparativeDistortion).is_none());
}

#[test]
fn test_unscoped_claim_with_conditional_evidence() {
    let claims = vec![typed("Coffee improves memory.")];
    let mut all = nodes("s", 3, Stance::Supports);
    all[1].summary = "The benefit depends on dose and time of day".to_string();

    let penalties = detect(&claims, &EvidenceGraph::new(all));
    let penalty = find(&penalties, PenaltyName::ContextOmission).unwrap();
    assert_eq!(penalty.severity, Severity::Low);
}

#[test]
fn test_few_expert_sources_is_medium() {
    let claims = vec![typed("Coffee improves memory.")];
    let penalties = detect(&claims, &EvidenceGraph::new(nodes("s", 5, Stance::Supports)));

    let penalty = find(&penalties, PenaltyName::LowExpertConsensus).unwrap();
    assert_eq!(penalty.severity, Severity::Medium);
    assert!(penalty.rationale.contains("0 of 5"));
}

#[test]
fn test_expert_share_counts_both_designations() {
    let claims = vec![typed("Coffee improves memory.")];
    let mut all = nodes("s", 6, Stance::Supports);
    all[0].is_peer_reviewed = true;
    all[0].is_institutional = true;

    // one expert node in six, counted once per designation: 2 / 6
    let penalties = detect(&claims, &EvidenceGraph::new(all));
    assert!(find(&penalties, PenaltyName::LowExpertConsensus).is_none());
}

#[test]
fn test_present_claim_with_year_old_evidence() {
    let claims = vec![typed("Unemployment is currently rising.")];
    let mut all = nodes("s", 3, Stance::Supports);
    for n in all.iter_mut() {
        n.published_at = Some(as_of() - Duration::days(400));
    }

    let penalties = detect(&claims, &EvidenceGraph::new(all));
    let penalty = find(&penalties, PenaltyName::TemporalMismatch).unwrap();
    assert_eq!(penalty.severity, Severity::Low);
    assert_eq!(penalty.affected_claim_ids, vec!["claim-1".to_string()]);
}
