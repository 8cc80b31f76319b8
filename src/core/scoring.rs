//! Stage 5: penalties and evidence to a final score and band.
//!
//! Order of operations:
//! 1. raw = 100 - total penalty weight + corroboration bonus
//! 2. floor: raise to 20 when credible expert support exists
//! 3. ceiling: cap at 75 when evidence is mostly modelled or a prediction lacks empirical support
//! 4. clamp to 0..=100 and assign the band
//!
//! Safeguards see the bonus-adjusted raw score.

use crate::domain::{EvidenceGraph, Penalty, ScoreBand, ScoringResult, TypedClaim};

pub const INITIAL_SCORE: i32 = 100;
pub const FLOOR_SCORE: i32 = 20;
pub const CEILING_SCORE: i32 = 75;

/// Reliability at which a granted bonus earns its extra step
const HIGH_RELIABILITY: f64 = 0.7;

#[derive(Debug, Clone, Default)]
pub struct ScoringEngine;

impl ScoringEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn compute_score(
        &self,
        claims: &[TypedClaim],
        graph: &EvidenceGraph,
        penalties: &[Penalty],
    ) -> ScoringResult {
        let total_penalty_weight: u32 = penalties.iter().map(|p| p.weight).sum();
        let corroboration_bonus = corroboration_bonus(graph);
        let raw_score = INITIAL_SCORE - total_penalty_weight as i32 + corroboration_bonus;

        let mut score = raw_score;

        let floor_reason = floor_reason(graph);
        let floor_applied = floor_reason.is_some() && score < FLOOR_SCORE;
        if floor_applied {
            score = FLOOR_SCORE;
        }

        let ceiling_reason = ceiling_reason(claims, graph);
        let ceiling_applied = ceiling_reason.is_some() && score > CEILING_SCORE;
        if ceiling_applied {
            score = CEILING_SCORE;
        }

        let final_score = score.clamp(0, 100) as u8;
        let score_band = ScoreBand::from_score(final_score);

        ScoringResult {
            initial_score: INITIAL_SCORE,
            penalties: penalties.to_vec(),
            total_penalty_weight,
            corroboration_bonus,
            raw_score,
            floor_applied,
            floor_reason: floor_reason.filter(|_| floor_applied),
            ceiling_applied,
            ceiling_reason: ceiling_reason.filter(|_| ceiling_applied),
            final_score,
            score_band,
            score_band_label: score_band.label().to_string(),
        }
    }
}

/// Bonus for independent agreement; zero unless supporting outnumbers refuting
pub fn corroboration_bonus(graph: &EvidenceGraph) -> i32 {
    let stats = &graph.stats;
    if stats.supporting_count <= stats.refuting_count {
        return 0;
    }

    let net = stats.supporting_count - stats.refuting_count;
    let hosts = stats.unique_hostnames;
    let base = if net >= 4 && hosts >= 3 {
        15
    } else if net >= 3 && hosts >= 2 {
        10
    } else if net >= 2 && hosts >= 2 {
        5
    } else {
        0
    };

    if base > 0 && stats.average_reliability >= HIGH_RELIABILITY {
        base + 5
    } else {
        base
    }
}

fn floor_reason(graph: &EvidenceGraph) -> Option<String> {
    let supporting = || graph.supporting();

    if let Some(node) = supporting().find(|n| n.is_peer_reviewed && n.relevance > 0.5) {
        return Some(format!(
            "Relevant peer-reviewed evidence supports the claim ({}).",
            node.hostname
        ));
    }
    if let Some(node) = supporting().find(|n| n.is_institutional && n.relevance > 0.6) {
        return Some(format!(
            "Relevant institutional evidence supports the claim ({}).",
            node.hostname
        ));
    }
    None
}

fn ceiling_reason(claims: &[TypedClaim], graph: &EvidenceGraph) -> Option<String> {
    let stats = &graph.stats;
    let model_ratio = stats.model_based_ratio();
    if model_ratio > 0.5 {
        return Some(format!(
            "{}% of the evidence is model-based.",
            (model_ratio * 100.0).round() as u32
        ));
    }

    let empirical_support = graph.supporting().any(|n| n.source_type.is_empirical());
    if !empirical_support && claims.iter().any(|c| c.is_predictive()) {
        return Some("A predictive claim has no empirical supporting evidence.".to_string());
    }
    None
}
