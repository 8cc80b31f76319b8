//! Shared builders for integration tests.

#![allow(dead_code)]

use std::collections::BTreeSet;

use verity::core::parser::annotate;
use verity::core::HeuristicClaimClassifier;
use verity::domain::{
    CandidateSource, EvidenceNode, SourceType, Stance, StanceEvaluation, TypedClaim,
};

/// Empirical, non-expert node linked to claim-1
pub fn node(url: &str, host: &str, stance: Stance) -> EvidenceNode {
    EvidenceNode {
        id: format!("ev-{}", url.len()),
        url: url.to_string(),
        hostname: host.to_string(),
        provider: String::new(),
        title: "Study findings".to_string(),
        summary: String::new(),
        published_at: None,
        source_type: SourceType::Empirical,
        is_peer_reviewed: false,
        is_institutional: false,
        reliability: 0.6,
        relevance: 0.7,
        stance,
        claim_ids: BTreeSet::from(["claim-1".to_string()]),
    }
}

/// `count` nodes on distinct hostnames with the given stance
pub fn nodes(prefix: &str, count: usize, stance: Stance) -> Vec<EvidenceNode> {
    (0..count)
        .map(|i| {
            let host = format!("{prefix}{i}.org");
            node(&format!("https://{host}/article"), &host, stance)
        })
        .collect()
}

/// Heuristically parsed and typed claim with id claim-1
pub fn typed(text: &str) -> TypedClaim {
    typed_as("claim-1", text)
}

pub fn typed_as(id: &str, text: &str) -> TypedClaim {
    HeuristicClaimClassifier::new().classify_claim(&annotate(id.to_string(), text))
}

pub fn candidate(url: &str, title: &str, stance: Stance, relevance: f64) -> CandidateSource {
    CandidateSource {
        url: url.to_string(),
        title: title.to_string(),
        summary: String::new(),
        provider: String::new(),
        published_at: None,
        reliability: 0.8,
        stance_evaluation: StanceEvaluation { stance, relevance },
    }
}
