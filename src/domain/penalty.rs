//! Named, weighted score deductions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The twelve failure modes, in detection order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyName {
    EvidenceContradiction,
    TemporalMismatch,
    ContextOmission,
    ModelDependence,
    LowExpertConsensus,
    CausalOverreach,
    ScopeExaggeration,
    ComparativeDistortion,
    RhetoricalCertainty,
    AmbiguousQuantifiers,
    SelectiveCitation,
    OutdatedEvidence,
}

impl PenaltyName {
    pub const ALL: [PenaltyName; 12] = [
        Self::EvidenceContradiction,
        Self::TemporalMismatch,
        Self::ContextOmission,
        Self::ModelDependence,
        Self::LowExpertConsensus,
        Self::CausalOverreach,
        Self::ScopeExaggeration,
        Self::ComparativeDistortion,
        Self::RhetoricalCertainty,
        Self::AmbiguousQuantifiers,
        Self::SelectiveCitation,
        Self::OutdatedEvidence,
    ];

    /// Inclusive `(min, max)` weight range
    pub fn weight_range(&self) -> (u32, u32) {
        match self {
            Self::EvidenceContradiction => (30, 70),
            Self::TemporalMismatch => (5, 20),
            Self::ContextOmission => (5, 15),
            Self::ModelDependence => (10, 30),
            Self::LowExpertConsensus => (10, 30),
            Self::CausalOverreach => (10, 25),
            Self::ScopeExaggeration => (10, 25),
            Self::ComparativeDistortion => (5, 15),
            Self::RhetoricalCertainty => (5, 15),
            Self::AmbiguousQuantifiers => (5, 10),
            Self::SelectiveCitation => (10, 25),
            Self::OutdatedEvidence => (5, 20),
        }
    }

    /// Weight for a severity: low = min, high = max, medium = rounded midpoint
    pub fn weight_for(&self, severity: Severity) -> u32 {
        let (min, max) = self.weight_range();
        match severity {
            Severity::Low => min,
            Severity::Medium => (min + max + 1) / 2,
            Severity::High => max,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EvidenceContradiction => "evidence_contradiction",
            Self::TemporalMismatch => "temporal_mismatch",
            Self::ContextOmission => "context_omission",
            Self::ModelDependence => "model_dependence",
            Self::LowExpertConsensus => "low_expert_consensus",
            Self::CausalOverreach => "causal_overreach",
            Self::ScopeExaggeration => "scope_exaggeration",
            Self::ComparativeDistortion => "comparative_distortion",
            Self::RhetoricalCertainty => "rhetorical_certainty",
            Self::AmbiguousQuantifiers => "ambiguous_quantifiers",
            Self::SelectiveCitation => "selective_citation",
            Self::OutdatedEvidence => "outdated_evidence",
        }
    }

    /// Human label, e.g. "Evidence contradiction"
    pub fn label(&self) -> String {
        let text = self.as_str().replace('_', " ");
        let mut chars = text.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => text,
        }
    }
}

impl fmt::Display for PenaltyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    RuleBased,
    LlmAssisted,
}

/// A single deduction with its rationale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Penalty {
    pub name: PenaltyName,
    pub weight: u32,
    pub severity: Severity,
    pub rationale: String,
    pub affected_claim_ids: Vec<String>,
    pub detection_method: DetectionMethod,
}

impl Penalty {
    /// Rule-based penalty whose weight follows from its severity
    pub fn new(
        name: PenaltyName,
        severity: Severity,
        rationale: impl Into<String>,
        affected_claim_ids: Vec<String>,
    ) -> Self {
        Self {
            name,
            weight: name.weight_for(severity),
            severity,
            rationale: rationale.into(),
            affected_claim_ids,
            detection_method: DetectionMethod::RuleBased,
        }
    }

    /// Whether the weight lies inside its name's range
    pub fn weight_in_range(&self) -> bool {
        let (min, max) = self.name.weight_range();
        (min..=max).contains(&self.weight)
    }
}

/// Penalties ordered by weight, heaviest first; ties keep detection order
pub fn by_weight(penalties: &[Penalty]) -> Vec<&Penalty> {
    let mut sorted: Vec<&Penalty> = penalties.iter().collect();
    sorted.sort_by(|a, b| b.weight.cmp(&a.weight));
    sorted
}
