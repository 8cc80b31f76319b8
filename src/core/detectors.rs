//! Stage 4: twelve independent failure-mode checks.
//!
//! Each detector is a pure function of the typed claims, the evidence graph and
//! a reference time. A detector emits at most one penalty; claim-scoped checks
//! list every affected claim id in that single penalty.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::domain::evidence::ratio;
use crate::domain::{
    CertaintyLanguage, EpistemicType, EvidenceGraph, EvidenceNode, Geography, Penalty,
    PenaltyName, Quantifier, Severity, TimeframeKind, TypedClaim,
};

use super::lexicon::{
    has_strong_marker, CONDITIONAL_SCOPE, CORRELATIONAL_EVIDENCE, FORWARD_LOOKING, METHOD_CAVEAT,
    NARROW_SAMPLE,
};

/// Minimum relevance for a node to count in comparative checks
const RELEVANT: f64 = 0.5;

/// Everything a detector may look at
pub struct DetectionContext<'a> {
    pub claims: &'a [TypedClaim],
    pub graph: &'a EvidenceGraph,
    /// Reference time for age-based checks
    pub as_of: DateTime<Utc>,
}

impl<'a> DetectionContext<'a> {
    fn all_claim_ids(&self) -> Vec<String> {
        self.claims.iter().map(|c| c.id().to_string()).collect()
    }

    fn linked(&self, claim: &'a TypedClaim) -> Vec<&'a EvidenceNode> {
        self.graph.evidence_for(claim.id()).collect()
    }

    fn linked_supporting(&self, claim: &'a TypedClaim) -> Vec<&'a EvidenceNode> {
        self.graph
            .evidence_for(claim.id())
            .filter(|n| n.supports())
            .collect()
    }
}

type Detector = fn(&DetectionContext<'_>) -> Option<Penalty>;

/// Detectors in presentation order
const DETECTORS: [(PenaltyName, Detector); 12] = [
    (PenaltyName::EvidenceContradiction, evidence_contradiction),
    (PenaltyName::TemporalMismatch, temporal_mismatch),
    (PenaltyName::ContextOmission, context_omission),
    (PenaltyName::ModelDependence, model_dependence),
    (PenaltyName::LowExpertConsensus, low_expert_consensus),
    (PenaltyName::CausalOverreach, causal_overreach),
    (PenaltyName::ScopeExaggeration, scope_exaggeration),
    (PenaltyName::ComparativeDistortion, comparative_distortion),
    (PenaltyName::RhetoricalCertainty, rhetorical_certainty),
    (PenaltyName::AmbiguousQuantifiers, ambiguous_quantifiers),
    (PenaltyName::SelectiveCitation, selective_citation),
    (PenaltyName::OutdatedEvidence, outdated_evidence),
];

/// Runs every detector in fixed order
#[derive(Debug, Clone, Default)]
pub struct FailureModeDetector;

impl FailureModeDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn detect(
        &self,
        claims: &[TypedClaim],
        graph: &EvidenceGraph,
        as_of: DateTime<Utc>,
    ) -> Vec<Penalty> {
        let ctx = DetectionContext {
            claims,
            graph,
            as_of,
        };

        let mut penalties = Vec::new();
        for (name, detector) in DETECTORS {
            if let Some(penalty) = detector(&ctx) {
                debug_assert_eq!(penalty.name, name);
                debug!(penalty = name.as_str(), weight = penalty.weight, "Failure mode detected");
                penalties.push(penalty);
            }
        }
        penalties
    }
}

fn percent(value: f64) -> u32 {
    (value * 100.0).round() as u32
}

fn ids(claims: &[&TypedClaim]) -> Vec<String> {
    claims.iter().map(|c| c.id().to_string()).collect()
}

/// Refuting share of stanced sources.
///
/// [0.5, 0.75) carries the same maximum weight as [0.75, 1.0]; only the
/// rationale differs.
pub fn evidence_contradiction(ctx: &DetectionContext<'_>) -> Option<Penalty> {
    let stats = &ctx.graph.stats;
    let refuting = stats.refuting_count;
    let total = stats.stanced_count();
    if total < 2 {
        return None;
    }

    let refuting_ratio = ratio(refuting, total);
    let (severity, lead) = if refuting_ratio >= 0.75 {
        (Severity::High, "Most evidence contradicts the claim")
    } else if refuting_ratio >= 0.5 {
        (Severity::High, "At least half of the evidence contradicts the claim")
    } else if refuting_ratio >= 0.3 && refuting >= 2 {
        (Severity::Medium, "A substantial minority of evidence contradicts the claim")
    } else {
        return None;
    };

    Some(Penalty::new(
        PenaltyName::EvidenceContradiction,
        severity,
        format!(
            "{}: {} of {} sources with a clear stance refute it ({}%).",
            lead,
            refuting,
            total,
            percent(refuting_ratio)
        ),
        ctx.all_claim_ids(),
    ))
}

/// Predictions backed only by observation, or present claims backed only by old data
pub fn temporal_mismatch(ctx: &DetectionContext<'_>) -> Option<Penalty> {
    let observational_only: Vec<&TypedClaim> = ctx
        .claims
        .iter()
        .filter(|c| c.is_predictive())
        .filter(|c| {
            let linked = ctx.linked(c);
            !linked.is_empty()
                && linked
                    .iter()
                    .all(|n| !n.is_model_based() && !FORWARD_LOOKING.is_match(&n.text()))
        })
        .collect();

    if !observational_only.is_empty() {
        return Some(Penalty::new(
            PenaltyName::TemporalMismatch,
            Severity::Medium,
            "A forward-looking claim is supported only by past observations with no projection.",
            ids(&observational_only),
        ));
    }

    let year_ago = ctx.as_of - Duration::days(365);
    let stale: Vec<&TypedClaim> = ctx
        .claims
        .iter()
        .filter(|c| c.is_present_tense())
        .filter(|c| {
            let linked = ctx.linked(c);
            !linked.is_empty()
                && linked
                    .iter()
                    .all(|n| n.published_at.map_or(false, |d| d < year_ago))
        })
        .collect();

    if stale.is_empty() {
        return None;
    }
    Some(Penalty::new(
        PenaltyName::TemporalMismatch,
        Severity::Low,
        "A claim about the present relies entirely on evidence more than a year old.",
        ids(&stale),
    ))
}

/// Universal claims with thin support, or unscoped claims with scope-dependent evidence
pub fn context_omission(ctx: &DetectionContext<'_>) -> Option<Penalty> {
    let thin_universal: Vec<&TypedClaim> = ctx
        .claims
        .iter()
        .filter(|c| c.claim.has_quantifier(Quantifier::Universal))
        .filter(|c| ctx.linked_supporting(c).len() < 3)
        .collect();

    if !thin_universal.is_empty() {
        return Some(Penalty::new(
            PenaltyName::ContextOmission,
            Severity::Medium,
            "A universal claim rests on fewer than three supporting sources.",
            ids(&thin_universal),
        ));
    }

    let unscoped: Vec<&TypedClaim> = ctx
        .claims
        .iter()
        .filter(|c| {
            c.claim.geography == Geography::Unspecified
                || c.claim.timeframe.kind == TimeframeKind::Unspecified
        })
        .filter(|c| {
            ctx.linked(c)
                .iter()
                .any(|n| CONDITIONAL_SCOPE.is_match(&n.text()))
        })
        .collect();

    if unscoped.is_empty() {
        return None;
    }
    Some(Penalty::new(
        PenaltyName::ContextOmission,
        Severity::Low,
        "The evidence says the effect depends on conditions the claim does not state.",
        ids(&unscoped),
    ))
}

/// Evidence dominated by projections rather than measurements
pub fn model_dependence(ctx: &DetectionContext<'_>) -> Option<Penalty> {
    let stats = &ctx.graph.stats;
    let model_ratio = stats.model_based_ratio();

    let purely_modelled: Vec<&TypedClaim> = ctx
        .claims
        .iter()
        .filter(|c| c.is_predictive())
        .filter(|c| {
            let linked = ctx.linked(c);
            !linked.is_empty() && linked.iter().all(|n| n.is_model_based())
        })
        .collect();

    if model_ratio > 0.8 || !purely_modelled.is_empty() {
        let affected = if model_ratio > 0.8 {
            ctx.all_claim_ids()
        } else {
            ids(&purely_modelled)
        };
        return Some(Penalty::new(
            PenaltyName::ModelDependence,
            Severity::High,
            format!(
                "{} of {} sources are model projections ({}%); the claim depends on modelled rather than observed outcomes.",
                stats.model_based_count,
                stats.total_sources,
                percent(model_ratio)
            ),
            affected,
        ));
    }

    if model_ratio > 0.6 {
        return Some(Penalty::new(
            PenaltyName::ModelDependence,
            Severity::Medium,
            format!(
                "Most of the evidence is model-based ({}%).",
                percent(model_ratio)
            ),
            ctx.all_claim_ids(),
        ));
    }

    None
}

/// Expert sources disagree, or few expert sources exist
pub fn low_expert_consensus(ctx: &DetectionContext<'_>) -> Option<Penalty> {
    let nodes = &ctx.graph.nodes;
    let experts: Vec<&EvidenceNode> = nodes.iter().filter(|n| n.is_expert()).collect();

    if experts.iter().any(|n| n.supports()) && experts.iter().any(|n| n.refutes()) {
        return Some(Penalty::new(
            PenaltyName::LowExpertConsensus,
            Severity::High,
            "Peer-reviewed and institutional sources are split on this claim.",
            ctx.all_claim_ids(),
        ));
    }

    // A source both peer-reviewed and institutional counts twice
    let stats = &ctx.graph.stats;
    let total = nodes.len();
    let expert_ratio = ratio(stats.peer_reviewed_count + stats.institutional_count, total);
    if total >= 3 && expert_ratio < 0.2 {
        return Some(Penalty::new(
            PenaltyName::LowExpertConsensus,
            Severity::Medium,
            format!(
                "Only {} of {} sources are peer-reviewed or institutional.",
                experts.len(),
                total
            ),
            ctx.all_claim_ids(),
        ));
    }

    None
}

/// Causal wording supported by correlational findings
pub fn causal_overreach(ctx: &DetectionContext<'_>) -> Option<Penalty> {
    let overreaching: Vec<&TypedClaim> = ctx
        .claims
        .iter()
        .filter(|c| c.is_causal())
        .filter(|c| {
            let supporting = ctx.linked_supporting(c);
            let correlational = supporting
                .iter()
                .filter(|n| CORRELATIONAL_EVIDENCE.is_match(&n.text()))
                .count();
            !supporting.is_empty() && ratio(correlational, supporting.len()) >= 0.5
        })
        .collect();

    if overreaching.is_empty() {
        return None;
    }
    Some(Penalty::new(
        PenaltyName::CausalOverreach,
        Severity::Medium,
        "The claim asserts causation but its support only shows correlation.",
        ids(&overreaching),
    ))
}

/// Broad claims supported by narrow samples
pub fn scope_exaggeration(ctx: &DetectionContext<'_>) -> Option<Penalty> {
    let exaggerated: Vec<&TypedClaim> = ctx
        .claims
        .iter()
        .filter(|c| {
            c.claim.geography == Geography::Global
                || c.claim.has_quantifier(Quantifier::Universal)
                || c.claim.has_quantifier(Quantifier::Majority)
        })
        .filter(|c| {
            let supporting = ctx.linked_supporting(c);
            let narrow = supporting
                .iter()
                .filter(|n| NARROW_SAMPLE.is_match(&n.text()))
                .count();
            !supporting.is_empty() && ratio(narrow, supporting.len()) >= 0.6
        })
        .collect();

    if exaggerated.is_empty() {
        return None;
    }
    Some(Penalty::new(
        PenaltyName::ScopeExaggeration,
        Severity::Medium,
        "A broad claim is generalised from studies of a narrow sample or region.",
        ids(&exaggerated),
    ))
}

pub fn comparative_distortion(ctx: &DetectionContext<'_>) -> Option<Penalty> {
    let distorted: Vec<&TypedClaim> = ctx
        .claims
        .iter()
        .filter(|c| c.has_type(EpistemicType::Comparative))
        .filter(|c| {
            ctx.linked(c)
                .iter()
                .any(|n| n.relevance >= RELEVANT && METHOD_CAVEAT.is_match(&n.text()))
        })
        .collect();

    if distorted.is_empty() {
        return None;
    }
    Some(Penalty::new(
        PenaltyName::ComparativeDistortion,
        Severity::Low,
        "The comparison ignores methodological differences noted in the evidence.",
        ids(&distorted),
    ))
}

pub fn rhetorical_certainty(ctx: &DetectionContext<'_>) -> Option<Penalty> {
    let emphatic: Vec<&TypedClaim> = ctx
        .claims
        .iter()
        .filter(|c| {
            c.claim.certainty_language == CertaintyLanguage::Definite
                && has_strong_marker(&c.claim.certainty_markers)
        })
        .collect();

    if emphatic.is_empty() {
        return None;
    }
    let mut markers: Vec<String> = emphatic
        .iter()
        .flat_map(|c| c.claim.certainty_markers.iter().map(|m| m.to_lowercase()))
        .collect();
    markers.sort();
    markers.dedup();
    Some(Penalty::new(
        PenaltyName::RhetoricalCertainty,
        Severity::Low,
        format!(
            "The claim uses absolute language ({}) that the evidence cannot guarantee.",
            markers.join(", ")
        ),
        ids(&emphatic),
    ))
}

pub fn ambiguous_quantifiers(ctx: &DetectionContext<'_>) -> Option<Penalty> {
    let vague: Vec<&TypedClaim> = ctx
        .claims
        .iter()
        .filter(|c| c.claim.has_quantifier(Quantifier::Vague))
        .collect();

    if vague.is_empty() {
        return None;
    }
    Some(Penalty::new(
        PenaltyName::AmbiguousQuantifiers,
        Severity::Low,
        "Vague quantities make the claim hard to verify precisely.",
        ids(&vague),
    ))
}

/// One dominant outlet, or one-sided support from too few outlets.
///
/// Three or more independent supporting hostnames count as corroboration.
pub fn selective_citation(ctx: &DetectionContext<'_>) -> Option<Penalty> {
    let stats = &ctx.graph.stats;

    if stats.single_source_dominance {
        let host = stats.dominant_hostname.as_deref().unwrap_or("one outlet");
        let count = stats.hostname_distribution.get(host).copied().unwrap_or(0);
        return Some(Penalty::new(
            PenaltyName::SelectiveCitation,
            Severity::Medium,
            format!(
                "{} of {} sources come from {}.",
                count, stats.total_sources, host
            ),
            ctx.all_claim_ids(),
        ));
    }

    let supporting_hosts = ctx.graph.supporting_hostnames().len();
    if stats.supporting_count > 0
        && stats.refuting_count == 0
        && stats.supporting_count == stats.total_sources
        && supporting_hosts < 3
    {
        return Some(Penalty::new(
            PenaltyName::SelectiveCitation,
            Severity::Low,
            format!(
                "All evidence supports the claim but comes from only {} outlet(s).",
                supporting_hosts
            ),
            ctx.all_claim_ids(),
        ));
    }

    None
}

pub fn outdated_evidence(ctx: &DetectionContext<'_>) -> Option<Penalty> {
    let newest = ctx.graph.stats.newest_evidence?;
    let age = ctx.as_of - newest;

    let severity = if age > Duration::days(5 * 365) {
        Severity::High
    } else if age > Duration::days(2 * 365) {
        Severity::Medium
    } else {
        let present: Vec<&TypedClaim> =
            ctx.claims.iter().filter(|c| c.is_present_tense()).collect();
        if present.is_empty() || age <= Duration::days(183) {
            return None;
        }
        return Some(Penalty::new(
            PenaltyName::OutdatedEvidence,
            Severity::Low,
            format!(
                "The newest evidence is {} months old for a claim about the present.",
                age.num_days() / 30
            ),
            ids(&present),
        ));
    };

    Some(Penalty::new(
        PenaltyName::OutdatedEvidence,
        severity,
        format!(
            "The newest evidence was published on {}, {} years before this evaluation.",
            newest.format("%Y-%m-%d"),
            age.num_days() / 365
        ),
        ctx.all_claim_ids(),
    ))
}
