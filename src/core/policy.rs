//! Explanation policy: the wording tables and gates used by stage 6.
//!
//! Policy revisions are data changes. A YAML file may override any section;
//! sections it omits keep their defaults.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::{
    EpistemicType, EvidenceGraph, PenaltyName, ScoreBand, SourceType, TimeframeKind, TypedClaim,
};

/// Coarse claim category used to filter irrelevant penalty reasons
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimCategory {
    /// Past-tense factual event reported mainly by news outlets
    NewsEvent,
    Prediction,
    Causal,
    Comparative,
    Normative,
    Empirical,
}

impl ClaimCategory {
    /// Category of the leading claim, refined by the evidence mix
    pub fn classify(claims: &[TypedClaim], graph: &EvidenceGraph) -> Self {
        let Some(claim) = claims.first() else {
            return Self::Empirical;
        };

        match claim.primary_type {
            EpistemicType::Normative => Self::Normative,
            EpistemicType::Predictive => Self::Prediction,
            EpistemicType::Causal => Self::Causal,
            EpistemicType::Comparative => Self::Comparative,
            EpistemicType::EmpiricalObservational => {
                let stats = &graph.stats;
                let news = stats.count_of(SourceType::NewsReport);
                let news_heavy =
                    stats.total_sources > 0 && news * 2 >= stats.total_sources;
                if claim.claim.timeframe.kind == TimeframeKind::Past && news_heavy {
                    Self::NewsEvent
                } else if claim.is_predictive() {
                    Self::Prediction
                } else {
                    Self::Empirical
                }
            }
        }
    }
}

/// Numeric gates for the verdict wording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyGates {
    /// Supporting must be at least this multiple of refuting for strong confirmation
    pub strong_support_ratio: f64,
    pub strong_support_min: usize,
    pub overwhelming_ratio: f64,
    pub overwhelming_min_total: usize,
    /// Below this many sources the evidence base is called thin
    pub few_sources: usize,
    pub model_based_share: f64,
}

impl Default for PolicyGates {
    fn default() -> Self {
        Self {
            strong_support_ratio: 3.0,
            strong_support_min: 2,
            overwhelming_ratio: 0.8,
            overwhelming_min_total: 5,
            few_sources: 3,
            model_based_share: 0.5,
        }
    }
}

/// Verdict sentences whose wording is not a plain band lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerdictPhrases {
    pub strong_confirmation: String,
    pub soft_support: String,
    /// `{rationale}` is replaced by the dominant penalty's rationale
    pub partial_with_rationale: String,
    pub unverified_strong: String,
    /// `{refuting}` and `{total}` are replaced by counts
    pub overwhelming_refutation: String,
    pub thin_evidence: String,
    pub no_evidence: String,
    /// Second sentence when nothing else follows the opening;
    /// `{sources}`, `{outlets}` and `{supporting}` are replaced by counts
    pub evidence_basis: String,
}

impl Default for VerdictPhrases {
    fn default() -> Self {
        Self {
            strong_confirmation: "Multiple independent sources confirm this claim.".to_string(),
            soft_support: "This claim holds up well overall.".to_string(),
            partial_with_rationale:
                "The evidence partly supports this claim, but with an important caveat: {rationale}"
                    .to_string(),
            unverified_strong: "This claim has not been independently verified; the support that exists comes from a narrow or non-expert set of sources.".to_string(),
            overwhelming_refutation:
                "The evidence overwhelmingly contradicts this claim: {refuting} of {total} sources with a clear stance refute it."
                    .to_string(),
            thin_evidence: "This verdict rests on very few sources and could change as more evidence appears.".to_string(),
            no_evidence: "No usable evidence was found, so this verdict reflects the claim's wording rather than confirmed facts.".to_string(),
            evidence_basis:
                "This rests on {sources} from {outlets}, {supporting} of which support the claim."
                    .to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplanationPolicy {
    /// First verdict sentence per band
    pub verdicts: BTreeMap<ScoreBand, String>,
    pub verdict_phrases: VerdictPhrases,
    /// Opening of the uncertainty statement per band
    pub confidence: BTreeMap<ScoreBand, String>,
    /// Plain-language consequence of each failure mode
    pub consequences: BTreeMap<PenaltyName, String>,
    /// What would make the claim better supported
    pub improvements: BTreeMap<PenaltyName, String>,
    pub generic_improvement: String,
    /// Penalties whose reasons are suppressed for a claim category
    pub suppressed: BTreeMap<ClaimCategory, BTreeSet<PenaltyName>>,
    pub gates: PolicyGates,
}

impl Default for ExplanationPolicy {
    fn default() -> Self {
        use PenaltyName::*;
        use ScoreBand::*;

        let verdicts = [
            (StronglySupported, "Multiple independent sources confirm this claim."),
            (Supported, "The available evidence generally supports this claim."),
            (Plausible, "The evidence partly supports this claim, with some caveats."),
            (Mixed, "The evidence on this claim is mixed, with credible sources on both sides."),
            (WeaklySupported, "This claim could not be independently verified from the available evidence."),
            (MostlyFalse, "The available evidence largely contradicts this claim."),
            (False, "The available evidence contradicts this claim."),
        ];

        let confidence = [
            (StronglySupported, "Confidence in this assessment is high."),
            (Supported, "Confidence in this assessment is fairly high."),
            (Plausible, "Confidence in this assessment is moderate."),
            (Mixed, "Confidence in this assessment is limited because the evidence is divided."),
            (WeaklySupported, "Confidence in this assessment is low."),
            (MostlyFalse, "Confidence that the claim is inaccurate is fairly high."),
            (False, "Confidence that the claim is inaccurate is high."),
        ];

        let consequences = [
            (EvidenceContradiction, "A significant share of the evidence directly contradicts the claim."),
            (TemporalMismatch, "The evidence describes a different time period than the claim does."),
            (ContextOmission, "The claim leaves out conditions that the evidence says matter."),
            (ModelDependence, "Much of the support comes from projections rather than measurements."),
            (LowExpertConsensus, "Expert sources do not clearly back the claim."),
            (CausalOverreach, "The evidence shows an association, not the cause-and-effect the claim asserts."),
            (ScopeExaggeration, "The claim generalises beyond what the underlying studies covered."),
            (ComparativeDistortion, "The comparison glosses over differences in how things were measured."),
            (RhetoricalCertainty, "The claim is worded with more certainty than the evidence allows."),
            (AmbiguousQuantifiers, "Vague quantities make the claim hard to check precisely."),
            (SelectiveCitation, "The support comes from a narrow set of outlets."),
            (OutdatedEvidence, "The most recent evidence is old and may no longer hold."),
        ];

        let improvements = [
            (EvidenceContradiction, "Address the sources that contradict the claim, or narrow the claim to what they do not dispute."),
            (TemporalMismatch, "Cite evidence from the same time period the claim is about."),
            (ContextOmission, "State the conditions, places or time periods under which the claim holds."),
            (ModelDependence, "Support the claim with observed data in addition to model projections."),
            (LowExpertConsensus, "Cite peer-reviewed research or official institutional sources."),
            (CausalOverreach, "Describe the relationship as an association unless causal evidence is available."),
            (ScopeExaggeration, "Limit the claim to the population or region the evidence actually studied."),
            (ComparativeDistortion, "Compare figures measured the same way, or note the methodological differences."),
            (RhetoricalCertainty, "Replace absolute wording such as \"always\" or \"proves\" with measured language."),
            (AmbiguousQuantifiers, "Replace vague quantities with specific figures."),
            (SelectiveCitation, "Draw on a wider range of independent sources."),
            (OutdatedEvidence, "Cite more recent evidence."),
        ];

        let suppressed = [
            (ClaimCategory::NewsEvent, BTreeSet::from([LowExpertConsensus, ModelDependence])),
            (ClaimCategory::Prediction, BTreeSet::from([OutdatedEvidence])),
        ];

        Self {
            verdicts: verdicts
                .into_iter()
                .map(|(band, text)| (band, text.to_string()))
                .collect(),
            verdict_phrases: VerdictPhrases::default(),
            confidence: confidence
                .into_iter()
                .map(|(band, text)| (band, text.to_string()))
                .collect(),
            consequences: consequences
                .into_iter()
                .map(|(name, text)| (name, text.to_string()))
                .collect(),
            improvements: improvements
                .into_iter()
                .map(|(name, text)| (name, text.to_string()))
                .collect(),
            generic_improvement:
                "Cite additional independent, recent sources that address the claim directly."
                    .to_string(),
            suppressed: suppressed.into_iter().collect(),
            gates: PolicyGates::default(),
        }
    }
}

impl ExplanationPolicy {
    /// Load a policy from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read policy file: {}", path.display()))?;

        let policy = Self::from_yaml(&content)?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse policy YAML")
    }

    /// Every band and penalty must have wording; gates must be sane
    pub fn validate(&self) -> Result<()> {
        for band in ScoreBand::ALL {
            if !self.verdicts.contains_key(&band) {
                anyhow::bail!("Policy has no verdict for band {}", band.key());
            }
            if !self.confidence.contains_key(&band) {
                anyhow::bail!("Policy has no confidence phrase for band {}", band.key());
            }
        }

        for name in PenaltyName::ALL {
            if !self.consequences.contains_key(&name) {
                anyhow::bail!("Policy has no consequence for {}", name);
            }
            if !self.improvements.contains_key(&name) {
                anyhow::bail!("Policy has no improvement for {}", name);
            }
        }

        let gates = &self.gates;
        if !(0.0..=1.0).contains(&gates.overwhelming_ratio) {
            anyhow::bail!("overwhelming_ratio must be within [0, 1]");
        }
        if !(0.0..=1.0).contains(&gates.model_based_share) {
            anyhow::bail!("model_based_share must be within [0, 1]");
        }
        if gates.strong_support_ratio < 1.0 {
            anyhow::bail!("strong_support_ratio must be at least 1");
        }

        Ok(())
    }

    pub fn verdict(&self, band: ScoreBand) -> &str {
        self.verdicts.get(&band).map(String::as_str).unwrap_or_default()
    }

    pub fn confidence(&self, band: ScoreBand) -> &str {
        self.confidence.get(&band).map(String::as_str).unwrap_or_default()
    }

    pub fn consequence(&self, name: PenaltyName) -> Option<&str> {
        self.consequences.get(&name).map(String::as_str)
    }

    pub fn improvement(&self, name: PenaltyName) -> Option<&str> {
        self.improvements.get(&name).map(String::as_str)
    }

    pub fn is_suppressed(&self, category: ClaimCategory, name: PenaltyName) -> bool {
        self.suppressed
            .get(&category)
            .is_some_and(|names| names.contains(&name))
    }
}
