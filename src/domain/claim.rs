//! Claim types produced by the first two stages.
//!
//! A `StructuredClaim` is the parser's view of one atomic assertion. The typer
//! wraps it in a `TypedClaim` without altering any of the parsed fields.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// When the claim is asserted to hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeframeKind {
    Past,
    Present,
    Future,
    Unspecified,
}

impl Default for TimeframeKind {
    fn default() -> Self {
        Self::Unspecified
    }
}

/// Timeframe plus the literal phrase it was derived from (e.g. "by 2050")
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeframe {
    pub kind: TimeframeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explicit: Option<String>,
}

impl Timeframe {
    pub fn new(kind: TimeframeKind) -> Self {
        Self {
            kind,
            explicit: None,
        }
    }

    pub fn with_explicit(mut self, explicit: impl Into<String>) -> Self {
        self.explicit = Some(explicit.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Geography {
    Global,
    Regional,
    National,
    Local,
    Unspecified,
}

impl Default for Geography {
    fn default() -> Self {
        Self::Unspecified
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CausalStructure {
    Causal,
    Correlational,
    Descriptive,
    Unclear,
}

impl Default for CausalStructure {
    fn default() -> Self {
        Self::Unclear
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantifier {
    Universal,
    Existential,
    Majority,
    Minority,
    Vague,
    Precise,
    None,
}

/// How strongly the claim's wording asserts itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertaintyLanguage {
    /// "will", "proves", "always"
    Definite,
    /// "likely", "probably"
    Probable,
    /// "may", "might", "could"
    Hedged,
    Neutral,
}

impl Default for CertaintyLanguage {
    fn default() -> Self {
        Self::Neutral
    }
}

/// One atomic assertion extracted from submitted content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredClaim {
    pub id: String,
    pub text: String,
    pub subject: String,
    pub predicate: String,
    #[serde(default)]
    pub timeframe: Timeframe,
    #[serde(default)]
    pub geography: Geography,
    #[serde(default)]
    pub causal_structure: CausalStructure,
    #[serde(default)]
    pub quantifiers: BTreeSet<Quantifier>,
    #[serde(default)]
    pub certainty_language: CertaintyLanguage,
    /// Literal trigger words found in the text
    #[serde(default)]
    pub certainty_markers: Vec<String>,
}

impl StructuredClaim {
    /// Claim with only text fields set; everything else unspecified
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            id: id.into(),
            subject: String::new(),
            predicate: text.clone(),
            text,
            timeframe: Timeframe::default(),
            geography: Geography::default(),
            causal_structure: CausalStructure::default(),
            quantifiers: BTreeSet::new(),
            certainty_language: CertaintyLanguage::default(),
            certainty_markers: Vec::new(),
        }
    }

    pub fn has_quantifier(&self, quantifier: Quantifier) -> bool {
        self.quantifiers.contains(&quantifier)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpistemicType {
    EmpiricalObservational,
    Predictive,
    Comparative,
    Causal,
    Normative,
}

impl EpistemicType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmpiricalObservational => "empirical_observational",
            Self::Predictive => "predictive",
            Self::Comparative => "comparative",
            Self::Causal => "causal",
            Self::Normative => "normative",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "empirical_observational" | "empirical" => Some(Self::EmpiricalObservational),
            "predictive" => Some(Self::Predictive),
            "comparative" => Some(Self::Comparative),
            "causal" => Some(Self::Causal),
            "normative" => Some(Self::Normative),
            _ => None,
        }
    }
}

/// Where a claim's typing came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypingProvenance {
    Remote,
    Heuristic,
}

/// A structured claim annotated with its epistemic type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedClaim {
    #[serde(flatten)]
    pub claim: StructuredClaim,
    pub epistemic_types: BTreeSet<EpistemicType>,
    pub primary_type: EpistemicType,
    /// Normative claims are checked for failure modes but are not truth-apt
    pub is_normative: bool,
    pub typing_confidence: f64,
    pub typing_rationale: String,
    pub typing_provenance: TypingProvenance,
}

impl TypedClaim {
    pub fn id(&self) -> &str {
        &self.claim.id
    }

    pub fn has_type(&self, epistemic_type: EpistemicType) -> bool {
        self.primary_type == epistemic_type || self.epistemic_types.contains(&epistemic_type)
    }

    /// Predictive by type or by an explicit future timeframe
    pub fn is_predictive(&self) -> bool {
        self.has_type(EpistemicType::Predictive) || self.claim.timeframe.kind == TimeframeKind::Future
    }

    pub fn is_causal(&self) -> bool {
        self.has_type(EpistemicType::Causal) || self.claim.causal_structure == CausalStructure::Causal
    }

    pub fn is_present_tense(&self) -> bool {
        self.claim.timeframe.kind == TimeframeKind::Present
    }
}
