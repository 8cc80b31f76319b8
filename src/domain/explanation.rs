//! Output of the explanation stage.

use serde::{Deserialize, Serialize};

use super::penalty::PenaltyName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyReason {
    pub text: String,
    pub sentiment: Sentiment,
}

impl KeyReason {
    pub fn new(text: impl Into<String>, sentiment: Sentiment) -> Self {
        Self {
            text: text.into(),
            sentiment,
        }
    }
}

/// Condensed view of one of the heaviest penalties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltySummary {
    pub name: PenaltyName,
    pub weight: u32,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationOutput {
    pub final_score: u8,
    pub band_label: String,
    pub band_description: String,
    pub top_penalties: Vec<PenaltySummary>,
    pub improvement_suggestions: Vec<String>,
    pub uncertainty_statement: String,
    /// Context paragraph; never restates the verdict
    pub evidence_summary: String,
    /// Verdict paragraph
    pub explanation_text: String,
    pub key_reasons: Vec<KeyReason>,
}
