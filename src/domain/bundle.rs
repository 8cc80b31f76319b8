//! The complete result of one analysis.
//!
//! A bundle carries every stage artifact plus the audit log. It is the only
//! thing the engine hands back to its caller, and it can be re-verified or
//! replayed later without access to any collaborator.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::artifact::{Artifact, Stage};
use super::audit::AuditLog;
use super::claim::{StructuredClaim, TypedClaim};
use super::evidence::EvidenceGraph;
use super::explanation::ExplanationOutput;
use super::penalty::Penalty;
use super::scoring::{ScoreBand, ScoringResult};

/// A bundle that no longer matches its own hashes or projections
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("content hash mismatch in {0} artifact")]
    HashMismatch(Stage),

    #[error("evidence graph statistics do not match its nodes")]
    StatsMismatch,

    #[error("evidence graph contains duplicate URLs")]
    DuplicateUrl,

    #[error("score {score} does not fall in band {band}")]
    BandMismatch { score: u8, band: String },

    #[error("audit log has {found} records, expected {expected}")]
    IncompleteAudit { found: usize, expected: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisBundle {
    pub analysis_id: Uuid,
    pub topic: String,
    /// Reference time used by age-based checks
    pub evaluated_at: DateTime<Utc>,
    pub claims: Artifact<Vec<StructuredClaim>>,
    pub typed_claims: Artifact<Vec<TypedClaim>>,
    pub evidence_graph: Artifact<EvidenceGraph>,
    pub penalties: Artifact<Vec<Penalty>>,
    pub scoring: Artifact<ScoringResult>,
    pub explanation: Artifact<ExplanationOutput>,
    pub audit: AuditLog,
}

impl AnalysisBundle {
    pub fn final_score(&self) -> u8 {
        self.scoring.payload.final_score
    }

    pub fn band(&self) -> ScoreBand {
        self.scoring.payload.score_band
    }

    /// Check every artifact hash and the invariants that span artifacts
    pub fn verify(&self) -> Result<(), IntegrityError> {
        let sealed = [
            (Stage::ClaimParsing, self.claims.verify()),
            (Stage::ClaimTyping, self.typed_claims.verify()),
            (Stage::EvidenceGraph, self.evidence_graph.verify()),
            (Stage::FailureModes, self.penalties.verify()),
            (Stage::Scoring, self.scoring.verify()),
            (Stage::Explanation, self.explanation.verify()),
        ];
        if let Some((stage, _)) = sealed.iter().find(|(_, ok)| !ok) {
            return Err(IntegrityError::HashMismatch(*stage));
        }

        let graph = &self.evidence_graph.payload;
        if !graph.stats_consistent() {
            return Err(IntegrityError::StatsMismatch);
        }
        if !graph.urls_unique() {
            return Err(IntegrityError::DuplicateUrl);
        }

        let scoring = &self.scoring.payload;
        if ScoreBand::from_score(scoring.final_score) != scoring.score_band {
            return Err(IntegrityError::BandMismatch {
                score: scoring.final_score,
                band: scoring.score_band.key().to_string(),
            });
        }

        if self.audit.len() != Stage::ALL.len() {
            return Err(IntegrityError::IncompleteAudit {
                found: self.audit.len(),
                expected: Stage::ALL.len(),
            });
        }

        Ok(())
    }

    /// Load a bundle from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read bundle: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse bundle: {}", path.display()))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize bundle")
    }
}
