//! Domain types for the evaluation engine.
//!
//! This module contains the data passed between stages:
//! - Claims: structured and typed assertions
//! - Evidence: deduplicated sources and graph statistics
//! - Penalties, scoring results and explanations
//! - Artifacts and audit records wrapping each stage's output
//! - The analysis bundle returned to callers

pub mod artifact;
pub mod audit;
pub mod bundle;
pub mod claim;
pub mod evidence;
pub mod explanation;
pub mod penalty;
pub mod scoring;

// Re-export commonly used types
pub use artifact::{compute_hash, hash_payload, Artifact, Stage, ARTIFACT_VERSION};
pub use audit::{AuditLog, StageRecord, StageStatus};
pub use bundle::{AnalysisBundle, IntegrityError};
pub use claim::{
    CausalStructure, CertaintyLanguage, EpistemicType, Geography, Quantifier, StructuredClaim,
    Timeframe, TimeframeKind, TypedClaim, TypingProvenance,
};
pub use evidence::{
    CandidateSource, EvidenceGraph, EvidenceNode, GraphStats, SourceType, Stance,
    StanceEvaluation,
};
pub use explanation::{ExplanationOutput, KeyReason, PenaltySummary, Sentiment};
pub use penalty::{by_weight, DetectionMethod, Penalty, PenaltyName, Severity};
pub use scoring::{ScoreBand, ScoringResult};
