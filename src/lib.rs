//! verity - Deterministic epistemic evaluation engine
//!
//! Turns a natural-language claim plus retrieved evidence into an auditable
//! 0-100 confidence score, a ledger of named penalties, and an explanation
//! whose wording never contradicts the score.
//!
//! # Architecture
//!
//! Six stages run strictly in order, each sealing its output as a
//! content-hashed artifact:
//! - Claim parsing and claim typing (remote classifier with heuristic fallback)
//! - Evidence graph construction (bounded-concurrency retrieval, URL dedup)
//! - Failure-mode detection, scoring, explanation (pure functions)
//!
//! # Modules
//!
//! - `adapters`: External collaborators (language model, evidence retrieval)
//! - `core`: The stages, the explanation policy, and the orchestrator
//! - `domain`: Data structures (claims, evidence, penalties, artifacts, audit)
//! - `config`: Layered configuration
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Evaluate a claim offline against a fixture
//! verity evaluate --text "Sea levels will rise by 2090." --evidence fixture.json --offline
//!
//! # Re-check a stored analysis
//! verity verify bundle.json
//! verity replay bundle.json
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use crate::core::{EngineError, ExplanationPolicy, Orchestrator, ReplayReport};
pub use domain::{
    AnalysisBundle, EvidenceGraph, ExplanationOutput, Penalty, PenaltyName, ScoreBand,
    ScoringResult, StructuredClaim, TypedClaim,
};
