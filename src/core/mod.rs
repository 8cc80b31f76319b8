//! Core evaluation logic.
//!
//! This module contains:
//! - Stage 1-2: claim parsing and typing with heuristic fallback
//! - Stage 3: evidence graph construction and source typing
//! - Stage 4-6: failure-mode detection, scoring, explanation
//! - Orchestrator: sequential execution, sealing and audit

pub mod detectors;
pub mod explanation;
pub mod fallback;
pub mod graph;
pub mod lexicon;
pub mod limits;
pub mod orchestrator;
pub mod parser;
pub mod policy;
pub mod scoring;
pub mod sources;
pub mod typer;

// Re-export commonly used types
pub use detectors::FailureModeDetector;
pub use explanation::ExplanationGenerator;
pub use fallback::{within_timeout, Strategy};
pub use graph::{EvidenceGraphBuilder, GraphOutcome, GraphSettings};
pub use limits::{InputLimits, InputViolation};
pub use orchestrator::{EngineError, Orchestrator, OrchestratorBuilder, ReplayReport};
pub use parser::{ClaimExtractor, ClaimParser, HeuristicClaimExtractor, ParseOutcome, RemoteClaimExtractor};
pub use policy::{ClaimCategory, ExplanationPolicy};
pub use scoring::ScoringEngine;
pub use sources::{RemoteSourceClassifier, SourceClassifier};
pub use typer::{ClaimClassifier, ClaimTyper, HeuristicClaimClassifier, RemoteClaimClassifier, TypingOutcome};
