//! Main orchestrator for analysis execution.
//!
//! Runs the six stages strictly in order, seals each output into an
//! artifact, and records one audit entry per stage. Collaborator failures are
//! absorbed inside the stages; only invalid input surfaces as an error.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::adapters::{EvidenceRetriever, LanguageModel};
use crate::domain::{
    compute_hash, AnalysisBundle, Artifact, AuditLog, ExplanationOutput, IntegrityError, Penalty,
    ScoringResult, Stage, StageRecord, StageStatus, StructuredClaim,
};

use super::detectors::FailureModeDetector;
use super::explanation::ExplanationGenerator;
use super::graph::{EvidenceGraphBuilder, GraphSettings};
use super::limits::{InputLimits, InputViolation};
use super::parser::{ClaimParser, RemoteClaimExtractor};
use super::policy::ExplanationPolicy;
use super::scoring::ScoringEngine;
use super::sources::RemoteSourceClassifier;
use super::typer::{ClaimTyper, RemoteClaimClassifier};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InputViolation),

    /// Parsing ran but its output was unusable; the audit holds the failed record
    #[error("claim parsing rejected: {violation}")]
    Rejected {
        violation: InputViolation,
        audit: AuditLog,
    },

    #[error("failed to seal artifact: {0}")]
    Artifact(#[from] serde_json::Error),

    #[error("bundle failed verification: {0}")]
    Integrity(#[from] IntegrityError),
}

/// Outcome of re-running stages 4 to 6 from a stored bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayReport {
    pub analysis_id: Uuid,
    pub penalties_match: bool,
    pub scoring_match: bool,
    pub explanation_match: bool,
    pub penalties: Vec<Penalty>,
    pub scoring: ScoringResult,
    pub explanation: ExplanationOutput,
}

impl ReplayReport {
    pub fn reproduced(&self) -> bool {
        self.penalties_match && self.scoring_match && self.explanation_match
    }
}

/// Assembles an orchestrator from collaborators and settings
pub struct OrchestratorBuilder {
    retriever: Arc<dyn EvidenceRetriever>,
    model: Option<Arc<dyn LanguageModel>>,
    settings: GraphSettings,
    limits: InputLimits,
    policy: ExplanationPolicy,
}

impl OrchestratorBuilder {
    /// Remote strategies for parsing and both typing passes
    pub fn language_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn settings(mut self, settings: GraphSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn limits(mut self, limits: InputLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn policy(mut self, policy: ExplanationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> Orchestrator {
        let timeout = self.settings.classifier_timeout;
        let mut graph_builder = EvidenceGraphBuilder::new(self.retriever, self.settings);

        let (parser, typer) = match self.model {
            Some(model) => {
                graph_builder = graph_builder
                    .with_source_classifier(Arc::new(RemoteSourceClassifier::new(model.clone())));
                (
                    ClaimParser::with_remote(
                        Arc::new(RemoteClaimExtractor::new(model.clone())),
                        timeout,
                    ),
                    ClaimTyper::with_remote(Arc::new(RemoteClaimClassifier::new(model)), timeout),
                )
            }
            None => (ClaimParser::heuristic(), ClaimTyper::heuristic()),
        };

        Orchestrator {
            parser,
            typer,
            graph_builder,
            detector: FailureModeDetector::new(),
            scoring: ScoringEngine::new(),
            explainer: ExplanationGenerator::new(self.policy),
            limits: self.limits,
        }
    }
}

/// Main analysis orchestrator
pub struct Orchestrator {
    parser: ClaimParser,
    typer: ClaimTyper,
    graph_builder: EvidenceGraphBuilder,
    detector: FailureModeDetector,
    scoring: ScoringEngine,
    explainer: ExplanationGenerator,
    limits: InputLimits,
}

impl Orchestrator {
    /// Start building an orchestrator around a retrieval collaborator
    pub fn builder(retriever: Arc<dyn EvidenceRetriever>) -> OrchestratorBuilder {
        OrchestratorBuilder {
            retriever,
            model: None,
            settings: GraphSettings::default(),
            limits: InputLimits::default(),
            policy: ExplanationPolicy::default(),
        }
    }

    /// Evaluate free text: parse it into claims, then run every later stage
    #[instrument(skip(self, text), fields(bytes = text.len()))]
    pub async fn evaluate_text(&self, text: &str, topic: &str) -> Result<AnalysisBundle, EngineError> {
        self.limits.validate_text(text)?;

        let mut run = RunState::start();
        info!(analysis_id = %run.analysis_id, "Starting analysis");

        let timer = Instant::now();
        let started_at = Utc::now();
        let parsed = self.parser.parse(text).await;
        if let Err(violation) = self.limits.validate_claims(&parsed.claims) {
            warn!(analysis_id = %run.analysis_id, %violation, "Rejected parsed claims");
            run.fail(
                Stage::ClaimParsing,
                started_at,
                timer,
                compute_hash(text.as_bytes()),
                &violation,
            );
            return Err(EngineError::Rejected {
                violation,
                audit: run.audit,
            });
        }

        let claims = Artifact::seal(Stage::ClaimParsing, parsed.claims)?;
        run.record(
            Stage::ClaimParsing,
            started_at,
            timer,
            compute_hash(text.as_bytes()),
            &claims.content_hash,
            parsed.strategy.as_str(),
        );

        self.evaluate_from(run, claims, topic).await
    }

    /// Evaluate claims that were already extracted by the caller
    #[instrument(skip(self, claims), fields(claims = claims.len()))]
    pub async fn evaluate_claims(
        &self,
        claims: Vec<StructuredClaim>,
        topic: &str,
    ) -> Result<AnalysisBundle, EngineError> {
        self.limits.validate_claims(&claims)?;

        let mut run = RunState::start();
        info!(analysis_id = %run.analysis_id, "Starting analysis from supplied claims");

        let timer = Instant::now();
        let started_at = Utc::now();
        let claims = Artifact::seal(Stage::ClaimParsing, claims)?;
        run.record(
            Stage::ClaimParsing,
            started_at,
            timer,
            claims.content_hash.clone(),
            &claims.content_hash,
            "supplied",
        );

        self.evaluate_from(run, claims, topic).await
    }

    async fn evaluate_from(
        &self,
        mut run: RunState,
        claims: Artifact<Vec<StructuredClaim>>,
        topic: &str,
    ) -> Result<AnalysisBundle, EngineError> {
        // Stage 2
        let timer = Instant::now();
        let started_at = Utc::now();
        let typing = self.typer.type_claims(&claims.payload).await;
        let typed_claims = Artifact::seal(Stage::ClaimTyping, typing.claims)?;
        run.record(
            Stage::ClaimTyping,
            started_at,
            timer,
            claims.content_hash.clone(),
            &typed_claims.content_hash,
            typing.strategy.as_str(),
        );

        // Stage 3
        let timer = Instant::now();
        let started_at = Utc::now();
        let outcome = self.graph_builder.build(&typed_claims.payload, topic).await;
        let evidence_graph = Artifact::seal(Stage::EvidenceGraph, outcome.graph)?;
        run.record(
            Stage::EvidenceGraph,
            started_at,
            timer,
            typed_claims.content_hash.clone(),
            &evidence_graph.content_hash,
            format!(
                "candidates={} failed_retrievals={} remotely_typed={}",
                outcome.candidate_count, outcome.failed_retrievals, outcome.remotely_typed
            ),
        );

        // Stage 4
        let timer = Instant::now();
        let started_at = Utc::now();
        let detected = self.detector.detect(
            &typed_claims.payload,
            &evidence_graph.payload,
            run.evaluated_at,
        );
        let penalties = Artifact::seal(Stage::FailureModes, detected)?;
        run.record(
            Stage::FailureModes,
            started_at,
            timer,
            combine(&[&typed_claims.content_hash, &evidence_graph.content_hash]),
            &penalties.content_hash,
            format!("penalties={}", penalties.payload.len()),
        );

        // Stage 5
        let timer = Instant::now();
        let started_at = Utc::now();
        let result = self.scoring.compute_score(
            &typed_claims.payload,
            &evidence_graph.payload,
            &penalties.payload,
        );
        let scoring = Artifact::seal(Stage::Scoring, result)?;
        run.record(
            Stage::Scoring,
            started_at,
            timer,
            combine(&[
                &typed_claims.content_hash,
                &evidence_graph.content_hash,
                &penalties.content_hash,
            ]),
            &scoring.content_hash,
            format!("final_score={}", scoring.payload.final_score),
        );

        // Stage 6
        let timer = Instant::now();
        let started_at = Utc::now();
        let output = self.explainer.explain(
            &scoring.payload,
            &evidence_graph.payload,
            &typed_claims.payload,
        );
        let explanation = Artifact::seal(Stage::Explanation, output)?;
        run.record(
            Stage::Explanation,
            started_at,
            timer,
            combine(&[
                &scoring.content_hash,
                &evidence_graph.content_hash,
                &typed_claims.content_hash,
            ]),
            &explanation.content_hash,
            format!("key_reasons={}", explanation.payload.key_reasons.len()),
        );

        info!(
            analysis_id = %run.analysis_id,
            final_score = scoring.payload.final_score,
            band = scoring.payload.score_band.key(),
            "Analysis completed"
        );

        Ok(AnalysisBundle {
            analysis_id: run.analysis_id,
            topic: topic.to_string(),
            evaluated_at: run.evaluated_at,
            claims,
            typed_claims,
            evidence_graph,
            penalties,
            scoring,
            explanation,
            audit: run.audit,
        })
    }

    /// Re-run stages 4 to 6 against a verified bundle and compare outputs
    #[instrument(skip(self, bundle), fields(analysis_id = %bundle.analysis_id))]
    pub fn replay(&self, bundle: &AnalysisBundle) -> Result<ReplayReport, EngineError> {
        bundle.verify()?;

        let claims = &bundle.typed_claims.payload;
        let graph = &bundle.evidence_graph.payload;

        let penalties = self.detector.detect(claims, graph, bundle.evaluated_at);
        let scoring = self.scoring.compute_score(claims, graph, &penalties);
        let explanation = self.explainer.explain(&scoring, graph, claims);

        let report = ReplayReport {
            analysis_id: bundle.analysis_id,
            penalties_match: penalties == bundle.penalties.payload,
            scoring_match: scoring == bundle.scoring.payload,
            explanation_match: explanation == bundle.explanation.payload,
            penalties,
            scoring,
            explanation,
        };

        if report.reproduced() {
            info!("Replay reproduced the stored result");
        } else {
            warn!(
                penalties = report.penalties_match,
                scoring = report.scoring_match,
                explanation = report.explanation_match,
                "Replay diverged from the stored result"
            );
        }
        Ok(report)
    }
}

/// Mutable bookkeeping for one analysis
struct RunState {
    analysis_id: Uuid,
    evaluated_at: DateTime<Utc>,
    audit: AuditLog,
}

impl RunState {
    fn start() -> Self {
        Self {
            analysis_id: Uuid::new_v4(),
            evaluated_at: Utc::now(),
            audit: AuditLog::new(),
        }
    }

    fn record(
        &mut self,
        stage: Stage,
        started_at: DateTime<Utc>,
        timer: Instant,
        input_hash: String,
        output_hash: &str,
        note: impl Into<String>,
    ) {
        let duration_ms = timer.elapsed().as_millis() as u64;
        let record = StageRecord::new(
            self.analysis_id,
            stage,
            started_at,
            input_hash,
            StageStatus::Completed,
        )
        .with_output_hash(output_hash.to_string())
        .with_duration(duration_ms)
        .with_note(note);

        info!(stage = stage.as_str(), duration_ms, "Stage completed");
        self.audit.append(record);
    }

    fn fail(
        &mut self,
        stage: Stage,
        started_at: DateTime<Utc>,
        timer: Instant,
        input_hash: String,
        error: &impl std::fmt::Display,
    ) {
        let duration_ms = timer.elapsed().as_millis() as u64;
        let record = StageRecord::new(
            self.analysis_id,
            stage,
            started_at,
            input_hash,
            StageStatus::Failed,
        )
        .with_duration(duration_ms)
        .with_error(error.to_string());

        warn!(stage = stage.as_str(), duration_ms, "Stage failed");
        self.audit.append(record);
    }
}

/// Single hash over several artifact hashes, in order
fn combine(hashes: &[&str]) -> String {
    compute_hash(hashes.join("\n").as_bytes())
}
