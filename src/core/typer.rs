//! Stage 2: structured claims to typed claims.
//!
//! Classification goes through a `ClaimClassifier`. The remote classifier
//! answers in JSON keyed by claim id and is validated strictly; on any error,
//! timeout or schema mismatch the whole batch is typed by the heuristic
//! classifier instead. Output order and identity always match the input.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::adapters::{extract_json, CompletionRequest, LanguageModel};
use crate::domain::{EpistemicType, StructuredClaim, TimeframeKind, TypedClaim, TypingProvenance};

use super::fallback::{within_timeout, Strategy};
use super::lexicon;

/// Confidence stamped on every heuristic classification
pub const HEURISTIC_CONFIDENCE: f64 = 0.5;

/// A claim typing strategy
#[async_trait]
pub trait ClaimClassifier: Send + Sync {
    fn name(&self) -> &str;

    /// One typed claim per input claim, same order
    async fn classify(&self, claims: &[StructuredClaim]) -> Result<Vec<TypedClaim>>;
}

/// Regex-family classifier; needs no network
#[derive(Debug, Clone, Default)]
pub struct HeuristicClaimClassifier;

impl HeuristicClaimClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify_claim(&self, claim: &StructuredClaim) -> TypedClaim {
        let text = &claim.text;
        let mut types = BTreeSet::new();
        let mut reasons = Vec::new();

        if lexicon::NORMATIVE.is_match(text) {
            types.insert(EpistemicType::Normative);
            reasons.push("normative marker");
        }
        if claim.timeframe.kind == TimeframeKind::Future || lexicon::FUTURE.is_match(text) {
            types.insert(EpistemicType::Predictive);
            reasons.push("future timeframe or forecast verb");
        }
        if lexicon::CAUSAL.is_match(text) {
            types.insert(EpistemicType::Causal);
            reasons.push("causal verb");
        }
        if lexicon::COMPARATIVE.is_match(text) {
            types.insert(EpistemicType::Comparative);
            reasons.push("comparison marker");
        }

        // Precedence mirrors the order the families are checked in
        let primary_type = [
            EpistemicType::Normative,
            EpistemicType::Predictive,
            EpistemicType::Causal,
            EpistemicType::Comparative,
        ]
        .into_iter()
        .find(|t| types.contains(t))
        .unwrap_or(EpistemicType::EmpiricalObservational);

        if types.is_empty() {
            types.insert(EpistemicType::EmpiricalObservational);
            reasons.push("no other marker; treated as observational");
        }

        TypedClaim {
            claim: claim.clone(),
            is_normative: types.contains(&EpistemicType::Normative),
            epistemic_types: types,
            primary_type,
            typing_confidence: HEURISTIC_CONFIDENCE,
            typing_rationale: format!("Heuristic: {}", reasons.join(", ")),
            typing_provenance: TypingProvenance::Heuristic,
        }
    }
}

#[async_trait]
impl ClaimClassifier for HeuristicClaimClassifier {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn classify(&self, claims: &[StructuredClaim]) -> Result<Vec<TypedClaim>> {
        Ok(claims.iter().map(|c| self.classify_claim(c)).collect())
    }
}

#[derive(Debug, Deserialize)]
struct RemoteTypings {
    classifications: Vec<RemoteTyping>,
}

#[derive(Debug, Deserialize)]
struct RemoteTyping {
    claim_id: String,
    types: Vec<String>,
    primary_type: String,
    #[serde(default)]
    is_normative: Option<bool>,
    confidence: f64,
    #[serde(default)]
    rationale: String,
}

const TYPING_INSTRUCTIONS: &str = "You classify factual claims by epistemic type. \
Allowed types: empirical_observational, predictive, comparative, causal, normative. \
Respond with JSON only: {\"classifications\": [{\"claim_id\", \"types\": [..], \
\"primary_type\", \"is_normative\", \"confidence\": 0..1, \"rationale\"}]} \
with exactly one entry per input claim id.";

/// Classifier delegated to the language model
pub struct RemoteClaimClassifier {
    model: Arc<dyn LanguageModel>,
}

impl RemoteClaimClassifier {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl ClaimClassifier for RemoteClaimClassifier {
    fn name(&self) -> &str {
        "remote"
    }

    async fn classify(&self, claims: &[StructuredClaim]) -> Result<Vec<TypedClaim>> {
        let batch: Vec<serde_json::Value> = claims
            .iter()
            .map(|c| serde_json::json!({ "claim_id": c.id, "text": c.text }))
            .collect();
        let user = serde_json::to_string(&batch).context("Failed to encode claim batch")?;

        let raw = self
            .model
            .complete(&CompletionRequest::new(TYPING_INSTRUCTIONS, user))
            .await?;
        apply_remote_typings(claims, &raw)
    }
}

/// Validate the model's answer against the input batch
fn apply_remote_typings(claims: &[StructuredClaim], raw: &str) -> Result<Vec<TypedClaim>> {
    let json = extract_json(raw).context("Typing answer contained no JSON")?;
    let parsed: RemoteTypings =
        serde_json::from_str(json).context("Typing answer did not match schema")?;

    let mut by_id: HashMap<String, RemoteTyping> = HashMap::new();
    for typing in parsed.classifications {
        if by_id.contains_key(&typing.claim_id) {
            anyhow::bail!("Duplicate classification for {}", typing.claim_id);
        }
        by_id.insert(typing.claim_id.clone(), typing);
    }

    if by_id.len() != claims.len() {
        anyhow::bail!(
            "Expected {} classifications, got {}",
            claims.len(),
            by_id.len()
        );
    }

    claims
        .iter()
        .map(|claim| {
            let typing = by_id
                .remove(&claim.id)
                .with_context(|| format!("No classification for {}", claim.id))?;

            let types = typing
                .types
                .iter()
                .map(|t| EpistemicType::parse(t).with_context(|| format!("Unknown type '{}'", t)))
                .collect::<Result<BTreeSet<_>>>()?;
            let primary_type = EpistemicType::parse(&typing.primary_type)
                .with_context(|| format!("Unknown primary type '{}'", typing.primary_type))?;

            if !types.contains(&primary_type) {
                anyhow::bail!("Primary type for {} is not among its types", claim.id);
            }
            if !(0.0..=1.0).contains(&typing.confidence) {
                anyhow::bail!("Confidence for {} out of range", claim.id);
            }

            let is_normative = typing
                .is_normative
                .unwrap_or_else(|| types.contains(&EpistemicType::Normative));

            Ok(TypedClaim {
                claim: claim.clone(),
                epistemic_types: types,
                primary_type,
                is_normative,
                typing_confidence: typing.confidence,
                typing_rationale: typing.rationale,
                typing_provenance: TypingProvenance::Remote,
            })
        })
        .collect()
}

/// Result of stage 2
#[derive(Debug, Clone)]
pub struct TypingOutcome {
    pub claims: Vec<TypedClaim>,
    pub strategy: Strategy,
}

/// Stage 2 driver
pub struct ClaimTyper {
    remote: Option<Arc<dyn ClaimClassifier>>,
    heuristic: HeuristicClaimClassifier,
    timeout: Duration,
}

impl ClaimTyper {
    pub fn heuristic() -> Self {
        Self {
            remote: None,
            heuristic: HeuristicClaimClassifier::new(),
            timeout: Duration::from_secs(0),
        }
    }

    pub fn with_remote(remote: Arc<dyn ClaimClassifier>, timeout: Duration) -> Self {
        Self {
            remote: Some(remote),
            heuristic: HeuristicClaimClassifier::new(),
            timeout,
        }
    }

    #[instrument(skip(self, claims), fields(claims = claims.len()))]
    pub async fn type_claims(&self, claims: &[StructuredClaim]) -> TypingOutcome {
        if let Some(ref remote) = self.remote {
            let answer = within_timeout(remote.name(), self.timeout, remote.classify(claims)).await;
            if let Some(typed) = answer.filter(|typed| preserves_identity(claims, typed)) {
                debug!("Claims typed remotely");
                return TypingOutcome {
                    claims: typed,
                    strategy: Strategy::Remote,
                };
            }
        }

        debug!("Claims typed heuristically");
        TypingOutcome {
            claims: claims.iter().map(|c| self.heuristic.classify_claim(c)).collect(),
            strategy: Strategy::Heuristic,
        }
    }
}

fn preserves_identity(claims: &[StructuredClaim], typed: &[TypedClaim]) -> bool {
    claims.len() == typed.len() && claims.iter().zip(typed).all(|(c, t)| c == &t.claim)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim(id: &str, text: &str) -> StructuredClaim {
        StructuredClaim::new(id, text)
    }

    #[test]
    fn test_heuristic_families() {
        let classifier = HeuristicClaimClassifier::new();

        let normative = classifier.classify_claim(&claim("c1", "Governments should ban plastic bags"));
        assert_eq!(normative.primary_type, EpistemicType::Normative);
        assert!(normative.is_normative);

        let predictive = classifier.classify_claim(&claim("c2", "Oil demand will peak soon"));
        assert_eq!(predictive.primary_type, EpistemicType::Predictive);

        let causal = classifier.classify_claim(&claim("c3", "Smoking causes lung cancer"));
        assert_eq!(causal.primary_type, EpistemicType::Causal);

        let comparative = classifier.classify_claim(&claim("c4", "Trains are safer than cars"));
        assert_eq!(comparative.primary_type, EpistemicType::Comparative);

        let empirical = classifier.classify_claim(&claim("c5", "The museum opened in spring"));
        assert_eq!(empirical.primary_type, EpistemicType::EmpiricalObservational);
        assert_eq!(empirical.typing_confidence, HEURISTIC_CONFIDENCE);
        assert_eq!(empirical.typing_provenance, TypingProvenance::Heuristic);
    }

    #[test]
    fn test_multiple_types_recorded() {
        let typed = HeuristicClaimClassifier::new()
            .classify_claim(&claim("c1", "Tariffs will cause higher prices than last year"));
        assert_eq!(typed.primary_type, EpistemicType::Predictive);
        assert!(typed.epistemic_types.contains(&EpistemicType::Causal));
        assert!(typed.epistemic_types.contains(&EpistemicType::Comparative));
    }

    #[test]
    fn test_remote_answer_applied_in_input_order() {
        let claims = vec![claim("c1", "A"), claim("c2", "B")];
        let raw = r#"{"classifications": [
            {"claim_id": "c2", "types": ["causal"], "primary_type": "causal", "confidence": 0.8},
            {"claim_id": "c1", "types": ["predictive", "causal"], "primary_type": "predictive", "confidence": 0.9, "rationale": "forecast"}
        ]}"#;
        let typed = apply_remote_typings(&claims, raw).unwrap();
        assert_eq!(typed[0].id(), "c1");
        assert_eq!(typed[0].primary_type, EpistemicType::Predictive);
        assert_eq!(typed[1].id(), "c2");
        assert_eq!(typed[1].typing_provenance, TypingProvenance::Remote);
    }

    #[test]
    fn test_remote_answer_rejections() {
        let claims = vec![claim("c1", "A"), claim("c2", "B")];

        // missing a claim
        let missing = r#"{"classifications": [{"claim_id": "c1", "types": ["causal"], "primary_type": "causal", "confidence": 0.8}]}"#;
        assert!(apply_remote_typings(&claims, missing).is_err());

        // unknown type
        let unknown = r#"{"classifications": [
            {"claim_id": "c1", "types": ["vibes"], "primary_type": "vibes", "confidence": 0.8},
            {"claim_id": "c2", "types": ["causal"], "primary_type": "causal", "confidence": 0.8}]}"#;
        assert!(apply_remote_typings(&claims, unknown).is_err());

        // primary not among types
        let inconsistent = r#"{"classifications": [
            {"claim_id": "c1", "types": ["causal"], "primary_type": "predictive", "confidence": 0.8},
            {"claim_id": "c2", "types": ["causal"], "primary_type": "causal", "confidence": 0.8}]}"#;
        assert!(apply_remote_typings(&claims, inconsistent).is_err());

        // confidence out of range
        let confident = r#"{"classifications": [
            {"claim_id": "c1", "types": ["causal"], "primary_type": "causal", "confidence": 1.8},
            {"claim_id": "c2", "types": ["causal"], "primary_type": "causal", "confidence": 0.8}]}"#;
        assert!(apply_remote_typings(&claims, confident).is_err());
    }

    struct FailingClassifier;

    #[async_trait]
    impl ClaimClassifier for FailingClassifier {
        fn name(&self) -> &str {
            "failing"
        }

        async fn classify(&self, _claims: &[StructuredClaim]) -> Result<Vec<TypedClaim>> {
            anyhow::bail!("service unavailable")
        }
    }

    #[tokio::test]
    async fn test_remote_failure_falls_back() {
        let typer = ClaimTyper::with_remote(Arc::new(FailingClassifier), Duration::from_secs(1));
        let claims = vec![claim("c1", "Smoking causes lung cancer")];
        let outcome = typer.type_claims(&claims).await;

        assert_eq!(outcome.strategy, Strategy::Heuristic);
        assert_eq!(outcome.claims.len(), 1);
        assert_eq!(outcome.claims[0].primary_type, EpistemicType::Causal);
    }
}
