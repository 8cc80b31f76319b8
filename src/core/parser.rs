//! Stage 1: raw text to structured claims.
//!
//! The remote strategy asks the language model to segment and annotate the
//! text. The heuristic strategy segments on sentence boundaries and reads the
//! annotations off fixed regex families. The heuristic always answers, so
//! parsing only fails when the text holds nothing claim-like.

use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Datelike, Utc};
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::adapters::{extract_json, CompletionRequest, LanguageModel};
use crate::domain::{
    CausalStructure, CertaintyLanguage, Geography, Quantifier, StructuredClaim, Timeframe,
    TimeframeKind,
};

use super::fallback::{within_timeout, Strategy};
use super::lexicon;

/// Minimum words for a sentence to be treated as a claim
const MIN_CLAIM_WORDS: usize = 3;

static SENTENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^.!?\n]+[.!?]*").unwrap());

/// A claim extraction strategy
#[async_trait]
pub trait ClaimExtractor: Send + Sync {
    fn name(&self) -> &str;

    async fn extract(&self, text: &str) -> Result<Vec<StructuredClaim>>;
}

/// Deterministic, offline claim extraction
#[derive(Debug, Clone, Default)]
pub struct HeuristicClaimExtractor;

impl HeuristicClaimExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Split text into claim sentences and annotate each
    pub fn extract_claims(&self, text: &str) -> Vec<StructuredClaim> {
        SENTENCE
            .find_iter(text)
            .map(|m| m.as_str().trim())
            .filter(|s| !s.ends_with('?'))
            .filter(|s| s.split_whitespace().count() >= MIN_CLAIM_WORDS)
            .enumerate()
            .map(|(i, sentence)| annotate(format!("claim-{}", i + 1), sentence))
            .collect()
    }
}

#[async_trait]
impl ClaimExtractor for HeuristicClaimExtractor {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn extract(&self, text: &str) -> Result<Vec<StructuredClaim>> {
        Ok(self.extract_claims(text))
    }
}

/// Build a structured claim from one sentence
pub fn annotate(id: String, sentence: &str) -> StructuredClaim {
    let text = sentence.trim().to_string();
    let body = text.trim_end_matches(|c: char| c == '.' || c == '!');

    let (subject, predicate) = match lexicon::VERB.find(body) {
        Some(m) if m.start() > 0 => (
            body[..m.start()].trim().to_string(),
            body[m.start()..].trim().to_string(),
        ),
        _ => (String::new(), body.to_string()),
    };

    let mut markers = lexicon::literal_matches(&lexicon::DEFINITE, &text);
    let probable = lexicon::literal_matches(&lexicon::PROBABLE, &text);
    let hedged = lexicon::literal_matches(&lexicon::HEDGED, &text);
    let certainty_language = if !markers.is_empty() {
        CertaintyLanguage::Definite
    } else if !probable.is_empty() {
        CertaintyLanguage::Probable
    } else if !hedged.is_empty() {
        CertaintyLanguage::Hedged
    } else {
        CertaintyLanguage::Neutral
    };
    markers.extend(probable);
    markers.extend(hedged);

    StructuredClaim {
        id,
        subject,
        predicate,
        timeframe: detect_timeframe(&text),
        geography: detect_geography(&text),
        causal_structure: detect_causal_structure(&text),
        quantifiers: detect_quantifiers(&text),
        certainty_language,
        certainty_markers: markers,
        text,
    }
}

fn detect_timeframe(text: &str) -> Timeframe {
    if let Some(caps) = lexicon::YEAR.captures(text) {
        let phrase = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
        let year: i32 = caps
            .get(1)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or_default();
        let current = Utc::now().year();
        let kind = match year.cmp(&current) {
            std::cmp::Ordering::Greater => TimeframeKind::Future,
            std::cmp::Ordering::Less => TimeframeKind::Past,
            std::cmp::Ordering::Equal => TimeframeKind::Present,
        };
        return Timeframe::new(kind).with_explicit(phrase);
    }

    for (pattern, kind) in [
        (&lexicon::FUTURE, TimeframeKind::Future),
        (&lexicon::PAST, TimeframeKind::Past),
        (&lexicon::PRESENT, TimeframeKind::Present),
    ] {
        if let Some(m) = pattern.find(text) {
            return Timeframe::new(kind).with_explicit(m.as_str());
        }
    }

    Timeframe::default()
}

fn detect_geography(text: &str) -> Geography {
    // Widest scope mentioned wins
    if lexicon::GLOBAL.is_match(text) {
        Geography::Global
    } else if lexicon::REGIONAL.is_match(text) {
        Geography::Regional
    } else if lexicon::NATIONAL.is_match(text) {
        Geography::National
    } else if lexicon::LOCAL.is_match(text) {
        Geography::Local
    } else {
        Geography::Unspecified
    }
}

fn detect_causal_structure(text: &str) -> CausalStructure {
    if lexicon::CAUSAL.is_match(text) {
        CausalStructure::Causal
    } else if lexicon::CORRELATIONAL_CLAIM.is_match(text) {
        CausalStructure::Correlational
    } else if lexicon::VERB.is_match(text) {
        CausalStructure::Descriptive
    } else {
        CausalStructure::Unclear
    }
}

fn detect_quantifiers(text: &str) -> BTreeSet<Quantifier> {
    let mut found: BTreeSet<Quantifier> = [
        (&lexicon::UNIVERSAL, Quantifier::Universal),
        (&lexicon::MAJORITY, Quantifier::Majority),
        (&lexicon::MINORITY, Quantifier::Minority),
        (&lexicon::EXISTENTIAL, Quantifier::Existential),
        (&lexicon::VAGUE, Quantifier::Vague),
        (&lexicon::PRECISE, Quantifier::Precise),
    ]
    .into_iter()
    .filter(|(pattern, _)| pattern.is_match(text))
    .map(|(_, quantifier)| quantifier)
    .collect();

    if found.is_empty() {
        found.insert(Quantifier::None);
    }
    found
}

/// Claim shape the language model is asked to return
#[derive(Debug, Deserialize)]
struct RemoteClaims {
    claims: Vec<RemoteClaim>,
}

#[derive(Debug, Deserialize)]
struct RemoteClaim {
    text: String,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    predicate: String,
    #[serde(default)]
    timeframe: Timeframe,
    #[serde(default)]
    geography: Geography,
    #[serde(default)]
    causal_structure: CausalStructure,
    #[serde(default)]
    quantifiers: BTreeSet<Quantifier>,
    #[serde(default)]
    certainty_language: CertaintyLanguage,
    #[serde(default)]
    certainty_markers: Vec<String>,
}

const PARSE_INSTRUCTIONS: &str = "You split content into atomic factual claims. \
Respond with JSON only: {\"claims\": [{\"text\", \"subject\", \"predicate\", \
\"timeframe\": {\"kind\": past|present|future|unspecified, \"explicit\"}, \
\"geography\": global|regional|national|local|unspecified, \
\"causal_structure\": causal|correlational|descriptive|unclear, \
\"quantifiers\": [universal|existential|majority|minority|vague|precise|none], \
\"certainty_language\": definite|probable|hedged|neutral, \
\"certainty_markers\": [literal words]}]}";

/// Claim extraction delegated to the language model
pub struct RemoteClaimExtractor {
    model: Arc<dyn LanguageModel>,
}

impl RemoteClaimExtractor {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl ClaimExtractor for RemoteClaimExtractor {
    fn name(&self) -> &str {
        "remote"
    }

    async fn extract(&self, text: &str) -> Result<Vec<StructuredClaim>> {
        let raw = self
            .model
            .complete(&CompletionRequest::new(PARSE_INSTRUCTIONS, text))
            .await?;
        parse_remote_claims(&raw)
    }
}

fn parse_remote_claims(raw: &str) -> Result<Vec<StructuredClaim>> {
    let json = extract_json(raw).context("Claim parser answer contained no JSON")?;
    let parsed: RemoteClaims =
        serde_json::from_str(json).context("Claim parser answer did not match schema")?;

    if parsed.claims.is_empty() {
        anyhow::bail!("Claim parser returned no claims");
    }

    parsed
        .claims
        .into_iter()
        .enumerate()
        .map(|(i, c)| {
            if c.text.trim().is_empty() {
                anyhow::bail!("Claim parser returned an empty claim at position {}", i);
            }
            let predicate = if c.predicate.is_empty() {
                c.text.clone()
            } else {
                c.predicate
            };
            let mut quantifiers = c.quantifiers;
            if quantifiers.is_empty() {
                quantifiers.insert(Quantifier::None);
            }
            Ok(StructuredClaim {
                id: format!("claim-{}", i + 1),
                text: c.text.trim().to_string(),
                subject: c.subject,
                predicate,
                timeframe: c.timeframe,
                geography: c.geography,
                causal_structure: c.causal_structure,
                quantifiers,
                certainty_language: c.certainty_language,
                certainty_markers: c.certainty_markers,
            })
        })
        .collect()
}

/// Result of stage 1
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub claims: Vec<StructuredClaim>,
    pub strategy: Strategy,
}

/// Stage 1 driver: remote strategy under a timeout, heuristic otherwise
pub struct ClaimParser {
    remote: Option<Arc<dyn ClaimExtractor>>,
    heuristic: HeuristicClaimExtractor,
    timeout: Duration,
}

impl ClaimParser {
    /// Parser that never leaves the process
    pub fn heuristic() -> Self {
        Self {
            remote: None,
            heuristic: HeuristicClaimExtractor::new(),
            timeout: Duration::from_secs(0),
        }
    }

    pub fn with_remote(remote: Arc<dyn ClaimExtractor>, timeout: Duration) -> Self {
        Self {
            remote: Some(remote),
            heuristic: HeuristicClaimExtractor::new(),
            timeout,
        }
    }

    #[instrument(skip(self, text), fields(bytes = text.len()))]
    pub async fn parse(&self, text: &str) -> ParseOutcome {
        if let Some(ref remote) = self.remote {
            if let Some(claims) = within_timeout(remote.name(), self.timeout, remote.extract(text)).await {
                debug!(count = claims.len(), "Claims parsed remotely");
                return ParseOutcome {
                    claims,
                    strategy: Strategy::Remote,
                };
            }
        }

        let claims = self.heuristic.extract_claims(text);
        debug!(count = claims.len(), "Claims parsed heuristically");
        ParseOutcome {
            claims,
            strategy: Strategy::Heuristic,
        }
    }
}
