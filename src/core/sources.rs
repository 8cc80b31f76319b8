//! Source typing for evidence nodes.
//!
//! Pass one is local: institutional allow-list, peer-review URL patterns and
//! keyword inference. Pass two sends the nodes still `unknown` to a
//! `SourceClassifier`; its failures leave the heuristic answer in place.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::adapters::{extract_json, CompletionRequest, LanguageModel};
use crate::domain::{EvidenceNode, SourceType};

use super::lexicon;

/// Flags and type derived in the heuristic pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceTraits {
    pub source_type: SourceType,
    pub is_peer_reviewed: bool,
    pub is_institutional: bool,
}

/// Lowercased host without a leading "www."
pub fn hostname_of(url: &str) -> String {
    let host = reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_else(|| {
            // Bare "example.com/path" style input
            url.trim_start_matches("https://")
                .trim_start_matches("http://")
                .split('/')
                .next()
                .unwrap_or_default()
                .to_lowercase()
        });
    host.strip_prefix("www.").map(str::to_string).unwrap_or(host)
}

/// Allow-listed domains and their subdomains, plus `.gov` / `.int`
pub fn is_institutional_host(host: &str) -> bool {
    if host.ends_with(".gov") || host.ends_with(".int") {
        return true;
    }
    lexicon::INSTITUTIONAL_DOMAINS
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{}", domain)))
}

/// Heuristic pass over a node's URL, provider and text
pub fn heuristic_traits(node: &EvidenceNode) -> SourceTraits {
    let locator = format!("{} {}", node.url, node.provider);
    let text = node.text();

    let is_institutional = is_institutional_host(&node.hostname);
    let is_peer_reviewed = lexicon::PEER_REVIEW.is_match(&locator);

    let source_type = if lexicon::MODEL_LANGUAGE.is_match(&text) {
        SourceType::ModelBased
    } else if is_peer_reviewed && lexicon::META_ANALYSIS.is_match(&text) {
        SourceType::MetaAnalysis
    } else if is_peer_reviewed {
        SourceType::Empirical
    } else if is_institutional {
        SourceType::InstitutionalConsensus
    } else if lexicon::OPINION.is_match(&locator) || lexicon::OPINION.is_match(&node.title) {
        SourceType::Opinion
    } else if lexicon::NEWS.is_match(&node.provider) || lexicon::NEWS.is_match(&node.hostname) {
        SourceType::NewsReport
    } else {
        SourceType::Unknown
    };

    SourceTraits {
        source_type,
        is_peer_reviewed,
        is_institutional,
    }
}

/// What the remote classifier sees of a node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub id: String,
    pub url: String,
    pub provider: String,
    pub title: String,
    pub summary: String,
}

impl From<&EvidenceNode> for SourceDescriptor {
    fn from(node: &EvidenceNode) -> Self {
        Self {
            id: node.id.clone(),
            url: node.url.clone(),
            provider: node.provider.clone(),
            title: node.title.clone(),
            summary: node.summary.clone(),
        }
    }
}

/// A single remote answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTyping {
    pub id: String,
    pub source_type: SourceType,
}

/// Source typing strategy for ambiguous nodes
#[async_trait]
pub trait SourceClassifier: Send + Sync {
    fn name(&self) -> &str;

    async fn classify(&self, batch: &[SourceDescriptor]) -> Result<Vec<SourceTyping>>;
}

#[derive(Debug, Deserialize)]
struct RemoteSourceTypings {
    classifications: Vec<RemoteSourceTyping>,
}

#[derive(Debug, Deserialize)]
struct RemoteSourceTyping {
    id: String,
    source_type: String,
}

const SOURCE_INSTRUCTIONS: &str = "You classify evidence sources. Allowed source types: \
empirical, model_based, meta_analysis, institutional_consensus, news_report, opinion, unknown. \
Respond with JSON only: {\"classifications\": [{\"id\", \"source_type\"}]}.";

/// Source classifier delegated to the language model
pub struct RemoteSourceClassifier {
    model: Arc<dyn LanguageModel>,
}

impl RemoteSourceClassifier {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl SourceClassifier for RemoteSourceClassifier {
    fn name(&self) -> &str {
        "remote-source-classifier"
    }

    async fn classify(&self, batch: &[SourceDescriptor]) -> Result<Vec<SourceTyping>> {
        let user = serde_json::to_string(batch).context("Failed to encode source batch")?;
        let raw = self
            .model
            .complete(&CompletionRequest::new(SOURCE_INSTRUCTIONS, user))
            .await?;
        parse_source_typings(batch, &raw)
    }
}

fn parse_source_typings(batch: &[SourceDescriptor], raw: &str) -> Result<Vec<SourceTyping>> {
    let json = extract_json(raw).context("Source typing answer contained no JSON")?;
    let parsed: RemoteSourceTypings =
        serde_json::from_str(json).context("Source typing answer did not match schema")?;

    let known: HashSet<&str> = batch.iter().map(|d| d.id.as_str()).collect();

    parsed
        .classifications
        .into_iter()
        .map(|c| {
            if !known.contains(c.id.as_str()) {
                anyhow::bail!("Source typing for unknown id {}", c.id);
            }
            let source_type = SourceType::parse(&c.source_type)
                .with_context(|| format!("Unknown source type '{}'", c.source_type))?;
            Ok(SourceTyping {
                id: c.id,
                source_type,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::evidence::test_support::node;
    use crate::domain::Stance;

    fn with(url: &str, provider: &str, title: &str, summary: &str) -> EvidenceNode {
        let mut n = node(url, &hostname_of(url), Stance::Supports);
        n.provider = provider.to_string();
        n.title = title.to_string();
        n.summary = summary.to_string();
        n
    }

    #[test]
    fn test_hostname_of() {
        assert_eq!(hostname_of("https://www.Reuters.com/world/x"), "reuters.com");
        assert_eq!(hostname_of("http://data.cdc.gov/a?b=c"), "data.cdc.gov");
        assert_eq!(hostname_of("example.org/page"), "example.org");
    }

    #[test]
    fn test_institutional_hosts() {
        assert!(is_institutional_host("who.int"));
        assert!(is_institutional_host("data.cdc.gov"));
        assert!(is_institutional_host("ons.gov.uk"));
        assert!(is_institutional_host("climate.nasa.gov"));
        assert!(!is_institutional_host("notwho.int.example.com"));
        assert!(!is_institutional_host("reuters.com"));
    }

    #[test]
    fn test_heuristic_source_types() {
        let model = with("https://climate.org/a", "Climate Org", "2050 projections", "");
        assert_eq!(heuristic_traits(&model).source_type, SourceType::ModelBased);

        let meta = with("https://doi.org/10.1/abc", "", "A systematic review of sleep", "");
        let traits = heuristic_traits(&meta);
        assert_eq!(traits.source_type, SourceType::MetaAnalysis);
        assert!(traits.is_peer_reviewed);

        let paper = with("https://www.nature.com/articles/x", "Nature", "Measured ice loss", "");
        assert_eq!(heuristic_traits(&paper).source_type, SourceType::Empirical);

        let agency = with("https://www.who.int/news/item", "WHO", "Fact sheet", "");
        let traits = heuristic_traits(&agency);
        assert_eq!(traits.source_type, SourceType::InstitutionalConsensus);
        assert!(traits.is_institutional);

        let op = with("https://paper.com/opinion/why", "The Paper", "Why I think so", "");
        assert_eq!(heuristic_traits(&op).source_type, SourceType::Opinion);

        let news = with("https://apnews.com/article/x", "Associated Press", "Storm hits", "");
        assert_eq!(heuristic_traits(&news).source_type, SourceType::NewsReport);

        let unknown = with("https://randomsite.io/x", "Random", "Thoughts", "");
        assert_eq!(heuristic_traits(&unknown).source_type, SourceType::Unknown);
    }

    #[test]
    fn test_source_typing_validation() {
        let batch = vec![SourceDescriptor {
            id: "ev-1".to_string(),
            url: "https://x.io".to_string(),
            provider: String::new(),
            title: String::new(),
            summary: String::new(),
        }];

        let ok = parse_source_typings(
            &batch,
            r#"{"classifications": [{"id": "ev-1", "source_type": "opinion"}]}"#,
        )
        .unwrap();
        assert_eq!(ok[0].source_type, SourceType::Opinion);

        assert!(parse_source_typings(
            &batch,
            r#"{"classifications": [{"id": "ev-9", "source_type": "opinion"}]}"#
        )
        .is_err());
        assert!(parse_source_typings(
            &batch,
            r#"{"classifications": [{"id": "ev-1", "source_type": "gossip"}]}"#
        )
        .is_err());
    }
}
