//! Stage 6: scoring result and evidence to calibrated text.
//!
//! All wording comes from an `ExplanationPolicy`; this module only decides
//! which entries apply. The verdict sentence is selected by band so the text
//! cannot contradict the score.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::{
    by_weight, CertaintyLanguage, EvidenceGraph, ExplanationOutput, KeyReason, Penalty,
    PenaltyName, PenaltySummary, Quantifier, ScoreBand, ScoringResult, Sentiment, SourceType,
    TypedClaim,
};

use super::lexicon::has_strong_marker;
use super::policy::{ClaimCategory, ExplanationPolicy};

/// "9 of 11" in a contradiction rationale
static COUNTS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+) of (\d+)").unwrap());

const TOP_PENALTIES: usize = 3;
const MAX_PENALTY_REASONS: usize = 3;

#[derive(Debug, Clone, Default)]
pub struct ExplanationGenerator {
    policy: ExplanationPolicy,
}

impl ExplanationGenerator {
    pub fn new(policy: ExplanationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ExplanationPolicy {
        &self.policy
    }

    pub fn explain(
        &self,
        scoring: &ScoringResult,
        graph: &EvidenceGraph,
        claims: &[TypedClaim],
    ) -> ExplanationOutput {
        let ranked = by_weight(&scoring.penalties);
        let category = ClaimCategory::classify(claims, graph);

        ExplanationOutput {
            final_score: scoring.final_score,
            band_label: scoring.score_band.label().to_string(),
            band_description: scoring.score_band.description().to_string(),
            top_penalties: ranked
                .iter()
                .take(TOP_PENALTIES)
                .map(|p| PenaltySummary {
                    name: p.name,
                    weight: p.weight,
                    rationale: p.rationale.clone(),
                })
                .collect(),
            improvement_suggestions: self.improvements(&ranked),
            uncertainty_statement: self.uncertainty(scoring.score_band, graph),
            evidence_summary: self.evidence_summary(claims, graph, category),
            explanation_text: self.verdict(scoring.score_band, &ranked, graph),
            key_reasons: self.key_reasons(&ranked, graph, claims, category),
        }
    }

    /// Verdict paragraph: band sentence, heaviest remaining consequence, thin-evidence note
    pub fn verdict(&self, band: ScoreBand, ranked: &[&Penalty], graph: &EvidenceGraph) -> String {
        let phrases = &self.policy.verdict_phrases;
        let gates = &self.policy.gates;
        let stats = &graph.stats;
        let dominant = ranked.first().copied();

        let (opening, covered) = match band {
            ScoreBand::StronglySupported => {
                let supporting = stats.supporting_count;
                let confirmed = supporting >= gates.strong_support_min
                    && supporting as f64 >= gates.strong_support_ratio * stats.refuting_count as f64;
                if confirmed {
                    (phrases.strong_confirmation.clone(), None)
                } else {
                    (phrases.soft_support.clone(), None)
                }
            }
            ScoreBand::Plausible => match dominant {
                Some(penalty) => (
                    phrases
                        .partial_with_rationale
                        .replace("{rationale}", penalty.rationale.trim()),
                    Some(penalty.name),
                ),
                None => (self.policy.verdict(band).to_string(), None),
            },
            ScoreBand::WeaklySupported => match dominant {
                Some(penalty)
                    if matches!(
                        penalty.name,
                        PenaltyName::LowExpertConsensus | PenaltyName::SelectiveCitation
                    ) =>
                {
                    (phrases.unverified_strong.clone(), Some(penalty.name))
                }
                _ => (self.policy.verdict(band).to_string(), None),
            },
            ScoreBand::MostlyFalse | ScoreBand::False => {
                match contradiction_counts(ranked)
                    .filter(|(refuting, total)| {
                        *total >= gates.overwhelming_min_total
                            && *refuting as f64 / *total as f64 >= gates.overwhelming_ratio
                    }) {
                    Some((refuting, total)) => (
                        phrases
                            .overwhelming_refutation
                            .replace("{refuting}", &refuting.to_string())
                            .replace("{total}", &total.to_string()),
                        Some(PenaltyName::EvidenceContradiction),
                    ),
                    None => (self.policy.verdict(band).to_string(), None),
                }
            }
            ScoreBand::Supported | ScoreBand::Mixed => (self.policy.verdict(band).to_string(), None),
        };

        let mut sentences = vec![opening];

        if let Some(consequence) = ranked
            .iter()
            .find(|p| Some(p.name) != covered)
            .and_then(|p| self.policy.consequence(p.name))
        {
            sentences.push(consequence.to_string());
        }

        if stats.total_sources == 0 {
            sentences.push(phrases.no_evidence.clone());
        } else if stats.total_sources < gates.few_sources {
            sentences.push(phrases.thin_evidence.clone());
        }

        if sentences.len() == 1 {
            sentences.push(
                phrases
                    .evidence_basis
                    .replace("{sources}", &plural(stats.total_sources, "source", "sources"))
                    .replace(
                        "{outlets}",
                        &plural(stats.unique_hostnames, "independent outlet", "independent outlets"),
                    )
                    .replace("{supporting}", &stats.supporting_count.to_string()),
            );
        }

        sentences.join(" ")
    }

    /// Context paragraph of three to five sentences
    pub fn evidence_summary(
        &self,
        claims: &[TypedClaim],
        graph: &EvidenceGraph,
        category: ClaimCategory,
    ) -> String {
        let stats = &graph.stats;
        let mut sentences: Vec<String> = Vec::new();

        let kind = match category {
            ClaimCategory::Prediction => {
                "This is a predictive claim about future outcomes, so it can only be checked against projections and current trends."
            }
            ClaimCategory::Causal => {
                "This is a causal claim: it asserts that one thing brings about another."
            }
            ClaimCategory::Comparative => "This is a comparative claim that weighs one thing against another.",
            ClaimCategory::Normative => {
                "This claim is partly a value judgement, which evidence can inform but not settle."
            }
            ClaimCategory::NewsEvent => "This is a factual claim about a reported past event.",
            ClaimCategory::Empirical => "This is a factual claim about observable conditions.",
        };
        sentences.push(kind.to_string());

        let absolute = claims.iter().any(|c| {
            c.claim.certainty_language == CertaintyLanguage::Definite
                && has_strong_marker(&c.claim.certainty_markers)
        });
        let vague = claims
            .iter()
            .any(|c| c.claim.has_quantifier(Quantifier::Vague));
        match (absolute, vague) {
            (true, true) => sentences.push(
                "It combines absolute wording with vague quantities.".to_string(),
            ),
            (true, false) => sentences.push(
                "It is phrased in absolute terms that leave no room for exceptions.".to_string(),
            ),
            (false, true) => sentences.push(
                "It relies on vague quantities rather than specific figures.".to_string(),
            ),
            (false, false) => {}
        }

        if stats.total_sources == 0 {
            sentences.push("No relevant evidence sources were found for this claim.".to_string());
            sentences.push(
                "The evidence is insufficient to confirm or refute it, so the assessment rests on the claim's wording alone."
                    .to_string(),
            );
            return sentences.join(" ");
        }

        sentences.push(format!(
            "The analysis drew on {} from {}.",
            plural(stats.total_sources, "source", "sources"),
            plural(stats.unique_hostnames, "distinct outlet", "distinct outlets"),
        ));
        sentences.push(format!("By type, the evidence includes {}.", composition(graph)));

        if stats.stanced_count() > 0 {
            sentences.push(format!(
                "Of the sources that take a clear position, {} support the claim and {} dispute it.",
                stats.supporting_count, stats.refuting_count
            ));
        }

        sentences.join(" ")
    }

    pub fn uncertainty(&self, band: ScoreBand, graph: &EvidenceGraph) -> String {
        let stats = &graph.stats;
        let gates = &self.policy.gates;
        let mut sentences = vec![self.policy.confidence(band).to_string()];

        if stats.total_sources == 0 {
            sentences.push("No sources were available to check the claim against.".to_string());
        } else if stats.total_sources < gates.few_sources {
            sentences.push(format!(
                "It is based on only {}.",
                plural(stats.total_sources, "source", "sources")
            ));
        }

        if let Some(host) = stats
            .dominant_hostname
            .as_deref()
            .filter(|_| stats.single_source_dominance)
        {
            sentences.push(format!("More than half of the sources come from {}.", host));
        }

        if stats.model_based_ratio() > gates.model_based_share {
            sentences.push(
                "Most of the evidence comes from models or projections rather than observation."
                    .to_string(),
            );
        }

        sentences.join(" ")
    }

    pub fn improvements(&self, ranked: &[&Penalty]) -> Vec<String> {
        let mut suggestions: Vec<String> = Vec::new();
        for penalty in ranked.iter().take(TOP_PENALTIES) {
            if let Some(text) = self.policy.improvement(penalty.name) {
                if !suggestions.iter().any(|s| s == text) {
                    suggestions.push(text.to_string());
                }
            }
        }
        if suggestions.is_empty() {
            suggestions.push(self.policy.generic_improvement.clone());
        }
        suggestions
    }

    pub fn key_reasons(
        &self,
        ranked: &[&Penalty],
        graph: &EvidenceGraph,
        claims: &[TypedClaim],
        category: ClaimCategory,
    ) -> Vec<KeyReason> {
        let mut reasons = vec![alignment_reason(graph), quality_reason(graph)];

        let any_vague = claims
            .iter()
            .any(|c| c.claim.has_quantifier(Quantifier::Vague));
        let penalty_reasons: Vec<KeyReason> = ranked
            .iter()
            .filter(|p| !self.policy.is_suppressed(category, p.name))
            .filter(|p| p.name != PenaltyName::AmbiguousQuantifiers || any_vague)
            .take(MAX_PENALTY_REASONS)
            .map(|p| {
                KeyReason::new(
                    format!("{}: {}", p.name.label(), p.rationale.trim()),
                    Sentiment::Negative,
                )
            })
            .collect();

        if !penalty_reasons.is_empty() {
            reasons.extend(penalty_reasons);
        } else if ranked.is_empty() {
            reasons.push(KeyReason::new(
                "No significant reasoning problems were found in how the claim is framed.",
                Sentiment::Positive,
            ));
        } else {
            let labels: Vec<String> = ranked.iter().map(|p| p.name.label()).collect();
            reasons.push(KeyReason::new(
                format!(
                    "The score still reflects checks that matter less for this kind of claim: {}.",
                    labels.join(", ")
                ),
                Sentiment::Neutral,
            ));
        }

        reasons
    }
}

/// (refuting, total) parsed from the contradiction rationale
fn contradiction_counts(ranked: &[&Penalty]) -> Option<(usize, usize)> {
    let penalty = ranked
        .iter()
        .find(|p| p.name == PenaltyName::EvidenceContradiction)?;
    let caps = COUNTS.captures(&penalty.rationale)?;
    let refuting = caps.get(1)?.as_str().parse().ok()?;
    let total: usize = caps.get(2)?.as_str().parse().ok()?;
    (total > 0).then_some((refuting, total))
}

fn alignment_reason(graph: &EvidenceGraph) -> KeyReason {
    let stats = &graph.stats;
    let (supporting, refuting) = (stats.supporting_count, stats.refuting_count);

    if stats.total_sources == 0 {
        return KeyReason::new(
            "No evidence addressing this claim could be found.",
            Sentiment::Negative,
        );
    }

    if supporting == 0 && refuting == 0 {
        return KeyReason::new(
            format!(
                "None of the {} takes a clear position on the claim.",
                plural(stats.total_sources, "source", "sources")
            ),
            Sentiment::Neutral,
        );
    }

    if supporting == refuting {
        return KeyReason::new(
            format!(
                "The evidence is split: {} support the claim and {} dispute it.",
                supporting, refuting
            ),
            Sentiment::Neutral,
        );
    }

    if supporting > refuting {
        let text = if refuting == 0 {
            format!(
                "{} support the claim and none dispute it.",
                plural(supporting, "source", "sources")
            )
        } else {
            format!(
                "{} of {} sources with a clear position support the claim.",
                supporting,
                supporting + refuting
            )
        };
        return KeyReason::new(text, Sentiment::Positive);
    }

    KeyReason::new(
        format!(
            "{} of {} sources with a clear position dispute the claim.",
            refuting,
            supporting + refuting
        ),
        Sentiment::Negative,
    )
}

fn quality_reason(graph: &EvidenceGraph) -> KeyReason {
    let experts = graph.nodes.iter().filter(|n| n.is_expert()).count();
    let hosts = graph.stats.unique_hostnames;

    match (experts > 0, hosts >= 3) {
        (true, true) => KeyReason::new(
            format!(
                "The evidence includes {} across {}.",
                plural(experts, "peer-reviewed or institutional source", "peer-reviewed or institutional sources"),
                plural(hosts, "independent outlet", "independent outlets")
            ),
            Sentiment::Positive,
        ),
        (true, false) => KeyReason::new(
            format!(
                "The evidence includes {}, but from only {}.",
                plural(experts, "expert source", "expert sources"),
                plural(hosts, "outlet", "outlets")
            ),
            Sentiment::Neutral,
        ),
        (false, true) => KeyReason::new(
            format!(
                "Sources span {} outlets, though none is peer-reviewed or institutional.",
                hosts
            ),
            Sentiment::Neutral,
        ),
        (false, false) => KeyReason::new(
            "Few independent or expert sources cover this claim.",
            Sentiment::Negative,
        ),
    }
}

fn composition(graph: &EvidenceGraph) -> String {
    let parts: Vec<String> = graph
        .stats
        .source_type_distribution
        .iter()
        .map(|(source_type, count)| format!("{} {}", count, type_noun(*source_type, *count)))
        .collect();
    match parts.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{} and {}", rest.join(", "), last),
        Some((last, _)) => last.clone(),
        None => "no classified sources".to_string(),
    }
}

fn type_noun(source_type: SourceType, count: usize) -> &'static str {
    let one = count == 1;
    match source_type {
        SourceType::Empirical => if one { "empirical study" } else { "empirical studies" },
        SourceType::ModelBased => if one { "model projection" } else { "model projections" },
        SourceType::MetaAnalysis => if one { "meta-analysis" } else { "meta-analyses" },
        SourceType::InstitutionalConsensus => {
            if one { "institutional report" } else { "institutional reports" }
        }
        SourceType::NewsReport => if one { "news report" } else { "news reports" },
        SourceType::Opinion => if one { "opinion piece" } else { "opinion pieces" },
        SourceType::Unknown => if one { "unclassified source" } else { "unclassified sources" },
    }
}

fn plural(count: usize, one: &str, many: &str) -> String {
    if count == 1 {
        format!("1 {}", one)
    } else {
        format!("{} {}", count, many)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::annotate;
    use crate::core::scoring::ScoringEngine;
    use crate::core::typer::HeuristicClaimClassifier;
    use crate::domain::evidence::test_support::node;
    use crate::domain::{EvidenceNode, Severity, Stance};

    fn sentences(text: &str) -> usize {
        text.matches(". ").count() + 1
    }

    fn supporting(count: usize) -> Vec<EvidenceNode> {
        (0..count)
            .map(|i| {
                let host = format!("site{i}.org");
                node(&format!("https://{host}/a"), &host, Stance::Supports)
            })
            .collect()
    }

    #[test]
    fn test_zero_evidence_is_called_insufficient() {
        let graph = EvidenceGraph::default();
        let scoring = ScoringEngine::new().compute_score(&[], &graph, &[]);
        let output = ExplanationGenerator::default().explain(&scoring, &graph, &[]);

        assert_eq!(output.final_score, 100);
        assert!(output.evidence_summary.contains("insufficient"));
        assert!(output.explanation_text.starts_with("This claim holds up well"));
        assert!((3..=5).contains(&output.key_reasons.len()));
        assert_eq!(output.improvement_suggestions.len(), 1);
    }

    #[test]
    fn test_overwhelming_refutation_gate() {
        let generator = ExplanationGenerator::default();
        let graph = EvidenceGraph::default();
        let heavy = Penalty::new(
            PenaltyName::EvidenceContradiction,
            Severity::High,
            "Most evidence contradicts the claim: 9 of 11 sources with a clear stance refute it (82%).",
            vec![],
        );
        let text = generator.verdict(ScoreBand::MostlyFalse, &[&heavy], &graph);
        assert!(text.contains("overwhelmingly"));

        let light = Penalty::new(
            PenaltyName::EvidenceContradiction,
            Severity::High,
            "Most evidence contradicts the claim: 3 of 4 sources with a clear stance refute it (75%).",
            vec![],
        );
        let text = generator.verdict(ScoreBand::MostlyFalse, &[&light], &graph);
        assert!(!text.contains("overwhelmingly"));
        assert!(text.contains("contradicts"));
    }

    #[test]
    fn test_strong_confirmation_needs_support() {
        let generator = ExplanationGenerator::default();
        let graph = EvidenceGraph::new(vec![
            node("https://a.org/1", "a.org", Stance::Supports),
            node("https://b.org/1", "b.org", Stance::Supports),
            node("https://c.org/1", "c.org", Stance::Supports),
        ]);
        let text = generator.verdict(ScoreBand::StronglySupported, &[], &graph);
        assert!(text.starts_with("Multiple independent sources confirm"));

        let split = EvidenceGraph::new(vec![
            node("https://a.org/1", "a.org", Stance::Supports),
            node("https://b.org/1", "b.org", Stance::Supports),
            node("https://c.org/1", "c.org", Stance::Refutes),
        ]);
        let text = generator.verdict(ScoreBand::StronglySupported, &[], &split);
        assert!(!text.starts_with("Multiple independent sources confirm"));
    }

    #[test]
    fn test_second_sentence_skips_covered_penalty() {
        let generator = ExplanationGenerator::default();
        let graph = EvidenceGraph::new(vec![
            node("https://a.org/1", "a.org", Stance::Supports),
            node("https://b.org/1", "b.org", Stance::Supports),
            node("https://c.org/1", "c.org", Stance::Supports),
        ]);
        let dominant = Penalty::new(
            PenaltyName::CausalOverreach,
            Severity::High,
            "The claim asserts causation but its support only shows correlation.",
            vec![],
        );
        let next = Penalty::new(PenaltyName::AmbiguousQuantifiers, Severity::Low, "vague", vec![]);
        let text = generator.verdict(ScoreBand::Plausible, &[&dominant, &next], &graph);

        assert!(text.contains("only shows correlation"));
        assert!(text.contains("Vague quantities"));
        assert!(!text.contains("not the cause-and-effect"));
        assert_eq!(sentences(&text), 2);
    }

    #[test]
    fn test_improvements_deduplicated_with_fallback() {
        let generator = ExplanationGenerator::default();
        assert_eq!(
            generator.improvements(&[]),
            vec![generator.policy().generic_improvement.clone()]
        );

        let a = Penalty::new(PenaltyName::OutdatedEvidence, Severity::High, "x", vec![]);
        let b = Penalty::new(PenaltyName::OutdatedEvidence, Severity::Low, "y", vec![]);
        assert_eq!(generator.improvements(&[&a, &b]).len(), 1);
    }

    #[test]
    fn test_split_evidence_is_neutral() {
        let graph = EvidenceGraph::new(vec![
            node("https://a.org/1", "a.org", Stance::Supports),
            node("https://b.org/1", "b.org", Stance::Refutes),
        ]);
        assert_eq!(alignment_reason(&graph).sentiment, Sentiment::Neutral);
    }

    #[test]
    fn test_clean_verdict_states_evidence_basis() {
        let mut nodes = supporting(4);
        nodes[0].is_peer_reviewed = true;
        let graph = EvidenceGraph::new(nodes);

        let text = ExplanationGenerator::default().verdict(ScoreBand::StronglySupported, &[], &graph);
        assert!(text.starts_with("Multiple independent sources confirm"));
        assert!(text.contains(
            "This rests on 4 sources from 4 independent outlets, 4 of which support the claim."
        ));
        assert_eq!(sentences(&text), 2);
    }

    #[test]
    fn test_soft_support_does_not_deny_penalties() {
        let graph = EvidenceGraph::new(supporting(1));
        let certainty = Penalty::new(PenaltyName::RhetoricalCertainty, Severity::Low, "x", vec![]);

        let text = ExplanationGenerator::default().verdict(
            ScoreBand::StronglySupported,
            &[&certainty],
            &graph,
        );
        assert!(text.starts_with("This claim holds up well overall."));
        assert!(text.contains("more certainty than the evidence allows"));
        assert!(!text.to_lowercase().contains("no significant"));
    }

    #[test]
    fn test_suppressed_penalties_leave_neutral_reason() {
        let generator = ExplanationGenerator::default();
        let claims = vec![HeuristicClaimClassifier::new()
            .classify_claim(&annotate("claim-1".to_string(), "The bridge collapsed in 2019."))];
        let lec = Penalty::new(
            PenaltyName::LowExpertConsensus,
            Severity::Medium,
            "Only 0 of 3 sources are peer-reviewed or institutional.",
            vec!["claim-1".to_string()],
        );

        let mut reported = supporting(3);
        for n in reported.iter_mut() {
            n.source_type = SourceType::NewsReport;
        }
        let graph = EvidenceGraph::new(reported);
        let category = ClaimCategory::classify(&claims, &graph);
        assert_eq!(category, ClaimCategory::NewsEvent);

        let reasons = generator.key_reasons(&[&lec], &graph, &claims, category);
        assert!(!reasons.iter().any(|r| r.text.starts_with("Low expert consensus")));
        assert!(!reasons.iter().any(|r| r.text.contains("No significant reasoning problems")));
        let filtered = reasons
            .iter()
            .find(|r| r.text.contains("matter less"))
            .unwrap();
        assert_eq!(filtered.sentiment, Sentiment::Neutral);
        assert!(filtered.text.contains("Low expert consensus"));

        // the same penalty is a negative reason for a studied claim
        let graph = EvidenceGraph::new(supporting(3));
        let category = ClaimCategory::classify(&claims, &graph);
        let reasons = generator.key_reasons(&[&lec], &graph, &claims, category);
        let reason = reasons
            .iter()
            .find(|r| r.text.starts_with("Low expert consensus"))
            .unwrap();
        assert_eq!(reason.sentiment, Sentiment::Negative);
    }

    #[test]
    fn test_uncertainty_qualifiers() {
        let generator = ExplanationGenerator::default();

        let balanced = generator.uncertainty(ScoreBand::Supported, &EvidenceGraph::new(supporting(3)));
        assert_eq!(balanced, "Confidence in this assessment is fairly high.");

        let thin = generator.uncertainty(ScoreBand::Supported, &EvidenceGraph::new(supporting(2)));
        assert!(thin.contains("It is based on only 2 sources."));

        let dominated = EvidenceGraph::new(vec![
            node("https://blog.com/1", "blog.com", Stance::Supports),
            node("https://blog.com/22", "blog.com", Stance::Supports),
            node("https://blog.com/333", "blog.com", Stance::Supports),
            node("https://other.com/1", "other.com", Stance::Supports),
        ]);
        let text = generator.uncertainty(ScoreBand::Supported, &dominated);
        assert!(text.contains("More than half of the sources come from blog.com."));

        let mut modelled = supporting(3);
        modelled[0].source_type = SourceType::ModelBased;
        modelled[1].source_type = SourceType::ModelBased;
        let text = generator.uncertainty(ScoreBand::Plausible, &EvidenceGraph::new(modelled));
        assert!(text.contains("models or projections rather than observation"));
    }

    #[test]
    fn test_weak_verdict_names_narrow_support() {
        let generator = ExplanationGenerator::default();
        let graph = EvidenceGraph::new(supporting(3));

        let lec = Penalty::new(PenaltyName::LowExpertConsensus, Severity::Medium, "x", vec![]);
        let text = generator.verdict(ScoreBand::WeaklySupported, &[&lec], &graph);
        assert!(text.starts_with("This claim has not been independently verified;"));
        assert!(!text.contains("Expert sources do not clearly back"));

        let causal = Penalty::new(PenaltyName::CausalOverreach, Severity::High, "x", vec![]);
        let text = generator.verdict(ScoreBand::WeaklySupported, &[&causal], &graph);
        assert!(text.starts_with("This claim could not be independently verified"));
        assert!(text.contains("an association, not the cause-and-effect"));
    }
}
