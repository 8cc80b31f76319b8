//! Command-line interface for verity.
//!
//! Provides commands for evaluating claims, replaying and verifying stored
//! analysis bundles, and inspecting bands and configuration.

use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;

use crate::adapters::{
    EvidenceRetriever, HttpLanguageModel, HttpRetriever, LanguageModel, StaticRetriever,
};
use crate::config::{self, ResolvedConfig};
use crate::core::Orchestrator;
use crate::domain::{AnalysisBundle, ScoreBand, Sentiment};

/// Longest topic derived from the input text
const TOPIC_CHARS: usize = 120;

/// verity - Deterministic epistemic evaluation of factual claims
#[derive(Parser, Debug)]
#[command(name = "verity")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate a claim and print the verdict
    Evaluate {
        /// Claim text (reads --input or stdin if not provided)
        #[arg(short, long)]
        text: Option<String>,

        /// Input file
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Read input from stdin
        #[arg(long)]
        stdin: bool,

        /// Evidence fixture (JSON) used instead of the retrieval endpoint
        #[arg(short, long)]
        evidence: Option<PathBuf>,

        /// Use heuristic classifiers only; no network calls
        #[arg(long)]
        offline: bool,

        /// Retrieval topic (derived from the text if not provided)
        #[arg(long)]
        topic: Option<String>,

        /// Write the full analysis bundle to this path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the bundle as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Re-run detection, scoring and explanation from a stored bundle
    Replay {
        /// Bundle JSON file
        bundle: PathBuf,
    },

    /// Check a stored bundle's hashes and invariants
    Verify {
        /// Bundle JSON file
        bundle: PathBuf,
    },

    /// List the score bands
    Bands,

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Evaluate {
                text,
                input,
                stdin,
                evidence,
                offline,
                topic,
                output,
                json,
            } => {
                let text = read_input(text, input, stdin)?;
                let options = EvaluateOptions {
                    evidence,
                    offline,
                    topic,
                    output,
                    json,
                };
                evaluate(&text, options).await
            }
            Commands::Replay { bundle } => replay(&bundle),
            Commands::Verify { bundle } => verify(&bundle),
            Commands::Bands => {
                show_bands();
                Ok(())
            }
            Commands::Config => show_config(),
        }
    }
}

struct EvaluateOptions {
    evidence: Option<PathBuf>,
    offline: bool,
    topic: Option<String>,
    output: Option<PathBuf>,
    json: bool,
}

/// Resolve claim text from the flag, a file, or piped stdin
fn read_input(text: Option<String>, input_file: Option<PathBuf>, use_stdin: bool) -> Result<String> {
    if let Some(text) = text {
        return Ok(text);
    }

    if let Some(path) = input_file {
        return std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read input file: {}", path.display()));
    }

    if use_stdin || !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        return Ok(buffer);
    }

    anyhow::bail!("No input provided. Use --text, --input <file> or pipe to stdin")
}

/// Wire collaborators from configuration and command-line overrides
fn build_orchestrator(cfg: &ResolvedConfig, options: &EvaluateOptions) -> Result<Orchestrator> {
    let retriever: Arc<dyn EvidenceRetriever> = match (&options.evidence, &cfg.retrieval_endpoint) {
        (Some(path), _) => Arc::new(StaticRetriever::from_file(path)?),
        (None, Some(endpoint)) if !options.offline => Arc::new(HttpRetriever::new(endpoint.clone())),
        _ => {
            warn!("No evidence source configured; evaluating without evidence");
            Arc::new(StaticRetriever::default())
        }
    };

    let mut builder = Orchestrator::builder(retriever)
        .settings(cfg.graph.clone())
        .limits(cfg.limits.clone())
        .policy(cfg.policy()?);

    if let Some(llm) = cfg.llm.as_ref().filter(|_| !options.offline) {
        let model: Arc<dyn LanguageModel> = Arc::new(
            HttpLanguageModel::new(llm.endpoint.clone(), llm.model.clone(), llm.api_key())
                .with_request_timeout(cfg.graph.classifier_timeout)?,
        );
        builder = builder.language_model(model);
    }

    Ok(builder.build())
}

async fn evaluate(text: &str, options: EvaluateOptions) -> Result<()> {
    let cfg = config::config()?;
    let orchestrator = build_orchestrator(cfg, &options)?;

    let topic = options
        .topic
        .clone()
        .unwrap_or_else(|| derive_topic(text));

    let bundle = orchestrator
        .evaluate_text(text, &topic)
        .await
        .context("Evaluation failed")?;

    if let Some(ref path) = options.output {
        std::fs::write(path, bundle.to_json_pretty()?)
            .with_context(|| format!("Failed to write bundle: {}", path.display()))?;
        eprintln!("Bundle written to {}", path.display());
    }

    if options.json {
        println!("{}", bundle.to_json_pretty()?);
    } else {
        print_summary(&bundle);
    }

    Ok(())
}

fn derive_topic(text: &str) -> String {
    let line = text.trim().lines().next().unwrap_or_default();
    line.chars().take(TOPIC_CHARS).collect()
}

fn print_summary(bundle: &AnalysisBundle) {
    let scoring = &bundle.scoring.payload;
    let explanation = &bundle.explanation.payload;

    println!("Analysis: {}", bundle.analysis_id);
    println!("Score:    {}/100 ({})", scoring.final_score, scoring.score_band_label);
    println!();
    println!("{}", explanation.explanation_text);
    println!();
    println!("{}", explanation.evidence_summary);
    println!();
    println!("{}", explanation.uncertainty_statement);
    println!();

    println!("Key reasons:");
    for reason in &explanation.key_reasons {
        let marker = match reason.sentiment {
            Sentiment::Positive => "+",
            Sentiment::Negative => "-",
            Sentiment::Neutral => "~",
        };
        println!("  {} {}", marker, reason.text);
    }

    if !scoring.penalties.is_empty() {
        println!();
        println!("{:<24} {:>6}  {}", "PENALTY", "WEIGHT", "RATIONALE");
        println!("{}", "-".repeat(75));
        for penalty in &scoring.penalties {
            println!("{:<24} {:>6}  {}", penalty.name, penalty.weight, penalty.rationale);
        }
    }

    if scoring.corroboration_bonus > 0 {
        println!("Corroboration bonus: +{}", scoring.corroboration_bonus);
    }
    if let Some(ref reason) = scoring.floor_reason {
        println!("Floor applied: {}", reason);
    }
    if let Some(ref reason) = scoring.ceiling_reason {
        println!("Ceiling applied: {}", reason);
    }

    println!();
    println!("Suggestions:");
    for suggestion in &explanation.improvement_suggestions {
        println!("  * {}", suggestion);
    }
}

/// Re-run stages 4 to 6 and fail if the stored result is not reproduced
fn replay(path: &Path) -> Result<()> {
    let cfg = config::config()?;
    let bundle = AnalysisBundle::from_file(path)?;

    let orchestrator = Orchestrator::builder(Arc::new(StaticRetriever::default()))
        .policy(cfg.policy()?)
        .build();
    let report = orchestrator.replay(&bundle)?;

    println!("Analysis:    {}", report.analysis_id);
    println!("Penalties:   {}", if report.penalties_match { "match" } else { "DIFFER" });
    println!("Scoring:     {}", if report.scoring_match { "match" } else { "DIFFER" });
    println!("Explanation: {}", if report.explanation_match { "match" } else { "DIFFER" });
    println!(
        "Score:       stored {} / replayed {}",
        bundle.final_score(),
        report.scoring.final_score
    );

    if !report.reproduced() {
        anyhow::bail!("Replay did not reproduce analysis {}", report.analysis_id);
    }
    Ok(())
}

fn verify(path: &Path) -> Result<()> {
    let bundle = AnalysisBundle::from_file(path)?;
    bundle
        .verify()
        .with_context(|| format!("Bundle {} failed verification", bundle.analysis_id))?;

    println!("Bundle {} verified", bundle.analysis_id);
    println!();
    println!("{:<16} {:>8}  {:<20} {}", "STAGE", "MS", "OUTPUT", "NOTE");
    println!("{}", "-".repeat(75));
    for record in bundle.audit.records() {
        let output = record
            .output_hash
            .as_deref()
            .map(|h| h.chars().take(19).collect::<String>())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<16} {:>8}  {:<20} {}",
            record.stage.as_str(),
            record.duration_ms.unwrap_or(0),
            output,
            record.note.as_deref().unwrap_or("")
        );
    }

    Ok(())
}

fn show_bands() {
    println!("{:<20} {:>5}  {}", "BAND", "MIN", "DESCRIPTION");
    println!("{}", "-".repeat(75));
    for band in ScoreBand::ALL {
        println!("{:<20} {:>5}  {}", band.label(), band.lower_bound(), band.description());
    }
}

fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("Verity Configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Engine:");
    println!("  Retrieval concurrency: {}", cfg.graph.concurrency);
    println!("  Max results per claim: {}", cfg.graph.max_results_per_claim);
    println!("  Retrieval timeout:     {}s", cfg.graph.retrieval_timeout.as_secs());
    println!("  Classifier timeout:    {}s", cfg.graph.classifier_timeout.as_secs());
    println!("  Source batch size:     {}", cfg.graph.source_batch_size);
    println!();
    println!("Input limits:");
    println!("  Max input size: {} bytes", cfg.limits.max_input_bytes);
    println!("  Max claims:     {}", cfg.limits.max_claims);
    println!();
    println!("Collaborators:");
    match cfg.llm {
        Some(ref llm) => println!(
            "  Language model: {} ({}; key in ${}{})",
            llm.endpoint,
            llm.model,
            llm.api_key_env,
            if llm.api_key().is_some() { "" } else { ", unset" }
        ),
        None => println!("  Language model: (none - heuristic classifiers only)"),
    }
    println!(
        "  Retrieval:      {}",
        cfg.retrieval_endpoint.as_deref().unwrap_or("(none)")
    );
    println!(
        "  Policy file:    {}",
        cfg.policy_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(built-in)".to_string())
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_topic_uses_first_line() {
        assert_eq!(derive_topic("  Sea levels are rising.\nMore text"), "Sea levels are rising.");
        assert_eq!(derive_topic(&"x".repeat(500)).len(), TOPIC_CHARS);
    }

    #[test]
    fn test_evaluate_arguments() {
        let cli = Cli::try_parse_from([
            "verity",
            "evaluate",
            "--text",
            "Coffee improves memory.",
            "--offline",
            "--output",
            "bundle.json",
        ])
        .unwrap();

        match cli.command {
            Commands::Evaluate {
                text,
                offline,
                output,
                ..
            } => {
                assert_eq!(text.as_deref(), Some("Coffee improves memory."));
                assert!(offline);
                assert_eq!(output, Some(PathBuf::from("bundle.json")));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
