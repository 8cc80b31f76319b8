//! Configuration for the evaluation engine.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (VERITY_LLM_ENDPOINT, VERITY_LLM_MODEL, VERITY_RETRIEVAL_ENDPOINT)
//! 2. Config file (.verity/config.yaml)
//! 3. Defaults
//!
//! Config file discovery:
//! - VERITY_CONFIG names the file explicitly
//! - Otherwise searches current directory and parents for .verity/config.yaml
//! - Falls back to ~/.verity/config.yaml
//! - `policy_file` is relative to the directory holding config.yaml

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::{ExplanationPolicy, GraphSettings, InputLimits};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_API_KEY_ENV: &str = "VERITY_LLM_API_KEY";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub limits: Option<InputLimits>,
    #[serde(default)]
    pub llm: Option<LlmConfig>,
    #[serde(default)]
    pub retrieval: Option<RetrievalConfig>,
    #[serde(default)]
    pub policy_file: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    pub retrieval_concurrency: Option<usize>,
    pub max_results_per_claim: Option<usize>,
    pub retrieval_timeout_seconds: Option<u64>,
    pub classifier_timeout_seconds: Option<u64>,
    pub source_batch_size: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LlmConfig {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    /// Name of the environment variable holding the API key
    pub api_key_env: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetrievalConfig {
    pub endpoint: Option<String>,
}

/// Language model settings; present only when an endpoint is configured
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LlmSettings {
    pub endpoint: String,
    pub model: String,
    pub api_key_env: String,
}

impl LlmSettings {
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty())
    }
}

/// Resolved configuration
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub graph: GraphSettings,
    pub limits: InputLimits,
    pub llm: Option<LlmSettings>,
    pub retrieval_endpoint: Option<String>,
    /// Absolute path to the explanation policy override
    pub policy_file: Option<PathBuf>,
}

impl ResolvedConfig {
    /// The configured explanation policy, or the built-in one
    pub fn policy(&self) -> Result<ExplanationPolicy> {
        match self.policy_file {
            Some(ref path) => ExplanationPolicy::from_file(path),
            None => Ok(ExplanationPolicy::default()),
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    if let Ok(explicit) = std::env::var("VERITY_CONFIG") {
        return Some(PathBuf::from(explicit));
    }

    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".verity").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    dirs::home_dir()
        .map(|home| home.join(".verity").join("config.yaml"))
        .filter(|path| path.exists())
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Merge a parsed file (if any) with environment overrides
fn resolve(
    config_file: Option<PathBuf>,
    file: ConfigFile,
    env: impl Fn(&str) -> Option<String>,
) -> ResolvedConfig {
    let defaults = GraphSettings::default();
    let engine = file.engine;
    let graph = GraphSettings {
        concurrency: engine.retrieval_concurrency.unwrap_or(defaults.concurrency),
        max_results_per_claim: engine
            .max_results_per_claim
            .unwrap_or(defaults.max_results_per_claim),
        retrieval_timeout: engine
            .retrieval_timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(defaults.retrieval_timeout),
        classifier_timeout: engine
            .classifier_timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(defaults.classifier_timeout),
        source_batch_size: engine
            .source_batch_size
            .unwrap_or(defaults.source_batch_size),
    };

    let llm_file = file.llm.unwrap_or_default();
    let llm = env("VERITY_LLM_ENDPOINT")
        .or(llm_file.endpoint)
        .map(|endpoint| LlmSettings {
            endpoint,
            model: env("VERITY_LLM_MODEL")
                .or(llm_file.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key_env: llm_file
                .api_key_env
                .unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string()),
        });

    let retrieval_endpoint = env("VERITY_RETRIEVAL_ENDPOINT")
        .or(file.retrieval.and_then(|r| r.endpoint));

    let config_dir = config_file
        .as_deref()
        .and_then(Path::parent)
        .unwrap_or(Path::new("."));
    let policy_file = file
        .policy_file
        .map(|p| resolve_path(config_dir, &p));

    ResolvedConfig {
        config_file,
        graph,
        limits: file.limits.unwrap_or_default(),
        llm,
        retrieval_endpoint,
        policy_file,
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let config_file = find_config_file();
    let file = match config_file {
        Some(ref path) => load_config_file(path)?,
        None => ConfigFile::default(),
    };

    Ok(resolve(config_file, file, |key| {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }))
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_without_file() {
        let config = resolve(None, ConfigFile::default(), no_env);

        assert_eq!(config.graph.concurrency, 2);
        assert_eq!(config.graph.max_results_per_claim, 8);
        assert_eq!(config.graph.retrieval_timeout, Duration::from_secs(20));
        assert_eq!(config.graph.classifier_timeout, Duration::from_secs(15));
        assert_eq!(config.limits.max_input_bytes, 20_000);
        assert!(config.llm.is_none());
        assert!(config.policy_file.is_none());
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let verity_dir = temp.path().join(".verity");
        std::fs::create_dir_all(&verity_dir).unwrap();

        let config_path = verity_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1.0"
engine:
  retrieval_concurrency: 4
  classifier_timeout_seconds: 5
limits:
  max_claims: 3
llm:
  endpoint: http://localhost:8080/v1/chat/completions
  model: local-model
retrieval:
  endpoint: http://localhost:9090/search
policy_file: policy.yaml
"#
        )
        .unwrap();

        let parsed = load_config_file(&config_path).unwrap();
        let config = resolve(Some(config_path), parsed, no_env);

        assert_eq!(config.graph.concurrency, 4);
        assert_eq!(config.graph.classifier_timeout, Duration::from_secs(5));
        assert_eq!(config.graph.source_batch_size, 10);
        assert_eq!(config.limits.max_claims, 3);
        assert_eq!(config.limits.max_input_bytes, 20_000);

        let llm = config.llm.unwrap();
        assert_eq!(llm.model, "local-model");
        assert_eq!(llm.api_key_env, DEFAULT_API_KEY_ENV);
        assert_eq!(
            config.retrieval_endpoint.as_deref(),
            Some("http://localhost:9090/search")
        );
        assert_eq!(config.policy_file, Some(verity_dir.join("policy.yaml")));
    }

    #[test]
    fn test_env_overrides_file() {
        let file: ConfigFile = serde_yaml::from_str(
            "llm:\n  endpoint: http://file/v1\n  model: file-model\n",
        )
        .unwrap();

        let config = resolve(None, file, |key| match key {
            "VERITY_LLM_MODEL" => Some("env-model".to_string()),
            "VERITY_RETRIEVAL_ENDPOINT" => Some("http://env/search".to_string()),
            _ => None,
        });

        let llm = config.llm.unwrap();
        assert_eq!(llm.endpoint, "http://file/v1");
        assert_eq!(llm.model, "env-model");
        assert_eq!(config.retrieval_endpoint.as_deref(), Some("http://env/search"));
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "./subdir"),
            PathBuf::from("/home/user/project/subdir")
        );
        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
    }

    #[test]
    fn test_missing_policy_file_is_an_error() {
        let mut config = resolve(None, ConfigFile::default(), no_env);
        assert!(config.policy().is_ok());

        config.policy_file = Some(PathBuf::from("/nonexistent/policy.yaml"));
        assert!(config.policy().is_err());
    }
}
