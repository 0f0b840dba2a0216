use crate::errors::ConfigError;
use crate::providers::llm::Provider;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;

/// Immutable configuration snapshot. Built once per process and passed by reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub brand: BrandConfig,
    #[serde(default)]
    pub scoring: ScoringWeights,
    #[serde(default)]
    pub clustering: ClusteringConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub classification: ClassificationConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: SUPPORTED_CONFIG_VERSION,
            brand: BrandConfig::default(),
            scoring: ScoringWeights::default(),
            clustering: ClusteringConfig::default(),
            providers: ProvidersConfig::default(),
            classification: ClassificationConfig::default(),
            pipeline: PipelineConfig::default(),
            log_level: default_log_level(),
        }
    }
}

fn default_version() -> u32 {
    SUPPORTED_CONFIG_VERSION
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrandConfig {
    pub primary: String,
    #[serde(default)]
    pub competitors: Vec<String>,
}

impl Default for BrandConfig {
    fn default() -> Self {
        Self {
            primary: "HubSpot".to_string(),
            competitors: ["Salesforce", "Zoho", "Pipedrive", "Marketo", "ActiveCampaign"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// AISOV component weights. Not required to sum to 1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringWeights {
    pub mention_rate: f64,
    pub rank_score: f64,
    pub sentiment: f64,
    pub recommendation: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            mention_rate: 0.30,
            rank_score: 0.25,
            sentiment: 0.25,
            recommendation: 0.20,
        }
    }
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.mention_rate + self.rank_score + self.sentiment + self.recommendation
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClusterAlgorithm {
    #[default]
    Hdbscan,
    Kmeans,
}

impl ClusterAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterAlgorithm::Hdbscan => "hdbscan",
            ClusterAlgorithm::Kmeans => "kmeans",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "hdbscan" => Some(ClusterAlgorithm::Hdbscan),
            "kmeans" => Some(ClusterAlgorithm::Kmeans),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClusteringConfig {
    pub algorithm: ClusterAlgorithm,
    pub n_clusters: usize,
    pub min_cluster_size: usize,
    pub embedding_model: String,
    pub label_samples: usize,
    pub label_model: String,
    pub seed: u64,
    pub n_init: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            algorithm: ClusterAlgorithm::Hdbscan,
            n_clusters: 6,
            min_cluster_size: 5,
            embedding_model: "text-embedding-3-small".to_string(),
            label_samples: 5,
            label_model: "gpt-4o-mini".to_string(),
            seed: 42,
            n_init: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderSettings {
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProvidersConfig {
    pub chatgpt: ProviderSettings,
    pub claude: ProviderSettings,
    pub perplexity: ProviderSettings,
    pub temperature: f32,
    pub max_tokens: u32,
    pub system_prompt: String,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            chatgpt: ProviderSettings {
                model: "gpt-4o".to_string(),
                base_url: None,
            },
            claude: ProviderSettings {
                model: "claude-sonnet-4-20250514".to_string(),
                base_url: None,
            },
            perplexity: ProviderSettings {
                model: "sonar-pro".to_string(),
                base_url: Some("https://api.perplexity.ai".to_string()),
            },
            temperature: 0.3,
            max_tokens: 2048,
            system_prompt: "You are a helpful assistant that provides detailed, factual answers \
                            about software tools, CRM platforms, and marketing technology."
                .to_string(),
        }
    }
}

impl ProvidersConfig {
    pub fn settings(&self, provider: Provider) -> &ProviderSettings {
        match provider {
            Provider::ChatGpt => &self.chatgpt,
            Provider::Claude => &self.claude,
            Provider::Perplexity => &self.perplexity,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassificationConfig {
    pub provider: Provider,
    pub model: String,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            provider: Provider::ChatGpt,
            model: "gpt-4o-mini".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub batch_size: usize,
    pub retry_limit: u32,
    pub retry_backoff_ms: u64,
    pub timeout_seconds: u64,
    pub max_concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            retry_limit: 3,
            retry_backoff_ms: 500,
            timeout_seconds: 120,
            max_concurrency: 1,
        }
    }
}

/// API credentials. Read from the environment only, never from the config file.
#[derive(Clone, Default)]
pub struct Secrets {
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub perplexity_api_key: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        let read = |k: &str| std::env::var(k).ok().filter(|v| !v.trim().is_empty());
        Self {
            openai_api_key: read("OPENAI_API_KEY"),
            anthropic_api_key: read("ANTHROPIC_API_KEY"),
            perplexity_api_key: read("PERPLEXITY_API_KEY"),
        }
    }

    pub fn for_provider(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::ChatGpt => self.openai_api_key.as_deref(),
            Provider::Claude => self.anthropic_api_key.as_deref(),
            Provider::Perplexity => self.perplexity_api_key.as_deref(),
        }
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |v: &Option<String>| if v.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("Secrets")
            .field("openai_api_key", &mask(&self.openai_api_key))
            .field("anthropic_api_key", &mask(&self.anthropic_api_key))
            .field("perplexity_api_key", &mask(&self.perplexity_api_key))
            .finish()
    }
}

pub fn load_config(path: &Path, strict: bool) -> Result<AppConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;
    parse_config(&raw, strict, |k| std::env::var(k).ok())
        .map_err(|e| ConfigError(format!("{} (file: {})", e.0, path.display())))
}

/// Parses YAML, reports unknown keys, applies env overrides and validates.
pub fn parse_config<F>(raw: &str, strict: bool, env: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut ignored_keys = std::collections::BTreeSet::new();
    let deserializer = serde_yaml::Deserializer::from_str(raw);

    let cfg: AppConfig = serde_ignored::deserialize(deserializer, |path| {
        ignored_keys.insert(path.to_string());
    })
    .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;

    let unknown: Vec<_> = ignored_keys
        .iter()
        .filter(|k| !k.starts_with('_') && !k.starts_with("x-"))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        if strict {
            return Err(ConfigError(format!(
                "unknown fields detected in strict mode: {:?}",
                unknown
            )));
        }
        tracing::warn!(event = "aisov.config.unknown_fields", fields = ?unknown, "ignored unknown config fields");
    }

    if cfg.version != SUPPORTED_CONFIG_VERSION {
        return Err(ConfigError(format!(
            "unsupported config version {} (supported: {})",
            cfg.version, SUPPORTED_CONFIG_VERSION
        )));
    }

    let cfg = apply_env_overrides(cfg, env)?;
    validate(&cfg)?;
    Ok(cfg)
}

pub fn apply_env_overrides<F>(mut cfg: AppConfig, env: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let weight = |key: &str, slot: &mut f64| -> Result<(), ConfigError> {
        if let Some(v) = env(key) {
            *slot = v
                .trim()
                .parse()
                .map_err(|_| ConfigError(format!("{} must be a number, got '{}'", key, v)))?;
        }
        Ok(())
    };
    weight("AISOV_W_MENTION", &mut cfg.scoring.mention_rate)?;
    weight("AISOV_W_RANK", &mut cfg.scoring.rank_score)?;
    weight("AISOV_W_SENTIMENT", &mut cfg.scoring.sentiment)?;
    weight("AISOV_W_RECOMMENDATION", &mut cfg.scoring.recommendation)?;

    if let Some(v) = env("AISOV_CLUSTER_ALGO") {
        cfg.clustering.algorithm = ClusterAlgorithm::parse(v.trim())
            .ok_or_else(|| ConfigError(format!("AISOV_CLUSTER_ALGO: unknown algorithm '{}'", v)))?;
    }
    if let Some(v) = env("AISOV_BATCH_SIZE") {
        cfg.pipeline.batch_size = v
            .trim()
            .parse()
            .map_err(|_| ConfigError(format!("AISOV_BATCH_SIZE must be an integer, got '{}'", v)))?;
    }
    Ok(cfg)
}

pub fn validate(cfg: &AppConfig) -> Result<(), ConfigError> {
    if cfg.brand.primary.trim().is_empty() {
        return Err(ConfigError("brand.primary must not be empty".into()));
    }
    let w = &cfg.scoring;
    for (name, v) in [
        ("mention_rate", w.mention_rate),
        ("rank_score", w.rank_score),
        ("sentiment", w.sentiment),
        ("recommendation", w.recommendation),
    ] {
        if !v.is_finite() || v < 0.0 {
            return Err(ConfigError(format!(
                "scoring.{} must be a finite, non-negative number (got {})",
                name, v
            )));
        }
    }
    if cfg.clustering.n_clusters < 2 {
        return Err(ConfigError("clustering.n_clusters must be at least 2".into()));
    }
    if cfg.clustering.min_cluster_size < 2 {
        return Err(ConfigError("clustering.min_cluster_size must be at least 2".into()));
    }
    if cfg.clustering.n_init == 0 || cfg.clustering.label_samples == 0 {
        return Err(ConfigError(
            "clustering.n_init and clustering.label_samples must be at least 1".into(),
        ));
    }
    if cfg.pipeline.batch_size == 0 {
        return Err(ConfigError("pipeline.batch_size must be at least 1".into()));
    }
    if cfg.pipeline.retry_limit == 0 {
        return Err(ConfigError("pipeline.retry_limit must be at least 1".into()));
    }
    if cfg.pipeline.max_concurrency == 0 {
        return Err(ConfigError("pipeline.max_concurrency must be at least 1".into()));
    }
    Ok(())
}

pub const SAMPLE_CONFIG: &str = r#"version: 1
brand:
  primary: HubSpot
  competitors: [Salesforce, Zoho, Pipedrive, Marketo, ActiveCampaign]
scoring:
  mention_rate: 0.30
  rank_score: 0.25
  sentiment: 0.25
  recommendation: 0.20
clustering:
  algorithm: hdbscan
  n_clusters: 6
  min_cluster_size: 5
  embedding_model: text-embedding-3-small
classification:
  provider: chatgpt
  model: gpt-4o-mini
pipeline:
  batch_size: 10
  retry_limit: 3
  timeout_seconds: 120
  max_concurrency: 1
log_level: info
"#;
