use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    GenericDiscovery,
    Comparison,
    BuyingIntent,
    Alternatives,
    SegmentSpecific,
    RiskCriticism,
}

impl IntentCategory {
    pub const ALL: [IntentCategory; 6] = [
        IntentCategory::GenericDiscovery,
        IntentCategory::Comparison,
        IntentCategory::BuyingIntent,
        IntentCategory::Alternatives,
        IntentCategory::SegmentSpecific,
        IntentCategory::RiskCriticism,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentCategory::GenericDiscovery => "generic_discovery",
            IntentCategory::Comparison => "comparison",
            IntentCategory::BuyingIntent => "buying_intent",
            IntentCategory::Alternatives => "alternatives",
            IntentCategory::SegmentSpecific => "segment_specific",
            IntentCategory::RiskCriticism => "risk_criticism",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

impl std::fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prompt {
    pub id: i64,
    pub text: String,
    pub intent_category: IntentCategory,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "positive" => Some(Sentiment::Positive),
            "neutral" => Some(Sentiment::Neutral),
            "negative" => Some(Sentiment::Negative),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContextType {
    Recommendation,
    Comparison,
    Criticism,
    #[default]
    Neutral,
    Alternative,
}

impl ContextType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextType::Recommendation => "recommendation",
            ContextType::Comparison => "comparison",
            ContextType::Criticism => "criticism",
            ContextType::Neutral => "neutral",
            ContextType::Alternative => "alternative",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "recommendation" => Some(ContextType::Recommendation),
            "comparison" => Some(ContextType::Comparison),
            "criticism" => Some(ContextType::Criticism),
            "neutral" => Some(ContextType::Neutral),
            "alternative" => Some(ContextType::Alternative),
            _ => None,
        }
    }
}

/// Normalised envelope returned by every LLM client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub token_count: Option<u32>,
    #[serde(default)]
    pub latency_ms: u64,
    #[serde(default)]
    pub meta: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseRow {
    pub id: String,
    pub prompt_id: i64,
    pub provider_name: String,
    pub model_version: String,
    pub text: String,
    pub token_count: Option<u32>,
    pub latency_ms: u64,
    pub run_id: Option<Uuid>,
}

/// A persisted response still waiting for its metric.
#[derive(Debug, Clone)]
pub struct UnclassifiedResponse {
    pub response_id: String,
    pub prompt_id: i64,
    pub provider_name: String,
    pub prompt_text: String,
    pub response_text: String,
    pub intent_category: IntentCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VisibilityMetric {
    pub brand_name: String,
    pub brand_mentioned: bool,
    pub rank_position: Option<u32>,
    pub sentiment: Sentiment,
    pub context_type: ContextType,
    pub recommendation_strength: f64,
    pub competitor_mentioned: bool,
    pub competitors: BTreeSet<String>,
    pub classification_model: String,
    pub classification_confidence: f64,
    #[serde(default)]
    pub raw_classification: serde_json::Value,
}

/// A metric joined with the grouping columns needed for scoring.
#[derive(Debug, Clone)]
pub struct MetricRow {
    pub metric_id: i64,
    pub response_id: String,
    pub provider_name: String,
    pub intent_category: IntentCategory,
    pub metric: VisibilityMetric,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VisibilityScore {
    pub brand_name: String,
    pub provider_name: Option<String>,
    pub intent_category: Option<IntentCategory>,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub mention_rate: f64,
    pub avg_rank_score: f64,
    pub positive_sentiment_ratio: f64,
    pub recommendation_strength_avg: f64,
    pub aisov: f64,
    pub sample_size: u64,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterAssignment {
    pub prompt_id: i64,
    pub cluster_label: String,
    pub cluster_number: i32,
    pub embedding: Vec<f32>,
    pub algorithm: String,
    pub silhouette_score: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(RunStatus::Running),
            "completed" => Some(RunStatus::Completed),
            "failed" => Some(RunStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub prompts_count: u64,
    pub responses_count: u64,
    pub error_message: Option<String>,
}
