pub mod parse;
pub mod prompt;

use crate::config::BrandConfig;
use crate::errors::{ClassifyError, ProviderError};
use crate::model::{ContextType, Sentiment, VisibilityMetric};
use crate::providers::llm::LlmClient;
use parse::{extract_json, validate_and_normalise, ValidationDefault};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

pub const FALLBACK_MODEL: &str = "fallback";
pub const CLASSIFY_TEMPERATURE: f32 = 0.0;
pub const CLASSIFY_MAX_TOKENS: u32 = 512;

#[derive(Debug, Clone)]
pub struct Classified {
    pub metric: VisibilityMetric,
    pub defaults: Vec<ValidationDefault>,
}

/// Result for one batch item. Fallbacks keep the batch aligned with its input.
#[derive(Debug, Clone)]
pub enum ClassifyOutcome {
    Classified(Classified),
    Fallback {
        metric: VisibilityMetric,
        reason: String,
    },
}

impl ClassifyOutcome {
    pub fn metric(&self) -> &VisibilityMetric {
        match self {
            ClassifyOutcome::Classified(c) => &c.metric,
            ClassifyOutcome::Fallback { metric, .. } => metric,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ClassifyOutcome::Fallback { .. })
    }
}

/// Turns (prompt, answer) pairs into visibility metrics for one brand.
///
/// `client` must already be configured for classification
/// (temperature [`CLASSIFY_TEMPERATURE`], [`CLASSIFY_MAX_TOKENS`] tokens).
#[derive(Clone)]
pub struct Classifier {
    client: Arc<dyn LlmClient>,
    model: String,
    brand: String,
    system: String,
    timeout: Duration,
}

impl Classifier {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>, brand: &BrandConfig) -> Self {
        Self {
            client,
            model: model.into(),
            brand: brand.primary.clone(),
            system: prompt::system_prompt(&brand.primary, &brand.competitors),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn brand(&self) -> &str {
        &self.brand
    }

    pub async fn classify(
        &self,
        prompt_text: &str,
        response_text: &str,
    ) -> Result<Classified, ClassifyError> {
        let provider = self.client.provider_name();
        let user = prompt::user_prompt(prompt_text, response_text);
        let fut = self.client.complete(&user, Some(&self.system));
        let resp = match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(r)) => r,
            Ok(Err(e)) => return Err(ProviderError::new(provider, format!("{:#}", e)).into()),
            Err(_) => {
                return Err(ProviderError::new(
                    provider,
                    format!("classification timed out after {}s", self.timeout.as_secs()),
                )
                .into())
            }
        };

        let raw = extract_json(&resp.text)?;
        let n = validate_and_normalise(&raw);
        if !n.defaults.is_empty() {
            tracing::debug!(
                event = "aisov.classify.defaults",
                defaults = ?n.defaults,
                "validation substituted defaults"
            );
        }

        Ok(Classified {
            metric: VisibilityMetric {
                brand_name: self.brand.clone(),
                brand_mentioned: n.brand_mentioned,
                rank_position: n.rank_position,
                sentiment: n.sentiment,
                context_type: n.context_type,
                recommendation_strength: n.recommendation_strength,
                competitor_mentioned: n.competitor_mentioned,
                competitors: n.competitors,
                classification_model: self.model.clone(),
                classification_confidence: n.confidence,
                raw_classification: Value::Object(raw),
            },
            defaults: n.defaults,
        })
    }

    /// Classifies items in order. Never fails as a whole: an item that cannot be
    /// classified becomes a fallback at the same position.
    pub async fn classify_batch(&self, items: &[(&str, &str)]) -> Vec<ClassifyOutcome> {
        let mut out = Vec::with_capacity(items.len());
        for (idx, (prompt_text, response_text)) in items.iter().enumerate() {
            match self.classify(prompt_text, response_text).await {
                Ok(c) => out.push(ClassifyOutcome::Classified(c)),
                Err(e) => {
                    let reason = e.to_string();
                    tracing::warn!(
                        event = "aisov.classify.fallback",
                        index = idx,
                        prompt = %truncate(prompt_text, 60),
                        error = %reason,
                        "classification failed; using fallback"
                    );
                    out.push(ClassifyOutcome::Fallback {
                        metric: fallback_metric(&self.brand, &reason),
                        reason,
                    });
                }
            }
        }
        out
    }
}

/// All-default metric used in place of a failed classification.
pub fn fallback_metric(brand: &str, reason: &str) -> VisibilityMetric {
    VisibilityMetric {
        brand_name: brand.to_string(),
        brand_mentioned: false,
        rank_position: None,
        sentiment: Sentiment::Neutral,
        context_type: ContextType::Neutral,
        recommendation_strength: 0.0,
        competitor_mentioned: false,
        competitors: BTreeSet::new(),
        classification_model: FALLBACK_MODEL.to_string(),
        classification_confidence: 0.0,
        raw_classification: json!({ "error": "classification_failed", "reason": reason }),
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((i, _)) => format!("{}…", &s[..i]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::llm::fake::ScriptedClient;

    fn brand() -> BrandConfig {
        BrandConfig {
            primary: "HubSpot".into(),
            competitors: vec!["Zoho".into(), "Salesforce".into()],
        }
    }

    const GOOD: &str = r#"{"brand_mentioned": true, "rank_position": 1, "sentiment": "positive",
        "context_type": "recommendation", "recommendation_strength": 0.9,
        "competitor_mentioned": true, "competitors_list": ["Zoho"], "confidence": 0.8}"#;

    #[tokio::test]
    async fn classify_builds_metric_from_reply() {
        let client = Arc::new(ScriptedClient::always(format!("```json\n{}\n```", GOOD)));
        let c = Classifier::new(client.clone(), "gpt-4o-mini", &brand());

        let out = c.classify("best crm?", "HubSpot is best").await.unwrap();
        assert!(out.defaults.is_empty());
        let m = out.metric;
        assert_eq!(m.brand_name, "HubSpot");
        assert!(m.brand_mentioned);
        assert_eq!(m.rank_position, Some(1));
        assert_eq!(m.classification_model, "gpt-4o-mini");
        assert_eq!(m.classification_confidence, 0.8);
        assert_eq!(m.raw_classification["sentiment"], "positive");

        let sent = client.prompts();
        assert!(sent[0].contains("best crm?"));
        assert!(sent[0].contains("HubSpot is best"));
    }

    #[tokio::test]
    async fn unparsable_reply_is_parse_error() {
        let c = Classifier::new(
            Arc::new(ScriptedClient::always("Sure! HubSpot ranks first.")),
            "m",
            &brand(),
        );
        let err = c.classify("q", "a").await.unwrap_err();
        assert!(matches!(err, ClassifyError::Parse(_)));
    }

    #[tokio::test]
    async fn batch_preserves_length_and_order_under_failures() {
        let client = Arc::new(ScriptedClient::sequence(vec![
            Ok(GOOD.to_string()),
            Err("upstream 500".to_string()),
            Ok("not json".to_string()),
            Ok(GOOD.replace("\"rank_position\": 1", "\"rank_position\": 3")),
        ]));
        let c = Classifier::new(client, "m", &brand());
        let items = [("p0", "r0"), ("p1", "r1"), ("p2", "r2"), ("p3", "r3")];

        let out = c.classify_batch(&items).await;
        assert_eq!(out.len(), 4);
        assert!(!out[0].is_fallback());
        assert!(out[1].is_fallback());
        assert!(out[2].is_fallback());
        assert_eq!(out[3].metric().rank_position, Some(3));

        let fb = out[1].metric();
        assert_eq!(fb.classification_model, FALLBACK_MODEL);
        assert_eq!(fb.classification_confidence, 0.0);
        assert_eq!(fb.raw_classification["error"], "classification_failed");
        assert!(fb.raw_classification["reason"]
            .as_str()
            .unwrap()
            .contains("upstream 500"));
        assert!(!fb.brand_mentioned);
        assert_eq!(fb.sentiment, Sentiment::Neutral);
    }

    #[tokio::test]
    async fn empty_batch_is_empty() {
        let c = Classifier::new(Arc::new(ScriptedClient::always(GOOD)), "m", &brand());
        assert!(c.classify_batch(&[]).await.is_empty());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé…");
        assert_eq!(truncate("hi", 10), "hi");
    }
}
