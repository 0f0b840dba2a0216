use super::LlmClient;
use crate::model::LlmResponse;
use async_trait::async_trait;
use serde_json::json;
use std::time::Instant;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicClient {
    pub model: String,
    pub api_key: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub base_url: String,
    pub client: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(model: String, api_key: String, temperature: f32, max_tokens: u32) -> Self {
        Self {
            model,
            api_key,
            temperature,
            max_tokens,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        if let Some(url) = base_url {
            self.base_url = url.trim_end_matches('/').to_string();
        }
        self
    }
}

/// Concatenates every text block of a Messages API reply.
fn collect_text(json: &serde_json::Value) -> Option<String> {
    let blocks = json.get("content")?.as_array()?;
    Some(
        blocks
            .iter()
            .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
            .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
            .collect::<Vec<_>>()
            .join(""),
    )
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, prompt: &str, system: Option<&str>) -> anyhow::Result<LlmResponse> {
        let url = format!("{}/messages", self.base_url);

        let mut body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "messages": [{ "role": "user", "content": prompt }],
        });
        if let Some(sys) = system {
            body["system"] = json!(sys);
        }

        let started = Instant::now();
        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Anthropic messages API error ({}): {}", status, error_text);
        }

        let json: serde_json::Value = resp.json().await?;
        let latency_ms = started.elapsed().as_millis() as u64;

        let text = collect_text(&json)
            .ok_or_else(|| anyhow::anyhow!("Anthropic API response missing content"))?;

        let input = json.pointer("/usage/input_tokens").and_then(|v| v.as_u64());
        let output = json.pointer("/usage/output_tokens").and_then(|v| v.as_u64());
        let token_count = match (input, output) {
            (Some(i), Some(o)) => Some((i + o) as u32),
            _ => None,
        };

        Ok(LlmResponse {
            text,
            provider: "claude".to_string(),
            model: self.model.clone(),
            token_count,
            latency_ms,
            meta: json!({ "stop_reason": json.get("stop_reason").cloned() }),
        })
    }

    fn provider_name(&self) -> &'static str {
        "claude"
    }
}
