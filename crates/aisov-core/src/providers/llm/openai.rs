use super::LlmClient;
use crate::model::LlmResponse;
use async_trait::async_trait;
use serde_json::json;
use std::time::Instant;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat-completions client. Also serves OpenAI-compatible endpoints (Perplexity).
pub struct OpenAIClient {
    pub model: String,
    pub api_key: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub base_url: String,
    pub provider: &'static str,
    pub client: reqwest::Client,
}

impl OpenAIClient {
    pub fn new(model: String, api_key: String, temperature: f32, max_tokens: u32) -> Self {
        Self {
            model,
            api_key,
            temperature,
            max_tokens,
            base_url: DEFAULT_BASE_URL.to_string(),
            provider: "chatgpt",
            client: reqwest::Client::new(),
        }
    }

    pub fn with_provider(mut self, provider: &'static str) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        if let Some(url) = base_url {
            self.base_url = url.trim_end_matches('/').to_string();
        }
        self
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(&self, prompt: &str, system: Option<&str>) -> anyhow::Result<LlmResponse> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut messages = Vec::new();
        if let Some(sys) = system {
            messages.push(json!({ "role": "system", "content": sys }));
        }
        messages.push(json!({ "role": "user", "content": prompt }));

        let body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let started = Instant::now();
        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            anyhow::bail!("{} chat API error ({}): {}", self.provider, status, error_text);
        }

        let json: serde_json::Value = resp.json().await?;
        let latency_ms = started.elapsed().as_millis() as u64;

        // Null content is an empty answer, not an error.
        let text = json
            .pointer("/choices/0/message/content")
            .map(|v| v.as_str().unwrap_or_default().to_string())
            .ok_or_else(|| anyhow::anyhow!("{} API response missing content", self.provider))?;

        let token_count = json
            .pointer("/usage/total_tokens")
            .and_then(|v| v.as_u64())
            .map(|t| t as u32);

        Ok(LlmResponse {
            text,
            provider: self.provider.to_string(),
            model: self.model.clone(),
            token_count,
            latency_ms,
            meta: json!({}),
        })
    }

    fn provider_name(&self) -> &'static str {
        self.provider
    }
}
