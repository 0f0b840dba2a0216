use crate::config::{AppConfig, ProviderSettings, Secrets};
use crate::errors::{ConfigError, ProviderError};
use crate::model::LlmResponse;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str, system: Option<&str>) -> anyhow::Result<LlmResponse>;
    fn provider_name(&self) -> &'static str;
}

pub mod anthropic;
pub mod fake;
pub mod openai;

/// The closed set of answer providers a run can query.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    #[serde(rename = "chatgpt")]
    ChatGpt,
    Claude,
    Perplexity,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::ChatGpt, Provider::Claude, Provider::Perplexity];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::ChatGpt => "chatgpt",
            Provider::Claude => "claude",
            Provider::Perplexity => "perplexity",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == s)
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform query capability over every configured provider.
#[async_trait]
pub trait ModelOracle: Send + Sync {
    async fn query(&self, prompt: &str, provider: Provider) -> Result<LlmResponse, ProviderError>;
}

/// One HTTP client for `provider`. `model` overrides the configured answer model.
pub fn build_client(
    provider: Provider,
    settings: &ProviderSettings,
    api_key: &str,
    model: &str,
    temperature: f32,
    max_tokens: u32,
) -> Arc<dyn LlmClient> {
    match provider {
        Provider::ChatGpt | Provider::Perplexity => Arc::new(
            openai::OpenAIClient::new(
                model.to_string(),
                api_key.to_string(),
                temperature,
                max_tokens,
            )
            .with_provider(provider.as_str())
            .with_base_url(settings.base_url.clone()),
        ),
        Provider::Claude => Arc::new(
            anthropic::AnthropicClient::new(
                model.to_string(),
                api_key.to_string(),
                temperature,
                max_tokens,
            )
            .with_base_url(settings.base_url.clone()),
        ),
    }
}

/// Client for auxiliary calls (classification, labelling) on the configured
/// classification provider.
pub fn auxiliary_client(
    cfg: &AppConfig,
    secrets: &Secrets,
    model: &str,
    temperature: f32,
    max_tokens: u32,
) -> Result<Arc<dyn LlmClient>, ConfigError> {
    let provider = cfg.classification.provider;
    let key = secrets.for_provider(provider).ok_or_else(|| {
        ConfigError(format!("no API key for classification provider '{}'", provider))
    })?;
    Ok(build_client(
        provider,
        cfg.providers.settings(provider),
        key,
        model,
        temperature,
        max_tokens,
    ))
}

/// Routes each query to the client registered for its provider.
#[derive(Clone)]
pub struct ProviderRouter {
    chatgpt: Option<Arc<dyn LlmClient>>,
    claude: Option<Arc<dyn LlmClient>>,
    perplexity: Option<Arc<dyn LlmClient>>,
    system_prompt: Option<String>,
    timeout: Duration,
}

impl ProviderRouter {
    pub fn new(timeout: Duration) -> Self {
        Self {
            chatgpt: None,
            claude: None,
            perplexity: None,
            system_prompt: None,
            timeout,
        }
    }

    pub fn with_client(mut self, provider: Provider, client: Arc<dyn LlmClient>) -> Self {
        *self.slot_mut(provider) = Some(client);
        self
    }

    pub fn with_system_prompt(mut self, system: impl Into<String>) -> Self {
        self.system_prompt = Some(system.into());
        self
    }

    /// Builds HTTP clients for every provider that has an API key in `secrets`.
    pub fn from_config(cfg: &AppConfig, secrets: &Secrets) -> Self {
        let p = &cfg.providers;
        let mut router = Self::new(Duration::from_secs(cfg.pipeline.timeout_seconds))
            .with_system_prompt(p.system_prompt.clone());

        for provider in Provider::ALL {
            let Some(key) = secrets.for_provider(provider) else {
                tracing::debug!(event = "aisov.provider.skipped", provider = %provider, "no api key configured");
                continue;
            };
            let client = build_client(
                provider,
                p.settings(provider),
                key,
                &p.settings(provider).model,
                p.temperature,
                p.max_tokens,
            );
            router = router.with_client(provider, client);
        }
        router
    }

    pub fn configured(&self) -> Vec<Provider> {
        Provider::ALL
            .into_iter()
            .filter(|p| self.slot(*p).is_some())
            .collect()
    }

    fn slot(&self, provider: Provider) -> &Option<Arc<dyn LlmClient>> {
        match provider {
            Provider::ChatGpt => &self.chatgpt,
            Provider::Claude => &self.claude,
            Provider::Perplexity => &self.perplexity,
        }
    }

    fn slot_mut(&mut self, provider: Provider) -> &mut Option<Arc<dyn LlmClient>> {
        match provider {
            Provider::ChatGpt => &mut self.chatgpt,
            Provider::Claude => &mut self.claude,
            Provider::Perplexity => &mut self.perplexity,
        }
    }
}

#[async_trait]
impl ModelOracle for ProviderRouter {
    async fn query(&self, prompt: &str, provider: Provider) -> Result<LlmResponse, ProviderError> {
        let client = self
            .slot(provider)
            .as_ref()
            .ok_or_else(|| ProviderError::new(provider.as_str(), "provider is not configured"))?;

        let fut = client.complete(prompt, self.system_prompt.as_deref());
        let mut resp = match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(r)) => r,
            Ok(Err(e)) => return Err(ProviderError::new(provider.as_str(), format!("{:#}", e))),
            Err(_) => {
                return Err(ProviderError::new(
                    provider.as_str(),
                    format!("timed out after {}s", self.timeout.as_secs()),
                ))
            }
        };
        resp.provider = provider.as_str().to_string();
        Ok(resp)
    }
}
