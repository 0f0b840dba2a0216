use super::LlmClient;
use crate::model::LlmResponse;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

type Responder = Box<dyn Fn(&str) -> Result<String, String> + Send + Sync>;

enum Script {
    Responder(Responder),
    Queue(Mutex<VecDeque<Result<String, String>>>),
}

/// Deterministic offline client for tests and dry runs.
pub struct ScriptedClient {
    script: Script,
    model: String,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&str) -> Result<String, String> + Send + Sync + 'static,
    {
        Self {
            script: Script::Responder(Box::new(f)),
            model: "scripted".to_string(),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn always(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::from_fn(move |_| Ok(text.clone()))
    }

    pub fn failing(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::from_fn(move |_| Err(message.clone()))
    }

    /// Replies in order; errors once the queue is exhausted.
    pub fn sequence(replies: Vec<Result<String, String>>) -> Self {
        Self {
            script: Script::Queue(Mutex::new(replies.into())),
            model: "scripted".to_string(),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.seen.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn complete(&self, prompt: &str, _system: Option<&str>) -> anyhow::Result<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(prompt.to_string());
        }

        let reply = match &self.script {
            Script::Responder(f) => f(prompt),
            Script::Queue(q) => q
                .lock()
                .map_err(|_| anyhow::anyhow!("scripted queue poisoned"))?
                .pop_front()
                .unwrap_or_else(|| Err("script exhausted".to_string())),
        };

        match reply {
            Ok(text) => Ok(LlmResponse {
                token_count: Some(text.split_whitespace().count() as u32),
                text,
                provider: "scripted".to_string(),
                model: self.model.clone(),
                latency_ms: 0,
                meta: serde_json::json!({}),
            }),
            Err(e) => anyhow::bail!(e),
        }
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sequence_replays_then_errors() {
        let c = ScriptedClient::sequence(vec![Ok("a".into()), Err("boom".into())]);
        assert_eq!(c.complete("p1", None).await.unwrap().text, "a");
        assert!(c.complete("p2", None).await.is_err());
        assert!(c.complete("p3", None).await.is_err());
        assert_eq!(c.calls(), 3);
        assert_eq!(c.prompts(), vec!["p1", "p2", "p3"]);
    }
}
