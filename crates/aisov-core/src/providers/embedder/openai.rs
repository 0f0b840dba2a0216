use super::Embedder;
use async_trait::async_trait;
use serde_json::json;

pub struct OpenAIEmbedder {
    pub model: String,
    pub api_key: String,
    pub base_url: String,
    pub client: reqwest::Client,
}

impl OpenAIEmbedder {
    pub fn new(model: String, api_key: String) -> Self {
        Self {
            model,
            api_key,
            base_url: "https://api.openai.com/v1".to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn request(&self, input: serde_json::Value) -> anyhow::Result<Vec<Vec<f32>>> {
        let body = json!({ "model": self.model, "input": input });

        let resp = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI embeddings API error: {}", error_text);
        }

        let json: serde_json::Value = resp.json().await?;
        let data = json
            .get("data")
            .and_then(|d| d.as_array())
            .ok_or_else(|| anyhow::anyhow!("OpenAI embeddings response missing data"))?;

        // Items carry their input index; do not rely on array order.
        let mut indexed = Vec::with_capacity(data.len());
        for item in data {
            let idx = item.get("index").and_then(|i| i.as_u64()).unwrap_or(0) as usize;
            let vec: Vec<f32> = item
                .get("embedding")
                .and_then(|e| e.as_array())
                .ok_or_else(|| anyhow::anyhow!("OpenAI embeddings item missing vector"))?
                .iter()
                .filter_map(|x| x.as_f64())
                .map(|x| x as f32)
                .collect();
            indexed.push((idx, vec));
        }
        indexed.sort_by_key(|(i, _)| *i);
        Ok(indexed.into_iter().map(|(_, v)| v).collect())
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.request(json!(text))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("OpenAI embeddings returned no vectors"))
    }

    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let out = self.request(json!(texts)).await?;
        if out.len() != texts.len() {
            anyhow::bail!(
                "OpenAI embeddings returned {} vectors for {} inputs",
                out.len(),
                texts.len()
            );
        }
        Ok(out)
    }

    fn model_id(&self) -> String {
        self.model.clone()
    }
}
