use super::Embedder;
use crate::embeddings::util::sha256_hex;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Bag-of-words embedding: every token is hashed into one of `dims` buckets.
/// Texts that share words land close together.
pub struct HashEmbedder {
    pub dims: usize,
    calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self {
            dims: dims.max(1),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn bucket(&self, token: &str) -> usize {
        let digest = sha256_hex(token);
        let head = u64::from_str_radix(&digest[..12], 16).unwrap_or(0);
        (head % self.dims as u64) as usize
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut v = vec![0.0f32; self.dims];
        for tok in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            v[self.bucket(&tok.to_lowercase())] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in v.iter_mut() {
                *x /= norm;
            }
        }
        Ok(v)
    }

    fn model_id(&self) -> String {
        format!("hash-{}", self.dims)
    }
}
