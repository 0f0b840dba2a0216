#[cfg(feature = "density")]
pub mod hdbscan;
pub mod kmeans;
pub mod label;
pub mod silhouette;

use crate::config::{ClusterAlgorithm, ClusteringConfig};
use crate::embeddings::util::embed_cache_key;
use crate::errors::ClusteringUnavailable;
use crate::model::ClusterAssignment;
use crate::providers::embedder::Embedder;
use crate::providers::llm::LlmClient;
use crate::storage::Store;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// Cluster number per input point, −1 for noise.
    pub labels: Vec<i32>,
    pub silhouette: f64,
    /// The algorithm that actually ran.
    pub algorithm: ClusterAlgorithm,
}

impl Partition {
    pub fn n_clusters(&self) -> usize {
        let mut ids: Vec<i32> = self.labels.iter().copied().filter(|l| *l >= 0).collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }

    pub fn noise(&self) -> usize {
        self.labels.iter().filter(|l| **l < 0).count()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusterSummary {
    pub cluster_run_id: Option<Uuid>,
    pub algorithm: String,
    pub n_clusters: usize,
    pub noise: usize,
    pub silhouette_score: f64,
    pub total_prompts: usize,
    pub labels: BTreeMap<i32, String>,
    pub embeddings_cached: usize,
}

#[cfg(feature = "density")]
fn density_labels(points: &[Vec<f32>], min_cluster_size: usize) -> Result<Vec<i32>, ClusteringUnavailable> {
    Ok(hdbscan::hdbscan(points, min_cluster_size))
}

#[cfg(not(feature = "density"))]
fn density_labels(_points: &[Vec<f32>], _min_cluster_size: usize) -> Result<Vec<i32>, ClusteringUnavailable> {
    Err(ClusteringUnavailable("hdbscan"))
}

/// Partitions embeddings with the configured algorithm. A density request in a
/// build without it runs k-means instead.
pub fn partition(points: &[Vec<f32>], cfg: &ClusteringConfig) -> Partition {
    let kmeans_params = kmeans::KMeansParams {
        k: cfg.n_clusters,
        n_init: cfg.n_init,
        seed: cfg.seed,
    };
    let (labels, algorithm) = match cfg.algorithm {
        ClusterAlgorithm::Hdbscan => match density_labels(points, cfg.min_cluster_size) {
            Ok(labels) => (labels, ClusterAlgorithm::Hdbscan),
            Err(e) => {
                tracing::warn!(event = "aisov.cluster.fallback", error = %e, k = cfg.n_clusters, "falling back to k-means");
                (kmeans::kmeans(points, kmeans_params), ClusterAlgorithm::Kmeans)
            }
        },
        ClusterAlgorithm::Kmeans => (kmeans::kmeans(points, kmeans_params), ClusterAlgorithm::Kmeans),
    };
    let silhouette = silhouette::silhouette_score(points, &labels);
    Partition {
        labels,
        silhouette,
        algorithm,
    }
}

pub struct ClusterEngine {
    pub store: Store,
    pub embedder: Arc<dyn Embedder>,
    pub labeler: Arc<dyn LlmClient>,
    pub config: ClusteringConfig,
    pub refresh_embeddings: bool,
}

impl ClusterEngine {
    pub fn new(
        store: Store,
        embedder: Arc<dyn Embedder>,
        labeler: Arc<dyn LlmClient>,
        config: ClusteringConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            labeler,
            config,
            refresh_embeddings: false,
        }
    }

    /// Embeds `texts` in order, reusing cached vectors keyed by model and text
    /// digest. Returns the vectors and how many came from the cache.
    pub async fn embed(&self, texts: &[String]) -> anyhow::Result<(Vec<Vec<f32>>, usize)> {
        let model_id = self.embedder.model_id();
        let mut out: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        let mut missing = Vec::new();

        for (i, t) in texts.iter().enumerate() {
            let cached = if self.refresh_embeddings {
                None
            } else {
                self.store.get_embedding(&embed_cache_key(&model_id, t))?
            };
            match cached {
                Some((_m, v)) => out[i] = Some(v),
                None => missing.push(i),
            }
        }
        let hits = texts.len() - missing.len();

        if !missing.is_empty() {
            let batch: Vec<String> = missing.iter().map(|i| texts[*i].clone()).collect();
            let vecs = self.embedder.embed_batch(&batch).await?;
            if vecs.len() != batch.len() {
                anyhow::bail!(
                    "embedder returned {} vectors for {} texts",
                    vecs.len(),
                    batch.len()
                );
            }
            for (i, v) in missing.into_iter().zip(vecs) {
                self.store
                    .put_embedding(&embed_cache_key(&model_id, &texts[i]), &model_id, &v)?;
                out[i] = Some(v);
            }
        }

        tracing::info!(event = "aisov.cluster.embedded", model = %model_id, total = texts.len(), cached = hits);
        Ok((out.into_iter().flatten().collect(), hits))
    }

    pub async fn cluster(&self, texts: &[String]) -> anyhow::Result<(Vec<Vec<f32>>, Partition, usize)> {
        let (embeddings, hits) = self.embed(texts).await?;
        let p = partition(&embeddings, &self.config);
        tracing::info!(
            event = "aisov.cluster.partitioned",
            algorithm = p.algorithm.as_str(),
            clusters = p.n_clusters(),
            noise = p.noise(),
            silhouette = p.silhouette,
        );
        Ok((embeddings, p, hits))
    }

    pub async fn label(&self, texts: &[String], labels: &[i32]) -> BTreeMap<i32, String> {
        label::label_clusters(self.labeler.as_ref(), texts, labels, self.config.label_samples)
            .await
    }

    /// Clusters every active prompt and writes a new, superseding assignment set.
    pub async fn run(&self) -> anyhow::Result<ClusterSummary> {
        let prompts = self.store.active_prompts(None)?;
        if prompts.is_empty() {
            tracing::warn!(event = "aisov.cluster.empty", "no active prompts; skipping clustering");
            return Ok(ClusterSummary {
                cluster_run_id: None,
                algorithm: self.config.algorithm.as_str().to_string(),
                n_clusters: 0,
                noise: 0,
                silhouette_score: 0.0,
                total_prompts: 0,
                labels: BTreeMap::new(),
                embeddings_cached: 0,
            });
        }

        let texts: Vec<String> = prompts.iter().map(|p| p.text.clone()).collect();
        let (embeddings, part, hits) = self.cluster(&texts).await?;
        let names = self.label(&texts, &part.labels).await;

        let rows: Vec<ClusterAssignment> = prompts
            .iter()
            .zip(embeddings)
            .zip(&part.labels)
            .map(|((p, emb), n)| ClusterAssignment {
                prompt_id: p.id,
                cluster_label: names
                    .get(n)
                    .cloned()
                    .unwrap_or_else(|| label::UNKNOWN_LABEL.to_string()),
                cluster_number: *n,
                embedding: emb,
                algorithm: part.algorithm.as_str().to_string(),
                silhouette_score: part.silhouette,
            })
            .collect();

        let cluster_run_id = Uuid::new_v4();
        self.store.insert_cluster_assignments(cluster_run_id, &rows)?;

        let summary = ClusterSummary {
            cluster_run_id: Some(cluster_run_id),
            algorithm: part.algorithm.as_str().to_string(),
            n_clusters: part.n_clusters(),
            noise: part.noise(),
            silhouette_score: (part.silhouette * 10_000.0).round() / 10_000.0,
            total_prompts: rows.len(),
            labels: names,
            embeddings_cached: hits,
        };
        tracing::info!(event = "aisov.cluster.done", run_id = %cluster_run_id, clusters = summary.n_clusters, "clustering complete");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(algorithm: ClusterAlgorithm) -> ClusteringConfig {
        ClusteringConfig {
            algorithm,
            n_clusters: 2,
            min_cluster_size: 3,
            ..Default::default()
        }
    }

    fn two_groups() -> Vec<Vec<f32>> {
        let mut pts: Vec<Vec<f32>> = (0..5).map(|i| vec![i as f32 * 0.1, 0.0]).collect();
        pts.extend((0..5).map(|i| vec![50.0 + i as f32 * 0.1, 50.0]));
        pts
    }

    #[test]
    fn kmeans_partition_scores_quality() {
        let p = partition(&two_groups(), &cfg(ClusterAlgorithm::Kmeans));
        assert_eq!(p.algorithm, ClusterAlgorithm::Kmeans);
        assert_eq!(p.n_clusters(), 2);
        assert_eq!(p.noise(), 0);
        assert!(p.silhouette > 0.9);
    }

    #[cfg(feature = "density")]
    #[test]
    fn density_partition_when_compiled_in() {
        let p = partition(&two_groups(), &cfg(ClusterAlgorithm::Hdbscan));
        assert_eq!(p.algorithm, ClusterAlgorithm::Hdbscan);
        assert_eq!(p.n_clusters(), 2);
    }

    #[cfg(not(feature = "density"))]
    #[test]
    fn density_request_falls_back_to_kmeans() {
        let p = partition(&two_groups(), &cfg(ClusterAlgorithm::Hdbscan));
        assert_eq!(p.algorithm, ClusterAlgorithm::Kmeans);
        assert_eq!(p.n_clusters(), 2);
    }

    #[test]
    fn empty_input_is_empty_partition() {
        let p = partition(&[], &cfg(ClusterAlgorithm::Kmeans));
        assert!(p.labels.is_empty());
        assert_eq!(p.silhouette, 0.0);
    }
}
