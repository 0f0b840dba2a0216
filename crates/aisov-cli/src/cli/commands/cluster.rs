use super::{emit_json, exit_codes, is_json};
use crate::cli::args::ClusterArgs;
use aisov_core::cluster::label::{LABEL_MAX_TOKENS, LABEL_TEMPERATURE};
use aisov_core::cluster::ClusterEngine;
use aisov_core::config::{AppConfig, Secrets};
use aisov_core::errors::ConfigError;
use aisov_core::providers::embedder::openai::OpenAIEmbedder;
use aisov_core::providers::llm::auxiliary_client;
use aisov_core::report::console::print_cluster_summary;
use aisov_core::storage::Store;
use std::sync::Arc;

pub async fn run(args: ClusterArgs, cfg: &AppConfig, store: Store) -> anyhow::Result<i32> {
    let secrets = Secrets::from_env();
    let key = secrets
        .openai_api_key
        .clone()
        .ok_or_else(|| ConfigError("embeddings need OPENAI_API_KEY".into()))?;
    let embedder = Arc::new(OpenAIEmbedder::new(
        cfg.clustering.embedding_model.clone(),
        key,
    ));
    let labeler = auxiliary_client(
        cfg,
        &secrets,
        &cfg.clustering.label_model,
        LABEL_TEMPERATURE,
        LABEL_MAX_TOKENS,
    )?;

    let mut engine = ClusterEngine::new(store, embedder, labeler, cfg.clustering.clone());
    engine.refresh_embeddings = args.refresh_embeddings;
    let summary = engine.run().await?;

    if is_json(args.format) {
        emit_json(&summary)?;
    } else {
        print_cluster_summary(&summary);
    }
    Ok(exit_codes::OK)
}
