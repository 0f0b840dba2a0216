use aisov_core::catalogue::parse_catalogue;
use aisov_core::classify::Classifier;
use aisov_core::cluster::ClusterEngine;
use aisov_core::config::{AppConfig, ClusterAlgorithm};
use aisov_core::engine::RunCoordinator;
use aisov_core::model::RunStatus;
use aisov_core::providers::embedder::fake::HashEmbedder;
use aisov_core::providers::llm::fake::ScriptedClient;
use aisov_core::providers::llm::{Provider, ProviderRouter};
use aisov_core::report::build_report;
use aisov_core::storage::queries::ReportFilter;
use aisov_core::storage::Store;
use std::sync::Arc;
use std::time::Duration;

const CATALOGUE: &str = r#"[
  {"prompt_text": "best crm for startups", "intent_category": "generic_discovery"},
  {"prompt_text": "best crm for small teams", "intent_category": "generic_discovery"},
  {"prompt_text": "hubspot or salesforce", "intent_category": "comparison"},
  {"prompt_text": "is hubspot overpriced", "intent_category": "risk_criticism"}
]"#;

const MENTIONED: &str = r#"{"brand_mentioned": true, "rank_position": 1, "sentiment": "negative",
    "context_type": "criticism", "recommendation_strength": 0.2,
    "competitor_mentioned": true, "competitors_list": ["Salesforce"], "confidence": 0.7}"#;

fn setup() -> (Store, AppConfig) {
    let store = Store::memory().unwrap();
    store.init_schema().unwrap();
    let mut cfg = AppConfig::default();
    cfg.pipeline.retry_backoff_ms = 0;
    cfg.clustering.algorithm = ClusterAlgorithm::Kmeans;
    cfg.clustering.n_clusters = 2;
    (store, cfg)
}

fn coordinator(store: Store, cfg: AppConfig) -> RunCoordinator {
    let router = ProviderRouter::new(Duration::from_secs(5))
        .with_client(Provider::ChatGpt, Arc::new(ScriptedClient::always("Try HubSpot.")))
        .with_client(Provider::Perplexity, Arc::new(ScriptedClient::always("Salesforce wins.")));
    let classifier = Classifier::new(
        Arc::new(ScriptedClient::always(MENTIONED)),
        cfg.classification.model.clone(),
        &cfg.brand,
    );
    RunCoordinator::new(
        store,
        Arc::new(router),
        classifier,
        cfg,
        vec![Provider::ChatGpt, Provider::Perplexity],
    )
}

#[tokio::test]
async fn run_then_cluster_then_report() -> anyhow::Result<()> {
    let (store, cfg) = setup();
    let catalogue = parse_catalogue(CATALOGUE)?;

    let rc = coordinator(store.clone(), cfg.clone());
    let summary = rc.run(&catalogue, None).await?;
    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(summary.responses_count, 8);
    assert_eq!(summary.classification.classified, 8);

    // Second run re-seeds nothing and classifies only its own new responses.
    let again = rc.run(&catalogue, None).await?;
    assert_eq!(again.prompts_seeded, 0);
    assert_eq!(again.classification.attempted, 8);
    assert_eq!(store.recent_runs(10)?.len(), 2);

    let embedder = Arc::new(HashEmbedder::new(32));
    let engine = ClusterEngine::new(
        store.clone(),
        embedder.clone(),
        Arc::new(ScriptedClient::always("\"CRM shopping\"")),
        cfg.clustering.clone(),
    );
    let clusters = engine.run().await?;
    assert_eq!(clusters.total_prompts, 4);
    assert_eq!(clusters.algorithm, "kmeans");
    assert!(clusters.labels.values().all(|l| l == "CRM shopping"));

    // Re-clustering reuses cached embeddings.
    let calls = embedder.calls();
    let second = engine.run().await?;
    assert_eq!(second.embeddings_cached, 4);
    assert_eq!(embedder.calls(), calls);

    let report = build_report(&store, &ReportFilter::brand("HubSpot"), 10)?;
    let by_provider: Vec<_> = report
        .mention_rate
        .iter()
        .map(|m| (m.provider_name.as_str(), m.total_responses))
        .collect();
    assert_eq!(by_provider, vec![("chatgpt", 8), ("perplexity", 8)]);
    assert_eq!(report.risk.len(), 2);
    assert_eq!(
        report.clusters.iter().map(|c| c.prompt_count).sum::<u64>(),
        4
    );
    Ok(())
}

#[tokio::test]
async fn failed_run_records_error_message() -> anyhow::Result<()> {
    let (store, cfg) = setup();
    let catalogue = parse_catalogue(CATALOGUE)?;
    store
        .conn
        .lock()
        .unwrap()
        .execute_batch("DROP TABLE responses")?;

    let rc = coordinator(store.clone(), cfg);
    assert!(rc.run(&catalogue, None).await.is_err());

    let runs = store.recent_runs(5)?;
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Failed);
    assert!(runs[0].finished_at.is_some());
    assert!(runs[0]
        .error_message
        .as_deref()
        .unwrap_or_default()
        .contains("responses"));
    Ok(())
}
