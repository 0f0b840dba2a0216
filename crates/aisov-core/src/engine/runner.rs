use crate::catalogue::CatalogueEntry;
use crate::classify::{Classifier, ClassifyOutcome};
use crate::config::AppConfig;
use crate::errors::{CatalogueError, ProviderError};
use crate::model::{LlmResponse, Prompt, ResponseRow, RunStatus};
use crate::providers::llm::{ModelOracle, Provider};
use crate::storage::Store;
use anyhow::Context;
use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ClassifyStats {
    pub attempted: usize,
    pub classified: usize,
    pub fallbacks: usize,
}

impl ClassifyStats {
    fn absorb(&mut self, other: ClassifyStats) {
        self.attempted += other.attempted;
        self.classified += other.classified;
        self.fallbacks += other.fallbacks;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub prompts_seeded: usize,
    pub prompts_count: u64,
    pub responses_count: u64,
    pub provider_failures: usize,
    pub classification: ClassifyStats,
    pub duration_ms: u64,
}

/// Counters filled in as stages progress, so a failed run still records what it got done.
#[derive(Debug, Default)]
struct Progress {
    prompts_seeded: usize,
    prompts: u64,
    responses: u64,
    provider_failures: usize,
    classification: ClassifyStats,
}

/// Drives one pipeline run: seed, query, persist, classify, finalize.
pub struct RunCoordinator {
    pub store: Store,
    pub oracle: Arc<dyn ModelOracle>,
    pub classifier: Classifier,
    pub config: AppConfig,
    pub providers: Vec<Provider>,
}

impl RunCoordinator {
    pub fn new(
        store: Store,
        oracle: Arc<dyn ModelOracle>,
        classifier: Classifier,
        config: AppConfig,
        providers: Vec<Provider>,
    ) -> Self {
        Self {
            store,
            oracle,
            classifier,
            config,
            providers,
        }
    }

    /// Runs every stage once. The run row ends `completed`, or `failed` with the
    /// error message, and the error is handed back to the caller.
    pub async fn run(
        &self,
        catalogue: &[CatalogueEntry],
        prompt_limit: Option<usize>,
    ) -> anyhow::Result<RunSummary> {
        let started = Instant::now();
        let snapshot =
            serde_json::to_string(&self.config).context("failed to snapshot configuration")?;
        let run_id = self.store.create_run(&snapshot)?;
        tracing::info!(
            event = "aisov.run.started",
            run_id = %run_id,
            providers = ?self.providers,
            prompt_limit = ?prompt_limit,
        );

        let mut progress = Progress::default();
        let outcome = match self
            .execute(run_id, catalogue, prompt_limit, &mut progress)
            .await
        {
            Ok(()) => self
                .store
                .finish_run(run_id, RunStatus::Completed, None)
                .context("finalizing run"),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                tracing::info!(
                    event = "aisov.run.completed",
                    run_id = %run_id,
                    prompts = progress.prompts,
                    responses = progress.responses,
                    classified = progress.classification.classified,
                );
                Ok(self.summary(run_id, RunStatus::Completed, progress, started))
            }
            Err(e) => {
                let message = format!("{:#}", e);
                if let Err(ce) = self.store.update_run_counts(
                    run_id,
                    Some(progress.prompts),
                    Some(progress.responses),
                ) {
                    tracing::warn!(event = "aisov.run.counts_failed", run_id = %run_id, error = %ce);
                }
                if let Err(fe) = self
                    .store
                    .finish_run(run_id, RunStatus::Failed, Some(&message))
                {
                    tracing::warn!(event = "aisov.run.finish_failed", run_id = %run_id, error = %fe);
                }
                tracing::warn!(event = "aisov.run.failed", run_id = %run_id, error = %message);
                Err(e.context(format!("run {} failed", run_id)))
            }
        }
    }

    async fn execute(
        &self,
        run_id: Uuid,
        catalogue: &[CatalogueEntry],
        prompt_limit: Option<usize>,
        progress: &mut Progress,
    ) -> anyhow::Result<()> {
        // 1. catalogue
        progress.prompts_seeded = self
            .store
            .upsert_prompts(catalogue)
            .context("seeding prompt catalogue")?;
        let prompts = self.store.active_prompts(prompt_limit)?;
        progress.prompts = prompts.len() as u64;
        self.store
            .update_run_counts(run_id, Some(progress.prompts), None)?;
        tracing::info!(
            event = "aisov.run.prompts",
            seeded = progress.prompts_seeded,
            active = prompts.len(),
        );
        if prompts.is_empty() {
            return Err(CatalogueError::NoActivePrompts.into());
        }

        // 2. answers
        self.collect_responses(run_id, &prompts, progress).await?;
        self.store
            .update_run_counts(run_id, None, Some(progress.responses))?;

        // 3. metrics
        let stats = self.classify_pending(None).await?;
        progress.classification.absorb(stats);

        // 4. counters
        self.store.update_run_counts(
            run_id,
            Some(progress.prompts),
            Some(progress.responses),
        )?;
        Ok(())
    }

    /// Queries every (prompt, provider) pair in prompt-major order. At most
    /// `max_concurrency` queries are in flight; results are persisted in pair order.
    async fn collect_responses(
        &self,
        run_id: Uuid,
        prompts: &[Prompt],
        progress: &mut Progress,
    ) -> anyhow::Result<()> {
        let pairs: Vec<(&Prompt, Provider)> = prompts
            .iter()
            .flat_map(|p| self.providers.iter().map(move |pr| (p, *pr)))
            .collect();
        let limit = self.config.pipeline.max_concurrency.max(1);

        let mut answers = futures::stream::iter(pairs)
            .map(|(prompt, provider)| async move {
                let result = self.query_with_retry(&prompt.text, provider).await;
                (prompt, provider, result)
            })
            .buffered(limit);

        while let Some((prompt, provider, result)) = answers.next().await {
            match result {
                Ok(resp) => {
                    let row = ResponseRow {
                        id: Uuid::new_v4().to_string(),
                        prompt_id: prompt.id,
                        provider_name: provider.as_str().to_string(),
                        model_version: resp.model,
                        text: resp.text,
                        token_count: resp.token_count,
                        latency_ms: resp.latency_ms,
                        run_id: Some(run_id),
                    };
                    if self.store.insert_response(&row)? {
                        progress.responses += 1;
                    }
                }
                Err(e) => {
                    progress.provider_failures += 1;
                    tracing::warn!(
                        event = "aisov.run.provider_skipped",
                        run_id = %run_id,
                        prompt_id = prompt.id,
                        provider = provider.as_str(),
                        error = %e.message,
                        "provider failed; pair skipped"
                    );
                }
            }
        }
        Ok(())
    }

    async fn query_with_retry(
        &self,
        prompt: &str,
        provider: Provider,
    ) -> Result<LlmResponse, ProviderError> {
        let attempts = self.config.pipeline.retry_limit.max(1);
        let base = self.config.pipeline.retry_backoff_ms;
        let mut attempt = 1;
        loop {
            match self.oracle.query(prompt, provider).await {
                Ok(resp) => return Ok(resp),
                Err(e) if attempt >= attempts => return Err(e),
                Err(e) => {
                    let wait = base.saturating_mul(1u64 << (attempt - 1).min(16));
                    tracing::debug!(
                        event = "aisov.run.retry",
                        provider = provider.as_str(),
                        attempt,
                        wait_ms = wait,
                        error = %e.message,
                    );
                    if wait > 0 {
                        tokio::time::sleep(Duration::from_millis(wait)).await;
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Classifies stored responses that have no metric yet, `batch_size` at a
    /// time. Fallback items are not persisted and stay pending.
    pub async fn classify_pending(&self, limit: Option<usize>) -> anyhow::Result<ClassifyStats> {
        let pending = self.store.unclassified_responses(limit)?;
        let batch_size = self.config.pipeline.batch_size.max(1);
        let mut stats = ClassifyStats::default();

        for chunk in pending.chunks(batch_size) {
            let items: Vec<(&str, &str)> = chunk
                .iter()
                .map(|r| (r.prompt_text.as_str(), r.response_text.as_str()))
                .collect();
            let outcomes = self.classifier.classify_batch(&items).await;
            stats.attempted += chunk.len();

            for (resp, outcome) in chunk.iter().zip(outcomes) {
                match outcome {
                    ClassifyOutcome::Classified(c) => {
                        self.store
                            .insert_metric(&resp.response_id, &c.metric)
                            .with_context(|| {
                                format!("storing metric for response {}", resp.response_id)
                            })?;
                        stats.classified += 1;
                    }
                    ClassifyOutcome::Fallback { reason, .. } => {
                        stats.fallbacks += 1;
                        tracing::debug!(
                            event = "aisov.classify.deferred",
                            response_id = %resp.response_id,
                            reason = %reason,
                        );
                    }
                }
            }
        }

        tracing::info!(
            event = "aisov.classify.done",
            attempted = stats.attempted,
            classified = stats.classified,
            fallbacks = stats.fallbacks,
        );
        Ok(stats)
    }

    fn summary(
        &self,
        run_id: Uuid,
        status: RunStatus,
        progress: Progress,
        started: Instant,
    ) -> RunSummary {
        RunSummary {
            run_id,
            status,
            prompts_seeded: progress.prompts_seeded,
            prompts_count: progress.prompts,
            responses_count: progress.responses,
            provider_failures: progress.provider_failures,
            classification: progress.classification,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BrandConfig;
    use crate::model::IntentCategory;
    use crate::providers::llm::fake::ScriptedClient;
    use crate::providers::llm::ProviderRouter;

    const METRIC_JSON: &str = r#"{"brand_mentioned": true, "rank_position": 2, "sentiment": "positive",
        "context_type": "comparison", "recommendation_strength": 0.5,
        "competitor_mentioned": false, "competitors_list": [], "confidence": 0.9}"#;

    fn config() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.pipeline.retry_backoff_ms = 0;
        cfg.pipeline.batch_size = 2;
        cfg
    }

    fn catalogue(n: usize) -> Vec<CatalogueEntry> {
        (0..n)
            .map(|i| CatalogueEntry {
                text: format!("which crm is best for team {i}?"),
                intent_category: IntentCategory::GenericDiscovery,
            })
            .collect()
    }

    fn coordinator(
        router: ProviderRouter,
        classify: Arc<ScriptedClient>,
        providers: Vec<Provider>,
    ) -> RunCoordinator {
        let cfg = config();
        let classifier = Classifier::new(classify, "gpt-4o-mini", &BrandConfig::default());
        let store = Store::memory().unwrap();
        store.init_schema().unwrap();
        RunCoordinator::new(store, Arc::new(router), classifier, cfg, providers)
    }

    #[tokio::test]
    async fn run_completes_and_classifies_every_response() {
        let router = ProviderRouter::new(Duration::from_secs(5))
            .with_client(Provider::ChatGpt, Arc::new(ScriptedClient::always("HubSpot first")))
            .with_client(Provider::Claude, Arc::new(ScriptedClient::always("Zoho first")));
        let classify = Arc::new(ScriptedClient::always(METRIC_JSON));
        let rc = coordinator(router, classify.clone(), vec![Provider::ChatGpt, Provider::Claude]);

        let summary = rc.run(&catalogue(3), None).await.unwrap();
        assert_eq!(summary.status, RunStatus::Completed);
        assert_eq!(summary.prompts_seeded, 3);
        assert_eq!(summary.prompts_count, 3);
        assert_eq!(summary.responses_count, 6);
        assert_eq!(summary.classification.classified, 6);
        assert_eq!(classify.calls(), 6);

        let run = rc.store.get_run(summary.run_id).unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert!(run.finished_at.is_some());
        assert_eq!(run.responses_count, 6);
        assert!(rc.store.unclassified_responses(None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn responses_are_stored_prompt_major() {
        let router = ProviderRouter::new(Duration::from_secs(5))
            .with_client(Provider::ChatGpt, Arc::new(ScriptedClient::always("a")))
            .with_client(Provider::Perplexity, Arc::new(ScriptedClient::always("b")));
        let mut rc = coordinator(
            router,
            Arc::new(ScriptedClient::always(METRIC_JSON)),
            vec![Provider::ChatGpt, Provider::Perplexity],
        );
        rc.config.pipeline.max_concurrency = 3;

        let summary = rc.run(&catalogue(2), None).await.unwrap();
        let rows = rc.store.responses_for_run(summary.run_id).unwrap();
        let order: Vec<(i64, &str)> = rows
            .iter()
            .map(|r| (r.prompt_id, r.provider_name.as_str()))
            .collect();
        let p = rc.store.active_prompts(None).unwrap();
        assert_eq!(
            order,
            vec![
                (p[0].id, "chatgpt"),
                (p[0].id, "perplexity"),
                (p[1].id, "chatgpt"),
                (p[1].id, "perplexity"),
            ]
        );
    }

    #[tokio::test]
    async fn provider_failure_is_skipped_after_retries() {
        let flaky = Arc::new(ScriptedClient::failing("503 overloaded"));
        let router = ProviderRouter::new(Duration::from_secs(5))
            .with_client(Provider::ChatGpt, Arc::new(ScriptedClient::always("ok")))
            .with_client(Provider::Claude, flaky.clone());
        let rc = coordinator(
            router,
            Arc::new(ScriptedClient::always(METRIC_JSON)),
            vec![Provider::ChatGpt, Provider::Claude],
        );

        let summary = rc.run(&catalogue(2), None).await.unwrap();
        assert_eq!(summary.status, RunStatus::Completed);
        assert_eq!(summary.responses_count, 2);
        assert_eq!(summary.provider_failures, 2);
        assert_eq!(flaky.calls(), 2 * rc.config.pipeline.retry_limit as usize);
    }

    #[tokio::test]
    async fn fallback_items_stay_pending() {
        let router = ProviderRouter::new(Duration::from_secs(5))
            .with_client(Provider::ChatGpt, Arc::new(ScriptedClient::always("ok")));
        let classify = Arc::new(ScriptedClient::sequence(vec![
            Ok(METRIC_JSON.to_string()),
            Ok("I cannot answer that".to_string()),
            Ok(METRIC_JSON.to_string()),
        ]));
        let rc = coordinator(router, classify, vec![Provider::ChatGpt]);

        let summary = rc.run(&catalogue(3), None).await.unwrap();
        assert_eq!(summary.classification.classified, 2);
        assert_eq!(summary.classification.fallbacks, 1);
        assert_eq!(rc.store.unclassified_responses(None).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn prompt_limit_caps_queries() {
        let answers = Arc::new(ScriptedClient::always("ok"));
        let router = ProviderRouter::new(Duration::from_secs(5))
            .with_client(Provider::ChatGpt, answers.clone());
        let rc = coordinator(router, Arc::new(ScriptedClient::always(METRIC_JSON)), vec![Provider::ChatGpt]);

        let summary = rc.run(&catalogue(5), Some(2)).await.unwrap();
        assert_eq!(summary.prompts_seeded, 5);
        assert_eq!(summary.prompts_count, 2);
        assert_eq!(answers.calls(), 2);
    }

    #[tokio::test]
    async fn storage_failure_marks_run_failed() {
        let router = ProviderRouter::new(Duration::from_secs(5))
            .with_client(Provider::ChatGpt, Arc::new(ScriptedClient::always("ok")));
        let rc = coordinator(router, Arc::new(ScriptedClient::always(METRIC_JSON)), vec![Provider::ChatGpt]);
        rc.store
            .conn
            .lock()
            .unwrap()
            .execute_batch("DROP TABLE metrics")
            .unwrap();

        let err = rc.run(&catalogue(1), None).await.unwrap_err();
        assert!(format!("{:#}", err).contains("metrics"));

        let runs = rc.store.recent_runs(1).unwrap();
        assert_eq!(runs[0].status, RunStatus::Failed);
        assert!(runs[0].finished_at.is_some());
        assert!(runs[0].error_message.as_deref().unwrap().contains("metrics"));
        assert_eq!(runs[0].responses_count, 1);
    }

    #[tokio::test]
    async fn empty_catalogue_fails_the_run() {
        let answers = Arc::new(ScriptedClient::always("ok"));
        let router = ProviderRouter::new(Duration::from_secs(5))
            .with_client(Provider::ChatGpt, answers.clone());
        let rc = coordinator(router, Arc::new(ScriptedClient::always(METRIC_JSON)), vec![Provider::ChatGpt]);

        let err = rc.run(&[], None).await.unwrap_err();
        assert!(err.chain().any(|c| matches!(
            c.downcast_ref::<CatalogueError>(),
            Some(CatalogueError::NoActivePrompts)
        )));
        assert_eq!(answers.calls(), 0);

        let runs = rc.store.recent_runs(1).unwrap();
        assert_eq!(runs[0].status, RunStatus::Failed);
        assert_eq!(runs[0].prompts_count, 0);
        assert!(runs[0]
            .error_message
            .as_deref()
            .unwrap()
            .contains("no active prompts"));
    }

    #[tokio::test]
    async fn rejected_completion_still_ends_failed() {
        let router = ProviderRouter::new(Duration::from_secs(5))
            .with_client(Provider::ChatGpt, Arc::new(ScriptedClient::always("ok")));
        let rc = coordinator(router, Arc::new(ScriptedClient::always(METRIC_JSON)), vec![Provider::ChatGpt]);
        rc.store
            .conn
            .lock()
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER reject_completion BEFORE UPDATE OF status ON runs
                 WHEN NEW.status = 'completed'
                 BEGIN SELECT RAISE(ABORT, 'completion rejected'); END;",
            )
            .unwrap();

        let err = rc.run(&catalogue(1), None).await.unwrap_err();
        assert!(format!("{:#}", err).contains("completion rejected"));

        let runs = rc.store.recent_runs(1).unwrap();
        assert_eq!(runs[0].status, RunStatus::Failed);
        assert!(runs[0].finished_at.is_some());
        assert!(runs[0]
            .error_message
            .as_deref()
            .unwrap()
            .contains("completion rejected"));
    }
}
