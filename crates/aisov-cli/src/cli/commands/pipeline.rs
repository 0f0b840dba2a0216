use super::{emit_json, exit_codes, is_json};
use crate::cli::args::{ClassifyArgs, RunArgs, DEFAULT_CATALOGUE};
use aisov_core::catalogue::{load_catalogue, CatalogueEntry};
use aisov_core::classify::{Classifier, CLASSIFY_MAX_TOKENS, CLASSIFY_TEMPERATURE};
use aisov_core::config::{AppConfig, Secrets};
use aisov_core::engine::RunCoordinator;
use aisov_core::errors::{CatalogueError, ConfigError};
use aisov_core::providers::llm::{auxiliary_client, Provider, ProviderRouter};
use aisov_core::report::console::print_run_summary;
use aisov_core::storage::Store;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Picks the providers to query: the requested ones, or every provider with a key.
fn select_providers(
    router: &ProviderRouter,
    requested: &[String],
) -> Result<Vec<Provider>, ConfigError> {
    let configured = router.configured();
    if requested.is_empty() {
        if configured.is_empty() {
            return Err(ConfigError(
                "no providers configured; set OPENAI_API_KEY, ANTHROPIC_API_KEY or PERPLEXITY_API_KEY"
                    .into(),
            ));
        }
        return Ok(configured);
    }

    let mut out = Vec::new();
    for name in requested {
        let p = Provider::parse(name.trim())
            .ok_or_else(|| ConfigError(format!("unknown provider '{}'", name)))?;
        if !configured.contains(&p) {
            return Err(ConfigError(format!("no API key for provider '{}'", p)));
        }
        if !out.contains(&p) {
            out.push(p);
        }
    }
    Ok(out)
}

fn coordinator(
    cfg: AppConfig,
    store: Store,
    requested: Option<&[String]>,
) -> anyhow::Result<RunCoordinator> {
    let secrets = Secrets::from_env();
    let router = ProviderRouter::from_config(&cfg, &secrets);
    let providers = match requested {
        Some(r) => select_providers(&router, r)?,
        None => Vec::new(),
    };

    let client = auxiliary_client(
        &cfg,
        &secrets,
        &cfg.classification.model,
        CLASSIFY_TEMPERATURE,
        CLASSIFY_MAX_TOKENS,
    )?;
    let classifier = Classifier::new(client, cfg.classification.model.clone(), &cfg.brand)
        .with_timeout(Duration::from_secs(cfg.pipeline.timeout_seconds));

    Ok(RunCoordinator::new(
        store,
        Arc::new(router),
        classifier,
        cfg,
        providers,
    ))
}

/// An explicit catalogue must load; the default one is used only when present.
fn run_catalogue(explicit: Option<&Path>) -> Result<Vec<CatalogueEntry>, CatalogueError> {
    match explicit {
        Some(path) => load_catalogue(path),
        None => {
            let path = Path::new(DEFAULT_CATALOGUE);
            if path.exists() {
                load_catalogue(path)
            } else {
                tracing::info!(event = "aisov.catalogue.absent", path = %path.display(), "no catalogue file; using seeded prompts");
                Ok(Vec::new())
            }
        }
    }
}

pub async fn run(args: RunArgs, cfg: AppConfig, store: Store) -> anyhow::Result<i32> {
    let catalogue = run_catalogue(args.catalogue.as_deref())?;
    let rc = coordinator(cfg, store, Some(&args.providers))?;

    match rc.run(&catalogue, args.limit).await {
        Ok(summary) => {
            if is_json(args.format) {
                emit_json(&summary)?;
            } else {
                print_run_summary(&summary);
            }
            Ok(exit_codes::OK)
        }
        Err(e) if e.chain().any(|c| c.is::<CatalogueError>()) => Err(e),
        Err(e) => {
            eprintln!("❌ {:#}", e);
            Ok(exit_codes::RUN_FAILED)
        }
    }
}

pub async fn classify(args: ClassifyArgs, cfg: AppConfig, store: Store) -> anyhow::Result<i32> {
    let rc = coordinator(cfg, store, None)?;
    let stats = rc.classify_pending(args.limit).await?;
    eprintln!(
        "classified {}/{} pending responses ({} deferred)",
        stats.classified, stats.attempted, stats.fallbacks
    );
    Ok(exit_codes::OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aisov_core::providers::llm::fake::ScriptedClient;

    fn router(providers: &[Provider]) -> ProviderRouter {
        providers
            .iter()
            .fold(ProviderRouter::new(Duration::from_secs(1)), |r, p| {
                r.with_client(*p, Arc::new(ScriptedClient::always("ok")))
            })
    }

    #[test]
    fn defaults_to_every_configured_provider() {
        let r = router(&[Provider::Claude, Provider::ChatGpt]);
        assert_eq!(
            select_providers(&r, &[]).unwrap(),
            vec![Provider::ChatGpt, Provider::Claude]
        );
    }

    #[test]
    fn requested_providers_must_be_known_and_keyed() {
        let r = router(&[Provider::ChatGpt]);
        let req = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        assert_eq!(
            select_providers(&r, &req(&["chatgpt", "chatgpt"])).unwrap(),
            vec![Provider::ChatGpt]
        );
        assert!(select_providers(&r, &req(&["gemini"]))
            .unwrap_err()
            .0
            .contains("unknown provider"));
        assert!(select_providers(&r, &req(&["claude"]))
            .unwrap_err()
            .0
            .contains("no API key"));
    }

    #[test]
    fn nothing_configured_is_config_error() {
        let r = router(&[]);
        assert!(select_providers(&r, &[]).is_err());
    }
}
