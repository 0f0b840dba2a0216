mod cluster;
mod init;
mod pipeline;
mod prompts;
mod report;
mod score;
mod seed;

use crate::cli::args::{Cli, Command, OutputFormat};
use aisov_core::config::{apply_env_overrides, load_config, validate, AppConfig};
use aisov_core::errors::ConfigError;
use aisov_core::storage::Store;
use anyhow::Context;
use serde::Serialize;
use std::path::Path;

pub mod exit_codes {
    pub const OK: i32 = 0;
    pub const RUN_FAILED: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
}

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Init(args) => init::run(args),
        Command::Version => {
            println!("aisov {}", env!("CARGO_PKG_VERSION"));
            Ok(exit_codes::OK)
        }
        Command::Seed(args) => seed::run(args, &open_store(&cli.db)?),
        Command::Run(args) => {
            let cfg = config(&cli.config, cli.strict)?;
            pipeline::run(args, cfg, open_store(&cli.db)?).await
        }
        Command::Classify(args) => {
            let cfg = config(&cli.config, cli.strict)?;
            pipeline::classify(args, cfg, open_store(&cli.db)?).await
        }
        Command::Score(args) => {
            let cfg = config(&cli.config, cli.strict)?;
            score::run(args, &cfg, &open_store(&cli.db)?)
        }
        Command::Cluster(args) => {
            let cfg = config(&cli.config, cli.strict)?;
            cluster::run(args, &cfg, open_store(&cli.db)?).await
        }
        Command::Report(args) => {
            let cfg = config(&cli.config, cli.strict)?;
            report::report(args, &cfg, &open_store(&cli.db)?)
        }
        Command::Runs(args) => report::runs(args, &open_store(&cli.db)?),
        Command::Prompts(args) => prompts::run(args, &open_store(&cli.db)?),
    }
}

/// Loads the config file, or falls back to defaults (plus env overrides) when
/// it does not exist.
pub fn config(path: &Path, strict: bool) -> Result<AppConfig, ConfigError> {
    if path.exists() {
        return load_config(path, strict);
    }
    tracing::info!(event = "aisov.config.default", path = %path.display(), "config file not found; using defaults");
    let cfg = apply_env_overrides(AppConfig::default(), |k| std::env::var(k).ok())?;
    validate(&cfg)?;
    Ok(cfg)
}

pub fn open_store(db: &Path) -> anyhow::Result<Store> {
    if let Some(dir) = db.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let store =
        Store::open(db).with_context(|| format!("failed to open database {}", db.display()))?;
    store.init_schema().context("failed to initialise schema")?;
    Ok(store)
}

pub fn emit_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn is_json(format: OutputFormat) -> bool {
    matches!(format, OutputFormat::Json)
}
