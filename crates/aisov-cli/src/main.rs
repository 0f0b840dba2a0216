use clap::Parser;

mod cli;
mod templates;

use aisov_core::errors::{CatalogueError, ConfigError};
use cli::args::Cli;
use cli::commands::{dispatch, exit_codes};
use serde::Deserialize;
use std::path::Path;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::EnvFilter;

#[derive(Deserialize)]
struct LogLevelOnly {
    log_level: Option<String>,
}

/// Reads just `log_level` from the config so logging is up before the full load.
fn config_log_level(path: &Path) -> Option<String> {
    let raw = std::fs::read_to_string(path).ok()?;
    serde_yaml::from_str::<LogLevelOnly>(&raw).ok()?.log_level
}

fn init_logging(cli: &Cli) {
    let level = cli
        .log_level
        .clone()
        .or_else(|| std::env::var("AISOV_LOG").ok().filter(|v| !v.trim().is_empty()))
        .or_else(|| config_log_level(&cli.config))
        .unwrap_or_else(|| "info".to_string());
    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_timer(ChronoUtc::rfc_3339());
    if cli.log_json {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

fn exit_code_for(e: &anyhow::Error) -> i32 {
    let config_error = e
        .chain()
        .any(|c| c.is::<ConfigError>() || c.is::<CatalogueError>());
    if config_error {
        exit_codes::CONFIG_ERROR
    } else {
        exit_codes::RUN_FAILED
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli);
    let code = match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("fatal: {e:#}");
            exit_code_for(&e)
        }
    };
    std::process::exit(code);
}
