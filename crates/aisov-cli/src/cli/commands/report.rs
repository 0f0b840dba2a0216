use super::{emit_json, exit_codes, is_json};
use crate::cli::args::{ReportArgs, RunsArgs};
use aisov_core::config::AppConfig;
use aisov_core::report::build_report;
use aisov_core::report::console::{render_report, render_runs};
use aisov_core::storage::queries::ReportFilter;
use aisov_core::storage::Store;
use anyhow::Context;

pub fn report(args: ReportArgs, cfg: &AppConfig, store: &Store) -> anyhow::Result<i32> {
    let filter = ReportFilter {
        brand: args.brand.unwrap_or_else(|| cfg.brand.primary.clone()),
        start: args.start,
        end: args.end,
    };
    let report = build_report(store, &filter, args.trend)?;
    let rendered = if is_json(args.format) {
        serde_json::to_string_pretty(&report)?
    } else {
        render_report(&report)
    };

    match args.out {
        Some(path) => {
            std::fs::write(&path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("wrote file: {}", path.display());
        }
        None => println!("{}", rendered.trim_end()),
    }
    Ok(exit_codes::OK)
}

pub fn runs(args: RunsArgs, store: &Store) -> anyhow::Result<i32> {
    let runs = store.recent_runs(args.limit)?;
    if is_json(args.format) {
        emit_json(&runs)?;
    } else if runs.is_empty() {
        eprintln!("no runs recorded yet");
    } else {
        print!("{}", render_runs(&runs));
    }
    if !is_json(args.format) {
        let st = store.stats()?;
        eprintln!(
            "\n{} prompts ({} active), {} responses, {} metrics across {} runs (last: {})",
            st.prompts,
            st.active_prompts,
            st.responses,
            st.metrics,
            st.runs,
            st.last_run_at.as_deref().unwrap_or("never")
        );
    }
    Ok(exit_codes::OK)
}
