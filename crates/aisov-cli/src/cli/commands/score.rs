use super::{emit_json, exit_codes, is_json};
use crate::cli::args::ScoreArgs;
use aisov_core::config::AppConfig;
use aisov_core::report::console::render_scores;
use aisov_core::storage::Store;
use aisov_metrics::{compute_all_scores, ScorePeriod};

pub fn run(args: ScoreArgs, cfg: &AppConfig, store: &Store) -> anyhow::Result<i32> {
    let period = ScorePeriod::new(args.start, args.end)?;
    let brand = args.brand.as_deref().unwrap_or(&cfg.brand.primary);
    let scores = compute_all_scores(store, brand, &cfg.scoring, period)?;

    if is_json(args.format) {
        emit_json(&scores)?;
    } else {
        print!("{}", render_scores(&scores));
    }
    Ok(exit_codes::OK)
}
