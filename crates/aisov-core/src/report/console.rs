use super::VisibilityReport;
use crate::cluster::ClusterSummary;
use crate::engine::RunSummary;
use crate::model::{Prompt, RunRecord, RunStatus, VisibilityScore};
use std::fmt::Write;

pub fn print_run_summary(s: &RunSummary) {
    let icon = match s.status {
        RunStatus::Completed => "✅",
        RunStatus::Failed => "❌",
        RunStatus::Running => "⏳",
    };
    eprintln!("\n{} run {} {}", icon, s.run_id, s.status.as_str());
    eprintln!(
        "   prompts: {} ({} newly seeded)   responses: {}   provider failures: {}",
        s.prompts_count, s.prompts_seeded, s.responses_count, s.provider_failures
    );
    eprintln!(
        "   classified: {}/{}   deferred: {}   ({:.1}s)",
        s.classification.classified,
        s.classification.attempted,
        s.classification.fallbacks,
        s.duration_ms as f64 / 1000.0
    );
}

fn group_label(s: &VisibilityScore) -> String {
    match (&s.provider_name, &s.intent_category) {
        (Some(p), _) => format!("provider:{}", p),
        (None, Some(i)) => format!("intent:{}", i),
        (None, None) => "overall".to_string(),
    }
}

pub fn render_scores(scores: &[VisibilityScore]) -> String {
    let mut out = String::new();
    if let Some(first) = scores.first() {
        let _ = writeln!(
            out,
            "AISOV for {} ({} .. {})",
            first.brand_name, first.period_start, first.period_end
        );
    }
    let _ = writeln!(
        out,
        "{:<28} {:>7} {:>8} {:>6} {:>8} {:>6} {:>6}",
        "group", "aisov", "mention", "rank", "positive", "rec", "n"
    );
    for s in scores {
        let _ = writeln!(
            out,
            "{:<28} {:>7.4} {:>8.4} {:>6.4} {:>8.4} {:>6.4} {:>6}",
            group_label(s),
            s.aisov,
            s.mention_rate,
            s.avg_rank_score,
            s.positive_sentiment_ratio,
            s.recommendation_strength_avg,
            s.sample_size
        );
    }
    out
}

fn pct(v: f64) -> String {
    format!("{:.1}%", v * 100.0)
}

/// Plain-text tables for every non-empty report section.
pub fn render_report(r: &VisibilityReport) -> String {
    let mut out = String::new();
    let period = match (r.period_start, r.period_end) {
        (None, None) => "all time".to_string(),
        (s, e) => format!(
            "{} .. {}",
            s.map(|d| d.to_string()).unwrap_or_else(|| "*".into()),
            e.map(|d| d.to_string()).unwrap_or_else(|| "*".into())
        ),
    };
    let _ = writeln!(out, "Visibility report: {} ({})", r.brand, period);

    if r.is_empty() {
        let _ = writeln!(out, "\nNo data yet. Run `aisov run` then `aisov score`.");
        return out;
    }

    if !r.mention_rate.is_empty() {
        let _ = writeln!(out, "\nMention rate by provider");
        for m in &r.mention_rate {
            let _ = writeln!(
                out,
                "  {:<12} {:>7}  ({}/{})",
                m.provider_name,
                pct(m.mention_rate),
                m.mentions,
                m.total_responses
            );
        }
    }

    if !r.intent_visibility.is_empty() {
        let _ = writeln!(out, "\nVisibility by intent");
        for i in &r.intent_visibility {
            let _ = writeln!(
                out,
                "  {:<18} mention {:>7}  rank {:.4}  positive {:>7}  rec {:.4}  n={}",
                i.intent_category,
                pct(i.mention_rate),
                i.avg_rank_score,
                pct(i.positive_ratio),
                i.rec_strength,
                i.sample_size
            );
        }
    }

    if !r.sentiment.is_empty() {
        let _ = writeln!(out, "\nSentiment when mentioned");
        for s in &r.sentiment {
            let _ = writeln!(
                out,
                "  {:<12} {:<9} {:>5}  {:>7}",
                s.provider_name,
                s.sentiment,
                s.count,
                pct(s.pct)
            );
        }
    }

    if !r.displacement.is_empty() {
        let _ = writeln!(out, "\nCompetitor displacement");
        for d in &r.displacement {
            let _ = writeln!(
                out,
                "  {:<16} {:>7}  ({}/{})",
                d.competitor,
                pct(d.displacement_rate),
                d.displacement_count,
                d.total_competitor_mentions
            );
        }
    }

    if !r.risk.is_empty() {
        let _ = writeln!(out, "\nRisk exposure (criticism prompts)");
        for k in &r.risk {
            let _ = writeln!(
                out,
                "  {:<12} index {:.4}  negative {:>7}  criticism {:>7}  rec {:.4}  n={}",
                k.provider_name,
                k.risk_index,
                pct(k.negative_pct),
                pct(k.criticism_pct),
                k.avg_rec_strength,
                k.sample_size
            );
        }
    }

    if !r.leaderboard.is_empty() {
        let _ = writeln!(out, "\nLeaderboard");
        for (pos, l) in r.leaderboard.iter().enumerate() {
            let _ = writeln!(
                out,
                "  {:>2}. {:<16} {:.4}  n={}",
                pos + 1,
                l.brand_name,
                l.aisov,
                l.sample_size
            );
        }
    }

    if !r.trend.is_empty() {
        let _ = writeln!(out, "\nTrend");
        for t in &r.trend {
            let _ = writeln!(
                out,
                "  {} .. {}  {:.4}  n={}",
                t.period_start, t.period_end, t.aisov, t.sample_size
            );
        }
    }

    if !r.clusters.is_empty() {
        let _ = writeln!(out, "\nPrompt clusters");
        for c in &r.clusters {
            let _ = writeln!(
                out,
                "  {:>3}  {:<40} {}",
                c.cluster_number, c.cluster_label, c.prompt_count
            );
        }
    }
    out
}

pub fn print_cluster_summary(s: &ClusterSummary) {
    match s.cluster_run_id {
        None => eprintln!("No active prompts to cluster."),
        Some(id) => {
            eprintln!(
                "\nClustered {} prompts with {} into {} clusters ({} noise), silhouette {:.4}",
                s.total_prompts, s.algorithm, s.n_clusters, s.noise, s.silhouette_score
            );
            eprintln!("   cluster run: {}   cached embeddings: {}", id, s.embeddings_cached);
            for (n, label) in &s.labels {
                eprintln!("   {:>3}  {}", n, label);
            }
        }
    }
}

pub fn render_runs(runs: &[RunRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<36}  {:<9}  {:<24}  {:>7}  {:>9}",
        "run_id", "status", "started_at", "prompts", "responses"
    );
    for r in runs {
        let _ = writeln!(
            out,
            "{:<36}  {:<9}  {:<24}  {:>7}  {:>9}",
            r.run_id,
            r.status.as_str(),
            r.started_at,
            r.prompts_count,
            r.responses_count
        );
        if let Some(msg) = &r.error_message {
            let _ = writeln!(out, "    error: {}", msg);
        }
    }
    out
}

pub fn render_prompts(prompts: &[Prompt]) -> String {
    let mut out = String::new();
    for p in prompts {
        let _ = writeln!(
            out,
            "{:>5} {} {:<18} {}",
            p.id,
            if p.active { "+" } else { "-" },
            p.intent_category.as_str(),
            p.text
        );
    }
    out
}
