use crate::aisov::{compute_score, ScoreGroup};
use aisov_core::config::ScoringWeights;
use aisov_core::model::{IntentCategory, VisibilityScore};
use aisov_core::storage::Store;
use anyhow::Context;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

/// Inclusive range of metric creation dates (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScorePeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ScorePeriod {
    pub fn today() -> Self {
        let d = Utc::now().date_naive();
        Self { start: d, end: d }
    }

    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> anyhow::Result<Self> {
        let today = Utc::now().date_naive();
        let start = start.unwrap_or(today);
        let end = end.unwrap_or(today);
        if start > end {
            anyhow::bail!("period start {} is after end {}", start, end);
        }
        Ok(Self { start, end })
    }
}

impl Default for ScorePeriod {
    fn default() -> Self {
        Self::today()
    }
}

/// Scores the period overall, per provider and per intent category, then
/// stores every score. Order: overall, providers sorted, intents sorted.
pub fn compute_all_scores(
    store: &Store,
    brand: &str,
    weights: &ScoringWeights,
    period: ScorePeriod,
) -> anyhow::Result<Vec<VisibilityScore>> {
    let rows = store
        .metrics_in_period(brand, period.start, period.end)
        .context("loading metrics for scoring")?;
    let bounds = (period.start, period.end);

    if rows.is_empty() {
        tracing::warn!(
            event = "aisov.score.empty",
            brand,
            start = %period.start,
            end = %period.end,
            "no metrics in period"
        );
    }

    let mut scores = vec![compute_score(
        rows.iter().map(|r| &r.metric),
        weights,
        brand,
        &ScoreGroup::Overall,
        bounds,
    )];

    let providers: BTreeSet<&str> = rows.iter().map(|r| r.provider_name.as_str()).collect();
    for provider in providers {
        scores.push(compute_score(
            rows.iter()
                .filter(|r| r.provider_name == provider)
                .map(|r| &r.metric),
            weights,
            brand,
            &ScoreGroup::Provider(provider.to_string()),
            bounds,
        ));
    }

    let intents: BTreeSet<IntentCategory> = rows.iter().map(|r| r.intent_category).collect();
    for intent in intents {
        scores.push(compute_score(
            rows.iter()
                .filter(|r| r.intent_category == intent)
                .map(|r| &r.metric),
            weights,
            brand,
            &ScoreGroup::Intent(intent),
            bounds,
        ));
    }

    store
        .insert_scores(&scores)
        .context("storing computed scores")?;
    tracing::info!(
        event = "aisov.score.computed",
        brand,
        groups = scores.len(),
        sample_size = rows.len(),
        aisov = scores[0].aisov,
    );
    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_defaults_to_today() {
        let p = ScorePeriod::new(None, None).unwrap();
        assert_eq!(p, ScorePeriod::today());
    }

    #[test]
    fn inverted_period_is_rejected() {
        let a = NaiveDate::from_ymd_opt(2026, 2, 1);
        let b = NaiveDate::from_ymd_opt(2026, 1, 1);
        assert!(ScorePeriod::new(a, b).is_err());
    }

    #[test]
    fn empty_period_still_writes_overall_score() {
        let store = Store::memory().unwrap();
        store.init_schema().unwrap();
        let scores =
            compute_all_scores(&store, "HubSpot", &ScoringWeights::default(), ScorePeriod::today())
                .unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].sample_size, 0);
        assert_eq!(scores[0].aisov, 0.0);
        assert_eq!(store.leaderboard().unwrap().len(), 1);
    }
}
