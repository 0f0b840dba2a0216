pub mod console;

use crate::errors::StoreResult;
use crate::storage::queries::{
    ClusterCountRow, DisplacementRow, IntentVisibilityRow, LeaderboardRow, MentionRateRow,
    ReportFilter, RiskRow, SentimentRow, TrendRow,
};
use crate::storage::Store;
use chrono::NaiveDate;
use serde::Serialize;

pub const DEFAULT_TREND_POINTS: usize = 30;

/// Every read-only aggregate for one brand, in one serializable value.
#[derive(Debug, Clone, Serialize)]
pub struct VisibilityReport {
    pub brand: String,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub mention_rate: Vec<MentionRateRow>,
    pub intent_visibility: Vec<IntentVisibilityRow>,
    pub sentiment: Vec<SentimentRow>,
    pub displacement: Vec<DisplacementRow>,
    pub risk: Vec<RiskRow>,
    pub leaderboard: Vec<LeaderboardRow>,
    pub trend: Vec<TrendRow>,
    pub clusters: Vec<ClusterCountRow>,
}

pub fn build_report(
    store: &Store,
    filter: &ReportFilter,
    trend_points: usize,
) -> StoreResult<VisibilityReport> {
    Ok(VisibilityReport {
        brand: filter.brand.clone(),
        period_start: filter.start,
        period_end: filter.end,
        mention_rate: store.mention_rate_by_provider(filter)?,
        intent_visibility: store.visibility_by_intent(filter)?,
        sentiment: store.sentiment_distribution(filter)?,
        displacement: store.competitor_displacement(filter)?,
        risk: store.risk_exposure(filter)?,
        leaderboard: store.leaderboard()?,
        trend: store.aisov_trend(&filter.brand, trend_points)?,
        clusters: store.cluster_distribution()?,
    })
}

impl VisibilityReport {
    pub fn is_empty(&self) -> bool {
        self.mention_rate.is_empty() && self.leaderboard.is_empty() && self.clusters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_gives_empty_report() {
        let store = Store::memory().unwrap();
        store.init_schema().unwrap();
        let report = build_report(&store, &ReportFilter::brand("HubSpot"), 10).unwrap();
        assert!(report.is_empty());
        assert!(report.risk.is_empty());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["brand"], "HubSpot");
        assert!(json["period_start"].is_null());
    }
}
