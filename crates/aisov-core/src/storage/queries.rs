//! Read-only aggregate queries behind `aisov report`.

use super::store::{collect_rows, fmt_date, Store};
use crate::errors::StoreResult;
use chrono::NaiveDate;
use rusqlite::params;
use serde::Serialize;

/// Brand plus an optional inclusive date range on metric creation date.
#[derive(Debug, Clone)]
pub struct ReportFilter {
    pub brand: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl ReportFilter {
    pub fn brand(brand: impl Into<String>) -> Self {
        Self {
            brand: brand.into(),
            start: None,
            end: None,
        }
    }

    fn bounds(&self) -> (Option<String>, Option<String>) {
        (self.start.map(fmt_date), self.end.map(fmt_date))
    }
}

const DATE_FILTER: &str = "(?2 IS NULL OR substr(m.created_at, 1, 10) >= ?2)
  AND (?3 IS NULL OR substr(m.created_at, 1, 10) <= ?3)";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MentionRateRow {
    pub provider_name: String,
    pub total_responses: u64,
    pub mentions: u64,
    pub mention_rate: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IntentVisibilityRow {
    pub intent_category: String,
    pub mention_rate: f64,
    pub avg_rank_score: f64,
    pub positive_ratio: f64,
    pub rec_strength: f64,
    pub sample_size: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SentimentRow {
    pub provider_name: String,
    pub sentiment: String,
    pub count: u64,
    pub pct: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DisplacementRow {
    pub competitor: String,
    pub displacement_count: u64,
    pub total_competitor_mentions: u64,
    pub displacement_rate: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RiskRow {
    pub provider_name: String,
    pub negative_pct: f64,
    pub criticism_pct: f64,
    pub avg_rec_strength: f64,
    pub risk_index: f64,
    pub sample_size: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LeaderboardRow {
    pub brand_name: String,
    pub aisov: f64,
    pub mention_rate: f64,
    pub avg_rank_score: f64,
    pub positive_sentiment_ratio: f64,
    pub recommendation_strength_avg: f64,
    pub sample_size: u64,
    pub computed_at: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrendRow {
    pub period_start: String,
    pub period_end: String,
    pub aisov: f64,
    pub sample_size: u64,
    pub computed_at: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClusterCountRow {
    pub cluster_label: String,
    pub cluster_number: i32,
    pub prompt_count: u64,
}

impl Store {
    pub fn mention_rate_by_provider(&self, f: &ReportFilter) -> StoreResult<Vec<MentionRateRow>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT r.provider_name,
                    COUNT(*),
                    SUM(m.brand_mentioned),
                    ROUND(1.0 * SUM(m.brand_mentioned) / COUNT(*), 4) AS rate
             FROM metrics m
             JOIN responses r ON r.id = m.response_id
             WHERE m.brand_name = ?1 AND {DATE_FILTER}
             GROUP BY r.provider_name
             ORDER BY rate DESC, r.provider_name"
        );
        let (start, end) = f.bounds();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![f.brand, start, end], |row| {
            Ok(MentionRateRow {
                provider_name: row.get(0)?,
                total_responses: row.get::<_, i64>(1)? as u64,
                mentions: row.get::<_, i64>(2)? as u64,
                mention_rate: row.get(3)?,
            })
        })?;
        collect_rows(rows)
    }

    /// Averages here treat an absent rank as 0, unlike the scorer.
    pub fn visibility_by_intent(&self, f: &ReportFilter) -> StoreResult<Vec<IntentVisibilityRow>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT p.intent_category,
                    ROUND(AVG(m.brand_mentioned * 1.0), 4) AS rate,
                    ROUND(AVG(CASE WHEN m.rank_position > 0 THEN 1.0 / m.rank_position ELSE 0 END), 4),
                    ROUND(AVG(CASE WHEN m.brand_mentioned = 1 AND m.sentiment = 'positive' THEN 1.0 ELSE 0 END), 4),
                    ROUND(AVG(m.recommendation_strength), 4),
                    COUNT(*)
             FROM metrics m
             JOIN responses r ON r.id = m.response_id
             JOIN prompts p ON p.id = r.prompt_id
             WHERE m.brand_name = ?1 AND {DATE_FILTER}
             GROUP BY p.intent_category
             ORDER BY rate DESC, p.intent_category"
        );
        let (start, end) = f.bounds();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![f.brand, start, end], |row| {
            Ok(IntentVisibilityRow {
                intent_category: row.get(0)?,
                mention_rate: row.get(1)?,
                avg_rank_score: row.get(2)?,
                positive_ratio: row.get(3)?,
                rec_strength: row.get(4)?,
                sample_size: row.get::<_, i64>(5)? as u64,
            })
        })?;
        collect_rows(rows)
    }

    /// Sentiment shares among responses that mention the brand, per provider.
    pub fn sentiment_distribution(&self, f: &ReportFilter) -> StoreResult<Vec<SentimentRow>> {
        let conn = self.lock()?;
        let sql = format!(
            "WITH mentioned AS (
                 SELECT r.provider_name, m.sentiment
                 FROM metrics m
                 JOIN responses r ON r.id = m.response_id
                 WHERE m.brand_name = ?1 AND m.brand_mentioned = 1 AND {DATE_FILTER}
             ),
             totals AS (
                 SELECT provider_name, COUNT(*) AS total FROM mentioned GROUP BY provider_name
             )
             SELECT x.provider_name, x.sentiment, COUNT(*), ROUND(1.0 * COUNT(*) / t.total, 4)
             FROM mentioned x
             JOIN totals t ON t.provider_name = x.provider_name
             GROUP BY x.provider_name, x.sentiment, t.total
             ORDER BY x.provider_name, x.sentiment"
        );
        let (start, end) = f.bounds();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![f.brand, start, end], |row| {
            Ok(SentimentRow {
                provider_name: row.get(0)?,
                sentiment: row.get(1)?,
                count: row.get::<_, i64>(2)? as u64,
                pct: row.get(3)?,
            })
        })?;
        collect_rows(rows)
    }

    /// A competitor displaces the brand when it is named and the brand is not.
    pub fn competitor_displacement(&self, f: &ReportFilter) -> StoreResult<Vec<DisplacementRow>> {
        let conn = self.lock()?;
        let sql = format!(
            "WITH appearances AS (
                 SELECT c.value AS competitor, m.brand_mentioned
                 FROM metrics m, json_each(m.competitors_json) c
                 WHERE m.brand_name = ?1 AND {DATE_FILTER}
             )
             SELECT competitor,
                    SUM(CASE WHEN brand_mentioned = 0 THEN 1 ELSE 0 END),
                    COUNT(*),
                    ROUND(1.0 * SUM(CASE WHEN brand_mentioned = 0 THEN 1 ELSE 0 END) / COUNT(*), 4) AS rate
             FROM appearances
             GROUP BY competitor
             ORDER BY rate DESC, competitor"
        );
        let (start, end) = f.bounds();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![f.brand, start, end], |row| {
            Ok(DisplacementRow {
                competitor: row.get(0)?,
                displacement_count: row.get::<_, i64>(1)? as u64,
                total_competitor_mentions: row.get::<_, i64>(2)? as u64,
                displacement_rate: row.get(3)?,
            })
        })?;
        collect_rows(rows)
    }

    /// risk_index = negative·0.4 + criticism·0.4 + (1 − avg strength)·0.2,
    /// over risk_criticism prompts only.
    pub fn risk_exposure(&self, f: &ReportFilter) -> StoreResult<Vec<RiskRow>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT r.provider_name,
                    ROUND(AVG(CASE WHEN m.sentiment = 'negative' THEN 1.0 ELSE 0 END), 4),
                    ROUND(AVG(CASE WHEN m.context_type = 'criticism' THEN 1.0 ELSE 0 END), 4),
                    ROUND(AVG(m.recommendation_strength), 4),
                    ROUND(
                        AVG(CASE WHEN m.sentiment = 'negative' THEN 1.0 ELSE 0 END) * 0.4
                        + AVG(CASE WHEN m.context_type = 'criticism' THEN 1.0 ELSE 0 END) * 0.4
                        + (1 - AVG(m.recommendation_strength)) * 0.2, 4) AS risk,
                    COUNT(*)
             FROM metrics m
             JOIN responses r ON r.id = m.response_id
             JOIN prompts p ON p.id = r.prompt_id
             WHERE m.brand_name = ?1 AND p.intent_category = 'risk_criticism' AND {DATE_FILTER}
             GROUP BY r.provider_name
             ORDER BY risk DESC, r.provider_name"
        );
        let (start, end) = f.bounds();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![f.brand, start, end], |row| {
            Ok(RiskRow {
                provider_name: row.get(0)?,
                negative_pct: row.get(1)?,
                criticism_pct: row.get(2)?,
                avg_rec_strength: row.get(3)?,
                risk_index: row.get(4)?,
                sample_size: row.get::<_, i64>(5)? as u64,
            })
        })?;
        collect_rows(rows)
    }

    /// Latest overall score per brand, best first.
    pub fn leaderboard(&self) -> StoreResult<Vec<LeaderboardRow>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "WITH ranked AS (
                 SELECT *, ROW_NUMBER() OVER (
                     PARTITION BY brand_name ORDER BY computed_at DESC, id DESC
                 ) AS rn
                 FROM scores
                 WHERE provider_name IS NULL AND intent_category IS NULL
             )
             SELECT brand_name, aisov, mention_rate, avg_rank_score, positive_sentiment_ratio,
                    recommendation_strength_avg, sample_size, computed_at
             FROM ranked WHERE rn = 1
             ORDER BY aisov DESC, brand_name",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(LeaderboardRow {
                brand_name: row.get(0)?,
                aisov: row.get(1)?,
                mention_rate: row.get(2)?,
                avg_rank_score: row.get(3)?,
                positive_sentiment_ratio: row.get(4)?,
                recommendation_strength_avg: row.get(5)?,
                sample_size: row.get::<_, i64>(6)? as u64,
                computed_at: row.get(7)?,
            })
        })?;
        collect_rows(rows)
    }

    /// Overall score history for one brand, most recent period first.
    pub fn aisov_trend(&self, brand: &str, limit: usize) -> StoreResult<Vec<TrendRow>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT period_start, period_end, aisov, sample_size, computed_at
             FROM scores
             WHERE brand_name = ?1 AND provider_name IS NULL AND intent_category IS NULL
             ORDER BY period_start DESC, computed_at DESC, id DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![brand, limit as i64], |row| {
            Ok(TrendRow {
                period_start: row.get(0)?,
                period_end: row.get(1)?,
                aisov: row.get(2)?,
                sample_size: row.get::<_, i64>(3)? as u64,
                computed_at: row.get(4)?,
            })
        })?;
        collect_rows(rows)
    }

    /// Prompt counts per cluster of the most recent clustering run.
    pub fn cluster_distribution(&self) -> StoreResult<Vec<ClusterCountRow>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT cluster_label, cluster_number, COUNT(*) AS n
             FROM cluster_assignments
             WHERE cluster_run_id = (
                 SELECT cluster_run_id FROM cluster_assignments ORDER BY id DESC LIMIT 1
             )
             GROUP BY cluster_label, cluster_number
             ORDER BY n DESC, cluster_number",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ClusterCountRow {
                cluster_label: row.get(0)?,
                cluster_number: row.get(1)?,
                prompt_count: row.get::<_, i64>(2)? as u64,
            })
        })?;
        collect_rows(rows)
    }
}
