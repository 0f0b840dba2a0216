use aisov_core::config::ScoringWeights;
use aisov_core::model::{IntentCategory, Sentiment, VisibilityMetric, VisibilityScore};
use chrono::{NaiveDate, Utc};

/// Which slice of the period a score describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreGroup {
    Overall,
    Provider(String),
    Intent(IntentCategory),
}

pub fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Scores one group of metrics. Components are rounded after `aisov` is
/// taken from their unrounded values; an empty group scores all zeros.
pub fn compute_score<'a, I>(
    metrics: I,
    weights: &ScoringWeights,
    brand: &str,
    group: &ScoreGroup,
    period: (NaiveDate, NaiveDate),
) -> VisibilityScore
where
    I: IntoIterator<Item = &'a VisibilityMetric>,
{
    let mut total = 0usize;
    let mut mentioned = 0usize;
    let mut positive = 0usize;
    let mut ranked = 0usize;
    let mut rank_sum = 0.0;
    let mut rec_sum = 0.0;

    for m in metrics {
        total += 1;
        if m.brand_mentioned {
            mentioned += 1;
            if m.sentiment == Sentiment::Positive {
                positive += 1;
            }
        }
        if let Some(rank) = m.rank_position.filter(|r| *r > 0) {
            ranked += 1;
            rank_sum += 1.0 / rank as f64;
        }
        rec_sum += m.recommendation_strength;
    }

    let mention_rate = ratio(mentioned, total);
    let avg_rank_score = if ranked == 0 { 0.0 } else { rank_sum / ranked as f64 };
    let positive_sentiment_ratio = ratio(positive, mentioned);
    let recommendation_strength_avg = if total == 0 { 0.0 } else { rec_sum / total as f64 };

    let aisov = mention_rate * weights.mention_rate
        + avg_rank_score * weights.rank_score
        + positive_sentiment_ratio * weights.sentiment
        + recommendation_strength_avg * weights.recommendation;

    let (provider_name, intent_category) = match group {
        ScoreGroup::Overall => (None, None),
        ScoreGroup::Provider(p) => (Some(p.clone()), None),
        ScoreGroup::Intent(i) => (None, Some(*i)),
    };

    VisibilityScore {
        brand_name: brand.to_string(),
        provider_name,
        intent_category,
        period_start: period.0,
        period_end: period.1,
        mention_rate: round4(mention_rate),
        avg_rank_score: round4(avg_rank_score),
        positive_sentiment_ratio: round4(positive_sentiment_ratio),
        recommendation_strength_avg: round4(recommendation_strength_avg),
        aisov: round4(aisov),
        sample_size: total as u64,
        computed_at: Utc::now(),
    }
}
