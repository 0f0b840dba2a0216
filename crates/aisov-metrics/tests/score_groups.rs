use aisov_core::catalogue::CatalogueEntry;
use aisov_core::config::ScoringWeights;
use aisov_core::model::{ContextType, IntentCategory, ResponseRow, Sentiment, VisibilityMetric};
use aisov_core::storage::Store;
use aisov_metrics::{compute_all_scores, ScorePeriod};
use std::collections::BTreeSet;

fn metric(mentioned: bool, rank: Option<u32>, sentiment: Sentiment, rec: f64) -> VisibilityMetric {
    VisibilityMetric {
        brand_name: "HubSpot".into(),
        brand_mentioned: mentioned,
        rank_position: rank,
        sentiment,
        context_type: ContextType::Recommendation,
        recommendation_strength: rec,
        competitor_mentioned: false,
        competitors: BTreeSet::new(),
        classification_model: "gpt-4o-mini".into(),
        classification_confidence: 0.9,
        raw_classification: serde_json::Value::Null,
    }
}

#[test]
fn scores_overall_then_providers_then_intents() -> anyhow::Result<()> {
    let store = Store::memory()?;
    store.init_schema()?;
    store.upsert_prompts(&[
        CatalogueEntry {
            text: "best crm".into(),
            intent_category: IntentCategory::GenericDiscovery,
        },
        CatalogueEntry {
            text: "hubspot vs zoho".into(),
            intent_category: IntentCategory::Comparison,
        },
    ])?;
    let prompts = store.active_prompts(None)?;
    let run_id = store.create_run("{}")?;

    let fixture = [
        (0, "perplexity", metric(true, Some(1), Sentiment::Positive, 0.8)),
        (0, "chatgpt", metric(true, Some(3), Sentiment::Neutral, 0.4)),
        (1, "perplexity", metric(true, Some(2), Sentiment::Negative, 0.2)),
        (1, "chatgpt", metric(false, None, Sentiment::Neutral, 0.0)),
    ];
    for (i, (prompt_idx, provider, m)) in fixture.iter().enumerate() {
        let id = format!("resp-{i}");
        store.insert_response(&ResponseRow {
            id: id.clone(),
            prompt_id: prompts[*prompt_idx].id,
            provider_name: provider.to_string(),
            model_version: "m".into(),
            text: "answer".into(),
            token_count: None,
            latency_ms: 10,
            run_id: Some(run_id),
        })?;
        store.insert_metric(&id, m)?;
    }

    let scores = compute_all_scores(
        &store,
        "HubSpot",
        &ScoringWeights::default(),
        ScorePeriod::today(),
    )?;
    let groups: Vec<(Option<&str>, Option<IntentCategory>)> = scores
        .iter()
        .map(|s| (s.provider_name.as_deref(), s.intent_category))
        .collect();
    assert_eq!(
        groups,
        vec![
            (None, None),
            (Some("chatgpt"), None),
            (Some("perplexity"), None),
            (None, Some(IntentCategory::GenericDiscovery)),
            (None, Some(IntentCategory::Comparison)),
        ]
    );

    let overall = &scores[0];
    assert_eq!(overall.sample_size, 4);
    assert_eq!(overall.mention_rate, 0.75);
    assert_eq!(overall.avg_rank_score, 0.6111);
    assert_eq!(overall.positive_sentiment_ratio, 0.3333);

    let perplexity = &scores[2];
    assert_eq!(perplexity.sample_size, 2);
    assert_eq!(perplexity.mention_rate, 1.0);
    assert_eq!(perplexity.avg_rank_score, 0.75);
    assert_eq!(perplexity.positive_sentiment_ratio, 0.5);

    let board = store.leaderboard()?;
    assert_eq!(board.len(), 1);
    assert_eq!(board[0].aisov, overall.aisov);

    // Other brands and other days are not part of this period.
    let other = compute_all_scores(
        &store,
        "Zoho",
        &ScoringWeights::default(),
        ScorePeriod::today(),
    )?;
    assert_eq!(other.len(), 1);
    assert_eq!(other[0].sample_size, 0);
    Ok(())
}
