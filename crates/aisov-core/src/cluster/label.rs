use crate::providers::llm::LlmClient;
use std::collections::BTreeMap;

pub const NOISE_LABEL: &str = "unclustered";
pub const UNKNOWN_LABEL: &str = "unknown";
pub const LABEL_TEMPERATURE: f32 = 0.0;
pub const LABEL_MAX_TOKENS: u32 = 30;

pub fn label_prompt(samples: &[&str]) -> String {
    let mut out = String::from(
        "The prompts below were grouped together because users ask them with the same intent.\n\
         Name that intent in 3 to 6 words.\n\
         Reply with the name only.\n\n",
    );
    for s in samples {
        out.push_str("- ");
        out.push_str(s);
        out.push('\n');
    }
    out
}

pub fn clean_label(raw: &str) -> String {
    let cleaned = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .trim();
    if cleaned.is_empty() {
        UNKNOWN_LABEL.to_string()
    } else {
        cleaned.to_string()
    }
}

/// One label per cluster id present in `labels`. Noise is named without a
/// model call; a failed call yields [`UNKNOWN_LABEL`] for that cluster.
pub async fn label_clusters(
    client: &dyn LlmClient,
    texts: &[String],
    labels: &[i32],
    samples_per_cluster: usize,
) -> BTreeMap<i32, String> {
    let mut members: BTreeMap<i32, Vec<&str>> = BTreeMap::new();
    for (text, label) in texts.iter().zip(labels) {
        members.entry(*label).or_default().push(text.as_str());
    }

    let mut out = BTreeMap::new();
    for (cluster, texts) in members {
        if cluster < 0 {
            out.insert(cluster, NOISE_LABEL.to_string());
            continue;
        }
        let sample: Vec<&str> = texts.into_iter().take(samples_per_cluster).collect();
        let label = match client.complete(&label_prompt(&sample), None).await {
            Ok(resp) => clean_label(&resp.text),
            Err(e) => {
                tracing::warn!(event = "aisov.cluster.label_failed", cluster, error = %e, "cluster labelling failed");
                UNKNOWN_LABEL.to_string()
            }
        };
        tracing::debug!(event = "aisov.cluster.labelled", cluster, label = %label);
        out.insert(cluster, label);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::llm::fake::ScriptedClient;

    #[test]
    fn cleans_quotes_and_whitespace() {
        assert_eq!(clean_label("  \"CRM for startups\"\n"), "CRM for startups");
        assert_eq!(clean_label("'Pricing questions'"), "Pricing questions");
        assert_eq!(clean_label(" \"\" "), UNKNOWN_LABEL);
    }

    #[tokio::test]
    async fn samples_first_members_and_skips_noise() {
        let client = ScriptedClient::always("Buying intent");
        let texts: Vec<String> = (0..8).map(|i| format!("prompt {i}")).collect();
        let labels = [0, 0, 0, 0, 0, 0, -1, 1];

        let out = label_clusters(&client, &texts, &labels, 5).await;
        assert_eq!(out.len(), 3);
        assert_eq!(out[&-1], NOISE_LABEL);
        assert_eq!(out[&0], "Buying intent");
        assert_eq!(client.calls(), 2);

        let first = &client.prompts()[0];
        assert!(first.contains("- prompt 4\n"));
        assert!(!first.contains("prompt 5"));
        assert!(!first.contains("prompt 6"));
    }

    #[tokio::test]
    async fn failed_call_yields_unknown() {
        let client = ScriptedClient::failing("quota");
        let texts = vec!["a".to_string(), "b".to_string()];
        let out = label_clusters(&client, &texts, &[0, 0], 5).await;
        assert_eq!(out[&0], UNKNOWN_LABEL);
    }
}
