use crate::errors::CatalogueError;
use crate::model::IntentCategory;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One validated catalogue entry, ready to seed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogueEntry {
    pub text: String,
    pub intent_category: IntentCategory,
}

// Catalogue ids are informational; prompts are keyed by exact text.
#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    prompt_text: String,
    #[serde(default)]
    intent_category: String,
}

pub fn load_catalogue(path: &Path) -> Result<Vec<CatalogueEntry>, CatalogueError> {
    let raw = std::fs::read_to_string(path).map_err(|source| CatalogueError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let entries = parse_catalogue(&raw)?;
    tracing::info!(event = "aisov.catalogue.loaded", path = %path.display(), count = entries.len(), "loaded prompt catalogue");
    Ok(entries)
}

/// Rejects the whole catalogue on the first invalid entry.
pub fn parse_catalogue(raw: &str) -> Result<Vec<CatalogueEntry>, CatalogueError> {
    let items: Vec<RawEntry> = serde_json::from_str(raw)?;
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let text = item.prompt_text.trim().to_string();
            if text.is_empty() {
                return Err(CatalogueError::EmptyText { index });
            }
            let intent_category = IntentCategory::parse(item.intent_category.trim()).ok_or(
                CatalogueError::UnknownCategory {
                    index,
                    category: item.intent_category,
                },
            )?;
            Ok(CatalogueEntry {
                text,
                intent_category,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_entries_with_and_without_ids() {
        let raw = r#"[
            {"prompt_id": 1, "prompt_text": "What is the best CRM?", "intent_category": "generic_discovery"},
            {"prompt_text": "  HubSpot vs Salesforce  ", "intent_category": "comparison"}
        ]"#;
        let out = parse_catalogue(raw).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].text, "HubSpot vs Salesforce");
        assert_eq!(out[1].intent_category, IntentCategory::Comparison);
    }

    #[test]
    fn unknown_category_names_the_entry() {
        let raw = r#"[
            {"prompt_text": "ok", "intent_category": "comparison"},
            {"prompt_text": "bad", "intent_category": "pricing"}
        ]"#;
        match parse_catalogue(raw) {
            Err(CatalogueError::UnknownCategory { index, category }) => {
                assert_eq!(index, 1);
                assert_eq!(category, "pricing");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn empty_text_is_rejected() {
        let raw = r#"[{"prompt_text": "   ", "intent_category": "comparison"}]"#;
        assert!(matches!(
            parse_catalogue(raw),
            Err(CatalogueError::EmptyText { index: 0 })
        ));
    }
}
