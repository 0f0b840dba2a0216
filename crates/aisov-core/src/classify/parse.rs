use crate::errors::ParseError;
use crate::model::{ContextType, Sentiment};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::OnceLock;

fn strip_fences(raw: &str) -> String {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    let opened = match FENCE.get_or_init(|| Regex::new(r"```(?:json)?\s*").ok()) {
        Some(re) => re.replace_all(raw, "").into_owned(),
        None => raw.replace("```json", ""),
    };
    opened.replace("```", "")
}

/// Strips markdown fences and parses the remainder as a JSON object.
pub fn extract_json(raw: &str) -> Result<Map<String, Value>, ParseError> {
    let cleaned = strip_fences(raw);
    let value: Value = serde_json::from_str(cleaned.trim()).map_err(ParseError::InvalidJson)?;
    match value {
        Value::Object(map) => Ok(map),
        Value::Array(_) => Err(ParseError::NotAnObject("array")),
        Value::String(_) => Err(ParseError::NotAnObject("string")),
        Value::Number(_) => Err(ParseError::NotAnObject("number")),
        Value::Bool(_) => Err(ParseError::NotAnObject("boolean")),
        Value::Null => Err(ParseError::NotAnObject("null")),
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DefaultReason {
    Missing,
    Invalid,
    Clamped,
}

/// A field that was substituted or adjusted during validation. Not an error.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ValidationDefault {
    pub field: &'static str,
    pub reason: DefaultReason,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalised {
    pub brand_mentioned: bool,
    pub rank_position: Option<u32>,
    pub sentiment: Sentiment,
    pub context_type: ContextType,
    pub recommendation_strength: f64,
    pub competitor_mentioned: bool,
    pub competitors: BTreeSet<String>,
    pub confidence: f64,
    pub defaults: Vec<ValidationDefault>,
}

struct Validator<'a> {
    data: &'a Map<String, Value>,
    defaults: Vec<ValidationDefault>,
}

impl<'a> Validator<'a> {
    fn mark(&mut self, field: &'static str, reason: DefaultReason) {
        self.defaults.push(ValidationDefault { field, reason });
    }

    fn get(&self, field: &str) -> Option<&'a Value> {
        self.data.get(field).filter(|v| !v.is_null())
    }

    fn boolean(&mut self, field: &'static str) -> bool {
        match self.get(field) {
            None => {
                self.mark(field, DefaultReason::Missing);
                false
            }
            Some(v) => match as_bool(v) {
                Some(b) => b,
                None => {
                    self.mark(field, DefaultReason::Invalid);
                    false
                }
            },
        }
    }

    fn unit_interval(&mut self, field: &'static str, default: f64) -> f64 {
        match self.get(field).and_then(as_number) {
            None => {
                let reason = if self.get(field).is_some() {
                    DefaultReason::Invalid
                } else {
                    DefaultReason::Missing
                };
                self.mark(field, reason);
                default
            }
            Some(x) if !(0.0..=1.0).contains(&x) => {
                self.mark(field, DefaultReason::Clamped);
                x.clamp(0.0, 1.0)
            }
            Some(x) => x,
        }
    }

    fn rank(&mut self) -> Option<u32> {
        const FIELD: &str = "rank_position";
        if !self.data.contains_key(FIELD) {
            self.mark(FIELD, DefaultReason::Missing);
            return None;
        }
        let v = self.get(FIELD)?;
        match as_number(v) {
            Some(x) if x >= 1.0 && x.fract() == 0.0 && x <= u32::MAX as f64 => Some(x as u32),
            _ => {
                self.mark(FIELD, DefaultReason::Invalid);
                None
            }
        }
    }

    fn label<T: Default>(&mut self, field: &'static str, parse: fn(&str) -> Option<T>) -> T {
        match self.get(field) {
            None => {
                self.mark(field, DefaultReason::Missing);
                T::default()
            }
            Some(v) => match v.as_str().and_then(|s| parse(&s.trim().to_lowercase())) {
                Some(t) => t,
                None => {
                    self.mark(field, DefaultReason::Invalid);
                    T::default()
                }
            },
        }
    }

    fn names(&mut self, field: &'static str) -> BTreeSet<String> {
        match self.get(field) {
            None => {
                self.mark(field, DefaultReason::Missing);
                BTreeSet::new()
            }
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|i| i.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Some(_) => {
                self.mark(field, DefaultReason::Invalid);
                BTreeSet::new()
            }
        }
    }
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|x| x.is_finite()),
        _ => None,
    }
}

fn as_bool(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        _ => None,
    }
}

/// Coerces extracted JSON into the metric schema. Total: every input yields a value.
pub fn validate_and_normalise(data: &Map<String, Value>) -> Normalised {
    let mut v = Validator {
        data,
        defaults: Vec::new(),
    };
    let brand_mentioned = v.boolean("brand_mentioned");
    let rank_position = v.rank();
    let sentiment = v.label("sentiment", Sentiment::parse);
    let context_type = v.label("context_type", ContextType::parse);
    let recommendation_strength = v.unit_interval("recommendation_strength", 0.0);
    let competitor_mentioned = v.boolean("competitor_mentioned");
    let competitors = v.names("competitors_list");
    let confidence = v.unit_interval("confidence", 0.5);

    Normalised {
        brand_mentioned,
        rank_position,
        sentiment,
        context_type,
        recommendation_strength,
        competitor_mentioned,
        competitors,
        confidence,
        defaults: v.defaults,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    fn full() -> Value {
        json!({
            "brand_mentioned": true,
            "rank_position": 2,
            "sentiment": "positive",
            "context_type": "recommendation",
            "recommendation_strength": 0.8,
            "competitor_mentioned": true,
            "competitors_list": ["Zoho", "Salesforce"],
            "confidence": 0.9
        })
    }

    #[test]
    fn fenced_and_plain_parse_identically() {
        let plain = full().to_string();
        let fenced = format!("```json\n{}\n```", plain);
        let bare_fence = format!("```\n{}\n```", plain);
        let a = extract_json(&plain).unwrap();
        assert_eq!(a, extract_json(&fenced).unwrap());
        assert_eq!(a, extract_json(&bare_fence).unwrap());
    }

    #[test]
    fn non_json_and_non_objects_fail() {
        assert!(matches!(extract_json("I think so"), Err(ParseError::InvalidJson(_))));
        assert!(matches!(extract_json("[1, 2]"), Err(ParseError::NotAnObject("array"))));
        assert!(matches!(extract_json("```json\n\"x\"\n```"), Err(ParseError::NotAnObject("string"))));
        assert!(extract_json("").is_err());
    }

    #[test]
    fn complete_record_needs_no_defaults() {
        let n = validate_and_normalise(&obj(full()));
        assert!(n.defaults.is_empty(), "{:?}", n.defaults);
        assert_eq!(n.rank_position, Some(2));
        assert_eq!(n.sentiment, Sentiment::Positive);
        assert_eq!(n.context_type, ContextType::Recommendation);
        assert_eq!(n.competitors.len(), 2);
    }

    #[test]
    fn empty_object_gets_documented_defaults() {
        let n = validate_and_normalise(&Map::new());
        assert!(!n.brand_mentioned);
        assert_eq!(n.rank_position, None);
        assert_eq!(n.sentiment, Sentiment::Neutral);
        assert_eq!(n.context_type, ContextType::Neutral);
        assert_eq!(n.recommendation_strength, 0.0);
        assert!(!n.competitor_mentioned);
        assert!(n.competitors.is_empty());
        assert_eq!(n.confidence, 0.5);
        assert_eq!(n.defaults.len(), 8);
        assert!(n.defaults.iter().all(|d| d.reason == DefaultReason::Missing));
    }

    #[test]
    fn out_of_range_values_are_clamped_or_replaced() {
        let n = validate_and_normalise(&obj(json!({
            "brand_mentioned": true,
            "rank_position": 0,
            "sentiment": "ecstatic",
            "context_type": "praise",
            "recommendation_strength": 1.7,
            "competitor_mentioned": false,
            "competitors_list": [],
            "confidence": -3
        })));
        assert_eq!(n.rank_position, None);
        assert_eq!(n.sentiment, Sentiment::Neutral);
        assert_eq!(n.context_type, ContextType::Neutral);
        assert_eq!(n.recommendation_strength, 1.0);
        assert_eq!(n.confidence, 0.0);
        let fields: Vec<_> = n.defaults.iter().map(|d| (d.field, d.reason)).collect();
        assert!(fields.contains(&("rank_position", DefaultReason::Invalid)));
        assert!(fields.contains(&("recommendation_strength", DefaultReason::Clamped)));
        assert!(fields.contains(&("confidence", DefaultReason::Clamped)));
    }

    #[test]
    fn non_numeric_numbers_count_as_missing() {
        let n = validate_and_normalise(&obj(json!({
            "rank_position": "first",
            "recommendation_strength": "high",
            "confidence": {"v": 1},
            "competitors_list": "Zoho"
        })));
        assert_eq!(n.rank_position, None);
        assert_eq!(n.recommendation_strength, 0.0);
        assert_eq!(n.confidence, 0.5);
        assert!(n.competitors.is_empty());
    }

    #[test]
    fn null_rank_is_not_a_default() {
        let mut v = full();
        v["rank_position"] = Value::Null;
        let n = validate_and_normalise(&obj(v));
        assert_eq!(n.rank_position, None);
        assert!(n.defaults.is_empty());
    }

    #[test]
    fn fractional_rank_is_dropped_integral_float_kept() {
        let mut v = full();
        v["rank_position"] = json!(2.5);
        assert_eq!(validate_and_normalise(&obj(v.clone())).rank_position, None);
        v["rank_position"] = json!(3.0);
        assert_eq!(validate_and_normalise(&obj(v)).rank_position, Some(3));
    }

    #[test]
    fn labels_are_case_insensitive() {
        let mut v = full();
        v["sentiment"] = json!(" Negative ");
        v["context_type"] = json!("CRITICISM");
        let n = validate_and_normalise(&obj(v));
        assert_eq!(n.sentiment, Sentiment::Negative);
        assert_eq!(n.context_type, ContextType::Criticism);
    }
}
