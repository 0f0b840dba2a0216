/// Instruction sent as the system message of every classification call.
pub fn system_prompt(brand: &str, competitors: &[String]) -> String {
    let competitors = if competitors.is_empty() {
        "(none listed)".to_string()
    } else {
        competitors.join(", ")
    };
    format!(
        r#"You analyse how brands appear in answers written by AI assistants.
You receive the QUESTION that was asked and the ANSWER that came back.

Extract visibility signals for the primary brand "{brand}".
Known competitors: {competitors}.

Reply with one JSON object and nothing else. No code fences, no prose.
It must have exactly these keys:

{{
  "brand_mentioned": true | false,
  "rank_position": integer >= 1 | null,
  "sentiment": "positive" | "neutral" | "negative",
  "context_type": "recommendation" | "comparison" | "criticism" | "neutral" | "alternative",
  "recommendation_strength": number between 0.0 and 1.0,
  "competitor_mentioned": true | false,
  "competitors_list": [string, ...],
  "confidence": number between 0.0 and 1.0
}}

Rules:
- brand_mentioned: "{brand}" appears in the answer, ignoring case.
- rank_position: the 1-based position of "{brand}" when the answer is a ranked
  or ordered list that includes it. Otherwise null.
- sentiment: the tone of the answer toward "{brand}". Use "neutral" when it is
  not mentioned.
- context_type: "recommendation" when the answer recommends "{brand}",
  "comparison" when it weighs "{brand}" against competitors,
  "criticism" when it focuses on weaknesses of "{brand}",
  "alternative" when "{brand}" is offered as a substitute for another product,
  "neutral" for a plain mention or no mention.
- recommendation_strength: 0.0 means not recommended at all, 1.0 means strongly
  recommended. Use 0.0 when "{brand}" is not mentioned.
- competitor_mentioned: at least one known competitor appears in the answer.
- competitors_list: the known competitors that appear in the answer. Empty if none.
  Only use names from the known list.
- confidence: how sure you are that these values are correct, 0.0 to 1.0."#
    )
}

pub fn user_prompt(prompt_text: &str, response_text: &str) -> String {
    format!("QUESTION:\n{prompt_text}\n\nANSWER:\n{response_text}\n")
}
