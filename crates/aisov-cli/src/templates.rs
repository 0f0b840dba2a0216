pub const SAMPLE_CATALOGUE: &str = r#"[
  {"prompt_id": "GD-01", "prompt_text": "What is the best CRM for a small business?", "intent_category": "generic_discovery"},
  {"prompt_id": "GD-02", "prompt_text": "Which marketing automation platforms should a B2B startup consider?", "intent_category": "generic_discovery"},
  {"prompt_id": "GD-03", "prompt_text": "What tools do sales teams use to track deals?", "intent_category": "generic_discovery"},
  {"prompt_id": "CP-01", "prompt_text": "HubSpot vs Salesforce: which is better for a growing company?", "intent_category": "comparison"},
  {"prompt_id": "CP-02", "prompt_text": "How does HubSpot compare to Zoho CRM on price and features?", "intent_category": "comparison"},
  {"prompt_id": "CP-03", "prompt_text": "Pipedrive or HubSpot for a five-person sales team?", "intent_category": "comparison"},
  {"prompt_id": "BI-01", "prompt_text": "I have a budget of $500 a month. Which CRM should I buy?", "intent_category": "buying_intent"},
  {"prompt_id": "BI-02", "prompt_text": "Which marketing platform should we sign up for this quarter?", "intent_category": "buying_intent"},
  {"prompt_id": "BI-03", "prompt_text": "Recommend a CRM I can start using today with email integration.", "intent_category": "buying_intent"},
  {"prompt_id": "AL-01", "prompt_text": "What are the best alternatives to HubSpot?", "intent_category": "alternatives"},
  {"prompt_id": "AL-02", "prompt_text": "Cheaper alternatives to Salesforce for startups?", "intent_category": "alternatives"},
  {"prompt_id": "AL-03", "prompt_text": "What can I use instead of Marketo for email campaigns?", "intent_category": "alternatives"},
  {"prompt_id": "SS-01", "prompt_text": "Best CRM for real estate agents?", "intent_category": "segment_specific"},
  {"prompt_id": "SS-02", "prompt_text": "Which CRM works best for SaaS companies with product-led growth?", "intent_category": "segment_specific"},
  {"prompt_id": "SS-03", "prompt_text": "What marketing automation do nonprofits use?", "intent_category": "segment_specific"},
  {"prompt_id": "RC-01", "prompt_text": "Is HubSpot too expensive as you scale?", "intent_category": "risk_criticism"},
  {"prompt_id": "RC-02", "prompt_text": "What are the biggest complaints about HubSpot?", "intent_category": "risk_criticism"},
  {"prompt_id": "RC-03", "prompt_text": "Why do companies leave HubSpot?", "intent_category": "risk_criticism"}
]
"#;
