pub const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS prompts (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  text TEXT NOT NULL UNIQUE,
  intent_category TEXT NOT NULL,
  active INTEGER NOT NULL DEFAULT 1,
  created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS runs (
  run_id TEXT PRIMARY KEY,
  status TEXT NOT NULL,
  started_at TEXT NOT NULL,
  finished_at TEXT,
  prompts_count INTEGER NOT NULL DEFAULT 0,
  responses_count INTEGER NOT NULL DEFAULT 0,
  error_message TEXT,
  config_json TEXT
);

CREATE TABLE IF NOT EXISTS responses (
  id TEXT PRIMARY KEY,
  prompt_id INTEGER NOT NULL REFERENCES prompts(id),
  provider_name TEXT NOT NULL,
  model_version TEXT NOT NULL,
  text TEXT NOT NULL,
  token_count INTEGER,
  latency_ms INTEGER NOT NULL,
  run_id TEXT REFERENCES runs(run_id),
  created_at TEXT NOT NULL,
  UNIQUE (prompt_id, provider_name, run_id)
);

CREATE TABLE IF NOT EXISTS metrics (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  response_id TEXT NOT NULL UNIQUE REFERENCES responses(id),
  brand_name TEXT NOT NULL,
  brand_mentioned INTEGER NOT NULL,
  rank_position INTEGER,
  sentiment TEXT NOT NULL,
  context_type TEXT NOT NULL,
  recommendation_strength REAL NOT NULL,
  competitor_mentioned INTEGER NOT NULL,
  competitors_json TEXT NOT NULL,
  classification_model TEXT NOT NULL,
  classification_confidence REAL NOT NULL,
  raw_classification TEXT NOT NULL,
  created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS scores (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  brand_name TEXT NOT NULL,
  provider_name TEXT,
  intent_category TEXT,
  period_start TEXT NOT NULL,
  period_end TEXT NOT NULL,
  mention_rate REAL NOT NULL,
  avg_rank_score REAL NOT NULL,
  positive_sentiment_ratio REAL NOT NULL,
  recommendation_strength_avg REAL NOT NULL,
  aisov REAL NOT NULL,
  sample_size INTEGER NOT NULL,
  computed_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS cluster_assignments (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  cluster_run_id TEXT NOT NULL,
  prompt_id INTEGER NOT NULL REFERENCES prompts(id),
  cluster_label TEXT NOT NULL,
  cluster_number INTEGER NOT NULL,
  embedding BLOB NOT NULL,
  algorithm TEXT NOT NULL,
  silhouette_score REAL NOT NULL,
  created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS embeddings (
  key TEXT PRIMARY KEY,
  model TEXT NOT NULL,
  dims INTEGER NOT NULL,
  vec BLOB NOT NULL,
  created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_responses_run ON responses(run_id);
CREATE INDEX IF NOT EXISTS idx_metrics_brand_created ON metrics(brand_name, created_at);
CREATE INDEX IF NOT EXISTS idx_scores_brand ON scores(brand_name, computed_at);
CREATE INDEX IF NOT EXISTS idx_clusters_run ON cluster_assignments(cluster_run_id);
"#;
