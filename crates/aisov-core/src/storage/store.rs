use crate::catalogue::CatalogueEntry;
use crate::errors::{PersistenceError, StoreResult};
use crate::model::{
    ClusterAssignment, ContextType, IntentCategory, MetricRow, Prompt, ResponseRow, RunRecord,
    RunStatus, Sentiment, UnclassifiedResponse, VisibilityMetric, VisibilityScore,
};
use chrono::{NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Clone)]
pub struct Store {
    pub conn: Arc<Mutex<Connection>>,
}

pub struct StoreStats {
    pub prompts: u64,
    pub active_prompts: u64,
    pub responses: u64,
    pub metrics: u64,
    pub runs: u64,
    pub last_run_at: Option<String>,
}

impl Store {
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn init_schema(&self) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(crate::storage::schema::DDL)?;
        Ok(())
    }

    pub(crate) fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| PersistenceError::Poisoned)
    }

    // prompts

    /// Inserts entries whose exact text is not yet present. Returns the number inserted.
    pub fn upsert_prompts(&self, entries: &[CatalogueEntry]) -> StoreResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let created_at = now_rfc3339();
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO prompts(text, intent_category, active, created_at)
                 VALUES (?1, ?2, 1, ?3)
                 ON CONFLICT(text) DO NOTHING",
            )?;
            for e in entries {
                inserted += stmt.execute(params![e.text, e.intent_category.as_str(), created_at])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    pub fn active_prompts(&self, limit: Option<usize>) -> StoreResult<Vec<Prompt>> {
        let conn = self.lock()?;
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let mut stmt = conn.prepare(
            "SELECT id, text, intent_category, active FROM prompts
             WHERE active = 1 ORDER BY id LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], read_prompt)?;
        collect_rows(rows)
    }

    pub fn all_prompts(&self) -> StoreResult<Vec<Prompt>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT id, text, intent_category, active FROM prompts ORDER BY id")?;
        let rows = stmt.query_map([], read_prompt)?;
        collect_rows(rows)
    }

    /// Returns false when no prompt has this id.
    pub fn set_prompt_active(&self, prompt_id: i64, active: bool) -> StoreResult<bool> {
        let conn = self.lock()?;
        let n = conn.execute(
            "UPDATE prompts SET active = ?1 WHERE id = ?2",
            params![active, prompt_id],
        )?;
        Ok(n == 1)
    }

    // runs

    pub fn create_run(&self, config_json: &str) -> StoreResult<Uuid> {
        let run_id = Uuid::new_v4();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO runs(run_id, status, started_at, config_json) VALUES (?1, ?2, ?3, ?4)",
            params![
                run_id.to_string(),
                RunStatus::Running.as_str(),
                now_rfc3339(),
                config_json
            ],
        )?;
        Ok(run_id)
    }

    pub fn update_run_counts(
        &self,
        run_id: Uuid,
        prompts_count: Option<u64>,
        responses_count: Option<u64>,
    ) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE runs SET
                prompts_count = COALESCE(?2, prompts_count),
                responses_count = COALESCE(?3, responses_count)
             WHERE run_id = ?1",
            params![
                run_id.to_string(),
                prompts_count.map(|c| c as i64),
                responses_count.map(|c| c as i64)
            ],
        )?;
        Ok(())
    }

    /// Moves a running run to its terminal state. Fails if the run is unknown
    /// or already finished.
    pub fn finish_run(
        &self,
        run_id: Uuid,
        status: RunStatus,
        error_message: Option<&str>,
    ) -> StoreResult<()> {
        if !status.is_terminal() {
            return Err(PersistenceError::Invariant(format!(
                "cannot finish run {} with non-terminal status {}",
                run_id,
                status.as_str()
            )));
        }
        let conn = self.lock()?;
        let n = conn.execute(
            "UPDATE runs SET status = ?2, finished_at = ?3, error_message = ?4
             WHERE run_id = ?1 AND status = 'running'",
            params![run_id.to_string(), status.as_str(), now_rfc3339(), error_message],
        )?;
        if n != 1 {
            return Err(PersistenceError::Invariant(format!(
                "run {} is not in running state",
                run_id
            )));
        }
        Ok(())
    }

    pub fn get_run(&self, run_id: Uuid) -> StoreResult<Option<RunRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT run_id, status, started_at, finished_at, prompts_count, responses_count, error_message
             FROM runs WHERE run_id = ?1",
        )?;
        Ok(stmt.query_row(params![run_id.to_string()], read_run).optional()?)
    }

    pub fn recent_runs(&self, limit: usize) -> StoreResult<Vec<RunRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT run_id, status, started_at, finished_at, prompts_count, responses_count, error_message
             FROM runs ORDER BY started_at DESC, rowid DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], read_run)?;
        collect_rows(rows)
    }

    // responses

    /// Returns false when a response for this (prompt, provider, run) already exists.
    pub fn insert_response(&self, row: &ResponseRow) -> StoreResult<bool> {
        let conn = self.lock()?;
        let n = conn.execute(
            "INSERT INTO responses(
                id, prompt_id, provider_name, model_version, text, token_count, latency_ms, run_id, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(prompt_id, provider_name, run_id) DO NOTHING",
            params![
                row.id,
                row.prompt_id,
                row.provider_name,
                row.model_version,
                row.text,
                row.token_count.map(|t| t as i64),
                row.latency_ms as i64,
                row.run_id.map(|r| r.to_string()),
                now_rfc3339()
            ],
        )?;
        Ok(n == 1)
    }

    pub fn responses_for_run(&self, run_id: Uuid) -> StoreResult<Vec<ResponseRow>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, prompt_id, provider_name, model_version, text, token_count, latency_ms, run_id
             FROM responses WHERE run_id = ?1 ORDER BY rowid",
        )?;
        let rows = stmt.query_map(params![run_id.to_string()], |row| {
            let run_id: Option<String> = row.get(7)?;
            Ok(ResponseRow {
                id: row.get(0)?,
                prompt_id: row.get(1)?,
                provider_name: row.get(2)?,
                model_version: row.get(3)?,
                text: row.get(4)?,
                token_count: row.get::<_, Option<i64>>(5)?.map(|t| t as u32),
                latency_ms: row.get::<_, i64>(6)? as u64,
                run_id: run_id.and_then(|s| Uuid::parse_str(&s).ok()),
            })
        })?;
        collect_rows(rows)
    }

    /// Responses with no metric yet, oldest first.
    pub fn unclassified_responses(
        &self,
        limit: Option<usize>,
    ) -> StoreResult<Vec<UnclassifiedResponse>> {
        let conn = self.lock()?;
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let mut stmt = conn.prepare(
            "SELECT r.id, r.prompt_id, r.provider_name, p.text, r.text, p.intent_category
             FROM responses r
             JOIN prompts p ON p.id = r.prompt_id
             LEFT JOIN metrics m ON m.response_id = r.id
             WHERE m.id IS NULL
             ORDER BY r.rowid
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(UnclassifiedResponse {
                response_id: row.get(0)?,
                prompt_id: row.get(1)?,
                provider_name: row.get(2)?,
                prompt_text: row.get(3)?,
                response_text: row.get(4)?,
                intent_category: read_category(row, 5)?,
            })
        })?;
        collect_rows(rows)
    }

    // metrics

    pub fn insert_metric(&self, response_id: &str, m: &VisibilityMetric) -> StoreResult<i64> {
        let competitors = serde_json::to_string(&m.competitors)?;
        let raw = serde_json::to_string(&m.raw_classification)?;
        let conn = self.lock()?;
        let id = conn.query_row(
            "INSERT INTO metrics(
                response_id, brand_name, brand_mentioned, rank_position, sentiment, context_type,
                recommendation_strength, competitor_mentioned, competitors_json,
                classification_model, classification_confidence, raw_classification, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
             RETURNING id",
            params![
                response_id,
                m.brand_name,
                m.brand_mentioned,
                m.rank_position.map(|r| r as i64),
                m.sentiment.as_str(),
                m.context_type.as_str(),
                m.recommendation_strength,
                m.competitor_mentioned,
                competitors,
                m.classification_model,
                m.classification_confidence,
                raw,
                now_rfc3339()
            ],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Metrics for `brand` created on a UTC date within `[start, end]`.
    pub fn metrics_in_period(
        &self,
        brand: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<MetricRow>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT m.id, m.response_id, r.provider_name, p.intent_category,
                    m.brand_name, m.brand_mentioned, m.rank_position, m.sentiment, m.context_type,
                    m.recommendation_strength, m.competitor_mentioned, m.competitors_json,
                    m.classification_model, m.classification_confidence, m.raw_classification
             FROM metrics m
             JOIN responses r ON r.id = m.response_id
             JOIN prompts p ON p.id = r.prompt_id
             WHERE m.brand_name = ?1 AND substr(m.created_at, 1, 10) BETWEEN ?2 AND ?3
             ORDER BY m.id",
        )?;
        let rows = stmt.query_map(params![brand, fmt_date(start), fmt_date(end)], |row| {
            let competitors: String = row.get(11)?;
            let raw: String = row.get(14)?;
            Ok(MetricRow {
                metric_id: row.get(0)?,
                response_id: row.get(1)?,
                provider_name: row.get(2)?,
                intent_category: read_category(row, 3)?,
                metric: VisibilityMetric {
                    brand_name: row.get(4)?,
                    brand_mentioned: row.get(5)?,
                    rank_position: row.get::<_, Option<i64>>(6)?.map(|r| r as u32),
                    sentiment: Sentiment::parse(&row.get::<_, String>(7)?).unwrap_or_default(),
                    context_type: ContextType::parse(&row.get::<_, String>(8)?)
                        .unwrap_or_default(),
                    recommendation_strength: row.get(9)?,
                    competitor_mentioned: row.get(10)?,
                    competitors: serde_json::from_str::<BTreeSet<String>>(&competitors)
                        .unwrap_or_default(),
                    classification_model: row.get(12)?,
                    classification_confidence: row.get(13)?,
                    raw_classification: serde_json::from_str(&raw)
                        .unwrap_or(serde_json::Value::Null),
                },
            })
        })?;
        collect_rows(rows)
    }

    // scores

    pub fn insert_scores(&self, scores: &[VisibilityScore]) -> StoreResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO scores(
                    brand_name, provider_name, intent_category, period_start, period_end,
                    mention_rate, avg_rank_score, positive_sentiment_ratio,
                    recommendation_strength_avg, aisov, sample_size, computed_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;
            for s in scores {
                stmt.execute(params![
                    s.brand_name,
                    s.provider_name,
                    s.intent_category.map(|c| c.as_str()),
                    fmt_date(s.period_start),
                    fmt_date(s.period_end),
                    s.mention_rate,
                    s.avg_rank_score,
                    s.positive_sentiment_ratio,
                    s.recommendation_strength_avg,
                    s.aisov,
                    s.sample_size as i64,
                    s.computed_at.to_rfc3339_opts(SecondsFormat::Millis, true)
                ])?;
            }
        }
        tx.commit()?;
        Ok(scores.len())
    }

    // clusters

    /// Writes one clustering run. Earlier runs stay in the table but are
    /// superseded for every reader.
    pub fn insert_cluster_assignments(
        &self,
        cluster_run_id: Uuid,
        rows: &[ClusterAssignment],
    ) -> StoreResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let created_at = now_rfc3339();
        {
            let mut stmt = tx.prepare(
                "INSERT INTO cluster_assignments(
                    cluster_run_id, prompt_id, cluster_label, cluster_number, embedding,
                    algorithm, silhouette_score, created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for a in rows {
                stmt.execute(params![
                    cluster_run_id.to_string(),
                    a.prompt_id,
                    a.cluster_label,
                    a.cluster_number,
                    crate::embeddings::util::encode_vec_f32(&a.embedding),
                    a.algorithm,
                    a.silhouette_score,
                    created_at
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    pub fn latest_cluster_assignments(&self) -> StoreResult<Vec<ClusterAssignment>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT prompt_id, cluster_label, cluster_number, embedding, algorithm, silhouette_score
             FROM cluster_assignments
             WHERE cluster_run_id = (
                 SELECT cluster_run_id FROM cluster_assignments ORDER BY id DESC LIMIT 1
             )
             ORDER BY prompt_id",
        )?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let blob: Vec<u8> = row.get(3)?;
            out.push(ClusterAssignment {
                prompt_id: row.get(0)?,
                cluster_label: row.get(1)?,
                cluster_number: row.get(2)?,
                embedding: crate::embeddings::util::decode_vec_f32(&blob)?,
                algorithm: row.get(4)?,
                silhouette_score: row.get(5)?,
            });
        }
        Ok(out)
    }

    // embeddings
    pub fn get_embedding(&self, key: &str) -> StoreResult<Option<(String, Vec<f32>)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT model, vec FROM embeddings WHERE key = ?1 LIMIT 1")?;
        let mut rows = stmt.query(params![key])?;
        if let Some(row) = rows.next()? {
            let model: String = row.get(0)?;
            let blob: Vec<u8> = row.get(1)?;
            Ok(Some((model, crate::embeddings::util::decode_vec_f32(&blob)?)))
        } else {
            Ok(None)
        }
    }

    pub fn put_embedding(&self, key: &str, model: &str, vec: &[f32]) -> StoreResult<()> {
        let conn = self.lock()?;
        let blob = crate::embeddings::util::encode_vec_f32(vec);
        conn.execute(
            "INSERT OR REPLACE INTO embeddings (key, model, dims, vec, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![key, model, vec.len() as i64, blob, now_rfc3339()],
        )?;
        Ok(())
    }

    pub fn stats(&self) -> StoreResult<StoreStats> {
        let conn = self.lock()?;
        let count = |sql: &str| -> StoreResult<u64> {
            Ok(conn.query_row(sql, [], |r| r.get::<_, i64>(0))? as u64)
        };
        Ok(StoreStats {
            prompts: count("SELECT COUNT(*) FROM prompts")?,
            active_prompts: count("SELECT COUNT(*) FROM prompts WHERE active = 1")?,
            responses: count("SELECT COUNT(*) FROM responses")?,
            metrics: count("SELECT COUNT(*) FROM metrics")?,
            runs: count("SELECT COUNT(*) FROM runs")?,
            last_run_at: conn
                .query_row(
                    "SELECT started_at FROM runs ORDER BY started_at DESC LIMIT 1",
                    [],
                    |r| r.get(0),
                )
                .optional()?,
        })
    }
}

pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn fmt_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

pub(crate) fn collect_rows<T>(
    rows: impl Iterator<Item = rusqlite::Result<T>>,
) -> StoreResult<Vec<T>> {
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

fn read_category(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<IntentCategory> {
    let s: String = row.get(idx)?;
    IntentCategory::parse(&s).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown intent category '{}'", s).into(),
        )
    })
}

fn read_prompt(row: &rusqlite::Row<'_>) -> rusqlite::Result<Prompt> {
    Ok(Prompt {
        id: row.get(0)?,
        text: row.get(1)?,
        intent_category: read_category(row, 2)?,
        active: row.get(3)?,
    })
}

fn read_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunRecord> {
    let run_id: String = row.get(0)?;
    let status: String = row.get(1)?;
    Ok(RunRecord {
        run_id: Uuid::parse_str(&run_id).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?,
        status: RunStatus::parse(&status).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                rusqlite::types::Type::Text,
                format!("unknown run status '{}'", status).into(),
            )
        })?,
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        prompts_count: row.get::<_, i64>(4)? as u64,
        responses_count: row.get::<_, i64>(5)? as u64,
        error_message: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> Store {
        let s = Store::memory().unwrap();
        s.init_schema().unwrap();
        s
    }

    fn entry(text: &str, cat: IntentCategory) -> CatalogueEntry {
        CatalogueEntry {
            text: text.into(),
            intent_category: cat,
        }
    }

    fn metric(mentioned: bool) -> VisibilityMetric {
        VisibilityMetric {
            brand_name: "HubSpot".into(),
            brand_mentioned: mentioned,
            rank_position: Some(2),
            sentiment: Sentiment::Positive,
            context_type: ContextType::Recommendation,
            recommendation_strength: 0.8,
            competitor_mentioned: true,
            competitors: ["Zoho".to_string()].into_iter().collect(),
            classification_model: "gpt-4o-mini".into(),
            classification_confidence: 0.9,
            raw_classification: json!({"brand_mentioned": mentioned}),
        }
    }

    fn response(prompt_id: i64, provider: &str, run_id: Option<Uuid>) -> ResponseRow {
        ResponseRow {
            id: Uuid::new_v4().to_string(),
            prompt_id,
            provider_name: provider.into(),
            model_version: "m".into(),
            text: "answer".into(),
            token_count: Some(10),
            latency_ms: 5,
            run_id,
        }
    }

    #[test]
    fn seeding_twice_inserts_nothing_new() {
        let s = store();
        let entries = vec![
            entry("best crm", IntentCategory::GenericDiscovery),
            entry("hubspot vs zoho", IntentCategory::Comparison),
        ];
        assert_eq!(s.upsert_prompts(&entries).unwrap(), 2);
        assert_eq!(s.upsert_prompts(&entries).unwrap(), 0);
        assert_eq!(s.all_prompts().unwrap().len(), 2);
    }

    #[test]
    fn deactivated_prompts_are_skipped() {
        let s = store();
        s.upsert_prompts(&[
            entry("a", IntentCategory::Comparison),
            entry("b", IntentCategory::Alternatives),
            entry("c", IntentCategory::RiskCriticism),
        ])
        .unwrap();
        let first = s.active_prompts(None).unwrap()[0].id;
        assert!(s.set_prompt_active(first, false).unwrap());
        assert!(!s.set_prompt_active(9999, false).unwrap());

        let active = s.active_prompts(None).unwrap();
        assert_eq!(active.len(), 2);
        assert!(active.iter().all(|p| p.id != first));
        assert_eq!(s.active_prompts(Some(1)).unwrap().len(), 1);
    }

    #[test]
    fn run_finishes_exactly_once() {
        let s = store();
        let run = s.create_run("{}").unwrap();
        s.update_run_counts(run, Some(3), None).unwrap();
        s.update_run_counts(run, None, Some(9)).unwrap();
        s.finish_run(run, RunStatus::Completed, None).unwrap();

        let rec = s.get_run(run).unwrap().unwrap();
        assert_eq!(rec.status, RunStatus::Completed);
        assert_eq!((rec.prompts_count, rec.responses_count), (3, 9));
        assert!(rec.finished_at.is_some());

        assert!(s.finish_run(run, RunStatus::Failed, Some("late")).is_err());
        assert!(s.finish_run(run, RunStatus::Running, None).is_err());
        assert_eq!(s.get_run(run).unwrap().unwrap().status, RunStatus::Completed);
    }

    #[test]
    fn schema_reapplies_cleanly() {
        let s = store();
        s.upsert_prompts(&[entry("a", IntentCategory::Comparison)]).unwrap();
        s.init_schema().unwrap();
        assert_eq!(s.all_prompts().unwrap().len(), 1);

        let conn = s.conn.lock().unwrap();
        let indexed: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = 'idx_clusters_run'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(indexed, 1);
    }

    #[test]
    fn one_response_per_prompt_provider_run() {
        let s = store();
        s.upsert_prompts(&[entry("a", IntentCategory::Comparison)]).unwrap();
        let run = s.create_run("{}").unwrap();
        assert!(s.insert_response(&response(1, "claude", Some(run))).unwrap());
        assert!(!s.insert_response(&response(1, "claude", Some(run))).unwrap());
        assert!(s.insert_response(&response(1, "chatgpt", Some(run))).unwrap());
        assert_eq!(s.responses_for_run(run).unwrap().len(), 2);
    }

    #[test]
    fn metric_classifies_response_once() {
        let s = store();
        s.upsert_prompts(&[entry("a", IntentCategory::BuyingIntent)]).unwrap();
        let r = response(1, "chatgpt", None);
        s.insert_response(&r).unwrap();

        let pending = s.unclassified_responses(None).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].intent_category, IntentCategory::BuyingIntent);
        assert_eq!(pending[0].prompt_text, "a");

        let id = s.insert_metric(&r.id, &metric(true)).unwrap();
        assert!(id > 0);
        assert!(s.unclassified_responses(None).unwrap().is_empty());
        assert!(s.insert_metric(&r.id, &metric(true)).is_err());

        let today = Utc::now().date_naive();
        let rows = s.metrics_in_period("HubSpot", today, today).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].metric, metric(true));
        assert_eq!(rows[0].provider_name, "chatgpt");

        assert!(s.metrics_in_period("Zoho", today, today).unwrap().is_empty());
        let yesterday = today.pred_opt().unwrap();
        assert!(s
            .metrics_in_period("HubSpot", yesterday, yesterday)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn latest_cluster_run_supersedes_previous() {
        let s = store();
        s.upsert_prompts(&[
            entry("a", IntentCategory::Comparison),
            entry("b", IntentCategory::Comparison),
        ])
        .unwrap();
        let row = |pid: i64, label: &str, n: i32| ClusterAssignment {
            prompt_id: pid,
            cluster_label: label.into(),
            cluster_number: n,
            embedding: vec![0.5, 0.25],
            algorithm: "kmeans".into(),
            silhouette_score: 0.4,
        };
        s.insert_cluster_assignments(Uuid::new_v4(), &[row(1, "old", 0), row(2, "old", 0)])
            .unwrap();
        s.insert_cluster_assignments(Uuid::new_v4(), &[row(1, "new", 1), row(2, "unclustered", -1)])
            .unwrap();

        let latest = s.latest_cluster_assignments().unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].cluster_label, "new");
        assert_eq!(latest[1].cluster_number, -1);
        assert_eq!(latest[0].embedding, vec![0.5, 0.25]);
    }

    #[test]
    fn embedding_cache_round_trips() {
        let s = store();
        assert!(s.get_embedding("k").unwrap().is_none());
        s.put_embedding("k", "m", &[1.0, 2.0]).unwrap();
        let (model, v) = s.get_embedding("k").unwrap().unwrap();
        assert_eq!(model, "m");
        assert_eq!(v, vec![1.0, 2.0]);
    }
}
