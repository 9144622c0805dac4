//! Append-only observability sink.
//!
//! Two tables live in the target store: `agent_observability` (one row per
//! governed query) and `llm_runs` (one row per generation run with derived
//! quality metrics). Rows are only ever inserted. Writes are best-effort:
//! a sink failure is logged and never fails the primary request.
use std::path::Path;

use chrono::Utc;
use rusqlite::params;
use tracing::warn;
use uuid::Uuid;

use crate::db::Db;

const SINK_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS agent_observability (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ts TEXT NOT NULL,
    question TEXT,
    sql_text TEXT,
    rows_returned INTEGER NOT NULL,
    elapsed_seconds REAL NOT NULL,
    total_tokens INTEGER NOT NULL DEFAULT 0,
    cost_usd REAL NOT NULL DEFAULT 0.0,
    risk_label TEXT NOT NULL,
    parent_run_uuid TEXT
);

CREATE TABLE IF NOT EXISTS llm_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_uuid TEXT NOT NULL UNIQUE,
    parent_run_uuid TEXT,
    question TEXT NOT NULL,
    sql_text TEXT,
    is_valid INTEGER NOT NULL,
    rows_returned INTEGER NOT NULL,
    elapsed_seconds REAL NOT NULL,
    risk_label TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);
"#;

/// Categorical risk/quality labels for recorded events.
pub mod risk {
    pub const UNKNOWN: &str = "unknown";
    pub const OK: &str = "ok";
    pub const BLOCKED: &str = "blocked";
    pub const FORMAT_ERROR: &str = "format_error";
    pub const EXECUTION_ERROR: &str = "execution_error";
}

/// One governed query event.
///
/// Token and cost totals are carried for usage accounting; callers that
/// have no usage report pass zero.
#[derive(Debug, Clone)]
pub struct QueryEvent {
    pub question: Option<String>,
    pub sql_text: String,
    pub rows_returned: i64,
    pub elapsed_seconds: f64,
    pub total_tokens: i64,
    pub cost_usd: f64,
    pub risk_label: String,
    /// Correlation id of the generation run that produced the SQL, if any.
    pub parent_run_uuid: Option<String>,
}

/// One generation run with derived quality metrics.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub run_uuid: String,
    pub parent_run_uuid: Option<String>,
    pub question: String,
    pub sql_text: Option<String>,
    pub is_valid: bool,
    pub rows_returned: i64,
    pub elapsed_seconds: f64,
    pub risk_label: String,
}

/// Fresh correlation id for a generation run.
#[must_use]
pub fn new_run_uuid() -> String {
    Uuid::new_v4().to_string()
}

/// Create the sink tables when absent.
pub fn ensure_tables(db: &Db) -> Result<(), rusqlite::Error> {
    db.conn().execute_batch(SINK_SCHEMA_SQL)
}

/// Record a governed query. Best-effort; failures are logged and swallowed.
pub fn log_query(db_path: &Path, event: &QueryEvent) {
    if let Err(e) = try_log_query(db_path, event) {
        warn!("observability log failed: {e}");
    }
}

fn try_log_query(db_path: &Path, event: &QueryEvent) -> anyhow::Result<()> {
    let db = Db::open(db_path)?;
    ensure_tables(&db)?;
    db.conn().execute(
        r#"
        INSERT INTO agent_observability
            (ts, question, sql_text, rows_returned, elapsed_seconds,
             total_tokens, cost_usd, risk_label, parent_run_uuid)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        params![
            Utc::now().to_rfc3339(),
            event.question,
            event.sql_text,
            event.rows_returned,
            event.elapsed_seconds,
            event.total_tokens,
            event.cost_usd,
            event.risk_label,
            event.parent_run_uuid,
        ],
    )?;
    Ok(())
}

/// Record a generation run. Best-effort; failures are logged and swallowed.
pub fn log_run(db_path: &Path, record: &RunRecord) {
    if let Err(e) = try_log_run(db_path, record) {
        warn!("run log failed: {e}");
    }
}

fn try_log_run(db_path: &Path, record: &RunRecord) -> anyhow::Result<()> {
    let db = Db::open(db_path)?;
    ensure_tables(&db)?;
    db.conn().execute(
        r#"
        INSERT INTO llm_runs
            (run_uuid, parent_run_uuid, question, sql_text,
             is_valid, rows_returned, elapsed_seconds, risk_label)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        params![
            record.run_uuid,
            record.parent_run_uuid,
            record.question,
            record.sql_text,
            record.is_valid,
            record.rows_returned,
            record.elapsed_seconds,
            record.risk_label,
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_path(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("obs.sqlite");
        rusqlite::Connection::open(&path).unwrap();
        path
    }

    #[test]
    fn test_query_events_are_append_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);

        for i in 0..3 {
            log_query(
                &path,
                &QueryEvent {
                    question: Some(format!("q{i}")),
                    sql_text: "SELECT 1".to_string(),
                    rows_returned: 1,
                    elapsed_seconds: 0.01,
                    total_tokens: 0,
                    cost_usd: 0.0,
                    risk_label: risk::OK.to_string(),
                    parent_run_uuid: None,
                },
            );
        }

        let db = Db::open(&path).unwrap();
        let n: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM agent_observability", [], |r| r.get(0))
            .unwrap();
        assert_eq!(n, 3);
    }

    #[test]
    fn test_run_record_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);

        let uuid = new_run_uuid();
        log_run(
            &path,
            &RunRecord {
                run_uuid: uuid.clone(),
                parent_run_uuid: None,
                question: "how many customers?".to_string(),
                sql_text: Some("SELECT COUNT(*) FROM customers".to_string()),
                is_valid: true,
                rows_returned: 1,
                elapsed_seconds: 0.5,
                risk_label: risk::OK.to_string(),
            },
        );

        let db = Db::open(&path).unwrap();
        let (stored_uuid, is_valid): (String, bool) = db
            .conn()
            .query_row(
                "SELECT run_uuid, is_valid FROM llm_runs",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(stored_uuid, uuid);
        assert!(is_valid);
    }

    #[test]
    fn test_sink_failure_is_swallowed() {
        // Missing store: must not panic, just warn.
        log_query(
            Path::new("/nonexistent/obs.sqlite"),
            &QueryEvent {
                question: None,
                sql_text: "SELECT 1".to_string(),
                rows_returned: 0,
                elapsed_seconds: 0.0,
                total_tokens: 0,
                cost_usd: 0.0,
                risk_label: risk::UNKNOWN.to_string(),
                parent_run_uuid: None,
            },
        );
    }

    #[test]
    fn test_query_event_persists_usage_and_correlation() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);

        log_query(
            &path,
            &QueryEvent {
                question: Some("orders per country".to_string()),
                sql_text: "SELECT 1".to_string(),
                rows_returned: 1,
                elapsed_seconds: 0.02,
                total_tokens: 120,
                cost_usd: 0.0004,
                risk_label: risk::OK.to_string(),
                parent_run_uuid: Some("run-abc".to_string()),
            },
        );

        let db = Db::open(&path).unwrap();
        let (tokens, cost, parent): (i64, f64, Option<String>) = db
            .conn()
            .query_row(
                "SELECT total_tokens, cost_usd, parent_run_uuid FROM agent_observability",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .unwrap();
        assert_eq!(tokens, 120);
        assert!((cost - 0.0004).abs() < 1e-9);
        assert_eq!(parent.as_deref(), Some("run-abc"));
    }
}
