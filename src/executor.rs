//! Guarded Query Executor: gate, bind, run, truncate.
//!
//! Every call opens a fresh read-only connection which is released on all
//! exit paths. Parameters go through SQLite's named-parameter binding;
//! values are never interpolated into the SQL text.
use std::path::Path;
use std::time::Instant;

use rusqlite::ToSql;
use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::{Map, Value};

use crate::db::Db;
use crate::error::ExecError;
use crate::guard::SqlGuard;

/// One result row: column name → dynamically typed value, in the
/// executing query's own projection order.
pub type Row = Map<String, Value>;

/// Result of a guarded execution.
#[derive(Debug, Clone, serde::Serialize)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub rowcount: usize,
    pub elapsed_seconds: f64,
}

/// Gate and execute a query against the store at `db_path`.
///
/// At most `row_limit` rows are fetched (client-side truncation).
/// `elapsed_seconds` covers the execution and fetch phase only, not
/// connection setup.
pub fn execute_guarded(
    db_path: &Path,
    sql: &str,
    params: &Map<String, Value>,
    row_limit: usize,
    guard: SqlGuard,
) -> Result<QueryResult, ExecError> {
    guard.admit(sql)?;

    let db = Db::open_read_only(db_path)?;
    let limit = row_limit.max(1);
    let started = Instant::now();

    let mut stmt = db.conn().prepare(sql)?;
    let col_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let bound: Vec<(String, SqlValue)> = params
        .iter()
        .map(|(k, v)| (param_key(k), json_to_sql(v)))
        .collect();
    let refs: Vec<(&str, &dyn ToSql)> = bound
        .iter()
        .map(|(k, v)| (k.as_str(), v as &dyn ToSql))
        .collect();

    let mut rows = stmt.query(refs.as_slice())?;
    let mut out: Vec<Row> = Vec::new();
    while out.len() < limit {
        let Some(row) = rows.next()? else { break };
        let mut mapped = Map::new();
        for (i, name) in col_names.iter().enumerate() {
            mapped.insert(name.clone(), value_ref_to_json(row.get_ref(i)?));
        }
        out.push(mapped);
    }

    let elapsed_seconds = started.elapsed().as_secs_f64();
    Ok(QueryResult {
        rowcount: out.len(),
        rows: out,
        elapsed_seconds,
    })
}

/// SQLite named parameters carry a `:`/`@`/`$` prefix; callers pass bare
/// names in JSON.
fn param_key(name: &str) -> String {
    if name.starts_with(':') || name.starts_with('@') || name.starts_with('$') {
        name.to_string()
    } else {
        format!(":{name}")
    }
}

fn json_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::Integer(i)
            } else {
                SqlValue::Real(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => SqlValue::Text(s.clone()),
        // Structured values have no SQLite shape; bind their JSON text.
        other => SqlValue::Text(other.to_string()),
    }
}

fn value_ref_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GuardError;
    use std::path::PathBuf;

    fn seeded_store(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("test.sqlite");
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE customers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                country_code TEXT
            );
            INSERT INTO customers (name, country_code) VALUES
                ('Iberia Retail', 'ES'),
                ('Paris Dist', 'FR');
            "#,
        )
        .unwrap();
        path
    }

    #[test]
    fn test_count_query_returns_single_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded_store(&dir);

        let result = execute_guarded(
            &path,
            "SELECT COUNT(*) AS n FROM customers",
            &Map::new(),
            1000,
            SqlGuard::default(),
        )
        .unwrap();

        assert_eq!(result.rowcount, 1);
        assert_eq!(result.rows[0]["n"], Value::from(2));
        assert!(result.elapsed_seconds >= 0.0);
    }

    #[test]
    fn test_named_parameters_bind_without_interpolation() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded_store(&dir);

        let mut params = Map::new();
        params.insert("cc".to_string(), Value::String("ES".to_string()));

        let result = execute_guarded(
            &path,
            "SELECT name FROM customers WHERE country_code = :cc",
            &params,
            1000,
            SqlGuard::default(),
        )
        .unwrap();

        assert_eq!(result.rowcount, 1);
        assert_eq!(result.rows[0]["name"], Value::from("Iberia Retail"));
    }

    #[test]
    fn test_row_limit_truncates_client_side() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded_store(&dir);

        let result = execute_guarded(
            &path,
            "SELECT id FROM customers ORDER BY id",
            &Map::new(),
            1,
            SqlGuard::default(),
        )
        .unwrap();

        assert_eq!(result.rowcount, 1);
        assert_eq!(result.rows[0]["id"], Value::from(1));
    }

    #[test]
    fn test_rejected_query_never_touches_store() {
        // Nonexistent path: a gate rejection must win over the missing
        // store, proving validation happens before any connection.
        let err = execute_guarded(
            Path::new("/nonexistent/never.sqlite"),
            "DELETE FROM customers",
            &Map::new(),
            1000,
            SqlGuard::default(),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            ExecError::Rejected(GuardError::NotReadOnly)
        ));
    }

    #[test]
    fn test_store_error_surfaces_as_execution_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded_store(&dir);

        let err = execute_guarded(
            &path,
            "SELECT no_such_column FROM customers",
            &Map::new(),
            1000,
            SqlGuard::default(),
        )
        .unwrap_err();

        assert!(matches!(err, ExecError::Execution(_)));
    }

    #[test]
    fn test_row_values_keep_projection_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded_store(&dir);

        let result = execute_guarded(
            &path,
            "SELECT country_code, name, id FROM customers ORDER BY id LIMIT 1",
            &Map::new(),
            1000,
            SqlGuard::default(),
        )
        .unwrap();

        let keys: Vec<&String> = result.rows[0].keys().collect();
        assert_eq!(keys, vec!["country_code", "name", "id"]);
    }
}
