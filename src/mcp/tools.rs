//! MCP Tool handlers for semgate.
//!
//! Implements 5 tools over the semantic gateway:
//! 1. get_semantic_layer – inferred schema + relationships + summary
//! 2. run_sql            – guarded read-only SQL execution
//! 3. query              – governed execution (guardrails + observability)
//! 4. text2sql           – LLM question → gated SQL candidate
//! 5. db_env_check       – store location diagnostics
use std::time::Instant;

use rmcp::handler::server::ServerHandler;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{ErrorData as McpError, handler::server::tool::ToolRouter, model::*, tool, tool_router};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::access;
use crate::config::DB_PATH_ENV;
use crate::db::Db;
use crate::error::{ExecError, GenerationError, SchemaError};
use crate::executor;
use crate::generator;
use crate::guard::SqlGuard;
use crate::mcp::server::McpContext;
use crate::observability::{self, QueryEvent, RunRecord, risk};
use crate::semantic;

// ── Parameter structs ────────────────────────────────────────────────

#[derive(Deserialize, JsonSchema)]
struct SemanticLayerParams {
    /// Store path override (default: DB_PATH env, then ./db.sqlite)
    db_path: Option<String>,
}

#[derive(Deserialize, JsonSchema)]
struct RunSqlParams {
    /// SQL to execute (SELECT/WITH only)
    sql: String,
    /// Named parameters bound into the query
    params: Option<Map<String, Value>>,
    /// Store path override
    db_path: Option<String>,
    /// Max rows returned (default from config)
    limit: Option<usize>,
    /// Country codes for row filtering, e.g. "ES,FR" (omit for global access)
    user_countries: Option<String>,
}

#[derive(Deserialize, JsonSchema)]
struct GovernedQueryParams {
    /// Question this query answers, for traceability
    question: String,
    /// SQL generated against the semantic layer
    sql: String,
    /// Named parameters bound into the query
    params: Option<Map<String, Value>>,
    /// Store path override
    db_path: Option<String>,
    /// Correlation id of the originating generation run
    parent_run_uuid: Option<String>,
}

#[derive(Deserialize, JsonSchema)]
struct Text2SqlParams {
    /// Natural-language question to translate into SQL
    question: String,
    /// Store path override
    db_path: Option<String>,
    /// Correlation id of a parent run
    parent_run_uuid: Option<String>,
}

// ── Response helpers ─────────────────────────────────────────────────

fn json_result(value: serde_json::Value) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(&value).unwrap_or_default(),
    )]))
}

fn error_result(msg: &str) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::error(vec![Content::text(msg.to_string())]))
}

/// Map a pipeline failure onto the MCP error split: gate rejections and a
/// missing store are client-visible tool errors, store failures are
/// internal errors.
fn exec_failure(err: &ExecError) -> Result<CallToolResult, McpError> {
    match err {
        ExecError::Rejected(reason) => error_result(&reason.to_string()),
        ExecError::Database(SchemaError::DatabaseUnavailable) => {
            error_result("database not found at the configured location")
        }
        ExecError::Database(e) => Err(McpError::internal_error(
            format!("schema read failed: {e}"),
            None,
        )),
        ExecError::Execution(e) => Err(McpError::internal_error(
            format!("query execution failed: {e}"),
            None,
        )),
    }
}

// ── Tool implementations ─────────────────────────────────────────────

#[derive(Clone)]
pub struct AppTools {
    pub ctx: McpContext,
    pub tool_router: ToolRouter<Self>,
}

impl ServerHandler for AppTools {}

#[tool_router]
impl AppTools {
    pub fn new(ctx: McpContext) -> Self {
        Self {
            ctx,
            tool_router: Self::tool_router(),
        }
    }

    // ── Tool 1: get_semantic_layer ──────────────────────────────────

    #[tool(
        description = "Return the inferred semantic layer of the store: tables, columns, declared and heuristic relationships, and an LLM-ready summary."
    )]
    async fn get_semantic_layer(
        &self,
        params: Parameters<SemanticLayerParams>,
    ) -> Result<CallToolResult, McpError> {
        let db_path = self.ctx.config.resolve_db_path(params.0.db_path.as_deref());

        let db = match Db::open_read_only(&db_path) {
            Ok(db) => db,
            Err(SchemaError::DatabaseUnavailable) => {
                return error_result("database not found at the configured location");
            }
            Err(e) => {
                return Err(McpError::internal_error(format!("open failed: {e}"), None));
            }
        };

        let doc = semantic::build_semantic_document(&db)
            .map_err(|e| McpError::internal_error(format!("schema read failed: {e}"), None))?;

        json_result(serde_json::to_value(&doc).unwrap_or_default())
    }

    // ── Tool 2: run_sql ─────────────────────────────────────────────

    #[tool(
        description = "Execute read-only SQL against the store with guardrails (SELECT/CTE only, single statement, bounded rows). Optionally filters result rows by country."
    )]
    async fn run_sql(&self, params: Parameters<RunSqlParams>) -> Result<CallToolResult, McpError> {
        let p = params.0;
        if p.sql.is_empty() {
            return error_result("sql is required");
        }

        let db_path = self.ctx.config.resolve_db_path(p.db_path.as_deref());
        let bind_params = p.params.unwrap_or_default();
        let limit = p.limit.unwrap_or(self.ctx.config.row_limit);

        let result = match executor::execute_guarded(
            &db_path,
            &p.sql,
            &bind_params,
            limit,
            SqlGuard::default(),
        ) {
            Ok(r) => r,
            Err(e) => return exec_failure(&e),
        };

        let allowed = access::parse_countries(p.user_countries.as_deref());
        let elapsed_seconds = result.elapsed_seconds;
        let filtered = access::filter_rows_by_country(result.rows, allowed.as_deref());

        json_result(serde_json::json!({
            "sql": p.sql,
            "params": bind_params,
            "rows": filtered.rows,
            "rowcount": filtered.rowcount,
            "elapsed_seconds": elapsed_seconds,
            "access_filter_applied": filtered.access_filter_applied,
            "access_note": filtered.access_note,
        }))
    }

    // ── Tool 3: query (governed) ────────────────────────────────────

    #[tool(
        description = "Governed query for the NL→SQL flow: executes with guardrails and records one observability event (question, SQL, row count, latency, risk label) per call."
    )]
    async fn query(
        &self,
        params: Parameters<GovernedQueryParams>,
    ) -> Result<CallToolResult, McpError> {
        let p = params.0;
        let question = p.question.trim().to_string();
        if question.is_empty() {
            return error_result("question is required");
        }

        let db_path = self.ctx.config.resolve_db_path(p.db_path.as_deref());
        let bind_params = p.params.unwrap_or_default();

        let outcome = executor::execute_guarded(
            &db_path,
            &p.sql,
            &bind_params,
            self.ctx.config.row_limit,
            SqlGuard::default(),
        );

        // One sink record per call, whatever the outcome.
        let (rows_returned, elapsed_seconds, risk_label) = match &outcome {
            Ok(r) => (r.rowcount as i64, r.elapsed_seconds, risk::OK),
            Err(ExecError::Rejected(_)) => (0, 0.0, risk::BLOCKED),
            Err(_) => (0, 0.0, risk::EXECUTION_ERROR),
        };
        observability::log_query(
            &db_path,
            &QueryEvent {
                question: Some(question.clone()),
                sql_text: p.sql.clone(),
                rows_returned,
                elapsed_seconds,
                // No usage report on this path; accounted as zero.
                total_tokens: 0,
                cost_usd: 0.0,
                risk_label: risk_label.to_string(),
                parent_run_uuid: p.parent_run_uuid.clone(),
            },
        );

        let result = match outcome {
            Ok(r) => r,
            Err(e) => return exec_failure(&e),
        };

        json_result(serde_json::json!({
            "question": question,
            "sql": p.sql,
            "params": bind_params,
            "rows": result.rows,
            "rowcount": result.rowcount,
            "elapsed_seconds": result.elapsed_seconds,
        }))
    }

    // ── Tool 4: text2sql ────────────────────────────────────────────

    #[tool(
        description = "Translate a natural-language question into read-only SQL grounded on the semantic layer. The candidate is validated by the safety gate and trial-executed; a run record with quality metrics is persisted."
    )]
    async fn text2sql(
        &self,
        params: Parameters<Text2SqlParams>,
    ) -> Result<CallToolResult, McpError> {
        let p = params.0;
        let question = p.question.trim().to_string();
        if question.is_empty() {
            return error_result("question is required");
        }

        let Some(generator_impl) = self.ctx.generator.clone() else {
            return error_result("no LLM backend configured (OPENAI_API_KEY is not set)");
        };

        let db_path = self.ctx.config.resolve_db_path(p.db_path.as_deref());

        let summary = match Db::open_read_only(&db_path)
            .and_then(|db| semantic::build_semantic_document(&db))
        {
            Ok(doc) => doc.summary,
            Err(SchemaError::DatabaseUnavailable) => {
                return error_result("database not found at the configured location");
            }
            Err(e) => {
                return Err(McpError::internal_error(
                    format!("schema read failed: {e}"),
                    None,
                ));
            }
        };

        let run_uuid = observability::new_run_uuid();
        let started = Instant::now();

        // The LLM client is blocking; keep it off the async executor.
        let gen_question = question.clone();
        let candidate = tokio::task::spawn_blocking(move || {
            generator::generate_sql(generator_impl.as_ref(), &gen_question, &summary)
        })
        .await
        .map_err(|e| McpError::internal_error(format!("generation task failed: {e}"), None))?;

        let candidate = match candidate {
            Ok(c) => c,
            Err(e) => {
                let risk_label = match &e {
                    GenerationError::BadFormat(_) | GenerationError::MissingSql => {
                        risk::FORMAT_ERROR
                    }
                    GenerationError::Http(_) => risk::UNKNOWN,
                };
                observability::log_run(
                    &db_path,
                    &RunRecord {
                        run_uuid,
                        parent_run_uuid: p.parent_run_uuid,
                        question,
                        sql_text: None,
                        is_valid: false,
                        rows_returned: 0,
                        elapsed_seconds: started.elapsed().as_secs_f64(),
                        risk_label: risk_label.to_string(),
                    },
                );
                return Err(McpError::internal_error(
                    format!("generation failed: {e}"),
                    None,
                ));
            }
        };

        // Model-generated SQL goes through the strict gate before any
        // trial execution.
        if let Err(reason) = SqlGuard::strict().admit(&candidate.sql) {
            observability::log_run(
                &db_path,
                &RunRecord {
                    run_uuid,
                    parent_run_uuid: p.parent_run_uuid,
                    question,
                    sql_text: Some(candidate.sql.clone()),
                    is_valid: false,
                    rows_returned: 0,
                    elapsed_seconds: started.elapsed().as_secs_f64(),
                    risk_label: risk::BLOCKED.to_string(),
                },
            );
            return error_result(&format!("generated SQL was blocked: {reason}"));
        }

        // Trial execution derives the quality metrics; a failure here
        // still returns the candidate, flagged invalid.
        let trial = executor::execute_guarded(
            &db_path,
            &candidate.sql,
            &candidate.params,
            self.ctx.config.row_limit,
            SqlGuard::strict(),
        );
        let elapsed_seconds = started.elapsed().as_secs_f64();

        let (is_valid, rows_returned, risk_label) = match &trial {
            Ok(r) => (true, r.rowcount as i64, risk::OK),
            Err(_) => (false, 0, risk::EXECUTION_ERROR),
        };
        observability::log_run(
            &db_path,
            &RunRecord {
                run_uuid: run_uuid.clone(),
                parent_run_uuid: p.parent_run_uuid,
                question: question.clone(),
                sql_text: Some(candidate.sql.clone()),
                is_valid,
                rows_returned,
                elapsed_seconds,
                risk_label: risk_label.to_string(),
            },
        );

        json_result(serde_json::json!({
            "sql": candidate.sql,
            "params": candidate.params,
            "notes": candidate.notes,
            "run_uuid": run_uuid,
            "elapsed_seconds": elapsed_seconds,
            "is_valid": is_valid,
            "rowcount": rows_returned,
        }))
    }

    // ── Tool 5: db_env_check ────────────────────────────────────────

    #[tool(description = "Report whether DB_PATH is set and whether the store file exists.")]
    async fn db_env_check(&self) -> Result<CallToolResult, McpError> {
        let env_value = std::env::var(DB_PATH_ENV).ok();
        let resolved = self.ctx.config.resolve_db_path(None);

        json_result(serde_json::json!({
            "db_path_env_set": env_value.is_some(),
            "exists": resolved.exists(),
        }))
    }
}
