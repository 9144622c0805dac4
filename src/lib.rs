//! # semgate — Semantic SQL Gateway MCP Server
//!
//! Infers a semantic layer (tables, columns, relationships) from a SQLite
//! database, grounds LLM-generated read-only SQL on it, and executes that
//! SQL under strict guardrails via the Model Context Protocol (MCP).
//!
//! ## Architecture
//!
//! - **[`config`]** — Configuration loading, validation, and store-path resolution
//! - **[`error`]** — Error taxonomy (schema, guard, execution, generation)
//! - **[`db`]** — SQLite connection wrapper (read-write, read-only, in-memory)
//! - **[`semantic`]** — Schema inspection, relationship inference, summary rendering
//! - **[`guard`]** — Read-only SQL admission gate (SELECT/CTE only)
//! - **[`executor`]** — Guarded query execution with named params and row limits
//! - **[`generator`]** — Text-to-SQL generation via an OpenAI-compatible API
//! - **[`observability`]** — Append-only run and query metrics sink
//! - **[`access`]** — Country-based row post-filtering
//! - **[`mcp`]** — MCP server with 5 tool handlers (stdio transport via rmcp)

pub mod access;
pub mod config;
pub mod db;
pub mod error;
pub mod executor;
pub mod generator;
pub mod guard;
pub mod mcp;
pub mod observability;
pub mod semantic;
