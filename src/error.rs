//! Error taxonomy for the gateway.
//!
//! Guard rejections are client input errors; schema and execution failures
//! are server-side and carry the underlying store error class, but messages
//! never embed the resolved store filesystem path.

use thiserror::Error;

/// Errors raised while reading catalog metadata from the store.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("database not found at the configured location")]
    DatabaseUnavailable,

    #[error("failed to read catalog metadata: {0}")]
    SchemaRead(#[from] rusqlite::Error),
}

/// Safety-gate rejection reasons, in evaluation order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("empty SQL")]
    EmptyQuery,

    #[error("only SELECT/WITH (CTE) queries are allowed")]
    NotReadOnly,

    #[error("SQL contains multiple statements (blocked)")]
    MultipleStatements,

    #[error("SQL contains forbidden keyword '{0}' (blocked)")]
    ForbiddenKeyword(String),
}

/// Errors from the guarded execution pipeline.
#[derive(Error, Debug)]
pub enum ExecError {
    /// The query never reached the store.
    #[error(transparent)]
    Rejected(#[from] GuardError),

    #[error(transparent)]
    Database(#[from] SchemaError),

    /// Store-level failure during an admitted query (unknown column,
    /// syntax error, ...). Never retried, never partial.
    #[error("query execution failed: {0}")]
    Execution(#[from] rusqlite::Error),
}

/// Errors from the text-to-SQL generator and its output validation.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("LLM request failed: {0}")]
    Http(String),

    /// The generator produced non-parseable or incomplete structured
    /// output after the single retry.
    #[error("generator did not return valid structured output: {0}")]
    BadFormat(String),

    #[error("generator returned an empty sql field")]
    MissingSql,
}
