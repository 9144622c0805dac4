//! Text-to-SQL generation: trait seam, prompt assembly, and structured
//! output validation with a single bounded retry.
//!
//! The generator is an untrusted, non-deterministic collaborator. Its
//! output is never executed without passing the safety gate first; this
//! module only guarantees the structural format of the candidate.
pub mod mock;
pub mod openai;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::GenerationError;

/// System prompt for the chat-completions call. The semantic summary is
/// passed in the user message, not here.
const SYSTEM_PROMPT: &str = "You are a data analytics assistant that writes READ-ONLY SQL for SQLite.\n\
Rules:\n\
- Only SELECT or WITH (CTE) statements. Never mutate data or schema.\n\
- Use named parameters (:name) for literal values where sensible.\n\
- Ground every table and column on the SEMANTIC_MODEL you are given.\n\
\n\
Return ONLY a JSON object with exactly this shape:\n\
{\"sql\": \"...\", \"params\": {}, \"notes\": \"brief\"}";

const RETRY_INSTRUCTION: &str = "Your previous reply was not a valid JSON object. \
Reply with ONLY the JSON object {\"sql\": \"...\", \"params\": {}, \"notes\": \"...\"} — \
no prose, no code fences.";

/// Trait for text-to-SQL backends.
///
/// Implementations must be `Send + Sync` for concurrent use behind `Arc`.
pub trait SqlGenerator: Send + Sync {
    /// Produce raw model output for a system/user prompt pair.
    fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String, GenerationError>;
}

/// A structurally valid generated candidate. Not yet gated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSql {
    pub sql: String,
    pub params: Map<String, Value>,
    pub notes: String,
}

#[derive(Deserialize)]
struct CandidatePack {
    #[serde(default)]
    sql: String,
    #[serde(default)]
    params: Map<String, Value>,
    #[serde(default)]
    notes: String,
}

/// Ask the generator for a candidate query grounded on the semantic
/// summary, enforcing the structured output contract.
///
/// On a format failure the call is retried exactly once with a stricter
/// instruction appended; a second failure is terminal. Transport errors
/// are never retried.
pub fn generate_sql(
    generator: &dyn SqlGenerator,
    question: &str,
    semantic_summary: &str,
) -> Result<GeneratedSql, GenerationError> {
    let user = format!("SEMANTIC_MODEL:\n{semantic_summary}\n\nQUESTION:\n{question}");

    let raw = generator.generate(SYSTEM_PROMPT, &user)?;
    match parse_candidate(&raw) {
        Ok(candidate) => Ok(candidate),
        Err(e) => {
            tracing::warn!("generator output failed format validation, retrying once: {e}");
            let stricter = format!("{user}\n\n{RETRY_INSTRUCTION}");
            let raw = generator.generate(SYSTEM_PROMPT, &stricter)?;
            parse_candidate(&raw)
        }
    }
}

/// Parse raw model output into a candidate, tolerating code fences.
fn parse_candidate(raw: &str) -> Result<GeneratedSql, GenerationError> {
    let text = strip_code_fence(raw.trim());

    let pack: CandidatePack = serde_json::from_str(text)
        .map_err(|e| GenerationError::BadFormat(e.to_string()))?;

    let sql = pack.sql.trim().to_string();
    if sql.is_empty() {
        return Err(GenerationError::MissingSql);
    }

    Ok(GeneratedSql {
        sql,
        params: pack.params,
        notes: pack.notes,
    })
}

/// Models routinely wrap JSON in ``` fences despite instructions.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start_matches(['\r', '\n']);
    rest.strip_suffix("```").map_or(rest, str::trim_end)
}
