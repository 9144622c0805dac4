//! SQL Safety Gate: admits or rejects a candidate query string before it
//! ever reaches the store.
//!
//! Pure, synchronous validation — no connection, no parsing. Keyword
//! matching is token based (word boundaries), not grammar aware: a column
//! alias containing a forbidden word over-rejects, and an obfuscated
//! mutating statement that avoids every listed keyword would pass. That
//! tradeoff is deliberate; this is defense in depth, not a SQL firewall.
use std::sync::LazyLock;

use regex::Regex;

use crate::error::GuardError;

/// Keywords blocked for any caller.
const FORBIDDEN_KEYWORDS: &[&str] = &[
    "drop", "delete", "truncate", "alter", "update", "insert", "attach", "detach", "pragma",
    "vacuum",
];

/// Additional keywords blocked for model-generated SQL.
const STRICT_KEYWORDS: &[&str] = &["create", "replace", "reindex"];

/// A semicolon followed (after optional whitespace) by anything else
/// means a second statement is stacked on.
static MULTI_STMT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r";\s*\S").expect("multi-statement regex"));

static FORBIDDEN_RE: LazyLock<Regex> = LazyLock::new(|| keyword_regex(FORBIDDEN_KEYWORDS));

static STRICT_RE: LazyLock<Regex> = LazyLock::new(|| {
    let all: Vec<&str> = FORBIDDEN_KEYWORDS
        .iter()
        .chain(STRICT_KEYWORDS)
        .copied()
        .collect();
    keyword_regex(&all)
});

fn keyword_regex(keywords: &[&str]) -> Regex {
    Regex::new(&format!(r"(?i)\b({})\b", keywords.join("|"))).expect("forbidden keyword regex")
}

/// Read-only admission gate for SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlGuard {
    /// Base forbidden-keyword set (human-submitted SQL).
    #[default]
    Base,
    /// Base set plus `create`, `replace`, `reindex` (generated SQL).
    Strict,
}

impl SqlGuard {
    pub fn strict() -> Self {
        SqlGuard::Strict
    }

    /// Admit or reject a candidate query.
    ///
    /// Rules are evaluated in order; the first failure determines the
    /// rejection reason:
    /// 1. empty or whitespace-only text;
    /// 2. must begin with `select` or `with` (case-insensitive) — `with`
    ///    admits CTE queries that terminate in a SELECT;
    /// 3. no statement stacking (`;` followed by more text);
    /// 4. no forbidden keyword anywhere, as a bare token.
    pub fn admit(&self, sql: &str) -> Result<(), GuardError> {
        let trimmed = sql.trim();
        if trimmed.is_empty() {
            return Err(GuardError::EmptyQuery);
        }

        let lower = trimmed.to_lowercase();
        if !(lower.starts_with("select") || lower.starts_with("with")) {
            return Err(GuardError::NotReadOnly);
        }

        if MULTI_STMT_RE.is_match(trimmed) {
            return Err(GuardError::MultipleStatements);
        }

        let keyword_re: &Regex = match self {
            SqlGuard::Base => &FORBIDDEN_RE,
            SqlGuard::Strict => &STRICT_RE,
        };
        if let Some(m) = keyword_re.find(trimmed) {
            return Err(GuardError::ForbiddenKeyword(m.as_str().to_lowercase()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admits_select_and_cte() {
        let guard = SqlGuard::default();
        guard.admit("SELECT 1").unwrap();
        guard
            .admit("WITH x AS (SELECT 1) SELECT * FROM x")
            .unwrap();
        guard.admit("  select name from customers  ").unwrap();
    }

    #[test]
    fn test_rejects_empty() {
        let guard = SqlGuard::default();
        assert_eq!(guard.admit(""), Err(GuardError::EmptyQuery));
        assert_eq!(guard.admit("   \n\t "), Err(GuardError::EmptyQuery));
    }

    #[test]
    fn test_rejects_non_select_prefix() {
        let guard = SqlGuard::default();
        assert_eq!(
            guard.admit("DELETE FROM customers"),
            Err(GuardError::NotReadOnly)
        );
        assert_eq!(
            guard.admit("EXPLAIN SELECT 1"),
            Err(GuardError::NotReadOnly)
        );
    }

    #[test]
    fn test_rejects_stacked_statements() {
        let guard = SqlGuard::default();
        assert_eq!(
            guard.admit("SELECT 1; SELECT 2"),
            Err(GuardError::MultipleStatements)
        );
        assert_eq!(
            guard.admit("SELECT 1;\nDROP TABLE customers"),
            Err(GuardError::MultipleStatements)
        );
        // Trailing semicolon alone is fine.
        guard.admit("SELECT 1;").unwrap();
        guard.admit("SELECT 1;   ").unwrap();
    }

    #[test]
    fn test_rejects_forbidden_keywords_as_tokens() {
        let guard = SqlGuard::default();
        assert_eq!(
            guard.admit("SELECT * FROM t WHERE x = 'a' AND delete = 1"),
            Err(GuardError::ForbiddenKeyword("delete".to_string()))
        );
        // Keyword hidden in a string literal is still blocked — accepted
        // over-rejection of the token matcher.
        assert_eq!(
            guard.admit("SELECT 'drop table x'"),
            Err(GuardError::ForbiddenKeyword("drop".to_string()))
        );
        // Substring inside a longer identifier does not match the token.
        guard.admit("SELECT update_count FROM stats").unwrap();
    }

    #[test]
    fn test_strict_variant_blocks_ddl_extras() {
        let base = SqlGuard::default();
        let strict = SqlGuard::strict();

        base.admit("SELECT create_ts FROM t").unwrap();
        base.admit("SELECT * FROM reindex_log").unwrap();

        assert_eq!(
            strict.admit("WITH x AS (SELECT 1) SELECT replace FROM x"),
            Err(GuardError::ForbiddenKeyword("replace".to_string()))
        );
        assert_eq!(
            strict.admit("SELECT * FROM t WHERE create = 1"),
            Err(GuardError::ForbiddenKeyword("create".to_string()))
        );
    }

    #[test]
    fn test_rule_order_first_failure_wins() {
        let guard = SqlGuard::default();
        // Both stacked and forbidden: stacking is checked first.
        assert_eq!(
            guard.admit("SELECT 1; DROP TABLE t"),
            Err(GuardError::MultipleStatements)
        );
        // Not read-only beats forbidden keyword.
        assert_eq!(
            guard.admit("DROP TABLE t"),
            Err(GuardError::NotReadOnly)
        );
    }
}
