//! SQL guard and identifier quoting.
//!
//! Every statement the pipeline sends to a [`QueryExecutor`] passes through
//! [`ensure_read_only`] first, and every identifier interpolated into generated
//! SQL goes through [`quote_ident`].
//!
//! The guard is a textual filter, not a SQL parser. It does not understand
//! comments, string literals, or quoted identifiers, so it can over-reject
//! (a `;` inside a string literal, a column literally named `get`) and it relies
//! on a naive `;` search for statement boundaries. Changing that behavior is a
//! security decision, not a bug fix.
//!
//! [`QueryExecutor`]: crate::executor::QueryExecutor

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{EdaError, Result};

/// Keywords that mark a statement as mutating or as moving data in or out of
/// the warehouse.
pub const FORBIDDEN_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "CREATE", "MERGE", "CALL", "PUT", "GET", "COPY",
];

static FORBIDDEN_KEYWORD_REGEX: Lazy<Regex> = Lazy::new(|| {
    // This regex is compile-time constant and known to be valid
    #[allow(clippy::expect_used)]
    Regex::new(&format!(r"(?i)\b({})\b", FORBIDDEN_KEYWORDS.join("|")))
        .expect("Hard-coded regex pattern should be valid")
});

static READ_ONLY_PREFIX_REGEX: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?i)^(SELECT|WITH)\b").expect("Hard-coded regex pattern should be valid")
});

/// Validates that `sql` is a single, read-only `SELECT`/`WITH` statement.
///
/// # Examples
///
/// ```rust
/// use hilo_eda::security::ensure_read_only;
///
/// assert!(ensure_read_only("SELECT 1").is_ok());
/// assert!(ensure_read_only("WITH t AS (SELECT 1) SELECT * FROM t").is_ok());
/// assert!(ensure_read_only("DELETE FROM t").is_err());
/// assert!(ensure_read_only("SELECT 1; SELECT 2").is_err());
/// ```
pub fn ensure_read_only(sql: &str) -> Result<()> {
    let stripped = sql.trim();

    if stripped.contains(';') {
        return Err(EdaError::unsafe_sql(
            "Multiple statements are not allowed",
            sql,
        ));
    }

    if let Some(found) = FORBIDDEN_KEYWORD_REGEX.find(stripped) {
        return Err(EdaError::unsafe_sql(
            format!(
                "Only SELECT statements are allowed (found '{}')",
                found.as_str().to_uppercase()
            ),
            sql,
        ));
    }

    if !READ_ONLY_PREFIX_REGEX.is_match(stripped) {
        return Err(EdaError::unsafe_sql(
            "Only SELECT or WITH statements are allowed",
            sql,
        ));
    }

    Ok(())
}

/// Quotes a SQL identifier, doubling any embedded double quotes.
///
/// # Examples
///
/// ```rust
/// use hilo_eda::security::quote_ident;
///
/// assert_eq!(quote_ident("amount").unwrap(), "\"amount\"");
/// assert_eq!(quote_ident("my \"col\"").unwrap(), "\"my \"\"col\"\"\"");
/// assert!(quote_ident("").is_err());
/// ```
pub fn quote_ident(identifier: &str) -> Result<String> {
    if identifier.is_empty() {
        return Err(EdaError::InvalidIdentifier(
            "Identifier cannot be empty".to_string(),
        ));
    }

    let escaped = identifier.replace('"', "\"\"");
    Ok(format!("\"{escaped}\""))
}

/// Builds a fully quoted `database.schema.table` reference.
pub fn qualify_table(database: &str, schema: &str, table: &str) -> Result<String> {
    Ok([
        quote_ident(database)?,
        quote_ident(schema)?,
        quote_ident(table)?,
    ]
    .join("."))
}

/// Quotes a string literal, doubling any embedded single quotes.
pub fn quote_literal(value: &str) -> String {
    let escaped = value.replace('\'', "''");
    format!("'{escaped}'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_allowed() {
        assert!(ensure_read_only("SELECT 1").is_ok());
        assert!(ensure_read_only("  select * from t  ").is_ok());
        assert!(ensure_read_only("WITH t AS (SELECT 1) SELECT * FROM t").is_ok());
    }

    #[test]
    fn test_block_non_select() {
        assert!(ensure_read_only("DELETE FROM table").is_err());
        assert!(ensure_read_only("SHOW TABLES").is_err());
        assert!(ensure_read_only("EXPLAIN SELECT 1").is_err());
        assert!(ensure_read_only("").is_err());
    }

    #[test]
    fn test_block_semicolons() {
        assert!(ensure_read_only("SELECT 1; SELECT 2").is_err());
        // A single trailing terminator is rejected too.
        assert!(ensure_read_only("SELECT 1;").is_err());
        // Known limitation: semicolons inside literals are rejected.
        assert!(ensure_read_only("SELECT 'a;b'").is_err());
    }

    #[test]
    fn test_forbidden_keywords_are_whole_words() {
        assert!(ensure_read_only("SELECT * FROM t WHERE x = 1 OR 1=1 UNION SELECT * FROM t2").is_ok());
        assert!(ensure_read_only("SELECT created_at, updated_by FROM t").is_ok());
        assert!(ensure_read_only("SELECT getter FROM t").is_ok());
        assert!(ensure_read_only("select 1 from t where drop_flag = 1").is_ok());

        assert!(ensure_read_only("SELECT * FROM t WHERE Update = 1").is_err());
        assert!(ensure_read_only("WITH x AS (DELETE FROM t) SELECT 1").is_err());
        assert!(ensure_read_only("SELECT \"get\" FROM t").is_err());
    }

    #[test]
    fn test_prefix_must_be_a_whole_word() {
        assert!(ensure_read_only("SELECTED FROM t").is_err());
        assert!(ensure_read_only("WITHOUT x").is_err());
    }

    #[test]
    fn test_rejection_carries_sql() {
        let err = ensure_read_only("DROP TABLE t").unwrap_err();
        match err {
            EdaError::UnsafeSql { sql, reason } => {
                assert_eq!(sql, "DROP TABLE t");
                assert!(reason.contains("DROP"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("customer_id").unwrap(), "\"customer_id\"");
        assert_eq!(quote_ident("a\"b").unwrap(), "\"a\"\"b\"");
        assert_eq!(quote_ident("Mixed Case").unwrap(), "\"Mixed Case\"");
        assert!(matches!(
            quote_ident(""),
            Err(EdaError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_qualify_table() {
        assert_eq!(
            qualify_table("DB", "PUBLIC", "orders").unwrap(),
            "\"DB\".\"PUBLIC\".\"orders\""
        );
        assert!(qualify_table("DB", "", "orders").is_err());
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("orders"), "'orders'");
        assert_eq!(quote_literal("o'brien"), "'o''brien'");
    }
}
