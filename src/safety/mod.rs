//! Read-only guard for synthesized SQL.
//!
//! Best-effort defense in depth only. The database procedure that executes
//! the SQL under a read-only role is the authoritative boundary; this guard
//! merely stops obviously mutating statements before they leave the process.

mod parser;

pub use parser::classify_sql;

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use tracing::debug;

use crate::error::{AgentError, Result};

/// Outcome of inspecting a SQL string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// A single query statement with no data-modifying parts.
    ReadOnly,
    /// Parsed, and found to write, lock, or hold more than one statement.
    Rejected(String),
    /// The parser could not understand the SQL; carries the parse error.
    Unparsed(String),
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnly => write!(f, "read-only"),
            Self::Rejected(reason) => write!(f, "rejected: {}", reason),
            Self::Unparsed(error) => write!(f, "unparsed: {}", error),
        }
    }
}

fn read_keyword_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)^\s*(\(\s*)*(select|with)\b").expect("read keyword pattern is valid")
    })
}

fn write_keyword() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(insert|update|delete|merge|truncate|drop|alter|create|grant)\b")
            .expect("write keyword pattern is valid")
    })
}

/// Syntactic check that a statement only reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOnlyGuard;

impl ReadOnlyGuard {
    /// Creates a new guard.
    pub fn new() -> Self {
        Self
    }

    /// Returns `Ok` if the SQL may be forwarded to the database.
    ///
    /// SQL the parser cannot handle (PostgreSQL has syntax sqlparser does
    /// not know) is accepted only if it starts with `SELECT` or `WITH` and
    /// names no write keyword anywhere, leaving the final word to the
    /// database. A read that merely mentions such a word in a literal is
    /// rejected too.
    pub fn check(&self, sql: &str) -> Result<()> {
        match classify_sql(sql) {
            Verdict::ReadOnly => Ok(()),
            Verdict::Rejected(reason) => Err(AgentError::unsafe_sql(reason)),
            Verdict::Unparsed(parse_error) => {
                if let Some(word) = write_keyword().find(sql) {
                    Err(AgentError::unsafe_sql(format!(
                        "unparsed statement contains {}",
                        word.as_str().to_uppercase()
                    )))
                } else if read_keyword_prefix().is_match(sql) {
                    debug!(%parse_error, "Guard could not parse SQL; deferring to database");
                    Ok(())
                } else {
                    Err(AgentError::unsafe_sql("statement does not start with SELECT"))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_accepts_select() {
        let guard = ReadOnlyGuard::new();
        assert!(guard
            .check("SELECT COUNT(*) FROM invoices WHERE status = 'unpaid'")
            .is_ok());
    }

    #[test]
    fn test_guard_rejects_delete() {
        let err = ReadOnlyGuard::new()
            .check("DELETE FROM invoices")
            .unwrap_err();
        assert_eq!(err.category(), "Unsafe SQL");
        assert!(err.to_string().contains("DELETE"));
    }

    #[test]
    fn test_guard_unparsed_select_falls_back_to_prefix() {
        // Trailing garbage keeps sqlparser from parsing it.
        let guard = ReadOnlyGuard::new();
        assert!(guard.check("SELECT 1 FROM invoices ))").is_ok());
        assert!(guard.check("  (select 1) ))").is_ok());
        assert!(guard.check("with x as (select 1) select * from x ))").is_ok());
    }

    #[test]
    fn test_guard_unparsed_non_select_is_rejected() {
        let err = ReadOnlyGuard::new()
            .check("VACUUM FULL invoices ))")
            .unwrap_err();
        assert!(err.to_string().contains("does not start with SELECT"));
    }

    #[test]
    fn test_guard_rejects_data_modifying_ctes() {
        let guard = ReadOnlyGuard::new();
        let err = guard
            .check("WITH gone AS (DELETE FROM invoices RETURNING *) SELECT * FROM gone")
            .unwrap_err();
        assert_eq!(err.category(), "Unsafe SQL");
        assert!(guard
            .check(
                "WITH paid AS (UPDATE invoices SET status = 'paid' RETURNING id) \
                 SELECT * FROM paid"
            )
            .is_err());
        assert!(guard
            .check("with x as (insert into vendors (name) values ('a') returning id) select 1")
            .is_err());
    }

    #[test]
    fn test_guard_unparsed_write_keyword_is_rejected() {
        let err = ReadOnlyGuard::new()
            .check("SELECT 1 FROM invoices )) ; truncate invoices")
            .unwrap_err();
        assert!(err.to_string().contains("TRUNCATE"));
        // Word boundaries: column names merely containing a keyword pass.
        assert!(ReadOnlyGuard::new()
            .check("SELECT created_at, updated_at FROM invoices ))")
            .is_ok());
    }

    #[test]
    fn test_verdict_display() {
        assert_eq!(Verdict::ReadOnly.to_string(), "read-only");
        assert_eq!(
            Verdict::Rejected("INSERT statement".into()).to_string(),
            "rejected: INSERT statement"
        );
    }
}
