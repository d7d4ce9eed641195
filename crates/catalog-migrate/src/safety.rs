//! SQL safety gate for introspection and extraction queries.
//!
//! Every statement a connector runs without an explicit bypass must pass
//! [`assert_safe_sql`]: it may not contain a mutating or procedural keyword,
//! and if it selects anything it must read catalog views only.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{MigrateError, Result};

/// Keywords that are never allowed in a gated statement.
pub const FORBIDDEN_KEYWORDS: &[&str] = &[
    "insert", "update", "delete", "merge", "drop", "truncate", "alter", "create", "grant",
    "revoke", "execute", "exec", "call",
];

fn forbidden_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let alternatives = FORBIDDEN_KEYWORDS.join("|");
        Regex::new(&format!(r"(?i)\b({})\b", alternatives))
            .expect("forbidden keyword pattern is valid")
    })
}

fn select_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\bselect\b").expect("select pattern is valid"))
}

fn metadata_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(information_schema|pg_catalog|sys)\.|\bselect\s+1\b")
            .expect("metadata pattern is valid")
    })
}

/// Validate that `sql` is a metadata-only statement.
///
/// # Errors
///
/// - [`MigrateError::UnsafeOperation`] if a forbidden keyword appears as a whole word.
/// - [`MigrateError::UnsafeDataSelect`] if the statement selects but does not
///   reference `information_schema.`, `pg_catalog.` or `sys.` and is not `SELECT 1`.
pub fn assert_safe_sql(sql: &str) -> Result<()> {
    if let Some(found) = forbidden_pattern().find(sql) {
        return Err(MigrateError::UnsafeOperation(
            found.as_str().to_lowercase(),
        ));
    }

    if select_pattern().is_match(sql) && !metadata_pattern().is_match(sql) {
        return Err(MigrateError::UnsafeDataSelect(preview(sql)));
    }

    Ok(())
}

/// First line of the statement, shortened for error messages.
fn preview(sql: &str) -> String {
    let line = sql.trim().lines().next().unwrap_or_default();
    if line.chars().count() > 80 {
        let cut: String = line.chars().take(80).collect();
        format!("{}...", cut)
    } else {
        line.to_string()
    }
}
