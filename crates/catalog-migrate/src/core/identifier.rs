//! Identifier quoting and filter-predicate validation for dynamic SQL.
//!
//! SQL identifiers (table names, column names) cannot be passed as parameters
//! in prepared statements, so the data extractor builds its `SELECT` text
//! dynamically. Identifiers are validated and quoted per dialect; row filter
//! predicates from configuration are spliced verbatim and must therefore be a
//! single expression.

use crate::core::schema::DatabaseKind;
use crate::error::{MigrateError, Result};

/// Maximum identifier length (conservative limit across databases).
/// - PostgreSQL: 63 bytes
/// - SQL Server: 128 characters
/// - MySQL: 64 characters
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate an identifier before it is quoted into SQL text.
///
/// Rejects empty identifiers, identifiers containing null bytes and
/// identifiers exceeding [`MAX_IDENTIFIER_LENGTH`].
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(MigrateError::Config(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(MigrateError::Config(format!(
            "SECURITY: Identifier contains null byte (possible injection attempt): {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(MigrateError::Config(format!(
            "SECURITY: Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Quote a PostgreSQL identifier: `"name"`, embedded quotes doubled.
pub fn quote_pg(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

/// Quote a MySQL identifier: `` `name` ``, embedded backticks doubled.
pub fn quote_mysql(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("`{}`", name.replace('`', "``")))
}

/// Quote a SQL Server identifier: `[name]`, closing brackets doubled.
pub fn quote_mssql(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("[{}]", name.replace(']', "]]")))
}

/// Quote an identifier for the given dialect.
pub fn quote_for(kind: DatabaseKind, name: &str) -> Result<String> {
    match kind {
        DatabaseKind::Postgres => quote_pg(name),
        DatabaseKind::Mysql => quote_mysql(name),
        DatabaseKind::Mssql => quote_mssql(name),
    }
}

/// Escape a value for use inside a single-quoted SQL string literal.
pub fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// Validate a row filter predicate taken from configuration.
///
/// The predicate becomes the `WHERE` clause of the extraction query, so it
/// must not smuggle in a second statement or comment out the remainder.
///
/// Rejects semicolons and SQL comment markers (`--`, `/*`, `*/`).
pub fn validate_filter_predicate(predicate: &str) -> Result<()> {
    if predicate.trim().is_empty() {
        return Err(MigrateError::Config(
            "Filter predicate cannot be empty".to_string(),
        ));
    }

    if predicate.contains(';') {
        return Err(MigrateError::Config(format!(
            "SECURITY: Filter predicate contains semicolon (possible injection): {:?}",
            predicate
        )));
    }

    if predicate.contains("--") || predicate.contains("/*") || predicate.contains("*/") {
        return Err(MigrateError::Config(format!(
            "SECURITY: Filter predicate contains SQL comment markers (possible injection): {:?}",
            predicate
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier_rejects_empty() {
        assert!(validate_identifier("").is_err());
    }

    #[test]
    fn test_validate_identifier_rejects_null_byte() {
        assert!(validate_identifier("users\0").is_err());
    }

    #[test]
    fn test_validate_identifier_length_limit() {
        assert!(validate_identifier(&"a".repeat(MAX_IDENTIFIER_LENGTH)).is_ok());
        assert!(validate_identifier(&"a".repeat(MAX_IDENTIFIER_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_quote_pg_escapes_double_quote() {
        assert_eq!(quote_pg("users").unwrap(), "\"users\"");
        assert_eq!(quote_pg("table\"name").unwrap(), "\"table\"\"name\"");
    }

    #[test]
    fn test_quote_mysql_escapes_backtick() {
        assert_eq!(quote_mysql("users").unwrap(), "`users`");
        assert_eq!(quote_mysql("table`name").unwrap(), "`table``name`");
    }

    #[test]
    fn test_quote_mssql_escapes_bracket() {
        assert_eq!(quote_mssql("users").unwrap(), "[users]");
        assert_eq!(quote_mssql("table]name").unwrap(), "[table]]name]");
    }

    #[test]
    fn test_quote_for_dispatches_by_dialect() {
        assert_eq!(quote_for(DatabaseKind::Postgres, "Order").unwrap(), "\"Order\"");
        assert_eq!(quote_for(DatabaseKind::Mysql, "Order").unwrap(), "`Order`");
        assert_eq!(quote_for(DatabaseKind::Mssql, "Order").unwrap(), "[Order]");
    }

    #[test]
    fn test_injection_stays_inside_quotes() {
        let quoted = quote_mssql("users]; DROP TABLE users; --").unwrap();
        assert_eq!(quoted, "[users]]; DROP TABLE users; --]");
    }

    #[test]
    fn test_escape_literal() {
        assert_eq!(escape_literal("O'Brien"), "O''Brien");
    }

    #[test]
    fn test_filter_predicate_accepts_expressions() {
        assert!(validate_filter_predicate("active = 1").is_ok());
        assert!(validate_filter_predicate("status IN ('a', 'b') AND id > 10").is_ok());
    }

    #[test]
    fn test_filter_predicate_rejects_injection() {
        assert!(validate_filter_predicate("1=1; DROP TABLE users").is_err());
        assert!(validate_filter_predicate("1=1 -- rest").is_err());
        assert!(validate_filter_predicate("1=1 /* x */").is_err());
        assert!(validate_filter_predicate("   ").is_err());
    }
}
