//! Connector abstraction every introspector and extractor queries through.
//!
//! Concrete drivers implement the required methods; the provided
//! [`Connector::query`] is a template method that runs the safety gate before
//! any statement reaches the network.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{MigrateError, Result};
use crate::safety::assert_safe_sql;

use super::schema::{DatabaseKind, Row};

/// Per-call query options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Skip the safety gate. Reserved for row extraction and version queries.
    pub bypass_safety: bool,
}

impl QueryOptions {
    /// Options for a trusted, ungated read.
    pub fn trusted() -> Self {
        Self {
            bypass_safety: true,
        }
    }
}

/// A live (or not yet live) connection to one database.
///
/// Connection lifecycle and pooling belong to the implementation. Callers
/// connect once, issue queries, and disconnect when done.
#[async_trait]
pub trait Connector: Send + Sync {
    /// The dialect this connector speaks.
    fn kind(&self) -> DatabaseKind;

    /// Establish the connection.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::ConnectionFailed`] if the server is unreachable
    /// or rejects the credentials.
    async fn connect(&mut self) -> Result<()>;

    /// Release the connection. Idempotent.
    async fn disconnect(&mut self) -> Result<()>;

    /// Whether [`connect`](Connector::connect) succeeded and no disconnect followed.
    fn is_connected(&self) -> bool;

    /// Execute `sql` with positional `params` and decode every row.
    ///
    /// Implementations do not apply the safety gate; use [`query`](Connector::query).
    async fn run_query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Server version string.
    async fn version(&self) -> Result<String>;

    /// Name of the database the connection is bound to.
    async fn database_name(&self) -> Result<String>;

    /// Run a statement through the safety gate, then execute it.
    async fn query(&self, sql: &str, params: &[Value], options: QueryOptions) -> Result<Vec<Row>> {
        if !options.bypass_safety {
            assert_safe_sql(sql)?;
        }
        if !self.is_connected() {
            return Err(MigrateError::ConnectionFailed(format!(
                "{} connector is not connected",
                self.kind()
            )));
        }
        debug!("{}: {}", self.kind(), sql.trim());
        self.run_query(sql, params).await
    }
}

/// Run a gated query and deserialize each row into `T`.
///
/// Column names are lowercased first, so records can be declared with
/// lowercase field names regardless of how the catalog spells its columns.
pub async fn query_as<T: DeserializeOwned>(
    conn: &dyn Connector,
    sql: &str,
    params: &[Value],
) -> Result<Vec<T>> {
    let rows = conn.query(sql, params, QueryOptions::default()).await?;
    rows.into_iter()
        .map(|row| {
            let lowered: Row = row
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v))
                .collect();
            serde_json::from_value(Value::Object(lowered)).map_err(|e| {
                MigrateError::SchemaExtraction(format!("unexpected catalog row shape: {}", e))
            })
        })
        .collect()
}

/// Run a trusted query that yields a single text column and return its first value.
pub(crate) async fn query_scalar_text(
    conn: &dyn Connector,
    sql: &str,
    column: &str,
) -> Result<String> {
    let rows = conn.query(sql, &[], QueryOptions::trusted()).await?;
    let value = rows
        .into_iter()
        .next()
        .and_then(|row| {
            row.into_iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(column))
                .map(|(_, v)| v)
        })
        .ok_or_else(|| MigrateError::query(sql.trim(), "query returned no rows"))?;

    Ok(match value {
        Value::String(s) => s,
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedConnector;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct TableRow {
        table_name: String,
    }

    #[tokio::test]
    async fn test_query_rejects_unsafe_sql_before_execution() {
        let conn = ScriptedConnector::connected(DatabaseKind::Postgres);
        let err = conn
            .query("SELECT * FROM users", &[], QueryOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MigrateError::UnsafeDataSelect(_)));
        assert!(conn.executed().is_empty());
    }

    #[tokio::test]
    async fn test_bypass_reaches_driver() {
        let conn = ScriptedConnector::connected(DatabaseKind::Postgres);
        conn.query("SELECT * FROM users", &[], QueryOptions::trusted())
            .await
            .unwrap();
        assert_eq!(conn.executed(), vec!["SELECT * FROM users".to_string()]);
    }

    #[tokio::test]
    async fn test_query_requires_connection() {
        let conn = ScriptedConnector::new(DatabaseKind::Mysql);
        let err = conn
            .query("SELECT 1", &[], QueryOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MigrateError::ConnectionFailed(_)));
    }

    #[tokio::test]
    async fn test_query_as_lowercases_keys() {
        let conn = ScriptedConnector::connected(DatabaseKind::Mssql)
            .respond("information_schema.tables", vec![json!({"TABLE_NAME": "Users"})]);
        let rows: Vec<TableRow> = query_as(
            &conn,
            "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES",
            &[],
        )
        .await
        .unwrap();
        assert_eq!(rows[0].table_name, "Users");
    }

    #[tokio::test]
    async fn test_query_scalar_text() {
        let conn = ScriptedConnector::connected(DatabaseKind::Mysql)
            .respond("version()", vec![json!({"version": "8.0.36"})]);
        let v = query_scalar_text(&conn, "SELECT VERSION() AS version", "version")
            .await
            .unwrap();
        assert_eq!(v, "8.0.36");
    }
}
