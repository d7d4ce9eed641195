//! Catalog introspection for each supported dialect.

mod catalog;
mod mssql;
mod mysql;
mod postgres;

use async_trait::async_trait;
use tracing::info;

use crate::core::schema::{DatabaseKind, DatabaseSchema};
use crate::core::traits::Connector;
use crate::error::Result;

pub use mssql::MssqlIntrospector;
pub use mysql::MysqlIntrospector;
pub use postgres::PostgresIntrospector;

/// Reads a database catalog into the canonical schema model.
///
/// Implementations only issue metadata queries through the gated
/// [`Connector::query`] path. Any failed catalog query aborts introspection.
#[async_trait]
pub trait Introspector: Send + Sync {
    async fn introspect_schema(&self) -> Result<DatabaseSchema>;
}

/// Select an introspector by dialect name.
///
/// # Errors
///
/// Returns [`MigrateError::IntrospectionDialectUnsupported`](crate::MigrateError::IntrospectionDialectUnsupported)
/// for names other than `mssql`/`sqlserver`, `postgres`/`postgresql`/`pg` and
/// `mysql`/`mariadb`.
pub fn introspector_for<'a>(
    db_type: &str,
    conn: &'a dyn Connector,
) -> Result<Box<dyn Introspector + 'a>> {
    Ok(match DatabaseKind::from_db_type(db_type)? {
        DatabaseKind::Mssql => Box::new(MssqlIntrospector::new(conn)),
        DatabaseKind::Postgres => Box::new(PostgresIntrospector::new(conn)),
        DatabaseKind::Mysql => Box::new(MysqlIntrospector::new(conn)),
    })
}

/// Introspects whatever database a connector is attached to.
pub struct IntrospectionService<'a> {
    conn: &'a dyn Connector,
}

impl<'a> IntrospectionService<'a> {
    pub fn new(conn: &'a dyn Connector) -> Self {
        Self { conn }
    }

    /// Pick the introspector for the connector's dialect and run it.
    pub async fn introspect(&self) -> Result<DatabaseSchema> {
        let kind = self.conn.kind();
        info!("Introspecting {} catalog", kind);

        let introspector = introspector_for(kind.as_str(), self.conn)?;
        let schema = introspector.introspect_schema().await?;

        info!("Introspected {} tables", schema.tables.len());
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MigrateError;
    use crate::testing::ScriptedConnector;
    use serde_json::json;

    #[test]
    fn test_factory_rejects_unknown_dialect() {
        let conn = ScriptedConnector::connected(DatabaseKind::Postgres);
        let err = introspector_for("oracle", &conn).err().unwrap();
        assert!(matches!(err, MigrateError::IntrospectionDialectUnsupported(t) if t == "oracle"));
    }

    #[tokio::test]
    async fn test_service_uses_connector_dialect() {
        let conn = ScriptedConnector::connected(DatabaseKind::Mysql)
            .respond("information_schema.tables", vec![json!({"table_name": "users"})]);
        let schema = IntrospectionService::new(&conn).introspect().await.unwrap();
        assert_eq!(schema.tables.len(), 1);
        assert!(conn
            .executed()
            .iter()
            .any(|sql| sql.contains("information_schema.statistics")));
    }

    #[tokio::test]
    async fn test_catalog_failure_is_fatal() {
        let conn = ScriptedConnector::connected(DatabaseKind::Postgres)
            .respond("information_schema.tables", vec![json!({"table_name": "users"})])
            .fail_on("information_schema.columns");
        let err = IntrospectionService::new(&conn).introspect().await.unwrap_err();
        assert!(matches!(err, MigrateError::Query { .. }));
    }

    #[tokio::test]
    async fn test_disconnected_connector_fails() {
        let conn = ScriptedConnector::new(DatabaseKind::Mssql);
        let err = IntrospectionService::new(&conn).introspect().await.unwrap_err();
        assert!(matches!(err, MigrateError::ConnectionFailed(_)));
    }
}
