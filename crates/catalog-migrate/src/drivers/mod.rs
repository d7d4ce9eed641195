//! Database driver implementations.
//!
//! Each driver implements [`Connector`] for one dialect and is gated behind
//! the Cargo feature of the same name:
//!
//! - [`mssql`]: Microsoft SQL Server over Tiberius
//! - [`postgres`]: PostgreSQL over tokio-postgres
//! - [`mysql`]: MySQL/MariaDB over SQLx
//! - [`common`]: TLS configuration shared by the rustls-based drivers

#[cfg(feature = "postgres")]
pub mod common;
#[cfg(feature = "mssql")]
pub mod mssql;
#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "mssql")]
pub use mssql::MssqlConnector;
#[cfg(feature = "mysql")]
pub use mysql::MysqlConnector;
#[cfg(feature = "postgres")]
pub use postgres::PostgresConnector;

use crate::config::ConnectionSettings;
use crate::core::schema::DatabaseKind;
use crate::core::traits::Connector;
use crate::error::{MigrateError, Result};

/// Build an unconnected connector for resolved connection settings.
///
/// # Errors
///
/// Returns [`MigrateError::Config`] when the dialect's driver was compiled out.
pub fn connector_for(settings: &ConnectionSettings) -> Result<Box<dyn Connector>> {
    match settings.kind {
        #[cfg(feature = "mssql")]
        DatabaseKind::Mssql => Ok(Box::new(MssqlConnector::new(settings.clone()))),
        #[cfg(feature = "postgres")]
        DatabaseKind::Postgres => Ok(Box::new(PostgresConnector::new(settings.clone()))),
        #[cfg(feature = "mysql")]
        DatabaseKind::Mysql => Ok(Box::new(MysqlConnector::new(settings.clone()))),
        #[allow(unreachable_patterns)]
        other => Err(MigrateError::Config(format!(
            "{} support is not compiled in (enable the '{}' feature)",
            other,
            other.as_str()
        ))),
    }
}

#[cfg(all(test, feature = "mssql", feature = "postgres", feature = "mysql"))]
mod tests {
    use super::*;
    use crate::config::SslMode;

    fn settings(kind: DatabaseKind) -> ConnectionSettings {
        ConnectionSettings {
            kind,
            host: "localhost".into(),
            port: kind.default_port(),
            user: "app".into(),
            password: String::new(),
            database: "app".into(),
            ssl_mode: SslMode::Disable,
            trust_server_cert: false,
            connection_string: None,
        }
    }

    #[test]
    fn test_connector_matches_dialect() {
        for kind in [DatabaseKind::Mssql, DatabaseKind::Postgres, DatabaseKind::Mysql] {
            let conn = connector_for(&settings(kind)).unwrap();
            assert_eq!(conn.kind(), kind);
            assert!(!conn.is_connected());
        }
    }

    #[tokio::test]
    async fn test_gate_runs_before_connection_check() {
        use crate::core::traits::QueryOptions;

        let conn = connector_for(&settings(DatabaseKind::Postgres)).unwrap();
        let err = conn
            .query("DROP TABLE users", &[], QueryOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MigrateError::UnsafeOperation(_)));

        let err = conn
            .query("SELECT 1", &[], QueryOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MigrateError::ConnectionFailed(_)));
    }
}
