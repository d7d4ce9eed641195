//! MySQL/MariaDB connector over an SQLx pool.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow, MySqlSslMode};
use sqlx::query::Query;
use sqlx::{Column, MySql, Row as _, TypeInfo, ValueRef};
use tracing::{debug, info};

use crate::config::{ConnectionSettings, SslMode};
use crate::core::schema::{DatabaseKind, Row};
use crate::core::traits::{query_scalar_text, Connector};
use crate::core::value::SqlValue;
use crate::error::{MigrateError, Result};

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Introspection runs one statement at a time.
const POOL_MAX_SIZE: u32 = 2;

/// MySQL/MariaDB connector.
pub struct MysqlConnector {
    settings: ConnectionSettings,
    pool: Option<MySqlPool>,
}

impl MysqlConnector {
    pub fn new(settings: ConnectionSettings) -> Self {
        Self {
            settings,
            pool: None,
        }
    }

    fn connect_options(&self) -> Result<MySqlConnectOptions> {
        if let Some(cs) = &self.settings.connection_string {
            return MySqlConnectOptions::from_str(cs).map_err(|e| {
                MigrateError::Config(format!("invalid MySQL connection string: {}", e))
            });
        }

        // Plain connections still negotiate TLS when the server offers it.
        let ssl_mode = match self.settings.ssl_mode {
            SslMode::Disable => MySqlSslMode::Preferred,
            SslMode::Require => MySqlSslMode::Required,
            SslMode::VerifyCa => MySqlSslMode::VerifyCa,
            SslMode::VerifyFull => MySqlSslMode::VerifyIdentity,
        };

        Ok(MySqlConnectOptions::new()
            .host(&self.settings.host)
            .port(self.settings.port)
            .database(&self.settings.database)
            .username(&self.settings.user)
            .password(&self.settings.password)
            .ssl_mode(ssl_mode))
    }
}

#[async_trait]
impl Connector for MysqlConnector {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Mysql
    }

    async fn connect(&mut self) -> Result<()> {
        if self.pool.is_some() {
            return Ok(());
        }

        let pool = MySqlPoolOptions::new()
            .max_connections(POOL_MAX_SIZE)
            .acquire_timeout(POOL_CONNECTION_TIMEOUT)
            .connect_with(self.connect_options()?)
            .await
            .map_err(|e| {
                MigrateError::ConnectionFailed(format!(
                    "MySQL {}:{}: {}",
                    self.settings.host, self.settings.port, e
                ))
            })?;

        info!(
            "Connected to MySQL: {}:{}/{}",
            self.settings.host, self.settings.port, self.settings.database
        );
        self.pool = Some(pool);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
            info!("Disconnected from MySQL");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.pool.is_some()
    }

    async fn run_query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let pool = self.pool.as_ref().ok_or_else(|| {
            MigrateError::ConnectionFailed("mysql connector is not connected".into())
        })?;

        let mut query = sqlx::query(sql);
        for param in params {
            query = bind(query, param);
        }
        let rows: Vec<MySqlRow> = query.fetch_all(pool).await?;

        Ok(rows
            .iter()
            .map(|row| {
                row.columns()
                    .iter()
                    .map(|column| {
                        let value = decode(row, column.ordinal(), column.type_info().name());
                        (column.name().to_string(), value.into_json())
                    })
                    .collect()
            })
            .collect())
    }

    async fn version(&self) -> Result<String> {
        query_scalar_text(self, "SELECT VERSION() AS version", "version").await
    }

    async fn database_name(&self) -> Result<String> {
        query_scalar_text(self, "SELECT DATABASE() AS name", "name").await
    }
}

fn bind<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &Value,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        Value::Null => query.bind(Option::<String>::None),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => query.bind(s.clone()),
        other => query.bind(other.to_string()),
    }
}

/// Decode one column by its MySQL type name.
fn decode(row: &MySqlRow, idx: usize, type_name: &str) -> SqlValue<'static> {
    let is_null = row.try_get_raw(idx).map(|r| r.is_null()).unwrap_or(true);
    if is_null {
        return SqlValue::Null;
    }

    let upper = type_name.to_uppercase();
    let unsigned = upper.contains("UNSIGNED");
    let base = upper.split_whitespace().next().unwrap_or_default();

    let value = match base {
        "BOOLEAN" => row.try_get::<bool, _>(idx).map(SqlValue::Bool),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "INTEGER" | "YEAR" if !unsigned => {
            row.try_get::<i32, _>(idx).map(|v| SqlValue::I64(v.into()))
        }
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "INTEGER" | "YEAR" => {
            row.try_get::<u32, _>(idx).map(|v| SqlValue::I64(v.into()))
        }
        "BIGINT" if unsigned => row.try_get::<u64, _>(idx).map(SqlValue::U64),
        "BIGINT" => row.try_get::<i64, _>(idx).map(SqlValue::I64),
        "FLOAT" => row.try_get::<f32, _>(idx).map(|v| SqlValue::F64(v.into())),
        "DOUBLE" | "REAL" => row.try_get::<f64, _>(idx).map(SqlValue::F64),
        "DECIMAL" | "NUMERIC" => row
            .try_get::<rust_decimal::Decimal, _>(idx)
            .map(SqlValue::Decimal),
        "DATE" => row.try_get::<chrono::NaiveDate, _>(idx).map(SqlValue::Date),
        "TIME" => row.try_get::<chrono::NaiveTime, _>(idx).map(SqlValue::Time),
        "DATETIME" | "TIMESTAMP" => row
            .try_get::<chrono::NaiveDateTime, _>(idx)
            .map(SqlValue::DateTime),
        "JSON" => row.try_get::<Value, _>(idx).map(SqlValue::Json),
        "BIT" | "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB"
        | "GEOMETRY" => row.try_get::<Vec<u8>, _>(idx).map(SqlValue::from),
        _ => row.try_get::<String, _>(idx).map(SqlValue::from),
    };

    value.unwrap_or_else(|e| {
        debug!("Cannot decode column {} of type {}: {}", idx, type_name, e);
        SqlValue::Null
    })
}
