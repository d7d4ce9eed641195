//! SQL Server connector over Tiberius with a bb8 pool.

use std::borrow::Cow;
use std::time::Duration;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use tiberius::{AuthMethod, Client, ColumnData, Config, EncryptionLevel, FromSql, Query};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::info;

use crate::config::ConnectionSettings;
use crate::core::schema::{DatabaseKind, Row};
use crate::core::traits::{query_scalar_text, Connector};
use crate::core::value::SqlValue;
use crate::error::{MigrateError, Result};

/// Maximum TDS packet size (32767 bytes, ~32KB).
const TDS_MAX_PACKET_SIZE: u32 = 32767;

/// Connection acquisition timeout from pool (30 seconds).
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Introspection runs one statement at a time.
const POOL_MAX_SIZE: u32 = 2;

/// Connection manager for bb8 pool with Tiberius.
#[derive(Clone)]
pub struct TiberiusConnectionManager {
    settings: ConnectionSettings,
}

impl TiberiusConnectionManager {
    pub fn new(settings: ConnectionSettings) -> Self {
        Self { settings }
    }

    fn build_config(&self) -> std::result::Result<Config, tiberius::error::Error> {
        if let Some(ado) = &self.settings.connection_string {
            return Config::from_ado_string(ado);
        }

        let mut config = Config::new();
        config.host(&self.settings.host);
        config.port(self.settings.port);
        config.database(&self.settings.database);
        config.authentication(AuthMethod::sql_server(
            &self.settings.user,
            &self.settings.password,
        ));

        if self.settings.trust_server_cert {
            config.trust_cert();
        }
        if self.settings.ssl_mode.requires_tls() {
            config.encryption(EncryptionLevel::Required);
        } else if !self.settings.trust_server_cert {
            config.encryption(EncryptionLevel::NotSupported);
        }

        config.packet_size(TDS_MAX_PACKET_SIZE);
        Ok(config)
    }
}

#[async_trait]
impl bb8::ManageConnection for TiberiusConnectionManager {
    type Connection = Client<Compat<TcpStream>>;
    type Error = tiberius::error::Error;

    async fn connect(&self) -> std::result::Result<Self::Connection, Self::Error> {
        let config = self.build_config()?;
        let tcp = TcpStream::connect(config.get_addr()).await.map_err(|e| {
            tiberius::error::Error::Io {
                kind: e.kind(),
                message: e.to_string(),
            }
        })?;
        tcp.set_nodelay(true).ok();
        Client::connect(config, tcp.compat_write()).await
    }

    async fn is_valid(&self, conn: &mut Self::Connection) -> std::result::Result<(), Self::Error> {
        conn.simple_query("SELECT 1").await?.into_row().await?;
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

/// SQL Server connector.
pub struct MssqlConnector {
    settings: ConnectionSettings,
    pool: Option<Pool<TiberiusConnectionManager>>,
}

impl MssqlConnector {
    pub fn new(settings: ConnectionSettings) -> Self {
        Self {
            settings,
            pool: None,
        }
    }

    async fn get_client(&self) -> Result<PooledConnection<'_, TiberiusConnectionManager>> {
        let pool = self.pool.as_ref().ok_or_else(|| {
            MigrateError::ConnectionFailed("mssql connector is not connected".into())
        })?;
        pool.get()
            .await
            .map_err(|e| MigrateError::pool(e, "getting MSSQL connection"))
    }
}

#[async_trait]
impl Connector for MssqlConnector {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Mssql
    }

    async fn connect(&mut self) -> Result<()> {
        if self.pool.is_some() {
            return Ok(());
        }

        let manager = TiberiusConnectionManager::new(self.settings.clone());
        let pool = Pool::builder()
            .max_size(POOL_MAX_SIZE)
            .connection_timeout(POOL_CONNECTION_TIMEOUT)
            .build(manager)
            .await
            .map_err(|e| {
                MigrateError::ConnectionFailed(format!(
                    "SQL Server {}:{}: {}",
                    self.settings.host, self.settings.port, e
                ))
            })?;

        {
            let mut conn = pool.get().await.map_err(|e| {
                MigrateError::ConnectionFailed(format!(
                    "SQL Server {}:{}: {}",
                    self.settings.host, self.settings.port, e
                ))
            })?;
            conn.simple_query("SELECT 1").await?.into_row().await?;
        }

        info!(
            "Connected to MSSQL: {}:{}/{}",
            self.settings.host, self.settings.port, self.settings.database
        );
        self.pool = Some(pool);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if self.pool.take().is_some() {
            info!("Disconnected from MSSQL");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.pool.is_some()
    }

    async fn run_query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let mut client = self.get_client().await?;

        let mut query = Query::new(sql);
        for param in params {
            match param {
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

        let rows = query
            .query(&mut *client)
            .await?
            .into_first_result()
            .await?;

        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            let names: Vec<String> = row
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect();
            let mut out = Row::new();
            for (name, data) in names.into_iter().zip(row.into_iter()) {
                out.insert(name, decode(data)?.into_json());
            }
            result.push(out);
        }
        Ok(result)
    }

    async fn version(&self) -> Result<String> {
        query_scalar_text(self, "SELECT @@VERSION AS version", "version").await
    }

    async fn database_name(&self) -> Result<String> {
        query_scalar_text(self, "SELECT DB_NAME() AS name", "name").await
    }
}

/// Decode one TDS value.
fn decode(data: ColumnData<'static>) -> Result<SqlValue<'static>> {
    Ok(match data {
        ColumnData::Bit(v) => v.into(),
        ColumnData::U8(v) => v.map(i64::from).into(),
        ColumnData::I16(v) => v.map(i64::from).into(),
        ColumnData::I32(v) => v.map(i64::from).into(),
        ColumnData::I64(v) => v.into(),
        ColumnData::F32(v) => v.map(f64::from).into(),
        ColumnData::F64(v) => v.into(),
        ColumnData::Guid(v) => v.into(),
        ColumnData::String(v) => v.map(Cow::into_owned).into(),
        ColumnData::Binary(v) => v.map(Cow::into_owned).into(),
        ColumnData::Numeric(_) => rust_decimal::Decimal::from_sql(&data)?.into(),
        ColumnData::Xml(v) => v.map(|x| x.into_owned().into_string()).into(),
        ColumnData::Date(_) => NaiveDate::from_sql(&data)?.into(),
        ColumnData::Time(_) => NaiveTime::from_sql(&data)?.into(),
        ColumnData::DateTimeOffset(_) => DateTime::<FixedOffset>::from_sql(&data)?
            .map(SqlValue::DateTimeOffset)
            .unwrap_or(SqlValue::Null),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            NaiveDateTime::from_sql(&data)?.into()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SslMode;
    use serde_json::json;

    fn settings() -> ConnectionSettings {
        ConnectionSettings {
            kind: DatabaseKind::Mssql,
            host: "sql01".into(),
            port: 1433,
            user: "sa".into(),
            password: "x".into(),
            database: "Legacy".into(),
            ssl_mode: SslMode::Disable,
            trust_server_cert: false,
            connection_string: None,
        }
    }

    #[test]
    fn test_decode_scalars() {
        assert_eq!(decode(ColumnData::I32(Some(7))).unwrap().into_json(), json!(7));
        assert_eq!(decode(ColumnData::Bit(None)).unwrap().into_json(), Value::Null);
        assert_eq!(
            decode(ColumnData::String(Some(Cow::Borrowed("Alice"))))
                .unwrap()
                .into_json(),
            json!("Alice")
        );
        assert_eq!(
            decode(ColumnData::Binary(Some(Cow::Owned(vec![0xde, 0xad]))))
                .unwrap()
                .into_json(),
            json!("0xdead")
        );
    }

    #[test]
    fn test_config_from_settings() {
        let config = TiberiusConnectionManager::new(settings())
            .build_config()
            .unwrap();
        assert_eq!(config.get_addr(), "sql01:1433");
    }

    #[test]
    fn test_config_from_ado_string() {
        let mut s = settings();
        s.connection_string = Some("Server=tcp:db02,1444;Database=x;User Id=sa;Password=y".into());
        let config = TiberiusConnectionManager::new(s).build_config().unwrap();
        assert_eq!(config.get_addr(), "db02:1444");
    }

    #[tokio::test]
    async fn test_query_before_connect_fails() {
        let conn = MssqlConnector::new(settings());
        assert!(!conn.is_connected());
        let err = conn.run_query("SELECT 1", &[]).await.unwrap_err();
        assert!(matches!(err, MigrateError::ConnectionFailed(_)));
    }
}
