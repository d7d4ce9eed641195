//! PostgreSQL connector over tokio-postgres with a deadpool pool.

use std::net::IpAddr;
use std::str::FromStr;

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use serde_json::Value;
use tokio_postgres::types::{FromSql, Kind, ToSql, Type};
use tokio_postgres::Config as PgConfig;
use tracing::{info, warn};

use crate::config::ConnectionSettings;
use crate::core::schema::{DatabaseKind, Row};
use crate::core::traits::{query_scalar_text, Connector};
use crate::core::value::SqlValue;
use crate::drivers::common::TlsBuilder;
use crate::error::{MigrateError, Result};

/// Introspection runs one statement at a time.
const POOL_MAX_SIZE: usize = 2;

/// PostgreSQL connector.
pub struct PostgresConnector {
    settings: ConnectionSettings,
    pool: Option<Pool>,
}

impl PostgresConnector {
    pub fn new(settings: ConnectionSettings) -> Self {
        Self {
            settings,
            pool: None,
        }
    }

    fn pg_config(&self) -> Result<PgConfig> {
        if let Some(cs) = &self.settings.connection_string {
            return PgConfig::from_str(cs).map_err(|e| {
                MigrateError::Config(format!("invalid PostgreSQL connection string: {}", e))
            });
        }

        let mut pg_config = PgConfig::new();
        pg_config.host(&self.settings.host);
        pg_config.port(self.settings.port);
        pg_config.dbname(&self.settings.database);
        pg_config.user(&self.settings.user);
        pg_config.password(&self.settings.password);
        pg_config.application_name("catalog-migrate");
        Ok(pg_config)
    }

    fn build_pool(&self) -> Result<Pool> {
        let pg_config = self.pg_config()?;
        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let pool = match TlsBuilder::new(self.settings.ssl_mode).build()? {
            Some(tls) => {
                let mgr = Manager::from_config(pg_config, tls, mgr_config);
                Pool::builder(mgr).max_size(POOL_MAX_SIZE).build()
            }
            None => {
                warn!("PostgreSQL TLS is disabled. Credentials will be transmitted in plaintext.");
                let mgr = Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config);
                Pool::builder(mgr).max_size(POOL_MAX_SIZE).build()
            }
        };
        pool.map_err(|e| MigrateError::pool(e, "creating PostgreSQL pool"))
    }
}

#[async_trait]
impl Connector for PostgresConnector {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Postgres
    }

    async fn connect(&mut self) -> Result<()> {
        if self.pool.is_some() {
            return Ok(());
        }

        let pool = self.build_pool()?;
        let client = pool.get().await.map_err(|e| {
            MigrateError::ConnectionFailed(format!(
                "PostgreSQL {}:{}: {}",
                self.settings.host, self.settings.port, e
            ))
        })?;
        client.simple_query("SELECT 1").await?;
        drop(client);

        info!(
            "Connected to PostgreSQL: {}:{}/{}",
            self.settings.host, self.settings.port, self.settings.database
        );
        self.pool = Some(pool);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(pool) = self.pool.take() {
            pool.close();
            info!("Disconnected from PostgreSQL");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.pool.is_some()
    }

    async fn run_query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let pool = self.pool.as_ref().ok_or_else(|| {
            MigrateError::ConnectionFailed("postgres connector is not connected".into())
        })?;
        let client = pool
            .get()
            .await
            .map_err(|e| MigrateError::pool(e, "getting PostgreSQL connection"))?;

        let bound: Vec<Box<dyn ToSql + Sync + Send>> = params.iter().map(to_param).collect();
        let refs: Vec<&(dyn ToSql + Sync)> = bound
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        let rows = client.query(sql, &refs).await?;

        let mut result = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut out = Row::new();
            for (idx, column) in row.columns().iter().enumerate() {
                out.insert(
                    column.name().to_string(),
                    decode(row, idx, column.type_()).into_json(),
                );
            }
            result.push(out);
        }
        Ok(result)
    }

    async fn version(&self) -> Result<String> {
        query_scalar_text(self, "SELECT version() AS version", "version").await
    }

    async fn database_name(&self) -> Result<String> {
        query_scalar_text(self, "SELECT current_database() AS name", "name").await
    }
}

fn to_param(value: &Value) -> Box<dyn ToSql + Sync + Send> {
    match value {
        Value::Null => Box::new(Option::<String>::None),
        Value::Bool(b) => Box::new(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Box::new(i),
            None => Box::new(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => Box::new(s.clone()),
        other => Box::new(other.clone()),
    }
}

type DecodeError = Box<dyn std::error::Error + Sync + Send>;

/// Wire bytes of a column of any type.
struct RawValue<'a>(&'a [u8]);

impl<'a> FromSql<'a> for RawValue<'a> {
    fn from_sql(_: &Type, raw: &'a [u8]) -> std::result::Result<Self, DecodeError> {
        Ok(RawValue(raw))
    }

    fn accepts(_: &Type) -> bool {
        true
    }
}

/// Decode one column by its PostgreSQL type.
///
/// A value that cannot be decoded is logged and becomes `null`.
fn decode(row: &tokio_postgres::Row, idx: usize, ty: &Type) -> SqlValue<'static> {
    let decoded = row
        .try_get::<_, Option<RawValue>>(idx)
        .map_err(|e| Box::new(e) as DecodeError)
        .and_then(|raw| match raw {
            Some(RawValue(bytes)) => decode_bytes(ty, bytes),
            None => Ok(SqlValue::Null),
        });

    decoded.unwrap_or_else(|e| {
        warn!(
            "Cannot decode column {} of type {}: {}",
            row.columns()[idx].name(),
            ty,
            e
        );
        SqlValue::Null
    })
}

/// Decode a non-null binary-format value.
///
/// Types without a native mapping (enums, citext and other extension types)
/// are read as text when their wire format is UTF-8.
fn decode_bytes(ty: &Type, raw: &[u8]) -> std::result::Result<SqlValue<'static>, DecodeError> {
    fn get<'a, T: FromSql<'a>>(ty: &Type, raw: &'a [u8]) -> std::result::Result<T, DecodeError> {
        T::from_sql(ty, raw)
    }

    match ty.kind() {
        Kind::Array(member) => return decode_array(member, raw),
        Kind::Domain(base) => return decode_bytes(base, raw),
        _ => {}
    }

    Ok(match *ty {
        Type::BOOL => get::<bool>(ty, raw)?.into(),
        Type::INT2 => i64::from(get::<i16>(ty, raw)?).into(),
        Type::INT4 => i64::from(get::<i32>(ty, raw)?).into(),
        Type::INT8 => get::<i64>(ty, raw)?.into(),
        Type::OID => i64::from(get::<u32>(ty, raw)?).into(),
        Type::FLOAT4 => f64::from(get::<f32>(ty, raw)?).into(),
        Type::FLOAT8 => get::<f64>(ty, raw)?.into(),
        Type::NUMERIC => get::<rust_decimal::Decimal>(ty, raw)?.into(),
        Type::UUID => get::<uuid::Uuid>(ty, raw)?.into(),
        Type::TIMESTAMP => get::<chrono::NaiveDateTime>(ty, raw)?.into(),
        Type::TIMESTAMPTZ => {
            SqlValue::DateTimeOffset(get::<chrono::DateTime<chrono::FixedOffset>>(ty, raw)?)
        }
        Type::DATE => get::<chrono::NaiveDate>(ty, raw)?.into(),
        Type::TIME => get::<chrono::NaiveTime>(ty, raw)?.into(),
        Type::BYTEA => get::<Vec<u8>>(ty, raw)?.into(),
        Type::JSON | Type::JSONB => SqlValue::Json(get::<Value>(ty, raw)?),
        Type::MONEY => money_text(get::<i64>(ty, raw)?).into(),
        Type::INTERVAL => interval_text(raw)?.into(),
        Type::INET | Type::CIDR => inet_text(raw, *ty == Type::CIDR)?.into(),
        _ => match std::str::from_utf8(raw) {
            Ok(text) => text.to_string().into(),
            Err(_) => return Err(format!("type {} has no text form", ty).into()),
        },
    })
}

fn take<'a>(buf: &mut &'a [u8], n: usize) -> std::result::Result<&'a [u8], DecodeError> {
    if buf.len() < n {
        return Err("truncated value".into());
    }
    let (head, tail) = buf.split_at(n);
    *buf = tail;
    Ok(head)
}

fn take_i32(buf: &mut &[u8]) -> std::result::Result<i32, DecodeError> {
    Ok(i32::from_be_bytes(<[u8; 4]>::try_from(take(buf, 4)?)?))
}

/// Arrays of any element type, as (nested) JSON arrays.
fn decode_array(member: &Type, raw: &[u8]) -> std::result::Result<SqlValue<'static>, DecodeError> {
    let mut buf = raw;
    let ndim = take_i32(&mut buf)?;
    take(&mut buf, 8)?; // null flag and element oid

    let mut dims = Vec::with_capacity(ndim.max(0) as usize);
    for _ in 0..ndim {
        dims.push(take_i32(&mut buf)?.max(0) as usize);
        take(&mut buf, 4)?; // lower bound
    }

    let count: usize = if dims.is_empty() { 0 } else { dims.iter().product() };
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        let len = take_i32(&mut buf)?;
        if len < 0 {
            values.push(Value::Null);
        } else {
            let bytes = take(&mut buf, len as usize)?;
            values.push(decode_bytes(member, bytes)?.into_json());
        }
    }

    for &dim in dims.iter().skip(1).rev() {
        values = values
            .chunks(dim.max(1))
            .map(|chunk| Value::Array(chunk.to_vec()))
            .collect();
    }
    Ok(SqlValue::Json(Value::Array(values)))
}

/// `money` is a count of cents.
fn money_text(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// ISO 8601 duration, which PostgreSQL accepts back as interval input.
fn interval_text(raw: &[u8]) -> std::result::Result<String, DecodeError> {
    let mut buf = raw;
    let micros = i64::from_be_bytes(<[u8; 8]>::try_from(take(&mut buf, 8)?)?);
    let days = take_i32(&mut buf)?;
    let months = take_i32(&mut buf)?;

    let hours = micros / 3_600_000_000;
    let minutes = (micros % 3_600_000_000) / 60_000_000;
    let rest = micros % 60_000_000;
    let sign = if rest < 0 { "-" } else { "" };
    let rest = rest.unsigned_abs();
    let seconds = match rest % 1_000_000 {
        0 => format!("{}{}", sign, rest / 1_000_000),
        frac => format!("{}{}.{:06}", sign, rest / 1_000_000, frac)
            .trim_end_matches('0')
            .to_string(),
    };

    Ok(format!(
        "P{}Y{}M{}DT{}H{}M{}S",
        months / 12,
        months % 12,
        days,
        hours,
        minutes,
        seconds
    ))
}

/// `inet` / `cidr`: family, prefix bits, cidr flag, address length, address.
fn inet_text(raw: &[u8], cidr: bool) -> std::result::Result<String, DecodeError> {
    let mut buf = raw;
    let header = take(&mut buf, 4)?;
    let bits = header[1];
    let addr = take(&mut buf, usize::from(header[3]))?;

    let (ip, max_bits) = match addr.len() {
        4 => (IpAddr::from(<[u8; 4]>::try_from(addr)?), 32),
        16 => (IpAddr::from(<[u8; 16]>::try_from(addr)?), 128),
        n => return Err(format!("unexpected address length {}", n).into()),
    };

    Ok(if cidr || bits != max_bits {
        format!("{}/{}", ip, bits)
    } else {
        ip.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SslMode;
    use serde_json::json;

    fn settings() -> ConnectionSettings {
        ConnectionSettings {
            kind: DatabaseKind::Postgres,
            host: "db".into(),
            port: 5433,
            user: "app".into(),
            password: "x".into(),
            database: "appdb".into(),
            ssl_mode: SslMode::Disable,
            trust_server_cert: false,
            connection_string: None,
        }
    }

    #[test]
    fn test_config_from_settings() {
        let config = PostgresConnector::new(settings()).pg_config().unwrap();
        assert_eq!(config.get_dbname(), Some("appdb"));
        assert_eq!(config.get_ports(), &[5433]);
    }

    #[test]
    fn test_config_from_url() {
        let mut s = settings();
        s.connection_string = Some("postgresql://reader:pw@warehouse:6543/analytics".into());
        let config = PostgresConnector::new(s).pg_config().unwrap();
        assert_eq!(config.get_dbname(), Some("analytics"));
        assert_eq!(config.get_user(), Some("reader"));
    }

    #[test]
    fn test_invalid_connection_string_is_config_error() {
        let mut s = settings();
        s.connection_string = Some("postgresql://host:notaport/db".into());
        assert!(matches!(
            PostgresConnector::new(s).pg_config(),
            Err(MigrateError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let mut conn = PostgresConnector::new(settings());
        conn.disconnect().await.unwrap();
        conn.disconnect().await.unwrap();
        assert!(!conn.is_connected());
    }

    fn custom_type(name: &str, kind: Kind) -> Type {
        Type::new(name.into(), 90_001, kind, "public".into())
    }

    fn int4_array(dims: &[i32], values: &[Option<i32>]) -> Vec<u8> {
        let mut raw = Vec::new();
        raw.extend((dims.len() as i32).to_be_bytes());
        raw.extend(1i32.to_be_bytes());
        raw.extend(Type::INT4.oid().to_be_bytes());
        for dim in dims {
            raw.extend(dim.to_be_bytes());
            raw.extend(1i32.to_be_bytes());
        }
        for value in values {
            match value {
                Some(v) => {
                    raw.extend(4i32.to_be_bytes());
                    raw.extend(v.to_be_bytes());
                }
                None => raw.extend((-1i32).to_be_bytes()),
            }
        }
        raw
    }

    #[test]
    fn test_native_scalars() {
        assert_eq!(
            decode_bytes(&Type::INT4, &7i32.to_be_bytes()).unwrap().into_json(),
            json!(7)
        );
        assert_eq!(
            decode_bytes(&Type::TEXT, b"Alice").unwrap().into_json(),
            json!("Alice")
        );
    }

    #[test]
    fn test_enum_and_extension_types_decode_as_text() {
        let mood = custom_type("mood", Kind::Enum(vec!["happy".into(), "sad".into()]));
        assert_eq!(decode_bytes(&mood, b"happy").unwrap().into_json(), json!("happy"));

        let citext = custom_type("citext", Kind::Simple);
        assert_eq!(
            decode_bytes(&citext, b"Alice@Example.com").unwrap().into_json(),
            json!("Alice@Example.com")
        );
    }

    #[test]
    fn test_arrays_keep_nulls_and_shape() {
        let flat = int4_array(&[3], &[Some(1), None, Some(3)]);
        assert_eq!(
            decode_bytes(&Type::INT4_ARRAY, &flat).unwrap().into_json(),
            json!([1, null, 3])
        );

        let grid = int4_array(&[2, 2], &[Some(1), Some(2), Some(3), Some(4)]);
        assert_eq!(
            decode_bytes(&Type::INT4_ARRAY, &grid).unwrap().into_json(),
            json!([[1, 2], [3, 4]])
        );

        let empty = int4_array(&[], &[]);
        assert_eq!(
            decode_bytes(&Type::INT4_ARRAY, &empty).unwrap().into_json(),
            json!([])
        );
    }

    #[test]
    fn test_money_interval_and_inet() {
        assert_eq!(
            decode_bytes(&Type::MONEY, &(-1234i64).to_be_bytes())
                .unwrap()
                .into_json(),
            json!("-12.34")
        );

        let mut interval = Vec::new();
        interval.extend(3_723_500_000i64.to_be_bytes());
        interval.extend(4i32.to_be_bytes());
        interval.extend(14i32.to_be_bytes());
        assert_eq!(
            decode_bytes(&Type::INTERVAL, &interval).unwrap().into_json(),
            json!("P1Y2M4DT1H2M3.5S")
        );

        assert_eq!(
            decode_bytes(&Type::INET, &[2, 32, 0, 4, 192, 168, 0, 1])
                .unwrap()
                .into_json(),
            json!("192.168.0.1")
        );
        assert_eq!(
            decode_bytes(&Type::CIDR, &[2, 24, 1, 4, 10, 0, 0, 0])
                .unwrap()
                .into_json(),
            json!("10.0.0.0/24")
        );
    }

    #[test]
    fn test_binary_without_text_form_is_an_error() {
        let opaque = custom_type("opaque", Kind::Simple);
        assert!(decode_bytes(&opaque, &[0xff, 0xfe]).is_err());
        assert!(decode_bytes(&Type::INT4_ARRAY, &[0, 0]).is_err());
    }
}
