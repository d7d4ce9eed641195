//! Connection validation and resolution.

use super::{ConnectionConfig, ConnectionSettings, SslMode};
use crate::core::schema::DatabaseKind;
use crate::error::{MigrateError, Result};

/// Validate merged connection fields and fill in defaults.
pub fn resolve(conn: ConnectionConfig) -> Result<ConnectionSettings> {
    let connection_string = conn
        .connection_string
        .filter(|s| !s.trim().is_empty());

    let kind = match (conn.r#type.as_deref(), connection_string.as_deref()) {
        (Some(db_type), _) => DatabaseKind::from_db_type(db_type)?,
        (None, Some(cs)) => infer_kind(cs),
        (None, None) => {
            return Err(MigrateError::Config(
                "connection.type or connection.connection_string is required".into(),
            ))
        }
    };

    // Fields carried by the connection string fill whatever was not set explicitly.
    let parsed = connection_string
        .as_deref()
        .map(|cs| parse_connection_string(kind, cs))
        .unwrap_or_default();
    let conn = ConnectionConfig {
        connection_string: None,
        ..conn
    }
    .or(parsed);

    let database = conn.database.filter(|d| !d.is_empty());
    let user = conn.user.filter(|u| !u.is_empty());
    if connection_string.is_none() {
        if database.is_none() {
            return Err(MigrateError::Config("connection.database is required".into()));
        }
        if user.is_none() {
            return Err(MigrateError::Config("connection.user is required".into()));
        }
    }

    let ssl_mode = match (conn.ssl_mode.as_deref(), conn.ssl) {
        (Some(mode), _) => SslMode::parse(mode)?,
        (None, Some(true)) => SslMode::Require,
        (None, _) => SslMode::Disable,
    };

    Ok(ConnectionSettings {
        kind,
        host: conn
            .host
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "localhost".to_string()),
        port: conn.port.unwrap_or_else(|| kind.default_port()),
        user: user.unwrap_or_default(),
        password: conn.password.unwrap_or_default(),
        database: database.unwrap_or_default(),
        ssl_mode,
        trust_server_cert: conn.trust_server_cert.unwrap_or(false),
        connection_string,
    })
}

/// Dialect implied by a connection string's scheme. ADO strings mean SQL Server.
pub fn infer_kind(connection_string: &str) -> DatabaseKind {
    let lower = connection_string.trim().to_lowercase();
    if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
        DatabaseKind::Postgres
    } else if lower.starts_with("mysql://") || lower.starts_with("mariadb://") {
        DatabaseKind::Mysql
    } else {
        DatabaseKind::Mssql
    }
}

/// Best-effort field extraction from a URL or ADO connection string.
fn parse_connection_string(kind: DatabaseKind, cs: &str) -> ConnectionConfig {
    match cs.split_once("://") {
        Some((_, rest)) => parse_url(rest),
        None if kind == DatabaseKind::Mssql => parse_ado(cs),
        None => ConnectionConfig::default(),
    }
}

fn parse_url(rest: &str) -> ConnectionConfig {
    let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
    let (credentials, host_port) = match authority.rsplit_once('@') {
        Some((c, h)) => (Some(c), h),
        None => (None, authority),
    };
    let (user, password) = match credentials {
        Some(c) => match c.split_once(':') {
            Some((u, p)) => (Some(u.to_string()), Some(p.to_string())),
            None => (Some(c.to_string()), None),
        },
        None => (None, None),
    };
    let (host, port) = match host_port.rsplit_once(':') {
        Some((h, p)) => (h, p.parse().ok()),
        None => (host_port, None),
    };
    let database = path.split('?').next().unwrap_or_default();

    ConnectionConfig {
        host: Some(host.to_string()).filter(|h| !h.is_empty()),
        port,
        user,
        password,
        database: Some(database.to_string()).filter(|d| !d.is_empty()),
        ..Default::default()
    }
}

fn parse_ado(cs: &str) -> ConnectionConfig {
    let mut conn = ConnectionConfig::default();
    for pair in cs.split(';') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = value.trim().to_string();
        match key.trim().to_lowercase().as_str() {
            "server" | "data source" | "address" => {
                let server = value.trim_start_matches("tcp:");
                let (host, port) = match server.split_once(',') {
                    Some((h, p)) => (h, p.trim().parse().ok()),
                    None => (server, None),
                };
                conn.host = Some(host.to_string());
                conn.port = port;
            }
            "database" | "initial catalog" => conn.database = Some(value),
            "user id" | "uid" | "user" => conn.user = Some(value),
            "password" | "pwd" => conn.password = Some(value),
            "trustservercertificate" => {
                conn.trust_server_cert = Some(value.eq_ignore_ascii_case("true"))
            }
            _ => {}
        }
    }
    conn
}
