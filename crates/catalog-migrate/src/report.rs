//! Metadata files written alongside introspection and generation output.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ConnectionSettings;
use crate::core::schema::{DatabaseKind, DatabaseSchema};
use crate::core::traits::Connector;
use crate::error::Result;

/// File name of [`DatabaseInfo`] in a migrations directory.
pub const DATABASE_INFO_FILE: &str = "database-info.json";

/// Source database facts recorded next to generated migrations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseInfo {
    #[serde(rename = "type")]
    pub kind: DatabaseKind,
    pub version: String,
    pub database_name: String,
    /// ISO-8601 generation time.
    pub timestamp: String,
}

impl DatabaseInfo {
    /// Query version and database name from a connected connector.
    pub async fn collect(conn: &dyn Connector, at: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            kind: conn.kind(),
            version: conn.version().await?,
            database_name: conn.database_name().await?,
            timestamp: iso_timestamp(at),
        })
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Summary of one introspection run, written as `metadata.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntrospectionMetadata {
    #[serde(rename = "type")]
    pub kind: DatabaseKind,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub executed_at: String,
    pub tables_count: usize,
}

impl IntrospectionMetadata {
    pub fn new(settings: &ConnectionSettings, schema: &DatabaseSchema, at: DateTime<Utc>) -> Self {
        Self {
            kind: settings.kind,
            host: settings.host.clone(),
            port: settings.port,
            database: settings.database.clone(),
            executed_at: iso_timestamp(at),
            tables_count: schema.tables.len(),
        }
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Directory name for an introspection run: `run-2024-01-15T10-30-00-000Z`.
pub fn run_dir_name(at: DateTime<Utc>) -> String {
    format!("run-{}", iso_timestamp(at).replace([':', '.'], "-"))
}

fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
