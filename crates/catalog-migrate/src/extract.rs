//! Row extraction for seed-data generation.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::core::identifier::{quote_for, validate_filter_predicate};
use crate::core::schema::{DatabaseSchema, Row, TableData, TableMetadata};
use crate::core::traits::{Connector, QueryOptions};
use crate::error::Result;

/// One table to extract, as named by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRequest {
    pub name: String,

    /// Predicate spliced into `WHERE`, e.g. `active = 1`.
    #[serde(default)]
    pub filter: Option<String>,

    /// Seed explicit identity values instead of letting the target assign them.
    #[serde(default)]
    pub disable_identity: bool,
}

impl TableRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Pulls full table contents through a connector, bypassing the safety gate.
pub struct DataExtractor<'a> {
    conn: &'a dyn Connector,
}

impl<'a> DataExtractor<'a> {
    pub fn new(conn: &'a dyn Connector) -> Self {
        Self { conn }
    }

    /// Extract rows for each request in order.
    ///
    /// Tables are resolved case-insensitively against `schema`. Unknown tables,
    /// rejected filters and failed reads are logged and skipped; the remaining
    /// tables are still extracted.
    pub async fn extract(
        &self,
        schema: &DatabaseSchema,
        requests: &[TableRequest],
    ) -> Result<Vec<TableData>> {
        let mut result = Vec::with_capacity(requests.len());

        for request in requests {
            let Some(table) = schema.find_table(&request.name) else {
                warn!("Table {} not found in schema, skipping", request.name);
                continue;
            };

            let sql = match self.select_statement(table, request.filter.as_deref()) {
                Ok(sql) => sql,
                Err(e) => {
                    error!("Skipping extraction of {}: {}", table.name, e);
                    continue;
                }
            };

            match self.conn.query(&sql, &[], QueryOptions::trusted()).await {
                Ok(rows) => {
                    info!("Extracted {} rows from {}", rows.len(), table.name);
                    result.push(TableData {
                        table_name: table.name.clone(),
                        columns: table.columns.clone(),
                        rows,
                        disable_identity: request.disable_identity,
                    });
                }
                Err(e) => {
                    error!("Error extracting data from {}: {}", table.name, e);
                }
            }
        }

        Ok(result)
    }

    fn select_statement(&self, table: &TableMetadata, filter: Option<&str>) -> Result<String> {
        let quoted = quote_for(self.conn.kind(), &table.name)?;
        match filter {
            Some(predicate) => {
                validate_filter_predicate(predicate)?;
                Ok(format!("SELECT * FROM {} WHERE {}", quoted, predicate.trim()))
            }
            None => Ok(format!("SELECT * FROM {}", quoted)),
        }
    }
}

/// Rows to seed for `data`.
///
/// With `disable_identity` the rows are returned unchanged; otherwise every
/// key naming an auto-increment column is removed so the target assigns it.
pub fn filter_auto_increment_columns(data: &TableData) -> Vec<Row> {
    if data.disable_identity {
        return data.rows.clone();
    }

    let auto: HashSet<&str> = data
        .columns
        .iter()
        .filter(|c| c.is_auto_increment)
        .map(|c| c.name.as_str())
        .collect();

    if auto.is_empty() {
        return data.rows.clone();
    }

    data.rows
        .iter()
        .map(|row| {
            row.iter()
                .filter(|(key, _)| !auto.contains(key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
        .collect()
}
