//! MySQL / MariaDB catalog introspection.
//!
//! `information_schema` text columns may carry a binary collation, so every
//! text value is cast to `CHAR`. The primary key is the index named `PRIMARY`.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::core::schema::DatabaseSchema;
use crate::core::traits::{query_as, Connector};
use crate::error::Result;

use super::catalog::{CatalogRows, ColumnRow, ForeignKeyRow, IndexRow, TableRow};
use super::Introspector;

const TABLES_SQL: &str = r#"
    SELECT CAST(t.table_name AS CHAR) AS table_name
    FROM information_schema.tables t
    WHERE t.table_schema = DATABASE()
      AND t.table_type = 'BASE TABLE'
    ORDER BY t.table_name
"#;

const COLUMNS_SQL: &str = r#"
    SELECT
        CAST(c.table_name AS CHAR) AS table_name,
        CAST(c.column_name AS CHAR) AS column_name,
        CAST(c.data_type AS CHAR) AS data_type,
        CAST(c.is_nullable AS CHAR) AS is_nullable,
        CAST(c.column_default AS CHAR) AS column_default,
        c.character_maximum_length AS character_maximum_length,
        c.numeric_precision AS numeric_precision,
        c.numeric_scale AS numeric_scale,
        CAST(c.extra AS CHAR) AS extra
    FROM information_schema.columns c
    WHERE c.table_schema = DATABASE()
    ORDER BY c.table_name, c.ordinal_position
"#;

const INDEXES_SQL: &str = r#"
    SELECT
        CAST(s.table_name AS CHAR) AS table_name,
        CAST(s.index_name AS CHAR) AS index_name,
        s.non_unique AS non_unique,
        CAST(s.column_name AS CHAR) AS column_name
    FROM information_schema.statistics s
    WHERE s.table_schema = DATABASE()
      AND s.column_name IS NOT NULL
    ORDER BY s.table_name, s.index_name, s.seq_in_index
"#;

const FOREIGN_KEYS_SQL: &str = r#"
    SELECT
        CAST(rc.constraint_name AS CHAR) AS constraint_name,
        CAST(kcu.table_name AS CHAR) AS table_name,
        CAST(kcu.column_name AS CHAR) AS column_name,
        CAST(kcu.referenced_table_name AS CHAR) AS referenced_table_name,
        CAST(kcu.referenced_column_name AS CHAR) AS referenced_column_name,
        CAST(rc.update_rule AS CHAR) AS update_rule,
        CAST(rc.delete_rule AS CHAR) AS delete_rule
    FROM information_schema.referential_constraints rc
    JOIN information_schema.key_column_usage kcu
        ON rc.constraint_name = kcu.constraint_name
       AND rc.constraint_schema = kcu.table_schema
       AND rc.table_name = kcu.table_name
    WHERE kcu.table_schema = DATABASE()
    ORDER BY kcu.table_name, rc.constraint_name, kcu.ordinal_position
"#;

const PRIMARY_INDEX: &str = "PRIMARY";

#[derive(Debug, Deserialize)]
struct StatisticsRow {
    table_name: String,
    index_name: String,
    non_unique: i64,
    column_name: String,
}

/// Introspects base tables of the connection's current database.
///
/// A column is auto-increment when `extra` contains `auto_increment`.
pub struct MysqlIntrospector<'a> {
    conn: &'a dyn Connector,
}

impl<'a> MysqlIntrospector<'a> {
    pub fn new(conn: &'a dyn Connector) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl Introspector for MysqlIntrospector<'_> {
    async fn introspect_schema(&self) -> Result<DatabaseSchema> {
        let tables: Vec<TableRow> = query_as(self.conn, TABLES_SQL, &[]).await?;
        let columns: Vec<ColumnRow> = query_as(self.conn, COLUMNS_SQL, &[]).await?;
        let statistics: Vec<StatisticsRow> = query_as(self.conn, INDEXES_SQL, &[]).await?;
        let foreign_keys: Vec<ForeignKeyRow> = query_as(self.conn, FOREIGN_KEYS_SQL, &[]).await?;

        debug!(
            "Loaded {} tables, {} columns, {} index columns",
            tables.len(),
            columns.len(),
            statistics.len()
        );

        let indexes = statistics
            .into_iter()
            .map(|s| IndexRow {
                is_primary: s.index_name == PRIMARY_INDEX,
                is_unique: s.non_unique == 0,
                table_name: s.table_name,
                index_name: s.index_name,
                column_name: s.column_name,
            })
            .collect();

        let rows = CatalogRows {
            tables,
            columns: columns
                .into_iter()
                .map(|c| {
                    let auto = c
                        .extra
                        .as_deref()
                        .is_some_and(|e| e.to_lowercase().contains("auto_increment"));
                    c.into_column(auto)
                })
                .collect(),
            keys: Vec::new(),
            indexes,
            foreign_keys,
        };
        Ok(rows.assemble())
    }
}
