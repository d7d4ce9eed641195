//! SQL Server catalog introspection.

use async_trait::async_trait;
use tracing::debug;

use crate::core::schema::DatabaseSchema;
use crate::core::traits::{query_as, Connector};
use crate::error::Result;

use super::catalog::{CatalogRows, ColumnRow, ForeignKeyRow, IndexRow, KeyRow, TableRow};
use super::Introspector;

const TABLES_SQL: &str = r#"
    SELECT TABLE_NAME AS table_name
    FROM INFORMATION_SCHEMA.TABLES
    WHERE TABLE_TYPE = 'BASE TABLE'
    ORDER BY TABLE_NAME
"#;

const COLUMNS_SQL: &str = r#"
    SELECT
        c.TABLE_NAME AS table_name,
        c.COLUMN_NAME AS column_name,
        c.DATA_TYPE AS data_type,
        c.IS_NULLABLE AS is_nullable,
        c.COLUMN_DEFAULT AS column_default,
        c.CHARACTER_MAXIMUM_LENGTH AS character_maximum_length,
        CAST(c.NUMERIC_PRECISION AS INT) AS numeric_precision,
        c.NUMERIC_SCALE AS numeric_scale,
        COLUMNPROPERTY(OBJECT_ID(QUOTENAME(c.TABLE_SCHEMA) + '.' + QUOTENAME(c.TABLE_NAME)), c.COLUMN_NAME, 'IsIdentity') AS is_identity
    FROM INFORMATION_SCHEMA.COLUMNS c
    ORDER BY c.TABLE_NAME, c.ORDINAL_POSITION
"#;

const KEYS_SQL: &str = r#"
    SELECT
        tc.TABLE_NAME AS table_name,
        tc.CONSTRAINT_NAME AS constraint_name,
        tc.CONSTRAINT_TYPE AS constraint_type,
        ku.COLUMN_NAME AS column_name
    FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
    JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE ku
        ON tc.CONSTRAINT_NAME = ku.CONSTRAINT_NAME
       AND tc.TABLE_SCHEMA = ku.TABLE_SCHEMA
       AND tc.TABLE_NAME = ku.TABLE_NAME
    WHERE tc.CONSTRAINT_TYPE IN ('PRIMARY KEY', 'UNIQUE')
    ORDER BY tc.TABLE_NAME, tc.CONSTRAINT_NAME, ku.ORDINAL_POSITION
"#;

const INDEXES_SQL: &str = r#"
    SELECT
        t.name AS table_name,
        ind.name AS index_name,
        ind.is_unique AS is_unique,
        ind.is_primary_key AS is_primary,
        col.name AS column_name
    FROM sys.indexes ind
    JOIN sys.index_columns ic
        ON ind.object_id = ic.object_id
       AND ind.index_id = ic.index_id
    JOIN sys.columns col
        ON ic.object_id = col.object_id
       AND ic.column_id = col.column_id
    JOIN sys.tables t
        ON ind.object_id = t.object_id
    WHERE t.is_ms_shipped = 0
      AND ind.type > 0
      AND ic.is_included_column = 0
    ORDER BY t.name, ind.name, ic.key_ordinal
"#;

const FOREIGN_KEYS_SQL: &str = r#"
    SELECT
        fk.name AS constraint_name,
        tp.name AS table_name,
        cp.name AS column_name,
        tr.name AS referenced_table_name,
        cr.name AS referenced_column_name,
        REPLACE(fk.update_referential_action_desc, '_', ' ') AS update_rule,
        REPLACE(fk.delete_referential_action_desc, '_', ' ') AS delete_rule
    FROM sys.foreign_keys fk
    JOIN sys.foreign_key_columns fkc
        ON fk.object_id = fkc.constraint_object_id
    JOIN sys.tables tp
        ON fkc.parent_object_id = tp.object_id
    JOIN sys.columns cp
        ON fkc.parent_object_id = cp.object_id
       AND fkc.parent_column_id = cp.column_id
    JOIN sys.tables tr
        ON fkc.referenced_object_id = tr.object_id
    JOIN sys.columns cr
        ON fkc.referenced_object_id = cr.object_id
       AND fkc.referenced_column_id = cr.column_id
    ORDER BY tp.name, fk.name, fkc.constraint_column_id
"#;

/// Introspects base tables of the current SQL Server database.
///
/// Identity columns are detected with `COLUMNPROPERTY(.., 'IsIdentity')`.
pub struct MssqlIntrospector<'a> {
    conn: &'a dyn Connector,
}

impl<'a> MssqlIntrospector<'a> {
    pub fn new(conn: &'a dyn Connector) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl Introspector for MssqlIntrospector<'_> {
    async fn introspect_schema(&self) -> Result<DatabaseSchema> {
        let tables: Vec<TableRow> = query_as(self.conn, TABLES_SQL, &[]).await?;
        let columns: Vec<ColumnRow> = query_as(self.conn, COLUMNS_SQL, &[]).await?;
        let keys: Vec<KeyRow> = query_as(self.conn, KEYS_SQL, &[]).await?;
        let indexes: Vec<IndexRow> = query_as(self.conn, INDEXES_SQL, &[]).await?;
        let foreign_keys: Vec<ForeignKeyRow> = query_as(self.conn, FOREIGN_KEYS_SQL, &[]).await?;

        debug!(
            "Loaded {} tables, {} columns, {} index columns, {} foreign key columns",
            tables.len(),
            columns.len(),
            indexes.len(),
            foreign_keys.len()
        );

        let rows = CatalogRows {
            tables,
            columns: columns
                .into_iter()
                .map(|c| {
                    let identity = c.is_identity;
                    c.into_column(identity)
                })
                .collect(),
            keys,
            indexes,
            foreign_keys,
        };
        Ok(rows.assemble())
    }
}
