//! PostgreSQL catalog introspection.
//!
//! Every selected catalog value is cast to a plain type (`text`, `int`,
//! `text[]`) so the driver never has to decode `sql_identifier`, `name` or
//! `cardinal_number` domains.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::core::schema::DatabaseSchema;
use crate::core::traits::{query_as, Connector};
use crate::error::Result;

use super::catalog::{CatalogRows, ColumnRow, ForeignKeyRow, IndexRow, KeyRow, TableRow};
use super::Introspector;

/// Schema introspected when none is configured.
pub const DEFAULT_SCHEMA: &str = "public";

const TABLES_SQL: &str = r#"
    SELECT table_name::text AS table_name
    FROM information_schema.tables
    WHERE table_schema = $1::text
      AND table_type = 'BASE TABLE'
    ORDER BY table_name
"#;

const COLUMNS_SQL: &str = r#"
    SELECT
        c.table_name::text AS table_name,
        c.column_name::text AS column_name,
        c.data_type::text AS data_type,
        c.is_nullable::text AS is_nullable,
        c.column_default::text AS column_default,
        c.character_maximum_length::int AS character_maximum_length,
        c.numeric_precision::int AS numeric_precision,
        c.numeric_scale::int AS numeric_scale,
        c.is_identity::text AS is_identity
    FROM information_schema.columns c
    WHERE c.table_schema = $1::text
    ORDER BY c.table_name, c.ordinal_position
"#;

const KEYS_SQL: &str = r#"
    SELECT
        tc.table_name::text AS table_name,
        tc.constraint_name::text AS constraint_name,
        tc.constraint_type::text AS constraint_type,
        kcu.column_name::text AS column_name
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
        ON tc.constraint_name = kcu.constraint_name
       AND tc.table_schema = kcu.table_schema
       AND tc.table_name = kcu.table_name
    WHERE tc.table_schema = $1::text
      AND tc.constraint_type IN ('PRIMARY KEY', 'UNIQUE')
    ORDER BY tc.table_name, tc.constraint_name, kcu.ordinal_position
"#;

const INDEXES_SQL: &str = r#"
    SELECT
        t.relname::text AS table_name,
        i.relname::text AS index_name,
        ix.indisunique AS is_unique,
        ix.indisprimary AS is_primary,
        ARRAY_AGG(a.attname::text ORDER BY array_position(ix.indkey::int2[], a.attnum)) AS column_names
    FROM pg_catalog.pg_class t
    JOIN pg_catalog.pg_index ix ON t.oid = ix.indrelid
    JOIN pg_catalog.pg_class i ON i.oid = ix.indexrelid
    JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey)
    JOIN pg_catalog.pg_namespace ns ON ns.oid = t.relnamespace
    WHERE ns.nspname = $1::text
      AND t.relkind = 'r'
    GROUP BY t.relname, i.relname, ix.indisunique, ix.indisprimary
    ORDER BY t.relname, i.relname
"#;

const FOREIGN_KEYS_SQL: &str = r#"
    SELECT
        con.conname::text AS constraint_name,
        src.relname::text AS table_name,
        sa.attname::text AS column_name,
        dst.relname::text AS referenced_table_name,
        da.attname::text AS referenced_column_name,
        CASE con.confupdtype
            WHEN 'a' THEN 'NO ACTION' WHEN 'r' THEN 'RESTRICT' WHEN 'c' THEN 'CASCADE'
            WHEN 'n' THEN 'SET NULL' WHEN 'd' THEN 'SET DEFAULT'
        END AS update_rule,
        CASE con.confdeltype
            WHEN 'a' THEN 'NO ACTION' WHEN 'r' THEN 'RESTRICT' WHEN 'c' THEN 'CASCADE'
            WHEN 'n' THEN 'SET NULL' WHEN 'd' THEN 'SET DEFAULT'
        END AS delete_rule
    FROM pg_catalog.pg_constraint con
    JOIN pg_catalog.pg_class src ON src.oid = con.conrelid
    JOIN pg_catalog.pg_class dst ON dst.oid = con.confrelid
    JOIN pg_catalog.pg_namespace ns ON ns.oid = src.relnamespace
    CROSS JOIN LATERAL unnest(con.conkey, con.confkey) WITH ORDINALITY AS k(src_attnum, dst_attnum, ord)
    JOIN pg_catalog.pg_attribute sa ON sa.attrelid = con.conrelid AND sa.attnum = k.src_attnum
    JOIN pg_catalog.pg_attribute da ON da.attrelid = con.confrelid AND da.attnum = k.dst_attnum
    WHERE con.contype = 'f'
      AND ns.nspname = $1::text
    ORDER BY src.relname, con.conname, k.ord
"#;

/// Aggregated index row; PostgreSQL returns one row per index.
#[derive(Debug, Deserialize)]
struct PgIndexRow {
    table_name: String,
    index_name: String,
    is_unique: bool,
    is_primary: bool,
    #[serde(default)]
    column_names: Vec<Option<String>>,
}

/// Introspects base tables of one PostgreSQL schema (`public` by default).
///
/// A column is auto-increment when its default calls `nextval(` or it is
/// declared `GENERATED ... AS IDENTITY`.
pub struct PostgresIntrospector<'a> {
    conn: &'a dyn Connector,
    schema: String,
}

impl<'a> PostgresIntrospector<'a> {
    pub fn new(conn: &'a dyn Connector) -> Self {
        Self::with_schema(conn, DEFAULT_SCHEMA)
    }

    pub fn with_schema(conn: &'a dyn Connector, schema: impl Into<String>) -> Self {
        Self {
            conn,
            schema: schema.into(),
        }
    }
}

#[async_trait]
impl Introspector for PostgresIntrospector<'_> {
    async fn introspect_schema(&self) -> Result<DatabaseSchema> {
        let params: [Value; 1] = [json!(self.schema)];

        let tables: Vec<TableRow> = query_as(self.conn, TABLES_SQL, &params).await?;
        let columns: Vec<ColumnRow> = query_as(self.conn, COLUMNS_SQL, &params).await?;
        let keys: Vec<KeyRow> = query_as(self.conn, KEYS_SQL, &params).await?;
        let pg_indexes: Vec<PgIndexRow> = query_as(self.conn, INDEXES_SQL, &params).await?;
        let foreign_keys: Vec<ForeignKeyRow> =
            query_as(self.conn, FOREIGN_KEYS_SQL, &params).await?;

        debug!(
            "Loaded {} tables, {} columns, {} indexes from schema '{}'",
            tables.len(),
            columns.len(),
            pg_indexes.len(),
            self.schema
        );

        let indexes = pg_indexes
            .into_iter()
            .flat_map(|idx| {
                let PgIndexRow {
                    table_name,
                    index_name,
                    is_unique,
                    is_primary,
                    column_names,
                } = idx;
                column_names
                    .into_iter()
                    .flatten()
                    .map(move |column_name| IndexRow {
                        table_name: table_name.clone(),
                        index_name: index_name.clone(),
                        is_unique,
                        is_primary,
                        column_name,
                    })
            })
            .collect();

        let rows = CatalogRows {
            tables,
            columns: columns
                .into_iter()
                .map(|c| {
                    let auto = c.is_identity
                        || c
                            .column_default
                            .as_deref()
                            .is_some_and(|d| d.to_lowercase().contains("nextval("));
                    c.into_column(auto)
                })
                .collect(),
            keys,
            indexes,
            foreign_keys,
        };
        Ok(rows.assemble())
    }
}
