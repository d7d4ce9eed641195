//! Catalog rows shared by every dialect and their assembly into a schema.
//!
//! Each introspector aliases its catalog queries to the column names below,
//! deserializes them with [`query_as`](crate::core::traits::query_as) and
//! hands the flattened rows to [`CatalogRows::assemble`]. Multi-row results
//! are grouped by `(table, constraint)` in order of first appearance.

use std::collections::HashMap;
use std::hash::Hash;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::schema::{
    CharLength, ColumnMetadata, DatabaseSchema, ForeignKeyMetadata, IndexMetadata, TableMetadata,
};

#[derive(Debug, Deserialize)]
pub(crate) struct TableRow {
    pub table_name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ColumnRow {
    pub table_name: String,
    pub column_name: String,
    pub data_type: String,
    #[serde(deserialize_with = "flag")]
    pub is_nullable: bool,
    #[serde(default)]
    pub column_default: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub character_maximum_length: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub numeric_precision: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub numeric_scale: Option<i64>,
    /// SQL Server `COLUMNPROPERTY(.., 'IsIdentity')`, PostgreSQL `is_identity`.
    #[serde(default, deserialize_with = "flag")]
    pub is_identity: bool,
    /// MySQL `extra` (`auto_increment`, `on update ...`).
    #[serde(default)]
    pub extra: Option<String>,
}

impl ColumnRow {
    pub fn into_column(self, is_auto_increment: bool) -> (String, ColumnMetadata) {
        let column = ColumnMetadata {
            name: self.column_name,
            data_type: self.data_type,
            is_nullable: self.is_nullable,
            has_default: self.column_default.is_some(),
            default_value: self.column_default,
            is_primary_key: false,
            is_unique: false,
            is_auto_increment,
            max_length: self
                .character_maximum_length
                .and_then(CharLength::from_catalog),
            numeric_precision: self.numeric_precision.and_then(|v| u32::try_from(v).ok()),
            numeric_scale: self.numeric_scale.and_then(|v| u32::try_from(v).ok()),
        };
        (self.table_name, column)
    }
}

/// One column of a primary-key or unique constraint.
#[derive(Debug, Deserialize)]
pub(crate) struct KeyRow {
    pub table_name: String,
    pub constraint_name: String,
    pub constraint_type: String,
    pub column_name: String,
}

impl KeyRow {
    fn is_primary(&self) -> bool {
        self.constraint_type.eq_ignore_ascii_case("PRIMARY KEY")
    }
}

/// One key column of an index, rows in key order.
#[derive(Debug, Deserialize)]
pub(crate) struct IndexRow {
    pub table_name: String,
    pub index_name: String,
    #[serde(deserialize_with = "flag")]
    pub is_unique: bool,
    #[serde(deserialize_with = "flag")]
    pub is_primary: bool,
    pub column_name: String,
}

/// One column pair of a foreign key, rows in constraint ordinal order.
#[derive(Debug, Deserialize)]
pub(crate) struct ForeignKeyRow {
    pub constraint_name: String,
    pub table_name: String,
    pub column_name: String,
    pub referenced_table_name: String,
    pub referenced_column_name: String,
    #[serde(default)]
    pub update_rule: Option<String>,
    #[serde(default)]
    pub delete_rule: Option<String>,
}

/// Everything one introspection pass read from the catalog.
#[derive(Debug, Default)]
pub(crate) struct CatalogRows {
    pub tables: Vec<TableRow>,
    pub columns: Vec<(String, ColumnMetadata)>,
    pub keys: Vec<KeyRow>,
    pub indexes: Vec<IndexRow>,
    pub foreign_keys: Vec<ForeignKeyRow>,
}

impl CatalogRows {
    /// Build the schema model.
    ///
    /// Rows that name a table outside `tables` are ignored. Index and
    /// foreign-key columns missing from their table are dropped, and a
    /// primary index is synthesized from the primary-key constraint when the
    /// catalog reported none.
    pub fn assemble(self) -> DatabaseSchema {
        let mut tables: Vec<TableMetadata> = Vec::with_capacity(self.tables.len());
        let mut positions: HashMap<String, usize> = HashMap::with_capacity(self.tables.len());
        for row in self.tables {
            if positions.contains_key(&row.table_name) {
                continue;
            }
            positions.insert(row.table_name.clone(), tables.len());
            tables.push(TableMetadata::new(row.table_name));
        }

        for (table_name, column) in self.columns {
            if let Some(&pos) = positions.get(&table_name) {
                tables[pos].columns.push(column);
            }
        }

        for ((table_name, index_name), rows) in
            group_by(self.indexes, |r| (r.table_name.clone(), r.index_name.clone()))
        {
            let Some(&pos) = positions.get(&table_name) else {
                continue;
            };
            let table = &mut tables[pos];
            let is_unique = rows[0].is_unique;
            let is_primary = rows[0].is_primary;
            let columns = retain_known_columns(
                table,
                &index_name,
                rows.into_iter().map(|r| r.column_name).collect(),
            );
            if columns.is_empty() {
                continue;
            }
            table.indexes.push(IndexMetadata {
                name: index_name,
                columns,
                is_unique: is_unique || is_primary,
                is_primary,
            });
        }

        let mut unique_keys: Vec<(usize, Vec<String>)> = Vec::new();
        for ((table_name, constraint_name), rows) in
            group_by(self.keys, |r| (r.table_name.clone(), r.constraint_name.clone()))
        {
            let Some(&pos) = positions.get(&table_name) else {
                continue;
            };
            let is_primary = rows[0].is_primary();
            let columns = retain_known_columns(
                &tables[pos],
                &constraint_name,
                rows.into_iter().map(|r| r.column_name).collect(),
            );
            if columns.is_empty() {
                continue;
            }

            if !is_primary {
                unique_keys.push((pos, columns));
                continue;
            }

            let table = &mut tables[pos];
            if table.primary_index().is_none() {
                debug!(
                    "Synthesizing primary index {} for {}",
                    constraint_name, table.name
                );
                table.indexes.insert(
                    0,
                    IndexMetadata {
                        name: constraint_name,
                        columns,
                        is_unique: true,
                        is_primary: true,
                    },
                );
            }
        }

        for table in &mut tables {
            let primary: Vec<String> = table
                .primary_index()
                .map(|idx| idx.columns.clone())
                .unwrap_or_default();
            let unique_singles: Vec<String> = table
                .secondary_indexes()
                .filter(|idx| idx.is_unique && idx.columns.len() == 1)
                .map(|idx| idx.columns[0].clone())
                .collect();

            for column in &mut table.columns {
                column.is_primary_key = primary.contains(&column.name);
                if unique_singles.contains(&column.name) {
                    column.is_unique = true;
                }
            }
        }

        for (pos, columns) in unique_keys {
            if let [single] = columns.as_slice() {
                if let Some(column) = tables[pos].columns.iter_mut().find(|c| &c.name == single) {
                    column.is_unique = true;
                }
            }
        }

        for ((table_name, constraint_name), rows) in group_by(self.foreign_keys, |r| {
            (r.table_name.clone(), r.constraint_name.clone())
        }) {
            let Some(&pos) = positions.get(&table_name) else {
                continue;
            };
            let table = &mut tables[pos];

            let referenced_table = rows[0].referenced_table_name.clone();
            let update_rule = rows[0].update_rule.clone();
            let delete_rule = rows[0].delete_rule.clone();

            let mut columns = Vec::with_capacity(rows.len());
            let mut referenced_columns = Vec::with_capacity(rows.len());
            for row in rows {
                if table.column(&row.column_name).is_none() {
                    warn!(
                        "Dropping column {} from foreign key {} on {}: column not found",
                        row.column_name, constraint_name, table.name
                    );
                    continue;
                }
                columns.push(row.column_name);
                referenced_columns.push(row.referenced_column_name);
            }
            if columns.is_empty() {
                continue;
            }

            table.foreign_keys.push(ForeignKeyMetadata {
                name: constraint_name,
                table_name: table.name.clone(),
                columns,
                referenced_table,
                referenced_columns,
                update_rule,
                delete_rule,
            });
        }

        DatabaseSchema::new(tables)
    }
}

fn retain_known_columns(table: &TableMetadata, owner: &str, columns: Vec<String>) -> Vec<String> {
    columns
        .into_iter()
        .filter(|name| {
            let known = table.column(name).is_some();
            if !known {
                warn!(
                    "Dropping column {} from {} on {}: column not found",
                    name, owner, table.name
                );
            }
            known
        })
        .collect()
}

/// Group rows by key, keeping groups and rows in order of first appearance.
fn group_by<R, K, F>(rows: Vec<R>, key: F) -> Vec<(K, Vec<R>)>
where
    K: Eq + Hash + Clone,
    F: Fn(&R) -> K,
{
    let mut groups: Vec<(K, Vec<R>)> = Vec::new();
    let mut slots: HashMap<K, usize> = HashMap::new();
    for row in rows {
        let k = key(&row);
        match slots.get(&k) {
            Some(&slot) => groups[slot].1.push(row),
            None => {
                slots.insert(k.clone(), groups.len());
                groups.push((k, vec![row]));
            }
        }
    }
    groups
}

/// Catalog flags arrive as booleans, bits, or `YES`/`NO` text depending on dialect.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => matches!(
            s.trim().to_ascii_uppercase().as_str(),
            "YES" | "Y" | "TRUE" | "T" | "1"
        ),
        _ => false,
    })
}

fn lenient_i64<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<i64>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|v| i64::try_from(v).unwrap_or(i64::MAX)))
            .or_else(|| n.as_f64().map(|v| v as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}
