//! Canonical schema model shared by every introspector and generator.
//!
//! These types provide a dialect-neutral representation of catalog metadata.
//! They serialize camelCase so the `schema.json` written by `introspect` keeps
//! stable field names.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};

/// A single extracted row: column name to value, in driver column order.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Supported database dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    #[serde(alias = "sqlserver")]
    Mssql,
    #[serde(alias = "postgresql", alias = "pg")]
    Postgres,
    #[serde(alias = "mariadb")]
    Mysql,
}

impl DatabaseKind {
    /// Resolve a dialect from its user-facing name.
    ///
    /// Accepts `mssql`/`sqlserver`, `postgres`/`postgresql`/`pg` and
    /// `mysql`/`mariadb` (case-insensitive).
    pub fn from_db_type(db_type: &str) -> Result<Self> {
        match db_type.trim().to_lowercase().as_str() {
            "mssql" | "sqlserver" => Ok(DatabaseKind::Mssql),
            "postgres" | "postgresql" | "pg" => Ok(DatabaseKind::Postgres),
            "mysql" | "mariadb" => Ok(DatabaseKind::Mysql),
            _ => Err(MigrateError::IntrospectionDialectUnsupported(
                db_type.to_string(),
            )),
        }
    }

    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseKind::Mssql => "mssql",
            DatabaseKind::Postgres => "postgres",
            DatabaseKind::Mysql => "mysql",
        }
    }

    /// Default TCP port for the dialect.
    pub fn default_port(&self) -> u16 {
        match self {
            DatabaseKind::Mssql => 1433,
            DatabaseKind::Postgres => 5432,
            DatabaseKind::Mysql => 3306,
        }
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared character length of a column.
///
/// Serialized as an integer where `-1` means unbounded (`MAX`, `longtext`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum CharLength {
    Unbounded,
    Bounded(u32),
}

impl CharLength {
    /// Interpret a catalog-reported length.
    ///
    /// `-1` and anything beyond `i32::MAX` are unbounded; zero and other
    /// negative values carry no length information.
    pub fn from_catalog(raw: i64) -> Option<Self> {
        if raw == -1 || raw > i64::from(i32::MAX) {
            Some(CharLength::Unbounded)
        } else if raw > 0 {
            Some(CharLength::Bounded(raw as u32))
        } else {
            None
        }
    }
}

impl From<CharLength> for i64 {
    fn from(len: CharLength) -> i64 {
        match len {
            CharLength::Unbounded => -1,
            CharLength::Bounded(n) => i64::from(n),
        }
    }
}

impl TryFrom<i64> for CharLength {
    type Error = String;

    fn try_from(raw: i64) -> std::result::Result<Self, Self::Error> {
        CharLength::from_catalog(raw).ok_or_else(|| format!("invalid maxLength {}", raw))
    }
}

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMetadata {
    pub name: String,

    /// Dialect-native type name, as reported by the catalog.
    pub data_type: String,

    pub is_nullable: bool,

    pub has_default: bool,

    /// Raw default expression or literal.
    pub default_value: Option<String>,

    pub is_primary_key: bool,

    /// Set by single-column, non-primary unique constraints or indexes.
    pub is_unique: bool,

    pub is_auto_increment: bool,

    pub max_length: Option<CharLength>,

    pub numeric_precision: Option<u32>,

    pub numeric_scale: Option<u32>,
}

impl ColumnMetadata {
    /// A nullable column of the given type with every flag cleared.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable: true,
            has_default: false,
            default_value: None,
            is_primary_key: false,
            is_unique: false,
            is_auto_increment: false,
            max_length: None,
            numeric_precision: None,
            numeric_scale: None,
        }
    }
}

/// Index metadata. Column order is the key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexMetadata {
    pub name: String,
    pub columns: Vec<String>,
    pub is_unique: bool,
    pub is_primary: bool,
}

/// Foreign key constraint metadata.
///
/// `columns` and `referenced_columns` are positionally paired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyMetadata {
    pub name: String,
    pub table_name: String,
    pub columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
    pub update_rule: Option<String>,
    pub delete_rule: Option<String>,
}

/// Table metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMetadata {
    pub name: String,
    pub columns: Vec<ColumnMetadata>,
    pub indexes: Vec<IndexMetadata>,
    pub foreign_keys: Vec<ForeignKeyMetadata>,
}

impl TableMetadata {
    /// Create an empty table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Look up a column by exact name.
    pub fn column(&self, name: &str) -> Option<&ColumnMetadata> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// The index flagged primary, if any.
    pub fn primary_index(&self) -> Option<&IndexMetadata> {
        self.indexes.iter().find(|idx| idx.is_primary)
    }

    /// Indexes other than the primary key.
    pub fn secondary_indexes(&self) -> impl Iterator<Item = &IndexMetadata> {
        self.indexes.iter().filter(|idx| !idx.is_primary)
    }

    /// Columns carrying an identity/auto-increment property.
    pub fn auto_increment_columns(&self) -> impl Iterator<Item = &ColumnMetadata> {
        self.columns.iter().filter(|c| c.is_auto_increment)
    }

    /// Whether a unique column is already enforced by a single-column unique index.
    pub fn has_unique_index_on(&self, column: &str) -> bool {
        self.secondary_indexes()
            .any(|idx| idx.is_unique && idx.columns.len() == 1 && idx.columns[0] == column)
    }
}

/// An introspected database: tables in catalog order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSchema {
    pub tables: Vec<TableMetadata>,
}

impl DatabaseSchema {
    pub fn new(tables: Vec<TableMetadata>) -> Self {
        Self { tables }
    }

    /// Case-insensitive table lookup, as used when correlating with user input.
    pub fn find_table(&self, name: &str) -> Option<&TableMetadata> {
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }
}

/// Rows extracted for one table, ready for seeding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableData {
    pub table_name: String,
    pub columns: Vec<ColumnMetadata>,
    pub rows: Vec<Row>,

    /// Seed explicit identity values and resynchronize the generator afterward.
    #[serde(default)]
    pub disable_identity: bool,
}

impl TableData {
    /// The first auto-increment column, if any.
    pub fn auto_increment_column(&self) -> Option<&ColumnMetadata> {
        self.columns.iter().find(|c| c.is_auto_increment)
    }

    /// Whether any row carries an explicit value for the auto-increment column.
    pub fn has_explicit_identity_values(&self, rows: &[Row]) -> bool {
        match self.auto_increment_column() {
            Some(col) => rows.iter().any(|row| row.contains_key(&col.name)),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_kind_aliases() {
        assert_eq!(DatabaseKind::from_db_type("SQLServer").unwrap(), DatabaseKind::Mssql);
        assert_eq!(DatabaseKind::from_db_type("pg").unwrap(), DatabaseKind::Postgres);
        assert_eq!(DatabaseKind::from_db_type("mariadb").unwrap(), DatabaseKind::Mysql);
        assert!(matches!(
            DatabaseKind::from_db_type("oracle"),
            Err(MigrateError::IntrospectionDialectUnsupported(t)) if t == "oracle"
        ));
    }

    #[test]
    fn test_database_kind_serde() {
        let kind: DatabaseKind = serde_yaml::from_str("postgresql").unwrap();
        assert_eq!(kind, DatabaseKind::Postgres);
        assert_eq!(serde_json::to_string(&DatabaseKind::Mssql).unwrap(), "\"mssql\"");
    }

    #[test]
    fn test_char_length_from_catalog() {
        assert_eq!(CharLength::from_catalog(-1), Some(CharLength::Unbounded));
        assert_eq!(CharLength::from_catalog(4_294_967_295), Some(CharLength::Unbounded));
        assert_eq!(CharLength::from_catalog(255), Some(CharLength::Bounded(255)));
        assert_eq!(CharLength::from_catalog(0), None);
    }

    #[test]
    fn test_column_serializes_camel_case_with_sentinel() {
        let mut col = ColumnMetadata::new("bio", "nvarchar");
        col.max_length = Some(CharLength::Unbounded);
        let json = serde_json::to_value(&col).unwrap();
        assert_eq!(json["dataType"], "nvarchar");
        assert_eq!(json["maxLength"], -1);
        assert_eq!(json["isAutoIncrement"], false);

        let back: ColumnMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(back, col);
    }

    #[test]
    fn test_find_table_is_case_insensitive() {
        let schema = DatabaseSchema::new(vec![TableMetadata::new("Users")]);
        assert!(schema.find_table("users").is_some());
        assert!(schema.find_table("USERS").is_some());
        assert!(schema.find_table("posts").is_none());
    }

    #[test]
    fn test_explicit_identity_values() {
        let mut id = ColumnMetadata::new("id", "int");
        id.is_auto_increment = true;
        let data = TableData {
            table_name: "users".into(),
            columns: vec![id, ColumnMetadata::new("name", "varchar")],
            rows: Vec::new(),
            disable_identity: true,
        };
        let with_id: Row = serde_json::from_str(r#"{"id": 1, "name": "Alice"}"#).unwrap();
        let without_id: Row = serde_json::from_str(r#"{"name": "Bob"}"#).unwrap();
        assert!(data.has_explicit_identity_values(&[with_id]));
        assert!(!data.has_explicit_identity_values(&[without_id]));
    }
}
