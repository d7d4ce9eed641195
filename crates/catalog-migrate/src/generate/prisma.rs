//! Prisma schema generation (models only).

use crate::core::schema::{ColumnMetadata, DatabaseKind, DatabaseSchema, TableMetadata};
use crate::error::Result;

use super::typemap::{classify, TypeCategory};
use super::{class_name, js_str, GeneratedFile, SchemaGenerator};

/// Prisma profile. Emits a single `schema.prisma`.
#[derive(Debug, Clone, Default)]
pub struct PrismaGenerator {
    source: Option<DatabaseKind>,
}

impl PrismaGenerator {
    /// `source` selects the datasource provider, PostgreSQL when unknown.
    pub fn new(source: Option<DatabaseKind>) -> Self {
        Self { source }
    }

    fn provider(&self) -> &'static str {
        match self.source {
            Some(DatabaseKind::Mssql) => "sqlserver",
            Some(DatabaseKind::Mysql) => "mysql",
            Some(DatabaseKind::Postgres) | None => "postgresql",
        }
    }
}

impl SchemaGenerator for PrismaGenerator {
    fn generate(&self, schema: &DatabaseSchema) -> Result<Vec<GeneratedFile>> {
        let mut out = format!(
            "generator client {{\n  provider = \"prisma-client-js\"\n}}\n\n\
             datasource db {{\n  provider = \"{}\"\n  url      = env(\"DATABASE_URL\")\n}}\n",
            self.provider()
        );
        for table in &schema.tables {
            out.push('\n');
            out.push_str(&model(table));
        }
        Ok(vec![GeneratedFile::new("schema.prisma", out)])
    }
}

fn scalar(category: TypeCategory) -> &'static str {
    match category {
        TypeCategory::Boolean => "Boolean",
        TypeCategory::BigInt => "BigInt",
        c if c.is_integer() => "Int",
        TypeCategory::Float | TypeCategory::Double => "Float",
        TypeCategory::Decimal(_) => "Decimal",
        TypeCategory::DateOnly | TypeCategory::Time | TypeCategory::Timestamp => "DateTime",
        TypeCategory::Json => "Json",
        TypeCategory::Binary => "Bytes",
        _ => "String",
    }
}

fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Prisma field name for a column; `None` when the column name can be used as is.
fn mapped_field(column: &str) -> Option<String> {
    if is_valid_identifier(column) {
        return None;
    }
    let mut field: String = column
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if !field.starts_with(|c: char| c.is_ascii_alphabetic()) {
        field.insert(0, 'f');
    }
    Some(field)
}

fn field_name(column: &str) -> String {
    mapped_field(column).unwrap_or_else(|| column.to_string())
}

fn is_now(default: &str) -> bool {
    let lower = default.to_lowercase();
    lower.contains("now()") || lower.contains("current_timestamp") || lower.contains("getdate()")
}

fn field(column: &ColumnMetadata) -> String {
    let category = classify(column);
    let mut line = format!("  {} {}", field_name(&column.name), scalar(category));
    if column.is_nullable && !column.is_primary_key {
        line.push('?');
    }
    if column.is_auto_increment {
        line.push_str(" @default(autoincrement())");
    } else if column.default_value.as_deref().is_some_and(is_now) {
        line.push_str(" @default(now())");
    }
    if mapped_field(&column.name).is_some() {
        line.push_str(&format!(" @map({})", js_str(&column.name)));
    }
    line
}

fn field_list(columns: &[String]) -> String {
    let names: Vec<String> = columns.iter().map(|c| field_name(c)).collect();
    format!("[{}]", names.join(", "))
}

fn model(table: &TableMetadata) -> String {
    let mut lines: Vec<String> = table.columns.iter().map(field).collect();
    lines.push(String::new());

    if let Some(pk) = table.primary_index() {
        lines.push(format!(
            "  @@id({}, map: {})",
            field_list(&pk.columns),
            js_str(&pk.name)
        ));
    }
    for idx in table.secondary_indexes() {
        let attribute = if idx.is_unique { "@@unique" } else { "@@index" };
        lines.push(format!(
            "  {}({}, map: {})",
            attribute,
            field_list(&idx.columns),
            js_str(&idx.name)
        ));
    }
    lines.push(format!("  @@map({})", js_str(&table.name)));

    format!(
        "model {} {{\n{}\n}}\n",
        class_name(&table.name),
        lines.join("\n")
    )
}
