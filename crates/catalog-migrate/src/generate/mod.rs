//! Model and migration generation for downstream ORM profiles.
//!
//! Profiles are selected by name through [`GeneratorImpl::from_target`].
//! Migration-capable profiles (Sequelize, TypeORM) share one step plan, see
//! [`plan`], so every profile emits tables, primary keys, foreign keys, seeds
//! and identity resyncs in the same order.

mod mongoose;
mod plan;
mod prisma;
mod sequelize;
mod typemap;
mod typeorm;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::schema::{DatabaseKind, DatabaseSchema, TableData};
use crate::error::{MigrateError, Result};

pub use mongoose::MongooseGenerator;
pub use prisma::PrismaGenerator;
pub use sequelize::SequelizeGenerator;
pub use typemap::{classify, TypeCategory};
pub use typeorm::TypeOrmGenerator;

/// One file produced by a generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedFile {
    pub file_name: String,
    pub content: String,
}

impl GeneratedFile {
    pub fn new(file_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }
}

/// Produces model/entity files from a schema.
pub trait SchemaGenerator {
    fn generate(&self, schema: &DatabaseSchema) -> Result<Vec<GeneratedFile>>;
}

/// Produces ordered migration files.
///
/// File names sort lexicographically in execution order.
pub trait MigrationGenerator {
    /// Schema migrations, with seed files interleaved for tables present in `data`.
    fn generate_migrations(
        &self,
        schema: &DatabaseSchema,
        data: Option<&[TableData]>,
    ) -> Result<Vec<GeneratedFile>>;

    /// Seed migrations only, timestamped after any schema migration from the same clock.
    fn generate_data_migrations(&self, data: &[TableData]) -> Result<Vec<GeneratedFile>>;
}

/// Source of the migration timestamp base.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(at) => *at,
        }
    }
}

/// Options shared by every profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeneratorOptions {
    pub clock: Clock,
    /// Dialect the schema was read from; selects the Prisma datasource provider.
    pub source: Option<DatabaseKind>,
}

/// Profile names accepted by [`GeneratorImpl::from_target`].
pub const TARGETS: &[&str] = &["sequelize", "typeorm", "prisma", "mongoose"];

/// A generator profile selected by name.
#[derive(Debug, Clone)]
pub enum GeneratorImpl {
    Sequelize(SequelizeGenerator),
    TypeOrm(TypeOrmGenerator),
    Prisma(PrismaGenerator),
    Mongoose(MongooseGenerator),
}

impl GeneratorImpl {
    /// Select a profile: `sequelize`, `typeorm`, `prisma`, `mongoose` (or `mongodb`).
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::UnsupportedTarget`] for any other name.
    pub fn from_target(target: &str, options: GeneratorOptions) -> Result<Self> {
        match target.trim().to_lowercase().as_str() {
            "sequelize" => Ok(GeneratorImpl::Sequelize(SequelizeGenerator::new(options.clock))),
            "typeorm" => Ok(GeneratorImpl::TypeOrm(TypeOrmGenerator::new(options.clock))),
            "prisma" => Ok(GeneratorImpl::Prisma(PrismaGenerator::new(options.source))),
            "mongoose" | "mongodb" => Ok(GeneratorImpl::Mongoose(MongooseGenerator)),
            _ => Err(MigrateError::UnsupportedTarget(target.to_string())),
        }
    }

    /// Canonical profile name.
    pub fn name(&self) -> &'static str {
        match self {
            GeneratorImpl::Sequelize(_) => "sequelize",
            GeneratorImpl::TypeOrm(_) => "typeorm",
            GeneratorImpl::Prisma(_) => "prisma",
            GeneratorImpl::Mongoose(_) => "mongoose",
        }
    }

    pub fn supports_migrations(&self) -> bool {
        self.migrations().is_some()
    }

    pub fn generate(&self, schema: &DatabaseSchema) -> Result<Vec<GeneratedFile>> {
        match self {
            GeneratorImpl::Sequelize(g) => g.generate(schema),
            GeneratorImpl::TypeOrm(g) => g.generate(schema),
            GeneratorImpl::Prisma(g) => g.generate(schema),
            GeneratorImpl::Mongoose(g) => g.generate(schema),
        }
    }

    pub fn generate_migrations(
        &self,
        schema: &DatabaseSchema,
        data: Option<&[TableData]>,
    ) -> Result<Vec<GeneratedFile>> {
        self.require_migrations()?.generate_migrations(schema, data)
    }

    pub fn generate_data_migrations(&self, data: &[TableData]) -> Result<Vec<GeneratedFile>> {
        self.require_migrations()?.generate_data_migrations(data)
    }

    fn migrations(&self) -> Option<&dyn MigrationGenerator> {
        match self {
            GeneratorImpl::Sequelize(g) => Some(g),
            GeneratorImpl::TypeOrm(g) => Some(g),
            GeneratorImpl::Prisma(_) | GeneratorImpl::Mongoose(_) => None,
        }
    }

    fn require_migrations(&self) -> Result<&dyn MigrationGenerator> {
        self.migrations()
            .ok_or_else(|| MigrateError::UnsupportedCapability {
                target: self.name().to_string(),
                capability: "migrations".to_string(),
            })
    }
}

/// Class name for a table: `order_items` becomes `OrderItems`.
pub(crate) fn class_name(table: &str) -> String {
    use heck::ToUpperCamelCase;

    let name = table.to_upper_camel_case();
    match name.chars().next() {
        Some(c) if c.is_ascii_digit() => format!("T{}", name),
        Some(_) => name,
        None => "Table".to_string(),
    }
}

/// A JavaScript/TypeScript string literal (JSON escaping).
pub(crate) fn js_str(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// A list of string literals: `["a", "b"]`.
pub(crate) fn js_str_list(values: &[String]) -> String {
    let items: Vec<String> = values.iter().map(|v| js_str(v)).collect();
    format!("[{}]", items.join(", "))
}

/// Indent every line after the first by `spaces`.
pub(crate) fn indent_tail(text: &str, spaces: usize) -> String {
    let pad = " ".repeat(spaces);
    let mut lines = text.lines();
    let mut out = lines.next().unwrap_or_default().to_string();
    for line in lines {
        out.push('\n');
        if !line.is_empty() {
            out.push_str(&pad);
        }
        out.push_str(line);
    }
    out
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Schemas shared by the profile tests.

    use chrono::TimeZone;
    use serde_json::json;

    use super::*;
    use crate::core::schema::{ColumnMetadata, ForeignKeyMetadata, IndexMetadata, TableMetadata};

    pub fn frozen() -> Clock {
        Clock::Fixed(Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap())
    }

    fn id_column() -> ColumnMetadata {
        let mut id = ColumnMetadata::new("id", "int");
        id.is_nullable = false;
        id.is_primary_key = true;
        id.is_auto_increment = true;
        id
    }

    fn required(name: &str, data_type: &str) -> ColumnMetadata {
        let mut c = ColumnMetadata::new(name, data_type);
        c.is_nullable = false;
        c
    }

    fn pk(name: &str) -> IndexMetadata {
        IndexMetadata {
            name: name.to_string(),
            columns: vec!["id".to_string()],
            is_unique: true,
            is_primary: true,
        }
    }

    /// `Users(id, name)` and `Posts(id, title, userId -> Users.id)`.
    pub fn users_posts() -> DatabaseSchema {
        let mut users = TableMetadata::new("Users");
        users.columns = vec![id_column(), required("name", "varchar")];
        users.indexes = vec![pk("pk_users")];

        let mut posts = TableMetadata::new("Posts");
        posts.columns = vec![
            id_column(),
            required("title", "varchar"),
            required("userId", "int"),
        ];
        posts.indexes = vec![pk("pk_posts")];
        posts.foreign_keys = vec![ForeignKeyMetadata {
            name: "fk_posts_users".to_string(),
            table_name: "Posts".to_string(),
            columns: vec!["userId".to_string()],
            referenced_table: "Users".to_string(),
            referenced_columns: vec!["id".to_string()],
            update_rule: None,
            delete_rule: Some("CASCADE".to_string()),
        }];

        // Posts first so ordering has to move Users ahead of it.
        DatabaseSchema::new(vec![posts, users])
    }

    pub fn users_data(schema: &DatabaseSchema, disable_identity: bool) -> TableData {
        let users = schema.find_table("Users").unwrap();
        TableData {
            table_name: "users".to_string(),
            columns: users.columns.clone(),
            rows: vec![json!({"id": 1, "name": "Alice"}).as_object().unwrap().clone()],
            disable_identity,
        }
    }
}
