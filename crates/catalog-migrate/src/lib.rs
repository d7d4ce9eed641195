//! # catalog-migrate
//!
//! Database catalog introspection and ORM migration generation.
//!
//! This library reads the catalog of a SQL Server, PostgreSQL or MySQL
//! database into a dialect-neutral schema model and turns it into files for
//! downstream ORM profiles:
//!
//! - **Introspection** through metadata-only queries behind a SQL safety gate
//! - **Dependency ordering** of tables by foreign key, tolerant of cycles
//! - **Seed extraction** of row data for selected tables
//! - **Generation** of Sequelize and TypeORM migrations, and of Sequelize,
//!   TypeORM, Prisma and Mongoose models
//!
//! ## Example
//!
//! ```rust,no_run
//! use catalog_migrate::{
//!     connector_for, env_lookup, Config, ConnectionConfig, GeneratorImpl, GeneratorOptions,
//!     IntrospectionService,
//! };
//!
//! #[tokio::main]
//! async fn main() -> catalog_migrate::Result<()> {
//!     let config = Config::load("catalog-migrate.yaml")?;
//!     let settings = config.resolve_connection(None, ConnectionConfig::default(), env_lookup)?;
//!
//!     let mut conn = connector_for(&settings)?;
//!     conn.connect().await?;
//!     let schema = IntrospectionService::new(conn.as_ref()).introspect().await;
//!     conn.disconnect().await?;
//!
//!     let generator = GeneratorImpl::from_target("sequelize", GeneratorOptions::default())?;
//!     for file in generator.generate_migrations(&schema?, None)? {
//!         println!("{}", file.file_name);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod extract;
pub mod generate;
pub mod introspect;
pub mod ordering;
pub mod report;
pub mod safety;

#[cfg(test)]
mod testing;

// Re-exports for convenient access
pub use config::{env_lookup, Config, ConnectionConfig, ConnectionSettings, SslMode};
pub use crate::core::{
    CharLength, ColumnMetadata, Connector, DatabaseKind, DatabaseSchema, ForeignKeyMetadata,
    IndexMetadata, QueryOptions, Row, TableData, TableMetadata,
};
pub use drivers::connector_for;
pub use error::{MigrateError, Result};
pub use extract::{filter_auto_increment_columns, DataExtractor, TableRequest};
pub use generate::{Clock, GeneratedFile, GeneratorImpl, GeneratorOptions, TARGETS};
pub use introspect::{introspector_for, IntrospectionService, Introspector};
pub use ordering::order;
pub use report::{DatabaseInfo, IntrospectionMetadata};
pub use safety::assert_safe_sql;
