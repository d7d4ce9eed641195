//! Core abstractions shared by introspection, extraction and generation.
//!
//! - [`schema`]: dialect-neutral table, column and constraint metadata
//! - [`value`]: typed driver values and their JSON rendering
//! - [`traits`]: the [`Connector`] seam every driver implements
//! - [`identifier`]: identifier quoting and filter validation for dynamic SQL
//!
//! Drivers (`drivers/mssql`, `drivers/postgres`, `drivers/mysql`) implement
//! [`Connector`]; everything above the drivers only talks to that trait, so the
//! introspectors and extractor are tested against a scripted connector.

pub mod identifier;
pub mod schema;
pub mod traits;
pub mod value;

pub use schema::{
    CharLength, ColumnMetadata, DatabaseKind, DatabaseSchema, ForeignKeyMetadata, IndexMetadata,
    Row, TableData, TableMetadata,
};
pub use traits::{query_as, Connector, QueryOptions};
pub use value::SqlValue;
