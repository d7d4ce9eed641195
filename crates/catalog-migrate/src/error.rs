//! Error types for the catalog-migrate library.

use thiserror::Error;

/// Main error type for introspection and generation operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The connector could not connect, or was queried without a live connection.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// SQL rejected by the safety gate because it contains a mutating keyword.
    #[error("Unsafe SQL rejected: statement contains forbidden keyword '{0}'")]
    UnsafeOperation(String),

    /// SQL rejected by the safety gate because it reads user data without a bypass.
    #[error("Unsafe SQL rejected: data SELECT outside of catalog views: {0}")]
    UnsafeDataSelect(String),

    /// No introspector is registered for the requested dialect.
    #[error("Unsupported database type '{0}'. Valid values: mssql, postgres, mysql")]
    IntrospectionDialectUnsupported(String),

    /// Unknown generator target.
    #[error("Unknown target '{0}'. Valid values: sequelize, typeorm, prisma, mongoose")]
    UnsupportedTarget(String),

    /// The generator target exists but cannot produce the requested artifacts.
    #[error("Target {target} does not support {capability}")]
    UnsupportedCapability { target: String, capability: String },

    /// Catalog metadata could not be turned into a schema model.
    #[error("Schema extraction failed: {0}")]
    SchemaExtraction(String),

    /// A statement failed with context about where it was issued.
    #[error("Query failed ({context}): {message}")]
    Query { context: String, message: String },

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// SQL Server driver error
    #[cfg(feature = "mssql")]
    #[error("SQL Server error: {0}")]
    Mssql(#[from] tiberius::error::Error),

    /// PostgreSQL driver error
    #[cfg(feature = "postgres")]
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// MySQL driver error
    #[cfg(feature = "mysql")]
    #[error("MySQL error: {0}")]
    Mysql(#[from] sqlx::Error),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrateError {
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl ToString, context: impl Into<String>) -> Self {
        MigrateError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a Query error
    pub fn query(context: impl Into<String>, message: impl ToString) -> Self {
        MigrateError::Query {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Process exit code for this error class.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_)
            | MigrateError::IntrospectionDialectUnsupported(_)
            | MigrateError::UnsupportedTarget(_)
            | MigrateError::UnsupportedCapability { .. }
            | MigrateError::Yaml(_) => 1,
            MigrateError::ConnectionFailed(_) | MigrateError::Pool { .. } => 2,
            MigrateError::UnsafeOperation(_) | MigrateError::UnsafeDataSelect(_) => 3,
            MigrateError::SchemaExtraction(_) => 4,
            MigrateError::Query { .. } => 5,
            #[cfg(feature = "mssql")]
            MigrateError::Mssql(_) => 5,
            #[cfg(feature = "postgres")]
            MigrateError::Postgres(_) => 5,
            #[cfg(feature = "mysql")]
            MigrateError::Mysql(_) => 5,
            MigrateError::Json(_) => 6,
            MigrateError::Io(_) => 7,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for catalog-migrate operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_by_class() {
        assert_eq!(MigrateError::Config("x".into()).exit_code(), 1);
        assert_eq!(MigrateError::ConnectionFailed("x".into()).exit_code(), 2);
        assert_eq!(MigrateError::UnsafeDataSelect("x".into()).exit_code(), 3);
        assert_eq!(MigrateError::query("ctx", "boom").exit_code(), 5);
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert_eq!(MigrateError::from(io).exit_code(), 7);
    }

    #[test]
    fn test_format_detailed_includes_message() {
        let err = MigrateError::pool("timed out", "creating MySQL pool");
        let text = err.format_detailed();
        assert!(text.starts_with("Error: Pool error: timed out"));
        assert!(text.contains("creating MySQL pool"));
    }
}
