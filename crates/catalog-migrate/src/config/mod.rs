//! Configuration loading, layering and validation.
//!
//! Connection fields are merged from three layers: command-line overrides,
//! then the YAML file, then the environment. Output directories come from the
//! file, then the environment, then the built-in defaults.

mod types;
mod validation;

pub use types::*;
pub use validation::infer_kind;

use std::path::Path;

use tracing::debug;

use crate::error::{MigrateError, Result};
use crate::extract::TableRequest;

/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "catalog-migrate.yaml";

/// Prefix of the tool-specific environment variables.
const ENV_PREFIX: &str = "CATALOG_MIGRATE_";

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load `path` when given, else the default file if it exists.
    ///
    /// A missing explicit file is an IO error; a missing default file yields
    /// an empty configuration.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::load(DEFAULT_CONFIG_PATH),
            None => {
                debug!("No {} found, using defaults", DEFAULT_CONFIG_PATH);
                Ok(Self::default())
            }
        }
    }

    /// Parse configuration from a YAML (or JSON) string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Connection fields from the file: the named profile, or `connection`.
    pub fn connection_profile(&self, name: Option<&str>) -> Result<ConnectionConfig> {
        match name {
            Some(name) => self.connections.get(name).cloned().ok_or_else(|| {
                let known: Vec<&str> = self.connections.keys().map(String::as_str).collect();
                MigrateError::Config(format!(
                    "Unknown connection '{}'. Configured connections: {}",
                    name,
                    if known.is_empty() {
                        "(none)".to_string()
                    } else {
                        known.join(", ")
                    }
                ))
            }),
            None => Ok(self.connection.clone()),
        }
    }

    /// Merge overrides, file and environment, then validate.
    pub fn resolve_connection<F>(
        &self,
        name: Option<&str>,
        overrides: ConnectionConfig,
        lookup: F,
    ) -> Result<ConnectionSettings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let merged = overrides
            .or(self.connection_profile(name)?)
            .or(connection_from_env(&lookup));
        validation::resolve(merged)
    }

    pub fn introspection_output_dir<F>(&self, lookup: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        self.introspection
            .output_dir
            .clone()
            .or_else(|| lookup("CATALOG_MIGRATE_INTROSPECTION_OUTPUT_DIR"))
            .unwrap_or_else(|| DEFAULT_INTROSPECTION_DIR.to_string())
    }

    pub fn migrations_output_dir<F>(&self, lookup: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        self.migrations
            .output_dir
            .clone()
            .or_else(|| lookup("CATALOG_MIGRATE_MIGRATIONS_OUTPUT_DIR"))
            .unwrap_or_else(|| DEFAULT_MIGRATIONS_DIR.to_string())
    }

    /// Data requests for `names`, taking filters and identity flags from
    /// `data.tables` entries of the same name. Without names, every configured
    /// table is requested.
    pub fn table_requests(&self, names: &[String]) -> Vec<TableRequest> {
        if names.is_empty() {
            return self.data.tables.clone();
        }
        names
            .iter()
            .map(|name| {
                self.data
                    .tables
                    .iter()
                    .find(|t| t.name.eq_ignore_ascii_case(name))
                    .cloned()
                    .unwrap_or_else(|| TableRequest::new(name.clone()))
            })
            .collect()
    }
}

/// Process environment lookup; empty values count as unset.
pub fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// First variable that is set among `CATALOG_MIGRATE_{key}` and `aliases`.
fn first_env<F>(lookup: &F, key: &str, aliases: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(&format!("{}{}", ENV_PREFIX, key)).or_else(|| aliases.iter().find_map(|&a| lookup(a)))
}

fn connection_from_env<F>(lookup: &F) -> ConnectionConfig
where
    F: Fn(&str) -> Option<String>,
{
    ConnectionConfig {
        r#type: first_env(lookup, "DB_TYPE", &["DB_TYPE"]),
        host: first_env(lookup, "DB_HOST", &["DB_HOST"]),
        port: first_env(lookup, "DB_PORT", &["DB_PORT"]).and_then(|p| p.parse().ok()),
        user: first_env(lookup, "DB_USER", &["DB_USER", "DB_USERNAME"]),
        password: first_env(lookup, "DB_PASSWORD", &["DB_PASSWORD"]),
        database: first_env(lookup, "DB_NAME", &["DB_NAME", "DB_DATABASE"]),
        connection_string: first_env(lookup, "DB_CONNECTION_STRING", &["DB_CONNECTION_STRING"]),
        ..Default::default()
    }
}

/// Write the commented default configuration to `path`.
pub fn write_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(MigrateError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, INIT_TEMPLATE)?;
    Ok(())
}
