//! Scripted connector used by unit tests in place of a live database.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::schema::{DatabaseKind, Row};
use crate::core::traits::Connector;
use crate::error::{MigrateError, Result};

/// Answers queries by case-insensitive substring match on the SQL text.
///
/// The first registered needle contained in the statement wins. Statements
/// matching no needle return no rows. Every executed statement is recorded.
pub(crate) struct ScriptedConnector {
    kind: DatabaseKind,
    connected: AtomicBool,
    responses: Vec<(String, Vec<Row>)>,
    failures: Vec<String>,
    executed: Mutex<Vec<String>>,
}

impl ScriptedConnector {
    pub(crate) fn new(kind: DatabaseKind) -> Self {
        Self {
            kind,
            connected: AtomicBool::new(false),
            responses: Vec::new(),
            failures: Vec::new(),
            executed: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn connected(kind: DatabaseKind) -> Self {
        let conn = Self::new(kind);
        conn.connected.store(true, Ordering::SeqCst);
        conn
    }

    /// Register rows (JSON objects) for statements containing `needle`.
    pub(crate) fn respond(mut self, needle: &str, rows: Vec<Value>) -> Self {
        let rows = rows
            .into_iter()
            .map(|v| match v {
                Value::Object(map) => map,
                other => panic!("scripted row must be an object, got {other}"),
            })
            .collect();
        self.responses.push((needle.to_lowercase(), rows));
        self
    }

    /// Make statements containing `needle` fail.
    pub(crate) fn fail_on(mut self, needle: &str) -> Self {
        self.failures.push(needle.to_lowercase());
        self
    }

    pub(crate) fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    fn kind(&self) -> DatabaseKind {
        self.kind
    }

    async fn connect(&mut self) -> Result<()> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn run_query(&self, sql: &str, _params: &[Value]) -> Result<Vec<Row>> {
        self.executed.lock().unwrap().push(sql.to_string());
        let lower = sql.to_lowercase();

        if let Some(needle) = self.failures.iter().find(|n| lower.contains(n.as_str())) {
            return Err(MigrateError::query("scripted", format!("failure on '{}'", needle)));
        }

        Ok(self
            .responses
            .iter()
            .find(|(needle, _)| lower.contains(needle.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }

    async fn version(&self) -> Result<String> {
        Ok(format!("{} scripted", self.kind))
    }

    async fn database_name(&self) -> Result<String> {
        Ok("scripted".to_string())
    }
}
