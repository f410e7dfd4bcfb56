//! Mock database clients for testing.
//!
//! Provides in-memory implementations for exercising the session and the
//! renderer without a database file.

use super::{
    catalog_columns, function_columns, require_table_name, schema_columns, CellValue,
    ColumnDescriptor, ColumnType, DatabaseClient, QueryOutcome, QueryResult, RowStream,
};
use crate::error::{Result, SqlCliError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
enum Canned {
    Rows(QueryResult),
    Streamed(QueryResult),
    Affected(u64),
}

impl Canned {
    fn replay(&self) -> QueryOutcome {
        match self {
            Self::Rows(result) => QueryOutcome::Rows(result.clone()),
            Self::Streamed(result) => QueryOutcome::Streaming(stream_of(result.clone())),
            Self::Affected(rows) => QueryOutcome::Affected(*rows),
        }
    }
}

/// Preloads a channel with every row, so the stream ends once they are read.
fn stream_of(result: QueryResult) -> RowStream {
    let (sender, receiver) = mpsc::channel(result.rows.len().max(1));
    for row in result.rows {
        // Capacity covers every row.
        let _ = sender.try_send(Ok(row));
    }
    RowStream::new(result.columns, receiver)
}

/// A mock database client that returns predefined results.
///
/// Statements registered with [`MockDatabaseClient::with_result`] return
/// their canned outcome. Any other `SELECT` returns a single `result` column
/// echoing the statement; everything else affects zero rows.
#[derive(Debug, Default, Clone)]
pub struct MockDatabaseClient {
    results: HashMap<String, Canned>,
    tables: Vec<(String, Vec<ColumnDescriptor>)>,
    executed: Arc<Mutex<Vec<String>>>,
}

impl MockDatabaseClient {
    /// Creates a mock client with no canned results.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an in-memory result for a statement, matched on its
    /// trimmed text.
    pub fn with_result(mut self, sql: &str, result: QueryResult) -> Self {
        self.results
            .insert(sql.trim().to_string(), Canned::Rows(result));
        self
    }

    /// Registers a result that is delivered as a [`RowStream`].
    pub fn with_streamed_result(mut self, sql: &str, result: QueryResult) -> Self {
        self.results
            .insert(sql.trim().to_string(), Canned::Streamed(result));
        self
    }

    /// Registers an affected-row count for a statement.
    pub fn with_affected(mut self, sql: &str, rows: u64) -> Self {
        self.results
            .insert(sql.trim().to_string(), Canned::Affected(rows));
        self
    }

    /// Registers a table for the catalog listings.
    pub fn with_table(mut self, name: &str, columns: Vec<ColumnDescriptor>) -> Self {
        self.tables.push((name.to_string(), columns));
        self
    }

    /// Returns a handle to the statements executed so far, in order.
    pub fn executed(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.executed)
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn execute(&self, sql: &str) -> Result<QueryOutcome> {
        let key = sql.trim();
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(key.to_string());
        }

        if let Some(canned) = self.results.get(key) {
            return Ok(canned.replay());
        }

        if key.to_uppercase().starts_with("SELECT") {
            let columns = vec![ColumnDescriptor::new("result", ColumnType::Text)];
            let rows = vec![vec![CellValue::Text(format!("Mock result for: {key}"))]];
            Ok(QueryOutcome::Rows(
                QueryResult::with_data(columns, rows).with_execution_time(Duration::from_millis(1)),
            ))
        } else {
            Ok(QueryOutcome::Affected(0))
        }
    }

    async fn list_tables(&self) -> Result<QueryResult> {
        let mut names: Vec<&str> = self.tables.iter().map(|(name, _)| name.as_str()).collect();
        names.sort_unstable();
        Ok(QueryResult::with_data(
            vec![
                ColumnDescriptor::new("TABLE_NAME", ColumnType::Text),
                ColumnDescriptor::new("TABLE_TYPE", ColumnType::Text),
            ],
            names
                .into_iter()
                .map(|name| vec![CellValue::from(name), CellValue::from("TABLE")])
                .collect(),
        ))
    }

    async fn list_columns(&self, table: &str) -> Result<QueryResult> {
        let table = require_table_name(table)?;
        let (_, columns) = self
            .tables
            .iter()
            .find(|(name, _)| name == table)
            .ok_or_else(|| SqlCliError::query(format!("No such table: {table}")))?;

        Ok(QueryResult::with_data(
            vec![
                ColumnDescriptor::new("TABLE_NAME", ColumnType::Text),
                ColumnDescriptor::new("COLUMN_NAME", ColumnType::Text),
            ],
            columns
                .iter()
                .map(|col| vec![CellValue::from(table), CellValue::from(col.name.as_str())])
                .collect(),
        ))
    }

    async fn list_catalogs(&self) -> Result<QueryResult> {
        Ok(QueryResult::with_data(
            catalog_columns(),
            vec![vec![CellValue::from("main")]],
        ))
    }

    async fn list_schemas(&self) -> Result<QueryResult> {
        Ok(QueryResult::with_data(
            schema_columns(),
            vec![vec![CellValue::from("main"), CellValue::Null]],
        ))
    }

    async fn list_functions(&self) -> Result<QueryResult> {
        Ok(QueryResult::with_data(
            function_columns(),
            vec![
                vec![CellValue::from("abs"), CellValue::from("SCALAR")],
                vec![CellValue::from("count"), CellValue::from("AGGREGATE")],
            ],
        ))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A mock client whose statements always fail with a query error.
#[derive(Debug, Clone)]
pub struct FailingDatabaseClient {
    message: String,
}

impl FailingDatabaseClient {
    /// Creates a client that fails every statement with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl DatabaseClient for FailingDatabaseClient {
    async fn execute(&self, _sql: &str) -> Result<QueryOutcome> {
        Err(SqlCliError::query(self.message.clone()))
    }

    async fn list_tables(&self) -> Result<QueryResult> {
        Err(SqlCliError::query(self.message.clone()))
    }

    async fn list_columns(&self, _table: &str) -> Result<QueryResult> {
        Err(SqlCliError::query(self.message.clone()))
    }

    async fn list_catalogs(&self) -> Result<QueryResult> {
        Err(SqlCliError::query(self.message.clone()))
    }

    async fn list_schemas(&self) -> Result<QueryResult> {
        Err(SqlCliError::query(self.message.clone()))
    }

    async fn list_functions(&self) -> Result<QueryResult> {
        Err(SqlCliError::query(self.message.clone()))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
