//! Data source layer for sqlcli.
//!
//! Provides a trait-based interface for running statements, allowing
//! different backends (and a mock for tests) to be used interchangeably.

mod mock;
mod sqlite;
mod types;

pub use mock::{FailingDatabaseClient, MockDatabaseClient};
pub use sqlite::SqliteClient;
pub use types::{
    format_timestamp, BufferedRows, CellValue, ColumnDescriptor, ColumnType, QueryOutcome,
    QueryResult, Row, RowStream, TabularResult,
};

use crate::config::ConnectionConfig;
use crate::error::{Result, SqlCliError};
use async_trait::async_trait;

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    Sqlite,
}

impl DatabaseBackend {
    /// Returns the backend name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
        }
    }

    /// Resolves a backend from a URL scheme.
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme.to_lowercase().as_str() {
            "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

/// Opens a client for the backend named by the connection URL.
pub async fn connect(config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>> {
    let backend = config.backend()?;
    match backend {
        DatabaseBackend::Sqlite => {
            let client = SqliteClient::connect(config).await?;
            Ok(Box::new(client))
        }
    }
}

/// Interface for data source clients.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Executes one statement.
    ///
    /// Statements that produce a result set yield [`QueryOutcome::Rows`] or
    /// [`QueryOutcome::Streaming`], with column metadata present even when no
    /// rows match. Everything else yields the affected row count.
    async fn execute(&self, sql: &str) -> Result<QueryOutcome>;

    /// Lists the user tables, sorted by name.
    async fn list_tables(&self) -> Result<QueryResult>;

    /// Lists the columns of `table` in declaration order.
    async fn list_columns(&self, table: &str) -> Result<QueryResult>;

    /// Lists the catalogs (attached databases).
    async fn list_catalogs(&self) -> Result<QueryResult>;

    /// Lists the schemas.
    async fn list_schemas(&self) -> Result<QueryResult>;

    /// Lists the SQL functions known to the connection.
    async fn list_functions(&self) -> Result<QueryResult>;

    /// Lists stored procedures. Backends without them return an empty
    /// listing.
    async fn list_procedures(&self) -> Result<QueryResult> {
        Ok(QueryResult::with_data(procedure_columns(), Vec::new()))
    }

    /// Closes the connection.
    async fn close(&self) -> Result<()>;
}

/// Column headers of the catalog listing.
pub(crate) fn catalog_columns() -> Vec<ColumnDescriptor> {
    vec![ColumnDescriptor::new("TABLE_CAT", ColumnType::Text)]
}

/// Column headers of the schema listing.
pub(crate) fn schema_columns() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::new("TABLE_SCHEM", ColumnType::Text),
        ColumnDescriptor::new("TABLE_CATALOG", ColumnType::Text),
    ]
}

/// Column headers of the function listing.
pub(crate) fn function_columns() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::new("FUNCTION_NAME", ColumnType::Text),
        ColumnDescriptor::new("FUNCTION_TYPE", ColumnType::Text),
    ]
}

/// Column headers of the procedure listing.
pub(crate) fn procedure_columns() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::new("PROCEDURE_CAT", ColumnType::Text),
        ColumnDescriptor::new("PROCEDURE_SCHEM", ColumnType::Text),
        ColumnDescriptor::new("PROCEDURE_NAME", ColumnType::Text),
        ColumnDescriptor::new("REMARKS", ColumnType::Text),
        ColumnDescriptor::new("PROCEDURE_TYPE", ColumnType::Integer),
    ]
}

/// Rejects an empty table argument before it reaches a backend.
pub(crate) fn require_table_name(table: &str) -> Result<&str> {
    let table = table.trim();
    if table.is_empty() {
        return Err(SqlCliError::query("A table name is required"));
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_scheme() {
        assert_eq!(
            DatabaseBackend::from_scheme("sqlite"),
            Some(DatabaseBackend::Sqlite)
        );
        assert_eq!(
            DatabaseBackend::from_scheme("SQLITE"),
            Some(DatabaseBackend::Sqlite)
        );
        assert_eq!(DatabaseBackend::from_scheme("postgres"), None);
        assert_eq!(DatabaseBackend::Sqlite.as_str(), "sqlite");
    }

    #[test]
    fn test_require_table_name() {
        assert_eq!(require_table_name("  people ").unwrap(), "people");
        assert!(require_table_name("   ").is_err());
    }
}
