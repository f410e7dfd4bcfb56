//! SQLite database client implementation.
//!
//! Provides the `SqliteClient` struct that implements the `DatabaseClient`
//! trait for SQLite databases using sqlx.

use crate::config::ConnectionConfig;
use crate::db::{
    catalog_columns, function_columns, require_table_name, schema_columns, CellValue,
    ColumnDescriptor, ColumnType, DatabaseClient, QueryOutcome, QueryResult, Row, RowStream,
};
use crate::error::{Result, SqlCliError};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use futures::TryStreamExt;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{
    Column as _, ConnectOptions, Connection, Executor, Row as _, Statement as _, TypeInfo,
    ValueRef,
};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex, OwnedMutexGuard};
use tracing::{debug, trace};

/// Seconds to wait for a locked database before giving up.
const BUSY_TIMEOUT_SECS: u64 = 5;

/// Rows read ahead of the consumer before the reader waits.
const ROW_BUFFER: usize = 32;

/// SQLite database client.
///
/// Owns one connection for its whole lifetime, so in-memory databases
/// survive between statements. A streaming result holds the connection until
/// its last row has been read or the stream is dropped.
#[derive(Debug)]
pub struct SqliteClient {
    conn: Arc<Mutex<Option<SqliteConnection>>>,
}

impl SqliteClient {
    /// Opens the database named by the connection URL.
    ///
    /// The database file must already exist unless the URL says otherwise
    /// (`?mode=rwc`) or names `sqlite::memory:`.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let conn = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| map_connection_error(e, config))?
            .busy_timeout(Duration::from_secs(BUSY_TIMEOUT_SECS))
            .connect()
            .await
            .map_err(|e| map_connection_error(e, config))?;

        debug!(url = %config.display_string(), "connected");
        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
        })
    }

    async fn query_names(&self, sql: &str, what: &str) -> Result<Vec<Vec<String>>> {
        let mut guard = self.conn.lock().await;
        let Some(conn) = guard.as_mut() else {
            return Err(SqlCliError::connection("Connection is closed"));
        };
        let rows: Vec<SqliteRow> = sqlx::query(sql)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| SqlCliError::query(format!("Failed to fetch {what}: {e}")))?;

        rows.iter()
            .map(|row| {
                (0..row.len())
                    .map(|index| {
                        row.try_get::<String, _>(index)
                            .map_err(|e| SqlCliError::query(format_query_error(e)))
                    })
                    .collect()
            })
            .collect()
    }
}

/// Reads rows off the connection and hands them to the consumer one at a
/// time. Stops at the first error or when the consumer goes away.
async fn stream_rows(
    mut guard: OwnedMutexGuard<Option<SqliteConnection>>,
    sql: String,
    columns: Vec<ColumnDescriptor>,
    sender: mpsc::Sender<Result<Row>>,
    start: Instant,
) {
    let Some(conn) = guard.as_mut() else {
        return;
    };
    let mut stream = sqlx::query(&sql).fetch(conn);

    let mut count = 0usize;
    loop {
        let row = match stream.try_next().await {
            Ok(Some(row)) => convert_row(&row, &columns),
            Ok(None) => break,
            Err(e) => Err(SqlCliError::query(format_query_error(e))),
        };
        let failed = row.is_err();
        if sender.send(row).await.is_err() {
            debug!(rows = count, "row consumer dropped the result");
            return;
        }
        if failed {
            return;
        }
        count += 1;
    }
    debug!(rows = count, elapsed = ?start.elapsed(), "query streamed");
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    async fn execute(&self, sql: &str) -> Result<QueryOutcome> {
        let start = Instant::now();
        let mut guard = Arc::clone(&self.conn).lock_owned().await;
        let Some(conn) = guard.as_mut() else {
            return Err(SqlCliError::connection("Connection is closed"));
        };

        let statement = (&mut *conn)
            .prepare(sql)
            .await
            .map_err(|e| SqlCliError::query(format_query_error(e)))?;

        let columns: Vec<ColumnDescriptor> = statement
            .columns()
            .iter()
            .map(|col| {
                ColumnDescriptor::new(
                    col.name(),
                    ColumnType::from_declared(col.type_info().name()),
                )
            })
            .collect();

        if columns.is_empty() {
            let done = sqlx::query(sql)
                .execute(&mut *conn)
                .await
                .map_err(|e| SqlCliError::query(format_query_error(e)))?;
            debug!(affected = done.rows_affected(), "statement executed");
            return Ok(QueryOutcome::Affected(done.rows_affected()));
        }

        let (sender, receiver) = mpsc::channel(ROW_BUFFER);
        tokio::spawn(stream_rows(
            guard,
            sql.to_string(),
            columns.clone(),
            sender,
            start,
        ));
        Ok(QueryOutcome::Streaming(RowStream::new(columns, receiver)))
    }

    async fn list_tables(&self) -> Result<QueryResult> {
        let mut guard = self.conn.lock().await;
        let Some(conn) = guard.as_mut() else {
            return Err(SqlCliError::connection("Connection is closed"));
        };
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT name, upper(type)
            FROM sqlite_master
            WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%'
            ORDER BY name
            "#,
        )
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| SqlCliError::query(format!("Failed to fetch tables: {e}")))?;

        Ok(QueryResult::with_data(
            vec![
                ColumnDescriptor::new("TABLE_NAME", ColumnType::Text),
                ColumnDescriptor::new("TABLE_TYPE", ColumnType::Text),
            ],
            rows.into_iter()
                .map(|(name, kind)| vec![CellValue::Text(name), CellValue::Text(kind)])
                .collect(),
        ))
    }

    async fn list_columns(&self, table: &str) -> Result<QueryResult> {
        let table = require_table_name(table)?;
        let mut guard = self.conn.lock().await;
        let Some(conn) = guard.as_mut() else {
            return Err(SqlCliError::connection("Connection is closed"));
        };

        let rows: Vec<(i64, String, String, bool, Option<String>)> = sqlx::query_as(
            r#"
            SELECT cid, name, type, "notnull", dflt_value
            FROM pragma_table_info(?1)
            ORDER BY cid
            "#,
        )
        .bind(table)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| SqlCliError::query(format!("Failed to fetch columns for {table}: {e}")))?;

        if rows.is_empty() {
            return Err(SqlCliError::query(format!("No such table: {table}")));
        }

        Ok(QueryResult::with_data(
            vec![
                ColumnDescriptor::new("TABLE_NAME", ColumnType::Text),
                ColumnDescriptor::new("COLUMN_NAME", ColumnType::Text),
                ColumnDescriptor::new("TYPE_NAME", ColumnType::Text),
                ColumnDescriptor::new("IS_NULLABLE", ColumnType::Text),
                ColumnDescriptor::new("COLUMN_DEF", ColumnType::Text),
                ColumnDescriptor::new("ORDINAL_POSITION", ColumnType::Integer),
            ],
            rows.into_iter()
                .map(|(cid, name, declared, not_null, default)| {
                    vec![
                        CellValue::from(table),
                        CellValue::Text(name),
                        CellValue::Text(declared),
                        CellValue::from(if not_null { "NO" } else { "YES" }),
                        CellValue::from(default),
                        CellValue::Integer(cid + 1),
                    ]
                })
                .collect(),
        ))
    }

    async fn list_catalogs(&self) -> Result<QueryResult> {
        let names = self
            .query_names("SELECT name FROM pragma_database_list ORDER BY seq", "catalogs")
            .await?;
        Ok(QueryResult::with_data(
            catalog_columns(),
            names
                .into_iter()
                .map(|row| row.into_iter().map(CellValue::Text).collect())
                .collect(),
        ))
    }

    async fn list_schemas(&self) -> Result<QueryResult> {
        let names = self
            .query_names("SELECT name FROM pragma_database_list ORDER BY seq", "schemas")
            .await?;
        Ok(QueryResult::with_data(
            schema_columns(),
            names
                .into_iter()
                .flatten()
                .map(|name| vec![CellValue::Text(name), CellValue::Null])
                .collect(),
        ))
    }

    async fn list_functions(&self) -> Result<QueryResult> {
        let rows = self
            .query_names(
                r#"
                SELECT DISTINCT name,
                       CASE type WHEN 'a' THEN 'AGGREGATE'
                                 WHEN 'w' THEN 'WINDOW'
                                 ELSE 'SCALAR' END
                FROM pragma_function_list
                ORDER BY 1, 2
                "#,
                "functions",
            )
            .await?;
        Ok(QueryResult::with_data(
            function_columns(),
            rows.into_iter()
                .map(|row| row.into_iter().map(CellValue::Text).collect())
                .collect(),
        ))
    }

    async fn close(&self) -> Result<()> {
        if let Some(conn) = self.conn.lock().await.take() {
            conn.close()
                .await
                .map_err(|e| SqlCliError::connection(e.to_string()))?;
            debug!("connection closed");
        }
        Ok(())
    }
}

/// Converts a sqlx SqliteRow to our Row type.
fn convert_row(row: &SqliteRow, columns: &[ColumnDescriptor]) -> Result<Row> {
    columns
        .iter()
        .enumerate()
        .map(|(index, col)| convert_value(row, index, col.column_type))
        .collect()
}

/// Decodes one cell using the value's storage class, refined by the
/// declared column type.
fn convert_value(row: &SqliteRow, index: usize, declared: ColumnType) -> Result<CellValue> {
    let raw = row
        .try_get_raw(index)
        .map_err(|e| SqlCliError::query(format_query_error(e)))?;
    if raw.is_null() {
        return Ok(CellValue::Null);
    }
    let storage = raw.type_info().name().to_uppercase();

    let value = match (declared, storage.as_str()) {
        (ColumnType::Boolean, "INTEGER" | "BOOLEAN") => {
            row.try_get::<bool, _>(index).map(CellValue::Boolean).ok()
        }
        (ColumnType::Timestamp, _) => decode_timestamp(row, index),
        (_, "INTEGER") => row.try_get::<i64, _>(index).map(CellValue::Integer).ok(),
        (_, "REAL") => row.try_get::<f64, _>(index).map(CellValue::Float).ok(),
        (_, "BLOB") => row
            .try_get::<Vec<u8>, _>(index)
            .map(CellValue::LargeBinary)
            .ok(),
        (ColumnType::LargeText, _) => row.try_get::<String, _>(index).map(CellValue::LargeText).ok(),
        _ => None,
    };

    match value {
        Some(value) => Ok(value),
        None => {
            trace!(index, %storage, ?declared, "falling back to text decoding");
            row.try_get_unchecked::<String, _>(index)
                .map(CellValue::Text)
                .map_err(|e| SqlCliError::query(format_query_error(e)))
        }
    }
}

/// Date-only text is widened to midnight. Anything unparseable falls back
/// to text.
fn decode_timestamp(row: &SqliteRow, index: usize) -> Option<CellValue> {
    if let Ok(ts) = row.try_get::<NaiveDateTime, _>(index) {
        return Some(CellValue::Timestamp(ts));
    }
    row.try_get::<NaiveDate, _>(index)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(CellValue::Timestamp)
}

/// Maps sqlx connection errors to user-friendly messages.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> SqlCliError {
    let target = config.display_string();
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("unable to open") {
        SqlCliError::connection(format!(
            "Cannot open {target}. Check that the file exists and is readable."
        ))
    } else if error_str.contains("not a database") {
        SqlCliError::connection(format!("{target} is not a SQLite database."))
    } else {
        SqlCliError::connection(format!("{target}: {error}"))
    }
}

/// Extracts the database message from a query error.
fn format_query_error(error: sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => db_error.message().to_string(),
        None => error.to_string(),
    }
}
