//! Result types for sqlcli.
//!
//! Defines the column, cell and row structures shared by the data source
//! clients and the renderer.

use crate::error::{Result, SqlCliError};
use chrono::{NaiveDateTime, Timelike};
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;

/// Declared type of a result column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// Character data; any column may also hold NULL.
    #[default]
    Text,
    Integer,
    Float,
    Boolean,
    Timestamp,
    /// Character large object.
    LargeText,
    /// Binary large object.
    LargeBinary,
    /// Short binary column (VARBINARY and friends).
    RawBinary,
}

impl ColumnType {
    /// Maps a declared SQL type name onto a column type.
    ///
    /// Follows SQLite's affinity rules where they apply: any name containing
    /// `INT` is an integer, names containing `CHAR`, `TEXT` or `CLOB` are
    /// text, and so on. Unknown names fall back to [`ColumnType::Text`].
    pub fn from_declared(type_name: &str) -> Self {
        let name = type_name.to_uppercase();

        if name.contains("INT") {
            Self::Integer
        } else if name.contains("BOOL") {
            Self::Boolean
        } else if name.contains("CLOB") {
            Self::LargeText
        } else if name.contains("CHAR") || name.contains("TEXT") {
            Self::Text
        } else if name.contains("BLOB") {
            Self::LargeBinary
        } else if name.contains("BINARY") || name.contains("BYTEA") {
            Self::RawBinary
        } else if name.contains("REAL")
            || name.contains("FLOA")
            || name.contains("DOUB")
            || name.contains("NUMERIC")
            || name.contains("DECIMAL")
        {
            Self::Float
        } else if name.contains("DATE") || name.contains("TIME") {
            Self::Timestamp
        } else {
            Self::Text
        }
    }
}

/// Metadata about a column in a result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnDescriptor {
    /// Column name.
    pub name: String,

    /// Table the column was read from, when the driver knows it.
    pub table: Option<String>,

    /// Declared column type.
    pub column_type: ColumnType,
}

impl ColumnDescriptor {
    /// Creates a column descriptor without a source table.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            table: None,
            column_type,
        }
    }

    /// Sets the source table.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }
}

/// A row of data, positionally aligned with the column descriptors.
pub type Row = Vec<CellValue>;

/// Represents a single value from a result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CellValue {
    /// NULL value.
    #[default]
    Null,

    /// Text/string value.
    Text(String),

    /// Signed integer (up to i64).
    Integer(i64),

    /// Floating point number.
    Float(f64),

    /// Boolean value.
    Boolean(bool),

    /// Date and time without a zone, nanosecond precision.
    Timestamp(NaiveDateTime),

    /// Fully materialized character large object.
    LargeText(String),

    /// Fully materialized binary large object.
    LargeBinary(Vec<u8>),
}

impl CellValue {
    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Returns the default string form of the value.
    pub fn to_display_string(&self) -> String {
        match self {
            CellValue::Null => "NULL".to_string(),
            CellValue::Text(s) | CellValue::LargeText(s) => s.clone(),
            CellValue::Integer(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Boolean(b) => b.to_string(),
            CellValue::Timestamp(ts) => format_timestamp(ts),
            CellValue::LargeBinary(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

/// Formats a timestamp as `YYYY-MM-DD HH:MM:SS.f`.
///
/// Trailing zeros of the fraction are dropped but at least one fractional
/// digit is kept, so midnight prints as `1980-11-02 00:00:00.0`.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    let fraction = format!("{:09}", ts.nanosecond());
    let fraction = fraction.trim_end_matches('0');
    let fraction = if fraction.is_empty() { "0" } else { fraction };
    format!("{}.{}", ts.format("%Y-%m-%d %H:%M:%S"), fraction)
}

// Conversion implementations for common types
impl From<bool> for CellValue {
    fn from(v: bool) -> Self {
        CellValue::Boolean(v)
    }
}

impl From<i32> for CellValue {
    fn from(v: i32) -> Self {
        CellValue::Integer(v as i64)
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Integer(v)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Float(v)
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        CellValue::Text(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::Text(v.to_string())
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(v: NaiveDateTime) -> Self {
        CellValue::Timestamp(v)
    }
}

impl From<Vec<u8>> for CellValue {
    fn from(v: Vec<u8>) -> Self {
        CellValue::LargeBinary(v)
    }
}

impl<T> From<Option<T>> for CellValue
where
    T: Into<CellValue>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => CellValue::Null,
        }
    }
}

/// Column metadata plus a forward-only cursor over the rows.
///
/// The row iterator is consumed by value, so a result can be rendered once.
pub struct TabularResult<R> {
    /// Column metadata, in output order.
    pub columns: Vec<ColumnDescriptor>,

    /// Row cursor. An `Err` item aborts whoever is consuming the rows.
    pub rows: R,
}

/// Row cursor over rows that are already in memory.
pub type BufferedRows = std::iter::Map<std::vec::IntoIter<Row>, fn(Row) -> Result<Row>>;

impl<R> TabularResult<R>
where
    R: Iterator<Item = Result<Row>>,
{
    /// Creates a result from column metadata and a row cursor.
    pub fn new(columns: Vec<ColumnDescriptor>, rows: R) -> Self {
        Self { columns, rows }
    }
}

impl<R> TabularResult<R> {
    /// Returns the source table of the first column, if known and non-empty.
    pub fn table_name(&self) -> Option<&str> {
        self.columns
            .first()
            .and_then(|col| col.table.as_deref())
            .filter(|name| !name.is_empty())
    }
}

impl TabularResult<BufferedRows> {
    /// Creates a result over rows held in memory.
    pub fn from_rows(columns: Vec<ColumnDescriptor>, rows: Vec<Row>) -> Self {
        Self::new(
            columns,
            rows.into_iter()
                .map(Ok::<Row, SqlCliError> as fn(Row) -> Result<Row>),
        )
    }
}

/// Represents the rows returned by a statement.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    /// Column metadata for the result set.
    pub columns: Vec<ColumnDescriptor>,

    /// Rows of data.
    pub rows: Vec<Row>,

    /// Time taken to execute the statement.
    pub execution_time: Duration,
}

impl QueryResult {
    /// Creates a query result with the given columns and rows.
    pub fn with_data(columns: Vec<ColumnDescriptor>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows,
            execution_time: Duration::ZERO,
        }
    }

    /// Sets the execution time.
    pub fn with_execution_time(mut self, duration: Duration) -> Self {
        self.execution_time = duration;
        self
    }

    /// Returns the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Converts into a renderable result.
    pub fn into_tabular(self) -> TabularResult<BufferedRows> {
        TabularResult::from_rows(self.columns, self.rows)
    }
}

/// Rows of a statement that is still running, delivered over a bounded
/// channel as the driver produces them.
///
/// The [`Iterator`] impl blocks the calling thread while it waits for the
/// next row, so it must be drained off the async runtime (for example from
/// `tokio::task::spawn_blocking`). Dropping the stream stops the producer.
#[derive(Debug)]
pub struct RowStream {
    /// Column metadata for the result set.
    pub columns: Vec<ColumnDescriptor>,

    receiver: mpsc::Receiver<Result<Row>>,
}

impl RowStream {
    /// Creates a stream fed by `receiver`.
    pub fn new(columns: Vec<ColumnDescriptor>, receiver: mpsc::Receiver<Result<Row>>) -> Self {
        Self { columns, receiver }
    }

    /// Splits the stream into a renderable result.
    pub fn into_tabular(self) -> TabularResult<RowStream> {
        let columns = self.columns.clone();
        TabularResult::new(columns, self)
    }

    /// Waits for every remaining row and collects them in memory.
    pub async fn into_buffered(mut self) -> Result<QueryResult> {
        let mut rows = Vec::new();
        while let Some(row) = self.receiver.recv().await {
            rows.push(row?);
        }
        Ok(QueryResult::with_data(self.columns, rows))
    }
}

impl Iterator for RowStream {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.receiver.blocking_recv()
    }
}

/// Outcome of executing one statement.
#[derive(Debug)]
pub enum QueryOutcome {
    /// The statement produced a result set that is already in memory.
    Rows(QueryResult),

    /// The statement produced a result set that is still being read.
    Streaming(RowStream),

    /// The statement produced no result set; carries the affected row count.
    Affected(u64),
}
