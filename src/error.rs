//! Error types for sqlcli.
//!
//! Defines the main error enum used throughout the application.

use thiserror::Error;

/// Main error type for sqlcli operations.
#[derive(Error, Debug)]
pub enum SqlCliError {
    /// Database connection errors (bad URL, missing file, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Statement execution errors (syntax errors, constraint violations, etc.)
    #[error("Query error: {0}")]
    Query(String),

    /// Configuration errors (invalid config file, unknown profile, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unknown output format keyword.
    #[error("Unknown output format: {0}")]
    Format(String),

    /// Output sink failures (disk full, broken pipe, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Delimited writer failures.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Workbook construction failures.
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SqlCliError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an unknown-format error for the given keyword.
    pub fn format(keyword: impl Into<String>) -> Self {
        Self::Format(keyword.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true for errors raised by the data source while running a
    /// statement. The session reports these and carries on.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Query(_))
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Config(_) => "Configuration Error",
            Self::Format(_) => "Format Error",
            Self::Io(_) => "Output Error",
            Self::Csv(_) => "Output Error",
            Self::Spreadsheet(_) => "Output Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using SqlCliError.
pub type Result<T> = std::result::Result<T, SqlCliError>;
