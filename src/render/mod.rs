//! Result rendering for sqlcli.
//!
//! Serializes a [`TabularResult`] into one of the supported output encodings.
//! Every encoder writes the header before pulling the first row and flushes
//! the sink once, after the last one.

pub mod coerce;
mod delimited;
mod spreadsheet;
mod xml;

pub use coerce::{coerce, Renderable};

use crate::db::{Row, TabularResult};
use crate::error::{Result, SqlCliError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use tracing::debug;

/// Output encoding for query results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// Comma-separated values.
    Csv,
    /// Tab-separated values.
    #[default]
    Tsv,
    /// Flat XML: one element per row, one attribute per non-null cell.
    FlatXml,
    /// Access-style XML: one element per row, one child element per cell.
    AccessXml,
    /// Excel workbook (Office Open XML).
    Excel,
    /// Tab-separated values with `\N` for NULL and no quoting.
    OldTsv,
}

impl OutputFormat {
    /// Returns the canonical keyword for this format.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::FlatXml => "flatxml",
            Self::AccessXml => "accessxml",
            Self::Excel => "excel",
            Self::OldTsv => "oldtsv",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = SqlCliError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "tsv" => Ok(Self::Tsv),
            "xml" | "flatxml" => Ok(Self::FlatXml),
            "accessxml" => Ok(Self::AccessXml),
            "excel" => Ok(Self::Excel),
            "oldtsv" => Ok(Self::OldTsv),
            _ => Err(SqlCliError::format(s)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Renderer settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderConfig {
    /// XML output settings.
    #[serde(default)]
    pub xml: XmlConfig,

    /// Excel output settings.
    #[serde(default)]
    pub spreadsheet: SpreadsheetConfig,
}

/// XML output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XmlConfig {
    /// Spaces per nesting level.
    #[serde(default = "default_indent")]
    pub indent: usize,
}

fn default_indent() -> usize {
    2
}

impl Default for XmlConfig {
    fn default() -> Self {
        Self {
            indent: default_indent(),
        }
    }
}

/// Excel output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpreadsheetConfig {
    /// Sheet name used when the source table is unknown or rejected by Excel.
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,

    /// Number format for timestamps at midnight.
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Number format for timestamps with a time of day.
    #[serde(default = "default_datetime_format")]
    pub datetime_format: String,
}

fn default_sheet_name() -> String {
    "Output".to_string()
}

fn default_date_format() -> String {
    "dd/mm/yyyy".to_string()
}

fn default_datetime_format() -> String {
    "dd/mm/yyyy hh:mm:ss".to_string()
}

impl Default for SpreadsheetConfig {
    fn default() -> Self {
        Self {
            sheet_name: default_sheet_name(),
            date_format: default_date_format(),
            datetime_format: default_datetime_format(),
        }
    }
}

/// Renders tabular results.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    /// Creates a renderer with the given settings.
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Writes `result` to `sink` in the given format and returns the number of
    /// rows written.
    ///
    /// Sink errors abort the render and leave whatever was already written in
    /// place. An `Err` row from the cursor aborts it the same way.
    pub fn render<R, W>(
        &self,
        result: TabularResult<R>,
        format: OutputFormat,
        sink: &mut W,
    ) -> Result<usize>
    where
        R: Iterator<Item = Result<Row>>,
        W: Write + ?Sized,
    {
        let rows = match format {
            OutputFormat::Csv => delimited::write_delimited(result, b',', sink)?,
            OutputFormat::Tsv => delimited::write_delimited(result, b'\t', sink)?,
            OutputFormat::OldTsv => delimited::write_null_marked(result, sink)?,
            OutputFormat::FlatXml => {
                xml::write_dataset(result, xml::Layout::Attributes, self.config.xml.indent, sink)?
            }
            OutputFormat::AccessXml => xml::write_dataset(
                result,
                xml::Layout::ChildElements,
                self.config.xml.indent,
                sink,
            )?,
            OutputFormat::Excel => {
                spreadsheet::write_workbook(result, &self.config.spreadsheet, sink)?
            }
        };

        debug!(%format, rows, "rendered result");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{CellValue, ColumnDescriptor, ColumnType};
    use std::io;

    /// Sink that counts flushes.
    #[derive(Default)]
    struct CountingSink {
        data: Vec<u8>,
        flushes: usize,
    }

    impl Write for CountingSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    /// Sink that accepts a fixed number of bytes, then fails.
    struct FullDisk {
        remaining: usize,
    }

    impl Write for FullDisk {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.remaining == 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            let n = buf.len().min(self.remaining);
            self.remaining -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn sample() -> TabularResult<crate::db::BufferedRows> {
        TabularResult::from_rows(
            vec![
                ColumnDescriptor::new("ID", ColumnType::Integer),
                ColumnDescriptor::new("NAME", ColumnType::Text),
            ],
            (0..50)
                .map(|i| vec![CellValue::Integer(i), CellValue::from("name")])
                .collect(),
        )
    }

    #[test]
    fn test_format_keywords() {
        assert_eq!("csv".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert_eq!("TSV".parse::<OutputFormat>().unwrap(), OutputFormat::Tsv);
        assert_eq!("xml".parse::<OutputFormat>().unwrap(), OutputFormat::FlatXml);
        assert_eq!(
            "flatxml".parse::<OutputFormat>().unwrap(),
            OutputFormat::FlatXml
        );
        assert_eq!(
            "accessxml".parse::<OutputFormat>().unwrap(),
            OutputFormat::AccessXml
        );
        assert_eq!("excel".parse::<OutputFormat>().unwrap(), OutputFormat::Excel);
        assert_eq!("oldtsv".parse::<OutputFormat>().unwrap(), OutputFormat::OldTsv);
    }

    #[test]
    fn test_unknown_format_keyword() {
        let err = "yaml".parse::<OutputFormat>().unwrap_err();
        assert!(matches!(err, SqlCliError::Format(ref k) if k == "yaml"));
    }

    #[test]
    fn test_format_display_round_trips() {
        for format in [
            OutputFormat::Csv,
            OutputFormat::Tsv,
            OutputFormat::FlatXml,
            OutputFormat::AccessXml,
            OutputFormat::Excel,
            OutputFormat::OldTsv,
        ] {
            assert_eq!(format.to_string().parse::<OutputFormat>().unwrap(), format);
        }
    }

    #[test]
    fn test_default_config() {
        let config = RenderConfig::default();
        assert_eq!(config.xml.indent, 2);
        assert_eq!(config.spreadsheet.sheet_name, "Output");
        assert_eq!(config.spreadsheet.date_format, "dd/mm/yyyy");
        assert_eq!(config.spreadsheet.datetime_format, "dd/mm/yyyy hh:mm:ss");
    }

    #[test]
    fn test_sink_flushed_once() {
        let renderer = Renderer::default();
        for format in [
            OutputFormat::Csv,
            OutputFormat::Tsv,
            OutputFormat::OldTsv,
            OutputFormat::FlatXml,
            OutputFormat::AccessXml,
            OutputFormat::Excel,
        ] {
            let mut sink = CountingSink::default();
            let rows = renderer.render(sample(), format, &mut sink).unwrap();
            assert_eq!(rows, 50);
            assert_eq!(sink.flushes, 1, "{format}");
            assert!(!sink.data.is_empty());
        }
    }

    #[test]
    fn test_sink_failure_propagates() {
        let renderer = Renderer::default();
        for format in [OutputFormat::Csv, OutputFormat::FlatXml, OutputFormat::OldTsv] {
            let mut sink = FullDisk { remaining: 16 };
            let err = renderer.render(sample(), format, &mut sink).unwrap_err();
            assert_eq!(err.category(), "Output Error", "{format}");
        }
    }

    #[test]
    fn test_row_error_aborts_render() {
        let rows: Vec<Result<Row>> = vec![
            Ok(vec![CellValue::Integer(1)]),
            Err(SqlCliError::query("cursor closed")),
            Ok(vec![CellValue::Integer(3)]),
        ];
        let result = TabularResult::new(
            vec![ColumnDescriptor::new("N", ColumnType::Integer)],
            rows.into_iter(),
        );

        let mut sink = Vec::new();
        let err = Renderer::default()
            .render(result, OutputFormat::OldTsv, &mut sink)
            .unwrap_err();
        assert!(matches!(err, SqlCliError::Query(_)));
        assert_eq!(String::from_utf8(sink).unwrap(), "1\n");
    }
}
