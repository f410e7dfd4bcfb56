//! Delimited text encoders (CSV, TSV and the legacy null-marked TSV).

use super::coerce::coerce;
use crate::db::{ColumnType, Row, TabularResult};
use crate::error::{Result, SqlCliError};
use std::io::{self, Write};

/// Written in place of NULL by the legacy TSV encoder.
const NULL_MARKER: &str = "\\N";

/// Writes CSV-style records. Fields containing the delimiter, a double quote
/// or a line break are quoted, quotes are doubled, and NULL is an empty field.
pub(super) fn write_delimited<R, W>(
    result: TabularResult<R>,
    delimiter: u8,
    sink: &mut W,
) -> Result<usize>
where
    R: Iterator<Item = Result<Row>>,
    W: Write + ?Sized,
{
    let TabularResult { columns, rows } = result;
    let types: Vec<ColumnType> = columns.iter().map(|col| col.column_type).collect();

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .terminator(csv::Terminator::CRLF)
        .from_writer(sink);

    writer.write_record(columns.iter().map(|col| col.name.as_str()))?;

    let mut count = 0;
    for row in rows {
        let fields = row?
            .into_iter()
            .zip(&types)
            .map(|(value, declared)| coerce(value, *declared).to_text().unwrap_or_default());
        writer.write_record(fields)?;
        count += 1;
    }

    // into_inner flushes the buffer and the sink, and keeps the writer's
    // Drop from flushing a second time.
    writer
        .into_inner()
        .map_err(|e| SqlCliError::Io(io::Error::new(e.error().kind(), e.error().to_string())))?;

    Ok(count)
}

/// Writes a loader dump: tab-separated lines with `\N` for NULL and no
/// header row. Values are written verbatim: tabs and line breaks inside a
/// value are not protected.
pub(super) fn write_null_marked<R, W>(result: TabularResult<R>, sink: &mut W) -> Result<usize>
where
    R: Iterator<Item = Result<Row>>,
    W: Write + ?Sized,
{
    let TabularResult { columns, rows } = result;
    let types: Vec<ColumnType> = columns.iter().map(|col| col.column_type).collect();

    let mut count = 0;
    for row in rows {
        let line = row?
            .into_iter()
            .zip(&types)
            .map(|(value, declared)| {
                coerce(value, *declared)
                    .to_text()
                    .unwrap_or_else(|| NULL_MARKER.to_string())
            })
            .collect::<Vec<_>>()
            .join("\t");
        writeln!(sink, "{line}")?;
        count += 1;
    }

    sink.flush()?;
    Ok(count)
}
