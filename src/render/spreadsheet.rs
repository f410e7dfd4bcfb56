//! Excel encoder.
//!
//! The workbook is a zip container, so the whole sheet is built in memory
//! and written to the sink in one piece at the end.

use super::coerce::{coerce, Renderable};
use super::SpreadsheetConfig;
use crate::db::{Row, TabularResult};
use crate::error::{Result, SqlCliError};
use chrono::{NaiveDateTime, Timelike};
use rust_xlsxwriter::{ColNum, Format, RowNum, Workbook, Worksheet};
use std::io::Write;
use tracing::{debug, warn};

/// Cell formats for timestamp values.
struct DateFormats {
    date: Format,
    datetime: Format,
}

impl DateFormats {
    fn new(config: &SpreadsheetConfig) -> Self {
        Self {
            date: Format::new().set_num_format(config.date_format.as_str()),
            datetime: Format::new().set_num_format(config.datetime_format.as_str()),
        }
    }

    fn for_timestamp(&self, ts: &NaiveDateTime) -> &Format {
        if has_time_of_day(ts) {
            &self.datetime
        } else {
            &self.date
        }
    }
}

/// Writes a result set as a single-sheet workbook. Row 0 holds the column
/// names; NULL cells stay blank.
pub(super) fn write_workbook<R, W>(
    result: TabularResult<R>,
    config: &SpreadsheetConfig,
    sink: &mut W,
) -> Result<usize>
where
    R: Iterator<Item = Result<Row>>,
    W: Write + ?Sized,
{
    let sheet_name = result
        .table_name()
        .unwrap_or(config.sheet_name.as_str())
        .to_string();
    let TabularResult { columns, rows } = result;
    let formats = DateFormats::new(config);

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    let rejected = worksheet.set_name(sheet_name.as_str()).err();
    if let Some(e) = rejected {
        warn!(sheet = %sheet_name, error = %e, "sheet name rejected, using fallback");
        worksheet.set_name(config.sheet_name.as_str())?;
    }

    for (index, column) in columns.iter().enumerate() {
        worksheet.write_string(0, col_num(index)?, column.name.as_str())?;
    }

    let mut count = 0;
    let mut row_num: RowNum = 0;
    for row in rows {
        let row = row?;
        row_num += 1;
        for (index, (value, column)) in row.into_iter().zip(&columns).enumerate() {
            let cell = coerce(value, column.column_type);
            write_cell(worksheet, row_num, col_num(index)?, cell, &formats)?;
        }
        count += 1;
    }

    let buffer = workbook.save_to_buffer()?;
    debug!(bytes = buffer.len(), rows = count, "workbook assembled");

    sink.write_all(&buffer)?;
    sink.flush()?;
    Ok(count)
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: RowNum,
    col: ColNum,
    cell: Renderable,
    formats: &DateFormats,
) -> Result<()> {
    match cell {
        Renderable::Omitted => {}
        Renderable::Literal(text) => {
            worksheet.write_string(row, col, text)?;
        }
        Renderable::Integer(i) => {
            worksheet.write_number(row, col, i as f64)?;
        }
        Renderable::Float(f) => {
            worksheet.write_number(row, col, f)?;
        }
        Renderable::Boolean(b) => {
            worksheet.write_boolean(row, col, b)?;
        }
        Renderable::Timestamp(ts) => {
            worksheet.write_datetime_with_format(row, col, &ts, formats.for_timestamp(&ts))?;
        }
    }
    Ok(())
}

fn col_num(index: usize) -> Result<ColNum> {
    ColNum::try_from(index)
        .map_err(|_| SqlCliError::internal(format!("column {index} is beyond the sheet width")))
}

fn has_time_of_day(ts: &NaiveDateTime) -> bool {
    ts.num_seconds_from_midnight() != 0 || ts.nanosecond() != 0
}
