//! Cell value coercion.
//!
//! Turns a raw cell into the representation an encoder writes. Text encoders
//! only need [`Renderable::to_text`]; the spreadsheet encoder keeps numbers,
//! booleans and timestamps typed.

use crate::db::{format_timestamp, CellValue, ColumnType};
use chrono::NaiveDateTime;
use tracing::trace;

/// A cell ready for an encoder.
#[derive(Debug, Clone, PartialEq)]
pub enum Renderable {
    /// NULL. Encoders omit it or print their null marker.
    Omitted,
    Literal(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Timestamp(NaiveDateTime),
}

impl Renderable {
    /// Returns the text form, or `None` for [`Renderable::Omitted`].
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Omitted => None,
            Self::Literal(s) => Some(s.clone()),
            Self::Integer(i) => Some(i.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::Boolean(b) => Some(b.to_string()),
            Self::Timestamp(ts) => Some(format_timestamp(ts)),
        }
    }
}

/// Converts a cell into a [`Renderable`].
///
/// Binary values are decoded as UTF-8; there is no guarantee the bytes are
/// text, so invalid sequences are replaced rather than reported.
pub fn coerce(value: CellValue, declared: ColumnType) -> Renderable {
    match value {
        CellValue::Null => Renderable::Omitted,
        CellValue::Text(s) | CellValue::LargeText(s) => Renderable::Literal(s),
        CellValue::LargeBinary(bytes) => Renderable::Literal(decode_binary(bytes, declared)),
        CellValue::Integer(i) => Renderable::Integer(i),
        CellValue::Float(f) => Renderable::Float(f),
        CellValue::Boolean(b) => Renderable::Boolean(b),
        CellValue::Timestamp(ts) => Renderable::Timestamp(ts),
    }
}

fn decode_binary(bytes: Vec<u8>, declared: ColumnType) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            trace!(?declared, "binary value is not valid UTF-8, decoding lossily");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    }
}
