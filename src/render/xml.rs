//! XML encoders.
//!
//! Both layouts emit a declaration, a root element and one element per row,
//! named after the source table. They differ in where the cell values go.
//! Table and column names pass through [`sanitize_name`] first, since SQL
//! names are not necessarily XML names.

use super::coerce::coerce;
use crate::db::{Row, TabularResult};
use crate::error::{Result, SqlCliError};
use std::io::Write;

/// Row element name when the source table is unknown.
const DEFAULT_ROW_ELEMENT: &str = "row";

/// Where cell values are placed inside a row element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Layout {
    /// `<row NAME="value"/>`, root `dataset`.
    Attributes,
    /// `<row><NAME>value</NAME></row>`, root `dataroot`.
    ChildElements,
}

impl Layout {
    fn root(self) -> &'static str {
        match self {
            Self::Attributes => "dataset",
            Self::ChildElements => "dataroot",
        }
    }
}

/// Writes a result set as XML. NULL cells are left out entirely.
pub(super) fn write_dataset<R, W>(
    result: TabularResult<R>,
    layout: Layout,
    indent: usize,
    sink: &mut W,
) -> Result<usize>
where
    R: Iterator<Item = Result<Row>>,
    W: Write + ?Sized,
{
    let element = sanitize_name(result.table_name().unwrap_or(DEFAULT_ROW_ELEMENT));
    let TabularResult { columns, rows } = result;
    let names: Vec<String> = columns.iter().map(|col| sanitize_name(&col.name)).collect();

    let mut xml = XmlWriter::new(sink, indent);
    xml.declaration()?;
    xml.start_element(layout.root())?;

    let mut count = 0;
    for row in rows {
        let row = row?;
        xml.start_element(&element)?;
        for ((value, column), name) in row.into_iter().zip(&columns).zip(&names) {
            let Some(text) = coerce(value, column.column_type).to_text() else {
                continue;
            };
            match layout {
                Layout::Attributes => xml.attribute(name, &text)?,
                Layout::ChildElements => xml.element_with_text(name, &text)?,
            }
        }
        xml.end_element()?;
        count += 1;
    }

    xml.end_element()?;
    xml.finish()?;
    Ok(count)
}

/// Maps a SQL identifier onto an XML name the way Access exports do: every
/// character that may not appear at its position becomes `_xHHHH_`, its code
/// point in upper-case hex. An underscore that would read as such an escape
/// is escaped itself, and an empty name becomes `_`.
pub(super) fn sanitize_name(name: &str) -> String {
    if name.is_empty() {
        return "_".to_string();
    }

    let mut sanitized = String::with_capacity(name.len());
    for (offset, c) in name.char_indices() {
        let legal = if offset == 0 {
            is_name_start(c)
        } else {
            is_name_char(c)
        };
        if legal && !(c == '_' && looks_escaped(&name[offset..])) {
            sanitized.push(c);
        } else if u32::from(c) > 0xFFFF {
            sanitized.push_str(&format!("_x{:08X}_", u32::from(c)));
        } else {
            sanitized.push_str(&format!("_x{:04X}_", u32::from(c)));
        }
    }
    sanitized
}

fn is_name_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_name_char(c: char) -> bool {
    is_name_start(c) || c.is_numeric() || matches!(c, '-' | '.' | '\u{B7}')
}

/// True when `text` starts with `_xHHHH_`.
fn looks_escaped(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() >= 7
        && bytes[1] == b'x'
        && bytes[2..6].iter().all(u8::is_ascii_hexdigit)
        && bytes[6] == b'_'
}

/// Minimal streaming XML writer with indentation.
///
/// Start tags stay open until the first child or text arrives, so elements
/// without content are written self-closed. Names are written as given.
pub(super) struct XmlWriter<'a, W: Write + ?Sized> {
    out: &'a mut W,
    indent: usize,
    open: Vec<String>,
    tag_pending: bool,
}

impl<'a, W: Write + ?Sized> XmlWriter<'a, W> {
    /// Creates a writer that indents nested elements by `indent` spaces.
    pub fn new(out: &'a mut W, indent: usize) -> Self {
        Self {
            out,
            indent,
            open: Vec::new(),
            tag_pending: false,
        }
    }

    /// Writes the XML declaration.
    pub fn declaration(&mut self) -> Result<()> {
        writeln!(self.out, "<?xml version='1.0' encoding='UTF-8'?>")?;
        Ok(())
    }

    /// Opens an element as a child of the current one.
    pub fn start_element(&mut self, name: &str) -> Result<()> {
        self.close_pending_tag()?;
        self.write_indent(self.open.len())?;
        write!(self.out, "<{name}")?;
        self.open.push(name.to_string());
        self.tag_pending = true;
        Ok(())
    }

    /// Adds an attribute to the element just opened.
    pub fn attribute(&mut self, name: &str, value: &str) -> Result<()> {
        if !self.tag_pending {
            return Err(SqlCliError::internal(format!(
                "attribute '{name}' written outside a start tag"
            )));
        }
        write!(self.out, " {name}=\"{}\"", escape_attribute(value))?;
        Ok(())
    }

    /// Writes `<name>text</name>` as a child of the current element.
    pub fn element_with_text(&mut self, name: &str, text: &str) -> Result<()> {
        self.close_pending_tag()?;
        self.write_indent(self.open.len())?;
        writeln!(self.out, "<{name}>{}</{name}>", escape_text(text))?;
        Ok(())
    }

    /// Closes the innermost open element.
    pub fn end_element(&mut self) -> Result<()> {
        let name = self
            .open
            .pop()
            .ok_or_else(|| SqlCliError::internal("end_element without an open element"))?;

        if self.tag_pending {
            self.tag_pending = false;
            writeln!(self.out, "/>")?;
        } else {
            self.write_indent(self.open.len())?;
            writeln!(self.out, "</{name}>")?;
        }
        Ok(())
    }

    /// Closes any elements still open and flushes the sink.
    pub fn finish(mut self) -> Result<()> {
        while !self.open.is_empty() {
            self.end_element()?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn close_pending_tag(&mut self) -> Result<()> {
        if self.tag_pending {
            self.tag_pending = false;
            writeln!(self.out, ">")?;
        }
        Ok(())
    }

    fn write_indent(&mut self, depth: usize) -> Result<()> {
        write!(self.out, "{:width$}", "", width = depth * self.indent)?;
        Ok(())
    }
}

/// Escapes `&`, `<`, `>` and `"` for use inside a double-quoted attribute.
/// Tabs and line breaks become character references, which attribute value
/// normalization leaves alone.
fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\n' => escaped.push_str("&#10;"),
            '\r' => escaped.push_str("&#13;"),
            '\t' => escaped.push_str("&#9;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Escapes `&`, `<` and `>` for use as element text. A carriage return is
/// written as a reference so that end-of-line handling keeps it.
fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\r' => escaped.push_str("&#13;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
