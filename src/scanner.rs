//! Statement scanner.
//!
//! Accumulates input text and tracks whether the cursor sits inside a quoted
//! literal, so that only an unquoted `;` ends a statement. This is not a SQL
//! parser: comments, dollar quoting and backslash escapes are not recognised.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lexical context of the scanner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ScanState {
    /// Outside any literal.
    #[default]
    Start,
    /// Inside a single-quoted literal.
    Apos,
    /// Just after an apostrophe that either closes the literal or starts a
    /// doubled-quote escape.
    Apos2,
    /// Inside a double-quoted literal.
    Quot,
    /// Just after a double quote that either closes the literal or starts a
    /// doubled-quote escape.
    Quot2,
    /// A complete statement has been read. Absorbing until reset.
    End,
}

impl ScanState {
    /// Returns the state after consuming `c`. Total over all inputs.
    pub fn next(self, c: char) -> ScanState {
        match (self, c) {
            (Self::Start, '\'') => Self::Apos,
            (Self::Start, '"') => Self::Quot,
            (Self::Start, ';') => Self::End,
            (Self::Start, _) => Self::Start,

            (Self::Apos, '\'') => Self::Apos2,
            (Self::Apos, _) => Self::Apos,

            (Self::Apos2, '\'') => Self::Apos,
            (Self::Apos2, '"') => Self::Apos2,
            (Self::Apos2, ';') => Self::End,
            (Self::Apos2, _) => Self::Start,

            (Self::Quot, '"') => Self::Quot2,
            (Self::Quot, _) => Self::Quot,

            // An apostrophe right after a closing double quote opens a
            // single-quoted literal.
            (Self::Quot2, '\'') => Self::Apos,
            (Self::Quot2, '"') => Self::Quot,
            (Self::Quot2, ';') => Self::End,
            (Self::Quot2, _) => Self::Start,

            (Self::End, _) => Self::End,
        }
    }

    /// Returns true once a statement terminator has been seen.
    pub fn is_complete(self) -> bool {
        self == Self::End
    }

    /// Returns the state name in upper case, as shown in prompts and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::Apos => "APOS",
            Self::Apos2 => "APOS2",
            Self::Quot => "QUOT",
            Self::Quot2 => "QUOT2",
            Self::End => "END",
        }
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scanner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Text inserted between lines passed to [`StatementScanner::feed_line`].
    #[serde(default = "default_line_separator")]
    pub line_separator: String,
}

fn default_line_separator() -> String {
    "\n".to_string()
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            line_separator: default_line_separator(),
        }
    }
}

/// Accumulates statement text and tracks the [`ScanState`].
#[derive(Debug, Clone, Default)]
pub struct StatementScanner {
    config: ScannerConfig,
    state: ScanState,
    buffer: Option<String>,
    /// Byte offset of the terminating `;` in the buffer.
    terminator: Option<usize>,
}

impl StatementScanner {
    /// Creates a scanner with the given settings.
    pub fn new(config: ScannerConfig) -> Self {
        Self {
            config,
            state: ScanState::Start,
            buffer: None,
            terminator: None,
        }
    }

    /// Appends one character and advances the state.
    pub fn feed(&mut self, c: char) -> ScanState {
        let buffer = self.buffer.get_or_insert_with(String::new);
        let offset = buffer.len();
        buffer.push(c);
        self.advance(c, offset);
        self.state
    }

    /// Appends a line, separated from earlier text by the configured line
    /// separator, and advances the state over each of its characters.
    ///
    /// The separator itself is not scanned.
    pub fn feed_line(&mut self, line: &str) -> ScanState {
        if let Some(buffer) = self.buffer.as_mut() {
            buffer.push_str(&self.config.line_separator);
        }
        let buffer = self.buffer.get_or_insert_with(String::new);
        let base = buffer.len();
        buffer.push_str(line);

        for (offset, c) in line.char_indices() {
            self.advance(c, base + offset);
        }
        self.state
    }

    /// Appends text verbatim and advances the state over each character.
    pub fn feed_str(&mut self, text: &str) -> ScanState {
        for c in text.chars() {
            self.feed(c);
        }
        self.state
    }

    fn advance(&mut self, c: char, offset: usize) {
        let next = self.state.next(c);
        if next == ScanState::End && self.state != ScanState::End {
            self.terminator = Some(offset);
        }
        self.state = next;
    }

    /// Clears the buffer and returns to [`ScanState::Start`].
    pub fn reset(&mut self) {
        self.state = ScanState::Start;
        self.buffer = None;
        self.terminator = None;
    }

    /// Returns the current state.
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Returns everything fed since the last reset.
    pub fn buffer(&self) -> &str {
        self.buffer.as_deref().unwrap_or("")
    }

    /// Returns true when nothing but whitespace has been fed since the last
    /// reset.
    pub fn is_blank(&self) -> bool {
        self.buffer().trim().is_empty()
    }

    /// Returns the text before the terminating `;` once a statement is
    /// complete. Text absorbed after the terminator is excluded.
    pub fn statement(&self) -> Option<&str> {
        let end = self.terminator?;
        Some(&self.buffer()[..end])
    }

    /// Returns the text fed after the terminating `;`, which belongs to the
    /// next statement.
    pub fn remainder(&self) -> Option<&str> {
        let end = self.terminator?;
        Some(&self.buffer()[end + 1..])
    }
}
