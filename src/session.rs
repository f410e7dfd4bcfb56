//! Statement session.
//!
//! Drives the scanner over batch or interactive input, sends complete
//! statements to the data source, and renders result sets to the output
//! sink. Lines starting with `\` are meta commands.

use crate::config::Config;
use crate::db::{self, DatabaseClient, QueryOutcome, QueryResult, Row, TabularResult};
use crate::error::{Result, SqlCliError};
use crate::render::{OutputFormat, Renderer};
use crate::scanner::{ScanState, StatementScanner};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

/// Prompt for a fresh statement.
pub const PROMPT: &str = "SQL> ";
/// Prompt inside a single-quoted literal.
pub const PROMPT_APOS: &str = "'> ";
/// Prompt inside a double-quoted literal.
pub const PROMPT_QUOT: &str = "\"> ";
/// Prompt for any other continuation line.
pub const PROMPT_CONTINUE: &str = "  -> ";

const HELP: &[&str] = &[
    "Lines starting with \\ are meta commands. Anything else is sent as is to the database",
    "Meta commands:",
    "\\c <profile> = Connect using a profile from the config file.",
    "\\dc = List catalogs.",
    "\\dd <table> = List table columns.",
    "\\df = List functions.",
    "\\dn = List schemas a.k.a namespaces.",
    "\\dp = List procedures.",
    "\\dt = List tables and views.",
    "\\f <format> = Format of output. Available arguments: csv, tsv, flatxml, accessxml, excel, oldtsv",
    "\\o [file] = Redirect output to file. No argument or - redirects to standard out",
    "\\h = This help.",
];

/// Output sink for rendered results or user messages.
pub type Sink = Box<dyn Write + Send>;

/// A statement session bound to one data source.
pub struct Session {
    client: Box<dyn DatabaseClient>,
    config: Config,
    renderer: Renderer,
    scanner: StatementScanner,
    format: OutputFormat,
    output: Sink,
    control: Sink,
}

impl Session {
    /// Creates a session writing results to stdout and messages to stderr.
    pub fn new(client: Box<dyn DatabaseClient>, config: Config, format: OutputFormat) -> Self {
        Self {
            client,
            renderer: Renderer::new(config.render_config()),
            scanner: StatementScanner::new(config.scanner.clone()),
            config,
            format,
            output: Box::new(io::stdout()),
            control: Box::new(io::stderr()),
        }
    }

    /// Replaces the result sink.
    pub fn with_output(mut self, output: Sink) -> Self {
        self.output = output;
        self
    }

    /// Replaces the sink for prompts and messages.
    pub fn with_control(mut self, control: Sink) -> Self {
        self.control = control;
        self
    }

    /// Returns the current output format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Runs every statement in `text`.
    ///
    /// An unterminated statement at the end of the input is discarded.
    pub async fn run_batch(&mut self, text: &str) -> Result<()> {
        self.scanner.reset();

        for line in text.split_inclusive('\n') {
            if self.is_meta_line(line) {
                self.run_meta(line.trim()).await?;
                self.scanner.reset();
                continue;
            }

            for c in line.chars() {
                if self.scanner.feed(c).is_complete() {
                    let (statement, _) = self.take_statement();
                    self.execute_statement(&statement).await?;
                }
            }
        }

        self.discard_pending();
        Ok(())
    }

    /// Reads statements line by line, prompting on the control sink.
    pub async fn run_interactive<R>(&mut self, reader: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        self.scanner.reset();
        let mut lines = reader.lines();

        self.prompt()?;
        while let Some(line) = lines.next_line().await? {
            if self.is_meta_line(&line) {
                self.run_meta(line.trim()).await?;
                self.scanner.reset();
            } else {
                // A line may hold several statements; the text after each
                // terminator starts the next one.
                let mut state = self.scanner.feed_line(&line);
                while state.is_complete() {
                    let (statement, rest) = self.take_statement();
                    self.execute_statement(&statement).await?;
                    state = self.scanner.feed_str(&rest);
                }
            }
            self.prompt()?;
        }

        self.discard_pending();
        Ok(())
    }

    /// Executes one statement and renders its result set, if any.
    ///
    /// Errors raised by the data source are reported on the control sink and
    /// the session carries on. Failures writing the output are returned.
    pub async fn execute_statement(&mut self, sql: &str) -> Result<()> {
        let sql = sql.trim();
        if sql.is_empty() {
            return Ok(());
        }
        debug!(statement = %sql, "executing");

        match self.client.execute(sql).await {
            Ok(QueryOutcome::Rows(result)) => self.render(result.into_tabular()).await,
            Ok(QueryOutcome::Streaming(stream)) => self.render(stream.into_tabular()).await,
            Ok(QueryOutcome::Affected(rows)) => {
                debug!(rows, "rows affected");
                Ok(())
            }
            Err(e) => self.report(e),
        }
    }

    /// Flushes the output and closes the connection.
    pub async fn close(mut self) -> Result<()> {
        self.output.flush()?;
        self.client.close().await
    }

    fn is_meta_line(&self, line: &str) -> bool {
        self.scanner.is_blank() && line.trim_start().starts_with('\\')
    }

    /// Returns the completed statement and the text that followed its
    /// terminator, leaving the scanner reset.
    fn take_statement(&mut self) -> (String, String) {
        let statement = self.scanner.statement().unwrap_or_default().to_string();
        let rest = self.scanner.remainder().unwrap_or_default().to_string();
        self.scanner.reset();
        (statement, rest)
    }

    fn discard_pending(&mut self) {
        if !self.scanner.is_blank() {
            warn!(
                state = %self.scanner.state(),
                "discarding unterminated statement at end of input"
            );
        }
        self.scanner.reset();
    }

    fn prompt(&mut self) -> Result<()> {
        let prompt = match self.scanner.state() {
            ScanState::Apos => PROMPT_APOS,
            ScanState::Quot => PROMPT_QUOT,
            _ if self.scanner.is_blank() => PROMPT,
            _ => PROMPT_CONTINUE,
        };
        write!(self.control, "{prompt}")?;
        self.control.flush()?;
        Ok(())
    }

    /// Renders on the blocking pool so that a streaming cursor can wait for
    /// rows without stalling the runtime. A failed row is reported; a failed
    /// sink is returned.
    async fn render<R>(&mut self, result: TabularResult<R>) -> Result<()>
    where
        R: Iterator<Item = Result<Row>> + Send + 'static,
    {
        let renderer = self.renderer.clone();
        let format = self.format;
        let mut output = std::mem::replace(&mut self.output, Box::new(io::sink()));

        let (output, rendered) = tokio::task::spawn_blocking(move || {
            let rendered = renderer.render(result, format, &mut *output);
            (output, rendered)
        })
        .await
        .map_err(|e| SqlCliError::internal(format!("render task failed: {e}")))?;
        self.output = output;

        match rendered {
            Ok(rows) => {
                debug!(rows, %format, "result written");
                Ok(())
            }
            Err(e) => self.report(e),
        }
    }

    async fn render_listing(&mut self, listing: Result<QueryResult>) -> Result<()> {
        match listing {
            Ok(result) => self.render(result.into_tabular()).await,
            Err(e) => self.report(e),
        }
    }

    fn message(&mut self, text: &str) -> Result<()> {
        writeln!(self.control, "{text}")?;
        self.control.flush()?;
        Ok(())
    }

    /// Reports errors the user can act on and returns the rest.
    fn report(&mut self, error: SqlCliError) -> Result<()> {
        let reportable = error.is_recoverable()
            || matches!(
                error,
                SqlCliError::Config(_) | SqlCliError::Connection(_) | SqlCliError::Format(_)
            );
        if !reportable {
            return Err(error);
        }
        warn!(error = %error, "command failed");
        self.message(&error.to_string())
    }

    async fn run_meta(&mut self, line: &str) -> Result<()> {
        let args: Vec<&str> = line.split_whitespace().collect();
        let Some(command) = args.first().copied() else {
            return Ok(());
        };
        let argument = args.get(1).copied();
        debug!(command, ?argument, "meta command");

        match command {
            "\\f" => self.meta_format(argument),
            "\\o" => self.meta_output(argument),
            "\\dt" => {
                let listing = self.client.list_tables().await;
                self.render_listing(listing).await
            }
            "\\dd" => match argument {
                Some(table) => {
                    let listing = self.client.list_columns(table).await;
                    self.render_listing(listing).await
                }
                None => self.message("You must enter a table name"),
            },
            "\\dc" => {
                let listing = self.client.list_catalogs().await;
                self.render_listing(listing).await
            }
            "\\dn" => {
                let listing = self.client.list_schemas().await;
                self.render_listing(listing).await
            }
            "\\df" => {
                let listing = self.client.list_functions().await;
                self.render_listing(listing).await
            }
            "\\dp" => {
                let listing = self.client.list_procedures().await;
                self.render_listing(listing).await
            }
            "\\c" => match argument {
                Some(profile) => self.meta_connect(profile).await,
                None => self.message("You must enter a profile name"),
            },
            "\\h" => {
                for line in HELP {
                    self.message(line)?;
                }
                Ok(())
            }
            _ => self.message("Unknown meta command. Type \\h for help"),
        }
    }

    fn meta_format(&mut self, argument: Option<&str>) -> Result<()> {
        let Some(keyword) = argument else {
            return self.message(&format!("Output format is {}", self.format));
        };
        match keyword.parse::<OutputFormat>() {
            Ok(format) => {
                self.format = format;
                self.message(&format!("Output format set to {format}"))
            }
            Err(e) => self.report(e),
        }
    }

    fn meta_output(&mut self, argument: Option<&str>) -> Result<()> {
        self.output.flush()?;
        match argument {
            None | Some("-") => {
                self.output = Box::new(io::stdout());
                self.message("Output redirected to standard out")
            }
            Some(path) => match File::create(path) {
                Ok(file) => {
                    self.output = Box::new(BufWriter::new(file));
                    info!(path, "output redirected");
                    self.message(&format!("Output redirected to {path}"))
                }
                Err(e) => self.message(&format!("Cannot open {path}: {e}")),
            },
        }
    }

    async fn meta_connect(&mut self, profile: &str) -> Result<()> {
        let Some(connection) = self.config.get_profile(Some(profile)).cloned() else {
            return self.report(SqlCliError::config(format!(
                "Profile '{profile}' not found in config file"
            )));
        };

        let client = match db::connect(&connection).await {
            Ok(client) => client,
            Err(e) => return self.report(e),
        };

        let previous = std::mem::replace(&mut self.client, client);
        previous.close().await?;

        info!(profile, url = %connection.display_string(), "reconnected");
        self.message(&format!("Connected to {profile}"))
    }
}
