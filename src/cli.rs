//! Command-line argument parsing for sqlcli.

use crate::config::Config;
use crate::error::Result;
use crate::render::OutputFormat;
use clap::Parser;
use std::path::{Path, PathBuf};

/// Run SQL statements against a database and export the results.
#[derive(Parser, Debug)]
#[command(name = "sqlcli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Database URL (e.g., sqlite://data.db) or path to a SQLite file
    #[arg(value_name = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Use a named connection profile from the config file
    #[arg(short = 'p', long, value_name = "NAME")]
    pub profile: Option<String>,

    /// Execute a single SQL statement and exit
    #[arg(short = 'e', long, value_name = "SQL", conflicts_with = "file")]
    pub execute: Option<String>,

    /// Read statements separated by semicolons from a file
    #[arg(short = 'f', long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// File to write results to ("-" for standard out)
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: Option<String>,

    /// Output format: csv, tsv, flatxml, accessxml, excel, oldtsv
    #[arg(short = 'F', long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// How statements are supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// One statement from the command line.
    Execute(String),
    /// A file of semicolon-terminated statements.
    File(PathBuf),
    /// Lines read from standard input.
    Interactive,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Returns the input mode.
    pub fn mode(&self) -> Mode {
        match (&self.execute, &self.file) {
            (Some(sql), _) => Mode::Execute(sql.clone()),
            (None, Some(path)) => Mode::File(path.clone()),
            (None, None) => Mode::Interactive,
        }
    }

    /// Resolves the output format; the --format argument wins over the
    /// config file.
    pub fn output_format(&self, config: &Config) -> Result<OutputFormat> {
        match &self.format {
            Some(keyword) => keyword.parse(),
            None => config.output_format(),
        }
    }

    /// Returns the output file, or None for standard out.
    pub fn output_path(&self) -> Option<&Path> {
        self.output
            .as_deref()
            .filter(|path| !path.is_empty() && *path != "-")
            .map(Path::new)
    }
}
