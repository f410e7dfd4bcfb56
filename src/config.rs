//! Configuration management for sqlcli.
//!
//! Handles loading configuration from a TOML file and environment variables,
//! with support for named connection profiles and output settings.

use crate::db::DatabaseBackend;
use crate::error::{Result, SqlCliError};
use crate::render::{OutputFormat, RenderConfig, SpreadsheetConfig, XmlConfig};
use crate::scanner::ScannerConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use url::Url;

/// Environment variable consulted when no URL or profile is given.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Main configuration structure for sqlcli.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Output settings.
    #[serde(default)]
    pub output: OutputConfig,

    /// Statement scanner settings.
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// XML encoder settings.
    #[serde(default)]
    pub xml: XmlConfig,

    /// Excel encoder settings.
    #[serde(default)]
    pub spreadsheet: SpreadsheetConfig,

    /// Named connection profiles.
    #[serde(default)]
    pub profiles: HashMap<String, ConnectionConfig>,
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format keyword.
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_format() -> String {
    OutputFormat::default().as_str().to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
        }
    }
}

/// Database connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Connection URL, e.g. `sqlite://data.db` or `sqlite::memory:`.
    pub url: String,
}

impl ConnectionConfig {
    /// Creates a connection config from a URL.
    ///
    /// A bare file path is accepted and treated as a SQLite database.
    pub fn from_url(url: &str) -> Result<Self> {
        let url = url.trim();
        if url.is_empty() {
            return Err(SqlCliError::config("Connection URL is empty"));
        }
        if !url.contains(':') {
            return Ok(Self {
                url: format!("sqlite://{url}"),
            });
        }

        let config = Self {
            url: url.to_string(),
        };
        config.backend()?;
        Ok(config)
    }

    /// Returns the backend selected by the URL scheme.
    pub fn backend(&self) -> Result<DatabaseBackend> {
        let parsed = Url::parse(&self.url)
            .map_err(|e| SqlCliError::config(format!("Invalid connection URL: {e}")))?;

        DatabaseBackend::from_scheme(parsed.scheme()).ok_or_else(|| {
            SqlCliError::config(format!(
                "Invalid scheme '{}'. Expected 'sqlite'",
                parsed.scheme()
            ))
        })
    }

    /// Returns a display-safe string (no password) for messages.
    pub fn display_string(&self) -> String {
        match Url::parse(&self.url) {
            Ok(mut parsed) if parsed.password().is_some() => {
                let _ = parsed.set_password(None);
                parsed.to_string()
            }
            _ => self.url.clone(),
        }
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sqlcli")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| SqlCliError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| {
            SqlCliError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })?;
        config.output_format()?;
        Ok(config)
    }

    /// Gets a named profile, or the `default` profile if name is None.
    pub fn get_profile(&self, name: Option<&str>) -> Option<&ConnectionConfig> {
        let key = name.unwrap_or("default");
        self.profiles.get(key)
    }

    /// Returns the configured default output format.
    pub fn output_format(&self) -> Result<OutputFormat> {
        self.output.format.parse()
    }

    /// Returns the renderer settings.
    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            xml: self.xml.clone(),
            spreadsheet: self.spreadsheet.clone(),
        }
    }

    /// Resolves the connection to open.
    ///
    /// Precedence: explicit URL, then the named profile (which must exist),
    /// then the `default` profile, then `DATABASE_URL`.
    pub fn resolve_connection(
        &self,
        url: Option<&str>,
        profile: Option<&str>,
    ) -> Result<Option<ConnectionConfig>> {
        self.resolve_connection_with_env(url, profile, std::env::var(DATABASE_URL_ENV).ok())
    }

    fn resolve_connection_with_env(
        &self,
        url: Option<&str>,
        profile: Option<&str>,
        env_url: Option<String>,
    ) -> Result<Option<ConnectionConfig>> {
        if let Some(url) = url {
            return ConnectionConfig::from_url(url).map(Some);
        }

        if let Some(name) = profile {
            return self
                .get_profile(Some(name))
                .cloned()
                .map(Some)
                .ok_or_else(|| {
                    SqlCliError::config(format!("Profile '{name}' not found in config file"))
                });
        }

        if let Some(default) = self.get_profile(None) {
            return Ok(Some(default.clone()));
        }

        env_url
            .map(|url| ConnectionConfig::from_url(&url))
            .transpose()
    }
}
