//! sqlcli - run SQL statements and export result sets.

use sqlcli::cli::{Cli, Mode};
use sqlcli::config::Config;
use sqlcli::db;
use sqlcli::error::{Result, SqlCliError};
use sqlcli::logging;
use sqlcli::session::Session;
use std::fs::File;
use std::io::BufWriter;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    logging::init_stderr_logging();

    if let Err(e) = run().await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    // Validated before connecting so a typo costs nothing.
    let format = cli.output_format(&config)?;

    let connection = config
        .resolve_connection(cli.database_url.as_deref(), cli.profile.as_deref())?
        .ok_or_else(|| {
            SqlCliError::config(
                "No database given. Pass a URL, use --profile, or set DATABASE_URL",
            )
        })?;
    info!("Connection: {}", connection.display_string());

    let client = db::connect(&connection).await?;
    let mut session = Session::new(client, config, format);
    if let Some(path) = cli.output_path() {
        let file = File::create(path)?;
        session = session.with_output(Box::new(BufWriter::new(file)));
    }

    match cli.mode() {
        Mode::Execute(sql) => session.execute_statement(sql.trim().trim_end_matches(';')).await?,
        Mode::File(path) => {
            let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
                SqlCliError::config(format!("Failed to read {}: {e}", path.display()))
            })?;
            session.run_batch(&text).await?;
        }
        Mode::Interactive => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            session.run_interactive(stdin).await?;
        }
    }

    session.close().await
}
