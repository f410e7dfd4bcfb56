//! Configuration file integration tests.

use sqlcli::config::Config;
use sqlcli::render::OutputFormat;
use std::io::Write;

#[test]
fn test_missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load_from_file(&dir.path().join("absent.toml")).unwrap();

    assert_eq!(config.output_format().unwrap(), OutputFormat::Tsv);
    assert!(config.profiles.is_empty());
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[output]
format = "excel"

[spreadsheet]
sheet_name = "Report"
datetime_format = "yyyy-mm-dd hh:mm"

[profiles.default]
url = "sqlite::memory:"
"#
    )
    .unwrap();

    let config = Config::load_from_file(file.path()).unwrap();
    assert_eq!(config.output_format().unwrap(), OutputFormat::Excel);

    let render = config.render_config();
    assert_eq!(render.spreadsheet.sheet_name, "Report");
    assert_eq!(render.spreadsheet.datetime_format, "yyyy-mm-dd hh:mm");
    assert_eq!(render.spreadsheet.date_format, "dd/mm/yyyy");

    let connection = config.resolve_connection(None, None).unwrap().unwrap();
    assert_eq!(connection.url, "sqlite::memory:");
}

#[test]
fn test_invalid_file_reports_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[output").unwrap();

    let err = Config::load_from_file(file.path()).unwrap_err();
    assert_eq!(err.category(), "Configuration Error");
    assert!(err
        .to_string()
        .contains(&file.path().display().to_string()));
}

#[test]
fn test_explicit_url_wins_over_profiles() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[profiles.default]\nurl = \"sqlite://default.db\"").unwrap();

    let config = Config::load_from_file(file.path()).unwrap();
    let connection = config
        .resolve_connection(Some("sqlite://explicit.db"), None)
        .unwrap()
        .unwrap();
    assert_eq!(connection.url, "sqlite://explicit.db");
}
