//! Session integration tests.
//!
//! Runs batch and interactive input against SQLite databases and checks
//! what lands in the output files.

use pretty_assertions::assert_eq;
use sqlcli::config::{Config, ConnectionConfig};
use sqlcli::db;
use sqlcli::render::OutputFormat;
use sqlcli::session::Session;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Shared in-memory sink for control messages.
#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn sqlite_url(path: &Path) -> String {
    format!("sqlite://{}?mode=rwc", path.display())
}

async fn memory_session(config: Config, format: OutputFormat, output: &Path) -> (Session, SharedBuf) {
    let connection = ConnectionConfig::from_url("sqlite::memory:").unwrap();
    let client = db::connect(&connection).await.unwrap();
    let control = SharedBuf::default();
    let session = Session::new(client, config, format)
        .with_output(Box::new(BufWriter::new(File::create(output).unwrap())))
        .with_control(Box::new(control.clone()));
    (session, control)
}

const SEED: &str = "
create table person (id integer, name text, born datetime);
insert into person values (1, 'a,b', null);
insert into person values (2, 'it''s; fine', '1984-03-18 20:55:31');
";

#[tokio::test]
async fn test_batch_to_csv_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.csv");
    let (mut session, control) = memory_session(Config::default(), OutputFormat::Csv, &out).await;

    session.run_batch(SEED).await.unwrap();
    session
        .run_batch("select id, name, born from person order by id;\n")
        .await
        .unwrap();
    session.close().await.unwrap();

    assert_eq!(
        std::fs::read_to_string(&out).unwrap(),
        "id,name,born\r\n1,\"a,b\",\r\n2,it's; fine,1984-03-18 20:55:31.0\r\n"
    );
    assert!(control.text().is_empty());
}

#[tokio::test]
async fn test_empty_result_still_has_header() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.tsv");
    let (mut session, _) = memory_session(Config::default(), OutputFormat::Tsv, &out).await;

    session
        .run_batch("create table t (a integer, b text);\nselect a, b from t;\n")
        .await
        .unwrap();
    session.close().await.unwrap();

    assert_eq!(std::fs::read_to_string(&out).unwrap(), "a\tb\r\n");
}

#[tokio::test]
async fn test_sql_error_reported_and_batch_continues() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.csv");
    let (mut session, control) = memory_session(Config::default(), OutputFormat::Csv, &out).await;

    session
        .run_batch("select * from missing;\nselect 1 as one;\n")
        .await
        .unwrap();
    session.close().await.unwrap();

    assert!(control.text().contains("no such table: missing"));
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "one\r\n1\r\n");
}

#[tokio::test]
async fn test_output_redirect_meta_command() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.txt");
    let second = dir.path().join("second.xml");
    let (mut session, control) = memory_session(Config::default(), OutputFormat::Csv, &first).await;

    let script = format!(
        "select 'x' as v;\n\\o {}\n\\f flatxml\nselect 'y' as v;\n",
        second.display()
    );
    session.run_batch(&script).await.unwrap();
    session.close().await.unwrap();

    assert_eq!(std::fs::read_to_string(&first).unwrap(), "v\r\nx\r\n");
    assert_eq!(
        std::fs::read_to_string(&second).unwrap(),
        "<?xml version='1.0' encoding='UTF-8'?>\n<dataset>\n  <row v=\"y\"/>\n</dataset>\n"
    );
    assert!(control.text().contains("Output redirected to"));
    assert!(control.text().contains("Output format set to flatxml"));
}

#[tokio::test]
async fn test_interactive_input() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");
    let (mut session, control) =
        memory_session(Config::default(), OutputFormat::OldTsv, &out).await;

    let input: &[u8] = b"create table t (a integer);\nselect 'multi\nline' as v,\nnull as n;\n\\dt\n";
    session.run_interactive(input).await.unwrap();
    session.close().await.unwrap();

    assert_eq!(
        std::fs::read_to_string(&out).unwrap(),
        "multi\nline\t\\N\nt\tTABLE\n"
    );
    assert_eq!(control.text(), "SQL> SQL> '>   -> SQL> SQL> ");
}

#[tokio::test]
async fn test_reconnect_with_profile() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("scratch.db");
    let out = dir.path().join("out.csv");
    let config: Config = toml::from_str(&format!(
        "[profiles.scratch]\nurl = \"{}\"\n",
        sqlite_url(&db_path)
    ))
    .unwrap();
    let (mut session, control) = memory_session(config, OutputFormat::Csv, &out).await;

    session
        .run_batch(
            "create table only_in_memory (x integer);\n\
             \\c scratch\n\
             create table t (x integer);\n\
             insert into t values (5);\n\
             select x from t;\n\
             select * from only_in_memory;\n",
        )
        .await
        .unwrap();
    session.close().await.unwrap();

    assert!(control.text().contains("Connected to scratch"));
    assert!(control.text().contains("no such table: only_in_memory"));
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "x\r\n5\r\n");
}

#[tokio::test]
async fn test_interactive_line_runs_every_statement() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.csv");
    let (mut session, control) = memory_session(Config::default(), OutputFormat::Csv, &out).await;

    let input: &[u8] =
        b"create table t (a integer); insert into t values (7);\nselect a from t;\n";
    session.run_interactive(input).await.unwrap();
    session.close().await.unwrap();

    assert_eq!(std::fs::read_to_string(&out).unwrap(), "a\r\n7\r\n");
    assert_eq!(control.text(), "SQL> SQL> SQL> ");
}

#[tokio::test]
async fn test_large_result_is_streamed_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.tsv");
    let (mut session, control) = memory_session(Config::default(), OutputFormat::OldTsv, &out).await;

    session
        .run_batch(
            "with recursive c(x) as (select 1 union all select x + 1 from c where x < 5000)\n\
             select x from c;\n\
             select count(*) from (select 1 union all select 2);\n",
        )
        .await
        .unwrap();
    session.close().await.unwrap();

    let text = std::fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 5001);
    assert_eq!(lines[0], "1");
    assert_eq!(lines[4999], "5000");
    assert_eq!(lines[5000], "2");
    assert!(control.text().is_empty());
}
