//! Rendering integration tests.
//!
//! Renders in-memory results through the public renderer and reads the
//! delimited output back with a standard CSV reader.

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use sqlcli::db::{BufferedRows, CellValue, ColumnDescriptor, ColumnType, TabularResult};
use sqlcli::render::{OutputFormat, Renderer};

fn person() -> TabularResult<BufferedRows> {
    let born = NaiveDate::from_ymd_opt(1984, 3, 18)
        .unwrap()
        .and_hms_opt(20, 55, 31)
        .unwrap();
    TabularResult::from_rows(
        vec![
            ColumnDescriptor::new("ID", ColumnType::Integer).with_table("PERSON"),
            ColumnDescriptor::new("NAME", ColumnType::Text).with_table("PERSON"),
            ColumnDescriptor::new("BORN", ColumnType::Timestamp).with_table("PERSON"),
        ],
        vec![
            vec![CellValue::Integer(1), CellValue::from("a,b"), CellValue::Null],
            vec![
                CellValue::Integer(2),
                CellValue::from("Ηλέκτρα"),
                CellValue::Timestamp(born),
            ],
        ],
    )
}

fn render(result: TabularResult<BufferedRows>, format: OutputFormat) -> Vec<u8> {
    let mut out = Vec::new();
    Renderer::default().render(result, format, &mut out).unwrap();
    out
}

fn tricky_values() -> Vec<&'static str> {
    vec![
        "plain",
        "comma, inside",
        "tab\tinside",
        "say \"hi\"",
        "two\nlines",
        "crlf\r\nline",
        "\"",
        " padded ",
    ]
}

fn round_trip(format: OutputFormat, delimiter: u8) {
    let values = tricky_values();
    let result = TabularResult::from_rows(
        vec![
            ColumnDescriptor::new("N", ColumnType::Integer),
            ColumnDescriptor::new("V", ColumnType::Text),
        ],
        values
            .iter()
            .enumerate()
            .map(|(i, v)| vec![CellValue::Integer(i as i64), CellValue::from(*v)])
            .collect(),
    );

    let out = render(result, format);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(out.as_slice());

    let headers = reader.headers().unwrap().clone();
    assert_eq!(headers.iter().collect::<Vec<_>>(), vec!["N", "V"]);

    let read: Vec<String> = reader
        .records()
        .map(|record| record.unwrap()[1].to_string())
        .collect();
    assert_eq!(read, values);
}

#[test]
fn test_csv_round_trip() {
    round_trip(OutputFormat::Csv, b',');
}

#[test]
fn test_tsv_round_trip() {
    round_trip(OutputFormat::Tsv, b'\t');
}

#[test]
fn test_csv_example() {
    let out = String::from_utf8(render(person(), OutputFormat::Csv)).unwrap();
    assert_eq!(
        out,
        "ID,NAME,BORN\r\n1,\"a,b\",\r\n2,Ηλέκτρα,1984-03-18 20:55:31.0\r\n"
    );
}

#[test]
fn test_flat_xml_example() {
    let out = String::from_utf8(render(person(), OutputFormat::FlatXml)).unwrap();
    let expected = "<?xml version='1.0' encoding='UTF-8'?>\n\
                    <dataset>\n\
                    \x20 <PERSON ID=\"1\" NAME=\"a,b\"/>\n\
                    \x20 <PERSON ID=\"2\" NAME=\"Ηλέκτρα\" BORN=\"1984-03-18 20:55:31.0\"/>\n\
                    </dataset>\n";
    assert_eq!(out, expected);
}

#[test]
fn test_access_xml_example() {
    let out = String::from_utf8(render(person(), OutputFormat::AccessXml)).unwrap();
    assert!(out.starts_with("<?xml version='1.0' encoding='UTF-8'?>\n<dataroot>\n"));
    assert!(out.contains("  <PERSON>\n    <ID>1</ID>\n    <NAME>a,b</NAME>\n  </PERSON>\n"));
    assert!(!out.contains("<BORN></BORN>"));
}

#[test]
fn test_old_tsv_marks_nulls() {
    let out = String::from_utf8(render(person(), OutputFormat::OldTsv)).unwrap();
    assert_eq!(
        out,
        "1\ta,b\t\\N\n2\tΗλέκτρα\t1984-03-18 20:55:31.0\n"
    );
}

#[test]
fn test_excel_is_a_zip_container() {
    let out = render(person(), OutputFormat::Excel);
    assert!(out.starts_with(b"PK\x03\x04"));
}

#[test]
fn test_excel_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("person.xlsx");
    let mut file = std::fs::File::create(&path).unwrap();

    let rows = Renderer::default()
        .render(person(), OutputFormat::Excel, &mut file)
        .unwrap();
    assert_eq!(rows, 2);
    assert!(std::fs::metadata(&path).unwrap().len() > 0);
}
