//! Format reader tests: element grammar, row framing, and error positions.

mod test_data_gen;

use std::io::Cursor;

use colwire_core::config::Settings;
use colwire_io::{Error, Format, TableReader};
use colwire_mem::FrameBuffer;

use test_data_gen::{arena_rows, fields, read_cells};

fn rows(cells: &[&[&str]]) -> Vec<Vec<String>> {
    cells
        .iter()
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .collect()
}

#[test]
fn test_csv_basic_rows() {
    let got = read_cells(
        Format::Csv,
        "1,hello\n2,world\n",
        "id UInt64, name String",
        &Settings::new(),
        10,
    )
    .unwrap();
    assert_eq!(got, rows(&[&["1", "hello"], &["2", "world"]]));
}

#[test]
fn test_csv_custom_delimiter_and_quotes() {
    let settings = Settings::new().with("format_csv_delimiter", "|");
    let input = "1|\"a|b\"\n2|\"say \"\"hi\"\"\"\n3|\"tab\\there\"\n";
    let got = read_cells(Format::Csv, input, "id UInt64, name String", &settings, 10).unwrap();
    assert_eq!(
        got,
        rows(&[&["1", "a|b"], &["2", "say \"hi\""], &["3", "tab\there"]])
    );
}

#[test]
fn test_csv_crlf_line_endings() {
    let input = "1,a\r\n2,\"b\"\r\n";
    let got = read_cells(Format::Csv, input, "id UInt64, name String", &Settings::new(), 10)
        .unwrap();
    assert_eq!(got, rows(&[&["1", "a"], &["2", "b"]]));
}

#[test]
fn test_csv_without_trailing_newline() {
    let got = read_cells(Format::Csv, "7,last", "id UInt64, name String", &Settings::new(), 10)
        .unwrap();
    assert_eq!(got, rows(&[&["7", "last"]]));
}

#[test]
fn test_csv_skips_blank_lines_between_rows() {
    let got = read_cells(
        Format::Csv,
        "1,a\n\n2,b\n\n",
        "id UInt64, name String",
        &Settings::new(),
        10,
    )
    .unwrap();
    assert_eq!(got, rows(&[&["1", "a"], &["2", "b"]]));
}

#[test]
fn test_csv_with_names_skips_header() {
    let got = read_cells(
        Format::CsvWithNames,
        "\"id\",\"name\"\n1,a\n",
        "id UInt64, name String",
        &Settings::new(),
        10,
    )
    .unwrap();
    assert_eq!(got, rows(&[&["1", "a"]]));
}

#[test]
fn test_csv_nested_columns_keep_bracketed_text() {
    let got = read_cells(
        Format::Csv,
        "[1,2,3],x\n[],y\n",
        "xs Array(UInt8), s String",
        &Settings::new(),
        10,
    )
    .unwrap();
    assert_eq!(got, rows(&[&["[1,2,3]", "x"], &["[]", "y"]]));
}

#[test]
fn test_csv_short_row_reports_row_and_column() {
    let columns = fields("id UInt64, name String");
    let mut reader = Format::Csv
        .reader(Cursor::new(b"1,a\n2\n3,c\n".to_vec()), &Settings::new())
        .unwrap();
    let mut arena = FrameBuffer::new(columns.len(), 10);
    let err = reader
        .read_first_column_texts(&mut arena, &columns, 10)
        .unwrap_err();

    assert!(matches!(err, Error::Row { row: 1, .. }), "got {err:?}");
    assert_eq!(err.column(), Some(0));
    assert!(matches!(
        err.root(),
        Error::UnexpectedByte { found: b'\n', .. }
    ));
    // The complete row before the failure is kept; the partial one is not.
    assert_eq!(arena_rows(&arena), rows(&[&["1", "a"]]));
}

#[test]
fn test_csv_truncated_row_is_unexpected_eof() {
    let err = read_cells(Format::Csv, "1", "id UInt64, name String", &Settings::new(), 10)
        .unwrap_err();
    assert_eq!(err.column(), Some(0));
    assert!(matches!(err.root(), Error::UnexpectedEof(_)));
}

#[test]
fn test_csv_unterminated_quote() {
    let err = read_cells(
        Format::Csv,
        "1,\"open\n",
        "id UInt64, name String",
        &Settings::new(),
        10,
    )
    .unwrap_err();
    assert_eq!(err.column(), Some(1));
    assert!(matches!(err.root(), Error::UnexpectedEof("quoted value")));
}

#[test]
fn test_batches_stop_at_max_rows() {
    let columns = fields("id UInt64, name String");
    let mut reader = Format::Csv
        .reader(Cursor::new(b"1,a\n2,b\n3,c\n".to_vec()), &Settings::new())
        .unwrap();

    let mut arena = FrameBuffer::new(columns.len(), 2);
    let first = reader
        .read_first_column_texts(&mut arena, &columns, 2)
        .unwrap();
    assert_eq!(first.rows, 2);
    assert!(!first.eof);

    let mut arena = FrameBuffer::new(columns.len(), 2);
    let rest = reader
        .read_column_texts_cont(&mut arena, &columns, 2)
        .unwrap();
    assert_eq!(rest.rows, 1);
    assert!(rest.eof);
    assert_eq!(arena_rows(&arena), rows(&[&["3", "c"]]));
}

#[test]
fn test_json_envelope_with_meta() {
    let input = r#"{
        "meta": [{"name": "id", "type": "UInt64"}, {"name": "name", "type": "String"}],
        "data": [
            {"id": 1, "name": "a"},
            {"name": "b", "id": 2}
        ],
        "rows": 2
    }"#;
    let got = read_cells(Format::Json, input, "id UInt64, name String", &Settings::new(), 10)
        .unwrap();
    assert_eq!(got.len(), 2);
    assert_eq!(got[0][1], "a");
    assert_eq!(got[1][1], "b");
    // Unquoted values may carry surrounding whitespace; conversion trims it.
    assert_eq!(got[0][0].trim(), "1");
    assert_eq!(got[1][0].trim(), "2");
}

#[test]
fn test_json_bare_array_and_missing_keys() {
    let got = read_cells(
        Format::Json,
        r#"[{"id":1,"name":"a"},{"id":3}]"#,
        "id UInt64, name String",
        &Settings::new(),
        10,
    )
    .unwrap();
    assert_eq!(got, rows(&[&["1", "a"], &["3", ""]]));
}

#[test]
fn test_json_empty_document_has_no_rows() {
    let got = read_cells(
        Format::Json,
        r#"{"meta": [], "data": [], "rows": 0}"#,
        "id UInt64",
        &Settings::new(),
        10,
    )
    .unwrap();
    assert!(got.is_empty());
}

#[test]
fn test_json_unicode_escapes() {
    let got = read_cells(
        Format::Json,
        r#"[{"id":1,"name":"caf\u00e9 \ud83d\ude00"}]"#,
        "id UInt64, name String",
        &Settings::new(),
        10,
    )
    .unwrap();
    assert_eq!(got[0][1], "café 😀");
}

#[test]
fn test_json_nested_value_text() {
    let got = read_cells(
        Format::Json,
        r#"[{"id":1,"tags":["a","b"]}]"#,
        "id UInt64, tags Array(String)",
        &Settings::new(),
        10,
    )
    .unwrap();
    assert_eq!(got, rows(&[&["1", r#"["a","b"]"#]]));
}

#[test]
fn test_json_unknown_key_is_error() {
    let err = read_cells(
        Format::Json,
        r#"[{"id":1,"zzz":2}]"#,
        "id UInt64",
        &Settings::new(),
        10,
    )
    .unwrap_err();
    assert!(matches!(err.root(), Error::UnknownColumn(k) if k == "zzz"));
    assert!(!err.suggestions().is_empty());
}

#[test]
fn test_values_rows() {
    let got = read_cells(
        Format::Values,
        "(1,'a'), (2, 'it''s');\n",
        "id UInt64, name String",
        &Settings::new(),
        10,
    )
    .unwrap();
    assert_eq!(got, rows(&[&["1", "a"], &["2", "it's"]]));
}

#[test]
fn test_values_nested_and_null() {
    let got = read_cells(
        Format::Values,
        "(1,[1,2],NULL)",
        "id UInt64, xs Array(UInt8), n Nullable(String)",
        &Settings::new(),
        10,
    )
    .unwrap();
    assert_eq!(got, rows(&[&["1", "[1,2]", "NULL"]]));
}

#[test]
fn test_values_requires_parenthesis() {
    let err = read_cells(
        Format::Values,
        "1,2",
        "a UInt8, b UInt8",
        &Settings::new(),
        10,
    )
    .unwrap_err();
    assert!(matches!(err.root(), Error::UnexpectedByte { found: b'1', .. }));
}

#[test]
fn test_values_unterminated_row() {
    let err = read_cells(
        Format::Values,
        "(1,2",
        "a UInt8, b UInt8",
        &Settings::new(),
        10,
    )
    .unwrap_err();
    assert_eq!(err.column(), Some(1));
    assert!(matches!(err.root(), Error::UnexpectedEof(_)));
}

#[test]
fn test_format_names() {
    assert_eq!(Format::from_name("csvwithnames").unwrap(), Format::CsvWithNames);
    assert_eq!("json".parse::<Format>().unwrap(), Format::Json);
    assert_eq!(Format::Values.to_string(), "Values");
    assert!(matches!(
        Format::from_name("parquet"),
        Err(Error::UnknownFormat(_))
    ));
    assert!(Format::all().iter().all(|f| f.can_write()));
    assert!(!Format::Pretty.can_read());
}

#[test]
fn test_pretty_cannot_be_read() {
    let err = Format::Pretty
        .reader(Cursor::new(Vec::new()), &Settings::new())
        .err()
        .unwrap();
    assert!(matches!(err, Error::Unsupported("Pretty", _)));
}

#[test]
fn test_invalid_delimiter_setting() {
    let settings = Settings::new().with("format_csv_delimiter", "||");
    let err = Format::Csv
        .reader(Cursor::new(Vec::new()), &settings)
        .err()
        .unwrap();
    assert!(matches!(err, Error::Core(_)));
}

#[test]
fn test_escaped_delimiter_with_quotes_matches_default() {
    let piped = Settings::new().with("format_csv_delimiter", "\\|");
    let quoted = read_cells(Format::Csv, "'1'|'2'\n", "a UInt8, b UInt8", &piped, 10).unwrap();
    let plain = read_cells(Format::Csv, "1,2\n", "a UInt8, b UInt8", &Settings::new(), 10)
        .unwrap();
    assert_eq!(quoted, plain);
}

#[test]
fn test_json_meta_is_optional() {
    let schema = "a UInt8, b UInt8";
    let bare = read_cells(
        Format::Json,
        r#"{"data":[{"a":1,"b":2}]}"#,
        schema,
        &Settings::new(),
        10,
    )
    .unwrap();
    let with_meta = read_cells(
        Format::Json,
        r#"{"meta":[{"name":"a","type":"UInt8"},{"name":"b","type":"UInt8"}],"data":[{"a":1,"b":2}]}"#,
        schema,
        &Settings::new(),
        10,
    )
    .unwrap();
    assert_eq!(bare, with_meta);
    assert_eq!(bare, rows(&[&["1", "2"]]));
}
