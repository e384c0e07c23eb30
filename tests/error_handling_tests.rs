//! Error handling and context tests

mod test_data_gen;

use colwire_core::config::Settings;
use colwire_core::error::Error;
use colwire_exec::ExecError;
use colwire_io::Format;

use test_data_gen::read_cells;

#[test]
fn test_error_with_context() {
    let base_error = Error::Schema("unknown column 'xyz'".to_string());
    let contextual_error = base_error.with_context("while reading JSON row");

    match contextual_error {
        Error::Context { context, .. } => {
            assert_eq!(context, "while reading JSON row");
        }
        _ => panic!("Expected Context variant"),
    }
}

#[test]
fn test_error_suggestions() {
    let schema_error = Error::Schema("unknown column 'xyz'".to_string());
    let suggestions = schema_error.suggestions();
    assert!(!suggestions.is_empty());
    assert!(suggestions.iter().any(|s| s.contains("column")));
}

#[test]
fn test_delimiter_error_suggestions() {
    let err = Settings::new()
        .with("format_csv_delimiter", "ab")
        .csv_delimiter()
        .unwrap_err();
    let suggestions = err.suggestions();
    assert!(suggestions.iter().any(|s| s.contains("single character")));
}

#[test]
fn test_unknown_type_suggestions() {
    let err = "int32".parse::<colwire_core::schema::DataType>().unwrap_err();
    assert!(matches!(err, Error::UnknownType(_)));
    assert!(err.suggestions().iter().any(|s| s.contains("case-sensitive")));
}

#[test]
fn test_mem_error_with_context() {
    use colwire_mem::error::Error as MemError;

    let base_error = MemError::ColumnCount {
        expected: 3,
        found: 2,
    };
    let contextual_error = base_error.with_context("closing row 7");

    match contextual_error {
        MemError::Arena(msg) => {
            assert!(msg.contains("closing row 7"));
            assert!(msg.contains("3 columns"));
        }
        _ => panic!("Expected Arena variant"),
    }
}

#[test]
fn test_mem_error_suggestions() {
    use colwire_mem::error::Error as MemError;

    let err = MemError::ColumnCount {
        expected: 3,
        found: 2,
    };
    let suggestions = err.suggestions();
    assert!(suggestions.iter().any(|s| s.contains("delimiter")));
}

#[test]
fn test_duplicate_json_key_is_rejected() {
    let err = read_cells(
        Format::Json,
        r#"[{"id":1,"id":2}]"#,
        "id UInt64, name String",
        &Settings::new(),
        10,
    )
    .unwrap_err();
    assert!(matches!(err.root(), colwire_io::Error::Mem(_)));
}

#[test]
fn test_format_error_suggestions() {
    let err = Format::from_name("xml").unwrap_err();
    assert!(err
        .suggestions()
        .iter()
        .any(|s| s.contains("CSVWithNames")));

    let err = read_cells(
        Format::Csv,
        "1;2\n",
        "a UInt8, b UInt8",
        &Settings::new(),
        10,
    )
    .unwrap_err();
    assert!(err.suggestions().iter().any(|s| s.contains("delimiter")));
}

#[test]
fn test_exec_error_suggestions() {
    let err = ExecError::Read {
        row: 4,
        source: colwire_io::Error::UnknownColumn("zzz".into()),
    };
    assert!(err.to_string().contains("row 4"));
    assert!(err.suggestions().iter().any(|s| s.contains("JSON keys")));

    let err = ExecError::RowCountMismatch {
        read: 10,
        emitted: 9,
    };
    assert_eq!(err.to_string(), "row count mismatch: 10 rows in, 9 rows out");
    assert!(!err.suggestions().is_empty());

    assert!(ExecError::Canceled("x".into()).is_canceled());
    assert!(!ExecError::Disconnected.is_canceled());
}
