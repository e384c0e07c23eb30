//! Schema parsing, settings, and value coercion tests.

use colwire_core::block::{parse_scalar, Block};
use colwire_core::config::{PipelineConfig, Settings};
use colwire_core::literal::{self, Literal};
use colwire_core::schema::{DataType, Schema};
use colwire_core::types::Scalar;

#[test]
fn test_schema_parse_nested_types() {
    let schema = Schema::parse("id UInt64, tags Array(String), attrs Map(String, Nullable(Int32))")
        .unwrap();
    assert_eq!(schema.len(), 3);
    assert_eq!(
        schema.fields[1].data_type,
        DataType::Array(Box::new(DataType::String))
    );
    assert_eq!(
        schema.fields[2].data_type.to_string(),
        "Map(String, Nullable(Int32))"
    );
    assert_eq!(schema.index_of("attrs"), Some(2));
}

#[test]
fn test_schema_parse_errors() {
    assert!(Schema::parse("").is_err());
    assert!(Schema::parse("id").is_err());
    assert!(Schema::parse("id Int128").is_err());
    assert!(Schema::parse("s FixedString(x)").is_err());
}

#[test]
fn test_type_predicates() {
    let nullable_str = DataType::Nullable(Box::new(DataType::String));
    assert!(nullable_str.is_string_like());
    assert!(nullable_str.is_nullable());
    assert!(!nullable_str.is_numeric());
    assert!(DataType::Nullable(Box::new(DataType::Array(Box::new(DataType::UInt8)))).is_nested());
    assert!(DataType::Float32.is_numeric());
}

#[test]
fn test_settings_from_json() {
    let settings = Settings::from_json(
        r#"{"format_csv_delimiter": "\\t", "output_format_pretty_max_rows": 5}"#,
    )
    .unwrap();
    assert_eq!(settings.csv_delimiter().unwrap(), b'\t');
    assert_eq!(settings.pretty_max_rows().unwrap(), Some(5));
    assert!(!settings.pretty_color().unwrap());

    assert!(Settings::from_json("[1, 2]").is_err());
    assert!(Settings::from_json("{not json").is_err());
}

#[test]
fn test_settings_defaults() {
    let settings = Settings::new();
    assert_eq!(settings.csv_delimiter().unwrap(), b',');
    assert_eq!(settings.pretty_max_rows().unwrap(), Some(10_000));
    let unlimited = Settings::new().with("output_format_pretty_max_rows", "0");
    assert_eq!(unlimited.pretty_max_rows().unwrap(), None);
    let bad = Settings::new().with("output_format_pretty_color", "maybe");
    assert!(bad.pretty_color().is_err());
}

#[test]
fn test_pipeline_config_validation() {
    assert!(PipelineConfig::default().validate().is_ok());
    assert!(PipelineConfig::default().with_workers(0).validate().is_err());
    let cfg = PipelineConfig {
        channel_capacity: 0,
        ..PipelineConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_parse_scalar_text() {
    assert_eq!(parse_scalar(&DataType::Int8, "-128").unwrap(), Scalar::Int(-128));
    assert!(parse_scalar(&DataType::Int8, "128").is_err());
    assert!(parse_scalar(&DataType::UInt16, "-1").is_err());
    assert_eq!(parse_scalar(&DataType::UInt32, "").unwrap(), Scalar::UInt(0));
    assert_eq!(parse_scalar(&DataType::Bool, "FALSE").unwrap(), Scalar::Bool(false));
    assert!(parse_scalar(&DataType::FixedString(2), "abc").is_err());
    assert_eq!(
        parse_scalar(&DataType::DateTime, "1970-01-01 00:01:00").unwrap(),
        Scalar::DateTime(60)
    );
    assert_eq!(
        parse_scalar(&DataType::Nullable(Box::new(DataType::Int32)), "null").unwrap(),
        Scalar::Null
    );
}

#[test]
fn test_parse_nested_literals() {
    let lit = literal::parse("['a', \"b\", [1, 2]]").unwrap();
    match lit {
        Literal::List(items) => {
            assert_eq!(items.len(), 3);
            assert_eq!(items[0], Literal::Quoted("a".into()));
            assert!(matches!(items[2], Literal::List(_)));
        }
        other => panic!("expected list, got {other:?}"),
    }
    assert!(literal::parse("[1, 2").is_err());

    let map = parse_scalar(
        &DataType::Map(Box::new(DataType::String), Box::new(DataType::UInt8)),
        "{'k': 1, 'j': 2}",
    )
    .unwrap();
    assert_eq!(
        map,
        Scalar::Map(vec![
            (Scalar::from("k"), Scalar::UInt(1)),
            (Scalar::from("j"), Scalar::UInt(2)),
        ])
    );
}

#[test]
fn test_block_append_and_seal() {
    let mut block = Block::from_schema(&Schema::parse("a UInt8, b String").unwrap());
    block
        .append_row(vec![Scalar::UInt(1), Scalar::from("x")])
        .unwrap();
    assert_eq!(block.num_rows(), 1);
    assert!(block.append_row(vec![Scalar::UInt(1)]).is_err());
    assert_eq!(block.row(0), vec![Scalar::UInt(1), Scalar::from("x")]);

    let copy = block.structural_copy(4);
    assert_eq!(copy.num_rows(), 0);
    assert_eq!(copy.fields(), block.fields());
}

#[test]
fn test_rejected_row_leaves_block_intact() {
    let mut block = Block::from_schema(&Schema::parse("a UInt64, b UInt8").unwrap());
    assert!(block
        .append_row(vec![Scalar::UInt(1), Scalar::UInt(300)])
        .is_err());
    assert_eq!(block.num_rows(), 0);
    assert!(block.columns().iter().all(|c| c.is_empty()));

    block
        .append_row(vec![Scalar::UInt(2), Scalar::UInt(200)])
        .unwrap();
    assert_eq!(block.seal().unwrap(), 1);
    assert_eq!(block.row(0), vec![Scalar::UInt(2), Scalar::UInt(200)]);
}

#[test]
fn test_scalar_display() {
    assert_eq!(Scalar::Date(19_783).to_string(), "2024-03-01");
    assert_eq!(
        Scalar::Array(vec![Scalar::from("a"), Scalar::Int(1)]).to_string(),
        "['a',1]"
    );
    assert!(Scalar::Null.is_null());
}
