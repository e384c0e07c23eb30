//! Frame writers: the text side of the block -> text path.
//!
//! Cells are rendered to strings by a [`CellEncoder`] (this runs on the
//! parallel stringify workers); a [`FrameWriter`] then lays the rendered rows
//! out in its format, strictly in frame order.

pub mod csv;
pub mod json;
pub mod pretty;
pub mod values;

pub use self::csv::CsvWriter;
pub use self::json::JsonWriter;
pub use self::pretty::PrettyWriter;
pub use self::values::ValuesWriter;

use std::fmt::Write as _;

use colwire_core::schema::Field;
use colwire_core::types::Scalar;
use colwire_mem::RowTexts;

use crate::error::Result;

/// Per-format rendering of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellEncoder {
    Csv,
    Json,
    Values,
    Pretty,
}

impl CellEncoder {
    pub fn encode(&self, field: &Field, value: &Scalar, out: &mut String) {
        match self {
            CellEncoder::Csv => encode_csv(field, value, out),
            CellEncoder::Json => encode_json(value, out),
            CellEncoder::Values => encode_values(value, out),
            CellEncoder::Pretty => {
                let _ = write!(out, "{value}");
            }
        }
    }
}

fn encode_csv(field: &Field, value: &Scalar, out: &mut String) {
    if value.is_null() {
        out.push_str("\\N");
        return;
    }
    let quoted = field.data_type.is_string_like()
        || field.data_type.is_nested()
        || matches!(value, Scalar::Str(_) | Scalar::Array(_) | Scalar::Map(_));
    if !quoted {
        let _ = write!(out, "{value}");
        return;
    }
    out.push('"');
    for ch in value.to_string().chars() {
        if ch == '"' {
            out.push('"');
        }
        out.push(ch);
    }
    out.push('"');
}

/// JSON string escaping as the output format defines it: backslash is
/// doubled, `/` becomes `\/`, `"` is doubled, and U+2028 / U+2029 are
/// replaced by the literal text `\u2028` / `\u2029`. Everything else passes
/// through unchanged.
pub fn json_escape(s: &str, out: &mut String) {
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            '/' => out.push_str("\\/"),
            '"' => out.push_str("\"\""),
            other => out.push(other),
        }
    }
}

fn json_string(s: &str, out: &mut String) {
    out.push('"');
    json_escape(s, out);
    out.push('"');
}

fn encode_json(value: &Scalar, out: &mut String) {
    match value {
        Scalar::Null => out.push_str("null"),
        Scalar::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Scalar::Int(v) => {
            let _ = write!(out, "{v}");
        }
        Scalar::UInt(v) => {
            let _ = write!(out, "{v}");
        }
        Scalar::F32(v) if v.is_finite() => {
            let _ = write!(out, "{v}");
        }
        Scalar::F64(v) if v.is_finite() => {
            let _ = write!(out, "{v}");
        }
        Scalar::F32(_) | Scalar::F64(_) => out.push_str("null"),
        Scalar::Str(_) | Scalar::Date(_) | Scalar::DateTime(_) => {
            json_string(&value.to_string(), out)
        }
        Scalar::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                encode_json(item, out);
            }
            out.push(']');
        }
        Scalar::Map(entries) => {
            out.push('{');
            for (i, (k, v)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                json_string(&k.to_string(), out);
                out.push(':');
                encode_json(v, out);
            }
            out.push('}');
        }
    }
}

fn encode_values(value: &Scalar, out: &mut String) {
    match value {
        Scalar::Null => out.push_str("NULL"),
        Scalar::Str(_) | Scalar::Date(_) | Scalar::DateTime(_) => {
            value.write_literal(out, '\'')
        }
        other => {
            let _ = write!(out, "{other}");
        }
    }
}

/// Output half of a format.
///
/// The write path calls `write_first_frame` once, `write_frame_cont` for every
/// later frame, `end_of_stream` after the last frame of a successful stream,
/// and `flush` on every exit path.
pub trait FrameWriter: Send {
    fn encoder(&self) -> CellEncoder;

    fn write_first_frame(&mut self, columns: &[Field], rows: &RowTexts) -> Result<()>;

    fn write_frame_cont(&mut self, columns: &[Field], rows: &RowTexts) -> Result<()>;

    /// Trailing summary after all rows. `columns` is empty when no frame
    /// arrived.
    fn end_of_stream(&mut self, columns: &[Field], total_rows: u64) -> Result<()> {
        let _ = (columns, total_rows);
        Ok(())
    }

    fn flush(&mut self) -> Result<()>;
}
