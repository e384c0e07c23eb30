//! Native in-process values.
//!
//! `Scalar` is what the typed-value insert path hands to the engine and what
//! column storage gives back when a `Block` is rendered as text.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::temporal;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    F32(f32),
    F64(f64),
    Str(String),
    /// Days since 1970-01-01.
    Date(i32),
    /// Seconds since the Unix epoch.
    DateTime(u32),
    Array(Vec<Scalar>),
    Map(Vec<(Scalar, Scalar)>),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Append the literal form used inside arrays and maps: strings and dates
    /// are wrapped in `quote`, with backslash and the quote itself escaped.
    pub fn write_literal(&self, out: &mut String, quote: char) {
        match self {
            Scalar::Str(_) | Scalar::Date(_) | Scalar::DateTime(_) => {
                out.push(quote);
                for ch in self.to_string().chars() {
                    if ch == quote || ch == '\\' {
                        out.push('\\');
                    }
                    out.push(ch);
                }
                out.push(quote);
            }
            Scalar::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    item.write_literal(out, quote);
                }
                out.push(']');
            }
            Scalar::Map(entries) => {
                out.push('{');
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    k.write_literal(out, quote);
                    out.push(':');
                    v.write_literal(out, quote);
                }
                out.push('}');
            }
            other => {
                use std::fmt::Write;
                let _ = write!(out, "{other}");
            }
        }
    }
}

/// Plain text form; nested values use single-quoted literals.
impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("NULL"),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::UInt(v) => write!(f, "{v}"),
            Scalar::F32(v) => write!(f, "{v}"),
            Scalar::F64(v) => write!(f, "{v}"),
            Scalar::Str(s) => f.write_str(s),
            Scalar::Date(days) => f.write_str(&temporal::format_date(*days)),
            Scalar::DateTime(secs) => f.write_str(&temporal::format_datetime(*secs)),
            Scalar::Array(_) | Scalar::Map(_) => {
                let mut out = String::new();
                self.write_literal(&mut out, '\'');
                f.write_str(&out)
            }
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(v as i64)
    }
}

impl From<u64> for Scalar {
    fn from(v: u64) -> Self {
        Scalar::UInt(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::F64(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Str(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Str(v)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Scalar::Null)
    }
}
