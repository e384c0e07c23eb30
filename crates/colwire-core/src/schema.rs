//! Logical schema types. Pure data.
//!
//! Type names follow the server's spelling (`Int32`, `Nullable(String)`,
//! `Map(String, UInt64)`) so they can round-trip through JSON `meta` and
//! CLI arguments.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    String,
    FixedString(usize),
    Date,
    DateTime,
    Nullable(Box<DataType>),
    Array(Box<DataType>),
    Map(Box<DataType>, Box<DataType>),
}

impl DataType {
    /// Columns whose text is captured bracket-balanced rather than up to a stop byte.
    pub fn is_nested(&self) -> bool {
        match self {
            DataType::Array(_) | DataType::Map(_, _) => true,
            DataType::Nullable(inner) => inner.is_nested(),
            _ => false,
        }
    }

    /// Strings and date-like values; writers quote these.
    pub fn is_string_like(&self) -> bool {
        match self {
            DataType::String | DataType::FixedString(_) | DataType::Date | DataType::DateTime => {
                true
            }
            DataType::Nullable(inner) => inner.is_string_like(),
            _ => false,
        }
    }

    pub fn is_numeric(&self) -> bool {
        match self {
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64 => true,
            DataType::Nullable(inner) => inner.is_numeric(),
            _ => false,
        }
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, DataType::Nullable(_))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Bool => f.write_str("Bool"),
            DataType::Int8 => f.write_str("Int8"),
            DataType::Int16 => f.write_str("Int16"),
            DataType::Int32 => f.write_str("Int32"),
            DataType::Int64 => f.write_str("Int64"),
            DataType::UInt8 => f.write_str("UInt8"),
            DataType::UInt16 => f.write_str("UInt16"),
            DataType::UInt32 => f.write_str("UInt32"),
            DataType::UInt64 => f.write_str("UInt64"),
            DataType::Float32 => f.write_str("Float32"),
            DataType::Float64 => f.write_str("Float64"),
            DataType::String => f.write_str("String"),
            DataType::FixedString(n) => write!(f, "FixedString({n})"),
            DataType::Date => f.write_str("Date"),
            DataType::DateTime => f.write_str("DateTime"),
            DataType::Nullable(inner) => write!(f, "Nullable({inner})"),
            DataType::Array(inner) => write!(f, "Array({inner})"),
            DataType::Map(k, v) => write!(f, "Map({k}, {v})"),
        }
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let simple = match s {
            "Bool" | "Boolean" => Some(DataType::Bool),
            "Int8" => Some(DataType::Int8),
            "Int16" => Some(DataType::Int16),
            "Int32" => Some(DataType::Int32),
            "Int64" => Some(DataType::Int64),
            "UInt8" => Some(DataType::UInt8),
            "UInt16" => Some(DataType::UInt16),
            "UInt32" => Some(DataType::UInt32),
            "UInt64" => Some(DataType::UInt64),
            "Float32" => Some(DataType::Float32),
            "Float64" => Some(DataType::Float64),
            "String" => Some(DataType::String),
            "Date" => Some(DataType::Date),
            "DateTime" => Some(DataType::DateTime),
            _ => None,
        };
        if let Some(dt) = simple {
            return Ok(dt);
        }

        let (head, args) = s
            .strip_suffix(')')
            .and_then(|rest| rest.split_once('('))
            .ok_or_else(|| Error::UnknownType(s.to_string()))?;
        let args = split_top_level(args, ',');
        match (head.trim(), args.as_slice()) {
            ("Nullable", [inner]) => Ok(DataType::Nullable(Box::new(inner.parse()?))),
            ("Array", [inner]) => Ok(DataType::Array(Box::new(inner.parse()?))),
            ("Map", [k, v]) => Ok(DataType::Map(Box::new(k.parse()?), Box::new(v.parse()?))),
            ("FixedString", [n]) => n
                .trim()
                .parse::<usize>()
                .map(DataType::FixedString)
                .map_err(|_| Error::UnknownType(s.to_string())),
            _ => Err(Error::UnknownType(s.to_string())),
        }
    }
}

/// Split on `sep` where it is not nested inside parentheses.
fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, ch) in s.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 => {
                parts.push(&s[start..i]);
                start = i + ch.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Parse a `name Type, name Type` list such as `id UInt64, tags Array(String)`.
    pub fn parse(spec: &str) -> Result<Self> {
        let mut fields = Vec::new();
        for part in split_top_level(spec, ',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (name, ty) = part
                .split_once(char::is_whitespace)
                .ok_or_else(|| Error::Schema(format!("column '{part}' is missing a type")))?;
            fields.push(Field::new(name.trim(), ty.parse()?));
        }
        if fields.is_empty() {
            return Err(Error::Schema("schema has no columns".into()));
        }
        Ok(Self::new(fields))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, idx: usize) -> Option<&Field> {
        self.fields.get(idx)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}
