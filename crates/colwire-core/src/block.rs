//! Column-oriented blocks.
//!
//! A `Block` is the unit both directions of the engine hand around: the read
//! path fills one per batch, the write path renders one per frame. Every
//! column of a sealed block holds exactly `num_rows` values.

use crate::error::{Error, Result};
use crate::literal::{self, Literal};
use crate::schema::{DataType, Field, Schema};
use crate::temporal;
use crate::types::Scalar;

/// Typed storage for one column. Built by [`ColumnData::for_type`].
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Bool(Vec<bool>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Str(Vec<String>),
    Date(Vec<i32>),
    DateTime(Vec<u32>),
    Nullable {
        nulls: Vec<bool>,
        inner: Box<ColumnData>,
    },
    /// Arrays and maps, kept as coerced `Scalar` trees.
    Nested(Vec<Scalar>),
}

impl ColumnData {
    /// Storage factory keyed off the semantic type.
    pub fn for_type(data_type: &DataType, capacity: usize) -> Self {
        match data_type {
            DataType::Bool => ColumnData::Bool(Vec::with_capacity(capacity)),
            DataType::Int8 => ColumnData::Int8(Vec::with_capacity(capacity)),
            DataType::Int16 => ColumnData::Int16(Vec::with_capacity(capacity)),
            DataType::Int32 => ColumnData::Int32(Vec::with_capacity(capacity)),
            DataType::Int64 => ColumnData::Int64(Vec::with_capacity(capacity)),
            DataType::UInt8 => ColumnData::UInt8(Vec::with_capacity(capacity)),
            DataType::UInt16 => ColumnData::UInt16(Vec::with_capacity(capacity)),
            DataType::UInt32 => ColumnData::UInt32(Vec::with_capacity(capacity)),
            DataType::UInt64 => ColumnData::UInt64(Vec::with_capacity(capacity)),
            DataType::Float32 => ColumnData::Float32(Vec::with_capacity(capacity)),
            DataType::Float64 => ColumnData::Float64(Vec::with_capacity(capacity)),
            DataType::String | DataType::FixedString(_) => {
                ColumnData::Str(Vec::with_capacity(capacity))
            }
            DataType::Date => ColumnData::Date(Vec::with_capacity(capacity)),
            DataType::DateTime => ColumnData::DateTime(Vec::with_capacity(capacity)),
            DataType::Nullable(inner) => ColumnData::Nullable {
                nulls: Vec::with_capacity(capacity),
                inner: Box::new(ColumnData::for_type(inner, capacity)),
            },
            DataType::Array(_) | DataType::Map(_, _) => {
                ColumnData::Nested(Vec::with_capacity(capacity))
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Bool(v) => v.len(),
            ColumnData::Int8(v) => v.len(),
            ColumnData::Int16(v) => v.len(),
            ColumnData::Int32(v) => v.len(),
            ColumnData::Int64(v) => v.len(),
            ColumnData::UInt8(v) => v.len(),
            ColumnData::UInt16(v) => v.len(),
            ColumnData::UInt32(v) => v.len(),
            ColumnData::UInt64(v) => v.len(),
            ColumnData::Float32(v) => v.len(),
            ColumnData::Float64(v) => v.len(),
            ColumnData::Str(v) => v.len(),
            ColumnData::Date(v) => v.len(),
            ColumnData::DateTime(v) => v.len(),
            ColumnData::Nullable { nulls, .. } => nulls.len(),
            ColumnData::Nested(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parse one cell of text and append it.
    pub fn push_text(&mut self, data_type: &DataType, text: &str) -> Result<()> {
        let value = parse_scalar(data_type, text)?;
        self.push_value(data_type, value)
    }

    /// Append a native value, coercing it to the column type with range checks.
    pub fn push_value(&mut self, data_type: &DataType, value: Scalar) -> Result<()> {
        let value = coerce(data_type, value)?;
        self.push_canonical(data_type, value)
    }

    // `value` has already been through `coerce` for `data_type`.
    fn push_canonical(&mut self, data_type: &DataType, value: Scalar) -> Result<()> {
        match (self, value) {
            (ColumnData::Nullable { nulls, inner }, value) => {
                let inner_type = match data_type {
                    DataType::Nullable(t) => t.as_ref(),
                    other => other,
                };
                if value.is_null() {
                    inner.push_default();
                    nulls.push(true);
                } else {
                    inner.push_canonical(inner_type, value)?;
                    nulls.push(false);
                }
            }
            (ColumnData::Bool(v), Scalar::Bool(b)) => v.push(b),
            (ColumnData::Int8(v), Scalar::Int(i)) => v.push(i as i8),
            (ColumnData::Int16(v), Scalar::Int(i)) => v.push(i as i16),
            (ColumnData::Int32(v), Scalar::Int(i)) => v.push(i as i32),
            (ColumnData::Int64(v), Scalar::Int(i)) => v.push(i),
            (ColumnData::UInt8(v), Scalar::UInt(u)) => v.push(u as u8),
            (ColumnData::UInt16(v), Scalar::UInt(u)) => v.push(u as u16),
            (ColumnData::UInt32(v), Scalar::UInt(u)) => v.push(u as u32),
            (ColumnData::UInt64(v), Scalar::UInt(u)) => v.push(u),
            (ColumnData::Float32(v), Scalar::F32(f)) => v.push(f),
            (ColumnData::Float64(v), Scalar::F64(f)) => v.push(f),
            (ColumnData::Str(v), Scalar::Str(s)) => v.push(s),
            (ColumnData::Date(v), Scalar::Date(d)) => v.push(d),
            (ColumnData::DateTime(v), Scalar::DateTime(t)) => v.push(t),
            (ColumnData::Nested(v), value @ (Scalar::Array(_) | Scalar::Map(_))) => v.push(value),
            (_, value) => {
                return Err(Error::Invariant(format!(
                    "storage does not match {data_type} for value {value:?}"
                )))
            }
        }
        Ok(())
    }

    fn push_default(&mut self) {
        match self {
            ColumnData::Bool(v) => v.push(false),
            ColumnData::Int8(v) => v.push(0),
            ColumnData::Int16(v) => v.push(0),
            ColumnData::Int32(v) => v.push(0),
            ColumnData::Int64(v) => v.push(0),
            ColumnData::UInt8(v) => v.push(0),
            ColumnData::UInt16(v) => v.push(0),
            ColumnData::UInt32(v) => v.push(0),
            ColumnData::UInt64(v) => v.push(0),
            ColumnData::Float32(v) => v.push(0.0),
            ColumnData::Float64(v) => v.push(0.0),
            ColumnData::Str(v) => v.push(String::new()),
            ColumnData::Date(v) => v.push(0),
            ColumnData::DateTime(v) => v.push(0),
            ColumnData::Nullable { nulls, inner } => {
                inner.push_default();
                nulls.push(true);
            }
            ColumnData::Nested(v) => v.push(Scalar::Array(Vec::new())),
        }
    }

    /// Value at `row`. Panics if `row` is out of bounds, like slice indexing.
    pub fn get(&self, row: usize) -> Scalar {
        match self {
            ColumnData::Bool(v) => Scalar::Bool(v[row]),
            ColumnData::Int8(v) => Scalar::Int(v[row] as i64),
            ColumnData::Int16(v) => Scalar::Int(v[row] as i64),
            ColumnData::Int32(v) => Scalar::Int(v[row] as i64),
            ColumnData::Int64(v) => Scalar::Int(v[row]),
            ColumnData::UInt8(v) => Scalar::UInt(v[row] as u64),
            ColumnData::UInt16(v) => Scalar::UInt(v[row] as u64),
            ColumnData::UInt32(v) => Scalar::UInt(v[row] as u64),
            ColumnData::UInt64(v) => Scalar::UInt(v[row]),
            ColumnData::Float32(v) => Scalar::F32(v[row]),
            ColumnData::Float64(v) => Scalar::F64(v[row]),
            ColumnData::Str(v) => Scalar::Str(v[row].clone()),
            ColumnData::Date(v) => Scalar::Date(v[row]),
            ColumnData::DateTime(v) => Scalar::DateTime(v[row]),
            ColumnData::Nullable { nulls, inner } => {
                if nulls[row] {
                    Scalar::Null
                } else {
                    inner.get(row)
                }
            }
            ColumnData::Nested(v) => v[row].clone(),
        }
    }
}

fn signed_range(data_type: &DataType) -> Option<(i64, i64)> {
    match data_type {
        DataType::Int8 => Some((i8::MIN as i64, i8::MAX as i64)),
        DataType::Int16 => Some((i16::MIN as i64, i16::MAX as i64)),
        DataType::Int32 => Some((i32::MIN as i64, i32::MAX as i64)),
        DataType::Int64 => Some((i64::MIN, i64::MAX)),
        _ => None,
    }
}

fn unsigned_max(data_type: &DataType) -> Option<u64> {
    match data_type {
        DataType::UInt8 => Some(u8::MAX as u64),
        DataType::UInt16 => Some(u16::MAX as u64),
        DataType::UInt32 => Some(u32::MAX as u64),
        DataType::UInt64 => Some(u64::MAX),
        _ => None,
    }
}

/// Normalize a native value to the canonical `Scalar` form for `data_type`.
pub fn coerce(data_type: &DataType, value: Scalar) -> Result<Scalar> {
    let mismatch = |value: &Scalar| Error::TypeMismatch {
        value: format!("{value:?}"),
        data_type: data_type.to_string(),
    };

    if let DataType::Nullable(inner) = data_type {
        return match value {
            Scalar::Null => Ok(Scalar::Null),
            other => coerce(inner, other),
        };
    }

    if let Some((min, max)) = signed_range(data_type) {
        let v = match &value {
            Scalar::Int(i) => Some(*i),
            Scalar::UInt(u) => i64::try_from(*u).ok(),
            Scalar::Bool(b) => Some(*b as i64),
            _ => None,
        };
        return match v {
            Some(i) if i >= min && i <= max => Ok(Scalar::Int(i)),
            _ => Err(mismatch(&value)),
        };
    }

    if let Some(max) = unsigned_max(data_type) {
        let v = match &value {
            Scalar::UInt(u) => Some(*u),
            Scalar::Int(i) => u64::try_from(*i).ok(),
            Scalar::Bool(b) => Some(*b as u64),
            _ => None,
        };
        return match v {
            Some(u) if u <= max => Ok(Scalar::UInt(u)),
            _ => Err(mismatch(&value)),
        };
    }

    match (data_type, value) {
        (DataType::Bool, Scalar::Bool(b)) => Ok(Scalar::Bool(b)),
        (DataType::Bool, Scalar::Int(i)) if i == 0 || i == 1 => Ok(Scalar::Bool(i == 1)),
        (DataType::Bool, Scalar::UInt(u)) if u <= 1 => Ok(Scalar::Bool(u == 1)),
        (DataType::Float32, Scalar::F32(f)) => Ok(Scalar::F32(f)),
        (DataType::Float32, Scalar::F64(f)) => Ok(Scalar::F32(f as f32)),
        (DataType::Float32, Scalar::Int(i)) => Ok(Scalar::F32(i as f32)),
        (DataType::Float32, Scalar::UInt(u)) => Ok(Scalar::F32(u as f32)),
        (DataType::Float64, Scalar::F64(f)) => Ok(Scalar::F64(f)),
        (DataType::Float64, Scalar::F32(f)) => Ok(Scalar::F64(f as f64)),
        (DataType::Float64, Scalar::Int(i)) => Ok(Scalar::F64(i as f64)),
        (DataType::Float64, Scalar::UInt(u)) => Ok(Scalar::F64(u as f64)),
        (DataType::String, Scalar::Str(s)) => Ok(Scalar::Str(s)),
        (DataType::FixedString(n), Scalar::Str(s)) if s.len() <= *n => Ok(Scalar::Str(s)),
        (DataType::Date, Scalar::Date(d)) => Ok(Scalar::Date(d)),
        (DataType::Date, Scalar::Str(s)) => temporal::parse_date(&s)
            .map(Scalar::Date)
            .ok_or_else(|| mismatch(&Scalar::Str(s))),
        (DataType::DateTime, Scalar::DateTime(t)) => Ok(Scalar::DateTime(t)),
        (DataType::DateTime, Scalar::UInt(u)) if u <= u32::MAX as u64 => {
            Ok(Scalar::DateTime(u as u32))
        }
        (DataType::DateTime, Scalar::Str(s)) => temporal::parse_datetime(&s)
            .map(Scalar::DateTime)
            .ok_or_else(|| mismatch(&Scalar::Str(s))),
        (DataType::Array(inner), Scalar::Array(items)) => items
            .into_iter()
            .map(|item| coerce(inner, item))
            .collect::<Result<Vec<_>>>()
            .map(Scalar::Array),
        (DataType::Map(kt, vt), Scalar::Map(entries)) => entries
            .into_iter()
            .map(|(k, v)| Ok((coerce(kt, k)?, coerce(vt, v)?)))
            .collect::<Result<Vec<_>>>()
            .map(Scalar::Map),
        (_, other) => Err(mismatch(&other)),
    }
}

fn is_null_text(text: &str) -> bool {
    matches!(text, "\\N" | "NULL" | "null")
}

/// Parse one cell of text as `data_type`. Empty text is the type's default.
pub fn parse_scalar(data_type: &DataType, text: &str) -> Result<Scalar> {
    match data_type {
        DataType::Nullable(inner) => {
            if is_null_text(text) {
                Ok(Scalar::Null)
            } else {
                parse_scalar(inner, text)
            }
        }
        DataType::String => Ok(Scalar::Str(text.to_string())),
        DataType::FixedString(n) => {
            if text.len() > *n {
                Err(Error::parse(text, data_type, format!("longer than {n} bytes")))
            } else {
                Ok(Scalar::Str(text.to_string()))
            }
        }
        DataType::Array(_) | DataType::Map(_, _) => {
            if text.is_empty() {
                return Ok(match data_type {
                    DataType::Map(_, _) => Scalar::Map(Vec::new()),
                    _ => Scalar::Array(Vec::new()),
                });
            }
            let lit = literal::parse(text)?;
            from_literal(data_type, &lit)
        }
        _ if text.is_empty() => default_scalar(data_type),
        DataType::Bool => match text.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Scalar::Bool(true)),
            "false" | "0" => Ok(Scalar::Bool(false)),
            _ => Err(Error::parse(text, data_type, "expected true/false")),
        },
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => {
            let v = text
                .parse::<i64>()
                .map_err(|e| Error::parse(text, data_type, e.to_string()))?;
            coerce(data_type, Scalar::Int(v))
                .map_err(|_| Error::parse(text, data_type, "out of range"))
        }
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
            let v = text
                .parse::<u64>()
                .map_err(|e| Error::parse(text, data_type, e.to_string()))?;
            coerce(data_type, Scalar::UInt(v))
                .map_err(|_| Error::parse(text, data_type, "out of range"))
        }
        DataType::Float32 => text
            .parse::<f32>()
            .map(Scalar::F32)
            .map_err(|e| Error::parse(text, data_type, e.to_string())),
        DataType::Float64 => text
            .parse::<f64>()
            .map(Scalar::F64)
            .map_err(|e| Error::parse(text, data_type, e.to_string())),
        DataType::Date => temporal::parse_date(text)
            .map(Scalar::Date)
            .ok_or_else(|| Error::parse(text, data_type, "expected YYYY-MM-DD")),
        DataType::DateTime => temporal::parse_datetime(text)
            .map(Scalar::DateTime)
            .ok_or_else(|| Error::parse(text, data_type, "expected YYYY-MM-DD hh:mm:ss")),
    }
}

fn default_scalar(data_type: &DataType) -> Result<Scalar> {
    Ok(match data_type {
        DataType::Bool => Scalar::Bool(false),
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => Scalar::Int(0),
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
            Scalar::UInt(0)
        }
        DataType::Float32 => Scalar::F32(0.0),
        DataType::Float64 => Scalar::F64(0.0),
        DataType::String | DataType::FixedString(_) => Scalar::Str(String::new()),
        DataType::Date => Scalar::Date(0),
        DataType::DateTime => Scalar::DateTime(0),
        DataType::Nullable(_) => Scalar::Null,
        DataType::Array(_) => Scalar::Array(Vec::new()),
        DataType::Map(_, _) => Scalar::Map(Vec::new()),
    })
}

fn from_literal(data_type: &DataType, lit: &Literal) -> Result<Scalar> {
    match (data_type, lit) {
        (DataType::Nullable(_), Literal::Bare(s)) if is_null_text(s) => Ok(Scalar::Null),
        (DataType::Nullable(inner), lit) => from_literal(inner, lit),
        (DataType::Array(inner), Literal::List(items)) => items
            .iter()
            .map(|item| from_literal(inner, item))
            .collect::<Result<Vec<_>>>()
            .map(Scalar::Array),
        (DataType::Map(kt, vt), Literal::Map(entries)) => entries
            .iter()
            .map(|(k, v)| Ok((from_literal(kt, k)?, from_literal(vt, v)?)))
            .collect::<Result<Vec<_>>>()
            .map(Scalar::Map),
        (dt, lit) => match lit.text() {
            Some(text) => parse_scalar(dt, text),
            None => Err(Error::parse(
                format!("{lit:?}"),
                dt,
                "nested literal does not match type",
            )),
        },
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType, capacity: usize) -> Self {
        let data = ColumnData::for_type(&data_type, capacity);
        Self {
            name: name.into(),
            data_type,
            data,
        }
    }

    pub fn field(&self) -> Field {
        Field::new(self.name.clone(), self.data_type.clone())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn push_text(&mut self, text: &str) -> Result<()> {
        self.data.push_text(&self.data_type, text)
    }

    pub fn push_value(&mut self, value: Scalar) -> Result<()> {
        self.data.push_value(&self.data_type, value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    columns: Vec<Column>,
    num_rows: usize,
}

impl Block {
    /// Zero-row block for `schema`; used as the sample for structural copies.
    pub fn from_schema(schema: &Schema) -> Self {
        Self {
            columns: schema
                .fields
                .iter()
                .map(|f| Column::new(f.name.clone(), f.data_type.clone(), 0))
                .collect(),
            num_rows: 0,
        }
    }

    /// Same columns and types, fresh empty storage sized for `capacity` rows.
    pub fn structural_copy(&self, capacity: usize) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.data_type.clone(), capacity))
                .collect(),
            num_rows: 0,
        }
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, idx: usize) -> Option<&Column> {
        self.columns.get(idx)
    }

    pub fn column_mut(&mut self, idx: usize) -> Option<&mut Column> {
        self.columns.get_mut(idx)
    }

    pub fn fields(&self) -> Vec<Field> {
        self.columns.iter().map(Column::field).collect()
    }

    pub fn schema(&self) -> Schema {
        Schema::new(self.fields())
    }

    /// Append a full row of native values and reseal. The row is coerced
    /// before anything is stored, so a rejected row leaves the block as it was.
    pub fn append_row(&mut self, row: Vec<Scalar>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::Schema(format!(
                "row has {} values but block has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        let row = self
            .columns
            .iter()
            .zip(row)
            .map(|(col, value)| coerce(&col.data_type, value))
            .collect::<Result<Vec<_>>>()?;
        for (col, value) in self.columns.iter_mut().zip(row) {
            col.push_value(value)?;
        }
        self.seal().map(|_| ())
    }

    /// Check that every column holds the same number of values and record it
    /// as the block's row count.
    pub fn seal(&mut self) -> Result<usize> {
        let rows = self.columns.first().map(Column::len).unwrap_or(0);
        for col in &self.columns {
            if col.len() != rows {
                return Err(Error::Invariant(format!(
                    "column '{}' has {} values but expected {}",
                    col.name,
                    col.len(),
                    rows
                )));
            }
        }
        self.num_rows = rows;
        Ok(rows)
    }

    pub fn value(&self, row: usize, col: usize) -> Scalar {
        self.columns[col].data.get(row)
    }

    pub fn row(&self, row: usize) -> Vec<Scalar> {
        self.columns.iter().map(|c| c.data.get(row)).collect()
    }
}
