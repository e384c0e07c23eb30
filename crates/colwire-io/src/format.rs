//! Name-based factory for format readers and writers.

use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

use colwire_core::config::Settings;

use crate::error::{Error, Result};
use crate::readers::{CsvReader, JsonReader, ValuesReader};
use crate::traits::TableReader;
use crate::writers::{CsvWriter, FrameWriter, JsonWriter, PrettyWriter, ValuesWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Csv,
    CsvWithNames,
    Values,
    Json,
    Pretty,
}

impl Format {
    pub fn all() -> &'static [Format] {
        &[
            Format::Csv,
            Format::CsvWithNames,
            Format::Values,
            Format::Json,
            Format::Pretty,
        ]
    }

    /// Case-insensitive lookup.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_uppercase().as_str() {
            "CSV" => Ok(Format::Csv),
            "CSVWITHNAMES" => Ok(Format::CsvWithNames),
            "VALUES" => Ok(Format::Values),
            "JSON" => Ok(Format::Json),
            "PRETTY" => Ok(Format::Pretty),
            _ => Err(Error::UnknownFormat(name.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Format::Csv => "CSV",
            Format::CsvWithNames => "CSVWithNames",
            Format::Values => "Values",
            Format::Json => "JSON",
            Format::Pretty => "Pretty",
        }
    }

    pub fn can_read(self) -> bool {
        !matches!(self, Format::Pretty)
    }

    pub fn can_write(self) -> bool {
        true
    }

    pub fn reader<R>(self, src: R, settings: &Settings) -> Result<Box<dyn TableReader + Send>>
    where
        R: Read + Send + 'static,
    {
        tracing::debug!(format = self.name(), "creating reader");
        Ok(match self {
            Format::Csv => Box::new(CsvReader::new(src, settings.csv_delimiter()?, false)),
            Format::CsvWithNames => Box::new(CsvReader::new(src, settings.csv_delimiter()?, true)),
            Format::Values => Box::new(ValuesReader::new(src)),
            Format::Json => Box::new(JsonReader::new(src)),
            Format::Pretty => return Err(Error::Unsupported("Pretty", "reading")),
        })
    }

    pub fn writer<W>(self, sink: W, settings: &Settings) -> Result<Box<dyn FrameWriter>>
    where
        W: Write + Send + 'static,
    {
        tracing::debug!(format = self.name(), "creating writer");
        Ok(match self {
            Format::Csv => Box::new(CsvWriter::new(sink, settings.csv_delimiter()?, false)),
            Format::CsvWithNames => Box::new(CsvWriter::new(sink, settings.csv_delimiter()?, true)),
            Format::Values => Box::new(ValuesWriter::new(sink)),
            Format::Json => Box::new(JsonWriter::new(sink)),
            Format::Pretty => Box::new(PrettyWriter::new(
                sink,
                settings.pretty_max_rows()?,
                settings.pretty_color()?,
            )),
        })
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Format::from_name(s)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
