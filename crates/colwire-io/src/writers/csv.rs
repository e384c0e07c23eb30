//! CSV writer over pre-rendered cells, with an optional quoted header row.

use std::io::{BufWriter, Write};

use colwire_core::schema::Field;
use colwire_mem::RowTexts;

use super::{CellEncoder, FrameWriter};
use crate::error::Result;

pub struct CsvWriter<W: Write> {
    out: BufWriter<W>,
    delimiter: u8,
    with_names: bool,
}

impl<W: Write> CsvWriter<W> {
    pub fn new(writer: W, delimiter: u8, with_names: bool) -> Self {
        Self {
            out: BufWriter::new(writer),
            delimiter,
            with_names,
        }
    }

    fn write_header(&mut self, columns: &[Field]) -> Result<()> {
        for (i, field) in columns.iter().enumerate() {
            if i > 0 {
                self.out.write_all(&[self.delimiter])?;
            }
            self.out.write_all(b"\"")?;
            self.out
                .write_all(field.name.replace('"', "\"\"").as_bytes())?;
            self.out.write_all(b"\"")?;
        }
        self.out.write_all(b"\n")?;
        Ok(())
    }

    fn write_rows(&mut self, rows: &RowTexts) -> Result<()> {
        for row in rows.rows() {
            for (i, cell) in row.iter().enumerate() {
                if i > 0 {
                    self.out.write_all(&[self.delimiter])?;
                }
                self.out.write_all(cell.as_bytes())?;
            }
            self.out.write_all(b"\n")?;
        }
        Ok(())
    }
}

impl<W: Write + Send> FrameWriter for CsvWriter<W> {
    fn encoder(&self) -> CellEncoder {
        CellEncoder::Csv
    }

    fn write_first_frame(&mut self, columns: &[Field], rows: &RowTexts) -> Result<()> {
        if self.with_names {
            self.write_header(columns)?;
        }
        self.write_rows(rows)
    }

    fn write_frame_cont(&mut self, _columns: &[Field], rows: &RowTexts) -> Result<()> {
        self.write_rows(rows)
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
