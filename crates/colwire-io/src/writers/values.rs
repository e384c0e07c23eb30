//! VALUES writer: `(1,'a'),(2,'b')` followed by a newline.

use std::io::{BufWriter, Write};

use colwire_core::schema::Field;
use colwire_mem::RowTexts;

use super::{CellEncoder, FrameWriter};
use crate::error::Result;

pub struct ValuesWriter<W: Write> {
    out: BufWriter<W>,
    wrote_row: bool,
}

impl<W: Write> ValuesWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            out: BufWriter::new(writer),
            wrote_row: false,
        }
    }

    fn write_rows(&mut self, rows: &RowTexts) -> Result<()> {
        for row in rows.rows() {
            if self.wrote_row {
                self.out.write_all(b",")?;
            }
            self.out.write_all(b"(")?;
            for (i, cell) in row.iter().enumerate() {
                if i > 0 {
                    self.out.write_all(b",")?;
                }
                self.out.write_all(cell.as_bytes())?;
            }
            self.out.write_all(b")")?;
            self.wrote_row = true;
        }
        Ok(())
    }
}

impl<W: Write + Send> FrameWriter for ValuesWriter<W> {
    fn encoder(&self) -> CellEncoder {
        CellEncoder::Values
    }

    fn write_first_frame(&mut self, _columns: &[Field], rows: &RowTexts) -> Result<()> {
        self.write_rows(rows)
    }

    fn write_frame_cont(&mut self, _columns: &[Field], rows: &RowTexts) -> Result<()> {
        self.write_rows(rows)
    }

    fn end_of_stream(&mut self, _columns: &[Field], _total_rows: u64) -> Result<()> {
        if self.wrote_row {
            self.out.write_all(b"\n")?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
