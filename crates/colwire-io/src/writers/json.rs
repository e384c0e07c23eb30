//! JSON writer: tab-indented `meta` / `data` / `rows` envelope.
//!
//! ```text
//! {
//! 	"meta":
//! 	[
//! 		{
//! 			"name": "a",
//! 			"type": "Int32"
//! 		}
//! 	],
//!
//! 	"data":
//! 	[
//! 		{
//! 			"a": 1
//! 		}
//! 	],
//!
//! 	"rows": 1
//! }
//! ```

use std::io::{BufWriter, Write};

use colwire_core::schema::Field;
use colwire_mem::RowTexts;

use super::{json_escape, CellEncoder, FrameWriter};
use crate::error::Result;

pub struct JsonWriter<W: Write> {
    out: BufWriter<W>,
    started: bool,
    wrote_row: bool,
    line: String,
}

impl<W: Write> JsonWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            out: BufWriter::new(writer),
            started: false,
            wrote_row: false,
            line: String::new(),
        }
    }

    fn write_prefix(&mut self, columns: &[Field]) -> Result<()> {
        let mut s = String::from("{\n\t\"meta\":\n\t[");
        for (i, field) in columns.iter().enumerate() {
            s.push_str(if i > 0 { ",\n" } else { "\n" });
            s.push_str("\t\t{\n\t\t\t\"name\": \"");
            json_escape(&field.name, &mut s);
            s.push_str("\",\n\t\t\t\"type\": \"");
            json_escape(&field.data_type.to_string(), &mut s);
            s.push_str("\"\n\t\t}");
        }
        s.push_str("\n\t],\n\n\t\"data\":\n\t[");
        self.out.write_all(s.as_bytes())?;
        self.started = true;
        Ok(())
    }

    fn write_rows(&mut self, columns: &[Field], rows: &RowTexts) -> Result<()> {
        for row in rows.rows() {
            self.line.clear();
            self.line.push_str(if self.wrote_row { ",\n" } else { "\n" });
            self.line.push_str("\t\t{");
            for (i, (field, cell)) in columns.iter().zip(row).enumerate() {
                self.line.push_str(if i > 0 { ",\n" } else { "\n" });
                self.line.push_str("\t\t\t\"");
                json_escape(&field.name, &mut self.line);
                self.line.push_str("\": ");
                self.line.push_str(cell);
            }
            self.line.push_str("\n\t\t}");
            self.out.write_all(self.line.as_bytes())?;
            self.wrote_row = true;
        }
        Ok(())
    }
}

impl<W: Write + Send> FrameWriter for JsonWriter<W> {
    fn encoder(&self) -> CellEncoder {
        CellEncoder::Json
    }

    fn write_first_frame(&mut self, columns: &[Field], rows: &RowTexts) -> Result<()> {
        self.write_prefix(columns)?;
        self.write_rows(columns, rows)
    }

    fn write_frame_cont(&mut self, columns: &[Field], rows: &RowTexts) -> Result<()> {
        self.write_rows(columns, rows)
    }

    fn end_of_stream(&mut self, columns: &[Field], total_rows: u64) -> Result<()> {
        if !self.started {
            self.write_prefix(columns)?;
        }
        write!(self.out, "\n\t],\n\n\t\"rows\": {total_rows}\n}}\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
