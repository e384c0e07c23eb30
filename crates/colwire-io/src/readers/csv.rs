//! CSV reader: one row per line, elements separated by a single-byte delimiter.
//!
//! - The delimiter comes from `format_csv_delimiter` (see `Settings`).
//! - With `skip_header`, the first line is discarded (`CSVWithNames`).
//! - Blank lines between rows are skipped; `\r\n` endings are accepted.

use std::io::Read;

use colwire_core::schema::Field;
use colwire_mem::FrameBuffer;

use super::read_positional_row;
use crate::elem::{read_elem, ElemRules};
use crate::error::Result;
use crate::source::ByteSource;
use crate::traits::{ElemEnd, ElemReader, RowReader, RowStatus, TableReader};

pub struct CsvReader<R: Read> {
    src: ByteSource<R>,
    delimiter: u8,
    skip_header: bool,
}

impl<R: Read> CsvReader<R> {
    pub fn new(reader: R, delimiter: u8, skip_header: bool) -> Self {
        Self {
            src: ByteSource::new(reader),
            delimiter,
            skip_header,
        }
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }
}

impl<R: Read> ElemReader for CsvReader<R> {
    fn read_elem(
        &mut self,
        arena: &mut FrameBuffer,
        columns: &[Field],
        idx: usize,
    ) -> Result<ElemEnd> {
        let delimiter = [self.delimiter];
        let stops: &[u8] = if idx + 1 == columns.len() {
            b"\n"
        } else {
            &delimiter
        };
        let rules = ElemRules {
            stops,
            newline_significant: true,
            nested: columns[idx].data_type.is_nested(),
            unicode_escapes: false,
        };
        read_elem(&mut self.src, arena, &rules)
    }
}

impl<R: Read> RowReader for CsvReader<R> {
    fn read_first_row(&mut self, arena: &mut FrameBuffer, columns: &[Field]) -> Result<RowStatus> {
        if self.skip_header {
            self.src.skip_line()?;
        }
        self.read_row_cont(arena, columns)
    }

    fn read_row_cont(&mut self, arena: &mut FrameBuffer, columns: &[Field]) -> Result<RowStatus> {
        if self
            .src
            .skip_while(|b| b == b'\n' || b == b'\r')?
            .is_none()
        {
            return Ok(RowStatus::End);
        }
        read_positional_row(self, arena, columns, true)
    }
}

impl<R: Read> TableReader for CsvReader<R> {}
