//! VALUES reader: rows are tuple literals, `(1, 'a'), (2, 'b');`.

use std::io::Read;

use colwire_core::schema::Field;
use colwire_mem::FrameBuffer;

use super::read_positional_row;
use crate::elem::{read_elem, ElemRules};
use crate::error::{Error, Result};
use crate::source::ByteSource;
use crate::traits::{ElemEnd, ElemReader, RowReader, RowStatus, TableReader};

pub struct ValuesReader<R: Read> {
    src: ByteSource<R>,
}

impl<R: Read> ValuesReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            src: ByteSource::new(reader),
        }
    }
}

impl<R: Read> ElemReader for ValuesReader<R> {
    fn read_elem(
        &mut self,
        arena: &mut FrameBuffer,
        columns: &[Field],
        idx: usize,
    ) -> Result<ElemEnd> {
        let stops: &[u8] = if idx + 1 == columns.len() { b")" } else { b"," };
        let rules = ElemRules {
            stops,
            newline_significant: false,
            nested: columns[idx].data_type.is_nested(),
            unicode_escapes: false,
        };
        read_elem(&mut self.src, arena, &rules)
    }
}

impl<R: Read> RowReader for ValuesReader<R> {
    fn read_first_row(&mut self, arena: &mut FrameBuffer, columns: &[Field]) -> Result<RowStatus> {
        self.read_row_cont(arena, columns)
    }

    fn read_row_cont(&mut self, arena: &mut FrameBuffer, columns: &[Field]) -> Result<RowStatus> {
        let next = self
            .src
            .skip_while(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b',' | b';'))?;
        match next {
            None => Ok(RowStatus::End),
            Some(b'(') => {
                self.src.advance();
                read_positional_row(self, arena, columns, false)
            }
            Some(other) => Err(Error::unexpected("'('", other)),
        }
    }
}

impl<R: Read> TableReader for ValuesReader<R> {}
