//! Reader contract: element, row and table granularity.
//!
//! A format implements `ElemReader` and `RowReader`; `TableReader` comes with
//! default batch loops on top of them.

use colwire_core::schema::Field;
use colwire_mem::FrameBuffer;

use crate::error::{Error, Result};

/// How an element ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElemEnd {
    /// A stop byte was consumed.
    Stop(u8),
    /// Input ran out.
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    /// One complete row was appended to the arena.
    Row,
    /// Clean end of input at a row boundary; nothing was appended.
    End,
}

/// Result of one batch read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOutcome {
    pub rows: usize,
    pub eof: bool,
}

pub trait ElemReader {
    /// Write the text of column `idx` of the current row into the arena's
    /// pending element. The caller closes the element.
    fn read_elem(
        &mut self,
        arena: &mut FrameBuffer,
        columns: &[Field],
        idx: usize,
    ) -> Result<ElemEnd>;
}

pub trait RowReader: ElemReader {
    /// Read the first row of the stream, consuming any preamble (header
    /// line, JSON envelope).
    fn read_first_row(&mut self, arena: &mut FrameBuffer, columns: &[Field]) -> Result<RowStatus>;

    fn read_row_cont(&mut self, arena: &mut FrameBuffer, columns: &[Field]) -> Result<RowStatus>;
}

pub trait TableReader: RowReader {
    /// Read up to `max_rows` rows starting at the beginning of the stream.
    fn read_first_column_texts(
        &mut self,
        arena: &mut FrameBuffer,
        columns: &[Field],
        max_rows: usize,
    ) -> Result<ReadOutcome> {
        read_rows(self, arena, columns, max_rows, true)
    }

    /// Read up to `max_rows` further rows.
    fn read_column_texts_cont(
        &mut self,
        arena: &mut FrameBuffer,
        columns: &[Field],
        max_rows: usize,
    ) -> Result<ReadOutcome> {
        read_rows(self, arena, columns, max_rows, false)
    }
}

/// Errors carry the index of the failing row within this read. Rows read
/// before the failure stay in the arena.
fn read_rows<T: RowReader + ?Sized>(
    reader: &mut T,
    arena: &mut FrameBuffer,
    columns: &[Field],
    max_rows: usize,
    first: bool,
) -> Result<ReadOutcome> {
    if columns.is_empty() {
        return Err(Error::Other("cannot read rows without columns".into()));
    }
    let mut rows = 0;
    while rows < max_rows {
        let status = if first && rows == 0 {
            reader.read_first_row(arena, columns)
        } else {
            reader.read_row_cont(arena, columns)
        };
        match status {
            Ok(RowStatus::Row) => rows += 1,
            Ok(RowStatus::End) => return Ok(ReadOutcome { rows, eof: true }),
            Err(e) => return Err(e.at_row(rows)),
        }
    }
    Ok(ReadOutcome { rows, eof: false })
}
