pub mod csv;
pub mod json;
pub mod values;

pub use csv::CsvReader;
pub use json::JsonReader;
pub use values::ValuesReader;

use colwire_core::schema::Field;
use colwire_mem::FrameBuffer;

use crate::error::{Error, Result};
use crate::traits::{ElemEnd, ElemReader, RowStatus};

/// Read every column of one row in schema order.
///
/// With `eof_ends_row`, end of input on the last column completes the row and
/// end of input before the first byte of the row is a clean end. Otherwise any
/// end of input inside the row is an error.
pub(crate) fn read_positional_row<T: ElemReader + ?Sized>(
    reader: &mut T,
    arena: &mut FrameBuffer,
    columns: &[Field],
    eof_ends_row: bool,
) -> Result<RowStatus> {
    let last = columns.len() - 1;
    for idx in 0..columns.len() {
        let end = match reader.read_elem(arena, columns, idx) {
            Ok(end) => end,
            Err(e) => {
                arena.discard_row();
                return Err(e.at_column(idx));
            }
        };
        if end == ElemEnd::Eof {
            if eof_ends_row && idx == 0 && arena.pending().is_empty() {
                arena.discard_row();
                return Ok(RowStatus::End);
            }
            if !eof_ends_row || idx != last {
                arena.discard_row();
                return Err(Error::UnexpectedEof("row").at_column(idx));
            }
        }
        arena.end_elem();
    }
    arena.end_row()?;
    Ok(RowStatus::Row)
}
