//! Append-only byte arena organised by element and row boundaries.
//!
//! Codecs write the bytes of one element, close it with [`FrameBuffer::end_elem`],
//! and close a row with [`FrameBuffer::end_row`]. A row that fails half way is
//! dropped with [`FrameBuffer::discard_row`], so the arena only ever exposes
//! complete rows.

use crate::batch::TextBatch;
use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub struct FrameBuffer {
    data: Vec<u8>,
    /// `[start, end)` byte ranges of every closed element.
    elems: Vec<(usize, usize)>,
    /// Number of elements in `elems` at the end of each closed row.
    row_ends: Vec<usize>,
    /// Start of the element currently being written.
    elem_start: usize,
    columns: usize,
    row_capacity: usize,
}

impl FrameBuffer {
    pub fn new(columns: usize, row_capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(row_capacity * columns * 8),
            elems: Vec::with_capacity(row_capacity * columns),
            row_ends: Vec::with_capacity(row_capacity),
            elem_start: 0,
            columns,
            row_capacity,
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn row_capacity(&self) -> usize {
        self.row_capacity
    }

    /// Complete rows written so far.
    pub fn rows(&self) -> usize {
        self.row_ends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_ends.is_empty()
    }

    pub fn write_byte(&mut self, b: u8) {
        self.data.push(b);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Bytes of the element currently being written.
    pub fn pending(&self) -> &[u8] {
        &self.data[self.elem_start..]
    }

    /// Drop trailing bytes of the pending element (e.g. a `\r` before `\n`).
    pub fn truncate_pending(&mut self, len: usize) {
        let len = len.min(self.data.len() - self.elem_start);
        self.data.truncate(self.elem_start + len);
    }

    pub fn end_elem(&mut self) {
        self.elems.push((self.elem_start, self.data.len()));
        self.elem_start = self.data.len();
    }

    fn row_start_elem(&self) -> usize {
        self.row_ends.last().copied().unwrap_or(0)
    }

    /// Elements closed in the row currently being written.
    pub fn pending_elems(&self) -> usize {
        self.elems.len() - self.row_start_elem()
    }

    pub fn end_row(&mut self) -> Result<()> {
        let found = self.pending_elems();
        if found != self.columns {
            return Err(Error::ColumnCount {
                expected: self.columns,
                found,
            });
        }
        self.row_ends.push(self.elems.len());
        Ok(())
    }

    /// Close a row whose elements were written out of column order.
    /// `order[k]` is the column index of the k-th element written.
    pub fn end_row_mapped(&mut self, order: &[usize]) -> Result<()> {
        let start = self.row_start_elem();
        let pending = &mut self.elems[start..];
        if order.len() != pending.len() || pending.len() != self.columns {
            return Err(Error::ColumnCount {
                expected: self.columns,
                found: pending.len(),
            });
        }
        let mut slots: Vec<Option<(usize, usize)>> = vec![None; self.columns];
        for (range, &col) in pending.iter().zip(order) {
            let slot = slots.get_mut(col).ok_or(Error::ColumnOutOfRange {
                index: col,
                columns: self.columns,
            })?;
            if slot.is_some() {
                return Err(Error::DuplicateColumn(col));
            }
            *slot = Some(*range);
        }
        for (dst, slot) in pending.iter_mut().zip(slots) {
            // Every slot is filled: `order` has `columns` distinct in-range entries.
            if let Some(range) = slot {
                *dst = range;
            }
        }
        self.row_ends.push(self.elems.len());
        Ok(())
    }

    /// Roll back to the end of the last complete row.
    pub fn discard_row(&mut self) {
        let start_elem = self.row_start_elem();
        let byte_end = if start_elem == 0 {
            0
        } else {
            self.elems[..start_elem]
                .iter()
                .map(|&(_, end)| end)
                .max()
                .unwrap_or(0)
        };
        self.elems.truncate(start_elem);
        self.data.truncate(byte_end);
        self.elem_start = byte_end;
    }

    /// Bytes of element `col` in complete row `row`.
    pub fn elem(&self, row: usize, col: usize) -> Option<&[u8]> {
        let end = *self.row_ends.get(row)?;
        let start = if row == 0 { 0 } else { self.row_ends[row - 1] };
        if col >= end - start {
            return None;
        }
        let (s, e) = self.elems[start + col];
        Some(&self.data[s..e])
    }

    /// Materialize complete rows into a column-major text batch.
    pub fn fill_text_batch(&self, batch: &mut TextBatch) -> Result<()> {
        if batch.num_columns() != self.columns {
            return Err(Error::ColumnCount {
                expected: batch.num_columns(),
                found: self.columns,
            });
        }
        let rows = self.rows();
        batch.set_rows(rows);
        for row in 0..rows {
            for col in 0..self.columns {
                let bytes = self.elem(row, col).ok_or_else(|| {
                    Error::Arena(format!("row {row} is missing column {col}"))
                })?;
                let cell = batch.cell_mut(col, row);
                cell.clear();
                cell.push_str(&String::from_utf8_lossy(bytes));
            }
        }
        Ok(())
    }

    /// Forget all content, keeping allocations.
    pub fn clear(&mut self) {
        self.data.clear();
        self.elems.clear();
        self.row_ends.clear();
        self.elem_start = 0;
    }
}
