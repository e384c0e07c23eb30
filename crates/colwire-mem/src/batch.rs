//! Batch containers handed between pipeline stages.
//!
//! Each container keeps its allocations when its visible row count shrinks,
//! so a pooled instance can be refilled without reallocating. Only the first
//! `num_rows()` entries are ever visible; anything past that is stale and is
//! overwritten before it can be read again.

use colwire_core::types::Scalar;

/// Column-major string cells, one `Vec<String>` per column.
#[derive(Debug, Default)]
pub struct TextBatch {
    columns: Vec<Vec<String>>,
    rows: usize,
}

impl TextBatch {
    pub fn new(columns: usize, row_capacity: usize) -> Self {
        Self {
            columns: (0..columns)
                .map(|_| Vec::with_capacity(row_capacity))
                .collect(),
            rows: 0,
        }
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.rows
    }

    /// Rows the container can hold without growing.
    pub fn row_capacity(&self) -> usize {
        self.columns.iter().map(Vec::capacity).min().unwrap_or(0)
    }

    /// Make `rows` cells visible in every column, growing if needed.
    pub fn set_rows(&mut self, rows: usize) {
        for col in &mut self.columns {
            while col.len() < rows {
                col.push(String::new());
            }
        }
        self.rows = rows;
    }

    pub fn clear(&mut self) {
        self.rows = 0;
    }

    pub fn column(&self, col: usize) -> &[String] {
        &self.columns[col][..self.rows]
    }

    pub fn cell(&self, col: usize, row: usize) -> &str {
        &self.column(col)[row]
    }

    pub fn cell_mut(&mut self, col: usize, row: usize) -> &mut String {
        &mut self.columns[col][..self.rows][row]
    }

    /// Append one row; `cells` must have one entry per column.
    pub fn push_row<S: AsRef<str>>(&mut self, cells: &[S]) {
        let row = self.rows;
        self.set_rows(row + 1);
        for (col, text) in cells.iter().enumerate().take(self.columns.len()) {
            let cell = self.cell_mut(col, row);
            cell.clear();
            cell.push_str(text.as_ref());
        }
    }

    /// Strip surrounding whitespace from every visible cell in place.
    pub fn trim_cells(&mut self) {
        let rows = self.rows;
        for col in &mut self.columns {
            for cell in &mut col[..rows] {
                trim_in_place(cell);
            }
        }
    }
}

fn trim_in_place(s: &mut String) {
    let end = s.trim_end().len();
    s.truncate(end);
    let start = s.len() - s.trim_start().len();
    if start > 0 {
        s.drain(..start);
    }
}

/// Column-major native values for the typed insert path.
#[derive(Debug, Default)]
pub struct ValueBatch {
    columns: Vec<Vec<Scalar>>,
    rows: usize,
    row_capacity: usize,
}

impl ValueBatch {
    pub fn new(columns: usize, row_capacity: usize) -> Self {
        Self {
            columns: (0..columns)
                .map(|_| Vec::with_capacity(row_capacity))
                .collect(),
            rows: 0,
            row_capacity,
        }
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.rows
    }

    pub fn row_capacity(&self) -> usize {
        self.row_capacity
    }

    pub fn clear(&mut self) {
        for col in &mut self.columns {
            col.clear();
        }
        self.rows = 0;
    }

    /// Append one row. Returns the row back if its width is wrong.
    pub fn push_row(&mut self, row: Vec<Scalar>) -> std::result::Result<(), Vec<Scalar>> {
        if row.len() != self.columns.len() {
            return Err(row);
        }
        for (col, value) in self.columns.iter_mut().zip(row) {
            col.push(value);
        }
        self.rows += 1;
        self.row_capacity = self.row_capacity.max(self.rows);
        Ok(())
    }

    pub fn column(&self, col: usize) -> &[Scalar] {
        &self.columns[col]
    }

    /// Move the values of column `col` out, leaving it empty.
    pub fn take_column(&mut self, col: usize) -> Vec<Scalar> {
        let rows = self.columns[col].len();
        std::mem::replace(&mut self.columns[col], Vec::with_capacity(rows))
    }
}

/// Row-major rendered cells for the write path.
#[derive(Debug, Default)]
pub struct RowTexts {
    rows: Vec<Vec<String>>,
    len: usize,
    columns: usize,
}

impl RowTexts {
    pub fn new(columns: usize, row_capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(row_capacity),
            len: 0,
            columns,
        }
    }

    pub fn num_columns(&self) -> usize {
        self.columns
    }

    pub fn num_rows(&self) -> usize {
        self.len
    }

    pub fn row_capacity(&self) -> usize {
        self.rows.capacity()
    }

    pub fn set_rows(&mut self, rows: usize) {
        while self.rows.len() < rows {
            self.rows.push(vec![String::new(); self.columns]);
        }
        self.len = rows;
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn row(&self, row: usize) -> &[String] {
        &self.rows[..self.len][row]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[String]> {
        self.rows[..self.len].iter().map(Vec::as_slice)
    }

    pub fn cell_mut(&mut self, row: usize, col: usize) -> &mut String {
        &mut self.rows[..self.len][row][col]
    }
}
