//! Pretty writer: one box-drawn table per frame.
//!
//! Column width is the widest display width among the header and every cell
//! of the frame. A row budget caps how many rows are printed over the whole
//! stream; rows past it are summarised as `... N more rows`, and frames that
//! arrive after it is spent are replaced by a single notice.

use std::io::{BufWriter, Write};

use colwire_core::schema::Field;
use colwire_mem::RowTexts;

use super::{CellEncoder, FrameWriter};
use crate::error::Result;
use crate::width::display_width;

const NO_BALANCE: &str = "Extra blocks not printed: No balance row left\n";
const HIGHLIGHT_ON: &str = "\x1b[48;5;236m";
const HIGHLIGHT_OFF: &str = "\x1b[0m";

pub struct PrettyWriter<W: Write> {
    out: BufWriter<W>,
    /// Rows left to print; `None` means unlimited.
    remaining: Option<usize>,
    color: bool,
    notice_written: bool,
    buf: String,
}

impl<W: Write> PrettyWriter<W> {
    pub fn new(writer: W, max_rows: Option<usize>, color: bool) -> Self {
        Self {
            out: BufWriter::new(writer),
            remaining: max_rows,
            color,
            notice_written: false,
            buf: String::new(),
        }
    }

    fn write_table(&mut self, columns: &[Field], rows: &RowTexts) -> Result<()> {
        if self.remaining == Some(0) {
            if !self.notice_written {
                self.out.write_all(NO_BALANCE.as_bytes())?;
                self.notice_written = true;
            }
            return Ok(());
        }

        let total = rows.num_rows();
        let shown = self.remaining.map_or(total, |r| r.min(total));

        let widths: Vec<usize> = columns
            .iter()
            .enumerate()
            .map(|(c, field)| {
                rows.rows()
                    .map(|row| display_width(&row[c]))
                    .fold(display_width(&field.name), usize::max)
            })
            .collect();
        let right: Vec<bool> = columns
            .iter()
            .map(|f| f.data_type.is_numeric())
            .collect();

        let buf = &mut self.buf;
        buf.clear();

        buf.push('┌');
        for (c, field) in columns.iter().enumerate() {
            if c > 0 {
                buf.push('┬');
            }
            buf.push('─');
            buf.push_str(&field.name);
            push_repeat(buf, '─', widths[c] - display_width(&field.name) + 1);
        }
        buf.push_str("┐\n");

        for (r, row) in rows.rows().take(shown).enumerate() {
            let highlight = self.color && r % 2 == 1;
            if highlight {
                buf.push_str(HIGHLIGHT_ON);
            }
            for (c, cell) in row.iter().enumerate() {
                buf.push_str("│ ");
                let pad = widths[c] - display_width(cell);
                if right[c] {
                    push_repeat(buf, ' ', pad);
                    buf.push_str(cell);
                } else {
                    buf.push_str(cell);
                    push_repeat(buf, ' ', pad);
                }
                buf.push(' ');
            }
            buf.push('│');
            if highlight {
                buf.push_str(HIGHLIGHT_OFF);
            }
            buf.push('\n');
        }

        if shown < total {
            buf.push_str(&format!("... {} more rows\n", total - shown));
        }

        buf.push('└');
        for (c, w) in widths.iter().enumerate() {
            if c > 0 {
                buf.push('┴');
            }
            push_repeat(buf, '─', w + 2);
        }
        buf.push_str("┘\n");

        self.out.write_all(self.buf.as_bytes())?;
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= shown;
        }
        Ok(())
    }
}

fn push_repeat(buf: &mut String, ch: char, n: usize) {
    for _ in 0..n {
        buf.push(ch);
    }
}

impl<W: Write + Send> FrameWriter for PrettyWriter<W> {
    fn encoder(&self) -> CellEncoder {
        CellEncoder::Pretty
    }

    fn write_first_frame(&mut self, columns: &[Field], rows: &RowTexts) -> Result<()> {
        self.write_table(columns, rows)
    }

    fn write_frame_cont(&mut self, columns: &[Field], rows: &RowTexts) -> Result<()> {
        self.write_table(columns, rows)
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
