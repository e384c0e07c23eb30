//! JSON reader for the `{"meta": [...], "data": [{...}, ...], "rows": n}`
//! envelope. A bare top-level array of row objects is accepted too.
//!
//! Columns are matched by key name, so keys may appear in any order; missing
//! keys read as empty text. The `]` closing the data array ends the stream and
//! whatever follows it is discarded.

use std::io::Read;

use colwire_core::schema::Field;
use colwire_mem::FrameBuffer;

use crate::elem::{read_elem, read_quoted, ElemRules};
use crate::error::{Error, Result};
use crate::source::ByteSource;
use crate::traits::{ElemEnd, ElemReader, RowReader, RowStatus, TableReader};

const VALUE_STOPS: &[u8] = b",}";

fn is_json_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

pub struct JsonReader<R: Read> {
    src: ByteSource<R>,
    key: Vec<u8>,
    /// Column index of each element written for the current row.
    order: Vec<usize>,
    scratch: Vec<u8>,
}

impl<R: Read> JsonReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            src: ByteSource::new(reader),
            key: Vec::new(),
            order: Vec::new(),
            scratch: Vec::new(),
        }
    }

    fn skip_space(&mut self) -> Result<Option<u8>> {
        self.src.skip_while(is_json_space)
    }

    fn expect(&mut self, want: u8) -> Result<()> {
        match self.skip_space()? {
            Some(b) if b == want => {
                self.src.advance();
                Ok(())
            }
            Some(b) => Err(Error::unexpected(format!("'{}'", want as char), b)),
            None => Err(Error::UnexpectedEof("JSON document")),
        }
    }

    /// Read `"key"` followed by `:` into `self.key`.
    fn read_key(&mut self) -> Result<()> {
        self.expect(b'"')?;
        self.key.clear();
        read_quoted(&mut self.src, &mut self.key, b'"', true)?;
        self.expect(b':')
    }

    /// Position the source just inside the data array. Returns `false` when
    /// the document has no rows to offer.
    fn enter_data(&mut self) -> Result<bool> {
        match self.skip_space()? {
            None => return Ok(false),
            Some(b'[') => {
                self.src.advance();
                return Ok(true);
            }
            Some(b'{') => self.src.advance(),
            Some(other) => return Err(Error::unexpected("'{' or '['", other)),
        }
        loop {
            match self.skip_space()? {
                Some(b'}') | None => return Ok(false),
                Some(_) => {}
            }
            self.read_key()?;
            if self.key == b"data" {
                self.expect(b'[')?;
                return Ok(true);
            }
            // Skip the value of any other key (`meta`, `rows`, ...).
            self.scratch.clear();
            let rules = ElemRules {
                stops: VALUE_STOPS,
                newline_significant: false,
                nested: true,
                unicode_escapes: true,
            };
            match read_elem(&mut self.src, &mut self.scratch, &rules)? {
                ElemEnd::Stop(b',') => continue,
                ElemEnd::Stop(_) | ElemEnd::Eof => return Ok(false),
            }
        }
    }

    fn column_of(&self, columns: &[Field]) -> Result<usize> {
        let key = String::from_utf8_lossy(&self.key);
        columns
            .iter()
            .position(|f| f.name == key)
            .ok_or_else(|| Error::UnknownColumn(key.into_owned()))
    }

    /// Read the members of one row object whose `{` has been consumed.
    fn read_object(&mut self, arena: &mut FrameBuffer, columns: &[Field]) -> Result<()> {
        self.order.clear();
        if self.skip_space()? == Some(b'}') {
            self.src.advance();
        } else {
            loop {
                self.read_key()?;
                let idx = self.column_of(columns)?;
                let end = self
                    .read_elem(arena, columns, idx)
                    .map_err(|e| e.at_column(idx))?;
                arena.end_elem();
                self.order.push(idx);
                match end {
                    ElemEnd::Stop(b',') => continue,
                    ElemEnd::Stop(_) => break,
                    ElemEnd::Eof => {
                        return Err(Error::UnexpectedEof("JSON object").at_column(idx))
                    }
                }
            }
        }
        for idx in 0..columns.len() {
            if !self.order.contains(&idx) {
                arena.end_elem();
                self.order.push(idx);
            }
        }
        arena.end_row_mapped(&self.order)?;
        Ok(())
    }
}

impl<R: Read> ElemReader for JsonReader<R> {
    fn read_elem(
        &mut self,
        arena: &mut FrameBuffer,
        columns: &[Field],
        idx: usize,
    ) -> Result<ElemEnd> {
        let rules = ElemRules {
            stops: VALUE_STOPS,
            newline_significant: false,
            nested: columns[idx].data_type.is_nested(),
            unicode_escapes: true,
        };
        read_elem(&mut self.src, arena, &rules)
    }
}

impl<R: Read> RowReader for JsonReader<R> {
    fn read_first_row(&mut self, arena: &mut FrameBuffer, columns: &[Field]) -> Result<RowStatus> {
        if !self.enter_data()? {
            self.src.drain()?;
            return Ok(RowStatus::End);
        }
        self.read_row_cont(arena, columns)
    }

    fn read_row_cont(&mut self, arena: &mut FrameBuffer, columns: &[Field]) -> Result<RowStatus> {
        let mut next = self.skip_space()?;
        if next == Some(b',') {
            self.src.advance();
            next = self.skip_space()?;
        }
        match next {
            None => Ok(RowStatus::End),
            Some(b']') => {
                self.src.drain()?;
                Ok(RowStatus::End)
            }
            Some(b'{') => {
                self.src.advance();
                self.read_object(arena, columns).map_err(|e| {
                    arena.discard_row();
                    e
                })?;
                Ok(RowStatus::Row)
            }
            Some(other) => Err(Error::unexpected("'{' or ']'", other)),
        }
    }
}

impl<R: Read> TableReader for JsonReader<R> {}
