//! Buffered byte source with single-byte lookahead.

use std::io::{BufRead, BufReader, ErrorKind, Read};

use crate::error::Result;

pub struct ByteSource<R: Read> {
    inner: BufReader<R>,
    offset: u64,
}

impl<R: Read> ByteSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            inner: BufReader::with_capacity(64 * 1024, reader),
            offset: 0,
        }
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn peek(&mut self) -> Result<Option<u8>> {
        loop {
            match self.inner.fill_buf() {
                Ok(buf) => return Ok(buf.first().copied()),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub fn next_byte(&mut self) -> Result<Option<u8>> {
        let b = self.peek()?;
        if b.is_some() {
            self.inner.consume(1);
            self.offset += 1;
        }
        Ok(b)
    }

    /// Consume the peeked byte. Call only after `peek` returned `Some`.
    pub fn advance(&mut self) {
        self.inner.consume(1);
        self.offset += 1;
    }

    /// Consume bytes while `pred` holds; returns the first byte that did not match.
    pub fn skip_while(&mut self, mut pred: impl FnMut(u8) -> bool) -> Result<Option<u8>> {
        while let Some(b) = self.peek()? {
            if !pred(b) {
                return Ok(Some(b));
            }
            self.advance();
        }
        Ok(None)
    }

    /// Consume through the next `\n` (or to end of input).
    pub fn skip_line(&mut self) -> Result<()> {
        while let Some(b) = self.next_byte()? {
            if b == b'\n' {
                break;
            }
        }
        Ok(())
    }

    /// Discard everything that is left.
    pub fn drain(&mut self) -> Result<()> {
        let mut sink = std::io::sink();
        let n = std::io::copy(&mut self.inner, &mut sink)?;
        self.offset += n;
        Ok(())
    }
}
