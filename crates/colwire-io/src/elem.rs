//! Element grammar shared by every text codec.
//!
//! An element is one column value of one row. It may be:
//! - quoted with `'`, `"` or `` ` ``: quotes are stripped, backslash escapes
//!   (`\n \r \t \v \f \a \b \0`, `\xNN`, any other byte literally) and a
//!   doubled quote are resolved;
//! - bracketed (`[...]`, `{...}`) for array and map columns: captured
//!   verbatim, including nested quoted strings;
//! - raw: every byte up to the stop byte.
//!
//! Reading consumes the stop byte that ended the element.

use std::io::Read;

use colwire_mem::FrameBuffer;

use crate::error::{Error, Result};
use crate::source::ByteSource;
use crate::traits::ElemEnd;

/// Where element bytes go.
pub trait ByteSink {
    fn put(&mut self, b: u8);

    /// Drop a trailing `\r` from the element written so far.
    fn pop_cr(&mut self);
}

impl ByteSink for FrameBuffer {
    fn put(&mut self, b: u8) {
        self.write_byte(b);
    }

    fn pop_cr(&mut self) {
        let pending = self.pending();
        if pending.last() == Some(&b'\r') {
            let len = pending.len() - 1;
            self.truncate_pending(len);
        }
    }
}

impl ByteSink for Vec<u8> {
    fn put(&mut self, b: u8) {
        self.push(b);
    }

    fn pop_cr(&mut self) {
        if self.last() == Some(&b'\r') {
            self.pop();
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ElemRules<'a> {
    /// Bytes that may end this element.
    pub stops: &'a [u8],
    /// `\n` ends rows, so it is never skipped as whitespace.
    pub newline_significant: bool,
    /// Capture `[...]` / `{...}` values bracket-balanced.
    pub nested: bool,
    /// Accept `\uXXXX` escapes inside quoted strings.
    pub unicode_escapes: bool,
}

pub fn is_quote(b: u8) -> bool {
    matches!(b, b'\'' | b'"' | b'`')
}

fn is_space(b: u8, rules: &ElemRules<'_>) -> bool {
    if rules.stops.contains(&b) {
        return false;
    }
    match b {
        b' ' | b'\t' | b'\r' => true,
        b'\n' => !rules.newline_significant,
        _ => false,
    }
}

pub(crate) fn describe_stops(stops: &[u8]) -> String {
    stops
        .iter()
        .map(|&b| match b {
            b'\n' => "end of line".to_string(),
            b'\t' => "tab".to_string(),
            other if other.is_ascii_graphic() => format!("'{}'", other as char),
            other => format!("byte 0x{other:02x}"),
        })
        .collect::<Vec<_>>()
        .join(" or ")
}

/// Read one element into `sink`.
pub fn read_elem<R: Read, S: ByteSink>(
    src: &mut ByteSource<R>,
    sink: &mut S,
    rules: &ElemRules<'_>,
) -> Result<ElemEnd> {
    match src.skip_while(|b| is_space(b, rules))? {
        None => Ok(ElemEnd::Eof),
        Some(b) if rules.stops.contains(&b) => {
            src.advance();
            Ok(ElemEnd::Stop(b))
        }
        Some(q) if is_quote(q) => {
            src.advance();
            read_quoted(src, sink, q, rules.unicode_escapes)?;
            finish(src, rules)
        }
        Some(b'[' | b'{') if rules.nested => {
            read_bracketed(src, sink)?;
            finish(src, rules)
        }
        Some(_) => read_raw(src, sink, rules),
    }
}

/// After a quoted or bracketed value only whitespace may precede the stop byte.
fn finish<R: Read>(src: &mut ByteSource<R>, rules: &ElemRules<'_>) -> Result<ElemEnd> {
    match src.skip_while(|b| is_space(b, rules))? {
        None => Ok(ElemEnd::Eof),
        Some(b) if rules.stops.contains(&b) => {
            src.advance();
            Ok(ElemEnd::Stop(b))
        }
        Some(b) => Err(Error::unexpected(describe_stops(rules.stops), b)),
    }
}

fn read_raw<R: Read, S: ByteSink>(
    src: &mut ByteSource<R>,
    sink: &mut S,
    rules: &ElemRules<'_>,
) -> Result<ElemEnd> {
    while let Some(b) = src.peek()? {
        if rules.stops.contains(&b) {
            src.advance();
            if b == b'\n' {
                sink.pop_cr();
            }
            return Ok(ElemEnd::Stop(b));
        }
        if b == b'\n' && rules.newline_significant {
            return Err(Error::unexpected(describe_stops(rules.stops), b));
        }
        sink.put(b);
        src.advance();
    }
    Ok(ElemEnd::Eof)
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn read_hex<R: Read>(src: &mut ByteSource<R>, digits: usize) -> Result<u32> {
    let mut v = 0u32;
    for _ in 0..digits {
        let b = src
            .next_byte()?
            .ok_or(Error::UnexpectedEof("hex escape"))?;
        let d = hex_digit(b).ok_or_else(|| Error::unexpected("hex digit", b))?;
        v = v * 16 + d as u32;
    }
    Ok(v)
}

fn put_char<S: ByteSink>(sink: &mut S, ch: char) {
    let mut buf = [0u8; 4];
    for &b in ch.encode_utf8(&mut buf).as_bytes() {
        sink.put(b);
    }
}

fn read_unicode_escape<R: Read, S: ByteSink>(src: &mut ByteSource<R>, sink: &mut S) -> Result<()> {
    let hi = read_hex(src, 4)?;
    let code = if (0xD800..0xDC00).contains(&hi) && src.peek()? == Some(b'\\') {
        src.advance();
        match src.next_byte()? {
            Some(b'u') => {
                let lo = read_hex(src, 4)?;
                if (0xDC00..0xE000).contains(&lo) {
                    0x10000 + ((hi - 0xD800) << 10) + (lo - 0xDC00)
                } else {
                    0xFFFD
                }
            }
            Some(other) => return Err(Error::unexpected("'u' after surrogate", other)),
            None => return Err(Error::UnexpectedEof("unicode escape")),
        }
    } else {
        hi
    };
    put_char(sink, char::from_u32(code).unwrap_or('\u{FFFD}'));
    Ok(())
}

/// Read a quoted string whose opening `quote` has been consumed.
pub fn read_quoted<R: Read, S: ByteSink>(
    src: &mut ByteSource<R>,
    sink: &mut S,
    quote: u8,
    unicode_escapes: bool,
) -> Result<()> {
    loop {
        let b = src
            .next_byte()?
            .ok_or(Error::UnexpectedEof("quoted value"))?;
        if b == b'\\' {
            let esc = src
                .next_byte()?
                .ok_or(Error::UnexpectedEof("escape sequence"))?;
            match esc {
                b'n' => sink.put(b'\n'),
                b'r' => sink.put(b'\r'),
                b't' => sink.put(b'\t'),
                b'v' => sink.put(0x0b),
                b'f' => sink.put(0x0c),
                b'a' => sink.put(0x07),
                b'b' => sink.put(0x08),
                b'0' => sink.put(0),
                b'x' => sink.put(read_hex(src, 2)? as u8),
                b'u' if unicode_escapes => read_unicode_escape(src, sink)?,
                other => sink.put(other),
            }
        } else if b == quote {
            if src.peek()? == Some(quote) {
                src.advance();
                sink.put(quote);
            } else {
                return Ok(());
            }
        } else {
            sink.put(b);
        }
    }
}

/// Copy a bracket-balanced value verbatim.
fn read_bracketed<R: Read, S: ByteSink>(src: &mut ByteSource<R>, sink: &mut S) -> Result<()> {
    let mut depth = 0usize;
    let mut in_quote: Option<u8> = None;
    loop {
        let b = src
            .next_byte()?
            .ok_or(Error::UnexpectedEof("bracketed value"))?;
        sink.put(b);
        match in_quote {
            Some(q) => {
                if b == b'\\' {
                    let next = src
                        .next_byte()?
                        .ok_or(Error::UnexpectedEof("escape sequence"))?;
                    sink.put(next);
                } else if b == q {
                    in_quote = None;
                }
            }
            None => match b {
                b'[' | b'{' | b'(' => depth += 1,
                b']' | b'}' | b')' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Ok(());
                    }
                }
                q if is_quote(q) => in_quote = Some(q),
                _ => {}
            },
        }
    }
}
