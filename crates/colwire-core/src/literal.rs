//! Parser for nested literal text (`[1, 2]`, `['a', "b"]`, `{'k': [1]}`).
//!
//! Array and map columns arrive from the codecs as raw bracket-balanced text;
//! this turns that text into a tree the column storage can coerce element by
//! element.

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Unquoted token, already trimmed.
    Bare(String),
    /// Quoted string with escapes resolved.
    Quoted(String),
    List(Vec<Literal>),
    Map(Vec<(Literal, Literal)>),
}

impl Literal {
    /// Text of a scalar literal; `None` for lists and maps.
    pub fn text(&self) -> Option<&str> {
        match self {
            Literal::Bare(s) | Literal::Quoted(s) => Some(s),
            _ => None,
        }
    }
}

pub fn parse(text: &str) -> Result<Literal> {
    let mut p = Parser {
        src: text.as_bytes(),
        pos: 0,
    };
    let lit = p.value()?;
    p.skip_ws();
    if p.pos != p.src.len() {
        return Err(p.error("trailing characters after literal"));
    }
    Ok(lit)
}

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, reason: &str) -> Error {
        Error::Parse {
            text: String::from_utf8_lossy(self.src).into_owned(),
            data_type: "literal".into(),
            reason: format!("{reason} at offset {}", self.pos),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, b: u8) -> Result<()> {
        self.skip_ws();
        if self.peek() == Some(b) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", b as char)))
        }
    }

    fn value(&mut self) -> Result<Literal> {
        self.skip_ws();
        match self.peek() {
            Some(b'[') => {
                self.pos += 1;
                let mut items = Vec::new();
                self.skip_ws();
                if self.peek() == Some(b']') {
                    self.pos += 1;
                    return Ok(Literal::List(items));
                }
                loop {
                    items.push(self.value()?);
                    self.skip_ws();
                    match self.peek() {
                        Some(b',') => self.pos += 1,
                        Some(b']') => {
                            self.pos += 1;
                            return Ok(Literal::List(items));
                        }
                        _ => return Err(self.error("expected ',' or ']'")),
                    }
                }
            }
            Some(b'{') => {
                self.pos += 1;
                let mut entries = Vec::new();
                self.skip_ws();
                if self.peek() == Some(b'}') {
                    self.pos += 1;
                    return Ok(Literal::Map(entries));
                }
                loop {
                    let key = self.value()?;
                    self.expect(b':')?;
                    let val = self.value()?;
                    entries.push((key, val));
                    self.skip_ws();
                    match self.peek() {
                        Some(b',') => self.pos += 1,
                        Some(b'}') => {
                            self.pos += 1;
                            return Ok(Literal::Map(entries));
                        }
                        _ => return Err(self.error("expected ',' or '}'")),
                    }
                }
            }
            Some(q @ (b'\'' | b'"')) => {
                self.pos += 1;
                self.quoted(q).map(Literal::Quoted)
            }
            Some(_) => {
                let start = self.pos;
                while let Some(b) = self.peek() {
                    if matches!(b, b',' | b']' | b'}' | b':') {
                        break;
                    }
                    self.pos += 1;
                }
                let token = String::from_utf8_lossy(&self.src[start..self.pos]);
                Ok(Literal::Bare(token.trim().to_string()))
            }
            None => Err(self.error("unexpected end of literal")),
        }
    }

    fn quoted(&mut self, quote: u8) -> Result<String> {
        let mut out = Vec::new();
        loop {
            let b = self.peek().ok_or_else(|| self.error("unterminated string"))?;
            self.pos += 1;
            if b == b'\\' {
                let esc = self.peek().ok_or_else(|| self.error("dangling escape"))?;
                self.pos += 1;
                out.push(match esc {
                    b'n' => b'\n',
                    b't' => b'\t',
                    b'r' => b'\r',
                    b'0' => 0,
                    other => other,
                });
            } else if b == quote {
                if self.peek() == Some(quote) {
                    self.pos += 1;
                    out.push(quote);
                } else {
                    break;
                }
            } else {
                out.push(b);
            }
        }
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}
