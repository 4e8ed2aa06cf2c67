//! Splitting bytes into PDF tokens.

use crate::object::{Name, Number, hex_value};
use crate::trivia::{
    is_regular_character, is_white_space_character, skip_white_spaces_and_comments,
};
use folio_common::byte::Reader;
use log::warn;

/// Structural delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// `[`
    ArrayStart,
    /// `]`
    ArrayEnd,
    /// `<<`
    DictStart,
    /// `>>`
    DictEnd,
    /// `{`
    ProcStart,
    /// `}`
    ProcEnd,
}

/// A single lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    /// An integer or real.
    Number(Number),
    /// A `(...)` string, escapes decoded.
    Literal(Vec<u8>),
    /// A `<...>` string, digits decoded.
    Hex(Vec<u8>),
    /// A `/Name`.
    Name(Name),
    /// A bare word such as an operator, `true` or `obj`.
    Keyword(&'a [u8]),
    /// A delimiter.
    Delimiter(Delimiter),
}

/// Lazily produces tokens from a byte slice.
///
/// The lexer never fails hard: malformed input is skipped with a warning.
/// `next_token` only returns `None` at the end of the data.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    reader: Reader<'a>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            reader: Reader::new(data),
        }
    }

    /// The byte offset of the next unread byte.
    pub fn offset(&self) -> usize {
        self.reader.offset()
    }

    /// Rewind or fast-forward to `offset`, e.g. to undo a lookahead.
    pub fn jump(&mut self, offset: usize) {
        self.reader.jump(offset);
    }

    /// Raw access to the underlying byte cursor.
    pub fn reader(&mut self) -> &mut Reader<'a> {
        &mut self.reader
    }

    /// Whether only trivia remains.
    pub fn at_end(&mut self) -> bool {
        skip_white_spaces_and_comments(&mut self.reader);
        self.reader.at_end()
    }

    /// Read the next token.
    pub fn next_token(&mut self) -> Option<Token<'a>> {
        loop {
            skip_white_spaces_and_comments(&mut self.reader);
            let b = self.reader.peek_byte()?;

            let token = match b {
                b'/' => {
                    self.reader.forward();
                    let start = self.reader.offset();
                    self.reader.forward_while(is_regular_character);
                    let raw = self.reader.range(start..self.reader.offset())?;

                    Some(Token::Name(Name::from_escaped(raw)))
                }
                b'(' => {
                    self.reader.forward();
                    Some(Token::Literal(self.read_literal()))
                }
                b'<' => {
                    if self.reader.forward_tag(b"<<").is_some() {
                        Some(Token::Delimiter(Delimiter::DictStart))
                    } else {
                        self.reader.forward();
                        Some(Token::Hex(self.read_hex()))
                    }
                }
                b'>' => {
                    if self.reader.forward_tag(b">>").is_some() {
                        Some(Token::Delimiter(Delimiter::DictEnd))
                    } else {
                        self.reader.forward();
                        warn!("stray '>' at offset {}", self.reader.offset() - 1);
                        None
                    }
                }
                b'[' => self.delimiter(Delimiter::ArrayStart),
                b']' => self.delimiter(Delimiter::ArrayEnd),
                b'{' => self.delimiter(Delimiter::ProcStart),
                b'}' => self.delimiter(Delimiter::ProcEnd),
                b')' => {
                    self.reader.forward();
                    warn!("stray ')' at offset {}", self.reader.offset() - 1);
                    None
                }
                _ => {
                    let start = self.reader.offset();
                    self.reader.forward_while(is_regular_character);
                    let raw = self.reader.range(start..self.reader.offset())?;

                    if matches!(raw[0], b'0'..=b'9' | b'+' | b'-' | b'.') {
                        match Number::parse(raw) {
                            Some(n) => Some(Token::Number(n)),
                            None => Some(Token::Keyword(raw)),
                        }
                    } else {
                        Some(Token::Keyword(raw))
                    }
                }
            };

            if let Some(token) = token {
                return Some(token);
            }
        }
    }

    fn delimiter(&mut self, d: Delimiter) -> Option<Token<'a>> {
        self.reader.forward();

        Some(Token::Delimiter(d))
    }

    // Called after the opening parenthesis. An unterminated string runs to the end.
    fn read_literal(&mut self) -> Vec<u8> {
        let r = &mut self.reader;
        let mut out = vec![];
        let mut depth = 1;

        while let Some(b) = r.read_byte() {
            match b {
                b'\\' => {
                    let Some(next) = r.read_byte() else {
                        break;
                    };

                    match next {
                        b'n' => out.push(b'\n'),
                        b'r' => out.push(b'\r'),
                        b't' => out.push(b'\t'),
                        b'b' => out.push(0x08),
                        b'f' => out.push(0x0c),
                        b'0'..=b'7' => {
                            let mut value = (next - b'0') as u32;

                            for _ in 0..2 {
                                match r.peek_byte() {
                                    Some(d @ b'0'..=b'7') => {
                                        r.forward();
                                        value = value * 8 + (d - b'0') as u32;
                                    }
                                    _ => break,
                                }
                            }

                            // High-order overflow is ignored.
                            out.push(value as u8);
                        }
                        // Line continuation.
                        b'\r' => {
                            r.eat(|b| b == b'\n');
                        }
                        b'\n' => {}
                        // `\(`, `\)`, `\\` and unknown escapes yield the character itself.
                        other => out.push(other),
                    }
                }
                b'(' => {
                    depth += 1;
                    out.push(b);
                }
                b')' => {
                    depth -= 1;

                    if depth == 0 {
                        break;
                    }

                    out.push(b);
                }
                // Every end-of-line marker reads as a single line feed.
                b'\r' => {
                    r.eat(|b| b == b'\n');
                    out.push(b'\n');
                }
                _ => out.push(b),
            }
        }

        out
    }

    // Called after the opening angle bracket.
    fn read_hex(&mut self) -> Vec<u8> {
        let r = &mut self.reader;
        let mut out = vec![];
        let mut pending: Option<u8> = None;

        while let Some(b) = r.read_byte() {
            if b == b'>' {
                break;
            }

            if is_white_space_character(b) {
                continue;
            }

            let Some(v) = hex_value(b) else {
                warn!("invalid hex digit {b:#04x} in hex string");
                continue;
            };

            match pending.take() {
                Some(hi) => out.push(hi << 4 | v),
                None => pending = Some(v),
            }
        }

        // An odd final digit is padded with zero.
        if let Some(hi) = pending {
            out.push(hi << 4);
        }

        out
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}
