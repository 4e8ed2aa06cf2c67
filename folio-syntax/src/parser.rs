//! Building PDF objects from tokens.

use crate::object::{Dict, ObjRef, Object, ObjectStore, PdfString, Stream, keys};
use crate::token::{Delimiter, Lexer, Token};
use crate::trivia::{is_white_space_character, skip_eol};
use log::warn;

/// Arrays and dictionaries nested deeper than this are rejected.
pub const MAX_OBJECT_DEPTH: usize = 256;

/// A recursive-descent parser for PDF objects.
///
/// Parse methods return `None` and restore the position on failure.
#[derive(Debug, Clone)]
pub struct ObjectParser<'a> {
    lexer: Lexer<'a>,
    allow_refs: bool,
}

impl<'a> ObjectParser<'a> {
    /// Create a parser over object syntax, where `n g R` forms a reference.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            lexer: Lexer::new(data),
            allow_refs: true,
        }
    }

    /// Create a parser for content stream operands. References are not valid there.
    pub fn for_content(data: &'a [u8]) -> Self {
        Self {
            lexer: Lexer::new(data),
            allow_refs: false,
        }
    }

    /// The underlying lexer.
    pub fn lexer(&mut self) -> &mut Lexer<'a> {
        &mut self.lexer
    }

    /// Parse the next object.
    ///
    /// A keyword other than `true`, `false` or `null` is not an object: the
    /// parser rewinds and returns `None`.
    pub fn parse_object(&mut self) -> Option<Object> {
        let start = self.lexer.offset();
        let parsed = self
            .lexer
            .next_token()
            .and_then(|t| self.object_from_token(t, 0));

        if parsed.is_none() {
            self.lexer.jump(start);
        }

        parsed
    }

    /// Complete an object whose first token has already been read.
    pub fn object_from_token(&mut self, token: Token<'a>, depth: usize) -> Option<Object> {
        if depth > MAX_OBJECT_DEPTH {
            warn!("objects nested deeper than {MAX_OBJECT_DEPTH} levels");

            return None;
        }

        match token {
            Token::Number(n) => {
                if self.allow_refs
                    && n.is_integer()
                    && let Some(r) = self.try_reference(n.as_i64())
                {
                    return Some(Object::Ref(r));
                }

                Some(Object::Number(n))
            }
            Token::Literal(s) => Some(Object::String(PdfString::new(s, false))),
            Token::Hex(s) => Some(Object::String(PdfString::new(s, true))),
            Token::Name(n) => Some(Object::Name(n)),
            Token::Keyword(b"true") => Some(Object::Boolean(true)),
            Token::Keyword(b"false") => Some(Object::Boolean(false)),
            Token::Keyword(b"null") => Some(Object::Null),
            Token::Keyword(_) => None,
            Token::Delimiter(Delimiter::ArrayStart) => self.parse_array(depth),
            Token::Delimiter(Delimiter::DictStart) => {
                let dict = self.parse_dict_body(depth)?;

                Some(self.maybe_stream(dict))
            }
            Token::Delimiter(_) => None,
        }
    }

    fn try_reference(&mut self, num: i64) -> Option<ObjRef> {
        let start = self.lexer.offset();

        let parsed = (|| {
            let Token::Number(generation) = self.lexer.next_token()? else {
                return None;
            };

            if !generation.is_integer() || self.lexer.next_token()? != Token::Keyword(b"R") {
                return None;
            }

            Some(ObjRef::new(
                u32::try_from(num).ok()?,
                u16::try_from(generation.as_i64()).ok()?,
            ))
        })();

        if parsed.is_none() {
            self.lexer.jump(start);
        }

        parsed
    }

    fn parse_array(&mut self, depth: usize) -> Option<Object> {
        let mut items = vec![];

        loop {
            match self.lexer.next_token()? {
                Token::Delimiter(Delimiter::ArrayEnd) => break,
                token => match self.object_from_token(token, depth + 1) {
                    Some(obj) => items.push(obj),
                    None => warn!("skipping invalid array element"),
                },
            }
        }

        Some(Object::Array(items))
    }

    /// Parse dictionary entries up to and including `>>`.
    pub(crate) fn parse_dict_body(&mut self, depth: usize) -> Option<Dict> {
        let mut dict = Dict::new();

        loop {
            let key = match self.lexer.next_token()? {
                Token::Delimiter(Delimiter::DictEnd) => break,
                Token::Name(n) => n,
                other => {
                    warn!("expected a dictionary key, found {other:?}");
                    continue;
                }
            };

            let token = self.lexer.next_token()?;

            if token == Token::Delimiter(Delimiter::DictEnd) {
                warn!("dictionary key {key:?} has no value");
                break;
            }

            // A null value is equivalent to a missing entry.
            match self.object_from_token(token, depth + 1)? {
                Object::Null => {}
                value => dict.insert(key, value),
            }
        }

        Some(dict)
    }

    fn maybe_stream(&mut self, dict: Dict) -> Object {
        let before = self.lexer.offset();

        if self.lexer.next_token() != Some(Token::Keyword(b"stream")) {
            self.lexer.jump(before);

            return Object::Dict(dict);
        }

        let reader = self.lexer.reader();
        skip_eol(reader);
        let start = reader.offset();
        let data = reader.data();

        let declared_end = dict
            .get::<usize>(keys::LENGTH)
            .and_then(|len| start.checked_add(len))
            .filter(|end| ends_with_endstream(data, *end));

        let end = declared_end.or_else(|| {
            let pos = find(data.get(start..)?, b"endstream")? + start;
            let mut end = pos;

            if end > start && data[end - 1] == b'\n' {
                end -= 1;
            }

            if end > start && data[end - 1] == b'\r' {
                end -= 1;
            }

            Some(end)
        });

        let Some(end) = end else {
            warn!("stream without endstream");
            reader.jump(data.len());

            return Object::Stream(Stream::new(dict, data.get(start..).unwrap_or_default()));
        };

        let body = data.get(start..end).unwrap_or_default();
        reader.jump(end);
        reader.forward_while(is_white_space_character);
        reader.forward_tag(b"endstream");

        Object::Stream(Stream::new(dict, body))
    }

    /// Parse `num gen obj ... endobj`.
    pub fn parse_indirect_object(&mut self) -> Option<(ObjRef, Object)> {
        let start = self.lexer.offset();

        let parsed = (|| {
            let Token::Number(num) = self.lexer.next_token()? else {
                return None;
            };
            let Token::Number(generation) = self.lexer.next_token()? else {
                return None;
            };

            if self.lexer.next_token()? != Token::Keyword(b"obj") {
                return None;
            }

            let allow_refs = std::mem::replace(&mut self.allow_refs, true);
            let obj = self.parse_object();
            self.allow_refs = allow_refs;

            let before_end = self.lexer.offset();

            if self.lexer.next_token() != Some(Token::Keyword(b"endobj")) {
                self.lexer.jump(before_end);
            }

            Some((
                ObjRef::new(
                    u32::try_from(num.as_i64()).ok()?,
                    u16::try_from(generation.as_i64()).ok()?,
                ),
                obj?,
            ))
        })();

        if parsed.is_none() {
            self.lexer.jump(start);
        }

        parsed
    }
}

fn ends_with_endstream(data: &[u8], end: usize) -> bool {
    let Some(tail) = data.get(end..) else {
        return false;
    };

    let skipped = tail
        .iter()
        .take_while(|b| is_white_space_character(**b))
        .count();

    tail[skipped..].starts_with(b"endstream")
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

impl ObjectStore {
    /// Build a store from a sequence of `num gen obj ... endobj` definitions.
    ///
    /// Parsing stops at the first byte sequence that is not an indirect object.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut parser = ObjectParser::new(data);
        let mut store = Self::new();

        while let Some((r, obj)) = parser.parse_indirect_object() {
            store.insert(r, obj);
        }

        store
    }
}

impl Dict {
    /// Parse a dictionary from bytes.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        Object::from_bytes(data)?.as_dict().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Name, Number, Resolve};

    #[test]
    fn nested_structures() {
        let obj = Object::from_bytes(b"<< /Type /Page /Kids [1 0 R 2 0 R] /N [1 [2 (x)]] >>")
            .unwrap();
        let dict = obj.as_dict().unwrap();

        assert_eq!(dict.get::<Name>(b"Type"), Some(Name::new(b"Page".to_vec())));
        assert_eq!(
            dict.get::<Vec<ObjRef>>(b"Kids"),
            Some(vec![ObjRef::new(1, 0), ObjRef::new(2, 0)])
        );
        assert_eq!(dict.get_raw(b"N").and_then(|n| n.as_array()).map(|a| a.len()), Some(2));
    }

    #[test]
    fn numbers_are_not_refs_without_r() {
        assert_eq!(
            Object::from_bytes(b"[1 0 2]"),
            Some(Object::Array(vec![
                Object::Number(Number::from_i64(1)),
                Object::Number(Number::ZERO),
                Object::Number(Number::from_i64(2)),
            ]))
        );
    }

    #[test]
    fn content_operands_have_no_refs() {
        let mut parser = ObjectParser::for_content(b"1 0 R");
        assert_eq!(parser.parse_object(), Some(Object::Number(Number::from_i64(1))));
    }

    #[test]
    fn null_entries_are_dropped() {
        let dict = Dict::from_bytes(b"<< /A null /B 1 >>").unwrap();
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn stream_with_length() {
        let obj = Object::from_bytes(b"<< /Length 5 >>\nstream\r\nab\ncd\nendstream").unwrap();
        assert_eq!(obj.as_stream().unwrap().raw_data(), b"ab\ncd");
    }

    #[test]
    fn stream_with_wrong_length() {
        let obj = Object::from_bytes(b"<< /Length 99 >> stream\nabc\nendstream").unwrap();
        assert_eq!(obj.as_stream().unwrap().raw_data(), b"abc");
    }

    #[test]
    fn keyword_is_not_an_object() {
        let mut parser = ObjectParser::new(b"Tf");
        assert_eq!(parser.parse_object(), None);
        assert_eq!(parser.lexer().offset(), 0);
    }

    #[test]
    fn indirect_objects() {
        let store = ObjectStore::from_bytes(b"1 0 obj << /A 2 0 R >> endobj 2 0 obj 42 endobj");
        assert_eq!(store.len(), 2);
        assert_eq!(
            store.resolve(ObjRef::new(2, 0)),
            Some(Object::Number(Number::from_i64(42)))
        );
    }
}
