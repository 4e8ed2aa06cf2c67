//! Byte classes of the PDF lexical grammar.

use folio_common::byte::Reader;

/// Whether the byte is one of the six PDF white-space characters.
#[inline(always)]
pub fn is_white_space_character(b: u8) -> bool {
    matches!(b, 0x00 | 0x09 | 0x0a | 0x0c | 0x0d | 0x20)
}

/// Whether the byte delimits tokens.
#[inline(always)]
pub fn is_delimiter_character(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

/// Whether the byte may appear inside a name, number or keyword.
#[inline(always)]
pub fn is_regular_character(b: u8) -> bool {
    !is_white_space_character(b) && !is_delimiter_character(b)
}

#[inline(always)]
pub(crate) fn is_eol_character(b: u8) -> bool {
    matches!(b, 0x0a | 0x0d)
}

/// Skip white space and `%` comments.
pub(crate) fn skip_white_spaces_and_comments(r: &mut Reader<'_>) {
    loop {
        r.forward_while(is_white_space_character);

        if r.forward_tag(b"%").is_some() {
            r.forward_while(|b| !is_eol_character(b));
        } else {
            break;
        }
    }
}

/// Skip a single end-of-line marker (`\r\n`, `\n` or `\r`).
pub(crate) fn skip_eol(r: &mut Reader<'_>) {
    if r.forward_tag(b"\r\n").is_none() {
        r.eat(is_eol_character);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_are_trivia() {
        let mut r = Reader::new(b"  % a comment\r\n % another\n1");
        skip_white_spaces_and_comments(&mut r);
        assert_eq!(r.peek_byte(), Some(b'1'));
    }

    #[test]
    fn classes() {
        assert!(is_regular_character(b'*'));
        assert!(!is_regular_character(b'/'));
        assert!(is_white_space_character(0x0c));
    }
}
