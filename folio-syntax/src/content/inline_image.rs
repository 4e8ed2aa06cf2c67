use crate::content::{ContentError, ParseLimits};
use crate::object::{Dict, Name, Object, keys};
use crate::parser::ObjectParser;
use crate::token::Token;
use crate::trivia::is_white_space_character;

/// An inline image: its (normalized) header dictionary and raw data.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    dict: Dict,
    data: Vec<u8>,
}

impl InlineImage {
    /// Create an inline image from a header dictionary and its still-encoded data.
    pub fn new(dict: Dict, data: Vec<u8>) -> Self {
        Self { dict, data }
    }

    /// The header, with abbreviated keys and names expanded.
    pub fn dict(&self) -> &Dict {
        &self.dict
    }

    /// The raw, still filtered image data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Read the header and data of an inline image. `BI` has already been consumed.
pub(crate) fn read(
    parser: &mut ObjectParser<'_>,
    bi_offset: usize,
    limits: &ParseLimits,
) -> Result<InlineImage, ContentError> {
    let malformed = ContentError::MalformedInlineImage { offset: bi_offset };
    let mut dict = Dict::new();

    loop {
        match parser.lexer().next_token().ok_or(malformed)? {
            Token::Keyword(b"ID") => break,
            Token::Name(key) => {
                let token = parser.lexer().next_token().ok_or(malformed)?;
                let value = parser.object_from_token(token, 0).ok_or(malformed)?;
                let key = expand_key(key);
                let value = expand_value(&key, value);

                dict.insert(key, value);
            }
            _ => return Err(malformed),
        }
    }

    let reader = parser.lexer().reader();
    // Exactly one white-space byte separates `ID` from the data.
    reader.eat(is_white_space_character);
    let start = reader.offset();
    let data = reader.data();

    let known_end = dict
        .get::<usize>(keys::LENGTH)
        .or_else(|| unfiltered_length(&dict))
        .and_then(|len| start.checked_add(len))
        .and_then(|end| terminator_after(data, end).map(|after| (end, after)));

    let (end, after) = match known_end {
        Some(found) => found,
        None => scan_for_terminator(data, start, limits.max_inline_image_bytes)?,
    };

    if end - start > limits.max_inline_image_bytes {
        return Err(ContentError::InlineImageTooLarge { offset: start });
    }

    reader.jump(after);

    Ok(InlineImage::new(dict, data[start..end].to_vec()))
}

/// If `EI` follows `end` after optional white space, return the offset after it.
fn terminator_after(data: &[u8], end: usize) -> Option<usize> {
    let mut pos = end;

    while data.get(pos).copied().is_some_and(is_white_space_character) {
        pos += 1;
    }

    (data.get(pos..pos + 2)? == b"EI" && ends_token(data, pos + 2)).then_some(pos + 2)
}

fn ends_token(data: &[u8], pos: usize) -> bool {
    data.get(pos).is_none_or(|b| is_white_space_character(*b))
}

/// Find `EI` surrounded by white space (or followed by the end of the data).
///
/// Returns the end of the image data (excluding the white space before
/// `EI`) and the offset after `EI`.
fn scan_for_terminator(
    data: &[u8],
    start: usize,
    limit: usize,
) -> Result<(usize, usize), ContentError> {
    let scan_end = data.len().min(start.saturating_add(limit).saturating_add(3));
    let mut pos = start;

    while pos + 1 < scan_end {
        if data[pos] == b'E' && data[pos + 1] == b'I' && ends_token(data, pos + 2) {
            if pos == start {
                return Ok((start, pos + 2));
            }

            if is_white_space_character(data[pos - 1]) {
                return Ok((pos - 1, pos + 2));
            }
        }

        pos += 1;
    }

    if scan_end < data.len() {
        Err(ContentError::InlineImageTooLarge { offset: start })
    } else {
        Err(ContentError::UnterminatedInlineImage { offset: start })
    }
}

/// The exact data length of an unfiltered image with a device or indexed color space.
fn unfiltered_length(dict: &Dict) -> Option<usize> {
    if dict.contains_key(keys::FILTER) {
        return None;
    }

    let width = dict.get::<usize>(keys::WIDTH)?;
    let height = dict.get::<usize>(keys::HEIGHT)?;

    let (components, bpc) = if dict.get::<bool>(keys::IMAGE_MASK) == Some(true) {
        (1, 1)
    } else {
        let components = match dict.get_raw(keys::COLOR_SPACE)? {
            Object::Name(n) => match n.as_bytes() {
                b"DeviceGray" => 1,
                b"DeviceRGB" => 3,
                b"DeviceCMYK" => 4,
                _ => return None,
            },
            Object::Array(a) if a.first()?.as_name()?.as_bytes() == b"Indexed" => 1,
            _ => return None,
        };

        (components, dict.get::<usize>(keys::BITS_PER_COMPONENT)?)
    };

    let row = (width.checked_mul(components)?.checked_mul(bpc)?).div_ceil(8);

    row.checked_mul(height)
}

fn expand_key(key: Name) -> Name {
    let full: &[u8] = match key.as_bytes() {
        b"BPC" => keys::BITS_PER_COMPONENT,
        b"CS" => keys::COLOR_SPACE,
        b"D" => keys::DECODE,
        b"DP" => keys::DECODE_PARMS,
        b"F" => keys::FILTER,
        b"H" => keys::HEIGHT,
        b"IM" => keys::IMAGE_MASK,
        b"I" => keys::INTERPOLATE,
        b"L" => keys::LENGTH,
        b"W" => keys::WIDTH,
        _ => return key,
    };

    Name::new(full)
}

fn expand_value(key: &Name, value: Object) -> Object {
    let expand_name = |obj: Object| match obj {
        Object::Name(n) => Object::Name(match n.as_bytes() {
            b"G" => Name::new(&b"DeviceGray"[..]),
            b"RGB" => Name::new(&b"DeviceRGB"[..]),
            b"CMYK" => Name::new(&b"DeviceCMYK"[..]),
            b"I" => Name::new(&b"Indexed"[..]),
            b"AHx" => Name::new(&b"ASCIIHexDecode"[..]),
            b"A85" => Name::new(&b"ASCII85Decode"[..]),
            b"LZW" => Name::new(&b"LZWDecode"[..]),
            b"Fl" => Name::new(&b"FlateDecode"[..]),
            b"RL" => Name::new(&b"RunLengthDecode"[..]),
            b"CCF" => Name::new(&b"CCITTFaxDecode"[..]),
            b"DCT" => Name::new(&b"DCTDecode"[..]),
            _ => n,
        }),
        other => other,
    };

    if key != keys::COLOR_SPACE && key != keys::FILTER {
        return value;
    }

    match value {
        Object::Array(items) => Object::Array(items.into_iter().map(expand_name).collect()),
        other => expand_name(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_stops_at_whitespace_ei() {
        let data = b"\x01\x02 EI Q";
        assert_eq!(scan_for_terminator(data, 0, 100), Ok((2, 5)));
    }

    #[test]
    fn scan_skips_embedded_ei() {
        let data = b"\x00EI\x05 EI";
        assert_eq!(scan_for_terminator(data, 0, 100), Ok((4, 7)));
    }

    #[test]
    fn scan_requires_separator_after_ei() {
        let data = b"a EIx b EI\n";
        assert_eq!(scan_for_terminator(data, 0, 100), Ok((7, 10)));
    }

    #[test]
    fn scan_unterminated() {
        assert_eq!(
            scan_for_terminator(b"abc", 0, 100),
            Err(ContentError::UnterminatedInlineImage { offset: 0 })
        );
    }

    #[test]
    fn scan_limit() {
        assert_eq!(
            scan_for_terminator(b"0123456789 EI", 0, 4),
            Err(ContentError::InlineImageTooLarge { offset: 0 })
        );
    }

    #[test]
    fn expected_length() {
        let dict = Dict::from_bytes(
            b"<< /Width 3 /Height 2 /BitsPerComponent 4 /ColorSpace /DeviceRGB >>",
        )
        .unwrap();
        assert_eq!(unfiltered_length(&dict), Some(10));
    }
}
