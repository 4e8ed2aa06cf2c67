use crate::object::hex_value;
use crate::trivia::is_white_space_character;

pub(crate) fn decode(data: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() / 2);
    let mut pending = None;

    for b in data.iter().copied() {
        if b == b'>' {
            break;
        }

        if is_white_space_character(b) {
            continue;
        }

        let v = hex_value(b)?;

        match pending.take() {
            Some(hi) => out.push(hi << 4 | v),
            None => pending = Some(v),
        }
    }

    if let Some(hi) = pending {
        out.push(hi << 4);
    }

    Some(out)
}
