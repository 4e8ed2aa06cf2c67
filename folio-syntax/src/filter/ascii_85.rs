use crate::trivia::is_white_space_character;

pub(crate) fn decode(data: &[u8]) -> Option<Vec<u8>> {
    let mut out = vec![];
    let mut group = [0u8; 5];
    let mut len = 0;

    let data = data.strip_prefix(b"<~").unwrap_or(data);

    for b in data.iter().copied() {
        if is_white_space_character(b) {
            continue;
        }

        match b {
            b'~' => break,
            b'z' if len == 0 => out.extend_from_slice(&[0; 4]),
            b'!'..=b'u' => {
                group[len] = b - b'!';
                len += 1;

                if len == 5 {
                    out.extend_from_slice(&word(group)?);
                    len = 0;
                }
            }
            _ => return None,
        }
    }

    // A partial group of n characters decodes to n - 1 bytes, padded with `u`.
    if len > 0 {
        if len == 1 {
            return None;
        }

        for slot in group.iter_mut().skip(len) {
            *slot = 84;
        }

        out.extend_from_slice(&word(group)?[..len - 1]);
    }

    Some(out)
}

fn word(group: [u8; 5]) -> Option<[u8; 4]> {
    let value = group
        .iter()
        .fold(0u64, |acc, digit| acc * 85 + *digit as u64);

    Some(u32::try_from(value).ok()?.to_be_bytes())
}

#[cfg(test)]
mod tests {
    use super::decode;

    #[test]
    fn simple() {
        assert_eq!(decode(b"87cURDZ~>").unwrap(), b"Hello");
    }

    #[test]
    fn with_spaces_and_zero() {
        assert_eq!(decode(b"87cUR D]i,\"Ebo80z~>").unwrap(), b"Hello World!\0\0\0\0");
    }

    #[test]
    fn invalid_character() {
        assert!(decode(b"87c{URD~>").is_none());
    }
}
