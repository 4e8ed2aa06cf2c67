pub(crate) fn decode(data: &[u8]) -> Option<Vec<u8>> {
    let mut out = vec![];
    let mut iter = data.iter().copied();

    while let Some(len) = iter.next() {
        match len {
            0..=127 => {
                for _ in 0..=len {
                    out.push(iter.next()?);
                }
            }
            128 => break,
            _ => {
                let b = iter.next()?;
                out.extend(std::iter::repeat_n(b, 257 - len as usize));
            }
        }
    }

    Some(out)
}

#[cfg(test)]
mod tests {
    use super::decode;

    #[test]
    fn literal_and_repeat() {
        assert_eq!(
            decode(&[4, 10, 11, 12, 13, 14, 253, 3, 128]).unwrap(),
            vec![10, 11, 12, 13, 14, 3, 3, 3, 3]
        );
    }

    #[test]
    fn truncated() {
        assert!(decode(&[3, 1, 2]).is_none());
    }
}
