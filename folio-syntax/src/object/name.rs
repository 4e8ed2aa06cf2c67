//! Name objects.

use std::borrow::Borrow;
use std::fmt;

/// A PDF name with `#xx` escapes already resolved.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(Vec<u8>);

impl Name {
    /// Create a name from already unescaped bytes.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self(data.into())
    }

    /// Create a name from the raw bytes following the solidus.
    pub(crate) fn from_escaped(raw: &[u8]) -> Self {
        if !raw.contains(&b'#') {
            return Self(raw.to_vec());
        }

        let mut out = Vec::with_capacity(raw.len());
        let mut i = 0;

        while i < raw.len() {
            let b = raw[i];

            if b == b'#'
                && let Some(hi) = raw.get(i + 1).and_then(|c| hex_value(*c))
                && let Some(lo) = raw.get(i + 2).and_then(|c| hex_value(*c))
            {
                out.push(hi << 4 | lo);
                i += 3;
            } else {
                out.push(b);
                i += 1;
            }
        }

        Self(out)
    }

    /// The name's bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The name as a string, for diagnostics.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("{non-utf8 name}")
    }
}

pub(crate) fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

impl Borrow<[u8]> for Name {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Name {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl PartialEq<[u8]> for Name {
    fn eq(&self, other: &[u8]) -> bool {
        self.0 == other
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::Name;

    #[test]
    fn escapes() {
        assert_eq!(Name::from_escaped(b"A#20B").as_bytes(), b"A B");
        assert_eq!(Name::from_escaped(b"Lime#20Green").as_str(), "Lime Green");
        assert_eq!(Name::from_escaped(b"paired#28#29").as_bytes(), b"paired()");
    }

    #[test]
    fn invalid_escape_is_kept() {
        assert_eq!(Name::from_escaped(b"A#zz").as_bytes(), b"A#zz");
    }
}
