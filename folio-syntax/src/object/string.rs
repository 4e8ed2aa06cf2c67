//! String objects.

use std::fmt;

/// A PDF string with escapes (literal) or hex digits (hex) already decoded.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct PdfString {
    data: Vec<u8>,
    hex: bool,
}

impl PdfString {
    /// Create a string from decoded bytes.
    pub fn new(data: impl Into<Vec<u8>>, hex: bool) -> Self {
        Self {
            data: data.into(),
            hex,
        }
    }

    /// The decoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Whether the string was written in hexadecimal form.
    pub fn is_hex(&self) -> bool {
        self.hex
    }
}

impl fmt::Debug for PdfString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hex {
            write!(f, "<")?;
            for b in &self.data {
                write!(f, "{b:02x}")?;
            }
            write!(f, ">")
        } else {
            write!(f, "({})", String::from_utf8_lossy(&self.data))
        }
    }
}
