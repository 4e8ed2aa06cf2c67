//! A cursor over a byte slice.

use std::ops::Range;

/// A cursor for reading bytes, big-endian integers and byte patterns.
///
/// All `read_*` methods return `None` without advancing if there is not
/// enough data left.
#[derive(Clone, Debug)]
pub struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    /// Create a new reader positioned at the start of `data`.
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Create a new reader positioned at `offset`.
    #[inline]
    pub fn new_at(data: &'a [u8], offset: usize) -> Self {
        Self { data, offset }
    }

    /// The underlying data.
    #[inline]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Returns `true` once every byte has been consumed.
    #[inline]
    pub fn at_end(&self) -> bool {
        self.offset >= self.data.len()
    }

    /// The current byte offset.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Move the cursor to an absolute offset.
    #[inline]
    pub fn jump(&mut self, offset: usize) {
        self.offset = offset;
    }

    /// Everything from the current offset on.
    #[inline]
    pub fn tail(&self) -> &'a [u8] {
        self.data.get(self.offset..).unwrap_or_default()
    }

    /// A sub-slice of the underlying data.
    #[inline]
    pub fn range(&self, range: Range<usize>) -> Option<&'a [u8]> {
        self.data.get(range)
    }

    /// Peek a single byte.
    #[inline]
    pub fn peek_byte(&self) -> Option<u8> {
        self.data.get(self.offset).copied()
    }

    /// Peek `len` bytes.
    #[inline]
    pub fn peek_bytes(&self, len: usize) -> Option<&'a [u8]> {
        self.data.get(self.offset..self.offset.checked_add(len)?)
    }

    /// Read a single byte.
    #[inline]
    pub fn read_byte(&mut self) -> Option<u8> {
        let b = self.peek_byte()?;
        self.offset += 1;

        Some(b)
    }

    /// Read `len` bytes.
    #[inline]
    pub fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        let v = self.peek_bytes(len)?;
        self.offset += len;

        Some(v)
    }

    /// Skip `len` bytes.
    #[inline]
    pub fn skip_bytes(&mut self, len: usize) -> Option<()> {
        self.read_bytes(len).map(|_| ())
    }

    /// Advance by one byte.
    #[inline]
    pub fn forward(&mut self) {
        self.offset += 1;
    }

    /// Consume the next byte if it satisfies `f`.
    #[inline]
    pub fn eat(&mut self, f: impl Fn(u8) -> bool) -> Option<u8> {
        let b = self.peek_byte()?;

        if f(b) {
            self.forward();
            Some(b)
        } else {
            None
        }
    }

    /// Advance while the next byte satisfies `f`.
    #[inline]
    pub fn forward_while(&mut self, f: impl Fn(u8) -> bool) {
        while self.eat(&f).is_some() {}
    }

    /// Check whether the upcoming bytes equal `tag`.
    #[inline]
    pub fn peek_tag(&self, tag: &[u8]) -> bool {
        self.peek_bytes(tag.len()) == Some(tag)
    }

    /// Consume `tag` if the upcoming bytes equal it.
    #[inline]
    pub fn forward_tag(&mut self, tag: &[u8]) -> Option<()> {
        if self.peek_tag(tag) {
            self.offset += tag.len();
            Some(())
        } else {
            None
        }
    }

    /// Read a big-endian `u16`.
    #[inline]
    pub fn read_u16(&mut self) -> Option<u16> {
        Some(u16::from_be_bytes(self.read_array()?))
    }

    /// Read a big-endian `u32`.
    #[inline]
    pub fn read_u32(&mut self) -> Option<u32> {
        Some(u32::from_be_bytes(self.read_array()?))
    }

    /// Read a big-endian `i32`.
    #[inline]
    pub fn read_i32(&mut self) -> Option<i32> {
        Some(i32::from_be_bytes(self.read_array()?))
    }

    /// Read a big-endian `u64`.
    #[inline]
    pub fn read_u64(&mut self) -> Option<u64> {
        Some(u64::from_be_bytes(self.read_array()?))
    }

    #[inline]
    fn read_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        self.read_bytes(N)?.try_into().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::Reader;

    #[test]
    fn integers() {
        let mut r = Reader::new(&[0x00, 0x01, 0xff, 0xff, 0xff, 0xfe, 0x07]);
        assert_eq!(r.read_u16(), Some(1));
        assert_eq!(r.read_i32(), Some(-2));
        assert_eq!(r.read_u16(), None);
        assert_eq!(r.offset(), 6);
        assert_eq!(r.read_byte(), Some(7));
        assert!(r.at_end());
    }

    #[test]
    fn tags() {
        let mut r = Reader::new(b"endstream");
        assert!(r.forward_tag(b"end").is_some());
        assert!(r.forward_tag(b"obj").is_none());
        assert_eq!(r.tail(), b"stream");
    }
}
