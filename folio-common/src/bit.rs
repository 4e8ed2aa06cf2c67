//! A big-endian bit reader for packed image samples and mesh data.

/// A reader that yields MSB-first groups of up to 32 bits.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    cur_pos: usize,
}

impl<'a> BitReader<'a> {
    /// Create a new bit reader.
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, cur_pos: 0 }
    }

    /// Skip to the next byte boundary. Rows of packed image samples start there.
    #[inline]
    pub fn align(&mut self) {
        let bit_pos = self.cur_pos % 8;

        if bit_pos != 0 {
            self.cur_pos += 8 - bit_pos;
        }
    }

    /// Read `bit_size` bits. Returns `None` past the end or if `bit_size > 32`.
    #[inline]
    pub fn read(&mut self, bit_size: u8) -> Option<u32> {
        if bit_size > 32 {
            return None;
        }

        if bit_size == 8 && self.cur_pos % 8 == 0 {
            let b = *self.data.get(self.cur_pos / 8)?;
            self.cur_pos += 8;

            return Some(b as u32);
        }

        let end = self.cur_pos + bit_size as usize;

        if end > self.data.len() * 8 {
            return None;
        }

        let mut value = 0u64;

        for bit in self.cur_pos..end {
            let byte = self.data[bit / 8];
            let set = (byte >> (7 - bit % 8)) & 1;
            value = (value << 1) | set as u64;
        }

        self.cur_pos = end;

        Some(value as u32)
    }

    /// Read `bit_size` bits and map them linearly onto `[min, max]`.
    #[inline]
    pub fn read_scaled(&mut self, bit_size: u8, min: f32, max: f32) -> Option<f32> {
        let raw = self.read(bit_size)?;

        Some(min + raw as f32 * (max - min) / max_value(bit_size) as f32)
    }

    /// Whether all bytes have been consumed.
    #[inline]
    pub fn at_end(&self) -> bool {
        self.cur_pos / 8 >= self.data.len()
    }
}

/// The largest value representable in `bit_size` bits.
#[inline]
pub fn max_value(bit_size: u8) -> u32 {
    ((1u64 << bit_size.min(32)) - 1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nibbles_and_align() {
        let mut r = BitReader::new(&[0b1010_0101, 0b1100_0000]);
        assert_eq!(r.read(4), Some(0b1010));
        assert_eq!(r.read(1), Some(0));
        r.align();
        assert_eq!(r.read(2), Some(0b11));
        assert_eq!(r.read(8), None);
    }

    #[test]
    fn wide_reads() {
        let mut r = BitReader::new(&[0x12, 0x34, 0x56]);
        assert_eq!(r.read(16), Some(0x1234));
        assert_eq!(r.read(8), Some(0x56));
        assert!(r.at_end());
    }

    #[test]
    fn scaled() {
        let mut r = BitReader::new(&[0xff, 0x00]);
        assert_eq!(r.read_scaled(8, 0.0, 1.0), Some(1.0));
        assert_eq!(r.read_scaled(8, -1.0, 1.0), Some(-1.0));
    }
}
