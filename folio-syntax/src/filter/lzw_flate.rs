use crate::object::{Dict, keys};
use log::warn;

struct PredictorParams {
    predictor: u8,
    colors: usize,
    bits_per_component: usize,
    columns: usize,
    early_change: bool,
}

impl PredictorParams {
    fn from_params(dict: &Dict) -> Self {
        Self {
            predictor: dict.get(keys::PREDICTOR).unwrap_or(1),
            colors: dict.get(keys::COLORS).unwrap_or(1),
            bits_per_component: dict.get(keys::BITS_PER_COMPONENT).unwrap_or(8),
            columns: dict.get(keys::COLUMNS).unwrap_or(1),
            early_change: dict.get::<u8>(keys::EARLY_CHANGE).is_none_or(|e| e != 0),
        }
    }

    fn bytes_per_pixel(&self) -> usize {
        (self.bits_per_component * self.colors).div_ceil(8).max(1)
    }

    fn row_length(&self) -> usize {
        (self.columns * self.colors * self.bits_per_component).div_ceil(8)
    }
}

fn apply_predictor(data: Vec<u8>, params: &PredictorParams) -> Option<Vec<u8>> {
    match params.predictor {
        0 | 1 => Some(data),
        2 => apply_tiff_predictor(data, params),
        10..=15 => apply_png_predictor(&data, params),
        other => {
            warn!("unknown predictor {other}");

            None
        }
    }
}

fn apply_tiff_predictor(mut data: Vec<u8>, params: &PredictorParams) -> Option<Vec<u8>> {
    if params.bits_per_component != 8 {
        warn!(
            "TIFF predictor with {} bits per component is not supported",
            params.bits_per_component
        );

        return None;
    }

    let row_len = params.row_length();
    let bpp = params.bytes_per_pixel();

    if row_len == 0 {
        return Some(data);
    }

    for row in data.chunks_mut(row_len) {
        for i in bpp..row.len() {
            row[i] = row[i].wrapping_add(row[i - bpp]);
        }
    }

    Some(data)
}

fn apply_png_predictor(data: &[u8], params: &PredictorParams) -> Option<Vec<u8>> {
    let row_len = params.row_length();
    let bpp = params.bytes_per_pixel();

    if row_len == 0 {
        return Some(vec![]);
    }

    let mut out = Vec::with_capacity(data.len());
    let mut prev = vec![0u8; row_len];

    // Each row is prefixed with the PNG filter type byte.
    for chunk in data.chunks(row_len + 1) {
        let (&kind, row) = chunk.split_first()?;
        let mut cur = row.to_vec();
        cur.resize(row_len, 0);

        for i in 0..row_len {
            let left = if i >= bpp { cur[i - bpp] } else { 0 };
            let up = prev[i];
            let up_left = if i >= bpp { prev[i - bpp] } else { 0 };

            cur[i] = cur[i].wrapping_add(match kind {
                0 => 0,
                1 => left,
                2 => up,
                3 => ((left as u16 + up as u16) / 2) as u8,
                4 => paeth(left, up, up_left),
                _ => {
                    warn!("invalid PNG predictor type {kind}");

                    return None;
                }
            });
        }

        out.extend_from_slice(&cur[..row.len().min(row_len)]);
        prev = cur;
    }

    Some(out)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();

    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

pub(crate) mod flate {
    use super::{PredictorParams, apply_predictor};
    use crate::object::Dict;
    use flate2::read::{DeflateDecoder, ZlibDecoder};
    use log::warn;
    use std::io::Read;

    pub(crate) fn decode(data: &[u8], params: &Dict) -> Option<Vec<u8>> {
        let decoded = inflate(data)?;

        apply_predictor(decoded, &PredictorParams::from_params(params))
    }

    fn inflate(data: &[u8]) -> Option<Vec<u8>> {
        let mut zlib = vec![];

        match ZlibDecoder::new(data).read_to_end(&mut zlib) {
            Ok(_) => return Some(zlib),
            Err(e) => warn!("zlib stream is corrupt ({e}), trying raw deflate"),
        }

        let mut raw = vec![];

        if DeflateDecoder::new(data).read_to_end(&mut raw).is_ok() {
            return Some(raw);
        }

        // Truncated streams are common; keep what could be recovered.
        (!zlib.is_empty()).then_some(zlib)
    }
}

pub(crate) mod lzw {
    use super::{PredictorParams, apply_predictor};
    use crate::object::Dict;
    use log::warn;
    use weezl::BitOrder;
    use weezl::decode::Decoder;

    pub(crate) fn decode(data: &[u8], params: &Dict) -> Option<Vec<u8>> {
        let params = PredictorParams::from_params(params);

        // EarlyChange 1 widens codes one entry early, like TIFF does.
        let mut decoder = if params.early_change {
            Decoder::with_tiff_size_switch(BitOrder::Msb, 8)
        } else {
            Decoder::new(BitOrder::Msb, 8)
        };

        let mut decoded = vec![];
        let result = decoder.into_vec(&mut decoded).decode(data);

        if let Err(e) = result.status {
            warn!("LZW stream is corrupt: {e}");

            if decoded.is_empty() {
                return None;
            }
        }

        apply_predictor(decoded, &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    #[test]
    fn simple_lzw() {
        let input = [0x80, 0x0B, 0x60, 0x50, 0x22, 0x0C, 0x0C, 0x85, 0x01];
        let decoded = lzw::decode(&input, &Dict::new()).unwrap();

        assert_eq!(decoded, vec![45, 45, 45, 45, 45, 65, 45, 45, 45, 66]);
    }

    #[test]
    fn flate_roundtrip() {
        let mut e = ZlibEncoder::new(vec![], Compression::default());
        e.write_all(b"q 1 0 0 1 0 0 cm Q").unwrap();
        let compressed = e.finish().unwrap();

        assert_eq!(
            flate::decode(&compressed, &Dict::new()).unwrap(),
            b"q 1 0 0 1 0 0 cm Q"
        );
    }

    #[test]
    fn png_up_predictor() {
        let params = Dict::from_bytes(b"<< /Predictor 12 /Columns 3 >>").unwrap();
        let params = PredictorParams::from_params(&params);
        let data = vec![2, 1, 2, 3, 2, 1, 1, 1];

        assert_eq!(
            apply_predictor(data, &params).unwrap(),
            vec![1, 2, 3, 2, 3, 4]
        );
    }

    #[test]
    fn png_sub_predictor() {
        let params = Dict::from_bytes(b"<< /Predictor 11 /Columns 4 >>").unwrap();
        let params = PredictorParams::from_params(&params);

        assert_eq!(
            apply_predictor(vec![1, 5, 1, 1, 1], &params).unwrap(),
            vec![5, 6, 7, 8]
        );
    }

    #[test]
    fn tiff_predictor() {
        let params = Dict::from_bytes(b"<< /Predictor 2 /Columns 3 /Colors 1 >>").unwrap();
        let params = PredictorParams::from_params(&params);

        assert_eq!(
            apply_predictor(vec![10, 1, 1, 20, 2, 2], &params).unwrap(),
            vec![10, 11, 12, 20, 22, 24]
        );
    }
}
