//! Unpacking of raw image samples.

use crate::color::{AlphaColor, ColorComponents, ColorSpace};
use crate::function::interpolate;
use folio_common::bit::{BitReader, max_value};
use log::warn;

/// The geometry and sample layout of raw image data.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Layout {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) components: usize,
    pub(crate) bits_per_component: u8,
}

impl Layout {
    pub(crate) fn pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// How many bytes of missing sample data are padded before an image is
/// rejected outright.
const MAX_PADDING: u64 = 1 << 20;

impl Layout {
    /// The number of bytes the samples of the image occupy.
    pub(crate) fn data_len(&self) -> u64 {
        let row_bits =
            self.width as u64 * self.components as u64 * self.bits_per_component as u64;

        row_bits.div_ceil(8) * self.height as u64
    }
}

/// Unpack raw samples, one `u32` per component.
///
/// Rows start on a byte boundary. Missing data is padded with zeroes, unless
/// far more is missing than present, in which case `None` is returned
/// before anything is allocated.
pub(crate) fn unpack(data: &[u8], layout: &Layout) -> Option<Vec<u32>> {
    let expected = layout.data_len();

    if expected > 2 * data.len() as u64 + MAX_PADDING {
        warn!(
            "image data has {} bytes, but {expected} are needed",
            data.len()
        );

        return None;
    }

    let bpc = layout.bits_per_component;
    let per_row = layout.width as usize * layout.components;
    let mut out = Vec::with_capacity(per_row * layout.height as usize);

    if bpc == 8 {
        out.extend(data.iter().take(out.capacity()).map(|b| *b as u32));
    } else {
        let mut reader = BitReader::new(data);

        for _ in 0..layout.height {
            for _ in 0..per_row {
                out.push(reader.read(bpc).unwrap_or(0));
            }

            reader.align();
        }
    }

    out.resize(per_row * layout.height as usize, 0);

    Some(out)
}

/// Map raw samples through a `Decode` array into the native range of a color
/// space, then convert them to straight RGBA.
pub(crate) fn to_rgba(
    samples: &[u32],
    layout: &Layout,
    color_space: &ColorSpace,
    decode: &[(f32, f32)],
) -> Vec<u8> {
    let n = layout.components.max(1);
    let max = max_value(layout.bits_per_component) as f32;
    let mut out = Vec::with_capacity(layout.pixels() * 4);

    // Single-component images with few distinct values are converted through
    // a table instead of once per pixel.
    if n == 1 && layout.bits_per_component <= 8 {
        let (lo, hi) = decode.first().copied().unwrap_or((0.0, 1.0));
        let lut = (0..=max as u32)
            .map(|raw| {
                let v = interpolate(raw as f32, 0.0, max, lo, hi);
                color_space.to_rgba(&[v], 1.0).to_rgba8()
            })
            .collect::<Vec<_>>();

        for raw in samples.iter().take(layout.pixels()) {
            out.extend_from_slice(&lut[(*raw as usize).min(lut.len() - 1)]);
        }

        return out;
    }

    let mut components = ColorComponents::new();

    for pixel in samples.chunks_exact(n).take(layout.pixels()) {
        components.clear();
        components.extend(pixel.iter().enumerate().map(|(i, raw)| {
            let (lo, hi) = decode.get(i).copied().unwrap_or((0.0, 1.0));
            interpolate(*raw as f32, 0.0, max, lo, hi)
        }));

        out.extend_from_slice(&color_space.to_rgba(&components, 1.0).to_rgba8());
    }

    out
}

/// Compute stencil coverage from 1-component samples.
///
/// A sample paints if its decoded value is 0, so a `Decode` array of `[1 0]`
/// inverts the mask.
pub(crate) fn stencil_coverage(samples: &[u32], layout: &Layout, decode: &[(f32, f32)]) -> Vec<u8> {
    let max = max_value(layout.bits_per_component) as f32;
    let (lo, hi) = decode.first().copied().unwrap_or((0.0, 1.0));

    samples
        .iter()
        .take(layout.pixels())
        .map(|raw| {
            let v = interpolate(*raw as f32, 0.0, max, lo, hi);
            ((1.0 - v.clamp(0.0, 1.0)) * 255.0 + 0.5) as u8
        })
        .collect()
}

/// Clear the alpha of every pixel whose samples fall into the color key
/// ranges of a `/Mask` array.
pub(crate) fn apply_color_key(rgba: &mut [u8], samples: &[u32], n: usize, ranges: &[u32]) {
    if n == 0 || ranges.len() < 2 * n {
        return;
    }

    for (pixel, raw) in rgba.chunks_exact_mut(4).zip(samples.chunks_exact(n)) {
        let masked = raw
            .iter()
            .enumerate()
            .all(|(i, v)| ranges[2 * i] <= *v && *v <= ranges[2 * i + 1]);

        if masked {
            pixel[3] = 0;
        }
    }
}

/// Resample single-channel data to a new size, nearest neighbour.
pub(crate) fn resample(data: &[u8], from: (u32, u32), to: (u32, u32)) -> Vec<u8> {
    if from == to {
        return data.to_vec();
    }

    let (fw, fh) = (from.0 as u64, from.1 as u64);
    let (tw, th) = (to.0 as u64, to.1 as u64);
    let mut out = Vec::with_capacity((tw * th) as usize);

    for y in 0..th {
        let sy = (y * fh / th.max(1)).min(fh.saturating_sub(1));

        for x in 0..tw {
            let sx = (x * fw / tw.max(1)).min(fw.saturating_sub(1));
            out.push(data.get((sy * fw + sx) as usize).copied().unwrap_or(255));
        }
    }

    out
}

/// Undo the pre-blending of an image with a matte color, given the
/// soft mask alpha of each pixel.
pub(crate) fn unmatte(rgba: &mut [u8], alpha: &[u8], matte: AlphaColor) {
    let matte = matte.to_rgba8();

    for (pixel, a) in rgba.chunks_exact_mut(4).zip(alpha) {
        if *a == 0 {
            continue;
        }

        let a = *a as f32 / 255.0;

        for i in 0..3 {
            let c = pixel[i] as f32;
            let m = matte[i] as f32;
            pixel[i] = ((c - m) / a + m).clamp(0.0, 255.0).round() as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(width: u32, height: u32, components: usize, bpc: u8) -> Layout {
        Layout {
            width,
            height,
            components,
            bits_per_component: bpc,
        }
    }

    #[test]
    fn rows_are_byte_aligned() {
        // Two rows of three 1-bit pixels: 101 and 010.
        let samples = unpack(&[0b1010_0000, 0b0100_0000], &layout(3, 2, 1, 1)).unwrap();

        assert_eq!(samples, vec![1, 0, 1, 0, 1, 0]);
    }

    #[test]
    fn short_data_is_padded() {
        let samples = unpack(&[7], &layout(2, 1, 1, 8)).unwrap();

        assert_eq!(samples, vec![7, 0]);
    }

    #[test]
    fn huge_image_with_little_data() {
        let l = layout(1 << 14, 1 << 14, 3, 16);

        assert_eq!(l.data_len(), 1 << 31);
        assert!(unpack(&[0; 16], &l).is_none());
    }

    #[test]
    fn sixteen_bit_samples() {
        let samples = unpack(&[0xff, 0xff, 0x80, 0x00], &layout(2, 1, 1, 16)).unwrap();
        let rgba = to_rgba(&samples, &layout(2, 1, 1, 16), &ColorSpace::device_gray(), &[(0.0, 1.0)]);

        assert_eq!(&rgba[0..4], &[255, 255, 255, 255]);
        assert_eq!(&rgba[4..8], &[128, 128, 128, 255]);
    }

    #[test]
    fn inverted_decode() {
        let l = layout(2, 1, 3, 8);
        let samples = unpack(&[0, 0, 0, 255, 255, 255], &l).unwrap();
        let decode = [(1.0, 0.0); 3];
        let rgba = to_rgba(&samples, &l, &ColorSpace::device_rgb(), &decode);

        assert_eq!(rgba, vec![255, 255, 255, 255, 0, 0, 0, 255]);
    }

    #[test]
    fn stencil() {
        let l = layout(2, 1, 1, 1);
        let samples = vec![0, 1];

        assert_eq!(stencil_coverage(&samples, &l, &[(0.0, 1.0)]), vec![255, 0]);
        assert_eq!(stencil_coverage(&samples, &l, &[(1.0, 0.0)]), vec![0, 255]);
    }

    #[test]
    fn color_key() {
        let mut rgba = vec![255; 8];
        apply_color_key(&mut rgba, &[10, 200], 1, &[0, 50]);

        assert_eq!(rgba[3], 0);
        assert_eq!(rgba[7], 255);
    }

    #[test]
    fn nearest_neighbour() {
        let data = [0, 255, 100, 50];

        assert_eq!(
            resample(&data, (2, 2), (4, 2)),
            vec![0, 0, 255, 255, 100, 100, 50, 50]
        );
        assert_eq!(resample(&data, (2, 2), (1, 1)), vec![0]);
    }
}
