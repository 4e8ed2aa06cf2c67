//! Whole-file image codecs that are recognized by their magic bytes.

use image::codecs::tiff::TiffDecoder;
use image::{DynamicImage, ImageDecoder, ImageFormat, RgbaImage};
use log::{debug, warn};
use std::io::Cursor;

/// Images larger than this (in pixels) are not decoded.
pub(crate) const MAX_PIXELS: u64 = 1 << 28;

/// Decode PNG or JPEG data that was embedded as-is, without relying on the
/// filters declared by the image.
pub(crate) fn decode_direct(data: &[u8]) -> Option<RgbaImage> {
    let format = image::guess_format(data).ok()?;

    if !matches!(format, ImageFormat::Png | ImageFormat::Jpeg) {
        return None;
    }

    match image::load_from_memory_with_format(data, format) {
        Ok(img) => within_limits(img),
        Err(e) => {
            debug!("direct {format:?} decode failed: {e}");

            None
        }
    }
}

/// Whether `data` starts like a TIFF file, in either byte order.
pub(crate) fn is_tiff(data: &[u8]) -> bool {
    data.starts_with(b"II*\0") || data.starts_with(b"MM\0*")
}

/// Decode a TIFF file, applying its orientation tag.
pub(crate) fn decode_tiff(data: &[u8]) -> Option<RgbaImage> {
    let decode = || -> image::ImageResult<DynamicImage> {
        let mut decoder = TiffDecoder::new(Cursor::new(data))?;
        let orientation = decoder.orientation()?;
        let mut img = DynamicImage::from_decoder(decoder)?;
        img.apply_orientation(orientation);

        Ok(img)
    };

    match decode() {
        Ok(img) => within_limits(img),
        Err(e) => {
            warn!("failed to decode TIFF image: {e}");

            None
        }
    }
}

fn within_limits(img: DynamicImage) -> Option<RgbaImage> {
    let pixels = img.width() as u64 * img.height() as u64;

    if pixels == 0 || pixels > MAX_PIXELS {
        warn!("image of {}x{} pixels is out of bounds", img.width(), img.height());

        return None;
    }

    Some(img.into_rgba8())
}
