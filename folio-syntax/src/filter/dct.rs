use crate::object::{Dict, keys};
use std::io::Cursor;
use zune_jpeg::JpegDecoder;
use zune_jpeg::zune_core::colorspace::ColorSpace;
use zune_jpeg::zune_core::options::DecoderOptions;

/// Decode baseline or progressive JPEG data into interleaved 8-bit samples
/// (1 component for gray, 3 for RGB, 4 for CMYK).
pub(crate) fn decode(data: &[u8], params: &Dict) -> Option<Vec<u8>> {
    let options = DecoderOptions::default()
        .set_max_width(u16::MAX as usize)
        .set_max_height(u16::MAX as usize);
    let mut decoder = JpegDecoder::new_with_options(Cursor::new(data), options);
    decoder.decode_headers().ok()?;

    let color_transform = params.get::<u8>(keys::COLOR_TRANSFORM);

    let out_colorspace = match decoder.input_colorspace()? {
        ColorSpace::YCbCr if color_transform == Some(0) => ColorSpace::YCbCr,
        ColorSpace::Luma | ColorSpace::LumaA => ColorSpace::Luma,
        ColorSpace::CMYK => ColorSpace::CMYK,
        ColorSpace::YCCK => ColorSpace::YCCK,
        _ => ColorSpace::RGB,
    };

    decoder.set_options(options.jpeg_set_out_colorspace(out_colorspace));
    let mut decoded = decoder.decode().ok()?;

    if out_colorspace == ColorSpace::YCCK {
        // Adobe YCCK: convert the first three channels, keep K.
        for c in decoded.chunks_mut(4) {
            let y = c[0] as f32;
            let cb = c[1] as f32;
            let cr = c[2] as f32;
            c[0] = (434.456 - y - 1.402 * cr).clamp(0.0, 255.0) as u8;
            c[1] = (119.541 - y + 0.344 * cb + 0.714 * cr).clamp(0.0, 255.0) as u8;
            c[2] = (481.816 - y - 1.772 * cb).clamp(0.0, 255.0) as u8;
        }
    }

    Some(decoded)
}
