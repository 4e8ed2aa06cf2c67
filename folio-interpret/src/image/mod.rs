//! Decoding image XObjects and inline images into bitmaps.
//!
//! Decoding tries progressively more manual strategies:
//!
//! 1. The raw data is handed to a codec directly, for PNG or JPEG files that
//!    were embedded as-is.
//! 2. The declared filters are applied one by one, retrying the codecs after
//!    each step.
//! 3. Data that looks like a TIFF file is decoded as such.
//! 4. Otherwise, the data is treated as packed samples in the color space
//!    of the image, which covers the vast majority of images in practice.
//!
//! Soft masks, stencil masks and color key masks are applied afterwards, and
//! the result is always a premultiplied RGBA bitmap.

mod codec;
mod sample;

use crate::color::{AlphaColor, ColorSpace};
use crate::context::LoadContext;
use crate::interpret::InterpreterWarning;
use folio_syntax::filter::FilterChain;
use folio_syntax::object::keys::*;
use folio_syntax::object::{Dict, Name, Object, Stream};
use image::RgbaImage;
use log::warn;
use sample::Layout;
use smallvec::SmallVec;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// A premultiplied RGBA8 bitmap. Cloning is cheap.
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    data: Arc<[u8]>,
    interpolate: bool,
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("interpolate", &self.interpolate)
            .finish_non_exhaustive()
    }
}

impl Bitmap {
    /// Create a bitmap from premultiplied RGBA8 data.
    ///
    /// Returns `None` if the data does not match the dimensions.
    pub fn new(width: u32, height: u32, data: Vec<u8>, interpolate: bool) -> Option<Self> {
        if data.len() != width as usize * height as usize * 4 {
            return None;
        }

        Some(Self {
            width,
            height,
            data: data.into(),
            interpolate,
        })
    }

    fn from_straight(width: u32, height: u32, mut data: Vec<u8>, interpolate: bool) -> Option<Self> {
        for pixel in data.chunks_exact_mut(4) {
            let a = pixel[3] as u16;

            if a != 255 {
                for c in &mut pixel[..3] {
                    *c = ((*c as u16 * a + 127) / 255) as u8;
                }
            }
        }

        Self::new(width, height, data, interpolate)
    }

    fn from_coverage(width: u32, height: u32, coverage: &[u8], interpolate: bool) -> Option<Self> {
        let data = coverage.iter().flat_map(|c| [0, 0, 0, *c]).collect();

        Self::new(width, height, data, interpolate)
    }

    /// The width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// The height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The premultiplied RGBA8 data, row by row from the top.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Whether the image asks to be smoothed when scaled up.
    pub fn interpolate(&self) -> bool {
        self.interpolate
    }

    /// The pixel at the given position.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }

        let idx = (y as usize * self.width as usize + x as usize) * 4;

        self.data.get(idx..idx + 4)?.try_into().ok()
    }

    /// Replace the color of every pixel with `color`, keeping the alpha
    /// of the bitmap as coverage.
    pub fn recolored(&self, color: AlphaColor) -> Self {
        let [r, g, b, a] = color.premultiplied();

        let data = self
            .data
            .chunks_exact(4)
            .flat_map(|p| {
                let cov = p[3] as f32 / 255.0;

                [r, g, b, a].map(|c| (c * cov * 255.0 + 0.5) as u8)
            })
            .collect::<Vec<_>>();

        Self {
            data: data.into(),
            ..self.clone()
        }
    }

    /// Scale the opacity of the bitmap.
    pub fn faded(&self, alpha: f32) -> Self {
        if alpha >= 1.0 {
            return self.clone();
        }

        let alpha = alpha.max(0.0);
        let data = self
            .data
            .iter()
            .map(|c| (*c as f32 * alpha + 0.5) as u8)
            .collect::<Vec<_>>();

        Self {
            data: data.into(),
            ..self.clone()
        }
    }
}

/// A decoded image.
#[derive(Clone, Debug)]
pub enum DecodedImage {
    /// An image with its own colors.
    Color(Bitmap),
    /// A stencil mask, painted with the current fill paint. Only the alpha
    /// channel of the bitmap is meaningful.
    Stencil(Bitmap),
}

/// Load an image XObject, memoized by its reference.
pub fn load_image(obj: &Object, ctx: &LoadContext<'_>) -> Option<Arc<DecodedImage>> {
    let load = || {
        let stream = ctx.cast::<Stream>(obj)?;

        decode_image(stream.dict(), stream.raw_data(), ctx, &|_| None).map(Arc::new)
    };

    match obj {
        Object::Ref(r) => ctx.cache.images.get_or_insert_with(*r, load),
        _ => load(),
    }
}

/// Decode an image from its dictionary and still filtered data.
///
/// `resolve_color_space` resolves color space names that are not device
/// color spaces, which inline images use to refer to page resources.
pub(crate) fn decode_image(
    dict: &Dict,
    data: &[u8],
    ctx: &LoadContext<'_>,
    resolve_color_space: &dyn Fn(&Name) -> Option<ColorSpace>,
) -> Option<DecodedImage> {
    let decoded = ImageParams::new(dict, ctx, resolve_color_space)
        .and_then(|params| params.decode(dict, data, ctx, true));

    if decoded.is_none() {
        warn!("failed to decode image");
        ctx.warn(InterpreterWarning::ImageDecodeFailure);
    }

    decoded
}

struct ImageParams {
    width: u32,
    height: u32,
    bits_per_component: u8,
    color_space: ColorSpace,
    decode: SmallVec<[(f32, f32); 4]>,
    has_decode: bool,
    image_mask: bool,
    interpolate: bool,
}

impl ImageParams {
    fn new(
        dict: &Dict,
        ctx: &LoadContext<'_>,
        resolve_color_space: &dyn Fn(&Name) -> Option<ColorSpace>,
    ) -> Option<Self> {
        let width = ctx.get::<u32>(dict, WIDTH)?;
        let height = ctx.get::<u32>(dict, HEIGHT)?;
        let image_mask = ctx.get::<bool>(dict, IMAGE_MASK).unwrap_or(false);
        let interpolate = ctx.get::<bool>(dict, INTERPOLATE).unwrap_or(false);

        if width as u64 * height as u64 > codec::MAX_PIXELS || width == 0 || height == 0 {
            warn!("image of {width}x{height} pixels is out of bounds");

            return None;
        }

        let bits_per_component = if image_mask {
            1
        } else {
            ctx.get::<u8>(dict, BITS_PER_COMPONENT).unwrap_or(8)
        };

        if !matches!(bits_per_component, 1 | 2 | 4 | 8 | 16) {
            warn!("invalid bits per component {bits_per_component}");

            return None;
        }

        let color_space = if image_mask {
            ColorSpace::device_gray()
        } else {
            match dict.get_raw(COLOR_SPACE) {
                Some(obj) => ColorSpace::from_object(obj, ctx)
                    .or_else(|| resolve_color_space(&ctx.cast::<Name>(obj)?))?,
                // Only images with a codec that knows its own color space may
                // omit it.
                None => ColorSpace::device_gray(),
            }
        };

        let n = color_space.num_components();
        let decode = ctx
            .get::<Vec<f32>>(dict, DECODE)
            .filter(|d| d.len() >= 2 * n)
            .map(|d| d.chunks_exact(2).map(|c| (c[0], c[1])).collect::<SmallVec<_>>());
        let has_decode = decode.is_some();

        Some(Self {
            width,
            height,
            bits_per_component,
            decode: decode.unwrap_or_else(|| color_space.default_decode(bits_per_component)),
            color_space,
            has_decode,
            image_mask,
            interpolate,
        })
    }

    fn layout(&self) -> Layout {
        Layout {
            width: self.width,
            height: self.height,
            components: self.color_space.num_components(),
            bits_per_component: self.bits_per_component,
        }
    }

    /// Whether a codec may be trusted with the colors of this image.
    ///
    /// Codecs produce RGB(A), so they can only stand in for plain gray and
    /// RGB images.
    fn allows_codec(&self) -> bool {
        !self.has_decode
            && !self.color_space.is_indexed()
            && matches!(self.color_space.num_components(), 1 | 3)
    }

    fn decode(
        &self,
        dict: &Dict,
        data: &[u8],
        ctx: &LoadContext<'_>,
        with_masks: bool,
    ) -> Option<DecodedImage> {
        let filters = FilterChain::from_dict(dict);

        if self.image_mask {
            let data = filters.apply(data)?;
            let layout = self.layout();
            let samples = sample::unpack(&data, &layout)?;
            let coverage = sample::stencil_coverage(&samples, &layout, &self.decode);

            return Bitmap::from_coverage(self.width, self.height, &coverage, self.interpolate)
                .map(DecodedImage::Stencil);
        }

        let (width, height, mut rgba) = self.decode_pixels(dict, &filters, data, ctx)?;

        if with_masks {
            if let Some((alpha, matte)) = self.soft_mask(dict, ctx, (width, height)) {
                if let Some(matte) = matte {
                    sample::unmatte(&mut rgba, &alpha, matte);
                }

                multiply_alpha(&mut rgba, &alpha);
            } else if let Some(alpha) = self.stencil_mask(dict, ctx, (width, height)) {
                multiply_alpha(&mut rgba, &alpha);
            }
        }

        Bitmap::from_straight(width, height, rgba, self.interpolate).map(DecodedImage::Color)
    }

    /// Decode the pixels of the image into straight RGBA.
    fn decode_pixels(
        &self,
        dict: &Dict,
        filters: &FilterChain,
        raw: &[u8],
        ctx: &LoadContext<'_>,
    ) -> Option<(u32, u32, Vec<u8>)> {
        let from_codec = |img: RgbaImage| (img.width(), img.height(), img.into_raw());
        let codec_ok = self.allows_codec();

        let mut data = Cow::Borrowed(raw);

        if codec_ok && let Some(img) = codec::decode_direct(&data) {
            return Some(from_codec(img));
        }

        for (filter, params) in filters.iter() {
            data = Cow::Owned(filter.apply(&data, params)?);

            if codec_ok && let Some(img) = codec::decode_direct(&data) {
                return Some(from_codec(img));
            }
        }

        if codec::is_tiff(&data) {
            return codec::decode_tiff(&data).map(from_codec);
        }

        let layout = self.layout();
        let samples = sample::unpack(&data, &layout)?;
        let mut rgba = sample::to_rgba(&samples, &layout, &self.color_space, &self.decode);

        if let Some(ranges) = dict
            .get_raw(MASK)
            .and_then(|m| ctx.cast::<Vec<u32>>(m))
        {
            sample::apply_color_key(&mut rgba, &samples, layout.components, &ranges);
        }

        Some((self.width, self.height, rgba))
    }

    /// The alpha channel given by `/SMask`, resampled to `size`, together
    /// with its matte color.
    fn soft_mask(
        &self,
        dict: &Dict,
        ctx: &LoadContext<'_>,
        size: (u32, u32),
    ) -> Option<(Vec<u8>, Option<AlphaColor>)> {
        let stream = ctx.get::<Stream>(dict, SMASK)?;
        let mask_dict = stream.dict();
        let params = ImageParams::new(mask_dict, ctx, &|_| None)?;

        let DecodedImage::Color(bitmap) = params.decode(mask_dict, stream.raw_data(), ctx, false)?
        else {
            return None;
        };

        let gray = bitmap.data.chunks_exact(4).map(|p| p[0]).collect::<Vec<_>>();
        let alpha = sample::resample(&gray, (bitmap.width, bitmap.height), size);

        let matte = ctx
            .get::<Vec<f32>>(mask_dict, MATTE)
            .map(|m| self.color_space.to_rgba(&m, 1.0));

        Some((alpha, matte))
    }

    /// The alpha channel given by a stencil `/Mask`, resampled to `size`.
    fn stencil_mask(&self, dict: &Dict, ctx: &LoadContext<'_>, size: (u32, u32)) -> Option<Vec<u8>> {
        let stream = ctx.get::<Stream>(dict, MASK)?;
        let mask_dict = stream.dict();
        let params = ImageParams::new(mask_dict, ctx, &|_| None)?;

        if !params.image_mask {
            return None;
        }

        let DecodedImage::Stencil(bitmap) = params.decode(mask_dict, stream.raw_data(), ctx, false)?
        else {
            return None;
        };

        let coverage = bitmap.data.chunks_exact(4).map(|p| p[3]).collect::<Vec<_>>();

        Some(sample::resample(&coverage, (bitmap.width, bitmap.height), size))
    }
}

fn multiply_alpha(rgba: &mut [u8], alpha: &[u8]) {
    for (pixel, a) in rgba.chunks_exact_mut(4).zip(alpha) {
        pixel[3] = ((pixel[3] as u16 * *a as u16 + 127) / 255) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DocumentCache;
    use crate::interpret::WarningSinkFn;
    use folio_syntax::object::{ObjRef, ObjectStore};

    fn stream(dict: &str, data: &[u8]) -> Object {
        let mut src = format!("<< {dict} /Length {} >>\nstream\n", data.len()).into_bytes();
        src.extend_from_slice(data);
        src.extend_from_slice(b"\nendstream");

        Object::from_bytes(&src).unwrap()
    }

    fn load(store: &ObjectStore, obj: &Object) -> Option<Arc<DecodedImage>> {
        let cache = DocumentCache::new();
        let sink: WarningSinkFn = Arc::new(|_| {});
        let ctx = LoadContext::new(store, &cache, &sink);

        load_image(obj, &ctx)
    }

    fn color(img: &DecodedImage) -> &Bitmap {
        match img {
            DecodedImage::Color(b) => b,
            DecodedImage::Stencil(_) => panic!("expected a color image"),
        }
    }

    fn with_soft_mask(value: u8) -> Bitmap {
        let mut store = ObjectStore::new();
        store.insert(
            ObjRef::new(2, 0),
            stream(
                "/Width 2 /Height 2 /ColorSpace /DeviceGray /BitsPerComponent 8",
                &[value; 4],
            ),
        );

        let image = stream(
            "/Width 2 /Height 2 /ColorSpace /DeviceRGB /BitsPerComponent 8 /SMask 2 0 R",
            &[200; 12],
        );

        color(&load(&store, &image).unwrap()).clone()
    }

    #[test]
    fn opaque_soft_mask() {
        let bitmap = with_soft_mask(255);

        for y in 0..2 {
            for x in 0..2 {
                assert_eq!(bitmap.pixel(x, y).unwrap(), [200, 200, 200, 255]);
            }
        }
    }

    #[test]
    fn transparent_soft_mask() {
        let bitmap = with_soft_mask(0);

        assert!(bitmap.data().chunks_exact(4).all(|p| p == [0, 0, 0, 0]));
    }

    #[test]
    fn indexed_image() {
        let image = stream(
            "/Width 2 /Height 1 /ColorSpace [/Indexed /DeviceRGB 1 <ff000000ff00>] /BitsPerComponent 8",
            &[1, 0],
        );
        let decoded = load(&ObjectStore::new(), &image).unwrap();
        let bitmap = color(&decoded);

        assert_eq!(bitmap.pixel(0, 0).unwrap(), [0, 255, 0, 255]);
        assert_eq!(bitmap.pixel(1, 0).unwrap(), [255, 0, 0, 255]);
    }

    #[test]
    fn filtered_cmyk_image() {
        let image = stream(
            "/Width 1 /Height 1 /ColorSpace /DeviceCMYK /BitsPerComponent 8 /Filter /ASCIIHexDecode",
            b"000000ff>",
        );
        let decoded = load(&ObjectStore::new(), &image).unwrap();

        assert_eq!(color(&decoded).pixel(0, 0).unwrap(), [0, 0, 0, 255]);
    }

    #[test]
    fn image_mask() {
        let image = stream("/Width 8 /Height 1 /ImageMask true", &[0b0000_1111]);
        let decoded = load(&ObjectStore::new(), &image).unwrap();

        let DecodedImage::Stencil(bitmap) = decoded.as_ref() else {
            panic!("expected a stencil");
        };

        assert_eq!(bitmap.pixel(0, 0).unwrap()[3], 255);
        assert_eq!(bitmap.pixel(7, 0).unwrap()[3], 0);

        let red = bitmap.recolored(AlphaColor::from_rgb8(255, 0, 0));
        assert_eq!(red.pixel(0, 0).unwrap(), [255, 0, 0, 255]);
        assert_eq!(red.pixel(7, 0).unwrap(), [0, 0, 0, 0]);
    }

    #[test]
    fn stencil_mask_of_different_size() {
        let mut store = ObjectStore::new();
        // A 1x1 mask whose only sample is 1, which masks everything out.
        store.insert(
            ObjRef::new(4, 0),
            stream("/Width 1 /Height 1 /ImageMask true", &[0b1000_0000]),
        );

        let image = stream(
            "/Width 2 /Height 2 /ColorSpace /DeviceGray /BitsPerComponent 8 /Mask 4 0 R",
            &[255; 4],
        );
        let decoded = load(&store, &image).unwrap();

        assert!(color(&decoded).data().chunks_exact(4).all(|p| p[3] == 0));
    }

    #[test]
    fn broken_images_are_cached() {
        let mut store = ObjectStore::new();
        store.insert(
            ObjRef::new(1, 0),
            stream("/Width 1 /Height 1 /ColorSpace /DeviceGray /Filter /JPXDecode", b"xx"),
        );

        let cache = DocumentCache::new();
        let warnings = Arc::new(std::sync::Mutex::new(0));
        let sink: WarningSinkFn = {
            let warnings = warnings.clone();
            Arc::new(move |_| *warnings.lock().unwrap() += 1)
        };
        let ctx = LoadContext::new(&store, &cache, &sink);
        let obj = Object::Ref(ObjRef::new(1, 0));

        assert!(load_image(&obj, &ctx).is_none());
        assert!(load_image(&obj, &ctx).is_none());
        assert_eq!(*warnings.lock().unwrap(), 1);
    }
}
