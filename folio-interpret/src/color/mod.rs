//! PDF colors and color spaces.

pub mod icc;

use crate::context::LoadContext;
use crate::function::{Function, eval_all, load_functions};
use crate::interpret::InterpreterWarning;
use folio_syntax::object::keys::*;
use folio_syntax::object::{Dict, Name, Object, PdfString, Stream};
use icc::{D50, IccProfile, lab_to_xyz, xyz_to_srgb};
use log::warn;
use smallvec::{SmallVec, smallvec};
use std::sync::Arc;

/// A storage for the components of colors.
pub type ColorComponents = SmallVec<[f32; 4]>;

/// An RGB color with an alpha channel.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AlphaColor {
    components: [f32; 4],
}

impl AlphaColor {
    /// A black color.
    pub const BLACK: Self = Self::new([0., 0., 0., 1.]);

    /// A transparent color.
    pub const TRANSPARENT: Self = Self::new([0., 0., 0., 0.]);

    /// A white color.
    pub const WHITE: Self = Self::new([1., 1., 1., 1.]);

    /// Create a new color from RGBA components in the range `[0, 1]`.
    pub const fn new(components: [f32; 4]) -> Self {
        Self { components }
    }

    /// Create a new color from RGB8 values.
    pub const fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::from_rgba8(r, g, b, 255)
    }

    /// Create a new color from RGBA8 values.
    pub const fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new([u8_to_f32(r), u8_to_f32(g), u8_to_f32(b), u8_to_f32(a)])
    }

    /// Return the color as RGBA8.
    pub fn to_rgba8(&self) -> [u8; 4] {
        self.components.map(|c| (c.clamp(0.0, 1.0) * 255.0 + 0.5) as u8)
    }

    /// Return the color as premultiplied RGBA8.
    pub fn to_premultiplied_rgba8(&self) -> [u8; 4] {
        self.premultiplied()
            .map(|c| (c.clamp(0.0, 1.0) * 255.0 + 0.5) as u8)
    }

    /// Return the components of the color.
    pub fn components(&self) -> [f32; 4] {
        self.components
    }

    /// Return the color with premultiplied alpha.
    pub fn premultiplied(&self) -> [f32; 4] {
        let [r, g, b, a] = self.components;

        [r * a, g * a, b * a, a]
    }

    /// Return the color with its alpha multiplied by `alpha`.
    pub fn multiply_alpha(self, alpha: f32) -> Self {
        let [r, g, b, a] = self.components;

        Self::new([r, g, b, a * alpha])
    }
}

const fn u8_to_f32(x: u8) -> f32 {
    x as f32 * (1.0 / 255.0)
}

/// Color spaces are allowed to nest (an `Indexed` space over an `ICCBased`
/// space, for example), but never this deep.
const MAX_NESTING: usize = 8;

/// A PDF color space. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct ColorSpace(Arc<ColorSpaceKind>);

#[derive(Debug)]
enum ColorSpaceKind {
    DeviceGray,
    DeviceRgb,
    DeviceCmyk,
    CalGray(CalGray),
    CalRgb(CalRgb),
    Lab(Lab),
    IccBased(IccBased),
    Indexed(Indexed),
    Separation(Separation),
    DeviceN(DeviceN),
    Pattern(Option<ColorSpace>),
}

impl ColorSpace {
    /// The `DeviceGray` color space.
    pub fn device_gray() -> Self {
        Self(Arc::new(ColorSpaceKind::DeviceGray))
    }

    /// The `DeviceRGB` color space.
    pub fn device_rgb() -> Self {
        Self(Arc::new(ColorSpaceKind::DeviceRgb))
    }

    /// The `DeviceCMYK` color space.
    pub fn device_cmyk() -> Self {
        Self(Arc::new(ColorSpaceKind::DeviceCmyk))
    }

    /// A `Pattern` color space without an underlying color space.
    pub fn pattern() -> Self {
        Self(Arc::new(ColorSpaceKind::Pattern(None)))
    }

    /// Resolve one of the color space names that do not need parameters.
    ///
    /// Abbreviations used in inline images are accepted too.
    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"DeviceGray" | b"G" | b"CalGray" => Some(Self::device_gray()),
            b"DeviceRGB" | b"RGB" | b"CalRGB" => Some(Self::device_rgb()),
            b"DeviceCMYK" | b"CMYK" | b"CalCMYK" => Some(Self::device_cmyk()),
            b"Pattern" => Some(Self::pattern()),
            _ => None,
        }
    }

    /// Load a color space from a name, an array, or a reference to either.
    ///
    /// Color spaces stored under a reference are memoized in the
    /// document cache.
    pub fn from_object(obj: &Object, ctx: &LoadContext<'_>) -> Option<Self> {
        Self::load(obj, ctx, 0)
    }

    fn load(obj: &Object, ctx: &LoadContext<'_>, depth: usize) -> Option<Self> {
        if depth > MAX_NESTING {
            warn!("color space is nested too deeply");

            return None;
        }

        match obj {
            Object::Ref(r) => ctx
                .cache
                .color_spaces
                .get_or_insert_with(*r, || {
                    let resolved = ctx.deref(obj)?;

                    Self::load(&resolved, ctx, depth + 1).map(Arc::new)
                })
                .map(|cs| cs.as_ref().clone()),
            Object::Name(name) => Self::from_name(name.as_bytes()),
            Object::Array(arr) => Self::from_array(arr, ctx, depth),
            _ => None,
        }
    }

    fn from_array(arr: &[Object], ctx: &LoadContext<'_>, depth: usize) -> Option<Self> {
        let family = ctx.cast::<Name>(arr.first()?)?;
        let param = |idx: usize| arr.get(idx);

        let kind = match family.as_bytes() {
            b"DeviceGray" | b"DeviceRGB" | b"DeviceCMYK" | b"G" | b"RGB" | b"CMYK" => {
                return Self::from_name(family.as_bytes());
            }
            b"Pattern" => ColorSpaceKind::Pattern(match param(1) {
                Some(base) => Some(Self::load(base, ctx, depth + 1)?),
                None => None,
            }),
            b"CalGray" => ColorSpaceKind::CalGray(CalGray::new(&ctx.cast(param(1)?)?, ctx)),
            b"CalRGB" => ColorSpaceKind::CalRgb(CalRgb::new(&ctx.cast(param(1)?)?, ctx)),
            b"Lab" => ColorSpaceKind::Lab(Lab::new(&ctx.cast(param(1)?)?, ctx)),
            b"ICCBased" => return IccBased::load(param(1)?, ctx, depth),
            b"Indexed" | b"I" => ColorSpaceKind::Indexed(Indexed::new(arr, ctx, depth)?),
            b"Separation" => ColorSpaceKind::Separation(Separation::new(arr, ctx, depth)?),
            b"DeviceN" => ColorSpaceKind::DeviceN(DeviceN::new(arr, ctx, depth)?),
            other => {
                warn!(
                    "unknown color space family {}",
                    String::from_utf8_lossy(other)
                );

                return None;
            }
        };

        Some(Self(Arc::new(kind)))
    }

    /// The number of components a color in this space has.
    pub fn num_components(&self) -> usize {
        match self.0.as_ref() {
            ColorSpaceKind::DeviceGray
            | ColorSpaceKind::CalGray(_)
            | ColorSpaceKind::Indexed(_)
            | ColorSpaceKind::Separation(_) => 1,
            ColorSpaceKind::DeviceRgb | ColorSpaceKind::CalRgb(_) | ColorSpaceKind::Lab(_) => 3,
            ColorSpaceKind::DeviceCmyk => 4,
            ColorSpaceKind::IccBased(icc) => icc.n,
            ColorSpaceKind::DeviceN(d) => d.n,
            ColorSpaceKind::Pattern(base) => base.as_ref().map_or(0, |b| b.num_components()),
        }
    }

    /// The color that is selected when switching to this color space.
    pub fn initial_color(&self) -> ColorComponents {
        match self.0.as_ref() {
            ColorSpaceKind::DeviceCmyk => smallvec![0.0, 0.0, 0.0, 1.0],
            ColorSpaceKind::IccBased(icc) if icc.n == 4 => smallvec![0.0, 0.0, 0.0, 1.0],
            ColorSpaceKind::Lab(lab) => {
                smallvec![0.0, 0.0_f32.clamp(lab.range[0], lab.range[1]), 0.0_f32.clamp(lab.range[2], lab.range[3])]
            }
            ColorSpaceKind::Separation(_) | ColorSpaceKind::DeviceN(_) => {
                SmallVec::from_elem(1.0, self.num_components())
            }
            ColorSpaceKind::Pattern(_) => SmallVec::new(),
            _ => SmallVec::from_elem(0.0, self.num_components()),
        }
    }

    /// The default `Decode` array of an image with the given bit depth.
    pub fn default_decode(&self, bits_per_component: u8) -> SmallVec<[(f32, f32); 4]> {
        match self.0.as_ref() {
            ColorSpaceKind::Indexed(_) => {
                smallvec![(0.0, folio_common::bit::max_value(bits_per_component) as f32)]
            }
            ColorSpaceKind::Lab(lab) => smallvec![
                (0.0, 100.0),
                (lab.range[0], lab.range[1]),
                (lab.range[2], lab.range[3])
            ],
            ColorSpaceKind::IccBased(icc) => icc.range.clone(),
            _ => SmallVec::from_elem((0.0, 1.0), self.num_components()),
        }
    }

    /// Whether this is a `Pattern` color space.
    pub fn is_pattern(&self) -> bool {
        matches!(self.0.as_ref(), ColorSpaceKind::Pattern(_))
    }

    /// The underlying color space of an uncolored pattern space.
    pub fn pattern_base(&self) -> Option<&Self> {
        match self.0.as_ref() {
            ColorSpaceKind::Pattern(base) => base.as_ref(),
            _ => None,
        }
    }

    /// Whether this is an `Indexed` color space.
    pub fn is_indexed(&self) -> bool {
        matches!(self.0.as_ref(), ColorSpaceKind::Indexed(_))
    }

    /// Whether this is a device color space of the same kind as `other`,
    /// or the very same color space.
    pub(crate) fn same_as(&self, other: &Self) -> bool {
        use ColorSpaceKind::*;

        Arc::ptr_eq(&self.0, &other.0)
            || matches!(
                (self.0.as_ref(), other.0.as_ref()),
                (DeviceGray, DeviceGray)
                    | (DeviceRgb, DeviceRgb)
                    | (DeviceCmyk, DeviceCmyk)
                    | (Pattern(None), Pattern(None))
            )
    }

    /// Convert a color in this color space to RGBA.
    ///
    /// Missing components are treated as zero. Unsupported colors become
    /// black, so that content still shows up.
    pub fn to_rgba(&self, components: &[f32], alpha: f32) -> AlphaColor {
        match self.to_rgb(components) {
            Some([r, g, b]) => AlphaColor::new([r, g, b, alpha]),
            None if self.is_none_separation() => AlphaColor::TRANSPARENT,
            None => AlphaColor::BLACK.multiply_alpha(alpha),
        }
    }

    fn is_none_separation(&self) -> bool {
        match self.0.as_ref() {
            ColorSpaceKind::Separation(s) => s.is_none,
            ColorSpaceKind::DeviceN(d) => d.is_none,
            _ => false,
        }
    }

    fn to_rgb(&self, c: &[f32]) -> Option<[f32; 3]> {
        let get = |idx: usize| c.get(idx).copied().unwrap_or(0.0).clamp(0.0, 1.0);

        match self.0.as_ref() {
            ColorSpaceKind::DeviceGray => Some([get(0); 3]),
            ColorSpaceKind::DeviceRgb => Some([get(0), get(1), get(2)]),
            ColorSpaceKind::DeviceCmyk => Some(cmyk_to_rgb(get(0), get(1), get(2), get(3))),
            ColorSpaceKind::CalGray(cal) => Some(cal.to_rgb(get(0))),
            ColorSpaceKind::CalRgb(cal) => Some(cal.to_rgb([get(0), get(1), get(2)])),
            ColorSpaceKind::Lab(lab) => {
                let raw = |idx: usize| c.get(idx).copied().unwrap_or(0.0);

                Some(lab.to_rgb([raw(0), raw(1), raw(2)]))
            }
            ColorSpaceKind::IccBased(icc) => icc.to_rgb(c),
            ColorSpaceKind::Indexed(indexed) => indexed.to_rgb(c.first().copied().unwrap_or(0.0)),
            ColorSpaceKind::Separation(sep) => {
                if sep.is_none {
                    return None;
                }

                let tint = eval_all(&sep.tint, &[get(0)])?;
                sep.alternate.to_rgb(&tint)
            }
            ColorSpaceKind::DeviceN(dev) => {
                if dev.is_none {
                    return None;
                }

                let input = (0..dev.n).map(get).collect::<ColorComponents>();
                let tint = eval_all(&dev.tint, &input)?;
                dev.alternate.to_rgb(&tint)
            }
            // Pattern colors are resolved by the pattern itself.
            ColorSpaceKind::Pattern(_) => None,
        }
    }
}

fn cmyk_to_rgb(c: f32, m: f32, y: f32, k: f32) -> [f32; 3] {
    [(1.0 - c) * (1.0 - k), (1.0 - m) * (1.0 - k), (1.0 - y) * (1.0 - k)]
}

/// Map XYZ relative to `white` to XYZ relative to D50 with a von Kries
/// style scaling.
fn adapt_to_d50(xyz: [f32; 3], white: [f32; 3]) -> [f32; 3] {
    let mut out = xyz;

    for i in 0..3 {
        if white[i] > 0.0 {
            out[i] *= D50[i] / white[i];
        }
    }

    out
}

fn white_point(dict: &Dict, ctx: &LoadContext<'_>) -> [f32; 3] {
    ctx.get::<[f32; 3]>(dict, WHITE_POINT)
        .filter(|w| w[1] > 0.0)
        .unwrap_or(D50)
}

#[derive(Debug)]
struct CalGray {
    white_point: [f32; 3],
    gamma: f32,
}

impl CalGray {
    fn new(dict: &Dict, ctx: &LoadContext<'_>) -> Self {
        Self {
            white_point: white_point(dict, ctx),
            gamma: ctx.get::<f32>(dict, GAMMA).unwrap_or(1.0),
        }
    }

    fn to_rgb(&self, a: f32) -> [f32; 3] {
        // The luminance is mapped to sRGB the same way pdf.js does it.
        let l = self.white_point[1] * a.powf(self.gamma);
        let v = (295.8 * l.powf(1.0 / 3.0) - 40.8).max(0.0) / 255.0;

        [v.min(1.0); 3]
    }
}

#[derive(Debug)]
struct CalRgb {
    white_point: [f32; 3],
    gamma: [f32; 3],
    matrix: [f32; 9],
}

impl CalRgb {
    fn new(dict: &Dict, ctx: &LoadContext<'_>) -> Self {
        Self {
            white_point: white_point(dict, ctx),
            gamma: ctx.get::<[f32; 3]>(dict, GAMMA).unwrap_or([1.0; 3]),
            matrix: ctx
                .get::<[f32; 9]>(dict, MATRIX)
                .unwrap_or([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]),
        }
    }

    fn to_rgb(&self, abc: [f32; 3]) -> [f32; 3] {
        let lin = [
            abc[0].powf(self.gamma[0]),
            abc[1].powf(self.gamma[1]),
            abc[2].powf(self.gamma[2]),
        ];
        let m = &self.matrix;
        let xyz = [
            m[0] * lin[0] + m[3] * lin[1] + m[6] * lin[2],
            m[1] * lin[0] + m[4] * lin[1] + m[7] * lin[2],
            m[2] * lin[0] + m[5] * lin[1] + m[8] * lin[2],
        ];

        xyz_to_srgb(adapt_to_d50(xyz, self.white_point))
    }
}

#[derive(Debug)]
struct Lab {
    white_point: [f32; 3],
    range: [f32; 4],
}

impl Lab {
    fn new(dict: &Dict, ctx: &LoadContext<'_>) -> Self {
        Self {
            white_point: white_point(dict, ctx),
            range: ctx
                .get::<[f32; 4]>(dict, RANGE)
                .unwrap_or([-100.0, 100.0, -100.0, 100.0]),
        }
    }

    fn to_rgb(&self, lab: [f32; 3]) -> [f32; 3] {
        let l = lab[0].clamp(0.0, 100.0);
        let a = lab[1].clamp(self.range[0], self.range[1]);
        let b = lab[2].clamp(self.range[2], self.range[3]);

        let xyz = lab_to_xyz(l, a, b, self.white_point);

        xyz_to_srgb(adapt_to_d50(xyz, self.white_point))
    }
}

#[derive(Debug)]
struct IccBased {
    n: usize,
    range: SmallVec<[(f32, f32); 4]>,
    profile: Arc<IccProfile>,
}

impl IccBased {
    fn load(obj: &Object, ctx: &LoadContext<'_>, depth: usize) -> Option<ColorSpace> {
        let stream = ctx.cast::<Stream>(obj)?;
        let dict = stream.dict();
        let n = ctx.get::<usize>(dict, N);

        let profile = match obj {
            Object::Ref(r) => ctx
                .cache
                .icc_profiles
                .get_or_insert_with(*r, || Self::parse(&stream)),
            _ => Self::parse(&stream),
        };

        let profile = profile.filter(|p| {
            n.is_none_or(|n| p.num_components() == Some(n)) && p.num_components().is_some()
        });

        match profile {
            Some(profile) => {
                let n = n.or(profile.num_components())?;

                // sRGB profiles are by far the most common ones, there is
                // nothing to convert for them.
                if n == 3 && profile.is_srgb() {
                    return Some(ColorSpace::device_rgb());
                }

                let range = ctx
                    .get::<Vec<f32>>(dict, RANGE)
                    .filter(|r| r.len() == 2 * n)
                    .map(|r| r.chunks_exact(2).map(|c| (c[0], c[1])).collect())
                    .unwrap_or_else(|| SmallVec::from_elem((0.0, 1.0), n));

                Some(ColorSpace(Arc::new(ColorSpaceKind::IccBased(Self {
                    n,
                    range,
                    profile,
                }))))
            }
            None => {
                warn!("falling back to the alternate of an unusable ICC profile");
                ctx.warn(InterpreterWarning::IccProfileFallback);

                Self::alternate(dict, n, ctx, depth)
            }
        }
    }

    fn parse(stream: &Stream) -> Option<Arc<IccProfile>> {
        let data = stream.decoded()?;

        IccProfile::parse(&data).map(Arc::new)
    }

    fn alternate(
        dict: &Dict,
        n: Option<usize>,
        ctx: &LoadContext<'_>,
        depth: usize,
    ) -> Option<ColorSpace> {
        if let Some(alt) = dict
            .get_raw(ALTERNATE)
            .and_then(|a| ColorSpace::load(a, ctx, depth + 1))
        {
            return Some(alt);
        }

        match n? {
            1 => Some(ColorSpace::device_gray()),
            3 => Some(ColorSpace::device_rgb()),
            4 => Some(ColorSpace::device_cmyk()),
            _ => None,
        }
    }

    fn to_rgb(&self, c: &[f32]) -> Option<[f32; 3]> {
        let normalized = (0..self.n)
            .map(|i| {
                let (lo, hi) = self.range[i];
                let v = c.get(i).copied().unwrap_or(0.0);

                if hi > lo { (v - lo) / (hi - lo) } else { 0.0 }.clamp(0.0, 1.0)
            })
            .collect::<ColorComponents>();

        self.profile.to_srgb(&normalized).or_else(|| {
            // Profiles without a usable transform are treated like device
            // colors with the same number of components.
            let get = |i: usize| normalized.get(i).copied().unwrap_or(0.0);

            match self.n {
                1 => Some([get(0); 3]),
                3 => Some([get(0), get(1), get(2)]),
                4 => Some(cmyk_to_rgb(get(0), get(1), get(2), get(3))),
                _ => None,
            }
        })
    }
}

#[derive(Debug)]
struct Indexed {
    base: ColorSpace,
    hival: u8,
    lookup: Vec<u8>,
}

impl Indexed {
    fn new(arr: &[Object], ctx: &LoadContext<'_>, depth: usize) -> Option<Self> {
        let base = ColorSpace::load(arr.get(1)?, ctx, depth + 1)?;
        let hival = ctx.cast::<i64>(arr.get(2)?)?.clamp(0, 255) as u8;

        let lookup = match ctx.deref(arr.get(3)?)? {
            Object::String(s) => PdfString::as_bytes(&s).to_vec(),
            Object::Stream(s) => s.decoded()?,
            _ => return None,
        };

        if base.is_pattern() || base.is_indexed() {
            warn!("indexed color space with an invalid base");

            return None;
        }

        Some(Self {
            base,
            hival,
            lookup,
        })
    }

    fn to_rgb(&self, index: f32) -> Option<[f32; 3]> {
        let idx = index.clamp(0.0, self.hival as f32).round() as usize;
        let n = self.base.num_components();
        let decode = self.base.default_decode(8);

        let components = (0..n)
            .map(|i| {
                let byte = self.lookup.get(idx * n + i).copied().unwrap_or(0);
                let (lo, hi) = decode[i];

                lo + byte as f32 / 255.0 * (hi - lo)
            })
            .collect::<ColorComponents>();

        self.base.to_rgb(&components)
    }
}

#[derive(Debug)]
struct Separation {
    alternate: ColorSpace,
    tint: Vec<Function>,
    is_none: bool,
}

impl Separation {
    fn new(arr: &[Object], ctx: &LoadContext<'_>, depth: usize) -> Option<Self> {
        let name = ctx.cast::<Name>(arr.get(1)?)?;
        let alternate = ColorSpace::load(arr.get(2)?, ctx, depth + 1)?;
        let tint = load_functions(arr.get(3)?, ctx)?;

        Some(Self {
            alternate,
            tint,
            is_none: name.as_bytes() == b"None",
        })
    }
}

#[derive(Debug)]
struct DeviceN {
    n: usize,
    alternate: ColorSpace,
    tint: Vec<Function>,
    is_none: bool,
}

impl DeviceN {
    fn new(arr: &[Object], ctx: &LoadContext<'_>, depth: usize) -> Option<Self> {
        let names = ctx.cast::<Vec<Name>>(arr.get(1)?)?;
        let alternate = ColorSpace::load(arr.get(2)?, ctx, depth + 1)?;
        let tint = load_functions(arr.get(3)?, ctx)?;

        if names.is_empty() || names.len() > 32 {
            return None;
        }

        Some(Self {
            n: names.len(),
            alternate,
            tint,
            is_none: names.iter().all(|n| n.as_bytes() == b"None"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DocumentCache;
    use crate::interpret::WarningSinkFn;
    use folio_syntax::object::{ObjRef, ObjectStore};
    use std::sync::Mutex;

    fn load(store: &ObjectStore, src: &[u8]) -> Option<ColorSpace> {
        let cache = DocumentCache::new();
        let sink: WarningSinkFn = Arc::new(|_| {});
        let ctx = LoadContext::new(store, &cache, &sink);

        ColorSpace::from_object(&Object::from_bytes(src)?, &ctx)
    }

    fn rgb8(cs: &ColorSpace, c: &[f32]) -> [u8; 3] {
        let [r, g, b, _] = cs.to_rgba(c, 1.0).to_rgba8();

        [r, g, b]
    }

    #[test]
    fn cmyk() {
        let cs = ColorSpace::device_cmyk();

        assert_eq!(rgb8(&cs, &[0.0, 0.0, 0.0, 0.0]), [255, 255, 255]);
        assert_eq!(rgb8(&cs, &[0.0, 0.0, 0.0, 1.0]), [0, 0, 0]);
        assert_eq!(rgb8(&cs, &[1.0, 0.0, 0.0, 0.0]), [0, 255, 255]);
    }

    #[test]
    fn names() {
        assert_eq!(ColorSpace::from_name(b"G").unwrap().num_components(), 1);
        assert_eq!(ColorSpace::from_name(b"CalCMYK").unwrap().num_components(), 4);
        assert!(ColorSpace::from_name(b"Foo").is_none());
    }

    #[test]
    fn indexed_identity() {
        let mut table = String::from("<");
        (0..=255u8).for_each(|i| table.push_str(&format!("{i:02x}")));
        table.push('>');

        let src = format!("[/Indexed /DeviceGray 255 {table}]");
        let cs = load(&ObjectStore::new(), src.as_bytes()).unwrap();

        assert_eq!(cs.default_decode(8).as_slice(), &[(0.0, 255.0)]);
        assert_eq!(rgb8(&cs, &[128.0]), [128, 128, 128]);
        // Out of range indices are clamped.
        assert_eq!(rgb8(&cs, &[300.0]), [255, 255, 255]);
    }

    #[test]
    fn indexed_short_table() {
        let cs = load(&ObjectStore::new(), b"[/Indexed /DeviceRGB 1 <ff0000>]").unwrap();

        assert_eq!(rgb8(&cs, &[0.0]), [255, 0, 0]);
        assert_eq!(rgb8(&cs, &[1.0]), [0, 0, 0]);
    }

    #[test]
    fn separation() {
        let cs = load(
            &ObjectStore::new(),
            b"[/Separation /Spot /DeviceCMYK << /FunctionType 2 /Domain [0 1] /C0 [0 0 0 0] /C1 [0 0 0 1] /N 1 >>]",
        )
        .unwrap();

        assert_eq!(cs.num_components(), 1);
        assert_eq!(cs.initial_color().as_slice(), &[1.0]);
        assert_eq!(rgb8(&cs, &[1.0]), [0, 0, 0]);
        assert_eq!(rgb8(&cs, &[0.0]), [255, 255, 255]);
    }

    #[test]
    fn none_separation_is_invisible() {
        let cs = load(
            &ObjectStore::new(),
            b"[/Separation /None /DeviceGray << /FunctionType 2 /Domain [0 1] /N 1 >>]",
        )
        .unwrap();

        assert_eq!(cs.to_rgba(&[1.0], 1.0).to_rgba8()[3], 0);
    }

    #[test]
    fn lab_white() {
        let cs = load(&ObjectStore::new(), b"[/Lab << /WhitePoint [0.9505 1 1.089] >>]").unwrap();
        let [r, g, b] = rgb8(&cs, &[100.0, 0.0, 0.0]);

        assert!(r > 250 && g > 250 && b > 250);
    }

    #[test]
    fn icc_falls_back_to_alternate() {
        let mut store = ObjectStore::new();
        store.insert(
            ObjRef::new(5, 0),
            Object::from_bytes(b"<< /N 4 /Alternate /DeviceCMYK /Length 4 >>\nstream\njunk\nendstream")
                .unwrap(),
        );

        let warnings = Arc::new(Mutex::new(vec![]));
        let sink: WarningSinkFn = {
            let warnings = warnings.clone();
            Arc::new(move |w| warnings.lock().unwrap().push(w))
        };
        let cache = DocumentCache::new();
        let ctx = LoadContext::new(&store, &cache, &sink);

        let cs = ColorSpace::from_object(&Object::from_bytes(b"[/ICCBased 5 0 R]").unwrap(), &ctx)
            .unwrap();

        assert_eq!(cs.num_components(), 4);
        assert_eq!(rgb8(&cs, &[0.0, 0.0, 0.0, 1.0]), [0, 0, 0]);
        assert_eq!(
            warnings.lock().unwrap().as_slice(),
            &[InterpreterWarning::IccProfileFallback]
        );
    }

    #[test]
    fn icc_gray_profile() {
        let data = icc::tests::build_profile(b"GRAY", &[(b"kTRC", icc::tests::gamma_curve(1.0))]);
        let mut src = format!("<< /N 1 /Length {} >>\nstream\n", data.len()).into_bytes();
        src.extend_from_slice(&data);
        src.extend_from_slice(b"\nendstream");

        let mut store = ObjectStore::new();
        store.insert(ObjRef::new(1, 0), Object::from_bytes(&src).unwrap());

        let cs = load(&store, b"[/ICCBased 1 0 R]").unwrap();
        let [r, g, b] = rgb8(&cs, &[1.0]);

        assert_eq!(cs.num_components(), 1);
        assert!(r > 250 && r == g && g == b);
        assert_eq!(rgb8(&cs, &[0.0]), [0, 0, 0]);
    }

    #[test]
    fn cached_by_reference() {
        let mut store = ObjectStore::new();
        store.insert(
            ObjRef::new(3, 0),
            Object::from_bytes(b"[/Indexed /DeviceRGB 0 <00ff00>]").unwrap(),
        );

        let cache = DocumentCache::new();
        let sink: WarningSinkFn = Arc::new(|_| {});
        let ctx = LoadContext::new(&store, &cache, &sink);
        let obj = Object::Ref(ObjRef::new(3, 0));

        let a = ColorSpace::from_object(&obj, &ctx).unwrap();
        let b = ColorSpace::from_object(&obj, &ctx).unwrap();

        assert!(Arc::ptr_eq(&a.0, &b.0));
        assert_eq!(cache.color_spaces.len(), 1);
    }
}
