//! A small ICC profile parser.
//!
//! Only what is needed to approximate the conversion of device colors to
//! sRGB is implemented: gray profiles with a `kTRC` curve, RGB profiles
//! built from colorant matrices and tone curves, and `A2B0` lookup tables
//! in the `mft1`/`mft2` formats (which covers most CMYK profiles). All
//! other tags are still parsed into a typed record, so that callers can
//! inspect them.
//!
//! Tags are parsed lazily: reading the header and the tag table is cheap,
//! and each tag is decoded on first access only.

use folio_common::byte::Reader;
use log::warn;
use smallvec::SmallVec;
use std::fmt;
use std::sync::OnceLock;

const HEADER_SIZE: usize = 128;
const MAX_TAGS: u32 = 1024;
const MAX_LUT_CHANNELS: u8 = 15;

/// A four-byte signature.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature(pub [u8; 4]);

impl Signature {
    /// `XYZ `, the XYZ profile connection space.
    pub const XYZ: Self = Self(*b"XYZ ");
    /// `Lab `, the CIELAB profile connection space.
    pub const LAB: Self = Self(*b"Lab ");
    /// `GRAY`.
    pub const GRAY: Self = Self(*b"GRAY");
    /// `RGB `.
    pub const RGB: Self = Self(*b"RGB ");
    /// `CMYK`.
    pub const CMYK: Self = Self(*b"CMYK");

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        Some(Self(r.read_bytes(4)?.try_into().ok()?))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", String::from_utf8_lossy(&self.0))
    }
}

/// The creation date of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateTime {
    /// The year.
    pub year: u16,
    /// The month.
    pub month: u16,
    /// The day.
    pub day: u16,
    /// The hour.
    pub hour: u16,
    /// The minute.
    pub minute: u16,
    /// The second.
    pub second: u16,
}

/// The fixed 128-byte header of a profile.
#[derive(Debug, Clone)]
pub struct Header {
    /// The declared size of the profile.
    pub size: u32,
    /// The preferred CMM.
    pub cmm: Signature,
    /// Major and minor version.
    pub version: (u8, u8),
    /// The device class, e.g. `mntr` or `prtr`.
    pub class: Signature,
    /// The color space of the data, e.g. `RGB `.
    pub color_space: Signature,
    /// The profile connection space, `XYZ ` or `Lab `.
    pub pcs: Signature,
    /// The creation date.
    pub created: DateTime,
    /// The primary platform.
    pub platform: Signature,
    /// Profile flags.
    pub flags: u32,
    /// The device manufacturer.
    pub manufacturer: u32,
    /// The device model.
    pub model: u32,
    /// Device attributes.
    pub attributes: u64,
    /// The rendering intent.
    pub rendering_intent: u32,
    /// The PCS illuminant.
    pub illuminant: [f32; 3],
    /// The profile creator.
    pub creator: Signature,
}

/// An entry of the tag table.
#[derive(Debug, Clone, Copy)]
pub struct TagEntry {
    /// The tag signature, e.g. `rTRC`.
    pub signature: Signature,
    /// The offset of the tag data from the start of the profile.
    pub offset: u32,
    /// The size of the tag data.
    pub size: u32,
}

/// A tone reproduction curve.
#[derive(Debug, Clone, PartialEq)]
pub enum Curve {
    /// The identity.
    Identity,
    /// `y = x ^ gamma`.
    Gamma(f32),
    /// A sampled curve with 16-bit entries.
    Table(Vec<u16>),
    /// One of the parametric curves of the `para` type.
    Parametric {
        /// The function type, 0 to 4.
        kind: u16,
        /// The parameters `g a b c d e f`, as far as the type uses them.
        params: SmallVec<[f32; 7]>,
    },
}

impl Curve {
    /// Evaluate the curve at `x` in `[0, 1]`.
    pub fn eval(&self, x: f32) -> f32 {
        let x = x.clamp(0.0, 1.0);

        match self {
            Self::Identity => x,
            Self::Gamma(g) => x.powf(*g),
            Self::Table(t) => interpolate_table(t, x) / 65535.0,
            Self::Parametric { kind, params } => {
                let p = |i: usize| params.get(i).copied().unwrap_or(0.0);
                let g = p(0);

                let y = match kind {
                    0 => x.powf(g),
                    1 => {
                        if x >= -p(2) / p(1) {
                            (p(1) * x + p(2)).powf(g)
                        } else {
                            0.0
                        }
                    }
                    2 => {
                        if x >= -p(2) / p(1) {
                            (p(1) * x + p(2)).powf(g) + p(3)
                        } else {
                            p(3)
                        }
                    }
                    3 => {
                        if x >= p(4) {
                            (p(1) * x + p(2)).powf(g)
                        } else {
                            p(3) * x
                        }
                    }
                    4 => {
                        if x >= p(4) {
                            (p(1) * x + p(2)).powf(g) + p(5)
                        } else {
                            p(3) * x + p(6)
                        }
                    }
                    _ => x,
                };

                y.clamp(0.0, 1.0)
            }
        }
    }
}

fn interpolate_table(table: &[u16], x: f32) -> f32 {
    match table.len() {
        0 => x * 65535.0,
        1 => table[0] as f32,
        n => {
            let pos = x * (n - 1) as f32;
            let lo = (pos.floor() as usize).min(n - 1);
            let hi = (lo + 1).min(n - 1);
            let t = pos - lo as f32;

            table[lo] as f32 * (1.0 - t) + table[hi] as f32 * t
        }
    }
}

/// A lookup table of the `mft1` or `mft2` type.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut {
    /// The number of input channels.
    pub input_channels: u8,
    /// The number of output channels.
    pub output_channels: u8,
    /// The number of grid points per input dimension.
    pub grid_points: u8,
    /// The 3x3 matrix, only applied for XYZ input.
    pub matrix: [f32; 9],
    /// One curve per input channel, normalized to `[0, 1]`.
    pub input_tables: Vec<Vec<f32>>,
    /// The multi-dimensional table, normalized to `[0, 1]`.
    pub clut: Vec<f32>,
    /// One curve per output channel, normalized to `[0, 1]`.
    pub output_tables: Vec<Vec<f32>>,
}

impl Lut {
    /// Map `input` through the input curves, the table and the output curves.
    pub fn eval(&self, input: &[f32]) -> Option<SmallVec<[f32; 4]>> {
        let n_in = self.input_channels as usize;
        let n_out = self.output_channels as usize;

        if input.len() < n_in {
            return None;
        }

        let grid_max = self.grid_points.saturating_sub(1) as f32;
        let mut base = [0usize; MAX_LUT_CHANNELS as usize];
        let mut frac = [0f32; MAX_LUT_CHANNELS as usize];

        for i in 0..n_in {
            let v = lookup(&self.input_tables[i], input[i]);
            let pos = v * grid_max;
            let lo = (pos.floor() as usize).min(self.grid_points.saturating_sub(2) as usize);
            base[i] = lo;
            frac[i] = (pos - lo as f32).clamp(0.0, 1.0);
        }

        let mut out: SmallVec<[f32; 4]> = SmallVec::from_elem(0.0, n_out);
        let grid = self.grid_points as usize;

        // Multi-linear interpolation over all 2^n corners of the grid cell.
        for corner in 0..(1usize << n_in) {
            let mut weight = 1.0;
            let mut idx = 0;

            for i in 0..n_in {
                let bit = (corner >> (n_in - 1 - i)) & 1;
                let coord = (base[i] + bit).min(grid - 1);
                weight *= if bit == 1 { frac[i] } else { 1.0 - frac[i] };
                idx = idx * grid + coord;
            }

            if weight == 0.0 {
                continue;
            }

            for (o, slot) in out.iter_mut().enumerate() {
                *slot += weight * self.clut.get(idx * n_out + o).copied().unwrap_or(0.0);
            }
        }

        for (o, slot) in out.iter_mut().enumerate() {
            *slot = lookup(&self.output_tables[o], *slot);
        }

        Some(out)
    }
}

fn lookup(table: &[f32], x: f32) -> f32 {
    let x = x.clamp(0.0, 1.0);

    match table.len() {
        0 => x,
        1 => table[0],
        n => {
            let pos = x * (n - 1) as f32;
            let lo = (pos.floor() as usize).min(n - 1);
            let hi = (lo + 1).min(n - 1);
            let t = pos - lo as f32;

            table[lo] * (1.0 - t) + table[hi] * t
        }
    }
}

/// A named color of an `ncl2` tag.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedColor {
    /// The color name, without prefix and suffix.
    pub name: String,
    /// The PCS coordinates, as stored (16-bit).
    pub pcs: [u16; 3],
}

/// A decoded tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    /// `curv` or `para`.
    Curve(Curve),
    /// `XYZ `.
    Xyz(Vec<[f32; 3]>),
    /// `mft1` (8-bit) or `mft2` (16-bit).
    Lut(Lut),
    /// `ncl2`.
    NamedColors(Vec<NamedColor>),
    /// `sf32`.
    S15Fixed16Array(Vec<f32>),
    /// `desc` or `text`.
    Text(String),
    /// A tag type this parser does not decode.
    Unknown(Signature),
}

/// A parsed ICC profile.
pub struct IccProfile {
    data: Vec<u8>,
    header: Header,
    tags: Vec<TagEntry>,
    loaded: Vec<OnceLock<Option<Tag>>>,
}

impl fmt::Debug for IccProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IccProfile")
            .field("header", &self.header)
            .field("tags", &self.tags)
            .finish()
    }
}

impl IccProfile {
    /// Parse the header and tag table of a profile.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < HEADER_SIZE + 4 {
            warn!("ICC profile is too short");

            return None;
        }

        let mut r = Reader::new(data);
        let header = read_header(&mut r)?;

        r.jump(HEADER_SIZE);
        let count = r.read_u32()?;

        if count > MAX_TAGS {
            warn!("ICC profile has too many tags ({count})");

            return None;
        }

        let mut tags = Vec::with_capacity(count as usize);

        for _ in 0..count {
            let entry = TagEntry {
                signature: Signature::read(&mut r)?,
                offset: r.read_u32()?,
                size: r.read_u32()?,
            };

            if (entry.offset as usize).saturating_add(entry.size as usize) > data.len() {
                warn!("ICC tag {:?} points past the end of the profile", entry.signature);

                continue;
            }

            tags.push(entry);
        }

        Some(Self {
            data: data.to_vec(),
            header,
            loaded: (0..tags.len()).map(|_| OnceLock::new()).collect(),
            tags,
        })
    }

    /// The profile header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The tag table.
    pub fn tag_entries(&self) -> &[TagEntry] {
        &self.tags
    }

    /// The number of color components of the data color space.
    pub fn num_components(&self) -> Option<usize> {
        match &self.header.color_space.0 {
            b"GRAY" => Some(1),
            b"RGB " | b"Lab " | b"XYZ " => Some(3),
            b"CMYK" => Some(4),
            _ => None,
        }
    }

    /// Decode the tag with the given signature.
    pub fn tag(&self, signature: &[u8; 4]) -> Option<&Tag> {
        let idx = self.tags.iter().position(|t| &t.signature.0 == signature)?;

        self.loaded[idx]
            .get_or_init(|| {
                let entry = self.tags[idx];
                let start = entry.offset as usize;
                let data = self.data.get(start..start + entry.size as usize)?;

                read_tag(data)
            })
            .as_ref()
    }

    fn curve(&self, signature: &[u8; 4]) -> Option<&Curve> {
        match self.tag(signature)? {
            Tag::Curve(c) => Some(c),
            _ => None,
        }
    }

    fn xyz(&self, signature: &[u8; 4]) -> Option<[f32; 3]> {
        match self.tag(signature)? {
            Tag::Xyz(v) => v.first().copied(),
            _ => None,
        }
    }

    /// Convert a color of the data color space to sRGB.
    ///
    /// This is an approximation: the rendering intent is ignored, only
    /// `A2B0` is consulted, and chromatic adaptation is folded into a fixed
    /// D50 to sRGB matrix.
    pub fn to_srgb(&self, input: &[f32]) -> Option<[f32; 3]> {
        if let Some(Tag::Lut(lut)) = self.tag(b"A2B0") {
            let pcs = lut.eval(input)?;

            return Some(if self.header.pcs == Signature::LAB {
                let (l, a, b) = (pcs[0] * 100.0, pcs[1] * 255.0 - 128.0, pcs[2] * 255.0 - 128.0);
                xyz_to_srgb(lab_to_xyz(l, a, b, D50))
            } else {
                // XYZ is encoded as u1Fixed15, so 1.0 maps to 32768/65535.
                let scale = 65535.0 / 32768.0;
                xyz_to_srgb([pcs[0] * scale, pcs[1] * scale, pcs[2] * scale])
            });
        }

        match self.num_components()? {
            1 => {
                let y = self.curve(b"kTRC")?.eval(*input.first()?);
                let [r, g, b] = xyz_to_srgb([D50[0] * y, y, D50[2] * y]);
                // Keep gray neutral.
                let v = (r + g + b) / 3.0;

                Some([v, v, v])
            }
            3 => {
                let cols = [self.xyz(b"rXYZ")?, self.xyz(b"gXYZ")?, self.xyz(b"bXYZ")?];
                let trcs = [
                    self.curve(b"rTRC")?,
                    self.curve(b"gTRC")?,
                    self.curve(b"bTRC")?,
                ];
                let lin = [
                    trcs[0].eval(*input.first()?),
                    trcs[1].eval(*input.get(1)?),
                    trcs[2].eval(*input.get(2)?),
                ];

                let mut xyz = [0.0; 3];

                for (c, col) in cols.iter().enumerate() {
                    for (i, v) in xyz.iter_mut().enumerate() {
                        *v += col[i] * lin[c];
                    }
                }

                Some(xyz_to_srgb(xyz))
            }
            _ => None,
        }
    }

    /// Whether the profile is a matrix/TRC profile that matches sRGB closely
    /// enough to skip the conversion altogether.
    pub fn is_srgb(&self) -> bool {
        let (Some(r), Some(g), Some(b)) = (self.xyz(b"rXYZ"), self.xyz(b"gXYZ"), self.xyz(b"bXYZ"))
        else {
            return false;
        };

        let close = |a: [f32; 3], b: [f32; 3]| a.iter().zip(b).all(|(a, b)| (a - b).abs() < 0.002);

        close(r, [0.4361, 0.2225, 0.0139])
            && close(g, [0.3851, 0.7169, 0.0971])
            && close(b, [0.1431, 0.0606, 0.7141])
    }
}

fn read_header(r: &mut Reader<'_>) -> Option<Header> {
    let size = r.read_u32()?;
    let cmm = Signature::read(r)?;
    let major = r.read_byte()?;
    let minor = r.read_byte()? >> 4;
    r.skip_bytes(2)?;
    let class = Signature::read(r)?;
    let color_space = Signature::read(r)?;
    let pcs = Signature::read(r)?;
    let created = DateTime {
        year: r.read_u16()?,
        month: r.read_u16()?,
        day: r.read_u16()?,
        hour: r.read_u16()?,
        minute: r.read_u16()?,
        second: r.read_u16()?,
    };

    if Signature::read(r)?.0 != *b"acsp" {
        warn!("ICC profile lacks the `acsp` signature");

        return None;
    }

    let platform = Signature::read(r)?;
    let flags = r.read_u32()?;
    let manufacturer = r.read_u32()?;
    let model = r.read_u32()?;
    let attributes = r.read_u64()?;
    let rendering_intent = r.read_u32()?;
    let illuminant = read_xyz(r)?;
    let creator = Signature::read(r)?;

    Some(Header {
        size,
        cmm,
        version: (major, minor),
        class,
        color_space,
        pcs,
        created,
        platform,
        flags,
        manufacturer,
        model,
        attributes,
        rendering_intent,
        illuminant,
        creator,
    })
}

fn read_s15_fixed16(r: &mut Reader<'_>) -> Option<f32> {
    Some(r.read_i32()? as f32 / 65536.0)
}

fn read_xyz(r: &mut Reader<'_>) -> Option<[f32; 3]> {
    Some([read_s15_fixed16(r)?, read_s15_fixed16(r)?, read_s15_fixed16(r)?])
}

fn read_tag(data: &[u8]) -> Option<Tag> {
    let mut r = Reader::new(data);
    let kind = Signature::read(&mut r)?;
    r.skip_bytes(4)?;

    let tag = match &kind.0 {
        b"curv" => {
            let count = r.read_u32()?;

            Tag::Curve(match count {
                0 => Curve::Identity,
                1 => Curve::Gamma(r.read_u16()? as f32 / 256.0),
                n => Curve::Table((0..n).map(|_| r.read_u16()).collect::<Option<_>>()?),
            })
        }
        b"para" => {
            let kind = r.read_u16()?;
            r.skip_bytes(2)?;
            let n = match kind {
                0 => 1,
                1 => 3,
                2 => 4,
                3 => 5,
                4 => 7,
                _ => return Some(Tag::Unknown(Signature(*b"para"))),
            };
            let params = (0..n)
                .map(|_| read_s15_fixed16(&mut r))
                .collect::<Option<_>>()?;

            Tag::Curve(Curve::Parametric { kind, params })
        }
        b"XYZ " => {
            let mut values = vec![];

            while r.tail().len() >= 12 {
                values.push(read_xyz(&mut r)?);
            }

            Tag::Xyz(values)
        }
        b"sf32" => {
            let mut values = vec![];

            while r.tail().len() >= 4 {
                values.push(read_s15_fixed16(&mut r)?);
            }

            Tag::S15Fixed16Array(values)
        }
        b"mft1" => Tag::Lut(read_lut(&mut r, false)?),
        b"mft2" => Tag::Lut(read_lut(&mut r, true)?),
        b"ncl2" => Tag::NamedColors(read_named_colors(&mut r)?),
        b"desc" => {
            let len = r.read_u32()? as usize;
            Tag::Text(ascii(r.read_bytes(len)?))
        }
        b"text" => Tag::Text(ascii(r.tail())),
        _ => Tag::Unknown(kind),
    };

    Some(tag)
}

fn ascii(data: &[u8]) -> String {
    let end = data.iter().position(|b| *b == 0).unwrap_or(data.len());

    String::from_utf8_lossy(&data[..end]).into_owned()
}

fn read_lut(r: &mut Reader<'_>, wide: bool) -> Option<Lut> {
    let input_channels = r.read_byte()?;
    let output_channels = r.read_byte()?;
    let grid_points = r.read_byte()?;
    r.skip_bytes(1)?;

    if input_channels == 0
        || input_channels > MAX_LUT_CHANNELS
        || output_channels == 0
        || output_channels > MAX_LUT_CHANNELS
        || grid_points < 2
    {
        warn!("unsupported ICC lookup table layout");

        return None;
    }

    let mut matrix = [0.0; 9];

    for m in &mut matrix {
        *m = read_s15_fixed16(r)?;
    }

    let (in_entries, out_entries) = if wide {
        (r.read_u16()? as usize, r.read_u16()? as usize)
    } else {
        (256, 256)
    };

    let read_value = |r: &mut Reader<'_>| -> Option<f32> {
        if wide {
            Some(r.read_u16()? as f32 / 65535.0)
        } else {
            Some(r.read_byte()? as f32 / 255.0)
        }
    };

    let read_tables = |r: &mut Reader<'_>, count: u8, entries: usize| {
        (0..count)
            .map(|_| (0..entries).map(|_| read_value(r)).collect::<Option<Vec<_>>>())
            .collect::<Option<Vec<_>>>()
    };

    let input_tables = read_tables(r, input_channels, in_entries)?;

    let clut_len = (grid_points as usize)
        .checked_pow(input_channels as u32)?
        .checked_mul(output_channels as usize)?;

    let clut = (0..clut_len)
        .map(|_| read_value(r))
        .collect::<Option<Vec<_>>>()?;

    let output_tables = read_tables(r, output_channels, out_entries)?;

    Some(Lut {
        input_channels,
        output_channels,
        grid_points,
        matrix,
        input_tables,
        clut,
        output_tables,
    })
}

fn read_named_colors(r: &mut Reader<'_>) -> Option<Vec<NamedColor>> {
    let _flags = r.read_u32()?;
    let count = r.read_u32()?;
    let device_coords = r.read_u32()? as usize;
    let _prefix = r.read_bytes(32)?;
    let _suffix = r.read_bytes(32)?;

    let mut colors = Vec::with_capacity(count.min(4096) as usize);

    for _ in 0..count {
        let name = ascii(r.read_bytes(32)?);
        let pcs = [r.read_u16()?, r.read_u16()?, r.read_u16()?];
        r.skip_bytes(device_coords * 2)?;

        colors.push(NamedColor { name, pcs });
    }

    Some(colors)
}

/// The D50 white point.
pub(crate) const D50: [f32; 3] = [0.9642, 1.0, 0.8249];

pub(crate) fn lab_to_xyz(l: f32, a: f32, b: f32, white: [f32; 3]) -> [f32; 3] {
    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;

    let g = |t: f32| {
        if t > 6.0 / 29.0 {
            t * t * t
        } else {
            108.0 / 841.0 * (t - 4.0 / 29.0)
        }
    };

    [white[0] * g(fx), white[1] * g(fy), white[2] * g(fz)]
}

/// Convert D50-relative XYZ to gamma-encoded sRGB, clamped to `[0, 1]`.
pub(crate) fn xyz_to_srgb(xyz: [f32; 3]) -> [f32; 3] {
    // Bradford-adapted XYZ (D50) to linear sRGB.
    const M: [f32; 9] = [
        3.133_856, -1.616_867, -0.490_615, -0.978_768, 1.916_142, 0.033_454, 0.071_945,
        -0.228_991, 1.405_243,
    ];

    let lin = [
        M[0] * xyz[0] + M[1] * xyz[1] + M[2] * xyz[2],
        M[3] * xyz[0] + M[4] * xyz[1] + M[5] * xyz[2],
        M[6] * xyz[0] + M[7] * xyz[1] + M[8] * xyz[2],
    ];

    lin.map(srgb_gamma)
}

pub(crate) fn srgb_gamma(v: f32) -> f32 {
    let v = v.clamp(0.0, 1.0);

    if v <= 0.003_130_8 {
        12.92 * v
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn fixed(v: f32) -> [u8; 4] {
        ((v * 65536.0).round() as i32).to_be_bytes()
    }

    /// Build a profile from a color space signature and a list of tags.
    pub(crate) fn build_profile(color_space: &[u8; 4], tags: &[(&[u8; 4], Vec<u8>)]) -> Vec<u8> {
        let mut header = vec![0u8; HEADER_SIZE];
        header[8] = 4;
        header[12..16].copy_from_slice(b"mntr");
        header[16..20].copy_from_slice(color_space);
        header[20..24].copy_from_slice(b"XYZ ");
        header[24..26].copy_from_slice(&2024u16.to_be_bytes());
        header[36..40].copy_from_slice(b"acsp");
        header[68..72].copy_from_slice(&fixed(D50[0]));
        header[72..76].copy_from_slice(&fixed(D50[1]));
        header[76..80].copy_from_slice(&fixed(D50[2]));

        let table_len = 4 + tags.len() * 12;
        let mut offset = HEADER_SIZE + table_len;
        let mut table = (tags.len() as u32).to_be_bytes().to_vec();
        let mut body = vec![];

        for (sig, data) in tags {
            table.extend_from_slice(*sig);
            table.extend_from_slice(&(offset as u32).to_be_bytes());
            table.extend_from_slice(&(data.len() as u32).to_be_bytes());
            body.extend_from_slice(data);
            offset += data.len();
        }

        let mut out = header;
        out.extend(table);
        out.extend(body);
        let len = out.len() as u32;
        out[0..4].copy_from_slice(&len.to_be_bytes());

        out
    }

    pub(crate) fn gamma_curve(gamma: f32) -> Vec<u8> {
        let mut out = b"curv\0\0\0\0".to_vec();
        out.extend_from_slice(&1u32.to_be_bytes());
        out.extend_from_slice(&((gamma * 256.0) as u16).to_be_bytes());
        out
    }

    fn xyz_tag(v: [f32; 3]) -> Vec<u8> {
        let mut out = b"XYZ \0\0\0\0".to_vec();
        v.iter().for_each(|v| out.extend_from_slice(&fixed(*v)));
        out
    }

    fn srgb_like() -> Vec<u8> {
        build_profile(
            b"RGB ",
            &[
                (b"rXYZ", xyz_tag([0.4361, 0.2225, 0.0139])),
                (b"gXYZ", xyz_tag([0.3851, 0.7169, 0.0971])),
                (b"bXYZ", xyz_tag([0.1431, 0.0606, 0.7141])),
                (b"rTRC", gamma_curve(2.2)),
                (b"gTRC", gamma_curve(2.2)),
                (b"bTRC", gamma_curve(2.2)),
                (b"desc", {
                    let mut d = b"desc\0\0\0\0".to_vec();
                    d.extend_from_slice(&5u32.to_be_bytes());
                    d.extend_from_slice(b"sRGB\0");
                    d
                }),
            ],
        )
    }

    #[test]
    fn header() {
        let profile = IccProfile::parse(&srgb_like()).unwrap();

        assert_eq!(profile.header().color_space, Signature::RGB);
        assert_eq!(profile.header().pcs, Signature::XYZ);
        assert_eq!(profile.header().version.0, 4);
        assert_eq!(profile.header().created.year, 2024);
        assert_eq!(profile.tag_entries().len(), 7);
        assert_eq!(profile.num_components(), Some(3));
    }

    #[test]
    fn missing_acsp() {
        let mut data = srgb_like();
        data[36] = b'x';

        assert!(IccProfile::parse(&data).is_none());
    }

    #[test]
    fn lazy_tags() {
        let profile = IccProfile::parse(&srgb_like()).unwrap();

        assert_eq!(profile.tag(b"rTRC"), Some(&Tag::Curve(Curve::Gamma(2.19921875))));
        assert_eq!(profile.tag(b"desc"), Some(&Tag::Text("sRGB".to_string())));
        assert!(profile.tag(b"wtpt").is_none());
    }

    #[test]
    fn matrix_profile() {
        let profile = IccProfile::parse(&srgb_like()).unwrap();
        assert!(profile.is_srgb());

        let white = profile.to_srgb(&[1.0, 1.0, 1.0]).unwrap();
        assert!(white.iter().all(|v| *v > 0.98), "{white:?}");

        let black = profile.to_srgb(&[0.0, 0.0, 0.0]).unwrap();
        assert!(black.iter().all(|v| *v < 0.01));

        let red = profile.to_srgb(&[1.0, 0.0, 0.0]).unwrap();
        assert!(red[0] > 0.9 && red[1] < 0.1 && red[2] < 0.1, "{red:?}");
    }

    #[test]
    fn gray_profile() {
        let data = build_profile(b"GRAY", &[(b"kTRC", gamma_curve(1.0))]);
        let profile = IccProfile::parse(&data).unwrap();

        let mid = profile.to_srgb(&[0.5]).unwrap();
        assert_eq!(mid[0], mid[1]);
        assert_eq!(mid[1], mid[2]);
        assert!(mid[0] > 0.5 && mid[0] < 0.8);
    }

    #[test]
    fn parametric_curve() {
        let curve = Curve::Parametric {
            kind: 3,
            params: SmallVec::from_slice(&[2.4, 1.0 / 1.055, 0.055 / 1.055, 1.0 / 12.92, 0.04045]),
        };

        assert_eq!(curve.eval(0.0), 0.0);
        assert!((curve.eval(1.0) - 1.0).abs() < 1e-4);
        assert!((curve.eval(0.5) - 0.214).abs() < 1e-3);
    }

    #[test]
    fn lut_interpolation() {
        let lut = Lut {
            input_channels: 1,
            output_channels: 1,
            grid_points: 2,
            matrix: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            input_tables: vec![vec![]],
            clut: vec![0.2, 0.6],
            output_tables: vec![vec![]],
        };

        assert!((lut.eval(&[0.5]).unwrap()[0] - 0.4).abs() < 1e-6);
    }
}
