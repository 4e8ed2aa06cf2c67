//! Fonts, as far as placing glyphs is concerned.
//!
//! The interpreter only needs to know how a string splits into character
//! codes and how far each code advances the text position. Glyph outlines
//! are optional and usually come from a [`FontResolverFn`], since font
//! programs are not parsed by this crate.

use crate::context::LoadContext;
use crate::interpret::InterpreterWarning;
use folio_syntax::object::keys::*;
use folio_syntax::object::{Dict, Name, Object};
use kurbo::BezPath;
use log::warn;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// A callback that provides fonts, for example with outlines from a font
/// program or metrics for the standard 14 fonts.
///
/// It is consulted before the built-in fonts, which only know the metrics
/// stored in the font dictionary. Returning `None` falls back to those.
pub type FontResolverFn = Arc<dyn Fn(&FontQuery<'_>) -> Option<Arc<dyn Font>> + Send + Sync>;

/// The font a [`FontResolverFn`] is asked for.
#[derive(Debug, Clone, Copy)]
pub struct FontQuery<'a> {
    /// The `/Subtype` of the font dictionary, like `Type1` or `Type0`.
    pub subtype: &'a str,
    /// The `/BaseFont`, if any.
    pub base_font: Option<&'a str>,
    /// The whole font dictionary.
    pub dict: &'a Dict,
}

/// A font.
pub trait Font: fmt::Debug + Send + Sync {
    /// The number of bytes per character code.
    fn code_len(&self) -> usize;

    /// The horizontal advance of a code, in thousandths of a text space unit.
    fn advance(&self, code: u32) -> f32;

    /// The outline of the glyph for a code, with one unit per em and the y
    /// axis pointing down.
    fn outline(&self, _code: u32) -> Option<BezPath> {
        None
    }

    /// The ascent, in thousandths of a text space unit.
    fn ascent(&self) -> f32;

    /// The descent, in thousandths of a text space unit. Usually negative.
    fn descent(&self) -> f32;

    /// The name of the typeface.
    fn name(&self) -> Option<&str>;

    /// Read the next code from `text`, returning it and the number of bytes
    /// consumed.
    ///
    /// A truncated code at the end of a string is padded with zeroes.
    fn next_code(&self, text: &[u8]) -> Option<(u32, usize)> {
        if text.is_empty() {
            return None;
        }

        let len = self.code_len().clamp(1, 4);
        let code = (0..len).fold(0u32, |acc, i| {
            (acc << 8) | text.get(i).copied().unwrap_or(0) as u32
        });

        Some((code, len.min(text.len())))
    }
}

/// A glyph to draw.
#[derive(Clone, Debug)]
pub struct Glyph {
    /// The font the glyph belongs to.
    pub font: Arc<dyn Font>,
    /// The character code that selected the glyph.
    pub code: u32,
}

impl Glyph {
    /// The outline of the glyph, if the font has one.
    pub fn outline(&self) -> Option<BezPath> {
        self.font.outline(self.code)
    }

    /// The advance of the glyph, in thousandths of a text space unit.
    pub fn advance(&self) -> f32 {
        self.font.advance(self.code)
    }
}

/// Load a font, memoized by its reference.
pub(crate) fn load_font(
    obj: &Object,
    ctx: &LoadContext<'_>,
    resolver: &FontResolverFn,
) -> Option<Arc<dyn Font>> {
    let load = || {
        let font = new_font(obj, ctx, resolver);

        if font.is_none() {
            ctx.warn(InterpreterWarning::UnsupportedFont);
        }

        font
    };

    match obj {
        Object::Ref(r) => ctx.cache.fonts.get_or_insert_with(*r, load),
        _ => load(),
    }
}

fn new_font(
    obj: &Object,
    ctx: &LoadContext<'_>,
    resolver: &FontResolverFn,
) -> Option<Arc<dyn Font>> {
    let dict = ctx.cast::<Dict>(obj)?;
    let subtype = ctx.get::<Name>(&dict, SUBTYPE)?;
    let base_font = ctx.get::<Name>(&dict, BASE_FONT);

    let query = FontQuery {
        subtype: subtype.as_str(),
        base_font: base_font.as_ref().map(|n| n.as_str()),
        dict: &dict,
    };

    if let Some(font) = resolver(&query) {
        return Some(font);
    }

    match subtype.as_bytes() {
        b"Type0" => Some(Arc::new(CompositeFont::new(&dict, ctx)?)),
        b"Type1" | b"MMType1" | b"TrueType" | b"Type3" => Some(Arc::new(SimpleFont::new(&dict, ctx))),
        other => {
            warn!("unsupported font type {}", String::from_utf8_lossy(other));

            None
        }
    }
}

/// The metrics of a font descriptor.
#[derive(Debug, Clone, Copy, Default)]
struct Descriptor {
    ascent: f32,
    descent: f32,
    missing_width: f32,
}

impl Descriptor {
    fn new(font: &Dict, ctx: &LoadContext<'_>) -> Self {
        let Some(dict) = ctx.get::<Dict>(font, FONT_DESCRIPTOR) else {
            return Self::default();
        };

        Self {
            ascent: ctx.get::<f32>(&dict, ASCENT).unwrap_or(0.0),
            descent: ctx.get::<f32>(&dict, DESCENT).unwrap_or(0.0),
            missing_width: ctx.get::<f32>(&dict, MISSING_WIDTH).unwrap_or(0.0),
        }
    }
}

/// A font with single-byte codes: Type 1, TrueType and Type 3 fonts.
///
/// Widths come from `/Widths`, indexed from `/FirstChar`, with
/// `/MissingWidth` for codes outside of the table. The widths of Type 3
/// fonts are given in glyph space and scaled by their `/FontMatrix`.
#[derive(Debug, Clone)]
pub struct SimpleFont {
    name: Option<String>,
    first_char: u32,
    widths: Vec<f32>,
    descriptor: Descriptor,
}

impl SimpleFont {
    /// Read a simple font from its dictionary.
    pub fn new(dict: &Dict, ctx: &LoadContext<'_>) -> Self {
        let descriptor = Descriptor::new(dict, ctx);

        // Type 3 glyph space is usually 1000 units per em, but not always.
        let scale = ctx
            .get::<[f32; 6]>(dict, FONT_MATRIX)
            .map(|m| m[0] * 1000.0)
            .unwrap_or(1.0);

        let widths = ctx
            .get::<Vec<f32>>(dict, WIDTHS)
            .unwrap_or_default()
            .into_iter()
            .map(|w| w * scale)
            .collect();

        Self {
            name: ctx.get::<Name>(dict, BASE_FONT).map(|n| n.as_str().to_owned()),
            first_char: ctx.get::<u32>(dict, FIRST_CHAR).unwrap_or(0),
            widths,
            descriptor: Descriptor {
                missing_width: descriptor.missing_width * scale,
                ..descriptor
            },
        }
    }
}

impl Font for SimpleFont {
    fn code_len(&self) -> usize {
        1
    }

    fn advance(&self, code: u32) -> f32 {
        code.checked_sub(self.first_char)
            .and_then(|idx| self.widths.get(idx as usize))
            .copied()
            .unwrap_or(self.descriptor.missing_width)
    }

    fn ascent(&self) -> f32 {
        self.descriptor.ascent
    }

    fn descent(&self) -> f32 {
        self.descriptor.descent
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// A Type 0 font with two-byte codes.
///
/// Codes are used as CIDs directly, as with the `Identity-H` encoding.
/// Widths come from the `/W` array of the descendant font, with `/DW`
/// for everything else.
#[derive(Debug, Clone)]
pub struct CompositeFont {
    name: Option<String>,
    default_width: f32,
    widths: FxHashMap<u32, f32>,
    ranges: Vec<(u32, u32, f32)>,
    descriptor: Descriptor,
}

impl CompositeFont {
    /// Read a composite font from its dictionary.
    pub fn new(dict: &Dict, ctx: &LoadContext<'_>) -> Option<Self> {
        let descendant = ctx
            .get::<Vec<Object>>(dict, DESCENDANT_FONTS)
            .and_then(|d| ctx.cast::<Dict>(d.first()?))?;

        if let Some(encoding) = ctx.get::<Name>(dict, ENCODING)
            && !matches!(encoding.as_bytes(), b"Identity-H" | b"Identity-V")
        {
            warn!(
                "CMap {} is not supported, treating codes as CIDs",
                encoding.as_str()
            );
            ctx.warn(InterpreterWarning::UnsupportedFont);
        }

        let mut widths = FxHashMap::default();
        let mut ranges = vec![];
        let w = ctx.get::<Vec<Object>>(&descendant, W).unwrap_or_default();
        let mut iter = w.iter().map(|o| ctx.deref(o));

        while let Some(Some(first)) = iter.next() {
            let Some(first) = first.cast::<u32>() else {
                break;
            };

            match iter.next().flatten() {
                Some(Object::Array(list)) => {
                    for (i, w) in list.iter().enumerate() {
                        let Some(cid) = u32::try_from(i).ok().and_then(|i| first.checked_add(i))
                        else {
                            break;
                        };

                        if let Some(w) = ctx.cast::<f32>(w) {
                            widths.insert(cid, w);
                        }
                    }
                }
                Some(last) => {
                    let (Some(last), Some(Some(w))) =
                        (last.cast::<u32>(), iter.next().map(|o| o?.cast::<f32>()))
                    else {
                        break;
                    };

                    ranges.push((first, last, w));
                }
                None => break,
            }
        }

        Some(Self {
            name: ctx.get::<Name>(dict, BASE_FONT).map(|n| n.as_str().to_owned()),
            default_width: ctx.get::<f32>(&descendant, DW).unwrap_or(1000.0),
            widths,
            ranges,
            descriptor: Descriptor::new(&descendant, ctx),
        })
    }
}

impl Font for CompositeFont {
    fn code_len(&self) -> usize {
        2
    }

    fn advance(&self, code: u32) -> f32 {
        if let Some(w) = self.widths.get(&code) {
            return *w;
        }

        self.ranges
            .iter()
            .find(|(first, last, _)| (*first..=*last).contains(&code))
            .map(|(.., w)| *w)
            .unwrap_or(self.default_width)
    }

    fn ascent(&self) -> f32 {
        self.descriptor.ascent
    }

    fn descent(&self) -> f32 {
        self.descriptor.descent
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}
