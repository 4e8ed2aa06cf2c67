//! Dictionary objects.

use crate::object::{FromObject, Name, Object};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// A PDF dictionary. Cloning is cheap.
#[derive(Clone, Default, PartialEq)]
pub struct Dict(Arc<FxHashMap<Name, Object>>);

impl Dict {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dictionary from key/value pairs.
    pub fn from_entries(entries: impl IntoIterator<Item = (Name, Object)>) -> Self {
        Self(Arc::new(entries.into_iter().collect()))
    }

    /// Insert an entry, copying the map if it is shared.
    pub fn insert(&mut self, key: Name, value: Object) {
        Arc::make_mut(&mut self.0).insert(key, value);
    }

    /// Look up a raw entry without resolving references.
    pub fn get_raw(&self, key: &[u8]) -> Option<&Object> {
        self.0.get(key)
    }

    /// Look up an entry and convert it to `T`.
    pub fn get<T: FromObject>(&self, key: &[u8]) -> Option<T> {
        self.get_raw(key).and_then(T::from_object)
    }

    /// Look up the first of several alternative keys, e.g. full and abbreviated forms.
    pub fn get_either<T: FromObject>(&self, first: &[u8], second: &[u8]) -> Option<T> {
        self.get(first).or_else(|| self.get(second))
    }

    /// Whether the key is present.
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.0.contains_key(key)
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the dictionary has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over all entries in unspecified order.
    pub fn entries(&self) -> impl Iterator<Item = (&Name, &Object)> {
        self.0.iter()
    }
}

impl fmt::Debug for Dict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries = self.0.iter().collect::<Vec<_>>();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        f.debug_map().entries(entries).finish()
    }
}

/// Dictionary keys.
pub mod keys {
    macro_rules! key {
        ($i:ident, $e:expr) => {
            #[allow(missing_docs)]
            pub const $i: &[u8] = $e;
        };
    }

    key!(ALTERNATE, b"Alternate");
    key!(ANTI_ALIAS, b"AntiAlias");
    key!(ASCENT, b"Ascent");
    key!(BACKGROUND, b"Background");
    key!(BASE_FONT, b"BaseFont");
    key!(BBOX, b"BBox");
    key!(BITS_PER_COMPONENT, b"BitsPerComponent");
    key!(BITS_PER_COORDINATE, b"BitsPerCoordinate");
    key!(BITS_PER_FLAG, b"BitsPerFlag");
    key!(BITS_PER_SAMPLE, b"BitsPerSample");
    key!(BLACK_IS_1, b"BlackIs1");
    key!(BLACK_POINT, b"BlackPoint");
    key!(BOUNDS, b"Bounds");
    key!(C0, b"C0");
    key!(C1, b"C1");
    key!(CA, b"CA");
    key!(CA_NS, b"ca");
    key!(COLORS, b"Colors");
    key!(COLOR_SPACE, b"ColorSpace");
    key!(COLOR_TRANSFORM, b"ColorTransform");
    key!(COLUMNS, b"Columns");
    key!(COORDS, b"Coords");
    key!(D, b"D");
    key!(DECODE, b"Decode");
    key!(DECODE_PARMS, b"DecodeParms");
    key!(DESCENDANT_FONTS, b"DescendantFonts");
    key!(DESCENT, b"Descent");
    key!(DOMAIN, b"Domain");
    key!(DP, b"DP");
    key!(DW, b"DW");
    key!(EARLY_CHANGE, b"EarlyChange");
    key!(ENCODE, b"Encode");
    key!(ENCODING, b"Encoding");
    key!(EXTEND, b"Extend");
    key!(EXT_G_STATE, b"ExtGState");
    key!(F, b"F");
    key!(FILTER, b"Filter");
    key!(FIRST_CHAR, b"FirstChar");
    key!(FL, b"FL");
    key!(FONT, b"Font");
    key!(FONT_DESCRIPTOR, b"FontDescriptor");
    key!(FONT_MATRIX, b"FontMatrix");
    key!(FONT_NAME, b"FontName");
    key!(FORM_TYPE, b"FormType");
    key!(FUNCTION, b"Function");
    key!(FUNCTIONS, b"Functions");
    key!(FUNCTION_TYPE, b"FunctionType");
    key!(GAMMA, b"Gamma");
    key!(GROUP, b"Group");
    key!(HEIGHT, b"Height");
    key!(IMAGE_MASK, b"ImageMask");
    key!(INTERPOLATE, b"Interpolate");
    key!(LAST_CHAR, b"LastChar");
    key!(LC, b"LC");
    key!(LENGTH, b"Length");
    key!(LJ, b"LJ");
    key!(LW, b"LW");
    key!(MASK, b"Mask");
    key!(MATRIX, b"Matrix");
    key!(MATTE, b"Matte");
    key!(MISSING_WIDTH, b"MissingWidth");
    key!(ML, b"ML");
    key!(N, b"N");
    key!(NAME, b"Name");
    key!(PAINT_TYPE, b"PaintType");
    key!(PATTERN, b"Pattern");
    key!(PATTERN_TYPE, b"PatternType");
    key!(PREDICTOR, b"Predictor");
    key!(RANGE, b"Range");
    key!(RESOURCES, b"Resources");
    key!(RI, b"RI");
    key!(SHADING, b"Shading");
    key!(SHADING_TYPE, b"ShadingType");
    key!(SIZE, b"Size");
    key!(SMASK, b"SMask");
    key!(SUBTYPE, b"Subtype");
    key!(TILING_TYPE, b"TilingType");
    key!(TO_UNICODE, b"ToUnicode");
    key!(TYPE, b"Type");
    key!(VERTICES_PER_ROW, b"VerticesPerRow");
    key!(W, b"W");
    key!(WHITE_POINT, b"WhitePoint");
    key!(WIDTH, b"Width");
    key!(WIDTHS, b"Widths");
    key!(X_OBJECT, b"XObject");
    key!(X_STEP, b"XStep");
    key!(Y_STEP, b"YStep");
}
