//! Tiling and shading patterns.

use crate::color::AlphaColor;
use crate::context::LoadContext;
use crate::picture::Picture;
use crate::shading::{Shading, ShadingQuality};
use folio_syntax::object::keys::*;
use folio_syntax::object::{Dict, Object};
use kurbo::{Affine, Rect};
use log::warn;
use std::sync::Arc;

/// Tiling patterns covering more cells than this are truncated.
const MAX_CELLS: usize = 1 << 16;

/// A pattern, as selected with the `scn`/`SCN` operators.
#[derive(Clone, Debug)]
pub enum Pattern {
    /// A tiling pattern.
    Tiling(Arc<TilingPattern>),
    /// A shading pattern.
    Shading(ShadingPattern),
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Tiling(a), Self::Tiling(b)) => Arc::ptr_eq(a, b),
            (Self::Shading(a), Self::Shading(b)) => {
                Arc::ptr_eq(&a.shading, &b.shading) && a.matrix == b.matrix
            }
            _ => false,
        }
    }
}

/// A shading pattern.
#[derive(Clone, Debug)]
pub struct ShadingPattern {
    /// The shading.
    pub shading: Arc<Shading>,
    /// Maps the shading space to the default space of the page or form the
    /// pattern is used in.
    pub matrix: Affine,
}

impl ShadingPattern {
    /// Load a shading pattern from its dictionary.
    pub fn new(dict: &Dict, ctx: &LoadContext<'_>, quality: &ShadingQuality) -> Option<Self> {
        let shading = Shading::load(dict.get_raw(SHADING)?, ctx, quality)?;

        if dict.contains_key(EXT_G_STATE) {
            warn!("graphics states of shading patterns are ignored");
        }

        Some(Self {
            shading,
            matrix: pattern_matrix(dict, ctx),
        })
    }
}

/// Whether the cell of a tiling pattern carries its own colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintType {
    /// The cell specifies its colors.
    Colored,
    /// The cell is a stencil, colored when the pattern is selected.
    Uncolored,
}

/// A tiling pattern.
///
/// The cell is recorded once into a [`Picture`], which is then replayed at
/// every step of the lattice spanned by `x_step` and `y_step`. Steps are
/// independent of the cell size, so cells may overlap or leave gaps.
#[derive(Clone, Debug)]
pub struct TilingPattern {
    /// The cell bounds, in pattern space.
    pub bbox: Rect,
    /// The horizontal distance between cells.
    pub x_step: f64,
    /// The vertical distance between cells.
    pub y_step: f64,
    /// Maps the pattern space to the default space of the page or form the
    /// pattern is used in.
    pub matrix: Affine,
    /// Whether the cell is colored.
    pub paint_type: PaintType,
    /// The tiling type, between 1 and 3. All are rendered the same way.
    pub tiling_type: u8,
    /// The recorded cell.
    pub picture: Picture,
    /// The color of a colorized, uncolored pattern.
    pub color: Option<AlphaColor>,
}

impl TilingPattern {
    /// Read the parameters of a tiling pattern, given its already recorded
    /// cell.
    pub fn new(dict: &Dict, ctx: &LoadContext<'_>, picture: Picture) -> Option<Self> {
        let bbox = ctx
            .get::<[f64; 4]>(dict, BBOX)
            .map(|b| Rect::new(b[0], b[1], b[2], b[3]).abs())?;
        let x_step = ctx.get::<f64>(dict, X_STEP)?;
        let y_step = ctx.get::<f64>(dict, Y_STEP)?;

        if x_step == 0.0 || y_step == 0.0 || !x_step.is_finite() || !y_step.is_finite() {
            warn!("tiling pattern with step ({x_step}, {y_step})");

            return None;
        }

        let paint_type = match ctx.get::<i64>(dict, PAINT_TYPE)? {
            1 => PaintType::Colored,
            2 => PaintType::Uncolored,
            other => {
                warn!("unknown paint type {other}");

                return None;
            }
        };

        let tiling_type = ctx.get::<u8>(dict, TILING_TYPE).unwrap_or(1);

        if !(1..=3).contains(&tiling_type) {
            warn!("unknown tiling type {tiling_type}, assuming 1");
        }

        Some(Self {
            bbox,
            x_step,
            y_step,
            matrix: pattern_matrix(dict, ctx),
            paint_type,
            tiling_type: tiling_type.clamp(1, 3),
            picture,
            color: None,
        })
    }

    /// Bind an uncolored pattern to a color.
    ///
    /// Returns `None` for colored patterns, which keep their own colors.
    pub fn colorize(&self, color: AlphaColor) -> Option<Self> {
        if self.paint_type == PaintType::Colored {
            warn!("tried to colorize a colored tiling pattern");

            return None;
        }

        Some(Self {
            color: Some(color),
            ..self.clone()
        })
    }

    /// The translations, in pattern space, of all cells that intersect
    /// `area`, which is given in pattern space as well.
    ///
    /// Cells that merely touch the area are skipped.
    pub fn cell_transforms(&self, area: Rect) -> Vec<Affine> {
        let (xs, ys) = (self.x_step.abs(), self.y_step.abs());
        let range = |lo: f64, hi: f64, cell_lo: f64, cell_hi: f64, step: f64| {
            let first = ((lo - cell_hi) / step).floor() + 1.0;
            let last = ((hi - cell_lo) / step).ceil() - 1.0;

            (first as i64, last as i64)
        };

        let (x0, x1) = range(area.x0, area.x1, self.bbox.x0, self.bbox.x1, xs);
        let (y0, y1) = range(area.y0, area.y1, self.bbox.y0, self.bbox.y1, ys);

        if x1 < x0 || y1 < y0 {
            return vec![];
        }

        let cells = (x1 - x0 + 1).saturating_mul(y1 - y0 + 1);

        if cells as u64 > MAX_CELLS as u64 {
            warn!("tiling pattern needs {cells} cells, truncating");
        }

        let mut out = Vec::new();

        'outer: for y in y0..=y1 {
            for x in x0..=x1 {
                if out.len() >= MAX_CELLS {
                    break 'outer;
                }

                out.push(Affine::translate((x as f64 * xs, y as f64 * ys)));
            }
        }

        out
    }
}

/// The type of a pattern, without loading it.
pub(crate) fn pattern_type(obj: &Object, ctx: &LoadContext<'_>) -> Option<i64> {
    ctx.get::<i64>(ctx.deref(obj)?.as_dict()?, PATTERN_TYPE)
}

fn pattern_matrix(dict: &Dict, ctx: &LoadContext<'_>) -> Affine {
    ctx.get::<[f64; 6]>(dict, MATRIX)
        .map(Affine::new)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DocumentCache;
    use crate::interpret::WarningSinkFn;
    use crate::picture::RecordingCanvas;
    use folio_syntax::object::ObjectStore;

    fn tiling(src: &[u8]) -> Option<TilingPattern> {
        let store = ObjectStore::new();
        let cache = DocumentCache::new();
        let sink: WarningSinkFn = Arc::new(|_| {});
        let ctx = LoadContext::new(&store, &cache, &sink);
        let obj = Object::from_bytes(src)?;

        TilingPattern::new(obj.as_dict()?, &ctx, RecordingCanvas::new().finish())
    }

    const CELL: &[u8] =
        b"<< /PatternType 1 /PaintType 1 /TilingType 1 /BBox [0 0 10 10] /XStep 10 /YStep 10 >>";

    #[test]
    fn three_by_three() {
        let pattern = tiling(CELL).unwrap();
        let cells = pattern.cell_transforms(Rect::new(0.0, 0.0, 30.0, 30.0));

        assert_eq!(cells.len(), 9);

        for (i, cell) in cells.iter().enumerate() {
            let [a, b, c, d, e, f] = cell.as_coeffs();
            assert_eq!([a, b, c, d], [1.0, 0.0, 0.0, 1.0]);
            assert_eq!((e, f), ((i % 3) as f64 * 10.0, (i / 3) as f64 * 10.0));
        }
    }

    #[test]
    fn partial_cells_are_included() {
        let pattern = tiling(CELL).unwrap();

        assert_eq!(pattern.cell_transforms(Rect::new(5.0, 5.0, 25.0, 15.0)).len(), 6);
        assert!(pattern.cell_transforms(Rect::ZERO).is_empty());
    }

    #[test]
    fn steps_larger_than_the_cell() {
        let pattern = tiling(
            b"<< /PaintType 2 /BBox [0 0 10 10] /XStep 20 /YStep 20 /Matrix [2 0 0 2 0 0] >>",
        )
        .unwrap();

        assert_eq!(pattern.matrix, Affine::scale(2.0));
        assert_eq!(pattern.cell_transforms(Rect::new(0.0, 0.0, 40.0, 40.0)).len(), 4);
    }

    #[test]
    fn colorize() {
        let colored = tiling(CELL).unwrap();
        assert!(colored.colorize(AlphaColor::BLACK).is_none());

        let uncolored =
            tiling(b"<< /PaintType 2 /BBox [0 0 10 10] /XStep 10 /YStep 10 >>").unwrap();
        let red = AlphaColor::from_rgb8(255, 0, 0);
        assert_eq!(uncolored.colorize(red).unwrap().color, Some(red));
    }

    #[test]
    fn zero_step() {
        assert!(tiling(b"<< /PaintType 1 /BBox [0 0 10 10] /XStep 0 /YStep 10 >>").is_none());
    }
}
