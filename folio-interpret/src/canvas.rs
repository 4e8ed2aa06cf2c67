//! The painter interface that receives drawing calls.

use crate::color::AlphaColor;
use crate::font::Glyph;
use crate::image::Bitmap;
use crate::shading::Shading;
use kurbo::{Affine, BezPath, Cap, Join, PathEl, Point};
use smallvec::SmallVec;
use std::sync::Arc;

/// A fill rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillRule {
    /// Non-zero winding.
    #[default]
    NonZero,
    /// Even-odd.
    EvenOdd,
}

/// Stroke properties.
#[derive(Clone, Debug, PartialEq)]
pub struct StrokeProps {
    /// The line width.
    pub line_width: f32,
    /// The line cap.
    pub line_cap: Cap,
    /// The line join.
    pub line_join: Join,
    /// The miter limit.
    pub miter_limit: f32,
    /// The dash array.
    pub dash_array: SmallVec<[f32; 4]>,
    /// The dash offset.
    pub dash_offset: f32,
}

impl Default for StrokeProps {
    fn default() -> Self {
        Self {
            line_width: 1.0,
            line_cap: Cap::Butt,
            line_join: Join::Miter,
            miter_limit: 10.0,
            dash_array: SmallVec::new(),
            dash_offset: 0.0,
        }
    }
}

impl StrokeProps {
    pub(crate) fn to_kurbo(&self) -> kurbo::Stroke {
        kurbo::Stroke::new(self.line_width as f64)
            .with_caps(self.line_cap)
            .with_join(self.line_join)
            .with_miter_limit(self.miter_limit as f64)
            .with_dashes(
                self.dash_offset as f64,
                self.dash_array.iter().map(|d| *d as f64),
            )
    }
}

/// A shading used as paint.
#[derive(Clone, Debug)]
pub struct ShadingPaint {
    /// The shading.
    pub shading: Arc<Shading>,
    /// Maps the coordinate space of the shading to device space.
    ///
    /// This is independent of the matrix set through
    /// [`Canvas::set_matrix`], since a shading stays fixed on the page
    /// regardless of the shape that is painted with it.
    pub transform: Affine,
}

/// The paint of a path, glyph or stencil.
#[derive(Clone, Debug)]
pub enum Paint {
    /// A solid color.
    Color(AlphaColor),
    /// A shading.
    Shading(ShadingPaint),
}

impl Paint {
    pub(crate) fn transformed(&self, base: Affine) -> Self {
        match self {
            Self::Color(c) => Self::Color(*c),
            Self::Shading(s) => Self::Shading(ShadingPaint {
                shading: s.shading.clone(),
                transform: base * s.transform,
            }),
        }
    }
}

/// How to draw the current path.
#[derive(Clone, Debug, PartialEq)]
pub enum PathDrawMode {
    /// Fill the path.
    Fill(FillRule),
    /// Stroke the path.
    Stroke(StrokeProps),
}

/// How to draw a glyph.
#[derive(Clone, Debug, PartialEq)]
pub enum GlyphDrawMode {
    /// Fill the glyph outline.
    Fill,
    /// Stroke the glyph outline.
    Stroke(StrokeProps),
    /// Do not paint anything. The glyph is still reported, for example to
    /// allow extracting text from scanned documents.
    Invisible,
}

/// A painter that receives the drawing calls produced by the interpreter.
///
/// Paths are built incrementally with [`Canvas::move_to`] and friends and
/// then consumed by [`Canvas::draw_path`] or [`Canvas::clip_path`]. All
/// coordinates are interpreted in the space defined by the last call to
/// [`Canvas::set_matrix`], which maps that space to device space.
pub trait Canvas {
    /// Set the matrix for subsequent paths, glyphs and bitmaps.
    fn set_matrix(&mut self, matrix: Affine);
    /// Save the current clip and matrix.
    fn save(&mut self);
    /// Restore the state saved by the matching [`Canvas::save`].
    fn restore(&mut self);
    /// Start a new subpath.
    fn move_to(&mut self, p: Point);
    /// Add a line to the current subpath.
    fn line_to(&mut self, p: Point);
    /// Add a cubic curve to the current subpath.
    fn cubic_to(&mut self, p1: Point, p2: Point, p3: Point);
    /// Close the current subpath.
    fn close(&mut self);
    /// Paint the current path and start a new one.
    fn draw_path(&mut self, paint: &Paint, mode: &PathDrawMode);
    /// Intersect the clip with the current path and start a new one.
    fn clip_path(&mut self, rule: FillRule);
    /// Draw a glyph.
    ///
    /// The matrix maps a glyph space with one unit per em and the y axis
    /// pointing down to device space, with the origin on the baseline.
    fn draw_glyph(&mut self, glyph: &Glyph, paint: &Paint, mode: &GlyphDrawMode);
    /// Draw a bitmap.
    ///
    /// The matrix maps the pixel grid of the bitmap (one unit per pixel,
    /// first row at the top) to device space.
    fn draw_bitmap(&mut self, bitmap: &Bitmap);
}

/// Feed a whole path into `canvas`.
pub(crate) fn emit_path(canvas: &mut dyn Canvas, path: &BezPath) {
    let mut last = Point::ZERO;

    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => {
                canvas.move_to(p);
                last = p;
            }
            PathEl::LineTo(p) => {
                canvas.line_to(p);
                last = p;
            }
            PathEl::QuadTo(p1, p2) => {
                // Degree elevation.
                let c1 = last + (p1 - last) * (2.0 / 3.0);
                let c2 = p2 + (p1 - p2) * (2.0 / 3.0);
                canvas.cubic_to(c1, c2, p2);
                last = p2;
            }
            PathEl::CurveTo(p1, p2, p3) => {
                canvas.cubic_to(p1, p2, p3);
                last = p3;
            }
            PathEl::ClosePath => canvas.close(),
        }
    }
}
