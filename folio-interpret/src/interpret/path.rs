use super::Interpreter;
use crate::canvas::{FillRule, Paint, PathDrawMode, ShadingPaint, emit_path};
use crate::pattern::{PaintType, Pattern, TilingPattern};
use kurbo::{Affine, BezPath, Point, Shape, StrokeOpts};
use log::debug;
use std::sync::Arc;

/// Tolerance for flattening strokes into fillable outlines, in user space.
const STROKE_TOLERANCE: f64 = 0.1;

/// The path under construction.
#[derive(Debug, Default)]
pub(crate) struct PathBuilder {
    path: BezPath,
    current: Option<Point>,
    start: Point,
}

impl PathBuilder {
    pub(crate) fn move_to(&mut self, p: Point) {
        self.path.move_to(p);
        self.current = Some(p);
        self.start = p;
    }

    pub(crate) fn line_to(&mut self, p: Point) {
        if self.current.is_none() {
            debug!("line without a current point");
            self.move_to(p);

            return;
        }

        self.path.line_to(p);
        self.current = Some(p);
    }

    pub(crate) fn curve_to(&mut self, p1: Point, p2: Point, p3: Point) {
        if self.current.is_none() {
            debug!("curve without a current point");
            self.move_to(p3);

            return;
        }

        self.path.curve_to(p1, p2, p3);
        self.current = Some(p3);
    }

    /// `v`: the first control point is the current point.
    pub(crate) fn curve_to_v(&mut self, p2: Point, p3: Point) {
        let p1 = self.current.unwrap_or(p2);
        self.curve_to(p1, p2, p3);
    }

    /// `y`: the second control point is the end point.
    pub(crate) fn curve_to_y(&mut self, p1: Point, p3: Point) {
        self.curve_to(p1, p3, p3);
    }

    pub(crate) fn close(&mut self) {
        if self.current.is_some() {
            self.path.close_path();
            self.current = Some(self.start);
        }
    }

    pub(crate) fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.move_to(Point::new(x, y));
        self.line_to(Point::new(x + w, y));
        self.line_to(Point::new(x + w, y + h));
        self.line_to(Point::new(x, y + h));
        self.close();
    }

    /// Hand out the path, leaving an empty one without a current point.
    pub(crate) fn take(&mut self) -> BezPath {
        self.current = None;

        std::mem::take(&mut self.path)
    }
}

/// A paint, or a tiling pattern that has to be expanded cell by cell.
pub(super) enum ResolvedPaint {
    Paint(Paint),
    Tiling(Arc<TilingPattern>),
}

impl Interpreter<'_> {
    /// Paint the current path, then apply a pending clip, and start a new
    /// path.
    pub(super) fn draw(&mut self, fill: Option<FillRule>, stroke: bool) {
        let path = self.path.take();
        let clip = self.pending_clip.take();
        let ctm = self.state().ctm;

        if !path.elements().is_empty() {
            if let Some(rule) = fill {
                self.paint_path(&path, PathDrawMode::Fill(rule), false);
            }

            if stroke {
                let props = self.state().stroke_props.clone();
                self.paint_path(&path, PathDrawMode::Stroke(props), true);
            }
        }

        if let Some(rule) = clip {
            self.apply_clip(ctm * path, rule);
        }
    }

    fn paint_path(&mut self, path: &BezPath, mode: PathDrawMode, stroke: bool) {
        let ctm = self.state().ctm;

        match self.resolve_paint(stroke) {
            Some(ResolvedPaint::Paint(paint)) => {
                self.canvas.set_matrix(ctm);
                emit_path(self.canvas, path);
                self.canvas.draw_path(&paint, &mode);
            }
            Some(ResolvedPaint::Tiling(pattern)) => {
                let (area, rule) = match &mode {
                    PathDrawMode::Fill(rule) => (path.clone(), *rule),
                    PathDrawMode::Stroke(props) => (
                        kurbo::stroke(
                            path.path_elements(STROKE_TOLERANCE),
                            &props.to_kurbo(),
                            &StrokeOpts::default(),
                            STROKE_TOLERANCE,
                        ),
                        FillRule::NonZero,
                    ),
                };

                self.tile(&(ctm * area), rule, &pattern);
            }
            None => debug!("pattern paint without a pattern"),
        }
    }

    /// The fill or stroke paint of the current state.
    pub(super) fn resolve_paint(&self, stroke: bool) -> Option<ResolvedPaint> {
        let state = self.state();
        let paint = if stroke { &state.stroke } else { &state.fill };

        if !paint.color_space.is_pattern() {
            return Some(ResolvedPaint::Paint(Paint::Color(paint.color())));
        }

        match paint.pattern.as_ref()? {
            Pattern::Shading(pattern) => Some(ResolvedPaint::Paint(Paint::Shading(ShadingPaint {
                shading: pattern.shading.clone(),
                transform: self.pattern_base * pattern.matrix,
            }))),
            Pattern::Tiling(pattern) => match pattern.paint_type {
                PaintType::Colored => Some(ResolvedPaint::Tiling(pattern.clone())),
                PaintType::Uncolored => {
                    let colorized = pattern.colorize(paint.pattern_color()?)?;

                    Some(ResolvedPaint::Tiling(Arc::new(colorized)))
                }
            },
        }
    }

    /// Fill `area`, given in device space, with a tiling pattern by
    /// replaying its cell at every step that is visible.
    pub(super) fn tile(&mut self, area: &BezPath, rule: FillRule, pattern: &TilingPattern) {
        let to_device = self.pattern_base * pattern.matrix;

        if to_device.determinant().abs() < 1e-12 {
            debug!("tiling pattern with a degenerate matrix");

            return;
        }

        let visible = area.bounding_box().intersect(self.bbox);

        if visible.area() <= 0.0 {
            return;
        }

        let cells = pattern.cell_transforms(to_device.inverse().transform_rect_bbox(visible));

        self.canvas.save();
        self.canvas.set_matrix(Affine::IDENTITY);
        emit_path(self.canvas, area);
        self.canvas.clip_path(rule);

        // Every cell clips to its own bbox, so each replay is scoped.
        for cell in cells {
            self.canvas.save();
            pattern
                .picture
                .replay(self.canvas, to_device * cell, pattern.color);
            self.canvas.restore();
        }

        self.canvas.restore();
    }

    /// Intersect the clip with a path given in device space.
    pub(super) fn apply_clip(&mut self, path: BezPath, rule: FillRule) {
        self.canvas.set_matrix(Affine::IDENTITY);
        emit_path(self.canvas, &path);
        self.canvas.clip_path(rule);

        self.states.current_mut().clip.push(path, rule);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::PathEl;

    #[test]
    fn rect_is_closed() {
        let mut builder = PathBuilder::default();
        builder.rect(1.0, 2.0, 3.0, 4.0);
        let path = builder.take();

        assert_eq!(path.elements().len(), 5);
        assert_eq!(path.elements()[2], PathEl::LineTo(Point::new(4.0, 6.0)));
        assert_eq!(path.elements()[4], PathEl::ClosePath);
    }

    #[test]
    fn shorthand_curves() {
        let mut builder = PathBuilder::default();
        builder.move_to(Point::new(0.0, 0.0));
        builder.curve_to_v(Point::new(1.0, 1.0), Point::new(2.0, 0.0));
        builder.curve_to_y(Point::new(3.0, 1.0), Point::new(4.0, 0.0));

        let path = builder.take();
        assert_eq!(
            path.elements()[1],
            PathEl::CurveTo(Point::new(0.0, 0.0), Point::new(1.0, 1.0), Point::new(2.0, 0.0))
        );
        assert_eq!(
            path.elements()[2],
            PathEl::CurveTo(Point::new(3.0, 1.0), Point::new(4.0, 0.0), Point::new(4.0, 0.0))
        );
    }

    #[test]
    fn line_without_current_point() {
        let mut builder = PathBuilder::default();
        builder.line_to(Point::new(1.0, 1.0));

        assert_eq!(builder.take().elements(), [PathEl::MoveTo(Point::new(1.0, 1.0))]);
    }
}
