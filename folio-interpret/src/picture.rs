//! Recording drawing calls for later replay.

use crate::canvas::{Canvas, FillRule, GlyphDrawMode, Paint, PathDrawMode};
use crate::color::AlphaColor;
use crate::font::Glyph;
use crate::image::Bitmap;
use kurbo::{Affine, Point};
use std::sync::Arc;

/// A single recorded call on a [`Canvas`].
#[derive(Clone, Debug)]
pub enum DrawCommand {
    /// [`Canvas::set_matrix`].
    SetMatrix(Affine),
    /// [`Canvas::save`].
    Save,
    /// [`Canvas::restore`].
    Restore,
    /// [`Canvas::move_to`].
    MoveTo(Point),
    /// [`Canvas::line_to`].
    LineTo(Point),
    /// [`Canvas::cubic_to`].
    CubicTo(Point, Point, Point),
    /// [`Canvas::close`].
    Close,
    /// [`Canvas::draw_path`].
    DrawPath(Paint, PathDrawMode),
    /// [`Canvas::clip_path`].
    ClipPath(FillRule),
    /// [`Canvas::draw_glyph`].
    DrawGlyph(Glyph, Paint, GlyphDrawMode),
    /// [`Canvas::draw_bitmap`].
    DrawBitmap(Bitmap),
}

/// A canvas that records all calls.
#[derive(Clone, Debug, Default)]
pub struct RecordingCanvas {
    commands: Vec<DrawCommand>,
}

impl RecordingCanvas {
    /// Create a new, empty recording canvas.
    pub fn new() -> Self {
        Self::default()
    }

    /// The commands recorded so far.
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Turn the recording into a replayable picture.
    pub fn finish(self) -> Picture {
        Picture {
            commands: self.commands.into(),
        }
    }
}

impl Canvas for RecordingCanvas {
    fn set_matrix(&mut self, matrix: Affine) {
        self.commands.push(DrawCommand::SetMatrix(matrix));
    }

    fn save(&mut self) {
        self.commands.push(DrawCommand::Save);
    }

    fn restore(&mut self) {
        self.commands.push(DrawCommand::Restore);
    }

    fn move_to(&mut self, p: Point) {
        self.commands.push(DrawCommand::MoveTo(p));
    }

    fn line_to(&mut self, p: Point) {
        self.commands.push(DrawCommand::LineTo(p));
    }

    fn cubic_to(&mut self, p1: Point, p2: Point, p3: Point) {
        self.commands.push(DrawCommand::CubicTo(p1, p2, p3));
    }

    fn close(&mut self) {
        self.commands.push(DrawCommand::Close);
    }

    fn draw_path(&mut self, paint: &Paint, mode: &PathDrawMode) {
        self.commands
            .push(DrawCommand::DrawPath(paint.clone(), mode.clone()));
    }

    fn clip_path(&mut self, rule: FillRule) {
        self.commands.push(DrawCommand::ClipPath(rule));
    }

    fn draw_glyph(&mut self, glyph: &Glyph, paint: &Paint, mode: &GlyphDrawMode) {
        self.commands.push(DrawCommand::DrawGlyph(
            glyph.clone(),
            paint.clone(),
            mode.clone(),
        ));
    }

    fn draw_bitmap(&mut self, bitmap: &Bitmap) {
        self.commands.push(DrawCommand::DrawBitmap(bitmap.clone()));
    }
}

/// An immutable recording of drawing calls.
///
/// Pictures are what tiling patterns render their cell into. A picture is
/// recorded once and then replayed for every cell, with the cell's
/// placement prepended to every matrix.
#[derive(Clone, Debug)]
pub struct Picture {
    commands: Arc<[DrawCommand]>,
}

impl Picture {
    /// The recorded commands.
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Replay the picture onto `canvas`.
    ///
    /// Every recorded matrix and shading transform is pre-multiplied with
    /// `base`. If `color` is given, all paints are replaced by it, which is
    /// how uncolored tiling patterns receive their color.
    pub fn replay(&self, canvas: &mut dyn Canvas, base: Affine, color: Option<AlphaColor>) {
        let paint = |p: &Paint| match color {
            Some(c) => Paint::Color(c),
            None => p.transformed(base),
        };

        for command in self.commands.iter() {
            match command {
                DrawCommand::SetMatrix(m) => canvas.set_matrix(base * *m),
                DrawCommand::Save => canvas.save(),
                DrawCommand::Restore => canvas.restore(),
                DrawCommand::MoveTo(p) => canvas.move_to(*p),
                DrawCommand::LineTo(p) => canvas.line_to(*p),
                DrawCommand::CubicTo(p1, p2, p3) => canvas.cubic_to(*p1, *p2, *p3),
                DrawCommand::Close => canvas.close(),
                DrawCommand::DrawPath(p, mode) => canvas.draw_path(&paint(p), mode),
                DrawCommand::ClipPath(rule) => canvas.clip_path(*rule),
                DrawCommand::DrawGlyph(glyph, p, mode) => canvas.draw_glyph(glyph, &paint(p), mode),
                DrawCommand::DrawBitmap(bitmap) => match color {
                    // Only stencil masks may appear in uncolored patterns.
                    Some(c) => canvas.draw_bitmap(&bitmap.recolored(c)),
                    None => canvas.draw_bitmap(bitmap),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw_square(canvas: &mut dyn Canvas) {
        canvas.set_matrix(Affine::translate((1.0, 0.0)));
        canvas.move_to(Point::new(0.0, 0.0));
        canvas.line_to(Point::new(1.0, 0.0));
        canvas.line_to(Point::new(1.0, 1.0));
        canvas.close();
        canvas.draw_path(
            &Paint::Color(AlphaColor::BLACK),
            &PathDrawMode::Fill(FillRule::NonZero),
        );
    }

    #[test]
    fn replay_prepends_base() {
        let mut rec = RecordingCanvas::new();
        draw_square(&mut rec);
        let picture = rec.finish();

        let mut out = RecordingCanvas::new();
        picture.replay(&mut out, Affine::translate((10.0, 20.0)), None);

        assert_eq!(out.commands().len(), picture.commands().len());
        let DrawCommand::SetMatrix(m) = out.commands()[0] else {
            panic!("expected a matrix");
        };
        assert_eq!(m, Affine::translate((11.0, 20.0)));
    }

    #[test]
    fn replay_substitutes_color() {
        let mut rec = RecordingCanvas::new();
        draw_square(&mut rec);
        let picture = rec.finish();

        let red = AlphaColor::from_rgb8(255, 0, 0);
        let mut out = RecordingCanvas::new();
        picture.replay(&mut out, Affine::IDENTITY, Some(red));

        let painted = out
            .commands()
            .iter()
            .find_map(|c| match c {
                DrawCommand::DrawPath(Paint::Color(c), _) => Some(*c),
                _ => None,
            })
            .unwrap();
        assert_eq!(painted.to_rgba8(), [255, 0, 0, 255]);
    }
}
