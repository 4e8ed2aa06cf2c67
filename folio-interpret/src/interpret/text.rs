use super::Interpreter;
use super::path::ResolvedPaint;
use crate::canvas::{FillRule, GlyphDrawMode, Paint};
use crate::error::RenderError;
use crate::font::{Glyph, load_font};
use crate::interpret::InterpreterWarning;
use folio_syntax::content::ContentObject;
use folio_syntax::object::keys::FONT;
use folio_syntax::object::{Dict, Name, Object};
use kurbo::{Affine, BezPath};
use log::warn;
use std::sync::Arc;

/// Glyph outlines have the y axis pointing down, text space has it pointing
/// up.
const FLIP_Y: Affine = Affine::new([1.0, 0.0, 0.0, -1.0, 0.0, 0.0]);

impl Interpreter<'_> {
    /// Run a `BT`/`ET` text object.
    ///
    /// Glyph outlines collected by the clipping render modes are applied as
    /// one clip once the text object ends.
    pub(super) fn text_object(
        &mut self,
        children: &[ContentObject],
        resources: &Dict,
    ) -> Result<(), RenderError> {
        self.states.push();

        let text = &mut self.states.current_mut().text;
        text.text_matrix = Affine::IDENTITY;
        text.text_line_matrix = Affine::IDENTITY;
        text.clip = BezPath::new();

        self.scan_all(children, resources)?;

        let clip = std::mem::take(&mut self.states.current_mut().text.clip);
        self.states.pop()?;

        if !clip.elements().is_empty() {
            self.apply_clip(clip, FillRule::NonZero);
        }

        Ok(())
    }

    pub(super) fn set_font(&mut self, name: &Name, size: f32, resources: &Dict) {
        let font = self
            .ctx
            .resource(resources, FONT, name)
            .and_then(|(r, obj)| {
                let obj = r.map(Object::Ref).unwrap_or(obj);

                load_font(&obj, &self.ctx, &self.settings.font_resolver)
            });

        let text = &mut self.states.current_mut().text;
        text.font = font;
        text.font_size = size;
    }

    /// `TJ`: strings interleaved with position adjustments.
    pub(super) fn show_texts(&mut self, items: &[Object]) {
        for item in items {
            match item {
                Object::String(s) => self.show_text(s.as_bytes()),
                Object::Number(n) => self.states.current_mut().text.adjust(n.as_f32()),
                _ => warn!("ignoring invalid TJ element"),
            }
        }
    }

    /// Show a string, one glyph at a time.
    pub(super) fn show_text(&mut self, mut bytes: &[u8]) {
        let Some(font) = self.state().text.font.clone() else {
            warn!("showing text without a font");
            self.ctx.warn(InterpreterWarning::UnsupportedFont);

            return;
        };

        while let Some((code, len)) = font.next_code(bytes) {
            bytes = &bytes[len..];

            let glyph = Glyph {
                font: font.clone(),
                code,
            };

            self.draw_glyph(&glyph);

            let width = glyph.advance();
            self.states
                .current_mut()
                .text
                .advance(width, code, font.code_len());
        }
    }

    fn draw_glyph(&mut self, glyph: &Glyph) {
        let state = self.state();
        let mode = state.text.render_mode;
        let matrix = state.ctm * state.text.text_matrix * state.text.glyph_transform() * FLIP_Y;
        let mut stroke_props = state.stroke_props.clone();
        let font_size = state.text.font_size.abs();

        if mode.fills() {
            self.paint_glyph(glyph, matrix, GlyphDrawMode::Fill, false);
        }

        if mode.strokes() {
            // The line width is given in text space, the glyph matrix
            // already scales by the font size.
            if font_size != 0.0 {
                stroke_props.line_width /= font_size;
            }

            self.paint_glyph(glyph, matrix, GlyphDrawMode::Stroke(stroke_props), true);
        }

        if !mode.fills() && !mode.strokes() {
            let paint = Paint::Color(self.state().fill.color());
            self.canvas.set_matrix(matrix);
            self.canvas
                .draw_glyph(glyph, &paint, &GlyphDrawMode::Invisible);
        }

        if mode.clips()
            && let Some(outline) = glyph.outline()
        {
            let clip = &mut self.states.current_mut().text.clip;

            for el in (matrix * outline).elements() {
                clip.push(*el);
            }
        }
    }

    fn paint_glyph(&mut self, glyph: &Glyph, matrix: Affine, mode: GlyphDrawMode, stroke: bool) {
        match self.resolve_paint(stroke) {
            Some(ResolvedPaint::Paint(paint)) => {
                self.canvas.set_matrix(matrix);
                self.canvas.draw_glyph(glyph, &paint, &mode);
            }
            Some(ResolvedPaint::Tiling(pattern)) => {
                let Some(outline) = glyph.outline() else {
                    warn!("cannot paint a glyph without outline with a tiling pattern");

                    return;
                };

                let area = match &mode {
                    GlyphDrawMode::Stroke(props) => kurbo::stroke(
                        outline.iter(),
                        &props.to_kurbo(),
                        &kurbo::StrokeOpts::default(),
                        0.01,
                    ),
                    _ => outline,
                };

                self.tile(&(matrix * area), FillRule::NonZero, &pattern);
            }
            None => {}
        }
    }
}
