use super::Interpreter;
use super::path::ResolvedPaint;
use crate::canvas::{FillRule, Paint, PathDrawMode, ShadingPaint, emit_path};
use crate::color::{AlphaColor, ColorSpace};
use crate::error::RenderError;
use crate::image::{DecodedImage, decode_image, load_image};
use crate::pattern::{Pattern, ShadingPattern, TilingPattern, pattern_type};
use crate::picture::{Picture, RecordingCanvas};
use crate::shading::{self, Shading};
use folio_syntax::OptionLog;
use folio_syntax::content::{ContentParser, InlineImage};
use folio_syntax::object::keys::*;
use folio_syntax::object::{Dict, Name, Object, Stream};
use kurbo::{Affine, Rect, Shape};
use log::{debug, warn};
use std::sync::Arc;

const PATH_TOLERANCE: f64 = 0.1;

impl Interpreter<'_> {
    /// `Do`.
    pub(super) fn x_object(&mut self, name: &Name, resources: &Dict) -> Result<(), RenderError> {
        let Some((r, obj)) = self.ctx.resource(resources, X_OBJECT, name) else {
            return Ok(());
        };

        let obj = r.map(Object::Ref).unwrap_or(obj);
        let Some(stream) = self.ctx.cast::<Stream>(&obj).warn_none("XObject is not a stream") else {
            return Ok(());
        };

        let subtype = self.ctx.get::<Name>(stream.dict(), SUBTYPE);

        match subtype.as_ref().map(Name::as_bytes) {
            Some(b"Image") => {
                if let Some(image) = load_image(&obj, &self.ctx) {
                    self.draw_image(&image);
                }

                Ok(())
            }
            Some(b"Form") => self.draw_form(&stream, resources),
            Some(b"PS") => {
                debug!("ignoring PostScript XObject");

                Ok(())
            }
            _ => {
                warn!("XObject with unknown subtype");

                Ok(())
            }
        }
    }

    fn draw_form(&mut self, stream: &Stream, resources: &Dict) -> Result<(), RenderError> {
        let limit = self.settings.max_form_depth;

        if self.form_depth >= limit {
            return Err(RenderError::FormTooDeep { limit });
        }

        let Some(data) = stream.decoded().warn_none("failed to decode form XObject") else {
            return Ok(());
        };

        let dict = stream.dict();
        let objects = ContentParser::with_limits(&data, self.settings.limits).parse_all()?;
        let form_resources = self
            .ctx
            .get::<Dict>(dict, RESOURCES)
            .unwrap_or_else(|| resources.clone());
        let matrix = self
            .ctx
            .get::<[f64; 6]>(dict, MATRIX)
            .map(Affine::new)
            .unwrap_or_default();
        let bbox = self.ctx.get::<[f64; 4]>(dict, BBOX);

        self.save();

        let state = self.states.current_mut();
        state.ctm *= matrix;
        let ctm = state.ctm;

        if let Some([x0, y0, x1, y1]) = bbox {
            let clip = ctm * Rect::new(x0, y0, x1, y1).to_path(PATH_TOLERANCE);
            self.apply_clip(clip, FillRule::NonZero);
        }

        let pattern_base = std::mem::replace(&mut self.pattern_base, ctm);
        self.form_depth += 1;

        let result = self.scan_all(&objects, &form_resources);

        self.form_depth -= 1;
        self.pattern_base = pattern_base;

        result?;
        self.restore()
    }

    /// Draw an image into the unit square of user space.
    fn draw_image(&mut self, image: &DecodedImage) {
        let (DecodedImage::Color(bitmap) | DecodedImage::Stencil(bitmap)) = image;

        // Maps the pixel grid, first row at the top, to the unit square.
        let unit = Affine::new([
            1.0 / bitmap.width() as f64,
            0.0,
            0.0,
            -1.0 / bitmap.height() as f64,
            0.0,
            1.0,
        ]);
        let matrix = self.state().ctm * unit;

        let bitmap = match image {
            DecodedImage::Color(bitmap) => bitmap.faded(self.state().fill.alpha),
            DecodedImage::Stencil(bitmap) => match self.resolve_paint(false) {
                Some(ResolvedPaint::Paint(Paint::Color(color))) => bitmap.recolored(color),
                Some(_) => {
                    warn!("stencil masks painted with patterns are not supported");

                    return;
                }
                None => return,
            },
        };

        self.canvas.set_matrix(matrix);
        self.canvas.draw_bitmap(&bitmap);
    }

    pub(super) fn inline_image(&mut self, image: &InlineImage, resources: &Dict) {
        let resolve = |name: &Name| self.resolve_color_space(name, resources);

        if let Some(decoded) = decode_image(image.dict(), image.data(), &self.ctx, &resolve) {
            self.draw_image(&decoded);
        }
    }

    /// `sh`: fill the whole visible area with a shading.
    pub(super) fn paint_shading(&mut self, name: &Name, resources: &Dict) -> Result<(), RenderError> {
        let Some((r, obj)) = self.ctx.resource(resources, SHADING, name) else {
            return Ok(());
        };

        let obj = r.map(Object::Ref).unwrap_or(obj);
        let state = self.state();
        let (ctm, alpha) = (state.ctm, state.fill.alpha);

        let paint = match Shading::load(&obj, &self.ctx, &self.settings.shading_quality()) {
            Some(shading) => Paint::Shading(ShadingPaint {
                shading,
                transform: ctm,
            }),
            None => match shading::shading_type(&obj, &self.ctx) {
                Some(ty) if !(1..=7).contains(&ty) => match self.unknown_shading_background(&obj) {
                    Some(color) => Paint::Color(color.multiply_alpha(alpha)),
                    None => return Err(RenderError::UnknownShadingType(ty)),
                },
                // A shading of a known type that failed to load was already
                // reported.
                _ => return Ok(()),
            },
        };

        self.canvas.set_matrix(Affine::IDENTITY);
        emit_path(self.canvas, &self.bbox.to_path(PATH_TOLERANCE));
        self.canvas
            .draw_path(&paint, &PathDrawMode::Fill(FillRule::NonZero));

        Ok(())
    }

    fn unknown_shading_background(&self, obj: &Object) -> Option<AlphaColor> {
        let shading = self.ctx.deref(obj)?;
        let dict = shading.as_dict()?;
        let color_space = ColorSpace::from_object(dict.get_raw(COLOR_SPACE)?, &self.ctx)?;

        shading::background(dict, &self.ctx, &color_space)
    }

    /// Load a pattern for `scn`/`SCN`.
    pub(super) fn load_pattern(&self, name: &Name, resources: &Dict) -> Option<Pattern> {
        let (r, obj) = self.ctx.resource(resources, PATTERN, name)?;
        let obj = r.map(Object::Ref).unwrap_or(obj);

        match pattern_type(&obj, &self.ctx) {
            Some(1) => {
                let stream = self.ctx.cast::<Stream>(&obj)?;
                let record = || self.record_tiling(&stream, resources).map(Arc::new);
                let picture = match r {
                    Some(r) => self.ctx.cache.pictures.get_or_insert_with(r, record)?,
                    None => record()?,
                };

                TilingPattern::new(stream.dict(), &self.ctx, Picture::clone(&picture))
                    .map(|p| Pattern::Tiling(Arc::new(p)))
            }
            Some(2) => {
                let dict = self.ctx.cast::<Dict>(&obj)?;

                ShadingPattern::new(&dict, &self.ctx, &self.settings.shading_quality())
                    .map(Pattern::Shading)
            }
            other => {
                warn!("unknown pattern type {other:?}");

                None
            }
        }
    }

    /// Record the cell of a tiling pattern, in pattern space and clipped to
    /// its bounding box.
    fn record_tiling(&self, stream: &Stream, resources: &Dict) -> Option<Picture> {
        let dict = stream.dict();
        let [x0, y0, x1, y1] = self.ctx.get::<[f64; 4]>(dict, BBOX)?;
        let bbox = Rect::new(x0, y0, x1, y1).abs();
        let data = stream
            .decoded()
            .warn_none("failed to decode tiling pattern")?;
        let pattern_resources = self
            .ctx
            .get::<Dict>(dict, RESOURCES)
            .unwrap_or_else(|| resources.clone());

        if self.form_depth + 1 >= self.settings.max_form_depth {
            warn!("tiling patterns nested too deeply");

            return None;
        }

        let mut canvas = RecordingCanvas::new();
        let mut interpreter = Interpreter::new(
            self.ctx.resolver,
            &mut canvas,
            self.settings,
            self.ctx.cache,
            Affine::IDENTITY,
            bbox,
        );
        interpreter.form_depth = self.form_depth + 1;
        interpreter.apply_clip(bbox.to_path(PATH_TOLERANCE), FillRule::NonZero);

        if let Err(e) = interpreter.run(&data, &pattern_resources) {
            warn!("failed to record tiling pattern: {e}");
        }

        drop(interpreter);

        Some(canvas.finish())
    }
}
