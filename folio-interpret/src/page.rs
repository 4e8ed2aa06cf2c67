use crate::cache::DocumentCache;
use crate::canvas::{Canvas, FillRule, emit_path};
use crate::error::RenderError;
use crate::interpret::{Interpreter, InterpreterSettings};
use folio_syntax::object::{Dict, Resolve};
use kurbo::{Affine, Rect, Shape};

/// A page: its decoded content stream, resources and media box.
#[derive(Debug, Clone)]
pub struct Page {
    content: Vec<u8>,
    resources: Dict,
    media_box: Rect,
}

impl Page {
    /// Create a new page.
    pub fn new(content: Vec<u8>, resources: Dict, media_box: Rect) -> Self {
        Self {
            content,
            resources,
            media_box: media_box.abs(),
        }
    }

    /// The decoded content stream.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// The resource dictionary.
    pub fn resources(&self) -> &Dict {
        &self.resources
    }

    /// The media box, in default user space.
    pub fn media_box(&self) -> Rect {
        self.media_box
    }

    /// The size of the rendered page.
    pub fn size(&self) -> (f64, f64) {
        (self.media_box.width(), self.media_box.height())
    }

    /// Maps default user space to a device space with the origin at the
    /// top left of the media box and the y axis pointing down.
    pub fn initial_transform(&self) -> Affine {
        Affine::new([
            1.0,
            0.0,
            0.0,
            -1.0,
            -self.media_box.x0,
            self.media_box.y1,
        ])
    }
}

/// Render a page onto a canvas.
///
/// The page is wrapped in a save/restore pair and clipped to its media
/// box, so the canvas is left as it was found even if rendering fails.
pub fn render_page(
    page: &Page,
    resolver: &dyn Resolve,
    canvas: &mut dyn Canvas,
    settings: &InterpreterSettings,
    cache: &DocumentCache,
) -> Result<(), RenderError> {
    let (width, height) = page.size();
    let bbox = Rect::new(0.0, 0.0, width, height);

    canvas.save();
    canvas.set_matrix(Affine::IDENTITY);
    emit_path(canvas, &bbox.to_path(0.1));
    canvas.clip_path(FillRule::NonZero);

    let result = Interpreter::new(
        resolver,
        canvas,
        settings,
        cache,
        page.initial_transform(),
        bbox,
    )
    .run(page.content(), page.resources());

    canvas.restore();

    result
}

/// Render several pages onto the same canvas, one after another.
///
/// A page that fails does not stop the others from rendering.
pub fn render_pages<'p>(
    pages: impl IntoIterator<Item = &'p Page>,
    resolver: &dyn Resolve,
    canvas: &mut dyn Canvas,
    settings: &InterpreterSettings,
    cache: &DocumentCache,
) -> Vec<Result<(), RenderError>> {
    pages
        .into_iter()
        .map(|page| render_page(page, resolver, canvas, settings, cache))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::picture::{DrawCommand, RecordingCanvas};
    use folio_syntax::object::ObjectStore;

    #[test]
    fn initial_transform_flips() {
        let page = Page::new(vec![], Dict::new(), Rect::new(10.0, 20.0, 110.0, 220.0));

        assert_eq!(page.size(), (100.0, 200.0));
        assert_eq!(page.initial_transform() * kurbo::Point::new(10.0, 20.0), kurbo::Point::new(0.0, 200.0));
        assert_eq!(page.initial_transform() * kurbo::Point::new(110.0, 220.0), kurbo::Point::new(100.0, 0.0));
    }

    #[test]
    fn failing_page_does_not_stop_others() {
        let media_box = Rect::new(0.0, 0.0, 10.0, 10.0);
        let pages = [
            Page::new(b"q 0 g".to_vec(), Dict::new(), media_box),
            Page::new(b"Q".to_vec(), Dict::new(), media_box),
            Page::new(b"0 0 1 1 re f".to_vec(), Dict::new(), media_box),
        ];
        let mut canvas = RecordingCanvas::new();

        let results = render_pages(
            &pages,
            &ObjectStore::new(),
            &mut canvas,
            &InterpreterSettings::default(),
            &DocumentCache::new(),
        );

        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(RenderError::Content(_))));
        assert!(results[2].is_ok());

        let depth = canvas.commands().iter().fold(0i32, |depth, c| match c {
            DrawCommand::Save => depth + 1,
            DrawCommand::Restore => depth - 1,
            _ => depth,
        });
        assert_eq!(depth, 0);
    }
}
