/*!
A crate for interpreting PDF content streams onto an abstract canvas.

This crate walks the content tree produced by [`folio_syntax`] and turns
it into drawing calls on a [`Canvas`]. On the way it keeps track of the
graphics state, resolves color spaces (including ICC-based ones) into
RGBA colors, decodes images, evaluates shadings and tiling patterns, and
positions glyphs.

The crate does not rasterize anything itself. It is up to the [`Canvas`]
implementation to turn paths, glyphs, bitmaps and shaders into pixels, or
into another vector format. [`RecordingCanvas`] records the calls instead,
which is useful for tests and is also how tiling patterns are captured.

```
use folio_interpret::{DocumentCache, InterpreterSettings, Page, RecordingCanvas, render_page};
use folio_syntax::object::{Dict, ObjectStore};
use kurbo::Rect;

let page = Page::new(b"1 0 0 rg 0 0 10 10 re f".to_vec(), Dict::new(), Rect::new(0.0, 0.0, 100.0, 100.0));
let mut canvas = RecordingCanvas::new();

render_page(
    &page,
    &ObjectStore::new(),
    &mut canvas,
    &InterpreterSettings::default(),
    &DocumentCache::new(),
)
.unwrap();

assert!(!canvas.commands().is_empty());
```
*/

#![forbid(unsafe_code)]

pub mod cache;
pub mod canvas;
pub mod color;
mod context;
mod error;
pub mod font;
pub mod function;
pub mod image;
mod interpret;
mod page;
pub mod pattern;
pub mod picture;
pub mod shading;

pub use cache::DocumentCache;
pub use canvas::{Canvas, FillRule, GlyphDrawMode, Paint, PathDrawMode, ShadingPaint, StrokeProps};
pub use context::LoadContext;
pub use error::RenderError;
pub use font::{Font, FontQuery, FontResolverFn, Glyph};
pub use interpret::state::{ClipRegion, GraphicsState, PaintState, StateStack, TextRenderingMode, TextState};
pub use interpret::{Interpreter, InterpreterSettings, InterpreterWarning, WarningSinkFn};
pub use page::{Page, render_page, render_pages};
pub use picture::{DrawCommand, Picture, RecordingCanvas};
