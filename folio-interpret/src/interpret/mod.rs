//! Walking content trees and driving the graphics state.

use crate::cache::DocumentCache;
use crate::canvas::{Canvas, FillRule};
use crate::color::{ColorComponents, ColorSpace};
use crate::context::LoadContext;
use crate::error::RenderError;
use crate::font::{FontQuery, FontResolverFn};
use crate::shading::ShadingQuality;
use folio_syntax::OptionLog;
use folio_syntax::content::{ContentObject, ContentParser, Operation, Operator, ParseLimits};
use folio_syntax::object::keys::*;
use folio_syntax::object::{Dict, Name, Object, Resolve};
use kurbo::{Affine, Cap, Join, Point, Rect};
use log::{debug, warn};
use path::PathBuilder;
use state::{GraphicsState, PaintState, StateStack};
use std::fmt;
use std::sync::Arc;

pub(crate) mod path;
pub(crate) mod state;
mod text;
mod xobject;

/// A callback function for receiving warnings during interpretation.
pub type WarningSinkFn = Arc<dyn Fn(InterpreterWarning) + Send + Sync>;

type OperationHook<'a> = Box<dyn FnMut(&Operation, &GraphicsState) + 'a>;

/// Settings that apply during interpretation.
#[derive(Clone)]
pub struct InterpreterSettings {
    /// Limits for parsing content streams, including those of forms and
    /// patterns.
    pub limits: ParseLimits,
    /// How deeply form XObjects and tiling patterns may be nested. Deeper
    /// nesting is an error, which also catches forms that draw themselves.
    pub max_form_depth: usize,
    /// The number of stops axial and radial shadings are sampled to.
    /// Clamped to `32..=256`.
    pub gradient_stops: usize,
    /// The width and height of the bitmap function-based shadings are
    /// sampled into.
    pub function_shading_resolution: u32,
    /// Provides fonts, see [`FontResolverFn`].
    pub font_resolver: FontResolverFn,
    /// Receives a warning whenever something was skipped or approximated
    /// while interpreting.
    pub warning_sink: WarningSinkFn,
}

impl Default for InterpreterSettings {
    fn default() -> Self {
        Self {
            limits: ParseLimits::default(),
            max_form_depth: 32,
            gradient_stops: 256,
            function_shading_resolution: 64,
            font_resolver: Arc::new(|_: &FontQuery<'_>| None),
            warning_sink: Arc::new(|_| {}),
        }
    }
}

impl fmt::Debug for InterpreterSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterpreterSettings")
            .field("limits", &self.limits)
            .field("max_form_depth", &self.max_form_depth)
            .field("gradient_stops", &self.gradient_stops)
            .field(
                "function_shading_resolution",
                &self.function_shading_resolution,
            )
            .finish_non_exhaustive()
    }
}

impl InterpreterSettings {
    pub(crate) fn shading_quality(&self) -> ShadingQuality {
        ShadingQuality {
            gradient_stops: self.gradient_stops,
            function_resolution: self.function_shading_resolution,
        }
    }
}

/// Warnings that can occur while interpreting a content stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpreterWarning {
    /// A font could not be loaded, or uses an encoding that is not
    /// supported.
    UnsupportedFont,
    /// An image failed to decode.
    ImageDecodeFailure,
    /// A shading is of an unknown type or is broken.
    UnsupportedShading,
    /// An ICC profile could not be used, and the alternate color space
    /// was used instead.
    IccProfileFallback,
    /// A resource referenced by the content stream does not exist.
    MissingResource,
}

/// Interprets content streams, issuing drawing calls to a [`Canvas`].
///
/// The content tree is walked in stream order. Aggregates push a copy of
/// the graphics state when they are entered and pop it when they are left,
/// and operators mutate the current state in place.
pub struct Interpreter<'a> {
    ctx: LoadContext<'a>,
    canvas: &'a mut dyn Canvas,
    settings: &'a InterpreterSettings,
    states: StateStack,
    path: PathBuilder,
    pending_clip: Option<FillRule>,
    bbox: Rect,
    pattern_base: Affine,
    form_depth: usize,
    saves: usize,
    hook: Option<OperationHook<'a>>,
}

impl<'a> Interpreter<'a> {
    /// Create a new interpreter.
    ///
    /// `initial_transform` maps the default user space to device space,
    /// and `bbox` is the visible area in device space, which is what `sh`
    /// fills.
    pub fn new(
        resolver: &'a dyn Resolve,
        canvas: &'a mut dyn Canvas,
        settings: &'a InterpreterSettings,
        cache: &'a DocumentCache,
        initial_transform: Affine,
        bbox: Rect,
    ) -> Self {
        Self {
            ctx: LoadContext::new(resolver, cache, &settings.warning_sink),
            canvas,
            settings,
            states: StateStack::new(GraphicsState::new(initial_transform)),
            path: PathBuilder::default(),
            pending_clip: None,
            bbox,
            pattern_base: initial_transform,
            form_depth: 0,
            saves: 0,
            hook: None,
        }
    }

    /// Call `hook` after each leaf operation was applied, with the
    /// resulting graphics state.
    ///
    /// Operations of forms drawn with `Do` are reported as well.
    pub fn with_operation_hook(mut self, hook: impl FnMut(&Operation, &GraphicsState) + 'a) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    /// The current graphics state.
    pub fn state(&self) -> &GraphicsState {
        self.states.current()
    }

    /// The stack of graphics states.
    pub fn states(&self) -> &StateStack {
        &self.states
    }

    /// Parse and interpret a content stream.
    pub fn run(&mut self, content: &[u8], resources: &Dict) -> Result<(), RenderError> {
        let objects = ContentParser::with_limits(content, self.settings.limits).parse_all()?;

        self.execute(&objects, resources)
    }

    /// Interpret an already parsed content stream.
    ///
    /// On error, all states and canvas saves made so far are unwound, so
    /// the canvas is left balanced either way.
    pub fn execute(&mut self, objects: &[ContentObject], resources: &Dict) -> Result<(), RenderError> {
        let depth = self.states.depth();
        let saves = self.saves;

        let result = self.scan_all(objects, resources);

        while self.saves > saves {
            self.canvas.restore();
            self.saves -= 1;
        }

        while self.states.depth() > depth {
            self.states.pop()?;
        }

        result
    }

    fn scan_all(&mut self, objects: &[ContentObject], resources: &Dict) -> Result<(), RenderError> {
        objects.iter().try_for_each(|obj| self.scan(obj, resources))
    }

    fn scan(&mut self, obj: &ContentObject, resources: &Dict) -> Result<(), RenderError> {
        match obj {
            ContentObject::Operation(op) | ContentObject::XObject(op) | ContentObject::Shading(op) => {
                self.operation(op, resources)
            }
            ContentObject::Path(ops) => ops.iter().try_for_each(|op| self.operation(op, resources)),
            ContentObject::Text(children) => self.text_object(children, resources),
            ContentObject::LocalGraphicsState(children) => {
                self.save();
                self.scan_all(children, resources)?;
                self.restore()
            }
            ContentObject::MarkedContent { begin, children } => {
                self.operation(begin, resources)?;
                self.save();
                self.scan_all(children, resources)?;
                self.restore()
            }
            ContentObject::InlineImage(image) => {
                self.inline_image(image, resources);
                self.notify(&Operation::new(Operator::BeginInlineImage, []));

                Ok(())
            }
        }
    }

    fn save(&mut self) {
        self.states.push();
        self.canvas.save();
        self.saves += 1;
    }

    fn restore(&mut self) -> Result<(), RenderError> {
        self.states.pop()?;
        self.canvas.restore();
        self.saves = self.saves.saturating_sub(1);

        Ok(())
    }

    fn notify(&mut self, op: &Operation) {
        if let Some(hook) = self.hook.as_mut() {
            hook(op, self.states.current());
        }
    }

    fn operation(&mut self, op: &Operation, resources: &Dict) -> Result<(), RenderError> {
        self.apply(op, resources)?;
        self.notify(op);

        Ok(())
    }

    fn apply(&mut self, op: &Operation, resources: &Dict) -> Result<(), RenderError> {
        use Operator::*;

        let state = self.states.current_mut();

        match op.operator {
            SaveState => self.save(),
            RestoreState => self.restore()?,
            Transform => {
                if let Some(m) = op.f32s::<6>().warn_none("malformed cm") {
                    state.ctm *= Affine::new(m.map(f64::from));
                }
            }
            LineWidth => {
                if let Some(w) = op.f32(0) {
                    state.stroke_props.line_width = w;
                }
            }
            LineCap => {
                if let Some(c) = op.f32(0) {
                    state.stroke_props.line_cap = line_cap(c as i64);
                }
            }
            LineJoin => {
                if let Some(j) = op.f32(0) {
                    state.stroke_props.line_join = line_join(j as i64);
                }
            }
            MiterLimit => {
                if let Some(m) = op.f32(0) {
                    state.stroke_props.miter_limit = m;
                }
            }
            DashPattern => {
                if let (Some(array), Some(phase)) = (op.operands.first(), op.f32(1)) {
                    set_dash(state, array, phase);
                }
            }
            RenderingIntent => {
                state.rendering_intent = op.name(0).map(|n| n.as_str().to_owned());
            }
            Flatness => {
                if let Some(f) = op.f32(0) {
                    state.flatness = f;
                }
            }
            SetGraphicsState => {
                if let Some(name) = op.name(0) {
                    self.ext_g_state(name, resources);
                }
            }

            MoveTo => {
                if let Some([x, y]) = op.f32s() {
                    self.path.move_to(point(x, y));
                }
            }
            LineTo => {
                if let Some([x, y]) = op.f32s() {
                    self.path.line_to(point(x, y));
                }
            }
            CurveTo => {
                if let Some([x1, y1, x2, y2, x3, y3]) = op.f32s() {
                    self.path
                        .curve_to(point(x1, y1), point(x2, y2), point(x3, y3));
                }
            }
            CurveToV => {
                if let Some([x2, y2, x3, y3]) = op.f32s() {
                    self.path.curve_to_v(point(x2, y2), point(x3, y3));
                }
            }
            CurveToY => {
                if let Some([x1, y1, x3, y3]) = op.f32s() {
                    self.path.curve_to_y(point(x1, y1), point(x3, y3));
                }
            }
            ClosePath => self.path.close(),
            Rectangle => {
                if let Some([x, y, w, h]) = op.f32s() {
                    self.path.rect(x as f64, y as f64, w as f64, h as f64);
                }
            }

            Stroke => self.draw(None, true),
            CloseStroke => {
                self.path.close();
                self.draw(None, true);
            }
            Fill | FillCompat => self.draw(Some(FillRule::NonZero), false),
            FillEvenOdd => self.draw(Some(FillRule::EvenOdd), false),
            FillStroke => self.draw(Some(FillRule::NonZero), true),
            FillStrokeEvenOdd => self.draw(Some(FillRule::EvenOdd), true),
            CloseFillStroke => {
                self.path.close();
                self.draw(Some(FillRule::NonZero), true);
            }
            CloseFillStrokeEvenOdd => {
                self.path.close();
                self.draw(Some(FillRule::EvenOdd), true);
            }
            EndPath => self.draw(None, false),
            ClipNonZero => self.pending_clip = Some(FillRule::NonZero),
            ClipEvenOdd => self.pending_clip = Some(FillRule::EvenOdd),

            CharSpacing => {
                if let Some(c) = op.f32(0) {
                    state.text.char_space = c;
                }
            }
            WordSpacing => {
                if let Some(w) = op.f32(0) {
                    state.text.word_space = w;
                }
            }
            HorizontalScaling => {
                if let Some(h) = op.f32(0) {
                    state.text.horizontal_scaling = h;
                }
            }
            TextLeading => {
                if let Some(l) = op.f32(0) {
                    state.text.leading = l;
                }
            }
            TextRise => {
                if let Some(r) = op.f32(0) {
                    state.text.rise = r;
                }
            }
            TextRenderingMode => {
                if let Some(mode) = op.f32(0) {
                    state.text.render_mode = state::TextRenderingMode::from_number(mode as i64);
                }
            }
            TextFont => {
                if let (Some(name), Some(size)) = (op.name(0), op.f32(1)) {
                    self.set_font(name, size, resources);
                }
            }
            NextLineOffset => {
                if let Some([tx, ty]) = op.f32s() {
                    state.text.next_line(tx as f64, ty as f64);
                }
            }
            NextLineOffsetLeading => {
                if let Some([tx, ty]) = op.f32s() {
                    state.text.leading = -ty;
                    state.text.next_line(tx as f64, ty as f64);
                }
            }
            TextMatrix => {
                if let Some(m) = op.f32s::<6>() {
                    let m = Affine::new(m.map(f64::from));
                    state.text.text_matrix = m;
                    state.text.text_line_matrix = m;
                }
            }
            NextLine => {
                let leading = state.text.leading as f64;
                state.text.next_line(0.0, -leading);
            }
            ShowText => {
                if let Some(Object::String(s)) = op.operands.first() {
                    self.show_text(s.as_bytes());
                }
            }
            ShowTexts => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    self.show_texts(items);
                }
            }
            NextLineShowText => {
                let leading = state.text.leading as f64;
                state.text.next_line(0.0, -leading);

                if let Some(Object::String(s)) = op.operands.first() {
                    self.show_text(s.as_bytes());
                }
            }
            NextLineShowTextSpacing => {
                if let (Some(aw), Some(ac), Some(Object::String(s))) =
                    (op.f32(0), op.f32(1), op.operands.get(2))
                {
                    state.text.word_space = aw;
                    state.text.char_space = ac;
                    let leading = state.text.leading as f64;
                    state.text.next_line(0.0, -leading);
                    self.show_text(s.as_bytes());
                }
            }
            // Glyph procedures of Type 3 fonts are not executed.
            Type3Width | Type3WidthBBox => {}

            StrokeColorSpace | FillColorSpace => {
                if let Some(name) = op.name(0) {
                    let cs = self
                        .resolve_color_space(name, resources)
                        .unwrap_or_else(ColorSpace::device_gray);
                    self.paint_mut(op.operator == StrokeColorSpace)
                        .set_color_space(cs);
                }
            }
            StrokeColor | FillColor => {
                self.paint_mut(op.operator == StrokeColor).components = numbers(op);
            }
            StrokeColorNamed | FillColorNamed => {
                let stroke = op.operator == StrokeColorNamed;
                let pattern = match op.operands.last() {
                    Some(Object::Name(name)) => self.load_pattern(name, resources),
                    _ => None,
                };

                let paint = self.paint_mut(stroke);
                paint.components = numbers(op);
                paint.pattern = pattern;
            }
            StrokeGray | FillGray => {
                self.set_device_color(op, ColorSpace::device_gray(), op.operator == StrokeGray);
            }
            StrokeRgb | FillRgb => {
                self.set_device_color(op, ColorSpace::device_rgb(), op.operator == StrokeRgb);
            }
            StrokeCmyk | FillCmyk => {
                self.set_device_color(op, ColorSpace::device_cmyk(), op.operator == StrokeCmyk);
            }

            XObject => {
                if let Some(name) = op.name(0) {
                    self.x_object(name, resources)?;
                }
            }
            PaintShading => {
                if let Some(name) = op.name(0) {
                    self.paint_shading(name, resources)?;
                }
            }

            // Aggregate delimiters are consumed by the content parser and
            // inline images are handled as a whole.
            BeginText | EndText | BeginInlineImage | InlineImageData | EndInlineImage => {}
            MarkedContentPoint
            | MarkedContentPointProperties
            | BeginMarkedContent
            | BeginMarkedContentProperties
            | EndMarkedContent
            | BeginCompatibility
            | EndCompatibility => {}
            Unknown => {
                debug!(
                    "ignoring unknown operator {}",
                    String::from_utf8_lossy(op.keyword())
                );
            }
        }

        Ok(())
    }

    fn paint_mut(&mut self, stroke: bool) -> &mut PaintState {
        let state = self.states.current_mut();

        if stroke { &mut state.stroke } else { &mut state.fill }
    }

    fn set_device_color(&mut self, op: &Operation, cs: ColorSpace, stroke: bool) {
        let components = numbers(op);

        if components.len() != cs.num_components() {
            warn!("wrong number of color components for {:?}", op.operator);

            return;
        }

        let paint = self.paint_mut(stroke);
        paint.set_color_space(cs);
        paint.components = components;
    }

    /// Resolve a color space name, either one of the device color spaces
    /// or an entry of the `/ColorSpace` resources.
    pub(crate) fn resolve_color_space(&self, name: &Name, resources: &Dict) -> Option<ColorSpace> {
        if let Some(cs) = ColorSpace::from_name(name.as_bytes()) {
            return Some(cs);
        }

        let (r, obj) = self.ctx.resource(resources, COLOR_SPACE, name)?;

        ColorSpace::from_object(&r.map(Object::Ref).unwrap_or(obj), &self.ctx)
    }

    fn ext_g_state(&mut self, name: &Name, resources: &Dict) {
        let Some(dict) = self
            .ctx
            .resource(resources, EXT_G_STATE, name)
            .and_then(|(_, obj)| self.ctx.cast::<Dict>(&obj))
        else {
            return;
        };

        let ctx = self.ctx;
        let state = self.states.current_mut();

        if let Some(w) = ctx.get::<f32>(&dict, LW) {
            state.stroke_props.line_width = w;
        }

        if let Some(c) = ctx.get::<i64>(&dict, LC) {
            state.stroke_props.line_cap = line_cap(c);
        }

        if let Some(j) = ctx.get::<i64>(&dict, LJ) {
            state.stroke_props.line_join = line_join(j);
        }

        if let Some(m) = ctx.get::<f32>(&dict, ML) {
            state.stroke_props.miter_limit = m;
        }

        if let Some(dash) = ctx.get::<Vec<Object>>(&dict, D)
            && let [array, phase] = dash.as_slice()
            && let Some(phase) = ctx.cast::<f32>(phase)
        {
            set_dash(state, array, phase);
        }

        if let Some(ri) = ctx.get::<Name>(&dict, RI) {
            state.rendering_intent = Some(ri.as_str().to_owned());
        }

        if let Some(fl) = ctx.get::<f32>(&dict, FL) {
            state.flatness = fl;
        }

        if let Some(a) = ctx.get::<f32>(&dict, CA) {
            state.stroke.alpha = a.clamp(0.0, 1.0);
        }

        if let Some(a) = ctx.get::<f32>(&dict, CA_NS) {
            state.fill.alpha = a.clamp(0.0, 1.0);
        }

        if dict
            .get_raw(SMASK)
            .is_some_and(|m| m.as_name().is_none_or(|n| n.as_bytes() != b"None"))
        {
            warn!("soft masks in graphics states are not supported");
        }

        if let Some(font) = ctx.get::<Vec<Object>>(&dict, FONT)
            && let [font, size] = font.as_slice()
            && let Some(size) = ctx.cast::<f32>(size)
        {
            let font = crate::font::load_font(font, &ctx, &self.settings.font_resolver);
            let text = &mut self.states.current_mut().text;
            text.font = font;
            text.font_size = size;
        }
    }
}

fn point(x: f32, y: f32) -> Point {
    Point::new(x as f64, y as f64)
}

fn numbers(op: &Operation) -> ColorComponents {
    op.operands
        .iter()
        .filter_map(|o| o.as_number().map(|n| n.as_f32()))
        .collect()
}

fn line_cap(n: i64) -> Cap {
    match n {
        1 => Cap::Round,
        2 => Cap::Square,
        _ => Cap::Butt,
    }
}

fn line_join(n: i64) -> Join {
    match n {
        1 => Join::Round,
        2 => Join::Bevel,
        _ => Join::Miter,
    }
}

fn set_dash(state: &mut GraphicsState, array: &Object, phase: f32) {
    let Some(array) = array.as_array() else {
        return;
    };

    let dashes = array
        .iter()
        .filter_map(|o| o.as_number().map(|n| n.as_f32().abs()))
        .collect::<smallvec::SmallVec<[f32; 4]>>();

    state.stroke_props.dash_offset = phase;
    state.stroke_props.dash_array = if dashes.iter().all(|d| *d == 0.0) {
        // A dash array of only zeroes would never advance.
        smallvec::SmallVec::new()
    } else {
        // kurbo cannot deal with dashes of length zero.
        dashes
            .into_iter()
            .map(|d| if d == 0.0 { 0.01 } else { d })
            .collect()
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{Paint, PathDrawMode};
    use crate::interpret::state::TextRenderingMode;
    use crate::picture::{DrawCommand, RecordingCanvas};
    use folio_syntax::object::ObjectStore;

    fn run(content: &[u8]) -> (Vec<DrawCommand>, Result<(), RenderError>) {
        let store = ObjectStore::new();
        let cache = DocumentCache::new();
        let settings = InterpreterSettings::default();
        let mut canvas = RecordingCanvas::new();
        let result = Interpreter::new(
            &store,
            &mut canvas,
            &settings,
            &cache,
            Affine::IDENTITY,
            Rect::new(0.0, 0.0, 100.0, 100.0),
        )
        .run(content, &Dict::new());

        (canvas.commands().to_vec(), result)
    }

    fn states_after(content: &[u8]) -> Vec<GraphicsState> {
        let store = ObjectStore::new();
        let cache = DocumentCache::new();
        let settings = InterpreterSettings::default();
        let mut canvas = RecordingCanvas::new();
        let mut states = vec![];

        Interpreter::new(
            &store,
            &mut canvas,
            &settings,
            &cache,
            Affine::IDENTITY,
            Rect::ZERO,
        )
        .with_operation_hook(|_, state| states.push(state.clone()))
        .run(content, &Dict::new())
        .unwrap();

        states
    }

    #[test]
    fn fill_with_device_color() {
        let (commands, result) = run(b"1 0 0 rg 10 10 20 20 re f");
        result.unwrap();

        let Some(DrawCommand::DrawPath(Paint::Color(c), PathDrawMode::Fill(FillRule::NonZero))) =
            commands.last()
        else {
            panic!("expected a fill, got {commands:?}");
        };
        assert_eq!(c.to_rgba8(), [255, 0, 0, 255]);
    }

    #[test]
    fn cmyk_fill() {
        let (commands, _) = run(b"0 0 0 1 k 0 0 1 1 re f 0 0 0 0 k 0 0 1 1 re f");
        let colors = commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::DrawPath(Paint::Color(c), _) => Some(c.to_rgba8()),
                _ => None,
            })
            .collect::<Vec<_>>();

        assert_eq!(colors, [[0, 0, 0, 255], [255, 255, 255, 255]]);
    }

    #[test]
    fn cm_pre_concatenates() {
        let states = states_after(b"2 0 0 2 0 0 cm 1 0 0 1 10 0 cm");

        assert_eq!(
            states.last().unwrap().ctm,
            Affine::new([2.0, 0.0, 0.0, 2.0, 20.0, 0.0])
        );
    }

    #[test]
    fn clip_applies_after_painting() {
        let (commands, _) = run(b"0 0 10 10 re W f");
        let kinds = commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::DrawPath(..) | DrawCommand::ClipPath(_)))
            .map(|c| matches!(c, DrawCommand::ClipPath(_)))
            .collect::<Vec<_>>();

        assert_eq!(kinds, [false, true]);
    }

    #[test]
    fn clip_region_is_scoped() {
        let states = states_after(b"q 0 0 10 10 re W n Q 0 g");

        assert_eq!(states[2].clip.paths().len(), 1);
        assert!(states.last().unwrap().clip.is_unclipped());
    }

    #[test]
    fn text_state_is_scoped_to_text_objects() {
        let states = states_after(b"BT 5 Tc 2 Tr 10 20 Td ET 0 g");
        let inside = &states[2];
        let after = states.last().unwrap();

        assert_eq!(inside.text.char_space, 5.0);
        assert_eq!(inside.text.render_mode, TextRenderingMode::FillStroke);
        assert_eq!(inside.text.text_matrix.translation(), kurbo::Vec2::new(10.0, 20.0));
        assert_eq!(after.text.char_space, 0.0);
    }

    #[test]
    fn color_space_resets_color() {
        let states = states_after(b"0.5 g /DeviceRGB cs");
        let fill = &states[1].fill;

        assert_eq!(fill.components.as_slice(), [0.0, 0.0, 0.0]);
        assert_eq!(fill.color().to_rgba8(), [0, 0, 0, 255]);
    }

    #[test]
    fn dash_pattern() {
        let states = states_after(b"[3 0] 1 d [0 0] 0 d");

        assert_eq!(states[0].stroke_props.dash_array.as_slice(), [3.0, 0.01]);
        assert_eq!(states[0].stroke_props.dash_offset, 1.0);
        assert!(states[1].stroke_props.dash_array.is_empty());
    }

    #[test]
    fn missing_resources_are_skipped() {
        let (commands, result) = run(b"/Im0 Do /F0 12 Tf BT (abc) Tj ET /Sh0 sh 0 0 1 1 re f");

        result.unwrap();
        assert!(matches!(commands.last(), Some(DrawCommand::DrawPath(..))));
    }

    #[test]
    fn canvas_is_balanced_after_underflow() {
        let store = ObjectStore::new();
        let cache = DocumentCache::new();
        let settings = InterpreterSettings::default();
        let mut canvas = RecordingCanvas::new();
        let restore = || ContentObject::Operation(Operation::new(Operator::RestoreState, []));
        let objects = [ContentObject::LocalGraphicsState(vec![
            ContentObject::LocalGraphicsState(vec![restore(), restore()]),
        ])];

        let mut interpreter = Interpreter::new(
            &store,
            &mut canvas,
            &settings,
            &cache,
            Affine::IDENTITY,
            Rect::ZERO,
        );
        let result = interpreter.execute(&objects, &Dict::new());

        assert_eq!(result, Err(RenderError::StateUnderflow));
        assert_eq!(interpreter.states().depth(), 0);
        drop(interpreter);

        let count = |f: fn(&DrawCommand) -> bool| canvas.commands().iter().filter(|c| f(c)).count();
        assert_eq!(
            count(|c| matches!(c, DrawCommand::Save)),
            count(|c| matches!(c, DrawCommand::Restore))
        );
    }
}
