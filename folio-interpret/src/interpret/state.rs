//! The graphics state and its stack.

use crate::canvas::{FillRule, StrokeProps};
use crate::color::{AlphaColor, ColorComponents, ColorSpace};
use crate::error::RenderError;
use crate::font::Font;
use crate::pattern::Pattern;
use kurbo::{Affine, BezPath};
use log::warn;
use std::sync::Arc;

/// How glyphs are painted, as set with `Tr`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextRenderingMode {
    /// Fill.
    #[default]
    Fill,
    /// Stroke.
    Stroke,
    /// Fill, then stroke.
    FillStroke,
    /// Neither fill nor stroke.
    Invisible,
    /// Fill and add to the clip path.
    FillAndClip,
    /// Stroke and add to the clip path.
    StrokeAndClip,
    /// Fill, then stroke, and add to the clip path.
    FillStrokeAndClip,
    /// Only add to the clip path.
    Clip,
}

impl TextRenderingMode {
    pub(crate) fn from_number(n: i64) -> Self {
        match n {
            0 => Self::Fill,
            1 => Self::Stroke,
            2 => Self::FillStroke,
            3 => Self::Invisible,
            4 => Self::FillAndClip,
            5 => Self::StrokeAndClip,
            6 => Self::FillStrokeAndClip,
            7 => Self::Clip,
            _ => {
                warn!("unknown text rendering mode {n}");

                Self::Fill
            }
        }
    }

    pub(crate) fn fills(self) -> bool {
        matches!(
            self,
            Self::Fill | Self::FillStroke | Self::FillAndClip | Self::FillStrokeAndClip
        )
    }

    pub(crate) fn strokes(self) -> bool {
        matches!(
            self,
            Self::Stroke | Self::FillStroke | Self::StrokeAndClip | Self::FillStrokeAndClip
        )
    }

    pub(crate) fn clips(self) -> bool {
        matches!(
            self,
            Self::FillAndClip | Self::StrokeAndClip | Self::FillStrokeAndClip | Self::Clip
        )
    }
}

/// The text parameters of the graphics state, and the text matrices.
#[derive(Clone, Debug)]
pub struct TextState {
    /// `Tc`.
    pub char_space: f32,
    /// `Tw`.
    pub word_space: f32,
    /// `Tz`, in percent.
    pub horizontal_scaling: f32,
    /// `TL`.
    pub leading: f32,
    /// The font selected with `Tf`.
    pub font: Option<Arc<dyn Font>>,
    /// The font size selected with `Tf`.
    pub font_size: f32,
    /// `Ts`.
    pub rise: f32,
    /// `Tr`.
    pub render_mode: TextRenderingMode,
    /// The text matrix.
    pub text_matrix: Affine,
    /// The text line matrix.
    pub text_line_matrix: Affine,
    /// Glyph outlines collected by the clipping render modes, in device
    /// space. They are turned into a clip at the end of the text object.
    pub clip: BezPath,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            char_space: 0.0,
            word_space: 0.0,
            horizontal_scaling: 100.0,
            leading: 0.0,
            font: None,
            font_size: 1.0,
            rise: 0.0,
            render_mode: TextRenderingMode::default(),
            text_matrix: Affine::IDENTITY,
            text_line_matrix: Affine::IDENTITY,
            clip: BezPath::new(),
        }
    }
}

impl PartialEq for TextState {
    fn eq(&self, other: &Self) -> bool {
        let same_font = match (&self.font, &other.font) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };

        same_font
            && self.char_space == other.char_space
            && self.word_space == other.word_space
            && self.horizontal_scaling == other.horizontal_scaling
            && self.leading == other.leading
            && self.font_size == other.font_size
            && self.rise == other.rise
            && self.render_mode == other.render_mode
            && self.text_matrix == other.text_matrix
            && self.text_line_matrix == other.text_line_matrix
            && self.clip == other.clip
    }
}

impl TextState {
    /// The horizontal scaling as a factor.
    pub(crate) fn scale(&self) -> f32 {
        self.horizontal_scaling / 100.0
    }

    /// Maps glyph space, scaled to one unit per em, to text space.
    pub(crate) fn glyph_transform(&self) -> Affine {
        Affine::new([
            (self.font_size * self.scale()) as f64,
            0.0,
            0.0,
            self.font_size as f64,
            0.0,
            self.rise as f64,
        ])
    }

    /// Move the text position by the advance of a glyph.
    ///
    /// Word spacing only applies to the single-byte code 32.
    pub(crate) fn advance(&mut self, width: f32, code: u32, code_len: usize) {
        let word_space = if code == 32 && code_len == 1 {
            self.word_space
        } else {
            0.0
        };

        let tx = (width / 1000.0 * self.font_size + self.char_space + word_space) * self.scale();

        self.text_matrix *= Affine::translate((tx as f64, 0.0));
    }

    /// Move the text position by a `TJ` adjustment, given in thousandths of
    /// a text space unit.
    pub(crate) fn adjust(&mut self, adjustment: f32) {
        let tx = -adjustment / 1000.0 * self.font_size * self.scale();

        self.text_matrix *= Affine::translate((tx as f64, 0.0));
    }

    /// Start a new line, offset from the start of the current one.
    pub(crate) fn next_line(&mut self, tx: f64, ty: f64) {
        self.text_line_matrix *= Affine::translate((tx, ty));
        self.text_matrix = self.text_line_matrix;
    }
}

/// The fill or stroke paint of the graphics state.
#[derive(Clone, Debug)]
pub struct PaintState {
    /// The color space.
    pub color_space: ColorSpace,
    /// The color components, in the color space. For uncolored patterns,
    /// these are in the base color space of the pattern space.
    pub components: ColorComponents,
    /// The pattern, if the color space is a pattern space.
    pub pattern: Option<Pattern>,
    /// The constant alpha, `ca` or `CA`.
    pub alpha: f32,
}

impl Default for PaintState {
    fn default() -> Self {
        let color_space = ColorSpace::device_gray();

        Self {
            components: color_space.initial_color(),
            color_space,
            pattern: None,
            alpha: 1.0,
        }
    }
}

impl PartialEq for PaintState {
    fn eq(&self, other: &Self) -> bool {
        self.color_space.same_as(&other.color_space)
            && self.components == other.components
            && self.pattern == other.pattern
            && self.alpha == other.alpha
    }
}

impl PaintState {
    /// Switch to a new color space, resetting the color to its initial
    /// value.
    pub(crate) fn set_color_space(&mut self, color_space: ColorSpace) {
        self.components = color_space.initial_color();
        self.color_space = color_space;
        self.pattern = None;
    }

    /// The color, for paints that are not patterns.
    pub fn color(&self) -> AlphaColor {
        self.color_space.to_rgba(&self.components, self.alpha)
    }

    /// The color an uncolored pattern is painted with.
    pub(crate) fn pattern_color(&self) -> Option<AlphaColor> {
        let base = self.color_space.pattern_base()?;

        Some(base.to_rgba(&self.components, self.alpha))
    }
}

/// The clip paths that were applied so far, in device space.
///
/// The canvas does the actual clipping. The region is tracked so that it
/// is restored together with the rest of the state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClipRegion {
    paths: Vec<(BezPath, FillRule)>,
}

impl ClipRegion {
    /// The clip paths, in the order they were applied.
    pub fn paths(&self) -> &[(BezPath, FillRule)] {
        &self.paths
    }

    /// Whether nothing was clipped.
    pub fn is_unclipped(&self) -> bool {
        self.paths.is_empty()
    }

    pub(crate) fn push(&mut self, path: BezPath, rule: FillRule) {
        self.paths.push((path, rule));
    }
}

/// The graphics state.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphicsState {
    /// The current transformation matrix, mapping user space to device
    /// space.
    pub ctm: Affine,
    /// The line parameters.
    pub stroke_props: StrokeProps,
    /// The stroke paint.
    pub stroke: PaintState,
    /// The fill paint.
    pub fill: PaintState,
    /// The text parameters.
    pub text: TextState,
    /// The clip region.
    pub clip: ClipRegion,
    /// `ri`. Recorded, but colors are always converted the same way.
    pub rendering_intent: Option<String>,
    /// `i`. Recorded, but curves are passed on as they are.
    pub flatness: f32,
}

impl GraphicsState {
    /// The initial state of a page or form with the given transform.
    pub fn new(ctm: Affine) -> Self {
        Self {
            ctm,
            stroke_props: StrokeProps::default(),
            stroke: PaintState::default(),
            fill: PaintState::default(),
            text: TextState::default(),
            clip: ClipRegion::default(),
            rendering_intent: None,
            flatness: 1.0,
        }
    }
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self::new(Affine::IDENTITY)
    }
}

/// A stack of graphics states. It always holds at least the initial state.
#[derive(Clone, Debug)]
pub struct StateStack {
    states: Vec<GraphicsState>,
}

impl StateStack {
    /// Create a stack holding just `initial`.
    pub fn new(initial: GraphicsState) -> Self {
        Self {
            states: vec![initial],
        }
    }

    /// The current state.
    pub fn current(&self) -> &GraphicsState {
        // The stack is never empty.
        &self.states[self.states.len() - 1]
    }

    /// The current state, mutably.
    pub fn current_mut(&mut self) -> &mut GraphicsState {
        let last = self.states.len() - 1;

        &mut self.states[last]
    }

    /// Push a copy of the current state.
    pub fn push(&mut self) {
        self.states.push(self.current().clone());
    }

    /// Discard the current state, going back to the one before the
    /// matching [`StateStack::push`].
    pub fn pop(&mut self) -> Result<GraphicsState, RenderError> {
        if self.states.len() <= 1 {
            return Err(RenderError::StateUnderflow);
        }

        self.states.pop().ok_or(RenderError::StateUnderflow)
    }

    /// The number of pushed states.
    pub fn depth(&self) -> usize {
        self.states.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_restores() {
        let mut stack = StateStack::new(GraphicsState::default());
        let before = stack.current().clone();

        stack.push();
        stack.current_mut().ctm = Affine::scale(2.0);
        stack.current_mut().fill.set_color_space(ColorSpace::device_cmyk());
        stack.current_mut().text.font_size = 12.0;
        assert_ne!(*stack.current(), before);

        stack.pop().unwrap();
        assert_eq!(*stack.current(), before);
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn underflow() {
        let mut stack = StateStack::new(GraphicsState::default());

        assert_eq!(stack.pop().unwrap_err(), RenderError::StateUnderflow);
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn text_advance() {
        let mut text = TextState {
            font_size: 10.0,
            char_space: 1.0,
            word_space: 5.0,
            horizontal_scaling: 50.0,
            ..TextState::default()
        };

        text.advance(500.0, 65, 1);
        assert_eq!(text.text_matrix.translation().x, 3.0);

        text.advance(500.0, 32, 1);
        assert_eq!(text.text_matrix.translation().x, 8.5);

        // No word spacing for two-byte codes.
        text.advance(500.0, 32, 2);
        assert_eq!(text.text_matrix.translation().x, 11.5);

        text.adjust(-200.0);
        assert_eq!(text.text_matrix.translation().x, 12.5);
    }

    #[test]
    fn render_modes() {
        let mode = TextRenderingMode::from_number(6);

        assert!(mode.fills() && mode.strokes() && mode.clips());
        assert!(!TextRenderingMode::from_number(3).fills());
        assert_eq!(TextRenderingMode::from_number(9), TextRenderingMode::Fill);
    }
}
