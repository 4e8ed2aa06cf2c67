/*!
Parsing content streams into a tree of content objects.

A content stream is a flat sequence of operations, but several operators
come in pairs or groups that only make sense together: a path is built by
construction operators and ended by a painting operator, `BT`/`ET` bracket
a text object, `q`/`Q` a graphics state scope, and `BMC`/`BDC`/`EMC` a
marked-content sequence. [`ContentParser`] pairs these up and yields
[`ContentObject`]s, so that later stages can walk a tree instead of
re-discovering the structure.

```
use folio_syntax::content::{ContentObject, parse_all};

let objects = parse_all(b"q 1 0 0 1 10 10 cm 0 0 m 5 5 l S Q").unwrap();
assert!(matches!(&objects[0], ContentObject::LocalGraphicsState(children) if children.len() == 2));
```
*/

mod error;
mod inline_image;
mod ops;

pub use error::ContentError;
pub use inline_image::InlineImage;
pub use ops::Operator;

use crate::object::{Name, Number, Object};
use crate::parser::ObjectParser;
use crate::token::Token;
use log::warn;
use smallvec::SmallVec;

/// The operands of a single operation.
pub type OperandStack = SmallVec<[Object; 6]>;

/// Limits that keep pathological content streams in check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseLimits {
    /// The maximum nesting of `q`, `BT` and marked-content aggregates.
    pub max_depth: usize,
    /// The maximum size of the data of a single inline image.
    pub max_inline_image_bytes: usize,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self {
            max_depth: 256,
            max_inline_image_bytes: 64 * 1024 * 1024,
        }
    }
}

/// An operator together with its operands.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// The operator.
    pub operator: Operator,
    /// The operands, in stream order.
    pub operands: OperandStack,
    keyword: SmallVec<[u8; 4]>,
    offset: usize,
}

impl Operation {
    /// Create an operation for a known operator.
    pub fn new(operator: Operator, operands: impl IntoIterator<Item = Object>) -> Self {
        Self {
            operator,
            operands: operands.into_iter().collect(),
            keyword: operator.keyword().unwrap_or_default().into(),
            offset: 0,
        }
    }

    /// The operator keyword as written in the stream.
    pub fn keyword(&self) -> &[u8] {
        &self.keyword
    }

    /// The byte offset of the operator keyword in the stream.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The operand at `idx` as a number.
    pub fn number(&self, idx: usize) -> Option<Number> {
        self.operands.get(idx)?.as_number()
    }

    /// The operand at `idx` as an `f32`.
    pub fn f32(&self, idx: usize) -> Option<f32> {
        self.number(idx).map(|n| n.as_f32())
    }

    /// The first `N` operands as `f32`s.
    pub fn f32s<const N: usize>(&self) -> Option<[f32; N]> {
        let mut out = [0.0; N];

        for (idx, slot) in out.iter_mut().enumerate() {
            *slot = self.f32(idx)?;
        }

        Some(out)
    }

    /// The operand at `idx` as a name.
    pub fn name(&self, idx: usize) -> Option<&Name> {
        self.operands.get(idx)?.as_name()
    }
}

/// A node of a parsed content stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentObject {
    /// An operation that does not belong to any aggregate.
    Operation(Operation),
    /// Path construction operations followed by clipping and painting operations.
    Path(Vec<Operation>),
    /// The contents of a `BT` ... `ET` text object.
    Text(Vec<ContentObject>),
    /// The contents of a `q` ... `Q` scope.
    LocalGraphicsState(Vec<ContentObject>),
    /// A `BMC`/`BDC` ... `EMC` sequence.
    MarkedContent {
        /// The opening `BMC` or `BDC` operation.
        begin: Operation,
        /// The contents.
        children: Vec<ContentObject>,
    },
    /// A `BI` ... `ID` ... `EI` inline image.
    InlineImage(InlineImage),
    /// A `Do` operation.
    XObject(Operation),
    /// An `sh` operation.
    Shading(Operation),
}

impl ContentObject {
    /// Visit every leaf operation in stream order.
    ///
    /// The delimiters of aggregates (`q`, `Q`, `BT`, `ET`, `EMC`) are not
    /// leaves, but the opening `BMC`/`BDC` carries operands and is. Inline
    /// images are leaves of their own, reported as a `BI` operation.
    pub fn for_each_leaf(&self, f: &mut impl FnMut(&Operation)) {
        match self {
            Self::Operation(op) | Self::XObject(op) | Self::Shading(op) => f(op),
            Self::Path(ops) => ops.iter().for_each(f),
            Self::Text(children) | Self::LocalGraphicsState(children) => {
                children.iter().for_each(|c| c.for_each_leaf(f));
            }
            Self::MarkedContent { begin, children } => {
                f(begin);
                children.iter().for_each(|c| c.for_each_leaf(f));
            }
            Self::InlineImage(_) => f(&Operation::new(Operator::BeginInlineImage, [])),
        }
    }

    /// Flatten the object back into the operations it was parsed from,
    /// aggregate delimiters included.
    ///
    /// Inline images are represented by their `BI` operation only.
    pub fn operations(&self) -> Vec<Operation> {
        let mut out = Vec::new();
        self.push_operations(&mut out);
        out
    }

    fn push_operations(&self, out: &mut Vec<Operation>) {
        let (open, close, children) = match self {
            Self::Operation(op) | Self::XObject(op) | Self::Shading(op) => {
                out.push(op.clone());
                return;
            }
            Self::Path(ops) => {
                out.extend(ops.iter().cloned());
                return;
            }
            Self::InlineImage(_) => {
                out.push(Operation::new(Operator::BeginInlineImage, []));
                return;
            }
            Self::Text(children) => (
                Operation::new(Operator::BeginText, []),
                Operator::EndText,
                children,
            ),
            Self::LocalGraphicsState(children) => (
                Operation::new(Operator::SaveState, []),
                Operator::RestoreState,
                children,
            ),
            Self::MarkedContent { begin, children } => {
                (begin.clone(), Operator::EndMarkedContent, children)
            }
        };

        out.push(open);
        children.iter().for_each(|c| c.push_operations(out));
        out.push(Operation::new(close, []));
    }
}

/// Parses content streams into [`ContentObject`]s.
#[derive(Debug, Clone)]
pub struct ContentParser<'a> {
    parser: ObjectParser<'a>,
    limits: ParseLimits,
}

enum Step {
    Object(ContentObject),
    Close(Operation),
    End,
}

impl<'a> ContentParser<'a> {
    /// Create a parser with default limits.
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_limits(data, ParseLimits::default())
    }

    /// Create a parser with custom limits.
    pub fn with_limits(data: &'a [u8], limits: ParseLimits) -> Self {
        Self {
            parser: ObjectParser::for_content(data),
            limits,
        }
    }

    /// Parse the next top-level content object.
    ///
    /// Returns `Ok(None)` at the end of the stream.
    pub fn parse_next_object(&mut self) -> Result<Option<ContentObject>, ContentError> {
        match self.step(0)? {
            Step::Object(obj) => Ok(Some(obj)),
            Step::Close(op) => Err(ContentError::UnmatchedClose {
                operator: op.operator,
                offset: op.offset,
            }),
            Step::End => Ok(None),
        }
    }

    /// Parse all remaining top-level content objects.
    pub fn parse_all(mut self) -> Result<Vec<ContentObject>, ContentError> {
        let mut objects = vec![];

        while let Some(obj) = self.parse_next_object()? {
            objects.push(obj);
        }

        Ok(objects)
    }

    fn step(&mut self, depth: usize) -> Result<Step, ContentError> {
        let Some(op) = self.read_operation() else {
            return Ok(Step::End);
        };

        if op.operator.is_closing() {
            return Ok(Step::Close(op));
        }

        let obj = match op.operator {
            o if o.is_path_start() => ContentObject::Path(self.read_path(op)),
            Operator::BeginText => ContentObject::Text(self.read_children(op, depth)?),
            Operator::SaveState => {
                ContentObject::LocalGraphicsState(self.read_children(op, depth)?)
            }
            Operator::BeginMarkedContent | Operator::BeginMarkedContentProperties => {
                let children = self.read_children(op.clone(), depth)?;

                ContentObject::MarkedContent {
                    begin: op,
                    children,
                }
            }
            Operator::BeginInlineImage => ContentObject::InlineImage(inline_image::read(
                &mut self.parser,
                op.offset,
                &self.limits,
            )?),
            Operator::XObject => ContentObject::XObject(op),
            Operator::PaintShading => ContentObject::Shading(op),
            _ => ContentObject::Operation(op),
        };

        Ok(Step::Object(obj))
    }

    fn read_children(
        &mut self,
        begin: Operation,
        depth: usize,
    ) -> Result<Vec<ContentObject>, ContentError> {
        if depth + 1 > self.limits.max_depth {
            return Err(ContentError::NestingTooDeep {
                offset: begin.offset,
            });
        }

        // Only begin operators reach this point, so a closing operator exists.
        let expected = begin.operator.closing_operator().unwrap_or(Operator::Unknown);
        let mut children = vec![];

        loop {
            match self.step(depth + 1)? {
                Step::Object(obj) => children.push(obj),
                Step::Close(op) if op.operator == expected => return Ok(children),
                Step::Close(op) => {
                    return Err(ContentError::MismatchedClose {
                        expected,
                        found: op.operator,
                        offset: op.offset,
                    });
                }
                Step::End => {
                    warn!(
                        "content stream ended inside an aggregate opened at offset {}",
                        begin.offset
                    );

                    return Ok(children);
                }
            }
        }
    }

    fn read_path(&mut self, first: Operation) -> Vec<Operation> {
        let mut ops = vec![first];

        loop {
            let before = self.parser.lexer().offset();
            let Some(op) = self.read_operation() else {
                break;
            };

            let painted = ops.last().is_some_and(|o| o.operator.is_path_painting());
            let belongs = !painted
                && (op.operator.is_path_construction()
                    || op.operator.is_clip()
                    || op.operator.is_path_painting());

            if !belongs {
                self.parser.lexer().jump(before);
                break;
            }

            ops.push(op);
        }

        ops
    }

    /// Read operands up to the next operator keyword.
    fn read_operation(&mut self) -> Option<Operation> {
        let mut operands = OperandStack::new();

        loop {
            let offset = self.parser.lexer().offset();

            let Some(token) = self.parser.lexer().next_token() else {
                if !operands.is_empty() {
                    warn!("{} dangling operands at the end of the stream", operands.len());
                }

                return None;
            };

            match token {
                Token::Keyword(kw) if !matches!(kw, b"true" | b"false" | b"null") => {
                    let operator = Operator::from_keyword(kw);

                    if operator == Operator::Unknown {
                        warn!("unknown operator {}", String::from_utf8_lossy(kw));
                    }

                    return Some(Operation {
                        operator,
                        operands,
                        keyword: kw.into(),
                        offset: offset + leading_trivia(self.parser.lexer().reader().data(), offset),
                    });
                }
                token => match self.parser.object_from_token(token, 0) {
                    Some(obj) => operands.push(obj),
                    None => warn!("skipping invalid operand at offset {offset}"),
                },
            }
        }
    }
}

fn leading_trivia(data: &[u8], offset: usize) -> usize {
    let mut r = folio_common::byte::Reader::new_at(data, offset);
    crate::trivia::skip_white_spaces_and_comments(&mut r);

    r.offset() - offset
}

/// Parse a whole content stream with default limits.
pub fn parse_all(data: &[u8]) -> Result<Vec<ContentObject>, ContentError> {
    ContentParser::new(data).parse_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operators(ops: &[Operation]) -> Vec<Operator> {
        ops.iter().map(|o| o.operator).collect()
    }

    fn leaves(objects: &[ContentObject]) -> Vec<Operator> {
        let mut out = vec![];
        objects
            .iter()
            .for_each(|o| o.for_each_leaf(&mut |op| out.push(op.operator)));

        out
    }

    #[test]
    fn path_with_painting() {
        let objects = parse_all(b"0 0 m 10 0 l 10 10 l f").unwrap();

        assert_eq!(objects.len(), 1);
        let ContentObject::Path(ops) = &objects[0] else {
            panic!("expected a path");
        };
        assert_eq!(
            operators(ops),
            vec![
                Operator::MoveTo,
                Operator::LineTo,
                Operator::LineTo,
                Operator::Fill
            ]
        );
    }

    #[test]
    fn path_stops_before_foreign_operator() {
        let mut parser = ContentParser::new(b"0 0 m 10 0 l 0.5 g");

        let Some(ContentObject::Path(ops)) = parser.parse_next_object().unwrap() else {
            panic!("expected a path");
        };
        assert_eq!(operators(&ops), vec![Operator::MoveTo, Operator::LineTo]);

        let Some(ContentObject::Operation(op)) = parser.parse_next_object().unwrap() else {
            panic!("expected an operation");
        };
        assert_eq!(op.operator, Operator::FillGray);
        assert_eq!(op.f32(0), Some(0.5));
        assert_eq!(parser.parse_next_object(), Ok(None));
    }

    #[test]
    fn path_ends_after_painting() {
        let objects = parse_all(b"0 0 10 10 re W n 0 0 m 1 1 l S").unwrap();

        assert_eq!(objects.len(), 2);
        assert!(matches!(&objects[0], ContentObject::Path(ops) if ops.len() == 3));
        assert!(matches!(&objects[1], ContentObject::Path(ops) if ops.len() == 3));
    }

    #[test]
    fn nested_aggregates() {
        let objects =
            parse_all(b"q BT /F1 12 Tf (Hi) Tj ET /OC /P1 BDC 0 0 m 1 1 l S EMC Q").unwrap();

        let [ContentObject::LocalGraphicsState(children)] = objects.as_slice() else {
            panic!("expected one graphics state scope");
        };
        assert!(matches!(&children[0], ContentObject::Text(t) if t.len() == 2));
        assert!(
            matches!(&children[1], ContentObject::MarkedContent { begin, children } if begin.name(0).map(|n| n.as_bytes()) == Some(&b"OC"[..]) && children.len() == 1)
        );
    }

    #[test]
    fn unmatched_close_is_an_error() {
        assert!(matches!(
            parse_all(b"0 g Q"),
            Err(ContentError::UnmatchedClose {
                operator: Operator::RestoreState,
                offset: 4
            })
        ));
    }

    #[test]
    fn mismatched_close_is_an_error() {
        assert!(matches!(
            parse_all(b"q BT Q ET"),
            Err(ContentError::MismatchedClose {
                expected: Operator::EndText,
                found: Operator::RestoreState,
                ..
            })
        ));
    }

    #[test]
    fn unclosed_scope_at_end_is_fine() {
        let objects = parse_all(b"q 1 w").unwrap();
        assert!(matches!(&objects[0], ContentObject::LocalGraphicsState(c) if c.len() == 1));
    }

    #[test]
    fn nesting_limit() {
        let limits = ParseLimits {
            max_depth: 3,
            ..ParseLimits::default()
        };
        let data = b"q q q q Q Q Q Q";

        assert!(matches!(
            ContentParser::with_limits(data, limits).parse_all(),
            Err(ContentError::NestingTooDeep { offset: 6 })
        ));
        assert!(ContentParser::with_limits(b"q q q Q Q Q", limits).parse_all().is_ok());
    }

    #[test]
    fn xobject_and_shading_leaves() {
        let objects = parse_all(b"/Im1 Do /Sh1 sh").unwrap();

        assert!(matches!(&objects[0], ContentObject::XObject(op) if op.name(0).is_some()));
        assert!(matches!(&objects[1], ContentObject::Shading(_)));
    }

    #[test]
    fn inline_image() {
        let objects =
            parse_all(b"q BI /W 2 /H 1 /BPC 8 /CS /G ID \x01\x02\nEI Q 0 g").unwrap();

        let ContentObject::LocalGraphicsState(children) = &objects[0] else {
            panic!("expected a graphics state scope");
        };
        let ContentObject::InlineImage(image) = &children[0] else {
            panic!("expected an inline image");
        };
        assert_eq!(image.data(), b"\x01\x02");
        assert_eq!(
            image.dict().get::<Name>(b"ColorSpace"),
            Some(Name::new(&b"DeviceGray"[..]))
        );
        assert_eq!(image.dict().get::<u32>(b"Width"), Some(2));
        assert_eq!(objects.len(), 2);
    }

    #[test]
    fn inline_image_with_ei_in_data() {
        // The byte count of an unfiltered image is known, so `EI` inside the data is skipped.
        let objects = parse_all(b"BI /W 4 /H 1 /BPC 8 /CS /G ID E I EI").unwrap();
        let ContentObject::InlineImage(image) = &objects[0] else {
            panic!("expected an inline image");
        };
        assert_eq!(image.data(), b"E I ");

        let objects = parse_all(b"BI /W 4 /H 1 /F /AHx ID 4549 EI>\nEI").unwrap();
        let ContentObject::InlineImage(image) = &objects[0] else {
            panic!("expected an inline image");
        };
        assert_eq!(image.data(), b"4549 EI>");
    }

    #[test]
    fn leaves_in_stream_order() {
        let data = b"q 1 0 0 1 5 5 cm BT /F1 1 Tf (a) Tj ET 0 0 m 1 1 l S /X Do Q 2 w";
        let objects = parse_all(data).unwrap();

        assert_eq!(
            leaves(&objects),
            vec![
                Operator::Transform,
                Operator::TextFont,
                Operator::ShowText,
                Operator::MoveTo,
                Operator::LineTo,
                Operator::Stroke,
                Operator::XObject,
                Operator::LineWidth,
            ]
        );
    }

    #[test]
    fn unknown_operators_are_kept() {
        let objects = parse_all(b"1 2 foo").unwrap();
        let [ContentObject::Operation(op)] = objects.as_slice() else {
            panic!("expected one operation");
        };
        assert_eq!(op.operator, Operator::Unknown);
        assert_eq!(op.keyword(), b"foo");
        assert_eq!(op.operands.len(), 2);
    }

    #[test]
    fn flatten_back_to_operations() {
        let objects = parse_all(b"q BT (a) Tj ET /P BMC 0 0 m S EMC Q").unwrap();
        let ops = objects[0].operations();

        assert_eq!(
            operators(&ops),
            vec![
                Operator::SaveState,
                Operator::BeginText,
                Operator::ShowText,
                Operator::EndText,
                Operator::BeginMarkedContent,
                Operator::MoveTo,
                Operator::Stroke,
                Operator::EndMarkedContent,
                Operator::RestoreState,
            ]
        );
    }
}
