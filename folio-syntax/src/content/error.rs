use crate::content::Operator;
use std::fmt;

/// A structural error in a content stream.
///
/// These errors make the whole stream unusable. Recoverable oddities such
/// as unknown operators or malformed operands are skipped with a warning
/// instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentError {
    /// A closing operator (`Q`, `ET`, `EMC`) without an open aggregate.
    UnmatchedClose {
        /// The closing operator.
        operator: Operator,
        /// The byte offset of the operator.
        offset: usize,
    },
    /// A closing operator that does not match the innermost open aggregate.
    MismatchedClose {
        /// The operator that would close the innermost aggregate.
        expected: Operator,
        /// The operator that was found.
        found: Operator,
        /// The byte offset of the operator.
        offset: usize,
    },
    /// Aggregates are nested deeper than the configured limit.
    NestingTooDeep {
        /// The byte offset of the opening operator.
        offset: usize,
    },
    /// An inline image without an `EI` terminator.
    UnterminatedInlineImage {
        /// The byte offset where the image data starts.
        offset: usize,
    },
    /// An inline image whose data exceeds the configured limit.
    InlineImageTooLarge {
        /// The byte offset where the image data starts.
        offset: usize,
    },
    /// An inline image header without an `ID` operator.
    MalformedInlineImage {
        /// The byte offset of the `BI` operator.
        offset: usize,
    },
}

impl fmt::Display for ContentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kw = |op: &Operator| {
            op.keyword()
                .map(|k| String::from_utf8_lossy(k).into_owned())
                .unwrap_or_else(|| "?".to_string())
        };

        match self {
            Self::UnmatchedClose { operator, offset } => write!(
                f,
                "unmatched `{}` at offset {offset}",
                kw(operator)
            ),
            Self::MismatchedClose {
                expected,
                found,
                offset,
            } => write!(
                f,
                "expected `{}` but found `{}` at offset {offset}",
                kw(expected),
                kw(found)
            ),
            Self::NestingTooDeep { offset } => {
                write!(f, "content nested too deeply at offset {offset}")
            }
            Self::UnterminatedInlineImage { offset } => {
                write!(f, "inline image at offset {offset} has no EI terminator")
            }
            Self::InlineImageTooLarge { offset } => {
                write!(f, "inline image at offset {offset} exceeds the size limit")
            }
            Self::MalformedInlineImage { offset } => {
                write!(f, "inline image header at offset {offset} is malformed")
            }
        }
    }
}

impl std::error::Error for ContentError {}
