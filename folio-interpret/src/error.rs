use folio_syntax::content::ContentError;
use std::fmt;

/// An error that makes a content stream impossible to render.
///
/// Everything else (broken images, unsupported shadings, missing resources)
/// is skipped with a warning, so that the rest of the page still renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderError {
    /// The content stream is structurally malformed.
    Content(ContentError),
    /// A graphics state was restored without a matching save.
    StateUnderflow,
    /// Form XObjects or patterns are nested deeper than allowed.
    FormTooDeep {
        /// The configured limit.
        limit: usize,
    },
    /// An `sh` operator referenced a shading of an unknown type that has no
    /// `Background` to fall back to.
    UnknownShadingType(i64),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Content(e) => write!(f, "malformed content stream: {e}"),
            Self::StateUnderflow => write!(f, "graphics state restored without a matching save"),
            Self::FormTooDeep { limit } => {
                write!(f, "forms and patterns nested deeper than {limit} levels")
            }
            Self::UnknownShadingType(t) => write!(f, "unknown shading type {t}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Content(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ContentError> for RenderError {
    fn from(e: ContentError) -> Self {
        Self::Content(e)
    }
}
