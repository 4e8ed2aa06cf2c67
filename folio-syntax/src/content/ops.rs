//! Content stream operators.

macro_rules! operators {
    ($($(#[$doc:meta])* $variant:ident => $kw:literal),* $(,)?) => {
        /// A content stream operator.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Operator {
            $($(#[$doc])* $variant,)*
            /// An operator keyword not defined by PDF. It is kept and ignored.
            Unknown,
        }

        impl Operator {
            /// Look up the operator for a keyword.
            pub fn from_keyword(kw: &[u8]) -> Self {
                match kw {
                    $($kw => Self::$variant,)*
                    _ => Self::Unknown,
                }
            }

            /// The keyword of a known operator.
            pub fn keyword(&self) -> Option<&'static [u8]> {
                match self {
                    $(Self::$variant => Some(&$kw[..]),)*
                    Self::Unknown => None,
                }
            }
        }
    };
}

operators! {
    /// `w`
    LineWidth => b"w",
    /// `J`
    LineCap => b"J",
    /// `j`
    LineJoin => b"j",
    /// `M`
    MiterLimit => b"M",
    /// `d`
    DashPattern => b"d",
    /// `ri`
    RenderingIntent => b"ri",
    /// `i`
    Flatness => b"i",
    /// `gs`
    SetGraphicsState => b"gs",
    /// `q`
    SaveState => b"q",
    /// `Q`
    RestoreState => b"Q",
    /// `cm`
    Transform => b"cm",
    /// `m`
    MoveTo => b"m",
    /// `l`
    LineTo => b"l",
    /// `c`
    CurveTo => b"c",
    /// `v`
    CurveToV => b"v",
    /// `y`
    CurveToY => b"y",
    /// `h`
    ClosePath => b"h",
    /// `re`
    Rectangle => b"re",
    /// `S`
    Stroke => b"S",
    /// `s`
    CloseStroke => b"s",
    /// `f`
    Fill => b"f",
    /// `F`
    FillCompat => b"F",
    /// `f*`
    FillEvenOdd => b"f*",
    /// `B`
    FillStroke => b"B",
    /// `B*`
    FillStrokeEvenOdd => b"B*",
    /// `b`
    CloseFillStroke => b"b",
    /// `b*`
    CloseFillStrokeEvenOdd => b"b*",
    /// `n`
    EndPath => b"n",
    /// `W`
    ClipNonZero => b"W",
    /// `W*`
    ClipEvenOdd => b"W*",
    /// `BT`
    BeginText => b"BT",
    /// `ET`
    EndText => b"ET",
    /// `Tc`
    CharSpacing => b"Tc",
    /// `Tw`
    WordSpacing => b"Tw",
    /// `Tz`
    HorizontalScaling => b"Tz",
    /// `TL`
    TextLeading => b"TL",
    /// `Tf`
    TextFont => b"Tf",
    /// `Tr`
    TextRenderingMode => b"Tr",
    /// `Ts`
    TextRise => b"Ts",
    /// `Td`
    NextLineOffset => b"Td",
    /// `TD`
    NextLineOffsetLeading => b"TD",
    /// `Tm`
    TextMatrix => b"Tm",
    /// `T*`
    NextLine => b"T*",
    /// `Tj`
    ShowText => b"Tj",
    /// `TJ`
    ShowTexts => b"TJ",
    /// `'`
    NextLineShowText => b"'",
    /// `"`
    NextLineShowTextSpacing => b"\"",
    /// `d0`
    Type3Width => b"d0",
    /// `d1`
    Type3WidthBBox => b"d1",
    /// `CS`
    StrokeColorSpace => b"CS",
    /// `cs`
    FillColorSpace => b"cs",
    /// `SC`
    StrokeColor => b"SC",
    /// `SCN`
    StrokeColorNamed => b"SCN",
    /// `sc`
    FillColor => b"sc",
    /// `scn`
    FillColorNamed => b"scn",
    /// `G`
    StrokeGray => b"G",
    /// `g`
    FillGray => b"g",
    /// `RG`
    StrokeRgb => b"RG",
    /// `rg`
    FillRgb => b"rg",
    /// `K`
    StrokeCmyk => b"K",
    /// `k`
    FillCmyk => b"k",
    /// `sh`
    PaintShading => b"sh",
    /// `BI`
    BeginInlineImage => b"BI",
    /// `ID`
    InlineImageData => b"ID",
    /// `EI`
    EndInlineImage => b"EI",
    /// `Do`
    XObject => b"Do",
    /// `MP`
    MarkedContentPoint => b"MP",
    /// `DP`
    MarkedContentPointProperties => b"DP",
    /// `BMC`
    BeginMarkedContent => b"BMC",
    /// `BDC`
    BeginMarkedContentProperties => b"BDC",
    /// `EMC`
    EndMarkedContent => b"EMC",
    /// `BX`
    BeginCompatibility => b"BX",
    /// `EX`
    EndCompatibility => b"EX",
}

impl Operator {
    /// Operators that start a new path.
    pub fn is_path_start(&self) -> bool {
        matches!(self, Self::MoveTo | Self::Rectangle)
    }

    /// Operators that extend the current path.
    pub fn is_path_construction(&self) -> bool {
        matches!(
            self,
            Self::MoveTo
                | Self::LineTo
                | Self::CurveTo
                | Self::CurveToV
                | Self::CurveToY
                | Self::ClosePath
                | Self::Rectangle
        )
    }

    /// Operators that mark the current path as a clipping path.
    pub fn is_clip(&self) -> bool {
        matches!(self, Self::ClipNonZero | Self::ClipEvenOdd)
    }

    /// Operators that paint (or discard) and end the current path.
    pub fn is_path_painting(&self) -> bool {
        matches!(
            self,
            Self::Stroke
                | Self::CloseStroke
                | Self::Fill
                | Self::FillCompat
                | Self::FillEvenOdd
                | Self::FillStroke
                | Self::FillStrokeEvenOdd
                | Self::CloseFillStroke
                | Self::CloseFillStrokeEvenOdd
                | Self::EndPath
        )
    }

    /// The closing operator of an aggregate opened by `self`.
    pub fn closing_operator(&self) -> Option<Self> {
        match self {
            Self::SaveState => Some(Self::RestoreState),
            Self::BeginText => Some(Self::EndText),
            Self::BeginMarkedContent | Self::BeginMarkedContentProperties => {
                Some(Self::EndMarkedContent)
            }
            _ => None,
        }
    }

    /// Whether the operator closes an aggregate.
    pub fn is_closing(&self) -> bool {
        matches!(
            self,
            Self::RestoreState | Self::EndText | Self::EndMarkedContent
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Operator;

    #[test]
    fn keywords() {
        assert_eq!(Operator::from_keyword(b"f*"), Operator::FillEvenOdd);
        assert_eq!(Operator::from_keyword(b"\""), Operator::NextLineShowTextSpacing);
        assert_eq!(Operator::from_keyword(b"xyz"), Operator::Unknown);
        assert_eq!(Operator::SetGraphicsState.keyword(), Some(&b"gs"[..]));
    }

    #[test]
    fn closing_pairs() {
        assert_eq!(
            Operator::BeginMarkedContentProperties.closing_operator(),
            Some(Operator::EndMarkedContent)
        );
        assert!(Operator::RestoreState.is_closing());
        assert_eq!(Operator::MoveTo.closing_operator(), None);
    }
}
