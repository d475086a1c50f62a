//! Cell formatting carried through a consolidation: fonts, fills, borders, alignment and
//! number formats. Colors are plain `0xRRGGBB` values.

/// Font of a cell
#[derive(Clone, Debug, PartialEq)]
pub struct Font {
    pub name: String,
    pub size: f64,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub color: Option<u32>,
}

impl Default for Font {
    fn default() -> Self {
        Font {
            name: "Calibri".to_owned(),
            size: 11.0,
            bold: false,
            italic: false,
            underline: false,
            color: None,
        }
    }
}

/// Line style of one border side, named as in SpreadsheetML
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum BorderStyle {
    #[default]
    None,
    Thin,
    Medium,
    Dashed,
    Dotted,
    Thick,
    Double,
    Hair,
    MediumDashed,
    DashDot,
    MediumDashDot,
    DashDotDot,
    MediumDashDotDot,
    SlantDashDot,
}

impl BorderStyle {
    /// Parses a `style` attribute value; unknown values yield `None`
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(Self::None),
            "thin" => Some(Self::Thin),
            "medium" => Some(Self::Medium),
            "dashed" => Some(Self::Dashed),
            "dotted" => Some(Self::Dotted),
            "thick" => Some(Self::Thick),
            "double" => Some(Self::Double),
            "hair" => Some(Self::Hair),
            "mediumDashed" => Some(Self::MediumDashed),
            "dashDot" => Some(Self::DashDot),
            "mediumDashDot" => Some(Self::MediumDashDot),
            "dashDotDot" => Some(Self::DashDotDot),
            "mediumDashDotDot" => Some(Self::MediumDashDotDot),
            "slantDashDot" => Some(Self::SlantDashDot),
            _ => None,
        }
    }
}

/// One border side
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BorderLine {
    pub style: BorderStyle,
    pub color: Option<u32>,
}

impl BorderLine {
    /// A thin line in the automatic color
    pub const THIN: BorderLine = BorderLine { style: BorderStyle::Thin, color: None };

    pub fn is_none(&self) -> bool {
        self.style == BorderStyle::None
    }
}

/// The four border sides of a cell
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Borders {
    pub left: BorderLine,
    pub right: BorderLine,
    pub top: BorderLine,
    pub bottom: BorderLine,
}

impl Borders {
    /// Thin lines on every side
    pub fn full() -> Self {
        Borders {
            left: BorderLine::THIN,
            right: BorderLine::THIN,
            top: BorderLine::THIN,
            bottom: BorderLine::THIN,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum HorizontalAlignment {
    #[default]
    General,
    Left,
    Center,
    Right,
    Fill,
    Justify,
    CenterAcross,
    Distributed,
}

impl HorizontalAlignment {
    pub fn parse(value: &str) -> Self {
        match value {
            "left" => Self::Left,
            "center" => Self::Center,
            "right" => Self::Right,
            "fill" => Self::Fill,
            "justify" => Self::Justify,
            "centerContinuous" => Self::CenterAcross,
            "distributed" => Self::Distributed,
            _ => Self::General,
        }
    }
}

/// Vertical alignment; SpreadsheetML defaults to bottom
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum VerticalAlignment {
    Top,
    Center,
    #[default]
    Bottom,
    Justify,
    Distributed,
}

impl VerticalAlignment {
    pub fn parse(value: &str) -> Self {
        match value {
            "top" => Self::Top,
            "center" => Self::Center,
            "justify" => Self::Justify,
            "distributed" => Self::Distributed,
            _ => Self::Bottom,
        }
    }
}

/// Number format: a builtin id or a custom format code
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NumberFormat {
    Builtin(u8),
    Custom(String),
}

impl Default for NumberFormat {
    fn default() -> Self {
        NumberFormat::Builtin(0)
    }
}

/// Complete style of a cell
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CellStyle {
    pub font: Font,
    /// Solid fill color
    pub fill: Option<u32>,
    pub borders: Borders,
    pub horizontal: HorizontalAlignment,
    pub vertical: VerticalAlignment,
    pub wrap_text: bool,
    pub number_format: NumberFormat,
}

impl CellStyle {
    /// The style of annexure labels: red Times New Roman 12, centered
    pub fn annexure_label() -> Self {
        CellStyle {
            font: Font {
                name: "Times New Roman".to_owned(),
                size: 12.0,
                color: Some(0xFF0000),
                ..Font::default()
            },
            horizontal: HorizontalAlignment::Center,
            vertical: VerticalAlignment::Center,
            ..CellStyle::default()
        }
    }

    /// The style of evidence header cells: bold white Times New Roman 12 on dark blue
    pub fn evidence_header() -> Self {
        CellStyle {
            font: Font {
                name: "Times New Roman".to_owned(),
                size: 12.0,
                bold: true,
                color: Some(0xFFFFFF),
                ..Font::default()
            },
            fill: Some(0x00008B),
            horizontal: HorizontalAlignment::Center,
            vertical: VerticalAlignment::Center,
            wrap_text: true,
            ..CellStyle::default()
        }
    }
}

/// Parses an ARGB or RGB hex color ("FF00008B", "00008B") into `0xRRGGBB`.
pub(crate) fn parse_color(value: &str) -> Option<u32> {
    let hex = match value.len() {
        8 => &value[2..],
        6 => value,
        _ => return None,
    };
    u32::from_str_radix(hex, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors() {
        assert_eq!(parse_color("FF00008B"), Some(0x00008B));
        assert_eq!(parse_color("FF0000"), Some(0xFF0000));
        assert_eq!(parse_color("theme"), None);
    }

    #[test]
    fn border_styles() {
        assert_eq!(BorderStyle::parse("mediumDashDotDot"), Some(BorderStyle::MediumDashDotDot));
        assert_eq!(BorderStyle::parse("wavy"), None);
        assert!(Borders::default().left.is_none());
        assert_eq!(Borders::full().bottom, BorderLine::THIN);
    }
}
