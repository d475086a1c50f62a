use crate::spreadsheet::style::CellStyle;
use std::fmt::Display;

/// Value stored in a cell.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Boolean(bool),
    /// Formula with its last calculated result, kept so readers without a
    /// calculation engine still see a value
    Formula { expression: String, cached: Option<String> },
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.is_empty(),
            _ => false,
        }
    }

    /// Numeric value of a number, or of a text/cached result that parses as one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(number) => Some(*number),
            CellValue::Text(text) => text.trim().parse().ok(),
            CellValue::Formula { cached: Some(cached), .. } => cached.trim().parse().ok(),
            _ => None,
        }
    }
}

impl Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(text) => write!(f, "{}", text),
            CellValue::Number(number) if number.fract() == 0.0 && number.abs() < 1e15 => write!(f, "{}", *number as i64),
            CellValue::Number(number) => write!(f, "{}", number),
            CellValue::Boolean(true) => write!(f, "TRUE"),
            CellValue::Boolean(false) => write!(f, "FALSE"),
            CellValue::Formula { cached, .. } => write!(f, "{}", cached.as_deref().unwrap_or_default()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_owned())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Boolean(value)
    }
}

/// A cell of a worksheet: its value and complete style.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub style: CellStyle,
}

impl Cell {
    pub fn new(value: impl Into<CellValue>, style: CellStyle) -> Self {
        Cell { value: value.into(), style }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_values() {
        assert_eq!(CellValue::Number(3.0).to_string(), "3");
        assert_eq!(CellValue::Number(2.5).to_string(), "2.5");
        assert_eq!(CellValue::Boolean(true).to_string(), "TRUE");
        assert_eq!(CellValue::from("A").to_string(), "A");
        assert_eq!(CellValue::Empty.to_string(), "");
        let formula = CellValue::Formula { expression: "SUM(D2:D4)".to_owned(), cached: Some("12".to_owned()) };
        assert_eq!(formula.to_string(), "12");
    }

    #[test]
    fn numeric_values() {
        assert_eq!(CellValue::from(" 7 ").as_number(), Some(7.0));
        assert_eq!(CellValue::from("Yes").as_number(), None);
        assert!(CellValue::from("").is_empty());
        assert!(!CellValue::Number(0.0).is_empty());
    }
}
