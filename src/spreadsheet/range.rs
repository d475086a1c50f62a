use crate::error::EvidenceSheetError;
use crate::spreadsheet::reference::col_to_index;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::reference::row_to_index;
use regex::Regex;
use std::fmt::Display;
use thiserror::Error;

/// Errors related to Excel-style range parsing.
#[derive(Error, Debug)]
pub enum RangeError {
    #[error("Invalid range format '{0}'")]
    FormatError(String),
}

/// A rectangular block of cells, such as a merged-cell range.
/// Bounds are 0-based and inclusive.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRange {
    pub first_row: u32,
    pub first_col: u16,
    pub last_row: u32,
    pub last_col: u16,
}

impl CellRange {
    /// Creates a range from two corners in any order.
    pub fn new(row1: u32, col1: u16, row2: u32, col2: u16) -> Self {
        CellRange {
            first_row: row1.min(row2),
            first_col: col1.min(col2),
            last_row: row1.max(row2),
            last_col: col1.max(col2),
        }
    }

    /// Checks whether the cell at (row, col) lies inside the range.
    pub fn contains(&self, row: u32, col: u16) -> bool {
        (self.first_row..=self.last_row).contains(&row) && (self.first_col..=self.last_col).contains(&col)
    }

    /// Checks whether two ranges share at least one cell.
    pub fn overlaps(&self, other: &CellRange) -> bool {
        self.first_row <= other.last_row
            && other.first_row <= self.last_row
            && self.first_col <= other.last_col
            && other.first_col <= self.last_col
    }

    /// Whether the range covers a single cell only.
    pub fn is_single_cell(&self) -> bool {
        self.first_row == self.last_row && self.first_col == self.last_col
    }

    /// Moves the range `offset` rows down, `None` when it would leave the sheet.
    pub fn shift_rows(&self, offset: i64) -> Option<CellRange> {
        let first_row = u32::try_from(self.first_row as i64 + offset).ok()?;
        let last_row = u32::try_from(self.last_row as i64 + offset).ok()?;
        Some(CellRange { first_row, last_row, ..*self })
    }
}

impl TryFrom<&str> for CellRange {
    type Error = EvidenceSheetError;

    /// Parses an Excel-style range ("B2:D4", "$A$1:$C$1") or a single cell ("C7").
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let pattern = Regex::new(r"^\$?([A-Z]+)\$?(\d+)(?::\$?([A-Z]+)\$?(\d+))?$").expect("Hardcode regex pattern");
        let value = value.trim().to_ascii_uppercase();
        let captures = pattern
            .captures(value.as_str())
            .ok_or_else(|| RangeError::FormatError(value.to_owned()))?;
        let error = || RangeError::FormatError(value.to_owned());
        let first_col = col_to_index(&captures[1]).ok_or_else(error)?;
        let first_row = row_to_index(&captures[2]).ok_or_else(error)?;
        let (last_col, last_row) = match captures.get(3).zip(captures.get(4)) {
            Some((col, row)) => (
                col_to_index(col.as_str()).ok_or_else(error)?,
                row_to_index(row.as_str()).ok_or_else(error)?,
            ),
            None => (first_col, first_row),
        };
        Ok(CellRange::new(first_row, first_col, last_row, last_col))
    }
}

impl Display for CellRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}",
            index_to_reference(self.first_row, self.first_col),
            index_to_reference(self.last_row, self.last_col)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ranges() {
        let range = CellRange::try_from("b2:d4").unwrap();
        assert_eq!(range, CellRange { first_row: 1, first_col: 1, last_row: 3, last_col: 3 });
        assert_eq!(range.to_string(), "B2:D4");

        let range = CellRange::try_from("$F$1:$K$1").unwrap();
        assert_eq!(range, CellRange::new(0, 5, 0, 10));

        let range = CellRange::try_from("C7").unwrap();
        assert!(range.is_single_cell());

        assert!(CellRange::try_from("A:B").is_err());
        assert!(CellRange::try_from("A0:B2").is_err());
    }

    #[test]
    fn corners_are_normalized() {
        assert_eq!(CellRange::new(4, 3, 1, 0), CellRange::new(1, 0, 4, 3));
    }

    #[test]
    fn overlap_and_containment() {
        let range = CellRange::new(1, 1, 3, 3);
        assert!(range.contains(2, 2));
        assert!(!range.contains(4, 2));
        assert!(range.overlaps(&CellRange::new(3, 3, 5, 5)));
        assert!(!range.overlaps(&CellRange::new(4, 0, 5, 5)));
    }

    #[test]
    fn shift() {
        let range = CellRange::new(1, 0, 2, 3);
        assert_eq!(range.shift_rows(10), Some(CellRange::new(11, 0, 12, 3)));
        assert_eq!(range.shift_rows(-1), Some(CellRange::new(0, 0, 1, 3)));
        assert_eq!(range.shift_rows(-2), None);
    }
}
