use crate::error::EvidenceSheetError;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::range::CellRange;
use crate::spreadsheet::style::CellStyle;
use crate::spreadsheet::SpreadsheetError;
use std::collections::BTreeMap;

/// An image placed over the grid, anchored at a cell with a pixel offset inside it.
#[derive(Clone, Debug, PartialEq)]
pub struct EmbeddedImage {
    /// Original file name of the image
    pub name: String,
    /// Encoded image payload (png, jpeg, gif or bmp)
    pub data: Vec<u8>,
    /// Anchor cell row (0-based)
    pub row: u32,
    /// Anchor cell column (0-based)
    pub col: u16,
    /// Horizontal offset inside the anchor cell in pixels
    pub x_offset: u32,
    /// Vertical offset inside the anchor cell in pixels
    pub y_offset: u32,
    /// Displayed width in pixels
    pub width: f64,
    /// Displayed height in pixels
    pub height: f64,
}

/// A single worksheet: sparse cells, merged ranges, sizing and images.
///
/// Only the anchor (top-left) cell of a merged range carries a value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Worksheet {
    /// Sheet name
    pub name: String,
    cells: BTreeMap<(u32, u16), Cell>,
    merged_ranges: Vec<CellRange>,
    column_widths: BTreeMap<u16, f64>,
    row_heights: BTreeMap<u32, f64>,
    images: Vec<EmbeddedImage>,
}

impl Worksheet {
    /// Creates an empty worksheet.
    pub fn new(name: &str) -> Self {
        Worksheet {
            name: name.to_owned(),
            ..Worksheet::default()
        }
    }

    /// Returns true if the sheet contains no cells, merges or images.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty() && self.merged_ranges.is_empty() && self.images.is_empty()
    }

    pub fn cell(&self, row: u32, col: u16) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    /// Gets a cell for modification, creating a blank one if needed.
    pub fn cell_mut(&mut self, row: u32, col: u16) -> &mut Cell {
        self.cells.entry((row, col)).or_default()
    }

    pub fn set_cell(&mut self, row: u32, col: u16, cell: Cell) {
        self.cells.insert((row, col), cell);
    }

    /// Sets the value of a cell, keeping its style.
    pub fn set_value(&mut self, row: u32, col: u16, value: impl Into<CellValue>) {
        self.cell_mut(row, col).value = value.into();
    }

    /// Sets both value and style of a cell.
    pub fn write(&mut self, row: u32, col: u16, value: impl Into<CellValue>, style: CellStyle) {
        self.cells.insert((row, col), Cell::new(value, style));
    }

    /// Displayed text of a cell, empty for missing cells.
    pub fn text(&self, row: u32, col: u16) -> String {
        self.cell(row, col)
            .map(|cell| cell.value.to_string())
            .unwrap_or_default()
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (u32, u16, &Cell)> {
        self.cells.iter().map(|(&(row, col), cell)| (row, col, cell))
    }

    /// Cells of one row in column order.
    pub fn row_cells(&self, row: u32) -> impl Iterator<Item = (u16, &Cell)> {
        self.cells
            .range((row, 0)..=(row, u16::MAX))
            .map(|(&(_, col), cell)| (col, cell))
    }

    /// Last row holding a cell or covered by a merged range.
    pub fn last_row(&self) -> Option<u32> {
        let cell_row = self.cells.keys().next_back().map(|&(row, _)| row);
        let merged_row = self.merged_ranges.iter().map(|range| range.last_row).max();
        cell_row.max(merged_row)
    }

    /// Last column holding a cell or covered by a merged range.
    pub fn last_column(&self) -> Option<u16> {
        let cell_col = self.cells.keys().map(|&(_, col)| col).max();
        let merged_col = self.merged_ranges.iter().map(|range| range.last_col).max();
        cell_col.max(merged_col)
    }

    /// Last row whose cell in `col` has a non-empty value.
    pub fn last_row_in_column(&self, col: u16) -> Option<u32> {
        self.cells
            .iter()
            .filter(|((_, c), cell)| *c == col && !cell.value.is_empty())
            .map(|(&(row, _), _)| row)
            .max()
    }

    pub fn merged_ranges(&self) -> &[CellRange] {
        &self.merged_ranges
    }

    /// Merges a block of cells.
    ///
    /// Fails when the range overlaps an existing merged range. Values of the covered
    /// non-anchor cells are cleared; their styles stay.
    pub fn add_merged_range(&mut self, range: CellRange) -> Result<(), EvidenceSheetError> {
        if let Some(existing) = self.merged_ranges.iter().find(|existing| existing.overlaps(&range)) {
            Err(SpreadsheetError::OverlappingMergedRange(range.to_string(), existing.to_string()))?;
        }
        for (&(row, col), cell) in self.cells.range_mut((range.first_row, 0)..=(range.last_row, u16::MAX)) {
            if range.contains(row, col) && (row, col) != (range.first_row, range.first_col) {
                cell.value = CellValue::Empty;
            }
        }
        self.merged_ranges.push(range);
        Ok(())
    }

    /// The merged range anchored or covering (row, col).
    pub fn merged_range_at(&self, row: u32, col: u16) -> Option<&CellRange> {
        self.merged_ranges.iter().find(|range| range.contains(row, col))
    }

    pub fn column_width(&self, col: u16) -> Option<f64> {
        self.column_widths.get(&col).copied()
    }

    /// Sets a column width in character units.
    pub fn set_column_width(&mut self, col: u16, width: f64) {
        self.column_widths.insert(col, width);
    }

    pub fn column_widths(&self) -> impl Iterator<Item = (u16, f64)> + '_ {
        self.column_widths.iter().map(|(&col, &width)| (col, width))
    }

    pub fn row_height(&self, row: u32) -> Option<f64> {
        self.row_heights.get(&row).copied()
    }

    /// Sets a row height in points.
    pub fn set_row_height(&mut self, row: u32, height: f64) {
        self.row_heights.insert(row, height);
    }

    pub fn row_heights(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.row_heights.iter().map(|(&row, &height)| (row, height))
    }

    pub fn images(&self) -> &[EmbeddedImage] {
        &self.images
    }

    pub fn add_image(&mut self, image: EmbeddedImage) {
        self.images.push(image);
    }

    /// Images anchored in the given row.
    pub fn images_in_row(&self, row: u32) -> impl Iterator<Item = &EmbeddedImage> {
        self.images.iter().filter(move |image| image.row == row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::style::Borders;
    use pretty_assertions::assert_eq;

    fn sheet() -> Worksheet {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_value(0, 0, "Sl No");
        sheet.set_value(0, 1, "Control");
        sheet.set_value(1, 0, 1.0);
        sheet.set_value(3, 2, "");
        sheet
    }

    #[test]
    fn sheet_bounds() {
        let mut sheet = sheet();
        assert_eq!(sheet.last_row(), Some(3));
        assert_eq!(sheet.last_column(), Some(2));
        assert_eq!(sheet.last_row_in_column(0), Some(1));
        assert_eq!(sheet.last_row_in_column(2), None);

        sheet.add_merged_range(CellRange::new(5, 0, 6, 4)).unwrap();
        assert_eq!(sheet.last_row(), Some(6));
        assert_eq!(sheet.last_column(), Some(4));
        assert!(Worksheet::new("Empty").last_row().is_none());
    }

    #[test]
    fn sheet_merge_clears_covered_values() {
        let mut sheet = sheet();
        sheet.cell_mut(0, 1).style.borders = Borders::full();
        sheet.add_merged_range(CellRange::new(0, 0, 0, 1)).unwrap();

        assert_eq!(sheet.text(0, 0), "Sl No");
        assert_eq!(sheet.text(0, 1), "");
        assert_eq!(sheet.cell(0, 1).unwrap().style.borders, Borders::full());
        assert_eq!(sheet.merged_range_at(0, 1), Some(&CellRange::new(0, 0, 0, 1)));
    }

    #[test]
    fn sheet_merge_rejects_overlap() {
        let mut sheet = sheet();
        sheet.add_merged_range(CellRange::new(0, 5, 0, 10)).unwrap();
        assert!(sheet.add_merged_range(CellRange::new(0, 10, 1, 11)).is_err());
        assert!(sheet.add_merged_range(CellRange::new(1, 5, 1, 10)).is_ok());
        assert_eq!(sheet.merged_ranges().len(), 2);
    }

    #[test]
    fn sheet_rows() {
        let sheet = sheet();
        let columns: Vec<u16> = sheet.row_cells(0).map(|(col, _)| col).collect();
        assert_eq!(columns, vec![0, 1]);
        assert_eq!(sheet.cells().count(), 4);
    }
}
