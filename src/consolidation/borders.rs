use crate::spreadsheet::sheet::Worksheet;
use crate::spreadsheet::style::BorderLine;
use crate::spreadsheet::style::Borders;
use std::ops::RangeInclusive;

/// Frames the evidence block as one visual unit and boxes the other framed columns.
///
/// Only the border part of cell styles is touched, so applying twice gives the same sheet.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BorderDecorator {
    /// First and last column of the evidence block
    pub evidence_block: Option<(u16, u16)>,
    /// Columns boxed on all four sides
    pub framed_columns: Vec<u16>,
}

impl BorderDecorator {
    pub fn new(evidence_block: Option<(u16, u16)>, framed_columns: Vec<u16>) -> Self {
        BorderDecorator {
            evidence_block,
            framed_columns,
        }
    }

    /// Applies the borders to every row in `rows`.
    pub fn apply(&self, sheet: &mut Worksheet, rows: RangeInclusive<u32>) {
        for row in rows {
            if let Some((first, last)) = self.evidence_block {
                for col in first..=last {
                    sheet.cell_mut(row, col).style.borders = block_borders(col, first, last);
                }
            }
            for &col in &self.framed_columns {
                sheet.cell_mut(row, col).style.borders = Borders::full();
            }
        }
    }
}

/// Borders of a block cell: the outer edge and both horizontal lines, no inner verticals
fn block_borders(col: u16, first: u16, last: u16) -> Borders {
    Borders {
        left: if col == first { BorderLine::THIN } else { BorderLine::default() },
        right: if col == last { BorderLine::THIN } else { BorderLine::default() },
        top: BorderLine::THIN,
        bottom: BorderLine::THIN,
    }
}

/// Final sizing of the consolidated sheet.
pub struct StyleFinisher;

impl StyleFinisher {
    /// Adds `increment` points to the height of every row in `rows`.
    ///
    /// Rows without an explicit height start from `default_height`.
    pub fn increase_row_heights(sheet: &mut Worksheet, rows: RangeInclusive<u32>, increment: f64, default_height: f64) {
        for row in rows {
            let height = sheet.row_height(row).unwrap_or(default_height);
            sheet.set_row_height(row, height + increment);
        }
    }

    pub fn apply_column_widths(sheet: &mut Worksheet, widths: &[(u16, f64)]) {
        for &(col, width) in widths {
            sheet.set_column_width(col, width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::style::BorderStyle;
    use crate::spreadsheet::style::CellStyle;
    use pretty_assertions::assert_eq;

    fn decorator() -> BorderDecorator {
        BorderDecorator::new(Some((5, 7)), vec![0, 1])
    }

    #[test]
    fn block_has_no_inner_verticals() {
        let mut sheet = Worksheet::new("LOC");
        decorator().apply(&mut sheet, 0..=1);

        let borders = |col| sheet.cell(1, col).unwrap().style.borders;
        assert_eq!(borders(5).left, BorderLine::THIN);
        assert!(borders(5).right.is_none());
        assert!(borders(6).left.is_none() && borders(6).right.is_none());
        assert_eq!(borders(6).top, BorderLine::THIN);
        assert_eq!(borders(7).right, BorderLine::THIN);
        assert!(borders(7).left.is_none());
        assert_eq!(borders(0), Borders::full());
        assert!(sheet.cell(2, 0).is_none());
        assert!(sheet.cell(1, 2).is_none());
    }

    #[test]
    fn single_column_block_is_boxed() {
        let mut sheet = Worksheet::new("LOC");
        BorderDecorator::new(Some((3, 3)), Vec::new()).apply(&mut sheet, 0..=0);
        assert_eq!(sheet.cell(0, 3).unwrap().style.borders, Borders::full());
    }

    #[test]
    fn apply_is_idempotent_and_keeps_values() {
        let mut sheet = Worksheet::new("LOC");
        let mut style = CellStyle::annexure_label();
        style.borders.left = BorderLine { style: BorderStyle::Double, color: Some(0xFF0000) };
        sheet.write(0, 6, "Annexure 1", style);
        sheet.write(0, 1, "Password policy", CellStyle::default());

        decorator().apply(&mut sheet, 0..=2);
        let once = sheet.clone();
        decorator().apply(&mut sheet, 0..=2);

        assert_eq!(sheet, once);
        assert_eq!(sheet.text(0, 6), "Annexure 1");
        assert_eq!(sheet.cell(0, 6).unwrap().style.font.color, Some(0xFF0000));
        assert!(sheet.cell(0, 6).unwrap().style.borders.left.is_none());
    }

    #[test]
    fn row_heights_grow_from_default() {
        let mut sheet = Worksheet::new("LOC");
        sheet.set_row_height(1, 30.0);
        StyleFinisher::increase_row_heights(&mut sheet, 0..=2, 15.0, 15.0);
        assert_eq!(sheet.row_heights().collect::<Vec<_>>(), vec![(0, 30.0), (1, 45.0), (2, 30.0)]);

        StyleFinisher::apply_column_widths(&mut sheet, &[(0, 15.0), (1, 60.0)]);
        assert_eq!(sheet.column_width(1), Some(60.0));
    }
}
