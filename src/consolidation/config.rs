//! Run configuration and the deployment profiles of the audit worksheets.
use crate::consolidation::config::ConfigError::InvalidParameter;
use crate::consolidation::evidence::ImageScaling;
use crate::consolidation::evidence::SlotBox;
use crate::consolidation::locator::LocateStrategy;
use crate::consolidation::naming::KeyGrammar;
use crate::consolidation::naming::NamingRules;
use crate::error::EvidenceSheetError;
use crate::spreadsheet::reference::col_to_index;
use crate::spreadsheet::style::CellStyle;
use crate::spreadsheet::style::Font;
use regex::Regex;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {name} parameter: {message}")]
    InvalidParameter { name: String, message: String },
}

/// Header written above the evidence columns.
#[derive(Clone, Debug, PartialEq)]
pub struct EvidenceHeader {
    /// Text of row 0 in the annexure column
    pub annexure_label: String,
    /// Text of the evidence block, merged across row 0
    pub block_label: String,
    pub style: CellStyle,
}

/// A labelled total appended below the consolidated rows.
#[derive(Clone, Debug, PartialEq)]
pub struct SummaryRow {
    pub label: String,
    pub label_column: u16,
    /// Column summed from row 1 down to the last consolidated row
    pub total_column: u16,
}

/// Everything a consolidation run needs to know about one deployment.
///
/// Column indexes are 0-based; use [`column`] to write them as letters.
#[derive(Clone, Debug, PartialEq)]
pub struct ConsolidationConfig {
    /// Name of the consolidated worksheet
    pub sheet_name: String,
    pub naming: NamingRules,
    pub locate: LocateStrategy,
    /// Column holding section numbers and item letters
    pub marker_column: u16,
    /// Column receiving "Annexure n" labels
    pub annexure_column: u16,
    /// Image columns in placement priority order
    pub slot_columns: Vec<u16>,
    pub max_slots_per_row: usize,
    pub scaling: ImageScaling,
    /// Centers images inside a box of this size when set
    pub centering: Option<SlotBox>,
    /// First and last column framed as one evidence block
    pub evidence_block: Option<(u16, u16)>,
    /// Columns framed on all four sides
    pub framed_columns: Vec<u16>,
    pub row_height_increment: f64,
    /// Height assumed for rows without an explicit height
    pub default_row_height: f64,
    pub column_widths: Vec<(u16, f64)>,
    pub evidence_header: Option<EvidenceHeader>,
    pub summary_rows: Vec<SummaryRow>,
    /// Fails the run when no evidence archive is supplied
    pub require_evidence: bool,
    /// Font and alignment of the annexure labels
    pub annexure_style: CellStyle,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self::level_of_compliance()
    }
}

impl ConsolidationConfig {
    /// The "LOC" worksheet: `Level N` fragments, `3_D` evidence names scanned in column A,
    /// up to six images in G..K then F, shrunk thirty times.
    pub fn level_of_compliance() -> Self {
        let mut column_widths = vec![(col("A"), 15.0), (col("B"), 60.0), (col("C"), 20.0), (col("D"), 60.0)];
        column_widths.extend(cols(&["E", "F", "G", "H", "I", "J", "K"]).into_iter().map(|col| (col, 20.0)));
        ConsolidationConfig {
            sheet_name: "LOC".to_owned(),
            naming: NamingRules {
                order_keywords: vec!["level".to_owned()],
                grammar: KeyGrammar::AlphanumericPair,
                ..NamingRules::default()
            },
            locate: LocateStrategy::Scan,
            marker_column: col("A"),
            annexure_column: col("E"),
            slot_columns: cols(&["G", "H", "I", "J", "K", "F"]),
            max_slots_per_row: 6,
            scaling: ImageScaling::Divisor(30.0),
            centering: None,
            evidence_block: Some((col("F"), col("K"))),
            framed_columns: cols(&["A", "B", "C", "D", "E"]),
            row_height_increment: 15.0,
            default_row_height: 15.0,
            column_widths,
            evidence_header: Some(EvidenceHeader {
                annexure_label: "POC Attached".to_owned(),
                block_label: "POC".to_owned(),
                style: CellStyle::evidence_header(),
            }),
            summary_rows: Vec::new(),
            require_evidence: false,
            annexure_style: CellStyle::annexure_label(),
        }
    }

    /// The "VICS" worksheet: `Part N` fragments, evidence named `"3_3-..."` bound to the
    /// question "3.3" in column A, with a grand total of the marks column.
    pub fn part_questionnaire() -> Self {
        ConsolidationConfig {
            sheet_name: "VICS".to_owned(),
            naming: NamingRules {
                order_keywords: vec!["part".to_owned()],
                grammar: KeyGrammar::NumericPair,
                ..NamingRules::default()
            },
            locate: LocateStrategy::Exact,
            slot_columns: cols(&["I", "J", "K", "L", "M", "H"]),
            evidence_block: Some((col("H"), col("M"))),
            framed_columns: cols(&["A", "B", "C", "D", "E", "F", "G"]),
            annexure_column: col("G"),
            column_widths: Vec::new(),
            evidence_header: None,
            summary_rows: vec![SummaryRow {
                label: "Grand Total".to_owned(),
                label_column: col("B"),
                total_column: col("E"),
            }],
            ..Self::level_of_compliance()
        }
    }

    /// Application review worksheets: evidence named `"<prefix>.<item> ..."` for items 1 to 41,
    /// at most three images in J, K, I centered in 25 pixel high slots.
    ///
    /// # Arguments
    /// * `prefix` - Worksheet number evidence names must start with, such as `"17"`
    pub fn application_review(prefix: &str) -> Self {
        ConsolidationConfig {
            sheet_name: "Application Review".to_owned(),
            naming: NamingRules {
                grammar: KeyGrammar::DottedPrefix,
                required_prefix: Some(prefix.to_owned()),
                item_range: Some(1..=41),
                ..NamingRules::default()
            },
            locate: LocateStrategy::Scan,
            marker_column: col("A"),
            annexure_column: col("H"),
            slot_columns: cols(&["J", "K", "I"]),
            max_slots_per_row: 3,
            scaling: ImageScaling::FixedHeight(25.0),
            centering: Some(SlotBox { width: 96.0, height: 25.0 }),
            evidence_block: Some((col("I"), col("K"))),
            framed_columns: Vec::new(),
            row_height_increment: 10.0,
            default_row_height: 20.0,
            column_widths: cols(&["I", "J", "K"]).into_iter().map(|col| (col, 12.0)).collect(),
            evidence_header: Some(EvidenceHeader {
                annexure_label: "POC Attached".to_owned(),
                block_label: "POC".to_owned(),
                style: CellStyle {
                    font: Font {
                        size: 12.0,
                        bold: true,
                        color: Some(0xFFFFFF),
                        ..Font::default()
                    },
                    fill: Some(0x366092),
                    wrap_text: false,
                    ..CellStyle::evidence_header()
                },
            }),
            summary_rows: Vec::new(),
            require_evidence: false,
            annexure_style: CellStyle::annexure_label(),
        }
    }

    /// The "Internet Banking" worksheet: evidence `"18.<item> ..."` for items 1 to 29 placed
    /// on row `item + 1`, laid out like [`ConsolidationConfig::application_review`].
    pub fn internet_banking() -> Self {
        let mut config = Self::application_review("18");
        config.sheet_name = "Internet Banking".to_owned();
        config.naming.item_range = Some(1..=29);
        config.locate = LocateStrategy::Arithmetic { base_offset: 0 };
        config.marker_column = col("F");
        config
    }

    /// Checks the configuration before a run.
    pub fn validate(&self) -> Result<(), EvidenceSheetError> {
        let name = self.sheet_name.trim();
        if name.is_empty() || name.chars().count() > 31 {
            Err(invalid("sheet_name", "must have 1 to 31 characters"))?;
        }
        if name.contains(['[', ']', ':', '*', '?', '/', '\\']) {
            Err(invalid("sheet_name", "must not contain []:*?/\\"))?;
        }

        if self.naming.grammar == KeyGrammar::DottedPrefix {
            match &self.naming.required_prefix {
                Some(prefix) if !prefix.trim().is_empty() => {}
                _ => Err(invalid("required_prefix", "dotted evidence names need a worksheet prefix"))?,
            }
        }

        if self.slot_columns.is_empty() {
            Err(invalid("slot_columns", "at least one slot column is required"))?;
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = self.slot_columns.iter().find(|&&col| !seen.insert(col)) {
            Err(invalid("slot_columns", &format!("column {} is listed twice", duplicate)))?;
        }
        if self.slot_columns.contains(&self.annexure_column) {
            Err(invalid("annexure_column", "must not be a slot column"))?;
        }
        if self.max_slots_per_row == 0 {
            Err(invalid("max_slots_per_row", "must be at least 1"))?;
        }

        let scale = match self.scaling {
            ImageScaling::FixedHeight(height) => height,
            ImageScaling::Divisor(divisor) => divisor,
        };
        if !scale.is_finite() || scale <= 0.0 {
            Err(invalid("scaling", "must be a positive number"))?;
        }
        if let Some(slot) = &self.centering {
            if !(slot.width >= 0.0 && slot.height >= 0.0) {
                Err(invalid("centering", "slot size must not be negative"))?;
            }
        }
        if let Some((first, last)) = self.evidence_block {
            if first > last {
                Err(invalid("evidence_block", "first column is after last column"))?;
            }
        }

        if !(self.row_height_increment >= 0.0 && self.row_height_increment <= 409.0) {
            Err(invalid("row_height_increment", "must be between 0 and 409"))?;
        }
        if !(self.default_row_height > 0.0 && self.default_row_height <= 409.0) {
            Err(invalid("default_row_height", "must be between 0 and 409"))?;
        }
        if let Some((col, width)) = self.column_widths.iter().find(|(_, width)| !(0.0..=255.0).contains(width)) {
            Err(invalid("column_widths", &format!("width {} of column {} is not between 0 and 255", width, col)))?;
        }
        if let Some(row) = self.summary_rows.iter().find(|row| row.label_column == row.total_column) {
            Err(invalid("summary_rows", &format!("'{}' uses the same column for label and total", row.label)))?;
        }
        Ok(())
    }
}

/// Parses column letters ("A", "AB", "$F") into a 0-based column index.
pub fn column(letters: &str) -> Result<u16, EvidenceSheetError> {
    let pattern = Regex::new(r"^\$?([A-Za-z]{1,3})$").expect("Hardcode regex pattern");
    let captures = pattern.captures(letters.trim()).ok_or(invalid("column", &format!("'{}' is not a column", letters)))?;
    let col = col_to_index(&captures[1]).ok_or(invalid("column", &format!("'{}' is beyond XFD", letters)))?;
    Ok(col)
}

/// Parses a list of column letters, keeping their order.
pub fn columns(letters: &[&str]) -> Result<Vec<u16>, EvidenceSheetError> {
    letters.iter().map(|letters| column(letters)).collect()
}

fn col(letters: &str) -> u16 {
    column(letters).expect("Hardcode column letters")
}

fn cols(letters: &[&str]) -> Vec<u16> {
    columns(letters).expect("Hardcode column letters")
}

fn invalid(name: &str, message: &str) -> ConfigError {
    InvalidParameter {
        name: name.to_owned(),
        message: message.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters() {
        assert_eq!(column("A").unwrap(), 0);
        assert_eq!(column("k").unwrap(), 10);
        assert_eq!(column("$AB").unwrap(), 27);
        assert_eq!(column("XFD").unwrap(), 16_383);
        assert!(column("XFE").is_err());
        assert!(column("A1").is_err());
        assert!(column("").is_err());
        assert_eq!(columns(&["G", "H", "F"]).unwrap(), vec![6, 7, 5]);
    }

    #[test]
    fn profiles_are_valid() {
        for config in [
            ConsolidationConfig::default(),
            ConsolidationConfig::level_of_compliance(),
            ConsolidationConfig::part_questionnaire(),
            ConsolidationConfig::application_review("18"),
            ConsolidationConfig::internet_banking(),
        ] {
            assert!(config.validate().is_ok(), "{} profile is invalid", config.sheet_name);
        }
    }

    #[test]
    fn level_of_compliance_layout() {
        let config = ConsolidationConfig::level_of_compliance();
        assert_eq!(config.slot_columns, vec![6, 7, 8, 9, 10, 5]);
        assert_eq!(config.evidence_block, Some((5, 10)));
        assert_eq!(config.column_widths.len(), 11);
        assert_eq!(config.column_widths[1], (1, 60.0));
    }

    #[test]
    fn invalid_parameters() {
        let cases: Vec<(&str, Box<dyn Fn(&mut ConsolidationConfig)>)> = vec![
            ("sheet_name", Box::new(|config| config.sheet_name = "LOC/2024".to_owned())),
            ("sheet_name", Box::new(|config| config.sheet_name = " ".to_owned())),
            ("slot_columns", Box::new(|config| config.slot_columns.clear())),
            ("slot_columns", Box::new(|config| config.slot_columns = vec![6, 7, 6])),
            ("annexure_column", Box::new(|config| config.annexure_column = 6)),
            ("max_slots_per_row", Box::new(|config| config.max_slots_per_row = 0)),
            ("scaling", Box::new(|config| config.scaling = ImageScaling::Divisor(0.0))),
            ("scaling", Box::new(|config| config.scaling = ImageScaling::FixedHeight(f64::NAN))),
            ("evidence_block", Box::new(|config| config.evidence_block = Some((10, 5)))),
            ("default_row_height", Box::new(|config| config.default_row_height = 0.0)),
            ("column_widths", Box::new(|config| config.column_widths.push((3, 300.0)))),
            ("required_prefix", Box::new(|config| config.naming.required_prefix = None)),
            ("required_prefix", Box::new(|config| config.naming.required_prefix = Some(" ".to_owned()))),
        ];
        for (name, change) in cases {
            let mut config = match name {
                "required_prefix" => ConsolidationConfig::application_review("18"),
                _ => ConsolidationConfig::default(),
            };
            change(&mut config);
            match config.validate() {
                Err(EvidenceSheetError::ConfigError(InvalidParameter { name: actual, .. })) => assert_eq!(actual, name),
                other => panic!("Expected invalid {}, got {:?}", name, other),
            }
        }
    }
}
