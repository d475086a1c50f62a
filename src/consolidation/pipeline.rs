use crate::consolidation::borders::BorderDecorator;
use crate::consolidation::borders::StyleFinisher;
use crate::consolidation::config::ConsolidationConfig;
use crate::consolidation::config::EvidenceHeader;
use crate::consolidation::config::SummaryRow;
use crate::consolidation::evidence::AnnexureCounter;
use crate::consolidation::evidence::EvidenceEmbedder;
use crate::consolidation::merger::load_fragments;
use crate::consolidation::merger::merge_fragments;
use crate::consolidation::naming::NamingParser;
use crate::consolidation::report::RunReport;
use crate::consolidation::report::Skipped;
use crate::consolidation::ConsolidationError;
use crate::error::EvidenceSheetError;
use crate::helpers::reader::InputSource;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::range::CellRange;
use crate::spreadsheet::reference::column_name;
use crate::spreadsheet::sheet::Worksheet;
use crate::spreadsheet::style::Borders;
use crate::spreadsheet::style::CellStyle;
use crate::spreadsheet::style::Font;
use crate::spreadsheet::style::HorizontalAlignment;
use crate::spreadsheet::style::VerticalAlignment;
use crate::spreadsheet::Document;
use std::path::Path;
use tracing::info;
use tracing::info_span;
use tracing::warn;

/// Result of a successful run: the consolidated document and what was skipped on the way.
#[derive(Clone, Debug, PartialEq)]
pub struct Consolidation {
    pub document: Document,
    pub report: RunReport,
}

impl Consolidation {
    /// The consolidated worksheet.
    pub fn worksheet(&self) -> Option<&Worksheet> {
        self.document.first_worksheet()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, EvidenceSheetError> {
        self.document.to_bytes()
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), EvidenceSheetError> {
        self.document.save(path)
    }
}

/// Runs consolidations for one deployment.
///
/// The pipeline only holds immutable configuration; every run gets its own report,
/// annexure counter and scratch directory, so one pipeline may serve concurrent runs.
#[derive(Clone, Debug)]
pub struct ConsolidationPipeline {
    config: ConsolidationConfig,
    naming: NamingParser,
}

impl ConsolidationPipeline {
    /// Validates the configuration and prepares the file name parser.
    pub fn new(config: ConsolidationConfig) -> Result<Self, EvidenceSheetError> {
        config.validate()?;
        let naming = NamingParser::new(config.naming.clone())?;
        Ok(ConsolidationPipeline { config, naming })
    }

    pub fn config(&self) -> &ConsolidationConfig {
        &self.config
    }

    /// Consolidates `fragments` and embeds the images of `evidence`.
    ///
    /// # Arguments
    /// * `fragments` - Questionnaire fragments in any order
    /// * `evidence` - Zip archive of evidence images, if any
    ///
    /// # Returns
    /// The fully built document with its run report. Fails when no fragment can be read,
    /// when required evidence is missing or unreadable.
    pub fn run(&self, fragments: &[InputSource], evidence: Option<&InputSource>) -> Result<Consolidation, EvidenceSheetError> {
        let span = info_span!("consolidation", sheet = %self.config.sheet_name);
        let _guard = span.enter();

        if fragments.is_empty() {
            Err(ConsolidationError::NoFragments)?;
        }
        let mut report = RunReport::default();
        let loaded = load_fragments(fragments, &self.naming, &mut report);
        if loaded.is_empty() {
            Err(ConsolidationError::NoReadableFragments(fragments.len()))?;
        }

        let mut sheet = merge_fragments(&self.config.sheet_name, &loaded, &mut report)?;
        let body_end = sheet.last_row().unwrap_or(0);
        info!(fragments = loaded.len(), rows = body_end + 1, "Fragments merged");

        if let Some(header) = &self.config.evidence_header {
            self.write_header(&mut sheet, header, &mut report);
        }

        match evidence {
            Some(archive) => {
                let mut counter = AnnexureCounter::new();
                EvidenceEmbedder::new(&self.config, &self.naming).embed(&mut sheet, archive, &mut counter, &mut report)?;
                info!(annexures = counter.issued(), images = report.placed_images(), "Evidence embedded");
            }
            None if self.config.require_evidence => Err(ConsolidationError::MissingEvidence)?,
            None => info!("No evidence archive supplied"),
        }

        for summary in &self.config.summary_rows {
            append_summary_row(&mut sheet, summary, body_end);
        }

        StyleFinisher::apply_column_widths(&mut sheet, &self.config.column_widths);
        if let Some(last_row) = sheet.last_row() {
            StyleFinisher::increase_row_heights(
                &mut sheet,
                0..=last_row,
                self.config.row_height_increment,
                self.config.default_row_height,
            );
        }
        if let Some(last_row) = sheet.last_row_in_column(self.config.marker_column) {
            BorderDecorator::new(self.config.evidence_block, self.config.framed_columns.clone()).apply(&mut sheet, 0..=last_row);
        }

        let name = format!("{}.xlsx", self.config.sheet_name);
        Ok(Consolidation {
            document: Document::new(&name, sheet),
            report,
        })
    }

    /// Labels the annexure column and the evidence block in row 0.
    fn write_header(&self, sheet: &mut Worksheet, header: &EvidenceHeader, report: &mut RunReport) {
        let col = self.config.annexure_column;
        write_header_cell(sheet, CellRange::new(0, col, 0, col), &header.annexure_label, &header.style, report);
        if let Some((first, last)) = self.config.evidence_block {
            write_header_cell(sheet, CellRange::new(0, first, 0, last), &header.block_label, &header.style, report);
        }
    }
}

/// Writes `label` over `range`, unless the range collides with an existing merge.
fn write_header_cell(sheet: &mut Worksheet, range: CellRange, label: &str, style: &CellStyle, report: &mut RunReport) {
    if let Some(existing) = sheet.merged_ranges().iter().find(|existing| existing.overlaps(&range)) {
        if *existing != range {
            warn!(range = %range, existing = %existing, "Skip header over existing merged range");
            report.skipped_merges.push(Skipped::new(range.to_string(), format!("overlaps merged range {}", existing)));
            return;
        }
    }
    sheet.write(range.first_row, range.first_col, label, style.clone());
    if !range.is_single_cell() && sheet.merged_range_at(range.first_row, range.first_col).is_none() {
        // Overlaps were ruled out above
        let _ = sheet.add_merged_range(range);
    }
}

/// Appends a labelled `SUM` of rows 1..=`body_end` of the total column.
fn append_summary_row(sheet: &mut Worksheet, summary: &SummaryRow, body_end: u32) {
    let row = sheet.last_row().map_or(0, |row| row + 1);
    let last = body_end.max(1);
    let total = (1..=last)
        .filter_map(|row| sheet.cell(row, summary.total_column))
        .filter_map(|cell| match &cell.value {
            CellValue::Number(_) | CellValue::Formula { .. } => cell.value.as_number(),
            _ => None,
        })
        .sum::<f64>();
    let letters = column_name(summary.total_column);
    let expression = format!("SUM({}2:{}{})", letters, letters, last + 1);

    let style = CellStyle {
        font: Font {
            name: "Times New Roman".to_owned(),
            size: 12.0,
            bold: true,
            ..Font::default()
        },
        borders: Borders::full(),
        horizontal: HorizontalAlignment::Center,
        vertical: VerticalAlignment::Center,
        ..CellStyle::default()
    };
    sheet.write(row, summary.label_column, summary.label.as_str(), style.clone());
    let cached = CellValue::Number(total).to_string();
    sheet.write(row, summary.total_column, CellValue::Formula { expression, cached: Some(cached) }, style);
    info!(label = %summary.label, row, total, "Summary row appended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consolidation::naming::AssociationKey;
    use crate::spreadsheet::style::BorderLine;
    use crate::testing::png_bytes;
    use crate::testing::questionnaire;
    use crate::testing::zip_bytes;
    use pretty_assertions::assert_eq;

    fn level(number: u32, rows: &[&[&str]]) -> InputSource {
        let name = format!("Level {}.xlsx", number);
        let mut sheet = questionnaire("Sheet1", rows);
        sheet.set_column_width(1, 45.0);
        let bytes = Document::new(&name, sheet).to_bytes().unwrap();
        InputSource::from_bytes(name, bytes)
    }

    fn fragments() -> Vec<InputSource> {
        vec![
            level(2, &[&["Sl No", "Control"], &["2", "Backups"], &["A", "Offsite copy"], &["B", "Restore test"]]),
            level(1, &[&["Sl No", "Control"], &["1", "Access control"], &["A", "Password policy"]]),
            level(3, &[&["Sl No", "Control"], &["3", "Logging"], &["A", "Retention"]]),
        ]
    }

    fn evidence() -> InputSource {
        let png = png_bytes(60, 30);
        InputSource::from_bytes("evidence.zip", zip_bytes(&[
            ("evidence/", b"".as_slice()),
            ("evidence/2_b-restore.PNG", png.as_slice()),
            ("evidence/1_A.png", png.as_slice()),
            ("evidence/1_A_2.png", png.as_slice()),
            ("evidence/9_Z.png", png.as_slice()),
            ("evidence/readme.txt", b"text".as_slice()),
        ]))
    }

    fn pipeline() -> ConsolidationPipeline {
        ConsolidationPipeline::new(ConsolidationConfig::level_of_compliance()).unwrap()
    }

    #[test]
    fn level_of_compliance_end_to_end() {
        let consolidation = pipeline().run(&fragments(), Some(&evidence())).unwrap();
        let sheet = consolidation.worksheet().unwrap();

        assert_eq!(consolidation.document.name, "LOC.xlsx");
        assert_eq!(sheet.name, "LOC");
        let markers = (0..=7).map(|row| sheet.text(row, 0)).collect::<Vec<_>>();
        assert_eq!(markers, vec!["Sl No", "1", "A", "2", "A", "B", "3", "A"]);

        // Header
        assert_eq!(sheet.text(0, 4), "POC Attached");
        assert_eq!(sheet.text(0, 5), "POC");
        assert!(sheet.merged_ranges().contains(&CellRange::new(0, 5, 0, 10)));

        // Evidence: 1_A on row 2, 2_B on row 5, 9_Z unresolved
        assert_eq!(sheet.text(2, 4), "Annexure 1");
        assert_eq!(sheet.text(5, 4), "Annexure 2");
        let placed = sheet.images().iter().map(|image| (image.name.as_str(), image.row, image.col)).collect::<Vec<_>>();
        assert_eq!(placed, vec![("1_A.png", 2, 6), ("1_A_2.png", 2, 7), ("2_b-restore.PNG", 5, 6)]);
        assert_eq!(consolidation.report.unresolved_keys, vec!["9_Z".parse::<AssociationKey>().unwrap()]);
        assert_eq!(consolidation.report.fragment_order, vec!["Level 1.xlsx", "Level 2.xlsx", "Level 3.xlsx"]);

        // Sizing
        assert_eq!(sheet.column_width(0), Some(15.0));
        assert_eq!(sheet.column_width(1), Some(60.0));
        assert_eq!(sheet.column_width(10), Some(20.0));
        assert_eq!(sheet.row_height(3), Some(30.0));

        // Borders down to the last marker row only
        assert_eq!(sheet.cell(7, 0).unwrap().style.borders, Borders::full());
        assert_eq!(sheet.cell(7, 5).unwrap().style.borders.left, BorderLine::THIN);
        assert!(sheet.cell(7, 6).unwrap().style.borders.left.is_none());
        assert!(sheet.cell(8, 0).is_none());
    }

    #[test]
    fn output_reads_back() {
        let consolidation = pipeline().run(&fragments(), Some(&evidence())).unwrap();
        let document = Document::from_bytes("LOC.xlsx", consolidation.to_bytes().unwrap()).unwrap();
        let sheet = document.worksheet("LOC").unwrap();
        assert_eq!(sheet.text(5, 4), "Annexure 2");
        assert_eq!(sheet.images().len(), 3);
        assert_eq!((sheet.images()[0].width, sheet.images()[0].height), (2.0, 1.0));
        assert!(sheet.merged_ranges().contains(&CellRange::new(0, 5, 0, 10)));
    }

    #[test]
    fn runs_are_deterministic_and_order_invariant() {
        let pipeline = pipeline();
        let first = pipeline.run(&fragments(), Some(&evidence())).unwrap().to_bytes().unwrap();
        let second = pipeline.run(&fragments(), Some(&evidence())).unwrap().to_bytes().unwrap();
        assert_eq!(first, second);

        let mut reversed = fragments();
        reversed.reverse();
        let permuted = pipeline.run(&reversed, Some(&evidence())).unwrap().to_bytes().unwrap();
        assert_eq!(first, permuted);
    }

    #[test]
    fn unreadable_fragments_are_reported() {
        let mut sources = fragments();
        sources.push(InputSource::from_bytes("Level 4.xlsx", b"corrupt".to_vec()));
        let consolidation = pipeline().run(&sources, None).unwrap();
        assert_eq!(consolidation.report.skipped_fragments.len(), 1);
        assert_eq!(consolidation.report.skipped_fragments[0].name, "Level 4.xlsx");
        assert!(consolidation.report.annexures.is_empty());
        assert_eq!(consolidation.worksheet().unwrap().text(7, 1), "Retention");
    }

    #[test]
    fn fatal_conditions() {
        let pipeline = pipeline();
        assert!(matches!(
            pipeline.run(&[], None),
            Err(EvidenceSheetError::ConsolidationError(ConsolidationError::NoFragments))
        ));
        let corrupt = vec![
            InputSource::from_bytes("Level 1.xlsx", b"corrupt".to_vec()),
            InputSource::from_bytes("Level 2.xlsx", b"corrupt".to_vec()),
        ];
        assert!(matches!(
            pipeline.run(&corrupt, None),
            Err(EvidenceSheetError::ConsolidationError(ConsolidationError::NoReadableFragments(2)))
        ));

        let strict = ConsolidationPipeline::new(ConsolidationConfig {
            require_evidence: true,
            ..ConsolidationConfig::level_of_compliance()
        })
        .unwrap();
        assert!(matches!(
            strict.run(&fragments(), None),
            Err(EvidenceSheetError::ConsolidationError(ConsolidationError::MissingEvidence))
        ));
        let broken = InputSource::from_bytes("evidence.zip", b"not a zip".to_vec());
        assert!(strict.run(&fragments(), Some(&broken)).is_err());

        let invalid = ConsolidationConfig {
            slot_columns: Vec::new(),
            ..ConsolidationConfig::level_of_compliance()
        };
        assert!(ConsolidationPipeline::new(invalid).is_err());
    }

    #[test]
    fn part_questionnaire_grand_total() {
        let part = |number: u32, marks: &[f64]| {
            let name = format!("Part {}.xlsx", number);
            let mut sheet = questionnaire("Sheet1", &[&["Sl No", "Question", "", "", "Marks"]]);
            for (index, mark) in marks.iter().enumerate() {
                let row = index as u32 + 1;
                sheet.set_value(row, 0, format!("{}", number * 10 + row));
                sheet.set_value(row, 4, *mark);
            }
            InputSource::from_bytes(name.clone(), Document::new(&name, sheet).to_bytes().unwrap())
        };
        let pipeline = ConsolidationPipeline::new(ConsolidationConfig::part_questionnaire()).unwrap();
        let consolidation = pipeline.run(&[part(2, &[4.0, 1.5]), part(1, &[2.0])], None).unwrap();
        let sheet = consolidation.worksheet().unwrap();

        assert_eq!(sheet.name, "VICS");
        assert_eq!(sheet.text(4, 1), "Grand Total");
        assert_eq!(
            sheet.cell(4, 4).unwrap().value,
            CellValue::Formula { expression: "SUM(E2:E4)".to_owned(), cached: Some("7.5".to_owned()) }
        );
        assert!(sheet.cell(4, 1).unwrap().style.font.bold);
    }

    #[test]
    fn part_questionnaire_binds_numbered_questions() {
        let sheet = questionnaire("Sheet1", &[&["Sl No", "Question"], &["3", "Network"], &["3.1", "Firewall"], &["3.3", "VPN"]]);
        let fragment = InputSource::from_bytes("Part 1.xlsx", Document::new("Part 1.xlsx", sheet).to_bytes().unwrap());
        let png = png_bytes(30, 30);
        let archive = InputSource::from_bytes("evidence.zip", zip_bytes(&[
            ("3_3-proof.png", png.as_slice()),
            ("3_3-config.png", png.as_slice()),
            ("3_D.png", png.as_slice()),
        ]));
        let pipeline = ConsolidationPipeline::new(ConsolidationConfig::part_questionnaire()).unwrap();
        let consolidation = pipeline.run(&[fragment], Some(&archive)).unwrap();
        let sheet = consolidation.worksheet().unwrap();

        let placed = sheet.images_in_row(3).map(|image| (image.name.as_str(), image.col)).collect::<Vec<_>>();
        assert_eq!(placed, vec![("3_3-config.png", 8), ("3_3-proof.png", 9)]);
        assert_eq!(sheet.images_in_row(1).count(), 0);
        assert_eq!(sheet.text(3, 6), "Annexure 1");
        assert_eq!(consolidation.report.annexures[0].keys, vec![AssociationKey::numbered(3, 3)]);
        assert_eq!(consolidation.report.rejected_evidence.len(), 1);
        assert_eq!(consolidation.report.rejected_evidence[0].name, "3_D.png");
    }

    #[test]
    fn internet_banking_places_items_by_position() {
        let sheet = questionnaire("Sheet1", &[
            &["Sl No", "", "", "", "", "Status"],
            &["1", "Login", "", "", "", "Yes"],
            &["2", "Session timeout", "", "", "", "Yes"],
            &["3", "Transaction limits", "", "", "", "No"],
            &["4", "Two factor", "", "", "", "Yes"],
        ]);
        let fragment = InputSource::from_bytes("Internet Banking.xlsx", Document::new("Internet Banking.xlsx", sheet).to_bytes().unwrap());
        let png = png_bytes(50, 25);
        let archive = InputSource::from_bytes("evidence.zip", zip_bytes(&[
            ("18.2 1.png", png.as_slice()),
            ("18.2_2.png", png.as_slice()),
            ("18.4.png", png.as_slice()),
            ("17.3.png", png.as_slice()),
            ("18.9.png", png.as_slice()),
            ("18.30.png", png.as_slice()),
        ]));
        let pipeline = ConsolidationPipeline::new(ConsolidationConfig::internet_banking()).unwrap();
        let consolidation = pipeline.run(&[fragment], Some(&archive)).unwrap();
        let sheet = consolidation.worksheet().unwrap();

        let placed = sheet.images_in_row(2).map(|image| (image.name.as_str(), image.col)).collect::<Vec<_>>();
        assert_eq!(placed, vec![("18.2 1.png", 9), ("18.2_2.png", 10)]);
        assert_eq!(sheet.images_in_row(4).map(|image| image.col).collect::<Vec<_>>(), vec![9]);
        assert_eq!(sheet.images().len(), 3);
        assert_eq!(sheet.text(2, 7), "Annexure 1");
        assert_eq!(sheet.text(4, 7), "Annexure 2");
        // 18.9 is past the last row, 17.3 and 18.30 are rejected by name
        assert_eq!(consolidation.report.unresolved_keys, vec![AssociationKey::new(9, None)]);
        assert_eq!(consolidation.report.rejected_evidence.len(), 2);
        assert_eq!(sheet.cell(4, 8).unwrap().style.borders.left, BorderLine::THIN);
        assert!(sheet.cell(5, 8).is_none());
    }

    #[test]
    fn header_yields_to_existing_merges() {
        let mut sheet = questionnaire("Sheet1", &[&["Audit of branch"], &["1", "Access"]]);
        sheet.add_merged_range(CellRange::new(0, 0, 0, 7)).unwrap();
        let bytes = Document::new("Level 1.xlsx", sheet).to_bytes().unwrap();
        let consolidation = pipeline().run(&[InputSource::from_bytes("Level 1.xlsx", bytes)], None).unwrap();
        let sheet = consolidation.worksheet().unwrap();

        assert_eq!(sheet.text(0, 4), "");
        assert_eq!(sheet.text(0, 5), "");
        assert_eq!(consolidation.report.skipped_merges.len(), 2);
    }
}
