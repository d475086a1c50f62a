use crate::consolidation::naming::NamingParser;
use crate::consolidation::report::RunReport;
use crate::consolidation::report::Skipped;
use crate::error::EvidenceSheetError;
use crate::helpers::reader::is_metadata_entry;
use crate::helpers::reader::InputSource;
use crate::spreadsheet::sheet::EmbeddedImage;
use crate::spreadsheet::sheet::Worksheet;
use crate::spreadsheet::Document;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// One questionnaire part: a parsed document and the order token taken from its name.
#[derive(Clone, Debug, PartialEq)]
pub struct Fragment {
    pub name: String,
    pub order_token: u32,
    pub document: Document,
}

impl Fragment {
    pub fn new(name: &str, order_token: u32, document: Document) -> Self {
        Fragment {
            name: name.to_owned(),
            order_token,
            document,
        }
    }

    /// The worksheet contributed to the merge: the first one of the workbook.
    pub fn worksheet(&self) -> Option<&Worksheet> {
        self.document.first_worksheet()
    }
}

/// Reads every source as a fragment.
///
/// Sources that cannot be read are skipped with a warning and recorded in the report,
/// the others are returned in input order.
pub fn load_fragments(sources: &[InputSource], naming: &NamingParser, report: &mut RunReport) -> Vec<Fragment> {
    let mut fragments = Vec::with_capacity(sources.len());
    for source in sources {
        let name = source.name();
        if is_metadata_entry(&name) {
            debug!(file = %name, "Ignore metadata file");
            continue;
        }
        match Document::read(source) {
            Ok(document) => {
                let order_token = naming.extract_order_token(&name);
                debug!(file = %name, order_token, "Fragment loaded");
                fragments.push(Fragment::new(&name, order_token, document));
            }
            Err(error) => {
                warn!(file = %name, reason = %error, "Skip unreadable fragment");
                report.skipped_fragments.push(Skipped::new(name, error.to_string()));
            }
        }
    }
    fragments
}

/// Every `.xlsx` entry of a zip bundle, as in-memory inputs.
pub fn fragments_from_archive(bundle: &InputSource) -> Result<Vec<InputSource>, EvidenceSheetError> {
    bundle.archive_entries(|name| name.to_ascii_lowercase().ends_with(".xlsx"))
}

/// Merges fragments into one worksheet.
///
/// Fragments are ordered by order token (ties keep their input order). The first one is
/// copied whole; each following one is appended below the current last row without its
/// header row. Merges, row heights and images move with their rows; those anchored in a
/// dropped header row are dropped too. Column widths come from the first fragment only.
///
/// # Arguments
/// * `sheet_name` - Name of the consolidated worksheet
/// * `fragments` - Parsed fragments in any order
/// * `report` - Receives the merge order and every skipped merged range
///
/// # Returns
/// The consolidated worksheet
pub fn merge_fragments(sheet_name: &str, fragments: &[Fragment], report: &mut RunReport) -> Result<Worksheet, EvidenceSheetError> {
    let mut ordered = fragments.iter().collect::<Vec<_>>();
    ordered.sort_by_key(|fragment| fragment.order_token);

    let mut merged = Worksheet::new(sheet_name);
    for (index, fragment) in ordered.into_iter().enumerate() {
        report.fragment_order.push(fragment.name.clone());
        let Some(source) = fragment.worksheet() else {
            continue;
        };
        if index == 0 {
            copy_first(&mut merged, source);
            info!(file = %fragment.name, rows = merged.last_row().map_or(0, |row| row + 1), "Copy first fragment");
        } else {
            let start = merged.last_row().map_or(0, |row| row + 1);
            append_body(&mut merged, source, &fragment.name, start, report);
            info!(file = %fragment.name, start_row = start, "Append fragment body");
        }
    }
    Ok(merged)
}

fn copy_first(merged: &mut Worksheet, source: &Worksheet) {
    for (row, col, cell) in source.cells() {
        merged.set_cell(row, col, cell.clone());
    }
    for range in source.merged_ranges() {
        // Source sheets never hold overlapping ranges, the destination is empty
        let _ = merged.add_merged_range(*range);
    }
    for (col, width) in source.column_widths() {
        merged.set_column_width(col, width);
    }
    for (row, height) in source.row_heights() {
        merged.set_row_height(row, height);
    }
    for image in source.images() {
        merged.add_image(image.clone());
    }
}

/// Copies rows 1.. of `source` so that source row 1 lands on `start`.
fn append_body(merged: &mut Worksheet, source: &Worksheet, name: &str, start: u32, report: &mut RunReport) {
    let offset = start as i64 - 1;
    let shift = |row: u32| (row as i64 + offset) as u32;

    for (row, col, cell) in source.cells().filter(|(row, _, _)| *row >= 1) {
        merged.set_cell(shift(row), col, cell.clone());
    }
    for (row, height) in source.row_heights().filter(|(row, _)| *row >= 1) {
        merged.set_row_height(shift(row), height);
    }
    for range in source.merged_ranges().iter().filter(|range| range.first_row >= 1) {
        let Some(shifted) = range.shift_rows(offset) else {
            continue;
        };
        if let Err(error) = merged.add_merged_range(shifted) {
            warn!(file = %name, range = %shifted, reason = %error, "Skip overlapping merged range");
            report.skipped_merges.push(Skipped::new(format!("{}!{}", name, shifted), error.to_string()));
        }
    }
    for image in source.images().iter().filter(|image| image.row >= 1) {
        merged.add_image(EmbeddedImage {
            row: shift(image.row),
            ..image.clone()
        });
    }
}
