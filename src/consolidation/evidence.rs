//! Evidence images: extraction from the uploaded archive, grouping by association key and
//! placement into the slot columns of the consolidated worksheet.
use crate::consolidation::config::ConsolidationConfig;
use crate::consolidation::locator::locate_row;
use crate::consolidation::naming::AssociationKey;
use crate::consolidation::naming::NamingParser;
use crate::consolidation::report::Annexure;
use crate::consolidation::report::RunReport;
use crate::consolidation::report::Skipped;
use crate::error::EvidenceSheetError;
use crate::helpers::reader::base_name;
use crate::helpers::reader::is_metadata_entry;
use crate::helpers::reader::InputSource;
use crate::spreadsheet::image_dimensions;
use crate::spreadsheet::sheet::EmbeddedImage;
use crate::spreadsheet::sheet::Worksheet;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use std::path::PathBuf;
use tempfile::TempDir;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// File extensions recognized as evidence images, lowercase
pub const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "bmp"];

/// An evidence image extracted to the scratch directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvidenceFile {
    /// File name without archive directories
    pub name: String,
    pub path: PathBuf,
}

/// Evidence files per association key, each group sorted by file name
pub type EvidenceGroups = BTreeMap<AssociationKey, Vec<EvidenceFile>>;

/// Issues sequential annexure numbers within one run.
#[derive(Debug)]
pub struct AnnexureCounter {
    next: u32,
}

impl Default for AnnexureCounter {
    fn default() -> Self {
        AnnexureCounter { next: 1 }
    }
}

impl AnnexureCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next annexure number and advances the counter.
    pub fn issue(&mut self) -> u32 {
        let number = self.next;
        self.next += 1;
        number
    }

    /// Number of annexures issued so far
    pub fn issued(&self) -> u32 {
        self.next - 1
    }
}

/// How the displayed size of an image is derived from its pixel size
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ImageScaling {
    /// Fixed height in pixels, width following the aspect ratio
    FixedHeight(f64),
    /// Both dimensions divided by the factor
    Divisor(f64),
}

impl ImageScaling {
    /// Displayed (width, height) in pixels for an image of the given pixel size.
    pub fn scale(&self, width: f64, height: f64) -> (f64, f64) {
        match *self {
            ImageScaling::FixedHeight(target) if height > 0.0 => (width * target / height, target),
            ImageScaling::FixedHeight(target) => (width, target),
            ImageScaling::Divisor(divisor) => (width / divisor, height / divisor),
        }
    }
}

/// Pixel size of the box an image is centered in.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SlotBox {
    pub width: f64,
    pub height: f64,
}

impl SlotBox {
    /// Offsets (x, y) in pixels that center an image of the given size, never negative.
    pub fn offsets(&self, width: f64, height: f64) -> (u32, u32) {
        let x = ((self.width - width) / 2.0).max(0.0);
        let y = ((self.height - height) / 2.0).max(0.0);
        (x as u32, y as u32)
    }
}

/// Places evidence images on the rows their file names point to.
pub struct EvidenceEmbedder<'a> {
    config: &'a ConsolidationConfig,
    naming: &'a NamingParser,
}

impl<'a> EvidenceEmbedder<'a> {
    pub fn new(config: &'a ConsolidationConfig, naming: &'a NamingParser) -> Self {
        EvidenceEmbedder { config, naming }
    }

    /// Embeds the images of `archive` into `sheet` and labels every row that received one.
    ///
    /// Only an unreadable archive fails; every per-file problem is logged and recorded in
    /// the report. The scratch directory is removed before returning.
    ///
    /// # Arguments
    /// * `sheet` - Consolidated worksheet
    /// * `archive` - Zip archive of evidence images
    /// * `counter` - Annexure numbering of the run
    /// * `report` - Receives placements and every skipped file
    pub fn embed(
        &self,
        sheet: &mut Worksheet,
        archive: &InputSource,
        counter: &mut AnnexureCounter,
        report: &mut RunReport,
    ) -> Result<(), EvidenceSheetError> {
        let scratch = tempfile::Builder::new().prefix("evidence-").tempdir()?;
        let files = extract_images(archive, &scratch, report)?;
        info!(archive = %archive, images = files.len(), "Evidence extracted");

        let groups = group_evidence(files, self.naming, report);
        for (row, groups) in self.resolve_rows(sheet, groups, report) {
            self.place_row(sheet, row, groups, counter, report)?;
        }

        scratch.close()?;
        Ok(())
    }

    /// Maps each group to its row; groups sharing a row stay in key order.
    fn resolve_rows(
        &self,
        sheet: &Worksheet,
        groups: EvidenceGroups,
        report: &mut RunReport,
    ) -> BTreeMap<u32, Vec<(AssociationKey, Vec<EvidenceFile>)>> {
        let mut rows = BTreeMap::<u32, Vec<_>>::new();
        for (key, files) in groups {
            match locate_row(sheet, &key, self.config.marker_column, &self.config.locate) {
                Some(row) => {
                    debug!(key = %key, row, "Evidence key resolved");
                    rows.entry(row).or_default().push((key, files));
                }
                None => {
                    warn!(key = %key, files = files.len(), "Skip evidence without matching row");
                    report.unresolved_keys.push(key);
                }
            }
        }
        rows
    }

    fn place_row(
        &self,
        sheet: &mut Worksheet,
        row: u32,
        groups: Vec<(AssociationKey, Vec<EvidenceFile>)>,
        counter: &mut AnnexureCounter,
        report: &mut RunReport,
    ) -> Result<(), EvidenceSheetError> {
        let limit = self.config.max_slots_per_row.min(self.config.slot_columns.len());
        let keys = groups.iter().map(|(key, _)| *key).collect::<Vec<_>>();
        let files = groups.into_iter().flat_map(|(_, files)| files).collect::<Vec<_>>();

        let mut placed = Vec::new();
        for (index, file) in files.iter().enumerate() {
            if index >= limit {
                warn!(file = %file.name, row, limit, "Skip evidence beyond slot limit");
                report.overflow.push(Skipped::new(&file.name, format!("row {} already holds {} images", row + 1, limit)));
                continue;
            }
            let col = self.config.slot_columns[index];
            let data = std::fs::read(&file.path)?;
            let (width, height) = match image_dimensions(&data) {
                Ok(size) => size,
                Err(error) => {
                    warn!(file = %file.name, row, reason = %error, "Skip undecodable evidence");
                    report.rejected_evidence.push(Skipped::new(&file.name, error.to_string()));
                    continue;
                }
            };
            let (width, height) = self.config.scaling.scale(width, height);
            let (x_offset, y_offset) = self.config.centering.map_or((0, 0), |slot| slot.offsets(width, height));
            sheet.add_image(EmbeddedImage {
                name: file.name.clone(),
                data,
                row,
                col,
                x_offset,
                y_offset,
                width,
                height,
            });
            placed.push(file.name.clone());
        }

        if placed.is_empty() {
            return Ok(());
        }
        let number = counter.issue();
        self.write_label(sheet, row, number);
        info!(row, annexure = number, images = placed.len(), "Evidence placed");
        report.annexures.push(Annexure { number, row, keys, images: placed });
        Ok(())
    }

    /// Writes "Annexure n", keeping the borders and fill already on the cell.
    fn write_label(&self, sheet: &mut Worksheet, row: u32, number: u32) {
        let col = self.config.annexure_column;
        let mut style = self.config.annexure_style.clone();
        if let Some(existing) = sheet.cell(row, col) {
            style.borders = existing.style.borders;
            style.fill = existing.style.fill;
        }
        sheet.write(row, col, format!("Annexure {}", number), style);
    }
}

/// Extracts every image entry of `archive` below `scratch`.
///
/// Entry paths are sanitized so nothing lands outside the scratch directory; unsafe
/// paths are rejected with a warning.
pub fn extract_images(archive: &InputSource, scratch: &TempDir, report: &mut RunReport) -> Result<Vec<EvidenceFile>, EvidenceSheetError> {
    let mut zip = archive.open_archive()?;
    let mut files = Vec::new();
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        if entry.is_dir() || is_metadata_entry(entry.name()) || !is_image(entry.name()) {
            continue;
        }
        let name = base_name(entry.name()).to_owned();
        let Some(relative) = entry.enclosed_name() else {
            warn!(file = %entry.name(), "Skip evidence with unsafe path");
            report.rejected_evidence.push(Skipped::new(entry.name(), "path escapes the archive"));
            continue;
        };
        let path = scratch.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut output = File::create(&path)?;
        std::io::copy(&mut entry, &mut output)?;
        debug!(file = %name, path = %path.display(), "Evidence extracted");
        files.push(EvidenceFile { name, path });
    }
    Ok(files)
}

/// Groups evidence files by association key; files without a key are rejected.
pub fn group_evidence(files: Vec<EvidenceFile>, naming: &NamingParser, report: &mut RunReport) -> EvidenceGroups {
    let mut groups = EvidenceGroups::new();
    for file in files {
        match naming.association_key(&file.name) {
            Some(key) => groups.entry(key).or_default().push(file),
            None => {
                warn!(file = %file.name, "Skip evidence without association key");
                report.rejected_evidence.push(Skipped::new(&file.name, "no association key in file name"));
            }
        }
    }
    for files in groups.values_mut() {
        files.sort_by(|left, right| left.name.cmp(&right.name));
    }
    groups
}

fn is_image(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| IMAGE_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str()))
}
