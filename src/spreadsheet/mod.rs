//! # Spreadsheet Document Model
//!
//! This module owns the in-memory model of an xlsx workbook as the consolidation engine
//! sees it: worksheets of styled cells with merged ranges, column widths, row heights and
//! anchored images. It also provides the xlsx codec, a reader built on `zip` + `quick-xml`
//! and a writer built on `rust_xlsxwriter`.
pub mod cell;
pub(crate) mod excel;
pub mod range;
pub mod reference;
pub mod sheet;
pub mod style;
pub(crate) mod writer;
pub(crate) mod xlsx;

use crate::error::EvidenceSheetError;
use crate::error::ResultMessage;
use crate::helpers::reader::InputSource;
use crate::spreadsheet::sheet::Worksheet;
use crate::spreadsheet::xlsx::XlsxReader;
use rust_xlsxwriter::Image;
use std::path::Path;
use thiserror::Error;

/// Errors of the document model and the xlsx codec.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Missing part '{0}' in spreadsheet package")]
    FileError(String),

    #[error("Spreadsheet '{0}' has no worksheet")]
    SpreadsheetEmptyError(String),

    #[error("Shared string index {0} is out of range")]
    SharedStringIndexError(usize),

    #[error("Merged range {0} overlaps existing merged range {1}")]
    OverlappingMergedRange(String, String),

    #[error("Image '{0}' cannot be decoded: {1}")]
    ImageDecodeError(String, String),
}

/// A workbook: an ordered list of worksheets and a display name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    /// Display name, usually the source file name
    pub name: String,
    pub worksheets: Vec<Worksheet>,
}

impl Document {
    /// Creates a document holding a single worksheet.
    pub fn new(name: &str, worksheet: Worksheet) -> Self {
        Document {
            name: name.to_owned(),
            worksheets: vec![worksheet],
        }
    }

    /// Reads an xlsx document from a path or an in-memory upload.
    pub fn read(source: &InputSource) -> Result<Document, EvidenceSheetError> {
        XlsxReader::open(source)
            .and_then(|reader| reader.read_document())
            .with_prefix(&format!("Read spreadsheet '{}'", source))
    }

    /// Reads an xlsx file from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Document, EvidenceSheetError> {
        Self::read(&InputSource::from(path.as_ref()))
    }

    /// Reads xlsx content held in memory.
    pub fn from_bytes(name: &str, data: Vec<u8>) -> Result<Document, EvidenceSheetError> {
        Self::read(&InputSource::from_bytes(name, data))
    }

    /// The first worksheet in workbook order.
    pub fn first_worksheet(&self) -> Option<&Worksheet> {
        self.worksheets.first()
    }

    pub fn worksheet(&self, name: &str) -> Option<&Worksheet> {
        self.worksheets.iter().find(|sheet| sheet.name == name)
    }

    /// Serializes the document to xlsx bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EvidenceSheetError> {
        writer::write_document(self).with_prefix(&format!("Write spreadsheet '{}'", self.name))
    }

    /// Writes the document to an xlsx file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), EvidenceSheetError> {
        let bytes = self.to_bytes()?;
        std::fs::write(path.as_ref(), bytes)?;
        Ok(())
    }
}

/// Pixel width and height of an encoded image (png, jpeg, gif or bmp).
pub fn image_dimensions(data: &[u8]) -> Result<(f64, f64), EvidenceSheetError> {
    match Image::new_from_buffer(data) {
        Ok(image) => Ok((image.width(), image.height())),
        Err(error) => Err(SpreadsheetError::ImageDecodeError(format!("{} bytes", data.len()), error.to_string()))?,
    }
}
