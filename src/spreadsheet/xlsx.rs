use crate::error::EvidenceSheetError;
use crate::helpers::reader::base_name;
use crate::helpers::reader::InputSource;
use crate::helpers::reader::SourceReader;
use crate::helpers::xml::XmlAttributeHelper;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::excel::load_relationships;
use crate::spreadsheet::excel::DRAWING_RELATIONSHIP;
use crate::spreadsheet::excel::IMAGE_RELATIONSHIP;
use crate::spreadsheet::excel::WORKSHEET_RELATIONSHIP;
use crate::spreadsheet::image_dimensions;
use crate::spreadsheet::range::CellRange;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::sheet::EmbeddedImage;
use crate::spreadsheet::sheet::Worksheet;
use crate::spreadsheet::style::parse_color;
use crate::spreadsheet::style::BorderLine;
use crate::spreadsheet::style::BorderStyle;
use crate::spreadsheet::style::Borders;
use crate::spreadsheet::style::CellStyle;
use crate::spreadsheet::style::Font;
use crate::spreadsheet::style::HorizontalAlignment;
use crate::spreadsheet::style::NumberFormat;
use crate::spreadsheet::style::VerticalAlignment;
use crate::spreadsheet::Document;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::BufReader;
use tracing::debug;
use tracing::warn;
use zip::read::ZipFile;
use zip::ZipArchive;

// XML tag names for parsing the workbook, styles and shared strings
const TAG_SHEET: QName = QName(b"sheet");             // Worksheet definition
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt");    // Individual custom number format
const TAG_FONTS: QName = QName(b"fonts");             // Font list
const TAG_FONT: QName = QName(b"font");               // Font definition
const TAG_BOLD: QName = QName(b"b");
const TAG_ITALIC: QName = QName(b"i");
const TAG_UNDERLINE: QName = QName(b"u");
const TAG_FONT_SIZE: QName = QName(b"sz");
const TAG_FONT_NAME: QName = QName(b"name");
const TAG_COLOR: QName = QName(b"color");
const TAG_FILLS: QName = QName(b"fills");             // Fill list
const TAG_FILL: QName = QName(b"fill");
const TAG_PATTERN_FILL: QName = QName(b"patternFill");
const TAG_FOREGROUND_COLOR: QName = QName(b"fgColor");
const TAG_BORDERS: QName = QName(b"borders");         // Border list
const TAG_BORDER: QName = QName(b"border");
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs");  // Cell format indexes container
const TAG_FORMAT_INDEX: QName = QName(b"xf");         // Individual cell format index
const TAG_ALIGNMENT: QName = QName(b"alignment");
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");   // Shared string table item
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");       // Phonetic text for Asian languages
const TAG_TEXT: QName = QName(b"t");                  // Text content within strings

// XML tag names for parsing worksheets
const TAG_COLUMN: QName = QName(b"col");              // Column sizing
const TAG_ROW: QName = QName(b"row");                 // Row in worksheet
const TAG_CELL: QName = QName(b"c");                  // Cell in worksheet
const TAG_FORMULA: QName = QName(b"f");               // Cell formula
const TAG_INLINE_STRING: QName = QName(b"is");        // Inline string value
const TAG_VALUE: QName = QName(b"v");                 // Cell value content
const TAG_MERGE_CELL: QName = QName(b"mergeCell");    // Merged range
const TAG_DRAWING: QName = QName(b"drawing");         // Drawing part reference

/// English Metric Units per pixel
pub(crate) const EMU_PER_PIXEL: f64 = 9525.0;

/// Column declarations spanning more columns than this only carry sheet-wide defaults
const WIDE_COLUMN_SPAN: u16 = 1024;

/// Value type of a cell, from its `t` attribute
#[derive(Copy, Clone, Debug, Default, PartialEq)]
enum ValueKind {
    #[default]
    Number,
    SharedString,
    InlineString,
    FormulaString,
    Boolean,
    Error,
    IsoDateTime,
}

/// Reads an xlsx package into a [`Document`]
pub(crate) struct XlsxReader {
    /// File name of the spreadsheet
    name: String,
    /// ZIP archive containing the XLSX file contents
    zip: ZipArchive<SourceReader>,
    /// Cell styles indexed by `s` attribute
    styles: Vec<CellStyle>,
    /// Shared string table
    shared_strings: Vec<String>,
    /// List of worksheets with (name, zip_path) pairs
    sheets: Vec<(String, String)>,
}

impl XlsxReader {
    /// Opens an XLSX package and loads its workbook structure, styles and shared strings
    ///
    /// # Arguments
    /// * `source` - Path or in-memory content of the XLSX file
    ///
    /// # Returns
    /// Result containing the initialized reader or an error
    pub(crate) fn open(source: &InputSource) -> Result<XlsxReader, EvidenceSheetError> {
        let name = source.name();
        let mut zip = source.open_archive()?;
        let sheets = load_workbook(&mut zip)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::SpreadsheetEmptyError(name.to_owned()))?
        }
        let styles = load_styles(&mut zip)?;
        let shared_strings = load_shared_strings(&mut zip)?;
        Ok(XlsxReader {
            name,
            zip,
            styles,
            shared_strings,
            sheets,
        })
    }

    /// Reads every worksheet in workbook order
    pub(crate) fn read_document(mut self) -> Result<Document, EvidenceSheetError> {
        let sheets = std::mem::take(&mut self.sheets);
        let mut worksheets = Vec::with_capacity(sheets.len());
        for (sheet_name, zip_path) in &sheets {
            worksheets.push(self.read_worksheet(sheet_name, zip_path)?);
        }
        Ok(Document {
            name: self.name,
            worksheets,
        })
    }

    /// Reads cells, sizing, merged ranges and images of one worksheet
    fn read_worksheet(&mut self, sheet_name: &str, zip_path: &str) -> Result<Worksheet, EvidenceSheetError> {
        let mut sheet = Worksheet::new(sheet_name);
        let mut merged_ranges = Vec::<String>::new();
        let mut drawing_id = None::<String>;

        let mut reader = self.zip.xml_reader(zip_path)?
            .ok_or_else(|| SpreadsheetError::FileError(zip_path.to_owned()))?;
        let mut next_row = 0u32;
        let mut row = 0u32;
        let mut col = 0u16;
        let mut next_col = 0u16;
        let mut kind = ValueKind::default();
        let mut style_index = None::<usize>;
        let mut value = String::new();
        let mut formula = String::new();
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_COLUMN => {
                let min = event.parse_attribute_value::<u16>("min")?;
                let max = event.parse_attribute_value::<u16>("max")?;
                let width = event.parse_attribute_value::<f64>("width")?;
                if let (Some(min), Some(max), Some(width)) = (min, max, width) {
                    if min >= 1 && max >= min && max - min < WIDE_COLUMN_SPAN {
                        for col in min..=max {
                            sheet.set_column_width(col - 1, width);
                        }
                    }
                }
            }
            Event::Start(event) if event.name() == TAG_ROW => {
                row = event.parse_attribute_value::<u32>("r")?
                    .and_then(|r| r.checked_sub(1))
                    .unwrap_or(next_row);
                next_col = 0;
                if let Some(height) = event.parse_attribute_value::<f64>("ht")? {
                    sheet.set_row_height(row, height);
                }
            }
            Event::End(event) if event.name() == TAG_ROW => {
                next_row = row + 1;
            }
            Event::Start(event) if event.name() == TAG_CELL => {
                (row, col) = event.get_attribute_value("r")?
                    .and_then(|reference| reference_to_index(&reference))
                    .unwrap_or((row, next_col));
                next_col = col.saturating_add(1);
                kind = event.get_attribute_value("t")?.map(|t| {
                    match t.as_ref() {
                        "s" => ValueKind::SharedString,
                        "inlineStr" => ValueKind::InlineString,
                        "str" => ValueKind::FormulaString,
                        "b" => ValueKind::Boolean,
                        "e" => ValueKind::Error,
                        "d" => ValueKind::IsoDateTime,
                        _ => ValueKind::Number,
                    }
                }).unwrap_or_default();
                style_index = event.parse_attribute_value::<usize>("s")?;
                value.clear();
                formula.clear();
            }
            Event::Start(event) if event.name() == TAG_FORMULA => {
                formula = read_string_value(&mut reader, TAG_FORMULA, true)?;
            }
            Event::Start(event) if event.name() == TAG_INLINE_STRING => {
                value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
            }
            Event::Start(event) if event.name() == TAG_VALUE => {
                value = read_string_value(&mut reader, TAG_VALUE, true)?;
            }
            Event::End(event) if event.name() == TAG_CELL => {
                let cell_value = to_cell_value(kind, &value, &formula, &self.shared_strings)?;
                if !cell_value.is_empty() || style_index.is_some() {
                    let style = style_index
                        .and_then(|index| self.styles.get(index))
                        .or_else(|| self.styles.first())
                        .cloned()
                        .unwrap_or_default();
                    sheet.set_cell(row, col, Cell { value: cell_value, style });
                }
            }
            Event::Start(event) if event.name() == TAG_MERGE_CELL => {
                if let Some(reference) = event.get_attribute_value("ref")? {
                    merged_ranges.push(reference.to_string());
                }
            }
            Event::Start(event) if event.name() == TAG_DRAWING => {
                drawing_id = event.get_local_attribute_value("id")?.map(|id| id.to_string());
            }
        });
        drop(reader);

        for reference in &merged_ranges {
            let range = CellRange::try_from(reference.as_str())?;
            if let Err(error) = sheet.add_merged_range(range) {
                warn!(file = %self.name, sheet = sheet_name, range = %range, reason = %error, "skipping merged range");
            }
        }

        if let Some(drawing_id) = drawing_id {
            let relationships = load_relationships(&mut self.zip, zip_path, DRAWING_RELATIONSHIP)?;
            if let Some(drawing_path) = relationships.get(&drawing_id) {
                for image in load_drawing(&mut self.zip, drawing_path)? {
                    sheet.add_image(image);
                }
            }
        }

        debug!(
            file = %self.name,
            sheet = sheet_name,
            last_row = ?sheet.last_row(),
            images = sheet.images().len(),
            "worksheet loaded"
        );
        Ok(sheet)
    }
}

/// Converts the raw pieces of a `<c>` element into a cell value
fn to_cell_value(kind: ValueKind, value: &str, formula: &str, shared_strings: &[String]) -> Result<CellValue, EvidenceSheetError> {
    if !formula.is_empty() {
        return Ok(CellValue::Formula {
            expression: formula.to_owned(),
            cached: (!value.is_empty()).then(|| value.to_owned()),
        });
    }
    let cell_value = match kind {
        ValueKind::SharedString if value.is_empty() => CellValue::Empty,
        ValueKind::SharedString => {
            let index = value.trim().parse::<usize>()?;
            let text = shared_strings
                .get(index)
                .ok_or(SpreadsheetError::SharedStringIndexError(index))?;
            CellValue::Text(text.to_owned())
        }
        ValueKind::Boolean => CellValue::Boolean(value == "1" || value.eq_ignore_ascii_case("true")),
        ValueKind::InlineString | ValueKind::FormulaString | ValueKind::Error | ValueKind::IsoDateTime => {
            CellValue::Text(value.to_owned())
        }
        ValueKind::Number if value.is_empty() => CellValue::Empty,
        ValueKind::Number => match value.trim().parse::<f64>() {
            Ok(number) => CellValue::Number(number),
            Err(_) => CellValue::Text(value.to_owned()),
        },
    };
    Ok(cell_value)
}

/// Loads worksheet names and paths from the workbook part
///
/// # Arguments
/// * `zip` - ZIP archive containing the XLSX file
///
/// # Returns
/// Worksheets as (name, zip_path) pairs in workbook order
fn load_workbook(zip: &mut ZipArchive<SourceReader>) -> Result<Vec<(String, String)>, EvidenceSheetError> {
    let relationships = load_relationships(zip, "xl/workbook.xml", WORKSHEET_RELATIONSHIP)?;
    let mut reader = zip.xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::FileError("xl/workbook.xml".to_string()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None::<Cow<str>>;
            let mut id = None::<Cow<str>>;
            for result in event.attributes() {
                let attribute = result?;
                let key = attribute.key.local_name();
                if key.as_ref() == b"name" {
                    name = Some(attribute.get_value()?);
                } else if key.as_ref() == b"id" {
                    id = Some(attribute.get_value()?);
                }
            }
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(id.as_ref()) {
                    sheets.push((name.to_string(), path.to_owned()));
                }
            }
        }
    });
    Ok(sheets)
}

/// Loads the shared string table; packages without one yield an empty table
fn load_shared_strings(zip: &mut ZipArchive<SourceReader>) -> Result<Vec<String>, EvidenceSheetError> {
    let mut shared_strings = Vec::<String>::new();
    let mut reader = match zip.xml_reader("xl/sharedStrings.xml")? {
        Some(reader) => reader,
        None => return Ok(shared_strings),
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
            shared_strings.push(read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?);
        }
    });
    Ok(shared_strings)
}

/// Section of styles.xml being parsed; fonts, fills and borders also occur inside
/// differential formats, which are not cell styles
#[derive(Copy, Clone, Debug, PartialEq)]
enum StyleSection {
    Other,
    Fonts,
    Fills,
    Borders,
    CellFormats,
}

/// Indexes of one `cellXfs/xf` entry plus its alignment
#[derive(Default)]
struct FormatIndex {
    number_format: u32,
    font: usize,
    fill: usize,
    border: usize,
    horizontal: HorizontalAlignment,
    vertical: VerticalAlignment,
    wrap_text: bool,
}

/// Loads cell styles from the styles part
///
/// Resolves every `cellXfs` entry against the font, fill, border and number format
/// tables so a cell's `s` attribute maps straight to a complete [`CellStyle`].
///
/// # Arguments
/// * `zip` - ZIP archive containing the XLSX file
///
/// # Returns
/// Vector of cell styles indexed by style ID
fn load_styles(zip: &mut ZipArchive<SourceReader>) -> Result<Vec<CellStyle>, EvidenceSheetError> {
    let mut reader = match zip.xml_reader("xl/styles.xml")? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut section = StyleSection::Other;
    let mut custom_formats = HashMap::<u32, String>::new();
    let mut fonts = Vec::<Font>::new();
    let mut fills = Vec::<Option<u32>>::new();
    let mut borders = Vec::<Borders>::new();
    let mut format_indexes = Vec::<FormatIndex>::new();

    let mut font = Font::default();
    let mut is_solid = false;
    let mut fill = None::<u32>;
    let mut border = Borders::default();
    let mut border_side = None::<BorderLine>;
    let mut format_index = FormatIndex::default();

    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.parse_attribute_value::<u32>("numFmtId")?;
            let format = event.get_attribute_value("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                custom_formats.insert(id, format.to_string());
            }
        }

        Event::Start(event) if event.name() == TAG_FONTS => section = StyleSection::Fonts,
        Event::Start(event) if event.name() == TAG_FILLS => section = StyleSection::Fills,
        Event::Start(event) if event.name() == TAG_BORDERS => section = StyleSection::Borders,
        Event::Start(event) if event.name() == TAG_FORMAT_INDEXES => section = StyleSection::CellFormats,
        Event::End(event) if matches!(event.name().as_ref(), b"fonts" | b"fills" | b"borders" | b"cellXfs") => {
            section = StyleSection::Other;
        }

        Event::Start(event) if section == StyleSection::Fonts && event.name() == TAG_FONT => {
            font = Font::default();
        }
        Event::End(event) if section == StyleSection::Fonts && event.name() == TAG_FONT => {
            fonts.push(font.clone());
        }
        Event::Start(event) if section == StyleSection::Fonts && event.name() == TAG_BOLD => font.bold = event.get_flag()?,
        Event::Start(event) if section == StyleSection::Fonts && event.name() == TAG_ITALIC => font.italic = event.get_flag()?,
        Event::Start(event) if section == StyleSection::Fonts && event.name() == TAG_UNDERLINE => {
            font.underline = event.get_attribute_value("val")?
                .map(|value| value != "none")
                .unwrap_or(true);
        }
        Event::Start(event) if section == StyleSection::Fonts && event.name() == TAG_FONT_SIZE => {
            if let Some(size) = event.parse_attribute_value::<f64>("val")? {
                font.size = size;
            }
        }
        Event::Start(event) if section == StyleSection::Fonts && event.name() == TAG_FONT_NAME => {
            if let Some(name) = event.get_attribute_value("val")? {
                font.name = name.to_string();
            }
        }
        Event::Start(event) if section == StyleSection::Fonts && event.name() == TAG_COLOR => {
            font.color = event.get_attribute_value("rgb")?.and_then(|rgb| parse_color(&rgb));
        }

        Event::Start(event) if section == StyleSection::Fills && event.name() == TAG_FILL => {
            is_solid = false;
            fill = None;
        }
        Event::End(event) if section == StyleSection::Fills && event.name() == TAG_FILL => {
            fills.push(fill.filter(|_| is_solid));
        }
        Event::Start(event) if section == StyleSection::Fills && event.name() == TAG_PATTERN_FILL => {
            is_solid = event.get_attribute_value("patternType")?
                .map(|pattern| pattern == "solid")
                .unwrap_or(false);
        }
        Event::Start(event) if section == StyleSection::Fills && event.name() == TAG_FOREGROUND_COLOR => {
            fill = event.get_attribute_value("rgb")?.and_then(|rgb| parse_color(&rgb));
        }

        Event::Start(event) if section == StyleSection::Borders && event.name() == TAG_BORDER => {
            border = Borders::default();
        }
        Event::End(event) if section == StyleSection::Borders && event.name() == TAG_BORDER => {
            borders.push(border);
        }
        Event::Start(event) if section == StyleSection::Borders && is_border_side(event.name()) => {
            let style = event.get_attribute_value("style")?
                .and_then(|style| BorderStyle::parse(&style))
                .unwrap_or_default();
            border_side = Some(BorderLine { style, color: None });
        }
        Event::Start(event) if section == StyleSection::Borders && event.name() == TAG_COLOR => {
            if let Some(line) = border_side.as_mut() {
                line.color = event.get_attribute_value("rgb")?.and_then(|rgb| parse_color(&rgb));
            }
        }
        Event::End(event) if section == StyleSection::Borders && is_border_side(event.name()) => {
            if let Some(line) = border_side.take() {
                match event.name().as_ref() {
                    b"left" | b"start" => border.left = line,
                    b"right" | b"end" => border.right = line,
                    b"top" => border.top = line,
                    _ => border.bottom = line,
                }
            }
        }

        Event::Start(event) if section == StyleSection::CellFormats && event.name() == TAG_FORMAT_INDEX => {
            format_index = FormatIndex {
                number_format: event.parse_attribute_value("numFmtId")?.unwrap_or(0),
                font: event.parse_attribute_value("fontId")?.unwrap_or(0),
                fill: event.parse_attribute_value("fillId")?.unwrap_or(0),
                border: event.parse_attribute_value("borderId")?.unwrap_or(0),
                ..FormatIndex::default()
            };
        }
        Event::Start(event) if section == StyleSection::CellFormats && event.name() == TAG_ALIGNMENT => {
            if let Some(horizontal) = event.get_attribute_value("horizontal")? {
                format_index.horizontal = HorizontalAlignment::parse(&horizontal);
            }
            if let Some(vertical) = event.get_attribute_value("vertical")? {
                format_index.vertical = VerticalAlignment::parse(&vertical);
            }
            format_index.wrap_text = event.get_attribute_value("wrapText")?
                .map(|wrap| wrap == "1" || wrap == "true")
                .unwrap_or(false);
        }
        Event::End(event) if section == StyleSection::CellFormats && event.name() == TAG_FORMAT_INDEX => {
            format_indexes.push(std::mem::take(&mut format_index));
        }
    });

    let styles = format_indexes
        .into_iter()
        .map(|index| CellStyle {
            font: fonts.get(index.font).cloned().unwrap_or_default(),
            fill: fills.get(index.fill).copied().flatten(),
            borders: borders.get(index.border).copied().unwrap_or_default(),
            horizontal: index.horizontal,
            vertical: index.vertical,
            wrap_text: index.wrap_text,
            number_format: match custom_formats.get(&index.number_format) {
                Some(code) => NumberFormat::Custom(code.to_owned()),
                None => u8::try_from(index.number_format)
                    .map(NumberFormat::Builtin)
                    .unwrap_or_default(),
            },
        })
        .collect();
    Ok(styles)
}

fn is_border_side(name: QName) -> bool {
    matches!(name.as_ref(), b"left" | b"right" | b"top" | b"bottom" | b"start" | b"end")
}

/// Field of a drawing anchor's `from` marker being read
#[derive(Copy, Clone, Debug, PartialEq)]
enum MarkerField {
    Col,
    ColOffset,
    Row,
    RowOffset,
}

/// A picture anchor collected from a drawing part
#[derive(Default)]
struct PictureAnchor {
    col: i64,
    col_offset: i64,
    row: i64,
    row_offset: i64,
    description: String,
    embed: Option<String>,
    size: Option<(i64, i64)>,
}

/// Loads the pictures of a drawing part together with their media payloads
///
/// # Arguments
/// * `zip` - ZIP archive containing the XLSX file
/// * `path` - Path of the drawing part, e.g. `xl/drawings/drawing1.xml`
///
/// # Returns
/// Images anchored at their `from` cell, sizes converted from EMU to pixels
fn load_drawing(zip: &mut ZipArchive<SourceReader>, path: &str) -> Result<Vec<EmbeddedImage>, EvidenceSheetError> {
    let relationships = load_relationships(zip, path, IMAGE_RELATIONSHIP)?;
    let mut anchors = Vec::<PictureAnchor>::new();
    {
        let mut reader = match zip.xml_reader(path)? {
            Some(reader) => reader,
            None => return Ok(Vec::new()),
        };
        let mut anchor = None::<PictureAnchor>;
        let mut in_from = false;
        let mut field = None::<MarkerField>;
        match_xml_events!(reader => {
            Event::Start(event) if is_anchor(event.local_name().as_ref()) => anchor = Some(PictureAnchor::default()),
            Event::End(event) if is_anchor(event.local_name().as_ref()) => {
                if let Some(anchor) = anchor.take() {
                    anchors.push(anchor);
                }
            }
            Event::Start(event) if event.local_name().as_ref() == b"from" => in_from = true,
            Event::End(event) if event.local_name().as_ref() == b"from" => in_from = false,
            Event::Start(event) if in_from => {
                field = match event.local_name().as_ref() {
                    b"col" => Some(MarkerField::Col),
                    b"colOff" => Some(MarkerField::ColOffset),
                    b"row" => Some(MarkerField::Row),
                    b"rowOff" => Some(MarkerField::RowOffset),
                    _ => None,
                };
            }
            Event::End(_) if field.is_some() => field = None,
            Event::Text(event) if field.is_some() => {
                let number = event.xml_content()?.trim().parse::<i64>()?;
                if let Some(anchor) = anchor.as_mut() {
                    match field {
                        Some(MarkerField::Col) => anchor.col = number,
                        Some(MarkerField::ColOffset) => anchor.col_offset = number,
                        Some(MarkerField::Row) => anchor.row = number,
                        Some(MarkerField::RowOffset) => anchor.row_offset = number,
                        None => (),
                    }
                }
            }
            Event::Start(event) if event.local_name().as_ref() == b"cNvPr" => {
                if let Some(anchor) = anchor.as_mut() {
                    anchor.description = event.get_attribute_value("descr")?
                        .map(|description| description.to_string())
                        .unwrap_or_default();
                }
            }
            Event::Start(event) if event.local_name().as_ref() == b"blip" => {
                if let Some(anchor) = anchor.as_mut() {
                    anchor.embed = event.get_local_attribute_value("embed")?.map(|id| id.to_string());
                }
            }
            Event::Start(event) if event.local_name().as_ref() == b"ext" => {
                let cx = event.parse_attribute_value::<i64>("cx")?;
                let cy = event.parse_attribute_value::<i64>("cy")?;
                if let Some(anchor) = anchor.as_mut() {
                    if anchor.size.is_none() {
                        anchor.size = cx.zip(cy);
                    }
                }
            }
        });
    }

    let mut images = Vec::with_capacity(anchors.len());
    for anchor in anchors {
        let media_path = match anchor.embed.as_ref().and_then(|id| relationships.get(id)) {
            Some(media_path) => media_path,
            None => continue,
        };
        let data = zip.read_bytes(media_path)?
            .ok_or_else(|| SpreadsheetError::FileError(media_path.to_owned()))?;
        let (width, height) = match anchor.size {
            Some((cx, cy)) => (cx as f64 / EMU_PER_PIXEL, cy as f64 / EMU_PER_PIXEL),
            None => image_dimensions(&data)?,
        };
        let name = if anchor.description.is_empty() {
            base_name(media_path).to_owned()
        } else {
            anchor.description
        };
        images.push(EmbeddedImage {
            name,
            data,
            row: anchor.row.max(0) as u32,
            col: anchor.col.max(0) as u16,
            x_offset: (anchor.col_offset.max(0) as f64 / EMU_PER_PIXEL).round() as u32,
            y_offset: (anchor.row_offset.max(0) as f64 / EMU_PER_PIXEL).round() as u32,
            width,
            height,
        });
    }
    Ok(images)
}

fn is_anchor(local_name: &[u8]) -> bool {
    matches!(local_name, b"twoCellAnchor" | b"oneCellAnchor" | b"absoluteAnchor")
}

/// Reads string value from XML content, handling text and CDATA sections
///
/// Extracts string content from XML elements, skipping phonetic text annotations
/// and properly handling both text nodes and CDATA sections.
///
/// # Arguments
/// * `reader` - XML reader positioned at the start of the string content
/// * `end_tag` - XML tag that marks the end of the string content
/// * `is_text_content` - Whether to treat the content as text by default
///
/// # Returns
/// Extracted string value
fn read_string_value(
    reader: &mut XmlReader<BufReader<ZipFile<'_, SourceReader>>>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, EvidenceSheetError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_bytes_text(&event)?,
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}
