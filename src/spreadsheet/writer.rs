use crate::error::EvidenceSheetError;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::sheet::EmbeddedImage;
use crate::spreadsheet::sheet::Worksheet;
use crate::spreadsheet::style::BorderStyle;
use crate::spreadsheet::style::CellStyle;
use crate::spreadsheet::style::HorizontalAlignment;
use crate::spreadsheet::style::NumberFormat;
use crate::spreadsheet::style::VerticalAlignment;
use crate::spreadsheet::Document;
use rust_xlsxwriter::Color;
use rust_xlsxwriter::DocProperties;
use rust_xlsxwriter::ExcelDateTime;
use rust_xlsxwriter::Format;
use rust_xlsxwriter::FormatAlign;
use rust_xlsxwriter::FormatBorder;
use rust_xlsxwriter::FormatPattern;
use rust_xlsxwriter::FormatUnderline;
use rust_xlsxwriter::Formula;
use rust_xlsxwriter::Image;
use rust_xlsxwriter::Workbook;

/// Serializes a document to xlsx bytes.
///
/// The creation timestamp is pinned so identical documents produce identical bytes.
pub(crate) fn write_document(document: &Document) -> Result<Vec<u8>, EvidenceSheetError> {
    let mut workbook = Workbook::new();
    let created = ExcelDateTime::from_ymd(2000, 1, 1)?;
    let properties = DocProperties::new().set_creation_datetime(&created);
    workbook.set_properties(&properties);

    for sheet in &document.worksheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name)?;
        write_worksheet(worksheet, sheet)?;
    }
    Ok(workbook.save_to_buffer()?)
}

fn write_worksheet(worksheet: &mut rust_xlsxwriter::Worksheet, sheet: &Worksheet) -> Result<(), EvidenceSheetError> {
    for (col, width) in sheet.column_widths() {
        worksheet.set_column_width_pixels(col, width_to_pixels(width))?;
    }
    for (row, height) in sheet.row_heights() {
        worksheet.set_row_height(row, height)?;
    }

    // Merges first: merge_range fills every covered cell, the cell loop below then
    // restores each cell's own value and style.
    for range in sheet.merged_ranges().iter().filter(|range| !range.is_single_cell()) {
        let format = sheet.cell(range.first_row, range.first_col)
            .map(|cell| to_format(&cell.style))
            .unwrap_or_default();
        worksheet.merge_range(range.first_row, range.first_col, range.last_row, range.last_col, "", &format)?;
    }

    for (row, col, cell) in sheet.cells() {
        let format = to_format(&cell.style);
        match &cell.value {
            CellValue::Empty => {
                worksheet.write_blank(row, col, &format)?;
            }
            CellValue::Text(text) if text.is_empty() => {
                worksheet.write_blank(row, col, &format)?;
            }
            CellValue::Text(text) => {
                worksheet.write_string_with_format(row, col, text, &format)?;
            }
            CellValue::Number(number) => {
                worksheet.write_number_with_format(row, col, *number, &format)?;
            }
            CellValue::Boolean(boolean) => {
                worksheet.write_boolean_with_format(row, col, *boolean, &format)?;
            }
            CellValue::Formula { expression, cached } => {
                let mut formula = Formula::new(expression);
                if let Some(cached) = cached {
                    formula = formula.set_result(cached);
                }
                worksheet.write_formula_with_format(row, col, formula, &format)?;
            }
        }
    }

    for image in sheet.images() {
        insert_image(worksheet, image)?;
    }
    Ok(())
}

fn insert_image(worksheet: &mut rust_xlsxwriter::Worksheet, embedded: &EmbeddedImage) -> Result<(), EvidenceSheetError> {
    let image = Image::new_from_buffer(&embedded.data)?;
    // Displayed size is pixels * scale * 96 / dpi
    let natural_width = image.width() * 96.0 / dpi_or_default(image.width_dpi());
    let natural_height = image.height() * 96.0 / dpi_or_default(image.height_dpi());
    let mut image = image.set_alt_text(embedded.name.as_str());
    if natural_width > 0.0 && natural_height > 0.0 {
        image = image
            .set_scale_width(embedded.width / natural_width)
            .set_scale_height(embedded.height / natural_height);
    }
    worksheet.insert_image_with_offset(embedded.row, embedded.col, &image, embedded.x_offset, embedded.y_offset)?;
    Ok(())
}

fn dpi_or_default(dpi: f64) -> f64 {
    if dpi > 0.0 { dpi } else { 96.0 }
}

/// Converts a width in character units to pixels the way Excel renders it
/// for the default font (maximum digit width 7px).
pub(crate) fn width_to_pixels(width: f64) -> u16 {
    let pixels = ((256.0 * width + (128.0_f64 / 7.0).trunc()) / 256.0 * 7.0).trunc();
    pixels.clamp(0.0, u16::MAX as f64) as u16
}

fn to_format(style: &CellStyle) -> Format {
    let font = &style.font;
    let mut format = Format::new()
        .set_font_name(font.name.as_str())
        .set_font_size(font.size);
    if font.bold {
        format = format.set_bold();
    }
    if font.italic {
        format = format.set_italic();
    }
    if font.underline {
        format = format.set_underline(FormatUnderline::Single);
    }
    if let Some(color) = font.color {
        format = format.set_font_color(Color::RGB(color));
    }
    if let Some(fill) = style.fill {
        format = format
            .set_pattern(FormatPattern::Solid)
            .set_background_color(Color::RGB(fill));
    }

    let borders = &style.borders;
    if !borders.left.is_none() {
        format = format.set_border_left(to_border(borders.left.style));
        if let Some(color) = borders.left.color {
            format = format.set_border_left_color(Color::RGB(color));
        }
    }
    if !borders.right.is_none() {
        format = format.set_border_right(to_border(borders.right.style));
        if let Some(color) = borders.right.color {
            format = format.set_border_right_color(Color::RGB(color));
        }
    }
    if !borders.top.is_none() {
        format = format.set_border_top(to_border(borders.top.style));
        if let Some(color) = borders.top.color {
            format = format.set_border_top_color(Color::RGB(color));
        }
    }
    if !borders.bottom.is_none() {
        format = format.set_border_bottom(to_border(borders.bottom.style));
        if let Some(color) = borders.bottom.color {
            format = format.set_border_bottom_color(Color::RGB(color));
        }
    }

    format = match style.horizontal {
        HorizontalAlignment::General => format,
        HorizontalAlignment::Left => format.set_align(FormatAlign::Left),
        HorizontalAlignment::Center => format.set_align(FormatAlign::Center),
        HorizontalAlignment::Right => format.set_align(FormatAlign::Right),
        HorizontalAlignment::Fill => format.set_align(FormatAlign::Fill),
        HorizontalAlignment::Justify => format.set_align(FormatAlign::Justify),
        HorizontalAlignment::CenterAcross => format.set_align(FormatAlign::CenterAcross),
        HorizontalAlignment::Distributed => format.set_align(FormatAlign::Distributed),
    };
    format = match style.vertical {
        VerticalAlignment::Bottom => format,
        VerticalAlignment::Top => format.set_align(FormatAlign::Top),
        VerticalAlignment::Center => format.set_align(FormatAlign::VerticalCenter),
        VerticalAlignment::Justify => format.set_align(FormatAlign::VerticalJustify),
        VerticalAlignment::Distributed => format.set_align(FormatAlign::VerticalDistributed),
    };
    if style.wrap_text {
        format = format.set_text_wrap();
    }

    match &style.number_format {
        NumberFormat::Builtin(0) => format,
        NumberFormat::Builtin(index) => format.set_num_format_index(*index),
        NumberFormat::Custom(code) => format.set_num_format(code.as_str()),
    }
}

fn to_border(style: BorderStyle) -> FormatBorder {
    match style {
        BorderStyle::None => FormatBorder::None,
        BorderStyle::Thin => FormatBorder::Thin,
        BorderStyle::Medium => FormatBorder::Medium,
        BorderStyle::Dashed => FormatBorder::Dashed,
        BorderStyle::Dotted => FormatBorder::Dotted,
        BorderStyle::Thick => FormatBorder::Thick,
        BorderStyle::Double => FormatBorder::Double,
        BorderStyle::Hair => FormatBorder::Hair,
        BorderStyle::MediumDashed => FormatBorder::MediumDashed,
        BorderStyle::DashDot => FormatBorder::DashDot,
        BorderStyle::MediumDashDot => FormatBorder::MediumDashDot,
        BorderStyle::DashDotDot => FormatBorder::DashDotDot,
        BorderStyle::MediumDashDotDot => FormatBorder::MediumDashDotDot,
        BorderStyle::SlantDashDot => FormatBorder::SlantDashDot,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_width_pixels() {
        assert_eq!(width_to_pixels(20.0), 140);
        assert_eq!(width_to_pixels(20.7109375), 145);
        assert_eq!(width_to_pixels(15.0), 105);
        assert_eq!(width_to_pixels(60.0), 420);
        assert_eq!(width_to_pixels(0.0), 0);
    }
}
