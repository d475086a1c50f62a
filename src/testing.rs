//! In-process fixtures shared by the unit tests.
use crate::spreadsheet::sheet::Worksheet;
use image::ImageFormat;
use image::Rgb;
use image::RgbImage;
use std::io::Cursor;
use std::io::Write;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// A solid PNG of the given pixel size.
pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([0x36, 0x60, 0x92]));
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
    bytes
}

/// A zip archive holding `entries`; names ending with '/' become directory entries.
pub(crate) fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, SimpleFileOptions::default()).unwrap();
        } else {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

/// A worksheet with one text cell per non-empty string, rows from the top.
pub(crate) fn questionnaire(name: &str, rows: &[&[&str]]) -> Worksheet {
    let mut sheet = Worksheet::new(name);
    for (row, values) in rows.iter().enumerate() {
        for (col, value) in values.iter().enumerate() {
            if !value.is_empty() {
                sheet.set_value(row as u32, col as u16, *value);
            }
        }
    }
    sheet
}
