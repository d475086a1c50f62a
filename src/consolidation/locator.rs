use crate::consolidation::naming::AssociationKey;
use crate::spreadsheet::sheet::Worksheet;

/// How an association key is resolved to a worksheet row
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LocateStrategy {
    /// Row is `base_offset + key number`; keys with an item never resolve
    Arithmetic { base_offset: u32 },
    /// Walks the marker column top to bottom: a numeric cell opens a section, a letter
    /// cell inside the key's section matches the key's item letter, a dotted cell
    /// matches a numbered key
    Scan,
    /// First row whose marker text equals the key; numbered keys also match "03.3"
    Exact,
}

/// Resolves `key` to a row of `sheet` using only the contents of `marker_column`.
///
/// # Arguments
/// * `sheet` - Consolidated worksheet, read only
/// * `key` - Association key parsed from an evidence file name
/// * `marker_column` - Column holding section numbers and item letters
/// * `strategy` - Resolution strategy of the deployment
///
/// # Returns
/// The 0-based row index, `None` when the key matches no row
pub fn locate_row(sheet: &Worksheet, key: &AssociationKey, marker_column: u16, strategy: &LocateStrategy) -> Option<u32> {
    match strategy {
        LocateStrategy::Arithmetic { base_offset } => {
            if key.item().is_some() {
                return None;
            }
            let row = base_offset.checked_add(key.number())?;
            sheet.last_row().filter(|&last_row| row <= last_row).map(|_| row)
        }
        LocateStrategy::Scan => scan(sheet, key, marker_column),
        LocateStrategy::Exact => {
            let expected = key.to_string();
            let last_row = sheet.last_row_in_column(marker_column)?;
            (0..=last_row).find(|&row| {
                let marker = sheet.text(row, marker_column);
                let marker = marker.trim();
                marker.eq_ignore_ascii_case(&expected) || is_numbered(marker, key)
            })
        }
    }
}

fn scan(sheet: &Worksheet, key: &AssociationKey, marker_column: u16) -> Option<u32> {
    let last_row = sheet.last_row_in_column(marker_column)?;
    let mut section = None::<u32>;
    for row in 0..=last_row {
        let marker = sheet.text(row, marker_column);
        let marker = marker.trim();
        if marker.is_empty() {
            continue;
        }
        if let Some(number) = section_number(marker) {
            section = Some(number);
            if number == key.number() && key.item().is_none() {
                return Some(row);
            }
        } else if is_numbered(marker, key) {
            return Some(row);
        } else if section == Some(key.number()) {
            if let Some(letter) = key.letter() {
                if item_letter(marker) == Some(letter) {
                    return Some(row);
                }
            }
        }
    }
    None
}

/// Section number of a purely numeric marker ("2", "02", "2.0")
fn section_number(marker: &str) -> Option<u32> {
    if marker.chars().all(|c| c.is_ascii_digit()) {
        return marker.parse().ok();
    }
    match marker.parse::<f64>() {
        Ok(number) if number.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(&number) => Some(number as u32),
        _ => None,
    }
}

/// Whether `marker` is the dotted question number ("3.3", "03.3") of a numbered key
fn is_numbered(marker: &str, key: &AssociationKey) -> bool {
    let Some(sub_number) = key.sub_number() else {
        return false;
    };
    match marker.split_once('.') {
        Some((number, sub)) => number.parse::<u32>().ok() == Some(key.number()) && sub.parse::<u32>().ok() == Some(sub_number),
        None => false,
    }
}

/// Uppercase item letter of a single-letter marker ("b", "B", "(b)", "b.")
fn item_letter(marker: &str) -> Option<char> {
    let mut letters = marker
        .trim_matches(|c: char| c == '(' || c == ')' || c == '.' || c.is_whitespace())
        .chars();
    match (letters.next(), letters.next()) {
        (Some(letter), None) if letter.is_ascii_alphabetic() => Some(letter.to_ascii_uppercase()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(markers: &[&str]) -> Worksheet {
        let mut sheet = Worksheet::new("Sheet1");
        for (row, marker) in markers.iter().enumerate() {
            sheet.set_value(row as u32, 0, *marker);
            sheet.set_value(row as u32, 1, format!("Question {}", row));
        }
        sheet
    }

    fn key(value: &str) -> AssociationKey {
        value.parse().unwrap()
    }

    #[test]
    fn scan_finds_letter_inside_section() {
        let sheet = sheet(&["2", "A", "B", "3", "A"]);
        assert_eq!(locate_row(&sheet, &key("2_B"), 0, &LocateStrategy::Scan), Some(2));
        assert_eq!(locate_row(&sheet, &key("3_A"), 0, &LocateStrategy::Scan), Some(4));
        assert_eq!(locate_row(&sheet, &key("2_A"), 0, &LocateStrategy::Scan), Some(1));
        assert_eq!(locate_row(&sheet, &key("3_B"), 0, &LocateStrategy::Scan), None);
        assert_eq!(locate_row(&sheet, &key("4_A"), 0, &LocateStrategy::Scan), None);
    }

    #[test]
    fn scan_section_rules() {
        let sheet = sheet(&["Sl No", "02", "a", "", "Note", "c", "3", "c"]);
        // Numeric comparison of sections, case-insensitive letters
        assert_eq!(locate_row(&sheet, &key("2_A"), 0, &LocateStrategy::Scan), Some(2));
        // Non-matching markers do not close the section
        assert_eq!(locate_row(&sheet, &key("2_C"), 0, &LocateStrategy::Scan), Some(5));
        assert_eq!(locate_row(&sheet, &key("3_C"), 0, &LocateStrategy::Scan), Some(7));
        // A key without letter resolves to its section row
        assert_eq!(locate_row(&sheet, &key("3"), 0, &LocateStrategy::Scan), Some(6));
    }

    #[test]
    fn scan_numeric_cells() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_value(0, 0, 5.0);
        sheet.set_value(1, 0, "b");
        assert_eq!(locate_row(&sheet, &key("5_B"), 0, &LocateStrategy::Scan), Some(1));
    }

    #[test]
    fn arithmetic() {
        let sheet = sheet(&["Sl No", "1", "2", "3"]);
        let strategy = LocateStrategy::Arithmetic { base_offset: 0 };
        assert_eq!(locate_row(&sheet, &key("2"), 0, &strategy), Some(2));
        assert_eq!(locate_row(&sheet, &key("4"), 0, &strategy), None);
        assert_eq!(locate_row(&sheet, &key("2_A"), 0, &strategy), None);
        assert_eq!(locate_row(&sheet, &key("2.1"), 0, &strategy), None);
        let strategy = LocateStrategy::Arithmetic { base_offset: 1 };
        assert_eq!(locate_row(&sheet, &key("2"), 0, &strategy), Some(3));
    }

    #[test]
    fn exact() {
        let sheet = sheet(&["Sl No", "1", "2", "3_d", "2"]);
        assert_eq!(locate_row(&sheet, &key("2"), 0, &LocateStrategy::Exact), Some(2));
        assert_eq!(locate_row(&sheet, &key("3_D"), 0, &LocateStrategy::Exact), Some(3));
        assert_eq!(locate_row(&sheet, &key("7"), 0, &LocateStrategy::Exact), None);
        assert_eq!(locate_row(&Worksheet::new("Empty"), &key("7"), 0, &LocateStrategy::Exact), None);
    }

    #[test]
    fn numbered_questions() {
        let sheet = sheet(&["Sl No", "3", "3.1", "03.3", "3.30"]);
        for strategy in [LocateStrategy::Exact, LocateStrategy::Scan] {
            assert_eq!(locate_row(&sheet, &key("3.3"), 0, &strategy), Some(3));
            assert_eq!(locate_row(&sheet, &key("3.1"), 0, &strategy), Some(2));
            assert_eq!(locate_row(&sheet, &key("3.30"), 0, &strategy), Some(4));
            assert_eq!(locate_row(&sheet, &key("3.2"), 0, &strategy), None);
        }
    }
}
