//! A1-style cell reference conversions.
//!
//! Rows and columns are 0-based indexes; the letters and numbers of a reference are 1-based.

/// Largest column index of an xlsx worksheet (`XFD`)
pub const MAX_COLUMN: u16 = 16_383;

/// Largest row index of an xlsx worksheet (1048576)
pub const MAX_ROW: u32 = 1_048_575;

/// Converts column letters ("A", "AB") to a 0-based column index.
pub fn col_to_index(letters: &str) -> Option<u16> {
    if letters.is_empty() {
        return None;
    }
    let mut index = 0u32;
    for character in letters.chars() {
        if !character.is_ascii_alphabetic() {
            return None;
        }
        index = index * 26 + (character.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
        if index > MAX_COLUMN as u32 + 1 {
            return None;
        }
    }
    Some((index - 1) as u16)
}

/// Converts a 1-based row number ("12") to a 0-based row index.
pub fn row_to_index(digits: &str) -> Option<u32> {
    match digits.parse::<u32>() {
        Ok(row) if (1..=MAX_ROW + 1).contains(&row) => Some(row - 1),
        _ => None,
    }
}

/// Splits a reference like "B12" (optionally with `$` anchors) into 0-based (row, col).
pub fn reference_to_index(reference: &str) -> Option<(u32, u16)> {
    let reference = reference.replace('$', "");
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    Some((row_to_index(digits)?, col_to_index(letters)?))
}

/// Converts a 0-based column index to its letters.
pub fn column_name(col: u16) -> String {
    let mut col = col as u32 + 1;
    let mut letters = Vec::new();
    while col > 0 {
        let remainder = (col - 1) % 26;
        letters.push((b'A' + remainder as u8) as char);
        col = (col - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Converts 0-based (row, col) to a reference like "B12".
pub fn index_to_reference(row: u32, col: u16) -> String {
    format!("{}{}", column_name(col), row + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns() {
        assert_eq!(col_to_index("A"), Some(0));
        assert_eq!(col_to_index("k"), Some(10));
        assert_eq!(col_to_index("AA"), Some(26));
        assert_eq!(col_to_index("XFD"), Some(MAX_COLUMN));
        assert_eq!(col_to_index("XFE"), None);
        assert_eq!(col_to_index(""), None);
        assert_eq!(col_to_index("A1"), None);

        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
        assert_eq!(column_name(701), "ZZ");
        assert_eq!(column_name(702), "AAA");
    }

    #[test]
    fn references() {
        assert_eq!(reference_to_index("A1"), Some((0, 0)));
        assert_eq!(reference_to_index("$K$12"), Some((11, 10)));
        assert_eq!(reference_to_index("B0"), None);
        assert_eq!(reference_to_index("12"), None);
        assert_eq!(index_to_reference(11, 10), "K12");
    }
}
