//! Conversions between zero-based (row, column) indexes and `A1` references

/// Rows in an Excel worksheet.
pub const MAX_ROWS: usize = 1_048_576;

/// Columns in an Excel worksheet (`A` to `XFD`).
pub const MAX_COLUMNS: usize = 16_384;

/// Whether zero-based indexes address a cell inside an Excel worksheet.
pub fn is_within_sheet(row: usize, col: usize) -> bool {
    row < MAX_ROWS && col < MAX_COLUMNS
}

/// Converts a zero-based column index to its letters (`0` -> `A`, `26` -> `AA`).
pub fn column_letters(col: usize) -> String {
    let mut letters = Vec::new();
    let mut remaining = col + 1;
    while remaining > 0 {
        remaining -= 1;
        letters.push(b'A' + (remaining % 26) as u8);
        remaining /= 26;
    }
    letters.iter().rev().map(|byte| *byte as char).collect()
}

/// Converts zero-based indexes to an `A1` style reference.
pub fn index_to_reference(row: usize, col: usize) -> String {
    format!("{}{}", column_letters(col), row + 1)
}

/// Parses an `A1` style reference (absolute markers allowed) into zero-based indexes.
pub fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let reference = reference.replace('$', "");
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let col = letters
        .chars()
        .try_fold(0usize, |acc, c| {
            let digit = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
            acc.checked_mul(26)?.checked_add(digit)
        })?;
    let row = digits.parse::<usize>().ok()?;
    if row == 0 {
        return None;
    }
    Some((row - 1, col - 1))
}
