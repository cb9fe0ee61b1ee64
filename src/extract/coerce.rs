//! Conversion of raw cells into output field values.

use crate::spreadsheet::CellValue;
use std::fmt::Display;

/// A typed output scalar. `Empty` is written as an empty string, never as zero.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum FieldValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(number) => Some(*number),
            _ => None,
        }
    }
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Empty => Ok(()),
            FieldValue::Number(number) => write!(f, "{}", number),
            FieldValue::Text(text) => write!(f, "{}", text),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        if text.is_empty() {
            FieldValue::Empty
        } else {
            FieldValue::Text(text.to_owned())
        }
    }
}

impl From<&CellValue> for FieldValue {
    /// Keeps numbers as numbers and everything else as trimmed text.
    fn from(cell: &CellValue) -> Self {
        match cell {
            CellValue::Number(number) => FieldValue::Number(*number),
            other => strip(other),
        }
    }
}

/// Trimmed text form of a cell. Absent cells and whitespace-only text are empty.
pub fn strip(cell: &CellValue) -> FieldValue {
    match cell {
        CellValue::Absent => FieldValue::Empty,
        CellValue::Text(text) => FieldValue::from(text.trim()),
        other => FieldValue::from(other.to_string().trim()),
    }
}

/// Numeric form of a cell when it parses as a finite number, otherwise its
/// trimmed text. Absent cells are empty.
pub fn coerce_numeric_or_text(cell: &CellValue) -> FieldValue {
    match cell {
        CellValue::Absent => FieldValue::Empty,
        CellValue::Number(number) if number.is_finite() => FieldValue::Number(*number),
        CellValue::Text(text) => match parse_number(text) {
            Some(number) => FieldValue::Number(number),
            None => strip(cell),
        },
        other => strip(other),
    }
}

/// Numeric coercion followed by rounding to cents.
pub fn money(cell: &CellValue) -> FieldValue {
    match coerce_numeric_or_text(cell) {
        FieldValue::Number(number) => FieldValue::Number(round2(number)),
        other => other,
    }
}

/// Rounds half away from zero to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> CellValue {
        CellValue::Text(value.to_owned())
    }

    #[test]
    fn absent_is_empty_not_zero() {
        assert_eq!(coerce_numeric_or_text(&CellValue::Absent), FieldValue::Empty);
        assert_eq!(money(&CellValue::Absent), FieldValue::Empty);
        assert_eq!(money(&CellValue::Absent).to_string(), "");
    }

    #[test]
    fn numeric_text_becomes_number() {
        assert_eq!(coerce_numeric_or_text(&text(" 1250.5 ")), FieldValue::Number(1250.5));
        assert_eq!(coerce_numeric_or_text(&CellValue::Number(3.0)), FieldValue::Number(3.0));
    }

    #[test]
    fn non_numeric_falls_back_to_trimmed_text() {
        assert_eq!(coerce_numeric_or_text(&text("  n/a ")), FieldValue::Text("n/a".to_owned()));
        // non-finite values are not numbers
        assert_eq!(coerce_numeric_or_text(&text("inf")), FieldValue::Text("inf".to_owned()));
        assert_eq!(coerce_numeric_or_text(&text("   ")), FieldValue::Empty);
    }

    #[test]
    fn money_rounds_to_cents() {
        assert_eq!(money(&CellValue::Number(10.456)), FieldValue::Number(10.46));
        assert_eq!(money(&text("-3.333")), FieldValue::Number(-3.33));
        assert_eq!(money(&text("TBA")), FieldValue::Text("TBA".to_owned()));
        assert_eq!(round2(2.5), 2.5);
    }

    #[test]
    fn verbatim_conversion_keeps_numeric_looking_text() {
        assert_eq!(FieldValue::from(&text("0012")), FieldValue::Text("0012".to_owned()));
        assert_eq!(FieldValue::from(&CellValue::Number(12.5)), FieldValue::Number(12.5));
    }

    #[test]
    fn strip_handles_every_cell_kind() {
        assert_eq!(strip(&text("  Shop 4 ")), FieldValue::Text("Shop 4".to_owned()));
        assert_eq!(strip(&CellValue::Number(42.0)), FieldValue::Text("42".to_owned()));
        assert_eq!(strip(&CellValue::Absent), FieldValue::Empty);
        let date = chrono::NaiveDate::from_ymd_opt(2024, 7, 1)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .unwrap();
        assert_eq!(strip(&CellValue::Date(date)), FieldValue::Text("2024-07-01".to_owned()));
    }
}
