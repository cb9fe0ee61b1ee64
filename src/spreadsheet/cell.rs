use crate::error::IngestError;
use crate::helpers::reference::index_to_reference;
use crate::spreadsheet::SpreadsheetError;
use chrono::Duration;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::Timelike;
use std::collections::HashSet;
use std::fmt::Display;

/// Storage type of a raw cell as declared by the worksheet XML.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    /// Boolean values (1/0)
    Boolean,
    /// Plain numeric values
    Number,
    /// Numbers carrying a date format, 1900 epoch
    NumberDate1900,
    /// Numbers carrying a date format, 1904 epoch
    NumberDate1904,
    /// ISO 8601 date/time strings
    IsoDateTime,
    /// Inline or formula string values
    InlineString,
    /// Shared string table references
    SharedString,
    /// Error values (#N/A, #REF!, ...)
    Error,
}

impl CellType {
    /// Maps built-in number format ids that render dates.
    pub(crate) fn parse_builtin_number_format_id(id: &str, is_1904: bool) -> Option<Self> {
        match id {
            "14" | "15" | "16" | "17" | "22" => Some(Self::date(is_1904)),
            _ => None,
        }
    }

    /// Classifies a custom number format code. Date tokens inside quoted
    /// literals, escapes and bracketed sections (colours, locales) are ignored.
    pub(crate) fn parse_custom_number_format(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_bracket = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' if !is_literal => is_escaped = true,
                '"' => is_literal = !is_literal,
                _ if is_literal => (),
                '[' => is_bracket = true,
                ']' => is_bracket = false,
                _ if is_bracket => (),
                'Y' | 'y' | 'D' | 'd' => return Self::date(is_1904),
                _ => (),
            }
        }
        Self::Number
    }

    fn date(is_1904: bool) -> Self {
        if is_1904 {
            Self::NumberDate1904
        } else {
            Self::NumberDate1900
        }
    }
}

/// Value of one grid cell.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CellValue {
    #[default]
    Absent,
    Text(String),
    Number(f64),
    Date(NaiveDateTime),
}

impl CellValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, CellValue::Absent)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Absent => Ok(()),
            CellValue::Text(text) => write!(f, "{}", text),
            CellValue::Number(number) => write!(f, "{}", number),
            CellValue::Date(datetime) if datetime.num_seconds_from_midnight() == 0 => {
                write!(f, "{}", datetime.format("%Y-%m-%d"))
            }
            CellValue::Date(datetime) => write!(f, "{}", datetime.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// A cell as read from a worksheet, before decoding.
#[derive(Clone, Debug)]
pub(crate) struct Cell {
    /// Row index (0-based)
    pub(crate) row: usize,
    /// Column index (0-based)
    pub(crate) col: usize,
    pub(crate) kind: CellType,
    /// Raw text of the `<v>` or inline string element
    pub(crate) value: String,
}

impl Cell {
    pub(crate) fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    /// Decodes the raw value into a typed [`CellValue`].
    /// Text matching one of `nulls` (after trimming) becomes absent.
    pub(crate) fn decode(
        &self,
        shared_strings: &[String],
        nulls: &HashSet<String>,
    ) -> Result<CellValue, IngestError> {
        let value = match self.kind {
            CellType::Empty | CellType::Error => CellValue::Absent,
            CellType::Boolean => CellValue::Text(if self.value == "1" { "TRUE" } else { "FALSE" }.to_owned()),
            CellType::Number => CellValue::Number(self.to_double()?),
            CellType::NumberDate1900 | CellType::NumberDate1904 => {
                let serial = self.to_double()?;
                match serial_to_datetime(serial, self.kind == CellType::NumberDate1904) {
                    Some(datetime) => CellValue::Date(datetime),
                    None => CellValue::Number(serial),
                }
            }
            CellType::IsoDateTime => parse_iso_datetime(&self.value)
                .map(CellValue::Date)
                .unwrap_or_else(|| CellValue::Text(self.value.to_owned())),
            CellType::InlineString => CellValue::Text(self.value.to_owned()),
            CellType::SharedString => {
                let index = self.value.trim().parse::<usize>()?;
                let text = shared_strings.get(index).ok_or_else(|| {
                    SpreadsheetError::SharedStringMissing {
                        reference: self.reference(),
                        index,
                    }
                })?;
                CellValue::Text(text.to_owned())
            }
        };
        Ok(match value {
            CellValue::Text(text) if text.is_empty() || nulls.contains(text.trim()) => CellValue::Absent,
            value => value,
        })
    }

    fn to_double(&self) -> Result<f64, IngestError> {
        self.value.trim().parse::<f64>().map_err(|_| {
            SpreadsheetError::InvalidCellValue {
                reference: self.reference(),
                value: self.value.to_owned(),
            }
            .into()
        })
    }
}

/// Converts an Excel serial number to a timestamp.
/// The 1900 system counts the non-existent 1900-02-29 (Lotus 1-2-3 compatibility),
/// so serials below 60 are shifted by one day.
pub(crate) fn serial_to_datetime(serial: f64, is_1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let days = serial.trunc() as i64;
    let offset = if is_1904 {
        1462
    } else if days < 60 {
        1
    } else {
        0
    };
    let seconds = (serial.fract() * 86_400f64).round() as i64;
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    epoch.checked_add_signed(Duration::days(days + offset) + Duration::seconds(seconds))
}

fn parse_iso_datetime(value: &str) -> Option<NaiveDateTime> {
    if value.contains('T') {
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").ok()
    } else {
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
    }
}
