//! Lease expiry diaries: a plain table whose column names are normalised to
//! `snake_case` identifiers and whose blank rows are dropped.

use crate::extract::report::ReportExtractor;
use crate::extract::report::SheetDump;
use crate::extract::ExtractError;
use crate::extract::SheetExtractor;
use crate::spreadsheet::Grid;
use regex::Regex;
use std::sync::LazyLock;

static PUNCTUATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]").expect("Hardcode regex pattern"));

/// Lowercases a header, turns spaces into underscores and drops punctuation:
/// `"Lease Expiry (Date)"` becomes `lease_expiry_date`.
pub fn clean_column_name(name: &str) -> String {
    let name = name.to_lowercase().replace(' ', "_");
    PUNCTUATION.replace_all(&name, "").into_owned()
}

#[derive(Default)]
pub struct DiaryExtractor;

impl SheetExtractor for DiaryExtractor {
    type Output = SheetDump;

    fn extract(&self, sheet_name: &str, grid: &Grid) -> Result<SheetDump, ExtractError> {
        let dump = ReportExtractor.extract(sheet_name, grid)?;
        Ok(SheetDump {
            columns: dump.columns.iter().map(|name| clean_column_name(name)).collect(),
            rows: dump
                .rows
                .into_iter()
                .filter(|row| !row.iter().all(|value| value.is_empty()))
                .collect(),
        })
    }
}
