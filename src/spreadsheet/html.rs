//! Report exports that carry an `.xls` extension but hold an HTML document.
//! Each `<table>` of the document is read as one sheet named `Table {n}`.

use crate::error::IngestError;
use crate::spreadsheet::CellValue;
use crate::spreadsheet::Criteria;
use crate::spreadsheet::Grid;
use crate::spreadsheet::SpreadsheetError;
use crate::spreadsheet::Workbook;
use scraper::ElementRef;
use scraper::Html;
use scraper::Selector;
use tracing::debug;

/// Browsers clamp `colspan` to this value.
const MAX_COLSPAN: usize = 1000;

/// Sheet name of the table at a zero-based index.
pub fn table_name(index: usize) -> String {
    format!("Table {}", index + 1)
}

/// An HTML document whose tables are read as sheets
pub struct HtmlWorkbook {
    name: String,
    /// Cell text of each table, row by row
    tables: Vec<Vec<Vec<String>>>,
}

impl HtmlWorkbook {
    /// Parses the document. Fails when the bytes are not UTF-8 text or the
    /// document holds no table.
    pub fn from_bytes(name: &str, bytes: Vec<u8>) -> Result<HtmlWorkbook, IngestError> {
        let content = String::from_utf8(bytes).map_err(|_| SpreadsheetError::NotHtml(name.to_owned()))?;
        let document = Html::parse_document(&content);
        let table = Selector::parse("table").expect("Hardcode selector");
        let row = Selector::parse("tr").expect("Hardcode selector");
        let tables: Vec<_> = document
            .select(&table)
            .map(|table| table_rows(table, &row))
            .collect();
        if tables.is_empty() {
            Err(SpreadsheetError::EmptyWorkbook(name.to_owned()))?;
        }
        debug!(workbook = name, tables = tables.len(), "Opened HTML workbook");
        Ok(HtmlWorkbook {
            name: name.to_owned(),
            tables,
        })
    }
}

/// Text of the `th`/`td` children of each row, with `colspan` cells repeated.
fn table_rows(table: ElementRef, row: &Selector) -> Vec<Vec<String>> {
    table
        .select(row)
        .map(|row| {
            let mut cells = Vec::new();
            for cell in row.children().filter_map(ElementRef::wrap) {
                let element = cell.value();
                if !matches!(element.name(), "td" | "th") {
                    continue;
                }
                let span = element
                    .attr("colspan")
                    .and_then(|span| span.trim().parse::<usize>().ok())
                    .unwrap_or(1)
                    .clamp(1, MAX_COLSPAN);
                let text = cell.text().collect::<String>().trim().to_owned();
                cells.extend(std::iter::repeat(text).take(span));
            }
            cells
        })
        .collect()
}

impl Workbook for HtmlWorkbook {
    fn name(&self) -> &str {
        &self.name
    }

    fn sheet_names(&self) -> Vec<String> {
        (0..self.tables.len()).map(table_name).collect()
    }

    fn read_grid(&mut self, sheet_name: &str, criteria: &Criteria) -> Result<Grid, IngestError> {
        let rows = (0..self.tables.len())
            .find(|index| table_name(*index) == sheet_name)
            .map(|index| &self.tables[index])
            .ok_or_else(|| SpreadsheetError::SheetNotFound(sheet_name.to_owned()))?;
        let mut cells = Vec::new();
        for (row, texts) in rows.iter().enumerate() {
            for (col, text) in texts.iter().enumerate() {
                if !text.is_empty() && !criteria.nulls.contains(text) {
                    cells.push((row, col, CellValue::Text(text.to_owned())));
                }
            }
        }
        Ok(Grid::from_cells(cells, criteria.max_cells)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const DIARY: &str = r#"<html><body>
        <table border="1">
          <tr><th>Property</th><th>Unit</th><th>Lease Expiry (Date)</th><th>Tenant's Name</th></tr>
          <tr><td>Harbour House</td><td>G01</td><td>31/12/2028</td><td> Acme Pty Ltd </td></tr>
          <tr><td></td><td></td><td></td><td></td></tr>
          <tr><td colspan="2">Pier Plaza</td><td>Infinity</td><td>Beta Cafe</td></tr>
        </table>
        <table><tr><td>Printed by cirrus8</td></tr></table>
        </body></html>"#;

    fn criteria() -> Criteria {
        Criteria {
            nulls: HashSet::from(["Infinity".to_owned()]),
            ..Criteria::default()
        }
    }

    #[test]
    fn tables_are_sheets_in_document_order() {
        let workbook = HtmlWorkbook::from_bytes("diary.xls", DIARY.as_bytes().to_vec()).unwrap();
        assert_eq!(workbook.name(), "diary.xls");
        assert_eq!(workbook.sheet_names(), vec!["Table 1", "Table 2"]);
    }

    #[test]
    fn reads_cells_as_trimmed_text() {
        let mut workbook = HtmlWorkbook::from_bytes("diary.xls", DIARY.as_bytes().to_vec()).unwrap();
        let grid = workbook.read_grid("Table 1", &criteria()).unwrap();
        assert_eq!(grid.height(), 4);
        assert_eq!(grid.width(), 4);
        assert_eq!(grid.get(0, 2).as_text(), Some("Lease Expiry (Date)"));
        assert_eq!(grid.get(1, 3).as_text(), Some("Acme Pty Ltd"));
        assert!(grid.row(2).iter().all(CellValue::is_absent));
        assert_eq!(grid.get(3, 0).as_text(), Some("Pier Plaza"));
        assert_eq!(grid.get(3, 1).as_text(), Some("Pier Plaza"));
        assert!(grid.get(3, 2).is_absent());
    }

    #[test]
    fn rejects_documents_without_tables() {
        let error = HtmlWorkbook::from_bytes("empty.xls", b"<html><p>none</p></html>".to_vec()).err().unwrap();
        assert_eq!(error.to_string(), "Workbook 'empty.xls' contains no worksheets");
        assert!(matches!(
            HtmlWorkbook::from_bytes("binary.xls", vec![0xD0, 0xCF, 0x11, 0xE0, 0xFF]),
            Err(IngestError::SpreadsheetError(SpreadsheetError::NotHtml(_)))
        ));
    }

    #[test]
    fn unknown_table_is_an_error() {
        let mut workbook = HtmlWorkbook::from_bytes("diary.xls", DIARY.as_bytes().to_vec()).unwrap();
        assert!(workbook.read_grid("Table 3", &criteria()).is_err());
    }
}
