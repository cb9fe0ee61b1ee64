use crate::extract::coerce::strip;
use crate::extract::ExtractError;
use crate::extract::FieldValue;
use crate::extract::SheetExtractor;
use crate::spreadsheet::Grid;

/// A sheet dumped as-is: first row as header, remaining rows verbatim.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SheetDump {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<FieldValue>>,
}

/// Dumps every sheet of a multi-sheet report export.
#[derive(Default)]
pub struct ReportExtractor;

impl SheetExtractor for ReportExtractor {
    type Output = SheetDump;

    fn extract(&self, _sheet_name: &str, grid: &Grid) -> Result<SheetDump, ExtractError> {
        let mut rows = grid.rows();
        let header = rows.next().ok_or(ExtractError::EmptySheet)?;
        let columns = header
            .iter()
            .enumerate()
            .map(|(col, cell)| match strip(cell) {
                FieldValue::Empty => format!("column{}", col + 1),
                name => name.to_string(),
            })
            .collect();
        let rows = rows
            .map(|cells| cells.iter().map(FieldValue::from).collect())
            .collect();
        Ok(SheetDump { columns, rows })
    }
}
