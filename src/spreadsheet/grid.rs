use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::SpreadsheetError;

static ABSENT: CellValue = CellValue::Absent;

/// A rectangular block of cell values, anchored at the sheet's first row and column.
/// Every row holds exactly `width` cells; short rows are padded with [`CellValue::Absent`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Grid {
    rows: Vec<Vec<CellValue>>,
    width: usize,
}

impl Grid {
    /// Builds a grid from possibly ragged rows.
    pub fn new(mut rows: Vec<Vec<CellValue>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, CellValue::Absent);
        }
        Grid { rows, width }
    }

    /// Builds a grid from sparse `(row, col, value)` cells.
    ///
    /// The grid is dense, so a sheet whose used range would exceed
    /// `max_cells` is rejected before anything is allocated.
    pub(crate) fn from_cells(cells: Vec<(usize, usize, CellValue)>, max_cells: usize) -> Result<Self, SpreadsheetError> {
        let height = cells.iter().map(|(row, _, _)| row + 1).max().unwrap_or(0);
        let width = cells.iter().map(|(_, col, _)| col + 1).max().unwrap_or(0);
        if height.saturating_mul(width) > max_cells {
            return Err(SpreadsheetError::SheetTooLarge {
                rows: height,
                columns: width,
                limit: max_cells,
            });
        }
        let mut rows = vec![vec![CellValue::Absent; width]; height];
        for (row, col, value) in cells {
            rows[row][col] = value;
        }
        Ok(Grid { rows, width })
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.width == 0
    }

    /// Cell at `(row, col)`; positions outside the grid read as absent.
    pub fn get(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(col))
            .unwrap_or(&ABSENT)
    }

    pub fn row(&self, row: usize) -> &[CellValue] {
        self.rows.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn rows(&self) -> impl Iterator<Item = &[CellValue]> + '_ {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Drops the first `count` rows, moving the origin down.
    pub fn skip_rows(mut self, count: usize) -> Self {
        self.rows.drain(..count.min(self.rows.len()));
        self
    }

    /// Builds a grid of text cells; empty strings become absent.
    #[cfg(test)]
    pub(crate) fn from_text(rows: &[&[&str]]) -> Self {
        Grid::new(
            rows.iter()
                .map(|row| {
                    row.iter()
                        .map(|text| {
                            if text.is_empty() {
                                CellValue::Absent
                            } else {
                                CellValue::Text((*text).to_owned())
                            }
                        })
                        .collect()
                })
                .collect(),
        )
    }
}
