//! Content-based cell lookup. Report layouts move between exports, so fields
//! are found by what a cell says rather than where it sits.

use crate::helpers::reference::index_to_reference;
use crate::spreadsheet::CellValue;
use crate::spreadsheet::Grid;
use std::fmt::Display;

/// A `(row, col)` grid coordinate. Lookups that fail return [`Position::NOT_FOUND`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Position {
    pub row: i64,
    pub col: i64,
}

impl Position {
    pub const NOT_FOUND: Position = Position { row: -1, col: -1 };

    pub fn new(row: usize, col: usize) -> Self {
        Position {
            row: row as i64,
            col: col as i64,
        }
    }

    pub fn is_found(&self) -> bool {
        *self != Self::NOT_FOUND
    }

    /// Zero-based `(row, col)` when found.
    pub fn indexes(&self) -> Option<(usize, usize)> {
        if self.is_found() {
            Some((self.row as usize, self.col as usize))
        } else {
            None
        }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.indexes() {
            Some((row, col)) => write!(f, "{}", index_to_reference(row, col)),
            None => write!(f, "(not found)"),
        }
    }
}

/// Finds the `nth` (1-based) cell whose text contains `value`.
///
/// Columns are scanned left to right and, within a column, rows top to
/// bottom. Matching is a case-sensitive substring test on the cell's text
/// form. Returns [`Position::NOT_FOUND`] when there are fewer than `nth`
/// matches or `nth` is zero.
pub fn find_nth_occurrence(grid: &Grid, value: &str, nth: usize) -> Position {
    if nth == 0 {
        return Position::NOT_FOUND;
    }
    (0..grid.width())
        .flat_map(|col| (0..grid.height()).map(move |row| (row, col)))
        .filter(|(row, col)| contains(grid.get(*row, *col), value))
        .nth(nth - 1)
        .map(|(row, col)| Position::new(row, col))
        .unwrap_or(Position::NOT_FOUND)
}

/// Finds the first cell, in reading order, whose text equals `label`.
pub fn find_exact(grid: &Grid, label: &str) -> Position {
    grid.rows()
        .enumerate()
        .find_map(|(row, cells)| {
            cells
                .iter()
                .position(|cell| matches!(cell, CellValue::Text(text) if text == label))
                .map(|col| Position::new(row, col))
        })
        .unwrap_or(Position::NOT_FOUND)
}

/// Returns the value paired with `label` on the same row: the first non-empty
/// cell to the right of the label. Absent label or nothing to its right
/// yields [`CellValue::Absent`].
pub fn find_label_value(grid: &Grid, label: &str) -> CellValue {
    let Some((row, col)) = find_exact(grid, label).indexes() else {
        return CellValue::Absent;
    };
    grid.row(row)
        .iter()
        .skip(col + 1)
        .find(|cell| !cell.is_absent())
        .cloned()
        .unwrap_or(CellValue::Absent)
}

/// Row indexes, top to bottom, where column `col` holds a value.
pub fn find_non_empty_rows(grid: &Grid, col: usize) -> Vec<usize> {
    (0..grid.height())
        .filter(|row| !grid.get(*row, col).is_absent())
        .collect()
}

fn contains(cell: &CellValue, value: &str) -> bool {
    match cell {
        CellValue::Absent => false,
        CellValue::Text(text) => text.contains(value),
        other => other.to_string().contains(value),
    }
}
