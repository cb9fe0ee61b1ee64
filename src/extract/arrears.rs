//! Aged debtor (arrears) listings.
//!
//! Debtors are grouped under property headings: a heading row carries the
//! property in the tenant column and has no lease name. Subtotal rows are
//! marked by `" total"` in the tenant column.

use crate::extract::coerce::strip;
use crate::extract::search::find_exact;
use crate::extract::ExtractError;
use crate::extract::FieldValue;
use crate::extract::SheetExtractor;
use crate::period::ReportPeriod;
use crate::spreadsheet::Grid;
use serde::Deserialize;
use tracing::debug;

/// Leading columns added in front of the sheet's own columns.
pub const ARREARS_LEADING_COLUMNS: [&str; 4] = ["Property ID", "Tenant ID", "Month", "Year"];

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ArrearsLayout {
    /// Sheet holding the debtor listing
    pub sheet_name: String,
    pub tenant_label: String,
    pub lease_name_label: String,
    /// Substring of the tenant cell that marks a subtotal row
    pub total_marker: String,
}

impl Default for ArrearsLayout {
    fn default() -> Self {
        ArrearsLayout {
            sheet_name: "Aged Debtors".to_owned(),
            tenant_label: "Tenant".to_owned(),
            lease_name_label: "Lease Name".to_owned(),
            total_marker: " total".to_owned(),
        }
    }
}

/// Debtor rows of one sheet with their column header.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SheetArrears {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<FieldValue>>,
}

pub struct ArrearsExtractor {
    layout: ArrearsLayout,
    period: Option<ReportPeriod>,
}

impl ArrearsExtractor {
    pub fn new(layout: ArrearsLayout, period: Option<ReportPeriod>) -> Self {
        ArrearsExtractor { layout, period }
    }

    fn missing(&self, label: &str) -> ExtractError {
        ExtractError::MissingHeader {
            label: label.to_owned(),
        }
    }
}

impl SheetExtractor for ArrearsExtractor {
    type Output = SheetArrears;

    fn extract(&self, sheet_name: &str, grid: &Grid) -> Result<SheetArrears, ExtractError> {
        let (header_row, tenant_col) = find_exact(grid, &self.layout.tenant_label)
            .indexes()
            .ok_or_else(|| self.missing(&self.layout.tenant_label))?;
        let header = grid.row(header_row);
        let lease_col = header
            .iter()
            .position(|cell| cell.as_text() == Some(self.layout.lease_name_label.as_str()))
            .ok_or_else(|| self.missing(&self.layout.lease_name_label))?;

        let carried: Vec<usize> = (0..grid.width()).filter(|col| *col != tenant_col).collect();
        let columns = ARREARS_LEADING_COLUMNS
            .iter()
            .map(|name| name.to_string())
            .chain(carried.iter().map(|col| match strip(&header[*col]) {
                FieldValue::Empty => format!("column{}", col + 1),
                name => name.to_string(),
            }))
            .collect();

        let (month, year) = match self.period {
            Some(period) => (
                FieldValue::Number(period.month as f64),
                FieldValue::Number(period.year as f64),
            ),
            None => (FieldValue::Empty, FieldValue::Empty),
        };

        let mut property = FieldValue::Empty;
        let mut rows = Vec::new();
        for cells in grid.rows().skip(header_row + 1) {
            if cells.iter().all(|cell| cell.is_absent()) {
                continue;
            }
            let tenant = strip(&cells[tenant_col]);
            if tenant.to_string().contains(&self.layout.total_marker) {
                continue;
            }
            if strip(&cells[lease_col]).is_empty() {
                // A heading without a tenant cell keeps the current property
                if !tenant.is_empty() {
                    property = tenant;
                }
                continue;
            }
            let mut row = vec![property.clone(), tenant, month.clone(), year.clone()];
            row.extend(carried.iter().map(|col| FieldValue::from(&cells[*col])));
            rows.push(row);
        }
        debug!(sheet = sheet_name, rows = rows.len(), "Extracted arrears");
        Ok(SheetArrears { columns, rows })
    }
}
