//! Flattens per-sheet records into whole-workbook tables and renders them as
//! delimited text.

use crate::error::IngestError;
use crate::extract::arrears::SheetArrears;
use crate::extract::report::SheetDump;
use crate::extract::tenancy::SheetTenancies;
use crate::extract::tenancy::CHARGE_COLUMNS;
use crate::extract::tenancy::TENANCY_FIELDS;
use crate::extract::FieldValue;
use crate::orchestrator::WorkbookResult;
use csv::WriterBuilder;
use std::collections::HashMap;

/// A named table with a fixed header row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    /// Output file stem
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<FieldValue>>,
}

impl Table {
    pub fn new<S: ToString>(name: &str, columns: &[S]) -> Self {
        Table {
            name: name.to_owned(),
            columns: columns.iter().map(|column| column.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Renders the header and rows. Empty values are written as empty fields.
    pub fn to_csv(&self, delimiter: u8) -> Result<Vec<u8>, IngestError> {
        let mut writer = WriterBuilder::new()
            .delimiter(delimiter)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(vec![]);
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|value| value.to_string()))?;
        }
        Ok(writer.into_inner().map_err(|e| e.into_error())?)
    }
}

/// Tenancy and charge tables of a schedule workbook, in sheet then anchor order.
pub fn tenancy_tables(result: &WorkbookResult<SheetTenancies>) -> (Table, Table) {
    let columns: Vec<&str> = ["sheet", "property"]
        .into_iter()
        .chain(TENANCY_FIELDS.iter().map(|field| field.name))
        .collect();
    let mut tenancies = Table::new("tenancies", &columns);
    let mut charges = Table::new("charges", &CHARGE_COLUMNS);
    for sheet in result.outputs() {
        tenancies.rows.extend(sheet.tenancies.iter().map(|tenancy| {
            let mut row = vec![FieldValue::from(tenancy.sheet.as_str()), tenancy.property.clone()];
            row.extend(tenancy.fields.iter().cloned());
            row
        }));
        charges.rows.extend(sheet.charges.iter().map(|charge| charge.values()));
    }
    (tenancies, charges)
}

/// Arrears rows of every sheet. Columns are the union of the sheets'
/// columns in first-seen order; a sheet lacking a column leaves it empty.
pub fn arrears_table(result: &WorkbookResult<SheetArrears>) -> Table {
    let mut table = Table::new::<&str>("arrears", &[]);
    for sheet in result.outputs() {
        for column in &sheet.columns {
            if !table.columns.contains(column) {
                table.columns.push(column.clone());
            }
        }
    }
    let positions: HashMap<&str, usize> = table
        .columns
        .iter()
        .enumerate()
        .map(|(index, column)| (column.as_str(), index))
        .collect();
    for sheet in result.outputs() {
        for values in &sheet.rows {
            let mut row = vec![FieldValue::Empty; table.columns.len()];
            for (column, value) in sheet.columns.iter().zip(values) {
                if let Some(index) = positions.get(column.as_str()) {
                    row[*index] = value.clone();
                }
            }
            table.rows.push(row);
        }
    }
    table
}

/// The first table of a lease expiry diary, named `name`.
pub fn diary_table(result: WorkbookResult<SheetDump>, name: &str) -> Table {
    match result.sheets.into_iter().next() {
        Some((_, dump)) => Table {
            name: name.to_owned(),
            columns: dump.columns,
            rows: dump.rows,
        },
        None => Table::new::<&str>(name, &[]),
    }
}

/// One table per dumped sheet, named after the sheet without spaces.
pub fn report_tables(result: WorkbookResult<SheetDump>) -> Vec<Table> {
    result
        .sheets
        .into_iter()
        .map(|(sheet_name, dump)| Table {
            name: sheet_name.replace(' ', ""),
            columns: dump.columns,
            rows: dump.rows,
        })
        .collect()
}
