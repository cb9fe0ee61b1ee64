//! Runs an extractor over every selected sheet of a workbook. A sheet that
//! fails is recorded and skipped; the batch only fails when no sheet succeeds.

use crate::error::IngestError;
use crate::extract::SheetExtractor;
use crate::spreadsheet::Criteria;
use crate::spreadsheet::Workbook;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// Per-sheet outcomes of one workbook, in the workbook's sheet order.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkbookResult<T> {
    pub workbook: String,
    /// Extracted records of each successful sheet
    pub sheets: Vec<(String, T)>,
    /// `"{sheet}: {error}"` for each failed sheet
    pub failures: Vec<String>,
}

impl<T> WorkbookResult<T> {
    pub fn succeeded(&self) -> usize {
        self.sheets.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Sheet outputs in sheet order.
    pub fn outputs(&self) -> impl Iterator<Item = &T> + '_ {
        self.sheets.iter().map(|(_, output)| output)
    }
}

/// Reads and extracts one sheet, applying its skip-row offset.
fn process_sheet<W, E>(workbook: &mut W, sheet_name: &str, criteria: &Criteria, extractor: &E) -> Result<E::Output, IngestError>
where
    W: Workbook + ?Sized,
    E: SheetExtractor,
{
    let grid = workbook
        .read_grid(sheet_name, criteria)?
        .skip_rows(criteria.skip_rows_for(sheet_name));
    Ok(extractor.extract(sheet_name, &grid)?)
}

/// Processes every sheet accepted by `criteria`.
///
/// # Errors
///
/// Returns [`IngestError::NoSheetSucceeded`] when no selected sheet could be
/// extracted. Per-sheet errors are otherwise collected in
/// [`WorkbookResult::failures`].
pub fn process_workbook<W, E>(workbook: &mut W, criteria: &Criteria, extractor: &E) -> Result<WorkbookResult<E::Output>, IngestError>
where
    W: Workbook + ?Sized,
    E: SheetExtractor,
{
    let mut result = WorkbookResult {
        workbook: workbook.name().to_owned(),
        sheets: Vec::new(),
        failures: Vec::new(),
    };
    for sheet_name in workbook.sheet_names() {
        if !criteria.accept(&sheet_name) {
            debug!(sheet = %sheet_name, "Sheet not selected");
            continue;
        }
        match process_sheet(workbook, &sheet_name, criteria, extractor) {
            Ok(output) => {
                debug!(sheet = %sheet_name, "Sheet processed");
                result.sheets.push((sheet_name, output));
            }
            Err(e) => {
                warn!(sheet = %sheet_name, error = %e, "Sheet failed");
                result.failures.push(format!("{}: {}", sheet_name, e));
            }
        }
    }

    info!(
        workbook = %result.workbook,
        succeeded = result.succeeded(),
        failed = result.failed(),
        "Workbook processed"
    );
    if result.sheets.is_empty() {
        return Err(IngestError::NoSheetSucceeded {
            workbook: result.workbook,
            failed: result.failures.len(),
        });
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::tenancy::TenancyExtractor;
    use crate::extract::tenancy::TenancyLayout;
    use crate::spreadsheet::Grid;
    use crate::spreadsheet::SpreadsheetError;

    /// In-memory workbook of named grids.
    struct MemoryWorkbook {
        sheets: Vec<(String, Grid)>,
    }

    impl Workbook for MemoryWorkbook {
        fn name(&self) -> &str {
            "memory.xlsx"
        }

        fn sheet_names(&self) -> Vec<String> {
            self.sheets.iter().map(|(name, _)| name.clone()).collect()
        }

        fn read_grid(&mut self, sheet_name: &str, _criteria: &Criteria) -> Result<Grid, IngestError> {
            self.sheets
                .iter()
                .find(|(name, _)| name == sheet_name)
                .map(|(_, grid)| grid.clone())
                .ok_or_else(|| SpreadsheetError::SheetNotFound(sheet_name.to_owned()).into())
        }
    }

    fn schedule(lease_codes: &[&str]) -> Grid {
        let mut rows: Vec<Vec<&str>> = vec![
            vec!["Schedule"],
            vec!["Unit", "Lease Code", "Account", "Description", "Monthly"],
        ];
        for code in lease_codes.iter().copied() {
            rows.push(vec!["G01", code, "4000", "Base Rent", "100"]);
            rows.push(vec![]);
        }
        let rows: Vec<&[&str]> = rows.iter().map(Vec::as_slice).collect();
        Grid::from_text(&rows)
    }

    fn extractor() -> TenancyExtractor {
        TenancyExtractor::new(TenancyLayout::default())
    }

    #[test]
    fn bad_sheet_does_not_abort_the_batch() {
        let mut workbook = MemoryWorkbook {
            sheets: vec![
                ("Page 1".to_owned(), schedule(&["L1", "L2"])),
                ("Summary".to_owned(), Grid::from_text(&[&["Totals"], &["Income", "100"]])),
                ("Page 2".to_owned(), schedule(&["L3"])),
            ],
        };
        let result = process_workbook(&mut workbook, &Criteria::default(), &extractor()).unwrap();
        assert_eq!(result.succeeded(), 2);
        assert_eq!(result.failed(), 1);
        assert_eq!(result.failures, vec!["Summary: Header 'Lease Code' not found"]);
        let sheets: Vec<_> = result.sheets.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(sheets, vec!["Page 1", "Page 2"]);
        assert_eq!(result.outputs().map(|output| output.tenancies.len()).sum::<usize>(), 3);
    }

    #[test]
    fn skip_rows_apply_per_sheet() {
        let mut workbook = MemoryWorkbook {
            sheets: vec![("Page 1".to_owned(), schedule(&["L1"]))],
        };
        // skipping past the header row leaves nothing to anchor on
        let mut criteria = Criteria::default();
        criteria.skip_rows.insert("Page 1".to_owned(), 2);
        let error = process_workbook(&mut workbook, &criteria, &extractor()).unwrap_err();
        assert!(matches!(error, IngestError::NoSheetSucceeded { failed: 1, .. }));
    }

    #[test]
    fn rejected_sheets_are_not_counted() {
        let mut workbook = MemoryWorkbook {
            sheets: vec![
                ("Page 1".to_owned(), schedule(&["L1"])),
                ("Notes".to_owned(), Grid::from_text(&[&["free text"]])),
            ],
        };
        let criteria = Criteria::default().with_sheet_patterns(&["Page *"]).unwrap();
        let result = process_workbook(&mut workbook, &criteria, &extractor()).unwrap();
        assert_eq!((result.succeeded(), result.failed()), (1, 0));
    }

    #[test]
    fn no_successful_sheet_is_an_error() {
        let mut workbook = MemoryWorkbook {
            sheets: vec![("Summary".to_owned(), Grid::from_text(&[&["Totals"]]))],
        };
        let error = process_workbook(&mut workbook, &Criteria::default(), &extractor()).unwrap_err();
        assert_eq!(error.to_string(), "No sheet of 'memory.xlsx' could be processed (1 failed)");
    }
}
