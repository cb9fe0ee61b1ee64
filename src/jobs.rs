//! Workbook ingestion jobs: download a workbook, extract its sheets and upload
//! the resulting tables.

use crate::config::Config;
use crate::error::IngestError;
use crate::error::ResultMessage;
use crate::extract::arrears::ArrearsExtractor;
use crate::extract::diary::DiaryExtractor;
use crate::extract::report::ReportExtractor;
use crate::extract::tenancy::TenancyExtractor;
use crate::orchestrator::process_workbook;
use crate::orchestrator::WorkbookResult;
use crate::output::arrears_table;
use crate::output::diary_table;
use crate::output::report_tables;
use crate::output::tenancy_tables;
use crate::output::Table;
use crate::period::ReportPeriod;
use crate::spreadsheet::html::table_name;
use crate::spreadsheet::Criteria;
use crate::spreadsheet::HtmlWorkbook;
use crate::spreadsheet::XlsxWorkbook;
use crate::storage::BlobStore;
use glob::Pattern;
use tracing::info;

/// Outcome of one workbook run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunSummary {
    pub workbook: String,
    pub succeeded: usize,
    pub failed: usize,
    /// `"{sheet}: {error}"` per failed sheet
    pub failures: Vec<String>,
    /// Uploaded blob paths with their data row counts
    pub written: Vec<(String, usize)>,
}

pub struct Ingestor<S: BlobStore> {
    store: S,
    config: Config,
    criteria: Criteria,
    delimiter: u8,
}

impl<S: BlobStore> Ingestor<S> {
    pub fn new(store: S, config: Config) -> Result<Self, IngestError> {
        let criteria = Criteria::try_from(&config.sheets)?;
        let delimiter = config.output.delimiter_byte()?;
        Ok(Ingestor {
            store,
            config,
            criteria,
            delimiter,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Tenancy schedule: writes `tenancies.csv` and `charges.csv`.
    pub fn tenancy_schedule(&self, path: &str) -> Result<RunSummary, IngestError> {
        let mut workbook = self.open(path)?;
        let extractor = TenancyExtractor::new(self.config.tenancy.clone());
        let result = process_workbook(&mut workbook, &self.criteria, &extractor)?;
        let (tenancies, charges) = tenancy_tables(&result);
        let mut summary = RunSummary::from(&result);
        summary.written = self.publish(path, &[tenancies, charges])?;
        Ok(summary)
    }

    /// Aged debtors: writes `arrears.csv` from the configured debtor sheet.
    pub fn arrears(&self, path: &str) -> Result<RunSummary, IngestError> {
        let mut workbook = self.open(path)?;
        let layout = self.config.arrears.clone();
        let criteria = self
            .criteria
            .clone()
            .with_sheet_patterns(&[Pattern::escape(&layout.sheet_name)])?;
        let extractor = ArrearsExtractor::new(layout, ReportPeriod::from_file_name(file_name(path)));
        let result = process_workbook(&mut workbook, &criteria, &extractor)?;
        let mut summary = RunSummary::from(&result);
        summary.written = self.publish(path, &[arrears_table(&result)])?;
        Ok(summary)
    }

    /// Multi-sheet report: writes one table per sheet.
    pub fn excel_report(&self, path: &str) -> Result<RunSummary, IngestError> {
        let mut workbook = self.open(path)?;
        let result = process_workbook(&mut workbook, &self.criteria, &ReportExtractor)?;
        let mut summary = RunSummary::from(&result);
        summary.written = self.publish(path, &report_tables(result))?;
        Ok(summary)
    }

    /// Lease expiry diary: converts the first table of the HTML export to
    /// `{folder}/{stem}.csv`, then deletes the source blob.
    pub fn lease_expiry_diary(&self, path: &str) -> Result<RunSummary, IngestError> {
        let mut workbook = HtmlWorkbook::from_bytes(file_name(path), self.download(path)?)?;
        let criteria = self.criteria.clone().with_sheet_patterns(&[table_name(0)])?;
        let result = process_workbook(&mut workbook, &criteria, &DiaryExtractor)?;
        let mut summary = RunSummary::from(&result);
        summary.written = self.publish(path, &[diary_table(result, file_stem(path))])?;
        self.store.delete(path)?;
        info!(path, "Deleted source workbook");
        Ok(summary)
    }

    fn download(&self, path: &str) -> Result<Vec<u8>, IngestError> {
        let bytes = self.store.read(path)?;
        info!(path, bytes = bytes.len(), "Downloaded workbook");
        Ok(bytes)
    }

    fn open(&self, path: &str) -> Result<XlsxWorkbook, IngestError> {
        XlsxWorkbook::from_bytes(file_name(path), self.download(path)?)
    }

    /// Uploads each table as `{folder}/{prefix}{name}.csv`, where the prefix
    /// is the report period of the source file name.
    fn publish(&self, path: &str, tables: &[Table]) -> Result<Vec<(String, usize)>, IngestError> {
        let prefix = ReportPeriod::from_file_name(file_name(path))
            .map(|period| period.prefix())
            .unwrap_or_default();
        let mut written = Vec::new();
        for table in tables {
            let target = self.config.output.path(&format!("{}{}.csv", prefix, table.name));
            let bytes = table.to_csv(self.delimiter).with_prefix(&target)?;
            self.store.write(&target, &bytes)?;
            info!(path = %target, rows = table.rows.len(), "Uploaded table");
            written.push((target, table.rows.len()));
        }
        Ok(written)
    }
}

impl<T> From<&WorkbookResult<T>> for RunSummary {
    fn from(result: &WorkbookResult<T>) -> Self {
        RunSummary {
            workbook: result.workbook.clone(),
            succeeded: result.succeeded(),
            failed: result.failed(),
            failures: result.failures.clone(),
            written: Vec::new(),
        }
    }
}

/// Last segment of a blob path.
fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// File name of a blob path without its extension.
fn file_stem(path: &str) -> &str {
    let name = file_name(path);
    name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(name)
}
