//! # Sheet Ingest
//!
//! Extracts tables from human-authored property management report workbooks
//! (tenancy schedules, aged debtor listings, lease expiry diaries, multi-sheet
//! report exports) and publishes them as flat delimited files.
//!
//! ## Features
//!
//! - **Content-based lookup**: fields and column headers are found by searching
//!   cell text, so layouts that drift between exports still parse
//! - **Record-group walking**: leases with stacked term rows and nested charge
//!   lines are read from anchor rows up to sentinel or blank boundaries
//! - **Per-sheet isolation**: a sheet that fails is reported and skipped, the
//!   rest of the workbook still produces output
//! - **Pure Rust xlsx reader**: workbook parts are streamed from the zip
//!   archive with quick-xml; HTML tables saved as `.xls` are read too
//! - **Pluggable storage**: workbooks are read and tables written through the
//!   [`storage::BlobStore`] trait
//!
//! ## Jobs
//!
//! [`jobs::Ingestor`] runs one of four jobs per workbook:
//!
//! - `tenancy_schedule`: writes `tenancies.csv` and `charges.csv`
//! - `arrears`: writes `arrears.csv`
//! - `excel_report`: writes one file per sheet
//! - `lease_expiry_diary`: writes the diary table and deletes the source
pub mod config;
pub mod error;
pub mod extract;
mod helpers;
pub mod jobs;
pub mod orchestrator;
pub mod output;
pub mod period;
pub mod spreadsheet;
pub mod storage;

pub use config::Config;
pub use error::IngestError;
pub use jobs::Ingestor;
pub use jobs::RunSummary;
