//! # Spreadsheet Module
//!
//! Reads workbooks into [`Grid`]s. Two containers are supported:
//!
//! - Office Open XML (`.xlsx`, `.xlsm`): parts are read straight from the zip
//!   archive and streamed through quick-xml
//! - HTML tables saved with an `.xls` extension, parsed with scraper
pub(crate) mod cell;
pub(crate) mod criteria;
pub(crate) mod grid;
pub(crate) mod html;
pub(crate) mod xlsx;

pub use cell::CellValue;
pub use criteria::Criteria;
pub use criteria::DEFAULT_MAX_CELLS;
pub use grid::Grid;
pub use html::HtmlWorkbook;
pub use xlsx::XlsxWorkbook;

use crate::error::IngestError;
use thiserror::Error;

/// Errors raised while opening a workbook or decoding its cells.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Workbook '{0}' is missing part '{1}'")]
    MissingPart(String, String),

    #[error("Workbook '{0}' contains no worksheets")]
    EmptyWorkbook(String),

    /// Encrypted packages and legacy `.xls` files are OLE compound files, not zip archives
    #[error("Workbook '{0}' is an OLE compound file (password protected or legacy .xls)")]
    CompoundFile(String),

    #[error("Workbook '{0}' is not an HTML document")]
    NotHtml(String),

    #[error("Worksheet '{0}' not found")]
    SheetNotFound(String),

    #[error("Invalid cell value '{value}' at {reference}")]
    InvalidCellValue { reference: String, value: String },

    #[error("Cell {0} lies outside the worksheet bounds")]
    CellOutOfRange(String),

    #[error("Sheet spans {rows} rows by {columns} columns, over the limit of {limit} cells")]
    SheetTooLarge { rows: usize, columns: usize, limit: usize },

    #[error("Shared string {index} referenced at {reference} does not exist")]
    SharedStringMissing { reference: String, index: usize },
}

/// A workbook whose sheets can be read as grids.
pub trait Workbook {
    /// Name of the workbook, usually its file name.
    fn name(&self) -> &str;

    /// Sheet names in the workbook's native order.
    fn sheet_names(&self) -> Vec<String>;

    /// Reads one sheet as a grid anchored at `A1`.
    /// Skip-row offsets are applied by the caller, not here.
    fn read_grid(&mut self, sheet_name: &str, criteria: &Criteria) -> Result<Grid, IngestError>;
}
