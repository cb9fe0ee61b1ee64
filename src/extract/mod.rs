//! # Extract Module
//!
//! Turns sheet grids into records. Report exports float their tables around
//! the page, so every extractor finds its fields by searching cell content
//! (see [`search`]) and resolving header labels to positions (see [`header`]).
//!
//! Four report shapes are supported:
//!
//! - [`tenancy`]: tenancy schedules, one tenancy per lease anchor with nested charge lines
//! - [`arrears`]: aged debtor listings grouped under property headings
//! - [`report`]: plain sheet dumps where the first row is the header
//! - [`diary`]: lease expiry diaries, dumped with normalised column names
pub mod arrears;
pub mod coerce;
pub mod diary;
pub mod header;
pub mod report;
pub mod search;
pub mod tenancy;

pub use coerce::FieldValue;
pub use header::HeaderMap;
pub use search::Position;

use crate::spreadsheet::Grid;
use thiserror::Error;

/// Layout problems that make one sheet unreadable.
#[derive(Error, Debug, PartialEq)]
pub enum ExtractError {
    #[error("Header '{label}' not found")]
    MissingHeader { label: String },

    #[error("No data rows below the header")]
    EmptySheet,
}

/// Extracts one sheet's records from its grid.
pub trait SheetExtractor {
    type Output;

    fn extract(&self, sheet_name: &str, grid: &Grid) -> Result<Self::Output, ExtractError>;
}
