use thiserror::Error;

/// Main error type for the ingestion pipeline.
/// Aggregates errors from the standard library, dependencies and internal modules.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("{0}")]
    WithContextError(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    ParseFloatError(#[from] std::num::ParseFloatError),

    // Third-party library errors
    #[error("{0}")]
    PatternError(#[from] glob::PatternError),

    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    #[error("{0}")]
    CsvError(#[from] csv::Error),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    // Crate module errors
    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),

    #[error("{0}")]
    ExtractError(#[from] crate::extract::ExtractError),

    #[error("{0}")]
    StorageError(#[from] crate::storage::StorageError),

    #[error("{0}")]
    ConfigError(#[from] crate::config::ConfigError),

    /// Every selected sheet of a workbook failed.
    #[error("No sheet of '{workbook}' could be processed ({failed} failed)")]
    NoSheetSucceeded { workbook: String, failed: usize },
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, IngestError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| IngestError::WithContextError(format!("{}: {}", message, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_prefix_wraps_message() {
        let result: Result<(), IngestError> =
            Err(crate::storage::StorageError::NotFound("a/b.xlsx".to_owned()).into());
        let error = result.with_prefix("download").unwrap_err();
        assert_eq!(error.to_string(), "download: Blob 'a/b.xlsx' not found");
    }

    #[test]
    fn with_prefix_keeps_success() {
        let result: Result<usize, IngestError> = Ok(3);
        assert_eq!(result.with_prefix("unused").unwrap(), 3);
    }
}
