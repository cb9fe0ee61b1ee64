//! Run configuration, read from a TOML file. Every field has a default, so an
//! empty file (or no file) is a valid configuration.
//!
//! ```toml
//! [storage]
//! root = "/data/bronze"
//!
//! [sheets]
//! include = ["Page *"]
//! default_skip_rows = 0
//! nulls = ["Infinity"]
//! max_cells = 5000000
//!
//! [sheets.skip_rows]
//! "Budget" = 4
//! "Budgeted manfees summary" = 2
//!
//! [output]
//! folder = "Cirrus 8 Reports/Inbox"
//! delimiter = ","
//! ```
//!
//! The skip-row map defaults to [`REPORT_SKIP_ROWS`], the title rows of the
//! report export sheets that do not start with their header. Tenancy schedules
//! need no skip rows since their header row is located by content.

use crate::error::IngestError;
use crate::extract::arrears::ArrearsLayout;
use crate::extract::tenancy::TenancyLayout;
use crate::spreadsheet::DEFAULT_MAX_CELLS;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Title rows above the header of report export sheets.
pub const REPORT_SKIP_ROWS: [(&str, usize); 2] = [("Budget", 4), ("Budgeted manfees summary", 2)];

/// Environment variable overriding `storage.root`.
pub const STORE_ENV: &str = "SHEET_INGEST_STORE";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    Read { path: String, source: std::io::Error },

    #[error("Invalid config '{path}': {source}")]
    Parse { path: String, source: toml::de::Error },

    #[error("Invalid delimiter '{0}': expected a single ASCII character")]
    Delimiter(String),
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub sheets: SheetConfig,
    pub tenancy: TenancyLayout,
    pub arrears: ArrearsLayout,
    pub output: OutputConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory or `file://` URL holding the blobs
    pub root: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig { root: ".".to_owned() }
    }
}

/// Sheet selection and reading options.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SheetConfig {
    /// Sheet name glob patterns; empty selects every sheet
    pub include: Vec<String>,
    pub default_skip_rows: usize,
    pub skip_rows: BTreeMap<String, usize>,
    /// Text values read as empty cells
    pub nulls: Vec<String>,
    /// Largest used range, in cells, of a readable sheet
    pub max_cells: usize,
}

impl Default for SheetConfig {
    fn default() -> Self {
        SheetConfig {
            include: Vec::new(),
            default_skip_rows: 0,
            skip_rows: REPORT_SKIP_ROWS
                .iter()
                .map(|(sheet, rows)| (sheet.to_string(), *rows))
                .collect(),
            nulls: vec!["Infinity".to_owned()],
            max_cells: DEFAULT_MAX_CELLS,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Blob folder receiving the tables
    pub folder: String,
    pub delimiter: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            folder: "Inbox".to_owned(),
            delimiter: ",".to_owned(),
        }
    }
}

impl OutputConfig {
    pub fn delimiter_byte(&self) -> Result<u8, ConfigError> {
        match self.delimiter.as_bytes() {
            [byte] if byte.is_ascii() => Ok(*byte),
            _ => Err(ConfigError::Delimiter(self.delimiter.clone())),
        }
    }

    /// Blob path of an output table.
    pub fn path(&self, file_name: &str) -> String {
        match self.folder.trim_end_matches('/') {
            "" => file_name.to_owned(),
            folder => format!("{}/{}", folder, file_name),
        }
    }
}

impl Config {
    pub fn from_toml(content: &str, path: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
        config.output.delimiter_byte()?;
        Ok(config)
    }

    /// Loads `.env`, then the config file if given, then applies the
    /// [`STORE_ENV`] override.
    pub fn load(path: Option<&Path>) -> Result<Self, IngestError> {
        if let Ok(env_file) = dotenvy::dotenv() {
            debug!(path = %env_file.display(), "Loaded environment file");
        }
        let config = match path {
            Some(path) => {
                let display = path.display().to_string();
                let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: display.clone(),
                    source,
                })?;
                Config::from_toml(&content, &display)?
            }
            None => Config::default(),
        };
        Ok(config.with_store_override(std::env::var(STORE_ENV).ok()))
    }

    pub fn with_store_override(mut self, root: Option<String>) -> Self {
        if let Some(root) = root.filter(|root| !root.is_empty()) {
            self.storage.root = root;
        }
        self
    }
}
