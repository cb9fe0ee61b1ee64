use crate::config::SheetConfig;
use crate::error::IngestError;
use glob::Pattern;
use std::collections::BTreeMap;
use std::collections::HashSet;

/// Largest used range, in cells, read from one sheet.
pub const DEFAULT_MAX_CELLS: usize = 5_000_000;

/// Which sheets to read and how to read them.
#[derive(Clone, Debug)]
pub struct Criteria {
    /// Sheet name patterns; empty accepts every sheet.
    pub(crate) sheet_name_patterns: Vec<Pattern>,

    /// Rows dropped from the top of a sheet before extraction, keyed by sheet name.
    pub(crate) skip_rows: BTreeMap<String, usize>,

    /// Skip count for sheets absent from `skip_rows`.
    pub(crate) default_skip_rows: usize,

    /// Text values read as absent cells.
    pub(crate) nulls: HashSet<String>,

    /// Sheets whose used range exceeds this many cells fail to read.
    pub(crate) max_cells: usize,
}

impl Default for Criteria {
    fn default() -> Self {
        Criteria {
            sheet_name_patterns: Vec::new(),
            skip_rows: BTreeMap::new(),
            default_skip_rows: 0,
            nulls: HashSet::new(),
            max_cells: DEFAULT_MAX_CELLS,
        }
    }
}

impl Criteria {
    /// Returns true if no patterns are specified or if the name matches any pattern.
    pub fn accept(&self, sheet_name: &str) -> bool {
        self.sheet_name_patterns.is_empty()
            || self
                .sheet_name_patterns
                .iter()
                .any(|pattern| pattern.matches(sheet_name))
    }

    pub fn skip_rows_for(&self, sheet_name: &str) -> usize {
        self.skip_rows
            .get(sheet_name)
            .copied()
            .unwrap_or(self.default_skip_rows)
    }

    /// Restricts the accepted sheets to the given patterns.
    pub fn with_sheet_patterns<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self, IngestError> {
        self.sheet_name_patterns = patterns
            .iter()
            .map(|pattern| Pattern::new(pattern.as_ref()))
            .collect::<Result<_, _>>()?;
        Ok(self)
    }
}

impl TryFrom<&SheetConfig> for Criteria {
    type Error = IngestError;

    fn try_from(config: &SheetConfig) -> Result<Self, Self::Error> {
        Criteria {
            sheet_name_patterns: Vec::new(),
            skip_rows: config.skip_rows.clone(),
            default_skip_rows: config.default_skip_rows,
            nulls: config.nulls.iter().cloned().collect(),
            max_cells: config.max_cells,
        }
        .with_sheet_patterns(&config.include)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SheetConfig {
        SheetConfig {
            include: vec!["Page *".to_owned()],
            default_skip_rows: 1,
            skip_rows: BTreeMap::from([("Page 2".to_owned(), 5)]),
            nulls: vec!["Infinity".to_owned()],
            max_cells: 100,
        }
    }

    #[test]
    fn accepts_matching_sheets() {
        let criteria = Criteria::try_from(&config()).unwrap();
        assert!(criteria.accept("Page 1"));
        assert!(!criteria.accept("Summary"));
        assert!(Criteria::default().accept("Summary"));
    }

    #[test]
    fn skip_rows_fall_back_to_default() {
        let criteria = Criteria::try_from(&config()).unwrap();
        assert_eq!(criteria.skip_rows_for("Page 2"), 5);
        assert_eq!(criteria.skip_rows_for("Page 3"), 1);
        assert_eq!(criteria.max_cells, 100);
        assert_eq!(Criteria::default().max_cells, DEFAULT_MAX_CELLS);
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let mut config = config();
        config.include = vec!["Page [".to_owned()];
        assert!(Criteria::try_from(&config).is_err());
    }
}
