use crate::extract::search::find_nth_occurrence;
use crate::extract::search::Position;
use crate::spreadsheet::Grid;
use std::collections::HashMap;

/// Logical field name to grid position, resolved once per sheet.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeaderMap {
    positions: HashMap<String, Position>,
    keys: Vec<String>,
}

impl HeaderMap {
    /// Resolves each expected label to its position on the sheet.
    ///
    /// Labels are visited in order. A `Description` that directly follows a
    /// `Date` is the rent review description column: it is looked up as the
    /// second occurrence and stored as `Rent Review Description`. Every other
    /// label takes its first occurrence. Missing labels map to
    /// [`Position::NOT_FOUND`].
    pub fn locate<S: AsRef<str>>(grid: &Grid, labels: &[S]) -> Self {
        let mut header = HeaderMap::default();
        let mut previous: Option<&str> = None;
        for label in labels.iter().map(AsRef::as_ref) {
            let (key, nth) = if label == "Description" && previous == Some("Date") {
                (format!("Rent Review {}", label), 2)
            } else {
                (label.to_owned(), 1)
            };
            let position = find_nth_occurrence(grid, label, nth);
            header.insert(key, position);
            previous = Some(label);
        }
        header
    }

    fn insert(&mut self, key: String, position: Position) {
        if !self.positions.contains_key(&key) {
            self.keys.push(key.clone());
        }
        self.positions.insert(key, position);
    }

    pub fn get(&self, key: &str) -> Position {
        self.positions
            .get(key)
            .copied()
            .unwrap_or(Position::NOT_FOUND)
    }

    pub fn column(&self, key: &str) -> Option<usize> {
        self.get(key).indexes().map(|(_, col)| col)
    }

    pub fn row(&self, key: &str) -> Option<usize> {
        self.get(key).indexes().map(|(row, _)| row)
    }

    /// Keys in the order they were first located.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.keys.iter().map(String::as_str)
    }

    /// Keys whose label was not found on the sheet.
    pub fn missing(&self) -> Vec<&str> {
        self.keys()
            .filter(|key| !self.get(key).is_found())
            .collect()
    }
}
