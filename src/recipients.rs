//! Recipient list: bounded, ordered, de-duplicated names.

use std::io::Read;
use std::path::Path;

use crate::config::DEFAULT_MAX_RECIPIENTS;
use crate::error::LaurelError;

/// Ordered set of recipient names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientList {
    names: Vec<String>,
    capacity: usize,
}

/// Outcome of a CSV import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub added: usize,
    pub duplicates: usize,
    pub blank: usize,
    /// Rows left out because the list was full.
    pub dropped: usize,
}

impl Default for RecipientList {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RECIPIENTS)
    }
}

impl RecipientList {
    /// Empty list holding at most `capacity` names.
    pub fn new(capacity: usize) -> Self {
        Self {
            names: Vec::new(),
            capacity,
        }
    }

    /// Build a list from names, failing on the first blank, duplicate or overflow.
    pub fn from_names<I, S>(names: I, capacity: usize) -> Result<Self, LaurelError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::new(capacity);
        for name in names {
            list.add(name.as_ref())?;
        }
        Ok(list)
    }

    /// Add a name (trimmed). Rejects blank names, duplicates and a full list.
    pub fn add(&mut self, name: &str) -> Result<(), LaurelError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LaurelError::Validation("Please enter a name".to_string()));
        }
        if self.contains(name) {
            return Err(LaurelError::Validation(format!(
                "'{}' is already in the list",
                name
            )));
        }
        if self.is_full() {
            return Err(LaurelError::Validation(format!(
                "Maximum {} names allowed",
                self.capacity
            )));
        }
        self.names.push(name.to_string());
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Option<String> {
        if index < self.names.len() {
            Some(self.names.remove(index))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.names.clear();
    }

    pub fn contains(&self, name: &str) -> bool {
        let name = name.trim();
        self.names.iter().any(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.names.len() >= self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.names
    }

    /// Import names from CSV: the first column of every row, no header row.
    ///
    /// Blank and duplicate names are skipped; once the list is full the
    /// remaining rows are counted as dropped.
    pub fn import_csv<R: Read>(&mut self, reader: R) -> Result<ImportReport, LaurelError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut report = ImportReport::default();
        for record in csv_reader.records() {
            let record = record?;
            let name = record.get(0).unwrap_or("").trim();

            if name.is_empty() {
                report.blank += 1;
            } else if self.contains(name) {
                report.duplicates += 1;
            } else if self.is_full() {
                report.dropped += 1;
            } else {
                self.names.push(name.to_string());
                report.added += 1;
            }
        }

        tracing::info!(
            added = report.added,
            duplicates = report.duplicates,
            blank = report.blank,
            dropped = report.dropped,
            "imported recipients"
        );
        if report.dropped > 0 {
            tracing::warn!(
                dropped = report.dropped,
                capacity = self.capacity,
                "recipient list full, rows dropped"
            );
        }

        Ok(report)
    }

    /// Import from a CSV file on disk.
    pub fn import_csv_file(&mut self, path: impl AsRef<Path>) -> Result<ImportReport, LaurelError> {
        let file = std::fs::File::open(path.as_ref())?;
        self.import_csv(file)
    }
}

impl<'a> IntoIterator for &'a RecipientList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.names.iter()
    }
}
