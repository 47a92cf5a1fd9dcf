//! Description of what a throughput run reads.

use crate::error::{ReadSpeedError, Result};

/// Which tables, files and columns a run reads. Read-only for the whole run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Dataset {
    /// Either a single table name shared by all files, or one table name per file.
    pub table_names: Vec<String>,
    /// Input files, in the order they are read.
    pub file_names: Vec<String>,
    /// Column names, or patterns when `use_regex` is set.
    pub column_selectors: Vec<String>,
    /// Whether `column_selectors` are regular expressions matched against whole names.
    pub use_regex: bool,
}

impl Dataset {
    /// Build a descriptor selecting literal column names.
    pub fn new<T, F, C>(
        table_names: impl IntoIterator<Item = T>,
        file_names: impl IntoIterator<Item = F>,
        column_selectors: impl IntoIterator<Item = C>,
    ) -> Self
    where
        T: Into<String>,
        F: Into<String>,
        C: Into<String>,
    {
        Self {
            table_names: table_names.into_iter().map(Into::into).collect(),
            file_names: file_names.into_iter().map(Into::into).collect(),
            column_selectors: column_selectors.into_iter().map(Into::into).collect(),
            use_regex: false,
        }
    }

    /// Switch selectors to pattern mode.
    pub fn with_regex(mut self, use_regex: bool) -> Self {
        self.use_regex = use_regex;
        self
    }

    /// Check the descriptor without touching any file.
    pub fn validate(&self) -> Result<()> {
        if self.table_names.is_empty() {
            return Err(ReadSpeedError::config(
                "please provide at least one table name",
            ));
        }
        if self.file_names.is_empty() {
            return Err(ReadSpeedError::config(
                "please provide at least one file name",
            ));
        }
        if self.column_selectors.is_empty() {
            return Err(ReadSpeedError::config(
                "please provide at least one column name",
            ));
        }
        if self.table_names.len() != 1 && self.table_names.len() != self.file_names.len() {
            return Err(ReadSpeedError::config(format!(
                "please provide either one table name or one per file \
                 ({} table names for {} files)",
                self.table_names.len(),
                self.file_names.len()
            )));
        }
        Ok(())
    }

    /// Table to look up in the file at `file_idx`.
    pub fn table_name_for(&self, file_idx: usize) -> &str {
        if self.table_names.len() > 1 {
            &self.table_names[file_idx]
        } else {
            &self.table_names[0]
        }
    }

    /// Iterate `(file name, table name)` pairs in file order.
    pub fn files(&self) -> impl ExactSizeIterator<Item = (&str, &str)> {
        self.file_names
            .iter()
            .enumerate()
            .map(|(idx, file)| (file.as_str(), self.table_name_for(idx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_config_error(dataset: &Dataset) -> bool {
        matches!(dataset.validate(), Err(ReadSpeedError::Config(_)))
    }

    #[test]
    fn accepts_shared_or_per_file_table_names() {
        Dataset::new(["t"], ["a", "b"], ["x"]).validate().unwrap();
        Dataset::new(["t", "u"], ["a", "b"], ["x"]).validate().unwrap();
    }

    #[test]
    fn rejects_missing_fields() {
        assert!(is_config_error(&Dataset::new(
            Vec::<String>::new(),
            ["a"],
            ["x"]
        )));
        assert!(is_config_error(&Dataset::new(
            ["t"],
            Vec::<String>::new(),
            ["x"]
        )));
        assert!(is_config_error(&Dataset::new(
            ["t"],
            ["a"],
            Vec::<String>::new()
        )));
    }

    #[test]
    fn rejects_mismatched_table_count() {
        assert!(is_config_error(&Dataset::new(
            ["t", "u"],
            ["a", "b", "c"],
            ["x"]
        )));
    }

    #[test]
    fn table_names_follow_files() {
        let shared = Dataset::new(["t"], ["a", "b"], ["x"]);
        assert_eq!(shared.files().collect::<Vec<_>>(), vec![("a", "t"), ("b", "t")]);

        let per_file = Dataset::new(["t", "u"], ["a", "b"], ["x"]);
        assert_eq!(per_file.table_name_for(1), "u");
    }
}
