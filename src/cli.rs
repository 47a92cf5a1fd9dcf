use clap::Parser;

use crate::{
    dataset::Dataset,
    option::{ReadSpeedOptions, DEFAULT_BATCH_SIZE, DEFAULT_TASKS_PER_WORKER_HINT},
};

/// Arguments of the `readspeed` binary.
///
/// Missing tables, files or columns are not rejected here: the engine
/// validates the resulting [`Dataset`] and reports a configuration error.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(
    name = "readspeed",
    version,
    about = "Measure column read throughput over Parquet datasets",
    arg_required_else_help = true
)]
pub struct Args {
    /// Table names: one shared by every file, or one per file.
    #[arg(long, visible_alias = "trees", num_args = 1.., value_name = "TABLE")]
    pub tables: Vec<String>,
    /// Input files.
    #[arg(long, num_args = 1.., value_name = "FILE")]
    pub files: Vec<String>,
    /// Which columns to read.
    #[command(flatten)]
    pub selection: ColumnSelection,
    /// Worker threads; 0 reads sequentially without a pool.
    #[arg(long, visible_alias = "threads", default_value_t = 0)]
    pub workers: usize,
    /// Target number of tasks per worker when splitting files.
    #[arg(long, default_value_t = DEFAULT_TASKS_PER_WORKER_HINT)]
    pub tasks_per_worker: usize,
    /// Records decoded per batch.
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,
}

/// Mutually exclusive column selection modes.
#[derive(clap::Args, Debug, Clone, PartialEq, Eq)]
#[group(multiple = false)]
pub struct ColumnSelection {
    /// Literal column names.
    #[arg(long, visible_alias = "branches", num_args = 1.., value_name = "COLUMN")]
    pub columns: Vec<String>,
    /// Regular expressions matched against whole column names.
    #[arg(long, visible_alias = "branches-regex", num_args = 1.., value_name = "REGEX")]
    pub columns_regex: Vec<String>,
    /// Read every column.
    #[arg(long, visible_alias = "all-branches")]
    pub all_columns: bool,
}

impl ColumnSelection {
    /// Selectors and whether they are patterns.
    pub fn selectors(&self) -> (Vec<String>, bool) {
        if self.all_columns {
            (vec![".*".to_string()], true)
        } else if !self.columns_regex.is_empty() {
            (self.columns_regex.clone(), true)
        } else {
            (self.columns.clone(), false)
        }
    }
}

impl Args {
    /// The dataset these arguments describe.
    pub fn dataset(&self) -> Dataset {
        let (selectors, use_regex) = self.selection.selectors();
        Dataset::new(self.tables.clone(), self.files.clone(), selectors).with_regex(use_regex)
    }

    /// Tuning options these arguments describe.
    pub fn options(&self) -> ReadSpeedOptions {
        ReadSpeedOptions::default()
            .tasks_per_worker_hint(self.tasks_per_worker)
            .batch_size(self.batch_size)
    }
}
