use std::io;

use parquet::errors::ParquetError;
use thiserror::Error;

use crate::range::EntryRange;

/// Crate-wide result alias.
pub type Result<T, E = ReadSpeedError> = std::result::Result<T, E>;

/// Every way a throughput run can fail. None of these are retried: the first one aborts the run.
#[derive(Debug, Error)]
pub enum ReadSpeedError {
    /// Invalid or missing run configuration, detected before any file is touched.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// The storage layer could not open a file.
    #[error("could not open file '{file}': {source}")]
    Open {
        /// File that failed to open.
        file: String,
        /// Underlying IO failure.
        #[source]
        source: io::Error,
    },
    /// The named table is absent from a file.
    #[error("could not retrieve table '{table}' from file '{file}'")]
    Lookup {
        /// Requested table name.
        table: String,
        /// File that was searched.
        file: String,
    },
    /// Column selection failed for a table.
    #[error("column selection failed for table '{table}' in file '{file}': {reason}")]
    Column {
        /// Table whose columns were resolved.
        table: String,
        /// File holding the table.
        file: String,
        /// What did not match.
        reason: String,
    },
    /// A requested range reaches past the end of the table. Points at a partitioning bug.
    #[error(
        "range end ({}) is beyond the end of table '{table}' in file '{file}' \
         with {records} records",
        .range.end()
    )]
    Range {
        /// Offending range.
        range: EntryRange,
        /// Number of records the table actually holds.
        records: u64,
        /// Table that was read.
        table: String,
        /// File holding the table.
        file: String,
    },
    /// Decoding failed inside the Parquet backend.
    #[error("parquet error in file '{file}': {source}")]
    Parquet {
        /// File being decoded.
        file: String,
        /// Underlying decoder failure.
        #[source]
        source: ParquetError,
    },
    /// The OS refused to start a worker thread.
    #[error("could not spawn worker thread: {0}")]
    Worker(#[source] io::Error),
}

impl ReadSpeedError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub(crate) fn parquet(file: &str, source: ParquetError) -> Self {
        Self::Parquet {
            file: file.to_string(),
            source,
        }
    }
}
