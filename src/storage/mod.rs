//! Storage collaborators consumed by the throughput engine.
//!
//! The engine only needs to open files, look tables up by name, enumerate a
//! table's native clusters and read a column subset over a record range.
//! [`parquet::ParquetStorage`] reads real files; [`mem::MemStorage`] serves
//! synthetic tables from memory.

pub mod mem;
pub mod parquet;

use crate::{accounting::ByteData, columns::ColumnLayout, error::Result, range::EntryRange};

/// Entry point of a storage backend. Shared by every worker of a run.
pub trait Storage: Send + Sync {
    /// An opened file.
    type File: Send;
    /// A table inside an opened file.
    type Table: TableHandle;

    /// Open `file_name`, failing with [`ReadSpeedError::Open`](crate::ReadSpeedError::Open).
    fn open(&self, file_name: &str) -> Result<Self::File>;

    /// Look up `table_name`, failing with
    /// [`ReadSpeedError::Lookup`](crate::ReadSpeedError::Lookup).
    fn table(&self, file: &Self::File, file_name: &str, table_name: &str) -> Result<Self::Table>;

    /// Open `file_name` and look up `table_name` in one step.
    fn open_table(&self, file_name: &str, table_name: &str) -> Result<Self::Table> {
        let file = self.open(file_name)?;
        self.table(&file, file_name, table_name)
    }
}

/// A table ready to be read. Owned by exactly one worker at a time.
pub trait TableHandle: Send {
    /// Number of records in the table.
    fn record_count(&self) -> u64;

    /// Native cluster boundaries, ascending and abutting, covering `[0, record_count)`.
    fn clusters(&self) -> Vec<EntryRange>;

    /// Top-level columns of the table, friends included.
    fn layout(&self) -> ColumnLayout;

    /// Read exactly `columns` over exactly `range`, reporting the bytes moved by this call.
    fn read_range(&mut self, columns: &[String], range: EntryRange) -> Result<ByteData>;
}
