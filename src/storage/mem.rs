//! In-memory storage backend.
//!
//! Tables are described, not materialised: each column has a fixed width per
//! record, so reads cost nothing while byte accounting stays exact. Useful for
//! exercising the scheduler against irregular cluster layouts.

use std::{
    collections::HashMap,
    io,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use super::{Storage, TableHandle};
use crate::{
    accounting::ByteData,
    columns::ColumnLayout,
    error::{ReadSpeedError, Result},
    range::{ranges_from_sizes, EntryRange},
};

/// A fixed-width column of a synthetic table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemColumn {
    /// Column name.
    pub name: String,
    /// Bytes materialised per record.
    pub width: u64,
    /// Bytes fetched from storage per record.
    pub stored_width: u64,
}

impl MemColumn {
    /// Column that stores `width` bytes per record, uncompressed.
    pub fn new(name: impl Into<String>, width: u64) -> Self {
        Self {
            name: name.into(),
            width,
            stored_width: width,
        }
    }

    /// Override the per-record storage footprint.
    pub fn stored_width(mut self, stored_width: u64) -> Self {
        self.stored_width = stored_width;
        self
    }
}

/// A synthetic table: cluster sizes, columns and friends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemTable {
    name: String,
    clusters: Vec<EntryRange>,
    columns: Vec<MemColumn>,
    friends: Vec<(String, MemTable)>,
}

impl MemTable {
    /// Table with the given cluster sizes and no columns yet.
    pub fn new(name: impl Into<String>, cluster_sizes: impl IntoIterator<Item = u64>) -> Self {
        Self {
            name: name.into(),
            clusters: ranges_from_sizes(cluster_sizes),
            columns: Vec::new(),
            friends: Vec::new(),
        }
    }

    /// Add a column.
    pub fn with_column(mut self, column: MemColumn) -> Self {
        self.columns.push(column);
        self
    }

    /// Attach a friend table under `alias`.
    pub fn with_friend(mut self, alias: impl Into<String>, friend: MemTable) -> Self {
        self.friends.push((alias.into(), friend));
        self
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn records(&self) -> u64 {
        self.clusters.last().map(EntryRange::end).unwrap_or(0)
    }

    fn layout(&self) -> ColumnLayout {
        let mut layout = ColumnLayout::new(
            self.name.clone(),
            self.columns.iter().map(|column| column.name.clone()),
        );
        for (alias, friend) in &self.friends {
            layout = layout.with_friend(alias.clone(), friend.layout());
        }
        layout
    }

    fn find_column(&self, name: &str) -> Option<&MemColumn> {
        if let Some(column) = self.columns.iter().find(|column| column.name == name) {
            return Some(column);
        }
        self.friends.iter().find_map(|(alias, friend)| {
            name.strip_prefix(alias.as_str())
                .and_then(|rest| rest.strip_prefix('.'))
                .and_then(|rest| friend.find_column(rest))
                .or_else(|| friend.find_column(name))
        })
    }
}

/// A synthetic file holding named tables.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemFile {
    tables: HashMap<String, MemTable>,
}

impl MemFile {
    /// Empty file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `table` under its own name.
    pub fn with_table(mut self, table: MemTable) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }
}

/// Storage backend serving [`MemFile`]s by name.
#[derive(Debug, Default)]
pub struct MemStorage {
    files: HashMap<String, Arc<MemFile>>,
    opens: AtomicUsize,
}

impl MemStorage {
    /// Empty storage; every open fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `file` under `name`.
    pub fn with_file(mut self, name: impl Into<String>, file: MemFile) -> Self {
        self.files.insert(name.into(), Arc::new(file));
        self
    }

    /// Number of `open` calls observed so far, failed ones included.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl Storage for MemStorage {
    type File = Arc<MemFile>;
    type Table = MemTableHandle;

    fn open(&self, file_name: &str) -> Result<Self::File> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.files
            .get(file_name)
            .cloned()
            .ok_or_else(|| ReadSpeedError::Open {
                file: file_name.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such in-memory file"),
            })
    }

    fn table(&self, file: &Self::File, file_name: &str, table_name: &str) -> Result<Self::Table> {
        let table = file
            .tables
            .get(table_name)
            .cloned()
            .ok_or_else(|| ReadSpeedError::Lookup {
                table: table_name.to_string(),
                file: file_name.to_string(),
            })?;
        Ok(MemTableHandle {
            file: file_name.to_string(),
            table,
        })
    }
}

/// Handle over a [`MemTable`].
#[derive(Debug, Clone)]
pub struct MemTableHandle {
    file: String,
    table: MemTable,
}

impl TableHandle for MemTableHandle {
    fn record_count(&self) -> u64 {
        self.table.records()
    }

    fn clusters(&self) -> Vec<EntryRange> {
        self.table.clusters.clone()
    }

    fn layout(&self) -> ColumnLayout {
        self.table.layout()
    }

    fn read_range(&mut self, columns: &[String], range: EntryRange) -> Result<ByteData> {
        let records = self.table.records();
        if range.end() > records {
            return Err(ReadSpeedError::Range {
                range,
                records,
                table: self.table.name.clone(),
                file: self.file.clone(),
            });
        }

        columns.iter().try_fold(ByteData::identity(), |acc, name| {
            let column = self
                .table
                .find_column(name)
                .ok_or_else(|| ReadSpeedError::Column {
                    table: self.table.name.clone(),
                    file: self.file.clone(),
                    reason: format!("could not retrieve column '{name}'"),
                })?;
            Ok(acc.combine(ByteData::new(
                column.width * range.len(),
                column.stored_width * range.len(),
            )))
        })
    }
}
