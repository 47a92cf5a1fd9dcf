//! Parquet-backed storage.
//!
//! Each Parquet file holds a single table. Its name is stored in the footer
//! key/value metadata under [`TABLE_NAME_KEY`]; files written by other tools
//! fall back to their file stem. Native clusters are the file's non-empty row
//! groups.

use std::{
    fs::File,
    io::{self, BufReader, Read, Seek, SeekFrom},
    path::Path,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use ::parquet::{
    arrow::{
        arrow_reader::{
            ArrowReaderMetadata, ArrowReaderOptions, ParquetRecordBatchReaderBuilder,
            RowSelection, RowSelector,
        },
        ArrowWriter, ProjectionMask,
    },
    basic::Compression,
    errors::ParquetError,
    file::{
        metadata::KeyValue,
        properties::WriterProperties,
        reader::{ChunkReader, Length},
    },
};
use arrow::{
    array::{Array, ArrayData},
    datatypes::{DataType, SchemaRef},
    record_batch::RecordBatch,
};
use bytes::Bytes;

use super::{Storage, TableHandle};
use crate::{
    accounting::ByteData,
    columns::ColumnLayout,
    error::{ReadSpeedError, Result},
    option::{ReadSpeedOptions, DEFAULT_BATCH_SIZE},
    range::{ranges_from_sizes, EntryRange},
};

/// Footer metadata key holding the table name.
pub const TABLE_NAME_KEY: &str = "readspeed.table";

/// Storage backend reading Parquet files from the local filesystem.
#[derive(Debug, Clone)]
pub struct ParquetStorage {
    batch_size: usize,
}

impl Default for ParquetStorage {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl ParquetStorage {
    /// Backend decoding `batch_size` records at a time.
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }
}

impl From<&ReadSpeedOptions> for ParquetStorage {
    fn from(options: &ReadSpeedOptions) -> Self {
        Self::new(options.batch_size)
    }
}

/// An opened Parquet file with its footer already decoded.
#[derive(Debug, Clone)]
pub struct ParquetFile {
    reader: CountingFile,
    metadata: ArrowReaderMetadata,
}

impl ParquetFile {
    fn table_name(&self, file_name: &str) -> Option<String> {
        let stored = self
            .metadata
            .metadata()
            .file_metadata()
            .key_value_metadata()
            .and_then(|entries| {
                entries
                    .iter()
                    .find(|entry| entry.key == TABLE_NAME_KEY)
                    .and_then(|entry| entry.value.clone())
            });
        stored.or_else(|| {
            Path::new(file_name)
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
    }
}

impl Storage for ParquetStorage {
    type File = ParquetFile;
    type Table = ParquetTable;

    fn open(&self, file_name: &str) -> Result<Self::File> {
        let open_error = |source: io::Error| ReadSpeedError::Open {
            file: file_name.to_string(),
            source,
        };
        let reader = CountingFile::new(File::open(file_name).map_err(open_error)?);
        let metadata = ArrowReaderMetadata::load(&reader, ArrowReaderOptions::new())
            .map_err(|err| open_error(io::Error::new(io::ErrorKind::InvalidData, err)))?;
        Ok(ParquetFile { reader, metadata })
    }

    fn table(&self, file: &Self::File, file_name: &str, table_name: &str) -> Result<Self::Table> {
        if file.table_name(file_name).as_deref() != Some(table_name) {
            return Err(ReadSpeedError::Lookup {
                table: table_name.to_string(),
                file: file_name.to_string(),
            });
        }
        let row_group_sizes: Vec<u64> = file
            .metadata
            .metadata()
            .row_groups()
            .iter()
            .map(|row_group| row_group.num_rows().max(0) as u64)
            .collect();
        Ok(ParquetTable {
            file: file_name.to_string(),
            table: table_name.to_string(),
            reader: file.reader.clone(),
            metadata: file.metadata.clone(),
            row_group_sizes,
            batch_size: self.batch_size,
        })
    }
}

/// A Parquet table ready for range reads.
#[derive(Debug, Clone)]
pub struct ParquetTable {
    file: String,
    table: String,
    reader: CountingFile,
    metadata: ArrowReaderMetadata,
    row_group_sizes: Vec<u64>,
    batch_size: usize,
}

impl ParquetTable {
    fn schema(&self) -> &SchemaRef {
        self.metadata.schema()
    }

    /// Row groups overlapping `range`, with the row selection that trims them to it.
    fn plan_range(&self, range: EntryRange) -> (Vec<usize>, Option<RowSelection>) {
        let mut row_groups = Vec::new();
        let mut selectors = Vec::new();
        let mut trimmed = false;
        let mut group_start = 0;
        for (idx, size) in self.row_group_sizes.iter().enumerate() {
            let group_end = group_start + size;
            let start = range.start().max(group_start);
            let end = range.end().min(group_end);
            if start < end {
                row_groups.push(idx);
                let head = start - group_start;
                let tail = group_end - end;
                trimmed |= head > 0 || tail > 0;
                if head > 0 {
                    selectors.push(RowSelector::skip(head as usize));
                }
                selectors.push(RowSelector::select((end - start) as usize));
                if tail > 0 {
                    selectors.push(RowSelector::skip(tail as usize));
                }
            }
            group_start = group_end;
        }
        (row_groups, trimmed.then(|| RowSelection::from(selectors)))
    }

    fn projection(&self, columns: &[String]) -> Result<ProjectionMask> {
        let roots = columns
            .iter()
            .map(|name| {
                self.schema()
                    .index_of(name)
                    .map_err(|_| ReadSpeedError::Column {
                        table: self.table.clone(),
                        file: self.file.clone(),
                        reason: format!("could not retrieve column '{name}'"),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ProjectionMask::roots(self.metadata.parquet_schema(), roots))
    }
}

impl TableHandle for ParquetTable {
    fn record_count(&self) -> u64 {
        self.row_group_sizes.iter().sum()
    }

    fn clusters(&self) -> Vec<EntryRange> {
        ranges_from_sizes(self.row_group_sizes.iter().copied())
    }

    fn layout(&self) -> ColumnLayout {
        ColumnLayout::new(
            self.table.clone(),
            self.schema().fields().iter().map(|field| field.name().clone()),
        )
    }

    fn read_range(&mut self, columns: &[String], range: EntryRange) -> Result<ByteData> {
        let records = self.record_count();
        if range.end() > records {
            return Err(ReadSpeedError::Range {
                range,
                records,
                table: self.table.clone(),
                file: self.file.clone(),
            });
        }

        let projection = self.projection(columns)?;
        let (row_groups, selection) = self.plan_range(range);
        let fetched_before = self.reader.bytes_read();

        let mut builder = ParquetRecordBatchReaderBuilder::new_with_metadata(
            self.reader.clone(),
            self.metadata.clone(),
        )
        .with_projection(projection)
        .with_row_groups(row_groups)
        .with_batch_size(self.batch_size);
        if let Some(selection) = selection {
            builder = builder.with_row_selection(selection);
        }
        let batches = builder
            .build()
            .map_err(|err| ReadSpeedError::parquet(&self.file, err))?;

        let mut uncompressed = 0u64;
        for batch in batches {
            let batch = batch.map_err(|err| {
                ReadSpeedError::parquet(&self.file, ParquetError::ArrowError(err.to_string()))
            })?;
            uncompressed += batch
                .columns()
                .iter()
                .map(|column| value_bytes(&column.to_data()))
                .sum::<u64>();
        }

        let compressed = self.reader.bytes_read() - fetched_before;
        Ok(ByteData::new(uncompressed, compressed))
    }
}

/// Per-record value footprint of `data`.
///
/// Validity bitmaps are left out and booleans count one byte each, so the
/// size of a range equals the sum of the sizes of any split of it.
fn value_bytes(data: &ArrayData) -> u64 {
    let len = data.len();
    if len == 0 {
        return 0;
    }
    let records = len as u64;
    match data.data_type() {
        DataType::Null => 0,
        DataType::Boolean => records,
        DataType::Utf8 | DataType::Binary => {
            let offsets = data.buffer::<i32>(0);
            records * 4 + (offsets[len] - offsets[0]) as u64
        }
        DataType::LargeUtf8 | DataType::LargeBinary => {
            let offsets = data.buffer::<i64>(0);
            records * 8 + (offsets[len] - offsets[0]) as u64
        }
        DataType::List(_) | DataType::Map(_, _) => {
            let offsets = data.buffer::<i32>(0);
            let (start, end) = (offsets[0] as usize, offsets[len] as usize);
            records * 4 + value_bytes(&data.child_data()[0].slice(start, end - start))
        }
        DataType::LargeList(_) => {
            let offsets = data.buffer::<i64>(0);
            let (start, end) = (offsets[0] as usize, offsets[len] as usize);
            records * 8 + value_bytes(&data.child_data()[0].slice(start, end - start))
        }
        DataType::FixedSizeList(_, size) => {
            let size = (*size).max(0) as usize;
            value_bytes(&data.child_data()[0].slice(data.offset() * size, len * size))
        }
        // Struct children are sliced together with their parent.
        DataType::Struct(_) => data.child_data().iter().map(value_bytes).sum(),
        DataType::FixedSizeBinary(width) => records * (*width).max(0) as u64,
        DataType::Dictionary(key, _) => records * key.primitive_width().unwrap_or_default() as u64,
        data_type => match data_type.primitive_width() {
            Some(width) => records * width as u64,
            None => data.get_slice_memory_size().unwrap_or_default() as u64,
        },
    }
}

/// File reader that counts every byte fetched through it.
#[derive(Debug, Clone)]
struct CountingFile {
    file: Arc<File>,
    bytes_read: Arc<AtomicU64>,
}

impl CountingFile {
    fn new(file: File) -> Self {
        Self {
            file: Arc::new(file),
            bytes_read: Arc::new(AtomicU64::new(0)),
        }
    }

    fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::Relaxed)
    }

    fn file_at(&self, start: u64) -> io::Result<File> {
        let mut file = self.file.try_clone()?;
        file.seek(SeekFrom::Start(start))?;
        Ok(file)
    }
}

/// Counts the bytes handed to the decoder, not the bytes buffered ahead of it.
struct CountingRead<R> {
    inner: R,
    bytes_read: Arc<AtomicU64>,
}

impl<R: Read> Read for CountingRead<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        self.bytes_read.fetch_add(read as u64, Ordering::Relaxed);
        Ok(read)
    }
}

impl Length for CountingFile {
    fn len(&self) -> u64 {
        self.file.metadata().map(|meta| meta.len()).unwrap_or(0)
    }
}

impl ChunkReader for CountingFile {
    type T = CountingRead<BufReader<File>>;

    fn get_read(&self, start: u64) -> ::parquet::errors::Result<Self::T> {
        Ok(CountingRead {
            inner: BufReader::new(self.file_at(start)?),
            bytes_read: Arc::clone(&self.bytes_read),
        })
    }

    fn get_bytes(&self, start: u64, length: usize) -> ::parquet::errors::Result<Bytes> {
        let mut buffer = Vec::with_capacity(length);
        let read = self
            .file_at(start)?
            .take(length as u64)
            .read_to_end(&mut buffer)?;
        self.bytes_read.fetch_add(read as u64, Ordering::Relaxed);
        if read != length {
            return Err(ParquetError::EOF(format!(
                "expected to read {length} bytes at offset {start}, read only {read}"
            )));
        }
        Ok(buffer.into())
    }
}

/// Settings for [`write_table`].
#[derive(Debug, Clone, Copy)]
pub struct TableWriteOptions {
    /// Maximum records per row group, i.e. per native cluster.
    pub max_row_group_size: usize,
    /// Page compression.
    pub compression: Compression,
}

impl Default for TableWriteOptions {
    fn default() -> Self {
        Self {
            max_row_group_size: 1024 * 1024,
            compression: Compression::SNAPPY,
        }
    }
}

/// Write `batches` to `path` as a Parquet table named `table_name`.
pub fn write_table(
    path: impl AsRef<Path>,
    table_name: &str,
    schema: SchemaRef,
    batches: impl IntoIterator<Item = RecordBatch>,
    options: TableWriteOptions,
) -> Result<()> {
    let path = path.as_ref();
    let file_name = path.display().to_string();
    let file = File::create(path).map_err(|source| ReadSpeedError::Open {
        file: file_name.clone(),
        source,
    })?;
    let properties = WriterProperties::builder()
        .set_max_row_group_size(options.max_row_group_size.max(1))
        .set_compression(options.compression)
        .set_key_value_metadata(Some(vec![KeyValue::new(
            TABLE_NAME_KEY.to_string(),
            table_name.to_string(),
        )]))
        .build();

    let mut writer = ArrowWriter::try_new(file, schema, Some(properties))
        .map_err(|err| ReadSpeedError::parquet(&file_name, err))?;
    for batch in batches {
        writer
            .write(&batch)
            .map_err(|err| ReadSpeedError::parquet(&file_name, err))?;
    }
    writer
        .close()
        .map_err(|err| ReadSpeedError::parquet(&file_name, err))?;
    Ok(())
}
