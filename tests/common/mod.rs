use std::{path::Path, sync::Arc};

use arrow::{
    array::{ArrayRef, Int32Array, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use readspeed::storage::parquet::{write_table, TableWriteOptions};

pub const RECORDS: usize = 10_000_000;
const BATCH: usize = 1_000_000;

/// Write `records` rows of non-nullable `i32` columns, every value `42`.
pub fn write_constant_table(path: &Path, table: &str, columns: &[&str], records: usize) -> String {
    let schema = Arc::new(Schema::new(
        columns
            .iter()
            .map(|name| Field::new(*name, DataType::Int32, false))
            .collect::<Vec<_>>(),
    ));
    let batches = (0..records).step_by(BATCH).map(|start| {
        let len = BATCH.min(records - start);
        let column: ArrayRef = Arc::new(Int32Array::from(vec![42; len]));
        RecordBatch::try_new(schema.clone(), vec![column; columns.len()]).unwrap()
    });
    write_table(path, table, schema.clone(), batches, TableWriteOptions::default()).unwrap();
    path.display().to_string()
}

/// Write `records` rows of a nullable `i32` column `n` (every third value
/// null) and a nullable string column `s`, in row groups of `group` records.
pub fn write_nullable_table(path: &Path, table: &str, records: usize, group: usize) -> String {
    let schema = Arc::new(Schema::new(vec![
        Field::new("n", DataType::Int32, true),
        Field::new("s", DataType::Utf8, true),
    ]));
    let ns: Vec<Option<i32>> = (0..records as i32).map(|i| (i % 3 != 0).then_some(i)).collect();
    let ss: Vec<Option<String>> = (0..records)
        .map(|i| (i % 5 != 0).then(|| format!("value-{}", i % 11)))
        .collect();
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int32Array::from(ns)) as ArrayRef,
            Arc::new(StringArray::from(ss)) as ArrayRef,
        ],
    )
    .unwrap();
    let options = TableWriteOptions {
        max_row_group_size: group,
        ..TableWriteOptions::default()
    };
    write_table(path, table, schema, [batch], options).unwrap();
    path.display().to_string()
}
