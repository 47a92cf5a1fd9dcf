mod common;

use common::{write_constant_table, write_nullable_table, RECORDS};
use readspeed::{
    eval_throughput, storage::parquet::ParquetStorage, Dataset, ReadSpeedError, ReadSpeedOptions,
    ThroughputEngine,
};
use tempfile::TempDir;

#[test]
fn two_files_read_sequentially_and_in_parallel() {
    let dir = TempDir::new().unwrap();
    let files: Vec<String> = ["f1.parquet", "f2.parquet"]
        .iter()
        .map(|name| write_constant_table(&dir.path().join(name), "t", &["x"], RECORDS))
        .collect();
    let dataset = Dataset::new(["t"], files, ["x"]);

    let sequential = eval_throughput(&dataset, 0).unwrap();
    assert_eq!(sequential.worker_count, 0);
    assert_eq!(sequential.bytes.uncompressed, 80_000_000);
    assert!(sequential.bytes.compressed > 0);

    let parallel = eval_throughput(&dataset, 2).unwrap();
    assert!(parallel.worker_count >= 1);
    assert_eq!(parallel.bytes, sequential.bytes);
}

#[test]
fn column_selection_modes() {
    let dir = TempDir::new().unwrap();
    let file = write_constant_table(
        &dir.path().join("f.parquet"),
        "t",
        &["x", "x_branch", "y_brunch", "mismatched"],
        RECORDS,
    );
    let engine = ThroughputEngine::new(ParquetStorage::default(), ReadSpeedOptions::default());
    let run = |selectors: &[&str], use_regex: bool| {
        let dataset = Dataset::new(["t"], [file.as_str()], selectors.iter().copied())
            .with_regex(use_regex);
        engine.run(&dataset, 0)
    };

    assert_eq!(run(&["x"], false).unwrap().bytes.uncompressed, 40_000_000);
    assert_eq!(
        run(&["(x|y)_.*nch"], true).unwrap().bytes.uncompressed,
        80_000_000
    );
    assert_eq!(run(&[".*"], true).unwrap().bytes.uncompressed, 160_000_000);
    assert!(matches!(
        run(&["z_.*"], true),
        Err(ReadSpeedError::Column { .. })
    ));
    assert!(matches!(
        run(&["x_.*"], false),
        Err(ReadSpeedError::Column { .. })
    ));
}

#[test]
fn worker_count_does_not_change_totals() {
    let dir = TempDir::new().unwrap();
    let files: Vec<String> = (0..3)
        .map(|idx| {
            write_constant_table(
                &dir.path().join(format!("part-{idx}.parquet")),
                "events",
                &["a", "b"],
                RECORDS / 4 + idx * 12_345,
            )
        })
        .collect();
    let dataset = Dataset::new(["events"], files, ["a", "b"]);
    let engine = ThroughputEngine::new(
        ParquetStorage::new(4096),
        ReadSpeedOptions::default().tasks_per_worker_hint(3),
    );

    let expected = engine.run(&dataset, 0).unwrap().bytes;
    assert_eq!(
        expected.uncompressed,
        (3 * (RECORDS / 4) + 3 * 12_345) as u64 * 8
    );
    for workers in [1, 2, 3, 8] {
        assert_eq!(engine.run(&dataset, workers).unwrap().bytes, expected);
    }
}

#[test]
fn nullable_and_string_columns_keep_totals_stable() {
    let dir = TempDir::new().unwrap();
    let files: Vec<String> = (0..2)
        .map(|idx| {
            write_nullable_table(&dir.path().join(format!("n-{idx}.parquet")), "t", 1_000, 10)
        })
        .collect();
    let file_size: u64 = files
        .iter()
        .map(|file| std::fs::metadata(file).unwrap().len())
        .sum();
    let engine = ThroughputEngine::new(ParquetStorage::new(7), ReadSpeedOptions::default());

    for selectors in [&["n"][..], &["s"][..], &["n", "s"][..]] {
        let dataset = Dataset::new(
            ["t"],
            files.iter().map(String::as_str),
            selectors.iter().copied(),
        );
        let expected = engine.run(&dataset, 0).unwrap().bytes;
        assert!(expected.compressed <= file_size);
        for workers in [1, 2, 4] {
            assert_eq!(engine.run(&dataset, workers).unwrap().bytes, expected);
        }
    }

    let dataset = Dataset::new(["t"], files.iter().map(String::as_str), ["n"]);
    assert_eq!(engine.run(&dataset, 0).unwrap().bytes.uncompressed, 2 * 1_000 * 4);
}

#[test]
fn compressed_bytes_stay_within_the_files() {
    let dir = TempDir::new().unwrap();
    let file = write_constant_table(&dir.path().join("c.parquet"), "t", &["x", "y"], 3_000_000);
    let file_size = std::fs::metadata(&file).unwrap().len();
    let engine = ThroughputEngine::new(ParquetStorage::default(), ReadSpeedOptions::default());

    let only_x = engine.run(&Dataset::new(["t"], [file.as_str()], ["x"]), 0).unwrap();
    let both = engine.run(&Dataset::new(["t"], [file.as_str()], ["x", "y"]), 2).unwrap();
    assert!(only_x.bytes.compressed > 0);
    assert!(only_x.bytes.compressed < both.bytes.compressed);
    assert!(both.bytes.compressed <= file_size);
}

#[test]
fn unreadable_inputs_fail_the_run() {
    let dir = TempDir::new().unwrap();
    let good = write_constant_table(&dir.path().join("good.parquet"), "t", &["x"], 1_000);
    let missing = dir.path().join("missing.parquet").display().to_string();

    let dataset = Dataset::new(["t"], [good.as_str(), missing.as_str()], ["x"]);
    for workers in [0, 2] {
        assert!(matches!(
            eval_throughput(&dataset, workers),
            Err(ReadSpeedError::Open { ref file, .. }) if *file == missing
        ));
    }

    let dataset = Dataset::new(["other"], [good.as_str()], ["x"]);
    assert!(matches!(
        eval_throughput(&dataset, 0),
        Err(ReadSpeedError::Lookup { .. })
    ));
}
