//! Orchestration of a throughput run: validate, partition, dispatch, time.

use std::{fmt, num::NonZeroUsize, thread, time::Duration};

use crate::{
    accounting::ByteData,
    columns::{resolve_columns, ColumnMatcher},
    dataset::Dataset,
    error::Result,
    observability::{log_info, log_warn},
    option::ReadSpeedOptions,
    partition::{discover_clusters, max_tasks_per_file, merge_clusters},
    range::EntryRange,
    scheduler::{self, FilePlan},
    storage::{parquet::ParquetStorage, Storage, TableHandle},
    timer::Stopwatch,
};

const MIB: f64 = 1024.0 * 1024.0;

/// Outcome of one successful run. Produced once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThroughputReport {
    /// Wall-clock time of the read phase.
    pub wall_time: Duration,
    /// Process CPU time of the read phase.
    pub cpu_time: Duration,
    /// Wall-clock time of discovery and merging; zero for sequential runs.
    pub setup_wall_time: Duration,
    /// Process CPU time of discovery and merging; zero for sequential runs.
    pub setup_cpu_time: Duration,
    /// Bytes read across the whole dataset.
    pub bytes: ByteData,
    /// Granted worker pool size; zero means a sequential run without a pool.
    pub worker_count: usize,
}

impl ThroughputReport {
    fn effective_workers(&self) -> usize {
        self.worker_count.max(1)
    }

    fn mib_per_second(&self, bytes: u64) -> f64 {
        let seconds = self.wall_time.as_secs_f64();
        if seconds > 0.0 {
            bytes as f64 / seconds / MIB
        } else {
            0.0
        }
    }

    /// Uncompressed bytes per second of read-phase wall time, in MiB/s.
    pub fn uncompressed_throughput(&self) -> f64 {
        self.mib_per_second(self.bytes.uncompressed)
    }

    /// Compressed bytes per second of read-phase wall time, in MiB/s.
    pub fn compressed_throughput(&self) -> f64 {
        self.mib_per_second(self.bytes.compressed)
    }
}

impl fmt::Display for ThroughputReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let workers = self.effective_workers();
        writeln!(f, "Worker pool size:\t\t{}", self.worker_count)?;
        if self.setup_wall_time > Duration::ZERO {
            writeln!(
                f,
                "Real time to setup run:\t\t{} s",
                self.setup_wall_time.as_secs_f64()
            )?;
            writeln!(
                f,
                "CPU time to setup run:\t\t{} s",
                self.setup_cpu_time.as_secs_f64()
            )?;
        }
        writeln!(f, "Real time:\t\t\t{} s", self.wall_time.as_secs_f64())?;
        writeln!(f, "CPU time:\t\t\t{} s", self.cpu_time.as_secs_f64())?;
        writeln!(
            f,
            "Uncompressed data read:\t\t{} bytes",
            self.bytes.uncompressed
        )?;
        writeln!(f, "Compressed data read:\t\t{} bytes", self.bytes.compressed)?;
        writeln!(
            f,
            "Uncompressed throughput:\t{} MB/s",
            self.uncompressed_throughput()
        )?;
        writeln!(
            f,
            "\t\t\t\t{} MB/s/worker for {} workers",
            self.uncompressed_throughput() / workers as f64,
            workers
        )?;
        writeln!(
            f,
            "Compressed throughput:\t\t{} MB/s",
            self.compressed_throughput()
        )?;
        write!(
            f,
            "\t\t\t\t{} MB/s/worker for {} workers",
            self.compressed_throughput() / workers as f64,
            workers
        )
    }
}

/// Runs throughput measurements against one storage backend.
#[derive(Debug)]
pub struct ThroughputEngine<S> {
    storage: S,
    options: ReadSpeedOptions,
}

impl<S: Storage> ThroughputEngine<S> {
    /// Engine over `storage` tuned by `options`.
    pub fn new(storage: S, options: ReadSpeedOptions) -> Self {
        Self { storage, options }
    }

    /// The storage backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// The tuning options.
    pub fn options(&self) -> &ReadSpeedOptions {
        &self.options
    }

    /// Read every selected column of every record of `dataset`.
    ///
    /// `workers == 0` reads sequentially on the calling thread; otherwise the
    /// run uses a pool of up to `workers` threads. The dataset is validated
    /// and selectors compiled before any file is opened.
    pub fn run(&self, dataset: &Dataset, workers: usize) -> Result<ThroughputReport> {
        dataset.validate()?;
        let matcher = ColumnMatcher::new(&dataset.column_selectors, dataset.use_regex)?;

        let report = if workers == 0 {
            self.run_sequential(dataset, &matcher)?
        } else {
            self.run_parallel(dataset, &matcher, workers)?
        };

        log_info!(
            component = "engine",
            event = "run_finished",
            files = dataset.file_names.len(),
            workers = report.worker_count,
            uncompressed_bytes = report.bytes.uncompressed,
            compressed_bytes = report.bytes.compressed,
            wall_s = report.wall_time.as_secs_f64(),
        );
        Ok(report)
    }

    fn run_sequential(
        &self,
        dataset: &Dataset,
        matcher: &ColumnMatcher,
    ) -> Result<ThroughputReport> {
        let clusters = discover_clusters(&self.storage, dataset)?;
        let plans = self.plan_files(dataset, matcher, clusters)?;

        let mut watch = Stopwatch::started();
        let bytes = scheduler::run_sequential(&self.storage, &plans)?;
        watch.stop();

        Ok(ThroughputReport {
            wall_time: watch.wall_time(),
            cpu_time: watch.cpu_time(),
            setup_wall_time: Duration::ZERO,
            setup_cpu_time: Duration::ZERO,
            bytes,
            worker_count: 0,
        })
    }

    fn run_parallel(
        &self,
        dataset: &Dataset,
        matcher: &ColumnMatcher,
        requested: usize,
    ) -> Result<ThroughputReport> {
        let workers = granted_workers(requested);
        if workers != requested {
            log_warn!(
                component = "engine",
                event = "pool_size_reduced",
                requested,
                granted = workers,
            );
        }

        let mut setup = Stopwatch::started();
        let max_tasks = max_tasks_per_file(
            self.options.tasks_per_worker_hint,
            workers,
            dataset.file_names.len(),
        );
        let ranges = merge_clusters(discover_clusters(&self.storage, dataset)?, max_tasks);
        setup.stop();

        let plans = self.plan_files(dataset, matcher, ranges)?;

        let mut watch = Stopwatch::started();
        let bytes = scheduler::run_parallel(&self.storage, &plans, workers)?;
        watch.stop();

        Ok(ThroughputReport {
            wall_time: watch.wall_time(),
            cpu_time: watch.cpu_time(),
            setup_wall_time: setup.wall_time(),
            setup_cpu_time: setup.cpu_time(),
            bytes,
            worker_count: workers,
        })
    }

    /// Resolve columns once per file and pair them with that file's ranges.
    ///
    /// Runs to completion before any read task exists, so a selector that
    /// fails on any file aborts the run without reading anything.
    fn plan_files(
        &self,
        dataset: &Dataset,
        matcher: &ColumnMatcher,
        ranges: Vec<Vec<EntryRange>>,
    ) -> Result<Vec<FilePlan>> {
        dataset
            .files()
            .zip(ranges)
            .map(|((file, table), ranges)| {
                let handle = self.storage.open_table(file, table)?;
                let columns = resolve_columns(&handle.layout(), matcher, file)?;
                Ok(FilePlan {
                    file: file.to_string(),
                    table: table.to_string(),
                    columns,
                    ranges,
                })
            })
            .collect()
    }
}

/// Measure `dataset` stored as Parquet files with default options.
pub fn eval_throughput(dataset: &Dataset, workers: usize) -> Result<ThroughputReport> {
    let options = ReadSpeedOptions::default();
    ThroughputEngine::new(ParquetStorage::from(&options), options).run(dataset, workers)
}

/// Pool size actually granted for a request: capped by the host's parallelism.
pub fn granted_workers(requested: usize) -> usize {
    let available = thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1);
    requested.min(available).max(1)
}
