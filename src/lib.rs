#![deny(missing_docs)]
//! Read-throughput measurement over partitioned columnar datasets.
//!
//! A run reads a selected set of columns from every record of one or more
//! files and reports elapsed time and bytes moved. The interesting part is
//! the partitioning: each file's native clusters are discovered, merged into
//! a bounded number of ranges, and dispatched across a fixed worker pool so
//! that totals are identical whatever the worker count.
//!
//! ```no_run
//! use readspeed::{eval_throughput, Dataset};
//!
//! let dataset = Dataset::new(["t"], ["a.parquet", "b.parquet"], ["x"]);
//! let report = eval_throughput(&dataset, 4)?;
//! println!("{report}");
//! # Ok::<(), readspeed::ReadSpeedError>(())
//! ```

mod observability;

/// Byte counters and their associative combination.
pub mod accounting;
/// Command-line argument model of the `readspeed` binary.
pub mod cli;
/// Column listing and selector matching.
pub mod columns;
/// Run descriptor and its validation.
pub mod dataset;
/// Run orchestration and reporting.
pub mod engine;
/// Crate error type.
pub mod error;
/// Tuning options.
pub mod option;
/// Cluster discovery and merging.
pub mod partition;
/// Record ranges.
pub mod range;
/// Task dispatch and the worker pool.
pub mod scheduler;
/// Storage backends.
pub mod storage;
/// Wall and CPU time measurement.
pub mod timer;

pub use crate::{
    accounting::ByteData,
    dataset::Dataset,
    engine::{eval_throughput, ThroughputEngine, ThroughputReport},
    error::{ReadSpeedError, Result},
    option::ReadSpeedOptions,
    range::EntryRange,
};
