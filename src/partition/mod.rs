//! Partitioning of datasets into readable work units.
//!
//! Discovery asks storage for each file's native clusters; merging fuses
//! adjacent clusters so a file never yields more than a bounded number of
//! parallel tasks.

mod discovery;
mod merge;

pub use discovery::discover_clusters;
pub use merge::{max_tasks_per_file, merge_clusters, merge_file_clusters};
