use crate::{
    dataset::Dataset,
    error::Result,
    observability::log_debug,
    range::EntryRange,
    storage::{Storage, TableHandle},
};

/// Native cluster boundaries of every file of `dataset`, in file order.
///
/// Each inner list covers `[0, record_count)` of that file's table exactly;
/// an empty table yields an empty list. The first file that cannot be opened
/// or lacks its table aborts discovery.
pub fn discover_clusters<S: Storage>(
    storage: &S,
    dataset: &Dataset,
) -> Result<Vec<Vec<EntryRange>>> {
    dataset
        .files()
        .map(|(file_name, table_name)| {
            let table = storage.open_table(file_name, table_name)?;
            let clusters = table.clusters();
            debug_assert!(crate::range::covers_exactly(
                &clusters,
                table.record_count()
            ));
            log_debug!(
                component = "partition",
                event = "clusters_discovered",
                file = file_name,
                table = table_name,
                records = table.record_count(),
                clusters = clusters.len(),
            );
            Ok(clusters)
        })
        .collect()
}
