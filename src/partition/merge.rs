use crate::{observability::log_debug, range::EntryRange};

/// Per-file task cap for a parallel run: `ceil(hint * workers / files)`, at least 1.
pub fn max_tasks_per_file(tasks_per_worker_hint: usize, workers: usize, files: usize) -> usize {
    let budget = tasks_per_worker_hint.max(1).saturating_mul(workers);
    budget.div_ceil(files.max(1)).max(1)
}

/// Merge every file's native clusters down to at most `max_tasks_per_file` ranges.
pub fn merge_clusters(
    clusters: Vec<Vec<EntryRange>>,
    max_tasks_per_file: usize,
) -> Vec<Vec<EntryRange>> {
    clusters
        .into_iter()
        .enumerate()
        .map(|(file_idx, file_clusters)| {
            let native = file_clusters.len();
            let merged = merge_file_clusters(file_clusters, max_tasks_per_file);
            log_debug!(
                component = "partition",
                event = "clusters_merged",
                file_idx,
                native,
                merged = merged.len(),
                max_tasks_per_file,
            );
            merged
        })
        .collect()
}

/// Fuse adjacent clusters of one file into exactly `max_tasks` ranges.
///
/// With `n` clusters and `folds = n / max_tasks`, every output range spans
/// `folds` clusters and the first `n % max_tasks` ranges take one extra. When
/// `folds == 0` (including `max_tasks == 0`) the clusters are returned as-is.
/// Clusters are never split, reordered or duplicated.
pub fn merge_file_clusters(clusters: Vec<EntryRange>, max_tasks: usize) -> Vec<EntryRange> {
    if max_tasks == 0 {
        return clusters;
    }
    let folds = clusters.len() / max_tasks;
    if folds == 0 {
        return clusters;
    }

    let mut remainder = clusters.len() % max_tasks;
    let mut merged = Vec::with_capacity(max_tasks);
    let mut first = 0;
    while first < clusters.len() {
        let mut span = folds;
        if remainder > 0 {
            span += 1;
            remainder -= 1;
        }
        let last = first + span - 1;
        merged.push(EntryRange::span(&clusters[first], &clusters[last]));
        first = last + 1;
    }
    debug_assert_eq!(remainder, 0, "cluster merging left clusters unassigned");
    debug_assert_eq!(merged.len(), max_tasks);
    merged
}
