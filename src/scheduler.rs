//! Dispatch of read tasks, sequentially or across a fixed worker pool.
//!
//! The parallel path generates the whole task list up front, pushes it into
//! a `flume` queue and lets `workers` scoped threads drain it. Every worker
//! folds its own [`ByteData`] and keeps its own [`HandleCache`]; the only
//! state shared between workers is the abort flag and the first-error slot.

use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
};

use parking_lot::Mutex;

use crate::{
    accounting::ByteData,
    error::{ReadSpeedError, Result},
    observability::log_debug,
    range::EntryRange,
    storage::{Storage, TableHandle},
};

/// Everything needed to read one file: where, which columns, which ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePlan {
    /// File to open.
    pub file: String,
    /// Table to look up inside the file.
    pub table: String,
    /// Concrete columns, already resolved against the table.
    pub columns: Vec<String>,
    /// Ranges to read, one task each.
    pub ranges: Vec<EntryRange>,
}

/// One unit of work: read the plan's columns over one range.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Task<'a> {
    pub(crate) file_idx: usize,
    pub(crate) plan: &'a FilePlan,
    pub(crate) range: EntryRange,
}

impl Task<'_> {
    fn execute<S: Storage>(&self, cache: &mut HandleCache<'_, S>) -> Result<ByteData> {
        cache
            .table(&self.plan.file, &self.plan.table)?
            .read_range(&self.plan.columns, self.range)
    }
}

/// Flatten files x ranges into tasks, file-major.
pub(crate) fn flatten_tasks(plans: &[FilePlan]) -> Vec<Task<'_>> {
    plans
        .iter()
        .enumerate()
        .flat_map(|(file_idx, plan)| {
            plan.ranges.iter().map(move |range| Task {
                file_idx,
                plan,
                range: *range,
            })
        })
        .collect()
}

struct CachedTable<T> {
    file: String,
    table: String,
    handle: T,
}

/// The table handle a single worker most recently used.
///
/// Consecutive tasks on the same file reuse the open handle; moving to a
/// different file drops it and opens the new one. Never shared between workers.
pub struct HandleCache<'s, S: Storage> {
    storage: &'s S,
    current: Option<CachedTable<S::Table>>,
    opens: usize,
}

impl<'s, S: Storage> HandleCache<'s, S> {
    /// Empty cache over `storage`.
    pub fn new(storage: &'s S) -> Self {
        Self {
            storage,
            current: None,
            opens: 0,
        }
    }

    /// Handle for `table` in `file`, opening it unless it is the cached one.
    pub fn table(&mut self, file: &str, table: &str) -> Result<&mut S::Table> {
        let cached = match self.current.take() {
            Some(cached) if cached.file == file && cached.table == table => cached,
            stale => {
                drop(stale);
                self.opens += 1;
                CachedTable {
                    file: file.to_string(),
                    table: table.to_string(),
                    handle: self.storage.open_table(file, table)?,
                }
            }
        };
        Ok(&mut self.current.insert(cached).handle)
    }

    /// How many times this cache had to open a table.
    pub fn opens(&self) -> usize {
        self.opens
    }
}

/// Read every range of every plan in order on the calling thread.
pub fn run_sequential<S: Storage>(storage: &S, plans: &[FilePlan]) -> Result<ByteData> {
    let mut cache = HandleCache::new(storage);
    flatten_tasks(plans)
        .into_iter()
        .try_fold(ByteData::identity(), |total, task| {
            Ok(total.combine(task.execute(&mut cache)?))
        })
}

/// Read every range of every plan on `workers` threads and sum the results.
///
/// The first failing task stops the pool from starting new tasks; its error
/// is returned and all partial totals are discarded.
pub fn run_parallel<S: Storage>(
    storage: &S,
    plans: &[FilePlan],
    workers: usize,
) -> Result<ByteData> {
    let tasks = flatten_tasks(plans);
    let task_count = tasks.len();
    if task_count == 0 {
        return Ok(ByteData::identity());
    }
    let spawned = workers.clamp(1, task_count);

    let (sender, receiver) = flume::unbounded();
    for task in tasks {
        if sender.send(task).is_err() {
            break;
        }
    }
    drop(sender);

    log_debug!(
        component = "scheduler",
        event = "dispatch_started",
        tasks = task_count,
        workers = spawned,
    );

    let abort = AtomicBool::new(false);
    let first_error = Mutex::new(None);

    let totals = thread::scope(|scope| {
        let mut handles = Vec::with_capacity(spawned);
        for worker_id in 0..spawned {
            let receiver = receiver.clone();
            let abort = &abort;
            let first_error = &first_error;
            let spawn = thread::Builder::new()
                .name(format!("readspeed-worker-{worker_id}"))
                .spawn_scoped(scope, move || {
                    worker_loop(worker_id, storage, receiver, abort, first_error)
                });
            match spawn {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    abort.store(true, Ordering::Release);
                    record_error(first_error, ReadSpeedError::Worker(err));
                    break;
                }
            }
        }

        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(total) => total,
                Err(payload) => std::panic::resume_unwind(payload),
            })
            .collect::<Vec<_>>()
    });

    if let Some(err) = first_error.into_inner() {
        return Err(err);
    }
    Ok(totals.into_iter().sum())
}

fn worker_loop<S: Storage>(
    worker_id: usize,
    storage: &S,
    receiver: flume::Receiver<Task<'_>>,
    abort: &AtomicBool,
    first_error: &Mutex<Option<ReadSpeedError>>,
) -> ByteData {
    let mut cache = HandleCache::new(storage);
    let mut total = ByteData::identity();
    let mut completed = 0usize;

    while !abort.load(Ordering::Acquire) {
        let Ok(task) = receiver.recv() else {
            break;
        };
        match task.execute(&mut cache) {
            Ok(bytes) => {
                total = total.combine(bytes);
                completed += 1;
            }
            Err(err) => {
                abort.store(true, Ordering::Release);
                log_debug!(
                    component = "scheduler",
                    event = "worker_aborted",
                    worker_id,
                    file_idx = task.file_idx,
                    range = %task.range,
                    error = %err,
                );
                record_error(first_error, err);
                break;
            }
        }
    }

    log_debug!(
        component = "scheduler",
        event = "worker_finished",
        worker_id,
        completed,
        opens = cache.opens(),
    );
    total
}

fn record_error(slot: &Mutex<Option<ReadSpeedError>>, err: ReadSpeedError) {
    let mut slot = slot.lock();
    if slot.is_none() {
        *slot = Some(err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        range::ranges_from_sizes,
        storage::mem::{MemColumn, MemFile, MemStorage, MemTable},
    };

    fn storage() -> MemStorage {
        let table = |sizes: &[u64]| {
            MemTable::new("t", sizes.iter().copied())
                .with_column(MemColumn::new("x", 4).stored_width(2))
                .with_column(MemColumn::new("y", 8).stored_width(3))
        };
        MemStorage::new()
            .with_file("a", MemFile::new().with_table(table(&[100, 50, 7, 300])))
            .with_file("b", MemFile::new().with_table(table(&[1, 1, 1, 1, 1, 995])))
    }

    fn plan(file: &str, sizes: &[u64], columns: &[&str]) -> FilePlan {
        FilePlan {
            file: file.to_string(),
            table: "t".to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            ranges: ranges_from_sizes(sizes.iter().copied()),
        }
    }

    fn plans() -> Vec<FilePlan> {
        vec![
            plan("a", &[100, 50, 7, 300], &["x", "y"]),
            plan("b", &[1, 1, 1, 1, 1, 995], &["y"]),
        ]
    }

    #[test]
    fn flattening_is_file_major() {
        let plans = plans();
        let tasks = flatten_tasks(&plans);
        assert_eq!(tasks.len(), 10);
        assert!(tasks[..4].iter().all(|task| task.file_idx == 0));
        assert!(tasks[4..].iter().all(|task| task.file_idx == 1));
        assert_eq!(tasks[4].range, EntryRange::new(0, 1).unwrap());
    }

    #[test]
    fn cache_reopens_only_on_file_change() {
        let storage = storage();
        let mut cache = HandleCache::new(&storage);
        cache.table("a", "t").unwrap();
        cache.table("a", "t").unwrap();
        assert_eq!(cache.opens(), 1);
        cache.table("b", "t").unwrap();
        cache.table("a", "t").unwrap();
        assert_eq!(cache.opens(), 3);
        assert_eq!(storage.open_count(), 3);
    }

    #[test]
    fn sequential_sums_every_range() {
        let storage = storage();
        let total = run_sequential(&storage, &plans()).unwrap();
        assert_eq!(total, ByteData::new(457 * 12 + 1000 * 8, 457 * 5 + 1000 * 3));
    }

    #[test]
    fn parallel_matches_sequential_for_any_worker_count() {
        let storage = storage();
        let plans = plans();
        let expected = run_sequential(&storage, &plans).unwrap();
        for workers in [1, 2, 3, 8, 64] {
            assert_eq!(run_parallel(&storage, &plans, workers).unwrap(), expected);
        }
    }

    #[test]
    fn parallel_with_no_tasks_is_zero() {
        let storage = storage();
        let empty = vec![plan("a", &[], &["x"])];
        assert_eq!(
            run_parallel(&storage, &empty, 4).unwrap(),
            ByteData::identity()
        );
    }

    #[test]
    fn first_failure_aborts_the_run() {
        let storage = storage();
        let mut plans = plans();
        plans.push(plan("missing", &[10, 10], &["x"]));
        for workers in [1, 4] {
            let err = run_parallel(&storage, &plans, workers).unwrap_err();
            assert!(matches!(err, ReadSpeedError::Open { ref file, .. } if file == "missing"));
        }
        assert!(matches!(
            run_sequential(&storage, &plans),
            Err(ReadSpeedError::Open { .. })
        ));
    }

    #[test]
    fn queued_tasks_do_not_start_after_a_failure() {
        let storage = storage();
        let mut queued = vec![plan("missing", &[10], &["x"])];
        for _ in 0..50 {
            queued.extend(plans());
        }

        assert!(matches!(
            run_parallel(&storage, &queued, 1),
            Err(ReadSpeedError::Open { ref file, .. }) if file == "missing"
        ));
        // Only the failed open happened: every later task stayed in the queue.
        assert_eq!(storage.open_count(), 1);

        assert!(run_sequential(&storage, &queued).is_err());
        assert_eq!(storage.open_count(), 2);
    }

    #[test]
    fn out_of_bounds_range_surfaces_as_range_error() {
        let storage = storage();
        let plans = vec![plan("a", &[100, 50, 7, 301], &["x"])];
        assert!(matches!(
            run_parallel(&storage, &plans, 2),
            Err(ReadSpeedError::Range { .. })
        ));
    }
}
