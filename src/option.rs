/// Default target number of tasks per worker used to bound per-file fan-out.
pub const DEFAULT_TASKS_PER_WORKER_HINT: usize = 10;

/// Default number of records decoded per batch by backends that batch reads.
pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// Tuning knobs for a throughput run, read once before scheduling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadSpeedOptions {
    pub(crate) tasks_per_worker_hint: usize,
    pub(crate) batch_size: usize,
}

impl Default for ReadSpeedOptions {
    fn default() -> Self {
        ReadSpeedOptions {
            tasks_per_worker_hint: DEFAULT_TASKS_PER_WORKER_HINT,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl ReadSpeedOptions {
    /// Target number of tasks each worker should receive in parallel runs.
    pub fn tasks_per_worker_hint(self, tasks_per_worker_hint: usize) -> Self {
        ReadSpeedOptions {
            tasks_per_worker_hint,
            ..self
        }
    }

    /// Records decoded per batch by the Parquet backend.
    pub fn batch_size(self, batch_size: usize) -> Self {
        ReadSpeedOptions {
            batch_size: batch_size.max(1),
            ..self
        }
    }

    /// Configured tasks-per-worker hint.
    pub fn get_tasks_per_worker_hint(&self) -> usize {
        self.tasks_per_worker_hint
    }

    /// Configured decode batch size.
    pub fn get_batch_size(&self) -> usize {
        self.batch_size
    }
}
