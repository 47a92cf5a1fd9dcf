//! Wall-clock and process CPU time measurement.

use std::time::{Duration, Instant};

/// Accumulating stopwatch over wall-clock and process CPU time.
///
/// Successive `start`/`stop` pairs add up; CPU time covers every thread of
/// the process, so parallel phases report more CPU than wall time.
#[derive(Debug, Default)]
pub struct Stopwatch {
    wall: Duration,
    cpu: Duration,
    running: Option<(Instant, Duration)>,
}

impl Stopwatch {
    /// A stopped stopwatch at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// A stopwatch that is already running.
    pub fn started() -> Self {
        let mut watch = Self::new();
        watch.start();
        watch
    }

    /// Resume measuring. No effect when already running.
    pub fn start(&mut self) {
        if self.running.is_none() {
            self.running = Some((Instant::now(), process_cpu_time()));
        }
    }

    /// Pause measuring, folding the elapsed interval into the totals.
    pub fn stop(&mut self) {
        if let Some((wall_start, cpu_start)) = self.running.take() {
            self.wall += wall_start.elapsed();
            self.cpu += process_cpu_time().saturating_sub(cpu_start);
        }
    }

    /// Accumulated wall-clock time of stopped intervals.
    pub fn wall_time(&self) -> Duration {
        self.wall
    }

    /// Accumulated process CPU time of stopped intervals.
    pub fn cpu_time(&self) -> Duration {
        self.cpu
    }
}

/// User plus system CPU time consumed by this process so far.
#[cfg(unix)]
pub fn process_cpu_time() -> Duration {
    fn to_duration(tv: libc::timeval) -> Duration {
        Duration::from_secs(tv.tv_sec.max(0) as u64)
            + Duration::from_micros(tv.tv_usec.max(0) as u64)
    }

    // SAFETY: getrusage only writes into the zeroed struct we hand it.
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut usage) };
    if rc != 0 {
        return Duration::ZERO;
    }
    to_duration(usage.ru_utime) + to_duration(usage.ru_stime)
}

/// CPU time is not tracked on this platform.
#[cfg(not(unix))]
pub fn process_cpu_time() -> Duration {
    Duration::ZERO
}
