//! Logging infrastructure for readspeed.
//!
//! All events go through `tracing` with target "readspeed" and carry an
//! `event` field for filtering.
//!
//! ## Library Integration
//!
//! The library never initializes a global subscriber. The `readspeed` binary
//! installs a `tracing_subscriber` formatter; embedding applications bring
//! their own.
//!
//! ## Conventions
//!
//! - `event`: snake_case event name (required)
//! - `component`: subsystem (`partition`, `scheduler`, `engine`)
//! - Use `%` for Display, `?` for Debug formatting

/// Target for all readspeed log events.
pub(crate) const READSPEED_TARGET: &str = "readspeed";

/// Macro for info-level log events.
///
/// # Example
/// ```ignore
/// log_info!(
///     component = "engine",
///     event = "run_finished",
///     workers = report.worker_count,
/// );
/// ```
macro_rules! log_info {
    ($($field:tt)*) => {
        ::tracing::info!(target: $crate::observability::READSPEED_TARGET, $($field)*)
    };
}

/// Macro for debug-level log events.
macro_rules! log_debug {
    ($($field:tt)*) => {
        ::tracing::debug!(target: $crate::observability::READSPEED_TARGET, $($field)*)
    };
}

/// Macro for warn-level log events.
macro_rules! log_warn {
    ($($field:tt)*) => {
        ::tracing::warn!(target: $crate::observability::READSPEED_TARGET, $($field)*)
    };
}

pub(crate) use log_debug;
pub(crate) use log_info;
pub(crate) use log_warn;
