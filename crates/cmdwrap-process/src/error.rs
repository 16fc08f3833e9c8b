//! Error types for process runs

use std::io;
use thiserror::Error;

/// Errors that stop a run from producing an [`Outcome`](crate::Outcome).
///
/// Timeouts and cancellations are not errors; they are reported as outcomes.
#[derive(Debug, Error)]
pub enum RunError {
    /// The child could not be started
    #[error("Failed to launch '{program}': {source}")]
    LaunchFailed {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Invalid invocation descriptor
    #[error("Invalid invocation: {0}")]
    InvalidConfig(String),

    /// Waiting on a running child failed at the OS level
    #[error("Failed to wait for process (PID: {pid}): {source}")]
    Wait {
        pid: u32,
        #[source]
        source: io::Error,
    },
}

impl RunError {
    /// Whether the error happened before any child process existed
    pub fn is_launch_failure(&self) -> bool {
        matches!(self, RunError::LaunchFailed { .. } | RunError::InvalidConfig(_))
    }
}

/// Result type for process runs
pub type Result<T> = std::result::Result<T, RunError>;
