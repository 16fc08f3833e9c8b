//! Terminal outcome of a run

use std::fmt;
use std::process::ExitStatus;
use std::time::Duration;

/// How a run ended. Exactly one is produced per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The child exited on its own with this code
    Exited(i32),
    /// The timeout elapsed first and the child was killed
    TimedOut,
    /// The cancellation handle fired first and the child was killed
    Cancelled,
}

impl Outcome {
    /// Exit code, if the child exited on its own
    pub fn code(&self) -> Option<i32> {
        match self {
            Outcome::Exited(code) => Some(*code),
            _ => None,
        }
    }

    /// Exited with code 0
    pub fn success(&self) -> bool {
        matches!(self, Outcome::Exited(0))
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Outcome::TimedOut)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Exited(code) => write!(f, "exited with code {}", code),
            Outcome::TimedOut => write!(f, "timed out"),
            Outcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Outcome plus bookkeeping about the run that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: Outcome,
    /// PID of the child (0 when nothing was launched)
    pub pid: u32,
    /// Wall time from launch to cleanup completion
    pub elapsed: Duration,
    /// Lines delivered to the stdout sink
    pub stdout_lines: usize,
    /// Lines delivered to the stderr sink
    pub stderr_lines: usize,
}

/// Map an exit status to a single code.
///
/// A child terminated by a signal reports `128 + signal`, as shells do.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    -1
}

/// Human readable name of the signal that terminated a child, if any
#[cfg(unix)]
pub(crate) fn termination_signal(status: ExitStatus) -> Option<String> {
    use nix::sys::signal::Signal;
    use std::os::unix::process::ExitStatusExt;

    let raw = status.signal()?;
    Some(
        Signal::try_from(raw)
            .map(|s| s.as_str().to_string())
            .unwrap_or_else(|_| raw.to_string()),
    )
}

#[cfg(not(unix))]
pub(crate) fn termination_signal(_status: ExitStatus) -> Option<String> {
    None
}
