//! Invocation descriptor and runner options

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::args::Arguments;
use crate::error::{Result, RunError};

/// How long pumps may keep draining buffered output after a natural exit
pub const DEFAULT_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// How long to wait for a killed child to be reaped
pub const DEFAULT_REAP_GRACE: Duration = Duration::from_secs(5);

/// Longest line delivered to a sink; the rest of a longer line is dropped
pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024;

/// Everything needed to launch one child process.
///
/// A descriptor is never mutated by a run and can be run any number of times.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Executable path or name looked up on `PATH`
    pub program: String,
    /// Arguments, passed without shell interpretation
    pub arguments: Arguments,
    /// Working directory (None = current dir)
    pub working_dir: Option<PathBuf>,
    /// Environment variables (added to parent env)
    pub env: HashMap<String, String>,
    /// Wall-clock limit for the run (None = no limit)
    pub timeout: Option<Duration>,
}

impl Invocation {
    /// Create a descriptor with no arguments and no timeout
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            arguments: Arguments::none(),
            working_dir: None,
            env: HashMap::new(),
            timeout: None,
        }
    }

    /// Set the arguments from a list or a raw string
    pub fn arguments(mut self, arguments: impl Into<Arguments>) -> Self {
        self.arguments = arguments.into();
        self
    }

    /// Set argument list
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments = Arguments::List(args.into_iter().map(Into::into).collect());
        self
    }

    /// Set working directory
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Add environment variable
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set timeout duration
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Set timeout in milliseconds
    pub fn timeout_ms(mut self, millis: u64) -> Self {
        self.timeout = Some(Duration::from_millis(millis));
        self
    }

    /// Check the descriptor can be handed to the OS
    pub fn validate(&self) -> Result<()> {
        if self.program.trim().is_empty() {
            return Err(RunError::InvalidConfig("executable must not be empty".into()));
        }
        if self.program.contains('\0') {
            return Err(RunError::InvalidConfig(
                "executable must not contain NUL bytes".into(),
            ));
        }
        Ok(())
    }
}

/// Tunables for the cleanup phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerOptions {
    /// Bound on draining output after natural exit. Pipes held open by
    /// grandchildren are cut off after this.
    pub drain_grace: Duration,
    /// Bound on reaping a killed child
    pub reap_grace: Duration,
    /// Bytes kept per output line
    pub max_line_bytes: usize,
}

impl RunnerOptions {
    pub fn new() -> Self {
        Self {
            drain_grace: DEFAULT_DRAIN_GRACE,
            reap_grace: DEFAULT_REAP_GRACE,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }

    /// Set drain grace period
    pub fn drain_grace(mut self, grace: Duration) -> Self {
        self.drain_grace = grace;
        self
    }

    /// Set reap grace period
    pub fn reap_grace(mut self, grace: Duration) -> Self {
        self.reap_grace = grace;
        self
    }

    /// Set the per-line byte limit (at least 1)
    pub fn max_line_bytes(mut self, bytes: usize) -> Self {
        self.max_line_bytes = bytes.max(1);
        self
    }
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self::new()
    }
}
