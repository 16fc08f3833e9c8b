//! Managed child process wrapper

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::{Child, ChildStderr, ChildStdout};
use tracing::{debug, warn};

/// Wrapper around tokio::process::Child owned by a single run.
///
/// Spawned with kill-on-drop, so dropping it never leaves the child running.
/// At most one kill is ever sent.
pub struct ManagedChild {
    child: Child,
    program: String,
    pid: u32,
    kill_sent: bool,
    status: Option<ExitStatus>,
}

impl ManagedChild {
    pub(crate) fn new(child: Child, program: String) -> Self {
        let pid = child.id().unwrap_or(0);
        Self {
            child,
            program,
            pid,
            kill_sent: false,
            status: None,
        }
    }

    /// Get process ID
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Check if process is still running
    pub fn is_running(&mut self) -> bool {
        if self.status.is_some() {
            return false;
        }
        match self.child.try_wait() {
            Ok(Some(status)) => {
                self.status = Some(status);
                false
            }
            Ok(None) => true,
            Err(_) => false,
        }
    }

    /// Wait for process to exit. Cancel safe.
    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        if let Some(status) = self.status {
            return Ok(status);
        }
        let status = self.child.wait().await?;
        self.status = Some(status);
        Ok(status)
    }

    /// Send a non-graceful kill.
    ///
    /// A child that already exited or vanished is not an error; such
    /// failures are logged and dropped.
    pub fn kill(&mut self) {
        if self.kill_sent || self.status.is_some() {
            return;
        }
        self.kill_sent = true;

        match self.child.start_kill() {
            Ok(()) => debug!(pid = %self.pid, "Sent kill to process"),
            Err(e) => debug!(pid = %self.pid, error = %e, "Kill ignored, process already gone"),
        }
    }

    /// Kill the child and wait for it to be reaped.
    ///
    /// Returns the final status, or `None` when the child could not be
    /// reaped within `grace`.
    pub async fn kill_and_reap(&mut self, grace: Duration) -> Option<ExitStatus> {
        if !self.is_running() {
            return self.status;
        }
        self.kill();

        match tokio::time::timeout(grace, self.wait()).await {
            Ok(Ok(status)) => {
                debug!(pid = %self.pid, status = %status, "Process reaped");
                Some(status)
            }
            Ok(Err(e)) => {
                debug!(pid = %self.pid, error = %e, "Error reaping process, treating as gone");
                None
            }
            Err(_) => {
                warn!(pid = %self.pid, grace_ms = grace.as_millis() as u64, "Timeout waiting for killed process to exit");
                None
            }
        }
    }

    /// Take stdout handle
    pub fn stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Take stderr handle
    pub fn stderr(&mut self) -> Option<ChildStderr> {
        self.child.stderr.take()
    }
}

impl std::fmt::Debug for ManagedChild {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedChild")
            .field("program", &self.program)
            .field("pid", &self.pid)
            .field("kill_sent", &self.kill_sent)
            .field("status", &self.status)
            .finish()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::Invocation;
    use crate::launch::launch;

    #[tokio::test]
    async fn test_is_running() {
        let config = Invocation::new("sleep").args(["1"]);

        let mut child = launch(&config, false, false).unwrap();
        assert!(child.is_running());

        child.wait().await.unwrap();
        assert!(!child.is_running());
    }

    #[tokio::test]
    async fn test_kill_and_reap() {
        let config = Invocation::new("sleep").args(["10"]);

        let mut child = launch(&config, false, false).unwrap();
        assert!(child.is_running());

        let status = child.kill_and_reap(Duration::from_secs(5)).await;
        assert!(status.is_some());
        assert!(!child.is_running());
    }

    #[tokio::test]
    async fn test_kill_after_exit_is_benign() {
        let config = Invocation::new("true");

        let mut child = launch(&config, false, false).unwrap();
        let status = child.wait().await.unwrap();
        assert!(status.success());

        child.kill();
        child.kill();
        let again = child.kill_and_reap(Duration::from_millis(100)).await;
        assert_eq!(again, Some(status));
    }
}
