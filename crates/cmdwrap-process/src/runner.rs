//! Process runner - one child, three-way race, exactly one outcome

use std::io;
use std::process::ExitStatus;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    cancel::CancelHandle,
    child::ManagedChild,
    config::{Invocation, RunnerOptions},
    error::{Result, RunError},
    launch::launch,
    outcome::{exit_code, termination_signal, Outcome, RunReport},
    pump::{spawn_pump, Stream},
    sink::OutputSinks,
};

/// Whichever wait finished first
enum Race {
    Exited(io::Result<ExitStatus>),
    Cancelled,
    TimedOut,
}

/// Runs an [`Invocation`] to a single [`Outcome`].
///
/// The runner is reusable: every call to [`run`](Self::run) launches a new
/// child. The optional [`CancelHandle`] belongs to the caller; the runner
/// only observes it. [`cancel`](Self::cancel) reaches the runs in flight at
/// the time of the call and nothing after them. Clones share that scope.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    invocation: Invocation,
    options: RunnerOptions,
    cancel: Option<CancelHandle>,
    in_flight: Arc<Mutex<CancellationToken>>,
}

impl ProcessRunner {
    pub fn new(invocation: Invocation) -> Self {
        Self {
            invocation,
            options: RunnerOptions::default(),
            cancel: None,
            in_flight: Arc::default(),
        }
    }

    /// Override drain and reap grace periods
    pub fn with_options(mut self, options: RunnerOptions) -> Self {
        self.options = options;
        self
    }

    /// Observe `handle` during runs
    pub fn with_cancel(mut self, handle: CancelHandle) -> Self {
        self.cancel = Some(handle);
        self
    }

    /// Swap the observed handle, e.g. for a fresh one after a cancellation
    pub fn replace_cancel(&mut self, handle: Option<CancelHandle>) -> Option<CancelHandle> {
        std::mem::replace(&mut self.cancel, handle)
    }

    /// Cancel the runs currently in flight. Idempotent, and a no-op when
    /// nothing is running: later runs are unaffected.
    pub fn cancel(&self) {
        let mut scope = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *scope).cancel();
    }

    /// Token for one run, cancelled by the next [`cancel`](Self::cancel)
    fn enter_run(&self) -> CancellationToken {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .child_token()
    }

    /// Run the child to completion, timeout, or cancellation
    ///
    /// # Examples
    /// ```no_run
    /// use cmdwrap_process::{Invocation, OutputSinks, ProcessRunner};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let runner = ProcessRunner::new(Invocation::new("ls").args(["-l"]).timeout_ms(500));
    /// let outcome = runner
    ///     .run(OutputSinks::none().stdout(|line: &str| println!("{line}")))
    ///     .await?;
    /// println!("{outcome}");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn run(&self, sinks: OutputSinks) -> Result<Outcome> {
        self.run_with_report(sinks).await.map(|report| report.outcome)
    }

    /// Like [`run`](Self::run), with pid, timing and line counts
    pub async fn run_with_report(&self, sinks: OutputSinks) -> Result<RunReport> {
        let started = Instant::now();
        let run_token = self.enter_run();

        if self.cancel.as_ref().is_some_and(CancelHandle::is_cancelled) {
            info!(program = %self.invocation.program, "Cancelled before launch");
            return Ok(RunReport {
                outcome: Outcome::Cancelled,
                pid: 0,
                elapsed: started.elapsed(),
                stdout_lines: 0,
                stderr_lines: 0,
            });
        }

        let OutputSinks { stdout, stderr } = sinks;
        let mut child = launch(&self.invocation, stdout.is_some(), stderr.is_some())?;
        let pid = child.pid();

        let stop = CancellationToken::new();
        let _stop_on_drop = stop.clone().drop_guard();
        let max_line = self.options.max_line_bytes;

        let stdout_pump = match (stdout, child.stdout()) {
            (Some(sink), Some(pipe)) => Some(spawn_pump(
                Stream::Stdout,
                pipe,
                sink,
                max_line,
                stop.clone(),
            )),
            _ => None,
        };
        let stderr_pump = match (stderr, child.stderr()) {
            (Some(sink), Some(pipe)) => Some(spawn_pump(
                Stream::Stderr,
                pipe,
                sink,
                max_line,
                stop.clone(),
            )),
            _ => None,
        };

        // Out-of-range timeouts behave as unbounded
        let deadline = self
            .invocation
            .timeout
            .and_then(|timeout| Instant::now().checked_add(timeout));
        let outcome = match self.race(&mut child, &run_token, deadline).await {
            Race::Exited(Ok(status)) => {
                if let Some(signal) = termination_signal(status) {
                    debug!(pid = %pid, signal = %signal, "Process terminated by signal");
                }
                Outcome::Exited(exit_code(status))
            }
            Race::Exited(Err(source)) => {
                warn!(pid = %pid, error = %source, "Waiting on process failed, killing it");
                self.terminate(&mut child, &stop).await;
                self.join_pumps(stdout_pump, stderr_pump, &stop, deadline).await;
                return Err(RunError::Wait { pid, source });
            }
            Race::TimedOut => {
                warn!(pid = %pid, timeout_ms = ?self.invocation.timeout.map(|t| t.as_millis()), "Process timed out, killing it");
                self.terminate(&mut child, &stop).await;
                Outcome::TimedOut
            }
            Race::Cancelled => {
                info!(pid = %pid, "Run cancelled, killing process");
                self.terminate(&mut child, &stop).await;
                Outcome::Cancelled
            }
        };

        let (stdout_lines, stderr_lines) =
            self.join_pumps(stdout_pump, stderr_pump, &stop, deadline).await;

        let report = RunReport {
            outcome,
            pid,
            elapsed: started.elapsed(),
            stdout_lines,
            stderr_lines,
        };
        info!(
            pid = %pid,
            program = %self.invocation.program,
            outcome = %report.outcome,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Process run finished"
        );

        Ok(report)
    }

    /// Await exit, cancellation and the deadline; the first one wins.
    ///
    /// Biased so an exit that is already observable beats a cancellation or
    /// deadline firing in the same poll.
    async fn race(
        &self,
        child: &mut ManagedChild,
        run_token: &CancellationToken,
        deadline: Option<Instant>,
    ) -> Race {
        let cancelled = async {
            match &self.cancel {
                Some(handle) => {
                    tokio::select! {
                        _ = handle.cancelled() => {}
                        _ = run_token.cancelled() => {}
                    }
                }
                None => run_token.cancelled().await,
            }
        };
        let expired = async {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            status = child.wait() => Race::Exited(status),
            _ = cancelled => Race::Cancelled,
            _ = expired => Race::TimedOut,
        }
    }

    /// Stop delivery first, then kill and reap
    async fn terminate(&self, child: &mut ManagedChild, stop: &CancellationToken) {
        stop.cancel();
        child.kill_and_reap(self.options.reap_grace).await;
    }

    /// Wait for both pumps. Pumps still reading after the drain grace
    /// (pipes inherited by grandchildren) are stopped. The grace never
    /// extends past the run's deadline.
    async fn join_pumps(
        &self,
        stdout: Option<JoinHandle<usize>>,
        stderr: Option<JoinHandle<usize>>,
        stop: &CancellationToken,
        deadline: Option<Instant>,
    ) -> (usize, usize) {
        let grace = match deadline {
            Some(deadline) => self
                .options
                .drain_grace
                .min(deadline.saturating_duration_since(Instant::now())),
            None => self.options.drain_grace,
        };
        let counts = tokio::join!(
            join_pump(Stream::Stdout, stdout, stop, grace),
            join_pump(Stream::Stderr, stderr, stop, grace),
        );
        stop.cancel();
        counts
    }
}

async fn join_pump(
    stream: Stream,
    handle: Option<JoinHandle<usize>>,
    stop: &CancellationToken,
    grace: Duration,
) -> usize {
    let Some(mut handle) = handle else {
        return 0;
    };

    let joined = match tokio::time::timeout(grace, &mut handle).await {
        Ok(joined) => joined,
        Err(_) => {
            debug!(stream = ?stream, "Output still open after drain grace, stopping pump");
            stop.cancel();
            (&mut handle).await
        }
    };

    match joined {
        Ok(delivered) => delivered,
        Err(e) => {
            warn!(stream = ?stream, error = %e, "Output pump failed");
            0
        }
    }
}

/// Run `executable` once with the given arguments and timeout.
///
/// Convenience wrapper around [`ProcessRunner`] for one-off calls.
pub async fn run(
    executable: impl Into<String>,
    arguments: impl Into<crate::Arguments>,
    timeout: Duration,
    sinks: OutputSinks,
    cancel: Option<&CancelHandle>,
) -> Result<Outcome> {
    let invocation = Invocation::new(executable)
        .arguments(arguments)
        .timeout(timeout);
    let mut runner = ProcessRunner::new(invocation);
    runner.replace_cancel(cancel.cloned());
    runner.run(sinks).await
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::sink::LineBuffer;

    fn sh(script: &str) -> Invocation {
        Invocation::new("sh").args(["-c", script])
    }

    #[tokio::test]
    async fn test_exit_code_reported() {
        let runner = ProcessRunner::new(sh("exit 3").timeout_ms(5_000));
        let outcome = runner.run(OutputSinks::none()).await.unwrap();
        assert_eq!(outcome, Outcome::Exited(3));
    }

    #[tokio::test]
    async fn test_lines_delivered_before_return() {
        let out = LineBuffer::new();
        let err = LineBuffer::new();
        let runner = ProcessRunner::new(sh("echo one; echo two; echo oops >&2").timeout_ms(5_000));

        let report = runner
            .run_with_report(OutputSinks::none().stdout(out.clone()).stderr(err.clone()))
            .await
            .unwrap();

        assert_eq!(report.outcome, Outcome::Exited(0));
        assert_eq!(out.lines(), vec!["one", "two"]);
        assert_eq!(err.lines(), vec!["oops"]);
        assert_eq!(report.stdout_lines, 2);
        assert_eq!(report.stderr_lines, 1);
    }

    #[tokio::test]
    async fn test_timeout_kills_child() {
        let runner = ProcessRunner::new(Invocation::new("sleep").args(["10"]).timeout_ms(200));
        let started = Instant::now();

        let outcome = runner.run(OutputSinks::none()).await.unwrap();

        assert_eq!(outcome, Outcome::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_cancel_kills_child() {
        let handle = CancelHandle::new();
        let runner = ProcessRunner::new(Invocation::new("sleep").args(["10"]).timeout_ms(10_000))
            .with_cancel(handle.clone());

        let remote = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            remote.cancel();
        });

        let outcome = runner.run(OutputSinks::none()).await.unwrap();
        assert_eq!(outcome, Outcome::Cancelled);
    }

    #[tokio::test]
    async fn test_already_cancelled_does_not_launch() {
        let handle = CancelHandle::new();
        handle.cancel();
        let runner = ProcessRunner::new(Invocation::new("true")).with_cancel(handle);

        let report = runner.run_with_report(OutputSinks::none()).await.unwrap();
        assert_eq!(report.outcome, Outcome::Cancelled);
        assert_eq!(report.pid, 0);
    }

    #[tokio::test]
    async fn test_runner_is_reusable() {
        let runner = ProcessRunner::new(sh("echo again").timeout_ms(5_000));
        for _ in 0..3 {
            let out = LineBuffer::new();
            let outcome = runner.run(OutputSinks::none().stdout(out.clone())).await.unwrap();
            assert_eq!(outcome, Outcome::Exited(0));
            assert_eq!(out.lines(), vec!["again"]);
        }
    }

    #[tokio::test]
    async fn test_replace_cancel_after_cancellation() {
        let first = CancelHandle::new();
        let mut runner = ProcessRunner::new(Invocation::new("true")).with_cancel(first.clone());
        first.cancel();
        assert_eq!(runner.run(OutputSinks::none()).await.unwrap(), Outcome::Cancelled);

        let previous = runner.replace_cancel(Some(CancelHandle::new()));
        assert!(previous.is_some_and(|handle| handle.is_cancelled()));
        assert_eq!(runner.run(OutputSinks::none()).await.unwrap(), Outcome::Exited(0));
    }

    #[tokio::test]
    async fn test_runner_cancel_stops_in_flight_run() {
        let runner = ProcessRunner::new(Invocation::new("sleep").args(["10"]).timeout_ms(10_000));
        let remote = runner.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            remote.cancel();
        });

        let outcome = runner.run(OutputSinks::none()).await.unwrap();
        assert_eq!(outcome, Outcome::Cancelled);
    }

    #[tokio::test]
    async fn test_runner_cancel_between_runs_is_noop() {
        let runner = ProcessRunner::new(Invocation::new("true").timeout_ms(5_000))
            .with_cancel(CancelHandle::new());

        assert_eq!(runner.run(OutputSinks::none()).await.unwrap(), Outcome::Exited(0));
        runner.cancel();
        runner.cancel();
        assert_eq!(runner.run(OutputSinks::none()).await.unwrap(), Outcome::Exited(0));
    }

    #[tokio::test]
    async fn test_drain_grace_cuts_off_inherited_pipe() {
        // The background sleep keeps stdout open after sh exits
        let out = LineBuffer::new();
        let runner = ProcessRunner::new(sh("echo early; sleep 10 & exit 0").timeout_ms(5_000))
            .with_options(RunnerOptions::new().drain_grace(Duration::from_millis(200)));
        let started = Instant::now();

        let outcome = runner.run(OutputSinks::none().stdout(out.clone())).await.unwrap();

        assert_eq!(outcome, Outcome::Exited(0));
        assert_eq!(out.lines(), vec!["early"]);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_drain_grace_bounded_by_timeout() {
        let out = LineBuffer::new();
        let timeout = Duration::from_millis(300);
        let runner = ProcessRunner::new(sh("echo x; sleep 10 & exit 0").timeout(timeout));
        let started = Instant::now();

        let outcome = runner.run(OutputSinks::none().stdout(out.clone())).await.unwrap();

        assert_eq!(outcome, Outcome::Exited(0));
        assert_eq!(out.lines(), vec!["x"]);
        assert!(started.elapsed() < timeout + Duration::from_millis(1_000));
    }

    #[tokio::test]
    async fn test_free_function_run() {
        let out = LineBuffer::new();
        let outcome = run(
            "printf",
            ["%s\\n", "a", "b"],
            Duration::from_secs(5),
            OutputSinks::none().stdout(out.clone()),
            None,
        )
        .await
        .unwrap();

        assert_eq!(outcome, Outcome::Exited(0));
        assert_eq!(out.lines(), vec!["a", "b"]);
    }
}
