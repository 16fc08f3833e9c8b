// Run one program on behalf of the command line

use std::io::Write;

use cmdwrap_process::{CancelHandle, Outcome, OutputSinks, ProcessRunner};
use tracing::debug;

use crate::cli::Cli;
use crate::config::{FileConfig, Settings};
use crate::error::CliResult;
use crate::logging::init_logging;

/// Exit status after a timeout, as GNU `timeout` reports it
pub const EXIT_TIMED_OUT: i32 = 124;

/// Exit status after Ctrl-C, as shells report SIGINT
pub const EXIT_CANCELLED: i32 = 130;

/// Load config, set up logging and run the program. Returns the exit status
/// `cmdwrap` should exit with.
pub async fn run_cli(cli: Cli) -> CliResult<i32> {
    let file = FileConfig::load(cli.config.as_deref())?;
    let settings = Settings::resolve(&cli, &file)?;
    init_logging(settings.log_level);

    let cancel = CancelHandle::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("Ctrl-C received, cancelling");
                cancel.cancel();
            }
        })
    };

    let outcome = execute(settings, cancel).await;
    ctrl_c.abort();

    Ok(exit_status(outcome?))
}

/// Run with the given settings, streaming lines to this process's stdout
/// and stderr
pub async fn execute(settings: Settings, cancel: CancelHandle) -> CliResult<Outcome> {
    let runner = ProcessRunner::new(settings.invocation)
        .with_options(settings.options)
        .with_cancel(cancel);

    let outcome = runner.run(terminal_sinks(settings.prefix)).await?;
    Ok(outcome)
}

/// Map an outcome to the status `cmdwrap` exits with
pub fn exit_status(outcome: Outcome) -> i32 {
    match outcome {
        Outcome::Exited(code) => code,
        Outcome::TimedOut => EXIT_TIMED_OUT,
        Outcome::Cancelled => EXIT_CANCELLED,
    }
}

fn terminal_sinks(prefix: bool) -> OutputSinks {
    OutputSinks::none()
        .stdout(move |line: &str| {
            let mut out = std::io::stdout().lock();
            let _ = if prefix {
                writeln!(out, "[out] {}", line)
            } else {
                writeln!(out, "{}", line)
            };
        })
        .stderr(move |line: &str| {
            let mut err = std::io::stderr().lock();
            let _ = if prefix {
                writeln!(err, "[err] {}", line)
            } else {
                writeln!(err, "{}", line)
            };
        })
}
