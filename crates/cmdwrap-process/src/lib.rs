//! # cmdwrap-process
//!
//! **Purpose**: Run one external program and report exactly one outcome
//!
//! Launches an executable, streams its stdout and stderr lines to caller
//! supplied sinks as they arrive, and races natural exit against a wall-clock
//! timeout and a caller-owned cancellation handle.
//!
//! ## Features
//!
//! - **Line Streaming**: Per-stream ordered delivery to closures, channels or buffers
//! - **Timeout**: Child is killed and the run reports `TimedOut`
//! - **Cancellation**: Idempotent `CancelHandle`; the run reports `Cancelled`
//! - **Cleanup**: Child reaped and readers joined on every path, kill-on-drop as backstop
//! - **No Shell**: Arguments are passed as given, never re-parsed by a shell
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cmdwrap_process::{CancelHandle, Invocation, LineBuffer, OutputSinks, Outcome, ProcessRunner};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cancel = CancelHandle::new();
//! let runner = ProcessRunner::new(
//!     Invocation::new("cargo").args(["build"]).timeout_ms(60_000),
//! )
//! .with_cancel(cancel.clone());
//!
//! let errors = LineBuffer::new();
//! let sinks = OutputSinks::none()
//!     .stdout(|line: &str| println!("{line}"))
//!     .stderr(errors.clone());
//!
//! match runner.run(sinks).await? {
//!     Outcome::Exited(code) => println!("exit code {code}"),
//!     Outcome::TimedOut => println!("took too long"),
//!     Outcome::Cancelled => println!("cancelled"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod args;
pub mod cancel;
pub mod config;
pub mod error;
pub mod outcome;
pub mod runner;
pub mod sink;

mod child;
mod launch;
mod pump;

pub use args::Arguments;
pub use cancel::CancelHandle;
pub use config::{Invocation, RunnerOptions};
pub use error::{Result, RunError};
pub use outcome::{exit_code, Outcome, RunReport};
pub use runner::{run, ProcessRunner};
pub use sink::{ChannelSink, LineBuffer, LineSink, OutputSinks};
