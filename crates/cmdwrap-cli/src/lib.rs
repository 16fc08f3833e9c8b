// cmdwrap command-line front end

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;

pub use app::{execute, exit_status, run_cli};
pub use cli::Cli;
pub use error::{CliError, CliResult};
