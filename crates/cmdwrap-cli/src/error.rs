// CLI error types

use cmdwrap_process::RunError;
use thiserror::Error;

/// Exit status when the program could not be launched, as shells use
pub const EXIT_LAUNCH_FAILURE: i32 = 127;

/// Exit status for usage and configuration errors
pub const EXIT_USAGE: i32 = 2;

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Run(#[from] RunError),
}

impl CliError {
    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            CliError::InvalidArgument { message } => {
                format!("Invalid argument: {}\n\nRun 'cmdwrap --help' for usage information.", message)
            }
            CliError::Config(msg) => {
                format!("Configuration error: {}\n\nCheck the file passed with --config.", msg)
            }
            CliError::Run(e) if e.is_launch_failure() => {
                format!("{}\n\nCheck that the program exists and is executable.", e)
            }
            CliError::Run(e) => e.to_string(),
        }
    }

    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgument { .. } | CliError::Config(_) => EXIT_USAGE,
            CliError::Run(e) if e.is_launch_failure() => EXIT_LAUNCH_FAILURE,
            CliError::Run(_) => 1,
        }
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
