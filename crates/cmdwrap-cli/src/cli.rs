// Command-line arguments

use std::path::PathBuf;

use clap::Parser;

/// Run a program, stream its output, and stop it on timeout or Ctrl-C
#[derive(Debug, Parser)]
#[command(name = "cmdwrap", version, about)]
pub struct Cli {
    /// Kill the program after this many seconds (fractions allowed)
    #[arg(short, long, value_name = "SECS")]
    pub timeout: Option<f64>,

    /// Working directory for the program
    #[arg(short = 'C', long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Pass arguments as one raw string instead of a list
    #[arg(long, value_name = "STRING", allow_hyphen_values = true)]
    pub raw_args: Option<String>,

    /// Extra environment variable for the program (repeatable)
    #[arg(short, long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// Config file (default: <config dir>/cmdwrap/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Tag each line with [out] or [err]
    #[arg(long)]
    pub prefix: bool,

    /// Program followed by its arguments
    #[arg(
        value_name = "PROGRAM [ARGS]...",
        required = true,
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

impl Cli {
    /// Program to launch
    pub fn program(&self) -> &str {
        self.command.first().map(String::as_str).unwrap_or_default()
    }

    /// Arguments after the program name
    pub fn program_args(&self) -> &[String] {
        self.command.get(1..).unwrap_or_default()
    }
}

fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    if key.is_empty() {
        return Err(format!("empty variable name in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}
