// Config file loading and settings resolution

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use cmdwrap_process::{Arguments, Invocation, RunnerOptions};
use serde::Deserialize;
use tracing::Level;

use crate::cli::Cli;
use crate::error::{CliError, CliResult};
use crate::logging::parse_level;

/// Log level when neither flags nor the config file choose one
const DEFAULT_LOG_LEVEL: Level = Level::WARN;

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub timeout_secs: Option<f64>,
    pub drain_grace_ms: Option<u64>,
    pub reap_grace_ms: Option<u64>,
    pub max_line_bytes: Option<usize>,
    pub log_level: Option<String>,
    pub env: HashMap<String, String>,
}

impl FileConfig {
    /// Default location: `<config dir>/cmdwrap/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("cmdwrap").join("config.toml"))
    }

    pub fn from_toml_str(content: &str) -> CliResult<Self> {
        toml::from_str(content).map_err(|e| CliError::Config(e.to_string()))
    }

    /// Load the explicit file, or the default one if it exists.
    ///
    /// A missing explicit file is an error; a missing default file is not.
    pub fn load(explicit: Option<&Path>) -> CliResult<Self> {
        match explicit {
            Some(path) => Self::read(path),
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::read(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn read(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| CliError::Config(format!("{}: {}", path.display(), e)))
    }
}

/// Everything a run needs, after merging flags over the config file
#[derive(Debug, Clone)]
pub struct Settings {
    pub invocation: Invocation,
    pub options: RunnerOptions,
    pub log_level: Level,
    pub prefix: bool,
}

impl Settings {
    /// Merge command-line flags over file values
    pub fn resolve(cli: &Cli, file: &FileConfig) -> CliResult<Self> {
        let arguments = match &cli.raw_args {
            Some(raw) if !cli.program_args().is_empty() => {
                return Err(CliError::InvalidArgument {
                    message: format!(
                        "--raw-args cannot be combined with trailing arguments ('{}')",
                        raw
                    ),
                })
            }
            Some(raw) => Arguments::Raw(raw.clone()),
            None => Arguments::List(cli.program_args().to_vec()),
        };

        let mut invocation = Invocation::new(cli.program()).arguments(arguments);

        if let Some(secs) = cli.timeout.or(file.timeout_secs) {
            invocation = invocation.timeout(parse_timeout(secs)?);
        }
        if let Some(dir) = &cli.cwd {
            invocation = invocation.working_dir(dir);
        }
        for (key, value) in &file.env {
            invocation = invocation.env(key, value);
        }
        for (key, value) in &cli.env {
            invocation = invocation.env(key, value);
        }
        invocation.validate()?;

        let mut options = RunnerOptions::new();
        if let Some(ms) = file.drain_grace_ms {
            options = options.drain_grace(Duration::from_millis(ms));
        }
        if let Some(ms) = file.reap_grace_ms {
            options = options.reap_grace(Duration::from_millis(ms));
        }
        if let Some(bytes) = file.max_line_bytes {
            options = options.max_line_bytes(bytes);
        }

        Ok(Self {
            invocation,
            options,
            log_level: resolve_log_level(cli, file)?,
            prefix: cli.prefix,
        })
    }
}

fn resolve_log_level(cli: &Cli, file: &FileConfig) -> CliResult<Level> {
    if cli.quiet {
        return Ok(Level::ERROR);
    }
    if cli.verbose {
        return Ok(Level::DEBUG);
    }
    match cli.log_level.as_deref().or(file.log_level.as_deref()) {
        Some(name) => parse_level(name).ok_or_else(|| CliError::InvalidArgument {
            message: format!("unknown log level '{}'", name),
        }),
        None => Ok(DEFAULT_LOG_LEVEL),
    }
}

fn parse_timeout(secs: f64) -> CliResult<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|_| CliError::InvalidArgument {
        message: format!("timeout must be a non-negative number of seconds, got {}", secs),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        let mut full = vec!["cmdwrap"];
        full.extend_from_slice(args);
        Cli::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_parse_full_file() {
        let file = FileConfig::from_toml_str(
            r#"
            timeout_secs = 2.5
            drain_grace_ms = 100
            reap_grace_ms = 300
            log_level = "info"

            [env]
            LANG = "C"
            "#,
        )
        .unwrap();

        assert_eq!(file.timeout_secs, Some(2.5));
        assert_eq!(file.drain_grace_ms, Some(100));
        assert_eq!(file.reap_grace_ms, Some(300));
        assert_eq!(file.log_level.as_deref(), Some("info"));
        assert_eq!(file.env.get("LANG").map(String::as_str), Some("C"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = FileConfig::from_toml_str("retries = 3").unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn test_flags_override_file() {
        let file = FileConfig {
            timeout_secs: Some(10.0),
            log_level: Some("info".into()),
            env: HashMap::from([("MODE".to_string(), "file".to_string())]),
            ..Default::default()
        };
        let settings =
            Settings::resolve(&cli(&["-t", "0.25", "-e", "MODE=flag", "echo", "hi"]), &file).unwrap();

        assert_eq!(settings.invocation.timeout, Some(Duration::from_millis(250)));
        assert_eq!(settings.invocation.env.get("MODE").map(String::as_str), Some("flag"));
        assert_eq!(settings.invocation.arguments, Arguments::List(vec!["hi".into()]));
        assert_eq!(settings.log_level, Level::INFO);
    }

    #[test]
    fn test_file_values_used_without_flags() {
        let file = FileConfig {
            timeout_secs: Some(3.0),
            drain_grace_ms: Some(50),
            max_line_bytes: Some(4096),
            ..Default::default()
        };
        let settings = Settings::resolve(&cli(&["true"]), &file).unwrap();

        assert_eq!(settings.invocation.timeout, Some(Duration::from_secs(3)));
        assert_eq!(settings.options.drain_grace, Duration::from_millis(50));
        assert_eq!(settings.options.max_line_bytes, 4096);
        assert_eq!(settings.log_level, DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn test_no_timeout_anywhere() {
        let settings = Settings::resolve(&cli(&["true"]), &FileConfig::default()).unwrap();
        assert_eq!(settings.invocation.timeout, None);
    }

    #[test]
    fn test_negative_timeout_rejected() {
        let file = FileConfig {
            timeout_secs: Some(-1.0),
            ..Default::default()
        };
        let err = Settings::resolve(&cli(&["true"]), &file).unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument { .. }));
    }

    #[test]
    fn test_raw_args() {
        let settings =
            Settings::resolve(&cli(&["--raw-args", "-l /tmp", "ls"]), &FileConfig::default()).unwrap();
        assert_eq!(settings.invocation.arguments, Arguments::Raw("-l /tmp".into()));

        let err = Settings::resolve(&cli(&["--raw-args", "-l", "ls", "extra"]), &FileConfig::default());
        assert!(err.is_err());
    }

    #[test]
    fn test_verbosity_flags() {
        let quiet = Settings::resolve(&cli(&["-q", "true"]), &FileConfig::default()).unwrap();
        assert_eq!(quiet.log_level, Level::ERROR);
        let verbose = Settings::resolve(&cli(&["-v", "true"]), &FileConfig::default()).unwrap();
        assert_eq!(verbose.log_level, Level::DEBUG);

        let bad = Settings::resolve(&cli(&["--log-level", "loud", "true"]), &FileConfig::default());
        assert!(bad.is_err());
    }

    #[test]
    fn test_load_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(FileConfig::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "timeout_secs = 1\n").unwrap();

        let file = FileConfig::load(Some(&path)).unwrap();
        assert_eq!(file.timeout_secs, Some(1.0));
    }
}
