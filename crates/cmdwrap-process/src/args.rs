//! Command-line arguments for an invocation

use tokio::process::Command;

/// Arguments handed to the child, never interpreted by a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arguments {
    /// One argv entry per element
    List(Vec<String>),
    /// A single argument string.
    ///
    /// Passed through verbatim on Windows. On Unix it is split on
    /// whitespace outside double quotes. The quotes only group: they are
    /// removed, `\"` is a literal quote, and globs, variables and other
    /// backslashes are left untouched.
    Raw(String),
}

impl Arguments {
    /// No arguments
    pub fn none() -> Self {
        Arguments::List(Vec::new())
    }

    /// Whether no arguments will be passed
    pub fn is_empty(&self) -> bool {
        match self {
            Arguments::List(list) => list.is_empty(),
            Arguments::Raw(raw) => raw.trim().is_empty(),
        }
    }

    /// The argv entries the child receives on Unix
    pub fn to_argv(&self) -> Vec<String> {
        match self {
            Arguments::List(list) => list.clone(),
            Arguments::Raw(raw) => split_raw(raw),
        }
    }

    pub(crate) fn apply(&self, cmd: &mut Command) {
        match self {
            Arguments::List(list) => {
                cmd.args(list);
            }
            #[cfg(windows)]
            Arguments::Raw(raw) => {
                if !raw.is_empty() {
                    cmd.raw_arg(raw);
                }
            }
            #[cfg(not(windows))]
            Arguments::Raw(_) => {
                cmd.args(self.to_argv());
            }
        }
    }
}

fn split_raw(raw: &str) -> Vec<String> {
    let mut argv = Vec::new();
    let mut current = String::new();
    // A quoted "" still yields an (empty) argument
    let mut started = false;
    let mut quoted = false;
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'"') => {
                chars.next();
                current.push('"');
                started = true;
            }
            '"' => {
                quoted = !quoted;
                started = true;
            }
            c if c.is_whitespace() && !quoted => {
                if started {
                    argv.push(std::mem::take(&mut current));
                    started = false;
                }
            }
            c => {
                current.push(c);
                started = true;
            }
        }
    }
    if started {
        argv.push(current);
    }
    argv
}

impl Default for Arguments {
    fn default() -> Self {
        Self::none()
    }
}

impl From<&str> for Arguments {
    fn from(raw: &str) -> Self {
        Arguments::Raw(raw.to_string())
    }
}

impl From<String> for Arguments {
    fn from(raw: String) -> Self {
        Arguments::Raw(raw)
    }
}

impl From<Vec<String>> for Arguments {
    fn from(list: Vec<String>) -> Self {
        Arguments::List(list)
    }
}

impl From<&[&str]> for Arguments {
    fn from(list: &[&str]) -> Self {
        Arguments::List(list.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Arguments {
    fn from(list: [&str; N]) -> Self {
        Arguments::List(list.iter().map(|s| s.to_string()).collect())
    }
}
