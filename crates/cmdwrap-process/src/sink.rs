//! Per-line observers for child output

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::UnboundedSender;

/// Receives complete lines from one output stream, in arrival order.
///
/// Called from a pump task while the child runs. A slow sink slows down the
/// pump; only the overall run is time-bounded.
pub trait LineSink: Send + 'static {
    fn accept(&mut self, line: &str);
}

impl<F> LineSink for F
where
    F: FnMut(&str) + Send + 'static,
{
    fn accept(&mut self, line: &str) {
        self(line)
    }
}

/// Forwards lines into a tokio channel. A closed receiver drops lines.
#[derive(Debug, Clone)]
pub struct ChannelSink(pub UnboundedSender<String>);

impl LineSink for ChannelSink {
    fn accept(&mut self, line: &str) {
        let _ = self.0.send(line.to_string());
    }
}

/// Thread-safe line collector; clones share one buffer
#[derive(Debug, Clone, Default)]
pub struct LineBuffer {
    lines: Arc<Mutex<Vec<String>>>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the lines collected so far
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LineSink for LineBuffer {
    fn accept(&mut self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}

/// The optional stdout and stderr observers for one run.
///
/// A missing observer means the stream is discarded.
#[derive(Default)]
pub struct OutputSinks {
    pub(crate) stdout: Option<Box<dyn LineSink>>,
    pub(crate) stderr: Option<Box<dyn LineSink>>,
}

impl OutputSinks {
    /// Discard both streams
    pub fn none() -> Self {
        Self::default()
    }

    /// Observe stdout lines
    pub fn stdout(mut self, sink: impl LineSink) -> Self {
        self.stdout = Some(Box::new(sink));
        self
    }

    /// Observe stderr lines
    pub fn stderr(mut self, sink: impl LineSink) -> Self {
        self.stderr = Some(Box::new(sink));
        self
    }

    pub fn has_stdout(&self) -> bool {
        self.stdout.is_some()
    }

    pub fn has_stderr(&self) -> bool {
        self.stderr.is_some()
    }
}

impl std::fmt::Debug for OutputSinks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputSinks")
            .field("stdout", &self.has_stdout())
            .field("stderr", &self.has_stderr())
            .finish()
    }
}
