//! Line pumps: read one pipe and feed a sink until EOF or stop

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::sink::LineSink;

/// Which stream a pump reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    fn as_str(&self) -> &'static str {
        match self {
            Stream::Stdout => "stdout",
            Stream::Stderr => "stderr",
        }
    }
}

/// Spawn a pump task. It returns the number of lines delivered.
pub(crate) fn spawn_pump<R>(
    stream: Stream,
    reader: R,
    sink: Box<dyn LineSink>,
    max_line: usize,
    stop: CancellationToken,
) -> JoinHandle<usize>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(pump_lines(stream, reader, sink, max_line, stop))
}

/// Deliver complete lines in order until EOF, a read error, or `stop`.
///
/// Empty lines are skipped. Lines longer than `max_line` bytes are cut to
/// that length and the rest of the line is discarded. Nothing is delivered
/// once `stop` has fired, even if a line is already buffered.
pub(crate) async fn pump_lines<R>(
    stream: Stream,
    reader: R,
    mut sink: Box<dyn LineSink>,
    max_line: usize,
    stop: CancellationToken,
) -> usize
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::with_capacity(256);
    let mut delivered = 0usize;
    let max_line = max_line.max(1);

    loop {
        buf.clear();
        let read = tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            read = read_line_capped(&mut reader, &mut buf, max_line) => read,
        };

        match read {
            Ok((0, _)) => {
                debug!(stream = stream.as_str(), delivered, "EOF reached");
                break;
            }
            Ok((consumed, truncated)) => {
                if stop.is_cancelled() {
                    break;
                }
                if truncated {
                    debug!(stream = stream.as_str(), consumed, max_line, "Line truncated");
                }
                let line = trim_line_ending(&buf);
                if line.is_empty() {
                    continue;
                }
                sink.accept(&String::from_utf8_lossy(line));
                delivered += 1;
            }
            Err(e) => {
                warn!(stream = stream.as_str(), error = %e, "Error reading output, stopping pump");
                break;
            }
        }
    }

    delivered
}

/// Read one line into `buf`, keeping at most `max` bytes of it.
///
/// Returns the bytes consumed from `reader` (0 at EOF) and whether the
/// line was cut short.
async fn read_line_capped<R>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    max: usize,
) -> io::Result<(usize, bool)>
where
    R: AsyncBufRead + Unpin,
{
    let kept = (&mut *reader).take(max as u64).read_until(b'\n', buf).await?;
    if kept < max || buf.ends_with(b"\n") {
        return Ok((kept, false));
    }

    let mut dropped = 0usize;
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok((kept + dropped, dropped > 0));
        }
        match available.iter().position(|&b| b == b'\n') {
            Some(end) => {
                reader.consume(end + 1);
                dropped += end;
                return Ok((kept + dropped + 1, dropped > 0));
            }
            None => {
                let len = available.len();
                reader.consume(len);
                dropped += len;
            }
        }
    }
}

fn trim_line_ending(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}
